//! Lua host - bindings for the object model, sandboxed execution, metering

pub mod bindings;
mod metering;
mod sandbox;

pub use bindings::install;
pub use metering::Metering;
pub use sandbox::{Sandbox, SandboxConfig, SandboxError};

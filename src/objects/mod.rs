//! Object model - classes, traits, namespaces and instances

mod class;
mod entity;
mod error;
mod hook;
mod instance;
mod members;
mod namespace;
mod registry;
mod traits;

pub use class::Class;
pub use entity::{Entity, EntityKind, Handle, Ref};
pub use error::ClassError;
pub use hook::{Hook, RESERVED_METAMETHODS};
pub use instance::Instance;
pub use members::MemberTables;
pub use namespace::Namespace;
pub use registry::Registry;
pub use traits::Trait;

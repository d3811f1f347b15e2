//! classkit - classes, traits and namespaces for embedded Lua
//!
//! The object model lives in [`objects`]; [`lua`] wires it into a Lua state
//! and runs scripts in a metered sandbox.

pub mod lua;
pub mod objects;

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

pub use lua::{Metering, Sandbox, SandboxConfig, SandboxError};
pub use objects::{
    Class, ClassError, Entity, EntityKind, Hook, Instance, Namespace, Ref, Registry, Trait,
};

/// Prefix of environment variables read by [`Config::load`]
pub const ENV_PREFIX: &str = "CLASSKIT_";

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log filter used when `RUST_LOG` is unset
    pub log_filter: String,
    pub sandbox: SandboxConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: "classkit=info".to_string(),
            sandbox: SandboxConfig::default(),
        }
    }
}

impl Config {
    /// Layer defaults, an optional TOML file, then `CLASSKIT_*` variables.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `CLASSKIT_SANDBOX__MAX_INSTRUCTIONS=5000`.
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__")).extract()
    }
}

//! Sandbox wrapper with assertion helpers

use classkit::{Metering, Registry, Sandbox, SandboxConfig, SandboxError};
use mlua::FromLuaMulti;

use super::fixtures;

pub struct ScriptHarness {
    sandbox: Sandbox,
}

impl ScriptHarness {
    /// Fresh sandbox with default limits
    pub fn new() -> Self {
        Self::with_config(SandboxConfig::default())
    }

    pub fn with_config(config: SandboxConfig) -> Self {
        let sandbox = Sandbox::new(config).expect("Failed to create sandbox");
        Self { sandbox }
    }

    /// Fresh sandbox with the vec2/vec3/vec4 classes declared
    pub fn with_vectors() -> Self {
        let mut h = Self::new();
        h.run(fixtures::VECTORS);
        h
    }

    /// Run a snippet that must succeed
    pub fn run(&mut self, code: &str) {
        let result: Result<(), SandboxError> = self.sandbox.execute(code);
        if let Err(e) = result {
            panic!("script failed: {e}\n--- script ---\n{code}");
        }
    }

    /// Evaluate a snippet that must succeed and return its value
    pub fn eval<R: FromLuaMulti>(&mut self, code: &str) -> R {
        match self.sandbox.execute(code) {
            Ok(value) => value,
            Err(e) => panic!("script failed: {e}\n--- script ---\n{code}"),
        }
    }

    /// Run a snippet that must fail with a message containing `needle`
    pub fn expect_error(&mut self, code: &str, needle: &str) -> String {
        let result: Result<(), SandboxError> = self.sandbox.execute(code);
        match result {
            Ok(()) => panic!("expected an error containing {needle:?}\n--- script ---\n{code}"),
            Err(e) => {
                let message = e.to_string();
                assert!(
                    message.contains(needle),
                    "error should mention {needle:?}: {message}"
                );
                message
            }
        }
    }

    /// Lines printed since the last call
    pub fn output(&self) -> Vec<String> {
        self.sandbox.take_output()
    }

    pub fn registry(&self) -> &Registry {
        self.sandbox.registry()
    }

    pub fn metering(&self) -> &Metering {
        self.sandbox.metering()
    }
}

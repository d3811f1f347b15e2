//! Lua sandbox - restricted execution with the object model installed

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mlua::{Function, HookTriggers, Lua, MultiValue, Result as LuaResult, StdLib, Value};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{bindings, Metering};
use crate::objects::Registry;

/// How often the instruction hook fires
const HOOK_INTERVAL: u32 = 1000;

/// Sandbox limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Maximum instructions per execution (default: 1,000,000)
    pub max_instructions: u64,
    /// Maximum memory in bytes (default: 64MB)
    pub max_memory: usize,
    /// Execution timeout in milliseconds (default: 500)
    pub timeout_ms: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_instructions: 1_000_000,
            max_memory: 64 * 1024 * 1024, // 64MB
            timeout_ms: 500,
        }
    }
}

impl SandboxConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Errors that can occur during sandbox execution
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("instruction limit exceeded ({0} > {1})")]
    InstructionLimitExceeded(u64, u64),

    #[error("memory limit exceeded ({0} bytes)")]
    MemoryLimitExceeded(usize),

    #[error("execution timeout ({0:?})")]
    Timeout(Duration),

    #[error("Lua error: {0}")]
    LuaError(#[from] mlua::Error),
}

/// A sandboxed Lua state with `Class`, `Trait` and `Namespace` installed
pub struct Sandbox {
    lua: Lua,
    config: SandboxConfig,
    registry: Registry,
    metering: Metering,
    instruction_count: Arc<AtomicU64>,
    exceeded: Arc<AtomicBool>,
    timed_out: Arc<AtomicBool>,
    deadline: Arc<Mutex<Option<Instant>>>,
    output: Rc<RefCell<Vec<String>>>,
}

impl Sandbox {
    /// Create a new sandbox with the given configuration
    pub fn new(config: SandboxConfig) -> Result<Self, SandboxError> {
        // Create Lua with minimal standard libraries
        let lua = Lua::new_with(
            StdLib::STRING | StdLib::TABLE | StdLib::MATH | StdLib::UTF8,
            mlua::LuaOptions::default(),
        )?;

        lua.set_memory_limit(config.max_memory)?;

        let instruction_count = Arc::new(AtomicU64::new(0));
        let exceeded = Arc::new(AtomicBool::new(false));
        let timed_out = Arc::new(AtomicBool::new(false));
        let deadline: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));

        let count_clone = instruction_count.clone();
        let exceeded_clone = exceeded.clone();
        let timed_out_clone = timed_out.clone();
        let deadline_clone = deadline.clone();
        let max_instructions = config.max_instructions;

        lua.set_hook(
            HookTriggers::new().every_nth_instruction(HOOK_INTERVAL),
            move |_lua, _debug| {
                let current = count_clone.fetch_add(HOOK_INTERVAL as u64, Ordering::Relaxed)
                    + HOOK_INTERVAL as u64;
                if current > max_instructions {
                    exceeded_clone.store(true, Ordering::Relaxed);
                    return Err(mlua::Error::RuntimeError(
                        "instruction limit exceeded".to_string(),
                    ));
                }
                if deadline_clone.lock().is_some_and(|d| Instant::now() > d) {
                    timed_out_clone.store(true, Ordering::Relaxed);
                    return Err(mlua::Error::RuntimeError("execution timeout".to_string()));
                }
                Ok(mlua::VmState::Continue)
            },
        );

        Self::remove_dangerous_globals(&lua)?;

        let output = Rc::new(RefCell::new(Vec::new()));
        Self::add_safe_globals(&lua, output.clone())?;

        let metering = Metering::new();
        let registry = Registry::with_metering(metering.clone());
        bindings::install(&lua, &registry)?;

        Ok(Self {
            lua,
            config,
            registry,
            metering,
            instruction_count,
            exceeded,
            timed_out,
            deadline,
            output,
        })
    }

    /// Remove dangerous global functions/tables
    fn remove_dangerous_globals(lua: &Lua) -> LuaResult<()> {
        let globals = lua.globals();

        let dangerous = [
            "os",
            "io",
            "loadfile",
            "dofile",
            "load",
            "loadstring",
            "require",
            "package",
            "debug",
            "collectgarbage",
        ];

        for name in dangerous {
            globals.set(name, Value::Nil)?;
        }

        Ok(())
    }

    /// Replace `print` with a version that captures and logs its output
    fn add_safe_globals(lua: &Lua, output: Rc<RefCell<Vec<String>>>) -> LuaResult<()> {
        let globals = lua.globals();
        let tostring: Function = globals.get("tostring")?;

        let safe_print = lua.create_function(move |_, args: MultiValue| {
            let mut parts = Vec::with_capacity(args.len());
            for value in args {
                parts.push(tostring.call::<String>(value)?);
            }
            let line = parts.join("\t");
            info!(target: "classkit::script", "{line}");
            output.borrow_mut().push(line);
            Ok(())
        })?;
        globals.set("print", safe_print)?;

        Ok(())
    }

    /// Metering shared with the registry
    pub fn metering(&self) -> &Metering {
        &self.metering
    }

    /// Registry the `Class`, `Trait` and `Namespace` globals declare into
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Get the sandbox configuration
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Execute Lua code and return the result
    pub fn execute<R>(&mut self, code: &str) -> Result<R, SandboxError>
    where
        R: mlua::FromLuaMulti,
    {
        self.execute_named("chunk", code)
    }

    /// Execute Lua code under a chunk name used in error messages
    pub fn execute_named<R>(&mut self, name: &str, code: &str) -> Result<R, SandboxError>
    where
        R: mlua::FromLuaMulti,
    {
        self.begin_run();
        let result: LuaResult<R> = self.lua.load(code).set_name(name).eval();
        self.finish_run(name, result)
    }

    /// Execute a Lua function with arguments
    pub fn call<A, R>(&mut self, func: Function, args: A) -> Result<R, SandboxError>
    where
        A: mlua::IntoLuaMulti,
        R: mlua::FromLuaMulti,
    {
        self.begin_run();
        let result: LuaResult<R> = func.call(args);
        self.finish_run("call", result)
    }

    /// Drain the lines printed since the last call
    pub fn take_output(&self) -> Vec<String> {
        std::mem::take(&mut *self.output.borrow_mut())
    }

    fn begin_run(&self) {
        self.instruction_count.store(0, Ordering::Relaxed);
        self.exceeded.store(false, Ordering::Relaxed);
        self.timed_out.store(false, Ordering::Relaxed);
        *self.deadline.lock() = Some(Instant::now() + self.config.timeout());
    }

    fn finish_run<R>(&self, name: &str, result: LuaResult<R>) -> Result<R, SandboxError> {
        *self.deadline.lock() = None;

        let instr = self.instruction_count.load(Ordering::Relaxed);
        self.metering.add_instructions(instr);
        self.metering.set_memory(self.lua.used_memory() as u64);

        if self.exceeded.load(Ordering::Relaxed) {
            warn!(chunk = name, instructions = instr, "instruction limit exceeded");
            return Err(SandboxError::InstructionLimitExceeded(
                instr,
                self.config.max_instructions,
            ));
        }

        if self.timed_out.load(Ordering::Relaxed) {
            warn!(chunk = name, timeout = ?self.config.timeout(), "execution timeout");
            return Err(SandboxError::Timeout(self.config.timeout()));
        }

        debug!(chunk = name, instructions = instr, "execution finished");
        result.map_err(|err| match err {
            mlua::Error::MemoryError(_) => {
                warn!(chunk = name, limit = self.config.max_memory, "memory limit exceeded");
                SandboxError::MemoryLimitExceeded(self.config.max_memory)
            }
            other => SandboxError::LuaError(other),
        })
    }

    /// Check if a global exists (for testing that dangerous globals are removed)
    pub fn global_exists(&self, name: &str) -> bool {
        self.lua
            .globals()
            .get::<Value>(name)
            .map(|v| !matches!(v, Value::Nil))
            .unwrap_or(false)
    }

    /// Get the current instruction count
    pub fn instruction_count(&self) -> u64 {
        self.instruction_count.load(Ordering::Relaxed)
    }

    /// Get current memory usage
    pub fn memory_used(&self) -> usize {
        self.lua.used_memory()
    }

    /// Access the underlying Lua state
    pub fn lua(&self) -> &Lua {
        &self.lua
    }
}

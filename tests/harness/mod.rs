//! Script test harness
//!
//! - `ScriptHarness` - a sandbox with the object model installed, plus
//!   assertion helpers for running Lua snippets
//! - `fixtures` - Lua preludes shared by several scenarios
//!
//! # Example
//!
//! ```rust,ignore
//! use harness::ScriptHarness;
//!
//! #[test]
//! fn test_vec4_super() {
//!     let mut h = ScriptHarness::with_vectors();
//!     let s: String = h.eval("return tostring(Class 'vec4'(1, 2, 3, 4):super())");
//!     assert_eq!(s, "vec3(1, 2, 3)");
//! }
//! ```

pub mod fixtures;
mod script;

pub use script::ScriptHarness;

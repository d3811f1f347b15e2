//! Member tables shared by classes and traits

use std::collections::HashMap;

use mlua::{Function, Value};

use super::Hook;

/// Static members, instance members and hooks of one class or trait
#[derive(Debug, Clone, Default)]
pub struct MemberTables {
    /// Static members (name -> any value)
    pub statics: HashMap<String, Value>,
    /// Instance members (name -> function)
    pub methods: HashMap<String, Function>,
    /// Operator hooks
    pub hooks: HashMap<Hook, Function>,
}

impl MemberTables {
    /// Copy every member of `other` over this table; `other` wins on conflict
    pub fn overlay(&mut self, other: &MemberTables) {
        for (k, v) in &other.statics {
            self.statics.insert(k.clone(), v.clone());
        }
        for (k, f) in &other.methods {
            self.methods.insert(k.clone(), f.clone());
        }
        for (hook, f) in &other.hooks {
            self.hooks.insert(*hook, f.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.statics.is_empty() && self.methods.is_empty() && self.hooks.is_empty()
    }
}

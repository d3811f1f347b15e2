//! Instances and super-views

use mlua::{AnyUserData, FromLua, Lua, Table, Value};
use tracing::trace;

use super::{Class, ClassError};

/// An object created by invoking a class.
///
/// Fields live in a plain Lua table owned by the instance. Everything else
/// (methods, hooks) is found through the class.
#[derive(Clone, Debug)]
pub struct Instance {
    class: Class,
    fields: Table,
}

impl Instance {
    pub(crate) fn new(class: Class, fields: Table) -> Self {
        Self { class, fields }
    }

    /// Borrow the instance stored in a userdata value
    pub fn from_userdata(ud: &AnyUserData) -> Result<Self, ClassError> {
        let instance = ud.borrow::<Instance>()?;
        Ok(Instance::clone(&instance))
    }

    /// The class this instance was created from
    pub fn class(&self) -> &Class {
        &self.class
    }

    /// The raw field table
    pub fn fields(&self) -> &Table {
        &self.fields
    }

    /// Read a field without consulting the class
    pub fn field<V: FromLua>(&self, name: &str) -> Result<V, ClassError> {
        Ok(self.fields.raw_get(name)?)
    }

    /// Write a field
    pub fn set(&self, key: Value, value: Value) -> Result<(), ClassError> {
        Ok(self.fields.raw_set(key, value)?)
    }

    /// Member access: own fields, then `super`, then the class chain
    pub fn get(&self, lua: &Lua, key: Value) -> Result<Value, ClassError> {
        let value: Value = self.fields.raw_get(key.clone())?;
        if !value.is_nil() {
            return Ok(value);
        }

        let Value::String(name) = key else {
            return Ok(Value::Nil);
        };
        let name = name.to_str()?.to_string();

        if name == "super" {
            return self.super_accessor(lua);
        }

        Ok(self
            .class
            .find_method(&name)?
            .map(Value::Function)
            .unwrap_or(Value::Nil))
    }

    /// Check if this instance's class is `class` or one of its descendants
    pub fn is_instance_of(&self, class: &Class) -> Result<bool, ClassError> {
        self.class.is_a(class)
    }

    /// Build a detached instance of the parent class from this instance's
    /// current fields. No constructor runs. Returns `None` for a root class.
    pub fn super_view(&self, lua: &Lua) -> Result<Option<AnyUserData>, ClassError> {
        let Some(parent) = self.class.parent()? else {
            return Ok(None);
        };

        let fields = lua.create_table()?;
        for pair in self.fields.clone().pairs::<Value, Value>() {
            let (k, v) = pair?;
            fields.raw_set(k, v)?;
        }

        trace!(class = %self.class.name(), parent = %parent.name(), "super view");
        let view = lua.create_userdata(Instance::new(parent, fields))?;
        if let Some(registry) = self.class.registry() {
            registry.metering().record_super_view();
        }
        Ok(Some(view))
    }

    /// `x.super` yields a function producing the super-view, so both
    /// `x.super()` and `x:super()` work
    fn super_accessor(&self, lua: &Lua) -> Result<Value, ClassError> {
        if self.class.parent()?.is_none() {
            return Ok(Value::Nil);
        }
        let this = self.clone();
        let accessor = lua.create_function(move |lua, _: mlua::MultiValue| {
            Ok(this.super_view(lua)?)
        })?;
        Ok(Value::Function(accessor))
    }
}

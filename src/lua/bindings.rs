//! Lua surface of the object model
//!
//! `install` exposes three globals, `Class`, `Trait` and `Namespace`. Each
//! returns a userdata handle whose configuration methods return the handle
//! again, so declarations chain:
//!
//! ```lua
//! Class "vec3" :extends "vec2" :constructor(function(self, x, y, z)
//!     self.z = z
//! end)
//! ```
//!
//! Instances are userdata too. Every operator hook in [`Hook::ALL`] is wired
//! on their metatable and dispatched through the class chain.

use mlua::{
    AnyUserData, Function, IntoLuaMulti, Lua, MetaMethod, MultiValue, Table, UserData,
    UserDataMethods, Value, Variadic,
};

use crate::objects::{
    Class, ClassError, Entity, Handle, Hook, Instance, Namespace, Ref, Registry, Trait,
};

/// Set the `Class`, `Trait` and `Namespace` globals, declaring into `registry`
pub fn install(lua: &Lua, registry: &Registry) -> mlua::Result<()> {
    let globals = lua.globals();

    let r = registry.clone();
    globals.set(
        "Class",
        lua.create_function(move |lua, name: String| {
            lua.create_userdata(r.declare_class(&name)?)
        })?,
    )?;

    let r = registry.clone();
    globals.set(
        "Trait",
        lua.create_function(move |lua, name: String| {
            lua.create_userdata(r.declare_trait(&name)?)
        })?,
    )?;

    let r = registry.clone();
    globals.set(
        "Namespace",
        lua.create_function(move |lua, name: String| {
            lua.create_userdata(r.declare_namespace(&name)?)
        })?,
    )?;

    Ok(())
}

/// Wrap an entity in the matching userdata handle
pub fn entity_userdata(lua: &Lua, entity: Entity) -> mlua::Result<AnyUserData> {
    match entity {
        Entity::Class(c) => lua.create_userdata(c),
        Entity::Trait(t) => lua.create_userdata(t),
        Entity::Namespace(ns) => lua.create_userdata(ns),
    }
}

/// Extract an entity from a userdata handle
pub fn entity_from(owner: &str, value: &Value) -> Result<Entity, ClassError> {
    if let Value::UserData(ud) = value {
        if let Ok(c) = ud.borrow::<Class>() {
            return Ok(Entity::Class(Class::clone(&c)));
        }
        if let Ok(t) = ud.borrow::<Trait>() {
            return Ok(Entity::Trait(Trait::clone(&t)));
        }
        if let Ok(ns) = ud.borrow::<Namespace>() {
            return Ok(Entity::Namespace(Namespace::clone(&ns)));
        }
    }
    Err(ClassError::InvalidMember {
        owner: owner.to_string(),
        member: value.type_name().to_string(),
        reason: "only classes, traits and namespaces can be included".to_string(),
    })
}

/// Turn a name or handle into a parent/trait reference
fn reference<T>(owner: &str, member: &str, value: &Value) -> Result<Ref<T>, ClassError>
where
    T: Handle + UserData + 'static,
{
    match value {
        Value::String(s) => Ok(Ref::Named(s.to_str()?.to_string())),
        Value::UserData(ud) if ud.is::<T>() => Ok(Ref::Direct(T::clone(&*ud.borrow::<T>()?))),
        other => Err(ClassError::InvalidMember {
            owner: owner.to_string(),
            member: member.to_string(),
            reason: format!(
                "expected a {kind} or {kind} name, got {}",
                other.type_name(),
                kind = T::KIND
            ),
        }),
    }
}

/// `implements("a", "b")` and `implements { "a", b }` are both accepted
fn flatten_args(args: Variadic<Value>) -> mlua::Result<Vec<Value>> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            Value::Table(t) => {
                for v in t.sequence_values::<Value>() {
                    out.push(v?);
                }
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn as_instance(value: &Value) -> Option<Instance> {
    match value {
        Value::UserData(ud) => ud.borrow::<Instance>().ok().map(|i| Instance::clone(&i)),
        _ => None,
    }
}

/// Run an operator hook found on the operands' class chains.
///
/// Binary hooks consult the left operand first, then the right one.
fn dispatch_hook(lua: &Lua, hook: Hook, args: MultiValue) -> mlua::Result<MultiValue> {
    let arity = if hook.is_binary() { 2 } else { 1 };
    let operands: Vec<Instance> = args.iter().take(arity).filter_map(as_instance).collect();

    for operand in &operands {
        if let Some(hook_fn) = operand.class().find_hook(hook)? {
            if hook.is_comparison() {
                let result: Value = hook_fn.call(args)?;
                let truthy = !matches!(result, Value::Nil | Value::Boolean(false));
                return truthy.into_lua_multi(lua);
            }
            return hook_fn.call::<MultiValue>(args);
        }
    }

    let Some(first) = operands.first() else {
        return Err(mlua::Error::RuntimeError(format!(
            "'{hook}' dispatched without an instance operand"
        )));
    };

    match hook {
        Hook::ToString => format!("{}: {:p}", first.class().name(), first.fields().to_pointer())
            .into_lua_multi(lua),
        Hook::Eq => {
            let same = operands.len() == 2
                && operands[0].fields().to_pointer() == operands[1].fields().to_pointer();
            same.into_lua_multi(lua)
        }
        _ => Err(mlua::Error::RuntimeError(format!(
            "attempt to use '{hook}' on an instance of '{}', which defines no such hook",
            first.class().name()
        ))),
    }
}

impl UserData for Instance {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Index, |lua, this, key: Value| {
            Ok(this.get(lua, key)?)
        });

        methods.add_meta_method(
            MetaMethod::NewIndex,
            |_, this, (key, value): (Value, Value)| Ok(this.set(key, value)?),
        );

        for hook in Hook::ALL {
            methods.add_meta_function(hook.name(), move |lua, args: MultiValue| {
                dispatch_hook(lua, hook, args)
            });
        }
    }
}

/// Member configuration shared by class and trait handles
trait Composable: Handle + UserData + 'static {
    fn set_static(&self, name: &str, value: Value);
    fn set_method(&self, name: &str, method: Function);
    fn set_meta(&self, name: &str, hook_fn: Function) -> Result<(), ClassError>;
    fn implements(&self, t: Ref<Trait>) -> Result<(), ClassError>;
}

impl Composable for Class {
    fn set_static(&self, name: &str, value: Value) {
        Class::set_static(self, name, value)
    }

    fn set_method(&self, name: &str, method: Function) {
        Class::set_method(self, name, method)
    }

    fn set_meta(&self, name: &str, hook_fn: Function) -> Result<(), ClassError> {
        Class::set_meta(self, name, hook_fn)
    }

    fn implements(&self, t: Ref<Trait>) -> Result<(), ClassError> {
        Class::implements(self, t)
    }
}

impl Composable for Trait {
    fn set_static(&self, name: &str, value: Value) {
        Trait::set_static(self, name, value)
    }

    fn set_method(&self, name: &str, method: Function) {
        Trait::set_method(self, name, method)
    }

    fn set_meta(&self, name: &str, hook_fn: Function) -> Result<(), ClassError> {
        Trait::set_meta(self, name, hook_fn)
    }

    fn implements(&self, t: Ref<Trait>) -> Result<(), ClassError> {
        Trait::implements(self, t)
    }
}

fn handle<T: Clone + UserData + 'static>(ud: &AnyUserData) -> mlua::Result<T> {
    Ok(T::clone(&*ud.borrow::<T>()?))
}

fn require_function(owner: &str, member: &str, value: Value) -> Result<Function, ClassError> {
    match value {
        Value::Function(f) => Ok(f),
        other => Err(ClassError::InvalidMember {
            owner: owner.to_string(),
            member: member.to_string(),
            reason: format!("expected a function, got {}", other.type_name()),
        }),
    }
}

fn add_member_methods<T: Composable, M: UserDataMethods<T>>(methods: &mut M) {
    methods.add_function("static", |_, (ud, members): (AnyUserData, Table)| {
        let target = handle::<T>(&ud)?;
        for pair in members.pairs::<String, Value>() {
            let (name, value) = pair?;
            target.set_static(&name, value);
        }
        Ok(ud)
    });

    methods.add_function("method", |_, (ud, members): (AnyUserData, Table)| {
        let target = handle::<T>(&ud)?;
        for pair in members.pairs::<String, Value>() {
            let (name, value) = pair?;
            let method = require_function(&target.name(), &name, value)?;
            target.set_method(&name, method);
        }
        Ok(ud)
    });

    methods.add_function("meta", |_, (ud, members): (AnyUserData, Table)| {
        let target = handle::<T>(&ud)?;
        for pair in members.pairs::<String, Value>() {
            let (name, value) = pair?;
            // Reserved and unknown names are reported before the value's type
            name.parse::<Hook>()?;
            let hook_fn = require_function(&target.name(), &name, value)?;
            target.set_meta(&name, hook_fn)?;
        }
        Ok(ud)
    });

    methods.add_function(
        "implements",
        |_, (ud, refs): (AnyUserData, Variadic<Value>)| {
            let target = handle::<T>(&ud)?;
            for value in flatten_args(refs)? {
                let t = reference::<Trait>(&target.name(), "implements", &value)?;
                target.implements(t)?;
            }
            Ok(ud)
        },
    );

    methods.add_meta_method(MetaMethod::Eq, |_, this, other: Value| {
        Ok(match other {
            Value::UserData(ud) => ud
                .borrow::<T>()
                .map(|other| this.ptr_eq(&other))
                .unwrap_or(false),
            _ => false,
        })
    });
}

impl UserData for Class {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_member_methods(methods);

        methods.add_function(
            "constructor",
            |_, (ud, constructor): (AnyUserData, Value)| {
                let class = handle::<Class>(&ud)?;
                let constructor = require_function(&class.name(), "constructor", constructor)?;
                class.add_constructor(constructor);
                Ok(ud)
            },
        );

        methods.add_function("extends", |_, (ud, parent): (AnyUserData, Value)| {
            let class = handle::<Class>(&ud)?;
            let parent = reference::<Class>(&class.name(), "extends", &parent)?;
            class.extends(parent)?;
            Ok(ud)
        });

        methods.add_meta_method(MetaMethod::Call, |lua, this, args: MultiValue| {
            Ok(this.instantiate(lua, args)?)
        });

        methods.add_meta_method(MetaMethod::Index, |lua, this, key: Value| {
            let Value::String(key) = key else {
                return Ok(Value::Nil);
            };
            let key = key.to_str()?.to_string();
            if key == "super" {
                return match this.parent()? {
                    Some(parent) => Ok(Value::UserData(lua.create_userdata(parent)?)),
                    None => Ok(Value::Nil),
                };
            }
            Ok(this.find_static(&key)?.unwrap_or(Value::Nil))
        });

        methods.add_meta_method(
            MetaMethod::NewIndex,
            |_, this, (key, value): (String, Value)| {
                this.set_static(&key, value);
                Ok(())
            },
        );

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("class: {}", this.name()))
        });
    }
}

impl UserData for Trait {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_member_methods(methods);

        methods.add_meta_method(MetaMethod::Index, |_, this, key: String| {
            Ok(this.find_static(&key)?.unwrap_or(Value::Nil))
        });

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("trait: {}", this.name()))
        });
    }
}

fn include_values(ns: &Namespace, values: Vec<Value>) -> Result<(), ClassError> {
    let path = ns.path();
    for value in values {
        ns.include(entity_from(&path, &value)?)?;
    }
    Ok(())
}

impl UserData for Namespace {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_function(
            "include",
            |_, (ud, values): (AnyUserData, Variadic<Value>)| {
                let ns = handle::<Namespace>(&ud)?;
                include_values(&ns, flatten_args(values)?)?;
                Ok(ud)
            },
        );

        methods.add_method("Class", |lua, this, name: String| {
            lua.create_userdata(this.declare_class(&name)?)
        });

        methods.add_method("Trait", |lua, this, name: String| {
            lua.create_userdata(this.declare_trait(&name)?)
        });

        methods.add_method("Namespace", |lua, this, name: String| {
            lua.create_userdata(this.declare_namespace(&name)?)
        });

        // Namespace "geo" { point, shape }
        methods.add_meta_function(MetaMethod::Call, |_, (ud, members): (AnyUserData, Table)| {
            let ns = handle::<Namespace>(&ud)?;
            let values = members
                .pairs::<Value, Value>()
                .map(|pair| pair.map(|(_, v)| v))
                .collect::<mlua::Result<Vec<_>>>()?;
            include_values(&ns, values)?;
            Ok(ud)
        });

        methods.add_meta_method(MetaMethod::Index, |lua, this, key: String| {
            match this.child(&key) {
                Some(entity) => Ok(Value::UserData(entity_userdata(lua, entity)?)),
                None => Ok(Value::Nil),
            }
        });

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("namespace: {}", this.path()))
        });

        methods.add_meta_method(MetaMethod::Eq, |_, this, other: Value| {
            Ok(match other {
                Value::UserData(ud) => ud
                    .borrow::<Namespace>()
                    .map(|other| this.ptr_eq(&other))
                    .unwrap_or(false),
                _ => false,
            })
        });
    }
}

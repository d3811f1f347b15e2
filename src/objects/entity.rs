//! Entities and references between them

use std::fmt;

use super::registry::WeakRegistry;
use super::{Class, ClassError, Namespace, Trait};

/// The three kinds of declarable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Class,
    Trait,
    Namespace,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Class => "class",
            EntityKind::Trait => "trait",
            EntityKind::Namespace => "namespace",
        };
        f.write_str(s)
    }
}

/// A declared class, trait or namespace
#[derive(Debug, Clone)]
pub enum Entity {
    Class(Class),
    Trait(Trait),
    Namespace(Namespace),
}

impl Entity {
    /// Which kind of entity this is
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Class(_) => EntityKind::Class,
            Entity::Trait(_) => EntityKind::Trait,
            Entity::Namespace(_) => EntityKind::Namespace,
        }
    }

    /// The entity's declared name
    pub fn name(&self) -> String {
        match self {
            Entity::Class(c) => c.name(),
            Entity::Trait(t) => t.name(),
            Entity::Namespace(n) => n.name(),
        }
    }

    /// True if both refer to the same underlying entity
    pub fn same_as(&self, other: &Entity) -> bool {
        match (self, other) {
            (Entity::Class(a), Entity::Class(b)) => a.ptr_eq(b),
            (Entity::Trait(a), Entity::Trait(b)) => a.ptr_eq(b),
            (Entity::Namespace(a), Entity::Namespace(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// The namespace currently owning this entity, if any
    pub fn owner(&self) -> Option<Namespace> {
        match self {
            Entity::Class(c) => c.namespace(),
            Entity::Trait(t) => t.namespace(),
            Entity::Namespace(n) => n.parent(),
        }
    }

    pub(crate) fn set_owner(&self, owner: Option<&Namespace>) {
        match self {
            Entity::Class(c) => c.set_namespace(owner),
            Entity::Trait(t) => t.set_namespace(owner),
            Entity::Namespace(n) => n.set_parent(owner),
        }
    }

    pub fn as_class(&self) -> Option<&Class> {
        match self {
            Entity::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_trait(&self) -> Option<&Trait> {
        match self {
            Entity::Trait(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_namespace(&self) -> Option<&Namespace> {
        match self {
            Entity::Namespace(n) => Some(n),
            _ => None,
        }
    }
}

impl From<Class> for Entity {
    fn from(class: Class) -> Self {
        Entity::Class(class)
    }
}

impl From<Trait> for Entity {
    fn from(t: Trait) -> Self {
        Entity::Trait(t)
    }
}

impl From<Namespace> for Entity {
    fn from(ns: Namespace) -> Self {
        Entity::Namespace(ns)
    }
}

/// Shared behaviour of entity handles that can be the target of a [`Ref`]
pub trait Handle: Clone {
    const KIND: EntityKind;

    fn name(&self) -> String;
    fn ptr_eq(&self, other: &Self) -> bool;
    fn from_entity(entity: Entity) -> Option<Self>;
}

impl Handle for Class {
    const KIND: EntityKind = EntityKind::Class;

    fn name(&self) -> String {
        Class::name(self)
    }

    fn ptr_eq(&self, other: &Self) -> bool {
        Class::ptr_eq(self, other)
    }

    fn from_entity(entity: Entity) -> Option<Self> {
        match entity {
            Entity::Class(c) => Some(c),
            _ => None,
        }
    }
}

impl Handle for Trait {
    const KIND: EntityKind = EntityKind::Trait;

    fn name(&self) -> String {
        Trait::name(self)
    }

    fn ptr_eq(&self, other: &Self) -> bool {
        Trait::ptr_eq(self, other)
    }

    fn from_entity(entity: Entity) -> Option<Self> {
        match entity {
            Entity::Trait(t) => Some(t),
            _ => None,
        }
    }
}

/// A reference to a parent class or implemented trait.
///
/// `Named` references are checked against the referrer's namespace chain
/// when declared, stored as written, and resolved again whenever the
/// referrer's lookup chain is rebuilt. `Direct` references skip scope
/// resolution entirely.
#[derive(Debug, Clone)]
pub enum Ref<T> {
    Named(String),
    Direct(T),
}

impl<T: Handle> Ref<T> {
    /// Name used in error messages
    pub fn label(&self) -> String {
        match self {
            Ref::Named(name) => name.clone(),
            Ref::Direct(handle) => handle.name(),
        }
    }

    /// True if the two references are known to denote the same target
    /// without resolving them
    pub fn same_ref(&self, other: &Ref<T>) -> bool {
        match (self, other) {
            (Ref::Named(a), Ref::Named(b)) => a == b,
            (Ref::Direct(a), Ref::Direct(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Resolve a reference at the point it is declared.
    ///
    /// A name unknown from `scope` but bound inside some namespace gives
    /// `Ok(None)`: the referrer may still be included next to it, so the
    /// error waits for the first lookup.
    pub(crate) fn resolve_declared(
        &self,
        registry: &WeakRegistry,
        scope: Option<&Namespace>,
    ) -> Result<Option<T>, ClassError> {
        match self.resolve(registry, scope) {
            Ok(target) => Ok(Some(target)),
            Err(ClassError::UnresolvedReference { ref name, .. })
                if registry
                    .upgrade()
                    .is_some_and(|registry| registry.bound_in_namespace(name)) =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub(crate) fn resolve(
        &self,
        registry: &WeakRegistry,
        scope: Option<&Namespace>,
    ) -> Result<T, ClassError> {
        let name = match self {
            Ref::Direct(handle) => return Ok(handle.clone()),
            Ref::Named(name) => name,
        };

        let entity = registry
            .upgrade()
            .and_then(|registry| registry.resolve(name, scope))
            .ok_or_else(|| ClassError::UnresolvedReference {
                name: name.clone(),
                kind: T::KIND,
                scope: scope_label(scope),
            })?;

        let found = entity.kind();
        T::from_entity(entity).ok_or_else(|| ClassError::WrongKind {
            name: name.clone(),
            expected: T::KIND,
            found,
        })
    }
}

impl<T> From<&str> for Ref<T> {
    fn from(name: &str) -> Self {
        Ref::Named(name.to_string())
    }
}

impl<T> From<String> for Ref<T> {
    fn from(name: String) -> Self {
        Ref::Named(name)
    }
}

impl From<Class> for Ref<Class> {
    fn from(class: Class) -> Self {
        Ref::Direct(class)
    }
}

impl From<&Class> for Ref<Class> {
    fn from(class: &Class) -> Self {
        Ref::Direct(class.clone())
    }
}

impl From<Trait> for Ref<Trait> {
    fn from(t: Trait) -> Self {
        Ref::Direct(t)
    }
}

impl From<&Trait> for Ref<Trait> {
    fn from(t: &Trait) -> Self {
        Ref::Direct(t.clone())
    }
}

/// Human-readable description of a lookup scope
pub(crate) fn scope_label(scope: Option<&Namespace>) -> String {
    match scope {
        Some(ns) => format!("namespace '{}'", ns.path()),
        None => "global scope".to_string(),
    }
}

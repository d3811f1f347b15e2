//! Registry of globally visible entities

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::debug;

use super::entity::scope_label;
use super::{Class, ClassError, Entity, EntityKind, Namespace, Trait};
use crate::lua::Metering;

/// Table of globally visible classes, traits and namespaces.
///
/// One registry is created per Lua state. Cloning a `Registry` shares the
/// same table.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    inner: Rc<RegistryInner>,
}

#[derive(Debug, Default)]
pub(crate) struct RegistryInner {
    globals: RefCell<HashMap<String, Entity>>,
    metering: Metering,
    /// Bumped when trait contents or entity ownership change
    epoch: Cell<u64>,
}

/// Non-owning handle held by entities so they can resolve names later
#[derive(Debug, Clone, Default)]
pub(crate) struct WeakRegistry(Weak<RegistryInner>);

impl WeakRegistry {
    pub(crate) fn upgrade(&self) -> Option<Registry> {
        self.0.upgrade().map(|inner| Registry { inner })
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.upgrade().map_or(0, |registry| registry.epoch())
    }

    pub(crate) fn touch(&self) {
        if let Some(registry) = self.upgrade() {
            registry.touch();
        }
    }
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry that reports into the given metering
    pub fn with_metering(metering: Metering) -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                globals: RefCell::new(HashMap::new()),
                metering,
                epoch: Cell::new(0),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakRegistry {
        WeakRegistry(Rc::downgrade(&self.inner))
    }

    /// Metering counters for this registry
    pub fn metering(&self) -> &Metering {
        &self.inner.metering
    }

    /// Declare (or reopen) an entity in the global scope
    pub fn declare(&self, name: &str, kind: EntityKind) -> Result<Entity, ClassError> {
        self.declare_in(name, kind, None)
    }

    /// Declare (or reopen) an entity in the given scope.
    ///
    /// If `name` already denotes an entity of the same kind in that scope, the
    /// existing entity is returned. A binding of a different kind is a
    /// [`ClassError::NameCollision`].
    pub fn declare_in(
        &self,
        name: &str,
        kind: EntityKind,
        scope: Option<&Namespace>,
    ) -> Result<Entity, ClassError> {
        let existing = match scope {
            Some(ns) => ns.child(name),
            None => self.get(name),
        };

        if let Some(entity) = existing {
            if entity.kind() == kind {
                return Ok(entity);
            }
            return Err(ClassError::NameCollision {
                name: name.to_string(),
                existing: entity.kind(),
                requested: kind,
                scope: scope_label(scope),
            });
        }

        let registry = self.downgrade();
        let entity = match kind {
            EntityKind::Class => Entity::Class(Class::new(name, registry)),
            EntityKind::Trait => Entity::Trait(Trait::new(name, registry)),
            EntityKind::Namespace => Entity::Namespace(Namespace::new(name, registry)),
        };

        match scope {
            Some(ns) => ns.bind(entity.clone())?,
            None => {
                self.inner
                    .globals
                    .borrow_mut()
                    .insert(name.to_string(), entity.clone());
            }
        }

        self.inner.metering.record_declaration();
        debug!(entity = name, %kind, scope = %scope_label(scope), "declared entity");
        Ok(entity)
    }

    /// Declare (or reopen) a global class
    pub fn declare_class(&self, name: &str) -> Result<Class, ClassError> {
        let entity = self.declare(name, EntityKind::Class)?;
        expect_kind(name, entity, EntityKind::Class, Entity::as_class)
    }

    /// Declare (or reopen) a global trait
    pub fn declare_trait(&self, name: &str) -> Result<Trait, ClassError> {
        let entity = self.declare(name, EntityKind::Trait)?;
        expect_kind(name, entity, EntityKind::Trait, Entity::as_trait)
    }

    /// Declare (or reopen) a global namespace
    pub fn declare_namespace(&self, name: &str) -> Result<Namespace, ClassError> {
        let entity = self.declare(name, EntityKind::Namespace)?;
        expect_kind(name, entity, EntityKind::Namespace, Entity::as_namespace)
    }

    /// Get a global binding without declaring anything
    pub fn get(&self, name: &str) -> Option<Entity> {
        self.inner.globals.borrow().get(name).cloned()
    }

    /// Check if a global binding exists
    pub fn exists(&self, name: &str) -> bool {
        self.inner.globals.borrow().contains_key(name)
    }

    /// Resolve a name from a scope: the scope's locals, each enclosing
    /// namespace, then the global table
    pub fn resolve(&self, name: &str, scope: Option<&Namespace>) -> Option<Entity> {
        let mut current = scope.cloned();
        while let Some(ns) = current {
            if let Some(entity) = ns.child(name) {
                return Some(entity);
            }
            current = ns.parent();
        }
        self.get(name)
    }

    /// Check if `name` is bound inside any namespace reachable from the
    /// global table, at any depth
    pub fn bound_in_namespace(&self, name: &str) -> bool {
        let mut pending: Vec<Namespace> = self
            .inner
            .globals
            .borrow()
            .values()
            .filter_map(|e| e.as_namespace().cloned())
            .collect();
        while let Some(ns) = pending.pop() {
            if ns.child(name).is_some() {
                return true;
            }
            pending.extend(ns.child_namespaces());
        }
        false
    }

    /// Cached lookup chains built before this epoch are stale
    pub(crate) fn epoch(&self) -> u64 {
        self.inner.epoch.get()
    }

    pub(crate) fn touch(&self) {
        self.inner.epoch.set(self.inner.epoch.get() + 1);
    }

    /// Names of all global bindings, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.globals.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.inner.globals.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.globals.borrow().is_empty()
    }

    /// Remove a global binding, but only if it still denotes `entity`
    pub(crate) fn unbind(&self, name: &str, entity: &Entity) -> bool {
        let mut globals = self.inner.globals.borrow_mut();
        match globals.get(name) {
            Some(bound) if bound.same_as(entity) => {
                globals.remove(name);
                true
            }
            _ => false,
        }
    }
}

fn expect_kind<T: Clone>(
    name: &str,
    entity: Entity,
    expected: EntityKind,
    pick: fn(&Entity) -> Option<&T>,
) -> Result<T, ClassError> {
    match pick(&entity) {
        Some(handle) => Ok(handle.clone()),
        None => Err(ClassError::WrongKind {
            name: name.to_string(),
            expected,
            found: entity.kind(),
        }),
    }
}

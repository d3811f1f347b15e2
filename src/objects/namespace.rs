//! Namespaces: scopes that own classes, traits and nested namespaces

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use super::registry::WeakRegistry;
use super::{Class, ClassError, Entity, EntityKind, Registry, Trait};

/// A namespace handle. Clones share the same namespace.
#[derive(Clone)]
pub struct Namespace {
    inner: Rc<RefCell<NamespaceDef>>,
}

struct NamespaceDef {
    name: String,
    registry: WeakRegistry,
    children: HashMap<String, Entity>,
    parent: Option<WeakNamespace>,
}

/// Back-reference from an entity to the namespace that owns it
#[derive(Clone)]
pub(crate) struct WeakNamespace(Weak<RefCell<NamespaceDef>>);

impl WeakNamespace {
    pub(crate) fn upgrade(&self) -> Option<Namespace> {
        self.0.upgrade().map(|inner| Namespace { inner })
    }
}

impl Namespace {
    pub(crate) fn new(name: &str, registry: WeakRegistry) -> Self {
        Self {
            inner: Rc::new(RefCell::new(NamespaceDef {
                name: name.to_string(),
                registry,
                children: HashMap::new(),
                parent: None,
            })),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakNamespace {
        WeakNamespace(Rc::downgrade(&self.inner))
    }

    /// Namespace name
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Dotted path from the outermost enclosing namespace, e.g. `geo.shapes`
    pub fn path(&self) -> String {
        let mut names = vec![self.name()];
        let mut current = self.parent();
        while let Some(ns) = current {
            names.push(ns.name());
            current = ns.parent();
        }
        names.reverse();
        names.join(".")
    }

    /// True if both handles denote the same namespace
    pub fn ptr_eq(&self, other: &Namespace) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The enclosing namespace, if nested
    pub fn parent(&self) -> Option<Namespace> {
        self.inner
            .borrow()
            .parent
            .as_ref()
            .and_then(WeakNamespace::upgrade)
    }

    pub(crate) fn set_parent(&self, parent: Option<&Namespace>) {
        self.inner.borrow_mut().parent = parent.map(Namespace::downgrade);
    }

    /// Get a local child by name (no fallback to enclosing scopes)
    pub fn child(&self, name: &str) -> Option<Entity> {
        self.inner.borrow().children.get(name).cloned()
    }

    /// Names of local children, sorted
    pub fn child_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.borrow().children.keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn child_namespaces(&self) -> Vec<Namespace> {
        self.inner
            .borrow()
            .children
            .values()
            .filter_map(|e| e.as_namespace().cloned())
            .collect()
    }

    /// Check if `ancestor` encloses this namespace, at any depth
    pub fn is_within(&self, ancestor: &Namespace) -> bool {
        let mut current = self.parent();
        while let Some(ns) = current {
            if ns.ptr_eq(ancestor) {
                return true;
            }
            current = ns.parent();
        }
        false
    }

    /// Declare (or reopen) a class directly inside this namespace
    pub fn declare_class(&self, name: &str) -> Result<Class, ClassError> {
        match self.declare(name, EntityKind::Class)? {
            Entity::Class(c) => Ok(c),
            other => Err(wrong_kind(name, EntityKind::Class, &other)),
        }
    }

    /// Declare (or reopen) a trait directly inside this namespace
    pub fn declare_trait(&self, name: &str) -> Result<Trait, ClassError> {
        match self.declare(name, EntityKind::Trait)? {
            Entity::Trait(t) => Ok(t),
            other => Err(wrong_kind(name, EntityKind::Trait, &other)),
        }
    }

    /// Declare (or reopen) a nested namespace
    pub fn declare_namespace(&self, name: &str) -> Result<Namespace, ClassError> {
        match self.declare(name, EntityKind::Namespace)? {
            Entity::Namespace(ns) => Ok(ns),
            other => Err(wrong_kind(name, EntityKind::Namespace, &other)),
        }
    }

    fn declare(&self, name: &str, kind: EntityKind) -> Result<Entity, ClassError> {
        let registry = self.registry().ok_or_else(|| ClassError::UnresolvedReference {
            name: name.to_string(),
            kind,
            scope: format!("namespace '{}'", self.path()),
        })?;
        registry.declare_in(name, kind, Some(self))
    }

    /// Move an entity into this namespace.
    ///
    /// The entity is bound under its own name and removed from wherever it
    /// was visible before: the global table, or its previous namespace.
    /// Nested namespaces keep their own children.
    pub fn include(&self, entity: impl Into<Entity>) -> Result<(), ClassError> {
        let entity = entity.into();
        let name = entity.name();

        if let Entity::Namespace(ns) = &entity {
            if ns.ptr_eq(self) || self.is_within(ns) {
                return Err(ClassError::CircularReference { name });
            }
        }

        if let Some(existing) = self.child(&name) {
            if existing.same_as(&entity) {
                return Ok(());
            }
            return Err(ClassError::NameCollision {
                name,
                existing: existing.kind(),
                requested: entity.kind(),
                scope: format!("namespace '{}'", self.path()),
            });
        }

        match entity.owner() {
            Some(previous) => previous.unbind(&name, &entity),
            None => {
                if let Some(registry) = self.registry() {
                    registry.unbind(&name, &entity);
                }
            }
        }

        self.bind(entity.clone())?;
        debug!(namespace = %self.path(), entity = %name, kind = %entity.kind(), "included");
        Ok(())
    }

    /// Include several entities, stopping at the first failure
    pub fn include_all<I, E>(&self, entities: I) -> Result<(), ClassError>
    where
        I: IntoIterator<Item = E>,
        E: Into<Entity>,
    {
        for entity in entities {
            self.include(entity)?;
        }
        Ok(())
    }

    /// Bind a fresh or detached entity as a local child
    pub(crate) fn bind(&self, entity: Entity) -> Result<(), ClassError> {
        let name = entity.name();
        {
            let mut def = self.inner.borrow_mut();
            if let Some(existing) = def.children.get(&name) {
                if !existing.same_as(&entity) {
                    return Err(ClassError::NameCollision {
                        name,
                        existing: existing.kind(),
                        requested: entity.kind(),
                        scope: format!("namespace '{}'", def.name),
                    });
                }
            }
            def.children.insert(name, entity.clone());
        }
        entity.set_owner(Some(self));
        // Named references anywhere may now resolve differently
        if let Some(registry) = self.registry() {
            registry.touch();
        }
        Ok(())
    }

    fn unbind(&self, name: &str, entity: &Entity) {
        let mut def = self.inner.borrow_mut();
        if def.children.get(name).is_some_and(|bound| bound.same_as(entity)) {
            def.children.remove(name);
        }
    }

    fn registry(&self) -> Option<Registry> {
        self.inner.borrow().registry.upgrade()
    }
}

fn wrong_kind(name: &str, expected: EntityKind, found: &Entity) -> ClassError {
    ClassError::WrongKind {
        name: name.to_string(),
        expected,
        found: found.kind(),
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("path", &self.path())
            .field("children", &self.child_names())
            .finish()
    }
}

//! Class engine: constructors, members, single inheritance and lookup

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use mlua::{AnyUserData, Function, Lua, MultiValue, Value};
use tracing::{debug, trace};

use super::namespace::WeakNamespace;
use super::registry::WeakRegistry;
use super::{ClassError, Hook, Instance, MemberTables, Namespace, Ref, Trait};

/// A class handle. Clones share the same class.
#[derive(Clone)]
pub struct Class {
    inner: Rc<RefCell<ClassDef>>,
}

struct ClassDef {
    name: String,
    registry: WeakRegistry,
    namespace: Option<WeakNamespace>,
    /// Run in declaration order on every instantiation
    constructors: Vec<Function>,
    /// Members declared directly on this class
    members: MemberTables,
    parent: Option<Ref<Class>>,
    traits: Vec<Ref<Trait>>,
    /// Filled on first lookup or instantiation; cleared by extends/implements
    /// and stale once the registry epoch moves on
    resolved: Option<Rc<Resolved>>,
}

/// The finalized lookup chain of a class
struct Resolved {
    epoch: u64,
    parent: Option<Class>,
    /// Flattened members of every implemented trait, last implementer wins
    composed: MemberTables,
}

impl Class {
    pub(crate) fn new(name: &str, registry: WeakRegistry) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ClassDef {
                name: name.to_string(),
                registry,
                namespace: None,
                constructors: Vec::new(),
                members: MemberTables::default(),
                parent: None,
                traits: Vec::new(),
                resolved: None,
            })),
        }
    }

    /// Class name
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// True if both handles denote the same class
    pub fn ptr_eq(&self, other: &Class) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The namespace owning this class, if it has been included in one
    pub fn namespace(&self) -> Option<Namespace> {
        self.inner
            .borrow()
            .namespace
            .as_ref()
            .and_then(WeakNamespace::upgrade)
    }

    pub(crate) fn set_namespace(&self, ns: Option<&Namespace>) {
        let mut def = self.inner.borrow_mut();
        def.namespace = ns.map(Namespace::downgrade);
        // Named references resolve from the owning scope
        def.resolved = None;
    }

    /// Append a constructor; earlier constructors are kept
    pub fn add_constructor(&self, constructor: Function) {
        self.inner.borrow_mut().constructors.push(constructor);
    }

    /// Set a static member, replacing any earlier value of the same name
    pub fn set_static(&self, name: &str, value: Value) {
        self.inner
            .borrow_mut()
            .members
            .statics
            .insert(name.to_string(), value);
    }

    /// Set an instance member, replacing any earlier function of the same name
    pub fn set_method(&self, name: &str, method: Function) {
        self.inner
            .borrow_mut()
            .members
            .methods
            .insert(name.to_string(), method);
    }

    /// Set an operator hook. `__index` and `__newindex` are rejected.
    pub fn set_meta(&self, name: &str, hook_fn: Function) -> Result<(), ClassError> {
        let hook: Hook = name.parse()?;
        self.inner.borrow_mut().members.hooks.insert(hook, hook_fn);
        Ok(())
    }

    /// Set the parent class. A class has at most one parent.
    ///
    /// A named parent is resolved from this class's scope right away, so an
    /// unknown name, a non-class or a cycle fails here and leaves the class
    /// unchanged.
    pub fn extends(&self, parent: impl Into<Ref<Class>>) -> Result<(), ClassError> {
        let parent = parent.into();
        let (registry, scope) = {
            let def = self.inner.borrow();
            if let Some(existing) = &def.parent {
                return Err(ClassError::MultipleInheritance {
                    class: def.name.clone(),
                    parent: existing.label(),
                });
            }
            (def.registry.clone(), def.scope())
        };

        if let Some(target) = parent.resolve_declared(&registry, scope.as_ref())? {
            if target.reaches(self) {
                return Err(ClassError::CircularReference { name: self.name() });
            }
        }

        let mut def = self.inner.borrow_mut();
        debug!(class = %def.name, parent = %parent.label(), "extends");
        def.parent = Some(parent);
        def.resolved = None;
        Ok(())
    }

    /// Implement a trait. Each trait may be implemented only once, whether
    /// it is named or passed as a handle.
    pub fn implements(&self, t: impl Into<Ref<Trait>>) -> Result<(), ClassError> {
        let t = t.into();
        let (name, registry, scope, existing) = {
            let def = self.inner.borrow();
            (
                def.name.clone(),
                def.registry.clone(),
                def.scope(),
                def.traits.clone(),
            )
        };

        let target = t.resolve_declared(&registry, scope.as_ref())?;
        let duplicate = existing.iter().any(|r| {
            r.same_ref(&t)
                || target.as_ref().is_some_and(|target| {
                    r.resolve(&registry, scope.as_ref())
                        .is_ok_and(|other| other.ptr_eq(target))
                })
        });
        if duplicate {
            return Err(ClassError::DuplicateImplementation {
                target: name,
                trait_name: t.label(),
            });
        }

        let mut def = self.inner.borrow_mut();
        debug!(class = %def.name, trait_name = %t.label(), "implements");
        def.traits.push(t);
        def.resolved = None;
        Ok(())
    }

    /// The resolved parent class, if any
    pub fn parent(&self) -> Result<Option<Class>, ClassError> {
        Ok(self.resolved()?.parent.clone())
    }

    /// This class followed by its ancestors (child -> ... -> root)
    pub fn ancestry(&self) -> Result<Vec<Class>, ClassError> {
        let mut chain = vec![self.clone()];
        let mut current = self.parent()?;
        while let Some(class) = current {
            current = class.parent()?;
            chain.push(class);
        }
        Ok(chain)
    }

    /// Check if this class is `other` or one of its descendants
    pub fn is_a(&self, other: &Class) -> Result<bool, ClassError> {
        Ok(self.ancestry()?.iter().any(|c| c.ptr_eq(other)))
    }

    /// Look up an instance member through class, traits and ancestors
    pub fn find_method(&self, name: &str) -> Result<Option<Function>, ClassError> {
        self.walk(|members| members.methods.get(name).cloned())
    }

    /// Look up a static member through class, traits and ancestors
    pub fn find_static(&self, name: &str) -> Result<Option<Value>, ClassError> {
        self.walk(|members| members.statics.get(name).cloned())
    }

    /// Look up an operator hook through class, traits and ancestors
    pub fn find_hook(&self, hook: Hook) -> Result<Option<Function>, ClassError> {
        self.walk(|members| members.hooks.get(&hook).cloned())
    }

    /// Constructors run on instantiation: every ancestor's own, root first,
    /// then this class's
    pub fn constructors(&self) -> Result<Vec<Function>, ClassError> {
        Ok(self
            .ancestry()?
            .iter()
            .rev()
            .flat_map(|class| class.inner.borrow().constructors.clone())
            .collect())
    }

    /// Create an instance and run the constructors against it with `args`
    pub fn instantiate(&self, lua: &Lua, args: MultiValue) -> Result<AnyUserData, ClassError> {
        let constructors = self.constructors()?;
        let instance = Instance::new(self.clone(), lua.create_table()?);
        let ud = lua.create_userdata(instance)?;

        for constructor in constructors {
            constructor.call::<()>((ud.clone(), args.clone()))?;
        }

        if let Some(registry) = self.registry() {
            registry.metering().record_instance();
        }
        trace!(class = %self.name(), "instantiated");
        Ok(ud)
    }

    /// Walk the lookup chain: own members, composed trait members, then
    /// the parent's chain
    fn walk<R>(&self, pick: impl Fn(&MemberTables) -> Option<R>) -> Result<Option<R>, ClassError> {
        let mut class = self.clone();
        loop {
            if let Some(found) = pick(&class.inner.borrow().members) {
                return Ok(Some(found));
            }
            let resolved = class.resolved()?;
            if let Some(found) = pick(&resolved.composed) {
                return Ok(Some(found));
            }
            match &resolved.parent {
                Some(parent) => class = parent.clone(),
                None => return Ok(None),
            }
        }
    }

    pub(crate) fn registry(&self) -> Option<super::Registry> {
        self.inner.borrow().registry.upgrade()
    }

    /// True if `target` is this class or one of its resolvable ancestors
    fn reaches(&self, target: &Class) -> bool {
        let mut seen: Vec<Class> = Vec::new();
        let mut current = Some(self.clone());
        while let Some(class) = current {
            if class.ptr_eq(target) {
                return true;
            }
            if seen.iter().any(|c| c.ptr_eq(&class)) {
                return false;
            }
            current = class.resolve_parent().ok().flatten();
            seen.push(class);
        }
        false
    }

    /// The cached chain, if it is still current
    fn cached(&self) -> Option<Rc<Resolved>> {
        let def = self.inner.borrow();
        def.resolved
            .as_ref()
            .filter(|resolved| resolved.epoch == def.registry.epoch())
            .cloned()
    }

    /// Resolve the parent reference without finalizing this class
    fn resolve_parent(&self) -> Result<Option<Class>, ClassError> {
        if let Some(resolved) = self.cached() {
            return Ok(resolved.parent.clone());
        }
        let (parent, registry, scope) = {
            let def = self.inner.borrow();
            (def.parent.clone(), def.registry.clone(), def.scope())
        };
        parent
            .map(|r| r.resolve(&registry, scope.as_ref()))
            .transpose()
    }

    /// Finalize the lookup chain, or return the cached one.
    ///
    /// Named references are resolved again after any namespace move or trait
    /// edit, so a trait member added late is seen no matter when the class
    /// was first used.
    fn resolved(&self) -> Result<Rc<Resolved>, ClassError> {
        if let Some(resolved) = self.cached() {
            return Ok(resolved);
        }

        let parent = self.resolve_parent()?;

        // Named parents can still form a cycle once entities move between scopes
        let mut seen = vec![self.clone()];
        let mut current = parent.clone();
        while let Some(class) = current {
            if seen.iter().any(|c| c.ptr_eq(&class)) {
                return Err(ClassError::CircularReference { name: class.name() });
            }
            current = class.resolve_parent()?;
            seen.push(class);
        }

        let (name, traits, registry, scope) = {
            let def = self.inner.borrow();
            (
                def.name.clone(),
                def.traits.clone(),
                def.registry.clone(),
                def.scope(),
            )
        };

        let mut composed = MemberTables::default();
        for r in &traits {
            let t = r.resolve(&registry, scope.as_ref())?;
            composed.overlay(&*t.flattened()?);
        }

        let resolved = Rc::new(Resolved {
            epoch: registry.epoch(),
            parent,
            composed,
        });
        self.inner.borrow_mut().resolved = Some(resolved.clone());
        debug!(class = %name, traits = traits.len(), "finalized lookup chain");
        Ok(resolved)
    }
}

impl ClassDef {
    fn scope(&self) -> Option<Namespace> {
        self.namespace.as_ref().and_then(WeakNamespace::upgrade)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let def = self.inner.borrow();
        f.debug_struct("Class")
            .field("name", &def.name)
            .field("constructors", &def.constructors.len())
            .field("parent", &def.parent.as_ref().map(Ref::label))
            .field("traits", &def.traits.iter().map(Ref::label).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

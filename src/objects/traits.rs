//! Traits: composable bundles of members
//!
//! A trait holds the same member tables as a class but has no constructors
//! and no parent. Traits may implement other traits; composition is
//! flattened once, so a consumer only ever looks one level deep. Any edit
//! to a trait moves the registry epoch on, which retires every flattened
//! table and class lookup chain built before it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use mlua::{Function, Value};
use tracing::debug;

use super::namespace::WeakNamespace;
use super::registry::WeakRegistry;
use super::{ClassError, Hook, MemberTables, Namespace, Ref};

/// A trait handle. Clones share the same trait.
#[derive(Clone)]
pub struct Trait {
    inner: Rc<RefCell<TraitDef>>,
}

struct TraitDef {
    name: String,
    registry: WeakRegistry,
    namespace: Option<WeakNamespace>,
    members: MemberTables,
    traits: Vec<Ref<Trait>>,
    /// Tagged with the registry epoch it was built in
    flattened: Option<(u64, Rc<MemberTables>)>,
}

impl Trait {
    pub(crate) fn new(name: &str, registry: WeakRegistry) -> Self {
        Self {
            inner: Rc::new(RefCell::new(TraitDef {
                name: name.to_string(),
                registry,
                namespace: None,
                members: MemberTables::default(),
                traits: Vec::new(),
                flattened: None,
            })),
        }
    }

    /// Trait name
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// True if both handles denote the same trait
    pub fn ptr_eq(&self, other: &Trait) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The namespace owning this trait, if any
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
        def.edited();
    }

    pub fn set_static(&self, name: &str, value: Value) {
        let mut def = self.inner.borrow_mut();
        def.members.statics.insert(name.to_string(), value);
        def.edited();
    }

    pub fn set_method(&self, name: &str, method: Function) {
        let mut def = self.inner.borrow_mut();
        def.members.methods.insert(name.to_string(), method);
        def.edited();
    }

    /// Set an operator hook. `__index` and `__newindex` are rejected.
    pub fn set_meta(&self, name: &str, hook_fn: Function) -> Result<(), ClassError> {
        let hook: Hook = name.parse()?;
        let mut def = self.inner.borrow_mut();
        def.members.hooks.insert(hook, hook_fn);
        def.edited();
        Ok(())
    }

    /// Compose another trait into this one.
    ///
    /// A named trait is resolved from this trait's scope right away. Cycles
    /// and duplicates (by name or by handle) fail here.
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
        if target.as_ref().is_some_and(|target| target.composes(self)) {
            return Err(ClassError::CircularReference { name });
        }

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
        debug!(trait_name = %def.name, implements = %t.label(), "trait composition");
        def.traits.push(t);
        def.edited();
        Ok(())
    }

    /// True if `target` is this trait or reachable through its resolvable
    /// composition
    fn composes(&self, target: &Trait) -> bool {
        let mut pending = vec![self.clone()];
        let mut seen: Vec<Trait> = Vec::new();
        while let Some(t) = pending.pop() {
            if t.ptr_eq(target) {
                return true;
            }
            if seen.iter().any(|s| s.ptr_eq(&t)) {
                continue;
            }
            let (refs, registry, scope) = {
                let def = t.inner.borrow();
                (def.traits.clone(), def.registry.clone(), def.scope())
            };
            pending.extend(
                refs.iter()
                    .filter_map(|r| r.resolve(&registry, scope.as_ref()).ok()),
            );
            seen.push(t);
        }
        false
    }

    /// Look up a static member of the flattened trait
    pub fn find_static(&self, name: &str) -> Result<Option<Value>, ClassError> {
        Ok(self.flattened()?.statics.get(name).cloned())
    }

    /// All members of this trait and the traits it implements, flattened.
    ///
    /// Implemented traits are merged in order (last wins), then this trait's
    /// own members on top.
    pub fn flattened(&self) -> Result<Rc<MemberTables>, ClassError> {
        self.flatten(&mut Vec::new())
    }

    fn flatten(&self, stack: &mut Vec<Trait>) -> Result<Rc<MemberTables>, ClassError> {
        let epoch = {
            let def = self.inner.borrow();
            let epoch = def.registry.epoch();
            if let Some((built, flat)) = &def.flattened {
                if *built == epoch {
                    return Ok(flat.clone());
                }
            }
            epoch
        };
        if stack.iter().any(|t| t.ptr_eq(self)) {
            return Err(ClassError::CircularReference { name: self.name() });
        }

        let (refs, own, registry, scope) = {
            let def = self.inner.borrow();
            (
                def.traits.clone(),
                def.members.clone(),
                def.registry.clone(),
                def.scope(),
            )
        };

        stack.push(self.clone());
        let mut acc = MemberTables::default();
        for r in &refs {
            let t = r.resolve(&registry, scope.as_ref())?;
            acc.overlay(&*t.flatten(stack)?);
        }
        stack.pop();
        acc.overlay(&own);

        let flat = Rc::new(acc);
        self.inner.borrow_mut().flattened = Some((epoch, flat.clone()));
        Ok(flat)
    }
}

impl TraitDef {
    fn scope(&self) -> Option<Namespace> {
        self.namespace.as_ref().and_then(WeakNamespace::upgrade)
    }

    /// Drop this trait's flattened table and retire every cache built on it
    fn edited(&mut self) {
        self.flattened = None;
        self.registry.touch();
    }
}

impl fmt::Debug for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let def = self.inner.borrow();
        f.debug_struct("Trait")
            .field("name", &def.name)
            .field("traits", &def.traits.iter().map(Ref::label).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

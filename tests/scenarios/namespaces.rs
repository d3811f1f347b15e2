//! Namespace scenario tests
//!
//! Tests inclusion, scoped resolution and the ordering hazard

use crate::harness::ScriptHarness;

/// Test: same-named traits inside and outside a namespace resolve independently
#[test]
fn test_namespace_isolation() {
    let mut h = ScriptHarness::new();

    let (inside, outside): (String, String) = h.eval(
        r#"
        Trait "t" :method { who = function() return "global" end }
        local N = Namespace "N"
        N:Trait "t" :method { who = function() return "local" end }
        N:Class "inside" :implements "t"
        Class "outside" :implements "t"
        return N.inside():who(), Class "outside"():who()
        "#,
    );
    assert_eq!(inside, "local");
    assert_eq!(outside, "global");
}

/// Test: inclusion removes global visibility, omitted entities stay global
#[test]
fn test_inclusion_is_explicit() {
    let mut h = ScriptHarness::new();
    h.run(
        r#"
        local point = Class "point"
        local shape = Trait "shape"
        Class "helper"
        Namespace "geo" { point, shape }
        "#,
    );

    let registry = h.registry();
    assert!(!registry.exists("point"));
    assert!(!registry.exists("shape"));
    assert!(registry.exists("helper"));
    assert!(registry.exists("geo"));

    let same: bool = h.eval(r#"return Namespace("geo").point ~= nil and Namespace("geo").helper == nil"#);
    assert!(same);

    // A fresh global declaration under the moved name is a different class
    let fresh: bool = h.eval(r#"return Class "point" ~= Namespace("geo").point"#);
    assert!(fresh);
}

/// Test: include() appends to an existing namespace
#[test]
fn test_include_appends() {
    let mut h = ScriptHarness::new();

    let names: String = h.eval(
        r#"
        local a, b, c = Class "a", Class "b", Trait "c"
        local ns = Namespace "ns" { a }
        ns:include(b, c)
        Namespace "ns" :include { Class "d" }
        local found = {}
        for _, n in ipairs({ "a", "b", "c", "d" }) do
            if ns[n] ~= nil then table.insert(found, n) end
        end
        return table.concat(found, ",")
        "#,
    );
    assert_eq!(names, "a,b,c,d");
}

/// Test: nested namespaces move as a subtree and resolve outwards
#[test]
fn test_nested_resolution() {
    let mut h = ScriptHarness::new();

    let result: String = h.eval(
        r#"
        local outer = Namespace "outer"
        outer:Trait "shared" :method { origin = function() return "outer" end }
        local inner = outer:Namespace "inner"
        inner:Class "leaf" :implements "shared"
        return tostring(inner) .. " " .. outer.inner.leaf():origin()
        "#,
    );
    assert_eq!(result, "namespace: outer.inner outer");

    let moved: bool = h.eval(
        r#"
        local box = Namespace "box"
        local detached = Namespace "detached"
        detached:Class "thing"
        box { detached }
        return Namespace("box").detached.thing ~= nil
        "#,
    );
    assert!(moved);
    assert!(!h.registry().exists("detached"));
}

/// Test: including into another namespace moves the entity
#[test]
fn test_include_moves_entity() {
    let mut h = ScriptHarness::new();

    let (in_a, in_b): (bool, bool) = h.eval(
        r#"
        local c = Class "c"
        local a = Namespace "a" { c }
        local b = Namespace "b" { c }
        return a.c ~= nil, b.c == c
        "#,
    );
    assert!(!in_a);
    assert!(in_b);
}

/// Test: a by-name reference fails once the trait moves out of reach
#[test]
fn test_ordering_hazard() {
    let mut h = ScriptHarness::new();
    h.run(
        r#"
        local helper = Trait "helper" :method { help = function() return "helped" end }
        Class "by_name" :implements "helper"
        Class "by_ref" :implements(helper)
        Namespace "elsewhere" { helper }
        "#,
    );

    h.expect_error(r#"Class "by_name"():help()"#, "unresolved trait reference 'helper'");
    let ok: String = h.eval(r#"return Class "by_ref"():help()"#);
    assert_eq!(ok, "helped");
}

/// Test: a name bound only inside a namespace resolves once the referrer
/// is included next to it
#[test]
fn test_deferred_inclusion_resolves() {
    let mut h = ScriptHarness::new();

    let area: i64 = h.eval(
        r#"
        local geo = Namespace "geo"
        geo:Trait "shape" :method { area = function(self) return self.w * self.h end }
        geo {
            Class "rect"
                :implements "shape"
                :constructor(function(self, w, h) self.w, self.h = w, h end),
        }
        return geo.rect(3, 4):area()
        "#,
    );
    assert_eq!(area, 12);

    // Left outside the namespace, the same reference fails on first use
    h.run(r#"Class "stray" :implements "shape""#);
    h.expect_error(r#"Class "stray"()"#, "unresolved trait reference 'shape'");
}

/// Test: name conflicts and cycles are rejected
#[test]
fn test_namespace_conflicts() {
    let mut h = ScriptHarness::new();

    h.run(r#"Class "taken""#);
    h.expect_error(r#"Namespace "taken""#, "already bound to a class");

    h.run(r#"local ns = Namespace "ns"; ns:Trait "x""#);
    h.expect_error(r#"Namespace "ns" { Class "x" }"#, "namespace 'ns'");

    h.expect_error(
        r#"local outer = Namespace "o"; local inner = outer:Namespace "i"; inner { outer }"#,
        "circular reference",
    );
}

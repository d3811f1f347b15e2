//! Declaration scenario tests
//!
//! Tests reopening entities, merging member tables and name conflicts

use crate::harness::ScriptHarness;

/// Test: declaring the same class twice yields one shared class
#[test]
fn test_redeclaration_reopens() {
    let mut h = ScriptHarness::new();

    let (same, value): (bool, i64) = h.eval(
        r#"
        local first = Class "counter"
        local second = Class "counter"
        second :static { start = 10 }
        return first == second, first.start
        "#,
    );
    assert!(same);
    assert_eq!(value, 10);
    assert_eq!(h.registry().len(), 1);
    assert_eq!(h.metering().declarations(), 1);
}

/// Test: static tables from separate calls merge, later values win
#[test]
fn test_static_members_union() {
    let mut h = ScriptHarness::new();

    let (a, b, c): (i64, i64, i64) = h.eval(
        r#"
        Class "cfg" :static { a = 1, b = 2 }
        Class "cfg" :static { b = 20, c = 30 }
        local cfg = Class "cfg"
        return cfg.a, cfg.b, cfg.c
        "#,
    );
    assert_eq!((a, b, c), (1, 20, 30));
}

/// Test: statics can be assigned on the class and read through children
#[test]
fn test_static_assignment_and_inheritance() {
    let mut h = ScriptHarness::new();

    let (own, inherited, missing): (i64, i64, bool) = h.eval(
        r#"
        local base = Class "base"
        base.limit = 5
        Class "child" :extends "base"
        return base.limit, Class("child").limit, Class("child").nothing == nil
        "#,
    );
    assert_eq!(own, 5);
    assert_eq!(inherited, 5);
    assert!(missing);
}

/// Test: configuration method names win over same-named statics
#[test]
fn test_configuration_names_take_precedence() {
    let mut h = ScriptHarness::new();

    let kind: String = h.eval(
        r#"
        Class "odd" :static { method = "shadowed?" }
        return type(Class("odd").method)
        "#,
    );
    assert_eq!(kind, "function");
}

/// Test: a name can only hold one kind of entity per scope
#[test]
fn test_kind_collisions() {
    let mut h = ScriptHarness::new();
    h.run(r#"Trait "shape""#);

    h.expect_error(r#"Class "shape""#, "cannot declare class 'shape' in global scope");
    h.expect_error(r#"Namespace "shape""#, "already bound to a trait");

    // Scoped declarations do not collide with globals
    let ok: bool = h.eval(r#"local ns = Namespace "scope"; return ns:Class "shape" ~= nil"#);
    assert!(ok);
}

/// Test: declarations, instances and super-views are metered
#[test]
fn test_metering_and_output() {
    let mut h = ScriptHarness::with_vectors();
    assert_eq!(h.metering().declarations(), 3);

    h.run(
        r#"
        local v = Class "vec4"(1, 2, 3, 4)
        print(v)
        print(v:super())
        "#,
    );
    assert_eq!(h.output(), vec!["vec4(1, 2, 3, 4)", "vec3(1, 2, 3)"]);
    assert_eq!(h.metering().instances(), 1);
    assert_eq!(h.metering().super_views(), 1);
}

/// Test: a runaway constructor is stopped by the sandbox
#[test]
fn test_runaway_constructor_hits_limit() {
    let mut h = ScriptHarness::with_config(classkit::SandboxConfig {
        max_instructions: 10_000,
        ..Default::default()
    });
    h.run(r#"Class "spin" :constructor(function(self) while true do end end)"#);
    h.expect_error(r#"Class "spin"()"#, "instruction limit exceeded");
    assert_eq!(h.metering().instances(), 0);
}

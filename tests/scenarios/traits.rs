//! Trait composition scenario tests

use crate::harness::ScriptHarness;

/// Test: the most recently implemented trait wins, local members win over both
#[test]
fn test_last_implemented_trait_wins() {
    let mut h = ScriptHarness::new();
    h.run(
        r#"
        Trait "loud" :method { speak = function() return "LOUD" end }
        Trait "quiet" :method { speak = function() return "quiet" end }
        Class "a" :implements "loud" :implements "quiet"
        Class "b" :implements "quiet" :implements "loud"
        Class "c" :implements("loud", "quiet")
            :method { speak = function() return "own" end }
        "#,
    );

    let (a, b, c): (String, String, String) = h.eval(
        r#"return Class "a"():speak(), Class "b"():speak(), Class "c"():speak()"#,
    );
    assert_eq!(a, "quiet");
    assert_eq!(b, "LOUD");
    assert_eq!(c, "own");
}

/// Test: traits composed of traits are flattened into the consumer
#[test]
fn test_transitive_composition() {
    let mut h = ScriptHarness::new();

    let result: String = h.eval(
        r#"
        Trait "named" :method { name = function(self) return self.n end }
        Trait "greeter" :implements "named"
            :method { greet = function(self) return "hello " .. self:name() end }
            :static { greeting = "hello" }
        Class "person" :implements "greeter"
            :constructor(function(self, n) self.n = n end)
        return Class "person"("ada"):greet() .. "/" .. Class("person").greeting
        "#,
    );
    assert_eq!(result, "hello ada/hello");
}

/// Test: trait hooks drive operators on instances
#[test]
fn test_trait_metamethods() {
    let mut h = ScriptHarness::new();

    let s: String = h.eval(
        r#"
        Trait "printable" :meta {
            __tostring = function(self) return "<" .. self.label .. ">" end,
        }
        Class "tag" :implements "printable"
            :constructor(function(self, label) self.label = label end)
        return tostring(Class "tag"("x"))
        "#,
    );
    assert_eq!(s, "<x>");
}

/// Test: parents' traits are found after the child's own chain
#[test]
fn test_traits_through_parent() {
    let mut h = ScriptHarness::new();

    let (inherited, overridden): (String, String) = h.eval(
        r#"
        Trait "walker" :method {
            move = function() return "walk" end,
            rest = function() return "sit" end,
        }
        Trait "swimmer" :method { move = function() return "swim" end }
        Class "animal" :implements "walker"
        Class "duck" :extends "animal" :implements "swimmer"
        local d = Class "duck"()
        return d:rest(), d:move()
        "#,
    );
    assert_eq!(inherited, "sit");
    assert_eq!(overridden, "swim");
}

/// Test: implementing the same trait twice fails
#[test]
fn test_duplicate_implementation() {
    let mut h = ScriptHarness::new();
    h.run(r#"Trait "t"; Class "c" :implements "t""#);
    h.expect_error(r#"Class "c" :implements "t""#, "already implements trait 't'");

    // A handle and a name for the same trait are a duplicate too
    h.expect_error(
        r#"Class "d" :implements "t" :implements(Trait "t")"#,
        "already implements trait 't'",
    );
    h.expect_error(
        r#"local t = Trait "t"; Class "e" :implements(t) :implements "t""#,
        "already implements trait 't'",
    );

    // The first implements stuck, so d is still usable
    let ok: bool = h.eval(r#"return Class "d"() ~= nil"#);
    assert!(ok);
}

/// Test: a member added to a trait after first use reaches its consumers
#[test]
fn test_late_trait_members_visible() {
    let mut h = ScriptHarness::new();
    h.run(
        r#"
        local t = Trait "t"
        Trait "outer" :implements(t)
        Class "c" :implements "outer"
        local _ = Class "c"()
        t :method { m = function() return "late" end }
        "#,
    );

    let (fresh, earlier): (String, String) = h.eval(
        r#"
        local early = Class "c"()
        Trait "t" :method { n = function() return "later" end }
        return Class "c"():m(), early:n()
        "#,
    );
    assert_eq!(fresh, "late");
    assert_eq!(earlier, "later");
}

/// Test: by-name references must resolve to traits when declared
#[test]
fn test_wrong_kind_reference() {
    let mut h = ScriptHarness::new();
    h.run(r#"Class "not_a_trait""#);
    h.expect_error(
        r#"Class "c" :implements "not_a_trait""#,
        "'not_a_trait' is a class, expected a trait",
    );
    h.expect_error(
        r#"Trait "u" :implements "nowhere""#,
        "unresolved trait reference 'nowhere'",
    );
    h.expect_error(
        r#"Trait "a"; Trait "b" :implements "a"; Trait "a" :implements "b""#,
        "circular reference",
    );

    h.expect_error(r#"Class "e" :implements(42)"#, "expected a trait or trait name");
}

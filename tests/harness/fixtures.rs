//! Lua preludes shared by scenarios

/// Three-level vector hierarchy. Each constructor stores only its own
/// component; ancestors' constructors fill in the rest. Each class renders
/// and compares only the components it knows about.
pub const VECTORS: &str = r#"
Class "vec2"
    :constructor(function(self, x, y)
        self.x = x
        self.y = y
    end)
    :method {
        length2 = function(self) return self.x * self.x + self.y * self.y end,
    }
    :meta {
        __tostring = function(self) return "vec2(" .. self.x .. ", " .. self.y .. ")" end,
        __eq = function(a, b) return a.x == b.x and a.y == b.y end,
        __add = function(a, b) return Class "vec2"(a.x + b.x, a.y + b.y) end,
    }

Class "vec3" :extends "vec2"
    :constructor(function(self, x, y, z)
        self.z = z
    end)
    :method {
        length2 = function(self)
            return self.x * self.x + self.y * self.y + self.z * self.z
        end,
    }
    :meta {
        __tostring = function(self)
            return "vec3(" .. self.x .. ", " .. self.y .. ", " .. self.z .. ")"
        end,
        __eq = function(a, b) return a.x == b.x and a.y == b.y and a.z == b.z end,
    }

Class "vec4" :extends "vec3"
    :constructor(function(self, x, y, z, w)
        self.w = w
    end)
    :meta {
        __tostring = function(self)
            return "vec4(" .. self.x .. ", " .. self.y .. ", " .. self.z .. ", " .. self.w .. ")"
        end,
    }
"#;

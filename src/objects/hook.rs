//! Operator hooks (metamethods) that classes and traits may define
//!
//! Lua operator syntax is wired to exactly this set; see the instance
//! userdata in `lua::bindings`.

use std::fmt;
use std::str::FromStr;

use super::ClassError;

/// Member-access metamethods owned by the object model itself
pub const RESERVED_METAMETHODS: [&str; 2] = ["__index", "__newindex"];

/// An operator hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Unm,
    IDiv,
    BAnd,
    BOr,
    BXor,
    BNot,
    Shl,
    Shr,
    Concat,
    Len,
    Eq,
    Lt,
    Le,
    Call,
    ToString,
}

impl Hook {
    /// Every hook, in wiring order
    pub const ALL: [Hook; 21] = [
        Hook::Add,
        Hook::Sub,
        Hook::Mul,
        Hook::Div,
        Hook::Mod,
        Hook::Pow,
        Hook::Unm,
        Hook::IDiv,
        Hook::BAnd,
        Hook::BOr,
        Hook::BXor,
        Hook::BNot,
        Hook::Shl,
        Hook::Shr,
        Hook::Concat,
        Hook::Len,
        Hook::Eq,
        Hook::Lt,
        Hook::Le,
        Hook::Call,
        Hook::ToString,
    ];

    /// The Lua metamethod name
    pub fn name(self) -> &'static str {
        match self {
            Hook::Add => "__add",
            Hook::Sub => "__sub",
            Hook::Mul => "__mul",
            Hook::Div => "__div",
            Hook::Mod => "__mod",
            Hook::Pow => "__pow",
            Hook::Unm => "__unm",
            Hook::IDiv => "__idiv",
            Hook::BAnd => "__band",
            Hook::BOr => "__bor",
            Hook::BXor => "__bxor",
            Hook::BNot => "__bnot",
            Hook::Shl => "__shl",
            Hook::Shr => "__shr",
            Hook::Concat => "__concat",
            Hook::Len => "__len",
            Hook::Eq => "__eq",
            Hook::Lt => "__lt",
            Hook::Le => "__le",
            Hook::Call => "__call",
            Hook::ToString => "__tostring",
        }
    }

    /// Binary hooks may be found on either operand
    pub fn is_binary(self) -> bool {
        !matches!(
            self,
            Hook::Unm | Hook::BNot | Hook::Len | Hook::Call | Hook::ToString
        )
    }

    /// Comparison hooks produce a boolean
    pub fn is_comparison(self) -> bool {
        matches!(self, Hook::Eq | Hook::Lt | Hook::Le)
    }
}

impl FromStr for Hook {
    type Err = ClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if RESERVED_METAMETHODS.contains(&s) {
            return Err(ClassError::ReservedMetamethod(s.to_string()));
        }
        Hook::ALL
            .into_iter()
            .find(|hook| hook.name() == s)
            .ok_or_else(|| ClassError::UnknownMetamethod(s.to_string()))
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

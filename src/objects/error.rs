//! Errors raised by the object model

use thiserror::Error;

use super::EntityKind;

/// Errors that can occur while declaring, composing or resolving entities
#[derive(Debug, Error)]
pub enum ClassError {
    #[error("cannot declare {requested} '{name}' in {scope}: name is already bound to a {existing}")]
    NameCollision {
        name: String,
        existing: EntityKind,
        requested: EntityKind,
        scope: String,
    },

    #[error("class '{class}' already extends '{parent}' (multiple inheritance is not supported)")]
    MultipleInheritance { class: String, parent: String },

    #[error("'{target}' already implements trait '{trait_name}'")]
    DuplicateImplementation { target: String, trait_name: String },

    #[error("metamethod '{0}' is reserved and cannot be overridden")]
    ReservedMetamethod(String),

    #[error("unknown metamethod '{0}'")]
    UnknownMetamethod(String),

    #[error("unresolved {kind} reference '{name}' in {scope}")]
    UnresolvedReference {
        name: String,
        kind: EntityKind,
        scope: String,
    },

    #[error("'{name}' is a {found}, expected a {expected}")]
    WrongKind {
        name: String,
        expected: EntityKind,
        found: EntityKind,
    },

    #[error("circular reference through '{name}'")]
    CircularReference { name: String },

    #[error("invalid member '{member}' on '{owner}': {reason}")]
    InvalidMember {
        owner: String,
        member: String,
        reason: String,
    },

    #[error("Lua error: {0}")]
    Lua(#[from] mlua::Error),
}

impl From<ClassError> for mlua::Error {
    fn from(err: ClassError) -> Self {
        match err {
            // Errors that came out of Lua go back in unchanged
            ClassError::Lua(e) => e,
            other => mlua::Error::external(other),
        }
    }
}

use graycfg_core::GrayCfgError;
use thiserror::Error;

use crate::ValueKind;

#[derive(Error, Debug)]
pub enum BindingError {
    #[error("Cannot convert \"{value}\" to {kind}: {reason}")]
    Conversion {
        value: String,
        kind: ValueKind,
        reason: String,
    },

    #[error("Setter {owner}.{setter} expects exactly 1 parameter, found {found}")]
    SetterArity {
        owner: String,
        setter: String,
        found: usize,
    },

    #[error("{owner} has no writable member '{member}'")]
    UnknownMember { owner: String, member: String },

    #[error("Expected a {expected} value, got {actual}")]
    TypeMismatch { expected: ValueKind, actual: ValueKind },

    #[error("Update rejected by {target}: {reason}")]
    Update { target: String, reason: String },

    #[error(transparent)]
    Resolve(#[from] GrayCfgError),
}

impl BindingError {
    pub fn unknown_member(owner: &str, member: &str) -> Self {
        Self::UnknownMember {
            owner: owner.to_string(),
            member: member.to_string(),
        }
    }

    pub fn rejected(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Update {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BindingError>;

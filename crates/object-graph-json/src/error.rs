use object_graph::HeapError;
use thiserror::Error;

use crate::node::Id;

/// Everything that can go wrong while decoding a node tree.
///
/// All variants except [`DecodeError::InvalidHookReturn`] and
/// [`DecodeError::InvalidJson`] describe malformed input and are handed to
/// the decoder's [`FailureHooks`](crate::FailureHooks) before they can abort
/// a decode.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("{subject} is missing id")]
    MissingIdentifier { subject: String },

    #[error("{subject} is missing {field}")]
    MissingField { subject: String, field: &'static str },

    #[error("unrecognized builtin name [{0}]")]
    UnknownBuiltinName(String),

    #[error("error parsing bigint [{text}]: {reason}")]
    MalformedNumericText { text: String, reason: String },

    #[error("symbol with id [{id}] has different description [{found}] than existing symbol with that id [{existing}]")]
    TokenDescriptionConflict {
        id: Id,
        found: String,
        existing: String,
    },

    #[error("id [{0}] has already been seen on another array, function, object, or symbol")]
    DuplicateDefinition(Id),

    #[error("id [{0}] was first encountered on a ref")]
    PrematureReference(Id),

    #[error("ref id [{0}] has no bound value")]
    DanglingReference(Id),

    #[error("{0}")]
    AmbiguousAttribute(&'static str),

    #[error("function with id [{id}] could not be constructed: {reason}")]
    UnparseableCallableSource { id: Id, reason: String },

    #[error("key [{0}] does not match any key encoding")]
    UnrecognizedKeyForm(String),

    #[error("key [{0}] does not refer to a symbol")]
    UnresolvedBuiltinKey(String),

    #[error("{kind} with id [{id}] has {field} property which should have been implied")]
    ImpliedField {
        kind: &'static str,
        id: Id,
        field: &'static str,
    },

    #[error("unknown type [{0}]")]
    UnknownNodeType(String),

    #[error("decoding {0} nodes is disabled")]
    KindDisabled(String),

    #[error("function with id [{0}] cannot be reconstructed without evaluating its source")]
    CallableRefused(Id),

    #[error("property accessor is neither a function nor undefined")]
    InvalidAccessor,

    #[error("prototype cannot be applied: {0}")]
    InvalidPrototype(String),

    #[error("malformed node: {0}")]
    MalformedNode(String),

    /// A failure hook broke its contract. Never routed to a hook.
    #[error("{0}")]
    InvalidHookReturn(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error(transparent)]
    Heap(#[from] HeapError),
}

impl DecodeError {
    /// `true` for errors that indicate a caller bug rather than bad input.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, DecodeError::InvalidHookReturn(_))
    }
}

use thiserror::Error;

use crate::value::{ObjectRef, SymbolRef};

/// Errors from heap operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HeapError {
    #[error("object #{} does not exist in this heap", .0.index())]
    ObjectNotFound(ObjectRef),

    #[error("symbol #{} does not exist in this heap", .0.index())]
    SymbolNotFound(SymbolRef),

    #[error("object #{} is not callable", .0.index())]
    NotCallable(ObjectRef),

    #[error("property [{0}] is not writable")]
    NotWritable(String),

    #[error("prototype chain of object #{} is cyclic", .0.index())]
    CyclicPrototype(ObjectRef),

    #[error("{0}")]
    Thrown(String),
}

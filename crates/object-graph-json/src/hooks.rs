//! Failure hooks.
//!
//! Every malformed-input failure met while decoding is handed to a
//! [`FailureHooks`] implementation, which either aborts the decode by
//! returning the error or supplies a substitute and lets decoding continue.
//! Substitutes are checked by the decoder; a substitute that breaks the
//! contract ends the decode with [`DecodeError::InvalidHookReturn`].

use object_graph::{Heap, PropertyDescriptor, PropertyKey, Value};
use serde_json::Value as JsonValue;

use crate::error::DecodeError;

/// Replacement for a node that failed to decode.
#[derive(Debug, Clone, PartialEq)]
pub enum Substitute {
    /// Use this value. Not allowed in attribute position.
    Value(Value),
    /// Use this descriptor. Only allowed in attribute position.
    Property(PropertyDescriptor),
    /// Drop the attribute; in value position this yields `undefined`.
    Omit,
}

/// Replacement for a composite key that failed to decode.
#[derive(Debug, Clone, PartialEq)]
pub enum KeySubstitute {
    Key(PropertyKey),
    /// Skip the attribute entirely.
    Omit,
}

pub trait FailureHooks {
    /// Called when `node` cannot be decoded. The default aborts.
    fn on_value_failure(
        &mut self,
        _heap: &mut Heap,
        _node: &JsonValue,
        error: DecodeError,
    ) -> Result<Substitute, DecodeError> {
        Err(error)
    }

    /// Called when `key` of `container` cannot be decoded. The default
    /// aborts.
    fn on_key_failure(
        &mut self,
        _heap: &mut Heap,
        _container: &JsonValue,
        _key: &str,
        error: DecodeError,
    ) -> Result<KeySubstitute, DecodeError> {
        Err(error)
    }
}

/// Aborts on the first failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnFailure;

impl FailureHooks for AbortOnFailure {}

/// Logs every failure and keeps going: failed values become `undefined`,
/// failed attributes and keys are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct LenientHooks;

impl FailureHooks for LenientHooks {
    fn on_value_failure(
        &mut self,
        _heap: &mut Heap,
        node: &JsonValue,
        error: DecodeError,
    ) -> Result<Substitute, DecodeError> {
        tracing::warn!(%error, %node, "substituting failed node");
        Ok(Substitute::Omit)
    }

    fn on_key_failure(
        &mut self,
        _heap: &mut Heap,
        _container: &JsonValue,
        key: &str,
        error: DecodeError,
    ) -> Result<KeySubstitute, DecodeError> {
        tracing::warn!(%error, key, "omitting attribute with failed key");
        Ok(KeySubstitute::Omit)
    }
}

impl<F> FailureHooks for F
where
    F: FnMut(&mut Heap, &JsonValue, DecodeError) -> Result<Substitute, DecodeError>,
{
    fn on_value_failure(
        &mut self,
        heap: &mut Heap,
        node: &JsonValue,
        error: DecodeError,
    ) -> Result<Substitute, DecodeError> {
        self(heap, node, error)
    }
}

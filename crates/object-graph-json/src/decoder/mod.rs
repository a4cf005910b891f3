//! Node tree → object graph.
//!
//! Decoding is one depth-first pass. A composite's shell is allocated and
//! registered under its id before its prototype and attributes are decoded,
//! so a `ref` met while the composite is still being filled in resolves to
//! the shell. That is how cycles come back.
//!
//! Two decoders share this dispatch and differ only in how `function` nodes
//! are handled:
//!
//! - [`SafeDecoder`] refuses them (routed to the failure hooks);
//! - [`UnsafeDecoder`] compiles their `source` with a caller-supplied
//!   [`SourceCompiler`]. Compiling runs whatever the compiler runs, during
//!   decoding, even if the callable is never invoked. Only use it on trusted
//!   input.

pub mod policy;

use std::collections::{HashMap, HashSet};

use object_graph::{registry, BigInt, Heap, ObjectRef, PropertyDescriptor, PropertyKey, Value};
use serde_json::{json, Map, Value as JsonValue};

use crate::error::DecodeError;
use crate::hooks::{AbortOnFailure, FailureHooks, KeySubstitute, Substitute};
use crate::keys::{parse_key, KeyForm};
use crate::node::{self, Id, NodeKind, DESCRIPTION, ID, NAME, PROTOTYPE, SOURCE, STRING, TYPE};
use crate::options::DecoderOptions;
use crate::property::{self, AttributeForm};

pub use policy::{CallablePolicy, CompileCallables, NativeTable, RefuseCallables, SourceCompiler};

/// Id bookkeeping for a stream of messages.
///
/// `ids` outlives a single message: pre-seed it, or keep passing the same
/// context to [`Decoder::decode_in`], to let later messages share tokens and
/// entities with earlier ones. `seen` holds the ids defined in the current
/// message; a `ref` may only point at those.
#[derive(Debug, Clone, Default)]
pub struct DecodeContext {
    pub ids: HashMap<Id, Value>,
    pub seen: HashSet<Id>,
}

impl DecodeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids(ids: HashMap<Id, Value>) -> Self {
        Self {
            ids,
            seen: HashSet::new(),
        }
    }

    /// Forgets which ids the current message has defined.
    pub fn begin_message(&mut self) {
        self.seen.clear();
    }

    pub fn get(&self, id: Id) -> Option<&Value> {
        self.ids.get(&id)
    }
}

/// Decoder that never evaluates stored source text.
pub type SafeDecoder = Decoder<RefuseCallables>;

/// Decoder that rebuilds callables by compiling their source with `C`.
pub type UnsafeDecoder<C> = Decoder<CompileCallables<C>>;

/// Base dispatch, parameterised by the callable policy.
pub struct Decoder<P> {
    pub options: DecoderOptions,
    hooks: Box<dyn FailureHooks>,
    policy: P,
}

impl Default for SafeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SafeDecoder {
    pub fn new() -> Self {
        Self::with_policy(RefuseCallables)
    }
}

impl<C: SourceCompiler> UnsafeDecoder<C> {
    pub fn new(compiler: C) -> Self {
        Self::with_policy(CompileCallables::new(compiler))
    }
}

impl<P: CallablePolicy> Decoder<P> {
    pub fn with_policy(policy: P) -> Self {
        Self {
            options: DecoderOptions::default(),
            hooks: Box::new(AbortOnFailure),
            policy,
        }
    }

    pub fn with_options(mut self, options: DecoderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_hooks(mut self, hooks: impl FailureHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    // ----------------------------------------------------------------
    // Public decode entry-points

    /// Decodes a standalone message into `heap`.
    pub fn decode(&mut self, heap: &mut Heap, node: &JsonValue) -> Result<Value, DecodeError> {
        self.decode_in(heap, node, &mut DecodeContext::new())
    }

    /// Decodes the next message of a stream. `context.ids` is kept and
    /// extended; `context.seen` starts empty.
    pub fn decode_in(
        &mut self,
        heap: &mut Heap,
        node: &JsonValue,
        context: &mut DecodeContext,
    ) -> Result<Value, DecodeError> {
        context.begin_message();
        self.decode_continuing(heap, node, context)
    }

    /// Decodes `node` as more of the message already in progress in
    /// `context`: ids the message has defined so far stay referable.
    pub fn decode_continuing(
        &mut self,
        heap: &mut Heap,
        node: &JsonValue,
        context: &mut DecodeContext,
    ) -> Result<Value, DecodeError> {
        tracing::debug!(known_ids = context.ids.len(), seen = context.seen.len(), "decode");
        Pass {
            decoder: self,
            heap,
            context,
        }
        .decode_value(node)
    }

    /// Convenience: parse JSON text, then [`decode`](Self::decode).
    pub fn decode_str(&mut self, heap: &mut Heap, text: &str) -> Result<Value, DecodeError> {
        let node: JsonValue =
            serde_json::from_str(text).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
        self.decode(heap, &node)
    }
}

/// State of one message.
struct Pass<'a, P> {
    decoder: &'a mut Decoder<P>,
    heap: &'a mut Heap,
    context: &'a mut DecodeContext,
}

impl<P: CallablePolicy> Pass<'_, P> {
    // ----------------------------------------------------------------
    // Core dispatch

    fn decode_value(&mut self, node: &JsonValue) -> Result<Value, DecodeError> {
        let map = match node {
            JsonValue::Null => return Ok(Value::Null),
            JsonValue::Bool(b) => return Ok(Value::Bool(*b)),
            JsonValue::Number(n) => return Ok(Value::Number(n.as_f64().unwrap_or(f64::NAN))),
            JsonValue::String(s) => return Ok(Value::String(s.clone())),
            JsonValue::Array(_) => {
                return self.value_failure(
                    node,
                    DecodeError::MalformedNode("a JSON array is not a node".to_string()),
                )
            }
            JsonValue::Object(map) => map,
        };

        let kind = NodeKind::of(map);
        if !self.decoder.options.is_enabled(&kind) {
            return self.value_failure(node, DecodeError::KindDisabled(kind.name().to_string()));
        }
        match &kind {
            NodeKind::Builtin => self.decode_builtin(node, map),
            NodeKind::Bigint => self.decode_bigint(node, map),
            NodeKind::Symbol => self.decode_symbol(node, map),
            NodeKind::Array | NodeKind::Function | NodeKind::Object => {
                self.decode_composite(node, map, &kind)
            }
            NodeKind::Ref => self.decode_ref(node, map),
            NodeKind::Property => self.value_failure(
                node,
                DecodeError::MalformedNode("property node outside an attribute".to_string()),
            ),
            NodeKind::Unknown(type_name) => {
                self.value_failure(node, DecodeError::UnknownNodeType(type_name.clone()))
            }
        }
    }

    // ----------------------------------------------------------------
    // Context-free nodes

    fn decode_builtin(&mut self, node: &JsonValue, map: &Map<String, JsonValue>) -> Result<Value, DecodeError> {
        let Some(name) = map.get(NAME).and_then(JsonValue::as_str) else {
            return self.value_failure(
                node,
                DecodeError::MissingField {
                    subject: "builtin".to_string(),
                    field: NAME,
                },
            );
        };
        match registry().value_of(name) {
            Some(value) => Ok(value),
            None => self.value_failure(node, DecodeError::UnknownBuiltinName(name.to_string())),
        }
    }

    fn decode_bigint(&mut self, node: &JsonValue, map: &Map<String, JsonValue>) -> Result<Value, DecodeError> {
        let Some(text) = map.get(STRING).and_then(JsonValue::as_str) else {
            return self.value_failure(
                node,
                DecodeError::MissingField {
                    subject: "bigint".to_string(),
                    field: STRING,
                },
            );
        };
        match text.parse::<BigInt>() {
            Ok(value) => Ok(Value::BigInt(value)),
            Err(err) => self.value_failure(
                node,
                DecodeError::MalformedNumericText {
                    text: text.to_string(),
                    reason: err.to_string(),
                },
            ),
        }
    }

    // ----------------------------------------------------------------
    // Tokens and references

    fn decode_symbol(&mut self, node: &JsonValue, map: &Map<String, JsonValue>) -> Result<Value, DecodeError> {
        let Some(id) = map.get(ID).and_then(Id::from_json) else {
            return self.value_failure(
                node,
                DecodeError::MissingIdentifier {
                    subject: "symbol".to_string(),
                },
            );
        };
        let description = map.get(DESCRIPTION).and_then(JsonValue::as_str);

        if let Some(existing) = self.context.ids.get(&id).cloned() {
            let Value::Symbol(symbol) = existing else {
                return self.value_failure(node, DecodeError::DuplicateDefinition(id));
            };
            let existing_description = match self.heap.symbol_description(symbol) {
                Ok(existing_description) => existing_description,
                Err(err) => {
                    return self.value_failure(
                        node,
                        DecodeError::MalformedNode(format!("symbol with id [{id}] is not usable: {err}")),
                    )
                }
            };
            if existing_description != description {
                let found = description.unwrap_or("undefined").to_string();
                let existing = existing_description.unwrap_or("undefined").to_string();
                return self.value_failure(
                    node,
                    DecodeError::TokenDescriptionConflict { id, found, existing },
                );
            }
            self.context.seen.insert(id);
            return Ok(Value::Symbol(symbol));
        }

        let symbol = self.heap.alloc_symbol(description.map(str::to_string));
        self.context.ids.insert(id, Value::Symbol(symbol));
        self.context.seen.insert(id);
        Ok(Value::Symbol(symbol))
    }

    fn decode_ref(&mut self, node: &JsonValue, map: &Map<String, JsonValue>) -> Result<Value, DecodeError> {
        let Some(id) = map.get(ID).and_then(Id::from_json) else {
            return self.value_failure(
                node,
                DecodeError::MissingIdentifier {
                    subject: "ref".to_string(),
                },
            );
        };
        if !self.context.seen.contains(&id) {
            return self.value_failure(node, DecodeError::PrematureReference(id));
        }
        match self.context.ids.get(&id) {
            Some(value) if self.heap.owns(value) => {
                tracing::trace!(%id, "ref");
                Ok(value.clone())
            }
            Some(_) => self.value_failure(
                node,
                DecodeError::MalformedNode(format!("ref id [{id}] is bound to a value outside the heap")),
            ),
            None => self.value_failure(node, DecodeError::DanglingReference(id)),
        }
    }

    // ----------------------------------------------------------------
    // Composites

    fn decode_composite(
        &mut self,
        node: &JsonValue,
        map: &Map<String, JsonValue>,
        kind: &NodeKind,
    ) -> Result<Value, DecodeError> {
        let Some(id) = map.get(ID).and_then(Id::from_json) else {
            return self.value_failure(
                node,
                DecodeError::MissingIdentifier {
                    subject: kind.name().to_string(),
                },
            );
        };

        if *kind == NodeKind::Array {
            for field in [PROTOTYPE, ".length"] {
                if map.contains_key(field) {
                    return self.value_failure(
                        node,
                        DecodeError::ImpliedField {
                            kind: "array",
                            id,
                            field,
                        },
                    );
                }
            }
        }

        let source = match kind {
            NodeKind::Function => match map.get(SOURCE).and_then(JsonValue::as_str) {
                Some(source) if !source.is_empty() => Some(source),
                _ => {
                    return self.value_failure(
                        node,
                        DecodeError::MissingField {
                            subject: format!("function with id [{id}]"),
                            field: SOURCE,
                        },
                    )
                }
            },
            _ => None,
        };

        if self.context.seen.contains(&id) {
            return self.value_failure(node, DecodeError::DuplicateDefinition(id));
        }

        let shell = match source {
            Some(source) => match self.decoder.policy.reconstruct(self.heap, id, source) {
                Ok(function) => function,
                Err(err) => return self.value_failure(node, err),
            },
            None if *kind == NodeKind::Array => self.heap.alloc_array(),
            None => self.heap.alloc_plain_object(),
        };
        self.context.ids.insert(id, Value::Object(shell));
        self.context.seen.insert(id);
        tracing::trace!(%id, kind = kind.name(), "define");

        if let Some(prototype) = map.get(PROTOTYPE) {
            self.apply_prototype(node, shell, prototype)?;
        }
        self.apply_attributes(node, map, shell)?;
        Ok(Value::Object(shell))
    }

    fn apply_prototype(
        &mut self,
        node: &JsonValue,
        shell: ObjectRef,
        prototype: &JsonValue,
    ) -> Result<(), DecodeError> {
        let error = match self.decode_value(prototype)? {
            Value::Null => return Ok(self.heap.set_prototype_of(shell, None)?),
            Value::Object(parent) => match self.heap.set_prototype_of(shell, Some(parent)) {
                Ok(()) => return Ok(()),
                Err(err) => DecodeError::InvalidPrototype(err.to_string()),
            },
            _ => DecodeError::InvalidPrototype("prototype must be an object or null".to_string()),
        };
        match self.value_failure(node, error)? {
            Value::Null => Ok(self.heap.set_prototype_of(shell, None)?),
            Value::Object(parent) => self.heap.set_prototype_of(shell, Some(parent)).map_err(|err| {
                DecodeError::InvalidHookReturn(format!(
                    "on_value_failure returned an unusable prototype: {err}"
                ))
            }),
            // Anything else keeps the implied prototype.
            _ => Ok(()),
        }
    }

    fn apply_attributes(
        &mut self,
        node: &JsonValue,
        map: &Map<String, JsonValue>,
        shell: ObjectRef,
    ) -> Result<(), DecodeError> {
        for (raw_key, attribute) in map {
            let key = match parse_key(raw_key) {
                KeyForm::Structural => continue,
                KeyForm::Named(name) => Some(PropertyKey::from(name)),
                KeyForm::Builtin(name) => {
                    let synthetic = node::builtin(name);
                    self.decode_symbol_key(node, raw_key, &synthetic)?
                }
                KeyForm::Token { id: None, .. } => self.key_failure(
                    node,
                    raw_key,
                    DecodeError::MissingIdentifier {
                        subject: format!("key [{raw_key}]"),
                    },
                )?,
                KeyForm::Token {
                    id: Some(id),
                    description,
                } => {
                    let mut synthetic = json!({ TYPE: "symbol", ID: id.0 });
                    if let (Some(description), Some(fields)) = (description, synthetic.as_object_mut()) {
                        fields.insert(DESCRIPTION.to_string(), JsonValue::from(description));
                    }
                    self.decode_symbol_key(node, raw_key, &synthetic)?
                }
                KeyForm::Unrecognized => self.key_failure(
                    node,
                    raw_key,
                    DecodeError::UnrecognizedKeyForm(raw_key.clone()),
                )?,
            };
            let Some(key) = key else {
                continue;
            };
            if let Some(descriptor) = self.decode_attribute(attribute)? {
                self.heap.define_property(shell, key, descriptor)?;
            }
        }
        Ok(())
    }

    /// Resolves a `@name` or `~id|desc` key through the value decoders, then
    /// falls back to the key hook if the result is not a symbol.
    fn decode_symbol_key(
        &mut self,
        container: &JsonValue,
        raw_key: &str,
        synthetic: &JsonValue,
    ) -> Result<Option<PropertyKey>, DecodeError> {
        match self.decode_value(synthetic)? {
            Value::Symbol(symbol) => Ok(Some(PropertyKey::Symbol(symbol))),
            _ => self.key_failure(
                container,
                raw_key,
                DecodeError::UnresolvedBuiltinKey(raw_key.to_string()),
            ),
        }
    }

    /// Decodes an attribute value into a descriptor. `None` means the hooks
    /// chose to drop the attribute.
    fn decode_attribute(&mut self, attribute: &JsonValue) -> Result<Option<PropertyDescriptor>, DecodeError> {
        let Some(fields) = attribute.as_object().filter(|_| node::is_property_node(attribute)) else {
            let value = self.decode_value(attribute)?;
            return Ok(Some(PropertyDescriptor::data(value)));
        };
        let form = match property::parse_attribute(fields) {
            Ok(form) => form,
            Err(err) => return self.attribute_failure(attribute, err),
        };
        match form {
            AttributeForm::Data {
                value,
                writable,
                enumerable,
                configurable,
            } => {
                let value = self.decode_value(value)?;
                Ok(Some(PropertyDescriptor::with_flags(
                    value,
                    writable,
                    enumerable,
                    configurable,
                )))
            }
            AttributeForm::Accessor {
                get,
                set,
                enumerable,
                configurable,
            } => {
                let (Some(get), Some(set)) = (self.decode_accessor(get)?, self.decode_accessor(set)?)
                else {
                    return self.attribute_failure(attribute, DecodeError::InvalidAccessor);
                };
                Ok(Some(PropertyDescriptor::accessor(get, set, enumerable, configurable)))
            }
        }
    }

    /// `Some(None)` for an absent or undefined half, `None` when the half is
    /// not a callable.
    fn decode_accessor(&mut self, half: Option<&JsonValue>) -> Result<Option<Option<ObjectRef>>, DecodeError> {
        let Some(half) = half else {
            return Ok(Some(None));
        };
        Ok(match self.decode_value(half)? {
            Value::Undefined => Some(None),
            Value::Object(function) if self.heap.is_callable(function) => Some(Some(function)),
            _ => None,
        })
    }

    // ----------------------------------------------------------------
    // Failure routing

    fn value_failure(&mut self, node: &JsonValue, error: DecodeError) -> Result<Value, DecodeError> {
        tracing::trace!(%error, "value failure");
        match self.decoder.hooks.on_value_failure(self.heap, node, error)? {
            Substitute::Value(value) if self.heap.owns(&value) => Ok(value),
            Substitute::Value(_) => Err(DecodeError::InvalidHookReturn(
                "on_value_failure returned a handle that does not belong to the heap".to_string(),
            )),
            Substitute::Omit => Ok(Value::Undefined),
            Substitute::Property(_) => Err(DecodeError::InvalidHookReturn(
                "on_value_failure returned a property descriptor outside an attribute".to_string(),
            )),
        }
    }

    fn attribute_failure(
        &mut self,
        attribute: &JsonValue,
        error: DecodeError,
    ) -> Result<Option<PropertyDescriptor>, DecodeError> {
        tracing::trace!(%error, "attribute failure");
        match self.decoder.hooks.on_value_failure(self.heap, attribute, error)? {
            Substitute::Property(descriptor) => {
                self.check_descriptor(&descriptor)?;
                Ok(Some(descriptor))
            }
            Substitute::Omit => Ok(None),
            Substitute::Value(_) => Err(DecodeError::InvalidHookReturn(
                "on_value_failure for a property must return a property descriptor or omit"
                    .to_string(),
            )),
        }
    }

    fn check_descriptor(&self, descriptor: &PropertyDescriptor) -> Result<(), DecodeError> {
        let valid = match descriptor {
            PropertyDescriptor::Data { value, .. } => self.heap.owns(value),
            PropertyDescriptor::Accessor { get, set, .. } => [get, set]
                .into_iter()
                .flatten()
                .all(|half| self.heap.is_callable(*half)),
        };
        if valid {
            Ok(())
        } else {
            Err(DecodeError::InvalidHookReturn(
                "on_value_failure returned a property descriptor that cannot be applied".to_string(),
            ))
        }
    }

    fn key_failure(
        &mut self,
        container: &JsonValue,
        raw_key: &str,
        error: DecodeError,
    ) -> Result<Option<PropertyKey>, DecodeError> {
        tracing::trace!(%error, "key failure");
        match self
            .decoder
            .hooks
            .on_key_failure(self.heap, container, raw_key, error)?
        {
            KeySubstitute::Omit => Ok(None),
            KeySubstitute::Key(PropertyKey::Symbol(symbol)) if !self.heap.contains_symbol(symbol) => {
                Err(DecodeError::InvalidHookReturn(format!(
                    "on_key_failure for key [{raw_key}] returned a symbol that does not belong to the heap"
                )))
            }
            KeySubstitute::Key(key) => Ok(Some(key)),
        }
    }
}

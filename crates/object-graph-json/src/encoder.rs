//! Object graph → node tree.
//!
//! An [`Encoder`] is a session: it interns every object and symbol it meets
//! under a positive id and keeps those ids across [`Encoder::encode`] calls,
//! so a stream of messages can keep referring to the same entities. Within
//! one call the first occurrence of an entity is written in full and every
//! later occurrence as `{"type":"ref","id":n}`, which is what makes cycles
//! and shared substructure finite.

use std::collections::{HashMap, HashSet};

use object_graph::{
    registry, BigInt, Heap, Intrinsic, ObjectKind, ObjectRef, PropertyDescriptor, PropertyKey,
    SymbolRef, Value, WellKnownSymbol,
};
use serde_json::{Map, Value as JsonValue};

use crate::keys;
use crate::node::{self, Id, NodeKind, DESCRIPTION, ID, PROTOTYPE, SOURCE, STRING, TYPE};
use crate::options::EncoderOptions;
use crate::property::encode_property;

/// Encoding session.
#[derive(Debug, Clone)]
pub struct Encoder {
    pub options: EncoderOptions,
    objects: HashMap<ObjectRef, Id>,
    symbols: HashMap<SymbolRef, Id>,
    next_id: u64,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    pub fn new() -> Self {
        Self::with_options(EncoderOptions::default())
    }

    pub fn with_options(options: EncoderOptions) -> Self {
        Self {
            options,
            objects: HashMap::new(),
            symbols: HashMap::new(),
            next_id: 1,
        }
    }

    // ----------------------------------------------------------------
    // Public encode entry-points

    /// Encodes `value`, whose handles point into `heap`. Never fails: values
    /// without a structural form become `unknown` marker nodes.
    pub fn encode(&mut self, heap: &Heap, value: &Value) -> JsonValue {
        tracing::debug!(next_id = self.next_id, "encode");
        let mut pass = Pass {
            encoder: self,
            heap,
            emitted: HashSet::new(),
        };
        pass.encode_value(value)
    }

    /// Convenience: encode and serialize to JSON text.
    pub fn encode_to_string(&mut self, heap: &Heap, value: &Value) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.encode(heap, value))
    }

    /// Id already assigned to `object` in this session.
    pub fn object_id(&self, object: ObjectRef) -> Option<Id> {
        self.objects.get(&object).copied()
    }

    /// Id already assigned to `symbol` in this session.
    pub fn symbol_id(&self, symbol: SymbolRef) -> Option<Id> {
        self.symbols.get(&symbol).copied()
    }

    fn mint(&mut self) -> Id {
        let id = Id(self.next_id);
        self.next_id += 1;
        id
    }

    fn intern_object(&mut self, object: ObjectRef) -> Id {
        if let Some(id) = self.objects.get(&object) {
            return *id;
        }
        let id = self.mint();
        self.objects.insert(object, id);
        id
    }

    fn intern_symbol(&mut self, symbol: SymbolRef) -> Id {
        if let Some(id) = self.symbols.get(&symbol) {
            return *id;
        }
        let id = self.mint();
        self.symbols.insert(symbol, id);
        id
    }
}

/// State of one `encode` call.
struct Pass<'a, 'h> {
    encoder: &'a mut Encoder,
    heap: &'h Heap,
    /// Ids written in full during this call.
    emitted: HashSet<Id>,
}

impl Pass<'_, '_> {
    // ----------------------------------------------------------------
    // Core dispatch

    fn encode_value(&mut self, value: &Value) -> JsonValue {
        if let Some(name) = registry().name_of(value) {
            return node::builtin(name);
        }
        match value {
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => node::number(*n),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::BigInt(b) => encode_bigint(b),
            Value::Symbol(symbol) => self.encode_symbol(*symbol),
            Value::Object(object) => self.encode_object(*object),
            Value::Opaque(type_name) => node::unknown(type_name),
            Value::Null => JsonValue::Null,
            // Registered builtin.
            Value::Undefined => node::builtin("undefined"),
        }
    }

    fn encode_symbol(&mut self, symbol: SymbolRef) -> JsonValue {
        let Ok(description) = self.heap.symbol_description(symbol) else {
            return node::unknown("symbol");
        };
        let id = self.encoder.intern_symbol(symbol);
        if !self.emitted.insert(id) {
            return node::reference(id);
        }
        let mut map = Map::new();
        map.insert(TYPE.to_string(), JsonValue::from("symbol"));
        map.insert(ID.to_string(), JsonValue::from(id.0));
        if let Some(description) = description {
            map.insert(DESCRIPTION.to_string(), JsonValue::from(description));
        }
        JsonValue::Object(map)
    }

    // ----------------------------------------------------------------
    // Composites

    fn encode_object(&mut self, object: ObjectRef) -> JsonValue {
        let heap = self.heap;
        let Ok(target) = heap.object(object) else {
            return node::unknown("object");
        };
        let id = self.encoder.intern_object(object);
        if !self.emitted.insert(id) {
            tracing::trace!(%id, "ref");
            return node::reference(id);
        }

        let kind = classify(heap, object);
        tracing::trace!(%id, kind = kind.name(), "define");

        let mut map = Map::new();
        map.insert(TYPE.to_string(), JsonValue::from(kind.name()));
        map.insert(ID.to_string(), JsonValue::from(id.0));

        let implied = match kind {
            NodeKind::Array => Intrinsic::ArrayPrototype,
            NodeKind::Function => Intrinsic::FunctionPrototype,
            _ => Intrinsic::ObjectPrototype,
        };
        if target.prototype() != Some(implied.handle()) {
            let prototype = match target.prototype() {
                Some(prototype) => self.encode_value(&Value::Object(prototype)),
                None => JsonValue::Null,
            };
            map.insert(PROTOTYPE.to_string(), prototype);
        }
        if let Some(callable) = target.callable() {
            map.insert(SOURCE.to_string(), JsonValue::from(callable.source()));
        }

        for key in target.own_keys() {
            if kind == NodeKind::Array && key.as_str() == Some("length") {
                continue;
            }
            let Some(descriptor) = target.own_property(&key) else {
                continue;
            };
            let encoded_key = self.encode_key(&key);
            let encoded = self.encode_attribute(descriptor);
            map.insert(encoded_key, encoded);
        }
        JsonValue::Object(map)
    }

    fn encode_key(&mut self, key: &PropertyKey) -> String {
        match key {
            PropertyKey::String(name) => keys::encode_named(name),
            PropertyKey::Symbol(symbol) => {
                if let Some(well_known) = WellKnownSymbol::from_handle(*symbol) {
                    return keys::encode_builtin(well_known.description());
                }
                let id = self.encoder.intern_symbol(*symbol);
                self.emitted.insert(id);
                let description = self.heap.symbol_description(*symbol).ok().flatten();
                keys::encode_token(id, description)
            }
        }
    }

    fn encode_attribute(&mut self, descriptor: &PropertyDescriptor) -> JsonValue {
        if self.encoder.options.compact_properties && descriptor.is_plain_data() {
            if let Some(value) = descriptor.value() {
                return self.encode_value(value);
            }
        }
        encode_property(descriptor, |value| self.encode_value(value))
    }
}

fn encode_bigint(value: &BigInt) -> JsonValue {
    let mut map = Map::new();
    map.insert(TYPE.to_string(), JsonValue::from("bigint"));
    map.insert(STRING.to_string(), JsonValue::from(value.to_string()));
    JsonValue::Object(map)
}

/// Picks the composite variant of `object`.
///
/// An object is written as an array only when decoding the array variant
/// would rebuild it exactly: array kind, `Array.prototype` as delegate, and
/// a standard `length` slot equal to one past the highest index.
fn classify(heap: &Heap, object: ObjectRef) -> NodeKind {
    let Ok(target) = heap.object(object) else {
        return NodeKind::Object;
    };
    match target.kind() {
        ObjectKind::Function(_) => NodeKind::Function,
        ObjectKind::Array if has_array_shape(heap, object) => NodeKind::Array,
        ObjectKind::Array | ObjectKind::Ordinary => NodeKind::Object,
    }
}

fn has_array_shape(heap: &Heap, object: ObjectRef) -> bool {
    let Ok(target) = heap.object(object) else {
        return false;
    };
    if target.prototype() != Some(Intrinsic::ArrayPrototype.handle()) {
        return false;
    }
    let length = match target.own_property(&PropertyKey::from("length")) {
        Some(PropertyDescriptor::Data {
            value: Value::Number(n),
            writable: true,
            enumerable: false,
            configurable: false,
        }) => *n,
        _ => return false,
    };
    let end = target
        .own_keys()
        .iter()
        .filter_map(PropertyKey::array_index)
        .max()
        .map(|index| f64::from(index) + 1.0)
        .unwrap_or(0.0);
    length == end
}

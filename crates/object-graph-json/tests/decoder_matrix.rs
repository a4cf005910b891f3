use std::collections::HashMap;

use object_graph::{registry, BigInt, Heap, Intrinsic, ObjectRef, PropertyDescriptor, PropertyKey, Value};
use object_graph_json::node::is_property_node;
use object_graph_json::{
    DecodeContext, DecodeError, FailureHooks, Id, SafeDecoder, Substitute,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value as JsonValue};

/// Turns every failure into the string `failure: <message>`.
struct FailureAsString;

impl FailureHooks for FailureAsString {
    fn on_value_failure(
        &mut self,
        _heap: &mut Heap,
        node: &JsonValue,
        error: DecodeError,
    ) -> Result<Substitute, DecodeError> {
        let message = Value::from(format!("failure: {error}"));
        if is_property_node(node) {
            Ok(Substitute::Property(PropertyDescriptor::data(message)))
        } else {
            Ok(Substitute::Value(message))
        }
    }
}

fn decoder() -> SafeDecoder {
    SafeDecoder::new().with_hooks(FailureAsString)
}

fn failure(message: &str) -> Value {
    Value::from(format!("failure: {message}"))
}

fn object(value: Value) -> ObjectRef {
    value.as_object().expect("decoded value is an object")
}

fn get(heap: &mut Heap, target: ObjectRef, key: &str) -> Value {
    heap.get(target, &PropertyKey::from(key)).unwrap()
}

#[test]
fn values_that_decode_to_themselves() {
    let mut heap = Heap::new();
    let mut decoder = decoder();
    let cases = [
        (json!(null), Value::Null),
        (json!(false), Value::Bool(false)),
        (json!(true), Value::Bool(true)),
        (json!(0), Value::from(0)),
        (json!(-100), Value::from(-100)),
        (json!(10.5), Value::from(10.5)),
        (json!(""), Value::from("")),
        (json!("hello"), Value::from("hello")),
    ];
    for (node, expected) in cases {
        assert_eq!(decoder.decode(&mut heap, &node).unwrap(), expected, "{node}");
    }
}

#[test]
fn default_hooks_abort() {
    let mut heap = Heap::new();
    let err = SafeDecoder::new()
        .decode(&mut heap, &json!({ "type": "builtin", "name": "garbage" }))
        .unwrap_err();
    assert_eq!(err, DecodeError::UnknownBuiltinName("garbage".into()));
    assert_eq!(err.to_string(), "unrecognized builtin name [garbage]");
}

// ---------------------------------------------------------------------------
// Builtins and bigints

#[test]
fn builtins_resolve_by_name() {
    let mut heap = Heap::new();
    let mut decoder = decoder();
    for (builtin, name) in registry().entries() {
        let decoded = decoder
            .decode(&mut heap, &json!({ "type": "builtin", "name": name }))
            .unwrap();
        assert!(decoded.same_value(&builtin.value()), "{name}");
    }
}

#[test]
fn builtin_failures() {
    let mut heap = Heap::new();
    let mut decoder = decoder();
    assert_eq!(
        decoder.decode(&mut heap, &json!({ "type": "builtin" })).unwrap(),
        failure("builtin is missing name")
    );
    assert_eq!(
        decoder
            .decode(&mut heap, &json!({ "type": "builtin", "name": "garbage" }))
            .unwrap(),
        failure("unrecognized builtin name [garbage]")
    );
}

#[test]
fn bigints() {
    let mut heap = Heap::new();
    let mut decoder = decoder();
    let expected: BigInt = "123456789012345678901234567890".parse().unwrap();
    assert_eq!(
        decoder
            .decode(
                &mut heap,
                &json!({ "type": "bigint", "string": "123456789012345678901234567890" })
            )
            .unwrap(),
        Value::BigInt(expected)
    );
    assert_eq!(
        decoder.decode(&mut heap, &json!({ "type": "bigint" })).unwrap(),
        failure("bigint is missing string")
    );
    assert_eq!(
        decoder
            .decode(&mut heap, &json!({ "type": "bigint", "string": "12x" }))
            .unwrap(),
        failure("error parsing bigint [12x]: Cannot convert 12x to a BigInt")
    );
}

// ---------------------------------------------------------------------------
// Symbols

#[test]
fn symbols() {
    let mut heap = Heap::new();
    let mut decoder = decoder();
    let decoded = decoder
        .decode(&mut heap, &json!({ "type": "symbol", "id": 1, "description": "meep" }))
        .unwrap();
    let symbol = decoded.as_symbol().unwrap();
    assert_eq!(heap.symbol_description(symbol).unwrap(), Some("meep"));

    assert_eq!(
        decoder.decode(&mut heap, &json!({ "type": "symbol" })).unwrap(),
        failure("symbol is missing id")
    );
}

#[test]
fn symbol_ids_are_bound_within_a_message() {
    let mut heap = Heap::new();
    let node = json!({
        "type": "array",
        "id": 1,
        ".0": { "type": "symbol", "id": 2, "description": "meep" },
        ".1": { "type": "symbol", "id": 2, "description": "meep" },
        ".2": { "type": "ref", "id": 2 },
        ".3": { "type": "symbol", "id": 2, "description": "moop" },
    });
    let array = object(decoder().decode(&mut heap, &node).unwrap());
    let first = get(&mut heap, array, "0");
    assert!(first.as_symbol().is_some());
    assert_eq!(get(&mut heap, array, "1"), first);
    assert_eq!(get(&mut heap, array, "2"), first);
    assert_eq!(
        get(&mut heap, array, "3"),
        failure(
            "symbol with id [2] has different description [moop] than existing symbol with that id [meep]"
        )
    );
}

#[test]
fn symbols_are_shared_across_messages_of_a_stream() {
    let mut heap = Heap::new();
    let mut decoder = decoder();
    let mut context = DecodeContext::new();
    let node = json!({ "type": "symbol", "id": 5, "description": "meep" });
    let first = decoder.decode_in(&mut heap, &node, &mut context).unwrap();
    let second = decoder.decode_in(&mut heap, &node, &mut context).unwrap();
    assert_eq!(first, second);
    assert_eq!(context.get(Id(5)), Some(&first));
}

// ---------------------------------------------------------------------------
// Arrays

#[test]
fn arrays() {
    let mut heap = Heap::new();
    let node = json!({ "type": "array", "id": 1, ".0": "hello", ".1": "world" });
    let array = object(decoder().decode(&mut heap, &node).unwrap());
    assert_eq!(heap.prototype_of(array).unwrap(), Some(Intrinsic::ArrayPrototype.handle()));
    assert_eq!(heap.array_length(array).unwrap(), Some(2));
    assert_eq!(get(&mut heap, array, "1"), Value::from("world"));
}

#[test]
fn array_failures() {
    let mut heap = Heap::new();
    let mut decoder = decoder();
    let cases = [
        (json!({ "type": "array" }), "array is missing id"),
        (
            json!({ "type": "array", "id": 1, "prototype": { "type": "builtin", "name": "Object" } }),
            "array with id [1] has prototype property which should have been implied",
        ),
        (
            json!({ "type": "array", "id": 1, ".length": 4 }),
            "array with id [1] has .length property which should have been implied",
        ),
    ];
    for (node, message) in cases {
        assert_eq!(decoder.decode(&mut heap, &node).unwrap(), failure(message));
    }
}

#[test]
fn decoding_updates_the_context() {
    let mut heap = Heap::new();
    let mut context = DecodeContext::new();
    let node = json!({ "type": "array", "id": 7 });
    let decoded = decoder().decode_in(&mut heap, &node, &mut context).unwrap();
    assert_eq!(context.get(Id(7)), Some(&decoded));
    assert!(context.seen.contains(&Id(7)));
}

// ---------------------------------------------------------------------------
// Objects

#[test]
fn objects() {
    let mut heap = Heap::new();
    let node = json!({ "type": "object", "id": 1, ".foo": "bar", ".nested": { "type": "object", "id": 2 } });
    let decoded = object(decoder().decode(&mut heap, &node).unwrap());
    assert_eq!(heap.prototype_of(decoded).unwrap(), Some(Intrinsic::ObjectPrototype.handle()));
    assert_eq!(get(&mut heap, decoded, "foo"), Value::from("bar"));
    let nested = object(get(&mut heap, decoded, "nested"));
    assert_ne!(nested, decoded);
    assert!(heap
        .own_property(decoded, &PropertyKey::from("foo"))
        .unwrap()
        .unwrap()
        .is_plain_data());
}

#[test]
fn object_prototypes() {
    let mut heap = Heap::new();
    let mut decoder = decoder();
    let node = json!({ "type": "object", "id": 1, "prototype": { "type": "builtin", "name": "Array.prototype" } });
    let decoded = object(decoder.decode(&mut heap, &node).unwrap());
    assert_eq!(heap.prototype_of(decoded).unwrap(), Some(Intrinsic::ArrayPrototype.handle()));

    let node = json!({ "type": "object", "id": 1, "prototype": null });
    let decoded = object(decoder.decode(&mut heap, &node).unwrap());
    assert_eq!(heap.prototype_of(decoded).unwrap(), None);
}

#[test]
fn self_prototype_is_refused() {
    let mut heap = Heap::new();
    let node = json!({ "type": "object", "id": 1, "prototype": { "type": "ref", "id": 1 } });
    let err = SafeDecoder::new().decode(&mut heap, &node).unwrap_err();
    assert!(matches!(err, DecodeError::InvalidPrototype(_)), "{err}");

    let node = json!({ "type": "object", "id": 1, "prototype": 4 });
    let err = SafeDecoder::new().decode(&mut heap, &node).unwrap_err();
    assert_eq!(
        err.to_string(),
        "prototype cannot be applied: prototype must be an object or null"
    );
}

#[test]
fn attribute_flags_and_accessors() {
    let mut heap = Heap::new();
    let node = json!({
        "type": "object",
        "id": 1,
        ".frozen": { "type": "property", "value": 1 },
        ".hidden": { "type": "property", "value": 2, "writable": true, "configurable": true },
        ".computed": {
            "type": "property",
            "get": { "type": "builtin", "name": "Object" },
            "enumerable": true,
        },
        ".empty": { "type": "property", "get": { "type": "builtin", "name": "undefined" } },
    });
    let decoded = object(decoder().decode(&mut heap, &node).unwrap());
    let slot = |heap: &Heap, key: &str| {
        heap.own_property(decoded, &PropertyKey::from(key))
            .unwrap()
            .cloned()
            .unwrap()
    };
    assert_eq!(slot(&heap, "frozen"), PropertyDescriptor::frozen(1));
    assert_eq!(slot(&heap, "hidden"), PropertyDescriptor::with_flags(2, true, false, true));
    assert_eq!(
        slot(&heap, "computed"),
        PropertyDescriptor::accessor(Some(Intrinsic::Object.handle()), None, true, false)
    );
    assert_eq!(slot(&heap, "empty"), PropertyDescriptor::accessor(None, None, false, false));
}

#[test]
fn attribute_failures() {
    let mut heap = Heap::new();
    let node = json!({
        "type": "object",
        "id": 1,
        ".both": { "type": "property", "value": 1, "get": { "type": "builtin", "name": "Object" } },
        ".neither": { "type": "property", "writable": true },
        ".bad": { "type": "property", "get": "not callable" },
    });
    let decoded = object(decoder().decode(&mut heap, &node).unwrap());
    assert_eq!(get(&mut heap, decoded, "both"), failure("property has both accessor and value"));
    assert_eq!(
        get(&mut heap, decoded, "neither"),
        failure("property does not have get, set, or value")
    );
    assert_eq!(
        get(&mut heap, decoded, "bad"),
        failure("property accessor is neither a function nor undefined")
    );
}

#[test]
fn duplicate_definitions() {
    let mut heap = Heap::new();
    let node = json!({ "type": "object", "id": 1, ".a": { "type": "object", "id": 1 } });
    let decoded = object(decoder().decode(&mut heap, &node).unwrap());
    assert_eq!(
        get(&mut heap, decoded, "a"),
        failure("id [1] has already been seen on another array, function, object, or symbol")
    );
}

// ---------------------------------------------------------------------------
// Refs

#[test]
fn refs_resolve_to_the_same_instance() {
    let mut heap = Heap::new();
    let node = json!({
        "type": "object",
        "id": 1,
        ".a": { "type": "object", "id": 2 },
        ".b": { "type": "ref", "id": 2 },
        ".self": { "type": "ref", "id": 1 },
    });
    let decoded = object(decoder().decode(&mut heap, &node).unwrap());
    assert_eq!(get(&mut heap, decoded, "a"), get(&mut heap, decoded, "b"));
    assert_eq!(get(&mut heap, decoded, "self"), Value::Object(decoded));
}

#[test]
fn ref_failures() {
    let mut heap = Heap::new();
    let mut decoder = decoder();
    assert_eq!(
        decoder.decode(&mut heap, &json!({ "type": "ref" })).unwrap(),
        failure("ref is missing id")
    );

    let mut seeded = DecodeContext::with_ids(HashMap::from([(Id(1), Value::from("stale"))]));
    assert_eq!(
        decoder
            .decode_in(&mut heap, &json!({ "type": "ref", "id": 1 }), &mut seeded)
            .unwrap(),
        failure("id [1] was first encountered on a ref")
    );
}

#[test]
fn continuing_a_message_keeps_its_ids() {
    let mut heap = Heap::new();
    let mut decoder = decoder();
    let mut context = DecodeContext::new();
    let first = decoder
        .decode_in(&mut heap, &json!({ "type": "object", "id": 1 }), &mut context)
        .unwrap();
    let again = decoder
        .decode_continuing(&mut heap, &json!({ "type": "ref", "id": 1 }), &mut context)
        .unwrap();
    assert_eq!(again, first);
}

#[test]
fn ref_to_a_seen_id_without_a_value() {
    let mut heap = Heap::new();
    let mut context = DecodeContext::new();
    context.seen.insert(Id(5));
    let node = json!({ "type": "ref", "id": 5 });
    assert_eq!(
        decoder().decode_continuing(&mut heap, &node, &mut context).unwrap(),
        failure("ref id [5] has no bound value")
    );
    let err = SafeDecoder::new()
        .decode_continuing(&mut heap, &node, &mut context)
        .unwrap_err();
    assert_eq!(err, DecodeError::DanglingReference(Id(5)));
}

#[test]
fn seeded_handles_from_another_heap_are_failures() {
    let mut other = Heap::new();
    let mut foreign_symbol = other.alloc_symbol(None);
    for _ in 0..32 {
        foreign_symbol = other.alloc_symbol(Some("meep".into()));
    }
    for _ in 0..32 {
        other.alloc_plain_object();
    }
    let foreign_object = other.alloc_plain_object();

    let mut heap = Heap::new();
    let mut decoder = decoder();
    let mut context = DecodeContext::with_ids(HashMap::from([
        (Id(1), Value::Symbol(foreign_symbol)),
        (Id(2), Value::Object(foreign_object)),
    ]));
    assert_eq!(
        decoder
            .decode_in(
                &mut heap,
                &json!({ "type": "symbol", "id": 1, "description": "meep" }),
                &mut context
            )
            .unwrap(),
        failure(&format!(
            "malformed node: symbol with id [1] is not usable: symbol #{} does not exist in this heap",
            foreign_symbol.index()
        ))
    );

    context.seen.insert(Id(2));
    assert_eq!(
        decoder
            .decode_continuing(&mut heap, &json!({ "type": "ref", "id": 2 }), &mut context)
            .unwrap(),
        failure("malformed node: ref id [2] is bound to a value outside the heap")
    );
}

#[test]
fn ids_may_be_digit_strings() {
    let mut heap = Heap::new();
    let node = json!({ "type": "object", "id": "3", ".me": { "type": "ref", "id": 3 } });
    let decoded = object(decoder().decode(&mut heap, &node).unwrap());
    assert_eq!(get(&mut heap, decoded, "me"), Value::Object(decoded));
}

// ---------------------------------------------------------------------------
// Everything else

#[test]
fn functions_are_refused() {
    let mut heap = Heap::new();
    let mut decoder = decoder();
    let before = heap.object_count();
    assert_eq!(
        decoder
            .decode(&mut heap, &json!({ "type": "function", "id": 1, "source": "() => 1" }))
            .unwrap(),
        failure("function with id [1] cannot be reconstructed without evaluating its source")
    );
    assert_eq!(
        decoder
            .decode(&mut heap, &json!({ "type": "function", "id": 1 }))
            .unwrap(),
        failure("function with id [1] is missing source")
    );
    assert_eq!(heap.object_count(), before);
}

#[test]
fn unknown_nodes() {
    let mut heap = Heap::new();
    let mut decoder = decoder();
    assert_eq!(
        decoder.decode(&mut heap, &json!({ "type": "weird" })).unwrap(),
        failure("unknown type [weird]")
    );
    assert_eq!(
        decoder.decode(&mut heap, &json!({})).unwrap(),
        failure("unknown type [undefined]")
    );
    assert_eq!(
        decoder
            .decode(&mut heap, &json!({ "type": "unknown", "typeof": "weakmap" }))
            .unwrap(),
        failure("unknown type [unknown]")
    );
}

#[test]
fn unrecognized_keys_abort_by_default() {
    let mut heap = Heap::new();
    let node = json!({ "type": "object", "id": 1, "constructor": { "type": "builtin", "name": "Object" } });
    let err = SafeDecoder::new().decode(&mut heap, &node).unwrap_err();
    assert_eq!(err.to_string(), "key [constructor] does not match any key encoding");
}

#[test]
fn decode_str_parses_text() {
    let mut heap = Heap::new();
    let mut decoder = SafeDecoder::new();
    let decoded = decoder
        .decode_str(&mut heap, r#"{"type":"object","id":1,".foo":"bar"}"#)
        .unwrap();
    let decoded = object(decoded);
    assert_eq!(get(&mut heap, decoded, "foo"), Value::from("bar"));
    assert!(matches!(
        decoder.decode_str(&mut heap, "{"),
        Err(DecodeError::InvalidJson(_))
    ));
}

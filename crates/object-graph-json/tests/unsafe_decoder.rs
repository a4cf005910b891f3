use std::cell::RefCell;
use std::rc::Rc;

use object_graph::{Callable, Heap, Intrinsic, PropertyDescriptor, PropertyKey, Value};
use object_graph_json::{DecodeError, Encoder, Id, NativeTable, SafeDecoder, UnsafeDecoder};
use pretty_assertions::assert_eq;
use serde_json::json;

const ADD: &str = "function add(a, b) { return a + b; }";

fn add(_heap: &mut Heap, _this: Value, args: &[Value]) -> Result<Value, String> {
    let a = args.first().and_then(Value::as_f64).ok_or("a is not a number")?;
    let b = args.get(1).and_then(Value::as_f64).ok_or("b is not a number")?;
    Ok(Value::Number(a + b))
}

fn table() -> NativeTable {
    NativeTable::new().with(ADD, add)
}

#[test]
fn functions_round_trip() {
    let mut source = Heap::new();
    let function = source.alloc_function(Callable::new(ADD, add));
    source
        .define_property(
            function,
            PropertyKey::from("name"),
            PropertyDescriptor::with_flags("add", false, false, true),
        )
        .unwrap();
    source.set(function, PropertyKey::from("self"), Value::Object(function)).unwrap();
    let node = Encoder::new().encode(&source, &Value::Object(function));

    let mut target = Heap::new();
    let decoded = UnsafeDecoder::new(table()).decode(&mut target, &node).unwrap();
    let decoded = decoded.as_object().unwrap();
    assert_eq!(
        target.prototype_of(decoded).unwrap(),
        Some(Intrinsic::FunctionPrototype.handle())
    );
    assert_eq!(
        target
            .call(decoded, Value::Undefined, &[Value::from(1), Value::from(2)])
            .unwrap(),
        Value::from(3)
    );
    assert_eq!(
        target.own_property(decoded, &PropertyKey::from("name")).unwrap().cloned(),
        Some(PropertyDescriptor::with_flags("add", false, false, true))
    );
    assert_eq!(
        target.get(decoded, &PropertyKey::from("self")).unwrap(),
        Value::Object(decoded)
    );
}

#[test]
fn function_with_prototype_and_accessor_use() {
    let node = json!({
        "type": "object",
        "id": 1,
        ".total": {
            "type": "property",
            "get": {
                "type": "function",
                "id": 2,
                "prototype": { "type": "builtin", "name": "Object" },
                "source": ADD,
            },
            "enumerable": true,
        },
    });
    let mut target = Heap::new();
    let decoded = UnsafeDecoder::new(table()).decode(&mut target, &node).unwrap();
    let object = decoded.as_object().unwrap();
    let slot = target
        .own_property(object, &PropertyKey::from("total"))
        .unwrap()
        .cloned()
        .unwrap();
    let PropertyDescriptor::Accessor { get: Some(getter), .. } = &slot else {
        panic!("expected an accessor, got {slot:?}");
    };
    assert_eq!(target.prototype_of(*getter).unwrap(), Some(Intrinsic::Object.handle()));
}

#[test]
fn compiling_runs_effects_even_if_never_called() {
    let effects = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&effects);
    let compiler = move |heap: &mut Heap, source: &str| -> Result<Callable, String> {
        log.borrow_mut().push(source.to_string());
        heap.alloc_plain_object();
        Ok(Callable::new(source, |_, _, _| Ok(Value::Undefined)))
    };

    let node = json!({ "type": "function", "id": 1, "source": "(() => { sideEffect(); return () => {}; })()" });
    let mut target = Heap::new();
    let before = target.object_count();
    UnsafeDecoder::new(compiler).decode(&mut target, &node).unwrap();

    assert_eq!(
        effects.borrow().as_slice(),
        ["(() => { sideEffect(); return () => {}; })()".to_string()]
    );
    // The compiler's own allocation plus the function shell.
    assert_eq!(target.object_count(), before + 2);
}

#[test]
fn compile_failures_name_the_function() {
    let node = json!({ "type": "function", "id": 4, "source": "function (" });
    let mut target = Heap::new();
    let err = UnsafeDecoder::new(table()).decode(&mut target, &node).unwrap_err();
    assert_eq!(
        err,
        DecodeError::UnparseableCallableSource {
            id: Id(4),
            reason: "no native definition for source [function (]".to_string(),
        }
    );
}

#[test]
fn duplicate_ids_are_rejected_before_compiling() {
    let effects = Rc::new(RefCell::new(0usize));
    let count = Rc::clone(&effects);
    let compiler = move |_heap: &mut Heap, source: &str| -> Result<Callable, String> {
        *count.borrow_mut() += 1;
        Ok(Callable::new(source, |_, _, _| Ok(Value::Undefined)))
    };
    let node = json!({
        "type": "object",
        "id": 1,
        ".f": { "type": "function", "id": 1, "source": "() => 1" },
    });
    let mut target = Heap::new();
    let err = UnsafeDecoder::new(compiler).decode(&mut target, &node).unwrap_err();
    assert_eq!(err, DecodeError::DuplicateDefinition(Id(1)));
    assert_eq!(*effects.borrow(), 0);
}

#[test]
fn safe_decoder_refuses_the_same_input() {
    let mut source = Heap::new();
    let function = source.alloc_function(Callable::new(ADD, add));
    let node = Encoder::new().encode(&source, &Value::Object(function));
    let mut target = Heap::new();
    let err = SafeDecoder::new().decode(&mut target, &node).unwrap_err();
    assert_eq!(err, DecodeError::CallableRefused(Id(1)));
}

//! Attribute (`type: property`) nodes.
//!
//! Only the flags that are `true` are written; an absent flag decodes as
//! `false`. A value slot and an accessor pair are mutually exclusive.

use object_graph::{PropertyDescriptor, Value};
use serde_json::{Map, Value as JsonValue};

use crate::error::DecodeError;
use crate::node::{self, TYPE};

pub const VALUE: &str = "value";
pub const GET: &str = "get";
pub const SET: &str = "set";
pub const WRITABLE: &str = "writable";
pub const ENUMERABLE: &str = "enumerable";
pub const CONFIGURABLE: &str = "configurable";

/// Writes `descriptor` as a full attribute node, encoding nested values
/// through `encode`.
pub fn encode_property<F>(descriptor: &PropertyDescriptor, mut encode: F) -> JsonValue
where
    F: FnMut(&Value) -> JsonValue,
{
    let mut map = Map::new();
    map.insert(TYPE.to_string(), JsonValue::from("property"));
    match descriptor {
        PropertyDescriptor::Data {
            value,
            writable,
            enumerable,
            configurable,
        } => {
            map.insert(VALUE.to_string(), encode(value));
            put_flag(&mut map, WRITABLE, *writable);
            put_flag(&mut map, ENUMERABLE, *enumerable);
            put_flag(&mut map, CONFIGURABLE, *configurable);
        }
        PropertyDescriptor::Accessor {
            get,
            set,
            enumerable,
            configurable,
        } => {
            if let Some(getter) = get {
                map.insert(GET.to_string(), encode(&Value::Object(*getter)));
            }
            if let Some(setter) = set {
                map.insert(SET.to_string(), encode(&Value::Object(*setter)));
            }
            if get.is_none() && set.is_none() {
                map.insert(GET.to_string(), node::builtin("undefined"));
            }
            put_flag(&mut map, ENUMERABLE, *enumerable);
            put_flag(&mut map, CONFIGURABLE, *configurable);
        }
    }
    JsonValue::Object(map)
}

fn put_flag(map: &mut Map<String, JsonValue>, name: &str, flag: bool) {
    if flag {
        map.insert(name.to_string(), JsonValue::Bool(true));
    }
}

/// The two shapes an attribute node can take, with nested nodes still
/// undecoded.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeForm<'a> {
    Data {
        value: &'a JsonValue,
        writable: bool,
        enumerable: bool,
        configurable: bool,
    },
    Accessor {
        get: Option<&'a JsonValue>,
        set: Option<&'a JsonValue>,
        enumerable: bool,
        configurable: bool,
    },
}

/// Classifies an attribute node.
pub fn parse_attribute(node: &Map<String, JsonValue>) -> Result<AttributeForm<'_>, DecodeError> {
    let value = node.get(VALUE);
    let get = node.get(GET);
    let set = node.get(SET);
    let enumerable = flag(node, ENUMERABLE);
    let configurable = flag(node, CONFIGURABLE);
    match (value, get.is_some() || set.is_some()) {
        (Some(_), true) => Err(DecodeError::AmbiguousAttribute(
            "property has both accessor and value",
        )),
        (Some(value), false) => Ok(AttributeForm::Data {
            value,
            writable: flag(node, WRITABLE),
            enumerable,
            configurable,
        }),
        (None, true) => Ok(AttributeForm::Accessor {
            get,
            set,
            enumerable,
            configurable,
        }),
        (None, false) => Err(DecodeError::AmbiguousAttribute(
            "property does not have get, set, or value",
        )),
    }
}

fn flag(node: &Map<String, JsonValue>, name: &str) -> bool {
    matches!(node.get(name), Some(JsonValue::Bool(true)))
}

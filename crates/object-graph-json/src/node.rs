//! Wire vocabulary shared by the encoder and decoder.
//!
//! A node is a plain `serde_json::Value`. Scalars stand for themselves;
//! everything else is a JSON object with a `type` discriminator:
//!
//! ```json
//! { "type": "object", "id": 1, "prototype": null, ".foo": "bar" }
//! { "type": "symbol", "id": 2, "description": "meep" }
//! { "type": "ref", "id": 1 }
//! ```

use std::fmt;

use serde_json::{json, Map, Number, Value as JsonValue};

pub const TYPE: &str = "type";
pub const ID: &str = "id";
pub const NAME: &str = "name";
pub const STRING: &str = "string";
pub const DESCRIPTION: &str = "description";
pub const PROTOTYPE: &str = "prototype";
pub const SOURCE: &str = "source";
pub const TYPEOF: &str = "typeof";

/// Fields of a composite node that are not attribute keys.
pub const STRUCTURAL_FIELDS: [&str; 4] = [TYPE, ID, PROTOTYPE, SOURCE];

/// Identifier of a composite or symbol within an encoder session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(pub u64);

impl Id {
    /// Reads an id from a node field. Accepts a positive integer or its
    /// decimal text; anything else counts as absent.
    pub fn from_json(value: &JsonValue) -> Option<Id> {
        match value {
            JsonValue::Number(n) => n.as_u64().filter(|id| *id > 0).map(Id),
            JsonValue::String(s) => Self::parse(s),
            _ => None,
        }
    }

    pub fn parse(text: &str) -> Option<Id> {
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        text.parse::<u64>().ok().filter(|id| *id > 0).map(Id)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The `type` discriminator of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Builtin,
    Bigint,
    Symbol,
    Array,
    Function,
    Object,
    Ref,
    Property,
    /// Anything else, including the encoder's `unknown` marker. Holds the
    /// declared type, or `undefined` when the field is missing.
    Unknown(String),
}

impl NodeKind {
    pub fn of(node: &Map<String, JsonValue>) -> NodeKind {
        match node.get(TYPE) {
            Some(JsonValue::String(t)) => Self::from_name(t),
            Some(other) => NodeKind::Unknown(other.to_string()),
            None => NodeKind::Unknown("undefined".to_string()),
        }
    }

    pub fn from_name(name: &str) -> NodeKind {
        match name {
            "builtin" => NodeKind::Builtin,
            "bigint" => NodeKind::Bigint,
            "symbol" => NodeKind::Symbol,
            "array" => NodeKind::Array,
            "function" => NodeKind::Function,
            "object" => NodeKind::Object,
            "ref" => NodeKind::Ref,
            "property" => NodeKind::Property,
            other => NodeKind::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            NodeKind::Builtin => "builtin",
            NodeKind::Bigint => "bigint",
            NodeKind::Symbol => "symbol",
            NodeKind::Array => "array",
            NodeKind::Function => "function",
            NodeKind::Object => "object",
            NodeKind::Ref => "ref",
            NodeKind::Property => "property",
            NodeKind::Unknown(name) => name,
        }
    }
}

/// `true` when `node` is an attribute (`type: property`) node.
pub fn is_property_node(node: &JsonValue) -> bool {
    node.as_object()
        .map(|map| NodeKind::of(map) == NodeKind::Property)
        .unwrap_or(false)
}

pub fn builtin(name: &str) -> JsonValue {
    json!({ TYPE: "builtin", NAME: name })
}

pub fn reference(id: Id) -> JsonValue {
    json!({ TYPE: "ref", ID: id.0 })
}

pub fn unknown(type_name: &str) -> JsonValue {
    json!({ TYPE: "unknown", TYPEOF: type_name })
}

/// Writes a finite number, using an integer literal when that is exact.
pub fn number(n: f64) -> JsonValue {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    let negative_zero = n == 0.0 && n.is_sign_negative();
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE && !negative_zero {
        return JsonValue::Number(Number::from(n as i64));
    }
    Number::from_f64(n)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_accept_numbers_and_digit_strings() {
        assert_eq!(Id::from_json(&json!(3)), Some(Id(3)));
        assert_eq!(Id::from_json(&json!("12")), Some(Id(12)));
        assert_eq!(Id::from_json(&json!(0)), None);
        assert_eq!(Id::from_json(&json!("")), None);
        assert_eq!(Id::from_json(&json!("x1")), None);
        assert_eq!(Id::from_json(&json!(1.5)), None);
        assert_eq!(Id::from_json(&json!(null)), None);
    }

    #[test]
    fn numbers_prefer_integer_literals() {
        assert_eq!(number(200.0).to_string(), "200");
        assert_eq!(number(-100.0).to_string(), "-100");
        assert_eq!(number(10.5).to_string(), "10.5");
        assert!(number(-0.0).as_f64().unwrap().is_sign_negative());
    }

    #[test]
    fn kind_falls_back_to_unknown() {
        let map = json!({ "type": "weird" });
        assert_eq!(
            NodeKind::of(map.as_object().unwrap()),
            NodeKind::Unknown("weird".into())
        );
        let map = json!({});
        assert_eq!(NodeKind::of(map.as_object().unwrap()).name(), "undefined");
    }
}

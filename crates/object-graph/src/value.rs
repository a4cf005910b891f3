//! Values that live in (or point into) a [`Heap`](crate::Heap).

use std::fmt;

use crate::bigint::BigInt;

/// Handle to an object allocated on a [`Heap`](crate::Heap).
///
/// Handles compare by identity: two handles are equal only when they name
/// the same heap slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectRef(pub(crate) u32);

impl ObjectRef {
    /// Slot index of this object in its heap.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a symbol allocated on a [`Heap`](crate::Heap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolRef(pub(crate) u32);

impl SymbolRef {
    /// Slot index of this symbol in its heap.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A runtime value.
///
/// Scalars are held inline; objects and symbols are handles into the heap
/// that allocated them, so `==` on those variants is identity comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    BigInt(BigInt),
    Symbol(SymbolRef),
    Object(ObjectRef),
    /// A host value with no structural representation. Carries the host's
    /// type name only.
    Opaque(String),
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            Value::Object(obj) => Some(*obj),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<SymbolRef> {
        match self {
            Value::Symbol(sym) => Some(*sym),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// `SameValue` comparison: like `==` except that `NaN` equals itself and
    /// `+0` differs from `-0`.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b && a.is_sign_negative() == b.is_sign_negative()
                }
            }
            _ => self == other,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<BigInt> for Value {
    fn from(b: BigInt) -> Self {
        Value::BigInt(b)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl From<SymbolRef> for Value {
    fn from(sym: SymbolRef) -> Self {
        Value::Symbol(sym)
    }
}

/// An own-property key: a string or a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(String),
    Symbol(SymbolRef),
}

impl PropertyKey {
    /// Returns the numeric index when this key is a canonical array index
    /// (`"0"`, `"1"`, ... with no leading zeros, below `2^32 - 1`).
    pub fn array_index(&self) -> Option<u32> {
        match self {
            PropertyKey::String(s) => parse_array_index(s),
            PropertyKey::Symbol(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyKey::String(s) => Some(s),
            PropertyKey::Symbol(_) => None,
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, PropertyKey::Symbol(_))
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{s}"),
            PropertyKey::Symbol(sym) => write!(f, "Symbol(#{})", sym.0),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(s.to_string())
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        PropertyKey::String(s)
    }
}

impl From<u32> for PropertyKey {
    fn from(index: u32) -> Self {
        PropertyKey::String(index.to_string())
    }
}

impl From<SymbolRef> for PropertyKey {
    fn from(sym: SymbolRef) -> Self {
        PropertyKey::Symbol(sym)
    }
}

fn parse_array_index(s: &str) -> Option<u32> {
    if s.is_empty() || (s.len() > 1 && s.starts_with('0')) {
        return None;
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match s.parse::<u32>() {
        Ok(n) if n < u32::MAX => Some(n),
        _ => None,
    }
}

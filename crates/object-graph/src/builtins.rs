//! Fixed table of singleton values addressable by name.
//!
//! Every [`Heap`](crate::Heap) allocates the well-known symbols and the
//! intrinsic objects at the same handles, so one immutable table serves all
//! heaps. Lookups go through hash maps built once on first use.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::value::{ObjectRef, SymbolRef, Value};

/// Well-known symbols, in handle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownSymbol {
    AsyncIterator,
    HasInstance,
    IsConcatSpreadable,
    Iterator,
    Match,
    MatchAll,
    Replace,
    Search,
    Species,
    Split,
    ToPrimitive,
    ToStringTag,
    Unscopables,
}

impl WellKnownSymbol {
    pub const ALL: [WellKnownSymbol; 13] = [
        Self::AsyncIterator,
        Self::HasInstance,
        Self::IsConcatSpreadable,
        Self::Iterator,
        Self::Match,
        Self::MatchAll,
        Self::Replace,
        Self::Search,
        Self::Species,
        Self::Split,
        Self::ToPrimitive,
        Self::ToStringTag,
        Self::Unscopables,
    ];

    /// Fixed handle of this symbol in every heap.
    pub fn handle(self) -> SymbolRef {
        SymbolRef(self as u32)
    }

    pub fn from_handle(symbol: SymbolRef) -> Option<Self> {
        Self::ALL.get(symbol.index()).copied()
    }

    /// Description and registry name, e.g. `Symbol.iterator`.
    pub fn description(self) -> &'static str {
        match self {
            Self::AsyncIterator => "Symbol.asyncIterator",
            Self::HasInstance => "Symbol.hasInstance",
            Self::IsConcatSpreadable => "Symbol.isConcatSpreadable",
            Self::Iterator => "Symbol.iterator",
            Self::Match => "Symbol.match",
            Self::MatchAll => "Symbol.matchAll",
            Self::Replace => "Symbol.replace",
            Self::Search => "Symbol.search",
            Self::Species => "Symbol.species",
            Self::Split => "Symbol.split",
            Self::ToPrimitive => "Symbol.toPrimitive",
            Self::ToStringTag => "Symbol.toStringTag",
            Self::Unscopables => "Symbol.unscopables",
        }
    }
}

/// Intrinsic objects, in handle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    ObjectPrototype,
    Object,
    FunctionPrototype,
    Function,
    ArrayPrototype,
    Array,
}

impl Intrinsic {
    pub const ALL: [Intrinsic; 6] = [
        Self::ObjectPrototype,
        Self::Object,
        Self::FunctionPrototype,
        Self::Function,
        Self::ArrayPrototype,
        Self::Array,
    ];

    /// Fixed handle of this object in every heap.
    pub fn handle(self) -> ObjectRef {
        ObjectRef(self as u32)
    }

    pub fn from_handle(object: ObjectRef) -> Option<Self> {
        Self::ALL.get(object.index()).copied()
    }
}

/// A value with a stable registry name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Undefined,
    NaN,
    Infinity,
    NegativeInfinity,
    Symbol(WellKnownSymbol),
    Intrinsic(Intrinsic),
}

impl Builtin {
    /// Identifies `value` as a builtin, by identity for handles.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Undefined => Some(Self::Undefined),
            Value::Number(n) if n.is_nan() => Some(Self::NaN),
            Value::Number(n) if *n == f64::INFINITY => Some(Self::Infinity),
            Value::Number(n) if *n == f64::NEG_INFINITY => Some(Self::NegativeInfinity),
            Value::Symbol(sym) => WellKnownSymbol::from_handle(*sym).map(Self::Symbol),
            Value::Object(obj) => Intrinsic::from_handle(*obj).map(Self::Intrinsic),
            _ => None,
        }
    }

    pub fn value(self) -> Value {
        match self {
            Self::Undefined => Value::Undefined,
            Self::NaN => Value::Number(f64::NAN),
            Self::Infinity => Value::Number(f64::INFINITY),
            Self::NegativeInfinity => Value::Number(f64::NEG_INFINITY),
            Self::Symbol(sym) => Value::Symbol(sym.handle()),
            Self::Intrinsic(obj) => Value::Object(obj.handle()),
        }
    }

    pub fn is_symbol(self) -> bool {
        matches!(self, Self::Symbol(_))
    }
}

const BUILTINS: &[(Builtin, &str)] = &[
    (Builtin::Undefined, "undefined"),
    // Number-related
    (Builtin::NaN, "NaN"),
    (Builtin::Infinity, "Infinity"),
    (Builtin::NegativeInfinity, "-Infinity"),
    // Well-known symbols
    (Builtin::Symbol(WellKnownSymbol::AsyncIterator), "Symbol.asyncIterator"),
    (Builtin::Symbol(WellKnownSymbol::HasInstance), "Symbol.hasInstance"),
    (Builtin::Symbol(WellKnownSymbol::IsConcatSpreadable), "Symbol.isConcatSpreadable"),
    (Builtin::Symbol(WellKnownSymbol::Iterator), "Symbol.iterator"),
    (Builtin::Symbol(WellKnownSymbol::Match), "Symbol.match"),
    (Builtin::Symbol(WellKnownSymbol::MatchAll), "Symbol.matchAll"),
    (Builtin::Symbol(WellKnownSymbol::Replace), "Symbol.replace"),
    (Builtin::Symbol(WellKnownSymbol::Search), "Symbol.search"),
    (Builtin::Symbol(WellKnownSymbol::Species), "Symbol.species"),
    (Builtin::Symbol(WellKnownSymbol::Split), "Symbol.split"),
    (Builtin::Symbol(WellKnownSymbol::ToPrimitive), "Symbol.toPrimitive"),
    (Builtin::Symbol(WellKnownSymbol::ToStringTag), "Symbol.toStringTag"),
    (Builtin::Symbol(WellKnownSymbol::Unscopables), "Symbol.unscopables"),
    // Constructors and prototypes
    (Builtin::Intrinsic(Intrinsic::Array), "Array"),
    (Builtin::Intrinsic(Intrinsic::ArrayPrototype), "Array.prototype"),
    (Builtin::Intrinsic(Intrinsic::Function), "Function"),
    (Builtin::Intrinsic(Intrinsic::FunctionPrototype), "Function.prototype"),
    (Builtin::Intrinsic(Intrinsic::Object), "Object"),
    (Builtin::Intrinsic(Intrinsic::ObjectPrototype), "Object.prototype"),
];

/// Bidirectional name table over [`Builtin`]s.
#[derive(Debug)]
pub struct BuiltinRegistry {
    entries: &'static [(Builtin, &'static str)],
    by_name: HashMap<&'static str, Builtin>,
    by_builtin: HashMap<Builtin, &'static str>,
}

impl BuiltinRegistry {
    fn build(entries: &'static [(Builtin, &'static str)]) -> Self {
        let by_name = entries.iter().map(|(b, name)| (*name, *b)).collect();
        let by_builtin = entries.iter().map(|(b, name)| (*b, *name)).collect();
        Self {
            entries,
            by_name,
            by_builtin,
        }
    }

    /// The ordered `(builtin, name)` list the registry was built from.
    pub fn entries(&self) -> &'static [(Builtin, &'static str)] {
        self.entries
    }

    /// Number of distinct names.
    pub fn name_count(&self) -> usize {
        self.by_name.len()
    }

    /// Number of distinct values.
    pub fn value_count(&self) -> usize {
        self.by_builtin.len()
    }

    pub fn name_of(&self, value: &Value) -> Option<&'static str> {
        Builtin::of(value).and_then(|b| self.by_builtin.get(&b).copied())
    }

    pub fn builtin(&self, name: &str) -> Option<Builtin> {
        self.by_name.get(name).copied()
    }

    pub fn value_of(&self, name: &str) -> Option<Value> {
        self.builtin(name).map(Builtin::value)
    }
}

/// The process-wide registry.
pub fn registry() -> &'static BuiltinRegistry {
    static REGISTRY: OnceLock<BuiltinRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| BuiltinRegistry::build(BUILTINS))
}

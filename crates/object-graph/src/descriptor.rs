//! Own-property slots.

use crate::value::{ObjectRef, Value};

/// Full metadata of one own property: either a value slot or an accessor
/// pair, plus the mutability / visibility / reconfigurability flags.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyDescriptor {
    Data {
        value: Value,
        writable: bool,
        enumerable: bool,
        configurable: bool,
    },
    Accessor {
        get: Option<ObjectRef>,
        set: Option<ObjectRef>,
        enumerable: bool,
        configurable: bool,
    },
}

impl PropertyDescriptor {
    /// A writable, enumerable, configurable value slot, as created by a plain
    /// assignment.
    pub fn data(value: impl Into<Value>) -> Self {
        Self::Data {
            value: value.into(),
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// A value slot with every flag cleared.
    pub fn frozen(value: impl Into<Value>) -> Self {
        Self::Data {
            value: value.into(),
            writable: false,
            enumerable: false,
            configurable: false,
        }
    }

    /// A value slot with explicit flags.
    pub fn with_flags(
        value: impl Into<Value>,
        writable: bool,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        Self::Data {
            value: value.into(),
            writable,
            enumerable,
            configurable,
        }
    }

    pub fn accessor(
        get: Option<ObjectRef>,
        set: Option<ObjectRef>,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        Self::Accessor {
            get,
            set,
            enumerable,
            configurable,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Data { value, .. } => Some(value),
            Self::Accessor { .. } => None,
        }
    }

    pub fn is_accessor(&self) -> bool {
        matches!(self, Self::Accessor { .. })
    }

    pub fn writable(&self) -> bool {
        match self {
            Self::Data { writable, .. } => *writable,
            Self::Accessor { .. } => false,
        }
    }

    pub fn enumerable(&self) -> bool {
        match self {
            Self::Data { enumerable, .. } | Self::Accessor { enumerable, .. } => *enumerable,
        }
    }

    pub fn configurable(&self) -> bool {
        match self {
            Self::Data { configurable, .. } | Self::Accessor { configurable, .. } => *configurable,
        }
    }

    /// `true` for a value slot with all three flags set.
    pub fn is_plain_data(&self) -> bool {
        matches!(
            self,
            Self::Data {
                writable: true,
                enumerable: true,
                configurable: true,
                ..
            }
        )
    }
}

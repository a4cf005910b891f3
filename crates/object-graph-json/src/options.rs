//! Encoder and decoder configuration.

use serde::{Deserialize, Serialize};

use crate::node::NodeKind;

/// Options controlling encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderOptions {
    /// When `true` (default), a writable + enumerable + configurable value
    /// slot is written as the bare encoded value instead of a full
    /// `property` node.
    pub compact_properties: bool,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            compact_properties: true,
        }
    }
}

/// Per-kind switches for reconstruction. A disabled kind is reported as a
/// failure instead of being rebuilt.
///
/// Deserializes from partial JSON; missing kinds stay enabled:
///
/// ```
/// use object_graph_json::DecoderOptions;
///
/// let options: DecoderOptions = serde_json::from_str(r#"{ "function": false }"#).unwrap();
/// assert!(!options.function);
/// assert!(options.object);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderOptions {
    pub builtin: bool,
    pub bigint: bool,
    pub symbol: bool,
    pub array: bool,
    pub function: bool,
    pub object: bool,
    #[serde(rename = "ref")]
    pub reference: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            builtin: true,
            bigint: true,
            symbol: true,
            array: true,
            function: true,
            object: true,
            reference: true,
        }
    }
}

impl DecoderOptions {
    /// Whether nodes of `kind` may be reconstructed. Attribute and unknown
    /// nodes have no switch.
    pub fn is_enabled(&self, kind: &NodeKind) -> bool {
        match kind {
            NodeKind::Builtin => self.builtin,
            NodeKind::Bigint => self.bigint,
            NodeKind::Symbol => self.symbol,
            NodeKind::Array => self.array,
            NodeKind::Function => self.function,
            NodeKind::Object => self.object,
            NodeKind::Ref => self.reference,
            NodeKind::Property | NodeKind::Unknown(_) => true,
        }
    }

    /// Returns a copy with `kind` switched on or off.
    pub fn with_kind(mut self, kind: NodeKind, enabled: bool) -> Self {
        match kind {
            NodeKind::Builtin => self.builtin = enabled,
            NodeKind::Bigint => self.bigint = enabled,
            NodeKind::Symbol => self.symbol = enabled,
            NodeKind::Array => self.array = enabled,
            NodeKind::Function => self.function = enabled,
            NodeKind::Object => self.object = enabled,
            NodeKind::Ref => self.reference = enabled,
            NodeKind::Property | NodeKind::Unknown(_) => {}
        }
        self
    }
}

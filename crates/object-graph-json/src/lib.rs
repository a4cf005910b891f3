//! JSON node trees for live object graphs.
//!
//! [`Encoder`] linearizes a possibly cyclic, shared graph held in an
//! [`object_graph::Heap`] into plain `serde_json::Value` nodes; the decoders
//! rebuild it, preserving identity, prototype links and property flags.
//!
//! ```
//! use object_graph::{Heap, PropertyKey, Value};
//! use object_graph_json::{Encoder, SafeDecoder};
//! use serde_json::json;
//!
//! let mut heap = Heap::new();
//! let a = heap.object_from([("foo", Value::from("bar"))]);
//! heap.set(a, PropertyKey::from("me"), Value::Object(a)).unwrap();
//!
//! let node = Encoder::new().encode(&heap, &Value::Object(a));
//! assert_eq!(
//!     node,
//!     json!({ "type": "object", "id": 1, ".foo": "bar", ".me": { "type": "ref", "id": 1 } })
//! );
//!
//! let mut target = Heap::new();
//! let copy = SafeDecoder::new().decode(&mut target, &node).unwrap();
//! let copy = copy.as_object().unwrap();
//! assert_eq!(target.get(copy, &PropertyKey::from("me")).unwrap(), Value::Object(copy));
//! ```

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod hooks;
pub mod keys;
pub mod node;
pub mod options;
pub mod property;

pub use decoder::{
    CallablePolicy, CompileCallables, DecodeContext, Decoder, NativeTable, RefuseCallables,
    SafeDecoder, SourceCompiler, UnsafeDecoder,
};
pub use encoder::Encoder;
pub use error::DecodeError;
pub use hooks::{AbortOnFailure, FailureHooks, KeySubstitute, LenientHooks, Substitute};
pub use node::{Id, NodeKind};
pub use options::{DecoderOptions, EncoderOptions};

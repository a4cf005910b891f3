//! Arena-backed object graph.
//!
//! A [`Heap`] holds objects with prototype ("delegate") links, ordered own
//! properties with full descriptors, string and symbol keys, array and
//! function objects. Values point into the heap through copyable handles,
//! so cyclic and shared structures need no special treatment.
//!
//! # Example
//!
//! ```
//! use object_graph::{Heap, PropertyKey, Value};
//!
//! let mut heap = Heap::new();
//! let a = heap.object_from([("name", Value::from("a"))]);
//! heap.set(a, PropertyKey::from("self"), Value::Object(a)).unwrap();
//!
//! assert_eq!(heap.get(a, &PropertyKey::from("self")).unwrap(), Value::Object(a));
//! ```

pub mod bigint;
pub mod builtins;
pub mod descriptor;
pub mod error;
pub mod heap;
pub mod value;

pub use bigint::{BigInt, ParseBigIntError};
pub use builtins::{registry, Builtin, BuiltinRegistry, Intrinsic, WellKnownSymbol};
pub use descriptor::PropertyDescriptor;
pub use error::HeapError;
pub use heap::{Callable, Heap, HeapObject, NativeFn, ObjectKind};
pub use value::{ObjectRef, PropertyKey, SymbolRef, Value};

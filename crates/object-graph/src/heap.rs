//! The object arena.
//!
//! Objects and symbols are allocated into vectors and addressed by
//! [`ObjectRef`] / [`SymbolRef`] handles. Cycles and sharing are just
//! handles pointing at each other, so nothing here needs reference
//! counting or weak links.
//!
//! A fresh heap already contains the intrinsics (`Object.prototype`,
//! `Object`, `Function.prototype`, `Function`, `Array.prototype`, `Array`)
//! and the well-known symbols at fixed handles; see [`crate::builtins`].

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::builtins::{Intrinsic, WellKnownSymbol};
use crate::descriptor::PropertyDescriptor;
use crate::error::HeapError;
use crate::value::{ObjectRef, PropertyKey, SymbolRef, Value};

/// Native behaviour of a callable: `(heap, this, args) -> result`.
pub type NativeFn = dyn Fn(&mut Heap, Value, &[Value]) -> Result<Value, String>;

/// Behaviour and source text of a function object.
#[derive(Clone)]
pub struct Callable {
    source: String,
    behaviour: Rc<NativeFn>,
}

impl Callable {
    pub fn new<F>(source: impl Into<String>, behaviour: F) -> Self
    where
        F: Fn(&mut Heap, Value, &[Value]) -> Result<Value, String> + 'static,
    {
        Self {
            source: source.into(),
            behaviour: Rc::new(behaviour),
        }
    }

    /// Textual definition of the callable.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Shape of a heap object.
#[derive(Debug, Clone)]
pub enum ObjectKind {
    Ordinary,
    /// Array exotic object: keeps its `length` slot in step with indices.
    Array,
    Function(Callable),
}

/// One heap slot.
#[derive(Debug, Clone)]
pub struct HeapObject {
    kind: ObjectKind,
    prototype: Option<ObjectRef>,
    properties: IndexMap<PropertyKey, PropertyDescriptor>,
}

impl HeapObject {
    fn new(kind: ObjectKind, prototype: Option<ObjectRef>) -> Self {
        Self {
            kind,
            prototype,
            properties: IndexMap::new(),
        }
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn prototype(&self) -> Option<ObjectRef> {
        self.prototype
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, ObjectKind::Array)
    }

    pub fn callable(&self) -> Option<&Callable> {
        match &self.kind {
            ObjectKind::Function(callable) => Some(callable),
            _ => None,
        }
    }

    pub fn own_property(&self, key: &PropertyKey) -> Option<&PropertyDescriptor> {
        self.properties.get(key)
    }

    /// Own keys in host order: array indices ascending, then the remaining
    /// string keys in insertion order, then symbol keys in insertion order.
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        let mut indices: Vec<(u32, &PropertyKey)> = Vec::new();
        let mut strings: Vec<&PropertyKey> = Vec::new();
        let mut symbols: Vec<&PropertyKey> = Vec::new();
        for key in self.properties.keys() {
            match key {
                PropertyKey::Symbol(_) => symbols.push(key),
                PropertyKey::String(_) => match key.array_index() {
                    Some(index) => indices.push((index, key)),
                    None => strings.push(key),
                },
            }
        }
        indices.sort_by_key(|(index, _)| *index);
        indices
            .into_iter()
            .map(|(_, key)| key)
            .chain(strings)
            .chain(symbols)
            .cloned()
            .collect()
    }
}

/// Arena of objects and symbols.
#[derive(Debug, Clone)]
pub struct Heap {
    objects: Vec<HeapObject>,
    /// Symbol descriptions, indexed by `SymbolRef`.
    symbols: Vec<Option<String>>,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    /// Creates a heap holding only the intrinsics and well-known symbols.
    pub fn new() -> Self {
        let mut heap = Self {
            objects: Vec::new(),
            symbols: Vec::new(),
        };
        for symbol in WellKnownSymbol::ALL {
            let sym = heap.alloc_symbol(Some(symbol.description().to_string()));
            debug_assert_eq!(sym, symbol.handle());
        }
        heap.install_intrinsics();
        heap
    }

    fn install_intrinsics(&mut self) {
        let object_proto = self.push(HeapObject::new(ObjectKind::Ordinary, None));
        let object_ctor = self.push(HeapObject::new(
            ObjectKind::Function(Callable::new(
                "function Object() { [native code] }",
                |heap, _this, _args| Ok(Value::Object(heap.alloc_plain_object())),
            )),
            None,
        ));
        let function_proto = self.push(HeapObject::new(
            ObjectKind::Function(Callable::new(
                "function () { [native code] }",
                |_heap, _this, _args| Ok(Value::Undefined),
            )),
            Some(object_proto),
        ));
        let function_ctor = self.push(HeapObject::new(
            ObjectKind::Function(Callable::new(
                "function Function() { [native code] }",
                |_heap, _this, _args| Err("Function() cannot compile source text".to_string()),
            )),
            Some(function_proto),
        ));
        let array_proto = self.push(HeapObject::new(ObjectKind::Ordinary, Some(object_proto)));
        let array_ctor = self.push(HeapObject::new(
            ObjectKind::Function(Callable::new(
                "function Array() { [native code] }",
                |heap, _this, args| Ok(Value::Object(heap.array_from(args.to_vec()))),
            )),
            Some(function_proto),
        ));

        debug_assert_eq!(object_proto, Intrinsic::ObjectPrototype.handle());
        debug_assert_eq!(array_ctor, Intrinsic::Array.handle());

        self.objects[object_ctor.index()].prototype = Some(function_proto);
        for (ctor, proto) in [
            (object_ctor, object_proto),
            (function_ctor, function_proto),
            (array_ctor, array_proto),
        ] {
            self.objects[ctor.index()].properties.insert(
                PropertyKey::from("prototype"),
                PropertyDescriptor::frozen(proto),
            );
            self.objects[proto.index()].properties.insert(
                PropertyKey::from("constructor"),
                PropertyDescriptor::with_flags(ctor, true, false, true),
            );
        }
    }

    fn push(&mut self, object: HeapObject) -> ObjectRef {
        let handle = ObjectRef(self.objects.len() as u32);
        self.objects.push(object);
        handle
    }

    // ----------------------------------------------------------------
    // Allocation

    /// Allocates an ordinary object with the given prototype.
    pub fn alloc_object(&mut self, prototype: Option<ObjectRef>) -> ObjectRef {
        self.push(HeapObject::new(ObjectKind::Ordinary, prototype))
    }

    /// Allocates `{}`: an ordinary object delegating to `Object.prototype`.
    pub fn alloc_plain_object(&mut self) -> ObjectRef {
        self.alloc_object(Some(Intrinsic::ObjectPrototype.handle()))
    }

    /// Allocates `[]`.
    pub fn alloc_array(&mut self) -> ObjectRef {
        let mut object = HeapObject::new(
            ObjectKind::Array,
            Some(Intrinsic::ArrayPrototype.handle()),
        );
        object.properties.insert(
            PropertyKey::from("length"),
            PropertyDescriptor::with_flags(0, true, false, false),
        );
        self.push(object)
    }

    /// Allocates a function object delegating to `Function.prototype`.
    pub fn alloc_function(&mut self, callable: Callable) -> ObjectRef {
        self.push(HeapObject::new(
            ObjectKind::Function(callable),
            Some(Intrinsic::FunctionPrototype.handle()),
        ))
    }

    /// Allocates a fresh symbol. Every call yields a distinct symbol, even
    /// for equal descriptions.
    pub fn alloc_symbol(&mut self, description: Option<String>) -> SymbolRef {
        let handle = SymbolRef(self.symbols.len() as u32);
        self.symbols.push(description);
        handle
    }

    /// Allocates an array holding `values` at indices `0..n`.
    pub fn array_from(&mut self, values: Vec<Value>) -> ObjectRef {
        let array = self.alloc_array();
        for (index, value) in values.into_iter().enumerate() {
            self.define_slot(array, PropertyKey::from(index as u32), PropertyDescriptor::data(value));
        }
        array
    }

    /// Allocates a plain object with the given enumerable data properties.
    pub fn object_from<K, I>(&mut self, entries: I) -> ObjectRef
    where
        K: Into<PropertyKey>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let object = self.alloc_plain_object();
        for (key, value) in entries {
            self.define_slot(object, key.into(), PropertyDescriptor::data(value));
        }
        object
    }

    // ----------------------------------------------------------------
    // Inspection

    pub fn contains_object(&self, object: ObjectRef) -> bool {
        object.index() < self.objects.len()
    }

    pub fn contains_symbol(&self, symbol: SymbolRef) -> bool {
        symbol.index() < self.symbols.len()
    }

    /// `true` when every handle inside `value` belongs to this heap.
    pub fn owns(&self, value: &Value) -> bool {
        match value {
            Value::Object(object) => self.contains_object(*object),
            Value::Symbol(symbol) => self.contains_symbol(*symbol),
            _ => true,
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn object(&self, object: ObjectRef) -> Result<&HeapObject, HeapError> {
        self.objects
            .get(object.index())
            .ok_or(HeapError::ObjectNotFound(object))
    }

    fn object_mut(&mut self, object: ObjectRef) -> Result<&mut HeapObject, HeapError> {
        self.objects
            .get_mut(object.index())
            .ok_or(HeapError::ObjectNotFound(object))
    }

    pub fn symbol_description(&self, symbol: SymbolRef) -> Result<Option<&str>, HeapError> {
        self.symbols
            .get(symbol.index())
            .map(|description| description.as_deref())
            .ok_or(HeapError::SymbolNotFound(symbol))
    }

    pub fn is_callable(&self, object: ObjectRef) -> bool {
        self.object(object)
            .map(|o| o.callable().is_some())
            .unwrap_or(false)
    }

    pub fn prototype_of(&self, object: ObjectRef) -> Result<Option<ObjectRef>, HeapError> {
        Ok(self.object(object)?.prototype)
    }

    /// Re-links the delegate of `object`. Refuses links that would make the
    /// chain cyclic.
    pub fn set_prototype_of(
        &mut self,
        object: ObjectRef,
        prototype: Option<ObjectRef>,
    ) -> Result<(), HeapError> {
        let mut cursor = prototype;
        while let Some(current) = cursor {
            if current == object {
                return Err(HeapError::CyclicPrototype(object));
            }
            cursor = self.object(current)?.prototype;
        }
        self.object_mut(object)?.prototype = prototype;
        Ok(())
    }

    pub fn own_property(
        &self,
        object: ObjectRef,
        key: &PropertyKey,
    ) -> Result<Option<&PropertyDescriptor>, HeapError> {
        Ok(self.object(object)?.own_property(key))
    }

    pub fn own_keys(&self, object: ObjectRef) -> Result<Vec<PropertyKey>, HeapError> {
        Ok(self.object(object)?.own_keys())
    }

    /// Current `length` of an array object.
    pub fn array_length(&self, object: ObjectRef) -> Result<Option<u32>, HeapError> {
        let target = self.object(object)?;
        if !target.is_array() {
            return Ok(None);
        }
        Ok(target
            .own_property(&PropertyKey::from("length"))
            .and_then(|desc| desc.value())
            .and_then(Value::as_f64)
            .map(|n| n as u32))
    }

    // ----------------------------------------------------------------
    // Mutation

    /// Writes an own slot as given, replacing any previous slot under the
    /// same key. This is the raw definition primitive used by graph builders;
    /// it does not consult the previous slot's `configurable` flag.
    ///
    /// On arrays, an index at or past `length` grows `length`, and a smaller
    /// numeric `length` drops the indices past it.
    pub fn define_property(
        &mut self,
        object: ObjectRef,
        key: PropertyKey,
        descriptor: PropertyDescriptor,
    ) -> Result<(), HeapError> {
        self.object(object)?;
        self.define_slot(object, key, descriptor);
        Ok(())
    }

    fn define_slot(&mut self, object: ObjectRef, key: PropertyKey, descriptor: PropertyDescriptor) {
        let target = &mut self.objects[object.index()];
        if !target.is_array() {
            target.properties.insert(key, descriptor);
            return;
        }
        if let Some(index) = key.array_index() {
            target.properties.insert(key, descriptor);
            let length_key = PropertyKey::from("length");
            if let Some(PropertyDescriptor::Data { value, .. }) =
                target.properties.get_mut(&length_key)
            {
                let current = value.as_f64().unwrap_or(0.0);
                if f64::from(index) >= current {
                    *value = Value::Number(f64::from(index) + 1.0);
                }
            }
            return;
        }
        if key.as_str() == Some("length") {
            if let Some(new_length) = descriptor.value().and_then(Value::as_f64) {
                target.properties.retain(|k, _| match k.array_index() {
                    Some(index) => f64::from(index) < new_length,
                    None => true,
                });
            }
        }
        target.properties.insert(key, descriptor);
    }

    pub fn delete_property(&mut self, object: ObjectRef, key: &PropertyKey) -> Result<bool, HeapError> {
        Ok(self.object_mut(object)?.properties.shift_remove(key).is_some())
    }

    // ----------------------------------------------------------------
    // Host-level operations

    /// Reads `key`, falling back along the delegate chain and invoking
    /// getters with `object` as receiver.
    pub fn get(&mut self, object: ObjectRef, key: &PropertyKey) -> Result<Value, HeapError> {
        match self.lookup(object, key)? {
            Some((_, PropertyDescriptor::Data { value, .. })) => Ok(value),
            Some((_, PropertyDescriptor::Accessor { get: Some(getter), .. })) => {
                self.call(getter, Value::Object(object), &[])
            }
            Some((_, PropertyDescriptor::Accessor { get: None, .. })) | None => Ok(Value::Undefined),
        }
    }

    /// Assigns `key` on `object`: updates a writable own value slot, runs a
    /// setter found along the chain, or creates a plain own slot.
    pub fn set(&mut self, object: ObjectRef, key: PropertyKey, value: Value) -> Result<(), HeapError> {
        match self.lookup(object, &key)? {
            Some((_, PropertyDescriptor::Data { writable: false, .. })) => {
                Err(HeapError::NotWritable(key.to_string()))
            }
            Some((
                holder,
                PropertyDescriptor::Data {
                    enumerable,
                    configurable,
                    ..
                },
            )) if holder == object => {
                self.define_slot(
                    object,
                    key,
                    PropertyDescriptor::with_flags(value, true, enumerable, configurable),
                );
                Ok(())
            }
            Some((_, PropertyDescriptor::Accessor { set: Some(setter), .. })) => {
                self.call(setter, Value::Object(object), &[value]).map(|_| ())
            }
            Some((_, PropertyDescriptor::Accessor { set: None, .. })) => {
                Err(HeapError::NotWritable(key.to_string()))
            }
            Some((_, PropertyDescriptor::Data { .. })) | None => {
                self.object(object)?;
                self.define_slot(object, key, PropertyDescriptor::data(value));
                Ok(())
            }
        }
    }

    /// Finds the first slot for `key` along the delegate chain, returning the
    /// holder and a copy of the slot.
    fn lookup(
        &self,
        object: ObjectRef,
        key: &PropertyKey,
    ) -> Result<Option<(ObjectRef, PropertyDescriptor)>, HeapError> {
        let mut cursor = Some(object);
        let mut steps = 0usize;
        while let Some(current) = cursor {
            steps += 1;
            if steps > self.objects.len() {
                return Err(HeapError::CyclicPrototype(object));
            }
            let holder = self.object(current)?;
            if let Some(slot) = holder.own_property(key) {
                return Ok(Some((current, slot.clone())));
            }
            cursor = holder.prototype;
        }
        Ok(None)
    }

    /// Invokes a function object.
    pub fn call(&mut self, function: ObjectRef, this: Value, args: &[Value]) -> Result<Value, HeapError> {
        let behaviour = match self.object(function)?.callable() {
            Some(callable) => Rc::clone(&callable.behaviour),
            None => return Err(HeapError::NotCallable(function)),
        };
        behaviour(self, this, args).map_err(HeapError::Thrown)
    }
}

//! How `function` nodes are turned back into callables.
//!
//! Rebuilding a callable means turning its stored `source` text into live
//! behaviour. [`RefuseCallables`] never does that. [`CompileCallables`]
//! hands the text to a caller-supplied [`SourceCompiler`], and whatever that
//! compiler does while compiling happens during decoding, whether or not the
//! resulting callable is ever invoked.

use std::collections::HashMap;
use std::rc::Rc;

use object_graph::{Callable, Heap, NativeFn, ObjectRef, Value};

use crate::error::DecodeError;
use crate::node::Id;

/// Policy for `function` nodes.
pub trait CallablePolicy {
    /// Allocates the shell for the callable with `id` defined by `source`.
    fn reconstruct(&mut self, heap: &mut Heap, id: Id, source: &str) -> Result<ObjectRef, DecodeError>;
}

/// Safe policy: every `function` node is a failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefuseCallables;

impl CallablePolicy for RefuseCallables {
    fn reconstruct(&mut self, _heap: &mut Heap, id: Id, _source: &str) -> Result<ObjectRef, DecodeError> {
        Err(DecodeError::CallableRefused(id))
    }
}

/// Turns source text into a callable. This is the host's dynamic code
/// evaluation capability; it may run arbitrary effects against `heap`.
pub trait SourceCompiler {
    fn compile(&mut self, heap: &mut Heap, source: &str) -> Result<Callable, String>;
}

impl<F> SourceCompiler for F
where
    F: FnMut(&mut Heap, &str) -> Result<Callable, String>,
{
    fn compile(&mut self, heap: &mut Heap, source: &str) -> Result<Callable, String> {
        self(heap, source)
    }
}

/// Unsafe policy: compiles `source` with `C`.
#[derive(Debug, Clone, Default)]
pub struct CompileCallables<C> {
    pub compiler: C,
}

impl<C> CompileCallables<C> {
    pub fn new(compiler: C) -> Self {
        Self { compiler }
    }
}

impl<C: SourceCompiler> CallablePolicy for CompileCallables<C> {
    fn reconstruct(&mut self, heap: &mut Heap, id: Id, source: &str) -> Result<ObjectRef, DecodeError> {
        let callable = self
            .compiler
            .compile(heap, source)
            .map_err(|reason| DecodeError::UnparseableCallableSource { id, reason })?;
        Ok(heap.alloc_function(callable))
    }
}

/// A compiler that only knows a fixed set of sources.
///
/// Handy for tests and for hosts that ship their callables ahead of time
/// and only need to re-link them by source text.
#[derive(Default, Clone)]
pub struct NativeTable {
    entries: HashMap<String, Rc<NativeFn>>,
}

impl NativeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the behaviour for `source`.
    pub fn with<F>(mut self, source: impl Into<String>, behaviour: F) -> Self
    where
        F: Fn(&mut Heap, Value, &[Value]) -> Result<Value, String> + 'static,
    {
        self.entries.insert(source.into(), Rc::new(behaviour));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for NativeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

impl SourceCompiler for NativeTable {
    fn compile(&mut self, _heap: &mut Heap, source: &str) -> Result<Callable, String> {
        let behaviour = self
            .entries
            .get(source.trim())
            .cloned()
            .ok_or_else(|| format!("no native definition for source [{source}]"))?;
        Ok(Callable::new(source, move |heap, this, args| behaviour(heap, this, args)))
    }
}

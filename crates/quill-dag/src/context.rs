//! Step execution context
//!
//! The opaque carrier every step receives. Collaborators attach
//! request-scoped services (document store, publisher, model client) through
//! the [`Extensions`] type map before a run starts; the engine passes the
//! context through without inspecting extension contents.

use crate::state::SharedState;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Type-keyed map of request-scoped services
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    /// Create an empty extension map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a service, replacing any previous value of the same type
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.map.insert(TypeId::of::<T>(), Box::new(value));
        self
    }

    /// Borrow an attached service by type
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref::<T>())
    }

    /// Whether a service of type `T` is attached
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }
}

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.map.len())
            .finish()
    }
}

/// Per-run context handed to every step
///
/// Cloning is cheap; clones share the same run identity, state, and counter.
#[derive(Debug, Clone)]
pub struct StepContext {
    run_id: Uuid,
    dag_name: Arc<str>,
    state: SharedState,
    steps_executed: Arc<AtomicU64>,
    extensions: Arc<Extensions>,
}

impl StepContext {
    /// Create a context for a new run
    #[must_use]
    pub(crate) fn new(dag_name: &str, extensions: Extensions) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            dag_name: Arc::from(dag_name),
            state: SharedState::new(),
            steps_executed: Arc::new(AtomicU64::new(0)),
            extensions: Arc::new(extensions),
        }
    }

    /// Identity of this run
    #[inline]
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Name of the dag being executed
    #[inline]
    #[must_use]
    pub fn dag_name(&self) -> &str {
        &self.dag_name
    }

    /// The shared blackboard for this run
    #[inline]
    #[must_use]
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Borrow an attached collaborator service
    #[must_use]
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    /// Number of steps executed so far in this run
    #[inline]
    #[must_use]
    pub fn steps_executed(&self) -> u64 {
        self.steps_executed.load(Ordering::Relaxed)
    }

    /// Increment the step counter, returning the new count
    pub(crate) fn bump_steps(&self) -> u64 {
        self.steps_executed.fetch_add(1, Ordering::Relaxed) + 1
    }
}

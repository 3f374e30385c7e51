//! The Dag runtime
//!
//! Executes a linked chain of steps starting at a root:
//! - Seeds shared state from caller-supplied initial values
//! - Advances step to step until a step returns `None` or fails
//! - Contains panics at the step boundary and converts them to errors
//! - Invokes completion/error hooks and logs every transition
//!
//! The engine imposes no timeout or cancellation of its own; deadlines
//! belong to the collaborator services attached to the context.

use crate::context::{Extensions, StepContext};
use crate::error::{DagError, StepError};
use crate::step::{NextStep, Step};
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Error hook: receives the name of the step the run stopped at and the error
pub type ErrorHook = Box<dyn Fn(&str, &DagError) + Send + Sync>;

/// Completion hook: receives a report of the finished run
pub type CompleteHook = Box<dyn Fn(&RunReport) + Send + Sync>;

/// Summary of a finished run, handed to the completion hook
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Run identity
    pub run_id: uuid::Uuid,
    /// Name of the dag that ran
    pub dag_name: String,
    /// Steps executed on all paths, parallel branches included
    pub steps_executed: u64,
}

/// A named step graph, executable any number of times
///
/// Each call to [`Dag::run`] creates a fresh run: its own id, its own shared
/// state, its own step counter. Nothing is retained between runs.
pub struct Dag {
    name: String,
    root: Arc<dyn Step>,
    on_error: Option<ErrorHook>,
    on_complete: Option<CompleteHook>,
}

impl Dag {
    /// Create a dag with the given root step
    #[must_use]
    pub fn new(name: &str, root: Arc<dyn Step>) -> Self {
        Self {
            name: name.to_string(),
            root,
            on_error: None,
            on_complete: None,
        }
    }

    /// Register an error hook
    ///
    /// The hook observes the terminal error; it cannot resume execution.
    #[must_use]
    pub fn with_on_error(mut self, hook: ErrorHook) -> Self {
        self.on_error = Some(hook);
        self
    }

    /// Register a completion hook
    #[must_use]
    pub fn with_on_complete(mut self, hook: CompleteHook) -> Self {
        self.on_complete = Some(hook);
        self
    }

    /// Dag name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute the graph from the root until a step returns `None` or fails
    ///
    /// `initial_values` seeds the shared state before the root step runs.
    /// The first step error or recovered panic aborts the run; no retry
    /// happens at this layer.
    ///
    /// # Errors
    /// - `DagError::Step` for a step's own failure
    /// - `DagError::Panicked` for a panic recovered inside a step
    pub async fn run(
        &self,
        extensions: Extensions,
        initial_values: HashMap<String, Value>,
    ) -> Result<(), DagError> {
        let ctx = StepContext::new(&self.name, extensions);
        ctx.state().seed(initial_values);

        tracing::info!(dag = %self.name, run = %ctx.run_id(), "run started");

        let mut current: NextStep = Some(self.root.clone());
        while let Some(step) = current {
            match execute_step(step.as_ref(), &ctx).await {
                Ok(next) => {
                    log_transition(&ctx, step.name(), next.as_deref());
                    current = next;
                }
                Err(source) => {
                    let err = DagError::from_step(step.name(), source);
                    tracing::error!(
                        dag = %self.name,
                        run = %ctx.run_id(),
                        error = %err,
                        "run aborted"
                    );
                    if let Some(hook) = &self.on_error {
                        hook(step.name(), &err);
                    }
                    return Err(err);
                }
            }
        }

        let report = RunReport {
            run_id: ctx.run_id(),
            dag_name: self.name.clone(),
            steps_executed: ctx.steps_executed(),
        };
        tracing::info!(
            dag = %self.name,
            run = %ctx.run_id(),
            steps = report.steps_executed,
            "run completed"
        );
        if let Some(hook) = &self.on_complete {
            hook(&report);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Dag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dag")
            .field("name", &self.name)
            .field("root", &self.root.name())
            .finish()
    }
}

/// Run one step with panic containment
///
/// The single-step primitive shared by the serial engine and the parallel
/// branch step, so both get identical counting and panic conversion.
pub(crate) async fn execute_step(
    step: &dyn Step,
    ctx: &StepContext,
) -> Result<NextStep, StepError> {
    let seq = ctx.bump_steps();
    tracing::debug!(
        dag = %ctx.dag_name(),
        run = %ctx.run_id(),
        step = step.name(),
        seq,
        "executing step"
    );

    match AssertUnwindSafe(step.run(ctx)).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(StepError::Panicked(panic_message(payload))),
    }
}

/// Best-effort logging of a step transition and a state snapshot
///
/// Logging must never fail the run: a snapshot that does not serialize is
/// simply skipped.
fn log_transition(ctx: &StepContext, from: &str, to: Option<&dyn Step>) {
    let to = to.map_or("(end)", Step::name);
    match serde_json::to_string(&ctx.state().snapshot()) {
        Ok(snapshot) => {
            tracing::debug!(
                dag = %ctx.dag_name(),
                run = %ctx.run_id(),
                from,
                to,
                state = %snapshot,
                "step transition"
            );
        }
        Err(_) => {
            tracing::debug!(
                dag = %ctx.dag_name(),
                run = %ctx.run_id(),
                from,
                to,
                "step transition"
            );
        }
    }
}

/// Stringify a recovered panic payload
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

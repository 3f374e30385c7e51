//! The step abstraction
//!
//! A step is one unit of workflow execution: it reads and writes the shared
//! blackboard through its context and returns the next step to run, or
//! `None` to terminate the run. All concrete workflow actions (model calls,
//! document edits, routing decisions) implement this one trait.

use crate::context::StepContext;
use crate::error::StepError;
use async_trait::async_trait;
use std::sync::Arc;

/// The step a run advances to next, if any
pub type NextStep = Option<Arc<dyn Step>>;

/// One unit of workflow execution
///
/// Implementations are stateless with respect to the run: everything a step
/// learns or decides goes through the context's shared state, so that steps
/// can be freely recombined into different graphs.
#[async_trait]
pub trait Step: Send + Sync {
    /// Stable name, used in logs and error reports
    fn name(&self) -> &str;

    /// Execute this step
    ///
    /// Returning `Ok(None)` ends the run successfully. Any `Err` aborts the
    /// run (unless this step runs inside a parallel branch, where failures
    /// are isolated).
    async fn run(&self, ctx: &StepContext) -> Result<NextStep, StepError>;
}

/// A step built from a closure, for small inline actions and tests
pub struct FnStep<F> {
    name: String,
    func: F,
}

impl<F> FnStep<F>
where
    F: Fn(&StepContext) -> Result<NextStep, StepError> + Send + Sync,
{
    /// Wrap a synchronous closure as a step
    pub fn new(name: &str, func: F) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            func,
        })
    }
}

#[async_trait]
impl<F> Step for FnStep<F>
where
    F: Fn(&StepContext) -> Result<NextStep, StepError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &StepContext) -> Result<NextStep, StepError> {
        (self.func)(ctx)
    }
}

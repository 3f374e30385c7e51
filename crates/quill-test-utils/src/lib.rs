//! Testing utilities for the Quill workspace
//!
//! Shared step fixtures for engine tests: recording steps that observe
//! execution order, failing and panicking steps for containment tests.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use quill_dag::{NextStep, Step, StepContext, StepError};
use std::sync::Arc;

/// Order-preserving record of which steps ran
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str) {
        self.entries.lock().push(name.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

/// A step that records its execution and advances to a fixed next step
pub struct RecordingStep {
    name: String,
    log: RunLog,
    next: Option<Arc<dyn Step>>,
}

impl RecordingStep {
    pub fn new(name: &str, log: RunLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log,
            next: None,
        })
    }

    pub fn with_next(name: &str, log: RunLog, next: Arc<dyn Step>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log,
            next: Some(next),
        })
    }
}

#[async_trait]
impl Step for RecordingStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _ctx: &StepContext) -> Result<NextStep, StepError> {
        self.log.record(&self.name);
        Ok(self.next.clone())
    }
}

/// A step that always fails with the given message
pub struct FailingStep {
    name: String,
    message: String,
}

impl FailingStep {
    pub fn new(name: &str, message: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            message: message.to_string(),
        })
    }
}

#[async_trait]
impl Step for FailingStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _ctx: &StepContext) -> Result<NextStep, StepError> {
        Err(StepError::Failed(self.message.clone()))
    }
}

/// A step that panics when run
pub struct PanickingStep {
    name: String,
}

impl PanickingStep {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
        })
    }
}

#[async_trait]
impl Step for PanickingStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _ctx: &StepContext) -> Result<NextStep, StepError> {
        panic!("{} panicked", self.name);
    }
}

/// Build a linear chain of recording steps, returning the root
pub fn chain(log: &RunLog, names: &[&str]) -> Arc<dyn Step> {
    let mut next: Option<Arc<dyn Step>> = None;
    for name in names.iter().rev() {
        let step: Arc<dyn Step> = match next.take() {
            Some(n) => RecordingStep::with_next(name, log.clone(), n),
            None => RecordingStep::new(name, log.clone()),
        };
        next = Some(step);
    }
    next.expect("chain requires at least one step name")
}

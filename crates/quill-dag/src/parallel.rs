//! Parallel branch step
//!
//! Fans out to N sibling steps concurrently, waits for all of them, then
//! resumes a single continuation. Branch failures are isolated: a failing
//! or panicking branch is logged and does not abort its siblings or the
//! parent run.
//!
//! Continuation resolution: a continuation declared on the branch step
//! always wins. Without one, a single branch proposal is honored; two or
//! more proposals are rejected as ambiguous rather than racing on
//! completion order.

use crate::context::StepContext;
use crate::engine::execute_step;
use crate::error::StepError;
use crate::step::{NextStep, Step};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;

/// A step that runs sibling steps concurrently and joins them all
pub struct ParallelStep {
    name: String,
    branches: Vec<Arc<dyn Step>>,
    next: Option<Arc<dyn Step>>,
}

impl ParallelStep {
    /// Create an empty parallel step
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            branches: Vec::new(),
            next: None,
        }
    }

    /// Add a sibling branch
    #[must_use]
    pub fn branch(mut self, step: Arc<dyn Step>) -> Self {
        self.branches.push(step);
        self
    }

    /// Declare the continuation to run after all branches complete
    ///
    /// A declared continuation takes precedence over any branch proposal.
    #[must_use]
    pub fn then(mut self, step: Arc<dyn Step>) -> Self {
        self.next = Some(step);
        self
    }

    /// Number of sibling branches
    #[inline]
    #[must_use]
    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }
}

#[async_trait]
impl Step for ParallelStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &StepContext) -> Result<NextStep, StepError> {
        let handles: Vec<_> = self
            .branches
            .iter()
            .cloned()
            .map(|branch| {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    let name = branch.name().to_string();
                    let result = execute_step(branch.as_ref(), &ctx).await;
                    (name, result)
                })
            })
            .collect();

        let mut proposals: Vec<Arc<dyn Step>> = Vec::new();
        for joined in join_all(handles).await {
            match joined {
                Ok((branch, Ok(Some(next)))) => {
                    tracing::debug!(step = %self.name, branch = %branch, "branch proposed continuation");
                    proposals.push(next);
                }
                Ok((branch, Ok(None))) => {
                    tracing::debug!(step = %self.name, branch = %branch, "branch finished");
                }
                Ok((branch, Err(error))) => {
                    tracing::warn!(
                        step = %self.name,
                        branch = %branch,
                        %error,
                        "branch failed; siblings and run continue"
                    );
                }
                Err(join_error) => {
                    // Panics are already converted by execute_step; this is
                    // task cancellation, which we treat like a failed branch.
                    tracing::warn!(step = %self.name, error = %join_error, "branch task did not complete");
                }
            }
        }

        if let Some(next) = &self.next {
            if !proposals.is_empty() {
                tracing::warn!(
                    step = %self.name,
                    ignored = proposals.len(),
                    "declared continuation overrides branch proposals"
                );
            }
            return Ok(Some(next.clone()));
        }

        match proposals.len() {
            0 => Ok(None),
            1 => Ok(proposals.pop()),
            n => Err(StepError::AmbiguousContinuation(n)),
        }
    }
}

impl std::fmt::Debug for ParallelStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelStep")
            .field("name", &self.name)
            .field("branches", &self.branches.len())
            .field("has_next", &self.next.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Extensions;
    use crate::step::FnStep;

    fn test_ctx() -> StepContext {
        StepContext::new("parallel-tests", Extensions::new())
    }

    #[tokio::test]
    async fn all_branch_writes_visible() {
        let step = ParallelStep::new("fanout")
            .branch(FnStep::new("a", |ctx| {
                ctx.state().set("a", 1)?;
                Ok(None)
            }))
            .branch(FnStep::new("b", |ctx| {
                ctx.state().set("b", 2)?;
                Ok(None)
            }))
            .branch(FnStep::new("c", |ctx| {
                ctx.state().set("c", 3)?;
                Ok(None)
            }));

        let ctx = test_ctx();
        let next = step.run(&ctx).await.unwrap();
        assert!(next.is_none());

        for key in ["a", "b", "c"] {
            assert!(ctx.state().contains(key), "missing key {key}");
        }
    }

    #[tokio::test]
    async fn failing_branch_does_not_abort_siblings() {
        let step = ParallelStep::new("fanout")
            .branch(FnStep::new("bad", |_| {
                Err(StepError::Failed("branch error".into()))
            }))
            .branch(FnStep::new("good", |ctx| {
                ctx.state().set("good", true)?;
                Ok(None)
            }));

        let ctx = test_ctx();
        let result = step.run(&ctx).await;
        assert!(result.is_ok());
        assert_eq!(ctx.state().get::<bool>("good").unwrap(), Some(true));
    }

    #[tokio::test]
    async fn panicking_branch_is_contained() {
        let step = ParallelStep::new("fanout")
            .branch(FnStep::new("boom", |_| panic!("branch panic")))
            .branch(FnStep::new("good", |ctx| {
                ctx.state().set("good", true)?;
                Ok(None)
            }));

        let ctx = test_ctx();
        assert!(step.run(&ctx).await.is_ok());
        assert_eq!(ctx.state().get::<bool>("good").unwrap(), Some(true));
    }

    fn proposer(name: &str) -> Arc<dyn Step> {
        FnStep::new(name, |_| {
            let next: Arc<dyn Step> = FnStep::new("proposal", |_| Ok(None));
            Ok(Some(next))
        })
    }

    #[tokio::test]
    async fn declared_continuation_wins() {
        let cont = FnStep::new("cont", |_| Ok(None));
        let step = ParallelStep::new("fanout")
            .branch(proposer("p1"))
            .then(cont);

        let ctx = test_ctx();
        let next = step.run(&ctx).await.unwrap().expect("continuation");
        assert_eq!(next.name(), "cont");
    }

    #[tokio::test]
    async fn single_proposal_is_honored() {
        let step = ParallelStep::new("fanout")
            .branch(FnStep::new("quiet", |_| Ok(None)))
            .branch(proposer("p1"));

        let ctx = test_ctx();
        let next = step.run(&ctx).await.unwrap().expect("proposal");
        assert_eq!(next.name(), "proposal");
    }

    #[tokio::test]
    async fn multiple_proposals_are_ambiguous() {
        let step = ParallelStep::new("fanout")
            .branch(proposer("p1"))
            .branch(proposer("p2"));

        let ctx = test_ctx();
        // The Ok side holds a trait object, so never format it
        let Err(err) = step.run(&ctx).await else {
            panic!("expected ambiguous continuation to be rejected")
        };
        assert!(matches!(err, StepError::AmbiguousContinuation(2)));
    }
}

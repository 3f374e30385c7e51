//! Quill Dag - step-graph execution engine
//!
//! The runtime that drives incremental AI document rewriting:
//! - Executes a linked chain of steps, each returning the next step or `None`
//! - Ties consecutive steps together through a lock-guarded shared blackboard
//! - Contains step panics at the run boundary
//! - Fans out to concurrent sibling steps through [`ParallelStep`]
//!
//! # Example
//!
//! ```rust,ignore
//! use quill_dag::{Dag, Extensions, FnStep};
//! use std::collections::HashMap;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let root = FnStep::new("greet", |ctx| {
//!     ctx.state().set("greeting", "hello")?;
//!     Ok(None)
//! });
//!
//! let dag = Dag::new("greeter", root);
//! dag.run(Extensions::new(), HashMap::new()).await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod context;
pub mod engine;
pub mod error;
pub mod parallel;
pub mod state;
pub mod step;

// Re-exports for convenience
pub use context::{Extensions, StepContext};
pub use engine::{CompleteHook, Dag, ErrorHook, RunReport};
pub use error::{DagError, StateError, StepError};
pub use parallel::ParallelStep;
pub use state::{SharedState, PRIVATE_PREFIX};
pub use step::{FnStep, NextStep, Step};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for building step graphs
    pub use crate::{
        Dag, DagError, Extensions, FnStep, NextStep, ParallelStep, SharedState, Step, StepContext,
        StepError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

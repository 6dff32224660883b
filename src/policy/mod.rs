//! Per-file compliance policies
//!
//! Architectural Principle: Polymorphism over a single capability - every check is a Policy
//! - Pure in-process predicates (naming rules, closures) and external-process checks
//!   implement the same trait
//! - The evaluator never inspects a policy beyond its id and its per-file outcome

pub mod external;
pub mod naming;
mod process;

use crate::domain::outcome::{CandidateFile, Outcome};

pub use external::{ExternalToolPolicy, ToolMode, ToolSpec};
pub use naming::{NamingPolicy, NamingRule};

/// A compliance check applied independently to each candidate file
pub trait Policy: Send + Sync {
    /// Identifier used in reports and logs
    fn id(&self) -> &str;

    /// Evaluate one file; failures to run are reported as `Outcome::EvaluationError`
    fn evaluate(&self, file: &CandidateFile) -> Outcome;

    /// Whether the policy can run at all, checked once per scan before discovery
    fn readiness(&self) -> Result<(), String> {
        Ok(())
    }
}

impl<P: Policy + ?Sized> Policy for Box<P> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn evaluate(&self, file: &CandidateFile) -> Outcome {
        (**self).evaluate(file)
    }

    fn readiness(&self) -> Result<(), String> {
        (**self).readiness()
    }
}

/// Policy backed by an in-process closure
pub struct PredicatePolicy<F> {
    id: String,
    check: F,
}

impl<F> PredicatePolicy<F>
where
    F: Fn(&CandidateFile) -> Outcome + Send + Sync,
{
    pub fn new(id: impl Into<String>, check: F) -> Self {
        Self { id: id.into(), check }
    }
}

impl<F> Policy for PredicatePolicy<F>
where
    F: Fn(&CandidateFile) -> Outcome + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn evaluate(&self, file: &CandidateFile) -> Outcome {
        (self.check)(file)
    }
}

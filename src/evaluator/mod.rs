//! Per-file policy evaluation
//!
//! CDD Principle: Domain Services - PolicyEvaluator applies one policy to every candidate
//! - Each file is evaluated exactly once and independently of its siblings
//! - Parallel runs use a bounded pool and still return results in discovery order
//! - A panicking policy only affects the file it was evaluating

use crate::domain::outcome::{
    CandidateFile, ComplianceError, ComplianceResult, EvaluationErrorKind, Evaluation, Outcome,
};
use crate::policy::Policy;
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};

/// Options for customizing evaluation behavior
#[derive(Debug, Clone)]
pub struct EvaluationOptions {
    /// Whether to evaluate files on a worker pool
    pub parallel: bool,
    /// Upper bound on concurrent evaluations (and so on concurrent child processes)
    pub max_workers: usize,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            max_workers: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
        }
    }
}

impl EvaluationOptions {
    pub fn sequential() -> Self {
        Self { parallel: false, max_workers: 1 }
    }
}

/// Applies a policy to candidate files
#[derive(Debug, Clone, Default)]
pub struct PolicyEvaluator {
    options: EvaluationOptions,
}

impl PolicyEvaluator {
    pub fn new(options: EvaluationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EvaluationOptions {
        &self.options
    }

    /// Evaluate every file and return outcomes in the order the files were given
    pub fn evaluate(&self, files: &[CandidateFile], policy: &dyn Policy) -> ComplianceResult<Vec<Evaluation>> {
        let workers = self.options.max_workers.max(1);
        if !self.options.parallel || workers == 1 || files.len() <= 1 {
            return Ok(files.iter().map(|file| evaluate_one(file, policy)).collect());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("compliance-eval-{index}"))
            .build()
            .map_err(|e| ComplianceError::execution(format!("Failed to build evaluation pool: {e}")))?;

        tracing::debug!(files = files.len(), workers, policy = policy.id(), "evaluating in parallel");

        // Indexed collect keeps discovery order regardless of completion order.
        Ok(pool.install(|| files.par_iter().map(|file| evaluate_one(file, policy)).collect()))
    }
}

fn evaluate_one(file: &CandidateFile, policy: &dyn Policy) -> Evaluation {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| policy.evaluate(file))).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Outcome::evaluation_error(EvaluationErrorKind::Panicked, message)
    });

    match &outcome {
        Outcome::EvaluationError { kind, detail } => {
            tracing::warn!("Policy {} could not evaluate {}: {} ({})", policy.id(), file, kind.as_str(), detail);
        }
        other => tracing::trace!("{}: {}", file, other.label()),
    }

    Evaluation::new(file.clone(), outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PredicatePolicy;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn files(count: usize) -> Vec<CandidateFile> {
        (0..count).map(|i| CandidateFile::new(format!("/p/file{i:03}.cc"))).collect()
    }

    #[test]
    fn test_each_file_evaluated_exactly_once() {
        let calls = AtomicUsize::new(0);
        let policy = PredicatePolicy::new("count", |_: &CandidateFile| {
            calls.fetch_add(1, Ordering::SeqCst);
            Outcome::Compliant
        });

        let evaluations = PolicyEvaluator::default().evaluate(&files(25), &policy).unwrap();

        assert_eq!(evaluations.len(), 25);
        assert_eq!(calls.load(Ordering::SeqCst), 25);
    }

    #[test]
    fn test_parallel_results_keep_discovery_order() {
        let input = files(40);
        // Earlier files sleep longer so they finish last.
        let policy = PredicatePolicy::new("slow-first", |file: &CandidateFile| {
            let index: u64 = file.display_name().trim_start_matches("file").parse().unwrap();
            thread::sleep(Duration::from_millis(40 - index));
            Outcome::Compliant
        });

        let evaluator = PolicyEvaluator::new(EvaluationOptions { parallel: true, max_workers: 8 });
        let evaluations = evaluator.evaluate(&input, &policy).unwrap();

        let order: Vec<_> = evaluations.into_iter().map(|e| e.file).collect();
        assert_eq!(order, input);
    }

    #[test]
    fn test_failure_in_one_file_does_not_affect_siblings() {
        let input = vec![CandidateFile::new("/p/f1.cc"), CandidateFile::new("/p/f2.cc")];
        let policy = PredicatePolicy::new("flaky", |file: &CandidateFile| {
            if file.display_name() == "f1" {
                Outcome::evaluation_error(EvaluationErrorKind::ToolFailed, "crashed")
            } else {
                Outcome::Compliant
            }
        });

        for options in [EvaluationOptions::sequential(), EvaluationOptions { parallel: true, max_workers: 2 }] {
            let evaluations = PolicyEvaluator::new(options).evaluate(&input, &policy).unwrap();
            assert!(evaluations[0].outcome.is_evaluation_error());
            assert_eq!(evaluations[1].outcome, Outcome::Compliant);
        }
    }

    #[test]
    fn test_panicking_policy_becomes_evaluation_error() {
        let input = files(3);
        let policy = PredicatePolicy::new("panics", |file: &CandidateFile| {
            if file.display_name() == "file001" {
                panic!("rule table exploded");
            }
            Outcome::Compliant
        });

        let evaluations = PolicyEvaluator::new(EvaluationOptions { parallel: true, max_workers: 2 })
            .evaluate(&input, &policy)
            .unwrap();

        assert!(evaluations[0].outcome.is_compliant());
        assert_eq!(evaluations[1].outcome.error_kind(), Some(EvaluationErrorKind::Panicked));
        assert!(evaluations[1].outcome.detail().unwrap().contains("rule table exploded"));
        assert!(evaluations[2].outcome.is_compliant());
    }

    #[test]
    fn test_empty_input() {
        let policy = PredicatePolicy::new("never", |_: &CandidateFile| -> Outcome { unreachable!() });

        assert!(PolicyEvaluator::default().evaluate(&[], &policy).unwrap().is_empty());
    }
}

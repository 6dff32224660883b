//! Domain layer for Compliance Guardian
//!
//! CDD Principle: Domain Model - Pure data for candidates, outcomes and verdicts
//! - Independent of the filesystem walk and of how policies are implemented
//! - Expresses the language of scoped compliance scanning

pub mod outcome;
pub mod report;

// Re-export main domain types for convenience
pub use outcome::*;
pub use report::*;

//! The pipeline's unified error type (distilled spec §7).

use chrono::NaiveDate;
use thiserror::Error;

use crate::commodity::Value;
use crate::xdata::PostingId;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Unparseable expressions, conflicting options, invalid period specs.
    /// Raised at chain construction; no chain is returned.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No subset of in-scope postings before `cutoff` sums to `target`.
    #[error("no subset of postings before {cutoff} sums to {target}")]
    ReconciliationFailure { cutoff: NaiveDate, target: Value },

    /// An expression failed at runtime against a specific posting.
    #[error("evaluation error on posting {posting:?}: {message}")]
    Evaluation { posting: PostingId, message: String },

    /// An entry did not balance, or account xdata underflowed during
    /// clearing. Treated as fatal.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

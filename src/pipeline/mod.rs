//! The transaction pipeline: the handler contract, leaf and accumulating
//! handlers, the chain builder (canonical order), and the account
//! aggregation pass (distilled spec §4).

pub mod account_pass;
pub mod builder;
pub mod by_payee;
pub mod calc;
pub mod changed_value;
pub mod collapse;
pub mod component;
pub mod dow;
pub mod filter;
pub mod interval;
pub mod invert;
pub mod payee;
pub mod reconcile;
pub mod related;
pub mod sort;
pub mod subtotal;
pub mod truncate;

#[cfg(test)]
pub(crate) mod test_support;

use chrono::NaiveDate;

use crate::commodity::Value;
use crate::error::PipelineError;
use crate::xdata::{AccountRef, PostingRef, Report};

/// One stage of the transaction pipeline. `accept` may forward zero, one,
/// or many postings downstream; `flush` must emit any buffered output and
/// then call the downstream handler's `flush` exactly once (§4.1).
pub trait PostHandler {
    fn accept(&mut self, report: &mut Report, posting: PostingRef) -> Result<(), PipelineError>;
    fn flush(&mut self, report: &mut Report) -> Result<(), PipelineError>;
}

/// The account-report analogue of [`PostHandler`], driven over the
/// account tree by the aggregation pass (§4.5 phase 3).
pub trait AccountHandler {
    fn accept(&mut self, report: &mut Report, account: AccountRef) -> Result<(), PipelineError>;
    fn flush(&mut self, report: &mut Report) -> Result<(), PipelineError>;
}

/// Feeds every session posting into `chain`, head to tail, in journal
/// order, then flushes it (§4.6). If `accept` errors partway through,
/// remaining postings are not delivered, but `chain.flush` still runs to
/// release buffered state before the error surfaces (§7's propagation
/// policy).
pub fn drive(report: &mut Report, chain: &mut dyn PostHandler) -> Result<(), PipelineError> {
    for posting in report.session_postings() {
        if let Err(err) = chain.accept(report, posting) {
            let _ = chain.flush(report);
            return Err(err);
        }
    }
    chain.flush(report)
}

/// Plain-data configuration, built from `clap` args in `main.rs` or
/// directly in tests, consumed by [`builder::build_chain`] (§4.7,
/// ambient — the concrete carrier for distilled §6's option table).
#[derive(Debug, Clone, Default)]
pub struct ReportConfig {
    pub predicate: Option<String>,
    pub display_predicate: Option<String>,
    pub secondary_predicate: Option<String>,
    pub sort_string: Option<String>,
    pub entry_sort: bool,
    pub head_entries: Option<usize>,
    pub tail_entries: Option<usize>,
    /// `;`-separated component-expansion predicates, applied right-to-left.
    pub descend_expr: Vec<String>,
    pub reconcile_balance: Option<Value>,
    pub reconcile_date: Option<NaiveDate>,
    pub show_revalued: bool,
    pub show_revalued_only: bool,
    pub show_collapsed: bool,
    pub show_subtotal: bool,
    pub days_of_the_week: bool,
    pub by_payee: bool,
    pub report_period: Option<String>,
    pub show_inverted: bool,
    pub show_related: bool,
    pub show_all_related: bool,
    pub comm_as_payee: bool,
    pub code_as_payee: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{two_account_report, Collector};

    /// Errors on the first posting it sees; forwards nothing.
    struct FailsImmediately {
        downstream: Box<dyn PostHandler>,
    }

    impl PostHandler for FailsImmediately {
        fn accept(&mut self, _report: &mut Report, _posting: PostingRef) -> Result<(), PipelineError> {
            Err(PipelineError::InvariantViolation("boom".to_string()))
        }
        fn flush(&mut self, report: &mut Report) -> Result<(), PipelineError> {
            self.downstream.flush(report)
        }
    }

    #[test]
    fn drive_still_flushes_the_chain_when_accept_errors() {
        let (mut report, ids) = two_account_report();
        let (sink, seen, flushes) = Collector::new();
        let mut chain: Box<dyn PostHandler> = Box::new(FailsImmediately { downstream: sink });

        let result = drive(&mut report, chain.as_mut());

        assert!(matches!(result, Err(PipelineError::InvariantViolation(_))));
        assert_eq!(*flushes.borrow(), 1);
        assert!(seen.borrow().is_empty());
        assert_eq!(ids.len(), 2);
    }
}

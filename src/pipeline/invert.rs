//! **invert**: forwards every posting with its amount negated in xdata
//! (§4.2). The underlying posting amount is untouched; downstream reads
//! the effective amount.

use crate::error::PipelineError;
use crate::pipeline::PostHandler;
use crate::xdata::{PostingRef, Report};

pub struct Invert {
    downstream: Box<dyn PostHandler>,
}

impl Invert {
    pub fn new(downstream: Box<dyn PostHandler>) -> Invert {
        Invert { downstream }
    }
}

impl PostHandler for Invert {
    fn accept(&mut self, report: &mut Report, posting: PostingRef) -> Result<(), PipelineError> {
        let negated = -report.effective_amount(posting);
        report.posting_xdata_mut(posting).amount_override = Some(negated);
        self.downstream.accept(report, posting)
    }

    fn flush(&mut self, report: &mut Report) -> Result<(), PipelineError> {
        self.downstream.flush(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{collector, two_account_report};

    #[test]
    fn negates_the_effective_amount_without_touching_the_posting() {
        let (mut report, ids) = two_account_report();
        let original = report.posting(ids[0]).amount.clone();
        let (sink, seen) = collector();
        let mut inv = Invert::new(sink);
        inv.accept(&mut report, ids[0]).unwrap();
        inv.flush(&mut report).unwrap();

        assert_eq!(*seen.borrow(), vec![ids[0]]);
        assert_eq!(report.effective_amount(ids[0]), -original.clone());
        assert_eq!(report.posting(ids[0]).amount, original);
    }
}

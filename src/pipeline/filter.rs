//! **filter**: forwards a posting iff a predicate holds for it (§4.2).

use crate::error::PipelineError;
use crate::pipeline::PostHandler;
use crate::predicate::Predicate;
use crate::xdata::{PostingRef, Report};

pub struct Filter {
    predicate: Box<dyn Predicate>,
    downstream: Box<dyn PostHandler>,
}

impl Filter {
    pub fn new(predicate: Box<dyn Predicate>, downstream: Box<dyn PostHandler>) -> Filter {
        Filter { predicate, downstream }
    }
}

impl PostHandler for Filter {
    fn accept(&mut self, report: &mut Report, posting: PostingRef) -> Result<(), PipelineError> {
        if self.predicate.eval(report, posting)? {
            self.downstream.accept(report, posting)?;
        }
        Ok(())
    }

    fn flush(&mut self, report: &mut Report) -> Result<(), PipelineError> {
        self.downstream.flush(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{collector, two_account_report};
    use crate::predicate;

    #[test]
    fn drops_postings_the_predicate_rejects() {
        let (mut report, ids) = two_account_report();
        let (sink, seen) = collector();
        let pred = predicate::parse("account==Assets:Bank").unwrap();
        let mut f = Filter::new(pred, sink);
        for id in &ids {
            f.accept(&mut report, *id).unwrap();
        }
        f.flush(&mut report).unwrap();
        assert_eq!(*seen.borrow(), vec![ids[1]]);
    }
}

//! **component_xacts(expr)**: expands a posting carrying remembered
//! components back into those components when `expr` matches, replacing
//! the aggregate posting; otherwise passes the posting through unchanged
//! (§4.3). Chained stages apply right-to-left (§4.4 step 4).

use crate::error::PipelineError;
use crate::pipeline::PostHandler;
use crate::predicate::Predicate;
use crate::xdata::{PostingRef, Report};

pub struct ComponentXacts {
    expr: Box<dyn Predicate>,
    downstream: Box<dyn PostHandler>,
}

impl ComponentXacts {
    pub fn new(expr: Box<dyn Predicate>, downstream: Box<dyn PostHandler>) -> ComponentXacts {
        ComponentXacts { expr, downstream }
    }
}

impl PostHandler for ComponentXacts {
    fn accept(&mut self, report: &mut Report, posting: PostingRef) -> Result<(), PipelineError> {
        let components = report.posting_xdata(posting).components.clone();
        if components.is_empty() || !self.expr.eval(report, posting)? {
            return self.downstream.accept(report, posting);
        }
        for component in components {
            self.downstream.accept(report, component)?;
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
    use crate::pipeline::subtotal::Subtotal;
    use crate::pipeline::test_support::{collector, running_total_fixture};
    use crate::predicate;

    #[test]
    fn expands_components_of_matching_aggregates() {
        let (mut report, ids) = running_total_fixture();
        let (collect, seen) = collector();
        let expand = Box::new(ComponentXacts::new(predicate::parse("true").unwrap(), collect));
        let mut subtotal = Subtotal::new(true, expand);
        for id in &ids {
            subtotal.accept(&mut report, *id).unwrap();
        }
        subtotal.flush(&mut report).unwrap();

        // The two synthetic aggregates (A, B) each expand back to their
        // two contributing postings: four originals, not two aggregates.
        assert_eq!(seen.borrow().len(), 4);
        for p in seen.borrow().iter() {
            assert!(ids.contains(p));
        }
    }

    #[test]
    fn passes_through_postings_without_components() {
        let (mut report, ids) = running_total_fixture();
        let (collect, seen) = collector();
        let mut expand = ComponentXacts::new(predicate::parse("true").unwrap(), collect);
        for id in &ids {
            expand.accept(&mut report, *id).unwrap();
        }
        expand.flush(&mut report).unwrap();
        assert_eq!(*seen.borrow(), ids);
    }
}

//! **calc**: maintains a running total across every posting it sees,
//! snapshotting it into each posting's xdata before forwarding (§4.3).
//! Placement in the chain determines which postings contribute to the
//! total (§4.4's rationale).

use crate::error::PipelineError;
use crate::commodity::Value;
use crate::pipeline::PostHandler;
use crate::xdata::{PostingRef, Report};

pub struct Calc {
    running: Value,
    downstream: Box<dyn PostHandler>,
}

impl Calc {
    pub fn new(downstream: Box<dyn PostHandler>) -> Calc {
        Calc { running: Value::Null, downstream }
    }
}

impl PostHandler for Calc {
    fn accept(&mut self, report: &mut Report, posting: PostingRef) -> Result<(), PipelineError> {
        self.running += &report.effective_amount(posting);
        report.posting_xdata_mut(posting).running_total = Some(self.running.clone());
        self.downstream.accept(report, posting)
    }

    fn flush(&mut self, report: &mut Report) -> Result<(), PipelineError> {
        self.downstream.flush(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{collector, running_total_fixture};
    use crate::value;

    #[test]
    fn snapshots_match_the_spec_eight_scenario_one() {
        let (mut report, ids) = running_total_fixture();
        let (sink, seen) = collector();
        let mut calc = Calc::new(sink);
        for id in &ids {
            calc.accept(&mut report, *id).unwrap();
        }
        calc.flush(&mut report).unwrap();

        assert_eq!(*seen.borrow(), ids);
        let snapshots: Vec<Value> = ids
            .iter()
            .map(|id| report.posting_xdata(*id).running_total.clone().unwrap())
            .collect();
        assert_eq!(
            snapshots,
            vec![value!(10, "USD"), Value::Null, value!(5, "USD"), Value::Null]
        );
    }
}

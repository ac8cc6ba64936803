//! **set_comm_as_payee** / **set_code_as_payee**: rewrites the effective
//! payee in xdata, to the posting's commodity symbol or the entry's code
//! respectively (§4.2). The two modes are mutually exclusive; commodity
//! wins if both are requested (§4.4 step 16).

use crate::error::PipelineError;
use crate::pipeline::PostHandler;
use crate::xdata::{PostingRef, Report};

pub struct SetCommAsPayee {
    downstream: Box<dyn PostHandler>,
}

impl SetCommAsPayee {
    pub fn new(downstream: Box<dyn PostHandler>) -> SetCommAsPayee {
        SetCommAsPayee { downstream }
    }
}

impl PostHandler for SetCommAsPayee {
    fn accept(&mut self, report: &mut Report, posting: PostingRef) -> Result<(), PipelineError> {
        let amount = report.effective_amount(posting);
        if let Some(q) = amount.to_quantity() {
            report.posting_xdata_mut(posting).payee_override = Some(q.s.to_string());
        }
        self.downstream.accept(report, posting)
    }

    fn flush(&mut self, report: &mut Report) -> Result<(), PipelineError> {
        self.downstream.flush(report)
    }
}

pub struct SetCodeAsPayee {
    downstream: Box<dyn PostHandler>,
}

impl SetCodeAsPayee {
    pub fn new(downstream: Box<dyn PostHandler>) -> SetCodeAsPayee {
        SetCodeAsPayee { downstream }
    }
}

impl PostHandler for SetCodeAsPayee {
    fn accept(&mut self, report: &mut Report, posting: PostingRef) -> Result<(), PipelineError> {
        let entry = report.posting(posting).entry;
        if let Some(code) = report.entry(entry).code.clone() {
            report.posting_xdata_mut(posting).payee_override = Some(code);
        }
        self.downstream.accept(report, posting)
    }

    fn flush(&mut self, report: &mut Report) -> Result<(), PipelineError> {
        self.downstream.flush(report)
    }
}

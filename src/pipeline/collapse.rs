//! **collapse**: collapses every posting of one entry into a single
//! synthetic posting per commodity, attached to a synthetic entry that
//! clones the original header (§4.3).

use crate::commodity::Value;
use crate::error::PipelineError;
use crate::journal::AccName;
use crate::pipeline::PostHandler;
use crate::xdata::{EntryId, PostingRef, Report};

const TOTAL_ACCOUNT: &str = "<Total>";

pub struct Collapse {
    current_entry: Option<EntryId>,
    buffer: Vec<PostingRef>,
    downstream: Box<dyn PostHandler>,
}

impl Collapse {
    pub fn new(downstream: Box<dyn PostHandler>) -> Collapse {
        Collapse { current_entry: None, buffer: Vec::new(), downstream }
    }

    fn flush_buffered_entry(&mut self, report: &mut Report) -> Result<(), PipelineError> {
        let Some(entry) = self.current_entry.take() else {
            return Ok(());
        };
        let postings = std::mem::take(&mut self.buffer);
        if postings.is_empty() {
            return Ok(());
        }

        let distinct_accounts: std::collections::HashSet<_> =
            postings.iter().map(|p| report.posting(*p).account).collect();
        let account = if distinct_accounts.len() == 1 {
            *distinct_accounts.iter().next().unwrap()
        } else {
            report.get_or_create_account(&AccName::from(TOTAL_ACCOUNT))
        };

        let total: Value = postings.iter().map(|p| report.effective_amount(*p)).sum();

        let source = report.entry(entry);
        let (date, payee, code) = (source.effective_date, source.payee.clone(), source.code.clone());
        let synthetic_entry = report.alloc_synthetic_entry(date, payee, code);

        for q in total.iter_quantities() {
            let synthetic = report.alloc_synthetic_posting(synthetic_entry, account, Value::from_quantity(q));
            self.downstream.accept(report, synthetic)?;
        }
        Ok(())
    }
}

impl PostHandler for Collapse {
    fn accept(&mut self, report: &mut Report, posting: PostingRef) -> Result<(), PipelineError> {
        let entry = report.posting(posting).entry;
        if self.current_entry != Some(entry) {
            self.flush_buffered_entry(report)?;
            self.current_entry = Some(entry);
        }
        self.buffer.push(posting);
        Ok(())
    }

    fn flush(&mut self, report: &mut Report) -> Result<(), PipelineError> {
        self.flush_buffered_entry(report)?;
        self.downstream.flush(report)
    }
}

//! **related**: expands a forwarded posting into the other postings of
//! its entry (§4.2). A per-entry guard stops an entry from being expanded
//! more than once, even if several of its postings reach this handler.

use std::collections::HashSet;

use crate::error::PipelineError;
use crate::pipeline::PostHandler;
use crate::xdata::{EntryId, PostingRef, Report};

pub struct Related {
    show_all: bool,
    expanded: HashSet<EntryId>,
    downstream: Box<dyn PostHandler>,
}

impl Related {
    pub fn new(show_all: bool, downstream: Box<dyn PostHandler>) -> Related {
        Related { show_all, expanded: HashSet::new(), downstream }
    }
}

impl PostHandler for Related {
    fn accept(&mut self, report: &mut Report, posting: PostingRef) -> Result<(), PipelineError> {
        let entry = report.posting(posting).entry;
        if !self.expanded.insert(entry) {
            return Ok(());
        }

        for sibling in report.entry_postings(entry) {
            let already_matched = report.posting_xdata(sibling).matched;
            if sibling == posting || self.show_all || !already_matched {
                report.posting_xdata_mut(sibling).matched = true;
                self.downstream.accept(report, sibling)?;
            }
        }
        Ok(())
    }

    fn flush(&mut self, report: &mut Report) -> Result<(), PipelineError> {
        self.downstream.flush(report)
    }
}

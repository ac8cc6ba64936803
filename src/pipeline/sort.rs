//! **sort(key_expr)** / **sort_entries(key_expr)**: buffer every forwarded
//! posting, order by a key expression on flush (stable, ascending), emit,
//! then forward flush (§4.3).

use crate::error::PipelineError;
use crate::keyexpr::KeyEvaluator;
use crate::pipeline::PostHandler;
use crate::xdata::{EntryId, PostingRef, Report};

/// Sorts by the key evaluated on each individual posting.
pub struct Sort {
    key: Box<dyn KeyEvaluator>,
    buffer: Vec<PostingRef>,
    downstream: Box<dyn PostHandler>,
}

impl Sort {
    pub fn new(key: Box<dyn KeyEvaluator>, downstream: Box<dyn PostHandler>) -> Sort {
        Sort { key, buffer: Vec::new(), downstream }
    }
}

impl PostHandler for Sort {
    fn accept(&mut self, _report: &mut Report, posting: PostingRef) -> Result<(), PipelineError> {
        self.buffer.push(posting);
        Ok(())
    }

    fn flush(&mut self, report: &mut Report) -> Result<(), PipelineError> {
        let mut keyed = Vec::with_capacity(self.buffer.len());
        for posting in self.buffer.drain(..) {
            let key = self.key.eval(report, posting)?;
            keyed.push((key, posting));
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, posting) in keyed {
            self.downstream.accept(report, posting)?;
        }
        self.downstream.flush(report)
    }
}

/// Sorts by the key evaluated once per entry (on that entry's first
/// forwarded posting); postings of one entry stay contiguous and in
/// their original relative order.
pub struct SortEntries {
    key: Box<dyn KeyEvaluator>,
    order: Vec<EntryId>,
    buffer: std::collections::HashMap<EntryId, Vec<PostingRef>>,
    downstream: Box<dyn PostHandler>,
}

impl SortEntries {
    pub fn new(key: Box<dyn KeyEvaluator>, downstream: Box<dyn PostHandler>) -> SortEntries {
        SortEntries {
            key,
            order: Vec::new(),
            buffer: std::collections::HashMap::new(),
            downstream,
        }
    }
}

impl PostHandler for SortEntries {
    fn accept(&mut self, report: &mut Report, posting: PostingRef) -> Result<(), PipelineError> {
        let entry = report.posting(posting).entry;
        if !self.buffer.contains_key(&entry) {
            self.order.push(entry);
        }
        self.buffer.entry(entry).or_default().push(posting);
        Ok(())
    }

    fn flush(&mut self, report: &mut Report) -> Result<(), PipelineError> {
        let mut keyed = Vec::with_capacity(self.order.len());
        for entry in &self.order {
            let postings = &self.buffer[entry];
            let key = self.key.eval(report, postings[0])?;
            keyed.push((key, *entry));
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, entry) in keyed {
            for posting in self.buffer.remove(&entry).unwrap_or_default() {
                self.downstream.accept(report, posting)?;
            }
        }
        self.downstream.flush(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyexpr;
    use crate::pipeline::test_support::{collector, running_total_fixture};

    #[test]
    fn sorts_postings_by_amount_ascending() {
        let (mut report, ids) = running_total_fixture();
        let (sink, seen) = collector();
        let mut sort = Sort::new(keyexpr::parse("amount").unwrap(), sink);
        for id in &ids {
            sort.accept(&mut report, *id).unwrap();
        }
        sort.flush(&mut report).unwrap();
        // B postings are negative, so they sort before the A postings.
        assert_eq!(*seen.borrow(), vec![ids[1], ids[3], ids[2], ids[0]]);
    }

    #[test]
    fn sort_entries_keeps_entry_postings_contiguous() {
        let (mut report, ids) = running_total_fixture();
        let (sink, seen) = collector();
        // Sorting by account: entry 2's first posting is "A" same as
        // entry 1's, so order is stable and each entry's two postings
        // stay adjacent.
        let mut sort = SortEntries::new(keyexpr::parse("account").unwrap(), sink);
        for id in &ids {
            sort.accept(&mut report, *id).unwrap();
        }
        sort.flush(&mut report).unwrap();
        assert_eq!(*seen.borrow(), ids);
    }
}

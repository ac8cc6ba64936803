//! **truncate_entries(head_n, tail_n)**: buffers postings by owning
//! entry; on flush, emits the first `head_n` entries and the last
//! `tail_n` entries (union, overlap deduplicated), each in full (§4.2).

use std::collections::{HashMap, HashSet};

use crate::error::PipelineError;
use crate::pipeline::PostHandler;
use crate::xdata::{EntryId, PostingRef, Report};

pub struct TruncateEntries {
    head: usize,
    tail: usize,
    entry_order: Vec<EntryId>,
    buffer: HashMap<EntryId, Vec<PostingRef>>,
    downstream: Box<dyn PostHandler>,
}

impl TruncateEntries {
    pub fn new(head: Option<usize>, tail: Option<usize>, downstream: Box<dyn PostHandler>) -> TruncateEntries {
        TruncateEntries {
            head: head.unwrap_or(0),
            tail: tail.unwrap_or(0),
            entry_order: Vec::new(),
            buffer: HashMap::new(),
            downstream,
        }
    }
}

impl PostHandler for TruncateEntries {
    fn accept(&mut self, report: &mut Report, posting: PostingRef) -> Result<(), PipelineError> {
        let entry = report.posting(posting).entry;
        if !self.buffer.contains_key(&entry) {
            self.entry_order.push(entry);
        }
        self.buffer.entry(entry).or_default().push(posting);
        Ok(())
    }

    fn flush(&mut self, report: &mut Report) -> Result<(), PipelineError> {
        let e = self.entry_order.len();
        let admitted: HashSet<EntryId> = if self.head == 0 && self.tail == 0 {
            self.entry_order.iter().copied().collect()
        } else {
            let head_entries = &self.entry_order[..self.head.min(e)];
            let tail_start = e.saturating_sub(self.tail);
            let tail_entries = &self.entry_order[tail_start..];
            head_entries.iter().chain(tail_entries).copied().collect()
        };

        for entry in &self.entry_order {
            if admitted.contains(entry) {
                for posting in self.buffer.remove(entry).unwrap_or_default() {
                    self.downstream.accept(report, posting)?;
                }
            }
        }
        self.downstream.flush(report)
    }
}

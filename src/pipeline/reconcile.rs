//! **reconcile(target_balance, cutoff_date)**: buffers postings with
//! effective date ≤ cutoff, then on flush selects the subset whose summed
//! effective amount equals `target_balance`, forwarding it in original
//! order. Postings after cutoff pass through unbuffered (§4.3).
//!
//! Tie-breaking among subsets that sum to target (open question, §9):
//! smallest count first, and within one count, the subset found by
//! searching combinations in latest-date-first order.

use chrono::NaiveDate;

use crate::commodity::Value;
use crate::error::PipelineError;
use crate::pipeline::PostHandler;
use crate::xdata::{PostingRef, Report};

pub struct Reconcile {
    target: Value,
    cutoff: NaiveDate,
    buffer: Vec<PostingRef>,
    downstream: Box<dyn PostHandler>,
}

impl Reconcile {
    pub fn new(target: Value, cutoff: NaiveDate, downstream: Box<dyn PostHandler>) -> Reconcile {
        Reconcile { target, cutoff, buffer: Vec::new(), downstream }
    }
}

impl PostHandler for Reconcile {
    fn accept(&mut self, report: &mut Report, posting: PostingRef) -> Result<(), PipelineError> {
        if report.effective_date(posting) <= self.cutoff {
            self.buffer.push(posting);
            Ok(())
        } else {
            self.downstream.accept(report, posting)
        }
    }

    fn flush(&mut self, report: &mut Report) -> Result<(), PipelineError> {
        let buffered = std::mem::take(&mut self.buffer);
        if buffered.is_empty() {
            return self.downstream.flush(report);
        }

        let mut by_latest_first: Vec<PostingRef> = buffered.clone();
        by_latest_first.sort_by_key(|p| std::cmp::Reverse(report.effective_date(*p)));
        let amounts: Vec<Value> = by_latest_first.iter().map(|p| report.effective_amount(*p)).collect();

        let chosen_indices = match find_subset(&amounts, &self.target) {
            Some(indices) => indices,
            None => {
                let _ = self.downstream.flush(report);
                return Err(PipelineError::ReconciliationFailure {
                    cutoff: self.cutoff,
                    target: self.target.clone(),
                });
            }
        };
        let selected: std::collections::HashSet<PostingRef> =
            chosen_indices.into_iter().map(|i| by_latest_first[i]).collect();

        for posting in &buffered {
            if selected.contains(posting) {
                if let Err(err) = self.downstream.accept(report, *posting) {
                    let _ = self.downstream.flush(report);
                    return Err(err);
                }
            }
        }
        self.downstream.flush(report)
    }
}

/// Finds the smallest-count subset of `amounts` summing to `target`,
/// breaking ties among equal-size subsets by preferring ones found
/// earlier in index order (the caller orders `amounts` latest-date-first
/// to realize the "latest date first" tie-break).
fn find_subset(amounts: &[Value], target: &Value) -> Option<Vec<usize>> {
    for k in 0..=amounts.len() {
        tracing::trace!(k, candidates = amounts.len(), "reconcile: searching subsets of this size");
        if let Some(combo) = search_size(amounts, target, k) {
            tracing::debug!(k, ?combo, "reconcile: found a subset summing to target");
            return Some(combo);
        }
    }
    tracing::debug!(candidates = amounts.len(), %target, "reconcile: no subset of any size sums to target");
    None
}

fn search_size(amounts: &[Value], target: &Value, k: usize) -> Option<Vec<usize>> {
    let mut chosen = Vec::with_capacity(k);
    search_from(amounts, target, k, 0, &mut chosen, &Value::Null)
}

fn search_from(
    amounts: &[Value],
    target: &Value,
    k: usize,
    start: usize,
    chosen: &mut Vec<usize>,
    running: &Value,
) -> Option<Vec<usize>> {
    if chosen.len() == k {
        tracing::trace!(?chosen, %running, "reconcile: candidate subset tried");
        return if running == target { Some(chosen.clone()) } else { None };
    }
    for i in start..amounts.len() {
        let mut next_running = running.clone();
        next_running += &amounts[i];
        chosen.push(i);
        if let Some(found) = search_from(amounts, target, k, i + 1, chosen, &next_running) {
            return Some(found);
        }
        chosen.pop();
    }
    None
}

//! **subtotal**: buffers every posting, then on flush emits one synthetic
//! entry with one posting per (account, commodity) that received
//! nonzero postings, in account depth-first / commodity-insertion order
//! (§4.3). With `remember_components`, each synthetic posting records
//! which postings fed it, for later `component_xacts` expansion.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::account::AccountId;
use crate::commodity::Value;
use crate::error::PipelineError;
use crate::pipeline::PostHandler;
use crate::symbol::Symbol;
use crate::xdata::{PostingRef, Report};

/// Shared by `subtotal` and `interval` (each period bucket in `interval`
/// is, internally, a subtotal over just that bucket's postings).
#[derive(Default)]
pub(crate) struct AccountAccumulator {
    order: Vec<Symbol>,
    sums: HashMap<Symbol, Decimal>,
    contributors: HashMap<Symbol, Vec<PostingRef>>,
}

impl AccountAccumulator {
    pub(crate) fn add(&mut self, sym: Symbol, qty: Decimal, source: PostingRef) {
        if !self.sums.contains_key(&sym) {
            self.order.push(sym);
        }
        *self.sums.entry(sym).or_insert(Decimal::ZERO) += qty;
        self.contributors.entry(sym).or_default().push(source);
    }
}

/// Allocates one synthetic posting per (account, commodity) in
/// `by_account`, in account depth-first / commodity-insertion order,
/// under `entry`, forwarding each to `downstream`. Shared by `subtotal`
/// and each bucket of `interval`.
pub(crate) fn emit_accumulated(
    report: &mut Report,
    entry: crate::xdata::EntryId,
    mut by_account: HashMap<AccountId, AccountAccumulator>,
    remember_components: bool,
    downstream: &mut dyn PostHandler,
) -> Result<(), PipelineError> {
    for account in report.accounts.depth_first() {
        let Some(acc) = by_account.remove(&account) else {
            continue;
        };
        for sym in &acc.order {
            let qty = acc.sums[sym];
            if qty == Decimal::ZERO {
                continue;
            }
            let posting = report.alloc_synthetic_posting(entry, account, Value::new(qty, *sym));
            if remember_components {
                report.posting_xdata_mut(posting).components = acc.contributors[sym].clone();
            }
            downstream.accept(report, posting)?;
        }
    }
    Ok(())
}

pub struct Subtotal {
    remember_components: bool,
    by_account: HashMap<AccountId, AccountAccumulator>,
    downstream: Box<dyn PostHandler>,
}

impl Subtotal {
    pub fn new(remember_components: bool, downstream: Box<dyn PostHandler>) -> Subtotal {
        Subtotal { remember_components, by_account: HashMap::new(), downstream }
    }
}

impl PostHandler for Subtotal {
    fn accept(&mut self, report: &mut Report, posting: PostingRef) -> Result<(), PipelineError> {
        let account = report.posting(posting).account;
        let amount = report.effective_amount(posting);
        let acc = self.by_account.entry(account).or_default();
        for q in amount.iter_quantities() {
            acc.add(q.s, q.q, posting);
        }
        Ok(())
    }

    fn flush(&mut self, report: &mut Report) -> Result<(), PipelineError> {
        if self.by_account.is_empty() {
            return self.downstream.flush(report);
        }

        let date = crate::misc::today();
        let entry = report.alloc_synthetic_entry(date, "Subtotal".to_string(), None);
        let by_account = std::mem::take(&mut self.by_account);
        emit_accumulated(report, entry, by_account, self.remember_components, self.downstream.as_mut())?;
        self.downstream.flush(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{collector, running_total_fixture};
    use rust_decimal::dec;

    #[test]
    fn subtotals_match_the_spec_eight_scenario_two() {
        let (mut report, ids) = running_total_fixture();
        let (sink, seen) = collector();
        let mut subtotal = Subtotal::new(false, sink);
        for id in &ids {
            subtotal.accept(&mut report, *id).unwrap();
        }
        subtotal.flush(&mut report).unwrap();

        let emitted = seen.borrow();
        assert_eq!(emitted.len(), 2);
        let amounts: Vec<Value> = emitted.iter().map(|p| report.effective_amount(*p)).collect();
        assert!(amounts.contains(&crate::value!(15, "USD")));
        assert!(amounts.contains(&crate::value!(-15, "USD")));
    }

    #[test]
    fn remembers_components_when_asked() {
        let (mut report, ids) = running_total_fixture();
        let (sink, seen) = collector();
        let mut subtotal = Subtotal::new(true, sink);
        for id in &ids {
            subtotal.accept(&mut report, *id).unwrap();
        }
        subtotal.flush(&mut report).unwrap();

        let synthetic = seen.borrow()[0];
        assert!(!report.posting_xdata(synthetic).components.is_empty());
    }
}

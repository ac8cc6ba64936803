//! **changed_value**: between consecutive forwarded postings, revalues
//! commodities held so far against an external [`PriceSource`], emitting
//! a synthetic posting to a `<Revalued>` placeholder account for any
//! commodity whose price moved (§4.3).
//!
//! Dating decision (open question, §9): the revaluation posting is dated
//! at the price-change date, not the later posting's date, per §4.3's own
//! wording ("...dated at the price-change date"). `PriceSource` only
//! answers "what was the price as of date d", so the change date is found
//! by scanning day-by-day from the earlier posting's date, exclusive, to
//! the later one, inclusive, for the first day any held commodity's price
//! differs from its price on the earlier date.

use std::collections::HashMap;
use std::rc::Rc;

use rust_decimal::Decimal;

use crate::commodity::Value;
use crate::error::PipelineError;
use crate::journal::AccName;
use crate::pipeline::PostHandler;
use crate::pricedb::PriceSource;
use crate::symbol::Symbol;
use crate::xdata::{PostingRef, Report};

const REVALUED_ACCOUNT: &str = "<Revalued>";

pub struct ChangedValue {
    prices: Rc<dyn PriceSource>,
    show_revalued_only: bool,
    held: HashMap<Symbol, Decimal>,
    last_date: Option<chrono::NaiveDate>,
    downstream: Box<dyn PostHandler>,
}

impl ChangedValue {
    pub fn new(prices: Rc<dyn PriceSource>, show_revalued_only: bool, downstream: Box<dyn PostHandler>) -> ChangedValue {
        ChangedValue { prices, show_revalued_only, held: HashMap::new(), last_date: None, downstream }
    }

    fn revalue(&self, date_before: chrono::NaiveDate, date_after: chrono::NaiveDate) -> Value {
        let mut delta = Value::Null;
        for (&sym, &qty) in &self.held {
            if qty == Decimal::ZERO {
                continue;
            }
            let before = self.prices.price_at(sym, date_before).and_then(|v| v.to_quantity());
            let after = self.prices.price_at(sym, date_after).and_then(|v| v.to_quantity());
            if let (Some(before), Some(after)) = (before, after) {
                if before.s == after.s && before.q != after.q {
                    delta += &Value::new(qty * (after.q - before.q), after.s);
                }
            }
        }
        delta
    }

    /// Scans day-by-day from `date_before` (exclusive) to `date_after`
    /// (inclusive) for the first date on which any held commodity's price
    /// differs from its price on `date_before`. Falls back to
    /// `date_after` if no such day is found (e.g. the source only knows
    /// prices as-of the two endpoints).
    fn find_change_date(&self, date_before: chrono::NaiveDate, date_after: chrono::NaiveDate) -> chrono::NaiveDate {
        let mut d = date_before;
        while d < date_after {
            d = match d.succ_opt() {
                Some(next) => next,
                None => break,
            };
            for (&sym, &qty) in &self.held {
                if qty == Decimal::ZERO {
                    continue;
                }
                let before = self.prices.price_at(sym, date_before).and_then(|v| v.to_quantity());
                let at_d = self.prices.price_at(sym, d).and_then(|v| v.to_quantity());
                if let (Some(before), Some(at_d)) = (before, at_d) {
                    if before.s == at_d.s && before.q != at_d.q {
                        return d;
                    }
                }
            }
        }
        date_after
    }
}

impl PostHandler for ChangedValue {
    fn accept(&mut self, report: &mut Report, posting: PostingRef) -> Result<(), PipelineError> {
        let date = report.effective_date(posting);
        if let Some(last) = self.last_date {
            if date > last {
                let delta = self.revalue(last, date);
                if delta != Value::Null {
                    let change_date = self.find_change_date(last, date);
                    let account = report.get_or_create_account(&AccName::from(REVALUED_ACCOUNT));
                    let entry = report.alloc_synthetic_entry(change_date, "Revaluation".to_string(), None);
                    for q in delta.iter_quantities() {
                        let synthetic = report.alloc_synthetic_posting(entry, account, Value::from_quantity(q));
                        self.downstream.accept(report, synthetic)?;
                    }
                }
            }
        }
        self.last_date = Some(date);

        let amount = report.effective_amount(posting);
        for q in amount.iter_quantities() {
            *self.held.entry(q.s).or_insert(Decimal::ZERO) += q.q;
        }

        if !self.show_revalued_only {
            self.downstream.accept(report, posting)?;
        }
        Ok(())
    }

    fn flush(&mut self, report: &mut Report) -> Result<(), PipelineError> {
        self.downstream.flush(report)
    }
}

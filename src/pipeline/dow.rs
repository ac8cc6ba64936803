//! **dow (day of week)**: seven buckets keyed by the weekday of each
//! posting's effective date, emitted in weekday order starting from a
//! configurable first day (default Sunday), each as one synthetic entry
//! per (account, commodity) exactly as `subtotal` (§4.3).

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::account::AccountId;
use crate::error::PipelineError;
use crate::pipeline::subtotal::{emit_accumulated, AccountAccumulator};
use crate::pipeline::PostHandler;
use crate::xdata::{PostingRef, Report};

/// Index of `weekday` counted from `first_day` (0..=6).
fn slot_of(weekday: Weekday, first_day: Weekday) -> u32 {
    (weekday.num_days_from_sunday() + 7 - first_day.num_days_from_sunday()) % 7
}

/// A date, any date, that actually falls on `weekday` — used to tag each
/// bucket's synthetic entry with a concrete, representative date. 2023-01-01
/// was a Sunday, so offsetting from there lands on every weekday exactly.
fn canonical_date_for(weekday: Weekday) -> NaiveDate {
    let sunday = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    sunday + Duration::days(i64::from(weekday.num_days_from_sunday()))
}

pub struct Dow {
    first_day: Weekday,
    remember_components: bool,
    buckets: [HashMap<AccountId, AccountAccumulator>; 7],
    downstream: Box<dyn PostHandler>,
}

impl Dow {
    pub fn new(first_day: Weekday, remember_components: bool, downstream: Box<dyn PostHandler>) -> Dow {
        Dow { first_day, remember_components, buckets: Default::default(), downstream }
    }
}

impl PostHandler for Dow {
    fn accept(&mut self, report: &mut Report, posting: PostingRef) -> Result<(), PipelineError> {
        let date = report.effective_date(posting);
        let slot = slot_of(date.weekday(), self.first_day) as usize;
        let account = report.posting(posting).account;
        let amount = report.effective_amount(posting);
        let acc = self.buckets[slot].entry(account).or_default();
        for q in amount.iter_quantities() {
            acc.add(q.s, q.q, posting);
        }
        Ok(())
    }

    fn flush(&mut self, report: &mut Report) -> Result<(), PipelineError> {
        for slot in 0..7 {
            let by_account = std::mem::take(&mut self.buckets[slot]);
            if by_account.is_empty() {
                continue;
            }
            let weekday = Weekday::try_from(((self.first_day.num_days_from_sunday() + slot as u32) % 7) as u8)
                .expect("slot is 0..=6");
            let date = canonical_date_for(weekday);
            let entry = report.alloc_synthetic_entry(date, "Day of week".to_string(), None);
            emit_accumulated(report, entry, by_account, self.remember_components, self.downstream.as_mut())?;
        }
        self.downstream.flush(report)
    }
}

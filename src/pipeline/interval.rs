//! **interval(period)**: buckets postings by `Period::bucket_of` on their
//! effective date; each non-empty bucket becomes one synthetic entry
//! dated at the bucket start, with one posting per (account, commodity),
//! exactly as `subtotal` does but scoped to that bucket's postings (§4.3).
//! Leading/trailing buckets outside the occupied span are never emitted —
//! there is nothing to anchor them to. Interior buckets with no postings
//! are emitted with a single zero-amount posting to a `<Empty>`
//! placeholder account, but only when the period spec asked for it
//! (`show_empty`, set by a trailing "empty" keyword on the spec string).

use std::collections::{BTreeMap, HashMap};

use crate::account::AccountId;
use crate::commodity::Value;
use crate::error::PipelineError;
use crate::journal::AccName;
use crate::period::Period;
use crate::pipeline::subtotal::{emit_accumulated, AccountAccumulator};
use crate::pipeline::PostHandler;
use crate::xdata::{PostingRef, Report};

const EMPTY_BUCKET_ACCOUNT: &str = "<Empty>";

pub struct Interval {
    period: Box<dyn Period>,
    remember_components: bool,
    show_empty: bool,
    span: Option<(chrono::NaiveDate, chrono::NaiveDate)>,
    buckets: BTreeMap<chrono::NaiveDate, HashMap<AccountId, AccountAccumulator>>,
    downstream: Box<dyn PostHandler>,
}

impl Interval {
    pub fn new(
        period: Box<dyn Period>,
        remember_components: bool,
        show_empty: bool,
        downstream: Box<dyn PostHandler>,
    ) -> Interval {
        Interval { period, remember_components, show_empty, span: None, buckets: BTreeMap::new(), downstream }
    }
}

impl PostHandler for Interval {
    fn accept(&mut self, report: &mut Report, posting: PostingRef) -> Result<(), PipelineError> {
        let date = report.effective_date(posting);
        let (start, end) = self.period.bucket_of(date);
        self.span = Some(match self.span {
            Some((s, e)) => (s.min(start), e.max(end)),
            None => (start, end),
        });
        let account = report.posting(posting).account;
        let amount = report.effective_amount(posting);
        let by_account = self.buckets.entry(start).or_default();
        let acc = by_account.entry(account).or_default();
        for q in amount.iter_quantities() {
            acc.add(q.s, q.q, posting);
        }
        Ok(())
    }

    fn flush(&mut self, report: &mut Report) -> Result<(), PipelineError> {
        if self.show_empty {
            if let Some((start, end)) = self.span {
                for (bucket_start, _bucket_end) in self.period.iterate_buckets(start, end) {
                    self.buckets.entry(bucket_start).or_insert_with(HashMap::new);
                }
            }
        }

        for (start, by_account) in std::mem::take(&mut self.buckets) {
            if by_account.is_empty() {
                let account = report.get_or_create_account(&AccName::from(EMPTY_BUCKET_ACCOUNT));
                let entry = report.alloc_synthetic_entry(start, "Interval".to_string(), None);
                let synthetic = report.alloc_synthetic_posting(entry, account, Value::Null);
                self.downstream.accept(report, synthetic)?;
                continue;
            }
            let entry = report.alloc_synthetic_entry(start, "Interval".to_string(), None);
            emit_accumulated(report, entry, by_account, self.remember_components, self.downstream.as_mut())?;
        }
        self.downstream.flush(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{collector, running_total_fixture};
    use rust_decimal::dec;

    #[test]
    fn daily_buckets_emit_one_entry_per_day() {
        let (mut report, ids) = running_total_fixture();
        let (sink, seen) = collector();
        let period = crate::period::parse("daily").unwrap().period;
        let mut interval = Interval::new(period, false, false, sink);
        for id in &ids {
            interval.accept(&mut report, *id).unwrap();
        }
        interval.flush(&mut report).unwrap();

        // Two dates, two accounts each with a nonzero total: four synthetic postings.
        assert_eq!(seen.borrow().len(), 4);
    }

    #[test]
    fn monthly_buckets_merge_both_fixture_entries() {
        let (mut report, ids) = running_total_fixture();
        let (sink, seen) = collector();
        let period = crate::period::parse("monthly").unwrap().period;
        let mut interval = Interval::new(period, false, false, sink);
        for id in &ids {
            interval.accept(&mut report, *id).unwrap();
        }
        interval.flush(&mut report).unwrap();

        // Both fixture entries fall in January 2020: one bucket, one
        // posting per account (A nets 15, B nets -15).
        assert_eq!(seen.borrow().len(), 2);
        let amounts: Vec<_> = seen.borrow().iter().map(|p| report.effective_amount(*p)).collect();
        assert!(amounts.contains(&crate::value!(15, "USD")));
        assert!(amounts.contains(&crate::value!(-15, "USD")));
    }

    #[test]
    fn empty_input_emits_nothing() {
        let (mut report, _ids) = running_total_fixture();
        let (sink, seen) = collector();
        let period = crate::period::parse("daily").unwrap().period;
        let mut interval = Interval::new(period, false, false, sink);
        interval.flush(&mut report).unwrap();
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn empty_interior_bucket_is_omitted_unless_requested() {
        let (mut report, ids) = wide_gap_fixture();
        let (sink, seen) = collector();
        let period = crate::period::parse("daily").unwrap().period;
        let mut interval = Interval::new(period, false, false, sink);
        for id in &ids {
            interval.accept(&mut report, *id).unwrap();
        }
        interval.flush(&mut report).unwrap();

        // Three days apart, only the two occupied days' buckets: two postings.
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn empty_interior_bucket_is_emitted_with_zero_amount_when_requested() {
        let (mut report, ids) = wide_gap_fixture();
        let (sink, seen) = collector();
        let parsed = crate::period::parse("daily empty").unwrap();
        assert!(parsed.show_empty);
        let mut interval = Interval::new(parsed.period, false, parsed.show_empty, sink);
        for id in &ids {
            interval.accept(&mut report, *id).unwrap();
        }
        interval.flush(&mut report).unwrap();

        // The two occupied days plus one synthetic zero-amount posting for
        // the empty day in between.
        assert_eq!(seen.borrow().len(), 3);
        let zero = seen
            .borrow()
            .iter()
            .find(|id| !ids.contains(id))
            .copied()
            .expect("a synthetic posting for the empty bucket");
        assert_eq!(report.effective_amount(zero), crate::commodity::Value::Null);
    }

    /// Two single-posting entries three days apart, leaving exactly one
    /// empty day in between (day 2 has no postings).
    fn wide_gap_fixture() -> (Report, Vec<PostingRef>) {
        use crate::journal::{Entry, Journal, Posting, State};
        use crate::{commodity::Quantity, symbol::Symbol};

        let posting = |amount: rust_decimal::Decimal| Posting {
            state: State::None,
            account: AccName::from("A"),
            amount: Quantity::new(amount, Symbol::new("USD")),
            cost: None,
            comment: None,
            tags: Vec::new(),
        };
        let entries = vec![
            Entry {
                state: State::None,
                code: None,
                date: chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                effective_date: None,
                payee: "e1".to_string(),
                comment: None,
                postings: vec![posting(dec!(10))],
            },
            Entry {
                state: State::None,
                code: None,
                date: chrono::NaiveDate::from_ymd_opt(2020, 1, 3).unwrap(),
                effective_date: None,
                payee: "e2".to_string(),
                comment: None,
                postings: vec![posting(dec!(-10))],
            },
        ];
        let journal = Journal::for_test(entries, vec![]);
        let report = Report::from_journal(&journal);
        let ids = report.session_postings();
        (report, ids)
    }
}

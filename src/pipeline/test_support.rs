//! Shared fixtures and a recording [`PostHandler`] sink for pipeline tests.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::NaiveDate;
use rust_decimal::dec;

use crate::error::PipelineError;
use crate::journal::{AccName, Entry, Journal, Posting, State};
use crate::pipeline::PostHandler;
use crate::xdata::{PostingRef, Report};

/// Records every posting id it receives and counts `flush` calls, so
/// tests can assert on what a handler under test forwarded.
#[derive(Default)]
pub struct Collector {
    pub seen: Rc<RefCell<Vec<PostingRef>>>,
    pub flushes: Rc<RefCell<usize>>,
}

impl Collector {
    pub fn new() -> (Box<dyn PostHandler>, Rc<RefCell<Vec<PostingRef>>>, Rc<RefCell<usize>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let flushes = Rc::new(RefCell::new(0));
        (
            Box::new(Collector { seen: seen.clone(), flushes: flushes.clone() }),
            seen,
            flushes,
        )
    }
}

impl PostHandler for Collector {
    fn accept(&mut self, _report: &mut Report, posting: PostingRef) -> Result<(), PipelineError> {
        self.seen.borrow_mut().push(posting);
        Ok(())
    }

    fn flush(&mut self, _report: &mut Report) -> Result<(), PipelineError> {
        *self.flushes.borrow_mut() += 1;
        Ok(())
    }
}

/// A simpler variant for building a `Box<dyn PostHandler>` plus the two
/// handles tests want, without naming the tuple every time.
pub fn collector() -> (Box<dyn PostHandler>, Rc<RefCell<Vec<PostingRef>>>) {
    let (handler, seen, _flushes) = Collector::new();
    (handler, seen)
}

fn posting(account: &str, amount: rust_decimal::Decimal, commodity: &str) -> Posting {
    Posting {
        state: State::None,
        account: AccName::from(account),
        amount: crate::commodity::Quantity::new(amount, crate::symbol::Symbol::new(commodity)),
        cost: None,
        comment: None,
        tags: Vec::new(),
    }
}

/// One entry, two postings, `Assets:Bank` and `Expenses:Food`, balanced
/// in USD.
pub fn two_account_report() -> (Report, Vec<PostingRef>) {
    two_account_report_with_code(None)
}

/// As [`two_account_report`], but with the entry's `code` field set.
pub fn two_account_report_with_code(code: Option<&str>) -> (Report, Vec<PostingRef>) {
    let entry = Entry {
        state: State::None,
        code: code.map(str::to_string),
        date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        effective_date: None,
        payee: "Store".to_string(),
        comment: None,
        postings: vec![
            posting("Expenses:Food", dec!(10), "USD"),
            posting("Assets:Bank", dec!(-10), "USD"),
        ],
    };
    let journal = Journal::for_test(vec![entry], vec![]);
    let report = Report::from_journal(&journal);
    let ids = report.session_postings();
    (report, ids)
}

/// Two entries replaying the spec's §8 scenario 1/2/3 fixture:
/// `2020-01-01 A 10 USD / B -10 USD`, `2020-01-02 A 5 USD / B -5 USD`.
pub fn running_total_fixture() -> (Report, Vec<PostingRef>) {
    let entries = vec![
        Entry {
            state: State::None,
            code: None,
            date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            effective_date: None,
            payee: "e1".to_string(),
            comment: None,
            postings: vec![posting("A", dec!(10), "USD"), posting("B", dec!(-10), "USD")],
        },
        Entry {
            state: State::None,
            code: None,
            date: NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            effective_date: None,
            payee: "e2".to_string(),
            comment: None,
            postings: vec![posting("A", dec!(5), "USD"), posting("B", dec!(-5), "USD")],
        },
    ];
    let journal = Journal::for_test(entries, vec![]);
    let report = Report::from_journal(&journal);
    let ids = report.session_postings();
    (report, ids)
}

/// Three single-posting entries on account `A`, replaying the spec's §8
/// scenario 6 fixture: payee "X" +10, payee "Y" +7, payee "X" +3.
pub fn three_payee_fixture() -> (Report, Vec<PostingRef>) {
    let entries = vec![
        Entry {
            state: State::None,
            code: None,
            date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            effective_date: None,
            payee: "X".to_string(),
            comment: None,
            postings: vec![posting("A", dec!(10), "USD")],
        },
        Entry {
            state: State::None,
            code: None,
            date: NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            effective_date: None,
            payee: "Y".to_string(),
            comment: None,
            postings: vec![posting("A", dec!(7), "USD")],
        },
        Entry {
            state: State::None,
            code: None,
            date: NaiveDate::from_ymd_opt(2020, 1, 3).unwrap(),
            effective_date: None,
            payee: "X".to_string(),
            comment: None,
            postings: vec![posting("A", dec!(3), "USD")],
        },
    ];
    let journal = Journal::for_test(entries, vec![]);
    let report = Report::from_journal(&journal);
    let ids = report.session_postings();
    (report, ids)
}

/// Three single-posting entries on account `A`, replaying the spec's §8
/// scenario 5 fixture: +10, +20, -5, all before the cutoff (the test
/// picks the cutoff as the last entry's date).
pub fn reconcile_fixture() -> (Report, Vec<PostingRef>) {
    let entries = vec![
        Entry {
            state: State::None,
            code: None,
            date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            effective_date: None,
            payee: "p1".to_string(),
            comment: None,
            postings: vec![posting("A", dec!(10), "USD")],
        },
        Entry {
            state: State::None,
            code: None,
            date: NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            effective_date: None,
            payee: "p2".to_string(),
            comment: None,
            postings: vec![posting("A", dec!(20), "USD")],
        },
        Entry {
            state: State::None,
            code: None,
            date: NaiveDate::from_ymd_opt(2020, 1, 3).unwrap(),
            effective_date: None,
            payee: "p3".to_string(),
            comment: None,
            postings: vec![posting("A", dec!(-5), "USD")],
        },
    ];
    let journal = Journal::for_test(entries, vec![]);
    let report = Report::from_journal(&journal);
    let ids = report.session_postings();
    (report, ids)
}

/// Builds `n` single-posting entries dated `2020-01-01 + i` days, each on
/// account `A`, amount `i+1` USD — used by `truncate` tests.
pub fn n_dated_entries(n: u32) -> (Report, Vec<PostingRef>) {
    let entries = (0..n)
        .map(|i| Entry {
            state: State::None,
            code: None,
            date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(i64::from(i)),
            effective_date: None,
            payee: format!("e{i}"),
            comment: None,
            postings: vec![posting("A", dec!(1) * rust_decimal::Decimal::from(i + 1), "USD")],
        })
        .collect();
    let journal = Journal::for_test(entries, vec![]);
    let report = Report::from_journal(&journal);
    let ids = report.session_postings();
    (report, ids)
}

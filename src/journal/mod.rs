use std::fmt::{self, Debug, Display};
use std::io::{self, Read};
use std::iter;
use std::mem;
use std::ops::Deref;

use chrono::NaiveDate;
use serde::Serialize;

use crate::commodity::{Quantity, Value};
use crate::misc::BetweenDate;
use crate::pricedb::MarketPrice;
use crate::tags::Tag;

mod parser;
pub use parser::ParseError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    None, // it's neither * nor !
    Cleared, // *
    Pending, // !
}

/// The name of an account: a colon-separated hierarchy, e.g.
/// `"Assets:Bank:Checking"`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Default)]
pub struct AccName(String);

impl AccName {
    const SEP: &'static str = ":";

    pub fn all_accounts(&self) -> impl Iterator<Item = &str> {
        self.0
            .match_indices(AccName::SEP)
            .map(|(i, _)| &self.0[..i])
            .chain(iter::once(&self.0[..]))
    }

    pub fn parent_accounts(&self) -> impl Iterator<Item = &str> {
        self.0.match_indices(AccName::SEP).map(|(i, _)| &self.0[..i])
    }

    pub fn parent_account(&self) -> &str {
        match self.0.find(AccName::SEP) {
            Some(t) => &self.0[..t],
            None => &self.0,
        }
    }

    pub fn split_parts(&self) -> impl Iterator<Item = &str> {
        if self.0.is_empty() {
            return "".split(':').filter(|_| false);
        }
        self.0.split(':')
    }

    pub fn append(&self, sub: &AccName) -> Self {
        if self.is_empty() {
            sub.clone()
        } else {
            AccName(format!("{}:{}", self.0, sub.0))
        }
    }

    pub fn pop_parent_account(&mut self) -> Option<AccName> {
        if self.is_empty() {
            return None;
        }
        let cnt = mem::take(&mut self.0);
        let mut it = cnt.split(AccName::SEP);
        let pop = it.next().unwrap();
        self.0 = it.collect::<Vec<_>>().join(":");
        Some(AccName(pop.to_owned()))
    }
}

impl Deref for AccName {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for AccName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Debug for AccName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for AccName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AccName {
    fn from(s: String) -> Self {
        AccName(s)
    }
}

impl From<&str> for AccName {
    fn from(s: &str) -> Self {
        AccName(s.to_owned())
    }
}

/// The price of a posting's lot, as distinct from the posting's prevailing
/// market price (`@`/`@@`); carried for cost-basis valuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotPrice {
    pub price: Quantity,
    pub date: Option<NaiveDate>,
}

/// One side of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub state: State,
    pub account: AccName,
    pub amount: Quantity,
    pub cost: Option<LotPrice>,
    pub comment: Option<String>,
    pub tags: Vec<Tag>,
}

impl Posting {
    pub fn value(&self) -> Value {
        Value::from_quantity(self.amount)
    }
}

/// A dated transaction containing two or more postings that must sum to
/// the null value (see [`Entry::is_balanced`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub state: State,
    pub code: Option<String>,
    pub date: NaiveDate,
    pub effective_date: Option<NaiveDate>,
    pub payee: String,
    pub comment: Option<String>,
    pub postings: Vec<Posting>,
}

impl Entry {
    /// The date postings of this entry are considered to have happened on,
    /// absent any posting-level date override (see GLOSSARY, "effective
    /// date").
    pub fn effective_date(&self) -> NaiveDate {
        self.effective_date.unwrap_or(self.date)
    }

    pub fn balance(&self) -> Value {
        self.postings.iter().map(Posting::value).sum()
    }

    pub fn is_balanced(&self) -> bool {
        self.balance().is_zero()
    }
}

pub struct Journal {
    entries: Vec<Entry>,
    market_prices: Vec<MarketPrice>,
}

impl Journal {
    pub fn filter_by_date(self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        let between = BetweenDate::new(from, to);
        Journal {
            entries: self
                .entries
                .into_iter()
                .filter(|e| between.check(e.date))
                .collect(),
            market_prices: self
                .market_prices
                .into_iter()
                .filter(|p| between.check(p.date_time.date()))
                .collect(),
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn market_prices(&self) -> impl Iterator<Item = &MarketPrice> {
        self.market_prices.iter()
    }

    #[cfg(test)]
    pub(crate) fn for_test(entries: Vec<Entry>, market_prices: Vec<MarketPrice>) -> Journal {
        Journal { entries, market_prices }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("reading journal: {0}")]
    Io(#[from] io::Error),
    #[error("parsing journal: {0:?}")]
    Parser(ParseError),
    #[error("entry dated {0} does not balance: {1}")]
    Unbalanced(NaiveDate, Value),
}

pub fn read_journal(mut r: impl Read) -> Result<Journal, JournalError> {
    let mut content = String::new();
    r.read_to_string(&mut content)?;

    let parsed = parser::parse_journal(&content).map_err(JournalError::Parser)?;

    for entry in &parsed.entries {
        if !entry.is_balanced() {
            return Err(JournalError::Unbalanced(entry.date, entry.balance()));
        }
    }

    tracing::debug!(
        entries = parsed.entries.len(),
        prices = parsed.market_prices.len(),
        "parsed journal"
    );

    Ok(Journal {
        entries: parsed.entries,
        market_prices: parsed.market_prices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acc_name_hierarchy_helpers() {
        let acc = AccName::from("Assets:Bank:Checking");
        assert_eq!(
            acc.all_accounts().collect::<Vec<_>>(),
            vec!["Assets", "Assets:Bank", "Assets:Bank:Checking"]
        );
        assert_eq!(
            acc.parent_accounts().collect::<Vec<_>>(),
            vec!["Assets", "Assets:Bank"]
        );
        assert_eq!(acc.parent_account(), "Assets");
        assert_eq!(
            acc.split_parts().collect::<Vec<_>>(),
            vec!["Assets", "Bank", "Checking"]
        );
    }

    #[test]
    fn acc_name_append_and_pop() {
        let acc = AccName::from("Assets:Bank").append(&AccName::from("Checking"));
        assert_eq!(acc, AccName::from("Assets:Bank:Checking"));

        let mut acc = AccName::from("Assets:Bank:Checking");
        let parent = acc.pop_parent_account();
        assert_eq!(parent, Some(AccName::from("Assets")));
        assert_eq!(acc, AccName::from("Bank:Checking"));
    }
}

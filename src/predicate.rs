//! A small, real predicate expression language: `account==X`,
//! `account=~/regex/`, boolean `and`/`or`/`not`, and the literal `true`.
//! Not the full ledger query language (distilled spec §1, out of scope),
//! grounded in the teacher's use of `regex::Regex` for `report_query`.

use regex::Regex;
use thiserror::Error;

use crate::error::PipelineError;
use crate::xdata::{PostingRef, Report};

#[derive(Debug, Error)]
pub enum PredicateError {
    #[error("unexpected end of predicate expression")]
    UnexpectedEnd,
    #[error("unclosed regex literal starting at {0:?}")]
    UnterminatedRegex(String),
    #[error("invalid regex {0:?}: {1}")]
    InvalidRegex(String, regex::Error),
    #[error("expected {0}, found {1:?}")]
    Expected(&'static str, String),
    #[error("trailing input: {0:?}")]
    TrailingInput(String),
}

pub trait Predicate: std::fmt::Debug {
    fn eval(&self, report: &Report, p: PostingRef) -> Result<bool, PipelineError>;
}

#[derive(Debug)]
struct True;

impl Predicate for True {
    fn eval(&self, _report: &Report, _p: PostingRef) -> Result<bool, PipelineError> {
        Ok(true)
    }
}

#[derive(Debug)]
struct AccountEq(String);

impl Predicate for AccountEq {
    fn eval(&self, report: &Report, p: PostingRef) -> Result<bool, PipelineError> {
        let account = report.posting(p).account;
        Ok(report.account_path(account).as_ref() == self.0.as_str())
    }
}

#[derive(Debug)]
struct AccountMatches(Regex);

impl Predicate for AccountMatches {
    fn eval(&self, report: &Report, p: PostingRef) -> Result<bool, PipelineError> {
        let account = report.posting(p).account;
        Ok(self.0.is_match(report.account_path(account)))
    }
}

#[derive(Debug)]
struct Not(Box<dyn Predicate>);

impl Predicate for Not {
    fn eval(&self, report: &Report, p: PostingRef) -> Result<bool, PipelineError> {
        Ok(!self.0.eval(report, p)?)
    }
}

#[derive(Debug)]
struct And(Box<dyn Predicate>, Box<dyn Predicate>);

impl Predicate for And {
    fn eval(&self, report: &Report, p: PostingRef) -> Result<bool, PipelineError> {
        Ok(self.0.eval(report, p)? && self.1.eval(report, p)?)
    }
}

#[derive(Debug)]
struct Or(Box<dyn Predicate>, Box<dyn Predicate>);

impl Predicate for Or {
    fn eval(&self, report: &Report, p: PostingRef) -> Result<bool, PipelineError> {
        Ok(self.0.eval(report, p)? || self.1.eval(report, p)?)
    }
}

/// Parses a predicate expression. Grammar (informal):
///
/// ```text
/// expr   := or
/// or     := and ("or" and)*
/// and    := unary ("and" unary)*
/// unary  := "not" unary | primary
/// primary := "true" | "account==" TEXT | "account=~/" REGEX "/" | "(" expr ")"
/// ```
pub fn parse(src: &str) -> Result<Box<dyn Predicate>, PredicateError> {
    let mut p = Parser { tokens: tokenize(src), pos: 0 };
    let expr = p.parse_or()?;
    if p.pos != p.tokens.len() {
        return Err(PredicateError::TrailingInput(p.tokens[p.pos..].join(" ")));
    }
    Ok(expr)
}

fn tokenize(src: &str) -> Vec<String> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '(' || c == ')' {
            tokens.push(c.to_string());
            i += 1;
            continue;
        }
        let rest: String = chars[i..].iter().collect();
        if let Some(after) = rest.strip_prefix("account=~/") {
            let end = after.find('/').map(|p| p + 1).unwrap_or(after.len());
            tokens.push(format!("account=~/{}", &after[..end]));
            i += "account=~/".len() + end;
            continue;
        }
        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '(' && chars[i] != ')' {
            i += 1;
        }
        tokens.push(chars[start..i].iter().collect());
    }
    tokens
}

struct Parser {
    tokens: Vec<String>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn bump(&mut self) -> Option<String> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_or(&mut self) -> Result<Box<dyn Predicate>, PredicateError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some("or") {
            self.bump();
            let rhs = self.parse_and()?;
            lhs = Box::new(Or(lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Box<dyn Predicate>, PredicateError> {
        let mut lhs = self.parse_unary()?;
        while self.peek() == Some("and") {
            self.bump();
            let rhs = self.parse_unary()?;
            lhs = Box::new(And(lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Box<dyn Predicate>, PredicateError> {
        if self.peek() == Some("not") {
            self.bump();
            return Ok(Box::new(Not(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Box<dyn Predicate>, PredicateError> {
        let tok = self.bump().ok_or(PredicateError::UnexpectedEnd)?;
        if tok == "(" {
            let inner = self.parse_or()?;
            match self.bump() {
                Some(t) if t == ")" => Ok(inner),
                Some(t) => Err(PredicateError::Expected(")", t)),
                None => Err(PredicateError::Expected(")", String::new())),
            }
        } else if tok == "true" {
            Ok(Box::new(True))
        } else if let Some(account) = tok.strip_prefix("account==") {
            Ok(Box::new(AccountEq(account.to_string())))
        } else if let Some(pattern) = tok.strip_prefix("account=~/").and_then(|s| s.strip_suffix('/')) {
            let re = Regex::new(pattern).map_err(|e| PredicateError::InvalidRegex(pattern.to_string(), e))?;
            Ok(Box::new(AccountMatches(re)))
        } else {
            Err(PredicateError::Expected("a predicate term", tok))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{AccName, Entry, Posting, State};
    use crate::quantity;
    use chrono::NaiveDate;
    use rust_decimal::dec;

    fn report_with_accounts(names: &[&str]) -> (Report, Vec<PostingRef>) {
        let entry = Entry {
            state: State::None,
            code: None,
            date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            effective_date: None,
            payee: "p".to_string(),
            comment: None,
            postings: names
                .iter()
                .map(|n| Posting {
                    state: State::None,
                    account: AccName::from(*n),
                    amount: quantity!(1, "USD"),
                    cost: None,
                    comment: None,
                    tags: Vec::new(),
                })
                .collect(),
        };
        let journal = crate::journal::Journal::for_test(vec![entry], vec![]);
        let report = Report::from_journal(&journal);
        let ids = report.session_postings();
        (report, ids)
    }

    #[test]
    fn account_eq_matches_exact_path() {
        let (report, ids) = report_with_accounts(&["Assets:Bank", "Expenses:Food"]);
        let pred = parse("account==Assets:Bank").unwrap();
        assert!(pred.eval(&report, ids[0]).unwrap());
        assert!(!pred.eval(&report, ids[1]).unwrap());
    }

    #[test]
    fn and_or_not_compose() {
        let (report, ids) = report_with_accounts(&["Assets:Bank", "Expenses:Food"]);
        let pred = parse("not account==Assets:Bank and true").unwrap();
        assert!(!pred.eval(&report, ids[0]).unwrap());
        assert!(pred.eval(&report, ids[1]).unwrap());

        let pred = parse("account==Assets:Bank or account==Expenses:Food").unwrap();
        assert!(pred.eval(&report, ids[0]).unwrap());
        assert!(pred.eval(&report, ids[1]).unwrap());
    }

    #[test]
    fn regex_matches_subtree() {
        let (report, ids) = report_with_accounts(&["Assets:Bank:Checking", "Expenses:Food"]);
        let pred = parse("account=~/^Assets/").unwrap();
        assert!(pred.eval(&report, ids[0]).unwrap());
        assert!(!pred.eval(&report, ids[1]).unwrap());
    }

    #[test]
    fn unknown_term_is_an_error() {
        assert!(parse("bogus").is_err());
    }
}

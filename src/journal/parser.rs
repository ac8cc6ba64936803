use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use rust_decimal::Decimal;

use crate::commodity::{Quantity, Value};
use crate::journal::{AccName, Entry, Posting, State};
use crate::pricedb::MarketPrice;
use crate::symbol::Symbol;

const MAX_ELIDING_AMOUNT: usize = 1;

#[derive(Parser)]
#[grammar = "./src/journal/grammar.pest"]
struct LedgerParser;

#[derive(Debug)]
pub enum ParseError {
    InvalidDate,
    Parser(Box<pest::error::Error<Rule>>),
    ElidingAmount(usize),
    EntryNotBalanced,
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        ParseError::Parser(Box::new(e))
    }
}

pub struct ParsedJournal {
    pub entries: Vec<Entry>,
    pub market_prices: Vec<MarketPrice>,
}

pub fn parse_journal(content: &str) -> Result<ParsedJournal, ParseError> {
    let journal = LedgerParser::parse(Rule::journal, content)?
        .next()
        .unwrap();

    let mut entries = Vec::new();
    let mut market_prices = Vec::new();

    for p in journal.into_inner() {
        match p.as_rule() {
            Rule::entry => entries.push(parse_entry(p)?),
            Rule::price_line => market_prices.push(parse_price_line(p)?),
            Rule::EOI => {}
            _ => unreachable!("unexpected top-level rule {:?}", p.as_rule()),
        }
    }

    Ok(ParsedJournal {
        entries,
        market_prices,
    })
}

struct RawPosting {
    state: State,
    account: String,
    amount: Option<Quantity>,
    comment: Option<String>,
}

fn parse_entry(p: Pair<Rule>) -> Result<Entry, ParseError> {
    let mut date = None;
    let mut effective_date = None;
    let mut state = State::None;
    let mut code = None;
    let mut payee = String::new();
    let mut comment = None;
    let mut raw_postings = Vec::new();

    for p in p.into_inner() {
        match p.as_rule() {
            Rule::header => {
                for p in p.into_inner() {
                    match p.as_rule() {
                        Rule::date => {
                            if date.is_none() {
                                date = Some(parse_date(&p)?);
                            } else {
                                effective_date = Some(parse_date(&p)?);
                            }
                        }
                        Rule::state => state = parse_state(p.as_str()),
                        Rule::code => {
                            let inner = p.as_str().trim().trim_matches(|c| c == '(' || c == ')');
                            code = Some(inner.trim().to_string());
                        }
                        Rule::payee => payee = p.as_str().trim().to_string(),
                        Rule::comment => comment = Some(parse_comment(&p)),
                        _ => unreachable!("unexpected header rule {:?}", p.as_rule()),
                    }
                }
            }
            Rule::posting => raw_postings.push(parse_posting(p)?),
            _ => unreachable!("unexpected entry rule {:?}", p.as_rule()),
        }
    }

    let date = date.ok_or(ParseError::InvalidDate)?;

    let neliding = raw_postings.iter().filter(|p| p.amount.is_none()).count();
    if neliding > MAX_ELIDING_AMOUNT {
        return Err(ParseError::ElidingAmount(neliding));
    }

    let eliding_pos = raw_postings.iter().position(|p| p.amount.is_none());
    let known_total: Value = raw_postings
        .iter()
        .filter_map(|p| p.amount)
        .map(Value::from_quantity)
        .sum();

    let mut postings = Vec::with_capacity(raw_postings.len());
    for (i, raw) in raw_postings.into_iter().enumerate() {
        let amount = match raw.amount {
            Some(q) => q,
            None => {
                // the single eliding posting balances the entry; it only
                // makes sense in a single-commodity entry.
                let q = (-known_total.clone())
                    .to_quantity()
                    .ok_or(ParseError::EntryNotBalanced)?;
                debug_assert_eq!(Some(i), eliding_pos);
                q
            }
        };
        postings.push(Posting {
            state: raw.state,
            account: AccName::from(raw.account),
            amount,
            cost: None,
            comment: raw.comment,
            tags: Vec::new(),
        });
    }

    Ok(Entry {
        state,
        code,
        date,
        effective_date,
        payee,
        comment,
        postings,
    })
}

fn parse_posting(p: Pair<Rule>) -> Result<RawPosting, ParseError> {
    let mut state = State::None;
    let mut account = String::new();
    let mut amount = None;
    let mut comment = None;

    for p in p.into_inner() {
        match p.as_rule() {
            Rule::state => state = parse_state(p.as_str()),
            Rule::account => account = p.as_str().trim().to_string(),
            Rule::amount => amount = Some(parse_amount(p)?),
            Rule::comment => comment = Some(parse_comment(&p)),
            _ => unreachable!("unexpected posting rule {:?}", p.as_rule()),
        }
    }

    Ok(RawPosting {
        state,
        account,
        amount,
        comment,
    })
}

fn parse_amount(p: Pair<Rule>) -> Result<Quantity, ParseError> {
    let mut number = None;
    let mut symbol = Symbol::new("");

    for p in p.into_inner() {
        match p.as_rule() {
            Rule::number => number = Some(parse_number(&p)),
            Rule::symbol => symbol = Symbol::new(p.as_str()),
            _ => unreachable!("unexpected amount rule {:?}", p.as_rule()),
        }
    }

    Ok(Quantity::new(number.unwrap(), symbol))
}

fn parse_number(p: &Pair<Rule>) -> Decimal {
    let s = p.as_str().replace(',', "");
    Decimal::from_str(&s).unwrap()
}

fn parse_date(p: &Pair<Rule>) -> Result<NaiveDate, ParseError> {
    let s = p.as_str();
    let parts: Vec<&str> = s.split(['-', '/']).collect();
    let (y, m, d) = (
        parts[0].parse::<i32>().unwrap(),
        parts[1].parse::<u32>().unwrap(),
        parts[2].parse::<u32>().unwrap(),
    );
    NaiveDate::from_ymd_opt(y, m, d).ok_or(ParseError::InvalidDate)
}

fn parse_comment(p: &Pair<Rule>) -> String {
    p.as_str().trim_start_matches([' ', '\t', ';']).to_string()
}

fn parse_state(s: &str) -> State {
    match s {
        "*" => State::Cleared,
        "!" => State::Pending,
        _ => unreachable!("unexpected state token {s:?}"),
    }
}

fn parse_price_line(p: Pair<Rule>) -> Result<MarketPrice, ParseError> {
    let mut date = None;
    let mut time = None;
    let mut sym = None;
    let mut amount = None;
    let mut price_sym = None;

    for p in p.into_inner() {
        match p.as_rule() {
            Rule::date => date = Some(parse_date(&p)?),
            Rule::time => match NaiveTime::parse_from_str(p.as_str(), "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(p.as_str(), "%H:%M"))
            {
                Ok(t) => time = Some(t),
                Err(_) => return Err(ParseError::InvalidDate),
            },
            Rule::number => amount = Some(parse_number(&p)),
            Rule::symbol if sym.is_none() => sym = Some(Symbol::new(p.as_str())),
            Rule::symbol => price_sym = Some(Symbol::new(p.as_str())),
            _ => unreachable!("unexpected price_line rule {:?}", p.as_rule()),
        }
    }

    let date = date.ok_or(ParseError::InvalidDate)?;
    let time = time.unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap());

    Ok(MarketPrice {
        date_time: NaiveDateTime::new(date, time),
        sym: sym.unwrap(),
        price: Quantity::new(amount.unwrap(), price_sym.unwrap()),
    })
}

use std::io;
use std::rc::Rc;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

use balance::BalanceRow;
use commodity::Value;
use pipeline::ReportConfig;
use pricedb::PriceSource;
use register::RegisterRow;
use symbol::Symbol;
use xdata::Report;

pub mod account;
pub mod balance;
pub mod commodity;
pub mod error;
pub mod iter;
pub mod journal;
pub mod keyexpr;
pub mod macros;
pub mod misc;
pub mod period;
pub mod pipeline;
pub mod predicate;
pub mod pricedb;
pub mod printing;
pub mod register;
pub mod symbol;
pub mod tags;
pub mod util;
pub mod xdata;

mod interner;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let (journal, price_db) = match util::read_journal_and_price_db(&cli.file, cli.price_db.as_deref()) {
        Ok(pair) => pair,
        Err(err) => {
            eprintln!("reading {}: {err}", cli.file);
            return;
        }
    };
    let journal = journal.filter_by_date(cli.begin, cli.end);

    let price_source: Rc<dyn PriceSource> = Rc::new(price_db);
    let mut report = Report::from_journal(&journal);

    match cli.command {
        Some(Commands::Balance(args)) => {
            let grand_total = !args.no_total;
            let config = match args.report.into_config() {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("bad report options: {err}");
                    return;
                }
            };
            let rows: Vec<BalanceRow> =
                match balance::trial_balance(&mut report, &config, Some(price_source), args.empty, grand_total) {
                    Ok(rows) => rows,
                    Err(err) => {
                        eprintln!("building report: {err}");
                        return;
                    }
                };
            if let Err(err) = printing::bal(io::stdout(), &rows) {
                eprintln!("printing the report: {err}");
            }
        }
        Some(Commands::Register(args)) => {
            let config = match args.report.into_config() {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("bad report options: {err}");
                    return;
                }
            };
            let rows: Vec<RegisterRow> = match register::register(&mut report, &config, Some(price_source)) {
                Ok(rows) => rows,
                Err(err) => {
                    eprintln!("building report: {err}");
                    return;
                }
            };
            if let Err(err) = printing::reg(io::stdout(), &rows) {
                eprintln!("printing the report: {err}");
            }
        }
        None => {}
    }
}

/// Parses a CLI amount like `"100 USD"` into a [`Value`], for `--reconcile`.
fn parse_target_value(s: &str) -> Result<Value, String> {
    let s = s.trim();
    let mut parts = s.splitn(2, char::is_whitespace);
    let num = parts.next().filter(|s| !s.is_empty()).ok_or_else(|| format!("empty amount: {s:?}"))?;
    let sym = parts
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing commodity in {s:?}"))?;
    let q = Decimal::from_str(num).map_err(|e| format!("invalid amount {num:?}: {e}"))?;
    Ok(Value::new(q, Symbol::new(sym)))
}

#[derive(Parser)]
#[command(
    author,
    about,
    long_about = None)] // Read from `Cargo.toml`
struct Cli {
    /// The ledger file
    #[arg(short, long)]
    file: String,
    /// Only transactions from that date forward will be considered.
    #[arg(short = 'b', long = "begin")]
    begin: Option<NaiveDate>,
    /// Transactions after that date will be discarded.
    #[arg(short = 'e', long = "end")]
    end: Option<NaiveDate>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a balance report showing the rolled-up total for every
    /// matching account.
    #[command(alias = "bal")]
    Balance(BalanceArgs),

    /// List every posting matching the report options, with a running
    /// total.
    #[command(alias = "reg")]
    Register(RegisterArgs),
}

/// The pipeline options shared by both subcommands (§4.4/§4.7): each
/// flag here turns on or parameterizes one stage of the chain that
/// `pipeline::builder::build_chain` assembles.
#[derive(Args)]
pub struct ReportArgs {
    /// Only postings matching this predicate expression are shown.
    #[arg(long = "query")]
    query: Option<String>,

    /// Like `--query`, but evaluated later in the chain (after calc),
    /// so it narrows what's displayed without affecting upstream totals.
    #[arg(long = "display")]
    display: Option<String>,

    /// A second predicate, applied after reconciliation and before sort.
    #[arg(long = "limit")]
    limit: Option<String>,

    /// Sort postings (or, with `--sort-entries`, whole entries) by this
    /// key expression.
    #[arg(long = "sort")]
    sort: Option<String>,

    /// Sort whole entries by their first posting's key, instead of
    /// individual postings.
    #[arg(long = "sort-entries")]
    sort_entries: bool,

    /// Keep only the first N entries.
    #[arg(long = "head")]
    head: Option<usize>,

    /// Keep only the last N entries.
    #[arg(long = "tail")]
    tail: Option<usize>,

    /// `;`-separated predicates: wherever one matches an aggregate
    /// posting carrying remembered components, expand it back to those
    /// components. Applied right-to-left.
    #[arg(long = "descend")]
    descend: Option<String>,

    /// Reconcile postings up to `--reconcile-date` against this target
    /// balance, e.g. "100 USD".
    #[arg(long = "reconcile")]
    reconcile: Option<String>,

    /// Cutoff date for `--reconcile`; defaults to today.
    #[arg(long = "reconcile-date")]
    reconcile_date: Option<NaiveDate>,

    /// Show revaluation postings for commodities whose market price
    /// moved since the previous posting.
    #[arg(long = "revalued")]
    revalued: bool,

    /// Like `--revalued`, but suppress the original postings.
    #[arg(long = "revalued-only")]
    revalued_only: bool,

    /// Collapse each entry down to one posting per account.
    #[arg(long = "collapse")]
    collapse: bool,

    /// Subtotal by account across the whole report.
    #[arg(long = "subtotal")]
    subtotal: bool,

    /// Group postings by day of the week instead of by account.
    #[arg(long = "dow")]
    dow: bool,

    /// Group postings by payee instead of by account.
    #[arg(long = "by-payee")]
    by_payee: bool,

    /// Group postings into buckets of this period, e.g. "monthly".
    #[arg(long = "period")]
    period: Option<String>,

    /// Invert the sign of every amount.
    #[arg(long = "invert")]
    invert: bool,

    /// Also show the other postings of any entry with a match.
    #[arg(long = "related")]
    related: bool,

    /// Like `--related`, but includes entries where only a single
    /// posting matched, not just the rest of that entry.
    #[arg(long = "related-all")]
    related_all: bool,

    /// Use the posting's commodity as the displayed payee.
    #[arg(long = "comm-as-payee")]
    comm_as_payee: bool,

    /// Use the entry's code as the displayed payee.
    #[arg(long = "code-as-payee")]
    code_as_payee: bool,
}

impl ReportArgs {
    fn into_config(self) -> Result<ReportConfig, String> {
        let reconcile_balance = self.reconcile.as_deref().map(parse_target_value).transpose()?;
        let descend_expr = self
            .descend
            .as_deref()
            .map(|s| {
                s.split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(ReportConfig {
            predicate: self.query,
            display_predicate: self.display,
            secondary_predicate: self.limit,
            sort_string: self.sort,
            entry_sort: self.sort_entries,
            head_entries: self.head,
            tail_entries: self.tail,
            descend_expr,
            reconcile_balance,
            reconcile_date: self.reconcile_date,
            show_revalued: self.revalued,
            show_revalued_only: self.revalued_only,
            show_collapsed: self.collapse,
            show_subtotal: self.subtotal,
            days_of_the_week: self.dow,
            by_payee: self.by_payee,
            report_period: self.period,
            show_inverted: self.invert,
            show_related: self.related,
            show_all_related: self.related_all,
            comm_as_payee: self.comm_as_payee,
            code_as_payee: self.code_as_payee,
        })
    }
}

#[derive(Args)]
pub struct BalanceArgs {
    #[command(flatten)]
    report: ReportArgs,

    /// Show accounts whose total is zero.
    #[arg(short = 'E', long = "empty")]
    empty: bool,

    /// Suppress the grand-total row.
    #[arg(long = "no-total")]
    no_total: bool,
}

#[derive(Args)]
pub struct RegisterArgs {
    #[command(flatten)]
    report: ReportArgs,
}

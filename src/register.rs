//! The register report: drives the transaction pipeline (§4) to a row
//! collector instead of a side-effecting terminal, carrying a running
//! total across every row in emission order. `printing::register` renders
//! the result.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::NaiveDate;

use crate::commodity::Value;
use crate::error::PipelineError;
use crate::journal::{AccName, State};
use crate::pipeline::{builder, drive, PostHandler, ReportConfig};
use crate::pricedb::PriceSource;
use crate::xdata::{PostingRef, Report};

/// One rendered row: a posting's date, payee and account as the pipeline
/// left them, its effective amount, and the running total up to and
/// including this row.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterRow {
    pub date: NaiveDate,
    pub state: State,
    pub payee: String,
    pub account: AccName,
    pub amount: Value,
    pub running_total: Value,
}

struct Collect {
    running: Value,
    rows: Rc<RefCell<Vec<RegisterRow>>>,
}

impl PostHandler for Collect {
    fn accept(&mut self, report: &mut Report, posting: PostingRef) -> Result<(), PipelineError> {
        let amount = report.effective_amount(posting);
        self.running += &amount;
        let account = report.posting(posting).account;
        let state = report.posting(posting).state;
        self.rows.borrow_mut().push(RegisterRow {
            date: report.effective_date(posting),
            state,
            payee: report.effective_payee(posting),
            account: report.account_path(account).clone(),
            amount,
            running_total: self.running.clone(),
        });
        Ok(())
    }

    fn flush(&mut self, _report: &mut Report) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// Builds the pipeline chain from `config`, drives every session posting
/// of `report` through it, and returns the rows that reached the end of
/// the chain, in emission order.
pub fn register(
    report: &mut Report,
    config: &ReportConfig,
    price_source: Option<Rc<dyn PriceSource>>,
) -> Result<Vec<RegisterRow>, PipelineError> {
    let rows = Rc::new(RefCell::new(Vec::new()));
    let collect = Box::new(Collect { running: Value::Null, rows: rows.clone() });
    let mut chain = builder::build_chain(config, price_source, collect)?;
    drive(report, chain.as_mut())?;
    drop(chain);
    Ok(Rc::try_unwrap(rows).map(RefCell::into_inner).unwrap_or_else(|rc| rc.borrow().clone()))
}

//! The balance report: drives the transaction pipeline into the
//! account-aggregation pass (§4.5) and collects one row per account,
//! each carrying its rolled-up total. `printing::balance` renders the
//! result.

use std::cell::RefCell;
use std::rc::Rc;

use crate::account::AccountId;
use crate::commodity::Value;
use crate::error::PipelineError;
use crate::journal::AccName;
use crate::pipeline::account_pass::{run_account_pass, SetAccountValue};
use crate::pipeline::{builder, AccountHandler, PostHandler, ReportConfig};
use crate::pricedb::PriceSource;
use crate::xdata::Report;

/// One row of a balance report: an account's full path, its depth in the
/// tree (for indentation), and its rolled-up total. The grand-total row,
/// when requested, carries the tree root's empty path.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceRow {
    pub account: AccName,
    pub depth: usize,
    pub total: Value,
}

struct Collect {
    rows: Rc<RefCell<Vec<BalanceRow>>>,
    show_empty: bool,
}

impl AccountHandler for Collect {
    fn accept(&mut self, report: &mut Report, account: AccountId) -> Result<(), PipelineError> {
        let total = report.account_xdata(account).total.clone();
        if total.is_zero() && !self.show_empty {
            return Ok(());
        }
        let node = report.accounts.get(account);
        self.rows.borrow_mut().push(BalanceRow {
            account: node.full_name().clone(),
            depth: node.depth(),
            total,
        });
        Ok(())
    }

    fn flush(&mut self, _report: &mut Report) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// Runs the transaction pipeline (§4.4) with the account-aggregation
/// sentinel as its terminal, rolls totals up the tree (§4.5), and returns
/// one row per account in tree order. Zero-total accounts are dropped
/// unless `show_empty` is set; a grand-total row is appended, carrying
/// the root's path (empty), when `grand_total` is set.
pub fn trial_balance(
    report: &mut Report,
    config: &ReportConfig,
    price_source: Option<Rc<dyn PriceSource>>,
    show_empty: bool,
    grand_total: bool,
) -> Result<Vec<BalanceRow>, PipelineError> {
    let terminal: Box<dyn PostHandler> = Box::new(SetAccountValue);
    let mut chain = builder::build_chain(config, price_source, terminal)?;

    let rows = Rc::new(RefCell::new(Vec::new()));
    let mut handler = Collect { rows: rows.clone(), show_empty };
    let sort_key: Option<&dyn Fn(&Report, AccountId) -> String> = None;
    run_account_pass(report, chain.as_mut(), &mut handler, sort_key, grand_total)?;
    drop(handler);

    Ok(Rc::try_unwrap(rows).map(RefCell::into_inner).unwrap_or_else(|rc| rc.borrow().clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::two_account_report;

    #[test]
    fn balanced_fixture_nets_to_zero_unless_empty_accounts_are_shown() {
        let (mut report, _ids) = two_account_report();
        let config = ReportConfig::default();
        let rows = trial_balance(&mut report, &config, None, false, false).unwrap();
        assert_eq!(rows.len(), 2);
        let total: Value = rows.iter().map(|r| r.total.clone()).sum();
        assert_eq!(total, Value::Null);
    }

    #[test]
    fn grand_total_row_carries_the_root_path() {
        let (mut report, _ids) = two_account_report();
        let config = ReportConfig::default();
        let rows = trial_balance(&mut report, &config, None, true, true).unwrap();
        let last = rows.last().unwrap();
        assert_eq!(last.account, AccName::from(""));
    }
}

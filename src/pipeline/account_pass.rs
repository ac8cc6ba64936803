//! The account-aggregation pass (§4.5): three phases driving a
//! `PostHandler` chain and a user-provided [`AccountHandler`] to produce
//! per-account totals instead of a posting stream.

use crate::account::AccountId;
use crate::error::PipelineError;
use crate::pipeline::{drive, AccountHandler, PostHandler};
use crate::xdata::{PostingRef, Report};

/// Phase 1's terminal handler: instead of rendering postings, adds each
/// one's effective amount straight into its account's running total.
/// Individual-posting handling is disabled downstream of this point — no
/// accumulator further out than this ever sees a posting (it *is* the
/// tail of the chain).
pub struct SetAccountValue;

impl PostHandler for SetAccountValue {
    fn accept(&mut self, report: &mut Report, posting: PostingRef) -> Result<(), PipelineError> {
        let account = report.posting(posting).account;
        let amount = report.effective_amount(posting);
        report.account_xdata_mut(account).total += &amount;
        Ok(())
    }

    fn flush(&mut self, _report: &mut Report) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// Phase 2: depth-first, each non-leaf account's `total` becomes its own
/// direct postings plus the (already-computed) totals of its children.
/// Accounts are visited in `depth_first` order, which lists every account
/// before any of its descendants — so children must be folded in a
/// second, reversed pass, from leaves up.
fn roll_up_totals(report: &mut Report) {
    let mut order = report.accounts.depth_first();
    order.reverse();
    for account in order {
        let children: Vec<AccountId> = report.accounts.get(account).children().to_vec();
        let mut total = report.account_xdata(account).total.clone();
        for child in children {
            total += &report.account_xdata(child).total;
        }
        report.account_xdata_mut(account).total = total;
    }
}

/// Drives the three-phase account-aggregation pass: phase 1 feeds
/// `chain` (already built with `set_account_value` as its terminal
/// handler) every posting; phase 2 rolls totals up the tree; phase 3
/// drives `account_handler` over the accounts, in natural tree order, or
/// sorted by `sort_key` (e.g. by full account path) if one is given, then
/// flushes it. If `grand_total` is set, the root account is handed to the
/// handler once more after every other account, carrying the whole
/// tree's total.
pub fn run_account_pass(
    report: &mut Report,
    chain: &mut dyn PostHandler,
    account_handler: &mut dyn AccountHandler,
    sort_key: Option<&dyn Fn(&Report, AccountId) -> String>,
    grand_total: bool,
) -> Result<(), PipelineError> {
    drive(report, chain)?;
    roll_up_totals(report);

    let mut accounts = report.accounts.depth_first();
    if let Some(key) = sort_key {
        accounts.sort_by_key(|&a| key(report, a));
    }

    for account in accounts {
        if let Err(err) = account_handler.accept(report, account) {
            let _ = account_handler.flush(report);
            return Err(err);
        }
    }
    if grand_total {
        if let Err(err) = account_handler.accept(report, report.accounts.root()) {
            let _ = account_handler.flush(report);
            return Err(err);
        }
    }
    account_handler.flush(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commodity::Value;
    use crate::pipeline::test_support::two_account_report;

    struct RecordingAccountHandler {
        seen: Vec<(AccountId, Value)>,
    }

    impl AccountHandler for RecordingAccountHandler {
        fn accept(&mut self, report: &mut Report, account: AccountId) -> Result<(), PipelineError> {
            self.seen.push((account, report.account_xdata(account).total.clone()));
            Ok(())
        }
        fn flush(&mut self, _report: &mut Report) -> Result<(), PipelineError> {
            Ok(())
        }
    }

    #[test]
    fn phase_one_and_two_populate_account_totals() {
        let (mut report, _ids) = two_account_report();
        let mut chain: Box<dyn PostHandler> = Box::new(SetAccountValue);
        let mut handler = RecordingAccountHandler { seen: Vec::new() };
        run_account_pass(&mut report, chain.as_mut(), &mut handler, None, false).unwrap();

        assert_eq!(handler.seen.len(), 2);
        let total: Value = handler.seen.iter().map(|(_, v)| v.clone()).sum();
        assert_eq!(total, Value::Null);
    }
}

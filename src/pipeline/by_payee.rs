//! **by_payee**: buckets postings by effective payee, emitting one
//! synthetic entry per payee in first-seen order, aggregated per
//! (account, commodity) within the bucket exactly as `subtotal` (§4.3).

use std::collections::HashMap;

use crate::account::AccountId;
use crate::error::PipelineError;
use crate::pipeline::subtotal::{emit_accumulated, AccountAccumulator};
use crate::pipeline::PostHandler;
use crate::xdata::{PostingRef, Report};

pub struct ByPayee {
    remember_components: bool,
    order: Vec<String>,
    buckets: HashMap<String, HashMap<AccountId, AccountAccumulator>>,
    downstream: Box<dyn PostHandler>,
}

impl ByPayee {
    pub fn new(remember_components: bool, downstream: Box<dyn PostHandler>) -> ByPayee {
        ByPayee { remember_components, order: Vec::new(), buckets: HashMap::new(), downstream }
    }
}

impl PostHandler for ByPayee {
    fn accept(&mut self, report: &mut Report, posting: PostingRef) -> Result<(), PipelineError> {
        let payee = report.effective_payee(posting);
        let account = report.posting(posting).account;
        let amount = report.effective_amount(posting);
        if !self.buckets.contains_key(&payee) {
            self.order.push(payee.clone());
        }
        let by_account = self.buckets.entry(payee).or_default();
        let acc = by_account.entry(account).or_default();
        for q in amount.iter_quantities() {
            acc.add(q.s, q.q, posting);
        }
        Ok(())
    }

    fn flush(&mut self, report: &mut Report) -> Result<(), PipelineError> {
        for payee in std::mem::take(&mut self.order) {
            let Some(by_account) = self.buckets.remove(&payee) else {
                continue;
            };
            if by_account.is_empty() {
                continue;
            }
            let date = crate::misc::today();
            let entry = report.alloc_synthetic_entry(date, payee, None);
            emit_accumulated(report, entry, by_account, self.remember_components, self.downstream.as_mut())?;
        }
        self.downstream.flush(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::collector;
    use rust_decimal::dec;

    #[test]
    fn groups_by_payee_in_first_seen_order_matching_spec_eight_scenario_six() {
        let (mut report, ids) = crate::pipeline::test_support::three_payee_fixture();
        let (sink, seen) = collector();
        let mut by_payee = ByPayee::new(false, sink);
        for id in &ids {
            by_payee.accept(&mut report, *id).unwrap();
        }
        by_payee.flush(&mut report).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        let payees: Vec<_> = seen.iter().map(|p| report.effective_payee(*p)).collect();
        assert_eq!(payees, vec!["X".to_string(), "Y".to_string()]);
        let amounts: Vec<_> = seen.iter().map(|p| report.effective_amount(*p)).collect();
        assert_eq!(amounts, vec![crate::value!(13, "USD"), crate::value!(7, "USD")]);
    }
}

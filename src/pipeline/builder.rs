//! The chain builder (§4.4): assembles handlers from a [`ReportConfig`]
//! in the fixed canonical order that is part of the public semantics.
//! Built tail-to-head — each step wraps the handler built so far as its
//! downstream — so the loop below reads in the same base-to-outward
//! order the spec lists the stages in.

use std::rc::Rc;

use tracing::instrument;

use crate::error::PipelineError;
use crate::keyexpr;
use crate::period;
use crate::predicate;
use crate::pricedb::PriceSource;
use crate::pipeline::{
    by_payee::ByPayee, calc::Calc, changed_value::ChangedValue, collapse::Collapse, component::ComponentXacts,
    dow::Dow, filter::Filter, interval::Interval, invert::Invert, payee::{SetCodeAsPayee, SetCommAsPayee},
    reconcile::Reconcile, related::Related, sort::{Sort, SortEntries}, subtotal::Subtotal, truncate::TruncateEntries,
    PostHandler, ReportConfig,
};

fn configuration_error(message: impl std::fmt::Display) -> PipelineError {
    PipelineError::Configuration(message.to_string())
}

/// Builds the full pipeline chain described by `config`, returning its
/// head. `terminal` is the caller's renderer or the account-pass sentinel
/// (`account_pass::SetAccountValue`); `price_source` is required only if
/// `show_revalued`/`show_revalued_only` is set.
#[instrument(skip(terminal, price_source))]
pub fn build_chain(
    config: &ReportConfig,
    price_source: Option<Rc<dyn PriceSource>>,
    terminal: Box<dyn PostHandler>,
) -> Result<Box<dyn PostHandler>, PipelineError> {
    if config.comm_as_payee && config.code_as_payee {
        tracing::debug!("both payee overrides requested; commodity-as-payee wins");
    }

    let mut chain = terminal;

    // 1. truncate-entries
    if config.head_entries.is_some() || config.tail_entries.is_some() {
        tracing::debug!(head = ?config.head_entries, tail = ?config.tail_entries, "pushing truncate-entries (head_entries/tail_entries)");
        chain = Box::new(TruncateEntries::new(config.head_entries, config.tail_entries, chain));
    }

    // 2. display-predicate filter
    if let Some(expr) = &config.display_predicate {
        tracing::debug!(expr, "pushing display-predicate filter (display_predicate)");
        let pred = predicate::parse(expr).map_err(configuration_error)?;
        chain = Box::new(Filter::new(pred, chain));
    }

    // 3. calc
    tracing::debug!("pushing calc (unconditional)");
    chain = Box::new(Calc::new(chain));

    // 4. component expansion, one stage per `;`-separated expression,
    // applied right-to-left; any stage present means upstream
    // accumulators must remember their components.
    for expr in config.descend_expr.iter().rev() {
        tracing::debug!(expr, "pushing component expansion (descend_expr)");
        let pred = predicate::parse(expr).map_err(configuration_error)?;
        chain = Box::new(ComponentXacts::new(pred, chain));
    }
    let remember_components = !config.descend_expr.is_empty();

    // 5. reconcile
    if let Some(target) = &config.reconcile_balance {
        let cutoff = config.reconcile_date.unwrap_or_else(crate::misc::today);
        tracing::debug!(%target, %cutoff, "pushing reconcile (reconcile_balance/reconcile_date)");
        chain = Box::new(Reconcile::new(target.clone(), cutoff, chain));
    }

    // 6. secondary predicate filter
    if let Some(expr) = &config.secondary_predicate {
        tracing::debug!(expr, "pushing secondary-predicate filter (secondary_predicate)");
        let pred = predicate::parse(expr).map_err(configuration_error)?;
        chain = Box::new(Filter::new(pred, chain));
    }

    // 7. sort — by-entry if entry_sort, else by-posting
    if let Some(key_expr) = &config.sort_string {
        tracing::debug!(key_expr, entry_sort = config.entry_sort, "pushing sort (sort_string/entry_sort)");
        let key = keyexpr::parse(key_expr).map_err(configuration_error)?;
        chain = if config.entry_sort {
            Box::new(SortEntries::new(key, chain))
        } else {
            Box::new(Sort::new(key, chain))
        };
    }

    // 8. changed-value
    if config.show_revalued || config.show_revalued_only {
        tracing::debug!(only = config.show_revalued_only, "pushing changed-value (show_revalued/show_revalued_only)");
        let source = price_source
            .clone()
            .ok_or_else(|| configuration_error("show_revalued requires a price source"))?;
        chain = Box::new(ChangedValue::new(source, config.show_revalued_only, chain));
    }

    // 9. collapse
    if config.show_collapsed {
        tracing::debug!("pushing collapse (show_collapsed)");
        chain = Box::new(Collapse::new(chain));
    }

    // 10. subtotal
    if config.show_subtotal {
        tracing::debug!(remember_components, "pushing subtotal (show_subtotal)");
        chain = Box::new(Subtotal::new(remember_components, chain));
    }

    // 11. dow OR by-payee (dow wins if both)
    if config.days_of_the_week {
        tracing::debug!("pushing dow (days_of_the_week)");
        chain = Box::new(Dow::new(chrono::Weekday::Sun, remember_components, chain));
    } else if config.by_payee {
        tracing::debug!("pushing by-payee (by_payee)");
        chain = Box::new(ByPayee::new(remember_components, chain));
    }

    // 12. interval, wrapped by an outer date-sort
    if let Some(period_spec) = &config.report_period {
        let parsed = period::parse(period_spec).map_err(configuration_error)?;
        tracing::debug!(period_spec, show_empty = parsed.show_empty, "pushing interval + outer date-sort (report_period)");
        chain = Box::new(Interval::new(parsed.period, remember_components, parsed.show_empty, chain));
        let date_key = keyexpr::parse("date").map_err(configuration_error)?;
        chain = Box::new(Sort::new(date_key, chain));
    }

    // 13. invert
    if config.show_inverted {
        tracing::debug!("pushing invert (show_inverted)");
        chain = Box::new(Invert::new(chain));
    }

    // 14. related-postings
    if config.show_related || config.show_all_related {
        tracing::debug!(all = config.show_all_related, "pushing related-postings (show_related/show_all_related)");
        chain = Box::new(Related::new(config.show_all_related, chain));
    }

    // 15. primary predicate filter
    if let Some(expr) = &config.predicate {
        tracing::debug!(expr, "pushing primary-predicate filter (predicate)");
        let pred = predicate::parse(expr).map_err(configuration_error)?;
        chain = Box::new(Filter::new(pred, chain));
    }

    // 16. payee override — commodity wins over code
    if config.comm_as_payee {
        tracing::debug!("pushing commodity-as-payee override (comm_as_payee)");
        chain = Box::new(SetCommAsPayee::new(chain));
    } else if config.code_as_payee {
        tracing::debug!("pushing code-as-payee override (code_as_payee)");
        chain = Box::new(SetCodeAsPayee::new(chain));
    }

    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{collector, two_account_report};
    use crate::pipeline::{drive, ReportConfig};

    #[test]
    fn empty_config_is_a_pass_through() {
        let (mut report, ids) = two_account_report();
        let (sink, seen) = collector();
        let config = ReportConfig::default();
        let mut chain = build_chain(&config, None, sink).unwrap();
        drive(&mut report, chain.as_mut()).unwrap();
        assert_eq!(*seen.borrow(), ids);
    }

    #[test]
    fn primary_predicate_filters_and_calc_still_sees_everything() {
        let (mut report, ids) = two_account_report();
        let (sink, seen) = collector();
        let config = ReportConfig { predicate: Some("account==Assets:Bank".to_string()), ..Default::default() };
        let mut chain = build_chain(&config, None, sink).unwrap();
        drive(&mut report, chain.as_mut()).unwrap();
        assert_eq!(*seen.borrow(), vec![ids[1]]);
    }

    #[test]
    fn revaluation_without_a_price_source_is_a_configuration_error() {
        let (_report, _ids) = two_account_report();
        let (sink, _seen) = collector();
        let config = ReportConfig { show_revalued: true, ..Default::default() };
        assert!(matches!(build_chain(&config, None, sink), Err(PipelineError::Configuration(_))));
    }
}

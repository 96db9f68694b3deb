//! Action Selector (spec component H): picks the comms routing key for a
//! campaign's final status — a fired R/X/Y rule's routing override if one
//! exists, else the iteration's default for that status — and resolves it
//! through the iteration's [`ActionsMapper`].

use std::collections::HashSet;

use crate::config::ids::CommsRoutingKey;
use crate::config::types::{ActionsMapper, AvailableAction, Iteration};
use crate::evaluator::CohortVerdict;
use crate::status::Status;

/// Selects the actions for `status`, consulting `surviving` (the cohort
/// verdicts that produced the winning status) for a routing override before
/// falling back to the iteration's default.
///
/// Returns an empty vec when the resolved routing key has no entry in the
/// actions mapper — a missing mapping is not an error (spec §7).
pub fn select_actions(status: Status, iteration: &Iteration, surviving: &[CohortVerdict]) -> Vec<AvailableAction> {
    let mut ordered: Vec<&CohortVerdict> = surviving.iter().collect();
    ordered.sort_by(|a, b| a.cohort.cohort_label.cmp(&b.cohort.cohort_label));

    let override_routing = match status {
        Status::Actionable => ordered.iter().find_map(|v| v.redirect_routing.clone()),
        Status::NotEligible => ordered.iter().find_map(|v| v.not_eligible_routing.clone()),
        Status::NotActionable => ordered.iter().find_map(|v| v.not_actionable_routing.clone()),
    };

    let routing_key = override_routing.unwrap_or_else(|| default_routing(status, iteration));
    resolve_actions(&routing_key, &iteration.actions_mapper)
}

fn default_routing(status: Status, iteration: &Iteration) -> CommsRoutingKey {
    match status {
        Status::Actionable => iteration.default_comms_routing.clone(),
        Status::NotEligible => iteration.default_not_eligible_routing.clone(),
        Status::NotActionable => iteration.default_not_actionable_routing.clone(),
    }
}

/// Resolves a (possibly comma-separated) routing key through `mapper`,
/// skipping unmapped keys and deduplicating by `(action_type, action_code)`
/// while preserving the routing key's order.
fn resolve_actions(routing_key: &CommsRoutingKey, mapper: &ActionsMapper) -> Vec<AvailableAction> {
    let mut seen = HashSet::new();
    let mut actions = Vec::new();
    for key in routing_key.as_ref().split(',').map(str::trim).filter(|k| !k.is_empty()) {
        if let Some(action) = mapper.get(key) {
            if seen.insert((action.action_type.clone(), action.action_code.clone())) {
                actions.push(action.clone());
            }
        }
    }
    actions
}

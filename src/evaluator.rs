//! Rule Evaluator (spec component E): for one (cohort, iteration), applies
//! filter/suppression/redirect/action rules in the correct grouping with the
//! precedence algebra and rule-stop semantics, producing a per-cohort
//! verdict with reasons.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::cohort::CohortWorkItem;
use crate::comparator::{self, EvalContext};
use crate::config::ids::{CohortLabel, CommsRoutingKey, RuleDescription, RuleName, RulePriority};
use crate::config::types::{Iteration, IterationRule, RuleType};
use crate::person::PersonView;
use crate::status::Status;

/// The audit/display record of one rule evaluated against one cohort.
///
/// Identity for deduplication (spec §3) is the tuple `(rule_type, rule_name,
/// rule_priority)` — use [`Reason::dedup_key`] rather than `PartialEq`,
/// since two structurally-equal-but-distinct reasons (e.g. differing
/// `matcher_matched`) should still collapse under that identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reason {
    pub rule_type: RuleType,
    pub rule_name: RuleName,
    pub rule_priority: RulePriority,
    pub rule_description: RuleDescription,
    pub matcher_matched: bool,
}

impl Reason {
    pub fn dedup_key(&self) -> (RuleType, RuleName, RulePriority) {
        (self.rule_type, self.rule_name.clone(), self.rule_priority)
    }
}

/// The synthetic reason recorded when a campaign's cohort working set is
/// empty (spec §4.D).
pub const BASE_ELIGIBILITY_RULE: &str = "BASE_ELIGIBILITY";

/// One cohort's verdict: its status plus every rule reason recorded while
/// reaching it, and any routing override a fired R/X/Y rule selected.
#[derive(Debug, Clone)]
pub struct CohortVerdict {
    pub cohort: CohortWorkItem,
    pub status: Status,
    pub reasons: Vec<Reason>,
    pub redirect_routing: Option<CommsRoutingKey>,
    pub not_eligible_routing: Option<CommsRoutingKey>,
    pub not_actionable_routing: Option<CommsRoutingKey>,
}

/// The outcome of evaluating every priority group of one rule type against a
/// cohort: whether any group fired, every reason recorded along the way, and
/// the routing override of the first fired group (if any carried one).
struct GroupOutcome {
    any_fired: bool,
    reasons: Vec<Reason>,
    routing: Option<CommsRoutingKey>,
}

/// Evaluate one cohort for one iteration against one person.
///
/// Rule-type groups are always fully evaluated (subject to `rule_stop`
/// short-circuiting within a type) so every type's reasons are present in
/// the audit trail regardless of which type decided the final status.
pub fn evaluate_cohort(
    cohort: &CohortWorkItem,
    iteration: &Iteration,
    person: &PersonView,
    today: NaiveDate,
) -> CohortVerdict {
    let applicable: Vec<&IterationRule> = iteration
        .iteration_rules
        .iter()
        .filter(|rule| applies_to_cohort(rule, &cohort.cohort_label))
        .collect();

    let ctx = EvalContext {
        person,
        today,
        cohort_label: Some(cohort.cohort_label.as_ref()),
    };

    let filter = evaluate_rule_type(&applicable, RuleType::Filter, &ctx);
    let status_after_filter = if filter.any_fired {
        Status::NotEligible
    } else {
        Status::Actionable
    };

    let suppression = if status_after_filter == Status::NotEligible {
        GroupOutcome {
            any_fired: false,
            reasons: Vec::new(),
            routing: None,
        }
    } else {
        evaluate_rule_type(&applicable, RuleType::Suppression, &ctx)
    };

    let status = if status_after_filter == Status::NotEligible {
        Status::NotEligible
    } else if suppression.any_fired {
        Status::NotActionable
    } else {
        Status::Actionable
    };

    let redirect = evaluate_rule_type(&applicable, RuleType::Redirect, &ctx);
    let not_eligible_action = evaluate_rule_type(&applicable, RuleType::NotEligibleAction, &ctx);
    let not_actionable_action =
        evaluate_rule_type(&applicable, RuleType::NotActionableAction, &ctx);

    let mut reasons = Vec::new();
    reasons.extend(filter.reasons);
    reasons.extend(suppression.reasons);
    reasons.extend(redirect.reasons);
    reasons.extend(not_eligible_action.reasons);
    reasons.extend(not_actionable_action.reasons);

    CohortVerdict {
        cohort: cohort.clone(),
        status,
        reasons,
        redirect_routing: (status == Status::Actionable).then_some(redirect.routing).flatten(),
        not_eligible_routing: (status == Status::NotEligible)
            .then_some(not_eligible_action.routing)
            .flatten(),
        not_actionable_routing: (status == Status::NotActionable)
            .then_some(not_actionable_action.routing)
            .flatten(),
    }
}

fn applies_to_cohort(rule: &IterationRule, cohort_label: &CohortLabel) -> bool {
    match &rule.cohort_label {
        None => true,
        Some(label) => label == cohort_label,
    }
}

/// Evaluate every priority group of `rule_type` among `rules`, in priority
/// ascending order. A group fires iff every rule in it matches (spec §4.E).
/// A fired rule with `rule_stop` halts evaluation of further groups of this
/// type — groups after the stop point are never evaluated and contribute no
/// reasons.
fn evaluate_rule_type(rules: &[&IterationRule], rule_type: RuleType, ctx: &EvalContext<'_>) -> GroupOutcome {
    let mut groups: BTreeMap<i64, Vec<&IterationRule>> = BTreeMap::new();
    for rule in rules.iter().filter(|rule| rule.rule_type == rule_type) {
        groups.entry(rule.priority.0).or_default().push(rule);
    }

    let mut any_fired = false;
    let mut reasons = Vec::new();
    let mut routing = None;
    let mut stop = false;

    for (_priority, group_rules) in groups {
        if stop {
            break;
        }

        let matches: Vec<bool> = group_rules
            .iter()
            .map(|rule| comparator::evaluate(rule, ctx))
            .collect();
        let group_fired = matches.iter().all(|m| *m);

        for (rule, matched) in group_rules.iter().zip(matches.iter()) {
            reasons.push(Reason {
                rule_type: rule.rule_type,
                rule_name: rule.name.clone(),
                rule_priority: rule.priority,
                rule_description: rule.description.clone(),
                matcher_matched: group_fired && *matched,
            });
        }

        if group_fired {
            any_fired = true;
            if routing.is_none() {
                routing = group_rules
                    .iter()
                    .find_map(|rule| rule.comms_routing.clone());
            }
            if group_rules.iter().any(|rule| rule.rule_stop) {
                stop = true;
            }
        }
    }

    GroupOutcome {
        any_fired,
        reasons,
        routing,
    }
}

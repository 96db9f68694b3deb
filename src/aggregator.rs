//! Status Aggregator (spec component F): collapses the per-cohort verdicts
//! produced by [`crate::evaluator`] into one campaign status, one
//! description per cohort group, and one deduplicated reason list.

use std::collections::{BTreeMap, HashSet};

use crate::config::ids::{CohortGroup, Description};
use crate::evaluator::{CohortVerdict, Reason};
use crate::status::Status;

/// The description chosen for one cohort group at the winning status.
#[derive(Debug, Clone)]
pub struct CohortGroupResult {
    pub cohort_group: CohortGroup,
    pub description: Option<Description>,
}

/// The campaign-level outcome of one iteration's cohort verdicts.
#[derive(Debug, Clone)]
pub struct AggregateResult {
    pub status: Status,
    /// Sorted ascending by `cohort_group` (spec §5 ordering).
    pub cohort_groups: Vec<CohortGroupResult>,
    /// Deduplicated by `(rule_type, rule_name, rule_priority)`; first
    /// occurrence (in cohort-label order) wins.
    pub reasons: Vec<Reason>,
}

/// Aggregates `verdicts` for one iteration. Returns `Status::NotEligible`
/// with no groups and no reasons for an empty slice — callers with an empty
/// cohort working set should synthesize a `BASE_ELIGIBILITY` verdict first
/// (spec §4.D) rather than rely on this fallback.
pub fn aggregate(verdicts: &[CohortVerdict]) -> AggregateResult {
    let status = verdicts
        .iter()
        .map(|verdict| verdict.status)
        .max()
        .unwrap_or(Status::NotEligible);

    let surviving: Vec<&CohortVerdict> = verdicts.iter().filter(|v| v.status == status).collect();

    let mut by_group: BTreeMap<CohortGroup, Vec<&CohortVerdict>> = BTreeMap::new();
    for verdict in &surviving {
        by_group
            .entry(verdict.cohort.cohort_group.clone())
            .or_default()
            .push(verdict);
    }

    let cohort_groups = by_group
        .into_iter()
        .map(|(cohort_group, mut members)| {
            members.sort_by(|a, b| {
                let pa = a.cohort.priority.map(|p| p.0).unwrap_or(i64::MAX);
                let pb = b.cohort.priority.map(|p| p.0).unwrap_or(i64::MAX);
                pa.cmp(&pb).then_with(|| a.cohort.cohort_label.cmp(&b.cohort.cohort_label))
            });
            let description = members
                .iter()
                .find_map(|verdict| group_description(verdict, status));
            CohortGroupResult {
                cohort_group,
                description,
            }
        })
        .collect();

    let mut sorted_surviving = surviving;
    sorted_surviving.sort_by(|a, b| a.cohort.cohort_label.cmp(&b.cohort.cohort_label));

    let mut seen = HashSet::new();
    let mut reasons = Vec::new();
    for verdict in &sorted_surviving {
        for reason in &verdict.reasons {
            if seen.insert(reason.dedup_key()) {
                reasons.push(reason.clone());
            }
        }
    }
    // Dedup above picks first occurrence in cohort-label order; the response
    // itself orders by (priority ascending, name ascending), per spec §5.
    reasons.sort_by(|a, b| {
        a.rule_priority
            .0
            .cmp(&b.rule_priority.0)
            .then_with(|| a.rule_name.0.cmp(&b.rule_name.0))
    });

    AggregateResult {
        status,
        cohort_groups,
        reasons,
    }
}

/// Picks the positive description for a favourable status, the negative one
/// otherwise, skipping blank/absent descriptions (spec §4.F).
fn group_description(verdict: &CohortVerdict, status: Status) -> Option<Description> {
    let candidate = match status {
        Status::Actionable | Status::NotActionable => verdict.cohort.positive_description.clone(),
        Status::NotEligible => verdict.cohort.negative_description.clone(),
    };
    candidate.filter(|description| !description.0.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::{CohortMembershipSource, CohortWorkItem};
    use crate::config::ids::{CohortLabel, CohortPriority, RuleDescription, RuleName, RulePriority};
    use crate::config::types::RuleType;

    fn verdict(
        label: &str,
        group: &str,
        priority: i64,
        status: Status,
        positive: &str,
        negative: &str,
    ) -> CohortVerdict {
        CohortVerdict {
            cohort: CohortWorkItem {
                cohort_label: CohortLabel(label.into()),
                cohort_group: CohortGroup(group.into()),
                priority: Some(CohortPriority(priority)),
                positive_description: Some(Description(positive.into())),
                negative_description: Some(Description(negative.into())),
                membership_source: CohortMembershipSource::Person,
            },
            status,
            reasons: Vec::new(),
            redirect_routing: None,
            not_eligible_routing: None,
            not_actionable_routing: None,
        }
    }

    #[test]
    fn overall_status_is_the_max_across_cohorts() {
        let verdicts = vec![
            verdict("a", "g", 1, Status::NotEligible, "pos", "neg"),
            verdict("b", "g", 2, Status::Actionable, "pos", "neg"),
        ];
        let result = aggregate(&verdicts);
        assert_eq!(result.status, Status::Actionable);
    }

    #[test]
    fn lowest_priority_non_empty_description_wins_within_a_group() {
        let verdicts = vec![
            verdict("high_priority", "rsv_age_range", 1, Status::Actionable, "", "neg"),
            verdict("low_priority", "rsv_age_range", 2, Status::Actionable, "low wins", "neg"),
        ];
        let result = aggregate(&verdicts);
        // Priority 1 has a blank positive description, so priority 2's is used.
        assert_eq!(result.cohort_groups.len(), 1);
        assert_eq!(
            result.cohort_groups[0].description,
            Some(Description("low wins".into()))
        );
    }

    #[test]
    fn reasons_deduplicate_by_type_name_and_priority() {
        let mut v1 = verdict("a", "g", 1, Status::NotActionable, "pos", "neg");
        v1.reasons.push(Reason {
            rule_type: RuleType::Suppression,
            rule_name: RuleName("shared".into()),
            rule_priority: RulePriority(1),
            rule_description: RuleDescription("first".into()),
            matcher_matched: true,
        });
        let mut v2 = verdict("b", "g", 2, Status::NotActionable, "pos", "neg");
        v2.reasons.push(Reason {
            rule_type: RuleType::Suppression,
            rule_name: RuleName("shared".into()),
            rule_priority: RulePriority(1),
            rule_description: RuleDescription("second".into()),
            matcher_matched: true,
        });
        let result = aggregate(&[v1, v2]);
        assert_eq!(result.reasons.len(), 1);
        assert_eq!(result.reasons[0].rule_description.0, "first");
    }

    #[test]
    fn reasons_are_ordered_by_priority_then_name_regardless_of_cohort_label_order() {
        let mut v1 = verdict("z_cohort", "g", 1, Status::NotActionable, "pos", "neg");
        v1.reasons.push(Reason {
            rule_type: RuleType::Suppression,
            rule_name: RuleName("bravo".into()),
            rule_priority: RulePriority(2),
            rule_description: RuleDescription("bravo rule".into()),
            matcher_matched: true,
        });
        let mut v2 = verdict("a_cohort", "g", 2, Status::NotActionable, "pos", "neg");
        v2.reasons.push(Reason {
            rule_type: RuleType::Suppression,
            rule_name: RuleName("alpha".into()),
            rule_priority: RulePriority(1),
            rule_description: RuleDescription("alpha rule".into()),
            matcher_matched: true,
        });
        // Cohort-label order (a_cohort before z_cohort) would put "alpha"
        // first anyway; add a same-priority pair to prove the name tiebreak.
        v1.reasons.push(Reason {
            rule_type: RuleType::Suppression,
            rule_name: RuleName("alpha".into()),
            rule_priority: RulePriority(2),
            rule_description: RuleDescription("alpha at priority 2".into()),
            matcher_matched: true,
        });
        let result = aggregate(&[v1, v2]);
        let names: Vec<&str> = result.reasons.iter().map(|r| r.rule_name.0.as_str()).collect();
        assert_eq!(names, vec!["alpha", "alpha", "bravo"]);
        assert_eq!(result.reasons[0].rule_priority.0, 1);
        assert_eq!(result.reasons[1].rule_priority.0, 2);
        assert_eq!(result.reasons[1].rule_description.0, "alpha at priority 2");
    }

    #[test]
    fn cohorts_not_matching_the_winning_status_are_excluded() {
        let verdicts = vec![
            verdict("a", "g", 1, Status::NotEligible, "pos", "neg"),
            verdict("b", "g", 2, Status::Actionable, "pos", "neg"),
        ];
        let result = aggregate(&verdicts);
        assert_eq!(result.cohort_groups[0].description, Some(Description("pos".into())));
    }
}

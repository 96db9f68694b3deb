//! Cohort Resolver (spec component D): expands virtual cohorts, reconciles
//! iteration cohorts with person cohorts, and seeds per-cohort evaluation
//! inputs.

use crate::config::ids::{CohortGroup, CohortLabel, CohortPriority, Description};
use crate::config::types::{Iteration, IterationCohort};
use crate::person::PersonView;

/// Where a [`CohortWorkItem`] came from — used only for audit (spec §9:
/// "the evaluator does not distinguish virtual vs non-virtual cohorts except
/// via the cohort's origin flag").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CohortMembershipSource {
    Person,
    Virtual,
}

/// A cohort selected for evaluation against this person, carrying enough of
/// the iteration cohort's metadata to drive rule matching and description
/// selection without re-borrowing the iteration.
#[derive(Debug, Clone)]
pub struct CohortWorkItem {
    pub cohort_label: CohortLabel,
    pub cohort_group: CohortGroup,
    pub priority: Option<CohortPriority>,
    pub positive_description: Option<Description>,
    pub negative_description: Option<Description>,
    pub membership_source: CohortMembershipSource,
}

/// Builds the per-cohort working set for one (person, iteration) pair:
///
/// 1. Every virtual iteration cohort (unconditionally).
/// 2. Every non-virtual iteration cohort whose label is in the person's
///    cohort set.
pub fn resolve_cohorts(iteration: &Iteration, person: &PersonView) -> Vec<CohortWorkItem> {
    iteration
        .iteration_cohorts
        .iter()
        .filter_map(|cohort| membership_source(cohort, person).map(|source| to_work_item(cohort, source)))
        .collect()
}

fn membership_source(
    cohort: &IterationCohort,
    person: &PersonView,
) -> Option<CohortMembershipSource> {
    if cohort.is_virtual() {
        Some(CohortMembershipSource::Virtual)
    } else if person.is_in_cohort(cohort.cohort_label.as_ref()) {
        Some(CohortMembershipSource::Person)
    } else {
        None
    }
}

fn to_work_item(cohort: &IterationCohort, source: CohortMembershipSource) -> CohortWorkItem {
    CohortWorkItem {
        cohort_label: cohort.cohort_label.clone(),
        cohort_group: cohort.cohort_group.clone(),
        priority: cohort.priority,
        positive_description: cohort.positive_description.clone(),
        negative_description: cohort.negative_description.clone(),
        membership_source: source,
    }
}

/// The highest-priority (smallest `priority`) iteration cohort in the
/// iteration's cohort list — used to source the `BASE_ELIGIBILITY`
/// negative description when the working set is empty (spec §4.D).
pub fn highest_priority_cohort(iteration: &Iteration) -> Option<&IterationCohort> {
    iteration
        .iteration_cohorts
        .iter()
        .min_by_key(|cohort| cohort.priority.map(|p| p.0).unwrap_or(i64::MAX))
}

//! Public response types returned by [`crate::facade`] (spec §6).

use serde::Serialize;

use crate::status::Status;

/// One cohort group's surviving description for a condition's final status.
#[derive(Debug, Clone, Serialize)]
pub struct CohortGroupStatus {
    pub cohort_group: String,
    pub description: String,
}

/// One rule's audit/display record, token-expanded for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct SuitabilityRule {
    pub rule_type: String,
    pub rule_name: String,
    pub rule_priority: i64,
    pub rule_description: String,
    pub matcher_matched: bool,
}

/// A resolved action the caller may present to the person.
#[derive(Debug, Clone, Serialize)]
pub struct Action {
    pub action_type: String,
    pub action_code: String,
    pub action_description: Option<String>,
    pub url_link: Option<String>,
    pub url_label: Option<String>,
}

/// One campaign's eligibility verdict.
#[derive(Debug, Clone, Serialize)]
pub struct Condition {
    pub condition_name: String,
    pub status: Status,
    pub status_text: String,
    pub cohort_results: Vec<CohortGroupStatus>,
    pub suitability_rules: Vec<SuitabilityRule>,
    pub actions: Vec<Action>,
}

/// The top-level response of [`crate::facade::Facade::get_eligibility_status`].
#[derive(Debug, Clone, Serialize, Default)]
pub struct EligibilityStatus {
    pub conditions: Vec<Condition>,
}

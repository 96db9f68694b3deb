//! Typed, validated representation of campaigns, iterations, cohorts, rules,
//! actions, and status text (spec component A, "Rule Config Model").
//!
//! This mirrors the shape of
//! `examples/original_source/.../model/campaign_config.py`, translated into
//! idiomatic Rust: closed enums instead of `Literal[...]`/`StrEnum`, newtype
//! wire ids (`config::ids`), and `serde`-driven (de)serialization instead of
//! pydantic validators.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::ids::{
    AttributeName, AttributeTarget, CampaignId, CampaignName, CampaignVersion, CohortGroup,
    CohortLabel, CohortPriority, CommsRoutingKey, ConditionTag, Description, IterationId,
    IterationName, IterationVersion, RuleComparator, RuleDescription, RuleName, RulePriority,
};

/// `CampaignConfig.Type`: `V`ariable or `S`tatic campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CampaignCategory {
    #[serde(rename = "V")]
    Variable,
    #[serde(rename = "S")]
    Static,
}

/// `Iteration.Type` / `CampaignConfig.IterationType`: `A`nnual, `M`onthly,
/// `S`easonal, `O`ther.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IterationType {
    #[serde(rename = "A")]
    Annual,
    #[serde(rename = "M")]
    Monthly,
    #[serde(rename = "S")]
    Seasonal,
    #[serde(rename = "O")]
    Other,
}

/// `IterationRule.Type`: filter / suppression / redirect / routing-only
/// action selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleType {
    #[serde(rename = "F")]
    Filter,
    #[serde(rename = "S")]
    Suppression,
    #[serde(rename = "R")]
    Redirect,
    #[serde(rename = "X")]
    NotEligibleAction,
    #[serde(rename = "Y")]
    NotActionableAction,
}

/// `IterationRule.AttributeLevel`: which part of the person view a rule
/// reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeLevel {
    #[serde(rename = "PERSON")]
    Person,
    #[serde(rename = "TARGET")]
    Target,
    #[serde(rename = "COHORT")]
    Cohort,
}

/// Comparator operator family. The closed set from spec §4.C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "not_contains")]
    NotContains,
    #[serde(rename = "starts_with")]
    StartsWith,
    #[serde(rename = "not_starts_with")]
    NotStartsWith,
    #[serde(rename = "ends_with")]
    EndsWith,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not_in")]
    NotIn,
    #[serde(rename = "MemberOf")]
    MemberOf,
    #[serde(rename = "NotaMemberOf")]
    NotAMemberOf,
    #[serde(rename = "is_null")]
    IsNull,
    #[serde(rename = "is_not_null")]
    IsNotNull,
    #[serde(rename = "is_empty")]
    IsEmpty,
    #[serde(rename = "is_not_empty")]
    IsNotEmpty,
    #[serde(rename = "is_true")]
    IsTrue,
    #[serde(rename = "is_false")]
    IsFalse,
    #[serde(rename = "between")]
    Between,
    #[serde(rename = "not_between")]
    NotBetween,
    #[serde(rename = "D<=")]
    DayLte,
    #[serde(rename = "D<")]
    DayLt,
    #[serde(rename = "D>=")]
    DayGte,
    #[serde(rename = "D>")]
    DayGt,
    #[serde(rename = "W<=")]
    WeekLte,
    #[serde(rename = "W<")]
    WeekLt,
    #[serde(rename = "W>=")]
    WeekGte,
    #[serde(rename = "W>")]
    WeekGt,
    #[serde(rename = "Y<=")]
    YearLte,
    #[serde(rename = "Y<")]
    YearLt,
    #[serde(rename = "Y>=")]
    YearGte,
    #[serde(rename = "Y>")]
    YearGt,
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveDate::parse_from_str(&raw, "%Y%m%d").map_err(|err| {
        serde::de::Error::custom(format!("invalid YYYYMMDD date {raw:?}: {err}"))
    })
}

fn serialize_date<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&date.format("%Y%m%d").to_string())
}

/// Accepts the JSON string `"Y"`/`"N"` (case-insensitive, trimmed) or a
/// missing field, per spec §4.A. Defaults to `false` (`N`) when absent.
fn deserialize_virtual<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(false),
        Some(value) => match value.trim().to_ascii_uppercase().as_str() {
            "Y" => Ok(true),
            "N" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "invalid value for Virtual: {other:?}"
            ))),
        },
    }
}

/// Accepts either a JSON boolean or the string `"Y"`/`"N"`, per spec §3/§4.A.
/// Defaults to `false` when absent.
fn deserialize_rule_stop<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrFlag {
        Bool(bool),
        Flag(String),
    }

    let raw: Option<BoolOrFlag> = Option::deserialize(deserializer)?;
    Ok(match raw {
        None => false,
        Some(BoolOrFlag::Bool(b)) => b,
        Some(BoolOrFlag::Flag(s)) => s.trim().eq_ignore_ascii_case("y"),
    })
}

/// One row of an iteration's cohort table.
///
/// Virtual cohorts (`virtual == true`) are considered present for every
/// person regardless of their cohort membership (spec §3, §4.D).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationCohort {
    #[serde(rename = "CohortLabel")]
    pub cohort_label: CohortLabel,
    #[serde(rename = "CohortGroup")]
    pub cohort_group: CohortGroup,
    #[serde(rename = "PositiveDescription", default)]
    pub positive_description: Option<Description>,
    #[serde(rename = "NegativeDescription", default)]
    pub negative_description: Option<Description>,
    #[serde(rename = "Priority", default)]
    pub priority: Option<CohortPriority>,
    #[serde(
        rename = "Virtual",
        default,
        deserialize_with = "deserialize_virtual"
    )]
    pub virtual_cohort: bool,
}

impl IterationCohort {
    pub fn is_virtual(&self) -> bool {
        self.virtual_cohort
    }
}

/// One evaluable rule belonging to an iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRule {
    #[serde(rename = "Type")]
    pub rule_type: RuleType,
    #[serde(rename = "Name")]
    pub name: RuleName,
    #[serde(rename = "Description")]
    pub description: RuleDescription,
    #[serde(rename = "Priority")]
    pub priority: RulePriority,
    #[serde(rename = "AttributeLevel")]
    pub attribute_level: AttributeLevel,
    #[serde(rename = "AttributeName", default)]
    pub attribute_name: Option<AttributeName>,
    #[serde(rename = "AttributeTarget", default)]
    pub attribute_target: Option<AttributeTarget>,
    #[serde(rename = "CohortLabel", default)]
    pub cohort_label: Option<CohortLabel>,
    #[serde(rename = "Operator")]
    pub operator: RuleOperator,
    #[serde(rename = "Comparator")]
    pub comparator: RuleComparator,
    #[serde(rename = "RuleStop", default, deserialize_with = "deserialize_rule_stop")]
    pub rule_stop: bool,
    #[serde(rename = "CommsRouting", default)]
    pub comms_routing: Option<CommsRoutingKey>,
}

/// A single actionable comms routing target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableAction {
    #[serde(rename = "ActionType")]
    pub action_type: String,
    #[serde(rename = "ExternalRoutingCode")]
    pub action_code: String,
    #[serde(rename = "ActionDescription", default)]
    pub action_description: Option<String>,
    #[serde(rename = "UrlLink", default)]
    pub url_link: Option<String>,
    #[serde(rename = "UrlLabel", default)]
    pub url_label: Option<String>,
}

/// `routing key -> AvailableAction` lookup table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionsMapper(pub HashMap<String, AvailableAction>);

impl ActionsMapper {
    pub fn get(&self, routing_key: &str) -> Option<&AvailableAction> {
        self.0.get(routing_key)
    }
}

/// Per-status free text overrides. Falls back to the defaults in spec §6
/// when `None` or empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusText {
    #[serde(rename = "NotEligible", default)]
    pub not_eligible: Option<String>,
    #[serde(rename = "NotActionable", default)]
    pub not_actionable: Option<String>,
    #[serde(rename = "Actionable", default)]
    pub actionable: Option<String>,
}

/// One dated ruleset within a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Iteration {
    #[serde(rename = "ID")]
    pub id: IterationId,
    #[serde(rename = "Version")]
    pub version: IterationVersion,
    #[serde(rename = "Name")]
    pub name: IterationName,
    #[serde(
        rename = "IterationDate",
        deserialize_with = "deserialize_date",
        serialize_with = "serialize_date"
    )]
    pub iteration_date: NaiveDate,
    #[serde(rename = "Type")]
    pub iteration_type: IterationType,
    #[serde(rename = "DefaultCommsRouting")]
    pub default_comms_routing: CommsRoutingKey,
    #[serde(rename = "DefaultNotEligibleRouting")]
    pub default_not_eligible_routing: CommsRoutingKey,
    #[serde(rename = "DefaultNotActionableRouting")]
    pub default_not_actionable_routing: CommsRoutingKey,
    #[serde(rename = "IterationCohorts")]
    pub iteration_cohorts: Vec<IterationCohort>,
    #[serde(rename = "IterationRules")]
    pub iteration_rules: Vec<IterationRule>,
    #[serde(rename = "ActionsMapper")]
    pub actions_mapper: ActionsMapper,
    #[serde(rename = "StatusText", default)]
    pub status_text: Option<StatusText>,
}

/// A single campaign: display metadata plus the ordered iterations that
/// carry the actual evaluable rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignConfig {
    #[serde(rename = "ID")]
    pub id: CampaignId,
    #[serde(rename = "Version")]
    pub version: CampaignVersion,
    #[serde(rename = "Name")]
    pub name: CampaignName,
    #[serde(rename = "Type")]
    pub category: CampaignCategory,
    #[serde(rename = "Target")]
    pub target: ConditionTag,
    #[serde(
        rename = "StartDate",
        deserialize_with = "deserialize_date",
        serialize_with = "serialize_date"
    )]
    pub start_date: NaiveDate,
    #[serde(
        rename = "EndDate",
        deserialize_with = "deserialize_date",
        serialize_with = "serialize_date"
    )]
    pub end_date: NaiveDate,
    #[serde(rename = "Iterations")]
    pub iterations: Vec<Iteration>,
}

impl CampaignConfig {
    /// Whether `today` falls within `[start_date, end_date]`.
    pub fn is_live(&self, today: NaiveDate) -> bool {
        self.start_date <= today && today <= self.end_date
    }

    /// The iteration with the greatest `iteration_date <= today`, if any.
    ///
    /// Mirrors the original's `current_iteration` cached property, computed
    /// fresh each call since the crate evaluates a config once per request
    /// and a cache would only add bookkeeping.
    pub fn current_iteration(&self, today: NaiveDate) -> Option<&Iteration> {
        self.iterations
            .iter()
            .filter(|iteration| iteration.iteration_date <= today)
            .max_by_key(|iteration| iteration.iteration_date)
    }
}

/// Top-level JSON envelope: `{"CampaignConfig": {...}}` (spec §6).
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignConfigEnvelope {
    #[serde(rename = "CampaignConfig")]
    pub campaign_config: CampaignConfig,
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            RuleType::Filter => "F",
            RuleType::Suppression => "S",
            RuleType::Redirect => "R",
            RuleType::NotEligibleAction => "X",
            RuleType::NotActionableAction => "Y",
        };
        write!(f, "{code}")
    }
}

//! Rule Config Model (spec component A): typed, validated representation of
//! campaigns, iterations, cohorts, rules, actions, and status text.

pub mod ids;
pub mod loader;
pub mod types;

pub use ids::{
    AttributeName, AttributeTarget, CampaignId, CampaignName, CampaignVersion, CohortGroup,
    CohortLabel, CohortPriority, CommsRoutingKey, ConditionTag, Description, IterationId,
    IterationName, IterationVersion, RuleComparator, RuleDescription, RuleName, RulePriority,
};
pub use loader::{load_campaign_config_file, parse_campaign_config, parse_campaign_configs};
pub use types::{
    ActionsMapper, AttributeLevel, AvailableAction, CampaignCategory, CampaignConfig,
    CampaignConfigEnvelope, Iteration, IterationCohort, IterationRule, IterationType, RuleOperator,
    RuleType, StatusText,
};

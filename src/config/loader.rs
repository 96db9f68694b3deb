//! Parses and validates campaign configuration JSON (spec §4.A, §6).
//!
//! Rejects with [`Error::ConfigInvalid`] on: `start_date > end_date`,
//! duplicate iteration dates, an empty iteration list, or any unknown
//! operator/rule-type/level/virtual-flag code (the last four surface as
//! ordinary `serde_json` deserialization failures, which
//! `From<serde_json::Error>` folds into `ConfigInvalid`).

use std::collections::HashSet;
use std::path::Path;

use super::types::{CampaignConfig, CampaignConfigEnvelope};
use crate::error::{Error, Result};

/// Parse and validate a single `{"CampaignConfig": {...}}` document.
pub fn parse_campaign_config(json: &str) -> Result<CampaignConfig> {
    let envelope: CampaignConfigEnvelope = serde_json::from_str(json)?;
    validate(&envelope.campaign_config)?;
    Ok(envelope.campaign_config)
}

/// Convenience wrapper around [`parse_campaign_config`] for a campaign
/// configuration stored as a file on disk (e.g. in a local fixtures
/// directory, as opposed to the configuration store's usual network path).
pub fn load_campaign_config_file(path: &Path) -> Result<CampaignConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|err| Error::config_invalid(format!("failed to read {}: {err}", path.display())))?;
    parse_campaign_config(&contents)
}

/// Parse and validate a JSON array of `{"CampaignConfig": {...}}` documents,
/// the shape a campaign-configuration store (spec §1, external collaborator)
/// would typically hand back for a bulk load.
pub fn parse_campaign_configs(json: &str) -> Result<Vec<CampaignConfig>> {
    let envelopes: Vec<CampaignConfigEnvelope> = serde_json::from_str(json)?;
    envelopes
        .into_iter()
        .map(|envelope| {
            validate(&envelope.campaign_config)?;
            Ok(envelope.campaign_config)
        })
        .collect()
}

fn validate(campaign: &CampaignConfig) -> Result<()> {
    if campaign.start_date > campaign.end_date {
        return Err(Error::config_invalid(format!(
            "campaign {}: start date {} after end date {}",
            campaign.id, campaign.start_date, campaign.end_date
        )));
    }

    if campaign.iterations.is_empty() {
        return Err(Error::config_invalid(format!(
            "campaign {}: must have at least one iteration",
            campaign.id
        )));
    }

    let mut seen_dates = HashSet::with_capacity(campaign.iterations.len());
    for iteration in &campaign.iterations {
        if !seen_dates.insert(iteration.iteration_date) {
            return Err(Error::config_invalid(format!(
                "campaign {}: duplicate iteration date {}",
                campaign.id, iteration.iteration_date
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_campaign(start: &str, end: &str, iteration_dates: &[&str]) -> String {
        let iterations: Vec<String> = iteration_dates
            .iter()
            .enumerate()
            .map(|(idx, date)| {
                format!(
                    r#"{{
                        "ID": "iter-{idx}", "Version": 1, "Name": "iter",
                        "IterationDate": "{date}", "Type": "A",
                        "DefaultCommsRouting": "default",
                        "DefaultNotEligibleRouting": "default",
                        "DefaultNotActionableRouting": "default",
                        "IterationCohorts": [], "IterationRules": [],
                        "ActionsMapper": {{}}
                    }}"#
                )
            })
            .collect();
        format!(
            r#"{{"CampaignConfig": {{
                "ID": "c1", "Version": 1, "Name": "RSV", "Type": "V", "Target": "RSV",
                "StartDate": "{start}", "EndDate": "{end}",
                "Iterations": [{}]
            }}}}"#,
            iterations.join(",")
        )
    }

    #[test]
    fn parses_a_minimal_valid_campaign() {
        let json = minimal_campaign("20250101", "20251231", &["20250101"]);
        let campaign = parse_campaign_config(&json).expect("should parse");
        assert_eq!(campaign.id.0, "c1");
        assert_eq!(campaign.iterations.len(), 1);
    }

    #[test]
    fn rejects_start_after_end() {
        let json = minimal_campaign("20251231", "20250101", &["20250101"]);
        let err = parse_campaign_config(&json).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn rejects_empty_iterations() {
        let json = minimal_campaign("20250101", "20251231", &[]);
        let err = parse_campaign_config(&json).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn rejects_duplicate_iteration_dates() {
        let json = minimal_campaign("20250101", "20251231", &["20250101", "20250101"]);
        let err = parse_campaign_config(&json).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn rejects_unknown_operator_code() {
        let json = r#"{"CampaignConfig": {
            "ID": "c1", "Version": 1, "Name": "RSV", "Type": "V", "Target": "RSV",
            "StartDate": "20250101", "EndDate": "20251231",
            "Iterations": [{
                "ID": "i1", "Version": 1, "Name": "iter", "IterationDate": "20250101", "Type": "A",
                "DefaultCommsRouting": "default", "DefaultNotEligibleRouting": "default",
                "DefaultNotActionableRouting": "default",
                "IterationCohorts": [],
                "IterationRules": [{
                    "Type": "F", "Name": "bad", "Description": "bad", "Priority": 1,
                    "AttributeLevel": "PERSON", "AttributeName": "X",
                    "Operator": "~=", "Comparator": "1"
                }],
                "ActionsMapper": {}
            }]
        }}"#;
        let err = parse_campaign_config(json).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn rule_stop_accepts_bool_or_yn_string() {
        let json = r#"{"CampaignConfig": {
            "ID": "c1", "Version": 1, "Name": "RSV", "Type": "V", "Target": "RSV",
            "StartDate": "20250101", "EndDate": "20251231",
            "Iterations": [{
                "ID": "i1", "Version": 1, "Name": "iter", "IterationDate": "20250101", "Type": "A",
                "DefaultCommsRouting": "default", "DefaultNotEligibleRouting": "default",
                "DefaultNotActionableRouting": "default",
                "IterationCohorts": [],
                "IterationRules": [
                    {"Type": "F", "Name": "a", "Description": "a", "Priority": 1,
                     "AttributeLevel": "PERSON", "AttributeName": "X",
                     "Operator": "=", "Comparator": "1", "RuleStop": "Y"},
                    {"Type": "F", "Name": "b", "Description": "b", "Priority": 2,
                     "AttributeLevel": "PERSON", "AttributeName": "X",
                     "Operator": "=", "Comparator": "1", "RuleStop": true},
                    {"Type": "F", "Name": "c", "Description": "c", "Priority": 3,
                     "AttributeLevel": "PERSON", "AttributeName": "X",
                     "Operator": "=", "Comparator": "1"}
                ],
                "ActionsMapper": {}
            }]
        }}"#;
        let campaign = parse_campaign_config(json).expect("should parse");
        let rules = &campaign.iterations[0].iteration_rules;
        assert!(rules[0].rule_stop);
        assert!(rules[1].rule_stop);
        assert!(!rules[2].rule_stop);
    }

    #[test]
    fn loads_campaign_config_from_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("campaign.json");
        let json = minimal_campaign("20250101", "20251231", &["20250101"]);
        std::fs::write(&path, json).expect("write fixture");

        let campaign = load_campaign_config_file(&path).expect("should load");
        assert_eq!(campaign.id.0, "c1");
    }
}

//! Per-request audit trail (spec §4.I, §6, §9).
//!
//! Modeled as an explicit builder owned by the facade for the lifetime of one
//! request — no global state, no hidden mutation (spec §9).

use serde::Serialize;

use crate::evaluator::Reason;
use crate::response::Action;
use crate::status::Status;

/// One audited rule: a [`Reason`] flattened for JSON output, independent of
/// whether it ultimately contributed to the surviving cohort group.
#[derive(Debug, Clone, Serialize)]
pub struct AuditedRule {
    pub rule_type: String,
    pub rule_name: String,
    pub rule_priority: i64,
    pub rule_description: String,
    pub matcher_matched: bool,
}

impl From<&Reason> for AuditedRule {
    fn from(reason: &Reason) -> Self {
        AuditedRule {
            rule_type: reason.rule_type.to_string(),
            rule_name: reason.rule_name.0.clone(),
            rule_priority: reason.rule_priority.0,
            rule_description: reason.rule_description.0.clone(),
            matcher_matched: reason.matcher_matched,
        }
    }
}

/// One campaign's audit entry: either a full evaluation record, or a single
/// informational line when the campaign was skipped.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CampaignAudit {
    Evaluated {
        campaign_id: String,
        status: Status,
        status_text: String,
        rules: Vec<AuditedRule>,
        actions: Vec<Action>,
    },
    Skipped {
        message: String,
    },
}

/// The full per-request audit trail, in the order campaigns were considered.
#[derive(Debug, Clone, Serialize, Default)]
pub struct AuditRecord {
    pub campaigns: Vec<CampaignAudit>,
}

/// Accumulates an [`AuditRecord`] across a request's campaigns.
#[derive(Debug, Default)]
pub struct AuditBuilder {
    campaigns: Vec<CampaignAudit>,
}

impl AuditBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the single informational line for a campaign with no active
    /// iteration (spec §6).
    pub fn record_skipped(&mut self, campaign_id: &str) {
        self.campaigns.push(CampaignAudit::Skipped {
            message: format!("Skipping campaign ID {campaign_id} as no active iteration was found."),
        });
    }

    /// Records a fully evaluated campaign, including rules that did not fire
    /// (`matcher_matched=false`), per spec §4.I.
    pub fn record_campaign(
        &mut self,
        campaign_id: &str,
        status: Status,
        status_text: &str,
        reasons: &[Reason],
        actions: &[Action],
    ) {
        self.campaigns.push(CampaignAudit::Evaluated {
            campaign_id: campaign_id.to_string(),
            status,
            status_text: status_text.to_string(),
            rules: reasons.iter().map(AuditedRule::from).collect(),
            actions: actions.to_vec(),
        });
    }

    pub fn build(self) -> AuditRecord {
        AuditRecord {
            campaigns: self.campaigns,
        }
    }
}

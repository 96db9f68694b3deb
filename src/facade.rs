//! Calculator Facade (spec component I): orchestrates components A-H per
//! request, selecting each campaign's live iteration, evaluating cohorts,
//! aggregating, selecting actions, expanding tokens, and assembling the
//! response plus the audit record.

use chrono::NaiveDate;
use futures::future::join_all;
use tracing::{debug, error, info, instrument, warn};

use crate::actions;
use crate::aggregator;
use crate::audit::{AuditBuilder, AuditRecord};
use crate::cohort::{self, CohortMembershipSource, CohortWorkItem};
use crate::collab::{AuditSink, CampaignConfigStore, PersonAttributeStore};
use crate::config::ids::{CohortGroup, CohortLabel, RuleDescription, RuleName, RulePriority};
use crate::config::types::{AvailableAction, CampaignCategory, CampaignConfig, Iteration, RuleType};
use crate::error::{Error, Result};
use crate::evaluator::{self, CohortVerdict, Reason, BASE_ELIGIBILITY_RULE};
use crate::person::{PersonRow, PersonView};
use crate::response::{Action, CohortGroupStatus, Condition, EligibilityStatus, SuitabilityRule};
use crate::status::Status;
use crate::tokens;

/// Which conditions (campaign targets) a request wants results for.
#[derive(Debug, Clone)]
pub enum ConditionsFilter {
    All,
    Named(Vec<String>),
}

impl ConditionsFilter {
    fn matches(&self, target: &str) -> bool {
        match self {
            ConditionsFilter::All => true,
            ConditionsFilter::Named(names) => names.iter().any(|name| name == target),
        }
    }
}

/// Which campaign category a request wants results for.
#[derive(Debug, Clone)]
pub enum CategoryFilter {
    All,
    Category(CampaignCategory),
}

impl CategoryFilter {
    fn matches(&self, category: CampaignCategory) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Category(wanted) => *wanted == category,
        }
    }
}

/// Evaluates every campaign against one person and returns the response and
/// audit record together — the pure, synchronous core the async facade
/// dispatches onto a blocking thread (spec §5: "purely CPU-bound per
/// request").
#[instrument(skip(person_rows, campaigns), fields(campaign_count = campaigns.len()))]
pub fn get_eligibility_status(
    person_rows: Vec<PersonRow>,
    campaigns: &[CampaignConfig],
    today: NaiveDate,
    include_actions: bool,
    conditions_filter: &ConditionsFilter,
    category_filter: &CategoryFilter,
) -> Result<(EligibilityStatus, AuditRecord)> {
    let person = PersonView::new(person_rows);
    let mut audit = AuditBuilder::new();
    let mut conditions = Vec::new();

    for campaign in campaigns {
        if !category_filter.matches(campaign.category) || !conditions_filter.matches(campaign.target.as_ref()) {
            continue;
        }
        if !campaign.is_live(today) {
            debug!(campaign_id = %campaign.id, "campaign is not live today, skipping without audit entry");
            continue;
        }

        let Some(iteration) = campaign.current_iteration(today) else {
            warn!(campaign_id = %campaign.id, "no active iteration found, skipping campaign");
            audit.record_skipped(campaign.id.as_ref());
            continue;
        };

        let condition = evaluate_campaign(campaign, iteration, &person, today, include_actions)?;
        info!(campaign_id = %campaign.id, status = %condition.status, "campaign evaluated");
        audit.record_campaign(
            campaign.id.as_ref(),
            condition.status,
            &condition.status_text,
            &condition.audited_reasons,
            &condition.response.actions,
        );
        conditions.push(condition.response);
    }

    Ok((EligibilityStatus { conditions }, audit.build()))
}

/// Intermediate result of evaluating one campaign, carrying both the public
/// [`Condition`] and the raw reasons the audit trail needs.
struct CampaignResult {
    status: Status,
    status_text: String,
    audited_reasons: Vec<Reason>,
    response: Condition,
}

fn evaluate_campaign(
    campaign: &CampaignConfig,
    iteration: &Iteration,
    person: &PersonView,
    today: NaiveDate,
    include_actions: bool,
) -> Result<CampaignResult> {
    let working_set = cohort::resolve_cohorts(iteration, person);
    let verdicts: Vec<CohortVerdict> = if working_set.is_empty() {
        vec![base_eligibility_verdict(iteration)]
    } else {
        working_set
            .iter()
            .map(|cohort| evaluator::evaluate_cohort(cohort, iteration, person, today))
            .collect()
    };

    let aggregate = aggregator::aggregate(&verdicts);
    let all_reasons = audit_reasons(&verdicts);
    let surviving: Vec<CohortVerdict> = verdicts.into_iter().filter(|v| v.status == aggregate.status).collect();

    let status_text = expand_tokens_logged(
        &resolve_status_text(iteration, aggregate.status, campaign.target.as_ref()),
        person,
        campaign,
    )?;

    let raw_actions: Vec<AvailableAction> = if include_actions {
        actions::select_actions(aggregate.status, iteration, &surviving)
    } else {
        Vec::new()
    };
    let actions = raw_actions
        .into_iter()
        .map(|action| to_public_action(action, person, campaign))
        .collect::<Result<Vec<_>>>()?;

    let cohort_results = aggregate
        .cohort_groups
        .iter()
        .map(|group| -> Result<CohortGroupStatus> {
            let description = match &group.description {
                Some(description) => expand_tokens_logged(description.as_ref(), person, campaign)?,
                None => String::new(),
            };
            Ok(CohortGroupStatus {
                cohort_group: group.cohort_group.to_string(),
                description,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let suitability_rules = aggregate
        .reasons
        .iter()
        .map(|reason| -> Result<SuitabilityRule> {
            Ok(SuitabilityRule {
                rule_type: reason.rule_type.to_string(),
                rule_name: reason.rule_name.0.clone(),
                rule_priority: reason.rule_priority.0,
                rule_description: expand_tokens_logged(reason.rule_description.as_ref(), person, campaign)?,
                matcher_matched: reason.matcher_matched,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CampaignResult {
        status: aggregate.status,
        status_text: status_text.clone(),
        audited_reasons: all_reasons,
        response: Condition {
            condition_name: campaign.target.to_string(),
            status: aggregate.status,
            status_text,
            cohort_results,
            suitability_rules,
            actions,
        },
    })
}

/// Collects the rules audited for a campaign, regardless of whether the
/// cohort they belong to ended up contributing to the campaign's winning
/// status (spec §4.I: audit every rule type per cohort). Deduplicated the
/// same way `aggregator::aggregate` dedups its public `reasons`, by
/// `(rule_type, rule_name, rule_priority)`, first occurrence in
/// cohort-label order wins — just over every verdict instead of only the
/// surviving ones.
fn audit_reasons(verdicts: &[CohortVerdict]) -> Vec<Reason> {
    let mut sorted: Vec<&CohortVerdict> = verdicts.iter().collect();
    sorted.sort_by(|a, b| a.cohort.cohort_label.cmp(&b.cohort.cohort_label));

    let mut seen = std::collections::HashSet::new();
    let mut reasons = Vec::new();
    for verdict in &sorted {
        for reason in &verdict.reasons {
            if seen.insert(reason.dedup_key()) {
                reasons.push(reason.clone());
            }
        }
    }
    reasons
}

/// Synthesizes the `BASE_ELIGIBILITY` verdict for an empty cohort working
/// set (spec §4.D): NotEligible, carrying the negative description of the
/// iteration's highest-priority cohort if one exists.
fn base_eligibility_verdict(iteration: &Iteration) -> CohortVerdict {
    let fallback = cohort::highest_priority_cohort(iteration);
    let cohort_group = fallback
        .map(|cohort| cohort.cohort_group.clone())
        .unwrap_or_else(|| CohortGroup(BASE_ELIGIBILITY_RULE.to_string()));
    let negative_description = fallback.and_then(|cohort| cohort.negative_description.clone());

    CohortVerdict {
        cohort: CohortWorkItem {
            cohort_label: CohortLabel(BASE_ELIGIBILITY_RULE.to_string()),
            cohort_group,
            priority: None,
            positive_description: None,
            negative_description,
            membership_source: CohortMembershipSource::Virtual,
        },
        status: Status::NotEligible,
        reasons: vec![Reason {
            rule_type: RuleType::Filter,
            rule_name: RuleName(BASE_ELIGIBILITY_RULE.to_string()),
            rule_priority: RulePriority(0),
            rule_description: RuleDescription("no cohort in the working set applies to this person".into()),
            matcher_matched: true,
        }],
        redirect_routing: None,
        not_eligible_routing: None,
        not_actionable_routing: None,
    }
}

fn resolve_status_text(iteration: &Iteration, status: Status, condition: &str) -> String {
    let configured = iteration.status_text.as_ref().and_then(|text| {
        match status {
            Status::Actionable => text.actionable.clone(),
            Status::NotActionable => text.not_actionable.clone(),
            Status::NotEligible => text.not_eligible.clone(),
        }
    });
    configured
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| default_status_text(status, condition))
}

fn default_status_text(status: Status, condition: &str) -> String {
    match status {
        Status::Actionable | Status::NotActionable => format!("You should have the {condition} vaccine"),
        Status::NotEligible => "We do not believe you can have it".to_string(),
    }
}

fn to_public_action(action: AvailableAction, person: &PersonView, campaign: &CampaignConfig) -> Result<Action> {
    let action_description = action
        .action_description
        .as_deref()
        .map(|text| expand_tokens_logged(text, person, campaign))
        .transpose()?;
    let url_label = action
        .url_label
        .as_deref()
        .map(|text| expand_tokens_logged(text, person, campaign))
        .transpose()?;
    Ok(Action {
        action_type: action.action_type,
        action_code: action.action_code,
        action_description,
        url_link: action.url_link,
        url_label,
    })
}

/// Expands a token string, logging an `error` event before propagating
/// failure to resolve (`SPEC_FULL.md` A2: "an error event... when a token
/// fails to resolve").
fn expand_tokens_logged(text: &str, person: &PersonView, campaign: &CampaignConfig) -> Result<String> {
    tokens::expand_tokens(text, person).map_err(|err| {
        error!(campaign_id = %campaign.id, %err, "token failed to resolve");
        err
    })
}

/// Async facade over a set of external collaborators (spec §1): fetches a
/// person's rows and the campaign set, evaluates on a blocking thread (the
/// core is purely CPU-bound, per spec §5), and forwards the audit record.
pub struct Facade<P, C, A> {
    person_store: P,
    campaign_store: C,
    audit_sink: A,
}

impl<P, C, A> Facade<P, C, A>
where
    P: PersonAttributeStore + 'static,
    C: CampaignConfigStore + 'static,
    A: AuditSink + 'static,
{
    pub fn new(person_store: P, campaign_store: C, audit_sink: A) -> Self {
        Self {
            person_store,
            campaign_store,
            audit_sink,
        }
    }

    #[instrument(skip(self, conditions_filter, category_filter))]
    pub async fn get_eligibility_status_async(
        &self,
        person_id: &str,
        today: NaiveDate,
        include_actions: bool,
        conditions_filter: ConditionsFilter,
        category_filter: CategoryFilter,
    ) -> Result<EligibilityStatus> {
        let person_rows = self.person_store.person_rows(person_id).await?;
        let campaigns = self.campaign_store.campaigns().await?;

        let (status, audit) = tokio::task::spawn_blocking(move || {
            get_eligibility_status(
                person_rows,
                &campaigns,
                today,
                include_actions,
                &conditions_filter,
                &category_filter,
            )
        })
        .await
        .map_err(|err| Error::Internal(format!("evaluation task panicked: {err}")))??;

        self.audit_sink.record(audit).await?;
        Ok(status)
    }

    /// Evaluates several people concurrently: one blocking evaluation per
    /// person, joined rather than run serially.
    pub async fn get_eligibility_status_batch(
        &self,
        person_ids: &[String],
        today: NaiveDate,
        include_actions: bool,
        conditions_filter: ConditionsFilter,
        category_filter: CategoryFilter,
    ) -> Vec<Result<EligibilityStatus>> {
        let futures = person_ids.iter().map(|person_id| {
            self.get_eligibility_status_async(
                person_id,
                today,
                include_actions,
                conditions_filter.clone(),
                category_filter.clone(),
            )
        });
        join_all(futures).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::CampaignAudit;
    use crate::config::ids::{
        AttributeName, CampaignId, CampaignName, CampaignVersion, CohortLabel, CohortPriority,
        CommsRoutingKey, ConditionTag, Description, IterationId, IterationName, IterationVersion,
        RuleComparator,
    };
    use crate::config::types::{
        ActionsMapper, AttributeLevel, IterationCohort, IterationRule, IterationType, RuleOperator,
    };
    use std::collections::HashMap;

    fn iteration_rule(
        rule_type: RuleType,
        name: &str,
        attr: &str,
        operator: RuleOperator,
        comparator: &str,
    ) -> IterationRule {
        IterationRule {
            rule_type,
            name: RuleName(name.into()),
            description: RuleDescription(format!("{name} description")),
            priority: RulePriority(1),
            attribute_level: AttributeLevel::Person,
            attribute_name: Some(AttributeName(attr.into())),
            attribute_target: None,
            cohort_label: None,
            operator,
            comparator: RuleComparator(comparator.into()),
            rule_stop: false,
            comms_routing: None,
        }
    }

    fn campaign(id: &str, target: &str, rule: Option<IterationRule>) -> CampaignConfig {
        CampaignConfig {
            id: CampaignId(id.into()),
            version: CampaignVersion(1),
            name: CampaignName(format!("{target} campaign")),
            category: CampaignCategory::Variable,
            target: ConditionTag(target.into()),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            iterations: vec![Iteration {
                id: IterationId("i1".into()),
                version: IterationVersion(1),
                name: IterationName("i1".into()),
                iteration_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                iteration_type: IterationType::Annual,
                default_comms_routing: CommsRoutingKey("book".into()),
                default_not_eligible_routing: CommsRoutingKey("none".into()),
                default_not_actionable_routing: CommsRoutingKey("wait".into()),
                iteration_cohorts: vec![IterationCohort {
                    cohort_label: CohortLabel("vc".into()),
                    cohort_group: CohortGroup("g".into()),
                    positive_description: Some(Description("eligible".into())),
                    negative_description: Some(Description("not eligible".into())),
                    priority: Some(CohortPriority(1)),
                    virtual_cohort: true,
                }],
                iteration_rules: rule.into_iter().collect(),
                actions_mapper: ActionsMapper::default(),
                status_text: None,
            }],
        }
    }

    #[test]
    fn a_malformed_token_in_a_rule_description_propagates_as_an_error() {
        let mut rule = iteration_rule(RuleType::Filter, "too_young", "AGE_FLAG", RuleOperator::Eq, "too_young");
        rule.description = RuleDescription("[[PERSON.AGE:BAD_POSTFIX(x)]]".into());
        let c = campaign("c1", "RSV", Some(rule));
        let today = NaiveDate::from_ymd_opt(2025, 4, 25).unwrap();
        let rows = vec![PersonRow::Person {
            attributes: HashMap::from([("AGE_FLAG".to_string(), "too_young".to_string())]),
        }];
        let err = get_eligibility_status(rows, &[c], today, true, &ConditionsFilter::All, &CategoryFilter::All)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidToken { .. }));
    }

    #[test]
    fn campaign_outside_date_range_produces_no_condition() {
        let mut c = campaign("c1", "RSV", None);
        c.start_date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        c.end_date = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 4, 25).unwrap();
        let (status, audit) = get_eligibility_status(
            vec![],
            &[c],
            today,
            true,
            &ConditionsFilter::All,
            &CategoryFilter::All,
        )
        .unwrap();
        assert!(status.conditions.is_empty());
        assert!(audit.campaigns.is_empty());
    }

    #[test]
    fn campaign_with_no_active_iteration_is_skipped_with_one_audit_line() {
        let mut c = campaign("c1", "RSV", None);
        c.iterations[0].iteration_date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 4, 25).unwrap();
        let (status, audit) = get_eligibility_status(
            vec![],
            &[c],
            today,
            true,
            &ConditionsFilter::All,
            &CategoryFilter::All,
        )
        .unwrap();
        assert!(status.conditions.is_empty());
        assert_eq!(audit.campaigns.len(), 1);
    }

    #[test]
    fn virtual_cohort_with_no_firing_rules_is_actionable() {
        let c = campaign("c1", "RSV", None);
        let today = NaiveDate::from_ymd_opt(2025, 4, 25).unwrap();
        let (status, _audit) = get_eligibility_status(
            vec![],
            &[c],
            today,
            true,
            &ConditionsFilter::All,
            &CategoryFilter::All,
        )
        .unwrap();
        assert_eq!(status.conditions.len(), 1);
        assert_eq!(status.conditions[0].status, Status::Actionable);
    }

    /// A Filter rule scoped to one losing cohort and a Suppression rule
    /// scoped to another losing cohort must both still appear in the audit
    /// trail, even though the campaign's overall winning status comes from
    /// unrelated cohorts with no rules of their own.
    #[test]
    fn audit_covers_rules_from_cohorts_that_did_not_win_the_overall_status() {
        let filter_rule = IterationRule {
            cohort_label: Some(CohortLabel("cohort_1".into())),
            ..iteration_rule(RuleType::Filter, "too_young", "AGE_FLAG", RuleOperator::Eq, "too_young")
        };
        let suppression_rule = IterationRule {
            cohort_label: Some(CohortLabel("cohort_5".into())),
            ..iteration_rule(RuleType::Suppression, "recent_dose", "RECENT_DOSE", RuleOperator::Eq, "yes")
        };

        let mut c = campaign("c1", "RSV", None);
        c.iterations[0].iteration_rules = vec![filter_rule, suppression_rule];
        c.iterations[0].iteration_cohorts = vec![1, 2, 3, 4, 5]
            .into_iter()
            .map(|n| IterationCohort {
                cohort_label: CohortLabel(format!("cohort_{n}")),
                cohort_group: CohortGroup(format!("group_{n}")),
                positive_description: Some(Description(format!("cohort_{n} eligible"))),
                negative_description: Some(Description(format!("cohort_{n} not eligible"))),
                priority: Some(CohortPriority(n)),
                virtual_cohort: true,
            })
            .collect();

        let today = NaiveDate::from_ymd_opt(2025, 4, 25).unwrap();
        let rows = vec![PersonRow::Person {
            attributes: HashMap::from([
                ("AGE_FLAG".to_string(), "too_young".to_string()),
                ("RECENT_DOSE".to_string(), "yes".to_string()),
            ]),
        }];
        let (status, audit) = get_eligibility_status(
            rows,
            &[c],
            today,
            true,
            &ConditionsFilter::All,
            &CategoryFilter::All,
        )
        .unwrap();
        // Cohorts 2-4 have no rules, so they default Actionable and carry
        // the overall status; cohort_1 (NotEligible) and cohort_5
        // (NotActionable) both lose that contest.
        assert_eq!(status.conditions[0].status, Status::Actionable);

        let CampaignAudit::Evaluated { rules, .. } = &audit.campaigns[0] else {
            panic!("expected an Evaluated audit entry");
        };
        assert!(rules.iter().any(|r| r.rule_name == "too_young"), "{rules:?}");
        assert!(rules.iter().any(|r| r.rule_name == "recent_dose"), "{rules:?}");
    }

    /// Grounded in scenario S7: two campaigns evaluated against the same
    /// person each reach their own status independently.
    #[test]
    fn two_campaigns_reach_independent_statuses() {
        let filter_rule = iteration_rule(RuleType::Filter, "too_young", "AGE_FLAG", RuleOperator::Eq, "too_young");
        let suppression_rule =
            iteration_rule(RuleType::Suppression, "recent_dose", "RECENT_DOSE", RuleOperator::Eq, "yes");

        let rsv = campaign("rsv", "RSV", Some(filter_rule));
        let covid = campaign("covid", "COVID", Some(suppression_rule));

        let today = NaiveDate::from_ymd_opt(2025, 4, 25).unwrap();
        let rows = vec![PersonRow::Person {
            attributes: HashMap::from([
                ("AGE_FLAG".to_string(), "too_young".to_string()),
                ("RECENT_DOSE".to_string(), "yes".to_string()),
            ]),
        }];
        let (status, _audit) = get_eligibility_status(
            rows,
            &[rsv, covid],
            today,
            true,
            &ConditionsFilter::All,
            &CategoryFilter::All,
        )
        .unwrap();
        assert_eq!(status.conditions.len(), 2);
        let rsv_condition = status.conditions.iter().find(|c| c.condition_name == "RSV").unwrap();
        let covid_condition = status.conditions.iter().find(|c| c.condition_name == "COVID").unwrap();
        assert_eq!(rsv_condition.status, Status::NotEligible);
        assert_eq!(covid_condition.status, Status::NotActionable);
    }

    #[test]
    fn conditions_filter_excludes_non_matching_campaigns() {
        let c = campaign("c1", "RSV", None);
        let today = NaiveDate::from_ymd_opt(2025, 4, 25).unwrap();
        let (status, _audit) = get_eligibility_status(
            vec![],
            &[c],
            today,
            true,
            &ConditionsFilter::Named(vec!["COVID".to_string()]),
            &CategoryFilter::All,
        )
        .unwrap();
        assert!(status.conditions.is_empty());
    }

    #[test]
    fn default_status_text_fills_in_the_condition_name() {
        let c = campaign("c1", "RSV", None);
        let today = NaiveDate::from_ymd_opt(2025, 4, 25).unwrap();
        let (status, _audit) = get_eligibility_status(
            vec![],
            &[c],
            today,
            true,
            &ConditionsFilter::All,
            &CategoryFilter::All,
        )
        .unwrap();
        assert_eq!(status.conditions[0].status_text, "You should have the RSV vaccine");
    }
}

//! # eligibility-calculator
//!
//! A rule-evaluation engine that decides, for a given person, which
//! vaccination (or similar) campaigns they are eligible for right now, which
//! they are not, and what the recommended next step is.
//!
//! For each campaign the engine returns one of three statuses —
//! `Actionable`, `NotActionable`, `NotEligible` — together with the cohorts
//! that justify the verdict, the rules that fired, human-readable status and
//! cohort descriptions with tokens resolved against the person, and a list
//! of suggested actions.
//!
//! ## Core components
//!
//! - [`config`]: the typed, validated campaign/iteration/cohort/rule model.
//! - [`person`]: typed lookups over a person's attribute rows.
//! - [`comparator`]: the operator engine a rule's comparator is evaluated
//!   with.
//! - [`cohort`]: resolves an iteration's cohorts against a person.
//! - [`evaluator`]: the per-cohort rule-precedence algorithm.
//! - [`aggregator`]: collapses per-cohort verdicts into one campaign status.
//! - [`tokens`]: expands `[[PERSON.X]]` / `[[TARGET.T.A]]` placeholders.
//! - [`actions`]: chooses the comms routing and resolves it to actions.
//! - [`audit`]: the per-request audit trail.
//! - [`facade`]: orchestrates all of the above per request.
//! - [`collab`]: the external collaborator traits (person store, campaign
//!   store, audit sink) a deployment wires up.
//!
//! ## Example
//!
//! ```rust,ignore
//! use eligibility_calculator::facade::{get_eligibility_status, ConditionsFilter, CategoryFilter};
//! use eligibility_calculator::config::parse_campaign_configs;
//! use chrono::NaiveDate;
//!
//! let campaigns = parse_campaign_configs(campaigns_json)?;
//! let (status, audit) = get_eligibility_status(
//!     person_rows,
//!     &campaigns,
//!     NaiveDate::from_ymd_opt(2025, 4, 25).unwrap(),
//!     true,
//!     &ConditionsFilter::All,
//!     &CategoryFilter::All,
//! )?;
//! ```

pub mod actions;
pub mod aggregator;
pub mod audit;
pub mod cohort;
pub mod collab;
pub mod comparator;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod facade;
pub mod person;
pub mod response;
pub mod status;
pub mod tokens;

pub use config::{CampaignConfig, parse_campaign_config, parse_campaign_configs};
pub use error::{Error, Result};
pub use facade::{get_eligibility_status, CategoryFilter, ConditionsFilter, Facade};
pub use person::{PersonRow, PersonView};
pub use response::{Action, CohortGroupStatus, Condition, EligibilityStatus, SuitabilityRule};
pub use status::Status;

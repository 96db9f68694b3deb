//! Person View (spec component B): presents a person's attribute rows as
//! typed lookups for the PERSON / TARGET / COHORT attribute levels.
//!
//! The view is immutable within a request — it owns nothing mutable and is
//! built once per [`crate::facade::Facade::get_eligibility_status`] call.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// One row of a person's attribute data, as handed in by the (external,
/// out-of-scope) person-attribute store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "TYPE")]
pub enum PersonRow {
    /// The person's own attributes (date of birth, postcode, flags, ...).
    #[serde(rename = "PERSON")]
    Person { attributes: HashMap<String, String> },
    /// Attributes scoped to a condition target, e.g. `RSV`.
    #[serde(rename = "TARGET")]
    Target {
        target: String,
        attributes: HashMap<String, String>,
    },
    /// The set of cohort labels the person belongs to.
    #[serde(rename = "COHORTS")]
    Cohorts { labels: HashSet<String> },
}

/// Typed, read-only view over a person's rows.
///
/// Missing attributes return `None` (the "absent" sentinel from spec §4.B);
/// there is no error path for a missing attribute, only for a malformed
/// token referencing one (spec §7, `InvalidToken`).
#[derive(Debug, Clone, Default)]
pub struct PersonView {
    person_attrs: HashMap<String, String>,
    target_attrs: HashMap<String, HashMap<String, String>>,
    cohorts: HashSet<String>,
}

impl PersonView {
    pub fn new(rows: Vec<PersonRow>) -> Self {
        let mut view = PersonView::default();
        for row in rows {
            match row {
                PersonRow::Person { attributes } => view.person_attrs.extend(attributes),
                PersonRow::Target { target, attributes } => {
                    view.target_attrs.entry(target).or_default().extend(attributes)
                }
                PersonRow::Cohorts { labels } => view.cohorts.extend(labels),
            }
        }
        view
    }

    /// A PERSON-level attribute value, or `None` if absent.
    pub fn person_attr(&self, name: &str) -> Option<&str> {
        self.person_attrs.get(name).map(String::as_str)
    }

    /// A TARGET-level attribute value for the named target, or `None` if the
    /// target or the attribute is absent.
    pub fn target_attr(&self, target_name: &str, name: &str) -> Option<&str> {
        self.target_attrs
            .get(target_name)
            .and_then(|attrs| attrs.get(name))
            .map(String::as_str)
    }

    /// The set of cohort labels the person belongs to.
    pub fn cohorts(&self) -> &HashSet<String> {
        &self.cohorts
    }

    pub fn is_in_cohort(&self, label: &str) -> bool {
        self.cohorts.contains(label)
    }
}

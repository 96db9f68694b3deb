//! Comparator Engine (spec component C): evaluates one rule's operator
//! against one attribute value, including date arithmetic, NVL defaults,
//! and list/string predicates.
//!
//! A comparator that fails to parse never produces an `Error` — spec §7
//! classifies that as `RuleMismatch`, which this module realizes simply by
//! returning `false` ("does not match").

use chrono::{Datelike, NaiveDate};

use crate::config::types::{AttributeLevel, IterationRule, RuleOperator};
use crate::person::PersonView;

/// Everything the comparator needs beyond the rule itself: today's date (for
/// date-arithmetic operators) and, for `COHORT`-level attributes, the label
/// of the cohort currently being evaluated.
pub struct EvalContext<'a> {
    pub person: &'a PersonView,
    pub today: NaiveDate,
    pub cohort_label: Option<&'a str>,
}

/// Evaluate `rule`'s operator against the person/cohort data in `ctx`.
///
/// Returns `false` for any comparator that fails to parse or any attribute
/// that is absent without a matching `[[NVL:...]]` default — per spec §7
/// this is a `RuleMismatch`, not an error.
pub fn evaluate(rule: &IterationRule, ctx: &EvalContext<'_>) -> bool {
    use RuleOperator::*;

    if matches!(rule.operator, MemberOf | NotAMemberOf) {
        return evaluate_member_of(rule, ctx);
    }

    let (base_comparator, nvl_default) = split_nvl(rule.comparator.as_ref());
    let attribute_value = resolve_attribute(rule, ctx);

    match rule.operator {
        IsNull => attribute_value.is_none(),
        IsNotNull => attribute_value.is_some(),
        IsEmpty => attribute_value.map(str::is_empty).unwrap_or(true),
        IsNotEmpty => attribute_value.map(|v| !v.is_empty()).unwrap_or(false),
        IsTrue => attribute_value.map(is_truthy).unwrap_or(false),
        IsFalse => attribute_value.map(is_falsy).unwrap_or(false),
        _ => {
            let Some(value) = attribute_value.or(nvl_default) else {
                return false;
            };
            evaluate_with_value(rule.operator, value, base_comparator, ctx.today)
        }
    }
}

fn evaluate_with_value(operator: RuleOperator, value: &str, comparator: &str, today: NaiveDate) -> bool {
    use RuleOperator::*;
    match operator {
        Eq | Ne | Gt | Lt | Gte | Lte => compare_ordered(operator, value, comparator),
        Contains => value.contains(comparator),
        NotContains => !value.contains(comparator),
        StartsWith => value.starts_with(comparator),
        NotStartsWith => !value.starts_with(comparator),
        EndsWith => value.ends_with(comparator),
        In => split_list(comparator).any(|item| item == value),
        NotIn => !split_list(comparator).any(|item| item == value),
        Between => in_range(value, comparator),
        NotBetween => !in_range(value, comparator),
        DayLte | DayLt | DayGte | DayGt | WeekLte | WeekLt | WeekGte | WeekGt | YearLte | YearLt
        | YearGte | YearGt => evaluate_date_arithmetic(operator, value, comparator, today),
        MemberOf | NotAMemberOf | IsNull | IsNotNull | IsEmpty | IsNotEmpty | IsTrue | IsFalse => {
            unreachable!("handled before reaching evaluate_with_value")
        }
    }
}

fn evaluate_member_of(rule: &IterationRule, ctx: &EvalContext<'_>) -> bool {
    let (base_comparator, _nvl) = split_nvl(rule.comparator.as_ref());
    let labels: Vec<&str> = split_list(base_comparator).collect();
    let is_member = labels.iter().any(|label| ctx.person.is_in_cohort(label));
    match rule.operator {
        RuleOperator::MemberOf => is_member,
        RuleOperator::NotAMemberOf => !is_member,
        _ => unreachable!("only called for MemberOf/NotAMemberOf"),
    }
}

/// Reads the attribute named by `rule` from the person view, per its
/// `attribute_level`. `COHORT`-level rules resolve to the label of the
/// cohort currently under evaluation, not a named attribute on a row — the
/// person-attribute store has no per-cohort attribute bag (spec §3).
fn resolve_attribute<'a>(rule: &IterationRule, ctx: &EvalContext<'a>) -> Option<&'a str> {
    match rule.attribute_level {
        AttributeLevel::Person => {
            let name = rule.attribute_name.as_ref()?;
            ctx.person.person_attr(name.as_ref())
        }
        AttributeLevel::Target => {
            let target = rule.attribute_target.as_ref()?;
            let name = rule.attribute_name.as_ref()?;
            ctx.person.target_attr(target.as_ref(), name.as_ref())
        }
        AttributeLevel::Cohort => ctx.cohort_label,
    }
}

/// Splits the `[[NVL:<literal>]]` suffix (if present) off a comparator
/// string, per spec §4.C. The suffix is always stripped *before*
/// operator-specific splitting (e.g. `between`'s `lo,hi`), per spec §9.
fn split_nvl(raw: &str) -> (&str, Option<&str>) {
    if let Some(start) = raw.find("[[NVL:") {
        if let Some(rest) = raw[start..].strip_prefix("[[NVL:") {
            if let Some(literal) = rest.strip_suffix("]]") {
                return (&raw[..start], Some(literal));
            }
        }
    }
    (raw, None)
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim)
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "y" | "1" | "yes")
}

fn is_falsy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "false" | "n" | "0" | "no")
}

/// A raw attribute/comparator string, parsed opportunistically per spec
/// §4.C ("attributes that arrive as strings are parsed opportunistically").
#[derive(Debug, Clone, Copy, PartialEq)]
enum ParsedValue<'a> {
    Date(NaiveDate),
    Number(f64),
    Text(&'a str),
}

fn parse_value(raw: &str) -> ParsedValue<'_> {
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y%m%d") {
            return ParsedValue::Date(date);
        }
    }
    if let Ok(number) = raw.parse::<f64>() {
        return ParsedValue::Number(number);
    }
    ParsedValue::Text(raw)
}

fn compare_ordered(operator: RuleOperator, value: &str, comparator: &str) -> bool {
    use std::cmp::Ordering;
    let ordering = match (parse_value(value), parse_value(comparator)) {
        (ParsedValue::Date(a), ParsedValue::Date(b)) => a.cmp(&b),
        (ParsedValue::Number(a), ParsedValue::Number(b)) => {
            a.partial_cmp(&b).unwrap_or(Ordering::Greater)
        }
        _ => value.cmp(comparator),
    };
    apply_ordering(operator, ordering)
}

fn apply_ordering(operator: RuleOperator, ordering: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match operator {
        RuleOperator::Eq => ordering == Equal,
        RuleOperator::Ne => ordering != Equal,
        RuleOperator::Gt => ordering == Greater,
        RuleOperator::Lt => ordering == Less,
        RuleOperator::Gte => ordering != Less,
        RuleOperator::Lte => ordering != Greater,
        _ => false,
    }
}

fn in_range(value: &str, comparator: &str) -> bool {
    let Some((lo_raw, hi_raw)) = comparator.split_once(',') else {
        return false;
    };
    let (lo_raw, hi_raw) = (lo_raw.trim(), hi_raw.trim());
    match (parse_value(value), parse_value(lo_raw), parse_value(hi_raw)) {
        (ParsedValue::Date(v), ParsedValue::Date(lo), ParsedValue::Date(hi)) => v >= lo && v <= hi,
        (ParsedValue::Number(v), ParsedValue::Number(lo), ParsedValue::Number(hi)) => {
            v >= lo && v <= hi
        }
        _ => value >= lo_raw && value <= hi_raw,
    }
}

/// `D`/`W`/`Y` operators: compares a date attribute to `today + N` days,
/// weeks, or calendar years (spec §4.C). `N` is a signed integer offset.
/// Year deltas use calendar month/day, not a 365-day approximation.
fn evaluate_date_arithmetic(operator: RuleOperator, value: &str, comparator: &str, today: NaiveDate) -> bool {
    use RuleOperator::*;

    let ParsedValue::Date(attribute_date) = parse_value(value) else {
        return false;
    };
    let Ok(offset) = comparator.trim().parse::<i64>() else {
        return false;
    };

    let threshold = match operator {
        DayLte | DayLt | DayGte | DayGt => today + chrono::Duration::days(offset),
        WeekLte | WeekLt | WeekGte | WeekGt => today + chrono::Duration::weeks(offset),
        YearLte | YearLt | YearGte | YearGt => add_years(today, offset),
        _ => return false,
    };

    let ordering = attribute_date.cmp(&threshold);
    match operator {
        DayLte | WeekLte | YearLte => ordering != std::cmp::Ordering::Greater,
        DayLt | WeekLt | YearLt => ordering == std::cmp::Ordering::Less,
        DayGte | WeekGte | YearGte => ordering != std::cmp::Ordering::Less,
        DayGt | WeekGt | YearGt => ordering == std::cmp::Ordering::Greater,
        _ => false,
    }
}

/// Adds a signed number of calendar years to `date`, clamping Feb 29 to Feb
/// 28 in non-leap target years (the same convention `chrono` uses
/// internally for `with_year`).
fn add_years(date: NaiveDate, years: i64) -> NaiveDate {
    let target_year = date.year() as i64 + years;
    let target_year = i32::try_from(target_year).unwrap_or(if years < 0 { i32::MIN } else { i32::MAX });
    date.with_year(target_year).unwrap_or_else(|| {
        NaiveDate::from_ymd_opt(target_year, 2, 28).expect("Feb 28 is always valid")
    })
}

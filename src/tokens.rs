//! Token Expander (spec component G): replaces `[[PERSON.<ATTR>]]` /
//! `[[TARGET.<TARGET>.<ATTR>]]` placeholders in descriptions and status text
//! with the person's attribute values, with an optional `:DATE(<format>)`
//! reformatting postfix.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{Error, Result};
use crate::person::PersonView;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[\[[^\[\]]*\]\]").expect("token pattern is valid"))
}

/// Matches any `:IDENT(...)` postfix on a token's path, not just `:DATE(...)`,
/// so an unsupported postfix is rejected rather than mistaken for part of the
/// path (spec §4.G: "any other post-fix is an error").
fn postfix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<path>.*):(?P<kind>[A-Z_]+)\((?P<arg>[^()]*)\)$").expect("postfix pattern is valid")
    })
}

/// Expands every `[[...]]` token in `text` against `person`.
///
/// A missing attribute resolves to an empty string (spec §4.G — distinct
/// from the comparator's `NVL` default, which only applies during rule
/// matching). A token whose path doesn't parse, or whose `:DATE(...)`
/// postfix can't be applied to the resolved value, is an
/// [`Error::InvalidToken`].
pub fn expand_tokens(text: &str, person: &PersonView) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut last_end = 0;
    for m in token_pattern().find_iter(text) {
        out.push_str(&text[last_end..m.start()]);
        let inner = &m.as_str()[2..m.as_str().len() - 2];
        out.push_str(&resolve_token(inner, person)?);
        last_end = m.end();
    }
    out.push_str(&text[last_end..]);
    Ok(out)
}

fn resolve_token(inner: &str, person: &PersonView) -> Result<String> {
    let (path, date_format) = split_date_postfix(inner)?;
    let value = resolve_path(path, person)?;

    match (value, date_format) {
        (None, _) => Ok(String::new()),
        (Some(raw), None) => Ok(raw.to_string()),
        (Some(raw), Some(format)) => {
            let date = NaiveDate::parse_from_str(raw, "%Y%m%d").map_err(|_| {
                Error::invalid_token(inner, format!("value {raw:?} is not a YYYYMMDD date"))
            })?;
            Ok(date.format(format).to_string())
        }
    }
}

/// Splits the optional `:DATE(<format>)` postfix off a token's path. Any
/// other `:IDENT(...)` postfix is rejected outright rather than falling
/// through to path resolution (spec §4.G).
fn split_date_postfix(inner: &str) -> Result<(&str, Option<&str>)> {
    let Some(caps) = postfix_pattern().captures(inner) else {
        return Ok((inner, None));
    };
    let kind = &caps["kind"];
    if kind != "DATE" {
        return Err(Error::invalid_token(inner, format!("unsupported postfix :{kind}(...), only :DATE(...) is valid")));
    }
    let path_range = caps.name("path").unwrap().range();
    let arg_range = caps.name("arg").unwrap().range();
    Ok((&inner[path_range], Some(&inner[arg_range])))
}

/// Resolves a `PERSON.<ATTR>` or `TARGET.<TARGET>.<ATTR>` path against
/// `person`. A well-formed path whose attribute is absent returns `Ok(None)`;
/// a malformed path is an [`Error::InvalidToken`].
fn resolve_path<'a>(path: &str, person: &'a PersonView) -> Result<Option<&'a str>> {
    let parts: Vec<&str> = path.split('.').collect();
    match parts.as_slice() {
        ["PERSON", attr] => Ok(person.person_attr(attr)),
        ["TARGET", target, attr] => Ok(person.target_attr(target, attr)),
        _ => Err(Error::invalid_token(path, "expected PERSON.<ATTR> or TARGET.<TARGET>.<ATTR>")),
    }
}

// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Tag expressions used by jobs to select groups and endpoints of a feed.
//!
//! An expression is a sequence of `key: value` or `key: (v1, v2, ...)`
//! pairs, e.g. `Scope: (EGI, Local), Monitored: Y`. Parenthesized pairs are
//! collected first as lists; bare `key: value` pairs are collected on a
//! second pass over the same string and override a list with the same key.

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

use crate::error::Error;

// Word characters are ASCII only.
const LIST_PAIR: &str = r"([A-Za-z0-9_]+)\s*:\s*(\(.*?\))";
const SCALAR_PAIR: &str = r"([A-Za-z0-9_]+)\s*:\s*([A-Za-z0-9_.\-]+)";
const PREFIXED_SECTION: &str = r"^(?:[A-Za-z0-9_]+?_)([A-Za-z0-9_]+)";

/// Value selected for a single tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
#[serde(untagged)]
pub enum TagValue
{
    /// `key: value`
    Single(String,),
    /// `key: (v1, v2)`
    List(Vec<String,>,),
}

impl TagValue
{
    /// Iterates the values regardless of shape.
    pub fn values(&self,) -> impl Iterator<Item = &str,>
    {
        let items: &[String] = match self {
            Self::Single(value,) => std::slice::from_ref(value,),
            Self::List(values,) => values,
        };
        items.iter().map(String::as_str,)
    }
}

/// Parsed tag expression in order of first appearance.
pub type TagMap = IndexMap<String, TagValue,>;

/// Parses a tag expression.
///
/// # Errors
///
/// Returns [`Error::TagParse`] when the string contains no pair matching
/// either form. Callers that treat a malformed filter as "select nothing
/// additional" log the error and fall back to an empty map.
///
/// # Examples
///
/// ```
/// use feed_connectors::{TagValue, parse_tags};
///
/// let tags = parse_tags("Scope: (ScopeA, ScopeB) , Monitored: 1",).unwrap();
/// assert_eq!(
///     tags["Scope"],
///     TagValue::List(vec!["ScopeA".to_owned(), "ScopeB".to_owned()])
/// );
/// assert_eq!(tags["Monitored"], TagValue::Single("1".to_owned()));
/// ```
pub fn parse_tags(raw: &str,) -> Result<TagMap, Error,>
{
    let lists = compile(LIST_PAIR,)?;
    let scalars = compile(SCALAR_PAIR,)?;
    let mut tags = TagMap::new();

    for captures in lists.captures_iter(raw,) {
        let items = captures[2]
            .split(',',)
            .map(|item| item.trim_matches(|ch| matches!(ch, '(' | ')' | ' '),).to_owned(),)
            .collect();
        tags.insert(captures[1].to_owned(), TagValue::List(items,),);
    }

    for captures in scalars.captures_iter(raw,) {
        tags.insert(captures[1].to_owned(), TagValue::Single(captures[2].to_owned(),),);
    }

    if tags.is_empty() {
        return Err(Error::TagParse {
            value: raw.to_owned(),
        },);
    }

    Ok(tags,)
}

/// Derives a directory name from a `PREFIX_Name` section name.
///
/// Returns `None` when the name carries no underscore-separated prefix.
///
/// # Examples
///
/// ```
/// use feed_connectors::section_to_dir;
///
/// assert_eq!(section_to_dir("JOB_Production").as_deref(), Some("Production"));
/// assert_eq!(section_to_dir("CUSTOMER_EGI_Critical").as_deref(), Some("EGI_Critical"));
/// assert_eq!(section_to_dir("Standalone"), None);
/// ```
pub fn section_to_dir(section: &str,) -> Option<String,>
{
    let pattern = compile(PREFIXED_SECTION,).ok()?;
    pattern.captures(section,).map(|captures| captures[1].to_owned(),)
}

fn compile(pattern: &str,) -> Result<Regex, Error,>
{
    Regex::new(pattern,).map_err(|e| Error::invalid_value("pattern", pattern, e.to_string(),),)
}

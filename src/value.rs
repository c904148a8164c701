// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Typed views over raw configuration strings.
//!
//! The configuration engine stores every value as the string found in the
//! file. Callers decode values at the point of use, and the truthiness rules
//! live here so that every switch is read the same way.

use serde::Serialize;

use crate::{connector::OptionKind, error::Error};

/// Decoded configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
#[serde(untagged)]
pub enum OptionValue
{
    /// Plain string, including paths.
    Text(String,),
    /// Comma separated list with blank items removed.
    List(Vec<String,>,),
    /// Boolean switch.
    Flag(bool,),
    /// Signed integer.
    Integer(i64,),
}

impl OptionValue
{
    /// Decodes `raw` according to `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] when a flag or integer cannot be
    /// interpreted.
    pub fn decode(key: &str, raw: &str, kind: OptionKind,) -> Result<Self, Error,>
    {
        Ok(match kind {
            OptionKind::Text | OptionKind::File | OptionKind::Directory => Self::Text(raw.to_owned(),),
            OptionKind::List => Self::List(split_list(raw,),),
            OptionKind::Flag => Self::Flag(parse_flag(key, raw,)?,),
            OptionKind::Integer => Self::Integer(raw.trim().parse().map_err(|_| {
                Error::invalid_value(key, raw, "expected an integer",)
            },)?,),
        },)
    }

    /// Returns the boolean when the value is a flag.
    pub fn as_flag(&self,) -> Option<bool,>
    {
        match self {
            Self::Flag(value,) => Some(*value,),
            _ => None,
        }
    }

    /// Returns the string when the value is textual.
    pub fn as_text(&self,) -> Option<&str,>
    {
        match self {
            Self::Text(value,) => Some(value.as_str(),),
            _ => None,
        }
    }

    /// Returns the integer when the value is numeric.
    pub fn as_integer(&self,) -> Option<i64,>
    {
        match self {
            Self::Integer(value,) => Some(*value,),
            _ => None,
        }
    }
}

/// Interprets a switch value.
///
/// `1`, `yes`, `true` and `on` are true; `0`, `no`, `false` and `off` are
/// false. Matching ignores case and surrounding whitespace.
///
/// # Errors
///
/// Returns [`Error::InvalidValue`] for anything else.
///
/// # Examples
///
/// ```
/// use feed_connectors::parse_flag;
///
/// assert!(parse_flag("generalpublishams", "True").unwrap());
/// assert!(!parse_flag("generalwriteavro", " off ").unwrap());
/// assert!(parse_flag("generalwriteavro", "maybe").is_err());
/// ```
pub fn parse_flag(key: &str, raw: &str,) -> Result<bool, Error,>
{
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Ok(true,),
        "0" | "no" | "false" | "off" => Ok(false,),
        _ => Err(Error::invalid_value(key, raw, "expected a boolean such as True or False",),),
    }
}

/// Splits a comma separated value, trimming items and dropping blanks.
pub fn split_list(raw: &str,) -> Vec<String,>
{
    raw.split(',',).map(str::trim,).filter(|item| !item.is_empty(),).map(str::to_owned,).collect()
}

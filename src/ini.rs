// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Reader for the section-based key/value files consumed by the connectors.
//!
//! The dialect matches the classic INI files deployed alongside the
//! connectors: `[Section]` headers, `key = value` or `key: value` pairs,
//! `#`/`;` comments, indented continuation lines (blank lines in between are
//! skipped, not value terminators), a `[DEFAULT]` section whose
//! values are visible from every other section, and `%(name)s` references
//! expanded on lookup. Option names are case-insensitive and stored
//! lowercased; section names keep their spelling.

use std::{
    fs,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{self, Error};

/// Name of the section whose options act as fallbacks for all sections.
const DEFAULT_SECTION: &str = "DEFAULT";
/// Maximum nesting of `%(name)s` references before expansion gives up.
const MAX_INTERPOLATION_DEPTH: usize = 10;

type Options = IndexMap<String, String,>;

/// Parsed configuration document preserving section order.
#[derive(Debug, Clone, Default,)]
pub struct IniDocument
{
    path:     PathBuf,
    defaults: Options,
    sections: IndexMap<String, Options,>,
}

impl IniDocument
{
    /// Reads and parses the document stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigNotFound`] when the file does not exist,
    /// [`Error::Io`] when it cannot be read and [`Error::Syntax`] when a line
    /// cannot be understood.
    pub fn load(path: &Path,) -> Result<Self, Error,>
    {
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            },);
        }

        debug!("Reading configuration from {}", path.display());
        let contents = fs::read_to_string(path,).map_err(|source| error::io_error(path, source,),)?;
        Self::parse(path, &contents,)
    }

    /// Parses `contents`, attributing diagnostics to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Syntax`] for options outside of any section, unclosed
    /// section headers and lines without a `=` or `:` separator.
    pub fn parse(path: &Path, contents: &str,) -> Result<Self, Error,>
    {
        let mut document = Self {
            path: path.to_path_buf(),
            ..Self::default()
        };
        let mut current: Option<String,> = None;
        let mut last_option: Option<String,> = None;

        for (index, raw,) in contents.lines().enumerate() {
            let line_number = index + 1;
            let line = raw.trim_end();
            let trimmed = line.trim_start();

            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('#',) || trimmed.starts_with(';',) {
                continue;
            }

            if line.starts_with(char::is_whitespace,)
                && let Some(option,) = last_option.as_deref()
            {
                let options = document.options_mut(current.as_deref(),);
                if let Some(value,) = options.get_mut(option,) {
                    if !value.is_empty() {
                        value.push('\n',);
                    }
                    value.push_str(strip_inline_comment(trimmed,),);
                }
                continue;
            }

            if let Some(header,) = trimmed.strip_prefix('[',) {
                let name = header.strip_suffix(']',).ok_or_else(|| {
                    document.syntax(line_number, format!("unterminated section header {trimmed:?}"),)
                },)?;
                let name = name.trim().to_owned();
                if name != DEFAULT_SECTION {
                    document.sections.entry(name.clone(),).or_default();
                }
                current = Some(name,);
                last_option = None;
                continue;
            }

            if current.is_none() {
                return Err(document.syntax(
                    line_number,
                    format!("option outside of any section: {trimmed:?}"),
                ),);
            }

            let (key, value,) = split_option(trimmed,)
                .ok_or_else(|| document.syntax(line_number, format!("expected `key = value`, got {trimmed:?}"),),)?;
            let key = key.to_lowercase();
            document.options_mut(current.as_deref(),).insert(key.clone(), value.to_owned(),);
            last_option = Some(key,);
        }

        Ok(document,)
    }

    /// Location the document was read from.
    pub fn path(&self,) -> &Path
    {
        &self.path
    }

    /// Section names in file order, excluding `[DEFAULT]`.
    pub fn sections(&self,) -> impl Iterator<Item = &str,>
    {
        self.sections.keys().map(String::as_str,)
    }

    /// Returns `true` when a section with exactly this name exists.
    pub fn has_section(&self, section: &str,) -> bool
    {
        self.sections.contains_key(section,)
    }

    /// Returns `true` when the option resolves in `section`, including
    /// fallbacks from `[DEFAULT]`.
    pub fn has_option(&self, section: &str, option: &str,) -> bool
    {
        self.raw(section, option,).is_some()
    }

    /// Looks up an option and expands `%(name)s` references.
    ///
    /// Returns `Ok(None)` when the section or option is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Interpolation`] when a reference cannot be expanded.
    pub fn get(&self, section: &str, option: &str,) -> Result<Option<String,>, Error,>
    {
        match self.raw(section, option,) {
            Some(raw,) => self.interpolate(section, option, raw, 1,).map(Some,),
            None => Ok(None,),
        }
    }

    /// Looks up an option that must be present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingOption`] when the option is absent, or the
    /// errors of [`get`](Self::get).
    pub fn require(&self, section: &str, option: &str,) -> Result<String, Error,>
    {
        self.get(section, option,)?.ok_or_else(|| Error::missing_option(section, option,),)
    }

    fn raw(&self, section: &str, option: &str,) -> Option<&str,>
    {
        let options = self.sections.get(section,)?;
        let key = option.to_lowercase();
        options.get(&key,).or_else(|| self.defaults.get(&key,),).map(String::as_str,)
    }

    fn interpolate(
        &self,
        section: &str,
        option: &str,
        raw: &str,
        depth: usize,
    ) -> Result<String, Error,>
    {
        let failure = |message: String| Error::Interpolation {
            section: section.to_owned(),
            option: option.to_owned(),
            message,
        };

        if depth > MAX_INTERPOLATION_DEPTH {
            return Err(failure(format!(
                "references nest deeper than {MAX_INTERPOLATION_DEPTH} levels"
            ),),);
        }

        let mut expanded = String::with_capacity(raw.len(),);
        let mut rest = raw;
        while let Some(position,) = rest.find('%',) {
            expanded.push_str(&rest[..position],);
            let tail = &rest[position..];
            if let Some(after,) = tail.strip_prefix("%%",) {
                expanded.push('%',);
                rest = after;
            } else if let Some(reference,) = tail.strip_prefix("%(",) {
                let close = reference
                    .find(")s",)
                    .ok_or_else(|| failure(format!("unterminated reference in {raw:?}"),),)?;
                let name = &reference[..close];
                let target = self
                    .raw(section, name,)
                    .ok_or_else(|| failure(format!("bad reference %({name})s"),),)?;
                expanded.push_str(&self.interpolate(section, option, target, depth + 1,)?,);
                rest = &reference[close + 2..];
            } else {
                expanded.push('%',);
                rest = &tail[1..];
            }
        }
        expanded.push_str(rest,);

        Ok(expanded,)
    }

    fn options_mut(&mut self, section: Option<&str,>,) -> &mut Options
    {
        match section {
            Some(name,) if name != DEFAULT_SECTION => self.sections.entry(name.to_owned(),).or_default(),
            _ => &mut self.defaults,
        }
    }

    fn syntax(&self, line: usize, message: String,) -> Error
    {
        Error::Syntax {
            path: self.path.clone(),
            line,
            message,
        }
    }
}

/// Splits `key = value` / `key: value` at whichever separator comes first.
fn split_option(line: &str,) -> Option<(&str, &str,),>
{
    let position = line.find(['=', ':',],)?;
    let key = line[..position].trim();
    if key.is_empty() {
        return None;
    }
    let value = strip_inline_comment(line[position + 1..].trim(),);
    Some((key, value,),)
}

/// Drops a trailing ` ; comment` from a value.
fn strip_inline_comment(value: &str,) -> &str
{
    let bytes = value.as_bytes();
    for (index, byte,) in bytes.iter().enumerate() {
        if *byte == b';' && index > 0 && bytes[index - 1].is_ascii_whitespace() {
            return value[..index].trim_end();
        }
    }
    value
}

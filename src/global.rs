// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Global configuration shared by every job of a connector run.
//!
//! The global file is validated against the schema of the invoking connector
//! and flattened into a map keyed by the lowercased concatenation of section
//! and option names (`[InputState] SaveDir` becomes `inputstatesavedir`).
//! Validation is strict: any missing required option, missing output date
//! placeholder or disabled output aborts the run.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    connector::{self, Connector, OptionKind, OptionSpec, SectionSchema},
    error::Error,
    ini::IniDocument,
    value::{OptionValue, parse_flag},
};

/// Default location of the global configuration file.
pub const DEFAULT_GLOBAL_CONF: &str = "/etc/argo-egi-connectors/global.conf";
/// Placeholder every output filename template must contain.
pub const DATE_PLACEHOLDER: &str = "DATE";

/// Flattened option map keyed by lowercased `section+option`.
pub type OptionMap = IndexMap<String, String,>;

/// Builder configuring how a global configuration file is parsed.
#[derive(Debug, Clone,)]
pub struct GlobalConfigBuilder
{
    path:        PathBuf,
    connector:   Option<Connector,>,
    check_paths: bool,
}

impl GlobalConfigBuilder
{
    /// Selects the connector whose schema is enforced. Without a connector
    /// only the shared base schema applies.
    pub fn connector(mut self, connector: Option<Connector,>,) -> Self
    {
        self.connector = connector;
        self
    }

    /// Requires path-valued options to exist on disk.
    pub fn check_paths(mut self, check_paths: bool,) -> Self
    {
        self.check_paths = check_paths;
        self
    }

    /// Reads and validates the configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigNotFound`] when the file is absent,
    /// [`Error::MissingSection`] or [`Error::MissingOption`] when the schema
    /// is not satisfied, [`Error::PathNotFound`] when path checking is enabled
    /// and a path is absent, [`Error::MissingDatePlaceholder`] for output
    /// templates without `DATE`, and [`Error::NoActiveOutput`] when every
    /// general switch is off.
    pub fn parse(self,) -> Result<GlobalConfig, Error,>
    {
        let document = IniDocument::load(&self.path,)?;
        self.parse_document(&document,)
    }

    /// Validates an already parsed document.
    ///
    /// # Errors
    ///
    /// Same as [`parse`](Self::parse), minus file access errors.
    pub fn parse_document(self, document: &IniDocument,) -> Result<GlobalConfig, Error,>
    {
        let schema = connector::schema_for(self.connector,);
        let mut options = OptionMap::new();

        for section in schema {
            let prefix = section.key_prefix();
            let defined = document.sections().any(|name| name.to_lowercase() == prefix,);
            if !defined && !section.optional {
                return Err(Error::MissingSection {
                    path:    document.path().to_path_buf(),
                    section: section.name.to_owned(),
                },);
            }

            let matching: Vec<&str,> =
                document.sections().filter(|name| name.to_lowercase().starts_with(&prefix,),).collect();

            for option in section.options {
                for name in &matching {
                    let Some(value,) = document.get(name, option.name,)? else {
                        // absent switches count as off; ensure_active_output decides
                        if section.optional || section.name == connector::GENERAL.name {
                            continue;
                        }
                        return Err(Error::missing_option(*name, option.name,),);
                    };

                    let key = section.key(option,);
                    self.validate(name, option, &key, &value,)?;
                    debug!("Resolved {} from section {}", key, name);
                    options.insert(key, value,);
                }
            }
        }

        let config = GlobalConfig {
            path: self.path,
            connector: self.connector,
            schema,
            options,
        };
        config.ensure_active_output()?;

        info!(
            "Loaded {} options from {} for {}",
            config.options.len(),
            config.path.display(),
            config.connector.map_or("shared schema", Connector::as_str,)
        );

        Ok(config,)
    }

    fn validate(&self, section: &str, option: &OptionSpec, key: &str, value: &str,) -> Result<(), Error,>
    {
        if self.check_paths && option.kind.is_path() {
            let path = Path::new(value,);
            let present = match option.kind {
                OptionKind::Directory => path.is_dir(),
                _ => path.is_file(),
            };
            if !present {
                return Err(Error::PathNotFound {
                    option: key.to_owned(),
                    path:   path.to_path_buf(),
                },);
            }
        }

        if section.to_lowercase().contains("output",) && !value.contains(DATE_PLACEHOLDER,) {
            return Err(Error::MissingDatePlaceholder {
                section: section.to_owned(),
                option:  option.name.to_owned(),
                value:   value.to_owned(),
            },);
        }

        Ok((),)
    }
}

/// Outcome of comparing an option map against the options a section declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct Completeness
{
    /// `true` when the keys match the declared set exactly.
    pub complete:   bool,
    /// Keys present on only one side.
    pub mismatched: BTreeSet<String,>,
}

/// Validated, read-only view of the global configuration.
#[derive(Debug, Clone,)]
pub struct GlobalConfig
{
    path:      PathBuf,
    connector: Option<Connector,>,
    schema:    &'static [SectionSchema],
    options:   OptionMap,
}

impl GlobalConfig
{
    /// Starts configuring a parse of the file at `path`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use feed_connectors::{Connector, GlobalConfig};
    ///
    /// # fn example() -> Result<(), feed_connectors::Error> {
    /// let global = GlobalConfig::builder("/etc/argo-egi-connectors/global.conf",)
    ///     .connector(Some(Connector::Topology,),)
    ///     .parse()?;
    /// println!("{:?}", global.get("InputState", "SaveDir"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder<P,>(path: P,) -> GlobalConfigBuilder
    where
        P: Into<PathBuf,>,
    {
        GlobalConfigBuilder {
            path: path.into(), connector: None, check_paths: false,
        }
    }

    /// Parses `path` against the schema of `connector` without path checks.
    ///
    /// # Errors
    ///
    /// See [`GlobalConfigBuilder::parse`].
    pub fn parse(path: &Path, connector: Option<Connector,>,) -> Result<Self, Error,>
    {
        Self::builder(path,).connector(connector,).parse()
    }

    /// Location the configuration was read from.
    pub fn path(&self,) -> &Path
    {
        &self.path
    }

    /// Connector whose schema was enforced.
    pub fn connector(&self,) -> Option<Connector,>
    {
        self.connector
    }

    /// Flattened option map.
    pub fn options(&self,) -> &OptionMap
    {
        &self.options
    }

    /// Raw value of `section`/`option`, matched case-insensitively.
    pub fn get(&self, section: &str, option: &str,) -> Option<&str,>
    {
        self.options.get(&format!("{section}{option}").to_lowercase(),).map(String::as_str,)
    }

    /// Decodes `section`/`option` according to its declared kind. Options the
    /// schema does not declare decode as text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] when the value does not fit its kind.
    pub fn value(&self, section: &str, option: &str,) -> Result<Option<OptionValue,>, Error,>
    {
        let key = format!("{section}{option}").to_lowercase();
        let Some(raw,) = self.options.get(&key,) else {
            return Ok(None,);
        };
        let kind = self
            .section_schema(section,)
            .and_then(|schema| schema.option(option,),)
            .map_or(OptionKind::Text, |spec| spec.kind,);
        OptionValue::decode(&key, raw, kind,).map(Some,)
    }

    /// Overlays per-customer overrides on the global options of a section.
    ///
    /// Every global option whose key starts with `section` is copied unless
    /// `overrides` already holds it; customer values win.
    pub fn merge_options(&self, overrides: &OptionMap, section: &str,) -> OptionMap
    {
        let prefix = section.to_lowercase();
        let mut merged = overrides.clone();
        for (key, value,) in &self.options {
            if key.starts_with(&prefix,) && !merged.contains_key(key,) {
                merged.insert(key.clone(), value.clone(),);
            }
        }
        merged
    }

    /// Compares the keys of `options` with every option the schema declares
    /// for `section`. Never fails; the mismatched keys are diagnostic data.
    pub fn is_complete(&self, options: &OptionMap, section: &str,) -> Completeness
    {
        let expected: BTreeSet<String,> = self
            .section_schema(section,)
            .map(|schema| schema.options.iter().map(|option| schema.key(option,),).collect(),)
            .unwrap_or_default();
        let present: BTreeSet<String,> = options.keys().cloned().collect();
        let mismatched: BTreeSet<String,> = expected.symmetric_difference(&present,).cloned().collect();

        Completeness {
            complete: mismatched.is_empty(),
            mismatched,
        }
    }

    fn section_schema(&self, section: &str,) -> Option<&'static SectionSchema,>
    {
        self.schema.iter().find(|schema| schema.name.eq_ignore_ascii_case(section,),)
    }

    fn ensure_active_output(&self,) -> Result<(), Error,>
    {
        let general = connector::GENERAL;
        let keys: Vec<String,> = general.options.iter().map(|option| general.key(option,),).collect();

        let mut active = false;
        for key in &keys {
            if let Some(raw,) = self.options.get(key,) {
                active |= parse_flag(key, raw,)?;
            }
        }

        if active {
            Ok((),)
        } else {
            Err(Error::NoActiveOutput {
                options: keys.join(", ",),
            },)
        }
    }
}

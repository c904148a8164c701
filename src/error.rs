#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared by the configuration engine and CLI."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint. The lint is disabled for
//! the module to keep the generated implementations warning-free.
//!
//! Every variant except [`Error::TagParse`] is fatal for a connector run: the
//! binary logs it and exits with a non-zero status. Tag parse failures are
//! recovered by the customer accessors, which fall back to an empty filter.

use std::path::{Path, PathBuf};

/// Unified error type returned by the configuration engine and CLI.
#[derive(Debug, masterror::Error)]
pub enum Error {
    /// The configuration file does not exist.
    #[error("could not find configuration file {path:?}")]
    ConfigNotFound {
        /// Location that was probed.
        path: PathBuf
    },
    /// Wraps I/O errors that occur while reading configuration files.
    #[error("failed to read configuration from {path:?}: {source}")]
    Io {
        /// Location of the configuration file.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// A line of the configuration file could not be understood.
    #[error("{path:?}:{line}: {message}")]
    Syntax {
        /// Location of the configuration file.
        path:    PathBuf,
        /// One-based line number of the offending line.
        line:    usize,
        /// Description of the problem.
        message: String
    },
    /// A `%(name)s` reference could not be expanded.
    #[error("cannot interpolate option {option} in section {section}: {message}")]
    Interpolation {
        /// Section holding the option.
        section: String,
        /// Option whose value failed to expand.
        option:  String,
        /// Description of the problem.
        message: String
    },
    /// A required section is absent from the configuration file.
    #[error("section {section} not defined in {path:?}")]
    MissingSection {
        /// Location of the configuration file.
        path:    PathBuf,
        /// Name of the missing section.
        section: String
    },
    /// A required option is absent from a section.
    #[error("no option {option} in section {section}")]
    MissingOption {
        /// Section that was expected to hold the option.
        section: String,
        /// Name of the missing option.
        option:  String
    },
    /// A path-valued option points at nothing on disk.
    #[error("no such file or directory {path:?} for option {option}")]
    PathNotFound {
        /// Lowercased `section+option` key.
        option: String,
        /// Configured path.
        path:   PathBuf
    },
    /// An output filename template lacks the `DATE` placeholder.
    #[error("no DATE placeholder in {section}.{option}: {value}")]
    MissingDatePlaceholder {
        /// Section holding the option.
        section: String,
        /// Option name.
        option:  String,
        /// Configured value.
        value:   String
    },
    /// None of the general output switches is enabled.
    #[error("at least one of {options} needs to be True")]
    NoActiveOutput {
        /// Comma separated list of the switches that were checked.
        options: String
    },
    /// A value could not be decoded into the kind its schema declares.
    #[error("invalid value {value:?} for {key}: {message}")]
    InvalidValue {
        /// Lowercased option or attribute key.
        key:     String,
        /// Raw configured value.
        value:   String,
        /// Description of the expected shape.
        message: String
    },
    /// A customer identifier does not name a parsed customer section.
    #[error("could not get jobs for customer {customer}")]
    UnknownCustomer {
        /// Requested customer section name.
        customer: String
    },
    /// A job referenced by a customer has no section of its own.
    #[error("could not find job {job} for customer {customer}")]
    UnknownJob {
        /// Referenced job section name.
        job:      String,
        /// Customer that referenced the job.
        customer: String
    },
    /// A tag expression matched neither grammar pattern.
    #[error("could not parse tag expression {value:?}")]
    TagParse {
        /// Raw tag expression.
        value: String
    },
    /// A directory of the output or state layout could not be created.
    #[error("failed to create directory {path:?}: {source}")]
    DirectoryCreate {
        /// Directory that could not be created.
        path:   PathBuf,
        /// Underlying I/O error reported by the operating system.
        source: std::io::Error
    },
    /// Wraps serialization errors when writing the resolved plan.
    #[error("failed to serialize run plan: {source}")]
    Serialize {
        /// Underlying serialization error.
        source: serde_json::Error
    }
}

impl Error {
    /// Constructs a [`Error::MissingOption`] from section and option names.
    pub fn missing_option<S, O>(section: S, option: O) -> Self
    where
        S: Into<String>,
        O: Into<String>
    {
        Self::MissingOption {
            section: section.into(),
            option:  option.into()
        }
    }

    /// Constructs a [`Error::InvalidValue`] for a key and its raw value.
    ///
    /// # Parameters
    ///
    /// * `key` - Lowercased option or attribute key.
    /// * `value` - Raw configured value.
    /// * `message` - Human-readable description of the expected shape.
    pub fn invalid_value<K, V, M>(key: K, value: V, message: M) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        M: Into<String>
    {
        Self::InvalidValue {
            key:     key.into(),
            value:   value.into(),
            message: message.into()
        }
    }

    /// Formats the error for diagnostics without the variant name.
    ///
    /// The returned string matches the [`std::fmt::Display`] implementation.
    pub fn to_display_string(&self) -> String {
        format!("{self}")
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialize {
            source
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the configuration file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source
    }
}

/// Creates an [`Error::DirectoryCreate`] variant for a layout directory.
pub fn directory_error(path: &Path, source: std::io::Error) -> Error {
    Error::DirectoryCreate {
        path: path.to_path_buf(),
        source
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn missing_option_constructor_populates_fields() {
        let error = Error::missing_option("General", "PublishAms");
        match error {
            Error::MissingOption {
                ref section,
                ref option
            } => {
                assert_eq!(section, "General");
                assert_eq!(option, "PublishAms");
            }
            other => panic!("expected missing option error, got {other:?}")
        }
    }

    #[test]
    fn to_display_string_matches_display() {
        let error = Error::invalid_value("generalwriteavro", "maybe", "expected a boolean");
        assert_eq!(error.to_string(), error.to_display_string());
        assert!(error.to_string().contains("generalwriteavro"));
    }

    #[test]
    fn io_error_helper_wraps_path_and_source() {
        let path = std::path::Path::new("/tmp/global.conf");
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error = super::io_error(path, io_error);

        match error {
            Error::Io {
                path: ref stored_path,
                ref source
            } => {
                assert_eq!(stored_path, path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected io error, got {other:?}")
        }
    }

    #[test]
    fn directory_error_helper_wraps_path_and_source() {
        let path = std::path::Path::new("/var/lib/connectors/EGI");
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = super::directory_error(path, io_error);

        match error {
            Error::DirectoryCreate {
                path: ref stored_path,
                ref source
            } => {
                assert_eq!(stored_path, path);
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
            }
            other => panic!("expected directory error, got {other:?}")
        }
    }

    #[test]
    fn serde_json_conversion_maps_to_serialize_variant() {
        let invalid = serde_json::from_str::<serde_json::Value>("not-json").unwrap_err();
        let mapped: Error = invalid.into();
        assert!(matches!(mapped, Error::Serialize { .. }));
    }

    #[test]
    fn no_active_output_lists_checked_switches() {
        let error = Error::NoActiveOutput {
            options: "generalpublishams, generalwriteavro".to_owned()
        };
        assert_eq!(
            error.to_string(),
            "at least one of generalpublishams, generalwriteavro needs to be True"
        );
    }
}

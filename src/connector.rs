// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Connector identities and the option schemas they require.
//!
//! Every connector shares a base schema (messaging, general switches,
//! authentication, connection tuning and state retention) and adds its own
//! Avro schema and output sections. The messaging and authentication sections
//! are optional as a whole: deployments that never publish or never speak
//! TLS may omit them entirely.

use std::fmt;

use serde::Serialize;

/// How a configured option value is meant to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize,)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind
{
    /// Free-form string.
    Text,
    /// Boolean switch such as `True` or `off`.
    Flag,
    /// Signed integer.
    Integer,
    /// Comma separated list.
    List,
    /// Path to a regular file.
    File,
    /// Path to a directory.
    Directory,
}

impl OptionKind
{
    /// Returns `true` for kinds that name something on disk.
    pub fn is_path(self,) -> bool
    {
        matches!(self, Self::File | Self::Directory)
    }
}

/// Declaration of a single option inside a schema section.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct OptionSpec
{
    /// Option name as spelled in the configuration file.
    pub name: &'static str,
    /// Interpretation of the value.
    pub kind: OptionKind,
}

/// Declaration of a configuration section and its options.
#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub struct SectionSchema
{
    /// Section name; configuration sections match it as a case-insensitive
    /// prefix.
    pub name:     &'static str,
    /// Options that must be present unless `optional` is set.
    pub options:  &'static [OptionSpec],
    /// Whether the section, and every option in it, may be omitted.
    pub optional: bool,
}

impl SectionSchema
{
    /// Lowercased section name used as key prefix in the resolved map.
    pub fn key_prefix(&self,) -> String
    {
        self.name.to_lowercase()
    }

    /// Lowercased `section+option` key of an option.
    pub fn key(&self, option: &OptionSpec,) -> String
    {
        format!("{}{}", self.name, option.name).to_lowercase()
    }

    /// Looks up an option declaration by case-insensitive name.
    pub fn option(&self, name: &str,) -> Option<&OptionSpec,>
    {
        self.options.iter().find(|spec| spec.name.eq_ignore_ascii_case(name,),)
    }
}

const fn text(name: &'static str,) -> OptionSpec
{
    OptionSpec {
        name,
        kind: OptionKind::Text,
    }
}

const fn flag(name: &'static str,) -> OptionSpec
{
    OptionSpec {
        name,
        kind: OptionKind::Flag,
    }
}

const fn integer(name: &'static str,) -> OptionSpec
{
    OptionSpec {
        name,
        kind: OptionKind::Integer,
    }
}

const fn file(name: &'static str,) -> OptionSpec
{
    OptionSpec {
        name,
        kind: OptionKind::File,
    }
}

const fn directory(name: &'static str,) -> OptionSpec
{
    OptionSpec {
        name,
        kind: OptionKind::Directory,
    }
}

/// Messaging service used to publish results; optional as a whole.
pub const AMS: SectionSchema = SectionSchema {
    name:     "AMS",
    options:  &[
        text("Host",),
        text("Token",),
        text("Project",),
        text("Topic",),
        integer("Bulk",),
        flag("PackSingleMsg",),
    ],
    optional: true,
};

/// Output switches; at least one of them must be enabled.
pub const GENERAL: SectionSchema = SectionSchema {
    name:     "General",
    options:  &[flag("PublishAms",), flag("WriteAvro",),],
    optional: false,
};

/// TLS material and HTTP credentials for fetching feeds; optional as a whole.
pub const AUTHENTICATION: SectionSchema = SectionSchema {
    name:     "Authentication",
    options:  &[
        file("HostKey",),
        file("HostCert",),
        directory("CAPath",),
        file("CAFile",),
        flag("VerifyServerCert",),
        flag("UsePlainHttpAuth",),
        text("HttpUser",),
        text("HttpPass",),
    ],
    optional: true,
};

/// Timeouts and retry policy of feed requests.
pub const CONNECTION: SectionSchema = SectionSchema {
    name:     "Connection",
    options:  &[integer("Timeout",), integer("Retry",), integer("SleepRetry",),],
    optional: false,
};

/// Root of the per-job state directories and how many days to keep.
pub const INPUT_STATE: SectionSchema = SectionSchema {
    name:     "InputState",
    options:  &[text("SaveDir",), integer("Days",),],
    optional: false,
};

const SHARED: &[SectionSchema] = &[AMS, GENERAL, AUTHENTICATION, CONNECTION, INPUT_STATE,];

const TOPOLOGY: &[SectionSchema] = &[
    AMS,
    GENERAL,
    AUTHENTICATION,
    CONNECTION,
    INPUT_STATE,
    SectionSchema {
        name:     "AvroSchemas",
        options:  &[file("TopologyGroupOfEndpoints",), file("TopologyGroupOfGroups",),],
        optional: false,
    },
    SectionSchema {
        name:     "Output",
        options:  &[text("TopologyGroupOfEndpoints",), text("TopologyGroupOfGroups",),],
        optional: false,
    },
];

const DOWNTIMES: &[SectionSchema] = &[
    AMS,
    GENERAL,
    AUTHENTICATION,
    CONNECTION,
    INPUT_STATE,
    SectionSchema {
        name: "AvroSchemas", options: &[file("Downtimes",),], optional: false,
    },
    SectionSchema {
        name: "Output", options: &[text("Downtimes",),], optional: false,
    },
];

const WEIGHTS: &[SectionSchema] = &[
    AMS,
    GENERAL,
    AUTHENTICATION,
    CONNECTION,
    INPUT_STATE,
    SectionSchema {
        name: "AvroSchemas", options: &[file("Weights",),], optional: false,
    },
    SectionSchema {
        name: "Output", options: &[text("Weights",),], optional: false,
    },
];

const POEM: &[SectionSchema] = &[
    AMS,
    GENERAL,
    AUTHENTICATION,
    CONNECTION,
    INPUT_STATE,
    SectionSchema {
        name: "AvroSchemas", options: &[file("Poem",),], optional: false,
    },
    SectionSchema {
        name: "Output", options: &[text("Poem",),], optional: false,
    },
];

/// Schema used when no connector is named: the shared base only.
pub fn shared_schema() -> &'static [SectionSchema]
{
    SHARED
}

/// Resolves the schema for an optional connector.
pub fn schema_for(connector: Option<Connector,>,) -> &'static [SectionSchema]
{
    connector.map_or(SHARED, Connector::schema,)
}

/// Job attribute declarations consumed by the customer configuration parser.
///
/// Required attributes abort parsing when absent; optional attributes are
/// copied when present and skipped otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct JobSchema
{
    /// Attributes every job section must define.
    pub required: Vec<String,>,
    /// Attributes copied when present.
    pub optional: Vec<String,>,
}

impl JobSchema
{
    /// Builds a schema from borrowed attribute names.
    pub fn new(required: &[&str], optional: &[&str],) -> Self
    {
        Self {
            required: required.iter().map(|name| (*name).to_owned(),).collect(),
            optional: optional.iter().map(|name| (*name).to_owned(),).collect(),
        }
    }
}

/// Connector run modes, each pulling one kind of feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum,)]
#[serde(rename_all = "snake_case")]
pub enum Connector
{
    /// Service topology (group-of-groups and group-of-endpoints).
    Topology,
    /// Scheduled downtimes.
    Downtimes,
    /// Site weights.
    Weights,
    /// Metric profiles served by a POEM instance.
    Poem,
}

impl Connector
{
    /// Every connector, in declaration order.
    pub const ALL: [Self; 4] = [Self::Topology, Self::Downtimes, Self::Weights, Self::Poem,];

    /// Identifies the connector from a program name such as
    /// `topology-gocdb-connector` by substring.
    ///
    /// # Examples
    ///
    /// ```
    /// use feed_connectors::Connector;
    ///
    /// assert_eq!(
    ///     Connector::from_program("/usr/libexec/topology-eosc-connector.py"),
    ///     Some(Connector::Topology)
    /// );
    /// assert_eq!(Connector::from_program("prune-state"), None);
    /// ```
    pub fn from_program(program: &str,) -> Option<Self,>
    {
        let name = program.rsplit('/',).next().unwrap_or(program,).to_lowercase();
        Self::ALL.into_iter().find(|connector| name.contains(connector.as_str(),),)
    }

    /// Lowercase identifier of the connector.
    pub fn as_str(self,) -> &'static str
    {
        match self {
            Self::Topology => "topology",
            Self::Downtimes => "downtimes",
            Self::Weights => "weights",
            Self::Poem => "poem",
        }
    }

    /// Global configuration schema: shared base plus connector sections.
    pub fn schema(self,) -> &'static [SectionSchema]
    {
        match self {
            Self::Topology => TOPOLOGY,
            Self::Downtimes => DOWNTIMES,
            Self::Weights => WEIGHTS,
            Self::Poem => POEM,
        }
    }

    /// Job attributes this connector reads from the customer configuration.
    pub fn job_schema(self,) -> JobSchema
    {
        match self {
            Self::Topology => JobSchema::new(
                &[],
                &[
                    "TopoFetchType",
                    "TopoSelectGroupOfGroups",
                    "TopoSelectGroupOfEndpoints",
                    "TopoFeed",
                    "TopoFeedPaging",
                ],
            ),
            Self::Downtimes => JobSchema::new(&[], &["DowntimesFeed",],),
            Self::Weights => JobSchema::new(&[], &["WeightsFeed",],),
            Self::Poem => JobSchema::new(&["PoemServerHost", "PoemServerVO",], &["PoemNamespace",],),
        }
    }

    /// Job attribute naming the feed this connector fetches, if it uses one.
    pub fn feed_attribute(self,) -> Option<&'static str,>
    {
        match self {
            Self::Topology => Some("TopoFeed",),
            Self::Downtimes => Some("DowntimesFeed",),
            Self::Weights => Some("WeightsFeed",),
            Self::Poem => None,
        }
    }
}

impl fmt::Display for Connector
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        f.write_str(self.as_str(),)
    }
}

#[cfg(test)]
mod tests
{
    use super::{Connector, OptionKind, schema_for, shared_schema};

    #[test]
    fn program_names_resolve_by_substring()
    {
        assert_eq!(Connector::from_program("topology-gocdb-connector.py"), Some(Connector::Topology));
        assert_eq!(Connector::from_program("downtimes-gocdb-connector"), Some(Connector::Downtimes));
        assert_eq!(Connector::from_program("/bin/weights-vapor-connector.py"), Some(Connector::Weights));
        assert_eq!(Connector::from_program("POEM-connector"), Some(Connector::Poem));
        assert_eq!(Connector::from_program("unrelated"), None);
    }

    #[test]
    fn connector_schema_extends_shared_base()
    {
        for connector in Connector::ALL {
            let schema = connector.schema();
            for shared in shared_schema() {
                assert!(schema.contains(shared), "{connector} lacks {}", shared.name);
            }
            assert!(schema.iter().any(|section| section.name == "Output"));
            assert!(schema.iter().any(|section| section.name == "AvroSchemas"));
        }
    }

    #[test]
    fn unknown_connector_falls_back_to_shared_schema()
    {
        assert_eq!(schema_for(None), shared_schema());
        assert!(!shared_schema().iter().any(|section| section.name == "Output"));
    }

    #[test]
    fn section_keys_are_lowercased()
    {
        let schema = Connector::Topology.schema();
        let auth =
            schema.iter().find(|section| section.name == "Authentication",).expect("auth section",);
        let ca_path = auth.option("capath",).expect("CAPath declared",);
        assert_eq!(auth.key(ca_path), "authenticationcapath");
        assert_eq!(ca_path.kind, OptionKind::Directory);
        assert!(ca_path.kind.is_path());
        assert_eq!(auth.key_prefix(), "authentication");
    }

    #[test]
    fn only_poem_requires_job_attributes()
    {
        for connector in Connector::ALL {
            let jobs = connector.job_schema();
            assert_eq!(jobs.required.is_empty(), connector != Connector::Poem);
        }
        assert_eq!(Connector::Poem.feed_attribute(), None);
        assert_eq!(Connector::Topology.feed_attribute(), Some("TopoFeed"));
    }
}

//! Configuration resolution for topology, downtime, weight and POEM
//! connectors.
//!
//! A connector run reads two files: a global configuration validated against
//! the schema of the connector, and a customer configuration describing
//! tenants and their jobs. The library parses both, derives the directory
//! layout, groups jobs by the feed they consume and exposes the resolved
//! parameters as a read-only [`RunPlan`]. Fetching feeds and writing output
//! are left to the caller.

mod connector;
mod customer;
mod error;
mod feeds;
mod global;
mod ini;
mod plan;
mod tags;
mod value;

pub use connector::{Connector, JobSchema, OptionKind, OptionSpec, SectionSchema, schema_for, shared_schema};
pub use customer::{
    Customer, CustomerConfig, CustomerConfigBuilder, DEFAULT_CUSTOMER_CONF, DEFAULT_TOPOLOGY_FEED, Job,
};
pub use error::{Error, directory_error, io_error};
pub use feeds::{FeedMap, Subscriber, is_remote_feed};
pub use global::{
    Completeness, DATE_PLACEHOLDER, DEFAULT_GLOBAL_CONF, GlobalConfig, GlobalConfigBuilder, OptionMap,
};
pub use ini::IniDocument;
pub use plan::{FeedPlan, JobPlan, RunPlan};
pub use tags::{TagMap, TagValue, parse_tags, section_to_dir};
pub use value::{OptionValue, parse_flag, split_list};

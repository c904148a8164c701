// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Customer configuration: tenants (`CUSTOMER_*` sections) and their jobs.
//!
//! Each customer lists the job sections it owns. Jobs carry a profile list, a
//! directory name and whatever attributes the running connector declares
//! through its [`JobSchema`]. Once parsed the structure is read-only; the
//! query methods resolve directories, credentials and tag filters for a run.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    connector::{Connector, JobSchema},
    error::{self, Error},
    global::OptionMap,
    ini::IniDocument,
    tags::{TagMap, parse_tags, section_to_dir},
    value::{parse_flag, split_list},
};

/// Default location of the customer configuration file.
pub const DEFAULT_CUSTOMER_CONF: &str = "/etc/argo-egi-connectors/customer.conf";
/// Feed used by topology jobs that do not declare one.
pub const DEFAULT_TOPOLOGY_FEED: &str = "https://goc.egi.eu/gocdbpi/";

const CUSTOMER_PREFIX: &str = "customer_";
const AMS_PREFIX: &str = "ams";
const AUTH_PREFIX: &str = "authentication";
/// Credential overrides a customer section may carry.
const CUSTOMER_OPTIONAL: [&str; 8] = [
    "AmsHost",
    "AmsProject",
    "AmsToken",
    "AmsTopic",
    "AmsPackSingleMsg",
    "AuthenticationUsePlainHttpAuth",
    "AuthenticationHttpUser",
    "AuthenticationHttpPass",
];

/// Parsed `CUSTOMER_*` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct Customer
{
    /// Display name, also used for state directories.
    pub name:       String,
    /// Output directory; `None` (absent or blank) derives it from the section
    /// name.
    pub output_dir: Option<String,>,
    /// Job section names in declaration order.
    pub jobs:       Vec<String,>,
    /// Messaging overrides keyed like the global options (`amstoken`).
    pub ams:        OptionMap,
    /// HTTP authentication overrides (`authenticationhttpuser`).
    pub auth:       OptionMap,
    /// Extra attributes requested by the caller, keyed lowercased.
    pub attributes: OptionMap,
}

/// Parsed job section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct Job
{
    /// Raw comma separated profile list.
    pub profiles:   String,
    /// Directory name; `None` (absent or blank) derives it from the section
    /// name.
    pub dirname:    Option<String,>,
    /// Connector attributes keyed lowercased.
    pub attributes: OptionMap,
}

impl Job
{
    /// Case-insensitive attribute lookup.
    pub fn attribute(&self, name: &str,) -> Option<&str,>
    {
        self.attributes.get(&name.to_lowercase(),).map(String::as_str,)
    }
}

/// Builder configuring how a customer configuration file is parsed.
#[derive(Debug, Clone,)]
pub struct CustomerConfigBuilder
{
    path:                PathBuf,
    connector:           Option<Connector,>,
    job_schema:          JobSchema,
    customer_attributes: Vec<String,>,
}

impl CustomerConfigBuilder
{
    /// Declares the running connector and adopts its job attributes.
    pub fn connector(mut self, connector: Option<Connector,>,) -> Self
    {
        self.connector = connector;
        self.job_schema = connector.map(Connector::job_schema,).unwrap_or_default();
        self
    }

    /// Replaces the job attributes read from every job section.
    pub fn job_schema(mut self, job_schema: JobSchema,) -> Self
    {
        self.job_schema = job_schema;
        self
    }

    /// Additional customer attributes copied when present.
    pub fn customer_attributes(mut self, attributes: &[&str],) -> Self
    {
        self.customer_attributes = attributes.iter().map(|name| (*name).to_owned(),).collect();
        self
    }

    /// Reads and validates the configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigNotFound`] when the file is absent,
    /// [`Error::MissingOption`] when a customer or job lacks a required key,
    /// [`Error::InvalidValue`] when a `Jobs` list is empty or holds a blank
    /// entry, and [`Error::UnknownJob`] when a customer references a job
    /// without a section.
    pub fn parse(self,) -> Result<CustomerConfig, Error,>
    {
        let document = IniDocument::load(&self.path,)?;
        self.parse_document(&document,)
    }

    /// Validates an already parsed document.
    ///
    /// # Errors
    ///
    /// Same as [`parse`](Self::parse), minus file access errors.
    pub fn parse_document(self, document: &IniDocument,) -> Result<CustomerConfig, Error,>
    {
        let mut customers = IndexMap::new();
        for section in document.sections() {
            if section.to_lowercase().starts_with(CUSTOMER_PREFIX,) {
                let customer = self.parse_customer(document, section,)?;
                debug!("Parsed customer {} with {} jobs", section, customer.jobs.len());
                customers.insert(section.to_owned(), customer,);
            }
        }

        let mut jobs = IndexMap::new();
        for (id, customer,) in &customers {
            for job in &customer.jobs {
                if !document.has_section(job,) {
                    return Err(Error::UnknownJob {
                        job:      job.clone(),
                        customer: id.clone(),
                    },);
                }
                if !jobs.contains_key(job,) {
                    jobs.insert(job.clone(), self.parse_job(document, job,)?,);
                }
            }
        }

        info!(
            "Loaded {} customers and {} jobs from {}",
            customers.len(),
            jobs.len(),
            document.path().display()
        );

        Ok(CustomerConfig {
            path: self.path,
            connector: self.connector,
            customers,
            jobs,
        },)
    }

    fn parse_customer(&self, document: &IniDocument, section: &str,) -> Result<Customer, Error,>
    {
        let jobs = job_list(section, &document.require(section, "Jobs",)?,)?;
        let output_dir = document.get(section, "OutputDir",)?.and_then(non_blank,);
        let name = document.require(section, "Name",)?;

        let mut ams = OptionMap::new();
        let mut auth = OptionMap::new();
        for option in CUSTOMER_OPTIONAL {
            let Some(value,) = document.get(section, option,)? else {
                continue;
            };
            let key = option.to_lowercase();
            if key.starts_with(AMS_PREFIX,) {
                ams.insert(key, value,);
            } else if key.starts_with(AUTH_PREFIX,) {
                auth.insert(key, value,);
            }
        }

        let mut attributes = OptionMap::new();
        for attribute in &self.customer_attributes {
            if let Some(value,) = document.get(section, attribute,)? {
                attributes.insert(attribute.to_lowercase(), value,);
            }
        }

        Ok(Customer {
            name,
            output_dir,
            jobs,
            ams,
            auth,
            attributes,
        },)
    }

    fn parse_job(&self, document: &IniDocument, section: &str,) -> Result<Job, Error,>
    {
        let profiles = document.require(section, "Profiles",)?;
        let dirname = document.get(section, "Dirname",)?.and_then(non_blank,);

        let mut attributes = OptionMap::new();
        for attribute in &self.job_schema.required {
            attributes.insert(attribute.to_lowercase(), document.require(section, attribute,)?,);
        }
        for attribute in &self.job_schema.optional {
            if let Some(value,) = document.get(section, attribute,)? {
                attributes.insert(attribute.to_lowercase(), value,);
            }
        }

        Ok(Job {
            profiles,
            dirname,
            attributes,
        },)
    }
}

/// Validated, read-only view of the customer configuration.
#[derive(Debug, Clone,)]
pub struct CustomerConfig
{
    path:      PathBuf,
    connector: Option<Connector,>,
    customers: IndexMap<String, Customer,>,
    jobs:      IndexMap<String, Job,>,
}

impl CustomerConfig
{
    /// Starts configuring a parse of the file at `path`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use feed_connectors::{Connector, CustomerConfig};
    ///
    /// # fn example() -> Result<(), feed_connectors::Error> {
    /// let customers = CustomerConfig::builder("/etc/argo-egi-connectors/customer.conf",)
    ///     .connector(Some(Connector::Topology,),)
    ///     .parse()?;
    /// for customer in customers.customers() {
    ///     println!("{customer}: {:?}", customers.jobs(customer)?);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn builder<P,>(path: P,) -> CustomerConfigBuilder
    where
        P: Into<PathBuf,>,
    {
        CustomerConfigBuilder {
            path:                path.into(),
            connector:           None,
            job_schema:          JobSchema::default(),
            customer_attributes: Vec::new(),
        }
    }

    /// Parses `path` reading the job attributes `connector` declares.
    ///
    /// # Errors
    ///
    /// See [`CustomerConfigBuilder::parse`].
    pub fn parse(path: &Path, connector: Option<Connector,>,) -> Result<Self, Error,>
    {
        Self::builder(path,).connector(connector,).parse()
    }

    /// Location the configuration was read from.
    pub fn path(&self,) -> &Path
    {
        &self.path
    }

    /// Connector whose job attributes were read.
    pub fn connector(&self,) -> Option<Connector,>
    {
        self.connector
    }

    /// Customer section names.
    pub fn customers(&self,) -> impl Iterator<Item = &str,>
    {
        self.customers.keys().map(String::as_str,)
    }

    /// Parsed customer record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCustomer`] for an unknown section name.
    pub fn customer(&self, customer: &str,) -> Result<&Customer, Error,>
    {
        self.customers.get(customer,).ok_or_else(|| Error::UnknownCustomer {
            customer: customer.to_owned(),
        },)
    }

    /// Job section names of a customer, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCustomer`] for an unknown section name.
    pub fn jobs(&self, customer: &str,) -> Result<&[String], Error,>
    {
        self.customer(customer,).map(|record| record.jobs.as_slice(),)
    }

    /// Parsed job record, if some customer references it.
    pub fn job(&self, job: &str,) -> Option<&Job,>
    {
        self.jobs.get(job,)
    }

    /// Every `(customer, job)` pair in declaration order.
    pub fn pairs(&self,) -> impl Iterator<Item = (&str, &str,),>
    {
        self.customers
            .iter()
            .flat_map(|(id, record,)| record.jobs.iter().map(move |job| (id.as_str(), job.as_str(),),),)
    }

    /// Display name of a customer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCustomer`] for an unknown section name.
    pub fn customer_name(&self, customer: &str,) -> Result<&str, Error,>
    {
        self.customer(customer,).map(|record| record.name.as_str(),)
    }

    /// Output directory of a customer, derived from `CUSTOMER_Name` when the
    /// section omits `OutputDir` or leaves it blank.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCustomer`] for an unknown section name and
    /// [`Error::MissingOption`] when no directory can be derived.
    pub fn customer_dir(&self, customer: &str,) -> Result<String, Error,>
    {
        let record = self.customer(customer,)?;
        resolve_dir(customer, record.output_dir.as_deref(), "OutputDir",)
    }

    /// Directory name of a job, derived from `JOB_Name` when no `Dirname`
    /// was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingOption`] when no directory can be derived.
    pub fn job_dir(&self, job: &str,) -> Result<String, Error,>
    {
        let recorded = self.jobs.get(job,).and_then(|record| record.dirname.as_deref(),);
        resolve_dir(job, recorded, "Dirname",)
    }

    /// Output location of a job: `<customer dir>/<job dir>`.
    ///
    /// # Errors
    ///
    /// See [`customer_dir`](Self::customer_dir) and [`job_dir`](Self::job_dir).
    pub fn full_dir(&self, customer: &str, job: &str,) -> Result<PathBuf, Error,>
    {
        Ok(Path::new(&self.customer_dir(customer,)?,).join(self.job_dir(job,)?,),)
    }

    /// State location of a job: `<root>/<customer name>/<job dir>`.
    ///
    /// # Errors
    ///
    /// See [`customer_name`](Self::customer_name) and [`job_dir`](Self::job_dir).
    pub fn full_state_dir(&self, root: &Path, customer: &str, job: &str,) -> Result<PathBuf, Error,>
    {
        Ok(root.join(self.customer_name(customer,)?,).join(self.job_dir(job,)?,),)
    }

    /// Creates the directory of every `(customer, job)` pair.
    ///
    /// Without `root` the output layout (`<customer dir>/<job dir>`) is
    /// created; with `root` the state layout (`<root>/<customer name>/<job
    /// dir>`). Existing directories are accepted, so repeated calls are
    /// harmless. Returns the directories in creation order, without
    /// duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DirectoryCreate`] for any failure other than the
    /// directory already existing.
    pub fn make_dir_struct(&self, root: Option<&Path,>,) -> Result<Vec<PathBuf,>, Error,>
    {
        let mut directories = IndexSet::new();
        for (customer, job,) in self.pairs() {
            let directory = match root {
                Some(root,) => self.full_state_dir(root, customer, job,)?,
                None => self.full_dir(customer, job,)?,
            };
            directories.insert(directory,);
        }

        for directory in &directories {
            match fs::create_dir_all(directory,) {
                Ok((),) => debug!("Ensured directory {}", directory.display()),
                Err(source,) if source.kind() == io::ErrorKind::AlreadyExists && directory.is_dir() => {}
                Err(source,) => return Err(error::directory_error(directory, source,),),
            }
        }

        Ok(directories.into_iter().collect(),)
    }

    /// Profiles of a job, trimmed. Unknown jobs have none.
    pub fn profiles(&self, job: &str,) -> Vec<String,>
    {
        self.jobs.get(job,).map(|record| split_list(&record.profiles,),).unwrap_or_default()
    }

    /// Messaging overrides of a customer; empty when none were configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCustomer`] for an unknown section name.
    pub fn ams_options(&self, customer: &str,) -> Result<&OptionMap, Error,>
    {
        self.customer(customer,).map(|record| &record.ams,)
    }

    /// HTTP authentication overrides of a customer; empty when none were
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCustomer`] for an unknown section name.
    pub fn auth_options(&self, customer: &str,) -> Result<&OptionMap, Error,>
    {
        self.customer(customer,).map(|record| &record.auth,)
    }

    /// Extra customer attribute requested at build time.
    pub fn customer_attribute(&self, customer: &str, attribute: &str,) -> Option<&str,>
    {
        self.customers
            .get(customer,)
            .and_then(|record| record.attributes.get(&attribute.to_lowercase(),),)
            .map(String::as_str,)
    }

    /// Connector attribute of a job.
    pub fn job_attribute(&self, job: &str, attribute: &str,) -> Option<&str,>
    {
        self.jobs.get(job,).and_then(|record| record.attribute(attribute,),)
    }

    /// Topology fetch type of a job.
    pub fn fetch_type(&self, job: &str,) -> Option<&str,>
    {
        self.job_attribute(job, "TopoFetchType",)
    }

    /// Whether a job asks for its topology feed to be fetched page by page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] when `TopoFeedPaging` is not a
    /// boolean.
    pub fn job_paginated(&self, job: &str,) -> Result<bool, Error,>
    {
        self.job_attribute(job, "TopoFeedPaging",)
            .map_or(Ok(false,), |raw| parse_flag("topofeedpaging", raw,),)
    }

    /// Parses a tag expression attribute of a job.
    ///
    /// A missing attribute yields an empty map. A malformed expression is
    /// logged and also yields an empty map, so one bad filter does not stop
    /// the other jobs of a run.
    pub fn tags(&self, job: &str, attribute: &str,) -> TagMap
    {
        let Some(raw,) = self.job_attribute(job, attribute,) else {
            return TagMap::new();
        };
        parse_tags(raw,).unwrap_or_else(|error| {
            warn!("Job {}: could not parse option {}: {}", job, attribute, error);
            TagMap::new()
        },)
    }

    /// Group-of-groups selection tags of a job.
    pub fn group_of_groups_tags(&self, job: &str,) -> TagMap
    {
        self.tags(job, "TopoSelectGroupOfGroups",)
    }

    /// Group-of-endpoints selection tags of a job.
    pub fn group_of_endpoints_tags(&self, job: &str,) -> TagMap
    {
        self.tags(job, "TopoSelectGroupOfEndpoints",)
    }

    /// POEM server host of a job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingOption`] when the job does not define it.
    pub fn poem_server_host(&self, job: &str,) -> Result<&str, Error,>
    {
        self.job_attribute(job, "PoemServerHost",)
            .ok_or_else(|| Error::missing_option(job, "PoemServerHost",),)
    }

    /// Virtual organisations queried on the POEM server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingOption`] when the job does not define them.
    pub fn poem_server_vo(&self, job: &str,) -> Result<Vec<String,>, Error,>
    {
        self.job_attribute(job, "PoemServerVO",)
            .map(split_list,)
            .ok_or_else(|| Error::missing_option(job, "PoemServerVO",),)
    }

    /// POEM namespace of a job.
    pub fn poem_namespace(&self, job: &str,) -> Option<&str,>
    {
        self.job_attribute(job, "PoemNamespace",)
    }
}

fn non_blank(value: String,) -> Option<String,>
{
    if value.trim().is_empty() { None } else { Some(value,) }
}

/// Splits the `Jobs` list of a customer, rejecting empty lists and blank
/// entries such as the middle of `A,,B`.
fn job_list(section: &str, raw: &str,) -> Result<Vec<String,>, Error,>
{
    let jobs: Vec<String,> = raw.split(',',).map(|job| job.trim().to_owned(),).collect();
    if jobs.iter().any(String::is_empty,) {
        return Err(Error::invalid_value(
            format!("{}jobs", section.to_lowercase()),
            raw,
            "expected a comma separated list of job sections",
        ),);
    }
    Ok(jobs,)
}

fn resolve_dir(section: &str, recorded: Option<&str,>, option: &str,) -> Result<String, Error,>
{
    if let Some(directory,) = recorded {
        return Ok(directory.to_owned(),);
    }
    section_to_dir(section,).ok_or_else(|| Error::missing_option(section, option,),)
}

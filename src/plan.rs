// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Fully resolved run parameters handed to the fetch and output stages.
//!
//! A [`RunPlan`] is computed once from both configurations and never
//! mutated; every stage of a run reads the same snapshot. It contains no
//! fetched data, only the identifiers, filters, credentials and locations
//! the external collaborators need.

use std::{
    collections::BTreeSet,
    io,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::info;

use crate::{
    connector::Connector,
    customer::CustomerConfig,
    error::Error,
    feeds::{Subscriber, is_remote_feed},
    global::{Completeness, GlobalConfig, OptionMap},
    tags::TagMap,
};

const AMS_SECTION: &str = "ams";

/// Everything needed to fetch one distinct feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct FeedPlan
{
    /// Feed URL or file path.
    pub feed:        String,
    /// Whether the feed is fetched over the network.
    pub remote:      bool,
    /// Jobs that consume the feed.
    pub subscribers: Vec<Subscriber,>,
    /// Scopes requested by any subscriber.
    pub scopes:      BTreeSet<String,>,
    /// Whether the feed is fetched page by page.
    pub paginated:   bool,
    /// HTTP credentials of the first subscriber's customer.
    pub auth:        OptionMap,
}

/// Everything needed to write the output of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct JobPlan
{
    /// Customer section name.
    pub customer:           String,
    /// Customer display name.
    pub customer_name:      String,
    /// Job section name.
    pub job:                String,
    /// Profiles the job reports on.
    pub profiles:           Vec<String,>,
    /// Output directory of the job.
    pub output_dir:         PathBuf,
    /// State directory of the job.
    pub state_dir:          PathBuf,
    /// Messaging options with customer overrides applied.
    pub ams:                OptionMap,
    /// Whether `ams` holds every messaging option.
    pub ams_completeness:   Completeness,
    /// Group-of-groups selection tags.
    pub group_of_groups:    TagMap,
    /// Group-of-endpoints selection tags.
    pub group_of_endpoints: TagMap,
}

/// Read-only snapshot of a connector run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct RunPlan
{
    /// Connector being run.
    pub connector:       Connector,
    /// Global configuration file.
    pub global_config:   PathBuf,
    /// Customer configuration file.
    pub customer_config: PathBuf,
    /// Distinct feeds in discovery order.
    pub feeds:           Vec<FeedPlan,>,
    /// Jobs in declaration order.
    pub jobs:            Vec<JobPlan,>,
}

impl RunPlan
{
    /// Resolves the plan of `connector` from both configurations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingOption`] when the global configuration has no
    /// state directory or a directory cannot be derived, and
    /// [`Error::InvalidValue`] when a paging switch is not a boolean.
    pub fn resolve(
        global: &GlobalConfig,
        customers: &CustomerConfig,
        connector: Connector,
        default_feed: Option<&str,>,
    ) -> Result<Self, Error,>
    {
        let state_root = global
            .get("InputState", "SaveDir",)
            .map(Path::new,)
            .ok_or_else(|| Error::missing_option("InputState", "SaveDir",),)?;

        let mut feeds = Vec::new();
        for (feed, subscribers,) in customers.map_feed_jobs(connector, default_feed,) {
            feeds.push(FeedPlan {
                remote: is_remote_feed(&feed,),
                scopes: customers.feed_scopes(&feed, &subscribers,),
                paginated: customers.is_paginated(&feed, &subscribers,)?,
                auth: customers.feed_auth_options(&feed, &subscribers,)?,
                subscribers,
                feed,
            },);
        }

        let mut jobs = Vec::new();
        for (customer, job,) in customers.pairs() {
            let ams = global.merge_options(customers.ams_options(customer,)?, AMS_SECTION,);
            let ams_completeness = global.is_complete(&ams, AMS_SECTION,);
            jobs.push(JobPlan {
                customer: customer.to_owned(),
                customer_name: customers.customer_name(customer,)?.to_owned(),
                job: job.to_owned(),
                profiles: customers.profiles(job,),
                output_dir: customers.full_dir(customer, job,)?,
                state_dir: customers.full_state_dir(state_root, customer, job,)?,
                ams,
                ams_completeness,
                group_of_groups: customers.group_of_groups_tags(job,),
                group_of_endpoints: customers.group_of_endpoints_tags(job,),
            },);
        }

        info!("Resolved {} feeds for {} jobs of the {} connector", feeds.len(), jobs.len(), connector);

        Ok(Self {
            connector,
            global_config: global.path().to_path_buf(),
            customer_config: customers.path().to_path_buf(),
            feeds,
            jobs,
        },)
    }

    /// Writes the plan as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialize`] when serialization fails.
    pub fn write_json<W: io::Write,>(&self, writer: &mut W, pretty: bool,) -> Result<(), Error,>
    {
        if pretty {
            serde_json::to_writer_pretty(writer, self,)?;
        } else {
            serde_json::to_writer(writer, self,)?;
        }

        Ok((),)
    }
}

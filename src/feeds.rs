// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Fan-out of feeds to the jobs that consume them.
//!
//! Jobs of different customers frequently read the same feed. The feed map
//! groups subscribers under each distinct feed string so the feed is fetched
//! and parsed once, then filtered per subscriber.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::{
    connector::Connector,
    customer::CustomerConfig,
    error::Error,
    global::OptionMap,
};

const SCOPE_TAG: &str = "scope";

/// Job consuming a feed, with the customer that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize,)]
pub struct Subscriber
{
    /// Job section name.
    pub job:      String,
    /// Customer section name.
    pub customer: String,
}

impl Subscriber
{
    /// Creates a subscriber from borrowed names.
    pub fn new(job: &str, customer: &str,) -> Self
    {
        Self {
            job: job.to_owned(), customer: customer.to_owned(),
        }
    }
}

/// Feed URL or file path mapped to its subscribers in discovery order.
pub type FeedMap = IndexMap<String, Vec<Subscriber,>,>;

/// Returns `true` when `feed` names a remote location rather than a file.
///
/// # Examples
///
/// ```
/// use feed_connectors::is_remote_feed;
///
/// assert!(is_remote_feed("https://goc.egi.eu/gocdbpi/"));
/// assert!(!is_remote_feed("/var/lib/feeds/eosc.json"));
/// assert!(!is_remote_feed("file:///var/lib/feeds/eosc.json"));
/// ```
pub fn is_remote_feed(feed: &str,) -> bool
{
    feed.split_once("://",)
        .is_some_and(|(_, rest,)| rest.split('/',).next().is_some_and(|host| !host.is_empty(),),)
}

impl CustomerConfig
{
    /// Groups every job under the feed it reads.
    ///
    /// The feed attribute depends on `connector` (`TopoFeed`,
    /// `DowntimesFeed`, `WeightsFeed`). Jobs without one read `default_feed`;
    /// jobs with neither are left out, as are all jobs of connectors that
    /// read no feed. Identical feed strings share one entry whose subscribers
    /// keep discovery order.
    pub fn map_feed_jobs(&self, connector: Connector, default_feed: Option<&str,>,) -> FeedMap
    {
        let mut feeds = FeedMap::new();
        let Some(attribute,) = connector.feed_attribute() else {
            return feeds;
        };

        for (customer, job,) in self.pairs() {
            let feed = self
                .job_attribute(job, attribute,)
                .filter(|feed| !feed.is_empty(),)
                .or(default_feed,)
                .filter(|feed| !feed.is_empty(),);
            let Some(feed,) = feed else {
                debug!("Job {} of {} has no {} and no default feed", job, customer, attribute);
                continue;
            };
            feeds.entry(feed.to_owned(),).or_default().push(Subscriber::new(job, customer,),);
        }

        debug!("Mapped {} jobs onto {} distinct feeds", self.pairs().count(), feeds.len());
        feeds
    }

    /// Union of the `Scope` tags that the subscribers' group selections
    /// declare, so a shared feed can be filtered once for all of them.
    pub fn feed_scopes(&self, feed: &str, subscribers: &[Subscriber],) -> BTreeSet<String,>
    {
        let mut scopes = BTreeSet::new();
        for subscriber in subscribers {
            let groups = self.group_of_groups_tags(&subscriber.job,);
            let endpoints = self.group_of_endpoints_tags(&subscriber.job,);
            for (key, value,) in groups.iter().chain(endpoints.iter(),) {
                if key.eq_ignore_ascii_case(SCOPE_TAG,) {
                    scopes.extend(value.values().map(str::to_owned,),);
                }
            }
        }
        debug!("Feed {} serves scopes {:?}", feed, scopes);
        scopes
    }

    /// Whether any subscriber asks for the feed to be fetched page by page.
    /// Stops at the first subscriber that does.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] when a subscriber's paging switch is
    /// not a boolean.
    pub fn is_paginated(&self, feed: &str, subscribers: &[Subscriber],) -> Result<bool, Error,>
    {
        for subscriber in subscribers {
            if self.job_paginated(&subscriber.job,)? {
                debug!("Feed {} is paginated for {}", feed, subscriber.job);
                return Ok(true,);
            }
        }
        Ok(false,)
    }

    /// HTTP credentials used to fetch a shared feed: those of the first
    /// subscriber's customer, empty when it has none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCustomer`] when the first subscriber names an
    /// unknown customer.
    pub fn feed_auth_options(&self, feed: &str, subscribers: &[Subscriber],) -> Result<OptionMap, Error,>
    {
        let Some(first,) = subscribers.first() else {
            return Ok(OptionMap::new(),);
        };
        let chosen = self.auth_options(&first.customer,)?;

        for other in &subscribers[1..] {
            if other.customer != first.customer && self.auth_options(&other.customer,)? != chosen {
                debug!(
                    "Feed {}: credentials of {} differ from {}, keeping the first subscriber",
                    feed, other.customer, first.customer
                );
            }
        }

        Ok(chosen.clone(),)
    }
}

#[cfg(test)]
mod tests
{
    use super::{Subscriber, is_remote_feed};
    use crate::{
        Connector, DEFAULT_TOPOLOGY_FEED,
        customer::tests::{CUSTOMERS, parse},
    };

    #[test]
    fn identical_feeds_are_deduplicated_in_order()
    {
        let contents = CUSTOMERS.replace(
            "TopoFeed = https://local.example.org/gocdbpi/",
            "TopoFeed = https://goc.egi.eu/gocdbpi/",
        );
        let config = parse(&contents, Some(Connector::Topology,),).expect("valid configuration",);

        let feeds = config.map_feed_jobs(Connector::Topology, Some(DEFAULT_TOPOLOGY_FEED,),);
        assert_eq!(feeds.len(), 1);
        assert_eq!(
            feeds[DEFAULT_TOPOLOGY_FEED],
            [
                Subscriber::new("JOB_EGI_Critical", "CUSTOMER_EGI"),
                Subscriber::new("JOB_EGI_Cloud", "CUSTOMER_EGI"),
                Subscriber::new("JOB_Local_Critical", "CUSTOMER_Local"),
            ]
        );
    }

    #[test]
    fn explicit_feeds_keep_their_own_entry()
    {
        let config = parse(CUSTOMERS, Some(Connector::Topology,),).expect("valid configuration",);

        let feeds = config.map_feed_jobs(Connector::Topology, Some(DEFAULT_TOPOLOGY_FEED,),);
        let keys: Vec<_,> = feeds.keys().map(String::as_str,).collect();
        assert_eq!(keys, [DEFAULT_TOPOLOGY_FEED, "https://local.example.org/gocdbpi/"]);
        assert_eq!(feeds[DEFAULT_TOPOLOGY_FEED].len(), 2);
    }

    #[test]
    fn jobs_without_any_feed_are_skipped()
    {
        let config = parse(CUSTOMERS, Some(Connector::Topology,),).expect("valid configuration",);

        let feeds = config.map_feed_jobs(Connector::Topology, None,);
        assert_eq!(feeds.len(), 1);
        assert_eq!(
            feeds["https://local.example.org/gocdbpi/"],
            [Subscriber::new("JOB_Local_Critical", "CUSTOMER_Local")]
        );
    }

    #[test]
    fn feed_attribute_follows_connector()
    {
        let contents = CUSTOMERS.replace(
            "Profiles = FEDCLOUD, ARGO_MON\n",
            "Profiles = FEDCLOUD, ARGO_MON\nDowntimesFeed = /var/lib/feeds/downtimes.xml\n",
        );
        let config = parse(&contents, Some(Connector::Downtimes,),).expect("valid configuration",);

        let feeds = config.map_feed_jobs(Connector::Downtimes, None,);
        assert_eq!(
            feeds["/var/lib/feeds/downtimes.xml"],
            [Subscriber::new("JOB_EGI_Cloud", "CUSTOMER_EGI")]
        );
        assert!(config.map_feed_jobs(Connector::Poem, Some("ignored",),).is_empty());
    }

    #[test]
    fn scopes_are_merged_across_subscribers()
    {
        let config = parse(CUSTOMERS, Some(Connector::Topology,),).expect("valid configuration",);
        let subscribers = [
            Subscriber::new("JOB_EGI_Critical", "CUSTOMER_EGI",),
            Subscriber::new("JOB_EGI_Cloud", "CUSTOMER_EGI",),
            Subscriber::new("JOB_Local_Critical", "CUSTOMER_Local",),
        ];

        let scopes = config.feed_scopes(DEFAULT_TOPOLOGY_FEED, &subscribers,);
        let scopes: Vec<_,> = scopes.iter().map(String::as_str,).collect();
        assert_eq!(scopes, ["EGI", "FedCloud", "Local"]);
    }

    #[test]
    fn pagination_is_true_when_any_subscriber_pages()
    {
        let config = parse(CUSTOMERS, Some(Connector::Topology,),).expect("valid configuration",);
        let subscribers = [
            Subscriber::new("JOB_EGI_Critical", "CUSTOMER_EGI",),
            Subscriber::new("JOB_EGI_Cloud", "CUSTOMER_EGI",),
            Subscriber::new("JOB_Local_Critical", "CUSTOMER_Local",),
        ];

        assert!(config.is_paginated(DEFAULT_TOPOLOGY_FEED, &subscribers,).unwrap());
        assert!(!config.is_paginated(DEFAULT_TOPOLOGY_FEED, &[subscribers[0].clone()],).unwrap());
        assert!(!config.is_paginated(DEFAULT_TOPOLOGY_FEED, &[],).unwrap());
    }

    #[test]
    fn explicit_false_paging_does_not_count()
    {
        let contents = CUSTOMERS.replace(
            "TopoFetchType = Sites\n",
            "TopoFetchType = Sites\nTopoFeedPaging = False\n",
        );
        let config = parse(&contents, Some(Connector::Topology,),).expect("valid configuration",);
        let subscribers = [Subscriber::new("JOB_EGI_Critical", "CUSTOMER_EGI",)];
        assert!(!config.is_paginated(DEFAULT_TOPOLOGY_FEED, &subscribers,).unwrap());
    }

    #[test]
    fn first_subscriber_credentials_win()
    {
        let config = parse(CUSTOMERS, Some(Connector::Topology,),).expect("valid configuration",);
        let egi_first = [
            Subscriber::new("JOB_EGI_Critical", "CUSTOMER_EGI",),
            Subscriber::new("JOB_Local_Critical", "CUSTOMER_Local",),
        ];
        let auth = config.feed_auth_options(DEFAULT_TOPOLOGY_FEED, &egi_first,).unwrap();
        assert_eq!(auth.get("authenticationhttpuser").map(String::as_str), Some("egi"));

        let local_first = [egi_first[1].clone(), egi_first[0].clone()];
        assert!(config.feed_auth_options(DEFAULT_TOPOLOGY_FEED, &local_first,).unwrap().is_empty());
        assert!(config.feed_auth_options(DEFAULT_TOPOLOGY_FEED, &[],).unwrap().is_empty());
    }

    #[test]
    fn remote_feeds_need_a_host()
    {
        assert!(is_remote_feed("http://example.org"));
        assert!(!is_remote_feed("eosc.json"));
        assert!(!is_remote_feed("https://"));
    }
}

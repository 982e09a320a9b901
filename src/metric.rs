//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Routec.
//! The Routec project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Link Metric Capability
//!
//! Routing elements compare paths through a [`LinkMetric`]. A metric is
//! either a good value, where lower is better, or [`Metric::Bad`], which is
//! worse than any good value.
//!
//! [`ThresholdMetric`] counts hops over links whose delivery ratio, as
//! reported by a `LinkStat` element, reaches a threshold. Its configuration
//! string is checked against the compiled graph:
//!
//! ```text
//! ls :: LinkStat;
//! metric :: ThresholdMetric(ls, THRESH 70, TWOWAY true);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::confparse::{parse_bool, parse_unsigned, split_args, split_keyword};
use crate::errors::{Result, RouterError};
use crate::graph::RouterGraph;
use crate::registry::ClassRegistry;

/// Class name, and capability name, of link statistics elements.
pub const LINK_STAT_CLASS: &str = "LinkStat";

/// Path quality. The derived order puts every `Good` value before `Bad`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metric {
    Good(u32),
    Bad,
}

impl Metric {
    pub fn is_good(self) -> bool {
        matches!(self, Metric::Good(_))
    }

    pub fn value(self) -> Option<u32> {
        match self {
            Metric::Good(v) => Some(v),
            Metric::Bad => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Good(v) => write!(f, "{}", v),
            Metric::Bad => f.write_str("bad"),
        }
    }
}

/// Six-byte Ethernet address, written `00:1a:2b:3c:4d:5e`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EtherAddress(pub [u8; 6]);

impl FromStr for EtherAddress {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || RouterError::validation(format!("invalid Ethernet address `{}`", s));
        let separator = if s.contains('-') { '-' } else { ':' };
        let mut bytes = [0u8; 6];
        let mut parts = s.split(separator);
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || part.len() > 2 {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(EtherAddress(bytes))
    }
}

impl fmt::Display for EtherAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}

/// Delivery ratios (percent) measured by a link statistics element.
pub trait LinkStats {
    /// Ratio of our probes the neighbor received, if known.
    fn forward_rate(&self, peer: &EtherAddress) -> Option<u32>;
    /// Ratio of the neighbor's probes we received, if known.
    fn reverse_rate(&self, peer: &EtherAddress) -> Option<u32>;
}

pub trait LinkMetric {
    /// Metric of the link to `peer`. `data_sender` is false when data flows
    /// from `peer` to us, which swaps the forward and reverse directions.
    fn compute_link_metric(&self, peer: &EtherAddress, data_sender: bool) -> Metric;

    /// Metric of a route extended by one link.
    fn combine(&self, route: Metric, link: Metric) -> Metric;

    /// Strict "better than": `Bad` is never less than anything, and every
    /// good value is less than `Bad`.
    fn metric_lt(&self, a: Metric, b: Metric) -> bool {
        a < b
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub link_stat: String,
    /// Minimum delivery ratio in percent, at most 100.
    pub thresh: u32,
    /// Apply the threshold to the reverse direction too.
    pub twoway: bool,
}

impl ThresholdConfig {
    pub const DEFAULT_THRESH: u32 = 63;

    /// Parses `LINKSTAT, THRESH n, TWOWAY bool`.
    pub fn parse(configuration: &str) -> Result<Self> {
        let mut link_stat = None;
        let mut thresh = Self::DEFAULT_THRESH;
        let mut twoway = false;

        for arg in split_args(configuration) {
            match split_keyword(&arg) {
                (Some("THRESH"), value) => {
                    thresh = parse_unsigned(value).ok_or_else(|| {
                        RouterError::validation(format!("THRESH expects an unsigned integer, got `{}`", value))
                    })?;
                }
                (Some("TWOWAY"), value) => {
                    twoway = parse_bool(value).ok_or_else(|| {
                        RouterError::validation(format!("TWOWAY expects a boolean, got `{}`", value))
                    })?;
                }
                (Some(word), "") | (None, word) if link_stat.is_none() && !word.is_empty() => {
                    link_stat = Some(word.to_string());
                }
                (Some(keyword), _) => {
                    return Err(RouterError::validation(format!("unknown keyword `{}`", keyword)));
                }
                (None, positional) => {
                    return Err(RouterError::validation(format!("too many arguments at `{}`", positional)));
                }
            }
        }

        let link_stat = link_stat.ok_or_else(|| RouterError::validation("no LinkStat element specified"))?;
        if thresh > 100 {
            return Err(RouterError::validation(
                "THRESH keyword argument is too large, it must be <= 100 percent",
            ));
        }
        Ok(Self {
            link_stat,
            thresh,
            twoway,
        })
    }

    /// Checks that the named element exists in `graph` and is a `LinkStat`
    /// (or, per `registry`, provides the `LinkStat` capability).
    pub fn check_link_stat(&self, graph: &RouterGraph, registry: Option<&dyn ClassRegistry>) -> Result<()> {
        let element = graph.element(&self.link_stat).ok_or_else(|| {
            RouterError::validation(format!("no element named `{}`", self.link_stat))
        })?;
        let provides = element.class == LINK_STAT_CLASS
            || registry.is_some_and(|r| r.provides(&element.class, LINK_STAT_CLASS));
        if !provides {
            return Err(RouterError::validation(format!(
                "`{}` is a {}, not a {}",
                self.link_stat, element.class, LINK_STAT_CLASS
            )));
        }
        Ok(())
    }
}

/// Hop-count metric over links that pass a delivery-ratio threshold.
pub struct ThresholdMetric<S> {
    name: String,
    config: ThresholdConfig,
    stats: S,
}

impl<S: LinkStats> ThresholdMetric<S> {
    pub fn new(name: impl Into<String>, config: ThresholdConfig, stats: S) -> Self {
        Self {
            name: name.into(),
            config,
            stats,
        }
    }

    /// Builds the metric for element `name` of `graph`, parsing and checking
    /// its configuration string.
    pub fn from_graph(
        name: &str,
        graph: &RouterGraph,
        registry: Option<&dyn ClassRegistry>,
        stats: S,
    ) -> Result<Self> {
        let element = graph
            .element(name)
            .ok_or_else(|| RouterError::validation(format!("no element named `{}`", name)))?;
        let config = ThresholdConfig::parse(&element.configuration)
            .map_err(|e| RouterError::validation(format!("{}: {}", name, e)))?;
        config
            .check_link_stat(graph, registry)
            .map_err(|e| RouterError::validation(format!("{}: {}", name, e)))?;
        Ok(Self::new(name, config, stats))
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }
}

impl<S: LinkStats> LinkMetric for ThresholdMetric<S> {
    fn compute_link_metric(&self, peer: &EtherAddress, data_sender: bool) -> Metric {
        let mut forward = self.stats.forward_rate(peer);
        let mut reverse = self.stats.reverse_rate(peer);
        if !data_sender {
            std::mem::swap(&mut forward, &mut reverse);
        }

        let Some(forward) = forward else {
            return Metric::Bad;
        };
        if self.config.twoway && reverse.is_none() {
            return Metric::Bad;
        }
        if forward == 0 || reverse == Some(0) {
            return Metric::Bad;
        }

        let reverse_ok = !self.config.twoway || reverse.is_some_and(|r| r >= self.config.thresh);
        if forward >= self.config.thresh && reverse_ok {
            Metric::Good(1)
        } else {
            Metric::Bad
        }
    }

    fn combine(&self, route: Metric, link: Metric) -> Metric {
        let (Metric::Good(route), Metric::Good(link)) = (route, link) else {
            return Metric::Bad;
        };
        if route < 1 {
            log::warn!(
                "ThresholdMetric {}: route metric of {} hops is too low",
                self.name,
                route
            );
        }
        if link != 1 {
            log::warn!(
                "ThresholdMetric {}: link metric of {} hops should be 1",
                self.name,
                link
            );
        }
        Metric::Good(route.saturating_add(link))
    }
}

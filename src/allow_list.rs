//! Hostname allow-list.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::uri::RawUri;

// Anything outside these sets may be read differently by the URI parser and
// the rendering engine, so it never matches.
static HOST_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._!~*')(;:&=+$,%\[\]-]*$").expect("host pattern compiles")
});
static USER_INFO_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._!~*')(;:&=+$,%-]*$").expect("user-info pattern compiles")
});

/// Hostnames a view may load, including their subdomains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermittedHostnameSet {
    hosts: Vec<String>,
}

impl PermittedHostnameSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, hostname: impl Into<String>) {
        self.hosts.push(hostname.into());
    }

    pub fn extend<I, S>(&mut self, hostnames: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts.extend(hostnames.into_iter().map(Into::into));
    }

    /// Removes the first matching entry.
    pub fn remove(&mut self, hostname: &str) -> bool {
        match self.hosts.iter().position(|h| h == hostname) {
            Some(i) => {
                self.hosts.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.hosts.clear();
    }

    pub fn as_slice(&self) -> &[String] {
        &self.hosts
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// True when the URL's host is an entry or a dot-subdomain of one.
    pub fn is_permitted(&self, url: Option<&str>) -> bool {
        let Some(url) = url.filter(|u| !u.is_empty()) else {
            return false;
        };

        let uri = RawUri::parse(url);
        let Some(host) = uri.host().filter(|h| !h.is_empty()) else {
            return false;
        };
        if !HOST_CHARS.is_match(host) {
            debug!(host, "rejecting host with unexpected characters");
            return false;
        }
        if let Some(user_info) = uri.user_info() {
            if !USER_INFO_CHARS.is_match(user_info) {
                debug!("rejecting URL with unexpected user-info characters");
                return false;
            }
        }

        self.hosts.iter().any(|expected| {
            host == expected
                || host
                    .strip_suffix(expected.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

impl<S: Into<String>> FromIterator<S> for PermittedHostnameSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// First platform release that can list browsable handlers with their
/// resolved intent filters.
pub const DEFAULT_MIN_APP_LINK_SDK: u32 = 24;

/// Custom deep-link scheme whose query string carries a fallback web address.
///
/// For `myapp://open?url=https%3A%2F%2Fexample.com&title=Hi` with the default
/// parameter names, the fallback is `https://example.com` titled `Hi`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeeplinkConfig {
    pub scheme: String,
    #[serde(default = "default_url_param")]
    pub url_param: String,
    #[serde(default = "default_title_param")]
    pub title_param: String,
}

fn default_url_param() -> String {
    "url".to_string()
}

fn default_title_param() -> String {
    "title".to_string()
}

impl DeeplinkConfig {
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            url_param: default_url_param(),
            title_param: default_title_param(),
        }
    }

    pub fn with_params(mut self, url_param: impl Into<String>, title_param: impl Into<String>) -> Self {
        self.url_param = url_param.into();
        self.title_param = title_param.into();
        self
    }

    /// True when `uri` is written in this hierarchical scheme (`scheme://...`).
    pub fn matches(&self, uri: &str) -> bool {
        uri.strip_prefix(self.scheme.as_str())
            .is_some_and(|rest| rest.starts_with("://"))
    }
}

/// A redirector endpoint that wraps the real destination in a query parameter,
/// e.g. `{ host: "google.com", path: "/url", param: "q" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRedirect {
    pub host: String,
    pub path: String,
    pub param: String,
}

impl TrackingRedirect {
    pub fn new(host: impl Into<String>, path: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
            param: param.into(),
        }
    }
}

/// Static classifier configuration. Read-only once handed to a classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub deeplinks: Vec<DeeplinkConfig>,
    pub tracking_redirects: Vec<TrackingRedirect>,
    pub min_app_link_sdk: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            deeplinks: Vec::new(),
            tracking_redirects: Vec::new(),
            min_app_link_sdk: DEFAULT_MIN_APP_LINK_SDK,
        }
    }
}

impl ClassifierConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_deeplink(mut self, deeplink: DeeplinkConfig) -> Self {
        self.deeplinks.push(deeplink);
        self
    }

    pub fn with_tracking_redirect(mut self, rule: TrackingRedirect) -> Self {
        self.tracking_redirects.push(rule);
        self
    }

    /// The single deep-link entry whose scheme prefixes `uri`.
    pub(crate) fn deeplink_for(&self, uri: &str) -> Option<&DeeplinkConfig> {
        self.deeplinks.iter().find(|d| d.matches(uri))
    }
}

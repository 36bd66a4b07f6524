//! Installed-application registry.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::intent::{ComponentName, Intent};
use crate::uri::RawUri;

/// Shape of the intent filter a handler matched with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSummary {
    pub authorities: usize,
    pub paths: usize,
}

/// One activity willing to handle a browsable intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedActivity {
    pub component: ComponentName,
    /// `None` when the platform did not report which filter matched.
    pub filter: Option<FilterSummary>,
}

impl ResolvedActivity {
    /// Catch-all filters (no authority, no path) belong to browsers.
    /// Unknown filters belong to neither side.
    pub fn is_generic_browser(&self) -> Option<bool> {
        self.filter.map(|f| f.authorities == 0 && f.paths == 0)
    }
}

pub trait ActivityResolver {
    /// Platform API level. Handler queries need at least
    /// [`ClassifierConfig::min_app_link_sdk`](crate::ClassifierConfig).
    fn sdk_level(&self) -> u32;

    /// Activities declaring themselves browsable for `intent`, with the
    /// filters they matched.
    fn query_handlers(&self, intent: &Intent) -> Result<Vec<ResolvedActivity>>;
}

impl<R: ActivityResolver + ?Sized> ActivityResolver for &R {
    fn sdk_level(&self) -> u32 {
        (**self).sdk_level()
    }

    fn query_handlers(&self, intent: &Intent) -> Result<Vec<ResolvedActivity>> {
        (**self).query_handlers(intent)
    }
}

/// Starts activities.
pub trait IntentLauncher {
    /// True when some activity accepted the intent.
    fn start(&self, intent: &Intent) -> bool;

    /// True when at least one activity could handle the intent.
    fn can_resolve(&self, intent: &Intent) -> bool;
}

/// A handler declaration: which component claims which URIs.
///
/// Rules without `host` and `path_prefix` are catch-all browser filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerRule {
    pub package: String,
    pub name: String,
    pub scheme: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub path_prefix: Option<String>,
}

impl HandlerRule {
    pub fn browser(package: &str, name: &str, scheme: &str) -> Self {
        Self {
            package: package.to_string(),
            name: name.to_string(),
            scheme: scheme.to_string(),
            host: None,
            path_prefix: None,
        }
    }

    pub fn app(package: &str, name: &str, scheme: &str, host: &str) -> Self {
        Self {
            host: Some(host.to_string()),
            ..Self::browser(package, name, scheme)
        }
    }

    pub fn with_path_prefix(mut self, prefix: &str) -> Self {
        self.path_prefix = Some(prefix.to_string());
        self
    }

    fn matches(&self, uri: &RawUri<'_>) -> bool {
        if uri.scheme() != Some(self.scheme.as_str()) {
            return false;
        }
        if let Some(host) = &self.host {
            if !uri.host().is_some_and(|h| h.eq_ignore_ascii_case(host)) {
                return false;
            }
        }
        if let Some(prefix) = &self.path_prefix {
            if !uri.path().unwrap_or_default().starts_with(prefix.as_str()) {
                return false;
            }
        }
        true
    }

    fn resolve(&self) -> ResolvedActivity {
        ResolvedActivity {
            component: ComponentName::new(&self.package, &self.name),
            filter: Some(FilterSummary {
                authorities: usize::from(self.host.is_some()),
                paths: usize::from(self.path_prefix.is_some()),
            }),
        }
    }
}

/// Handler table exported once by the host, or built by tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticActivityResolver {
    #[serde(default = "default_sdk")]
    pub sdk_level: u32,
    #[serde(default)]
    pub rules: Vec<HandlerRule>,
}

fn default_sdk() -> u32 {
    crate::config::DEFAULT_MIN_APP_LINK_SDK
}

impl Default for StaticActivityResolver {
    fn default() -> Self {
        Self {
            sdk_level: default_sdk(),
            rules: Vec::new(),
        }
    }
}

impl StaticActivityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_sdk_level(mut self, sdk_level: u32) -> Self {
        self.sdk_level = sdk_level;
        self
    }

    pub fn with_rule(mut self, rule: HandlerRule) -> Self {
        self.rules.push(rule);
        self
    }
}

impl ActivityResolver for StaticActivityResolver {
    fn sdk_level(&self) -> u32 {
        self.sdk_level
    }

    fn query_handlers(&self, intent: &Intent) -> Result<Vec<ResolvedActivity>> {
        let Some(data) = intent.data.as_deref() else {
            return Ok(Vec::new());
        };
        let uri = RawUri::parse(data);
        Ok(self
            .rules
            .iter()
            .filter(|r| r.matches(&uri))
            .filter(|r| intent.package.as_deref().map_or(true, |p| p == r.package))
            .map(HandlerRule::resolve)
            .collect())
    }
}

//! Navigation URL classification.
//!
//! Decides, for a URI a page is about to navigate to, whether it is a web
//! load, a dial/SMS/mail target, something an installed app should open, a
//! search term, or something to ignore.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::config::ClassifierConfig;
use crate::error::{Error, Result};
use crate::intent::{
    ComponentName, Intent, CATEGORY_BROWSABLE, EXTRA_BROWSER_FALLBACK_TITLE,
    EXTRA_BROWSER_FALLBACK_URL, FLAG_ACTIVITY_NEW_TASK,
};
use crate::resolver::ActivityResolver;
use crate::uri::{truncate, RawUri};

pub const PHONE_MAX_LENGTH: usize = 20;
pub const EMAIL_MAX_LENGTH: usize = 1000;
pub const SMS_MAX_LENGTH: usize = 400;

const TEL_SCHEME: &str = "tel";
const TELPROMPT_SCHEME: &str = "telprompt";
const MAILTO_SCHEME: &str = "mailto";
const SMS_SCHEME: &str = "sms";
const SMSTO_SCHEME: &str = "smsto";
const HTTP_SCHEME: &str = "http";
const HTTPS_SCHEME: &str = "https";
const DATA_SCHEME: &str = "data";
const ABOUT_SCHEME: &str = "about";
const JAVASCRIPT_SCHEME: &str = "javascript";

static VALID_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-zA-Z0-9+.-]+$").expect("scheme pattern compiles"));

/// An http(s) URL that installed apps may want to open.
///
/// `intent` is set when exactly one non-browser app claims the URL.
/// Otherwise `excluded_components` lists the generic browsers, so a chooser
/// can leave them out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppLink {
    pub intent: Option<Intent>,
    pub excluded_components: Option<Vec<ComponentName>>,
    pub uri: String,
}

/// A custom-scheme deep link plus where to go if no app takes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonHttpAppLink {
    pub uri: String,
    pub intent: Intent,
    pub fallback_url: Option<String>,
    pub title: Option<String>,
    pub fallback_intent: Option<Intent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassifiedUrl {
    /// Ordinary page load
    Web { address: String },
    /// Dial target, at most 20 chars
    Telephone { number: String },
    /// Full `mailto:` URI, at most 1000 chars
    Email { address: String },
    /// SMS target, at most 400 chars
    Sms { number: String },
    AppLink(AppLink),
    NonHttpAppLink(NonHttpAppLink),
    SearchQuery { query: String },
    /// Malformed, or deliberately not handled
    Unknown { uri: String },
    /// Real destination pulled out of a tracking redirect
    ExtractedTrackingLink { url: String },
}

impl ClassifiedUrl {
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifiedUrl::Web { .. } => "web",
            ClassifiedUrl::Telephone { .. } => "telephone",
            ClassifiedUrl::Email { .. } => "email",
            ClassifiedUrl::Sms { .. } => "sms",
            ClassifiedUrl::AppLink(_) => "app_link",
            ClassifiedUrl::NonHttpAppLink(_) => "non_http_app_link",
            ClassifiedUrl::SearchQuery { .. } => "search_query",
            ClassifiedUrl::Unknown { .. } => "unknown",
            ClassifiedUrl::ExtractedTrackingLink { .. } => "extracted_tracking_link",
        }
    }

    fn is_page_load(&self) -> bool {
        matches!(self, ClassifiedUrl::Web { .. } | ClassifiedUrl::AppLink(_))
    }
}

pub struct UrlClassifier<R> {
    resolver: R,
    config: ClassifierConfig,
}

impl<R: ActivityResolver> UrlClassifier<R> {
    pub fn new(resolver: R, config: ClassifierConfig) -> Self {
        Self { resolver, config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Like [`classify`](Self::classify); a missing URI is an empty web load.
    pub fn classify_opt(&self, uri: Option<&str>) -> ClassifiedUrl {
        match uri {
            Some(uri) => self.classify(uri),
            None => ClassifiedUrl::Web {
                address: String::new(),
            },
        }
    }

    pub fn classify(&self, uri: &str) -> ClassifiedUrl {
        let raw = RawUri::parse(uri);
        let result = match raw.scheme() {
            Some(TEL_SCHEME) => telephone(uri, TEL_SCHEME),
            Some(TELPROMPT_SCHEME) => telephone(uri, TELPROMPT_SCHEME),
            Some(MAILTO_SCHEME) => ClassifiedUrl::Email {
                address: truncate(uri, EMAIL_MAX_LENGTH),
            },
            Some(SMS_SCHEME) => sms(uri, SMS_SCHEME),
            Some(SMSTO_SCHEME) => sms(uri, SMSTO_SCHEME),
            Some(HTTP_SCHEME | HTTPS_SCHEME) => match self.extract_tracking_target(&raw) {
                Some(url) => ClassifiedUrl::ExtractedTrackingLink { url },
                None => self.resolve_app_link(uri),
            },
            Some(DATA_SCHEME) => self.resolve_app_link(uri),
            Some(ABOUT_SCHEME) => ClassifiedUrl::Unknown {
                uri: uri.to_string(),
            },
            Some(JAVASCRIPT_SCHEME) | None => search(uri),
            Some(scheme) if VALID_SCHEME.is_match(scheme) => self.resolve_custom_scheme(uri),
            Some(_) => search(uri),
        };
        debug!(kind = result.kind(), "classified navigation URI");
        result
    }

    fn resolve_app_link(&self, uri: &str) -> ClassifiedUrl {
        match self.try_resolve_app_link(uri) {
            Ok(result) => result,
            Err(Error::UriSyntax { reason, .. }) => {
                debug!(%reason, "unparseable app link");
                ClassifiedUrl::Unknown {
                    uri: uri.to_string(),
                }
            }
            Err(Error::CapabilityUnavailable { required, actual }) => {
                debug!(required, actual, "handler query unavailable, loading as web");
                web(uri)
            }
            Err(e) => {
                warn!(error = %e, "app link resolution failed, loading as web");
                web(uri)
            }
        }
    }

    fn try_resolve_app_link(&self, uri: &str) -> Result<ClassifiedUrl> {
        let actual = self.resolver.sdk_level();
        let required = self.config.min_app_link_sdk;
        if actual < required {
            return Err(Error::CapabilityUnavailable { required, actual });
        }

        let mut browsable = Intent::parse_uri(uri)?;
        browsable.add_category(CATEGORY_BROWSABLE);
        let activities = self.resolver.query_handlers(&browsable)?;

        let non_browsers: Vec<_> = activities
            .iter()
            .filter(|a| a.is_generic_browser() == Some(false))
            .collect();

        if let [single] = non_browsers.as_slice() {
            let mut intent = Intent::parse_uri(uri)?;
            intent.component = Some(single.component.clone());
            return Ok(ClassifiedUrl::AppLink(AppLink {
                intent: Some(intent),
                excluded_components: None,
                uri: uri.to_string(),
            }));
        }

        let browsers = activities
            .iter()
            .filter(|a| a.is_generic_browser() == Some(true))
            .map(|a| a.component.clone())
            .collect();
        Ok(ClassifiedUrl::AppLink(AppLink {
            intent: None,
            excluded_components: Some(browsers),
            uri: uri.to_string(),
        }))
    }

    fn resolve_custom_scheme(&self, uri: &str) -> ClassifiedUrl {
        match self.build_non_http_app_link(uri) {
            Ok(link) => ClassifiedUrl::NonHttpAppLink(link),
            Err(e) => {
                debug!(error = %e, "custom scheme is not a launchable intent");
                ClassifiedUrl::Unknown {
                    uri: uri.to_string(),
                }
            }
        }
    }

    fn build_non_http_app_link(&self, uri: &str) -> Result<NonHttpAppLink> {
        let mut intent = Intent::parse_uri(uri)?;
        intent.add_category(CATEGORY_BROWSABLE);
        intent.add_flags(FLAG_ACTIVITY_NEW_TASK);

        let fallback_url = intent
            .string_extra(EXTRA_BROWSER_FALLBACK_URL)
            .map(str::to_string)
            .or_else(|| self.deeplink_param(uri, |d| &d.url_param));
        let title = intent
            .string_extra(EXTRA_BROWSER_FALLBACK_TITLE)
            .map(str::to_string)
            .or_else(|| self.deeplink_param(uri, |d| &d.title_param));

        let fallback_intent = match fallback_url.as_deref() {
            Some(url) if self.is_web_destination(url) => Some(Intent::parse_uri(url)?),
            _ => None,
        };

        Ok(NonHttpAppLink {
            uri: uri.to_string(),
            intent,
            fallback_url,
            title,
            fallback_intent,
        })
    }

    fn deeplink_param(
        &self,
        uri: &str,
        param: impl Fn(&crate::config::DeeplinkConfig) -> &String,
    ) -> Option<String> {
        let deeplink = self.config.deeplink_for(uri)?;
        RawUri::parse(uri)
            .query_parameter(param(deeplink))
            .filter(|v| !v.is_empty())
    }

    /// A genuine http(s) address that would load as a page.
    fn is_web_destination(&self, url: &str) -> bool {
        matches!(RawUri::parse(url).scheme(), Some(HTTP_SCHEME | HTTPS_SCHEME))
            && self.classify(url).is_page_load()
    }

    fn extract_tracking_target(&self, raw: &RawUri<'_>) -> Option<String> {
        if self.config.tracking_redirects.is_empty() {
            return None;
        }
        let host = raw.host()?.to_ascii_lowercase();
        let path = raw.path().unwrap_or_default();

        self.config.tracking_redirects.iter().find_map(|rule| {
            let rule_host = rule.host.to_ascii_lowercase();
            let host_matches = host == rule_host || host.ends_with(&format!(".{rule_host}"));
            if !host_matches || path != rule.path {
                return None;
            }
            let target = raw.query_parameter(&rule.param)?;
            let parsed = Url::parse(&target).ok()?;
            matches!(parsed.scheme(), HTTP_SCHEME | HTTPS_SCHEME).then_some(target)
        })
    }
}

fn telephone(uri: &str, scheme: &str) -> ClassifiedUrl {
    ClassifiedUrl::Telephone {
        number: truncate(strip_scheme(uri, scheme), PHONE_MAX_LENGTH),
    }
}

fn sms(uri: &str, scheme: &str) -> ClassifiedUrl {
    ClassifiedUrl::Sms {
        number: truncate(strip_scheme(uri, scheme), SMS_MAX_LENGTH),
    }
}

fn strip_scheme<'a>(uri: &'a str, scheme: &str) -> &'a str {
    uri.strip_prefix(scheme)
        .and_then(|rest| rest.strip_prefix(':'))
        .unwrap_or(uri)
}

fn search(uri: &str) -> ClassifiedUrl {
    ClassifiedUrl::SearchQuery {
        query: uri.to_string(),
    }
}

fn web(uri: &str) -> ClassifiedUrl {
    ClassifiedUrl::Web {
        address: uri.to_string(),
    }
}

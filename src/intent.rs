//! Launchable intent descriptors and the `intent:` URI grammar.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::uri::RawUri;

pub const ACTION_VIEW: &str = "android.intent.action.VIEW";
pub const ACTION_DIAL: &str = "android.intent.action.DIAL";
pub const ACTION_SENDTO: &str = "android.intent.action.SENDTO";
pub const ACTION_GET_CONTENT: &str = "android.intent.action.GET_CONTENT";

pub const CATEGORY_BROWSABLE: &str = "android.intent.category.BROWSABLE";
pub const CATEGORY_OPENABLE: &str = "android.intent.category.OPENABLE";

pub const FLAG_ACTIVITY_NEW_TASK: u32 = 0x1000_0000;

pub const EXTRA_BROWSER_FALLBACK_URL: &str = "browser_fallback_url";
pub const EXTRA_BROWSER_FALLBACK_TITLE: &str = "browser_fallback_title";
pub const EXTRA_ALLOW_MULTIPLE: &str = "android.intent.extra.ALLOW_MULTIPLE";

const INTENT_SCHEME: &str = "intent:";
const INTENT_FRAGMENT: &str = "Intent;";
const ANDROID_APP_SCHEME: &str = "android-app:";

/// Fully-qualified activity: package plus class.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentName {
    pub package: String,
    pub class: String,
}

impl ComponentName {
    pub fn new(package: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            class: class.into(),
        }
    }

    /// `pkg/cls`, with `pkg/.Cls` expanding to `pkg/pkg.Cls`.
    pub fn unflatten(s: &str) -> Option<Self> {
        let (package, class) = s.split_once('/')?;
        if package.is_empty() || class.is_empty() {
            return None;
        }
        let class = if class.starts_with('.') {
            format!("{package}{class}")
        } else {
            class.to_string()
        };
        Some(Self::new(package, class))
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package, self.class)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub action: Option<String>,
    pub data: Option<String>,
    pub mime_type: Option<String>,
    pub categories: BTreeSet<String>,
    pub flags: u32,
    pub package: Option<String>,
    pub component: Option<ComponentName>,
    /// Extras, kept in their textual form.
    pub extras: BTreeMap<String, String>,
}

impl Intent {
    pub fn new(action: &str) -> Self {
        Self {
            action: Some(action.to_string()),
            ..Self::default()
        }
    }

    pub fn view(data: impl Into<String>) -> Self {
        Self::new(ACTION_VIEW).with_data(data)
    }

    pub fn dial(number: &str) -> Self {
        Self::new(ACTION_DIAL).with_data(format!("tel:{number}"))
    }

    pub fn send_to(uri: impl Into<String>) -> Self {
        Self::new(ACTION_SENDTO).with_data(uri)
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn add_category(&mut self, category: &str) {
        self.categories.insert(category.to_string());
    }

    pub fn add_flags(&mut self, flags: u32) {
        self.flags |= flags;
    }

    pub fn put_extra(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extras.insert(key.into(), value.into());
    }

    /// Non-empty string extra.
    pub fn string_extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Parse a navigation URI into an intent.
    ///
    /// `android-app://` URIs are parsed on their own. Any other URI whose
    /// last fragment starts with `Intent;` carries `key=value;...;end`
    /// tokens; `scheme=` only applies to `intent:` URIs. Everything else is
    /// a plain `VIEW` of the URI.
    pub fn parse_uri(uri: &str) -> Result<Self> {
        if uri.starts_with(ANDROID_APP_SCHEME) {
            return parse_android_app(uri);
        }
        parse_intent_fragment(uri)
    }
}

fn parse_intent_fragment(uri: &str) -> Result<Intent> {
    let Some(hash) = uri.rfind('#') else {
        return Ok(Intent::view(uri));
    };
    let Some(tokens) = uri[hash + 1..].strip_prefix(INTENT_FRAGMENT) else {
        return Ok(Intent::view(uri));
    };

    let mut intent = Intent::default();
    let scheme = apply_fragment_tokens(uri, tokens, &mut intent)?;

    let data = &uri[..hash];
    intent.data = match data.strip_prefix(INTENT_SCHEME) {
        Some("") => None,
        Some(rest) => Some(match scheme {
            Some(s) => format!("{s}:{rest}"),
            None => rest.to_string(),
        }),
        None if data.is_empty() => None,
        None => Some(data.to_string()),
    };
    if intent.action.is_none() {
        intent.action = Some(ACTION_VIEW.to_string());
    }
    Ok(intent)
}

fn parse_android_app(uri: &str) -> Result<Intent> {
    let raw = RawUri::parse(uri);
    let package = raw.authority().unwrap_or_default();
    if package.is_empty() {
        return Err(Error::syntax(uri, "android-app URI without a package"));
    }

    let mut intent = Intent::new(ACTION_VIEW);
    intent.package = Some(package.to_string());

    let mut segments = raw
        .path()
        .unwrap_or_default()
        .split('/')
        .filter(|s| !s.is_empty());
    if let Some(scheme) = segments.next() {
        let mut data = format!("{scheme}:");
        if let Some(host) = segments.next() {
            data.push_str("//");
            data.push_str(host);
            for seg in segments {
                data.push('/');
                data.push_str(seg);
            }
        }
        if let Some(q) = raw.query() {
            data.push('?');
            data.push_str(q);
        }
        intent.data = Some(data);
    }

    if let Some(tokens) = raw.fragment().and_then(|f| f.strip_prefix(INTENT_FRAGMENT)) {
        // A scheme token cannot override the one carried in the path.
        apply_fragment_tokens(uri, tokens, &mut intent)?;
    }
    Ok(intent)
}

/// Apply `key=value;...;end` tokens. Returns the `scheme=` token if present.
fn apply_fragment_tokens(uri: &str, tokens: &str, intent: &mut Intent) -> Result<Option<String>> {
    let mut scheme = None;
    let mut terminated = false;

    for token in tokens.split(';') {
        if token == "end" {
            terminated = true;
            break;
        }
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| Error::syntax(uri, format!("malformed token {token:?}")))?;
        let value = decode(uri, value)?;

        match key {
            "action" => intent.action = Some(value),
            "category" => intent.add_category(&value),
            "type" => intent.mime_type = Some(value),
            "launchFlags" => intent.flags = parse_flags(uri, &value)?,
            "package" => intent.package = Some(value),
            "component" => {
                let component = ComponentName::unflatten(&value)
                    .ok_or_else(|| Error::syntax(uri, format!("bad component {value:?}")))?;
                intent.component = Some(component);
            }
            "scheme" => scheme = Some(value),
            "sourceBounds" | "selector" => {}
            _ => {
                let (kind, name) = key
                    .split_once('.')
                    .ok_or_else(|| Error::syntax(uri, format!("unknown token {key:?}")))?;
                check_extra(uri, kind, &value)?;
                intent.put_extra(decode(uri, name)?, value);
            }
        }
    }

    if !terminated {
        return Err(Error::syntax(uri, "intent fragment is missing `end`"));
    }
    Ok(scheme)
}

fn check_extra(uri: &str, kind: &str, value: &str) -> Result<()> {
    let ok = match kind {
        "S" => true,
        // Anything other than `true` (any case) reads as false.
        "B" => true,
        "b" => value.parse::<i8>().is_ok(),
        "c" => value.chars().count() == 1,
        "d" => value.parse::<f64>().is_ok(),
        "f" => value.parse::<f32>().is_ok(),
        "i" => value.parse::<i32>().is_ok(),
        "l" => value.parse::<i64>().is_ok(),
        "s" => value.parse::<i16>().is_ok(),
        _ => return Err(Error::syntax(uri, format!("unknown extra type {kind:?}"))),
    };
    if ok {
        Ok(())
    } else {
        Err(Error::syntax(uri, format!("bad {kind} extra {value:?}")))
    }
}

fn parse_flags(uri: &str, value: &str) -> Result<u32> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => value.parse::<i32>().ok().map(|v| v as u32),
    };
    parsed.ok_or_else(|| Error::syntax(uri, format!("bad launchFlags {value:?}")))
}

fn decode(uri: &str, s: &str) -> Result<String> {
    percent_decode_str(s)
        .decode_utf8()
        .map(|v| v.into_owned())
        .map_err(|_| Error::syntax(uri, "invalid percent-encoding"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_uri_is_a_view() {
        let intent = Intent::parse_uri("https://example.com/a").unwrap();
        assert_eq!(intent.action.as_deref(), Some(ACTION_VIEW));
        assert_eq!(intent.data.as_deref(), Some("https://example.com/a"));
        assert!(intent.component.is_none());
    }

    #[test]
    fn intent_scheme_with_fragment() {
        let uri = "intent://scan/#Intent;scheme=zxing;package=com.google.zxing.client.android;\
                   S.browser_fallback_url=https%3A%2F%2Fexample.com%2Fscan;end";
        let intent = Intent::parse_uri(uri).unwrap();
        assert_eq!(intent.data.as_deref(), Some("zxing://scan/"));
        assert_eq!(intent.package.as_deref(), Some("com.google.zxing.client.android"));
        assert_eq!(
            intent.string_extra(EXTRA_BROWSER_FALLBACK_URL),
            Some("https://example.com/scan")
        );
        assert_eq!(intent.action.as_deref(), Some(ACTION_VIEW));
    }

    #[test]
    fn component_shorthand_and_flags() {
        let uri = "intent:#Intent;component=com.app/.Main;launchFlags=0x10000000;i.count=3;end";
        let intent = Intent::parse_uri(uri).unwrap();
        assert_eq!(intent.component, Some(ComponentName::new("com.app", "com.app.Main")));
        assert_eq!(intent.flags, FLAG_ACTIVITY_NEW_TASK);
        assert_eq!(intent.extras.get("count").map(String::as_str), Some("3"));
        assert!(intent.data.is_none());
    }

    #[test]
    fn malformed_fragments_are_syntax_errors() {
        for uri in [
            "intent://x#Intent;scheme=a",
            "intent://x#Intent;garbage;end",
            "intent://x#Intent;i.n=abc;end",
            "intent://x#Intent;component=nopackage;end",
            "intent://x#Intent;launchFlags=zz;end",
            "intent://x#Intent;Q.k=v;end",
        ] {
            assert!(
                matches!(Intent::parse_uri(uri), Err(Error::UriSyntax { .. })),
                "{uri} should fail"
            );
        }
    }

    #[test]
    fn custom_scheme_with_intent_fragment() {
        let uri = "myapp://open#Intent;scheme=other;S.browser_fallback_url=https%3A%2F%2Fexample.com%2Ff;end";
        let intent = Intent::parse_uri(uri).unwrap();
        assert_eq!(intent.data.as_deref(), Some("myapp://open"));
        assert_eq!(intent.string_extra(EXTRA_BROWSER_FALLBACK_URL), Some("https://example.com/f"));
        assert_eq!(intent.action.as_deref(), Some(ACTION_VIEW));

        assert!(Intent::parse_uri("myapp://open#Intent;garbage").is_err());
        // an ordinary fragment is left in the data
        let intent = Intent::parse_uri("https://example.com/a#top").unwrap();
        assert_eq!(intent.data.as_deref(), Some("https://example.com/a#top"));
    }

    #[test]
    fn boolean_extras_accept_any_value() {
        for value in ["true", "TRUE", "True", "1", "no"] {
            let intent = Intent::parse_uri(&format!("intent://x#Intent;B.flag={value};end")).unwrap();
            assert_eq!(intent.extras.get("flag").map(String::as_str), Some(value));
        }
    }

    #[test]
    fn intent_without_fragment_falls_back_to_view() {
        let intent = Intent::parse_uri("intent://x").unwrap();
        assert_eq!(intent.data.as_deref(), Some("intent://x"));
    }

    #[test]
    fn android_app_uri() {
        let intent = Intent::parse_uri("android-app://com.example/https/example.com/deep?id=2").unwrap();
        assert_eq!(intent.package.as_deref(), Some("com.example"));
        assert_eq!(intent.data.as_deref(), Some("https://example.com/deep?id=2"));

        assert!(Intent::parse_uri("android-app:///https/x").is_err());
    }

    #[test]
    fn builders() {
        assert_eq!(Intent::dial("+1").data.as_deref(), Some("tel:+1"));
        let mut i = Intent::send_to("mailto:a@b.com");
        i.add_category(CATEGORY_BROWSABLE);
        i.add_flags(FLAG_ACTIVITY_NEW_TASK);
        assert!(i.categories.contains(CATEGORY_BROWSABLE));
        assert_eq!(i.flags, FLAG_ACTIVITY_NEW_TASK);
        assert_eq!(ComponentName::new("p", "p.C").to_string(), "p/p.C");
    }
}

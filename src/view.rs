//! The browser view seam and the conveniences layered on top of it.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;
use url::Url;

use crate::allow_list::PermittedHostnameSet;

pub type Headers = HashMap<String, String>;

/// What the interceptor and [`HostedView`] need from the engine's view.
pub trait BrowserView {
    fn load_url(&mut self, url: &str);

    fn load_url_with_headers(&mut self, url: &str, headers: &Headers);

    fn load_data_with_base_url(
        &mut self,
        _base_url: Option<&str>,
        _data: &str,
        _mime_type: &str,
        _encoding: Option<&str>,
        _history_url: Option<&str>,
    ) {
    }

    /// URL of the last navigation that successfully started.
    fn original_url(&self) -> Option<String>;

    fn can_go_back(&self) -> bool {
        false
    }

    fn go_back(&mut self) {}
}

/// A [`BrowserView`] with an allow-list and sticky request headers.
pub struct HostedView<V> {
    view: V,
    permitted: PermittedHostnameSet,
    headers: Headers,
}

impl<V: BrowserView> HostedView<V> {
    pub fn new(view: V) -> Self {
        Self {
            view,
            permitted: PermittedHostnameSet::new(),
            headers: Headers::new(),
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn into_inner(self) -> V {
        self.view
    }

    pub fn add_http_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    pub fn remove_http_header(&mut self, name: &str) {
        self.headers.remove(name);
    }

    pub fn http_headers(&self) -> &Headers {
        &self.headers
    }

    pub fn add_permitted_hostname(&mut self, hostname: impl Into<String>) {
        self.permitted.add(hostname);
    }

    pub fn add_permitted_hostnames<I, S>(&mut self, hostnames: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permitted.extend(hostnames);
    }

    pub fn remove_permitted_hostname(&mut self, hostname: &str) {
        self.permitted.remove(hostname);
    }

    pub fn clear_permitted_hostnames(&mut self) {
        self.permitted.clear();
    }

    pub fn permitted_hostnames(&self) -> &[String] {
        self.permitted.as_slice()
    }

    pub fn is_permitted_url(&self, url: &str) -> bool {
        self.permitted.is_permitted(Some(url))
    }

    /// Loads with the stored headers, if any.
    pub fn load_url(&mut self, url: &str) {
        if self.headers.is_empty() {
            self.view.load_url(url);
        } else {
            self.view.load_url_with_headers(url, &self.headers);
        }
    }

    /// Stored headers win over `extra` on name clashes.
    pub fn load_url_with_headers(&mut self, url: &str, extra: &Headers) {
        let mut merged = extra.clone();
        merged.extend(self.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.view.load_url_with_headers(url, &merged);
    }

    /// `headers` replace the stored ones when non-empty.
    pub fn load_url_with(&mut self, url: &str, prevent_caching: bool, headers: &Headers) {
        let url = if prevent_caching {
            make_url_unique(url, now_millis())
        } else {
            url.to_string()
        };
        let headers = if headers.is_empty() { &self.headers } else { headers };
        debug!(%url, headers = headers.len(), "loading");
        let headers = headers.clone();
        self.load_url_with_headers(&url, &headers);
    }

    pub fn load_html(&mut self, html: &str, base_url: Option<&str>, history_url: Option<&str>, encoding: Option<&str>) {
        self.view.load_data_with_base_url(
            base_url,
            html,
            "text/html",
            Some(encoding.unwrap_or("utf-8")),
            history_url,
        );
    }

    /// Goes back if possible. True means the caller should handle back itself.
    pub fn on_back_pressed(&mut self) -> bool {
        if self.view.can_go_back() {
            self.view.go_back();
            false
        } else {
            true
        }
    }
}

/// Appends a throwaway `nonce=1` query parameter so caches miss.
pub fn make_url_unique(url: &str, nonce: u128) -> String {
    let mut unique = String::with_capacity(url.len() + 24);
    unique.push_str(url);
    if url.contains('?') {
        unique.push('&');
    } else {
        if url.rfind('/').map_or(true, |i| i <= 7) {
            unique.push('/');
        }
        unique.push('?');
    }
    unique.push_str(&nonce.to_string());
    unique.push_str("=1");
    unique
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Rewrites a user agent so sites serve (or stop serving) the desktop layout.
pub fn desktop_user_agent(user_agent: &str, enabled: bool) -> String {
    if enabled {
        user_agent.replace("Mobile", "eliboM").replace("Android", "diordnA")
    } else {
        user_agent.replace("eliboM", "Mobile").replace("diordnA", "Android")
    }
}

pub(crate) fn append_query_parameter(url: &str, name: &str, value: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.query_pairs_mut().append_pair(name, value);
            parsed.to_string()
        }
        Err(_) => {
            let sep = if url.contains('?') { '&' } else { '?' };
            let encoded: String = url::form_urlencoded::Serializer::new(String::new())
                .append_pair(name, value)
                .finish();
            format!("{url}{sep}{encoded}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeView {
        loads: Vec<(String, Headers)>,
        html: Option<String>,
        history: usize,
    }

    impl BrowserView for FakeView {
        fn load_url(&mut self, url: &str) {
            self.loads.push((url.to_string(), Headers::new()));
        }

        fn load_url_with_headers(&mut self, url: &str, headers: &Headers) {
            self.loads.push((url.to_string(), headers.clone()));
        }

        fn load_data_with_base_url(
            &mut self,
            _base_url: Option<&str>,
            data: &str,
            mime_type: &str,
            _encoding: Option<&str>,
            _history_url: Option<&str>,
        ) {
            assert_eq!(mime_type, "text/html");
            self.html = Some(data.to_string());
        }

        fn original_url(&self) -> Option<String> {
            self.loads.last().map(|(u, _)| u.clone())
        }

        fn can_go_back(&self) -> bool {
            self.history > 0
        }

        fn go_back(&mut self) {
            self.history -= 1;
        }
    }

    #[test]
    fn stored_headers_are_injected() {
        let mut v = HostedView::new(FakeView::default());
        v.load_url("https://a.test/");
        v.add_http_header("X-Client", "guard");
        v.load_url("https://b.test/");
        v.remove_http_header("X-Client");
        v.load_url("https://c.test/");

        let loads = &v.view().loads;
        assert!(loads[0].1.is_empty());
        assert_eq!(loads[1].1.get("X-Client").map(String::as_str), Some("guard"));
        assert!(loads[2].1.is_empty());
    }

    #[test]
    fn stored_headers_override_extra() {
        let mut v = HostedView::new(FakeView::default());
        v.add_http_header("A", "stored");
        let extra: Headers = [("A".to_string(), "extra".to_string()), ("B".to_string(), "b".to_string())]
            .into_iter()
            .collect();
        v.load_url_with_headers("https://a.test/", &extra);
        let sent = &v.view().loads[0].1;
        assert_eq!(sent.get("A").map(String::as_str), Some("stored"));
        assert_eq!(sent.get("B").map(String::as_str), Some("b"));
    }

    #[test]
    fn cache_busting_load() {
        let mut v = HostedView::new(FakeView::default());
        v.load_url_with("https://a.test/page?x=1", true, &Headers::new());
        let (url, _) = &v.view().loads[0];
        assert!(url.starts_with("https://a.test/page?x=1&"));
        assert!(url.ends_with("=1"));
    }

    #[test]
    fn unique_urls() {
        assert_eq!(make_url_unique("https://a.test/p?x=1", 42), "https://a.test/p?x=1&42=1");
        assert_eq!(make_url_unique("https://a.test", 42), "https://a.test/?42=1");
        assert_eq!(make_url_unique("https://a.test/page", 42), "https://a.test/page?42=1");
    }

    #[test]
    fn back_navigation() {
        let mut v = HostedView::new(FakeView {
            history: 1,
            ..Default::default()
        });
        assert!(!v.on_back_pressed());
        assert!(v.on_back_pressed());
    }

    #[test]
    fn allow_list_management() {
        let mut v = HostedView::new(FakeView::default());
        v.add_permitted_hostname("example.com");
        v.add_permitted_hostnames(["example.org"]);
        assert!(v.is_permitted_url("https://www.example.org/"));
        v.remove_permitted_hostname("example.org");
        assert_eq!(v.permitted_hostnames(), ["example.com"]);
        v.clear_permitted_hostnames();
        assert!(!v.is_permitted_url("https://example.com/"));
    }

    #[test]
    fn html_passthrough() {
        let mut v = HostedView::new(FakeView::default());
        v.load_html("<p>hi</p>", None, None, None);
        assert_eq!(v.view().html.as_deref(), Some("<p>hi</p>"));
    }

    #[test]
    fn desktop_mode_round_trips() {
        let ua = "Mozilla/5.0 (Linux; Android 14) Mobile Safari";
        let desktop = desktop_user_agent(ua, true);
        assert!(!desktop.contains("Mobile"));
        assert!(!desktop.contains("Android"));
        assert_eq!(desktop_user_agent(&desktop, false), ua);
    }

    #[test]
    fn query_parameter_appending() {
        assert_eq!(
            append_query_parameter("https://a.test/x?y=1", "title", "A B"),
            "https://a.test/x?y=1&title=A+B"
        );
    }
}

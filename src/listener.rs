//! Callbacks from the interceptor to the embedding application.

use std::fmt;

use tracing::{debug, warn};

use crate::classifier::{AppLink, NonHttpAppLink};
use crate::intent::Intent;
use crate::resolver::IntentLauncher;
use crate::view::append_query_parameter;

/// Proceed/cancel handle for a TLS certificate problem.
pub trait SslErrorHandler {
    fn proceed(&mut self);
    fn cancel(&mut self);
}

/// Credentials/cancel handle for an HTTP auth challenge.
pub trait HttpAuthHandler {
    fn proceed(&mut self, username: &str, password: &str);
    fn cancel(&mut self);
}

/// Certificate problem reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SslError {
    pub url: String,
    pub primary_error: i32,
}

impl fmt::Display for SslError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ssl error {} on {}", self.primary_error, self.url)
    }
}

/// Everything the interceptor may ask the host application to do.
///
/// Every method has a safe default: no-op for notifications, cancel for
/// challenges, decline for app links.
pub trait WebViewListener {
    fn handle_telephone(&mut self, _number: &str) {}

    fn handle_email(&mut self, _address: &str) {}

    fn handle_sms(&mut self, _number: &str) {}

    /// Returns true when the app link was handled and the load should stop.
    fn handle_app_link(&mut self, _link: &AppLink) -> bool {
        false
    }

    /// The return value is the intercept decision, unchanged.
    fn handle_non_http_app_link(&mut self, _link: &NonHttpAppLink) -> bool {
        true
    }

    fn on_page_started(&mut self, _url: Option<&str>) {}

    fn on_received_error(&mut self, _error_code: i32, _description: Option<&str>, _failing_url: Option<&str>) {}

    /// `error_code` is the last error seen since the previous page finished, or -1.
    fn on_page_finished(&mut self, _error_code: i32, _url: Option<&str>) {}

    fn on_ssl_error(&mut self, handler: &mut dyn SslErrorHandler, _error: &SslError) {
        handler.cancel();
    }

    fn on_http_auth_request(&mut self, _host: Option<&str>, _realm: Option<&str>, handler: &mut dyn HttpAuthHandler) {
        handler.cancel();
    }

    /// True when the host recovered from the render process going away.
    fn on_render_process_gone(&mut self) -> bool {
        true
    }
}

type Navigate = Box<dyn FnMut(&str)>;
type Notice = Box<dyn FnMut(&str)>;

/// Stock listener that turns classifications into platform intents.
pub struct LaunchingListener<L> {
    launcher: L,
    navigate: Navigate,
    notice: Notice,
}

impl<L: IntentLauncher> LaunchingListener<L> {
    /// `navigate` loads a fallback page; `notice` shows a short message.
    pub fn new(launcher: L, navigate: impl FnMut(&str) + 'static, notice: impl FnMut(&str) + 'static) -> Self {
        Self {
            launcher,
            navigate: Box::new(navigate),
            notice: Box::new(notice),
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    fn launch(&mut self, intent: &Intent) {
        if !self.launcher.start(intent) {
            warn!(action = ?intent.action, "no application accepted intent");
            (self.notice)("No application can perform this action");
        }
    }
}

impl<L: IntentLauncher> WebViewListener for LaunchingListener<L> {
    fn handle_telephone(&mut self, number: &str) {
        self.launch(&Intent::dial(number));
    }

    fn handle_email(&mut self, address: &str) {
        self.launch(&Intent::send_to(address));
    }

    fn handle_sms(&mut self, number: &str) {
        self.launch(&Intent::send_to(format!("smsto:{number}")));
    }

    fn handle_app_link(&mut self, link: &AppLink) -> bool {
        match &link.intent {
            Some(intent) => self.launcher.start(intent),
            None => false,
        }
    }

    fn handle_non_http_app_link(&mut self, link: &NonHttpAppLink) -> bool {
        if self.launcher.can_resolve(&link.intent) && self.launcher.start(&link.intent) {
            debug!(uri = %link.uri, "opened deep link in external app");
            return true;
        }
        match &link.fallback_url {
            Some(url) => {
                let target = match &link.title {
                    Some(title) => append_query_parameter(url, "title", title),
                    None => url.clone(),
                };
                debug!(%target, "deep link unresolved, loading fallback");
                (self.navigate)(&target);
            }
            None => (self.notice)("Unable to open"),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::intent::ComponentName;

    #[derive(Default)]
    struct FakeLauncher {
        resolvable: bool,
        started: RefCell<Vec<Intent>>,
    }

    impl IntentLauncher for FakeLauncher {
        fn start(&self, intent: &Intent) -> bool {
            self.started.borrow_mut().push(intent.clone());
            self.resolvable
        }

        fn can_resolve(&self, _intent: &Intent) -> bool {
            self.resolvable
        }
    }

    struct Silent;
    impl WebViewListener for Silent {}

    #[derive(Default)]
    struct Handles {
        cancelled: bool,
    }

    impl SslErrorHandler for Handles {
        fn proceed(&mut self) {}
        fn cancel(&mut self) {
            self.cancelled = true;
        }
    }

    impl HttpAuthHandler for Handles {
        fn proceed(&mut self, _: &str, _: &str) {}
        fn cancel(&mut self) {
            self.cancelled = true;
        }
    }

    fn recording(resolvable: bool) -> (LaunchingListener<FakeLauncher>, Rc<RefCell<Vec<String>>>, Rc<RefCell<Vec<String>>>) {
        let navigated = Rc::new(RefCell::new(Vec::new()));
        let notices = Rc::new(RefCell::new(Vec::new()));
        let (n, m) = (navigated.clone(), notices.clone());
        let listener = LaunchingListener::new(
            FakeLauncher {
                resolvable,
                ..Default::default()
            },
            move |url| n.borrow_mut().push(url.to_string()),
            move |msg| m.borrow_mut().push(msg.to_string()),
        );
        (listener, navigated, notices)
    }

    fn deep_link(fallback: Option<&str>, title: Option<&str>) -> NonHttpAppLink {
        NonHttpAppLink {
            uri: "myapp://open".into(),
            intent: Intent::view("myapp://open"),
            fallback_url: fallback.map(str::to_string),
            title: title.map(str::to_string),
            fallback_intent: fallback.map(Intent::view),
        }
    }

    #[test]
    fn defaults_are_safe() {
        let mut l = Silent;
        let link = AppLink {
            intent: None,
            excluded_components: Some(vec![]),
            uri: "https://x".into(),
        };
        assert!(!l.handle_app_link(&link));
        assert!(l.handle_non_http_app_link(&deep_link(None, None)));
        assert!(l.on_render_process_gone());

        let mut h = Handles::default();
        l.on_ssl_error(&mut h, &SslError { url: "https://x".into(), primary_error: 3 });
        assert!(h.cancelled);

        let mut h = Handles::default();
        l.on_http_auth_request(Some("x"), None, &mut h);
        assert!(h.cancelled);
    }

    #[test]
    fn dial_and_compose_intents() {
        let (mut l, _, notices) = recording(true);
        l.handle_telephone("+1-555");
        l.handle_email("mailto:a@b.com");
        l.handle_sms("555");
        let started = l.launcher().started.borrow();
        assert_eq!(started[0], Intent::dial("+1-555"));
        assert_eq!(started[1], Intent::send_to("mailto:a@b.com"));
        assert_eq!(started[2], Intent::send_to("smsto:555"));
        assert!(notices.borrow().is_empty());
    }

    #[test]
    fn unhandled_dial_posts_notice() {
        let (mut l, _, notices) = recording(false);
        l.handle_telephone("1");
        assert_eq!(notices.borrow().len(), 1);
    }

    #[test]
    fn app_link_launches_targeted_intent_only() {
        let (mut l, _, _) = recording(true);
        let mut intent = Intent::view("https://shop.example.com/");
        intent.component = Some(ComponentName::new("com.shop", "com.shop.Deep"));
        let targeted = AppLink {
            intent: Some(intent),
            excluded_components: None,
            uri: "https://shop.example.com/".into(),
        };
        assert!(l.handle_app_link(&targeted));

        let untargeted = AppLink {
            intent: None,
            excluded_components: Some(vec![]),
            uri: "https://example.com/".into(),
        };
        assert!(!l.handle_app_link(&untargeted));
    }

    #[test]
    fn deep_link_opens_app_when_installed() {
        let (mut l, navigated, _) = recording(true);
        assert!(l.handle_non_http_app_link(&deep_link(Some("https://example.com/fallback"), None)));
        assert!(navigated.borrow().is_empty());
    }

    #[test]
    fn deep_link_falls_back_to_web_with_title() {
        let (mut l, navigated, _) = recording(false);
        assert!(l.handle_non_http_app_link(&deep_link(Some("https://example.com/fallback"), Some("Big Sale"))));
        assert_eq!(
            navigated.borrow().as_slice(),
            ["https://example.com/fallback?title=Big+Sale".to_string()]
        );
    }

    #[test]
    fn deep_link_without_fallback_posts_notice() {
        let (mut l, navigated, notices) = recording(false);
        assert!(l.handle_non_http_app_link(&deep_link(None, None)));
        assert!(navigated.borrow().is_empty());
        assert_eq!(notices.borrow().as_slice(), ["Unable to open".to_string()]);
    }
}

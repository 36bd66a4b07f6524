//! Per-navigation intercept decisions and page lifecycle forwarding.

use tracing::debug;

use crate::allow_list::PermittedHostnameSet;
use crate::classifier::{ClassifiedUrl, UrlClassifier};
use crate::listener::{HttpAuthHandler, SslError, SslErrorHandler, WebViewListener};
use crate::resolver::ActivityResolver;
use crate::view::BrowserView;

const NO_ERROR: i32 = -1;

/// Sits between the browser view's navigation callbacks and the host app.
///
/// Holds only the last error code and the last started URL. Both are
/// overwritten, never merged; callbacks are expected one at a time.
///
/// The host allow-list is consulted separately from classification, through
/// [`NavigationInterceptor::is_permitted_url`] (or `HostedView`, which keeps
/// its own list).
pub struct NavigationInterceptor<R> {
    classifier: UrlClassifier<R>,
    listener: Option<Box<dyn WebViewListener>>,
    permitted: PermittedHostnameSet,
    last_error_code: i32,
    last_page_started: Option<String>,
}

impl<R: ActivityResolver> NavigationInterceptor<R> {
    pub fn new(classifier: UrlClassifier<R>) -> Self {
        Self {
            classifier,
            listener: None,
            permitted: PermittedHostnameSet::new(),
            last_error_code: NO_ERROR,
            last_page_started: None,
        }
    }

    pub fn with_listener(mut self, listener: impl WebViewListener + 'static) -> Self {
        self.set_listener(Some(Box::new(listener)));
        self
    }

    pub fn set_listener(&mut self, listener: Option<Box<dyn WebViewListener>>) {
        self.listener = listener;
    }

    pub fn with_permitted_hostnames(mut self, permitted: PermittedHostnameSet) -> Self {
        self.permitted = permitted;
        self
    }

    pub fn permitted_hostnames_mut(&mut self) -> &mut PermittedHostnameSet {
        &mut self.permitted
    }

    /// Allow-list check; independent of how `url` classifies.
    pub fn is_permitted_url(&self, url: Option<&str>) -> bool {
        self.permitted.is_permitted(url)
    }

    pub fn classifier(&self) -> &UrlClassifier<R> {
        &self.classifier
    }

    pub fn last_page_started(&self) -> Option<&str> {
        self.last_page_started.as_deref()
    }

    /// True stops the default load.
    pub fn should_intercept(&mut self, view: &mut dyn BrowserView, uri: &str, is_main_frame: bool) -> bool {
        let classified = self.classifier.classify(uri);
        let intercept = self.dispatch(view, &classified, is_main_frame);
        debug!(kind = classified.kind(), is_main_frame, intercept, "navigation decision");
        intercept
    }

    fn dispatch(&mut self, view: &mut dyn BrowserView, classified: &ClassifiedUrl, is_main_frame: bool) -> bool {
        match classified {
            ClassifiedUrl::Email { address } => {
                if let Some(l) = self.listener.as_mut() {
                    l.handle_email(address);
                }
                true
            }
            ClassifiedUrl::Telephone { number } => {
                if let Some(l) = self.listener.as_mut() {
                    l.handle_telephone(number);
                }
                true
            }
            ClassifiedUrl::Sms { number } => {
                if let Some(l) = self.listener.as_mut() {
                    l.handle_sms(number);
                }
                true
            }
            ClassifiedUrl::AppLink(link) => self
                .listener
                .as_mut()
                .is_some_and(|l| l.handle_app_link(link)),
            ClassifiedUrl::NonHttpAppLink(link) => match self.listener.as_mut() {
                Some(l) => l.handle_non_http_app_link(link),
                None => true,
            },
            ClassifiedUrl::Unknown { .. } => {
                if let Some(url) = view.original_url() {
                    view.load_url(&url);
                }
                false
            }
            ClassifiedUrl::SearchQuery { .. } | ClassifiedUrl::Web { .. } => false,
            ClassifiedUrl::ExtractedTrackingLink { url } => {
                if is_main_frame {
                    view.load_url(url);
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn on_page_started(&mut self, url: Option<&str>) {
        self.last_page_started = url.map(str::to_string);
        if let Some(l) = self.listener.as_mut() {
            l.on_page_started(url);
        }
    }

    pub fn on_received_error(&mut self, error_code: i32, description: Option<&str>, failing_url: Option<&str>) {
        self.last_error_code = error_code;
        if let Some(l) = self.listener.as_mut() {
            l.on_received_error(error_code, description, failing_url);
        }
    }

    /// Reports the error seen since the last finish, then forgets it.
    pub fn on_page_finished(&mut self, url: Option<&str>) {
        let error_code = std::mem::replace(&mut self.last_error_code, NO_ERROR);
        if let Some(l) = self.listener.as_mut() {
            l.on_page_finished(error_code, url);
        }
    }

    pub fn on_render_process_gone(&mut self) -> bool {
        self.listener
            .as_mut()
            .map_or(true, |l| l.on_render_process_gone())
    }

    pub fn on_http_auth_request(&mut self, host: Option<&str>, realm: Option<&str>, handler: &mut dyn HttpAuthHandler) {
        match self.listener.as_mut() {
            Some(l) => l.on_http_auth_request(host, realm, handler),
            None => handler.cancel(),
        }
    }

    pub fn on_ssl_error(&mut self, handler: &mut dyn SslErrorHandler, error: &SslError) {
        match self.listener.as_mut() {
            Some(l) => l.on_ssl_error(handler, error),
            None => {
                debug!(%error, "no listener, cancelling");
                handler.cancel();
            }
        }
    }
}

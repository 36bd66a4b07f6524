//! WebView Guard
//!
//! Purpose:
//! - Classify every URL a web view is about to navigate to (web page, dial,
//!   SMS, mail, app link, deep link, search, tracking redirect, ignore)
//! - Decide whether the navigation is intercepted, and hand side effects to
//!   the host application
//! - Gate loads against a hostname allow-list
//! - Cross-platform via Rust core + FFI (C ABI and Android JNI)

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use tracing::warn;

pub mod allow_list;
pub mod chrome;
pub mod classifier;
pub mod config;
pub mod error;
pub mod intent;
pub mod interceptor;
pub mod listener;
pub mod resolver;
pub mod uri;
pub mod view;

pub use allow_list::PermittedHostnameSet;
pub use classifier::{AppLink, ClassifiedUrl, NonHttpAppLink, UrlClassifier};
pub use config::{ClassifierConfig, DeeplinkConfig, TrackingRedirect};
pub use error::{Error, Result};
pub use intent::{ComponentName, Intent};
pub use interceptor::NavigationInterceptor;
pub use listener::{LaunchingListener, WebViewListener};
pub use resolver::{ActivityResolver, HandlerRule, IntentLauncher, ResolvedActivity, StaticActivityResolver};
pub use view::{BrowserView, HostedView};

// -----------------------------------------------------------------------------
// JSON entry points shared by the C and JNI bindings
// -----------------------------------------------------------------------------

/// Classify `uri` with JSON-encoded config and handler table. Bad JSON
/// degrades to defaults.
pub fn classify_json(uri: &str, config_json: &str, handlers_json: &str) -> String {
    let config = ClassifierConfig::from_json(config_json).unwrap_or_else(|e| {
        warn!(error = %e, "config JSON rejected, using defaults");
        ClassifierConfig::default()
    });
    let resolver = StaticActivityResolver::from_json(handlers_json).unwrap_or_else(|e| {
        warn!(error = %e, "handler table JSON rejected, using an empty table");
        StaticActivityResolver::default()
    });

    let classified = UrlClassifier::new(resolver, config).classify(uri);
    serde_json::to_string(&classified).unwrap_or_else(|_| fallback_json(uri))
}

/// Allow-list check against a JSON array of hostnames.
pub fn is_permitted_url_json(url: &str, hostnames_json: &str) -> bool {
    match serde_json::from_str::<PermittedHostnameSet>(hostnames_json) {
        Ok(set) => set.is_permitted(Some(url)),
        Err(e) => {
            warn!(error = %e, "hostname list JSON rejected");
            false
        }
    }
}

fn fallback_json(uri: &str) -> String {
    serde_json::json!({ "Unknown": { "uri": uri } }).to_string()
}

// -----------------------------------------------------------------------------
// C FFI
// -----------------------------------------------------------------------------

fn c_str(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

fn into_c_string(s: String) -> *mut c_char {
    // serde_json never emits NUL bytes; keep a constant fallback anyway.
    CString::new(s)
        .unwrap_or_else(|_| CString::from(c"{\"Unknown\":{\"uri\":\"\"}}"))
        .into_raw()
}

/// Returns a JSON `ClassifiedUrl`. Free with [`wvg_free_string`].
#[unsafe(no_mangle)]
pub extern "C" fn wvg_classify_json(
    uri: *const c_char,
    config_json: *const c_char,
    handlers_json: *const c_char,
) -> *mut c_char {
    let json = classify_json(&c_str(uri), &c_str(config_json), &c_str(handlers_json));
    into_c_string(json)
}

#[unsafe(no_mangle)]
pub extern "C" fn wvg_is_permitted_url(url: *const c_char, hostnames_json: *const c_char) -> bool {
    is_permitted_url_json(&c_str(url), &c_str(hostnames_json))
}

#[unsafe(no_mangle)]
pub extern "C" fn wvg_free_string(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        let _ = CString::from_raw(ptr);
    }
}

// -----------------------------------------------------------------------------
// JNI (Android only)
// -----------------------------------------------------------------------------
#[cfg(target_os = "android")]
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_webviewguard_WebViewGuard_classifyJni(
    mut env: jni::JNIEnv,
    _class: jni::objects::JClass,
    juri: jni::objects::JString,
    jconfig: jni::objects::JString,
    jhandlers: jni::objects::JString,
) -> jni::sys::jstring {
    let uri: String = env.get_string(&juri).map(Into::into).unwrap_or_default();
    let config: String = env.get_string(&jconfig).map(Into::into).unwrap_or_default();
    let handlers: String = env.get_string(&jhandlers).map(Into::into).unwrap_or_default();

    let json = classify_json(&uri, &config, &handlers);
    match env.new_string(json) {
        Ok(s) => s.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

#[cfg(target_os = "android")]
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_webviewguard_WebViewGuard_isPermittedUrlJni(
    mut env: jni::JNIEnv,
    _class: jni::objects::JClass,
    jurl: jni::objects::JString,
    jhosts: jni::objects::JString,
) -> jni::sys::jboolean {
    let url: String = env.get_string(&jurl).map(Into::into).unwrap_or_default();
    let hosts: String = env.get_string(&jhosts).map(Into::into).unwrap_or_default();
    u8::from(is_permitted_url_json(&url, &hosts))
}

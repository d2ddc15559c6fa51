//! Renderer - fetch the inner markup of a selected element from a live page
//!
//! The comparison core never talks to a browser. It receives two HTML
//! strings produced by a [`Renderer`]. Retrieval either yields both
//! fragments or fails before any structural work starts.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::cdp::protocol::EvaluateResult;
use crate::cdp::CDPError;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("selector \"{selector}\" was not found on {url}")]
    SelectorNotFound { url: String, selector: String },

    #[error("failed to load {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out waiting for {url} to reach network idle")]
    Timeout { url: String },

    #[error("browser session is not started")]
    NotConnected,

    #[error(transparent)]
    Cdp(#[from] CDPError),
}

impl RenderError {
    pub fn is_selector_not_found(&self) -> bool {
        matches!(self, RenderError::SelectorNotFound { .. })
    }
}

/// Source of rendered fragments
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Inner HTML of the first element matching `selector` once `url` is idle
    async fn fetch(&self, url: &str, selector: &str) -> Result<String, RenderError>;
}

/// Fetch both fragments concurrently; the first failure wins
pub async fn fetch_pair<R: Renderer + ?Sized>(
    renderer: &R,
    url_a: &str,
    url_b: &str,
    selector: &str,
) -> Result<(String, String), RenderError> {
    tokio::try_join!(renderer.fetch(url_a, selector), renderer.fetch(url_b, selector))
}

/// JavaScript returning the element's innerHTML, or null when absent
pub fn inner_html_expression(selector: &str) -> String {
    // JSON string literals are valid JS string literals
    let literal = Value::String(selector.to_string()).to_string();
    format!(
        "(() => {{ const el = document.querySelector({literal}); \
         return el === null ? null : el.innerHTML; }})()"
    )
}

/// Interpret the evaluate result of [`inner_html_expression`]
///
/// `Ok(None)` means the selector matched nothing; `Err` carries the script
/// exception text (e.g. a syntactically invalid selector).
pub fn extract_inner_html(result: &EvaluateResult) -> Result<Option<String>, String> {
    if let Some(details) = &result.exception_details {
        let text = details["exception"]["description"]
            .as_str()
            .or_else(|| details["text"].as_str())
            .unwrap_or("script exception");
        return Err(text.to_string());
    }
    match &result.result.value {
        Some(Value::String(html)) => Ok(Some(html.clone())),
        _ => Ok(None),
    }
}

#[derive(Debug)]
struct IdleState {
    inflight: HashSet<String>,
    loaded_loaders: HashSet<String>,
    any_load: bool,
    last_activity: Instant,
}

/// Tracks in-flight requests and load events for one page
///
/// A page is idle once the load event for the expected loader has fired, no
/// request is in flight, and nothing started or finished for `window`.
#[derive(Debug)]
pub struct NetworkIdleTracker {
    state: Mutex<IdleState>,
}

impl NetworkIdleTracker {
    pub fn new(now: Instant) -> Self {
        Self {
            state: Mutex::new(IdleState {
                inflight: HashSet::new(),
                loaded_loaders: HashSet::new(),
                any_load: false,
                last_activity: now,
            }),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut IdleState) -> T) -> T {
        // A poisoned lock only means a callback panicked mid-update; the
        // sets are still usable.
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    pub fn request_started(&self, request_id: &str, now: Instant) {
        self.with_state(|s| {
            s.inflight.insert(request_id.to_string());
            s.last_activity = now;
        });
    }

    pub fn request_finished(&self, request_id: &str, now: Instant) {
        self.with_state(|s| {
            s.inflight.remove(request_id);
            s.last_activity = now;
        });
    }

    pub fn load_fired(&self, loader_id: Option<&str>, now: Instant) {
        self.with_state(|s| {
            if let Some(loader_id) = loader_id {
                s.loaded_loaders.insert(loader_id.to_string());
            }
            s.any_load = true;
            s.last_activity = now;
        });
    }

    pub fn inflight(&self) -> usize {
        self.with_state(|s| s.inflight.len())
    }

    /// `loader_id` is the navigation's loader; `None` accepts any load event
    pub fn is_idle(&self, loader_id: Option<&str>, now: Instant, window: Duration) -> bool {
        self.with_state(|s| {
            let loaded = match loader_id {
                Some(id) => s.loaded_loaders.contains(id),
                None => s.any_load,
            };
            loaded
                && s.inflight.is_empty()
                && now.saturating_duration_since(s.last_activity) >= window
        })
    }

    /// Apply one CDP event; unrelated events are ignored
    pub fn observe(&self, method: &str, params: Option<&Value>, now: Instant) {
        let params = params.unwrap_or(&Value::Null);
        match method {
            "Network.requestWillBeSent" => {
                if let Some(id) = params["requestId"].as_str() {
                    self.request_started(id, now);
                }
            }
            "Network.loadingFinished" | "Network.loadingFailed" => {
                if let Some(id) = params["requestId"].as_str() {
                    self.request_finished(id, now);
                }
            }
            "Page.lifecycleEvent" => {
                if params["name"].as_str() == Some("load") {
                    self.load_fired(params["loaderId"].as_str(), now);
                }
            }
            _ => {}
        }
    }
}

/// Events [`NetworkIdleTracker::observe`] consumes
pub const IDLE_EVENTS: &[&str] = &[
    "Network.requestWillBeSent",
    "Network.loadingFinished",
    "Network.loadingFailed",
    "Page.lifecycleEvent",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::protocol::RemoteObject;
    use serde_json::json;

    const WINDOW: Duration = Duration::from_millis(500);

    fn evaluate_result(value: Option<Value>, exception: Option<Value>) -> EvaluateResult {
        EvaluateResult {
            result: RemoteObject {
                object_type: "string".to_string(),
                subtype: None,
                value,
                description: None,
            },
            exception_details: exception,
        }
    }

    #[test]
    fn test_expression_quotes_selector() {
        let expr = inner_html_expression(r#"div[data-x="a"] > p"#);
        assert!(expr.contains(r#"document.querySelector("div[data-x=\"a\"] > p")"#));
        assert!(expr.contains("el.innerHTML"));
    }

    #[test]
    fn test_extract_inner_html() {
        assert_eq!(
            extract_inner_html(&evaluate_result(Some(json!("<p>x</p>")), None)),
            Ok(Some("<p>x</p>".to_string()))
        );
        assert_eq!(
            extract_inner_html(&evaluate_result(Some(Value::Null), None)),
            Ok(None)
        );
        assert_eq!(
            extract_inner_html(&evaluate_result(
                None,
                Some(json!({
                    "text": "Uncaught",
                    "exception": {"description": "SyntaxError: bad selector"}
                }))
            )),
            Err("SyntaxError: bad selector".to_string())
        );
    }

    #[test]
    fn test_idle_requires_load_and_quiet_window() {
        let t0 = Instant::now();
        let tracker = NetworkIdleTracker::new(t0);
        assert!(!tracker.is_idle(Some("L1"), t0 + WINDOW * 4, WINDOW));

        tracker.observe("Network.requestWillBeSent", Some(&json!({"requestId": "r1"})), t0);
        tracker.observe(
            "Page.lifecycleEvent",
            Some(&json!({"name": "load", "loaderId": "L1"})),
            t0 + Duration::from_millis(100),
        );
        assert_eq!(tracker.inflight(), 1);
        assert!(!tracker.is_idle(Some("L1"), t0 + WINDOW * 4, WINDOW));

        let done = t0 + Duration::from_millis(200);
        tracker.observe("Network.loadingFinished", Some(&json!({"requestId": "r1"})), done);
        assert!(!tracker.is_idle(Some("L1"), done + Duration::from_millis(499), WINDOW));
        assert!(tracker.is_idle(Some("L1"), done + WINDOW, WINDOW));
    }

    #[test]
    fn test_idle_ignores_other_loaders() {
        let t0 = Instant::now();
        let tracker = NetworkIdleTracker::new(t0);
        tracker.load_fired(Some("about-blank"), t0);
        assert!(!tracker.is_idle(Some("L2"), t0 + WINDOW, WINDOW));
        assert!(tracker.is_idle(None, t0 + WINDOW, WINDOW));
    }

    #[test]
    fn test_failed_requests_count_as_finished() {
        let t0 = Instant::now();
        let tracker = NetworkIdleTracker::new(t0);
        tracker.observe("Network.requestWillBeSent", Some(&json!({"requestId": "r9"})), t0);
        tracker.observe("Network.loadingFailed", Some(&json!({"requestId": "r9"})), t0);
        tracker.observe("Network.dataReceived", Some(&json!({"requestId": "r9"})), t0);
        assert_eq!(tracker.inflight(), 0);
    }

    struct StaticRenderer;

    #[async_trait]
    impl Renderer for StaticRenderer {
        async fn fetch(&self, url: &str, selector: &str) -> Result<String, RenderError> {
            match url {
                "missing" => Err(RenderError::SelectorNotFound {
                    url: url.to_string(),
                    selector: selector.to_string(),
                }),
                _ => Ok(format!("<p>{url}</p>")),
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_pair() {
        let (a, b) = fetch_pair(&StaticRenderer, "a", "b", "body").await.unwrap();
        assert_eq!((a.as_str(), b.as_str()), ("<p>a</p>", "<p>b</p>"));

        let err = fetch_pair(&StaticRenderer, "a", "missing", "#app").await.unwrap_err();
        assert!(err.is_selector_not_found());
        assert_eq!(err.to_string(), "selector \"#app\" was not found on missing");
    }
}

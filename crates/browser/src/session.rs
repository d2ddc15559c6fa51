//! Browser Session Management
//!
//! Connects to an already running Chrome over its DevTools WebSocket and
//! renders pages on demand. Every fetch gets its own target, so concurrent
//! fetches share the connection but never a page.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::Instrument;
use uuid::Uuid;

use crate::cdp::protocol::CreateTargetResult;
use crate::cdp::{CDPClient, CDPError, CDPSession};
use crate::renderer::{
    extract_inner_html, inner_html_expression, NetworkIdleTracker, RenderError, Renderer,
    IDLE_EVENTS,
};

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub id: String,
    /// DevTools WebSocket URL of the browser (`ws://host:port/devtools/browser/...`)
    pub cdp_url: String,
    /// Quiet period with no network activity before a page counts as settled
    pub network_idle_ms: u64,
    /// Upper bound on navigation + settling, per page
    pub navigation_timeout_secs: u64,
    /// Upper bound on a single CDP round trip
    pub request_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            cdp_url: "ws://localhost:9222/devtools/browser".to_string(),
            network_idle_ms: 500,
            navigation_timeout_secs: 30,
            request_timeout_secs: 30,
        }
    }
}

impl SessionConfig {
    pub fn network_idle(&self) -> Duration {
        Duration::from_millis(self.network_idle_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }
}

/// How often the idle condition is re-checked
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Browser Session - manages the connection to Chrome
pub struct BrowserSession {
    pub config: SessionConfig,
    cdp_client: RwLock<Option<Arc<CDPClient>>>,
}

impl BrowserSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            cdp_client: RwLock::new(None),
        }
    }

    /// Connect to the browser
    pub async fn start(&self) -> Result<(), CDPError> {
        let client = CDPClient::connect_with_timeout(
            &self.config.cdp_url,
            Duration::from_secs(self.config.request_timeout_secs),
        )
        .await?;
        *self.cdp_client.write().await = Some(client);
        tracing::info!(
            session = %self.config.id,
            url = %self.config.cdp_url,
            "connected to browser"
        );
        Ok(())
    }

    /// Disconnect from the browser
    pub async fn stop(&self) -> Result<(), CDPError> {
        if let Some(client) = self.cdp_client.write().await.take() {
            client.close().await?;
        }
        tracing::debug!(session = %self.config.id, "browser session stopped");
        Ok(())
    }

    async fn client(&self) -> Result<Arc<CDPClient>, RenderError> {
        self.cdp_client
            .read()
            .await
            .as_ref()
            .cloned()
            .ok_or(RenderError::NotConnected)
    }

    /// Open a fresh blank target and attach to it
    async fn open_page(&self) -> Result<CDPSession, RenderError> {
        let client = self.client().await?;
        let result = client
            .send_request(
                "Target.createTarget",
                Some(json!({ "url": "about:blank" })),
                None,
            )
            .await?;
        let created: CreateTargetResult = serde_json::from_value(result).map_err(CDPError::from)?;

        let session = CDPSession::attach(client, created.target_id, None).await?;
        session
            .send(
                "Page.setLifecycleEventsEnabled",
                Some(json!({ "enabled": true })),
            )
            .await?;
        Ok(session)
    }

    async fn load_and_extract(
        &self,
        page: &CDPSession,
        tracker: &NetworkIdleTracker,
        url: &str,
        selector: &str,
    ) -> Result<String, RenderError> {
        let navigation = page.navigate(url).await?;
        if let Some(reason) = navigation.error_text.filter(|text| !text.is_empty()) {
            return Err(RenderError::Navigation {
                url: url.to_string(),
                reason,
            });
        }

        let loader_id = navigation.loader_id.as_deref();
        let window = self.config.network_idle();
        let settle = async {
            while !tracker.is_idle(loader_id, Instant::now(), window) {
                tokio::time::sleep(IDLE_POLL).await;
            }
        };
        if tokio::time::timeout(self.config.navigation_timeout(), settle)
            .await
            .is_err()
        {
            tracing::debug!(inflight = tracker.inflight(), "page never settled");
            return Err(RenderError::Timeout {
                url: url.to_string(),
            });
        }

        let evaluated = page.evaluate(inner_html_expression(selector)).await?;
        match extract_inner_html(&evaluated) {
            Ok(Some(html)) => Ok(html),
            Ok(None) => Err(RenderError::SelectorNotFound {
                url: url.to_string(),
                selector: selector.to_string(),
            }),
            Err(reason) => Err(RenderError::Navigation {
                url: url.to_string(),
                reason,
            }),
        }
    }
}

#[async_trait]
impl Renderer for BrowserSession {
    async fn fetch(&self, url: &str, selector: &str) -> Result<String, RenderError> {
        url::Url::parse(url).map_err(|e| RenderError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let span = tracing::info_span!("fetch", session = %self.config.id, url = %url);
        async {
            let page = self.open_page().await?;

            let tracker = Arc::new(NetworkIdleTracker::new(Instant::now()));
            let subscriptions: Vec<_> = IDLE_EVENTS
                .iter()
                .map(|&method| {
                    let tracker = tracker.clone();
                    page.on_event(method, move |event| {
                        tracker.observe(&event.method, event.params.as_ref(), Instant::now());
                    })
                })
                .collect();

            let result = self.load_and_extract(&page, &tracker, url, selector).await;

            page.remove_listeners(&subscriptions);
            if let Err(e) = page.close_target().await {
                tracing::warn!("Failed to close target {}: {}", page.target_id, e);
            }

            match &result {
                Ok(html) => tracing::debug!(bytes = html.len(), "fragment captured"),
                Err(e) => tracing::debug!(error = %e, "fetch failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_and_partial_override() {
        let config: SessionConfig =
            serde_json::from_value(json!({ "cdp_url": "ws://127.0.0.1:9333/devtools/browser/x" }))
                .unwrap();
        assert_eq!(config.cdp_url, "ws://127.0.0.1:9333/devtools/browser/x");
        assert_eq!(config.network_idle(), Duration::from_millis(500));
        assert_eq!(config.navigation_timeout(), Duration::from_secs(30));
        assert!(!config.id.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_requires_start() {
        let session = BrowserSession::new(SessionConfig::default());
        let err = session.fetch("https://example.com", "body").await.unwrap_err();
        assert!(matches!(err, RenderError::NotConnected));
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_url() {
        let session = BrowserSession::new(SessionConfig::default());
        let err = session.fetch("not a url", "body").await.unwrap_err();
        assert!(matches!(err, RenderError::Navigation { .. }));
    }

    #[tokio::test]
    #[ignore] // Needs running Chrome
    async fn test_fetch_live_page() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let session = BrowserSession::new(SessionConfig::default());
        session.start().await.unwrap();

        let html = session.fetch("https://example.com", "body").await.unwrap();
        assert!(html.contains("<h1>"));

        let err = session
            .fetch("https://example.com", "#does-not-exist")
            .await
            .unwrap_err();
        assert!(err.is_selector_not_found());

        session.stop().await.unwrap();
    }
}

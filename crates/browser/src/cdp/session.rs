//! CDP Session - Represents a connection to a specific browser target
//!
//! Design: Lightweight wrapper around CDPClient with target-specific context.
//! All sessions share the same WebSocket - no per-session connection overhead.

use super::client::{CDPClient, EventCallback, Result, SubscriptionId};
use super::protocol::{
    AttachToTargetResult, CDPEvent, EvaluateResult, NavigateResult, SessionId, TargetId,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Domains enabled when none are requested explicitly
pub const DEFAULT_DOMAINS: &[&str] = &["Page", "Network", "Runtime"];

/// CDP Session bound to a specific target
#[derive(Clone)]
pub struct CDPSession {
    /// Shared CDP client
    client: Arc<CDPClient>,

    /// Target this session is attached to
    pub target_id: TargetId,

    /// Session ID assigned by Chrome
    pub session_id: SessionId,
}

impl CDPSession {
    /// Attach to a target and create session
    pub async fn attach(
        client: Arc<CDPClient>,
        target_id: TargetId,
        domains: Option<Vec<&str>>,
    ) -> Result<Self> {
        // Attach to target
        let result = client
            .send_request(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true,
                })),
                None,
            )
            .await?;

        let attach_result: AttachToTargetResult = serde_json::from_value(result)?;
        let session_id = attach_result.session_id;

        let domains = domains.unwrap_or_else(|| DEFAULT_DOMAINS.to_vec());

        // Enable all domains in parallel
        let enable_futures: Vec<_> = domains
            .into_iter()
            .map(|domain| {
                let client = client.clone();
                let session_id = session_id.clone();
                async move {
                    client
                        .send_request(format!("{}.enable", domain), None, Some(session_id))
                        .await
                }
            })
            .collect();

        // Network quiescence depends on these, so a failed enable is fatal
        let results = futures_util::future::join_all(enable_futures).await;
        for result in results {
            result?;
        }

        Ok(Self {
            client,
            target_id,
            session_id,
        })
    }

    /// Send command within this session's context
    pub async fn send(&self, method: impl Into<String>, params: Option<Value>) -> Result<Value> {
        self.client
            .send_request(method, params, Some(self.session_id.clone()))
            .await
    }

    /// Subscribe to an event, delivering only events from this session
    pub fn on_event(
        &self,
        method: &str,
        callback: impl Fn(CDPEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let session_id = self.session_id.clone();
        let filtered: EventCallback = Arc::new(move |event: CDPEvent| {
            if event.session_id.as_deref() == Some(session_id.as_str()) {
                callback(event);
            }
        });
        self.client.subscribe(method, filtered)
    }

    /// Drop subscriptions created through [`on_event`](Self::on_event)
    pub fn remove_listeners(&self, ids: &[SubscriptionId]) {
        for id in ids {
            self.client.unsubscribe(*id);
        }
    }

    /// Navigate to URL
    pub async fn navigate(&self, url: impl Into<String>) -> Result<NavigateResult> {
        let result = self
            .send("Page.navigate", Some(json!({ "url": url.into() })))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Evaluate JavaScript
    pub async fn evaluate(&self, expression: impl Into<String>) -> Result<EvaluateResult> {
        let result = self
            .send(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression.into(),
                    "returnByValue": true,
                })),
            )
            .await?;

        Ok(serde_json::from_value(result)?)
    }

    /// Close the target this session is attached to
    pub async fn close_target(&self) -> Result<()> {
        self.client
            .send_request(
                "Target.closeTarget",
                Some(json!({ "targetId": &self.target_id })),
                None,
            )
            .await?;
        Ok(())
    }
}

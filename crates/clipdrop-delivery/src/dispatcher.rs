//! Webhook delivery dispatcher.

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use clipdrop_models::{DeliveryOutcome, TargetOutcome, WebhookTarget};

use crate::error::{DeliveryError, DeliveryResult};

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Uploads a finished clip to webhook endpoints.
///
/// Targets are independent: each enabled target gets its own upload
/// attempt, one target's failure never blocks another's, and there is no
/// automatic retry. The caller decides what to do with per-target
/// failures.
#[derive(Debug, Clone)]
pub struct WebhookDispatcher {
    client: reqwest::Client,
}

impl WebhookDispatcher {
    pub fn new() -> DeliveryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// Use a pre-built client (tests, custom timeouts).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Deliver `file` to every target, returning one outcome per target
    /// in input order.
    ///
    /// Disabled targets yield [`DeliveryOutcome::Skipped`] without a
    /// network attempt. Enabled targets upload concurrently.
    pub async fn deliver(
        &self,
        file: &Path,
        title: Option<&str>,
        targets: &[WebhookTarget],
    ) -> DeliveryResult<Vec<TargetOutcome>> {
        if targets.is_empty() {
            return Ok(Vec::new());
        }

        if !file.exists() {
            return Err(DeliveryError::FileNotFound(file.to_path_buf()));
        }

        // The clip is chat-upload sized; read once, share across targets.
        let payload = Bytes::from(tokio::fs::read(file).await?);
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "clip.mp4".to_string());

        let handles: Vec<_> = targets
            .iter()
            .cloned()
            .map(|target| {
                let client = self.client.clone();
                let payload = payload.clone();
                let filename = filename.clone();
                let title = title.map(str::to_owned);
                tokio::spawn(async move { send_one(client, &target, payload, filename, title).await })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(targets.len());
        for (target, handle) in targets.iter().zip(handles) {
            let outcome = handle.await.unwrap_or_else(|e| {
                warn!(target = %target.name, "delivery task panicked: {e}");
                DeliveryOutcome::NetworkError {
                    message: "delivery task panicked".to_string(),
                }
            });
            outcomes.push(TargetOutcome {
                target: target.name.clone(),
                outcome,
            });
        }

        Ok(outcomes)
    }
}

async fn send_one(
    client: reqwest::Client,
    target: &WebhookTarget,
    payload: Bytes,
    filename: String,
    title: Option<String>,
) -> DeliveryOutcome {
    if !target.enabled {
        debug!(target = %target.name, "webhook disabled, skipping");
        return DeliveryOutcome::Skipped;
    }

    let part = match Part::stream(Body::from(payload))
        .file_name(filename)
        .mime_str("video/mp4")
    {
        Ok(part) => part,
        Err(e) => {
            return DeliveryOutcome::NetworkError {
                message: format!("failed to build upload body: {e}"),
            }
        }
    };

    let mut form = Form::new().part("file", part);
    if let Some(title) = title {
        form = form.text("content", format!("**{title}**"));
    }

    match client.post(&target.url).multipart(form).send().await {
        Ok(response) => {
            let status = response.status();
            if status.is_success() {
                debug!(target = %target.name, %status, "clip delivered");
                DeliveryOutcome::Sent
            } else {
                warn!(target = %target.name, %status, "webhook rejected clip");
                DeliveryOutcome::HttpError {
                    status: status.as_u16(),
                }
            }
        }
        Err(e) => {
            warn!(target = %target.name, "webhook unreachable: {e}");
            DeliveryOutcome::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn clip_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let file = dir.path().join("highlight.mp4");
        tokio::fs::write(&file, b"fake mp4 payload").await.unwrap();
        file
    }

    #[tokio::test]
    async fn test_mixed_outcomes_reported_per_target() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/too-large"))
            .respond_with(ResponseTemplate::new(413))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = clip_file(&dir).await;

        let targets = vec![
            WebhookTarget::new("good", format!("{}/ok", server.uri())),
            WebhookTarget::new("rejects", format!("{}/too-large", server.uri())),
            WebhookTarget::new("off", format!("{}/ok", server.uri())).disabled(),
        ];

        let dispatcher = WebhookDispatcher::new().unwrap();
        let outcomes = dispatcher.deliver(&file, None, &targets).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].target, "good");
        assert_eq!(outcomes[0].outcome, DeliveryOutcome::Sent);
        assert_eq!(
            outcomes[1].outcome,
            DeliveryOutcome::HttpError { status: 413 }
        );
        assert_eq!(outcomes[2].outcome, DeliveryOutcome::Skipped);

        // Disabled target never hit the wire: 2 requests total
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_title_sent_as_bold_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("**Ace clutch**"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = clip_file(&dir).await;
        let targets = vec![WebhookTarget::new("main", server.uri())];

        let dispatcher = WebhookDispatcher::new().unwrap();
        let outcomes = dispatcher
            .deliver(&file, Some("Ace clutch"), &targets)
            .await
            .unwrap();

        assert_eq!(outcomes[0].outcome, DeliveryOutcome::Sent);
    }

    #[tokio::test]
    async fn test_unreachable_target_is_network_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = clip_file(&dir).await;

        // Nothing listens on port 9; connection is refused immediately.
        let targets = vec![WebhookTarget::new("dead", "http://127.0.0.1:9/hook")];

        let dispatcher = WebhookDispatcher::new().unwrap();
        let outcomes = dispatcher.deliver(&file, None, &targets).await.unwrap();

        assert!(matches!(
            outcomes[0].outcome,
            DeliveryOutcome::NetworkError { .. }
        ));
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_others() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = clip_file(&dir).await;

        let targets = vec![
            WebhookTarget::new("dead", "http://127.0.0.1:9/hook"),
            WebhookTarget::new("live", server.uri()),
        ];

        let dispatcher = WebhookDispatcher::new().unwrap();
        let outcomes = dispatcher.deliver(&file, None, &targets).await.unwrap();

        assert!(matches!(
            outcomes[0].outcome,
            DeliveryOutcome::NetworkError { .. }
        ));
        assert_eq!(outcomes[1].outcome, DeliveryOutcome::Sent);
    }

    #[tokio::test]
    async fn test_missing_file_fails_before_any_upload() {
        let dispatcher = WebhookDispatcher::new().unwrap();
        let targets = vec![WebhookTarget::new("main", "http://127.0.0.1:9/hook")];

        let result = dispatcher
            .deliver(Path::new("/nonexistent/clip.mp4"), None, &targets)
            .await;

        assert!(matches!(result, Err(DeliveryError::FileNotFound(_))));
    }
}

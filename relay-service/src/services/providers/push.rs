use super::{ProviderError, ProviderResponse, PushMessage, PushProvider, ServiceAccountTokenSource};
use crate::config::FcmConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Firebase Cloud Messaging over the HTTP v1 API.
pub struct FcmProvider {
    config: FcmConfig,
    client: Client,
    tokens: ServiceAccountTokenSource,
}

#[derive(Debug, Serialize)]
struct FcmRequest<'a> {
    message: &'a PushMessage,
}

#[derive(Debug, Deserialize)]
struct FcmResponse {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FcmErrorEnvelope {
    error: FcmError,
}

#[derive(Debug, Deserialize)]
struct FcmError {
    message: String,
    #[serde(default)]
    status: String,
}

impl FcmProvider {
    pub fn new(config: FcmConfig) -> Result<Self, ProviderError> {
        if config.project_id.is_empty() {
            return Err(ProviderError::Configuration(
                "FCM project_id is not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        let tokens = ServiceAccountTokenSource::new(
            &config.client_email,
            &config.private_key,
            &config.token_url,
            client.clone(),
        )?;

        Ok(Self {
            config,
            client,
            tokens,
        })
    }

    fn send_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.project_id
        )
    }
}

#[async_trait]
impl PushProvider for FcmProvider {
    async fn send(&self, push: &PushMessage) -> Result<ProviderResponse, ProviderError> {
        if !self.config.enabled {
            return Err(ProviderError::NotEnabled(
                "FCM push provider is not enabled".to_string(),
            ));
        }

        let access_token = self.tokens.access_token().await?;

        let response = self
            .client
            .post(self.send_url())
            .bearer_auth(&access_token)
            .json(&FcmRequest { message: push })
            .send()
            .await
            .map_err(|e| ProviderError::Connection(format!("Failed to connect to FCM: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<FcmErrorEnvelope>(&body)
                .map(|envelope| format!("{} ({})", envelope.error.message, envelope.error.status))
                .unwrap_or(body);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ProviderError::Authentication(format!("FCM rejected credentials: {}", detail))
                }
                _ => ProviderError::SendFailed(format!(
                    "FCM API returned error status {}: {}",
                    status, detail
                )),
            });
        }

        let fcm_response: FcmResponse = response.json().await.map_err(|e| {
            ProviderError::SendFailed(format!("Failed to parse FCM response: {}", e))
        })?;

        tracing::info!(
            message_id = fcm_response.name.as_deref().unwrap_or("-"),
            "Push notification sent successfully via FCM"
        );

        Ok(ProviderResponse::success(fcm_response.name))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if !self.config.enabled {
            return Ok(());
        }

        if self.config.project_id.is_empty() {
            return Err(ProviderError::Configuration(
                "FCM project_id is not configured".to_string(),
            ));
        }

        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

/// Logs pushes instead of delivering them.
///
/// Only a counter is kept unless built with [`MockPushProvider::recording`].
pub struct MockPushProvider {
    enabled: bool,
    fail: bool,
    send_count: AtomicU64,
    sent: Option<Mutex<Vec<PushMessage>>>,
}

impl MockPushProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            fail: false,
            send_count: AtomicU64::new(0),
            sent: None,
        }
    }

    /// An enabled provider that keeps every message it is handed.
    pub fn recording() -> Self {
        Self {
            sent: Some(Mutex::new(Vec::new())),
            ..Self::new(true)
        }
    }

    /// A provider whose every delivery attempt fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(true)
        }
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    /// Empty unless the provider is recording.
    pub fn sent_messages(&self) -> Vec<PushMessage> {
        self.sent
            .as_ref()
            .and_then(|sent| sent.lock().ok().map(|sent| sent.clone()))
            .unwrap_or_default()
    }
}

#[async_trait]
impl PushProvider for MockPushProvider {
    async fn send(&self, push: &PushMessage) -> Result<ProviderResponse, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotEnabled(
                "Mock push provider is not enabled".to_string(),
            ));
        }

        let count = self.send_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(Ok(mut sent)) = self.sent.as_ref().map(|sent| sent.lock()) {
            sent.push(push.clone());
        }

        if self.fail {
            return Err(ProviderError::SendFailed(
                "Mock push provider configured to fail".to_string(),
            ));
        }

        tracing::info!(
            title = %push.notification.title,
            "[MOCK] Push notification would be sent"
        );

        Ok(ProviderResponse::success(Some(format!("mock-push-{}", count))))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_FCM_TOKEN_URL;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_KEY: &str = include_str!("../../../tests/fixtures/service_account_key.pem");

    fn config(server: &MockServer) -> FcmConfig {
        FcmConfig {
            project_id: "demo-project".to_string(),
            client_email: "relay@demo.iam.gserviceaccount.com".to_string(),
            private_key: TEST_KEY.to_string(),
            enabled: true,
            api_base_url: server.uri(),
            token_url: format!("{}/token", server.uri()),
            timeout_secs: 5,
        }
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.test",
                "expires_in": 3599
            })))
            .mount(server)
            .await;
    }

    fn message() -> PushMessage {
        PushMessage::new("tok1", "Hi", "There")
            .with_data("senderCode", "unknown")
            .with_data("timestamp", "2026-10-17T09:30:00.000Z")
    }

    #[tokio::test]
    async fn send_posts_v1_message_with_bearer_token() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/demo-project/messages:send"))
            .and(header("authorization", "Bearer ya29.test"))
            .and(body_json(json!({
                "message": {
                    "token": "tok1",
                    "notification": { "title": "Hi", "body": "There" },
                    "data": {
                        "senderCode": "unknown",
                        "timestamp": "2026-10-17T09:30:00.000Z"
                    }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/demo-project/messages/0:1234"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = FcmProvider::new(config(&server)).unwrap();
        let response = provider.send(&message()).await.unwrap();

        assert_eq!(
            response.provider_id.as_deref(),
            Some("projects/demo-project/messages/0:1234")
        );
    }

    #[tokio::test]
    async fn unregistered_token_is_a_send_failure() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/demo-project/messages:send"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {
                    "code": 404,
                    "message": "Requested entity was not found.",
                    "status": "NOT_FOUND"
                }
            })))
            .mount(&server)
            .await;

        let provider = FcmProvider::new(config(&server)).unwrap();
        let err = provider.send(&message()).await.unwrap_err();

        match err {
            ProviderError::SendFailed(detail) => {
                assert!(detail.contains("Requested entity was not found."))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_credentials_are_an_authentication_error() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/demo-project/messages:send"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider = FcmProvider::new(config(&server)).unwrap();
        let err = provider.send(&message()).await.unwrap_err();

        assert!(matches!(err, ProviderError::Authentication(_)));
    }

    #[test]
    fn missing_project_id_is_a_configuration_error() {
        let config = FcmConfig {
            project_id: String::new(),
            client_email: "relay@demo.iam.gserviceaccount.com".to_string(),
            private_key: TEST_KEY.to_string(),
            enabled: true,
            api_base_url: "https://fcm.googleapis.com".to_string(),
            token_url: DEFAULT_FCM_TOKEN_URL.to_string(),
            timeout_secs: 5,
        };

        assert!(matches!(
            FcmProvider::new(config),
            Err(ProviderError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn recording_mock_keeps_messages() {
        let provider = MockPushProvider::recording();
        provider.send(&message()).await.unwrap();

        assert_eq!(provider.send_count(), 1);
        assert_eq!(provider.sent_messages(), vec![message()]);
    }

    #[tokio::test]
    async fn default_mock_only_counts() {
        let provider = MockPushProvider::new(true);
        for _ in 0..1_000 {
            provider.send(&message()).await.unwrap();
        }

        assert_eq!(provider.send_count(), 1_000);
        assert!(provider.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn failing_mock_still_counts_the_attempt() {
        let provider = MockPushProvider::failing();
        assert!(provider.send(&message()).await.is_err());
        assert_eq!(provider.send_count(), 1);
    }
}

#![allow(dead_code)]

use relay_service::config::{
    CorsConfig, Environment, FcmConfig, MongoConfig, RelayConfig, DEFAULT_FCM_API_BASE_URL,
    DEFAULT_FCM_TOKEN_URL,
};
use relay_service::services::{
    DeviceStore, InMemoryDeviceStore, MockPushProvider, MongoDeviceStore, PushProvider,
};
use relay_service::{AppState, Application};
use serde_json::Value;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
    pub store: Arc<dyn DeviceStore>,
    pub push: Arc<MockPushProvider>,
}

pub fn test_config(environment: Environment) -> RelayConfig {
    RelayConfig {
        common: CoreConfig { port: 0 },
        environment,
        service_name: "relay-service".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        mongodb: MongoConfig {
            uri: std::env::var("TEST_MONGODB_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            database: format!("relay_test_{}", uuid::Uuid::new_v4().simple()),
            timeout_secs: 5,
        },
        fcm: FcmConfig {
            project_id: String::new(),
            client_email: String::new(),
            private_key: String::new(),
            enabled: false,
            api_base_url: DEFAULT_FCM_API_BASE_URL.to_string(),
            token_url: DEFAULT_FCM_TOKEN_URL.to_string(),
            timeout_secs: 5,
        },
        cors: CorsConfig::default(),
    }
}

impl TestApp {
    /// In-memory store with a recording push provider.
    pub async fn spawn(environment: Environment) -> Self {
        Self::spawn_with(
            environment,
            Arc::new(InMemoryDeviceStore::new()),
            Arc::new(MockPushProvider::recording()),
        )
        .await
    }

    /// Every push attempt fails.
    pub async fn spawn_with_failing_push(environment: Environment) -> Self {
        Self::spawn_with(
            environment,
            Arc::new(InMemoryDeviceStore::new()),
            Arc::new(MockPushProvider::failing()),
        )
        .await
    }

    /// Backed by a real MongoDB at `TEST_MONGODB_URI`, using a throwaway database.
    pub async fn spawn_with_mongo(environment: Environment) -> Self {
        let config = test_config(environment);
        let store = MongoDeviceStore::connect(&config.mongodb)
            .await
            .expect("Failed to connect to test MongoDB");
        Self::spawn_with(environment, Arc::new(store), Arc::new(MockPushProvider::recording())).await
    }

    pub async fn spawn_with(
        environment: Environment,
        store: Arc<dyn DeviceStore>,
        push: Arc<MockPushProvider>,
    ) -> Self {
        let state = AppState {
            config: test_config(environment),
            store: store.clone(),
            push_provider: push.clone() as Arc<dyn PushProvider>,
        };

        let app = Application::with_state(state)
            .await
            .expect("Failed to build test application");
        let port = app.port();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            port,
            client: reqwest::Client::new(),
            store,
            push,
        }
    }

    pub async fn register(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/api/register-device", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn send(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/api/send-notification", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }
}

//! Common test utilities for in-process API testing.
//!
//! The fixture builds the real router over a temporary SQLite database and
//! a [`MockTriager`], so tests drive the whole HTTP to scheduler path
//! without an LLM.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use triage_core::config::{DatabaseConfig, ServerConfig};
use triage_core::testing::MockTriager;
use triage_core::{
    create_authenticator, AuthConfig, AuthMethod, Config, SchedulerConfig, SqliteTicketStore,
    TicketService, TicketStore, TriageScheduler,
};

/// Re-export fixtures for test convenience
pub use triage_core::testing::fixtures;

/// Test fixture for API tests with a mock triage backend.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock triage backend - configure results and failures
    pub triager: Arc<MockTriager>,
    /// Scheduler shared with the router
    pub scheduler: TriageScheduler,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
    /// Key expected by the API, if auth is enabled
    api_key: Option<String>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Require this API key on protected routes
    pub api_key: Option<String>,
    /// Simulated triage latency
    pub triage_delay: Option<Duration>,
}

impl TestConfig {
    pub fn with_api_key(key: &str) -> Self {
        Self {
            api_key: Some(key.to_string()),
            ..Default::default()
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with auth disabled.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let auth = match &test_config.api_key {
            Some(key) => AuthConfig {
                method: AuthMethod::ApiKey,
                api_key: Some(key.clone()),
            },
            None => AuthConfig {
                method: AuthMethod::None,
                api_key: None,
            },
        };

        let config = Config {
            auth,
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            scheduler: SchedulerConfig::default(),
            triage: Default::default(),
        };

        let triager = Arc::new(match test_config.triage_delay {
            Some(delay) => MockTriager::new().with_delay(delay),
            None => MockTriager::new(),
        });

        let ticket_store: Arc<dyn TicketStore> = Arc::new(
            SqliteTicketStore::new(&db_path).expect("Failed to create ticket store"),
        );
        let scheduler = TriageScheduler::new(
            config.scheduler.clone(),
            Arc::clone(&ticket_store),
            Arc::clone(&triager) as Arc<dyn triage_core::Triager>,
        );
        let service = TicketService::new(ticket_store, scheduler.clone());
        let authenticator =
            create_authenticator(&config.auth).expect("Failed to create authenticator");

        let state = Arc::new(triage_server::state::AppState::new(
            config,
            authenticator,
            service,
        ));
        let router = triage_server::api::create_router(state);

        Self {
            router,
            triager,
            scheduler,
            temp_dir,
            api_key: test_config.api_key,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a PATCH request with JSON body.
    pub async fn patch(&self, path: &str, body: Value) -> TestResponse {
        self.request("PATCH", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a GET request with explicit headers and no automatic API key.
    pub async fn get_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Create a ticket through the API and return its ID.
    pub async fn create_ticket(&self, subject: &str, message: &str) -> String {
        let response = self
            .post(
                "/api/v1/tickets",
                serde_json::json!({ "subject": subject, "message": message }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }

    /// Poll the ticket until it reaches `status`, returning its JSON.
    pub async fn wait_for_status(&self, id: &str, status: &str) -> Value {
        let path = format!("/api/v1/tickets/{}", id);
        for _ in 0..200 {
            let response = self.get(&path).await;
            if response.body["status"] == status {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Ticket {} never reached {}", id, status);
    }

    /// Wait until the scheduler has drained its queue.
    pub async fn wait_idle(&self) {
        for _ in 0..200 {
            if self.scheduler.status().is_idle() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Scheduler never became idle: {:?}", self.scheduler.status());
    }

    /// Send a request, adding the configured API key.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some(key) = &self.api_key {
            request_builder = request_builder.header("X-API-Key", key.as_str());
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

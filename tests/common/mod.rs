#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use blog_api_rust::app::{self, AppState};
use blog_api_rust::cache::MemoryCache;
use blog_api_rust::config::{AppConfig, Environment};
use blog_api_rust::database::MemoryStore;

/// The built binary, running on its own port with in-memory backends. Dropping it kills and reaps the process.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    _storage: tempfile::TempDir,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let storage = tempfile::tempdir()?;

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_blog-api-rust"));
        cmd.env("BLOG_API_PORT", port.to_string())
            .env("APP_ENV", "development")
            .env("DATABASE_URL", "")
            .env("JWT_SECRET", "integration-secret")
            .env("STORAGE_ROOT", storage.path())
            .env("SERVER_PUBLIC_URL", &base_url)
            .env_remove("APP_CONFIG_FILE")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            _storage: storage,
            child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK || resp.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Spawn a server owned by the calling test
pub async fn spawn_server() -> Result<TestServer> {
    let server = TestServer::spawn()?;
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// In-process router over fresh in-memory backends. Keep the `TempDir` alive for the test.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub storage: tempfile::TempDir,
}

pub async fn test_app() -> Result<TestApp> {
    let storage = tempfile::tempdir()?;
    let mut config = AppConfig::for_environment(Environment::Development);
    config.storage.root = storage.path().to_path_buf();
    config.server.public_url = "http://localhost".to_string();
    config.security.jwt_secret = "test-secret".to_string();

    let store = Arc::new(MemoryStore::new());
    let state = AppState::build(&config, store.clone(), Arc::new(MemoryCache::new())).await?;

    Ok(TestApp {
        router: app::router(state, &config),
        store,
        storage,
    })
}

impl TestApp {
    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };
        self.dispatch(request).await
    }

    pub async fn send_raw(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body: {}", String::from_utf8_lossy(&bytes)))?
        };
        Ok((status, json))
    }

    /// Register an account and return its token
    pub async fn register(&self, username: &str, password: &str) -> Result<String> {
        let (status, body) = self
            .send(
                Method::POST,
                "/user/api/register",
                None,
                Some(serde_json::json!({ "username": username, "password": password })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {} {}", status, body);
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("register response has no token")
    }
}

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use personnel_api::{create_router, ApiState, BootstrapAccount, PersonnelConfig, TokenClaims};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

pub const SUPER_ADMIN_ID: &str = "root-admin";
pub const SUPER_ADMIN_EMAIL: &str = "root-admin@battalion.mil";

const JWT_SECRET: &str = "battalion-hub-test-jwt-secret";
const AUDIT_SECRET: &str = "battalion-hub-test-audit-secret-0123456789";

/// The personnel service running in-process on an ephemeral port, backed by
/// a throwaway data directory.
pub struct TestServer {
    pub base_url: String,
    pub state: Arc<ApiState>,
    client: Client,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    _data_dir: TempDir,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init()
            .ok();

        let data_dir = TempDir::new().context("creating data dir")?;
        let config = PersonnelConfig {
            server_port: 0,
            data_dir: data_dir.path().to_path_buf(),
            jwt_secret: JWT_SECRET.to_string(),
            audit_hmac_secret: AUDIT_SECRET.to_string(),
            bootstrap_super_admin: Some(BootstrapAccount {
                account_id: SUPER_ADMIN_ID.to_string(),
                email: SUPER_ADMIN_EMAIL.to_string(),
            }),
            ..PersonnelConfig::default()
        };
        config.validate()?;

        let state = Arc::new(ApiState::new(config)?);
        let router = create_router(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("binding ephemeral port")?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                });
            if let Err(err) = server.await {
                tracing::error!(error = %err, "test server stopped with error");
            }
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("building reqwest client")?;

        debug!(%addr, "test server listening");
        Ok(Self {
            base_url: format!("http://{addr}"),
            state,
            client,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
            _data_dir: data_dir,
        })
    }

    /// Mints an access token the way the hosting platform would.
    pub fn token(&self, account_id: &str) -> Result<String> {
        let claims = TokenClaims {
            sub: account_id.to_string(),
            email: Some(format!("{account_id}@battalion.mil")),
            exp: (Utc::now().timestamp() + 3600) as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
        )
        .map_err(|err| anyhow!("minting token: {err}"))
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        account_id: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method, url);
        if let Some(account_id) = account_id {
            request = request.bearer_auth(self.token(account_id)?);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.context("sending request")?;
        let status = response.status();
        let text = response.text().await?;
        let value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok((status, value))
    }

    pub async fn get(&self, account_id: &str, path: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, path, Some(account_id), None).await
    }

    pub async fn post(
        &self,
        account_id: &str,
        path: &str,
        body: Value,
    ) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, path, Some(account_id), Some(body))
            .await
    }

    pub async fn put(&self, account_id: &str, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PUT, path, Some(account_id), Some(body))
            .await
    }

    pub async fn delete(&self, account_id: &str, path: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::DELETE, path, Some(account_id), None).await
    }

    /// Creates a company as the bootstrap super_admin and returns its id.
    pub async fn create_company(&self, code: &str) -> Result<String> {
        let (status, body) = self
            .post(
                SUPER_ADMIN_ID,
                "/api/companies",
                serde_json::json!({ "code": code, "name": format!("{code} Company") }),
            )
            .await?;
        expect_ok(status, &body)?;
        string_field(&body, "id")
    }

    /// Provisions an account as `actor` and returns its id.
    pub async fn create_account(&self, actor: &str, body: Value) -> Result<String> {
        let (status, body) = self.post(actor, "/api/accounts", body).await?;
        expect_ok(status, &body)?;
        body.pointer("/account/id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("account id missing from {body}"))
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.context("joining server task")?;
        }
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub fn expect_ok(status: StatusCode, body: &Value) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(anyhow!("unexpected status {status}: {body}"))
    }
}

pub fn string_field(body: &Value, field: &str) -> Result<String> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("field {field} missing from {body}"))
}

pub fn random_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use personnel_api::{create_router, ApiState, BootstrapAccount, PersonnelConfig, TokenClaims};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const ADMIN_ID: &str = "hq-admin";
const JWT_SECRET: &str = "personnel-api-integration-secret";

pub struct TestApp {
    pub base_url: String,
    pub state: Arc<ApiState>,
    pub client: reqwest::Client,
    data_dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let data_dir = TempDir::new().expect("tempdir");
        let config = PersonnelConfig {
            data_dir: data_dir.path().to_path_buf(),
            jwt_secret: JWT_SECRET.to_string(),
            audit_hmac_secret: "integration-audit-secret-with-32-bytes!".to_string(),
            bootstrap_super_admin: Some(BootstrapAccount {
                account_id: ADMIN_ID.to_string(),
                email: "hq-admin@unit.mil".to_string(),
            }),
            ..PersonnelConfig::default()
        };
        config.validate().expect("valid config");

        let state = Arc::new(ApiState::new(config).expect("state"));
        let router = create_router(Arc::clone(&state));
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, router.into_make_service())
                .await
                .expect("server");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            client: reqwest::Client::new(),
            data_dir,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.path().join("personnel.db")
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn token(&self, account_id: &str) -> String {
        token_signed_with(JWT_SECRET, account_id)
    }

    pub async fn get(&self, account_id: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(self.token(account_id))
            .send()
            .await
            .expect("request")
    }

    pub async fn post(
        &self,
        account_id: &str,
        path: &str,
        body: serde_json::Value,
    ) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(self.token(account_id))
            .json(&body)
            .send()
            .await
            .expect("request")
    }
}

pub fn token_signed_with(secret: &str, account_id: &str) -> String {
    let claims = TokenClaims {
        sub: account_id.to_string(),
        email: None,
        exp: (Utc::now().timestamp() + 600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("token")
}

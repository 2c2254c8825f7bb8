use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::eligibility::EligibilityThresholds;
use crate::signing::Signer;

#[derive(Debug, Clone)]
pub struct PersonnelConfig {
    pub server_host: String,
    pub server_port: u16,
    pub data_dir: PathBuf,
    /// Shared secret the hosting platform signs access tokens with (HS256).
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    pub audit_hmac_secret: String,
    pub request_timeout_secs: u64,
    pub log_level: String,
    pub eligibility: EligibilityThresholds,
    pub bootstrap_super_admin: Option<BootstrapAccount>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapAccount {
    pub account_id: String,
    pub email: String,
}

impl Default for PersonnelConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 8190,
            data_dir: PathBuf::from("data/personnel"),
            jwt_secret: String::new(),
            jwt_issuer: None,
            jwt_audience: None,
            audit_hmac_secret: String::new(),
            request_timeout_secs: 30,
            log_level: "info".to_string(),
            eligibility: EligibilityThresholds::default(),
            bootstrap_super_admin: None,
        }
    }
}

impl PersonnelConfig {
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(host) = env::var("PERSONNEL_HOST") {
            cfg.server_host = host;
        }
        if let Ok(port) = env::var("PERSONNEL_PORT") {
            cfg.server_port = port.parse().context("PERSONNEL_PORT must be a valid u16")?;
        }
        if let Ok(dir) = env::var("PERSONNEL_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }

        cfg.jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        cfg.jwt_issuer = non_empty(env::var("JWT_ISSUER").ok());
        cfg.jwt_audience = non_empty(env::var("JWT_AUDIENCE").ok());
        cfg.audit_hmac_secret =
            env::var("AUDIT_HMAC_SECRET").context("AUDIT_HMAC_SECRET must be set")?;

        if let Ok(timeout) = env::var("REQUEST_TIMEOUT_SECS") {
            cfg.request_timeout_secs = timeout
                .parse()
                .context("REQUEST_TIMEOUT_SECS must be a positive integer")?;
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            cfg.log_level = level;
        }

        if let Ok(years) = env::var("PROMOTION_MIN_YEARS_IN_RANK") {
            cfg.eligibility.min_years_in_rank = years
                .parse()
                .context("PROMOTION_MIN_YEARS_IN_RANK must be a positive number")?;
        }
        if let Ok(hours) = env::var("PROMOTION_MIN_TRAINING_HOURS") {
            cfg.eligibility.min_training_hours = hours
                .parse()
                .context("PROMOTION_MIN_TRAINING_HOURS must be a positive number")?;
        }
        if let Ok(count) = env::var("PROMOTION_MIN_TRAININGS") {
            cfg.eligibility.min_trainings = count
                .parse()
                .context("PROMOTION_MIN_TRAININGS must be a positive integer")?;
        }
        if let Ok(count) = env::var("PROMOTION_MIN_VERIFIED_DOCUMENTS") {
            cfg.eligibility.min_verified_documents = count
                .parse()
                .context("PROMOTION_MIN_VERIFIED_DOCUMENTS must be a positive integer")?;
        }

        let bootstrap_id = non_empty(env::var("BOOTSTRAP_SUPER_ADMIN_ID").ok());
        let bootstrap_email = non_empty(env::var("BOOTSTRAP_SUPER_ADMIN_EMAIL").ok());
        cfg.bootstrap_super_admin = match (bootstrap_id, bootstrap_email) {
            (Some(account_id), Some(email)) => Some(BootstrapAccount { account_id, email }),
            (None, None) => None,
            _ => anyhow::bail!(
                "BOOTSTRAP_SUPER_ADMIN_ID and BOOTSTRAP_SUPER_ADMIN_EMAIL must be set together"
            ),
        };

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_directory(&self.data_dir)?;

        if self.jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET cannot be empty");
        }
        Signer::new(&self.audit_hmac_secret)
            .map_err(|err| anyhow::anyhow!("AUDIT_HMAC_SECRET is not a usable signing key: {err}"))?;
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than zero");
        }
        self.eligibility
            .validate()
            .map_err(|reason| anyhow::anyhow!("invalid promotion thresholds: {reason}"))?;
        Ok(())
    }
}

fn ensure_directory(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            anyhow::bail!("{} exists but is not a directory", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("unable to create data directory {}", path.display()))?;
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

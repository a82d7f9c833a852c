use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tracing::warn;

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub api_prefix: String,

    // Rate limiting
    pub rate_chat_per_min: u32,
    pub rate_approval_per_min: u32,

    // Sessions
    pub session_idle_secs: u64,
    pub session_sweep_secs: u64,
    pub default_employee_name: String,

    // Exception approvals
    pub approval_secret: String,
    pub approval_expiry_hours: i64,
    pub approval_sweep_secs: u64,
    pub public_base_url: String,

    pub holidays_file: Option<String>,
    pub wfh_weekly_cap: usize,
    pub collaborator_timeout_secs: u64,
    pub demo_seed: bool,

    // Optional LLM; rules alone when no key is set
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
}

fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        _ => Ok(default),
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let server_addr = var_or("SERVER_ADDR", "127.0.0.1:8080".to_string())?;

        let approval_secret = optional_var("APPROVAL_SECRET").unwrap_or_else(|| {
            warn!("APPROVAL_SECRET not set; approval links will not survive a restart");
            uuid::Uuid::new_v4().to_string()
        });

        Ok(Self {
            public_base_url: var_or("PUBLIC_BASE_URL", format!("http://{server_addr}"))?,
            server_addr,
            api_prefix: var_or("API_PREFIX", "/api".to_string())?,

            rate_chat_per_min: var_or("RATE_CHAT_PER_MIN", 120)?,
            rate_approval_per_min: var_or("RATE_APPROVAL_PER_MIN", 30)?,

            session_idle_secs: var_or("SESSION_IDLE_SECS", 1800)?, // 30 min
            session_sweep_secs: var_or("SESSION_SWEEP_SECS", 300)?,
            default_employee_name: var_or("DEFAULT_EMPLOYEE_NAME", "Current User".to_string())?,

            approval_secret,
            approval_expiry_hours: var_or("APPROVAL_EXPIRY_HOURS", 168)?, // 7 days
            approval_sweep_secs: var_or("APPROVAL_SWEEP_SECS", 3600)?,

            holidays_file: optional_var("HOLIDAYS_FILE"),
            wfh_weekly_cap: var_or("WFH_WEEKLY_CAP", 2)?,
            collaborator_timeout_secs: var_or("COLLABORATOR_TIMEOUT_SECS", 5)?,
            demo_seed: var_or("DEMO_SEED", false)?,

            llm_api_key: optional_var("LLM_API_KEY").or_else(|| optional_var("GROQ_API_KEY")),
            llm_base_url: var_or("LLM_BASE_URL", "https://api.groq.com/openai/v1".to_string())?,
            llm_model: var_or("LLM_MODEL", "llama-3.1-8b-instant".to_string())?,
            llm_timeout_secs: var_or("LLM_TIMEOUT_SECS", 8)?,
        })
    }

    /// Base the approve/reject links point at.
    pub fn approval_link_base(&self) -> String {
        format!(
            "{}{}/approvals",
            self.public_base_url.trim_end_matches('/'),
            self.api_prefix
        )
    }
}

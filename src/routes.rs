use crate::{
    api::{approval, chat},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{HttpRequest, HttpResponse, web};
use anyhow::{Result, anyhow};
use std::sync::Arc;

pub type Limiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-route rate limiters, built once; clones share the same quota.
#[derive(Clone)]
pub struct RateLimiters {
    pub chat: Arc<Limiter>,
    pub approval: Arc<Limiter>,
}

impl RateLimiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            chat: Arc::new(build_limiter(config.rate_chat_per_min)?),
            approval: Arc::new(build_limiter(config.rate_approval_per_min)?),
        })
    }
}

fn build_limiter(requests_per_min: u32) -> Result<Limiter> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        60_000 / requests_per_min as u64
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit: {requests_per_min} requests per minute"))?;
    Ok(Governor::new(&cfg))
}

// Malformed JSON gets the same error shape as a missing message.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let body = serde_json::json!({ "error": format!("Invalid request body: {err}") });
    InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
}

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(json_error)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &RateLimiters) {
    cfg.app_data(json_config());

    cfg.service(
        web::scope(&config.api_prefix)
            // /chat
            .service(
                web::resource("/chat")
                    .wrap(limiters.chat.clone())
                    .route(web::post().to(chat::chat)),
            )
            // /approvals/{id}?action=approve&token=...
            .service(
                web::resource("/approvals/{id}")
                    .wrap(limiters.approval.clone())
                    .route(web::get().to(approval::decide_approval)),
            ),
    );
}

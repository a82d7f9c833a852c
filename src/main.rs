use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;

mod api;
mod chat;
mod config;
mod docs;
mod error;
mod model;
mod nlu;
mod parser;
mod routes;
mod services;

#[cfg(test)]
mod tests;

use chat::{ChatEngine, Collaborators, EngineSettings, MokaSessionStore, SessionStore};
use config::Config;
use nlu::{GroqClient, HybridClassifier, IntentClassifier, Responder as FreeTextResponder};
use routes::RateLimiters;
use services::approval::ApprovalService;
use services::clock::{Clock, SystemClock};
use services::holiday::{HolidayCalendar, StaticHolidayCalendar};
use services::notifier::LogNotifier;
use services::pending_approval::PendingApprovalStore;
use services::record_store::{InMemoryRecordStore, RecordStore};

use crate::docs::ApiDoc;
use tracing::{debug, info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "HR Assistant is running"
}

struct Services {
    engine: Arc<ChatEngine>,
    approvals: Arc<ApprovalService>,
}

fn build_services(config: &Config) -> Result<Services> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let timeout = Duration::from_secs(config.collaborator_timeout_secs);

    // 1️⃣ policy and records
    let holidays: Arc<dyn HolidayCalendar> = Arc::new(match &config.holidays_file {
        Some(path) => StaticHolidayCalendar::from_file(path)?,
        None => StaticHolidayCalendar::bundled().context("bundled holiday calendar is invalid")?,
    });
    let records: Arc<dyn RecordStore> = Arc::new(if config.demo_seed {
        InMemoryRecordStore::with_demo_data(clock.clone(), &config.default_employee_name)
    } else {
        InMemoryRecordStore::new(clock.clone())
    });

    // 2️⃣ exception approvals
    let pending = Arc::new(PendingApprovalStore::new(
        chrono::Duration::hours(config.approval_expiry_hours),
        clock.clone(),
    ));
    let approvals = Arc::new(ApprovalService::new(
        pending,
        records.clone(),
        Arc::new(LogNotifier),
        clock.clone(),
        config.approval_secret.clone(),
        config.approval_link_base(),
        timeout,
    ));

    // 3️⃣ language understanding
    let llm_timeout = Duration::from_secs(config.llm_timeout_secs);
    let llm = match &config.llm_api_key {
        Some(key) => Some(Arc::new(
            GroqClient::new(
                key.clone(),
                config.llm_base_url.clone(),
                config.llm_model.clone(),
                llm_timeout,
            )
            .context("failed to build LLM client")?,
        )),
        None => {
            warn!("No LLM API key set; classifying with rules only");
            None
        }
    };
    let classifier: Arc<dyn IntentClassifier> = Arc::new(HybridClassifier::new(
        llm.clone().map(|c| c as Arc<dyn IntentClassifier>),
        llm_timeout,
    ));
    let responder = llm.map(|c| c as Arc<dyn FreeTextResponder>);

    // 4️⃣ the engine
    let sessions: Arc<dyn SessionStore> = Arc::new(MokaSessionStore::new(Duration::from_secs(
        config.session_idle_secs,
    )));
    let engine = ChatEngine::new(
        Collaborators {
            sessions,
            classifier,
            responder,
            records,
            holidays,
            approvals: approvals.clone(),
            clock,
        },
        EngineSettings {
            default_employee_name: config.default_employee_name.clone(),
            wfh_weekly_cap: config.wfh_weekly_cap,
            collaborator_timeout: timeout,
            responder_timeout: llm_timeout,
        },
    );

    Ok(Services {
        engine: Arc::new(engine),
        approvals,
    })
}

/// Periodic eviction of idle sessions and expired approval offers.
fn spawn_sweeps(config: &Config, services: &Services) {
    let engine = services.engine.clone();
    let session_every = Duration::from_secs(config.session_sweep_secs.max(1));
    actix_web::rt::spawn(async move {
        let mut ticker = tokio::time::interval(session_every);
        loop {
            ticker.tick().await;
            engine.sessions().sweep_expired().await;
            debug!(active = engine.sessions().len(), "Session sweep done");
        }
    });

    let approvals = services.approvals.clone();
    let approval_every = Duration::from_secs(config.approval_sweep_secs.max(1));
    actix_web::rt::spawn(async move {
        let mut ticker = tokio::time::interval(approval_every);
        loop {
            ticker.tick().await;
            let removed = approvals.approvals().cleanup_expired().await;
            if removed > 0 {
                info!(removed, "Expired approval requests removed");
            }
        }
    });
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    let config = Config::from_env()?;
    info!(addr = %config.server_addr, "Server starting...");

    let services = build_services(&config)?;
    let limiters = RateLimiters::from_config(&config)?;
    spawn_sweeps(&config, &services);

    let engine = Data::from(services.engine.clone());
    let approvals = Data::from(services.approvals.clone());
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(engine.clone())
            .app_data(approvals.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config, &limiters))
    })
    .bind(&server_addr)
    .with_context(|| format!("failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}

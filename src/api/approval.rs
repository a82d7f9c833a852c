use std::str::FromStr;

use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::ApprovalError;
use crate::services::approval::{ApprovalAction, ApprovalService};

#[derive(Deserialize, IntoParams)]
pub struct ApprovalQuery {
    /// `approve` or `reject`
    pub action: String,
    /// Signed token from the manager's email link
    pub token: String,
}

/* =========================
Approve / reject exception (manager link)
========================= */
/// Swagger doc for approval link endpoint
#[utoipa::path(
    get,
    path = "/api/approvals/{approval_id}",
    params(
        ("approval_id" = String, Path, description = "ID of the pending exception request"),
        ApprovalQuery
    ),
    responses(
        (status = 200, description = "Decision applied", body = Object, example = json!({
            "approvalId": "5b0c3c1e-8a57-4c1e-9d4b-1f1f4f6f2a10",
            "action": "approve",
            "recordId": "LR-1001",
            "message": "Request from Asha approved"
        })),
        (status = 400, description = "Unknown action", body = Object, example = json!({
            "message": "Invalid action. Allowed: approve, reject"
        })),
        (status = 403, description = "Token invalid for this request"),
        (status = 404, description = "Not found or already processed"),
        (status = 410, description = "Approval window expired")
    ),
    tag = "Approval"
)]
pub async fn decide_approval(
    approvals: web::Data<ApprovalService>,
    path: web::Path<String>,
    query: web::Query<ApprovalQuery>,
) -> actix_web::Result<impl Responder> {
    let approval_id = path.into_inner();

    let Ok(action) = ApprovalAction::from_str(query.action.trim()) else {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Invalid action. Allowed: approve, reject"
        })));
    };

    match approvals.decide(&approval_id, action, &query.token).await {
        Ok(decision) => Ok(HttpResponse::Ok().json(decision)),
        Err(e @ ApprovalError::InvalidToken) => {
            Ok(HttpResponse::Forbidden().json(serde_json::json!({ "message": e.to_string() })))
        }
        Err(e @ ApprovalError::NotFound) => {
            Ok(HttpResponse::NotFound().json(serde_json::json!({ "message": e.to_string() })))
        }
        Err(e @ ApprovalError::Expired) => {
            Ok(HttpResponse::Gone().json(serde_json::json!({ "message": e.to_string() })))
        }
        Err(e) => {
            tracing::error!(error = %e, approval_id = %approval_id, "Approval decision failed");
            Err(actix_web::error::ErrorInternalServerError("Internal Server Error"))
        }
    }
}

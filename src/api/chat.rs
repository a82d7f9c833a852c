use std::str::FromStr;

use actix_web::http::header::USER_AGENT;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::chat::{ChatEngine, ChatReply, ConfirmationAction, EditDetails, MessagePayload};
use crate::error::ChatError;
use crate::model::{Gender, PendingConfirmation};
use crate::nlu::Intent;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Free text from the employee. May be empty when a button action is sent.
    #[schema(value_type = String, example = "I need leave tomorrow for a doctor visit")]
    pub message: Option<Value>,
    #[schema(example = "c0ffee-1")]
    pub session_id: Option<String>,
    pub edit_details: Option<EditDetails>,
    #[schema(example = "yes")]
    pub confirmation_action: Option<ConfirmationAction>,
    /// Forces an intent, e.g. from a quick-action button.
    #[schema(example = "leave_balance")]
    pub intent: Option<String>,
    /// Client copy of the draft last shown with buttons.
    #[schema(value_type = Object)]
    pub pending_request: Option<Value>,
    pub employee_name: Option<String>,
    pub employee_email: Option<String>,
    #[schema(example = "female")]
    pub gender: Option<String>,
}

fn header(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Header first, then body, then the caller's address and user agent.
fn session_id(req: &HttpRequest, body: &ChatRequest) -> String {
    header(req, "X-Session-Id")
        .or_else(|| {
            body.session_id
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            let peer = req
                .connection_info()
                .realip_remote_addr()
                .unwrap_or("unknown")
                .to_string();
            let agent = req
                .headers()
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            format!("{peer}|{agent}")
        })
}

fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": message.into() }))
}

/* =========================
Chat message
========================= */
/// Swagger doc for chat endpoint
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body(
        content = ChatRequest,
        description = "One chat turn",
        content_type = "application/json"
    ),
    params(
        ("X-Session-Id" = Option<String>, Header, description = "Conversation id; falls back to body sessionId"),
        ("X-User-Email" = Option<String>, Header, description = "SSO email of the employee"),
        ("X-User-Name" = Option<String>, Header, description = "SSO display name of the employee")
    ),
    responses(
        (status = 200, description = "Assistant reply", body = ChatReply),
        (status = 400, description = "Message missing or not a string", body = Object, example = json!({
            "error": "Message is required"
        })),
        (status = 429, description = "Too many requests")
    ),
    tag = "Chat"
)]
pub async fn chat(
    req: HttpRequest,
    engine: web::Data<ChatEngine>,
    body: web::Json<ChatRequest>,
) -> actix_web::Result<impl Responder> {
    let body = body.into_inner();

    // 1️⃣ message must be text when present
    let message = match &body.message {
        Some(Value::String(text)) => text.clone(),
        None | Some(Value::Null) => String::new(),
        Some(_) => return Ok(bad_request(ChatError::MalformedInput.to_string())),
    };

    // 2️⃣ identity: SSO headers win over the body
    let session_id = session_id(&req, &body);
    let payload = MessagePayload {
        edit_details: body.edit_details,
        confirmation_action: body.confirmation_action,
        intent_override: body.intent.as_deref().and_then(|i| Intent::from_str(i).ok()),
        pending_request: body
            .pending_request
            .and_then(|v| serde_json::from_value::<PendingConfirmation>(v).ok()),
        employee_name: header(&req, "X-User-Name").or(body.employee_name),
        employee_email: header(&req, "X-User-Email").or(body.employee_email),
        gender: body.gender.as_deref().and_then(|g| Gender::from_str(g.trim()).ok()),
    };

    // 3️⃣ run the turn
    match engine.handle_message(&session_id, &message, payload).await {
        Ok(reply) => Ok(HttpResponse::Ok().json(reply)),
        Err(e @ ChatError::MalformedInput) => Ok(bad_request(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn body(session_id: Option<&str>) -> ChatRequest {
        serde_json::from_value(serde_json::json!({
            "message": "hi",
            "sessionId": session_id,
        }))
        .unwrap()
    }

    #[test]
    fn test_session_id_prefers_header() {
        let req = TestRequest::default()
            .insert_header(("X-Session-Id", "from-header"))
            .to_http_request();
        assert_eq!(session_id(&req, &body(Some("from-body"))), "from-header");

        let req = TestRequest::default().to_http_request();
        assert_eq!(session_id(&req, &body(Some("from-body"))), "from-body");
    }

    #[test]
    fn test_session_id_falls_back_to_peer() {
        let req = TestRequest::default()
            .peer_addr("10.0.0.7:5555".parse().unwrap())
            .insert_header((USER_AGENT, "widget/1.0"))
            .to_http_request();
        let id = session_id(&req, &body(None));
        assert!(id.starts_with("10.0.0.7"));
        assert!(id.ends_with("|widget/1.0"));
    }
}

use crate::api::chat::ChatRequest;
use crate::chat::{ChatReply, ConfirmationAction, EditDetails};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HR Assistant API",
        version = "1.0.0",
        description = r#"
## Conversational HR Assistant

A chat backend that turns natural-language messages into **leave** and **work-from-home (WFH)** requests.

### 🔹 Key Features
- **Leave & WFH requests**
  - Dates like "tomorrow", "next Monday", "15th to 17th March" or "3 days from Monday"
  - Step-by-step questions for whatever is missing (date, reason, leave type)
  - Yes/No confirmation with an editable summary
- **Validation**
  - Company holidays, past dates and overlapping requests are blocked
  - Insufficient balance or the weekly WFH cap can go to the manager as an exception
- **Queries**
  - Leave balance, existing requests, holiday calendar
- **Manager approval links**
  - Signed approve/reject links for exception requests

### 🔐 Identity
The employee is taken from the `X-User-Email` / `X-User-Name` SSO headers, falling back to the request body.
Conversations are keyed by `X-Session-Id` (or `sessionId` in the body).

---
Built with **Rust**, **Actix Web**, **Moka**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::chat::chat,
        crate::api::approval::decide_approval
    ),
    components(
        schemas(
            ChatRequest,
            ChatReply,
            EditDetails,
            ConfirmationAction
        )
    ),
    tags(
        (name = "Chat", description = "Conversation APIs"),
        (name = "Approval", description = "Manager approval links for exception requests"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_chat_and_approval() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/chat"));
        assert!(doc.paths.paths.contains_key("/api/approvals/{approval_id}"));
    }
}

use derive_more::Display;

/// Failures from the system of record.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum StoreError {
    #[display(fmt = "{}", _0)]
    Unavailable(String),
    #[display(fmt = "Request {} not found", _0)]
    NotFound(String),
    #[display(fmt = "The request service did not respond in time")]
    Timeout,
}

impl std::error::Error for StoreError {}

/// Failures from the LLM classifier or responder. Never shown to the user;
/// the caller degrades to rule-based handling instead.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum ClassifyError {
    #[display(fmt = "LLM request failed: {}", _0)]
    Http(String),
    #[display(fmt = "LLM returned an unusable response: {}", _0)]
    InvalidResponse(String),
    #[display(fmt = "LLM call timed out")]
    Timeout,
    #[display(fmt = "LLM is not configured")]
    Disabled,
}

impl std::error::Error for ClassifyError {}

impl From<reqwest::Error> for ClassifyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClassifyError::Timeout
        } else {
            ClassifyError::Http(e.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Display)]
pub enum ChatError {
    #[display(fmt = "Message is required")]
    MalformedInput,
}

impl std::error::Error for ChatError {}

#[derive(Debug, Clone, PartialEq, Display)]
pub enum ApprovalError {
    #[display(fmt = "This approval link is invalid")]
    InvalidToken,
    #[display(fmt = "This approval request was not found or has already been processed")]
    NotFound,
    #[display(fmt = "This approval request has expired")]
    Expired,
    #[display(fmt = "Could not sign approval link: {}", _0)]
    Signing(String),
    #[display(fmt = "{}", _0)]
    Store(StoreError),
}

impl std::error::Error for ApprovalError {}

impl From<StoreError> for ApprovalError {
    fn from(e: StoreError) -> Self {
        ApprovalError::Store(e)
    }
}

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use super::{
    Analysis, AnalysisSource, ClassifyContext, Entities, Intent, IntentClassifier, Responder, Role,
};
use crate::error::ClassifyError;
use crate::model::LeaveType;
use crate::parser::{DateParseError, DurationSpec, month_from_name, parse_single_date};
use crate::services::record_store::RequestFilter;

const CLASSIFY_TEMPERATURE: f64 = 0.2;
const CLASSIFY_MAX_TOKENS: u32 = 300;
const RESPOND_TEMPERATURE: f64 = 0.6;
const RESPOND_MAX_TOKENS: u32 = 800;
const HISTORY_WINDOW: usize = 5;

/* ========================= WIRE TYPES ========================= */

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// The JSON object the model is asked to produce. Everything is optional and
/// loosely typed; [`normalize`] turns it into validated [`Entities`].
#[derive(Debug, Default, Deserialize)]
struct RawAnalysis {
    intent: Option<String>,
    confidence: Option<f64>,
    #[serde(default)]
    entities: RawEntities,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntities {
    date: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    leave_type: Option<String>,
    reason: Option<String>,
    #[serde(rename = "type")]
    request_type: Option<String>,
    month: Option<Value>,
    year: Option<i32>,
    duration_days: Option<f64>,
    is_half_day: Option<bool>,
}

/* ========================= CLIENT ========================= */

/// Client for an OpenAI-compatible chat completions endpoint (Groq by default).
#[derive(Clone)]
pub struct GroqClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GroqClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClassifyError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    async fn complete(
        &self,
        messages: Value,
        temperature: f64,
        max_tokens: u32,
        json_mode: bool,
    ) -> Result<String, ClassifyError> {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });
        if json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let completion: ChatCompletion = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ClassifyError::InvalidResponse("empty completion".into()))
    }
}

fn classification_prompt(message: &str, reference: NaiveDate) -> String {
    let today = reference.format("%A, %B %-d, %Y");
    format!(
        r#"You are an HR assistant.
Current Date: {today}

Map the user's request to the closest system intent and extract entities.
Standardize dates to YYYY-MM-DD. If a year is not specified, use the year of the Current Date.

User Query: "{message}"

System Intents:
- apply_leave: User wants to request time off
- apply_wfh: User wants to work from home
- leave_balance: Check remaining leaves
- holiday_list: View company holidays
- leave_policy: Questions about leave policies
- wfh_policy: Questions about WFH policies
- reimbursement_info: Questions about reimbursements
- view_requests: See existing leave/WFH requests
- general_query: General HR question
- greeting: Simple greeting or small talk

Respond in JSON ONLY:
{{
  "intent": "<primary_intent>",
  "confidence": <0.0-1.0>,
  "entities": {{"date": "YYYY-MM-DD", "startDate": "YYYY-MM-DD", "endDate": "YYYY-MM-DD", "leaveType": "ANNUAL|SICK|CASUAL", "reason": "...", "type": "leave|wfh|all", "month": "<month>", "year": <year>, "durationDays": <number>, "isHalfDay": <bool>}}
}}"#
    )
}

fn responder_prompt(context: &ClassifyContext) -> String {
    let today = context.reference.format("%A, %B %-d, %Y");
    let history = context
        .history
        .iter()
        .rev()
        .take(HISTORY_WINDOW)
        .rev()
        .map(|entry| match entry.role {
            Role::User => format!("User: {}", entry.text),
            Role::Assistant => format!("Assistant: {}", entry.text),
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are an HR assistant chatbot. Answer questions about leave, work from home, \
         holidays and reimbursements warmly and concisely (2-4 sentences for simple questions). \
         If you do not know something, point the employee to HR.\n\n\
         Current Date: {today}\nEmployee Name: {}\n\nRecent conversation:\n{history}",
        context.employee_name
    )
}

/* ========================= NORMALIZATION ========================= */

fn parse_month(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().map(|m| m as u32).filter(|m| (1..=12).contains(m)),
        Value::String(s) => s
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|m| (1..=12).contains(m))
            .or_else(|| month_from_name(s)),
        _ => None,
    }
}

fn parse_filter(value: &str) -> Option<RequestFilter> {
    match value.trim().to_lowercase().as_str() {
        "leave" => Some(RequestFilter::Leave),
        "wfh" => Some(RequestFilter::Wfh),
        "all" | "both" => Some(RequestFilter::All),
        _ => None,
    }
}

fn parse_entity_date(
    raw: Option<&str>,
    reference: NaiveDate,
    errors: &mut Vec<DateParseError>,
) -> Option<NaiveDate> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match parse_single_date(raw, reference) {
        Ok(date) => Some(date),
        Err(DateParseError::Unrecognized | DateParseError::NoText) => None,
        Err(e) => {
            errors.push(e);
            None
        }
    }
}

/// Runs the model's loosely-typed output through the same date and enum
/// parsers the rules use.
fn normalize(raw: RawAnalysis, reference: NaiveDate) -> Result<Analysis, ClassifyError> {
    let intent_name = raw
        .intent
        .ok_or_else(|| ClassifyError::InvalidResponse("missing intent".into()))?;
    let intent = Intent::from_str(intent_name.trim())
        .map_err(|_| ClassifyError::InvalidResponse(format!("unknown intent {intent_name}")))?;

    let e = raw.entities;
    let mut date_errors = Vec::new();
    let mut start_date = parse_entity_date(
        e.start_date.as_deref().or(e.date.as_deref()),
        reference,
        &mut date_errors,
    );
    let mut end_date = parse_entity_date(e.end_date.as_deref(), reference, &mut date_errors)
        .or(start_date);

    if let (Some(start), Some(end)) = (start_date, end_date) {
        if end < start {
            date_errors.push(DateParseError::EndBeforeStart);
            start_date = None;
            end_date = None;
        }
    }

    let is_half_day = e.is_half_day.unwrap_or(false);
    let duration = DurationSpec {
        days: if is_half_day { Some(0.5) } else { e.duration_days.filter(|d| *d > 0.0) },
        is_half_day,
        has_explicit_duration: e.duration_days.is_some() || is_half_day,
    };

    Ok(Analysis {
        intent,
        confidence: raw.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
        entities: Entities {
            start_date,
            end_date,
            date_errors,
            duration,
            leave_type: e.leave_type.as_deref().and_then(|t| LeaveType::from_str(t.trim()).ok()),
            reason: e.reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            month: e.month.as_ref().and_then(parse_month),
            year: e.year,
            request_filter: e.request_type.as_deref().and_then(parse_filter),
        },
        source: AnalysisSource::Llm,
    })
}

#[async_trait]
impl IntentClassifier for GroqClient {
    #[instrument(name = "llm_classify", skip(self, message, context), fields(model = %self.model))]
    async fn classify(
        &self,
        message: &str,
        context: &ClassifyContext,
    ) -> Result<Analysis, ClassifyError> {
        let messages = json!([
            { "role": "user", "content": classification_prompt(message, context.reference) }
        ]);
        let content = self
            .complete(messages, CLASSIFY_TEMPERATURE, CLASSIFY_MAX_TOKENS, true)
            .await?;

        let raw: RawAnalysis = serde_json::from_str(&content).map_err(|e| {
            warn!(error = %e, "LLM returned non-JSON classification");
            ClassifyError::InvalidResponse(e.to_string())
        })?;
        let analysis = normalize(raw, context.reference)?;
        debug!(intent = %analysis.intent, confidence = analysis.confidence, "LLM classified message");
        Ok(analysis)
    }
}

#[async_trait]
impl Responder for GroqClient {
    #[instrument(name = "llm_respond", skip(self, message, context), fields(model = %self.model))]
    async fn respond(
        &self,
        message: &str,
        context: &ClassifyContext,
    ) -> Result<String, ClassifyError> {
        let messages = json!([
            { "role": "system", "content": responder_prompt(context) },
            { "role": "user", "content": message }
        ]);
        self.complete(messages, RESPOND_TEMPERATURE, RESPOND_MAX_TOKENS, false)
            .await
    }
}

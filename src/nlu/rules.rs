use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::entities::{
    LEAVE_WORDS, WFH_WORDS, explicit_leave_type, extract_holiday_entities, extract_leave_entities,
    extract_request_filter, extract_wfh_entities,
};
use super::{Analysis, AnalysisSource, ClassifyContext, Entities, Intent, IntentClassifier};
use crate::error::ClassifyError;
use crate::parser::{MONTHS, WEEKDAYS};

const RULE_CONFIDENCE: f64 = 0.9;
const DEFAULT_CONFIDENCE: f64 = 0.5;

static VIEW_REQUESTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\b(?:my|show|view|list|see|display|check)\b.*\b(?:requests|applications)\b",
        r"|\bmy\s+(?:leave\s+|wfh\s+)?(?:requests?|applications?)\b",
        r"|\b(?:leave|request|wfh)\s+(?:history|status)\b",
        r"|\b(?:view|show|list|see)\s+(?:my\s+|all\s+)?(?:leaves|wfhs?)\b",
    ))
    .unwrap()
});
static GREETING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:hi+|hello|hey|greetings|namaste|good\s+(?:morning|afternoon|evening))\b")
        .unwrap()
});
static POLICY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:policy|policies|rules?|guidelines?|eligib\w*|allowed)\b").unwrap()
});
static HOLIDAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bholidays?\b").unwrap());
static BALANCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:balance|remaining|left|available|how\s+many|quota|entitle\w*)\b").unwrap()
});
static BARE_BALANCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bbalance\b").unwrap());
static LEAVE_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:vacation|sick|unwell|off\s+tomorrow|off\s+today)\b").unwrap()
});
static APPLICATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:apply|applying|take|taking|need|want|request|book|plan|planning|going)\b")
        .unwrap()
});
static DATE_SIGNAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\d|\b(?:today|tomorrow|yesterday|next\s+week|{MONTHS}|{WEEKDAYS})\b"
    ))
    .unwrap()
});
static REIMBURSEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:reimburse\w*|expenses?|claims?|bills?)\b").unwrap());

/// One named intent rule. Rules are tried in order; the first match wins.
struct Rule {
    name: &'static str,
    intent: Intent,
    matches: fn(&str) -> bool,
}

fn is_view_requests(text: &str) -> bool {
    VIEW_REQUESTS.is_match(text)
}

fn is_greeting(text: &str) -> bool {
    text.split_whitespace().count() <= 3 && GREETING.is_match(text)
}

fn is_wfh_policy(text: &str) -> bool {
    WFH_WORDS.is_match(text) && POLICY.is_match(text)
}

fn is_wfh(text: &str) -> bool {
    WFH_WORDS.is_match(text)
}

fn is_holiday_question(text: &str) -> bool {
    HOLIDAY.is_match(text) && !LEAVE_WORDS.is_match(text)
}

fn is_leave_balance(text: &str) -> bool {
    (LEAVE_WORDS.is_match(text) && BALANCE.is_match(text)) || BARE_BALANCE.is_match(text)
}

fn is_leave_policy(text: &str) -> bool {
    LEAVE_WORDS.is_match(text) && POLICY.is_match(text)
}

fn is_leave_application(text: &str) -> bool {
    let about_leave = LEAVE_WORDS.is_match(text) || LEAVE_HINT.is_match(text);
    about_leave && (APPLICATION.is_match(text) || DATE_SIGNAL.is_match(text))
}

fn is_reimbursement(text: &str) -> bool {
    REIMBURSEMENT.is_match(text)
}

static RULES: &[Rule] = &[
    Rule { name: "view_requests", intent: Intent::ViewRequests, matches: is_view_requests },
    Rule { name: "short_greeting", intent: Intent::Greeting, matches: is_greeting },
    Rule { name: "wfh_policy", intent: Intent::WfhPolicy, matches: is_wfh_policy },
    Rule { name: "wfh_keyword", intent: Intent::ApplyWfh, matches: is_wfh },
    Rule { name: "holiday_question", intent: Intent::HolidayList, matches: is_holiday_question },
    Rule { name: "leave_balance", intent: Intent::LeaveBalance, matches: is_leave_balance },
    Rule { name: "leave_policy", intent: Intent::LeavePolicy, matches: is_leave_policy },
    Rule { name: "leave_application", intent: Intent::ApplyLeave, matches: is_leave_application },
    Rule { name: "reimbursement", intent: Intent::ReimbursementInfo, matches: is_reimbursement },
];

/// Entities each intent cares about, extracted without any model.
pub fn entities_for(intent: Intent, message: &str, reference: NaiveDate) -> Entities {
    match intent {
        Intent::ApplyLeave => extract_leave_entities(message, reference),
        Intent::ApplyWfh => extract_wfh_entities(message, reference),
        Intent::HolidayList => extract_holiday_entities(message, reference),
        Intent::LeaveBalance => Entities {
            leave_type: explicit_leave_type(message),
            ..Default::default()
        },
        Intent::ViewRequests => Entities {
            request_filter: extract_request_filter(message),
            ..Default::default()
        },
        _ => Entities::default(),
    }
}

/// Deterministic classifier over a fixed, priority-ordered rule list.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedClassifier;

impl RuleBasedClassifier {
    pub fn analyze(&self, message: &str, reference: NaiveDate) -> Analysis {
        let lower = message.trim().to_lowercase();
        let matched = RULES.iter().find(|rule| (rule.matches)(&lower));

        let (intent, confidence) = match matched {
            Some(rule) => {
                debug!(rule = rule.name, intent = %rule.intent, "Intent rule matched");
                (rule.intent, RULE_CONFIDENCE)
            }
            None => (Intent::GeneralQuery, DEFAULT_CONFIDENCE),
        };

        Analysis {
            intent,
            confidence,
            entities: entities_for(intent, message, reference),
            source: AnalysisSource::Rules,
        }
    }
}

#[async_trait]
impl IntentClassifier for RuleBasedClassifier {
    async fn classify(
        &self,
        message: &str,
        context: &ClassifyContext,
    ) -> Result<Analysis, ClassifyError> {
        Ok(self.analyze(message, context.reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent_of(message: &str) -> Intent {
        RuleBasedClassifier
            .analyze(message, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap())
            .intent
    }

    #[test]
    fn test_rule_priority() {
        assert_eq!(intent_of("show my leave requests"), Intent::ViewRequests);
        assert_eq!(intent_of("hi there"), Intent::Greeting);
        assert_eq!(intent_of("what is the wfh policy"), Intent::WfhPolicy);
        assert_eq!(intent_of("I want to work from home tomorrow"), Intent::ApplyWfh);
        assert_eq!(intent_of("how many holidays in march"), Intent::HolidayList);
        assert_eq!(intent_of("how many sick leaves do I have left"), Intent::LeaveBalance);
        assert_eq!(intent_of("what is the leave policy"), Intent::LeavePolicy);
        assert_eq!(intent_of("2 days casual leave from tomorrow"), Intent::ApplyLeave);
        assert_eq!(intent_of("Apply for leave 15-04-2026 to 19-05-2026"), Intent::ApplyLeave);
        assert_eq!(intent_of("how do I claim travel expenses"), Intent::ReimbursementInfo);
        assert_eq!(intent_of("doctor visit"), Intent::GeneralQuery);
    }

    #[test]
    fn test_greeting_must_be_short() {
        assert_ne!(intent_of("hi I want to apply for leave tomorrow"), Intent::Greeting);
        // "this" must not read as "hi"
        assert_ne!(intent_of("this one"), Intent::Greeting);
    }

    #[test]
    fn test_leave_entities_attached() {
        let analysis = RuleBasedClassifier
            .analyze("2 days casual leave from tomorrow", NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(analysis.entities.start_date, NaiveDate::from_ymd_opt(2026, 3, 3));
        assert_eq!(analysis.entities.duration.days, Some(2.0));
        assert_eq!(analysis.confidence, RULE_CONFIDENCE);
    }
}

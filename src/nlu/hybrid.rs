use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use super::rules::RuleBasedClassifier;
use super::{Analysis, AnalysisSource, ClassifyContext, Intent, IntentClassifier};
use crate::error::ClassifyError;

const FALLBACK_CONFIDENCE: f64 = 0.6;

/// Rules first; the model only for messages rules cannot settle on their own.
///
/// A model failure or timeout never surfaces: the rule analysis is returned
/// with [`AnalysisSource::Fallback`].
pub struct HybridClassifier {
    rules: RuleBasedClassifier,
    llm: Option<Arc<dyn IntentClassifier>>,
    timeout: Duration,
}

impl HybridClassifier {
    pub fn new(llm: Option<Arc<dyn IntentClassifier>>, timeout: Duration) -> Self {
        Self {
            rules: RuleBasedClassifier,
            llm,
            timeout,
        }
    }

    pub fn rules_only() -> Self {
        Self::new(None, Duration::ZERO)
    }

    fn is_fast_path(analysis: &Analysis) -> bool {
        match analysis.intent {
            Intent::ViewRequests | Intent::HolidayList | Intent::Greeting => true,
            Intent::ApplyLeave | Intent::ApplyWfh => analysis.entities.start_date.is_some(),
            _ => false,
        }
    }
}

#[async_trait]
impl IntentClassifier for HybridClassifier {
    #[instrument(name = "classify", skip(self, message, context))]
    async fn classify(
        &self,
        message: &str,
        context: &ClassifyContext,
    ) -> Result<Analysis, ClassifyError> {
        let rule_analysis = self.rules.analyze(message, context.reference);

        if Self::is_fast_path(&rule_analysis) {
            info!(intent = %rule_analysis.intent, "Fast-tracked by rules");
            return Ok(rule_analysis);
        }

        let Some(llm) = &self.llm else {
            return Ok(rule_analysis);
        };

        let outcome = tokio::time::timeout(self.timeout, llm.classify(message, context))
            .await
            .unwrap_or(Err(ClassifyError::Timeout));

        match outcome {
            Ok(mut analysis) => {
                // rule entities cover whatever the model left out
                let rule_entities = super::rules::entities_for(analysis.intent, message, context.reference);
                analysis.entities.fill_missing_from(rule_entities);
                Ok(analysis)
            }
            Err(e) => {
                warn!(error = %e, intent = %rule_analysis.intent, "Falling back to rule-based intent");
                Ok(Analysis {
                    confidence: FALLBACK_CONFIDENCE,
                    source: AnalysisSource::Fallback,
                    ..rule_analysis
                })
            }
        }
    }
}

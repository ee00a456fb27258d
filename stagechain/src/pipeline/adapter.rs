//! Derives the next stage's payload from a stage response.

use crate::core::{PipelinePayload, StageIdentifier, StageKind};
use crate::errors::AdapterError;
use serde_json::Value;

/// Field the cleaner's transactions are read from.
pub const CLEANED_TRANSACTIONS: &str = "cleaned_transactions";
/// Field the preprocessor's grouped data is read from.
pub const PROCESSED_DATA: &str = "processed_data";

/// Per-kind extraction rules between stages. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageDataAdapter;

impl StageDataAdapter {
    /// Maps a stage response to the payload of the following stage.
    ///
    /// | kind | next payload |
    /// |---|---|
    /// | cleaner | `{"data": body.cleaned_transactions}` |
    /// | preprocessor | `{"data": body.processed_data}` |
    /// | normalizer | `body` |
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::UnknownStageKind`] for stages without a rule
    /// and [`AdapterError::MissingField`] when the extracted field is absent.
    pub fn adapt(stage: &StageIdentifier, body: &Value) -> Result<PipelinePayload, AdapterError> {
        let kind = stage
            .kind()
            .ok_or_else(|| AdapterError::UnknownStageKind(stage.to_string()))?;

        let field = match kind {
            StageKind::Cleaner => CLEANED_TRANSACTIONS,
            StageKind::Preprocessor => PROCESSED_DATA,
            StageKind::Normalizer => return Ok(PipelinePayload::from_value(body.clone())),
        };

        body.get(field)
            .map(|data| PipelinePayload::wrap(data.clone()))
            .ok_or_else(|| AdapterError::MissingField {
                stage: stage.to_string(),
                field,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_cleaner_rule() {
        let body = json!({"cleaned_transactions": [{"amount": 1}], "metadata": {}});
        let next = StageDataAdapter::adapt(&"cleaner".into(), &body).unwrap();
        assert_eq!(next.as_value(), &json!({"data": [{"amount": 1}]}));
    }

    #[test]
    fn test_preprocessor_rule_accepts_alias() {
        let body = json!({"processed_data": {"categories": {}}});
        let next = StageDataAdapter::adapt(&"data-preprocessor".into(), &body).unwrap();
        assert_eq!(next.as_value(), &json!({"data": {"categories": {}}}));
    }

    #[test]
    fn test_normalizer_passes_body_through() {
        let body = json!({"analysis": {"summary": {"net_balance": 0}}});
        let next = StageDataAdapter::adapt(&"normalizer".into(), &body).unwrap();
        assert_eq!(next.as_value(), &body);
    }

    #[test]
    fn test_unknown_kind() {
        let err = StageDataAdapter::adapt(&"summarizer".into(), &json!({})).unwrap_err();
        assert_eq!(err, AdapterError::UnknownStageKind("summarizer".to_string()));
    }

    #[test]
    fn test_missing_field() {
        let err = StageDataAdapter::adapt(&"cleaner".into(), &json!({"rows": []})).unwrap_err();
        assert_eq!(
            err,
            AdapterError::MissingField {
                stage: "cleaner".to_string(),
                field: CLEANED_TRANSACTIONS
            }
        );
    }

    #[test]
    fn test_adapt_is_pure() {
        let body = json!({"cleaned_transactions": []});
        let first = StageDataAdapter::adapt(&"cleaner".into(), &body).unwrap();
        let second = StageDataAdapter::adapt(&"cleaner".into(), &body).unwrap();
        assert_eq!(first, second);
        assert_eq!(body, json!({"cleaned_transactions": []}));
    }
}

//! Strict parsing of model replies into [`TriageResult`].

use serde::Deserialize;

use super::traits::TriageError;
use crate::ticket::{TicketCategory, TicketUrgency, TriageResult};

/// Shape the model is asked to return. Unknown keys are rejected.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawTriageReply {
    category: String,
    sentiment_score: serde_json::Number,
    urgency: String,
    draft_response: String,
}

/// Parse a model reply. Either every field is valid or the whole reply is
/// rejected.
pub fn parse_triage_result(text: &str) -> Result<TriageResult, TriageError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TriageError::EmptyResponse);
    }

    // Tolerate code fences or chatter around the object
    let json_str = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    };

    let raw: RawTriageReply = serde_json::from_str(json_str)
        .map_err(|e| TriageError::InvalidResult(e.to_string()))?;

    let category = raw
        .category
        .parse::<TicketCategory>()
        .map_err(TriageError::InvalidResult)?;
    let urgency = raw
        .urgency
        .parse::<TicketUrgency>()
        .map_err(TriageError::InvalidResult)?;
    let sentiment_score = sentiment_from_number(&raw.sentiment_score)?;

    let draft_response = raw.draft_response.trim();
    if draft_response.is_empty() {
        return Err(TriageError::InvalidResult(
            "draftResponse must not be empty".to_string(),
        ));
    }

    Ok(TriageResult {
        category,
        sentiment_score,
        urgency,
        draft_response: draft_response.to_string(),
    })
}

fn sentiment_from_number(n: &serde_json::Number) -> Result<u8, TriageError> {
    let value = match n.as_u64() {
        Some(v) => Some(v),
        // 7.0 is accepted, 7.5 is not
        None => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0)
            .map(|f| f as u64),
    };

    match value {
        Some(v @ 1..=10) => Ok(v as u8),
        _ => Err(TriageError::InvalidResult(format!(
            "sentimentScore must be an integer between 1 and 10, got {}",
            n
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"category":"BILLING","sentimentScore":3,"urgency":"HIGH","draftResponse":"  Sorry about the double charge.  "}"#;

    #[test]
    fn test_parse_valid_reply() {
        let result = parse_triage_result(VALID).unwrap();
        assert_eq!(result.category, TicketCategory::Billing);
        assert_eq!(result.sentiment_score, 3);
        assert_eq!(result.urgency, TicketUrgency::High);
        assert_eq!(result.draft_response, "Sorry about the double charge.");
    }

    #[test]
    fn test_parse_tolerates_code_fences() {
        let text = format!("```json\n{}\n```", VALID);
        let result = parse_triage_result(&text).unwrap();
        assert_eq!(result.category, TicketCategory::Billing);
    }

    #[test]
    fn test_parse_whole_float_sentiment() {
        let text = r#"{"category":"TECHNICAL","sentimentScore":7.0,"urgency":"LOW","draftResponse":"On it."}"#;
        assert_eq!(parse_triage_result(text).unwrap().sentiment_score, 7);
    }

    #[test]
    fn test_empty_reply() {
        let err = parse_triage_result("   ").unwrap_err();
        assert!(matches!(err, TriageError::EmptyResponse));
        assert_eq!(err.to_string(), "Empty AI response");
    }

    #[test]
    fn test_rejects_out_of_range_sentiment() {
        for score in ["0", "11", "-2", "5.5"] {
            let text = format!(
                r#"{{"category":"BILLING","sentimentScore":{},"urgency":"HIGH","draftResponse":"x"}}"#,
                score
            );
            assert!(
                matches!(parse_triage_result(&text), Err(TriageError::InvalidResult(_))),
                "score {} should be rejected",
                score
            );
        }
    }

    #[test]
    fn test_rejects_unknown_enum_values() {
        let text = r#"{"category":"SALES","sentimentScore":5,"urgency":"HIGH","draftResponse":"x"}"#;
        assert!(matches!(
            parse_triage_result(text),
            Err(TriageError::InvalidResult(_))
        ));

        let text = r#"{"category":"BILLING","sentimentScore":5,"urgency":"URGENT","draftResponse":"x"}"#;
        assert!(matches!(
            parse_triage_result(text),
            Err(TriageError::InvalidResult(_))
        ));
    }

    #[test]
    fn test_rejects_blank_draft_and_missing_or_extra_keys() {
        let blank = r#"{"category":"BILLING","sentimentScore":5,"urgency":"HIGH","draftResponse":"   "}"#;
        assert!(parse_triage_result(blank).is_err());

        let missing = r#"{"category":"BILLING","sentimentScore":5,"urgency":"HIGH"}"#;
        assert!(parse_triage_result(missing).is_err());

        let extra = r#"{"category":"BILLING","sentimentScore":5,"urgency":"HIGH","draftResponse":"x","confidence":0.9}"#;
        assert!(parse_triage_result(extra).is_err());
    }

    #[test]
    fn test_rejects_non_json() {
        assert!(matches!(
            parse_triage_result("I think this is a billing issue."),
            Err(TriageError::InvalidResult(_))
        ));
    }
}

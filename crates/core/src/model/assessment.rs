use serde::{Deserialize, Serialize};

use crate::model::ids::{QuestionId, UserId};

/// A free-text assessment question, answered before a roadmap is generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentQuestion {
    pub id: QuestionId,
    pub question_text: String,
    pub domain: String,
    pub question_order: u32,
}

/// One free-text response, keyed by the question's position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub question_id: i64,
    pub response_text: String,
}

/// Request body for the external scoring service's `/assess` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRequest {
    pub user_id: UserId,
    pub responses: Vec<QuestionResponse>,
}

/// Per-domain evaluation returned by the scoring service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvaluation {
    pub domain: String,
    pub score: f64,
    pub gaps_identified: Vec<String>,
    pub priority: u8,
}

/// The scoring service's classification, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentOutcome {
    pub assessment_id: String,
    pub classification: String,
    pub confidence_score: f64,
    pub reasoning: String,
    pub domain_evaluations: Vec<DomainEvaluation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_to_the_scoring_service_shape() {
        let request = AssessmentRequest {
            user_id: UserId::new("u-9"),
            responses: vec![QuestionResponse {
                question_id: 1,
                response_text: "Congress makes laws".into(),
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["user_id"], "u-9");
        assert_eq!(json["responses"][0]["question_id"], 1);
        assert_eq!(json["responses"][0]["response_text"], "Congress makes laws");
    }

    #[test]
    fn outcome_deserializes_from_the_scoring_service_shape() {
        let body = r#"{
            "assessment_id": "a-1",
            "classification": "partial",
            "confidence_score": 0.82,
            "reasoning": "solid on structure, weak on elections",
            "domain_evaluations": [
                {"domain": "elections", "score": 0.4, "gaps_identified": ["primaries"], "priority": 1}
            ]
        }"#;
        let outcome: AssessmentOutcome = serde_json::from_str(body).unwrap();
        assert_eq!(outcome.classification, "partial");
        assert_eq!(outcome.domain_evaluations.len(), 1);
        assert_eq!(outcome.domain_evaluations[0].priority, 1);
    }
}

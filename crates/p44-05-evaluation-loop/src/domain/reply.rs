//! Scorer request/reply bodies and reply validation.

use serde::{Deserialize, Serialize};
use shared_types::{EvalSample, ScoreResponse};

/// Body of `POST <endpoint>/score`: one inner list per batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub cycle_id: String,
    pub chunks: Vec<Vec<EvalSample>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReply {
    pub responses: Vec<ScoreResponse>,
}

/// Responses ordered by chunk index, if the reply answers every index in
/// `0..n` exactly once with a finite risk in `[0, 1]`.
pub fn validate_reply(reply: &ScoreReply, n: usize) -> Result<Vec<ScoreResponse>, String> {
    if reply.responses.len() != n {
        return Err(format!("expected {n} responses, got {}", reply.responses.len()));
    }
    let mut slots: Vec<Option<ScoreResponse>> = vec![None; n];
    for response in &reply.responses {
        if !response.risk_score.is_finite() || !(0.0..=1.0).contains(&response.risk_score) {
            return Err(format!(
                "risk score {} at index {} out of range",
                response.risk_score, response.chunk_index
            ));
        }
        match slots.get_mut(response.chunk_index) {
            Some(slot @ None) => *slot = Some(*response),
            Some(Some(_)) => return Err(format!("duplicate index {}", response.chunk_index)),
            None => return Err(format!("index {} out of range", response.chunk_index)),
        }
    }
    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(chunk_index: usize, risk_score: f64) -> ScoreResponse {
        ScoreResponse {
            chunk_index,
            risk_score,
            prediction: risk_score >= 0.5,
        }
    }

    fn reply(responses: Vec<ScoreResponse>) -> ScoreReply {
        ScoreReply { responses }
    }

    #[test]
    fn test_valid_reply_is_reordered() {
        let ok = validate_reply(&reply(vec![r(1, 0.9), r(0, 0.1)]), 2).unwrap();
        assert_eq!(ok[0].chunk_index, 0);
        assert_eq!(ok[1].chunk_index, 1);
    }

    #[test]
    fn test_malformed_replies() {
        assert!(validate_reply(&reply(vec![r(0, 0.1)]), 2).is_err());
        assert!(validate_reply(&reply(vec![r(0, 0.1), r(0, 0.2)]), 2).is_err());
        assert!(validate_reply(&reply(vec![r(0, 0.1), r(2, 0.2)]), 2).is_err());
        assert!(validate_reply(&reply(vec![r(0, 1.5), r(1, 0.2)]), 2).is_err());
        assert!(validate_reply(&reply(vec![r(0, f64::NAN), r(1, 0.2)]), 2).is_err());
    }
}

mod block;

pub use block::{find_block_end, prune_empty_blocks, remove_lines_within_range};

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::errors::FuzzError;
use crate::transport::{Transport, TransportResponse};

static RECOVERABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)cannot return null for non-nullable field|field must have selections")
        .expect("recoverable error pattern is valid")
});

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Rewrites `payload` so the selections blamed by the first GraphQL error are
/// gone. Returns `None` when the error is not one we know how to repair.
pub fn repair_payload(payload: &str, body: &Value) -> Option<String> {
    let error = body.get("errors")?.as_array()?.first()?;
    let message = error.get("message")?.as_str()?;
    if !RECOVERABLE.is_match(message) {
        return None;
    }

    let mut lines: Vec<usize> = error
        .get("locations")?
        .as_array()?
        .iter()
        .filter_map(|loc| loc.get("line")?.as_u64())
        .filter(|line| *line > 0)
        .map(|line| line as usize - 1)
        .collect();
    if lines.is_empty() {
        return None;
    }
    // Bottom-up, so earlier removals do not shift later line numbers
    lines.sort_unstable_by(|a, b| b.cmp(a));
    lines.dedup();

    let mut repaired = payload.to_string();
    for start in lines {
        let end = find_block_end(&repaired, start);
        repaired = remove_lines_within_range(&repaired, start, end);
    }
    let repaired = prune_empty_blocks(&repaired);

    if repaired.trim().is_empty() || repaired == payload {
        return None;
    }
    Some(repaired)
}

#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub succeeded: bool,
    /// The last payload sent (the original when no repair was possible).
    pub payload: String,
    pub response: TransportResponse,
    pub attempts: u32,
}

/// Repairs and resends payloads rejected for recoverable reasons.
#[derive(Debug, Clone)]
pub struct Retrier {
    max_retries: u32,
}

impl Default for Retrier {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl Retrier {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub async fn retry(
        &self,
        transport: &dyn Transport,
        url: &str,
        payload: &str,
        response: TransportResponse,
    ) -> Result<RetryOutcome, FuzzError> {
        let mut outcome = RetryOutcome {
            succeeded: false,
            payload: payload.to_string(),
            response,
            attempts: 0,
        };

        while outcome.attempts < self.max_retries {
            let Some(repaired) = repair_payload(&outcome.payload, &outcome.response.body) else {
                debug!("Error is not recoverable, giving up");
                break;
            };
            outcome.attempts += 1;
            debug!(attempt = outcome.attempts, payload = %repaired, "Retrying with repaired payload");

            outcome.response = transport.send_request(url, &repaired).await?;
            outcome.payload = repaired;
            if !outcome.response.has_errors() {
                info!(attempts = outcome.attempts, "Retry succeeded");
                outcome.succeeded = true;
                break;
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CREATE_USER: &str = "mutation {\n  createUser(name: \"A\") {\n    id\n    name\n    email\n  }\n}";

    #[test]
    fn test_removes_blamed_scalar() {
        let body = json!({"errors": [{
            "message": "Cannot return null for non-nullable field User.email.",
            "locations": [{"line": 5, "column": 5}]
        }]});
        let repaired = repair_payload(CREATE_USER, &body).unwrap();
        assert_eq!(repaired, "mutation {\n  createUser(name: \"A\") {\n    id\n    name\n  }\n}");
    }

    #[test]
    fn test_multiple_locations_bottom_up() {
        let body = json!({"errors": [{
            "message": "cannot return null for non-nullable field",
            "locations": [{"line": 3}, {"line": 5}]
        }]});
        let repaired = repair_payload(CREATE_USER, &body).unwrap();
        assert_eq!(repaired, "mutation {\n  createUser(name: \"A\") {\n    name\n  }\n}");
    }

    #[test]
    fn test_unrecoverable_errors() {
        let other = json!({"errors": [{"message": "Not authorized", "locations": [{"line": 2}]}]});
        assert!(repair_payload(CREATE_USER, &other).is_none());

        let no_location = json!({"errors": [{"message": "Field must have selections"}]});
        assert!(repair_payload(CREATE_USER, &no_location).is_none());

        let no_message = json!({"errors": [{"locations": [{"line": 2}]}]});
        assert!(repair_payload(CREATE_USER, &no_message).is_none());
    }

    #[test]
    fn test_removing_everything_is_not_a_repair() {
        let body = json!({"errors": [{
            "message": "Field must have selections",
            "locations": [{"line": 1}]
        }]});
        assert!(repair_payload(CREATE_USER, &body).is_none());
    }
}

use tracing::{debug, info};

use super::extract;
use crate::error::ParseError;
use crate::service::{CompletionRequest, ServiceFailure, TextParsingService};

const CHECK_TEXT: &str = "milk";

/// Hands the raw text to a [`TextParsingService`] and reads back item names.
pub struct DelegatedParser<S> {
    service: S,
    max_tokens: u32,
}

impl<S: TextParsingService> DelegatedParser<S> {
    pub fn new(service: S, max_tokens: u32) -> Self {
        DelegatedParser {
            service,
            max_tokens,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub(crate) fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Ask the service to split and normalize `text` into item names.
    pub async fn parse(&self, text: &str, credential: &str) -> Result<Vec<String>, ParseError> {
        if credential.trim().is_empty() {
            return Err(ParseError::MissingCredential);
        }
        if text.trim().is_empty() {
            return Err(ParseError::EmptyInput);
        }

        let request = CompletionRequest {
            prompt: build_prompt(text),
            max_tokens: self.max_tokens,
            image: None,
        };
        let reply = self
            .service
            .complete(credential, &request)
            .await
            .map_err(map_failure)?;
        debug!(reply_chars = reply.len(), "delegated parse reply");

        let names = names_from_reply(&reply)?;
        info!("Delegated parsing returned {} items", names.len());
        Ok(names)
    }

    /// Check the credential with a trivial request. Only an explicit
    /// authentication failure counts as invalid.
    pub async fn validate(&self, credential: &str) -> bool {
        if credential.trim().is_empty() {
            return false;
        }
        match self.parse(CHECK_TEXT, credential).await {
            Err(ParseError::AuthenticationFailed) => false,
            Err(e) => {
                debug!(error = %e, "credential check inconclusive, assuming valid");
                true
            }
            Ok(_) => true,
        }
    }
}

pub(crate) fn map_failure(failure: ServiceFailure) -> ParseError {
    match failure {
        ServiceFailure::Status { status: 401, .. } => ParseError::AuthenticationFailed,
        ServiceFailure::Status { status: 429, .. } => ParseError::QuotaExceeded,
        ServiceFailure::Status { status, .. } => ParseError::ServiceError(status),
        ServiceFailure::Transport(msg) => ParseError::Network(msg),
        ServiceFailure::Envelope(msg) => ParseError::MalformedResponse(msg),
    }
}

/// Pull the JSON string array out of a reply and drop blank entries.
pub fn names_from_reply(reply: &str) -> Result<Vec<String>, ParseError> {
    let payload = extract::json_array(reply)
        .ok_or_else(|| ParseError::MalformedResponse("no JSON array in reply".to_string()))?;
    let names: Vec<String> = serde_json::from_str(payload)
        .map_err(|e| ParseError::MalformedResponse(e.to_string()))?;
    Ok(names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect())
}

fn build_prompt(text: &str) -> String {
    format!(
        r#"You turn a dictated or typed shopping list into separate grocery items.

SHOPPING LIST:
{text}

Rules:
- One entry per product. Split on commas, "and", "also" and similar fillers.
- Keep the product wording short; drop filler words like "please" or "we need".
- Rewrite quantities into a compact prefix:
  "twice X" or "two X" -> "2x X"
  "300 grams X" -> "300g X"
  "half a kilo X" -> "500g X"
  "a kilo X" -> "1kg X"
  "a liter X" -> "1l X"
  "half a liter X" -> "500ml X"
- Leave items without a quantity as they are.

Respond ONLY with a JSON array of strings, no markdown, no explanation.
Example: ["2x milk", "500g minced beef", "bread"]"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::stub::StubService;

    #[tokio::test]
    async fn fenced_reply() {
        let parser = DelegatedParser::new(StubService::replying("```json\n[\"milk\", \"bread\"]\n```"), 256);
        let names = parser.parse("milk and bread", "key").await.unwrap();
        assert_eq!(names, vec!["milk", "bread"]);
    }

    #[tokio::test]
    async fn blank_entries_dropped() {
        let parser = DelegatedParser::new(StubService::replying(r#"[" eggs ", "", "   ", "2x milk"]"#), 256);
        let names = parser.parse("eggs, milk twice", "key").await.unwrap();
        assert_eq!(names, vec!["eggs", "2x milk"]);
    }

    #[tokio::test]
    async fn preconditions_checked_before_network() {
        let parser = DelegatedParser::new(StubService::replying("[]"), 256);
        assert_eq!(parser.parse("milk", "").await, Err(ParseError::MissingCredential));
        assert_eq!(parser.parse("milk", "  ").await, Err(ParseError::MissingCredential));
        assert_eq!(parser.parse(" \n", "key").await, Err(ParseError::EmptyInput));
        assert_eq!(parser.service().calls(), 0);
    }

    #[tokio::test]
    async fn status_mapping() {
        for (status, expected) in [
            (401, ParseError::AuthenticationFailed),
            (429, ParseError::QuotaExceeded),
            (500, ParseError::ServiceError(500)),
            (403, ParseError::ServiceError(403)),
        ] {
            let parser = DelegatedParser::new(StubService::failing(status), 256);
            assert_eq!(parser.parse("milk", "key").await, Err(expected));
        }
    }

    #[tokio::test]
    async fn malformed_replies() {
        for reply in ["no list here", r#"[1, 2, 3]"#, r#"["milk", "#, r#"{"items": "milk"}"#] {
            let parser = DelegatedParser::new(StubService::replying(reply), 256);
            let err = parser.parse("milk", "key").await.unwrap_err();
            assert!(matches!(err, ParseError::MalformedResponse(_)), "{reply}: {err:?}");
        }
    }

    #[tokio::test]
    async fn validate_only_rejects_auth_failures() {
        let rejected = DelegatedParser::new(StubService::failing(401), 16);
        assert!(!rejected.validate("bad").await);

        let quota = DelegatedParser::new(StubService::failing(429), 16);
        assert!(quota.validate("key").await);

        let broken = DelegatedParser::new(StubService::replying("nonsense"), 16);
        assert!(broken.validate("key").await);

        let ok = DelegatedParser::new(StubService::replying(r#"["milk"]"#), 16);
        assert!(ok.validate("key").await);
    }

    #[tokio::test]
    async fn validate_blank_credential() {
        let parser = DelegatedParser::new(StubService::replying(r#"["milk"]"#), 16);
        assert!(!parser.validate("").await);
        assert_eq!(parser.service().calls(), 0);
    }

    #[test]
    fn prompt_embeds_text_and_rules() {
        let prompt = build_prompt("two bottles of milk, half a kilo of mince");
        assert!(prompt.contains("two bottles of milk, half a kilo of mince"));
        assert!(prompt.contains("\"half a kilo X\" -> \"500g X\""));
        assert!(prompt.contains("JSON array of strings"));
    }
}

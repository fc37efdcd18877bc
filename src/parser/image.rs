use serde::{Deserialize, Serialize};
use tracing::info;

use super::classify::classify;
use super::delegated::{map_failure, DelegatedParser};
use super::{extract, sort_order};
use crate::error::ParseError;
use crate::model::Item;
use crate::service::{CompletionRequest, ImageAttachment, TextParsingService};

const IMAGE_PROMPT: &str = r#"Look at this photo of a fridge, pantry or shelf.

1. List the grocery products you can clearly see ("itemsFound").
2. Suggest products that appear to be running low or missing and should go on a shopping list ("suggestions").

Use short product names, one product per entry.

Respond ONLY with a JSON object, no markdown:
{"itemsFound": ["..."], "suggestions": ["..."]}"#;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysis {
    #[serde(default)]
    pub items_found: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl<S: TextParsingService> DelegatedParser<S> {
    /// Ask the service what is in the picture and what could be bought.
    pub async fn analyze_image(
        &self,
        image: ImageAttachment,
        credential: &str,
    ) -> Result<ImageAnalysis, ParseError> {
        if credential.trim().is_empty() {
            return Err(ParseError::MissingCredential);
        }
        if image.data.is_empty() {
            return Err(ParseError::EmptyInput);
        }

        let request = CompletionRequest {
            prompt: IMAGE_PROMPT.to_string(),
            max_tokens: self.max_tokens(),
            image: Some(image),
        };
        let reply = self
            .service()
            .complete(credential, &request)
            .await
            .map_err(map_failure)?;

        let analysis = analysis_from_reply(&reply)?;
        info!(
            found = analysis.items_found.len(),
            suggestions = analysis.suggestions.len(),
            "image analysis done"
        );
        Ok(analysis)
    }
}

pub fn analysis_from_reply(reply: &str) -> Result<ImageAnalysis, ParseError> {
    let payload = extract::json_object(reply)
        .ok_or_else(|| ParseError::MalformedResponse("no JSON object in reply".to_string()))?;
    let mut analysis: ImageAnalysis =
        serde_json::from_str(payload).map_err(|e| ParseError::MalformedResponse(e.to_string()))?;
    for list in [&mut analysis.items_found, &mut analysis.suggestions] {
        let cleaned: Vec<String> = list
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        *list = cleaned;
    }
    Ok(analysis)
}

/// Classify externally sourced names and key them after a list that already
/// holds `existing_len` items.
pub fn append_items(existing_len: usize, names: &[String]) -> Vec<Item> {
    let pairs = names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .map(|n| (n.to_string(), classify(n)))
        .collect();
    sort_order::append(existing_len, pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use crate::parser::stub::StubService;

    fn png() -> ImageAttachment {
        ImageAttachment {
            media_type: "image/png".to_string(),
            data: vec![0x89, 0x50, 0x4e, 0x47],
        }
    }

    #[tokio::test]
    async fn parses_fenced_object() {
        let reply = "Here you go:\n```json\n{\"itemsFound\": [\"milk\", \" \"], \"suggestions\": [\"butter\", \"apples\"]}\n```";
        let parser = DelegatedParser::new(StubService::replying(reply), 256);
        let analysis = parser.analyze_image(png(), "key").await.unwrap();
        assert_eq!(analysis.items_found, vec!["milk"]);
        assert_eq!(analysis.suggestions, vec!["butter", "apples"]);
    }

    #[tokio::test]
    async fn missing_fields_default_to_empty() {
        let parser = DelegatedParser::new(StubService::replying(r#"{"suggestions": ["eggs"]}"#), 256);
        let analysis = parser.analyze_image(png(), "key").await.unwrap();
        assert!(analysis.items_found.is_empty());
        assert_eq!(analysis.suggestions, vec!["eggs"]);
    }

    #[tokio::test]
    async fn preconditions() {
        let parser = DelegatedParser::new(StubService::replying("{}"), 256);
        assert_eq!(
            parser.analyze_image(png(), "").await,
            Err(ParseError::MissingCredential)
        );
        let empty = ImageAttachment {
            media_type: "image/png".to_string(),
            data: Vec::new(),
        };
        assert_eq!(parser.analyze_image(empty, "key").await, Err(ParseError::EmptyInput));
        assert_eq!(parser.service().calls(), 0);
    }

    #[tokio::test]
    async fn quota_is_mapped() {
        let parser = DelegatedParser::new(StubService::failing(429), 256);
        assert_eq!(
            parser.analyze_image(png(), "key").await,
            Err(ParseError::QuotaExceeded)
        );
    }

    #[test]
    fn not_an_object() {
        assert!(matches!(
            analysis_from_reply("[\"milk\"]"),
            Err(ParseError::MalformedResponse(_))
        ));
    }

    #[test]
    fn append_starts_at_list_length() {
        let names = vec!["butter".to_string(), "bread".to_string(), "  ".to_string()];
        let items = append_items(3, &names);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name(), "bread");
        assert_eq!(items[0].category(), Category::Bakery);
        assert_eq!(items[0].sort_order(), 4);
        assert_eq!(items[1].name(), "butter");
        assert_eq!(items[1].sort_order(), 2003);
    }
}

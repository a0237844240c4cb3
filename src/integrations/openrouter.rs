//! OpenRouter chat-completions client used to read receipt images.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{json, Value};

use super::IntegrationError;
use crate::config::OpenRouterSettings;

const TIMEOUT_SECS: u64 = 90;

const RECEIPT_PROMPT: &str = "Analyze these receipt or purchase order images and extract ALL items with their costs.
Return a JSON object where each key is the item name and the value is the price as a number.
Combine all items from all images into one object.
If multiple images show the same receipt, don't duplicate items.
Example format: {\"Milk\": 4.99, \"Bread\": 3.50, \"Eggs\": 5.99}";

/// Vision model client.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    pub fn new(settings: &OpenRouterSettings) -> Result<Self, IntegrationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send base64-encoded JPEG images to the model and return the items it
    /// found, keyed by name.
    pub async fn extract_receipt_items(
        &self,
        images_base64: &[String],
    ) -> Result<BTreeMap<String, f64>, IntegrationError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.receipt_request(images_base64))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IntegrationError::Status {
                service: "OpenRouter",
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        let content = body
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or("{}");
        parse_receipt_items(content)
    }

    fn receipt_request(&self, images_base64: &[String]) -> Value {
        let mut content = vec![json!({"type": "text", "text": RECEIPT_PROMPT})];
        content.extend(images_base64.iter().map(|img| {
            json!({
                "type": "image_url",
                "image_url": {"url": format!("data:image/jpeg;base64,{}", img)}
            })
        }));

        json!({
            "model": self.model,
            "messages": [{"role": "user", "content": content}],
            "response_format": {"type": "json_object"}
        })
    }
}

/// Parse the model's `{item: price}` answer.
///
/// Prices may be numbers or numeric strings; anything else is skipped.
/// A Markdown code fence around the JSON is tolerated.
pub fn parse_receipt_items(content: &str) -> Result<BTreeMap<String, f64>, IntegrationError> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed);

    let parsed: Value = serde_json::from_str(unfenced.trim())
        .map_err(|e| IntegrationError::Parse(format!("receipt items: {}", e)))?;
    let object = parsed
        .as_object()
        .ok_or_else(|| IntegrationError::Parse("receipt items are not an object".to_string()))?;

    Ok(object
        .iter()
        .filter_map(|(name, price)| {
            let price = match price {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }?;
            Some((name.clone(), price))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_items_skips_invalid_prices() {
        let items = parse_receipt_items(r#"{"Milk": 4.99, "Bread": "3.50", "Bag": "free", "Eggs": null}"#)
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items["Milk"], 4.99);
        assert_eq!(items["Bread"], 3.5);
    }

    #[test]
    fn test_parse_items_strips_code_fence() {
        let items = parse_receipt_items("```json\n{\"Tea\": 2}\n```").unwrap();
        assert_eq!(items["Tea"], 2.0);
    }

    #[test]
    fn test_parse_items_rejects_non_object() {
        assert!(parse_receipt_items("[1, 2]").is_err());
        assert!(parse_receipt_items("not json").is_err());
    }

    #[test]
    fn test_receipt_request_embeds_images() {
        let client = OpenRouterClient::new(&OpenRouterSettings {
            api_key: "k".into(),
            model: "m".into(),
            base_url: "https://example.invalid/api/".into(),
        })
        .unwrap();
        let request = client.receipt_request(&["AAAA".to_string(), "BBBB".to_string()]);
        let content = request["messages"][0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 3);
        assert_eq!(content[2]["image_url"]["url"], "data:image/jpeg;base64,BBBB");
        assert_eq!(request["model"], "m");
        assert_eq!(client.base_url, "https://example.invalid/api");
    }
}

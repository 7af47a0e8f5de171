use log::{trace, warn};
use serde_json::{json, Value};
use std::sync::Arc;

use super::command::Command;
use super::normalizer::{normalize_actions, FALLBACK_ASK};
use crate::core::shared::utils::truncate_for_log;
use crate::llm::LLMProvider;

const SYSTEM_PROMPT: &str = r#"You convert short notes from a small business owner into ledger actions.
Reply with JSON only, shaped as {"actions": [ ... ]}. One object per event, in the order mentioned.

Allowed actions and their fields:
- record_sale: product_name, quantity, unit_price, payment_status ("paid" or "unpaid")
- record_expense: expense_name, amount, category ("general" or "inventory")
- add_stock: product_name, quantity
- remove_stock: product_name, quantity
- create_product: product_name, reorder_threshold
- analytics: metric ("profit", "revenue", "expenses", "top_products"), period ("today" or "month"), payment_split (bool)
- send_email: to, subject, message
- create_invoice / create_receipt: to, items [{name, quantity, unit_price}], note, send_email (bool)
- unknown: ask (a short clarifying question)

Numbers must be plain JSON numbers without currency symbols. Omit fields you cannot infer.
If nothing in the note matches, return a single unknown action."#;

/// Pulls the JSON payload out of a completion that may wrap it in fences or prose.
pub fn extract_json(response: &str) -> Option<&str> {
    let response = response.trim();

    if let Some(start) = response.find("```") {
        let after_fence = start + 3;
        let body_start = response[after_fence..]
            .find('\n')
            .map(|i| after_fence + i + 1)
            .unwrap_or(after_fence);
        if let Some(end) = response[body_start..].find("```") {
            let body = response[body_start..body_start + end].trim();
            if !body.is_empty() {
                return Some(body);
            }
        }
    }

    let start = response.find(|c: char| c == '{' || c == '[')?;
    let end = response.rfind(|c: char| c == '}' || c == ']')?;
    (end > start).then(|| &response[start..=end])
}

fn actions_of(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove("actions") {
            Some(Value::Array(items)) => Some(items),
            Some(single @ Value::Object(_)) => Some(vec![single]),
            Some(_) => None,
            None if map.contains_key("action") => Some(vec![Value::Object(map)]),
            None => None,
        },
        _ => None,
    }
}

/// Turns a raw completion into commands; anything unusable becomes a single clarification.
pub fn interpret_reply(content: &str) -> Vec<Command> {
    let actions = extract_json(content)
        .and_then(|json| serde_json::from_str::<Value>(json).ok())
        .and_then(actions_of)
        .filter(|actions| !actions.is_empty());

    match actions {
        Some(actions) => normalize_actions(&actions),
        None => {
            warn!(
                "Remote extraction returned no usable actions: {}",
                truncate_for_log(content)
            );
            vec![Command::unknown(FALLBACK_ASK)]
        }
    }
}

pub struct RemoteExtractor {
    provider: Arc<dyn LLMProvider>,
}

impl RemoteExtractor {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    pub async fn extract(
        &self,
        text: &str,
    ) -> Result<Vec<Command>, Box<dyn std::error::Error + Send + Sync>> {
        trace!("Remote extraction for: {}", truncate_for_log(text));
        let config = json!({"temperature": 0, "max_tokens": 800});
        let content = self.provider.generate(SYSTEM_PROMPT, text, &config).await?;
        Ok(interpret_reply(&content))
    }
}

//! Splitwise REST client (API v3.0, bearer API key).
//!
//! ## Configuration
//!
//! ```toml
//! [splitwise]
//! api_key = "..."
//! base_url = "https://secure.splitwise.com/api/v3.0"  # optional
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::IntegrationError;
use crate::config::SplitwiseSettings;

const TIMEOUT_SECS: u64 = 30;

/// A Splitwise user or group member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitwiseUser {
    pub id: u64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl SplitwiseUser {
    /// `"First Last"`, or just the first name when there is no last name.
    pub fn display_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name,
            self.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }
}

/// A Splitwise group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitwiseGroup {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub members: Vec<SplitwiseUser>,
}

/// One participant of an expense.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseShare {
    pub user_id: u64,
    pub paid_share: f64,
    pub owed_share: f64,
}

/// An expense to create.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub group_id: u64,
    pub description: String,
    pub cost: f64,
    pub users: Vec<ExpenseShare>,
}

impl NewExpense {
    /// Flattened request body: amounts as two-decimal strings, participants
    /// as `users__N__field` keys.
    pub fn to_body(&self) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("group_id".into(), Value::from(self.group_id));
        body.insert("description".into(), Value::from(self.description.clone()));
        body.insert("cost".into(), Value::from(format_amount(self.cost)));
        for (i, share) in self.users.iter().enumerate() {
            body.insert(format!("users__{}__user_id", i), Value::from(share.user_id));
            body.insert(
                format!("users__{}__paid_share", i),
                Value::from(format_amount(share.paid_share)),
            );
            body.insert(
                format!("users__{}__owed_share", i),
                Value::from(format_amount(share.owed_share)),
            );
        }
        body
    }
}

/// The expense Splitwise created.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedExpense {
    pub id: u64,
    #[serde(default)]
    pub description: String,
}

/// Format a currency amount the way Splitwise expects it.
pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

// ============================================================================
// Client
// ============================================================================

/// Thin async client over the endpoints the panel needs.
#[derive(Debug, Clone)]
pub struct SplitwiseClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SplitwiseClient {
    pub fn new(settings: &SplitwiseSettings) -> Result<Self, IntegrationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    pub async fn current_user(&self) -> Result<SplitwiseUser, IntegrationError> {
        let body = self.get("get_current_user").await?;
        field(body, "user")
    }

    pub async fn groups(&self) -> Result<Vec<SplitwiseGroup>, IntegrationError> {
        let body = self.get("get_groups").await?;
        field(body, "groups")
    }

    pub async fn group(&self, group_id: u64) -> Result<SplitwiseGroup, IntegrationError> {
        let body = self.get(&format!("get_group/{}", group_id)).await?;
        field(body, "group")
    }

    pub async fn create_expense(
        &self,
        expense: &NewExpense,
    ) -> Result<CreatedExpense, IntegrationError> {
        let response = self
            .client
            .post(self.url("create_expense"))
            .bearer_auth(&self.api_key)
            .json(&expense.to_body())
            .send()
            .await?;
        let body = check(response).await?;

        if let Some(errors) = body.get("errors").filter(|e| has_errors(e)) {
            return Err(IntegrationError::Api(errors.to_string()));
        }

        let mut expenses: Vec<CreatedExpense> = field(body, "expenses")?;
        if expenses.is_empty() {
            return Err(IntegrationError::Parse("no expense returned".to_string()));
        }
        Ok(expenses.remove(0))
    }

    async fn get(&self, endpoint: &str) -> Result<Value, IntegrationError> {
        let response = self
            .client
            .get(self.url(endpoint))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        check(response).await
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }
}

async fn check(response: reqwest::Response) -> Result<Value, IntegrationError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(IntegrationError::Status {
            service: "Splitwise",
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

fn field<T: serde::de::DeserializeOwned>(mut body: Value, key: &str) -> Result<T, IntegrationError> {
    let value = body
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| IntegrationError::Parse(format!("missing '{}'", key)))?;
    serde_json::from_value(value).map_err(|e| IntegrationError::Parse(e.to_string()))
}

/// Splitwise reports errors as `{}` / `[]` when there are none.
fn has_errors(errors: &Value) -> bool {
    match errors {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_name() {
        let user = SplitwiseUser {
            id: 1,
            first_name: "Ada".into(),
            last_name: None,
        };
        assert_eq!(user.display_name(), "Ada");
        let user = SplitwiseUser {
            last_name: Some("Lovelace".into()),
            ..user
        };
        assert_eq!(user.display_name(), "Ada Lovelace");
    }

    #[test]
    fn test_expense_body_flattens_users() {
        let expense = NewExpense {
            group_id: 7,
            description: "Groceries".into(),
            cost: 12.5,
            users: vec![
                ExpenseShare {
                    user_id: 1,
                    paid_share: 12.5,
                    owed_share: 5.0,
                },
                ExpenseShare {
                    user_id: 2,
                    paid_share: 0.0,
                    owed_share: 7.5,
                },
            ],
        };
        let body = Value::Object(expense.to_body());
        assert_eq!(body["cost"], "12.50");
        assert_eq!(body["users__0__user_id"], 1);
        assert_eq!(body["users__0__paid_share"], "12.50");
        assert_eq!(body["users__1__owed_share"], "7.50");
        assert_eq!(body["group_id"], 7);
    }

    #[test]
    fn test_has_errors() {
        assert!(!has_errors(&json!({})));
        assert!(!has_errors(&json!([])));
        assert!(!has_errors(&Value::Null));
        assert!(has_errors(&json!({"base": ["Invalid cost"]})));
    }

    #[test]
    fn test_field_parses_groups() {
        let body = json!({"groups": [{"id": 3, "name": "Flat", "members": [{"id": 9, "first_name": "Kas"}]}]});
        let groups: Vec<SplitwiseGroup> = field(body, "groups").unwrap();
        assert_eq!(groups[0].name, "Flat");
        assert_eq!(groups[0].members[0].display_name(), "Kas");

        let err = field::<Vec<SplitwiseGroup>>(json!({}), "groups").unwrap_err();
        assert!(matches!(err, IntegrationError::Parse(_)));
    }
}

//! Recurring bill: files the monthly phone bill as a Splitwise expense.
//!
//! ```toml
//! [phone_bill]
//! group_id = 31014911
//! total_cost = 560.0
//! description_prefix = "Phone Bill Due"   # optional
//! shares = [
//!     { user_id = 83976680, owed = 40.0 },
//!     { user_id = 22444750, owed = 50.0 },
//! ]
//! ```

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::{PanelConfig, PhoneBillSettings};
use crate::integrations::{ExpenseShare, NewExpense, SplitwiseClient};
use crate::modules::{
    param_str, ActionDescriptor, ActionResult, ActionVariant, DashboardModule, FromConfig,
    ModuleError, ModuleIdentity, Params, StatusMap,
};

#[derive(Debug)]
pub struct SplitwisePhoneBillModule {
    splitwise: SplitwiseClient,
    bill: PhoneBillSettings,
}

impl SplitwisePhoneBillModule {
    pub fn new(splitwise: SplitwiseClient, bill: PhoneBillSettings) -> Self {
        Self { splitwise, bill }
    }

    async fn create_expense(&self, params: &Params) -> ActionResult {
        let date_due = param_str(params, "date_due");
        if date_due.is_empty() {
            return ActionResult::fail("Please enter a Date Due value.");
        }

        let payer = match self.splitwise.current_user().await {
            Ok(user) => user,
            Err(e) => return ActionResult::fail(e.to_string()),
        };

        let expense = bill_expense(&self.bill, payer.id, &date_due);
        match self.splitwise.create_expense(&expense).await {
            Ok(created) => {
                log::info!("Created bill expense {} ({})", created.id, created.description);
                ActionResult::ok(format!(
                    "Expense created: '{}' (ID: {})",
                    created.description, created.id
                ))
                .with_data(json!({"expense_id": created.id}))
            }
            Err(e) => ActionResult::fail(e.to_string()),
        }
    }
}

/// The payer covers the whole bill and owes what the configured shares
/// leave over.
fn bill_expense(bill: &PhoneBillSettings, payer_id: u64, date_due: &str) -> NewExpense {
    let shared: f64 = bill.shares.iter().map(|s| s.owed).sum();
    let mut users = vec![ExpenseShare {
        user_id: payer_id,
        paid_share: bill.total_cost,
        owed_share: bill.total_cost - shared,
    }];
    users.extend(bill.shares.iter().map(|s| ExpenseShare {
        user_id: s.user_id,
        paid_share: 0.0,
        owed_share: s.owed,
    }));

    NewExpense {
        group_id: bill.group_id,
        description: format!("{} {}", bill.description_prefix, date_due),
        cost: bill.total_cost,
        users,
    }
}

#[async_trait]
impl DashboardModule for SplitwisePhoneBillModule {
    fn identity(&self) -> ModuleIdentity {
        ModuleIdentity::new(
            "Splitwise: Phone Bill",
            "Create a new Splitwise expense for the monthly phone bill.",
        )
        .with_icon("📱")
        .with_color("#22c55e")
    }

    async fn status(&self) -> Result<StatusMap, ModuleError> {
        let status = json!({
            "status": "Ready",
            "group_id": self.bill.group_id,
            "total_cost": format!("{:.2}", self.bill.total_cost),
            "fields": [
                {
                    "id": "date_due",
                    "label": "Date Due",
                    "type": "text",
                    "placeholder": "YYYY-MM-DD",
                    "value": ""
                }
            ]
        });
        match status {
            Value::Object(map) => Ok(map),
            _ => Ok(StatusMap::new()),
        }
    }

    fn actions(&self) -> Vec<ActionDescriptor> {
        vec![ActionDescriptor::new(
            "create_expense",
            "Create Splitwise Expense",
            ActionVariant::Primary,
        )]
    }

    async fn execute(&self, action_id: &str, params: &Params) -> ActionResult {
        match action_id {
            "create_expense" => self.create_expense(params).await,
            other => ActionResult::unknown_action(other),
        }
    }
}

impl FromConfig for SplitwisePhoneBillModule {
    fn from_config(config: &PanelConfig) -> Result<Self, ModuleError> {
        let splitwise = config
            .splitwise
            .as_ref()
            .ok_or_else(|| ModuleError::Config("missing [splitwise] section".to_string()))?;
        let bill = config
            .phone_bill
            .clone()
            .ok_or_else(|| ModuleError::Config("missing [phone_bill] section".to_string()))?;

        let shared: f64 = bill.shares.iter().map(|s| s.owed).sum();
        if shared > bill.total_cost {
            return Err(ModuleError::Config(format!(
                "phone_bill shares ({:.2}) exceed total_cost ({:.2})",
                shared, bill.total_cost
            )));
        }
        Ok(Self::new(SplitwiseClient::new(splitwise)?, bill))
    }
}

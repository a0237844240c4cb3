//! Receipt splitter: read receipt photos with a vision model and split the
//! items between Splitwise group members.
//!
//! The flow takes two round trips from the browser:
//!
//! 1. `process_receipt` sends the images, gets `{item: price}` back, and
//!    parks it under a session token.
//! 2. `create_split_expense` names who shared which item; the token is
//!    consumed when the expense is created.
//!
//! Sessions live in this module instance, so a registry reload starts with
//! an empty store.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use dashmap::DashMap;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::config::PanelConfig;
use crate::integrations::{ExpenseShare, NewExpense, OpenRouterClient, SplitwiseClient};
use crate::modules::{
    param_str, param_str_list, ActionDescriptor, ActionResult, ActionVariant, DashboardModule,
    FromConfig, ModuleError, ModuleIdentity, Params, StatusMap,
};

/// Upper bound on images per receipt.
pub const MAX_IMAGES: usize = 10;

/// Unclaimed sessions are dropped after this long.
const SESSION_TTL: Duration = Duration::from_secs(60 * 60);

const DEFAULT_DESCRIPTION: &str = "Receipt Split";

/// Items parsed from one upload, waiting to be split.
#[derive(Debug, Clone)]
struct ReceiptSession {
    group_id: u64,
    items: BTreeMap<String, f64>,
    created_at: Instant,
}

#[derive(Debug)]
pub struct ReceiptSplitterModule {
    splitwise: SplitwiseClient,
    vision: OpenRouterClient,
    sessions: DashMap<String, ReceiptSession>,
}

impl ReceiptSplitterModule {
    pub fn new(splitwise: SplitwiseClient, vision: OpenRouterClient) -> Self {
        Self {
            splitwise,
            vision,
            sessions: DashMap::new(),
        }
    }

    /// Number of receipts currently waiting for a split.
    pub fn pending_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn store_session(&self, session: ReceiptSession) -> String {
        self.sessions
            .retain(|_, s| s.created_at.elapsed() < SESSION_TTL);
        let token = session_token();
        self.sessions.insert(token.clone(), session);
        token
    }

    fn live_session(&self, token: &str) -> Option<ReceiptSession> {
        self.sessions
            .get(token)
            .filter(|s| s.created_at.elapsed() < SESSION_TTL)
            .map(|s| s.value().clone())
    }

    // ------------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------------

    async fn fetch_groups(&self) -> ActionResult {
        match self.splitwise.groups().await {
            Ok(groups) => {
                let list: Vec<Value> = groups
                    .iter()
                    .map(|g| json!({"id": g.id, "name": g.name}))
                    .collect();
                ActionResult::ok(format!("Found {} groups", list.len()))
                    .with_data(json!({"groups": list}))
            }
            Err(e) => ActionResult::fail(format!("Failed to fetch groups: {}", e)),
        }
    }

    async fn process_receipt(&self, params: &Params) -> ActionResult {
        let group_id = param_str(params, "group_id");
        let images = param_str_list(params, "images");

        if group_id.is_empty() {
            return ActionResult::fail("Please select a Splitwise group");
        }
        let Ok(group_id) = group_id.parse::<u64>() else {
            return ActionResult::fail(format!("Invalid group id: {}", group_id));
        };
        if images.is_empty() {
            return ActionResult::fail("Please upload at least one receipt image");
        }
        if images.len() > MAX_IMAGES {
            return ActionResult::fail(format!("Maximum {} images allowed", MAX_IMAGES));
        }

        let items = match self.vision.extract_receipt_items(&images).await {
            Ok(items) => items,
            Err(e) => return ActionResult::fail(format!("Failed to process receipt: {}", e)),
        };
        if items.is_empty() {
            return ActionResult::fail("No items found on receipt");
        }

        log::info!(
            "Parsed {} receipt items from {} image(s) with {}",
            items.len(),
            images.len(),
            self.vision.model()
        );
        let token = self.store_session(ReceiptSession {
            group_id,
            items: items.clone(),
            created_at: Instant::now(),
        });

        ActionResult::ok(format!("Found {} items on receipt", items.len())).with_data(json!({
            "session_token": token,
            "items": items,
            "group_id": group_id,
        }))
    }

    async fn fetch_group_users(&self, params: &Params) -> ActionResult {
        let group_id = param_str(params, "group_id");
        if group_id.is_empty() {
            return ActionResult::fail("Group ID is required");
        }
        let Ok(group_id) = group_id.parse::<u64>() else {
            return ActionResult::fail(format!("Invalid group id: {}", group_id));
        };

        match self.splitwise.group(group_id).await {
            Ok(group) => {
                let users: Vec<Value> = group
                    .members
                    .iter()
                    .map(|m| {
                        json!({
                            "id": m.id,
                            "first_name": m.first_name,
                            "last_name": m.last_name.clone().unwrap_or_default(),
                            "name": m.display_name(),
                        })
                    })
                    .collect();
                ActionResult::ok(format!("Found {} users in group", users.len()))
                    .with_data(json!({"users": users}))
            }
            Err(e) => ActionResult::fail(format!("Failed to fetch group users: {}", e)),
        }
    }

    async fn create_split_expense(&self, params: &Params) -> ActionResult {
        let token = param_str(params, "session_token");
        let description = match param_str(params, "description") {
            d if d.is_empty() => DEFAULT_DESCRIPTION.to_string(),
            d => d,
        };

        let Some(session) = (!token.is_empty())
            .then(|| self.live_session(&token))
            .flatten()
        else {
            return ActionResult::fail("Invalid or expired session");
        };

        let splits = match params.get("item_splits") {
            Some(Value::Object(splits)) if !splits.is_empty() => splits,
            _ => return ActionResult::fail("No item splits provided"),
        };

        let payer = match self.splitwise.current_user().await {
            Ok(user) => user,
            Err(e) => return ActionResult::fail(format!("Failed to create expense: {}", e)),
        };

        let expense =
            match build_split_expense(session.group_id, &description, &session.items, splits, payer.id) {
                Ok(expense) => expense,
                Err(e) => return ActionResult::fail(format!("Failed to create expense: {}", e)),
            };

        match self.splitwise.create_expense(&expense).await {
            Ok(created) => {
                self.sessions.remove(&token);
                log::info!("Created split expense {} for group {}", created.id, session.group_id);
                ActionResult::ok(format!(
                    "Expense created: '{}' (ID: {})",
                    created.description, created.id
                ))
                .with_data(json!({"expense_id": created.id}))
            }
            Err(e) => ActionResult::fail(format!("Failed to create expense: {}", e)),
        }
    }
}

#[async_trait]
impl DashboardModule for ReceiptSplitterModule {
    fn identity(&self) -> ModuleIdentity {
        ModuleIdentity::new(
            "Receipt Splitter",
            "Upload receipt images, AI parses items, and split costs among group members.",
        )
        .with_icon("🧾")
        .with_color("#8b5cf6")
    }

    async fn status(&self) -> Result<StatusMap, ModuleError> {
        let status = json!({
            "status": "Ready to upload",
            "info": format!("Upload 1-{} receipt images from your mobile device", MAX_IMAGES),
            "fields": [
                {
                    "id": "group_id",
                    "label": "Splitwise Group",
                    "type": "select",
                    "placeholder": "Select a group",
                    "options": [],
                    "options_action": "fetch_groups",
                    "options_key": "groups",
                    "value": ""
                },
                {
                    "id": "images",
                    "label": format!("Receipt Images (1-{})", MAX_IMAGES),
                    "type": "file",
                    "accept": "image/*",
                    "multiple": true,
                    "capture": "environment",
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
        vec![
            ActionDescriptor::new("fetch_groups", "🔄 Load Groups", ActionVariant::Secondary),
            ActionDescriptor::new("process_receipt", "🚀 Process Receipt", ActionVariant::Primary),
        ]
    }

    async fn execute(&self, action_id: &str, params: &Params) -> ActionResult {
        match action_id {
            "fetch_groups" => self.fetch_groups().await,
            "process_receipt" => self.process_receipt(params).await,
            "fetch_group_users" => self.fetch_group_users(params).await,
            "create_split_expense" => self.create_split_expense(params).await,
            other => ActionResult::unknown_action(other),
        }
    }
}

impl FromConfig for ReceiptSplitterModule {
    fn from_config(config: &PanelConfig) -> Result<Self, ModuleError> {
        let splitwise = config
            .splitwise
            .as_ref()
            .ok_or_else(|| ModuleError::Config("missing [splitwise] section".to_string()))?;
        let openrouter = config
            .openrouter
            .as_ref()
            .ok_or_else(|| ModuleError::Config("missing [openrouter] section".to_string()))?;
        Ok(Self::new(
            SplitwiseClient::new(splitwise)?,
            OpenRouterClient::new(openrouter)?,
        ))
    }
}

// ============================================================================
// Split math
// ============================================================================

fn session_token() -> String {
    let mut bytes = [0u8; 32];
    bytes[..16].copy_from_slice(Uuid::new_v4().as_bytes());
    bytes[16..].copy_from_slice(Uuid::new_v4().as_bytes());
    URL_SAFE_NO_PAD.encode(bytes)
}

fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

fn parse_user_id(value: &Value) -> Result<u64, String> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| format!("Invalid user id: {}", value))
}

/// Owed amount in cents per user, in first-seen order.
///
/// Each item is split equally among its participants; leftover cents go to
/// the first participants so an item's shares always add up to its price,
/// discount lines with negative prices included.
/// Items not on the receipt and items with no participants are skipped.
fn owed_cents(
    items: &BTreeMap<String, f64>,
    splits: &Map<String, Value>,
) -> Result<Vec<(u64, i64)>, String> {
    let mut totals: Vec<(u64, i64)> = Vec::new();
    for (item, participants) in splits {
        let Some(price) = items.get(item) else {
            continue;
        };
        let participants = participants.as_array().map(Vec::as_slice).unwrap_or(&[]);
        if participants.is_empty() {
            continue;
        }

        let cents = to_cents(*price);
        let n = participants.len() as i64;
        let (base, extra) = (cents.div_euclid(n), cents.rem_euclid(n));
        for (i, participant) in participants.iter().enumerate() {
            let user_id = parse_user_id(participant)?;
            let share = base + i64::from((i as i64) < extra);
            match totals.iter_mut().find(|(id, _)| *id == user_id) {
                Some((_, total)) => *total += share,
                None => totals.push((user_id, share)),
            }
        }
    }
    Ok(totals)
}

/// Build the Splitwise expense for a receipt: the payer paid the whole
/// receipt and owes whatever the other participants don't.
fn build_split_expense(
    group_id: u64,
    description: &str,
    items: &BTreeMap<String, f64>,
    splits: &Map<String, Value>,
    payer_id: u64,
) -> Result<NewExpense, String> {
    let total: i64 = items.values().map(|p| to_cents(*p)).sum();
    let owed = owed_cents(items, splits)?;

    let others: Vec<ExpenseShare> = owed
        .iter()
        .filter(|(id, _)| *id != payer_id)
        .map(|(id, cents)| ExpenseShare {
            user_id: *id,
            paid_share: 0.0,
            owed_share: *cents as f64 / 100.0,
        })
        .collect();
    let others_total: i64 = owed
        .iter()
        .filter(|(id, _)| *id != payer_id)
        .map(|(_, cents)| cents)
        .sum();

    let mut users = vec![ExpenseShare {
        user_id: payer_id,
        paid_share: total as f64 / 100.0,
        owed_share: (total - others_total) as f64 / 100.0,
    }];
    users.extend(others);

    Ok(NewExpense {
        group_id,
        description: description.to_string(),
        cost: total as f64 / 100.0,
        users,
    })
}

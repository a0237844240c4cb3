//! DispatchGateway: routes panel requests to module instances.
//!
//! The gateway is the only thing the HTTP layer talks to.  It:
//! 1. Resolves module ids against the registry's current snapshot
//! 2. Validates the action invocation envelope
//! 3. Calls through the [`DashboardModule`] contract
//! 4. Contains module faults (errors *and* panics) as [`GatewayError`]s
//!
//! One faulty module never takes down the listing of the others.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;

use super::error::GatewayError;
use super::loader::LoadFailure;
use super::module_base::DashboardModule;
use super::module_def::{ActionDescriptor, ActionRequest, ActionResult, ModuleDescriptor, StatusMap};
use super::registry::ModuleRegistry;

/// Outcome of a registry reload.
#[derive(Debug, Clone, Serialize)]
pub struct ReloadSummary {
    pub count: usize,
    pub ids: Vec<String>,
    #[serde(skip)]
    pub failures: Vec<LoadFailure>,
}

/// The dispatch gateway: uniform list/status/action/reload over the registry.
#[derive(Clone)]
pub struct DispatchGateway {
    registry: Arc<ModuleRegistry>,
}

impl DispatchGateway {
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// Describe every loaded module, with fresh status and actions.
    ///
    /// Modules are probed concurrently.  A module whose probe fails is still
    /// listed, with an `error` marker instead of status and actions.
    pub async fn list_modules(&self) -> Vec<ModuleDescriptor> {
        let snapshot = self.registry.snapshot();
        join_all(
            snapshot
                .iter()
                .map(|(id, module)| describe(id, Arc::clone(module))),
        )
        .await
    }

    /// Status of one module.
    pub async fn get_status(&self, module_id: &str) -> Result<StatusMap, GatewayError> {
        let module = self.lookup(module_id)?;
        probe_status(module_id, module.as_ref()).await
    }

    /// Invoke one action.
    ///
    /// A missing or empty `action_id` is rejected before the module lookup,
    /// so it is a `BadRequest` whether or not the module exists.  An action
    /// id the module does not know is the module's own structured failure,
    /// returned verbatim like any other result.
    pub async fn execute_action(
        &self,
        module_id: &str,
        request: ActionRequest,
    ) -> Result<ActionResult, GatewayError> {
        let action_id = request
            .action_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GatewayError::BadRequest("action_id is required".to_string()))?
            .to_string();

        let module = self.lookup(module_id)?;
        let params = request.params.unwrap_or_default();

        log::debug!("Executing {}::{}", module_id, action_id);
        let outcome = AssertUnwindSafe(module.execute(&action_id, &params))
            .catch_unwind()
            .await;

        match outcome {
            Ok(result) => {
                if !result.success {
                    log::info!(
                        "Action {}::{} failed: {}",
                        module_id,
                        action_id,
                        result.error.as_deref().unwrap_or("")
                    );
                }
                Ok(result)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("Action {}::{} panicked: {}", module_id, action_id, message);
                Err(GatewayError::Execution(message))
            }
        }
    }

    /// Rediscover all modules, replacing the registry contents.
    pub fn reload(&self) -> ReloadSummary {
        let snapshot = self.registry.reload();
        ReloadSummary {
            count: snapshot.len(),
            ids: snapshot.ids(),
            failures: snapshot.failures().to_vec(),
        }
    }

    fn lookup(&self, module_id: &str) -> Result<Arc<dyn DashboardModule>, GatewayError> {
        self.registry
            .get(module_id)
            .ok_or_else(|| GatewayError::NotFound(module_id.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Fault containment
// ---------------------------------------------------------------------------

async fn describe(module_id: &str, module: Arc<dyn DashboardModule>) -> ModuleDescriptor {
    let identity = match std::panic::catch_unwind(AssertUnwindSafe(|| module.identity())) {
        Ok(identity) => identity,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::error!("Module {} identity panicked: {}", module_id, message);
            return ModuleDescriptor::failed(
                module_id,
                super::module_def::ModuleIdentity::new(module_id, ""),
                message,
            );
        }
    };

    let status = match probe_status(module_id, module.as_ref()).await {
        Ok(status) => status,
        Err(e) => return ModuleDescriptor::failed(module_id, identity, e.to_string()),
    };

    match probe_actions(module_id, module.as_ref()) {
        Ok(actions) => ModuleDescriptor::new(module_id, identity, status, actions),
        Err(e) => ModuleDescriptor::failed(module_id, identity, e.to_string()),
    }
}

async fn probe_status(
    module_id: &str,
    module: &dyn DashboardModule,
) -> Result<StatusMap, GatewayError> {
    match AssertUnwindSafe(module.status()).catch_unwind().await {
        Ok(Ok(status)) => Ok(status),
        Ok(Err(e)) => {
            log::warn!("Status probe for {} failed: {}", module_id, e);
            Err(e.into())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::error!("Status probe for {} panicked: {}", module_id, message);
            Err(GatewayError::Execution(message))
        }
    }
}

fn probe_actions(
    module_id: &str,
    module: &dyn DashboardModule,
) -> Result<Vec<ActionDescriptor>, GatewayError> {
    std::panic::catch_unwind(AssertUnwindSafe(|| module.actions())).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        log::error!("Action catalog for {} panicked: {}", module_id, message);
        GatewayError::Execution(message)
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("Module panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("Module panicked: {}", s)
    } else {
        "Module panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::loader::{ModuleFactory, ModuleLoader};
    use crate::modules::testing::{BrokenModule, CounterModule, PanickingModule};
    use serde_json::json;

    fn gateway() -> DispatchGateway {
        let registry = ModuleRegistry::load(ModuleLoader::new(vec![
            ModuleFactory::of::<CounterModule>(),
            ModuleFactory::of::<BrokenModule>(),
            ModuleFactory::of::<PanickingModule>(),
        ]));
        DispatchGateway::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_empty_registry_lists_nothing() {
        let gw = DispatchGateway::new(Arc::new(ModuleRegistry::load(ModuleLoader::new(
            Vec::new(),
        ))));
        assert!(gw.list_modules().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_isolates_failing_modules() {
        let modules = gateway().list_modules().await;
        assert_eq!(modules.len(), 3);

        assert_eq!(modules[0].id, "countermodule");
        assert!(modules[0].error.is_none());
        assert_eq!(modules[0].status["executions"], 0);
        assert_eq!(modules[0].actions.len(), 1);

        assert_eq!(modules[1].id, "brokenmodule");
        assert!(modules[1].error.as_deref().unwrap().contains("sensor offline"));

        assert_eq!(modules[2].id, "panickingmodule");
        assert!(modules[2].error.as_deref().unwrap().contains("status exploded"));
        assert!(modules[2].actions.is_empty());
    }

    #[tokio::test]
    async fn test_get_status() {
        let gw = gateway();
        assert_eq!(gw.get_status("countermodule").await.unwrap()["executions"], 0);
        assert!(matches!(
            gw.get_status("brokenmodule").await,
            Err(GatewayError::Execution(_))
        ));
        assert!(matches!(
            gw.get_status("panickingmodule").await,
            Err(GatewayError::Execution(_))
        ));
        assert!(matches!(
            gw.get_status("nosuchmodule").await,
            Err(GatewayError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_status_reads_are_idempotent() {
        let gw = gateway();
        let first = gw.get_status("countermodule").await.unwrap();
        let second = gw.get_status("countermodule").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(gw.list_modules().await, gw.list_modules().await);
    }

    #[tokio::test]
    async fn test_missing_action_id_is_bad_request_for_any_module() {
        let gw = gateway();
        for module_id in ["countermodule", "nosuchmodule"] {
            let err = gw
                .execute_action(module_id, ActionRequest::default())
                .await
                .unwrap_err();
            assert!(matches!(err, GatewayError::BadRequest(_)));

            let err = gw
                .execute_action(module_id, ActionRequest::new("   "))
                .await
                .unwrap_err();
            assert!(matches!(err, GatewayError::BadRequest(_)));
        }
    }

    #[tokio::test]
    async fn test_unknown_module_is_not_found() {
        let err = gateway()
            .execute_action("nosuchmodule", ActionRequest::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(id) if id == "nosuchmodule"));
    }

    #[tokio::test]
    async fn test_unknown_action_is_module_failure_not_gateway_error() {
        let result = gateway()
            .execute_action("countermodule", ActionRequest::new("explode"))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Unknown action: explode"));
    }

    #[tokio::test]
    async fn test_execute_passes_params_and_returns_result_verbatim() {
        let gw = gateway();
        let params = json!({"note": "hi"}).as_object().cloned().unwrap();
        let result = gw
            .execute_action("countermodule", ActionRequest::new("increment").with_params(params))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.data.unwrap(), json!({"executions": 1, "echo": {"note": "hi"}}));
        assert_eq!(gw.get_status("countermodule").await.unwrap()["executions"], 1);
    }

    #[tokio::test]
    async fn test_panicking_action_is_contained() {
        let gw = gateway();
        let err = gw
            .execute_action("panickingmodule", ActionRequest::new("boom"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Execution(msg) if msg.contains("execute exploded")));

        // The rest of the panel keeps working.
        assert!(gw.get_status("countermodule").await.is_ok());
    }

    #[tokio::test]
    async fn test_reload_resets_state_and_reports_ids() {
        let gw = gateway();
        gw.execute_action("countermodule", ActionRequest::new("increment"))
            .await
            .unwrap();

        let summary = gw.reload();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.ids, vec!["countermodule", "brokenmodule", "panickingmodule"]);
        assert_eq!(gw.get_status("countermodule").await.unwrap()["executions"], 0);
    }
}

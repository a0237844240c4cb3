//! End-to-end tests of the HTTP surface with the built-in modules.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use control_panel::auth::{hash_password, Credentials, SessionStore};
use control_panel::modules::{DispatchGateway, ModuleLoader, ModuleRegistry};
use control_panel::server::{app_router, AppState};

const PASSWORD: &str = "correct horse";

fn write_config(path: &Path, content: &str) {
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
}

fn app_with_config(path: &Path) -> Router {
    let loader = ModuleLoader::with_builtins().with_config_path(path);
    let registry = ModuleRegistry::load(loader);
    let state = AppState::new(
        DispatchGateway::new(Arc::new(registry)),
        SessionStore::new("integration-secret", Duration::from_secs(600)).unwrap(),
        Credentials::new("operator", hash_password(PASSWORD)),
    );
    app_router(state)
}

async fn login(app: &Router) -> String {
    let body = format!("username=operator&password={}", PASSWORD.replace(' ', "+"));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn get(app: &Router, cookie: &str, uri: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn action(app: &Router, cookie: &str, module_id: &str, action_id: &str) -> Value {
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/modules/{}/action", module_id))
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(format!(r#"{{"action_id": "{}"}}"#, action_id)))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    json(response).await
}

async fn json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn module_ids(listing: &Value) -> Vec<String> {
    listing["modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_service_control_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    write_config(&config, "[modules]\nenabled = [\"servicecontrolmodule\"]\n");

    let app = app_with_config(&config);
    let cookie = login(&app).await;

    let listing = json(get(&app, &cookie, "/api/modules").await).await;
    assert_eq!(module_ids(&listing), vec!["servicecontrolmodule"]);
    let module = &listing["modules"][0];
    assert_eq!(module["name"], "Service Control");
    assert_eq!(module["status"]["status"], "Stopped");
    assert_eq!(module["actions"][0]["id"], "start");

    let result = action(&app, &cookie, "servicecontrolmodule", "restart").await;
    assert_eq!(result["success"], false);
    assert_eq!(result["error"], "Service is not running");

    let result = action(&app, &cookie, "servicecontrolmodule", "start").await;
    assert_eq!(result["success"], true);

    let status = json(get(&app, &cookie, "/api/modules/servicecontrolmodule/status").await).await;
    assert_eq!(status["success"], true);
    assert_eq!(status["status"]["status"], "Running");

    let listing = json(get(&app, &cookie, "/api/modules").await).await;
    let actions: Vec<&str> = listing["modules"][0]["actions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["stop", "restart"]);
}

#[tokio::test]
async fn test_reload_rereads_config_and_resets_state() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    write_config(&config, "[modules]\nenabled = [\"servicecontrolmodule\"]\n");

    let app = app_with_config(&config);
    let cookie = login(&app).await;
    action(&app, &cookie, "servicecontrolmodule", "start").await;

    write_config(
        &config,
        "[modules]\nenabled = [\"servicecontrolmodule\", \"quickcommandsmodule\", \"receiptsplittermodule\"]\n",
    );
    let response = get(&app, &cookie, "/api/reload").await;
    assert_eq!(response.status(), StatusCode::OK);
    let reload = json(response).await;
    assert_eq!(reload["success"], true);
    // The receipt splitter has no [splitwise]/[openrouter] and is left out.
    assert_eq!(reload["message"], "Reloaded 2 modules");
    let mut ids: Vec<String> = reload["modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["quickcommandsmodule", "servicecontrolmodule"]);

    let status = json(get(&app, &cookie, "/api/modules/servicecontrolmodule/status").await).await;
    assert_eq!(status["status"]["status"], "Stopped");
}

#[tokio::test]
async fn test_reload_removes_disabled_module() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    write_config(
        &config,
        "[modules]\nenabled = [\"servicecontrolmodule\", \"quickcommandsmodule\"]\n",
    );

    let app = app_with_config(&config);
    let cookie = login(&app).await;
    let response = get(&app, &cookie, "/api/modules/servicecontrolmodule/status").await;
    assert_eq!(response.status(), StatusCode::OK);

    write_config(&config, "[modules]\nenabled = [\"quickcommandsmodule\"]\n");
    let reload = json(get(&app, &cookie, "/api/reload").await).await;
    assert_eq!(reload["message"], "Reloaded 1 modules");

    let response = get(&app, &cookie, "/api/modules/servicecontrolmodule/status").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json(response).await["error"],
        "Module not found: servicecontrolmodule"
    );

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/modules/servicecontrolmodule/action")
        .header(header::COOKIE, &cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"action_id": "start"}"#))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let listing = json(get(&app, &cookie, "/api/modules").await).await;
    assert_eq!(module_ids(&listing), vec!["quickcommandsmodule"]);
}

#[tokio::test]
async fn test_active_session_cookie_is_renewed() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with_config(&dir.path().join("absent.toml"));
    let cookie = login(&app).await;

    let response = get(&app, &cookie, "/api/modules").await;
    assert_eq!(response.status(), StatusCode::OK);
    let renewed = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(renewed.starts_with(&format!("{};", cookie)), "{}", renewed);
    assert!(renewed.contains("Max-Age=600"), "{}", renewed);
}

#[tokio::test]
async fn test_missing_config_loads_unconfigured_modules() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with_config(&dir.path().join("absent.toml"));
    let cookie = login(&app).await;

    let listing = json(get(&app, &cookie, "/api/modules").await).await;
    let mut ids = module_ids(&listing);
    ids.sort();
    assert_eq!(
        ids,
        vec!["quickcommandsmodule", "servicecontrolmodule", "systeminfomodule"]
    );
}

#[tokio::test]
async fn test_gate_distinguishes_api_and_pages() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with_config(&dir.path().join("absent.toml"));

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/reload").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json(response).await["error"], "Authentication required");

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

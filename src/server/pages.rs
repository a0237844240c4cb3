//! Embedded HTML pages.

/// The generic dashboard. Renders every module from `/api/modules`.
pub const INDEX_HTML: &str = include_str!("static/index.html");

const LOGIN_HTML: &str = include_str!("static/login.html");

const LOGIN_ERROR: &str = r#"<p class="error">Invalid username or password</p>"#;

/// The login page, with the error banner after a failed attempt.
pub fn login_page(failed: bool) -> String {
    LOGIN_HTML.replace("{{error}}", if failed { LOGIN_ERROR } else { "" })
}

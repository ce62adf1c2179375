//! Site-level routes outside the JSON API.

use axum::{Router, http::header, response::IntoResponse, routing::get};

use crate::AppState;

const ROBOTS_TXT: &str = "\
User-agent: *
Allow: /
Disallow: /api/
Disallow: /admin/
Disallow: /shop/
Disallow: /manufacturing/
Disallow: /accounting/
";

/// `GET /robots.txt`
pub async fn robots_txt() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], ROBOTS_TXT)
}

/// `GET /healthz`
pub async fn healthz() -> &'static str {
    "OK"
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/robots.txt", get(robots_txt))
        .route("/healthz", get(healthz))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::create_test_app;

    #[test_log::test(tokio::test)]
    async fn test_robots_txt() {
        let (server, _state) = create_test_app().await;
        let response = server.get("/robots.txt").await;
        response.assert_status_ok();
        let text = response.text();
        assert!(text.starts_with("User-agent: *\nAllow: /\n"));
        for path in ["/api/", "/admin/", "/shop/", "/manufacturing/", "/accounting/"] {
            assert!(text.contains(&format!("Disallow: {path}\n")), "{path}");
        }
        assert_eq!(response.header("content-type"), "text/plain; charset=utf-8");
    }
}

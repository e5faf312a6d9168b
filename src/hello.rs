use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::Uri;
use axum::routing::post;
use axum::Router;
use lambda_http::tracing;

use crate::config::Config;
use crate::error::ServerError;
use crate::query::{validate, QueryParameters};

const DEFAULT_SUBJECT: &str = "world";

pub fn router(config: Arc<Config>) -> Router {
    Router::new()
        .route("/hello", post(hello))
        .with_state(config)
}

pub async fn hello(
    State(config): State<Arc<Config>>,
    uri: Uri,
    Query(raw_query): Query<QueryParameters>,
    body: Bytes,
) -> Result<String, ServerError> {
    tracing::info!(url = %uri, "Http function processed request");

    // Invalid UTF-8 is replaced, never rejected.
    let raw_body = String::from_utf8_lossy(&body);

    let parsed = validate(&raw_query).inspect_err(|failure| {
        tracing::warn!(issues = failure.issues().len(), error = %failure, "Query validation failed");
    })?;
    tracing::info!(query = ?parsed, "Parsed query");

    if !raw_body.is_empty() {
        tracing::info!(body = %raw_body, "Raw body contents");
    }

    let subject = resolve_subject(&parsed.name, config.fallback_name.as_deref());
    Ok(format!("Hello, {subject}!"))
}

/// `name` is required and non-empty once validated, so the fallback only
/// applies if that rule is ever relaxed.
fn resolve_subject<'a>(name: &'a str, fallback: Option<&'a str>) -> &'a str {
    if !name.is_empty() {
        return name;
    }
    match fallback {
        Some(fallback) if !fallback.is_empty() => fallback,
        _ => DEFAULT_SUBJECT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn send(config: Config, method: &str, uri: &str, body: Body) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(body)
            .unwrap();
        let response = router(Arc::new(config)).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn post_hello(uri: &str) -> (StatusCode, String) {
        send(Config::default(), "POST", uri, Body::empty()).await
    }

    #[tokio::test]
    async fn greets_by_name() {
        assert_eq!(
            post_hello("/hello?name=Ada").await,
            (StatusCode::OK, "Hello, Ada!".to_string())
        );
    }

    #[tokio::test]
    async fn percent_encoded_name_is_decoded() {
        let (status, body) = post_hello("/hello?name=Ada%20Lovelace&many=a%2C%20b").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Hello, Ada Lovelace!");
    }

    #[tokio::test]
    async fn missing_name_is_a_bad_request() {
        let (status, body) = post_hello("/hello").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("\"name\""), "{body}");
    }

    #[tokio::test]
    async fn fallback_does_not_replace_a_missing_name() {
        let config = Config {
            fallback_name: Some("Grace".to_string()),
            ..Config::default()
        };
        let (status, body) = send(config, "POST", "/hello", Body::empty()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.contains("Grace"));
    }

    #[tokio::test]
    async fn every_failing_field_is_reported() {
        let (status, body) = post_hello("/hello?name=Ada&posNumber=0&range=6&plainDate=x").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        for field in ["posNumber", "range", "plainDate"] {
            assert!(body.contains(field), "{field} missing from {body}");
        }
        assert!(!body.contains("\"name\""));
    }

    #[tokio::test]
    async fn body_does_not_change_the_greeting() {
        let (status, body) = send(
            Config::default(),
            "POST",
            "/hello?name=Ada",
            Body::from("some raw text"),
        )
        .await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, "Hello, Ada!"));
    }

    #[tokio::test]
    async fn non_utf8_body_is_read_lossily() {
        let (status, body) = send(
            Config::default(),
            "POST",
            "/hello?name=Ada",
            Body::from(vec![0xff, 0xfe]),
        )
        .await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, "Hello, Ada!"));
    }

    #[tokio::test]
    async fn non_utf8_body_does_not_hide_validation_errors() {
        let (status, body) =
            send(Config::default(), "POST", "/hello", Body::from(vec![0xff])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Validation error: Required at \"name\"");
    }

    #[tokio::test]
    async fn invalid_percent_encoding_is_decoded_lossily() {
        let (status, body) = post_hello("/hello?name=%ff").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Hello, \u{fffd}!");
    }

    #[tokio::test]
    async fn hex_and_infinity_numbers_follow_number_coercion() {
        assert_eq!(post_hello("/hello?name=Ada&posNumber=0x10").await.0, StatusCode::OK);
        assert_eq!(post_hello("/hello?name=Ada&posNumber=Infinity").await.0, StatusCode::OK);
        let (status, body) = post_hello("/hello?name=Ada&posNumber=inf").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Expected number, received nan at \"posNumber\""), "{body}");
    }

    #[tokio::test]
    async fn only_post_is_routed() {
        let (status, _) = send(Config::default(), "GET", "/hello?name=Ada", Body::empty()).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn repeated_requests_get_the_same_response() {
        let first = post_hello("/hello?name=Ada&range=2.5").await;
        let second = post_hello("/hello?name=Ada&range=2.5").await;
        assert_eq!(first, second);
    }

    #[test]
    fn subject_falls_back_in_order() {
        assert_eq!(resolve_subject("Ada", Some("Grace")), "Ada");
        assert_eq!(resolve_subject("", Some("Grace")), "Grace");
        assert_eq!(resolve_subject("", Some("")), "world");
        assert_eq!(resolve_subject("", None), "world");
    }
}

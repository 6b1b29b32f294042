use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{account, auth, posts};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(account::router())
                .merge(posts::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(v) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register_and_login(app: &Router, name: &str) -> String {
        let (status, _) = call(
            app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "username": name,
                "email": format!("{name}@example.com"),
                "password": "pw-123456",
                "confirm_password": "pw-123456",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(
            app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": format!("{name}@example.com"), "password": "pw-123456" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_open() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn writing_requires_a_token() {
        let app = build_app(AppState::fake());
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/posts",
            None,
            Some(json!({ "title": "t", "content": "c" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthenticated");

        let (status, _) = call(&app, Method::GET, "/api/account", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn post_lifecycle_with_ownership() {
        let app = build_app(AppState::fake());
        let alice = register_and_login(&app, "alice").await;
        let bob = register_and_login(&app, "bob").await;

        let (status, post) = call(
            &app,
            Method::POST,
            "/api/posts",
            Some(&alice),
            Some(json!({ "title": "Hello", "content": "First post" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(post["author"]["username"], "alice");
        let uri = format!("/api/posts/{}", post["id"].as_str().unwrap());

        let (status, _) = call(
            &app,
            Method::PUT,
            &uri,
            Some(&bob),
            Some(json!({ "title": "", "content": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(&app, Method::DELETE, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, updated) = call(
            &app,
            Method::PUT,
            &uri,
            Some(&alice),
            Some(json!({ "title": "Hello again", "content": "Edited" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "Hello again");

        let (status, _) = call(&app, Method::DELETE, &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = call(&app, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn feeds_paginate_and_404_past_the_end() {
        let app = build_app(AppState::fake());
        let alice = register_and_login(&app, "alice").await;
        for n in 0..5 {
            let (status, _) = call(
                &app,
                Method::POST,
                "/api/posts",
                Some(&alice),
                Some(json!({ "title": format!("post {n}"), "content": "c" })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, page) = call(&app, Method::GET, "/api/posts", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["items"].as_array().unwrap().len(), 4);
        assert_eq!(page["total_pages"], 2);
        assert_eq!(page["has_next"], true);

        let (status, page) = call(&app, Method::GET, "/api/users/alice/posts?page=2", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["items"].as_array().unwrap().len(), 1);
        assert_eq!(page["has_prev"], true);

        let (status, _) = call(&app, Method::GET, "/api/posts?page=3", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, Method::GET, "/api/users/nobody/posts", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn account_shows_picture_url() {
        let app = build_app(AppState::fake());
        let token = register_and_login(&app, "alice").await;
        let (status, body) = call(&app, Method::GET, "/api/account", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");
        assert!(body["image_url"].as_str().unwrap().ends_with("profile_pics/default.jpg"));
    }

    #[tokio::test]
    async fn bad_reset_token_points_back_to_request_form() {
        let app = build_app(AppState::fake());
        let (status, body) = call(
            &app,
            Method::GET,
            "/api/auth/reset-password/not-a-token",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "token_invalid");
        assert_eq!(body["redirect"], "/api/auth/reset-password");
    }

    #[tokio::test]
    async fn page_numbers_below_one_are_not_found() {
        let app = build_app(AppState::fake());
        register_and_login(&app, "alice").await;
        for uri in ["/api/posts?page=-1", "/api/posts?page=0", "/api/users/alice/posts?page=-7"] {
            let (status, body) = call(&app, Method::GET, uri, None, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body["error"], "not_found", "{uri}");
        }

        let (status, page) = call(&app, Method::GET, "/api/posts?page=abc", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["page"], 1);
    }

    async fn raw(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn unreadable_requests_get_json_errors() {
        let app = build_app(AppState::fake());
        let token = register_and_login(&app, "alice").await;

        let req = Request::post("/api/posts")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"title\": "))
            .unwrap();
        let (status, body) = raw(&app, req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "validation_failed");
        assert_eq!(body["fields"][0]["field"], "body");

        let req = Request::post("/api/auth/login")
            .body(Body::from("email=a@b.c"))
            .unwrap();
        let (status, body) = raw(&app, req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["fields"][0]["field"], "body");

        let (status, body) = call(&app, Method::GET, "/api/posts/not-a-uuid", None, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["fields"][0]["field"], "path");
    }

    #[tokio::test]
    async fn oversized_picture_is_payload_too_large() {
        let app = build_app(AppState::fake());
        let token = register_and_login(&app, "alice").await;

        let boundary = "postboard-boundary";
        let mut body = Vec::new();
        for (name, value) in [("username", "alice"), ("email", "alice@example.com")] {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"picture\"; filename=\"big.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend(std::iter::repeat(0u8).take(6 * 1024 * 1024));
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let req = Request::put("/api/account")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let (status, body) = raw(&app, req).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "payload_too_large");
    }

    #[tokio::test]
    async fn truncated_text_part_is_reported_as_body_error() {
        let app = build_app(AppState::fake());
        let token = register_and_login(&app, "alice").await;

        // The username part never reaches its closing boundary.
        let body = "--cut\r\nContent-Disposition: form-data; name=\"username\"\r\n\r\nalice";
        let req = Request::put("/api/account")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=cut")
            .body(Body::from(body))
            .unwrap();
        let (status, body) = raw(&app, req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["fields"][0]["field"], "body");
        assert!(!body.to_string().contains("This field is required"));
    }
}

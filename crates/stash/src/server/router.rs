//! Axum router construction.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, put},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/cards", get(handlers::list_cards).post(handlers::save_card))
        .route(
            "/cards/:id",
            put(handlers::replace_card).delete(handlers::delete_card),
        )
        .route("/cards/:id/reveal", get(handlers::reveal_card))
        .route(
            "/tickets",
            get(handlers::list_tickets).post(handlers::create_ticket),
        )
        .route("/bills", get(handlers::list_bills).post(handlers::create_bill))
        .route("/dashboard", get(handlers::dashboard))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(middleware::MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            req = req.header("X-User-Id", user);
        }
        let req = match body {
            Some(b) => req
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn visa() -> Value {
        json!({
            "card_name": "Visa",
            "card_number": "4111111111111111",
            "expiry": "12/29",
            "cvv": "123",
            "card_type": "credit",
            "bank_name": "First Bank"
        })
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = build(AppState::default());
        let (status, body) = send(&app, "GET", "/unknown", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    #[tokio::test]
    async fn health_reports_key_derivation() {
        let app = build(AppState::default());
        let (status, body) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["key_derivation"], "legacy");
    }

    #[tokio::test]
    async fn cards_require_a_user() {
        let app = build(AppState::default());
        let (status, body) = send(&app, "POST", "/cards", None, Some(visa())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "unauthorized");

        let (status, _) = send(&app, "GET", "/dashboard", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn saved_card_is_listed_encrypted_and_revealed_in_full() {
        let app = build(AppState::default());
        let (status, saved) = send(&app, "POST", "/cards", Some("user-abc"), Some(visa())).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = saved["id"].as_str().unwrap().to_owned();

        let (status, list) = send(&app, "GET", "/cards", Some("user-abc"), None).await;
        assert_eq!(status, StatusCode::OK);
        let card = &list["cards"][0];
        assert_eq!(card["card_name"], "Visa");
        assert_eq!(card["card_type"], "credit");
        for column in ["encrypted_card_number", "encrypted_expiry", "encrypted_cvv"] {
            assert!(card[column].as_str().unwrap().starts_with("v1."));
        }
        assert!(!list.to_string().contains("4111111111111111"));

        let uri = format!("/cards/{id}/reveal");
        let (status, reveal) = send(&app, "GET", &uri, Some("user-abc"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reveal["card_number"]["value"], "4111111111111111");
        assert_eq!(reveal["expiry"]["value"], "12/29");
        assert_eq!(reveal["cvv"]["value"], "123");
    }

    #[tokio::test]
    async fn single_field_reveal_returns_only_that_field() {
        let app = build(AppState::default());
        let (_, saved) = send(&app, "POST", "/cards", Some("user-abc"), Some(visa())).await;
        let uri = format!("/cards/{}/reveal?field=cvv", saved["id"].as_str().unwrap());

        let (status, reveal) = send(&app, "GET", &uri, Some("user-abc"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reveal, json!({ "cvv": { "value": "123" } }));
    }

    #[tokio::test]
    async fn other_users_cannot_see_or_reveal_a_card() {
        let app = build(AppState::default());
        let (_, saved) = send(&app, "POST", "/cards", Some("user-abc"), Some(visa())).await;
        let id = saved["id"].as_str().unwrap().to_owned();

        let (_, list) = send(&app, "GET", "/cards", Some("user-xyz"), None).await;
        assert_eq!(list["cards"], json!([]));

        let uri = format!("/cards/{id}/reveal");
        let (status, _) = send(&app, "GET", &uri, Some("user-xyz"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let uri = format!("/cards/{id}");
        let (status, _) = send(&app, "DELETE", &uri, Some("user-xyz"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn over_long_field_is_a_bad_request() {
        let app = build(AppState::default());
        let mut card = visa();
        card["card_number"] = json!("9".repeat(257));
        let (status, body) = send(&app, "POST", "/cards", Some("user-abc"), Some(card)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "bad_request");
        assert!(!body.to_string().contains("999999999"));
    }

    #[tokio::test]
    async fn replace_then_delete_card() {
        let app = build(AppState::default());
        let (_, saved) = send(&app, "POST", "/cards", Some("user-abc"), Some(visa())).await;
        let id = saved["id"].as_str().unwrap().to_owned();

        let mut updated = visa();
        updated["cvv"] = json!("999");
        let uri = format!("/cards/{id}");
        let (status, _) = send(&app, "PUT", &uri, Some("user-abc"), Some(updated)).await;
        assert_eq!(status, StatusCode::OK);

        let reveal_uri = format!("/cards/{id}/reveal?field=cvv");
        let (_, reveal) = send(&app, "GET", &reveal_uri, Some("user-abc"), None).await;
        assert_eq!(reveal["cvv"]["value"], "999");

        let (status, _) = send(&app, "DELETE", &uri, Some("user-abc"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, list) = send(&app, "GET", "/cards", Some("user-abc"), None).await;
        assert_eq!(list["cards"], json!([]));
    }

    #[tokio::test]
    async fn dashboard_collects_all_sections() {
        let app = build(AppState::default());
        send(&app, "POST", "/cards", Some("user-abc"), Some(visa())).await;
        let (status, _) = send(
            &app,
            "POST",
            "/tickets",
            Some("user-abc"),
            Some(json!({ "passenger_name": "A. Traveller", "pnr": "PNR123" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = send(
            &app,
            "POST",
            "/bills",
            Some("user-abc"),
            Some(json!({ "bill_name": "Power", "file_url": "https://files/power.pdf" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, dash) = send(&app, "GET", "/dashboard", Some("user-abc"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dash["tickets"]["items"].as_array().unwrap().len(), 1);
        assert_eq!(dash["cards"]["items"].as_array().unwrap().len(), 1);
        assert_eq!(dash["bills"]["items"].as_array().unwrap().len(), 1);

        let (_, other) = send(&app, "GET", "/dashboard", Some("user-xyz"), None).await;
        assert_eq!(other["tickets"]["items"], json!([]));
    }

    #[tokio::test]
    async fn card_missing_cvv_is_a_json_bad_request() {
        let app = build(AppState::default());
        let mut card = visa();
        card.as_object_mut().unwrap().remove("cvv");
        let (status, body) = send(&app, "POST", "/cards", Some("user-abc"), Some(card)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "bad_request");
        assert!(body["message"].as_str().unwrap().contains("cvv"));
    }

    #[tokio::test]
    async fn unknown_reveal_field_is_a_json_bad_request() {
        let app = build(AppState::default());
        let (_, saved) = send(&app, "POST", "/cards", Some("user-abc"), Some(visa())).await;
        let uri = format!("/cards/{}/reveal?field=pin", saved["id"].as_str().unwrap());
        let (status, body) = send(&app, "GET", &uri, Some("user-abc"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "bad_request");
    }

    #[tokio::test]
    async fn malformed_card_id_is_a_json_bad_request() {
        let app = build(AppState::default());
        let (status, body) =
            send(&app, "DELETE", "/cards/not-a-uuid", Some("user-abc"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "bad_request");

        let (status, body) =
            send(&app, "GET", "/cards/not-a-uuid/reveal", Some("user-abc"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "bad_request");
    }

    #[tokio::test]
    async fn ticket_without_pnr_is_rejected() {
        let app = build(AppState::default());
        let (status, _) = send(
            &app,
            "POST",
            "/tickets",
            Some("user-abc"),
            Some(json!({ "passenger_name": "A. Traveller" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

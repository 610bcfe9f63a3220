use std::sync::Arc;

use antimatter::{
    billing::{
        PaymentProvider, ProviderCustomer, ProviderError, ProviderSubscription,
        webhook::signature_header,
    },
    clock::{Clock, ManualClock},
    config::{PolicyConfig, WebhookConfig},
    notify::NoopNotifier,
    store::InMemoryStore,
};
use antimatter_api::{construct_router, state::State};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;

const WEBHOOK_SECRET: &str = "whsec_integration";
const EMAIL: &str = "dev@example.com";
const CUSTOMER: &str = "cus_integration";

#[derive(Debug)]
struct FakeStripe {
    period_end: DateTime<Utc>,
}

#[async_trait]
impl PaymentProvider for FakeStripe {
    fn provider_name(&self) -> &'static str {
        "fake"
    }

    async fn customers_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<ProviderCustomer>, ProviderError> {
        if email != EMAIL {
            return Ok(vec![]);
        }
        Ok(vec![ProviderCustomer {
            id: CUSTOMER.into(),
            email: Some(email.into()),
        }])
    }

    async fn active_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<ProviderSubscription>, ProviderError> {
        Ok(vec![ProviderSubscription {
            id: "sub_integration".into(),
            customer_id: customer_id.into(),
            current_period_end: self.period_end,
        }])
    }
}

struct TestApp {
    router: axum::Router,
    clock: Arc<ManualClock>,
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

fn app() -> TestApp {
    let clock = Arc::new(ManualClock::new(start()));
    let state = State::new(
        Arc::new(InMemoryStore::new()),
        clock.clone(),
        Arc::new(NoopNotifier),
        PolicyConfig::default(),
    )
    .with_payment_provider(Arc::new(FakeStripe {
        period_end: start() + Duration::days(30),
    }))
    .with_webhook_config(WebhookConfig::new(WEBHOOK_SECRET));

    TestApp {
        router: construct_router(Arc::new(state)),
        clock,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(request).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn json(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn submit(&self, name: &str, device_id: Option<&str>) -> (StatusCode, Value) {
        let mut body = json!({
            "name": name,
            "developerName": "Jane Dev",
            "version": "1.0.0",
            "category": "utilities",
            "ipaPath": format!("ipas/{name}.ipa"),
        });
        if let Some(device_id) = device_id {
            body["deviceId"] = json!(device_id);
        }
        self.json("POST", "/api/apps", body).await
    }

    async fn webhook(&self, payload: &Value, signature: Option<String>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/webhooks/stripe")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header("stripe-signature", signature);
        }
        self.send(builder.body(Body::from(payload.to_string())).unwrap())
            .await
    }
}

#[tokio::test]
async fn health_is_ok() {
    let app = app();
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn free_quota_paywall_and_subscription() {
    let app = app();

    for i in 1..=5 {
        let (status, body) = app.submit(&format!("App{i}"), Some("device-d")).await;
        assert_eq!(status, StatusCode::CREATED, "submission {i}: {body}");
        assert_eq!(body["data"]["status"], "pending");
    }

    let (status, body) = app.get("/api/developer/usage?deviceId=device-d").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["uploadCount"], 5);
    assert_eq!(body["data"]["canUpload"], false);
    assert_eq!(body["data"]["freeLimit"], 5);

    let (status, body) = app.submit("App6", Some("device-d")).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"]["code"], "SUBSCRIPTION_REQUIRED");

    let (status, body) = app
        .json(
            "POST",
            "/api/developer/verify-subscription",
            json!({ "deviceId": "device-d", "email": EMAIL }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["success"], true);
    assert_eq!(body["data"]["canUpload"], true);
    let period_end: DateTime<Utc> =
        serde_json::from_value(body["data"]["currentPeriodEnd"].clone()).unwrap();
    assert_eq!(period_end, start() + Duration::days(30));

    let (status, _) = app.submit("App6", Some("device-d")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.get("/api/developer/usage?deviceId=device-d").await;
    assert_eq!(body["data"]["uploadCount"], 6);
    assert_eq!(body["data"]["isSubscribed"], true);
}

#[tokio::test]
async fn anonymous_submissions_are_never_limited() {
    let app = app();
    for i in 0..7 {
        let (status, _) = app.submit(&format!("Anon{i}"), None).await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

#[tokio::test]
async fn invalid_submissions_are_rejected() {
    let app = app();

    let (status, body) = app
        .json("POST", "/api/apps", json!({ "developerName": "x" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, _) = app
        .json(
            "POST",
            "/api/apps",
            json!({
                "name": "Bad",
                "developerName": "Jane",
                "version": "1",
                "category": "crypto",
                "ipaPath": "x.ipa",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/apps")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get("/api/apps").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn review_gate_opens_after_review_period() {
    let app = app();
    let (_, body) = app.submit("Gated", Some("device-g")).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["canDownload"], false);

    app.clock.advance(Duration::hours(47) + Duration::minutes(59));
    let (status, body) = app.get(&format!("/api/apps/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["canDownload"], false);
    assert_eq!(body["data"]["availability"]["label"], "Available in 1m");
    assert_eq!(body["data"]["canDelete"], false);

    let (status, body) = app.get(&format!("/api/apps/{id}/download")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "UNDER_REVIEW");

    app.clock.advance(Duration::minutes(1) + Duration::seconds(1));
    let (status, body) = app.get(&format!("/api/apps/{id}/download")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ipaPath"], "ipas/Gated.ipa");
}

#[tokio::test]
async fn only_the_uploader_can_delete_and_quota_is_not_refunded() {
    let app = app();
    let (_, body) = app.submit("Mine", Some("owner")).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/apps/{id}");

    let (_, body) = app.get(&format!("{uri}?deviceId=owner")).await;
    assert_eq!(body["data"]["canDelete"], true);
    let (_, body) = app.get(&format!("{uri}?deviceId=%20owner%20")).await;
    assert_eq!(body["data"]["canDelete"], true);

    let (status, _) = app.json("DELETE", &uri, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json("DELETE", &uri, json!({ "deviceId": "intruder" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.json("DELETE", &uri, json!({ "deviceId": "owner" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], true);

    let (status, _) = app.get(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.json("DELETE", &uri, json!({ "deviceId": "owner" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get("/api/developer/usage?deviceId=owner").await;
    assert_eq!(body["data"]["uploadCount"], 1);
}

#[tokio::test]
async fn listing_filters_by_device_and_status() {
    let app = app();
    app.submit("First", Some("lister")).await;
    app.clock.advance(Duration::minutes(1));
    app.submit("Second", Some("lister")).await;
    app.submit("Other", Some("someone-else")).await;

    let (status, body) = app.get("/api/apps?deviceId=lister").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Second", "First"]);

    let (_, body) = app.get("/api/apps?status=approved").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let (_, body) = app.get("/api/apps?limit=2").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = app.get("/api/apps?status=rejected").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verification_errors() {
    let app = app();

    let (status, _) = app
        .json(
            "POST",
            "/api/developer/verify-subscription",
            json!({ "deviceId": "d", "email": "not-an-email" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(
            "POST",
            "/api/developer/verify-subscription",
            json!({ "deviceId": "d", "email": "stranger@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/api/developer/usage").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unconfigured_integrations_report_unavailable() {
    let state = State::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(ManualClock::new(start())),
        Arc::new(NoopNotifier),
        PolicyConfig::default(),
    );
    let router = construct_router(Arc::new(state));

    let resp = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/developer/verify-subscription")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "deviceId": "d", "email": EMAIL }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let resp = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/webhooks/stripe")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn webhook_cancellation_ends_the_subscription() {
    let app = app();
    app.json(
        "POST",
        "/api/developer/verify-subscription",
        json!({ "deviceId": "device-w", "email": EMAIL }),
    )
    .await;

    let ended = app.clock.now() - Duration::minutes(1);
    let event = json!({
        "id": "evt_1",
        "type": "customer.subscription.deleted",
        "data": { "object": {
            "id": "sub_integration",
            "customer": CUSTOMER,
            "status": "canceled",
            "current_period_end": ended.timestamp(),
        }}
    });

    let (status, body) = app.webhook(&event, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_SIGNATURE");

    let forged = signature_header(
        "whsec_wrong",
        app.clock.now().timestamp(),
        event.to_string().as_bytes(),
    );
    let (status, _) = app.webhook(&event, forged).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get("/api/developer/usage?deviceId=device-w").await;
    assert_eq!(body["data"]["isSubscribed"], true);

    let signature = signature_header(
        WEBHOOK_SECRET,
        app.clock.now().timestamp(),
        event.to_string().as_bytes(),
    );
    let (status, body) = app.webhook(&event, signature).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);

    let (_, body) = app.get("/api/developer/usage?deviceId=device-w").await;
    assert_eq!(body["data"]["isSubscribed"], false);
}

#[tokio::test]
async fn signed_but_malformed_event_gets_a_generic_error() {
    let app = app();
    let event = json!({ "type": 42, "data": "not an object" });
    let signature = signature_header(
        WEBHOOK_SECRET,
        app.clock.now().timestamp(),
        event.to_string().as_bytes(),
    );

    let (status, body) = app.webhook(&event, signature).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert_eq!(body["error"]["message"], "Invalid event payload");
}

#[tokio::test]
async fn push_tokens_register() {
    let app = app();
    let (status, body) = app
        .json(
            "POST",
            "/api/push/register",
            json!({ "token": "ExponentPushToken[abc]", "enabled": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (status, _) = app
        .json("POST", "/api/push/register", json!({ "enabled": true }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn openapi_document_lists_the_store_routes() {
    let app = app();
    let (status, body) = app.get("/api/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/apps"].is_object());
    assert!(body["paths"]["/api/webhooks/stripe"].is_object());
}

//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use document_store::InMemoryStore;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> Router {
    let store = InMemoryStore::new();
    let state = api::create_state(store);
    api::create_app(state, get_metrics_handle())
}

struct Identity {
    user_id: Uuid,
    admin: bool,
}

impl Identity {
    fn customer() -> Self {
        Self {
            user_id: Uuid::new_v4(),
            admin: false,
        }
    }

    fn admin() -> Self {
        Self {
            user_id: Uuid::new_v4(),
            admin: true,
        }
    }
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    identity: Option<&Identity>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(identity) = identity {
        builder = builder.header("x-user-id", identity.user_id.to_string());
        if identity.admin {
            builder = builder.header("x-user-role", "admin");
        }
    }
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_string(&value).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn seed_book(app: &Router, admin: &Identity, title: &str, price_cents: i64, stock: u32) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/books",
        Some(admin),
        Some(json!({
            "title": title,
            "authors": ["Author"],
            "description": "A book",
            "price_cents": price_cents,
            "stock": stock
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

fn shipping_address() -> Value {
    json!({
        "full_name": "Jane Reader",
        "street": "1 Library Way",
        "city": "Booktown",
        "state": "CA",
        "zip_code": "90210",
        "country": "USA",
        "phone_number": "555-0100"
    })
}

#[tokio::test]
async fn health_check() {
    let app = setup();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn private_routes_require_identity_headers() {
    let app = setup();

    let (status, body) = send(&app, "GET", "/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("x-user-id"));

    let (status, _) = send(&app, "GET", "/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn book_creation_is_admin_only() {
    let app = setup();
    let customer = Identity::customer();

    let (status, _) = send(
        &app,
        "POST",
        "/books",
        Some(&customer),
        Some(json!({
            "title": "Nope",
            "authors": ["Author"],
            "description": "A book",
            "price_cents": 999,
            "stock": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = Identity::admin();
    let id = seed_book(&app, &admin, "Dune", 999, 3).await;

    // Listing and reads are public.
    let (status, body) = send(&app, "GET", "/books", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, body) = send(&app, "GET", &format!("/books/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Dune");
    assert_eq!(body["stock"], 3);
}

#[tokio::test]
async fn cart_to_order_flow() {
    let app = setup();
    let admin = Identity::admin();
    let buyer = Identity::customer();
    let book_id = seed_book(&app, &admin, "Dune", 1000, 5).await;

    // Add to cart.
    let (status, cart) = send(
        &app,
        "POST",
        "/cart/items",
        Some(&buyer),
        Some(json!({ "book_id": book_id, "quantity": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["total_cents"], 3000);

    // Place the order with 13% tax.
    let (status, order) = send(
        &app,
        "POST",
        "/orders",
        Some(&buyer),
        Some(json!({
            "shipping_address": shipping_address(),
            "payment_method": "credit_card",
            "tax_amount_cents": 390
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total_cents"], 3000);
    assert_eq!(order["tax_cents"], 390);
    assert_eq!(order["grand_total_cents"], 3390);

    // Stock went down, cart is empty.
    let (_, book) = send(&app, "GET", &format!("/books/{book_id}"), None, None).await;
    assert_eq!(book["stock"], 2);
    let (_, cart) = send(&app, "GET", "/cart", Some(&buyer), None).await;
    assert_eq!(cart["total_cents"], 0);
    assert!(cart["lines"].as_array().unwrap().is_empty());

    // The order shows up in the buyer's list.
    let (status, orders) = send(&app, "GET", "/orders", Some(&buyer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn placing_an_order_with_an_empty_cart_fails() {
    let app = setup();
    let buyer = Identity::customer();

    let (status, body) = send(
        &app,
        "POST",
        "/orders",
        Some(&buyer),
        Some(json!({
            "shipping_address": shipping_address(),
            "payment_method": "paypal"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Cart is empty"));
}

#[tokio::test]
async fn insufficient_stock_names_book_and_available() {
    let app = setup();
    let admin = Identity::admin();
    let alice = Identity::customer();
    let bob = Identity::customer();
    let book_id = seed_book(&app, &admin, "Scarce", 1000, 2).await;

    for buyer in [&alice, &bob] {
        let (status, _) = send(
            &app,
            "POST",
            "/cart/items",
            Some(buyer),
            Some(json!({ "book_id": book_id, "quantity": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let place = json!({
        "shipping_address": shipping_address(),
        "payment_method": "stripe"
    });
    let (status, _) = send(&app, "POST", "/orders", Some(&alice), Some(place.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "POST", "/orders", Some(&bob), Some(place)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("Scarce"));
    assert!(message.contains("available 0"));
}

#[tokio::test]
async fn unknown_payment_method_is_rejected() {
    let app = setup();
    let admin = Identity::admin();
    let buyer = Identity::customer();
    let book_id = seed_book(&app, &admin, "Dune", 1000, 5).await;

    send(
        &app,
        "POST",
        "/cart/items",
        Some(&buyer),
        Some(json!({ "book_id": book_id, "quantity": 1 })),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/orders",
        Some(&buyer),
        Some(json!({
            "shipping_address": shipping_address(),
            "payment_method": "bitcoin"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("payment method"));
}

#[tokio::test]
async fn order_access_and_status_lifecycle() {
    let app = setup();
    let admin = Identity::admin();
    let buyer = Identity::customer();
    let stranger = Identity::customer();
    let book_id = seed_book(&app, &admin, "Dune", 1000, 5).await;

    send(
        &app,
        "POST",
        "/cart/items",
        Some(&buyer),
        Some(json!({ "book_id": book_id, "quantity": 2 })),
    )
    .await;
    let (_, order) = send(
        &app,
        "POST",
        "/orders",
        Some(&buyer),
        Some(json!({
            "shipping_address": shipping_address(),
            "payment_method": "credit_card"
        })),
    )
    .await;
    let order_id = order["id"].as_str().unwrap().to_string();

    // Strangers cannot read someone else's order.
    let (status, _) = send(
        &app,
        "GET",
        &format!("/orders/{order_id}"),
        Some(&stranger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The owner records payment.
    let (status, paid) = send(
        &app,
        "PUT",
        &format!("/orders/{order_id}/pay"),
        Some(&buyer),
        Some(json!({
            "id": "PAY-1",
            "status": "COMPLETED",
            "update_time": "2024-05-01T10:00:00Z",
            "email_address": "jane@example.com"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["is_paid"], true);
    assert_eq!(paid["status"], "processing");

    // Status changes are admin-only.
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/orders/{order_id}/status"),
        Some(&buyer),
        Some(json!({ "status": "shipped" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Cancellation restores stock.
    let (status, cancelled) = send(
        &app,
        "PUT",
        &format!("/orders/{order_id}/status"),
        Some(&admin),
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (_, book) = send(&app, "GET", &format!("/books/{book_id}"), None, None).await;
    assert_eq!(book["stock"], 5);
}

#[tokio::test]
async fn review_flow_with_conflict_and_rating() {
    let app = setup();
    let admin = Identity::admin();
    let reviewer = Identity::customer();
    let book_id = seed_book(&app, &admin, "Dune", 1000, 5).await;

    let review = json!({ "rating": 5, "title": "A classic", "comment": "Read it twice" });
    let (status, created) = send(
        &app,
        "POST",
        &format!("/books/{book_id}/reviews"),
        Some(&reviewer),
        Some(review.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["is_verified_purchase"], false);

    // Second review from the same user conflicts.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/books/{book_id}/reviews"),
        Some(&reviewer),
        Some(review),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already reviewed"));

    // The book carries the aggregate.
    let (_, book) = send(&app, "GET", &format!("/books/{book_id}"), None, None).await;
    assert_eq!(book["rating_average"], 5.0);
    assert_eq!(book["rating_count"], 1);

    // Out-of-range rating is a validation error.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/books/{book_id}/reviews"),
        Some(&Identity::customer()),
        Some(json!({ "rating": 6, "title": "Too much", "comment": "Way too much" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Deleting the only review resets the aggregate.
    let review_id = created["id"].as_str().unwrap();
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/reviews/{review_id}"),
        Some(&reviewer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, book) = send(&app, "GET", &format!("/books/{book_id}"), None, None).await;
    assert_eq!(book["rating_average"], 0.0);
    assert_eq!(book["rating_count"], 0);
}

#[tokio::test]
async fn typed_listing_rejects_nothing_but_understands_filters() {
    let app = setup();
    let admin = Identity::admin();
    seed_book(&app, &admin, "Cheap", 500, 1).await;
    seed_book(&app, &admin, "Pricey", 5000, 0).await;

    let (status, body) = send(
        &app,
        "GET",
        "/books?min_price_cents=1000&sort=price_asc",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["title"], "Pricey");

    let (status, body) = send(&app, "GET", "/books?in_stock=true", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["title"], "Cheap");

    // per_page is capped rather than honored verbatim.
    let (status, body) = send(&app, "GET", "/books?per_page=10000", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["per_page"], 100);
}

#[tokio::test]
async fn metrics_endpoint_renders() {
    let app = setup();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

//! Integration tests for the marketplace backend.

use std::str::FromStr;
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::{Config, LogFormat};
use crate::db::{init_database, Repository};
use crate::search::SearchIndex;
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_psk(Some("test-api-key".to_string())).await
    }

    async fn with_psk(psk: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");
        let index_path = temp_dir.path().join("index");

        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));
        let search = Arc::new(SearchIndex::open(&index_path).expect("Failed to init search"));

        let config = Config {
            api_psk: psk.clone(),
            db_path,
            index_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            log_format: LogFormat::Pretty,
        };

        let state = AppState {
            repo,
            search,
            config: Arc::new(config),
        };

        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = psk {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        TestFixture {
            client: client_builder.build().unwrap(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        (resp.status(), resp.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        (resp.status(), resp.json().await.unwrap())
    }

    async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        (resp.status(), resp.json().await.unwrap())
    }

    async fn delete(&self, path: &str) -> (StatusCode, Value) {
        let resp = self.client.delete(self.url(path)).send().await.unwrap();
        (resp.status(), resp.json().await.unwrap())
    }

    /// Create a user and return its id.
    async fn customer(&self, email: &str) -> String {
        let (status, body) = self
            .post(
                "/api/users",
                json!({
                    "name": "Ana Customer",
                    "email": email,
                    "shippingAddress": address()
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn vendor(&self, email: &str, store: &str) -> String {
        let (status, body) = self
            .post(
                "/api/users",
                json!({
                    "name": format!("{} owner", store),
                    "email": email,
                    "role": "vendor",
                    "storeName": store
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn product(&self, vendor_id: &str, name: &str, price: &str, stock: i64) -> String {
        let (status, body) = self
            .post(
                "/api/products",
                json!({
                    "vendorId": vendor_id,
                    "name": name,
                    "description": format!("A fine {}", name.to_lowercase()),
                    "category": "home",
                    "price": price,
                    "stock": stock,
                    "tags": ["gift"]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn coupon(&self, body: Value) -> Value {
        let (status, body) = self.post("/api/coupons", body).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["data"].clone()
    }

    async fn revision(&self) -> i64 {
        let (_, body) = self.get("/api/revision").await;
        body["data"]["revisionId"].as_i64().unwrap()
    }
}

fn address() -> Value {
    json!({
        "fullName": "Ana Customer",
        "line1": "1 Market Street",
        "city": "Springfield",
        "postalCode": "12345",
        "country": "US"
    })
}

fn money(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("money is a string")).unwrap()
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn coupon_body(code: &str, discount_type: &str, value: &str) -> Value {
    json!({
        "code": code,
        "discountType": discount_type,
        "discountValue": value,
        "startDate": "2020-01-01T00:00:00Z",
        "endDate": "2099-12-31T23:59:59Z"
    })
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_missing_psk() {
    let fixture = TestFixture::with_psk(Some("secret-key".to_string())).await;

    // Request without API key
    let resp = Client::new()
        .get(fixture.url("/api/revision"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_auth_invalid_and_bearer_psk() {
    let fixture = TestFixture::with_psk(Some("correct-key".to_string())).await;
    let client = Client::new();

    let resp = client
        .get(fixture.url("/api/revision"))
        .header("x-api-key", "wrong-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .get(fixture.url("/api/revision"))
        .header("authorization", "Bearer correct-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_revision_increments_on_writes() {
    let fixture = TestFixture::new().await;

    let before = fixture.revision().await;
    let (status, body) = fixture
        .post(
            "/api/users",
            json!({"name": "Bo", "email": "bo@shop.example"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["revisionId"].as_i64().unwrap() > before);
    assert_eq!(fixture.revision().await, before + 1);
}

#[tokio::test]
async fn test_user_crud_and_duplicate_email() {
    let fixture = TestFixture::new().await;

    let id = fixture.customer("ana@shop.example").await;

    let (status, body) = fixture.get(&format!("/api/users/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "customer");
    assert_eq!(body["data"]["shippingAddress"]["city"], "Springfield");

    // Email uniqueness ignores case
    let (status, body) = fixture
        .post(
            "/api/users",
            json!({"name": "Other", "email": "ANA@shop.example"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE");

    // Vendors need a store name
    let (status, body) = fixture
        .post(
            "/api/users",
            json!({"name": "Vee", "email": "vee@shop.example", "role": "vendor"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // Stale version is rejected with the current version in details
    let (status, body) = fixture
        .put(
            &format!("/api/users/{}", id),
            json!({"name": "Ana B", "expectedVersion": 7}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "VERSION_MISMATCH");
    assert_eq!(body["error"]["details"]["currentVersion"], 1);

    let (status, body) = fixture
        .put(
            &format!("/api/users/{}", id),
            json!({"name": "Ana B", "expectedVersion": 1}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["version"], 2);

    let (status, _) = fixture.delete(&format!("/api/users/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = fixture.get(&format!("/api/users/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_product_vendor_scoping() {
    let fixture = TestFixture::new().await;
    let owner = fixture.vendor("owner@shop.example", "Owner Goods").await;
    let other = fixture.vendor("other@shop.example", "Other Goods").await;
    let product = fixture.product(&owner, "Teapot", "24.50", 3).await;

    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/products/{}", product)))
        .header("x-vendor-id", &other)
        .json(&json!({"price": "1.00"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/products/{}", product)))
        .header("x-vendor-id", &owner)
        .json(&json!({"price": "20.00"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(money(&body["data"]["price"]), dec("20.00"));

    // Customers cannot list products
    let customer = fixture.customer("ana@shop.example").await;
    let (status, _) = fixture
        .post(
            "/api/products",
            json!({"vendorId": customer, "name": "Bag", "category": "bags", "price": "5"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_product_search_only_returns_active() {
    let fixture = TestFixture::new().await;
    let vendor = fixture.vendor("v@shop.example", "Lamps").await;
    let lamp = fixture.product(&vendor, "Desk Lamp", "30.00", 4).await;
    fixture.product(&vendor, "Floor Rug", "80.00", 1).await;

    let (status, body) = fixture.get("/api/products/search?q=lamp").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["results"][0]["product"]["id"], lamp.as_str());

    let (status, _) = fixture
        .put(
            &format!("/api/products/{}", lamp),
            json!({"isActive": false}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = fixture.get("/api/products/search?q=lamp").await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn test_coupon_validate_outcomes() {
    let fixture = TestFixture::new().await;

    let mut capped = coupon_body("big25", "percentage", "25");
    capped["maxDiscount"] = json!("500");
    let created = fixture.coupon(capped).await;
    assert_eq!(created["code"], "BIG25");

    let (_, body) = fixture
        .post(
            "/api/coupons/validate",
            json!({"code": "BIG25", "subtotal": "3000"}),
        )
        .await;
    assert_eq!(body["data"]["discountApplied"], true);
    assert_eq!(money(&body["data"]["discount"]), dec("500"));

    fixture.coupon(coupon_body("FLAT200", "fixed", "200")).await;
    let (_, body) = fixture
        .post(
            "/api/coupons/validate",
            json!({"code": "flat200", "subtotal": "150"}),
        )
        .await;
    assert_eq!(money(&body["data"]["discount"]), dec("150"));

    let mut expired = coupon_body("OLD", "fixed", "5");
    expired["endDate"] = json!("2021-01-01T00:00:00Z");
    fixture.coupon(expired).await;
    let (_, body) = fixture
        .post("/api/coupons/validate", json!({"code": "OLD", "subtotal": "50"}))
        .await;
    assert_eq!(body["data"]["discountApplied"], false);
    assert_eq!(body["data"]["message"], "Coupon has expired");

    let mut minimum = coupon_body("MIN100", "fixed", "10");
    minimum["minPurchase"] = json!("100");
    fixture.coupon(minimum).await;
    let (_, body) = fixture
        .post(
            "/api/coupons/validate",
            json!({"code": "MIN100", "subtotal": "99.99"}),
        )
        .await;
    assert_eq!(body["data"]["discountApplied"], false);
    assert_eq!(money(&body["data"]["discount"]), Decimal::ZERO);

    let (status, body) = fixture
        .post("/api/coupons/validate", json!({"code": "NOPE", "subtotal": "10"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["discountApplied"], false);

    let (status, body) = fixture.post("/api/coupons", coupon_body("big25", "fixed", "1")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE");
}

#[tokio::test]
async fn test_checkout_totals_stock_and_coupon_usage() {
    let fixture = TestFixture::new().await;
    let vendor = fixture.vendor("v@shop.example", "Kettles").await;
    let customer = fixture.customer("ana@shop.example").await;
    let kettle = fixture.product(&vendor, "Kettle", "100.00", 10).await;

    let (status, _) = fixture
        .put("/api/settings", json!({"taxRate": "10"}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, shipping) = fixture
        .post(
            "/api/shipping-methods",
            json!({"name": "Standard", "price": "5.00", "estimatedDays": 3}),
        )
        .await;
    let shipping_id = shipping["data"]["id"].as_str().unwrap().to_string();

    let mut limited = coupon_body("SAVE10", "percentage", "10");
    limited["usageLimit"] = json!(1);
    let coupon = fixture.coupon(limited).await;

    let (status, body) = fixture
        .post(
            "/api/checkout",
            json!({
                "userId": customer,
                "items": [{"productId": kettle, "quantity": 2}],
                "shippingMethodId": shipping_id,
                "couponCode": "save10"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let order = &body["data"];
    assert_eq!(money(&order["subtotal"]), dec("200.00"));
    assert_eq!(money(&order["discount"]), dec("20.00"));
    assert_eq!(money(&order["shippingCost"]), dec("5.00"));
    assert_eq!(money(&order["tax"]), dec("18.00"));
    assert_eq!(money(&order["total"]), dec("203.00"));
    assert_eq!(order["paymentStatus"], "pending");
    assert_eq!(order["fulfillmentStatus"], "processing");
    assert_eq!(order["couponCode"], "SAVE10");
    assert_eq!(order["items"][0]["vendorId"], vendor.as_str());
    assert!(order["orderNumber"].as_str().unwrap().starts_with("ORD-"));

    let (_, product) = fixture.get(&format!("/api/products/{}", kettle)).await;
    assert_eq!(product["data"]["stock"], 8);

    let (_, coupon) = fixture
        .get(&format!("/api/coupons/{}", coupon["id"].as_str().unwrap()))
        .await;
    assert_eq!(coupon["data"]["currentUsage"], 1);

    // Usage limit reached: the coupon now blocks checkout
    let (status, body) = fixture
        .post(
            "/api/checkout",
            json!({
                "userId": customer,
                "items": [{"productId": kettle, "quantity": 1}],
                "couponCode": "SAVE10"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Coupon usage limit reached");

    // Not enough stock
    let (status, _) = fixture
        .post(
            "/api/checkout",
            json!({"userId": customer, "items": [{"productId": kettle, "quantity": 9}]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_from_cart_is_idempotent_by_reference() {
    let fixture = TestFixture::new().await;
    let vendor = fixture.vendor("v@shop.example", "Mugs").await;
    let customer = fixture.customer("ana@shop.example").await;
    let mug = fixture.product(&vendor, "Mug", "12.00", 5).await;

    let (status, cart) = fixture
        .post(
            &format!("/api/users/{}/cart/items", customer),
            json!({"productId": mug, "quantity": 1}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["data"]["itemCount"], 1);

    // Adding again stacks onto the existing line
    let (_, cart) = fixture
        .post(
            &format!("/api/users/{}/cart/items", customer),
            json!({"productId": mug, "quantity": 2}),
        )
        .await;
    assert_eq!(cart["data"]["items"][0]["quantity"], 3);
    assert_eq!(money(&cart["data"]["subtotal"]), dec("36.00"));

    let request = json!({"userId": customer, "paymentReference": "pay_123"});
    let (status, first) = fixture.post("/api/checkout", request.clone()).await;
    assert_eq!(status, StatusCode::OK, "{}", first);
    assert_eq!(first["data"]["items"][0]["quantity"], 3);

    let (_, count) = fixture
        .get(&format!("/api/users/{}/cart/count", customer))
        .await;
    assert_eq!(count["data"]["count"], 0);

    let (status, second) = fixture.post("/api/checkout", request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"]["id"], first["data"]["id"]);

    let (_, product) = fixture.get(&format!("/api/products/{}", mug)).await;
    assert_eq!(product["data"]["stock"], 2);

    // Nothing left in the cart and no reference to replay
    let (status, _) = fixture
        .post("/api/checkout", json!({"userId": customer}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cancel_restocks_and_refunds() {
    let fixture = TestFixture::new().await;
    let vendor = fixture.vendor("v@shop.example", "Chairs").await;
    let customer = fixture.customer("ana@shop.example").await;
    let chair = fixture.product(&vendor, "Chair", "40.00", 4).await;
    fixture.coupon(coupon_body("FIVE", "fixed", "5")).await;

    let (_, order) = fixture
        .post(
            "/api/checkout",
            json!({
                "userId": customer,
                "items": [{"productId": chair, "quantity": 3}],
                "couponCode": "FIVE"
            }),
        )
        .await;
    let order_id = order["data"]["id"].as_str().unwrap().to_string();

    let (status, paid) = fixture
        .put(
            &format!("/api/orders/{}/status", order_id),
            json!({"paymentStatus": "paid"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["data"]["paymentStatus"], "paid");

    // Cancellation has its own operation
    let (status, _) = fixture
        .put(
            &format!("/api/orders/{}/status", order_id),
            json!({"fulfillmentStatus": "cancelled"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, stale) = fixture
        .post(
            &format!("/api/orders/{}/cancel?expectedVersion=1", order_id),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(stale["error"]["details"]["currentVersion"], 2);

    let (status, cancelled) = fixture
        .post(&format!("/api/orders/{}/cancel", order_id), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", cancelled);
    assert_eq!(cancelled["data"]["fulfillmentStatus"], "cancelled");
    assert_eq!(cancelled["data"]["paymentStatus"], "refunded");

    let (_, product) = fixture.get(&format!("/api/products/{}", chair)).await;
    assert_eq!(product["data"]["stock"], 4);

    let (_, coupons) = fixture.get("/api/coupons").await;
    assert_eq!(coupons["data"][0]["currentUsage"], 0);

    let (status, _) = fixture
        .post(&format!("/api/orders/{}/cancel", order_id), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_vendor_order_view_hides_other_vendors_lines() {
    let fixture = TestFixture::new().await;
    let first = fixture.vendor("one@shop.example", "One").await;
    let second = fixture.vendor("two@shop.example", "Two").await;
    let customer = fixture.customer("ana@shop.example").await;
    let cup = fixture.product(&first, "Cup", "10.00", 5).await;
    let plate = fixture.product(&second, "Plate", "15.00", 5).await;

    let (status, _) = fixture
        .post(
            "/api/checkout",
            json!({
                "userId": customer,
                "items": [
                    {"productId": cup, "quantity": 1},
                    {"productId": plate, "quantity": 2}
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, all) = fixture.get("/api/orders").await;
    assert_eq!(all["data"][0]["items"].as_array().unwrap().len(), 2);

    let (_, scoped) = fixture.get(&format!("/api/orders?vendorId={}", first)).await;
    let items = scoped["data"][0]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["productId"], cup.as_str());

    let resp = fixture
        .client
        .get(fixture.url("/api/orders"))
        .header("x-vendor-id", &second)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let items = body["data"][0]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["productId"], plate.as_str());

    let third = fixture.vendor("three@shop.example", "Three").await;
    let (_, none) = fixture.get(&format!("/api/vendors/{}/orders", third)).await;
    assert!(none["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_vendor_summary_and_payout_balance() {
    let fixture = TestFixture::new().await;
    let vendor = fixture.vendor("v@shop.example", "Tables").await;
    let customer = fixture.customer("ana@shop.example").await;
    let table = fixture.product(&vendor, "Table", "100.00", 5).await;

    let (_, order) = fixture
        .post(
            "/api/checkout",
            json!({"userId": customer, "items": [{"productId": table, "quantity": 1}]}),
        )
        .await;
    let order_id = order["data"]["id"].as_str().unwrap();

    // Unpaid orders do not count towards earnings
    let (_, summary) = fixture
        .get(&format!("/api/vendors/{}/summary", vendor))
        .await;
    assert_eq!(money(&summary["data"]["grossSales"]), Decimal::ZERO);
    assert_eq!(summary["data"]["orderCount"], 1);

    fixture
        .put(
            &format!("/api/orders/{}/status", order_id),
            json!({"paymentStatus": "paid"}),
        )
        .await;

    let (_, summary) = fixture
        .get(&format!("/api/vendors/{}/summary", vendor))
        .await;
    assert_eq!(money(&summary["data"]["grossSales"]), dec("100.00"));
    assert_eq!(money(&summary["data"]["commission"]), dec("10.00"));
    assert_eq!(money(&summary["data"]["balance"]), dec("90.00"));

    let (status, body) = fixture
        .post(
            &format!("/api/vendors/{}/payouts", vendor),
            json!({"amount": "100.00", "method": "bank"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, payout) = fixture
        .post(
            &format!("/api/vendors/{}/payouts", vendor),
            json!({"amount": "50.00", "method": "bank"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payout["data"]["status"], "pending");

    let (_, summary) = fixture
        .get(&format!("/api/vendors/{}/summary", vendor))
        .await;
    assert_eq!(money(&summary["data"]["pendingPayouts"]), dec("50.00"));
    assert_eq!(money(&summary["data"]["balance"]), dec("40.00"));

    let payout_id = payout["data"]["id"].as_str().unwrap();
    let (status, _) = fixture
        .put(
            &format!("/api/payouts/{}", payout_id),
            json!({"status": "completed", "reference": "wire-1"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, summary) = fixture
        .get(&format!("/api/vendors/{}/summary", vendor))
        .await;
    assert_eq!(money(&summary["data"]["paidOut"]), dec("50.00"));
    assert_eq!(money(&summary["data"]["balance"]), dec("40.00"));

    let (_, stats) = fixture.get("/api/dashboard/stats").await;
    assert_eq!(stats["data"]["vendors"], 1);
    assert_eq!(stats["data"]["orders"], 1);
    assert_eq!(money(&stats["data"]["revenue"]), dec("100.00"));
}

#[tokio::test]
async fn test_chat_flow() {
    let fixture = TestFixture::new().await;
    let vendor = fixture.vendor("v@shop.example", "Rugs").await;
    let customer = fixture.customer("ana@shop.example").await;
    let outsider = fixture.customer("eve@shop.example").await;

    let (status, chat) = fixture
        .post(
            "/api/chats",
            json!({"customerId": customer, "vendorId": vendor}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let chat_id = chat["data"]["id"].as_str().unwrap().to_string();

    let (_, again) = fixture
        .post(
            "/api/chats",
            json!({"customerId": customer, "vendorId": vendor}),
        )
        .await;
    assert_eq!(again["data"]["id"], chat_id.as_str());

    let (status, _) = fixture
        .post(
            &format!("/api/chats/{}/messages", chat_id),
            json!({"senderId": customer, "body": "Is the rug washable?"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = fixture
        .post(
            &format!("/api/chats/{}/messages", chat_id),
            json!({"senderId": outsider, "body": "hi"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (_, unread) = fixture
        .get(&format!("/api/chats/unread?participantId={}", vendor))
        .await;
    assert_eq!(unread["data"]["unread"], 1);
    let (_, unread) = fixture
        .get(&format!("/api/chats/unread?participantId={}", customer))
        .await;
    assert_eq!(unread["data"]["unread"], 0);

    let (status, read) = fixture
        .post(
            &format!("/api/chats/{}/read", chat_id),
            json!({"readerId": vendor}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["data"]["messages"][0]["read"], true);

    let (_, unread) = fixture
        .get(&format!("/api/chats/unread?participantId={}", vendor))
        .await;
    assert_eq!(unread["data"]["unread"], 0);

    let (_, listed) = fixture
        .get(&format!("/api/chats?participantId={}", customer))
        .await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_wishlist_is_idempotent() {
    let fixture = TestFixture::new().await;
    let vendor = fixture.vendor("v@shop.example", "Vases").await;
    let customer = fixture.customer("ana@shop.example").await;
    let vase = fixture.product(&vendor, "Vase", "18.00", 2).await;

    for _ in 0..2 {
        let (status, _) = fixture
            .post(
                &format!("/api/users/{}/wishlist", customer),
                json!({"productId": vase}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, count) = fixture
        .get(&format!("/api/users/{}/wishlist/count", customer))
        .await;
    assert_eq!(count["data"]["count"], 1);

    let (status, _) = fixture
        .delete(&format!("/api/users/{}/wishlist/{}", customer, vase))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = fixture
        .get(&format!("/api/users/{}/wishlist", customer))
        .await;
    assert!(list["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_live_deal_lowers_checkout_price() {
    let fixture = TestFixture::new().await;
    let vendor = fixture.vendor("v@shop.example", "Lamps").await;
    let customer = fixture.customer("ana@shop.example").await;
    let lamp = fixture.product(&vendor, "Lamp", "50.00", 5).await;

    let (status, deal) = fixture
        .post(
            "/api/deals",
            json!({
                "productId": lamp,
                "title": "Spring sale",
                "discountPercent": "20",
                "startDate": "2020-01-01T00:00:00Z",
                "endDate": "2099-12-31T23:59:59Z"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", deal);

    // A finished deal never beats the live one
    let (status, _) = fixture
        .post(
            "/api/deals",
            json!({
                "productId": lamp,
                "title": "Old clearance",
                "discountPercent": "50",
                "startDate": "2020-01-01T00:00:00Z",
                "endDate": "2021-01-01T00:00:00Z"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = fixture
        .post(
            "/api/checkout",
            json!({"userId": customer, "items": [{"productId": lamp, "quantity": 2}]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(money(&body["data"]["items"][0]["unitPrice"]), dec("40.00"));
    assert_eq!(money(&body["data"]["subtotal"]), dec("80.00"));
    assert_eq!(money(&body["data"]["total"]), dec("80.00"));
}

#[tokio::test]
async fn test_free_shipping_at_threshold() {
    let fixture = TestFixture::new().await;
    let vendor = fixture.vendor("v@shop.example", "Pots").await;
    let customer = fixture.customer("ana@shop.example").await;
    let pot = fixture.product(&vendor, "Pot", "50.00", 10).await;

    let (status, _) = fixture
        .put("/api/settings", json!({"freeShippingThreshold": "100"}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, shipping) = fixture
        .post(
            "/api/shipping-methods",
            json!({"name": "Standard", "price": "7.50", "estimatedDays": 3}),
        )
        .await;
    let shipping_id = shipping["data"]["id"].as_str().unwrap().to_string();

    let (_, at_threshold) = fixture
        .post(
            "/api/checkout",
            json!({
                "userId": customer,
                "items": [{"productId": pot, "quantity": 2}],
                "shippingMethodId": shipping_id
            }),
        )
        .await;
    assert_eq!(money(&at_threshold["data"]["shippingCost"]), Decimal::ZERO);
    assert_eq!(money(&at_threshold["data"]["total"]), dec("100.00"));

    let (_, below) = fixture
        .post(
            "/api/checkout",
            json!({
                "userId": customer,
                "items": [{"productId": pot, "quantity": 1}],
                "shippingMethodId": shipping_id
            }),
        )
        .await;
    assert_eq!(money(&below["data"]["shippingCost"]), dec("7.50"));
    assert_eq!(money(&below["data"]["total"]), dec("57.50"));
}

#[tokio::test]
async fn test_cart_quantity_zero_and_remove_line() {
    let fixture = TestFixture::new().await;
    let vendor = fixture.vendor("v@shop.example", "Bowls").await;
    let customer = fixture.customer("ana@shop.example").await;
    let bowl = fixture.product(&vendor, "Bowl", "9.00", 5).await;
    let plate = fixture.product(&vendor, "Plate", "6.00", 5).await;

    for product in [&bowl, &plate] {
        let (status, _) = fixture
            .post(
                &format!("/api/users/{}/cart/items", customer),
                json!({"productId": product, "quantity": 2}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, cart) = fixture
        .put(
            &format!("/api/users/{}/cart/items/{}", customer, bowl),
            json!({"quantity": 0}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", cart);
    assert_eq!(cart["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["data"]["items"][0]["productId"], plate.as_str());
    assert_eq!(money(&cart["data"]["subtotal"]), dec("12.00"));

    let (status, cart) = fixture
        .delete(&format!("/api/users/{}/cart/items/{}", customer, plate))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(cart["data"]["items"].as_array().unwrap().is_empty());
    assert_eq!(cart["data"]["itemCount"], 0);

    let (status, _) = fixture
        .delete(&format!("/api/users/{}/cart/items/{}", customer, plate))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_only_valid_coupons() {
    let fixture = TestFixture::new().await;

    fixture.coupon(coupon_body("LIVE", "fixed", "5")).await;
    let mut expired = coupon_body("GONE", "fixed", "5");
    expired["endDate"] = json!("2021-01-01T00:00:00Z");
    fixture.coupon(expired).await;

    let (_, all) = fixture.get("/api/coupons").await;
    assert_eq!(all["data"].as_array().unwrap().len(), 2);

    let (_, valid) = fixture.get("/api/coupons?validOnly=true").await;
    let valid = valid["data"].as_array().unwrap();
    assert_eq!(valid.len(), 1);
    assert_eq!(valid[0]["code"], "LIVE");
}

#[tokio::test]
async fn test_coupon_usage_limit_blocks_checkout() {
    let fixture = TestFixture::new().await;
    let vendor = fixture.vendor("v@shop.example", "Cups").await;
    let customer = fixture.customer("ana@shop.example").await;
    let cup = fixture.product(&vendor, "Cup", "10.00", 10).await;

    let mut limited = coupon_body("TWICE", "fixed", "1");
    limited["usageLimit"] = json!(2);
    let coupon = fixture.coupon(limited).await;

    let checkout = json!({
        "userId": customer,
        "items": [{"productId": cup, "quantity": 1}],
        "couponCode": "TWICE"
    });
    for _ in 0..2 {
        let (status, body) = fixture.post("/api/checkout", checkout.clone()).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }

    let (status, body) = fixture.post("/api/checkout", checkout).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (_, coupon) = fixture
        .get(&format!("/api/coupons/{}", coupon["id"].as_str().unwrap()))
        .await;
    assert_eq!(coupon["data"]["currentUsage"], 2);

    // The rejected checkout left stock alone
    let (_, product) = fixture.get(&format!("/api/products/{}", cup)).await;
    assert_eq!(product["data"]["stock"], 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_chat_messages_are_all_kept() {
    let fixture = TestFixture::new().await;
    let vendor = fixture.vendor("v@shop.example", "Quilts").await;
    let customer = fixture.customer("ana@shop.example").await;

    let (_, chat) = fixture
        .post(
            "/api/chats",
            json!({"customerId": customer, "vendorId": vendor}),
        )
        .await;
    let chat_id = chat["data"]["id"].as_str().unwrap().to_string();

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..10 {
        let client = fixture.client.clone();
        let url = fixture.url(&format!("/api/chats/{}/messages", chat_id));
        let sender = customer.clone();
        tasks.spawn(async move {
            client
                .post(url)
                .json(&json!({"senderId": sender, "body": format!("message {}", i)}))
                .send()
                .await
                .unwrap()
                .status()
        });
    }
    while let Some(status) = tasks.join_next().await {
        assert_eq!(status.unwrap(), StatusCode::OK);
    }

    let (_, chat) = fixture.get(&format!("/api/chats/{}", chat_id)).await;
    assert_eq!(chat["data"]["messages"].as_array().unwrap().len(), 10);

    let (_, unread) = fixture
        .get(&format!("/api/chats/unread?participantId={}", vendor))
        .await;
    assert_eq!(unread["data"]["unread"], 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_payouts_respect_balance() {
    let fixture = TestFixture::new().await;
    let vendor = fixture.vendor("v@shop.example", "Desks").await;
    let customer = fixture.customer("ana@shop.example").await;
    let desk = fixture.product(&vendor, "Desk", "100.00", 5).await;

    let (_, order) = fixture
        .post(
            "/api/checkout",
            json!({"userId": customer, "items": [{"productId": desk, "quantity": 1}]}),
        )
        .await;
    fixture
        .put(
            &format!("/api/orders/{}/status", order["data"]["id"].as_str().unwrap()),
            json!({"paymentStatus": "paid"}),
        )
        .await;

    // Balance is 90.00 after the default 10% commission
    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..6 {
        let client = fixture.client.clone();
        let url = fixture.url(&format!("/api/vendors/{}/payouts", vendor));
        tasks.spawn(async move {
            client
                .post(url)
                .json(&json!({"amount": "50.00", "method": "bank"}))
                .send()
                .await
                .unwrap()
                .status()
        });
    }
    let mut accepted = 0;
    while let Some(status) = tasks.join_next().await {
        match status.unwrap() {
            StatusCode::OK => accepted += 1,
            other => assert_eq!(other, StatusCode::BAD_REQUEST),
        }
    }
    assert_eq!(accepted, 1);

    let (_, summary) = fixture
        .get(&format!("/api/vendors/{}/summary", vendor))
        .await;
    assert_eq!(money(&summary["data"]["balance"]), dec("40.00"));
}

#[tokio::test]
async fn test_oversized_amounts_and_search_paging() {
    let fixture = TestFixture::new().await;
    let vendor = fixture.vendor("v@shop.example", "Clocks").await;
    let customer = fixture.customer("ana@shop.example").await;
    let clock = fixture.product(&vendor, "Clock", "30.00", 3).await;

    let (status, body) = fixture
        .post(
            "/api/products",
            json!({
                "vendorId": vendor,
                "name": "Gold clock",
                "category": "home",
                "price": "50000000000000000000000000000",
                "stock": 2
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, _) = fixture
        .put(
            &format!("/api/products/{}", clock),
            json!({"stock": i64::MAX}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = fixture
        .post(
            "/api/checkout",
            json!({
                "userId": customer,
                "items": [
                    {"productId": clock, "quantity": i64::MAX},
                    {"productId": clock, "quantity": 1}
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (_, product) = fixture.get(&format!("/api/products/{}", clock)).await;
    assert_eq!(product["data"]["stock"], 3);

    let (status, body) = fixture.get("/api/products/search?q=clock&limit=0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 1);

    let (status, _) = fixture
        .get("/api/products/search?q=clock&offset=18446744073709551615")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_cancels_report_current_version() {
    let fixture = TestFixture::new().await;
    let vendor = fixture.vendor("v@shop.example", "Stools").await;
    let customer = fixture.customer("ana@shop.example").await;
    let stool = fixture.product(&vendor, "Stool", "25.00", 5).await;

    let (_, order) = fixture
        .post(
            "/api/checkout",
            json!({"userId": customer, "items": [{"productId": stool, "quantity": 2}]}),
        )
        .await;
    let order_id = order["data"]["id"].as_str().unwrap().to_string();

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..5 {
        let client = fixture.client.clone();
        let url = fixture.url(&format!("/api/orders/{}/cancel", order_id));
        tasks.spawn(async move {
            let resp = client.post(url).json(&json!({})).send().await.unwrap();
            let status = resp.status();
            (status, resp.json::<Value>().await.unwrap())
        });
    }

    let mut cancelled = 0;
    while let Some(result) = tasks.join_next().await {
        let (status, body) = result.unwrap();
        match status {
            StatusCode::OK => cancelled += 1,
            StatusCode::CONFLICT => assert_eq!(body["error"]["details"]["currentVersion"], 2),
            other => assert_eq!(other, StatusCode::BAD_REQUEST, "{}", body),
        }
    }
    assert_eq!(cancelled, 1);

    // Restocked exactly once
    let (_, product) = fixture.get(&format!("/api/products/{}", stool)).await;
    assert_eq!(product["data"]["stock"], 5);
}

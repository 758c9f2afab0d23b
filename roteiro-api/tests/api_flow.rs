use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tokio::task::JoinSet;
use tower::ServiceExt;

use roteiro_api::middleware::auth::{issue_token, ADMIN_ROLE, USER_ROLE};
use roteiro_api::{app, AppState, AuthConfig, Backends};
use roteiro_core::billing::StaticBillingProvider;
use roteiro_order::RegisteredUser;
use roteiro_shared::models::events::DomainEvent;
use roteiro_store::app_config::BusinessRules;
use roteiro_store::MemoryStore;

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    auth: AuthConfig,
}

impl TestApp {
    fn new() -> Self {
        Self::with_rules(BusinessRules::default())
    }

    fn with_rules(rules: BusinessRules) -> Self {
        let store = Arc::new(MemoryStore::new());
        let auth = AuthConfig { secret: "test-secret".into(), expiration: 3600 };
        let state = AppState::new(
            Backends::memory(store.clone()),
            Arc::new(StaticBillingProvider::new("Agência Pro", 19_900, "https://billing.test/portal")),
            auth.clone(),
            rules,
        )
        .unwrap();
        Self { router: app(state), store, auth }
    }

    fn admin(&self) -> String {
        issue_token(&self.auth, "admin-1", "admin@roteiro.test", Some("Admin"), ADMIN_ROLE).unwrap()
    }

    fn user(&self, sub: &str, name: &str) -> String {
        issue_token(&self.auth, sub, &format!("{sub}@example.com"), Some(name), USER_ROLE).unwrap()
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, value)
    }

    async fn create_bus(&self, seats: u32, plate: &str) -> String {
        let (status, bus) = self
            .call(
                Method::POST,
                "/api/fleet",
                Some(&self.admin()),
                Some(json!({ "model": "Marcopolo Paradiso G8", "year": 2023, "plate": plate, "seat_count": seats })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{bus}");
        bus["id"].as_str().unwrap().to_string()
    }

    async fn create_package(&self, extra: Value) -> String {
        let departure = Utc::now().date_naive() + Duration::days(30);
        let mut body = json!({
            "title": "Gramado e Canela",
            "destination": "Gramado - RS",
            "price_cents": 129_900,
            "departure_date": departure.to_string(),
            "return_date": (departure + Duration::days(3)).to_string(),
            "status": "published",
        });
        if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                body.insert(k.clone(), v.clone());
            }
        }
        let (status, package) = self.call(Method::POST, "/api/packages", Some(&self.admin()), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{package}");
        package["id"].as_str().unwrap().to_string()
    }

    async fn book(&self, uri: &str, package_id: &str, seats: &[u32], extra: Value) -> (StatusCode, Value) {
        let mut body = json!({
            "package_id": package_id,
            "customer_name": "Maria Souza",
            "customer_email": "Maria@Example.com",
            "customer_phone": "(11) 98888-7777",
            "passengers": seats.len().max(1),
            "seats": seats,
        });
        if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                body.insert(k.clone(), v.clone());
            }
        }
        self.call(Method::POST, uri, None, Some(body)).await
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn admin_routes_require_admin_token() {
    let app = TestApp::new();
    let body = json!({ "title": "x" });

    let (status, _) = app.call(Method::POST, "/api/packages", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let user = app.user("u1", "Ana");
    let (status, _) = app.call(Method::POST, "/api/packages", Some(&user), Some(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call(Method::GET, "/api/customers", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn drafts_are_hidden_from_the_storefront() {
    let app = TestApp::new();
    let published = app.create_package(json!({ "total_seats": 40 })).await;
    let draft = app.create_package(json!({ "title": "Bonito", "total_seats": 20, "status": "draft" })).await;

    let (status, list) = app.call(Method::GET, "/api/packages", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = list.as_array().unwrap().iter().map(|p| p["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec![published.as_str()]);
    assert_eq!(list[0]["price_display"], "R$ 1.299,00");

    let (status, _) = app.call(Method::GET, &format!("/api/packages/{draft}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, all) = app.call(Method::GET, "/api/packages", Some(&app.admin()), None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, filtered) = app.call(Method::GET, "/api/packages?q=gramado", None, None).await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn booking_total_is_price_times_passengers() {
    let app = TestApp::new();
    let package = app.create_package(json!({ "total_seats": 10 })).await;

    let (status, booking) = app
        .book("/api/bookings", &package, &[], json!({ "passengers": 3, "seats": [] }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{booking}");
    assert_eq!(booking["total_cents"], 3 * 129_900);
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["customer_email"], "maria@example.com");

    let (_, detail) = app.call(Method::GET, &format!("/api/packages/{package}"), None, None).await;
    assert_eq!(detail["available_seats"], 7);
}

#[tokio::test]
async fn invalid_bookings_get_clear_errors() {
    let app = TestApp::new();
    let package = app.create_package(json!({ "total_seats": 2 })).await;

    let (status, body) = app.book("/api/bookings", &package, &[], json!({ "customer_name": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("customer_name"));

    let unknown = uuid::Uuid::new_v4().to_string();
    let (status, _) = app.book("/api/bookings", &unknown, &[], json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.book("/api/bookings", &package, &[], json!({ "passengers": 3 })).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn malformed_booking_bodies_get_json_errors() {
    let app = TestApp::new();
    let package = app.create_package(json!({ "total_seats": 10 })).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/bookings",
            None,
            Some(json!({
                "package_id": package,
                "customer_name": "Maria Souza",
                "customer_email": "maria@example.com",
                "customer_phone": "(11) 98888-7777",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("passengers"), "{body}");

    let (status, body) = app.book("/api/bookings", "not-a-uuid", &[], json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_of_one_seat_admit_a_single_winner() {
    let app = Arc::new(TestApp::new());
    let bus = app.create_bus(40, "CNC1R23").await;
    let package = app.create_package(json!({ "bus_id": bus })).await;

    let mut set = JoinSet::new();
    for _ in 0..8 {
        let app = app.clone();
        let package = package.clone();
        set.spawn(async move { app.book("/api/bookings", &package, &[7], json!({})).await.0 });
    }

    let mut statuses = Vec::new();
    while let Some(status) = set.join_next().await {
        statuses.push(status.unwrap());
    }
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CREATED).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count(), 7);

    let (_, seats) = app.call(Method::GET, &format!("/api/packages/{package}/seats"), None, None).await;
    assert_eq!(seats["occupied"], json!([7]));
    assert_eq!(seats["available"], 39);
}

#[tokio::test]
async fn seats_cannot_be_booked_twice_until_canceled() {
    let app = TestApp::new();
    let bus = app.create_bus(42, "RTR1A23").await;
    let package = app.create_package(json!({ "bus_id": bus })).await;

    let (status, first) = app.book("/api/bookings", &package, &[2, 1], json!({})).await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    assert_eq!(first["seats"], json!([1, 2]));

    let (_, seats) = app.call(Method::GET, &format!("/api/packages/{package}/seats"), None, None).await;
    assert_eq!(seats["total_seats"], 42);
    assert_eq!(seats["occupied"], json!([1, 2]));
    assert_eq!(seats["available"], 40);
    assert_eq!(seats["rows"].as_array().unwrap().len(), 11);

    let (status, _) = app.book("/api/bookings", &package, &[2, 3], json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.book("/api/bookings", &package, &[43], json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.book("/api/bookings", &package, &[5], json!({ "passengers": 2 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let id = first["id"].as_str().unwrap();
    let (status, canceled) = app
        .call(
            Method::PATCH,
            &format!("/api/bookings/{id}/status"),
            Some(&app.admin()),
            Some(json!({ "status": "canceled" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(canceled["status"], "canceled");

    let (status, _) = app.book("/api/bookings", &package, &[2, 3], json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn status_machine_rejects_invalid_moves() {
    let app = TestApp::new();
    let admin = app.admin();
    let package = app.create_package(json!({ "total_seats": 10 })).await;
    let (_, booking) = app.book("/api/bookings", &package, &[], json!({})).await;
    let uri = format!("/api/bookings/{}/status", booking["id"].as_str().unwrap());

    let (status, paid) = app.call(Method::PATCH, &uri, Some(&admin), Some(json!({ "payment_status": "paid" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "paid");
    assert_eq!(paid["payment_status"], "paid");

    let (status, _) = app.call(Method::PATCH, &uri, Some(&admin), Some(json!({ "status": "confirmed" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.call(Method::PATCH, &uri, Some(&admin), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let events = app.store.published_events().await;
    assert!(events.iter().any(|e| matches!(e, DomainEvent::BookingCreated(_))));
    assert!(events
        .iter()
        .any(|e| matches!(e, DomainEvent::BookingStatusChanged(c) if c.from == "pending" && c.to == "paid")));
}

#[tokio::test]
async fn held_seats_are_reserved_for_their_session() {
    let app = TestApp::new();
    let bus = app.create_bus(20, "HLD4B56").await;
    let package = app.create_package(json!({ "bus_id": bus })).await;
    let hold_uri = format!("/api/packages/{package}/seats/hold");

    let (status, hold) = app
        .call(Method::POST, &hold_uri, None, Some(json!({ "hold_token": "session-a", "seats": [5, 6] })))
        .await;
    assert_eq!(status, StatusCode::OK, "{hold}");
    assert_eq!(hold["seats"], json!([5, 6]));

    let (status, _) = app
        .call(Method::POST, &hold_uri, None, Some(json!({ "hold_token": "session-b", "seats": [6] })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, seats) = app.call(Method::GET, &format!("/api/packages/{package}/seats"), None, None).await;
    assert_eq!(seats["held"], json!([5, 6]));
    let (_, own) = app
        .call(Method::GET, &format!("/api/packages/{package}/seats?hold_token=session-a"), None, None)
        .await;
    assert_eq!(own["held"], json!([]));

    let (status, _) = app.book("/api/bookings", &package, &[5], json!({ "hold_token": "session-b" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.book("/api/bookings", &package, &[5, 6], json!({ "hold_token": "session-a" })).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, seats) = app.call(Method::GET, &format!("/api/packages/{package}/seats"), None, None).await;
    assert_eq!(seats["occupied"], json!([5, 6]));
    assert_eq!(seats["held"], json!([]));
}

#[tokio::test]
async fn affiliate_referrals_follow_approval() {
    let app = TestApp::new();
    let admin = app.admin();
    let joana = app.user("joana", "Joana Lima");
    let package = app.create_package(json!({ "total_seats": 30 })).await;

    let (status, _) = app.call(Method::GET, "/api/affiliates/me", Some(&joana), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, affiliate) = app
        .call(Method::POST, "/api/affiliates/me", Some(&joana), Some(json!({ "pix_key": "joana@pix" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(affiliate["status"], "pending");
    assert_eq!(affiliate["commission_rate"], 10);
    let code = affiliate["code"].as_str().unwrap().to_string();
    assert!(code.starts_with("JOAN"));

    let (status, _) = app.call(Method::POST, "/api/affiliates/me", Some(&joana), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Pending affiliates earn nothing.
    let (status, _) = app.book("/api/bookings", &package, &[], json!({ "ref": code })).await;
    assert_eq!(status, StatusCode::CREATED);

    let id = affiliate["id"].as_str().unwrap();
    let (status, approved) = app
        .call(Method::PATCH, &format!("/api/affiliates/{id}"), Some(&admin), Some(json!({ "action": "approve" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "active");

    let (status, _) = app
        .call(Method::PATCH, &format!("/api/affiliates/{id}"), Some(&admin), Some(json!({ "action": "approve" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, booking) = app
        .book(&format!("/api/bookings?ref={}", code.to_lowercase()), &package, &[], json!({ "passengers": 2, "seats": [] }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["affiliate_code"], code);

    let (_, me) = app.call(Method::GET, "/api/affiliates/me", Some(&joana), None).await;
    assert_eq!(me["summary"]["sales"], 1);
    assert_eq!(me["referrals"][0]["sale_cents"], 259_800);
    assert_eq!(me["referrals"][0]["commission_cents"], 25_980);
    assert_eq!(me["referrals"][0]["status"], "pending");

    let referral = me["referrals"][0]["id"].as_str().unwrap();
    let uri = format!("/api/affiliates/referrals/{referral}");
    let (status, _) = app.call(Method::PATCH, &uri, Some(&admin), Some(json!({ "status": "paid" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, r) = app.call(Method::PATCH, &uri, Some(&admin), Some(json!({ "status": "approved" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(r["status"], "approved");

    let (_, mine) = app.call(Method::GET, "/api/affiliates/referrals", Some(&joana), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn commission_tiers_are_public() {
    let app = TestApp::new();
    let (status, tiers) = app.call(Method::GET, "/api/affiliates/tiers", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let tiers = tiers.as_array().unwrap();
    assert_eq!(tiers.len(), 4);
    assert_eq!(tiers[0]["percent"], 5);
    assert_eq!(tiers[3]["bonus_display"], "R$ 1.000,00");
}

#[tokio::test]
async fn customers_merge_users_and_guests() {
    let app = TestApp::new();
    app.store
        .add_user(RegisteredUser {
            id: "user-maria".into(),
            name: "Maria S. Souza".into(),
            email: "maria@example.com".into(),
            phone: None,
            created_at: Utc::now(),
        })
        .await;
    let package = app.create_package(json!({ "total_seats": 10 })).await;
    app.book("/api/bookings", &package, &[], json!({})).await;
    app.book("/api/bookings", &package, &[], json!({ "customer_email": "guest@example.com", "customer_name": "Guest" }))
        .await;

    let (status, customers) = app.call(Method::GET, "/api/customers", Some(&app.admin()), None).await;
    assert_eq!(status, StatusCode::OK);
    let customers = customers.as_array().unwrap();
    assert_eq!(customers.len(), 2);

    let maria = customers.iter().find(|c| c["email"] == "maria@example.com").unwrap();
    assert_eq!(maria["registered"], true);
    assert_eq!(maria["name"], "Maria S. Souza");
    assert_eq!(maria["bookings"], 1);
    assert_eq!(maria["total_spent_display"], "R$ 1.299,00");

    let guest = customers.iter().find(|c| c["email"] == "guest@example.com").unwrap();
    assert_eq!(guest["registered"], false);
}

#[tokio::test]
async fn fleet_visibility_and_protection() {
    let app = TestApp::new();
    let admin = app.admin();
    let bus = app.create_bus(46, "FLT7C89").await;

    let (status, retired) = app
        .call(
            Method::PUT,
            &format!("/api/fleet/{bus}"),
            Some(&admin),
            Some(json!({ "model": "Irizar i6", "year": 2019, "plate": "FLT7C89", "seat_count": 46, "active": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{retired}");

    let (_, public) = app.call(Method::GET, "/api/fleet", None, None).await;
    assert!(public.as_array().unwrap().is_empty());
    let (_, all) = app.call(Method::GET, "/api/fleet", Some(&admin), None).await;
    assert_eq!(all.as_array().unwrap().len(), 1);

    let (status, _) = app.call(Method::POST, "/api/fleet", Some(&admin), Some(json!({
        "model": "Dup", "year": 2020, "plate": "flt-7c89", "seat_count": 40
    }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.create_package(json!({ "bus_id": bus })).await;
    let (status, _) = app.call(Method::DELETE, &format!("/api/fleet/{bus}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn available_seats_count_passengers_booked_before_a_bus_was_assigned() {
    let app = TestApp::new();
    let package = app.create_package(json!({ "total_seats": 10 })).await;
    app.book("/api/bookings", &package, &[], json!({ "passengers": 3, "seats": [] })).await;

    let (_, seats) = app.call(Method::GET, &format!("/api/packages/{package}/seats"), None, None).await;
    assert_eq!(seats["seat_map"], false);
    assert_eq!(seats["available"], 7);

    let bus = app.create_bus(12, "LAT3B45").await;
    let departure = Utc::now().date_naive() + Duration::days(30);
    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/packages/{package}"),
            Some(&app.admin()),
            Some(json!({
                "title": "Gramado e Canela",
                "destination": "Gramado - RS",
                "price_cents": 129_900,
                "departure_date": departure.to_string(),
                "return_date": (departure + Duration::days(3)).to_string(),
                "total_seats": 10,
                "bus_id": bus,
                "status": "published",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, seats) = app.call(Method::GET, &format!("/api/packages/{package}/seats"), None, None).await;
    assert_eq!(seats["seat_map"], true);
    assert_eq!(seats["occupied"], json!([]));
    assert_eq!(seats["available"], 7);
}

#[tokio::test]
async fn package_with_bookings_cannot_shrink_or_be_deleted() {
    let app = TestApp::new();
    let admin = app.admin();
    let package = app.create_package(json!({ "total_seats": 10 })).await;
    app.book("/api/bookings", &package, &[], json!({ "passengers": 4, "seats": [] })).await;

    let departure = Utc::now().date_naive() + Duration::days(30);
    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/packages/{package}"),
            Some(&admin),
            Some(json!({
                "title": "Gramado e Canela",
                "destination": "Gramado - RS",
                "price_cents": 139_900,
                "departure_date": departure.to_string(),
                "return_date": (departure + Duration::days(3)).to_string(),
                "total_seats": 3,
                "status": "published",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.call(Method::DELETE, &format!("/api/packages/{package}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn contact_tickets_are_triaged_by_admins() {
    let app = TestApp::new();
    let admin = app.admin();

    let (status, _) = app.call(Method::POST, "/api/contacts", None, Some(json!({ "name": "Rui" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, contact) = app
        .call(
            Method::POST,
            "/api/contacts",
            None,
            Some(json!({ "name": "Rui", "email": "rui@example.com", "message": "Tem saída em julho?" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(contact["subject"], "Contato pelo site");
    let id = contact["id"].as_str().unwrap();

    let (status, updated) = app
        .call(Method::PATCH, &format!("/api/contacts/{id}"), Some(&admin), Some(json!({ "status": "in_progress" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "in_progress");

    let (_, open) = app.call(Method::GET, "/api/contacts?status=new", Some(&admin), None).await;
    assert!(open.as_array().unwrap().is_empty());

    let (status, _) = app.call(Method::DELETE, &format!("/api/contacts/{id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.call(Method::GET, &format!("/api/contacts/{id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert!(app
        .store
        .published_events()
        .await
        .iter()
        .any(|e| matches!(e, DomainEvent::ContactReceived(_))));
}

#[tokio::test]
async fn billing_is_admin_only() {
    let app = TestApp::new();
    let admin = app.admin();

    let (status, sub) = app.call(Method::GET, "/api/subscription", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sub["plan"], "Agência Pro");

    let (_, invoices) = app.call(Method::GET, "/api/invoices", Some(&admin), None).await;
    assert_eq!(invoices.as_array().unwrap().len(), 3);

    let (status, portal) = app
        .call(Method::POST, "/api/portal", Some(&admin), Some(json!({ "return_url": "https://agencia.test/admin" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(portal["url"].as_str().unwrap().starts_with("https://billing.test/portal"));

    let (status, _) = app.call(Method::GET, "/api/invoices", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rate_limit_rejects_bursts() {
    let app = TestApp::with_rules(BusinessRules {
        rate_limit_per_minute: 2,
        ..BusinessRules::default()
    });

    assert_eq!(app.call(Method::GET, "/health", None, None).await.0, StatusCode::OK);
    assert_eq!(app.call(Method::GET, "/health", None, None).await.0, StatusCode::OK);
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Rate limit exceeded");
}

#[tokio::test]
async fn metrics_count_bookings() {
    let app = TestApp::new();
    let package = app.create_package(json!({ "total_seats": 5 })).await;
    app.book("/api/bookings", &package, &[], json!({})).await;

    let (status, body) = app.call(Method::GET, "/metrics", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap();
    assert!(text.contains("roteiro_bookings_created_total 1"));
    assert!(text.contains("roteiro_http_requests_total"));
}

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, NaiveDate, NaiveTime};
use salon_adapters::MemoryAdapter;
use salon_backend::auth::service::{create_account, hash_password, NewAccount};
use salon_backend::config::AppConfig;
use salon_backend::database::models::{Role, User};
use salon_backend::database::queries::{self, NewServiceType};
use salon_backend::database::Database;
use salon_backend::server::{router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const PASSWORD: &str = "s3cret-pass";

pub struct TestApp {
    pub state: AppState,
    pub mailer: Arc<MemoryAdapter>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "integration-test-secret".into();
        config.auth.password_iterations = 1;
        config.mail.backend = "memory".into();

        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        let mailer = Arc::new(MemoryAdapter::new());
        let state = AppState::new(config, db, mailer.clone()).unwrap();
        let router = router(state.clone());
        Self {
            state,
            mailer,
            router,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub fn create_user(&self, email: &str, first_name: &str, role: Role, is_superuser: bool) -> User {
        let account = NewAccount {
            email: email.to_string(),
            password: PASSWORD.to_string(),
            first_name: first_name.to_string(),
            last_name: "Tester".to_string(),
            phone: None,
            role,
            is_superuser,
        };
        let password_hash = hash_password(PASSWORD, 1).unwrap();
        self.state
            .db
            .with_tx(|tx| create_account(tx, &account, &password_hash))
            .unwrap()
    }

    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .post(
                "/api/auth/login",
                None,
                json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Registers a customer through the API and returns its access token.
    pub async fn customer(&self, email: &str) -> String {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "full_name": "Sita Sharma",
                    "email": email,
                    "password": PASSWORD,
                    "confirm_password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn admin(&self) -> String {
        self.create_user("admin@salon.test", "Asha", Role::Admin, true);
        self.login("admin@salon.test").await
    }

    /// A staff user with the default 09:00-18:00 profile; returns the staff id.
    pub fn staff_member(&self, email: &str) -> i64 {
        let user = self.create_user(email, "Maya", Role::Staff, false);
        self.state
            .db
            .with_conn(|conn| Ok(queries::get_staff_by_user(conn, &user.id)?))
            .unwrap()
            .unwrap()
            .id
    }

    /// One active service with one 60-minute type: `(service_id, type_id)`.
    pub fn service(&self) -> (i64, i64) {
        self.state
            .db
            .with_conn(|conn| {
                let service_id = queries::insert_service(conn, "Hair", None, true)?;
                let type_id = queries::insert_service_type(
                    conn,
                    &NewServiceType {
                        service_id,
                        name: "Haircut".into(),
                        description: None,
                        price_cents: 50_000,
                        duration_minutes: Some(60),
                        is_active: true,
                    },
                )?;
                Ok((service_id, type_id))
            })
            .unwrap()
    }

    pub fn slot(&self, staff_id: i64, date: NaiveDate, start: &str, end: &str) -> i64 {
        let start = NaiveTime::parse_from_str(start, "%H:%M").unwrap();
        let end = NaiveTime::parse_from_str(end, "%H:%M").unwrap();
        self.state
            .db
            .with_conn(|conn| Ok(queries::insert_slot(conn, staff_id, date, start, end)?))
            .unwrap()
            .id
    }

    pub fn tomorrow(&self) -> NaiveDate {
        self.state.today() + Duration::days(1)
    }
}

pub fn booking_body(service_id: i64, type_id: i64, date: NaiveDate, time: &str) -> Value {
    let mut services = serde_json::Map::new();
    services.insert(service_id.to_string(), json!(type_id));
    json!({
        "phone": "9812345678",
        "services": services,
        "appointment_date": date.format("%Y-%m-%d").to_string(),
        "appointment_time": time,
        "notes": "",
    })
}

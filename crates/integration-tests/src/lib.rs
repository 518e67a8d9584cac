//! Integration test support for Decor.
//!
//! Every test runs against [`FakeBackend`], an in-process stand-in for the shop
//! backend that answers canned JSON and records each request it sees. The
//! storefront and admin apps are served on ephemeral ports and pointed at it.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p decor-integration-tests
//! ```

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use decor_api::{API_KEY_HEADER, BackendConfig};
use decor_core::CurrencyCode;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// API key the apps are configured with.
pub const TEST_API_KEY: &str = "test-key-9f3a7c21d4e8b650";

/// One request as the backend received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub api_key: Option<String>,
    pub cookie: Option<String>,
    /// JSON body, or `Null` when the body was empty or not JSON.
    pub body: Value,
}

#[derive(Debug, Clone)]
struct Canned {
    status: StatusCode,
    body: Value,
    set_cookie: Vec<String>,
}

#[derive(Default)]
struct Recorder {
    requests: Vec<RecordedRequest>,
    routes: HashMap<(Method, String), Canned>,
}

/// In-process fake of the shop backend.
///
/// Unregistered routes answer `404 {"success": false, "message": "Not found"}`.
#[derive(Clone)]
pub struct FakeBackend {
    recorder: Arc<Mutex<Recorder>>,
    addr: SocketAddr,
}

impl FakeBackend {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .unwrap_or_else(|e| panic!("failed to bind fake backend: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("fake backend has no address: {e}"));

        let recorder = Arc::new(Mutex::new(Recorder::default()));
        let router = Router::new()
            .fallback(answer)
            .with_state(Arc::clone(&recorder));
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self { recorder, addr }
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Connection settings pointing at this backend.
    #[must_use]
    pub fn config(&self) -> BackendConfig {
        BackendConfig {
            base_url: self.base_url(),
            api_key: SecretString::from(TEST_API_KEY),
            timeout: Duration::from_secs(5),
        }
    }

    /// Answer `method path` with `status` and a JSON body.
    pub fn respond(&self, method: Method, path: &str, status: StatusCode, body: Value) {
        self.register(method, path, Canned {
            status,
            body,
            set_cookie: Vec::new(),
        });
    }

    /// Answer `method path` with `200` and a JSON body.
    pub fn ok(&self, method: Method, path: &str, body: Value) {
        self.respond(method, path, StatusCode::OK, body);
    }

    /// Answer `POST /api/auth/login` with `user` and a session cookie.
    pub fn login_as(&self, user: Value, cookie: &str) {
        self.register(Method::POST, "/api/auth/login", Canned {
            status: StatusCode::OK,
            body: json!({"success": true, "user": user}),
            set_cookie: vec![format!("{cookie}; Path=/; HttpOnly; SameSite=Lax")],
        });
        self.ok(Method::POST, "/api/auth/logout", json!({"success": true}));
    }

    fn register(&self, method: Method, path: &str, canned: Canned) {
        self.lock().routes.insert((method, path.to_string()), canned);
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Requests received for `method path`.
    #[must_use]
    pub fn requests_to(&self, method: &Method, path: &str) -> Vec<RecordedRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == *method && r.path == path)
            .cloned()
            .collect()
    }

    /// The most recent request for `method path`.
    ///
    /// # Panics
    ///
    /// Panics if the backend never saw one.
    #[must_use]
    pub fn last_request(&self, method: &Method, path: &str) -> RecordedRequest {
        self.requests_to(method, path)
            .pop()
            .unwrap_or_else(|| panic!("backend never received {method} {path}"))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorder> {
        self.recorder.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn answer(
    State(recorder): State<Arc<Mutex<Recorder>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_text = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    let request = RecordedRequest {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_owned),
        api_key: header_text(API_KEY_HEADER),
        cookie: header_text(header::COOKIE.as_str()),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };

    let canned = {
        let mut recorder = recorder.lock().unwrap_or_else(PoisonError::into_inner);
        let canned = recorder
            .routes
            .get(&(method, request.path.clone()))
            .cloned();
        recorder.requests.push(request);
        canned
    };

    match canned {
        Some(canned) => {
            let mut response = (canned.status, axum::Json(canned.body)).into_response();
            for cookie in canned.set_cookie {
                if let Ok(value) = cookie.parse() {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
            }
            response
        }
        None => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({"success": false, "message": "Not found"})),
        )
            .into_response(),
    }
}

// =============================================================================
// App servers
// =============================================================================

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .unwrap_or_else(|e| panic!("failed to bind app: {e}"));
    let addr = listener
        .local_addr()
        .unwrap_or_else(|e| panic!("app has no address: {e}"));
    tokio::spawn(async move {
        let _ = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await;
    });
    format!("http://{addr}")
}

/// Start the storefront against `backend` and return its base URL.
///
/// # Panics
///
/// Panics if the app cannot be built or bound.
pub async fn spawn_storefront(backend: &FakeBackend) -> String {
    let config = decor_storefront::config::StorefrontConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost".to_string(),
        backend: backend.config(),
        currency: CurrencyCode::USD,
        log_format: decor_storefront::config::LogFormat::Text,
        sentry_dsn: None,
        sentry_environment: None,
    };
    let state = decor_storefront::state::AppState::new(config)
        .unwrap_or_else(|e| panic!("failed to build storefront state: {e}"));
    serve(decor_storefront::app(state)).await
}

/// Start the admin panel against `backend` and return its base URL.
///
/// # Panics
///
/// Panics if the app cannot be built or bound.
pub async fn spawn_admin(backend: &FakeBackend) -> String {
    let config = decor_admin::config::AdminConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost".to_string(),
        backend: backend.config(),
        currency: CurrencyCode::USD,
        low_stock_threshold: 5,
        log_format: decor_admin::config::LogFormat::Text,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    };
    let state = decor_admin::state::AppState::new(config)
        .unwrap_or_else(|e| panic!("failed to build admin state: {e}"));
    serve(decor_admin::app(state)).await
}

/// Browser-like client: keeps cookies, does not follow redirects.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap_or_else(|e| panic!("failed to build HTTP client: {e}"))
}

// =============================================================================
// Fixtures
// =============================================================================

pub mod fixtures {
    use serde_json::{Value, json};

    #[must_use]
    pub fn customer() -> Value {
        json!({"_id": "u1", "name": "Mina Park", "email": "mina@example.com", "role": "user"})
    }

    #[must_use]
    pub fn admin() -> Value {
        json!({"_id": "a1", "name": "Ops Lead", "email": "ops@example.com", "role": "admin"})
    }

    #[must_use]
    pub fn product(id: &str, name: &str, price: f64, stock: i64) -> Value {
        json!({
            "_id": id,
            "name": name,
            "slug": name.to_lowercase().replace(' ', "-"),
            "price": price,
            "stock": stock,
        })
    }

    #[must_use]
    pub fn cart(lines: &[(&str, Value, u32)]) -> Value {
        let items: Vec<Value> = lines
            .iter()
            .map(|(id, product, quantity)| json!({"_id": id, "product": product, "quantity": quantity}))
            .collect();
        json!({"success": true, "data": {"items": items}})
    }

    #[must_use]
    pub fn address() -> Value {
        json!({
            "fullName": "Mina Park",
            "phone": "555-0100",
            "line1": "12 Elm Street",
            "city": "Portland",
            "state": "OR",
            "postalCode": "97201",
            "country": "US",
        })
    }

    #[must_use]
    pub fn order(id: &str, status: &str, total: f64, created_at: &str) -> Value {
        json!({
            "_id": id,
            "orderNumber": format!("ORD-{id}"),
            "items": [{"name": "Oak Side Table", "quantity": 1, "price": total}],
            "shippingAddress": address(),
            "status": status,
            "total": total,
            "createdAt": created_at,
        })
    }
}

//! Shared fixtures: an in-process fake of the scheduling backend plus
//! recording ports, wired into a real `Application`.
#![allow(dead_code)]

use std::collections::HashSet;
use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Deserialize;
use serde_json::json;

use care_session::auth::{Claims, KeyValueStorage, MemoryStorage};
use care_session::client::{Notifier, Toast};
use care_session::configuration::Settings;
use care_session::navigation::Navigator;
use care_session::startup::Application;

pub const EMAIL: &str = "coordinator@example.com";
pub const PASSWORD: &str = "CorrectHorse1";
const SIGNING_KEY: &[u8] = b"fake-backend-signing-key";

/// Sign a token the way the backend would; the client never sees the key
pub fn sign_token(subject: &str, token_type: &str, lifetime_seconds: i64) -> String {
    encode(
        &Header::default(),
        &Claims::new(subject, token_type, lifetime_seconds),
        &EncodingKey::from_secret(SIGNING_KEY),
    )
    .expect("Failed to sign token")
}

/// What the fake backend saw and how it should behave
#[derive(Default)]
pub struct BackendState {
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub profile_fails: AtomicBool,
    pub logout_fails: AtomicBool,
    valid_access: Mutex<HashSet<String>>,
    valid_refresh: Mutex<HashSet<String>>,
    /// (path, bearer token) for every business request
    requests: Mutex<Vec<(String, Option<String>)>>,
}

impl BackendState {
    /// Issue a token pair the backend will accept
    pub fn issue_pair(&self) -> (String, String) {
        let access = sign_token(EMAIL, "access", 900);
        let refresh = sign_token(EMAIL, "refresh", 86_400);
        self.valid_access.lock().unwrap().insert(access.clone());
        self.valid_refresh.lock().unwrap().insert(refresh.clone());
        (access, refresh)
    }

    /// Refresh token the backend accepts, paired with an access token it
    /// has revoked although the token itself has not expired yet
    pub fn revoked_access_pair(&self) -> (String, String) {
        let (_, refresh) = self.issue_pair();
        (sign_token(EMAIL, "access", 900), refresh)
    }

    /// Refresh token the backend accepts, paired with an expired access token
    pub fn expired_access_pair(&self) -> (String, String) {
        let (_, refresh) = self.issue_pair();
        (sign_token(EMAIL, "access", -1), refresh)
    }

    pub fn requests_to(&self, path: &str) -> Vec<Option<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, token)| token.clone())
            .collect()
    }

    fn record(&self, req: &HttpRequest) -> Option<String> {
        let token = bearer(req);
        self.requests
            .lock()
            .unwrap()
            .push((req.path().to_string(), token.clone()));
        token
    }

    fn accepts(&self, token: &Option<String>) -> bool {
        token
            .as_ref()
            .map_or(false, |t| self.valid_access.lock().unwrap().contains(t))
    }
}

fn bearer(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn not_authenticated() -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({ "detail": "Could not validate credentials" }))
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
    grant_type: String,
}

#[derive(Deserialize)]
struct RefreshBody {
    refresh_token: String,
}

async fn login(form: web::Form<LoginForm>, state: web::Data<BackendState>) -> HttpResponse {
    if form.grant_type != "password" || form.username != EMAIL || form.password != PASSWORD {
        return HttpResponse::Unauthorized().finish();
    }
    let (access, refresh) = state.issue_pair();
    HttpResponse::Ok().json(json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "bearer"
    }))
}

async fn refresh(body: web::Json<RefreshBody>, state: web::Data<BackendState>) -> HttpResponse {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    // Keep the exchange slow enough for concurrent failures to pile up.
    actix_web::rt::time::sleep(Duration::from_millis(150)).await;

    let known = state.valid_refresh.lock().unwrap().remove(&body.refresh_token);
    if !known {
        return HttpResponse::Unauthorized().json(json!({ "detail": "Invalid refresh token" }));
    }
    let (access, refresh) = state.issue_pair();
    HttpResponse::Ok().json(json!({ "access_token": access, "refresh_token": refresh }))
}

async fn logout(state: web::Data<BackendState>) -> HttpResponse {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    if state.logout_fails.load(Ordering::SeqCst) {
        return HttpResponse::InternalServerError().finish();
    }
    HttpResponse::NoContent().finish()
}

async fn me(req: HttpRequest, state: web::Data<BackendState>) -> HttpResponse {
    if state.profile_fails.load(Ordering::SeqCst) {
        return HttpResponse::InternalServerError().finish();
    }
    if !state.accepts(&bearer(&req)) {
        return not_authenticated();
    }
    HttpResponse::Ok().json(json!({
        "id": 7,
        "email": EMAIL,
        "first_name": "Mary",
        "last_name": "Seacole",
        "is_active": true,
        "is_superuser": true
    }))
}

async fn register(body: web::Json<serde_json::Value>) -> HttpResponse {
    if body.get("email").and_then(|e| e.as_str()) == Some("taken@example.com") {
        return HttpResponse::BadRequest().json(json!({ "detail": "Email already registered" }));
    }
    HttpResponse::Created().json(json!({
        "id": 12,
        "email": body["email"],
        "first_name": body["first_name"],
        "last_name": body["last_name"],
        "is_active": false,
        "is_superuser": false,
        "created_at": "2025-11-10T05:42:22.902Z",
        "updated_at": "2025-11-10T05:42:22.902Z",
        "last_login": "2025-11-10T05:42:22.902Z"
    }))
}

async fn resend_verification() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "Verification email sent" }))
}

async fn list_clients(req: HttpRequest, state: web::Data<BackendState>) -> HttpResponse {
    let token = state.record(&req);
    if !state.accepts(&token) {
        return not_authenticated();
    }
    HttpResponse::Ok().json(json!([
        { "id": 1, "name": "Ada Lovelace" },
        { "id": 2, "name": "Alan Turing" }
    ]))
}

async fn create_client(
    req: HttpRequest,
    body: web::Json<serde_json::Value>,
    state: web::Data<BackendState>,
) -> HttpResponse {
    let token = state.record(&req);
    if !state.accepts(&token) {
        return not_authenticated();
    }
    if body.get("name").is_none() {
        return HttpResponse::UnprocessableEntity().json(json!({
            "detail": [
                { "loc": ["body", "name"], "msg": "field required", "type": "value_error.missing" },
                { "loc": ["body", "phone"], "msg": "invalid phone number", "type": "value_error" }
            ]
        }));
    }
    HttpResponse::Created().json(json!({ "id": 3, "name": body["name"] }))
}

async fn reports(req: HttpRequest, state: web::Data<BackendState>) -> HttpResponse {
    state.record(&req);
    HttpResponse::Unauthorized().json(json!({ "detail": "Not allowed to view reports" }))
}

async fn public_notice(req: HttpRequest, state: web::Data<BackendState>) -> HttpResponse {
    state.record(&req);
    HttpResponse::Ok().json(json!({ "notice": "Maintenance on Sunday" }))
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub redirects: Mutex<Vec<(String, Option<String>)>>,
}

impl RecordingNavigator {
    pub fn redirect_count(&self) -> usize {
        self.redirects.lock().unwrap().len()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to_sign_in(&self, sign_in_path: &str, return_to: Option<&str>) {
        self.redirects
            .lock()
            .unwrap()
            .push((sign_in_path.to_string(), return_to.map(str::to_string)));
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub toasts: Mutex<Vec<Toast>>,
}

impl RecordingNotifier {
    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        self.toasts.lock().unwrap().push(toast);
    }
}

pub struct TestApp {
    pub address: String,
    pub backend: web::Data<BackendState>,
    pub storage: Arc<MemoryStorage>,
    pub navigator: Arc<RecordingNavigator>,
    pub notifier: Arc<RecordingNotifier>,
    pub app: Application,
}

fn spawn_backend() -> (String, web::Data<BackendState>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let state = web::Data::new(BackendState::default());

    let server_state = state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(server_state.clone())
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            .route("/auth/logout", web::post().to(logout))
            .route("/auth/me", web::get().to(me))
            .route("/auth/register", web::post().to(register))
            .route("/auth/resend-verification", web::post().to(resend_verification))
            .route("/clients", web::get().to(list_clients))
            .route("/clients", web::post().to(create_client))
            .route("/reports", web::get().to(reports))
            .route("/notices", web::get().to(public_notice))
    })
    .workers(2)
    .listen(listener)
    .expect("Failed to listen")
    .run();
    let _ = tokio::spawn(server);

    (format!("http://127.0.0.1:{}", port), state)
}

/// Start a fake backend and an application over storage prepared by `seed`
pub async fn spawn_app_with(seed: impl FnOnce(&BackendState, &MemoryStorage)) -> TestApp {
    let (address, backend) = spawn_backend();

    let storage = Arc::new(MemoryStorage::new());
    seed(backend.get_ref(), storage.as_ref());

    let navigator = Arc::new(RecordingNavigator::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let settings = Settings::for_backend(address.clone());
    let app = Application::build(
        &settings,
        storage.clone(),
        navigator.clone(),
        notifier.clone(),
    );

    TestApp {
        address,
        backend,
        storage,
        navigator,
        notifier,
        app,
    }
}

/// Application with nothing persisted
pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_, _| {}).await
}

/// Application restored from a persisted token pair
pub async fn spawn_app_with_tokens(
    pair: impl FnOnce(&BackendState) -> (String, String),
) -> TestApp {
    spawn_app_with(|backend, storage| {
        let (access, refresh) = pair(backend);
        storage.set("token", &access).unwrap();
        storage.set("refreshToken", &refresh).unwrap();
    })
    .await
}

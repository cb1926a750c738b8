//! Axum-based mock OpenID provider
//!
//! Each test starts its own server on an ephemeral port so tests can run in
//! parallel without sharing codes or tokens.

use axum::{
    Router,
    extract::{Form, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
    sync::{Arc, Mutex},
};
use tokio::task::JoinHandle;
use url::Url;
use uuid::Uuid;

pub const TEST_CLIENT_ID: &str = "reactjs-base-app";
pub const TEST_USER_SUB: &str = "f3c1a7e2-user";
pub const TEST_USER_NAME: &str = "Test User";
pub const TEST_USER_EMAIL: &str = "test.user@example.com";

/// Authorization request remembered until its code is redeemed
#[derive(Clone, Debug)]
struct AuthorizationRequest {
    client_id: String,
    redirect_uri: String,
    nonce: Option<String>,
    code_challenge: Option<String>,
}

#[derive(Clone)]
pub struct MockIdpState {
    issuer: String,
    codes: Arc<Mutex<HashMap<String, AuthorizationRequest>>>,
    refresh_tokens: Arc<Mutex<HashMap<String, String>>>,
    /// Lifetime of issued access tokens in seconds
    pub expires_in: Arc<AtomicI64>,
    /// When false, token responses carry no refresh token
    pub issue_refresh_tokens: Arc<AtomicBool>,
    pub token_requests: Arc<AtomicUsize>,
}

pub struct MockIdp {
    pub base_url: String,
    pub state: MockIdpState,
    handle: JoinHandle<()>,
}

impl MockIdp {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock IdP listener");
        let addr = listener.local_addr().expect("No local address");
        let base_url = format!("http://{addr}");

        let state = MockIdpState {
            issuer: base_url.clone(),
            codes: Arc::new(Mutex::new(HashMap::new())),
            refresh_tokens: Arc::new(Mutex::new(HashMap::new())),
            expires_in: Arc::new(AtomicI64::new(300)),
            issue_refresh_tokens: Arc::new(AtomicBool::new(true)),
            token_requests: Arc::new(AtomicUsize::new(0)),
        };

        let app = Router::new()
            .route("/.well-known/openid-configuration", get(handle_discovery))
            .route("/authorize", get(handle_authorize))
            .route("/token", post(handle_token))
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock IdP server failed");
        });

        Self {
            base_url,
            state,
            handle,
        }
    }

    pub fn authority(&self) -> Url {
        Url::parse(&self.base_url).expect("Invalid mock IdP URL")
    }

    pub fn token_requests(&self) -> usize {
        self.state.token_requests.load(Ordering::SeqCst)
    }
}

impl Drop for MockIdp {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_discovery(State(state): State<MockIdpState>) -> Json<Value> {
    let issuer = &state.issuer;
    Json(json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{issuer}/authorize"),
        "token_endpoint": format!("{issuer}/token"),
        "userinfo_endpoint": format!("{issuer}/userinfo"),
        "jwks_uri": format!("{issuer}/certs"),
        "end_session_endpoint": format!("{issuer}/logout"),
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "code_challenge_methods_supported": ["S256"]
    }))
}

/// Signs the user in immediately and redirects back with a code.
async fn handle_authorize(
    State(state): State<MockIdpState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(redirect_uri) = params.get("redirect_uri") else {
        return (StatusCode::BAD_REQUEST, "missing redirect_uri").into_response();
    };
    let mut location = match Url::parse(redirect_uri) {
        Ok(url) => url,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid redirect_uri").into_response(),
    };

    let code = Uuid::new_v4().to_string();
    state.codes.lock().unwrap().insert(
        code.clone(),
        AuthorizationRequest {
            client_id: params.get("client_id").cloned().unwrap_or_default(),
            redirect_uri: redirect_uri.clone(),
            nonce: params.get("nonce").cloned(),
            code_challenge: params.get("code_challenge").cloned(),
        },
    );

    {
        let mut query = location.query_pairs_mut();
        query.append_pair("code", &code);
        if let Some(state_param) = params.get("state") {
            query.append_pair("state", state_param);
        }
    }

    (
        StatusCode::FOUND,
        [(header::LOCATION, location.to_string())],
    )
        .into_response()
}

async fn handle_token(
    State(state): State<MockIdpState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.token_requests.fetch_add(1, Ordering::SeqCst);

    match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") => exchange_code(&state, &form),
        Some("refresh_token") => refresh(&state, &form),
        _ => token_error("unsupported_grant_type", "Unknown grant type"),
    }
}

fn exchange_code(state: &MockIdpState, form: &HashMap<String, String>) -> Response {
    let code = form.get("code").cloned().unwrap_or_default();
    let Some(request) = state.codes.lock().unwrap().remove(&code) else {
        return token_error("invalid_grant", "Unknown authorization code");
    };

    if form.get("redirect_uri") != Some(&request.redirect_uri) {
        return token_error("invalid_grant", "redirect_uri mismatch");
    }
    if form.get("client_id") != Some(&request.client_id) {
        return token_error("invalid_client", "client_id mismatch");
    }
    if let Some(challenge) = &request.code_challenge {
        let verifier = form.get("code_verifier").cloned().unwrap_or_default();
        let computed = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        if &computed != challenge {
            return token_error("invalid_grant", "PKCE verification failed");
        }
    }

    let id_token = unsigned_id_token(&json!({
        "iss": state.issuer,
        "aud": request.client_id,
        "sub": TEST_USER_SUB,
        "name": TEST_USER_NAME,
        "email": TEST_USER_EMAIL,
        "nonce": request.nonce,
        "exp": chrono::Utc::now().timestamp() + 3600,
    }));
    issue_tokens(state, Some(id_token))
}

fn refresh(state: &MockIdpState, form: &HashMap<String, String>) -> Response {
    let token = form.get("refresh_token").cloned().unwrap_or_default();
    if state.refresh_tokens.lock().unwrap().remove(&token).is_none() {
        return token_error("invalid_grant", "Token is not active");
    }
    issue_tokens(state, None)
}

fn issue_tokens(state: &MockIdpState, id_token: Option<String>) -> Response {
    let mut body = json!({
        "access_token": format!("access-{}", Uuid::new_v4()),
        "token_type": "Bearer",
        "expires_in": state.expires_in.load(Ordering::SeqCst),
        "scope": "openid profile email",
    });
    if let Some(id_token) = id_token {
        body["id_token"] = json!(id_token);
    }
    if state.issue_refresh_tokens.load(Ordering::SeqCst) {
        let refresh_token = format!("refresh-{}", Uuid::new_v4());
        state
            .refresh_tokens
            .lock()
            .unwrap()
            .insert(refresh_token.clone(), TEST_USER_SUB.to_string());
        body["refresh_token"] = json!(refresh_token);
    }
    Json(body).into_response()
}

fn token_error(error: &str, description: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": error, "error_description": description })),
    )
        .into_response()
}

fn unsigned_id_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

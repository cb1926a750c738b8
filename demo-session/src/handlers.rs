use std::sync::Arc;

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
};

use oidc_session::{
    AuthorizedClient, HttpOidcProvider, RouteDecision, RouteGuard, SessionCoordinator,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) coordinator: Arc<SessionCoordinator<HttpOidcProvider>>,
    pub(crate) guard: RouteGuard,
    pub(crate) api: AuthorizedClient,
}

fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

pub(crate) async fn index(State(state): State<AppState>) -> Html<String> {
    let now = chrono::Utc::now().timestamp();
    match state.coordinator.snapshot().state {
        Some(session) if session.is_valid_at(now) => Html(format!(
            "<h1>Hey {}!</h1>\
             <p>Your session expires in {} seconds.</p>\
             <p><a href=\"/protected\">Protected page</a> | <a href=\"/logout\">Logout</a></p>",
            session.display_name(),
            session.seconds_until_expiry(now)
        )),
        _ => Html(
            "<h1>Welcome</h1><p>Click <a href=\"/login\">Login</a> to sign in.</p>".to_string(),
        ),
    }
}

pub(crate) async fn login(
    State(state): State<AppState>,
) -> Result<Redirect, (StatusCode, String)> {
    let url = state.coordinator.login().await.map_err(internal_error)?;
    Ok(Redirect::to(url.as_str()))
}

pub(crate) async fn logout(
    State(state): State<AppState>,
) -> Result<Redirect, (StatusCode, String)> {
    let url = state.coordinator.logout().await.map_err(internal_error)?;
    Ok(Redirect::to(url.as_str()))
}

/// Shared by the interactive and the silent redirect targets.
pub(crate) async fn signin_callback(
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Redirect, (StatusCode, String)> {
    let provider = state.coordinator.provider();
    let callback_url = provider
        .settings()
        .redirect_uri
        .join(&uri.to_string())
        .map_err(internal_error)?;

    provider
        .signin_callback(&callback_url)
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    state.coordinator.load_user().await.map_err(internal_error)?;

    Ok(Redirect::to("/"))
}

pub(crate) async fn protected(State(state): State<AppState>) -> Response {
    let session = state.coordinator.subscribe();
    match state.guard.check(&session) {
        RouteDecision::Allow => {
            let name = session
                .state()
                .map(|s| s.display_name().to_string())
                .unwrap_or_default();
            Html(format!(
                "<h1>Protected</h1><p>Signed in as {name}.</p><p><a href=\"/\">Home</a></p>"
            ))
            .into_response()
        }
        RouteDecision::Redirect(to) => Redirect::to(&to).into_response(),
    }
}

/// Forwards to the API with the session's bearer token.
pub(crate) async fn products(
    State(state): State<AppState>,
) -> Result<String, (StatusCode, String)> {
    let response = state
        .api
        .get("products")
        .map_err(internal_error)?
        .send()
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;
    tracing::debug!("API responded with {}", status);
    Ok(body)
}

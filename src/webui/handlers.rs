use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, Json},
};
use serde_json::{Value, json};

use super::AppState;
use crate::error::RegistryError;
use crate::store::PermissionLevel;

/// Auth comes first on every endpoint: an unauthorized caller learns nothing
/// about whether the target plugin or command exists.
fn bearer_token(headers: &HeaderMap) -> &str {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .strip_prefix("Bearer ")
        .unwrap_or("")
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"success": false, "message": "unauthorized"})),
    )
}

fn registry_error_response(err: &RegistryError) -> (StatusCode, Json<Value>) {
    let status = match err {
        RegistryError::PluginNotFound(_) | RegistryError::CommandNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        RegistryError::InvalidLevel(_) => StatusCode::BAD_REQUEST,
        // The store surfaces unavailability for a retry decision; it is
        // never downgraded to a default answer.
        RegistryError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (
        status,
        Json(json!({"success": false, "message": err.to_string()})),
    )
}

fn bad_request(message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"success": false, "message": message})),
    )
}

#[derive(serde::Deserialize)]
pub(super) struct LoginBody {
    pub secret_key: String,
}

#[derive(serde::Deserialize)]
pub(super) struct SetPermissionBody {
    pub permission: String,
}

#[derive(serde::Deserialize)]
pub(super) struct SetAliasesBody {
    pub aliases: Vec<String>,
}

#[derive(serde::Deserialize)]
pub(super) struct SetNameBody {
    pub name: String,
}

type JsonBody<T> = Result<Json<T>, axum::extract::rejection::JsonRejection>;

/// GET /admin: minimal UI shell; the API below is the real surface.
pub(super) async fn handle_index() -> Html<&'static str> {
    Html(include_str!("shell.html"))
}

/// POST /admin/api/login: exchange the shared secret for a bearer token.
pub(super) async fn handle_login(
    State(state): State<AppState>,
    body: JsonBody<LoginBody>,
) -> (StatusCode, Json<Value>) {
    let Ok(Json(login)) = body else {
        return bad_request("expected {\"secret_key\": \"...\"}");
    };

    match state.sessions.login(&login.secret_key) {
        Ok(Some(token)) => {
            tracing::info!("admin web UI login succeeded");
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "data": {"token": token},
                    "message": "save this token: use it as Authorization: Bearer <token>"
                })),
            )
        }
        Ok(None) => {
            tracing::warn!("admin web UI login attempt with wrong secret");
            (
                StatusCode::FORBIDDEN,
                Json(json!({"success": false, "message": "login failed, check the secret key"})),
            )
        }
        Err(lockout_secs) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "success": false,
                "message": format!("too many failed attempts, try again in {lockout_secs}s"),
                "retry_after": lockout_secs
            })),
        ),
    }
}

/// POST /admin/api/logout: invalidate the presented token.
pub(super) async fn handle_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let token = bearer_token(&headers);
    if !state.sessions.is_authenticated(token) {
        return unauthorized();
    }
    state.sessions.logout(token);
    (
        StatusCode::OK,
        Json(json!({"success": true, "message": "logged out"})),
    )
}

/// GET /admin/api/plugins
pub(super) async fn handle_plugins(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !state.sessions.is_authenticated(bearer_token(&headers)) {
        return unauthorized();
    }
    let plugins = state.registry.list_plugins();
    (
        StatusCode::OK,
        Json(json!({"success": true, "data": plugins})),
    )
}

/// GET /admin/api/plugin/{name}/commands
pub(super) async fn handle_plugin_commands(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> (StatusCode, Json<Value>) {
    if !state.sessions.is_authenticated(bearer_token(&headers)) {
        return unauthorized();
    }
    match state.registry.list_commands(&name) {
        Ok(statuses) => {
            let (groups, commands): (Vec<_>, Vec<_>) =
                statuses.into_iter().partition(|status| status.is_group);
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "data": {"commands": commands, "groups": groups}
                })),
            )
        }
        Err(err) => registry_error_response(&err),
    }
}

/// POST /admin/api/plugin/{name}/set-permission: the batch primitive.
pub(super) async fn handle_set_plugin_permission(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    body: JsonBody<SetPermissionBody>,
) -> (StatusCode, Json<Value>) {
    if !state.sessions.is_authenticated(bearer_token(&headers)) {
        return unauthorized();
    }
    let Ok(Json(set)) = body else {
        return bad_request("expected {\"permission\": \"admin\"|\"member\"}");
    };
    let level = match set.permission.parse::<PermissionLevel>() {
        Ok(level) => level,
        Err(err) => return registry_error_response(&err),
    };

    match state.registry.set_plugin_level(&name, level) {
        Ok(outcome) => {
            if state.log_changes {
                tracing::info!(
                    plugin = %name,
                    %level,
                    applied = outcome.applied,
                    "batch permission set via web UI"
                );
            }
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": format!(
                        "set {}/{} commands of {name} to {level}",
                        outcome.applied, outcome.total
                    ),
                    "data": outcome
                })),
            )
        }
        Err(err) => registry_error_response(&err),
    }
}

/// POST /admin/api/command/{plugin}/{command}/set-permission
pub(super) async fn handle_set_command_permission(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((plugin, command)): Path<(String, String)>,
    body: JsonBody<SetPermissionBody>,
) -> (StatusCode, Json<Value>) {
    if !state.sessions.is_authenticated(bearer_token(&headers)) {
        return unauthorized();
    }
    let Ok(Json(set)) = body else {
        return bad_request("expected {\"permission\": \"admin\"|\"member\"}");
    };
    let level = match set.permission.parse::<PermissionLevel>() {
        Ok(level) => level,
        Err(err) => return registry_error_response(&err),
    };

    match state.registry.set_command_level(&plugin, &command, level) {
        Ok(()) => {
            if state.log_changes {
                tracing::info!(%plugin, %command, %level, "permission set via web UI");
            }
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": format!("set {plugin}/{command} to {level}")
                })),
            )
        }
        Err(err) => registry_error_response(&err),
    }
}

/// POST /admin/api/command/{plugin}/{command}/set-aliases
pub(super) async fn handle_set_command_aliases(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((plugin, command)): Path<(String, String)>,
    body: JsonBody<SetAliasesBody>,
) -> (StatusCode, Json<Value>) {
    if !state.sessions.is_authenticated(bearer_token(&headers)) {
        return unauthorized();
    }
    let Ok(Json(set)) = body else {
        return bad_request("expected {\"aliases\": [\"...\"]}");
    };

    match state
        .registry
        .set_command_aliases(&plugin, &command, set.aliases.clone())
    {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": if set.aliases.is_empty() {
                    format!("cleared aliases of {plugin}/{command}")
                } else {
                    format!("set aliases of {plugin}/{command}: {}", set.aliases.join(", "))
                }
            })),
        ),
        Err(err) => registry_error_response(&err),
    }
}

/// POST /admin/api/command/{plugin}/{command}/set-name
pub(super) async fn handle_set_command_name(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((plugin, command)): Path<(String, String)>,
    body: JsonBody<SetNameBody>,
) -> (StatusCode, Json<Value>) {
    if !state.sessions.is_authenticated(bearer_token(&headers)) {
        return unauthorized();
    }
    let Ok(Json(set)) = body else {
        return bad_request("expected {\"name\": \"...\"}");
    };
    if set.name.trim().is_empty() {
        return bad_request("new name must not be empty");
    }

    match state.registry.rename_command(&plugin, &command, &set.name) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": format!("renamed {plugin}/{command} to {}", set.name)
            })),
        ),
        Err(err) => registry_error_response(&err),
    }
}

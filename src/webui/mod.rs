//! Admin web UI server.
//!
//! Small axum app exposing the permission registry behind a shared-secret
//! login. The server is started and stopped at runtime (chat `perm webui`
//! commands), so its lifecycle is explicit rather than tied to process
//! startup.

mod handlers;
mod session;

pub use session::SessionGuard;

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::config::WebUiConfig;
use crate::error::WebError;
use crate::registry::PermissionRegistry;

const MAX_BODY_SIZE: usize = 16 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle of the admin web UI server.
///
/// `Stopped -> Starting -> Running -> Stopping -> Stopped`; `start` and
/// `stop` are no-ops when already on the requested side of the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebUiStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for WebUiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            WebUiStatus::Stopped => "stopped",
            WebUiStatus::Starting => "starting",
            WebUiStatus::Running => "running",
            WebUiStatus::Stopping => "stopping",
        };
        f.write_str(text)
    }
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub registry: Arc<PermissionRegistry>,
    pub sessions: Arc<SessionGuard>,
    pub log_changes: bool,
}

pub(crate) fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/admin", get(handlers::handle_index))
        .route("/admin/api/login", post(handlers::handle_login))
        .route("/admin/api/logout", post(handlers::handle_logout))
        .route("/admin/api/plugins", get(handlers::handle_plugins))
        .route(
            "/admin/api/plugin/{name}/commands",
            get(handlers::handle_plugin_commands),
        )
        .route(
            "/admin/api/plugin/{name}/set-permission",
            post(handlers::handle_set_plugin_permission),
        )
        .route(
            "/admin/api/command/{plugin}/{command}/set-permission",
            post(handlers::handle_set_command_permission),
        )
        .route(
            "/admin/api/command/{plugin}/{command}/set-aliases",
            post(handlers::handle_set_command_aliases),
        )
        .route(
            "/admin/api/command/{plugin}/{command}/set-name",
            post(handlers::handle_set_command_name),
        )
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ))
}

struct ServerTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Startable/stoppable wrapper around the admin HTTP server.
pub struct WebUiServer {
    host: String,
    port: u16,
    state: AppState,
    status: Mutex<WebUiStatus>,
    task: Mutex<Option<ServerTask>>,
    bound_port: Mutex<Option<u16>>,
}

impl WebUiServer {
    pub fn new(
        webui: &WebUiConfig,
        registry: Arc<PermissionRegistry>,
        log_changes: bool,
    ) -> Self {
        Self {
            host: webui.host.clone(),
            port: webui.port,
            state: AppState {
                registry,
                sessions: Arc::new(SessionGuard::new(&webui.secret_key)),
                log_changes,
            },
            status: Mutex::new(WebUiStatus::Stopped),
            task: Mutex::new(None),
            bound_port: Mutex::new(None),
        }
    }

    pub fn status(&self) -> WebUiStatus {
        *self
            .status
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Host suitable for printing a clickable URL.
    pub fn display_host(&self) -> &str {
        if self.host.is_empty() || self.host == "0.0.0.0" {
            "127.0.0.1"
        } else {
            &self.host
        }
    }

    /// Port the listener actually bound, once running. Differs from the
    /// configured port only when that port is 0.
    pub fn bound_port(&self) -> Option<u16> {
        *self
            .bound_port
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Bind and serve. Returns the resulting status; a bind failure rolls
    /// the lifecycle back to `Stopped` and surfaces the error.
    pub async fn start(&self) -> Result<WebUiStatus, WebError> {
        {
            let mut status = self
                .status
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            match *status {
                WebUiStatus::Running | WebUiStatus::Starting => return Ok(*status),
                WebUiStatus::Stopped | WebUiStatus::Stopping => {
                    *status = WebUiStatus::Starting;
                }
            }
        }

        let addr = format!("{}:{}", self.host, self.port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(err) => {
                *self
                    .status
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner) = WebUiStatus::Stopped;
                tracing::error!("admin web UI failed to bind {addr}: {err}");
                return Err(WebError::Bind {
                    addr,
                    reason: err.to_string(),
                });
            }
        };
        let port = listener.local_addr().map(|a| a.port()).unwrap_or(self.port);

        // The bind await is a suspension point (hostname resolution goes
        // through a blocking task); a concurrent stop() may have observed
        // `Starting` and completed meanwhile. A completed stop() is terminal
        // for this cycle: drop the listener and leave the state alone.
        {
            let mut status = self
                .status
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if *status != WebUiStatus::Starting {
                return Ok(*status);
            }

            let app = build_router(self.state.clone());
            let (shutdown, mut rx) = watch::channel(false);
            let handle = tokio::spawn(async move {
                let wait = async move {
                    let _ = rx.changed().await;
                };
                if let Err(err) = axum::serve(listener, app).with_graceful_shutdown(wait).await {
                    tracing::error!("admin web UI server error: {err}");
                }
            });

            *self
                .task
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner) =
                Some(ServerTask { shutdown, handle });
            *self
                .bound_port
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(port);
            *status = WebUiStatus::Running;
        }

        tracing::info!(
            "admin web UI listening on http://{}:{}/admin",
            self.display_host(),
            port
        );
        Ok(WebUiStatus::Running)
    }

    /// Graceful shutdown. No-op when not running.
    pub async fn stop(&self) -> WebUiStatus {
        {
            let mut status = self
                .status
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            match *status {
                WebUiStatus::Stopped | WebUiStatus::Stopping => return *status,
                WebUiStatus::Running | WebUiStatus::Starting => {
                    *status = WebUiStatus::Stopping;
                }
            }
        }

        let task = self
            .task
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            let _ = task.shutdown.send(true);
            let _ = task.handle.await;
        }

        *self
            .bound_port
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        *self
            .status
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = WebUiStatus::Stopped;
        tracing::info!("admin web UI stopped");
        WebUiStatus::Stopped
    }
}

use crate::config::ServerConfig;
use crate::platform;
use crate::traits::{CheckProfileRequest, ConnectionRequest, UiAssetProvider, WifiBackend};
use crate::Error;
use axum::{
    Json, Router,
    body::Body,
    extract::{ConnectInfo, Path, Request, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

// The shared state for our web server.
// By using `Arc<dyn Trait>`, we can inject any implementation
// that satisfies the trait bounds.
pub type WebServerState = State<Arc<AppState>>;

pub struct AppState {
    pub backend: Arc<dyn WifiBackend>,
    pub frontend: Arc<dyn UiAssetProvider>,
    /// 捕获门户探测请求被重定向到的地址
    pub portal_url: String,
}

/// Connectivity-check URLs used by Android, iOS/macOS and Windows.
const CAPTIVE_PROBES: [&str; 7] = [
    "/generate_204",
    "/gen_204",
    "/hotspot-detect.html",
    "/library/test/success.html",
    "/ncsi.txt",
    "/connecttest.txt",
    "/redirect",
];

/// Builds the portal router: captive-portal probes, static UI and JSON API.
pub fn router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    let mut app = Router::new()
        .route("/api/wifi/scan", get(api_scan))
        .route("/api/wifi/connect", post(api_connect))
        .route("/api/wifi/check-saved-profile", post(api_check_saved_profile))
        .route("/static/{*path}", get(serve_static_asset));

    for probe in CAPTIVE_PROBES {
        app = app.route(probe, get(handle_captive_portal));
    }

    app.fallback(serve_index)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `config.bind_addr` and serves until `shutdown` resolves.
pub async fn run_server<F>(config: &ServerConfig, state: Arc<AppState>, shutdown: F) -> crate::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("🌐 Web server listening on {}", config.bind_addr);
    serve(listener, router(state, config.request_timeout()), shutdown).await
}

pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> crate::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::WebServer(e.into()))
}

// --- Responses ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckProfileResponse {
    pub is_saved: bool,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub success: bool,
    pub message: String,
}

/// JSON error body: `{"error": ..., "details": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    fn bad_request(error: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    /// Translates a backend error into an HTTP response. `generic` is used
    /// when the command failed for a reason we cannot identify.
    fn from_backend(err: Error, generic: &str) -> Self {
        match err {
            Error::ToolNotFound(_) => Self::new(
                StatusCode::NOT_FOUND,
                "Command not found. Ensure `nmcli` is installed and in the PATH.",
            ),
            Error::PermissionDenied(_) => Self::new(
                StatusCode::FORBIDDEN,
                "Permission denied for command. Check sudoers configuration.",
            ),
            Error::NotAuthorized(_) => Self::new(
                StatusCode::FORBIDDEN,
                "User not authorized to run the command.",
            ),
            Error::UnsupportedPlatform(_) => {
                Self::new(StatusCode::FORBIDDEN, "Endpoint only supports Linux.")
            }
            Error::ConnectionNotActivated(output) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to connect to Wi-Fi network.",
            )
            .with_details(output),
            err @ Error::CommandTimedOut { .. } => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, "Command timed out.").with_details(err.to_string())
            }
            Error::CommandFailed { details, .. } => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, generic).with_details(details)
            }
            other => Self::new(StatusCode::INTERNAL_SERVER_ERROR, generic).with_details(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => serde_json::json!({ "error": self.error, "details": details }),
            None => serde_json::json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

fn os_check() -> ApiResult<()> {
    platform::ensure_supported().map_err(|e| ApiError::from_backend(e, "Unsupported platform."))
}

// --- Route Handlers ---

/// API endpoint to scan for Wi-Fi networks.
async fn api_scan(State(state): WebServerState) -> ApiResult<impl IntoResponse> {
    os_check()?;
    let networks = state.backend.scan().await.map_err(|e| {
        tracing::error!("Scan failed: {}", e);
        ApiError::from_backend(e, "Command execution failed.")
    })?;
    Ok(Json(networks))
}

/// API endpoint to connect to a Wi-Fi network.
async fn api_connect(
    State(state): WebServerState,
    payload: std::result::Result<Json<ConnectionRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    os_check()?;
    let Json(req) = payload.map_err(|_| ApiError::bad_request("Invalid request body."))?;
    if req.ssid.is_empty() {
        return Err(ApiError::bad_request("SSID is required for connection."));
    }

    tracing::debug!(ssid = %req.ssid, "Handling /api/wifi/connect request");
    state.backend.connect(&req).await.map_err(|e| {
        tracing::error!(ssid = %req.ssid, "Connection failed: {}", e);
        ApiError::from_backend(e, "Wrong password, try again")
    })?;

    Ok(Json(ConnectResponse {
        success: true,
        message: format!("Connected to {}", req.ssid),
    }))
}

/// API endpoint to check whether NetworkManager already has a profile for an SSID.
async fn api_check_saved_profile(
    State(state): WebServerState,
    payload: std::result::Result<Json<CheckProfileRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    os_check()?;
    let Json(req) = payload.map_err(|_| ApiError::bad_request("Invalid request body."))?;
    if req.ssid.is_empty() {
        return Err(ApiError::bad_request(
            "SSID is required to check for saved profile.",
        ));
    }

    let is_saved = state
        .backend
        .has_saved_profile(&req.ssid)
        .await
        .map_err(|e| ApiError::from_backend(e, "Command execution failed."))?;
    Ok(Json(CheckProfileResponse { is_saved }))
}

/// 处理捕获门户检测请求（Captive Portal Detection）
///
/// 手机连接热点后会访问这些检测 URL；dnsmasq 把所有域名解析到网关，
/// 这里将请求重定向到门户页面，触发系统弹出登录页。
async fn handle_captive_portal(State(state): WebServerState, req: Request) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    tracing::info!(path = %req.uri().path(), %peer, "Captive portal probe detected");

    (StatusCode::FOUND, [(header::LOCATION, state.portal_url.clone())]).into_response()
}

/// Serves the main `index.html` file for every unmatched path.
async fn serve_index(State(state): WebServerState) -> Response {
    asset_response(&state, "index.html").await
}

/// Serves a static asset (e.g., CSS, JS) from the frontend provider.
async fn serve_static_asset(State(state): WebServerState, Path(path): Path<String>) -> Response {
    asset_response(&state, &path).await
}

async fn asset_response(state: &AppState, path: &str) -> Response {
    match state.frontend.get_asset(path).await {
        Ok((data, mime)) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, mime)], Body::from(data)).into_response()
        }
        Err(e) => {
            tracing::warn!("Failed to get asset: {} (Error: {})", path, e);
            (StatusCode::NOT_FOUND, format!("Asset not found: {}", path)).into_response()
        }
    }
}

use crate::error::AppResult;
use crate::service::SecretService;
use axum::{
    extract::{ConnectInfo, FromRequestParts, Path, State},
    http::{header, request::Parts, HeaderValue},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Create secret request
#[derive(Debug, Deserialize)]
pub struct SecretCreate {
    pub secret: String,
    #[serde(default)]
    pub passphrase: Option<String>,
    /// Lifetime in seconds; values below the minimum are raised to it
    #[serde(default)]
    pub ttl_seconds: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SecretResponse {
    pub secret_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetSecretResponse {
    pub secret: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub status: String,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Caller address from the connection, when the server exposes it.
#[derive(Debug, Clone, Copy)]
pub struct ClientAddr(pub Option<IpAddr>);

impl<S: Send + Sync> FromRequestParts<S> for ClientAddr {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip()),
        ))
    }
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /secret
pub async fn create_secret(
    State(service): State<SecretService>,
    ClientAddr(origin): ClientAddr,
    Json(request): Json<SecretCreate>,
) -> AppResult<Json<SecretResponse>> {
    let SecretCreate {
        secret,
        passphrase,
        ttl_seconds,
    } = request;
    let secret = zeroize::Zeroizing::new(secret);

    let handle = service
        .create(&secret, passphrase, ttl_seconds, origin)
        .await?;
    Ok(Json(SecretResponse {
        secret_key: handle.to_string(),
    }))
}

/// GET /secret/{secret_key}
pub async fn get_secret(
    State(service): State<SecretService>,
    ClientAddr(origin): ClientAddr,
    Path(secret_key): Path<String>,
) -> AppResult<Json<GetSecretResponse>> {
    let mut secret = service.retrieve(&secret_key, origin).await?;
    Ok(Json(GetSecretResponse {
        secret: std::mem::take(&mut *secret),
    }))
}

/// DELETE /secret/{secret_key}
pub async fn delete_secret(
    State(service): State<SecretService>,
    ClientAddr(origin): ClientAddr,
    Path(secret_key): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    service.delete(&secret_key, origin).await?;
    Ok(Json(DeleteResponse {
        status: "secret_deleted".to_string(),
    }))
}

/// Create the main router
pub fn create_router(service: SecretService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/secret", post(create_secret))
        .route("/secret/{secret_key}", get(get_secret).delete(delete_secret))
        .with_state(service)
        // Responses must never be cached by clients or proxies
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("0"),
        ))
        .layer(TraceLayer::new_for_http())
}

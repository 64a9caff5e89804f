use crate::{otp::OtpService, GIT_COMMIT_HASH};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub commit: String,
    pub name: String,
    pub version: String,
    pub pending_records: usize,
    pub tracked_windows: usize,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = Health)
    ),
    tag = "health",
)]
/// Report build information and the size of the in-memory state.
pub async fn health(method: Method, service: Extension<Arc<OtpService>>) -> impl IntoResponse {
    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        pending_records: service.pending_records(),
        tracked_windows: service.tracked_windows(),
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = health.commit.get(..7).unwrap_or_default();

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .map_err(|err| {
            debug!("Failed to parse X-App header: {}", err);
        })
        .unwrap_or_else(|()| HeaderMap::new());

    (StatusCode::OK, headers, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otp::{LogNotifier, OtpConfig};
    use anyhow::Result;
    use axum::body::to_bytes;

    fn service() -> Result<Extension<Arc<OtpService>>> {
        let service = OtpService::new(OtpConfig::new(), Arc::new(LogNotifier))?;
        Ok(Extension(Arc::new(service)))
    }

    #[tokio::test]
    async fn health_get_returns_body_and_header() -> Result<()> {
        let response = health(Method::GET, service()?).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let x_app = response
            .headers()
            .get("X-App")
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string)
            .unwrap_or_default();
        assert!(x_app.starts_with(concat!(env!("CARGO_PKG_NAME"), ":")));

        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let health: Health = serde_json::from_slice(&bytes)?;
        assert_eq!(health.name, env!("CARGO_PKG_NAME"));
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(health.pending_records, 0);
        assert_eq!(health.tracked_windows, 0);
        Ok(())
    }

    #[tokio::test]
    async fn health_options_has_empty_body() -> Result<()> {
        let response = health(Method::OPTIONS, service()?).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        assert!(bytes.is_empty());
        Ok(())
    }
}

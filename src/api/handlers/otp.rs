//! Passcode issuance and verification endpoints.
//!
//! Every verification failure answers the same `400 Invalid OTP` so callers
//! cannot tell a wrong code from an expired one or from an identity that never
//! requested a code.

use axum::{
    extract::Extension,
    http::{header::RETRY_AFTER, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{debug, error, instrument};

use super::types::{OtpResponse, SendOtpRequest, VerifyOtpRequest};
use super::{normalize_identity, valid_identity};
use crate::otp::{OtpError, OtpService, VerifyOutcome};

const INVALID_OTP: &str = "Invalid OTP";

/// Issue a code for a phone number and hand it to the notifier.
#[utoipa::path(
    post,
    path = "/api/send-otp",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "OTP issued", body = OtpResponse),
        (status = 400, description = "Malformed body or invalid phone number", body = OtpResponse),
        (status = 429, description = "Too many codes requested", body = OtpResponse,
            headers(("Retry-After" = u64, description = "Seconds until a new code may be requested"))),
        (status = 500, description = "Code could not be issued", body = OtpResponse)
    ),
    tag = "otp"
)]
#[instrument(skip_all)]
pub async fn send_otp(
    service: Extension<Arc<OtpService>>,
    payload: Option<Json<SendOtpRequest>>,
) -> Response {
    let request: SendOtpRequest = match payload {
        Some(Json(payload)) => payload,
        None => return reply(StatusCode::BAD_REQUEST, OtpResponse::failed("Invalid request")),
    };

    let identity = normalize_identity(&request.number.into_text());
    if !valid_identity(&identity) {
        return reply(
            StatusCode::BAD_REQUEST,
            OtpResponse::failed("Invalid phone number"),
        );
    }

    match service.request_otp(&identity).await {
        Ok(issued) => {
            debug!(
                expires_in = issued.expires_in.as_secs(),
                delivered = issued.delivered,
                "otp issued"
            );
            reply(StatusCode::OK, OtpResponse::ok("OTP sent successfully"))
        }
        Err(OtpError::Validation(message)) => {
            reply(StatusCode::BAD_REQUEST, OtpResponse::failed(&message))
        }
        Err(err) => error_response(&err, "Failed to send OTP"),
    }
}

/// Check a code. A code verifies at most once.
#[utoipa::path(
    post,
    path = "/api/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "OTP verified", body = OtpResponse),
        (status = 400, description = "Invalid, expired or unknown code", body = OtpResponse),
        (status = 429, description = "Too many attempts", body = OtpResponse,
            headers(("Retry-After" = u64, description = "Seconds until verification may be retried"))),
        (status = 500, description = "Code could not be checked", body = OtpResponse)
    ),
    tag = "otp"
)]
#[instrument(skip_all)]
pub async fn verify_otp(
    service: Extension<Arc<OtpService>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> Response {
    let request: VerifyOtpRequest = match payload {
        Some(Json(payload)) => payload,
        None => return reply(StatusCode::BAD_REQUEST, OtpResponse::failed(INVALID_OTP)),
    };

    let identity = normalize_identity(&request.user_number.into_text());
    if !valid_identity(&identity) {
        return reply(StatusCode::BAD_REQUEST, OtpResponse::failed(INVALID_OTP));
    }

    let code = request.gen_otp.into_code(service.config().code_length());

    match service.verify_otp(&identity, &code) {
        Ok(VerifyOutcome::Verified) => {
            reply(StatusCode::OK, OtpResponse::ok("OTP verified successfully"))
        }
        Ok(outcome) => {
            debug!(outcome = outcome.as_str(), "otp rejected");
            reply(StatusCode::BAD_REQUEST, OtpResponse::failed(INVALID_OTP))
        }
        Err(OtpError::Validation(message)) => {
            debug!(%message, "otp rejected");
            reply(StatusCode::BAD_REQUEST, OtpResponse::failed(INVALID_OTP))
        }
        Err(err) => error_response(&err, "Failed to verify OTP"),
    }
}

fn reply(status: StatusCode, body: OtpResponse) -> Response {
    (status, Json(body)).into_response()
}

fn error_response(err: &OtpError, internal_message: &str) -> Response {
    match err.retry_after_seconds() {
        Some(retry_after) => {
            debug!(retry_after, "rate limited");
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(RETRY_AFTER, retry_after.to_string())],
                Json(OtpResponse::rate_limited(retry_after)),
            )
                .into_response()
        }
        None => {
            error!("{internal_message}: {err:#}");
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                OtpResponse::failed(internal_message),
            )
        }
    }
}

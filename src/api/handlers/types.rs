//! Request/response types for the OTP endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A field older clients send as a JSON number and newer ones as a string.
#[derive(Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum TextOrNumber {
    Text(String),
    Number(u64),
}

impl TextOrNumber {
    /// Render the value as text, numbers in plain decimal.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }

    /// Render the value as a code of `width` digits. Numbers lose their
    /// leading zeros in JSON, so they are padded back.
    #[must_use]
    pub fn into_code(self, width: usize) -> String {
        match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Number(number) => format!("{number:0width$}"),
        }
    }
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct SendOtpRequest {
    /// Phone number that receives the code.
    #[serde(alias = "Number")]
    #[schema(value_type = String, example = "+15551234567")]
    pub number: TextOrNumber,
}

#[derive(ToSchema, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    #[serde(alias = "UserNumber")]
    #[schema(value_type = String, example = "+15551234567")]
    pub user_number: TextOrNumber,
    #[serde(alias = "GenOtp")]
    #[schema(value_type = String, example = "042137")]
    pub gen_otp: TextOrNumber,
}

impl std::fmt::Debug for VerifyOtpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifyOtpRequest")
            .field("user_number", &self.user_number)
            .field("gen_otp", &"***")
            .finish()
    }
}

impl std::fmt::Debug for TextOrNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text:?}"),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OtpResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

impl OtpResponse {
    #[must_use]
    pub fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            retry_after_seconds: None,
        }
    }

    #[must_use]
    pub fn failed(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            retry_after_seconds: None,
        }
    }

    #[must_use]
    pub fn rate_limited(retry_after_seconds: u64) -> Self {
        Self {
            success: false,
            message: "rate limited".to_string(),
            retry_after_seconds: Some(retry_after_seconds),
        }
    }
}

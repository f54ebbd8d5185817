// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication request/response shapes and client-side forms.

use crate::error::AppError;
use crate::models::User;
use crate::validation::{is_valid_email, is_valid_password, is_valid_phone_number};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which kind of contact an OTP is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierType {
    Email,
    Phone,
}

impl IdentifierType {
    pub fn as_str(self) -> &'static str {
        match self {
            IdentifierType::Email => "email",
            IdentifierType::Phone => "phone",
        }
    }
}

impl fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contact an OTP is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpIdentifier {
    Email(String),
    Phone { number: String, country_code: String },
}

impl OtpIdentifier {
    pub fn email(address: impl Into<String>) -> Self {
        OtpIdentifier::Email(address.into())
    }

    pub fn phone(number: impl Into<String>, country_code: impl Into<String>) -> Self {
        OtpIdentifier::Phone {
            number: number.into(),
            country_code: country_code.into(),
        }
    }

    pub fn identifier_type(&self) -> IdentifierType {
        match self {
            OtpIdentifier::Email(_) => IdentifierType::Email,
            OtpIdentifier::Phone { .. } => IdentifierType::Phone,
        }
    }

    /// The raw value sent back as `identifier` on verification.
    pub fn value(&self) -> &str {
        match self {
            OtpIdentifier::Email(address) => address,
            OtpIdentifier::Phone { number, .. } => number,
        }
    }

    /// Check the identifier shape locally.
    pub fn validate(&self) -> Result<(), AppError> {
        match self {
            OtpIdentifier::Email(address) if !is_valid_email(address) => Err(
                AppError::InvalidInput("Please enter a valid email".to_string()),
            ),
            OtpIdentifier::Phone { number, .. } if !is_valid_phone_number(number) => Err(
                AppError::InvalidInput("Please enter a valid phone number".to_string()),
            ),
            _ => Ok(()),
        }
    }

    pub(crate) fn to_request(&self) -> SendOtpRequest {
        match self {
            OtpIdentifier::Email(address) => SendOtpRequest {
                email: Some(address.clone()),
                phone_number: None,
                country_code: None,
            },
            OtpIdentifier::Phone {
                number,
                country_code,
            } => SendOtpRequest {
                email: None,
                phone_number: Some(number.clone()),
                country_code: Some(country_code.clone()),
            },
        }
    }
}

/// Body of `POST /auth/send-otp`.
#[derive(Debug, Clone, Serialize)]
pub struct SendOtpRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

/// Body of `POST /auth/verify-otp`.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyOtpRequest {
    pub identifier: String,
    pub otp: String,
    pub identifier_type: IdentifierType,
}

/// Body of `POST /auth/signup`.
#[derive(Clone, Serialize)]
pub struct SignupRequest {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
}

/// `{success, message}` envelope returned by the auth endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Response of `POST /auth/verify-otp`.
#[derive(Debug, Clone, Deserialize)]
pub struct OtpResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<OtpData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtpData {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<User>,
}

/// Signup form as entered by the user, including the confirmation field.
#[derive(Clone, Default)]
pub struct SignupForm {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
    pub confirm_password: String,
}

impl fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupForm")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("phone_number", &self.phone_number)
            .finish_non_exhaustive()
    }
}

impl SignupForm {
    fn is_valid(&self) -> bool {
        !self.full_name.is_empty()
            && !self.email.is_empty()
            && !self.phone_number.is_empty()
            && !self.password.is_empty()
            && self.password == self.confirm_password
            && is_valid_email(&self.email)
            && is_valid_phone_number(&self.phone_number)
            && is_valid_password(&self.password)
    }

    /// Validate the form, reporting the most specific problem found.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.is_valid() {
            return Ok(());
        }
        let message = if self.password != self.confirm_password {
            "Passwords do not match"
        } else if !is_valid_password(&self.password) {
            "Password must be at least 8 characters"
        } else {
            "Please fill in all fields correctly"
        };
        Err(AppError::InvalidInput(message.to_string()))
    }

    pub(crate) fn to_request(&self) -> SignupRequest {
        SignupRequest {
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            phone_number: self.phone_number.clone(),
            password: self.password.clone(),
        }
    }
}

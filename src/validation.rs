// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shape checks for user-supplied identifiers and credentials.
//!
//! All predicates are total: they never fail, only answer yes or no.

use regex::Regex;
use std::sync::LazyLock;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_NOTES_LENGTH: usize = 500;
pub const OTP_CODE_LENGTH: usize = 6;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z0-9a-z._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid email pattern")
});

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{9,15}$").expect("valid phone pattern"));

/// `local-part@domain.tld` with a dotted domain and a TLD of two or more letters.
pub fn is_valid_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

/// 9 to 15 ASCII digits, nothing else.
pub fn is_valid_phone_number(s: &str) -> bool {
    PHONE_RE.is_match(s)
}

/// At least [`MIN_PASSWORD_LENGTH`] characters.
pub fn is_valid_password(s: &str) -> bool {
    s.chars().count() >= MIN_PASSWORD_LENGTH
}

/// Exactly six ASCII digits.
pub fn is_valid_otp_code(s: &str) -> bool {
    s.len() == OTP_CODE_LENGTH && s.bytes().all(|b| b.is_ascii_digit())
}

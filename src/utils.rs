use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::errors::AppError;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 128;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    Argon2::default()
        .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
        .map(|hash| hash.to_string())
        .map_err(|e| {
            log::error!("Failed to hash password: {}", e);
            AppError::PasswordError(e.to_string())
        })
}

/// `Ok(false)` on a mismatch, `Err` only when the stored hash is unreadable.
pub fn verify_password(provided: &str, stored_hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        log::error!("Stored password hash is malformed: {}", e);
        AppError::PasswordError(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(provided.as_bytes(), &parsed)
        .is_ok())
}

pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == 10 && phone.bytes().all(|b| b.is_ascii_digit())
}

pub fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

/// `handle@provider`, e.g. `asha.k@okaxis`.
pub fn is_valid_upi_id(upi: &str) -> bool {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_');
    match upi.split_once('@') {
        Some((handle, provider)) => {
            !handle.is_empty()
                && !provider.is_empty()
                && handle.chars().all(allowed)
                && provider.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

/// Replaces every character outside `[A-Za-z0-9]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Sent on every outbound HTTP request.
pub const USER_AGENT: &str = concat!("swasta-setu/", env!("CARGO_PKG_VERSION"));

/// Largest amount, in paise, a single target or contribution may carry. Also
/// caps what a campaign can collect.
pub const MAX_AMOUNT_PAISE: i64 = 10_000_000_000_000;

/// Parses a rupee amount with at most two decimals into paise. Amounts above
/// `MAX_AMOUNT_PAISE` are rejected.
pub fn parse_rupees(input: &str) -> Option<i64> {
    let input = input.trim();
    let (whole, fraction) = match input.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (input, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if fraction.len() > 2
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let rupees: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let paise: i64 = format!("{fraction:0<2}").parse().ok()?;
    rupees
        .checked_mul(100)?
        .checked_add(paise)
        .filter(|total| *total <= MAX_AMOUNT_PAISE)
}

pub fn format_rupees(paise: i64) -> String {
    let sign = if paise < 0 { "-" } else { "" };
    let paise = paise.unsigned_abs();
    format!("{sign}{}.{:02}", paise / 100, paise % 100)
}

pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

// server/src/services/auth_service.rs

//! Credentials: phone number normalisation and Argon2 password hashing.

use crate::errors::AppError;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use tracing::{debug, error, instrument};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Strips spaces and dashes and checks the result is 6 to 20 digits with an optional leading `+`.
pub fn normalize_phone(raw: &str) -> Result<String, AppError> {
  let compact: String = raw.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
  let digits = compact.strip_prefix('+').unwrap_or(&compact);
  if !(6..=20).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
    return Err(AppError::Validation(
      "Phone must be 6 to 20 digits, optionally starting with '+'.".to_string(),
    ));
  }
  Ok(compact)
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(AppError::Validation(format!(
      "Password must be at least {} characters long.",
      MIN_PASSWORD_LEN
    )));
  }
  Ok(())
}

/// Hashes a plain-text password with a fresh random salt.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|argon_err| {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing process failed: {}", argon_err))
    })
}

/// `Ok(false)` on a wrong password; `Err` only when the stored hash is unusable.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(hashed_password_str: &str, provided_password: &str) -> Result<bool, AppError> {
  if provided_password.is_empty() {
    return Ok(false);
  }
  let parsed_hash = PasswordHash::new(hashed_password_str).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash string.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password verification failed: passwords do not match.");
      Ok(false)
    }
    Err(other_argon_err) => {
      error!(error = %other_argon_err, "Argon2 password verification process encountered an error.");
      Err(AppError::Internal(format!(
        "Password verification process failed: {}",
        other_argon_err
      )))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn phone_numbers_are_normalised() {
    assert_eq!(normalize_phone("+86 138-0013-8000").unwrap(), "+8613800138000");
    assert_eq!(normalize_phone("123456").unwrap(), "123456");
    assert!(normalize_phone("12345").is_err());
    assert!(normalize_phone("++123456").is_err());
    assert!(normalize_phone("12345a789").is_err());
    assert!(normalize_phone(&"1".repeat(21)).is_err());
  }

  #[test]
  fn short_passwords_are_rejected() {
    assert!(validate_password("1234567").is_err());
    assert!(validate_password("12345678").is_ok());
  }

  #[test]
  fn hash_then_verify() {
    let hash = hash_password("correct horse").unwrap();
    assert!(verify_password(&hash, "correct horse").unwrap());
    assert!(!verify_password(&hash, "wrong horse").unwrap());
    assert!(!verify_password(&hash, "").unwrap());
    assert!(verify_password("not-a-hash", "whatever").is_err());
  }
}

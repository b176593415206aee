// server/src/services/session_service.rs

//! Signed session cookies.
//!
//! The cookie value is `base64url(json payload) + "." + hex(hmac_sha256(secret, base64 part))`.
//! Nothing is stored server side; a token is valid until `expires_at`.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::AppError;
use companion_core::domain::Role;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "companion_session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub user_id: Uuid,
  pub role: Role,
  /// Unix seconds.
  pub expires_at: i64,
}

impl Session {
  pub fn issue(user_id: Uuid, role: Role, ttl_hours: i64, now: DateTime<Utc>) -> Self {
    Self {
      user_id,
      role,
      expires_at: (now + Duration::hours(ttl_hours)).timestamp(),
    }
  }

  pub fn is_admin(&self) -> bool {
    self.role.is_admin()
  }

  pub fn require_admin(&self) -> Result<(), AppError> {
    self.require_role(Role::Admin)
  }

  pub fn require_role(&self, role: Role) -> Result<(), AppError> {
    if self.role == role {
      Ok(())
    } else {
      Err(AppError::Forbidden(format!("This action requires the {} role.", role)))
    }
  }

  /// Label written into order notes.
  pub fn actor_label(&self) -> &'static str {
    self.role.as_str()
  }
}

fn mac_for(secret: &[u8]) -> Result<HmacSha256, AppError> {
  HmacSha256::new_from_slice(secret).map_err(|e| AppError::Internal(format!("Invalid session key: {}", e)))
}

pub fn encode(session: &Session, secret: &[u8]) -> Result<String, AppError> {
  let json = serde_json::to_vec(session).map_err(|e| AppError::Internal(format!("Session encoding failed: {}", e)))?;
  let payload = URL_SAFE_NO_PAD.encode(json);
  let mut mac = mac_for(secret)?;
  mac.update(payload.as_bytes());
  let signature = hex::encode(mac.finalize().into_bytes());
  Ok(format!("{}.{}", payload, signature))
}

pub fn decode(token: &str, secret: &[u8], now: DateTime<Utc>) -> Result<Session, AppError> {
  let invalid = || AppError::Auth("Invalid session.".to_string());

  let (payload, signature) = token.split_once('.').ok_or_else(invalid)?;
  let signature = hex::decode(signature).map_err(|_| invalid())?;
  let mut mac = mac_for(secret)?;
  mac.update(payload.as_bytes());
  mac.verify_slice(&signature).map_err(|_| invalid())?;

  let json = URL_SAFE_NO_PAD.decode(payload).map_err(|_| invalid())?;
  let session: Session = serde_json::from_slice(&json).map_err(|_| invalid())?;
  if session.expires_at <= now.timestamp() {
    return Err(AppError::Auth("Session expired, please log in again.".to_string()));
  }
  Ok(session)
}

pub fn session_cookie(token: String, config: &AppConfig) -> Cookie<'static> {
  Cookie::build(SESSION_COOKIE, token)
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .secure(config.cookie_secure)
    .max_age(CookieDuration::hours(config.session_ttl_hours))
    .finish()
}

pub fn removal_cookie(config: &AppConfig) -> Cookie<'static> {
  let mut cookie = Cookie::build(SESSION_COOKIE, "")
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .secure(config.cookie_secure)
    .finish();
  cookie.make_removal();
  cookie
}

#[cfg(test)]
mod tests {
  use super::*;

  const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

  fn sample(now: DateTime<Utc>) -> Session {
    Session::issue(Uuid::new_v4(), Role::Guide, 24, now)
  }

  #[test]
  fn token_round_trips_with_the_same_secret() {
    let now = Utc::now();
    let session = sample(now);
    let token = encode(&session, SECRET).unwrap();
    assert_eq!(decode(&token, SECRET, now).unwrap(), session);
  }

  #[test]
  fn tampered_payload_or_signature_is_rejected() {
    let now = Utc::now();
    let token = encode(&sample(now), SECRET).unwrap();
    let (payload, signature) = token.split_once('.').unwrap();

    let forged = Session {
      role: Role::Admin,
      ..sample(now)
    };
    let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
    let tampered = format!("{}.{}", forged_payload, signature);
    assert!(matches!(decode(&tampered, SECRET, now), Err(AppError::Auth(_))));

    let bad_sig = format!("{}.{}", payload, "00".repeat(32));
    assert!(matches!(decode(&bad_sig, SECRET, now), Err(AppError::Auth(_))));
    assert!(matches!(decode("no-dot-here", SECRET, now), Err(AppError::Auth(_))));
    assert!(matches!(
      decode(&token, b"another-secret-another-secret-xx", now),
      Err(AppError::Auth(_))
    ));
  }

  #[test]
  fn expired_sessions_are_rejected() {
    let issued = Utc::now() - Duration::hours(48);
    let token = encode(&sample(issued), SECRET).unwrap();
    let err = decode(&token, SECRET, Utc::now()).unwrap_err();
    assert!(matches!(err, AppError::Auth(m) if m.contains("expired")));
  }

  #[test]
  fn role_guards() {
    let now = Utc::now();
    let admin = Session::issue(Uuid::new_v4(), Role::Admin, 1, now);
    assert!(admin.require_admin().is_ok());
    let user = Session::issue(Uuid::new_v4(), Role::User, 1, now);
    assert!(matches!(user.require_admin(), Err(AppError::Forbidden(_))));
    assert!(user.require_role(Role::User).is_ok());
  }
}

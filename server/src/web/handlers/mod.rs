// server/src/web/handlers/mod.rs

pub mod admin_handlers;
pub mod application_handlers;
pub mod auth_handlers;
pub mod balance_handlers;
pub mod complaint_handlers;
pub mod favorite_handlers;
pub mod guide_handlers;
pub mod message_handlers;
pub mod order_handlers;
pub mod profile_handlers;

/// Trims an optional free-text field; blank becomes `None`.
pub(crate) fn clean_optional(value: Option<&str>) -> Option<String> {
  value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Trims a required free-text field and checks its length in characters.
pub(crate) fn clean_required(field: &str, value: &str, max_len: usize) -> Result<String, crate::errors::AppError> {
  let value = value.trim();
  let len = value.chars().count();
  if len == 0 || len > max_len {
    return Err(crate::errors::AppError::Validation(format!(
      "{} must be 1 to {} characters.",
      field, max_len
    )));
  }
  Ok(value.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn text_fields_are_trimmed_and_bounded() {
    assert_eq!(clean_optional(Some("  hi ")), Some("hi".to_string()));
    assert_eq!(clean_optional(Some("   ")), None);
    assert_eq!(clean_optional(None), None);

    assert_eq!(clean_required("content", " ok ", 5).unwrap(), "ok");
    assert!(clean_required("content", "   ", 5).is_err());
    assert!(clean_required("content", "toolong", 5).is_err());
    assert!(clean_required("content", "五个汉字啊", 5).is_ok());
  }
}

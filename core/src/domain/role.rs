// core/src/domain/role.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RuleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  User,
  Guide,
  Admin,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::User => "user",
      Role::Guide => "guide",
      Role::Admin => "admin",
    }
  }

  pub fn is_admin(&self) -> bool {
    matches!(self, Role::Admin)
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Role {
  type Err = RuleError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "user" => Ok(Role::User),
      "guide" => Ok(Role::Guide),
      "admin" => Ok(Role::Admin),
      _ => Err(RuleError::UnknownStatus(s.to_string())),
    }
  }
}

impl TryFrom<String> for Role {
  type Error = RuleError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_case_insensitively() {
    assert_eq!("Admin".parse::<Role>(), Ok(Role::Admin));
    assert_eq!(" guide ".parse::<Role>(), Ok(Role::Guide));
    assert!("superuser".parse::<Role>().is_err());
  }
}

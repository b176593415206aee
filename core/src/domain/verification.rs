// core/src/domain/verification.rs

//! Guide verification.
//!
//! An application moves `pending -> under_review / need_more_info -> approved | rejected`.
//! The guide row mirrors the outcome as a [`VerificationStatus`] plus an `is_active`
//! flag. Both are always derived together through [`GuideStanding`]; guides whose
//! stored pair disagrees are reported and repaired with [`GuideStanding::reconciled`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{RuleError, RuleResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
  Pending,
  UnderReview,
  NeedMoreInfo,
  Approved,
  Rejected,
}

impl ApplicationStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      ApplicationStatus::Pending => "pending",
      ApplicationStatus::UnderReview => "under_review",
      ApplicationStatus::NeedMoreInfo => "need_more_info",
      ApplicationStatus::Approved => "approved",
      ApplicationStatus::Rejected => "rejected",
    }
  }

  pub fn is_decided(&self) -> bool {
    matches!(self, ApplicationStatus::Approved | ApplicationStatus::Rejected)
  }

  /// Whether the applicant may submit again (a fresh row or an update of this one).
  pub fn allows_resubmission(&self) -> bool {
    matches!(self, ApplicationStatus::Rejected | ApplicationStatus::NeedMoreInfo)
  }

  pub fn verification_status(&self) -> VerificationStatus {
    match self {
      ApplicationStatus::Approved => VerificationStatus::Verified,
      ApplicationStatus::Rejected => VerificationStatus::Rejected,
      ApplicationStatus::Pending | ApplicationStatus::UnderReview | ApplicationStatus::NeedMoreInfo => {
        VerificationStatus::Pending
      }
    }
  }

  /// Applies an admin review decision.
  pub fn review(self, decision: ReviewDecision) -> RuleResult<ApplicationStatus> {
    if self.is_decided() {
      return Err(RuleError::ApplicationClosed(self.as_str().to_string()));
    }
    Ok(match decision {
      ReviewDecision::UnderReview => ApplicationStatus::UnderReview,
      ReviewDecision::NeedMoreInfo => ApplicationStatus::NeedMoreInfo,
      ReviewDecision::Approve => ApplicationStatus::Approved,
      ReviewDecision::Reject => ApplicationStatus::Rejected,
    })
  }
}

impl fmt::Display for ApplicationStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ApplicationStatus {
  type Err = RuleError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "pending" => Ok(ApplicationStatus::Pending),
      "under_review" | "reviewing" => Ok(ApplicationStatus::UnderReview),
      "need_more_info" => Ok(ApplicationStatus::NeedMoreInfo),
      "approved" => Ok(ApplicationStatus::Approved),
      "rejected" => Ok(ApplicationStatus::Rejected),
      _ => Err(RuleError::UnknownStatus(s.to_string())),
    }
  }
}

impl TryFrom<String> for ApplicationStatus {
  type Error = RuleError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
  UnderReview,
  NeedMoreInfo,
  Approve,
  Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
  Pending,
  Verified,
  Rejected,
  Suspended,
}

impl VerificationStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      VerificationStatus::Pending => "pending",
      VerificationStatus::Verified => "verified",
      VerificationStatus::Rejected => "rejected",
      VerificationStatus::Suspended => "suspended",
    }
  }
}

impl fmt::Display for VerificationStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for VerificationStatus {
  type Err = RuleError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "pending" => Ok(VerificationStatus::Pending),
      "verified" | "approved" => Ok(VerificationStatus::Verified),
      "rejected" => Ok(VerificationStatus::Rejected),
      "suspended" => Ok(VerificationStatus::Suspended),
      _ => Err(RuleError::UnknownStatus(s.to_string())),
    }
  }
}

impl TryFrom<String> for VerificationStatus {
  type Error = RuleError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

/// The pair of guide columns that decide public visibility and bookability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GuideStanding {
  pub verification_status: VerificationStatus,
  pub is_active: bool,
}

impl GuideStanding {
  /// The only constructor used for writes: `is_active` follows the status.
  pub fn from_status(verification_status: VerificationStatus) -> Self {
    Self {
      verification_status,
      is_active: verification_status == VerificationStatus::Verified,
    }
  }

  /// Listed publicly and assignable to orders.
  pub fn is_listable(&self) -> bool {
    self.is_active && self.verification_status == VerificationStatus::Verified
  }

  pub fn is_consistent(&self) -> bool {
    *self == self.reconciled()
  }

  /// The status is trusted over the flag when the two have drifted apart.
  pub fn reconciled(&self) -> Self {
    Self::from_status(self.verification_status)
  }

  pub fn suspend(&self) -> RuleResult<Self> {
    match self.verification_status {
      VerificationStatus::Verified => Ok(Self::from_status(VerificationStatus::Suspended)),
      other => Err(RuleError::InvalidGuideStanding {
        from: other.as_str().to_string(),
        action: "suspended",
      }),
    }
  }

  pub fn reinstate(&self) -> RuleResult<Self> {
    match self.verification_status {
      VerificationStatus::Suspended => Ok(Self::from_status(VerificationStatus::Verified)),
      other => Err(RuleError::InvalidGuideStanding {
        from: other.as_str().to_string(),
        action: "reinstated",
      }),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn application_outcome_maps_onto_guide_status() {
    assert_eq!(ApplicationStatus::Approved.verification_status(), VerificationStatus::Verified);
    assert_eq!(ApplicationStatus::Rejected.verification_status(), VerificationStatus::Rejected);
    assert_eq!(ApplicationStatus::UnderReview.verification_status(), VerificationStatus::Pending);
    assert_eq!(ApplicationStatus::NeedMoreInfo.verification_status(), VerificationStatus::Pending);
  }

  #[test]
  fn decided_applications_cannot_be_reviewed_again() {
    assert_eq!(
      ApplicationStatus::Pending.review(ReviewDecision::Approve),
      Ok(ApplicationStatus::Approved)
    );
    assert_eq!(
      ApplicationStatus::NeedMoreInfo.review(ReviewDecision::Reject),
      Ok(ApplicationStatus::Rejected)
    );
    assert!(ApplicationStatus::Approved.review(ReviewDecision::Reject).is_err());
    assert!(ApplicationStatus::Rejected.review(ReviewDecision::Approve).is_err());
  }

  #[test]
  fn only_active_and_verified_guides_are_listable() {
    assert!(GuideStanding::from_status(VerificationStatus::Verified).is_listable());
    for status in [
      VerificationStatus::Pending,
      VerificationStatus::Rejected,
      VerificationStatus::Suspended,
    ] {
      assert!(!GuideStanding::from_status(status).is_listable());
    }
    let drifted = GuideStanding {
      verification_status: VerificationStatus::Verified,
      is_active: false,
    };
    assert!(!drifted.is_listable());
    let drifted = GuideStanding {
      verification_status: VerificationStatus::Rejected,
      is_active: true,
    };
    assert!(!drifted.is_listable());
  }

  #[test]
  fn reconcile_trusts_the_status() {
    let drifted = GuideStanding {
      verification_status: VerificationStatus::Suspended,
      is_active: true,
    };
    assert!(!drifted.is_consistent());
    let fixed = drifted.reconciled();
    assert!(!fixed.is_active);
    assert!(fixed.is_consistent());
  }

  #[test]
  fn suspend_and_reinstate_round_trip() {
    let verified = GuideStanding::from_status(VerificationStatus::Verified);
    let suspended = verified.suspend().unwrap();
    assert_eq!(suspended.verification_status, VerificationStatus::Suspended);
    assert!(!suspended.is_active);
    assert_eq!(suspended.reinstate().unwrap(), verified);
    assert!(GuideStanding::from_status(VerificationStatus::Pending).suspend().is_err());
  }
}

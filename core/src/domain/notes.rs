// core/src/domain/notes.rs

//! The order's `notes` column is a human-readable log, one line per action.

use chrono::{DateTime, Utc};

pub fn format_note_line(actor: &str, text: &str, at: DateTime<Utc>) -> String {
  format!("[{}] {}: {}", at.format("%Y-%m-%d %H:%M"), actor.trim(), text.trim())
}

/// Appends a line to an existing notes log, which may be empty.
pub fn append_note(existing: Option<&str>, actor: &str, text: &str, at: DateTime<Utc>) -> String {
  let line = format_note_line(actor, text, at);
  match existing.map(str::trim_end).filter(|s| !s.is_empty()) {
    Some(prev) => format!("{prev}\n{line}"),
    None => line,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn appends_timestamped_lines() {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
    let first = append_note(None, "admin", "deposit confirmed", at);
    assert_eq!(first, "[2024-05-01 09:30] admin: deposit confirmed");

    let second = append_note(Some(&format!("{first}\n")), "guide", " final payment 600 ", at);
    assert_eq!(
      second,
      "[2024-05-01 09:30] admin: deposit confirmed\n[2024-05-01 09:30] guide: final payment 600"
    );
  }

  #[test]
  fn blank_existing_notes_are_ignored() {
    let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 0).unwrap();
    assert_eq!(append_note(Some("   "), "user", "created", at), "[2024-01-02 03:04] user: created");
  }
}

//! Identifier generation for runs, jobs and checkpoint entries.

use uuid::Uuid;

/// Generates a random (v4) identifier in hyphenated form.
#[must_use]
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

//! Person entity (assignees and approvers).

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::PersonId;

/// Maximum length of a person's display name.
const MAX_NAME_LEN: usize = 128;

/// A person that can be assigned chores or approve them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
}

/// Validate a person's display name.
///
/// Rules:
/// - Must not be empty.
/// - Must not exceed `MAX_NAME_LEN` characters.
pub fn validate_person_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Configuration(
            "Person name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CoreError::Configuration(format!(
            "Person name must not exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_name() {
        assert!(validate_person_name("Alex").is_ok());
    }

    #[test]
    fn empty_name_rejected() {
        assert!(validate_person_name("").is_err());
        assert!(validate_person_name("   ").is_err());
    }

    #[test]
    fn long_name_rejected() {
        let name = "a".repeat(MAX_NAME_LEN + 1);
        assert!(validate_person_name(&name).is_err());
    }
}

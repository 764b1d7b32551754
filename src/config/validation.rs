//! Settings validation.
//!
//! # Responsibilities
//! - Semantic checks that serde and binding cannot express
//! - Run after binding, before the container is created
//!
//! # Design Decisions
//! - Returns every problem, not just the first
//! - Pure function: `&AppSettings -> Result<(), ValidationErrors>`

use std::fmt;

use crate::config::schema::AppSettings;

/// A single validation problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every problem found in one settings snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", err.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Check a bound settings snapshot.
pub fn validate_settings(settings: &AppSettings) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    if settings.all_sources().is_empty() {
        errors.push(ValidationError {
            field: "sources".into(),
            message: "Sources must not be empty".into(),
        });
    }

    for profile in &settings.additional_profiles {
        if let Some(problem) = profile_problem(profile) {
            errors.push(ValidationError {
                field: "additional-profiles".into(),
                message: format!("Invalid profile '{profile}': {problem}"),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

fn profile_problem(profile: &str) -> Option<&'static str> {
    if profile.trim().is_empty() {
        return Some("must contain text");
    }
    if profile.starts_with('-') || profile.starts_with('_') {
        return Some("must start with a letter or digit");
    }
    if profile.chars().any(|c| c.is_whitespace() || c == ',') {
        return Some("must not contain whitespace or commas");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sources_rejected() {
        let err = validate_settings(&AppSettings::default()).unwrap_err();
        assert_eq!(err.to_string(), "Sources must not be empty");
    }

    #[test]
    fn test_collects_every_problem() {
        let mut settings = AppSettings::default();
        settings.additional_profiles = vec!["ok".into(), "".into(), "a b".into()];

        let err = validate_settings(&settings).unwrap_err();
        assert_eq!(err.0.len(), 3);
        assert_eq!(err.0[1].field, "additional-profiles");
    }

    #[test]
    fn test_valid_settings() {
        let mut settings = AppSettings::default();
        settings.primary_sources = vec!["app.Main".into()];
        settings.additional_profiles = vec!["dev".into()];
        assert!(validate_settings(&settings).is_ok());
    }
}

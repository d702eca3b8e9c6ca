//! Validation helpers for patches and whole issue sets.
//!
//! These routines enforce board data constraints and return structured
//! validation errors without mutating anything.

use std::collections::HashSet;

use crate::error::{BoardError, ValidationError};
use crate::model::Issue;
use crate::query::IssuePatch;

/// Validates the fields a patch would write.
pub struct PatchValidator;

impl PatchValidator {
    /// # Errors
    ///
    /// Returns `Validation`/`ValidationErrors` when the patch would break an issue.
    pub fn validate(patch: &IssuePatch) -> Result<(), BoardError> {
        let mut errors = Vec::new();

        if let Some(ref title) = patch.title {
            validate_title(title, &mut errors);
        }
        if let Some(ref tags) = patch.tags {
            for tag in tags {
                if let Err(err) = TagValidator::validate(tag) {
                    errors.push(err);
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(BoardError::from_validation_errors(errors))
        }
    }
}

/// Validates a single tag value.
pub struct TagValidator;

impl TagValidator {
    /// # Errors
    ///
    /// Returns a `ValidationError` if the tag is empty or too long.
    pub fn validate(tag: &str) -> Result<(), ValidationError> {
        if tag.trim().is_empty() {
            return Err(ValidationError::new("tags", "tag cannot be empty"));
        }
        if tag.len() > 50 {
            return Err(ValidationError::new("tags", "tag exceeds 50 characters"));
        }
        Ok(())
    }
}

/// Validates a full issue set as delivered by the Issue Service.
pub struct CollectionValidator;

impl CollectionValidator {
    /// Every `id` must be unique. Field values are taken as delivered.
    ///
    /// # Errors
    ///
    /// Returns one validation error per repeated id.
    pub fn validate(issues: &[Issue]) -> Result<(), BoardError> {
        let mut errors = Vec::new();
        let mut seen = HashSet::with_capacity(issues.len());

        for issue in issues {
            if !seen.insert(issue.id.as_str()) {
                errors.push(ValidationError::new(
                    "id",
                    format!("duplicate id '{}'", issue.id),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(BoardError::from_validation_errors(errors))
        }
    }
}

fn validate_title(title: &str, errors: &mut Vec<ValidationError>) {
    if title.trim().is_empty() {
        errors.push(ValidationError::new("title", "cannot be empty"));
    }
    if title.len() > 500 {
        errors.push(ValidationError::new("title", "exceeds 500 characters"));
    }
}

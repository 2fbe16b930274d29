//! Native-style constraint validation for forms.
//!
//! Forms marked `needs-validation` are checked locally before submission.
//! A form with any violation is blocked: no network call, the form is
//! flagged `was-validated`, and the user is told what to fix.

use std::collections::HashMap;

use rust_decimal::Decimal;
use thiserror::Error;
use unibites_core::{Email, EmailError};

/// A single native constraint on a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Required,
    MinLength(usize),
    MaxLength(usize),
    Min(Decimal),
    Max(Decimal),
    Email,
}

/// Why a field value was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Problem {
    #[error("is required")]
    Missing,
    #[error("must be at least {0} characters")]
    TooShort(usize),
    #[error("must be at most {0} characters")]
    TooLong(usize),
    #[error("must be a number")]
    NotANumber,
    #[error("must be at least {0}")]
    BelowMin(Decimal),
    #[error("must be at most {0}")]
    AboveMax(Decimal),
    #[error("is not a valid email address ({0})")]
    InvalidEmail(EmailError),
}

/// A rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} {problem}")]
pub struct Violation {
    pub field: String,
    pub problem: Problem,
}

/// One input of a validated form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub constraints: Vec<Constraint>,
}

impl FormField {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraints: Vec::new(),
        }
    }

    /// Add a constraint.
    #[must_use]
    pub fn with(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Check a value against every constraint, returning the first problem.
    ///
    /// Like the browser, an empty optional field passes every other check.
    #[must_use]
    pub fn check(&self, value: &str) -> Option<Problem> {
        if value.is_empty() {
            return self
                .constraints
                .contains(&Constraint::Required)
                .then_some(Problem::Missing);
        }

        let chars = value.chars().count();
        self.constraints.iter().find_map(|constraint| match constraint {
            Constraint::Required => None,
            Constraint::MinLength(min) => (chars < *min).then_some(Problem::TooShort(*min)),
            Constraint::MaxLength(max) => (chars > *max).then_some(Problem::TooLong(*max)),
            Constraint::Min(min) => match value.trim().parse::<Decimal>() {
                Ok(n) if n < *min => Some(Problem::BelowMin(*min)),
                Ok(_) => None,
                Err(_) => Some(Problem::NotANumber),
            },
            Constraint::Max(max) => match value.trim().parse::<Decimal>() {
                Ok(n) if n > *max => Some(Problem::AboveMax(*max)),
                Ok(_) => None,
                Err(_) => Some(Problem::NotANumber),
            },
            Constraint::Email => Email::parse(value).err().map(Problem::InvalidEmail),
        })
    }
}

/// A form with native constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub id: String,
    pub fields: Vec<FormField>,
    /// Set after the first submit attempt so invalid fields are styled.
    pub was_validated: bool,
}

impl Form {
    #[must_use]
    pub fn new(id: impl Into<String>, fields: Vec<FormField>) -> Self {
        Self {
            id: id.into(),
            fields,
            was_validated: false,
        }
    }

    /// Check submitted values; missing entries count as empty.
    #[must_use]
    pub fn check_validity(&self, values: &HashMap<String, String>) -> Vec<Violation> {
        self.fields
            .iter()
            .filter_map(|field| {
                let value = values.get(&field.name).map_or("", String::as_str);
                field.check(value).map(|problem| Violation {
                    field: field.name.clone(),
                    problem,
                })
            })
            .collect()
    }
}

/// Result of a form submit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormSubmission {
    /// Every constraint holds; the browser would submit the form.
    Allowed,
    /// Submission blocked locally.
    Blocked(Vec<Violation>),
    /// No validated form with that id exists on the page.
    UnknownForm,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup() -> Form {
        Form::new(
            "register",
            vec![
                FormField::new("username")
                    .with(Constraint::Required)
                    .with(Constraint::MinLength(3)),
                FormField::new("email")
                    .with(Constraint::Required)
                    .with(Constraint::Email),
                FormField::new("age")
                    .with(Constraint::Min(Decimal::from(16)))
                    .with(Constraint::Max(Decimal::from(120))),
            ],
        )
    }

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_valid_submission() {
        let form = signup();
        let violations =
            form.check_validity(&values(&[("username", "asha"), ("email", "asha@uni.edu")]));
        assert!(violations.is_empty());
    }

    #[test]
    fn test_missing_required_fields() {
        let violations = signup().check_validity(&HashMap::new());
        let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["username", "email"]);
        assert!(violations.iter().all(|v| v.problem == Problem::Missing));
    }

    #[test]
    fn test_constraint_messages() {
        let violations = signup().check_validity(&values(&[
            ("username", "as"),
            ("email", "asha"),
            ("age", "ten"),
        ]));
        assert_eq!(violations.len(), 3);
        assert_eq!(
            violations.first().map(ToString::to_string).as_deref(),
            Some("username must be at least 3 characters")
        );
        assert!(matches!(
            violations.get(1).map(|v| &v.problem),
            Some(Problem::InvalidEmail(_))
        ));
        assert_eq!(violations.get(2).map(|v| &v.problem), Some(&Problem::NotANumber));
    }

    #[test]
    fn test_numeric_bounds() {
        let field = FormField::new("qty")
            .with(Constraint::Min(Decimal::ONE))
            .with(Constraint::Max(Decimal::from(10)));
        assert_eq!(field.check("0"), Some(Problem::BelowMin(Decimal::ONE)));
        assert_eq!(field.check("11"), Some(Problem::AboveMax(Decimal::from(10))));
        assert_eq!(field.check("5"), None);
        assert_eq!(field.check(""), None);
    }
}

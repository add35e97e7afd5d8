//! Feedback records
//!
//! One record per submitted rating; immutable once created.

use chrono::naive::NaiveDateTime;
use uuid::Uuid;

use crate::templates::Template;
use crate::validation::ValidationIssue;

/// Lowest accepted rating
pub const MIN_RATING: i32 = 1;

/// Highest accepted rating
pub const MAX_RATING: i32 = 5;

/// Maximum length of a comment, in characters
pub const MAX_COMMENT_LENGTH: usize = 500;

/// Categories accepted for submissions without a template
///
/// The fixed category set of the first schema version, kept so clients that
/// never send a template ID keep working.
pub const LEGACY_CATEGORIES: [&str; 4] = [
    "service_quality",
    "response_time",
    "problem_resolution",
    "overall_experience",
];

/// A single submitted feedback record
#[derive(Clone, Debug)]
pub struct Feedback {
    /// Feedback ID
    pub id: Uuid,

    /// The ID of the recipient user
    pub user_id: Uuid,

    /// The template the submission form was driven by, if any
    ///
    /// Nulled when the template is deleted; the record itself stays.
    pub template_id: Option<Uuid>,

    /// Star rating, 1 through 5
    pub rating: i32,

    /// Category identifier, scoped by the template
    pub category: String,

    /// Free-form comment
    pub comment: String,

    /// Creation date
    pub created_at: NaiveDateTime,
}

/// Validate a candidate feedback submission
///
/// The category is checked against the active template's category set; when
/// no template is in play the legacy fixed set applies. Returns an issue per
/// offending field, empty when the submission is acceptable.
pub fn validate(
    rating: i32,
    category: &str,
    comment: &str,
    template: Option<&Template>,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        issues.push(ValidationIssue::new(
            "rating",
            format!("Rating must be between {MIN_RATING} and {MAX_RATING}"),
        ));
    }

    let known_category = match template {
        Some(template) => template.has_category(category),
        None => LEGACY_CATEGORIES.contains(&category),
    };

    if !known_category {
        issues.push(ValidationIssue::new(
            "category",
            format!(r#"Unknown category "{category}""#),
        ));
    }

    if comment.trim().is_empty() {
        issues.push(ValidationIssue::new("comment", "Comment can not be empty"));
    } else if comment.chars().count() > MAX_COMMENT_LENGTH {
        issues.push(ValidationIssue::new(
            "comment",
            format!("Comment can not be longer than {MAX_COMMENT_LENGTH} characters"),
        ));
    }

    issues
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::templates::Category;

    use super::*;

    fn template_with(ids: &[&str]) -> Template {
        Template {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Template".to_string(),
            description: None,
            categories: ids
                .iter()
                .map(|id| Category {
                    id: (*id).to_string(),
                    label: (*id).to_string(),
                })
                .collect(),
            is_default: false,
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_validate_accepts_valid_submission() {
        let template = template_with(&["speed"]);

        assert!(validate(5, "speed", "Great!", Some(&template)).is_empty());
        assert!(validate(1, "service_quality", "Not great.", None).is_empty());
    }

    #[test]
    fn test_validate_rating_bounds() {
        let template = template_with(&["speed"]);

        for rating in [0, 6, -1, 42] {
            let issues = validate(rating, "speed", "Fine", Some(&template));
            assert_eq!(1, issues.len());
            assert_eq!("rating", issues[0].field);
        }

        for rating in MIN_RATING..=MAX_RATING {
            assert!(validate(rating, "speed", "Fine", Some(&template)).is_empty());
        }
    }

    #[test]
    fn test_validate_category_scoped_by_template() {
        let template = template_with(&["speed", "taste"]);

        let issues = validate(4, "service_quality", "Fine", Some(&template));
        assert_eq!(1, issues.len());
        assert_eq!("category", issues[0].field);
    }

    #[test]
    fn test_validate_legacy_categories_without_template() {
        for category in LEGACY_CATEGORIES {
            assert!(validate(4, category, "Fine", None).is_empty());
        }

        let issues = validate(4, "speed", "Fine", None);
        assert_eq!(1, issues.len());
        assert_eq!("category", issues[0].field);
    }

    #[test]
    fn test_validate_comment_bounds() {
        let template = template_with(&["speed"]);

        let issues = validate(4, "speed", "", Some(&template));
        assert_eq!(1, issues.len());
        assert_eq!("comment", issues[0].field);

        // whitespace only counts as empty
        let issues = validate(4, "speed", "  \t ", Some(&template));
        assert_eq!(1, issues.len());
        assert_eq!("comment", issues[0].field);

        let exactly_max = "x".repeat(MAX_COMMENT_LENGTH);
        assert!(validate(4, "speed", &exactly_max, Some(&template)).is_empty());

        let one_over = "x".repeat(MAX_COMMENT_LENGTH + 1);
        let issues = validate(4, "speed", &one_over, Some(&template));
        assert_eq!(1, issues.len());
        assert_eq!("comment", issues[0].field);
    }

    #[test]
    fn test_validate_collects_multiple_issues() {
        let issues = validate(0, "bogus", "", None);

        let fields = issues
            .iter()
            .map(|issue| issue.field.as_str())
            .collect::<Vec<&str>>();
        assert_eq!(vec!["rating", "category", "comment"], fields);
    }
}

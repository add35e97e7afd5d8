//! Submission form state machine
//!
//! The stateful counterpart of the public feedback form: driven by the
//! recipient's templates, guarded at every transition, and emitting exactly
//! one validated [`FeedbackDraft`] on submit. The form never persists
//! anything itself; the same rules are enforced again at the server boundary
//! by [`crate::feedback::validate`].

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::feedback::LEGACY_CATEGORIES;
use crate::feedback::MAX_COMMENT_LENGTH;
use crate::feedback::MAX_RATING;
use crate::feedback::MIN_RATING;
use crate::templates::Template;

/// The states a submission form moves through
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FormState {
    /// Picking one of multiple templates; skipped with one or none
    SelectingTemplate,

    /// Picking a star rating
    Rating,

    /// Picking a category of the active template
    Categorizing,

    /// Writing the comment
    Commenting,

    /// Terminal; only [`SubmissionForm::reset`] leaves this state
    Submitted,
}

/// A rejected transition or submission
#[derive(Debug, Error, Eq, PartialEq)]
pub enum FormError {
    /// The chosen template is not on this form
    #[error("template is not available on this form")]
    UnknownTemplate,

    /// Rating outside the accepted range
    #[error("rating must be between {MIN_RATING} and {MAX_RATING}")]
    RatingOutOfRange,

    /// Category transitions need a rating first
    #[error("a rating must be set first")]
    MissingRating,

    /// The chosen category is not part of the active template
    #[error("category is not part of the active template")]
    UnknownCategory,

    /// Submitting without a chosen category
    #[error("a category must be chosen first")]
    MissingCategory,

    /// Submitting with an empty (after trimming) comment
    #[error("comment can not be empty")]
    EmptyComment,

    /// Submitting with a comment over the limit
    #[error("comment can not be longer than {MAX_COMMENT_LENGTH} characters")]
    CommentTooLong,

    /// Any mutation after submit, short of a reset
    #[error("form has already been submitted")]
    AlreadySubmitted,
}

/// The candidate feedback record a form emits on submit
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackDraft {
    /// Star rating, 1 through 5
    pub rating: i32,

    /// Chosen category identifier
    pub category: String,

    /// The comment as typed
    pub comment: String,

    /// The template that drove the form, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<Uuid>,
}

/// A stateful submission form for one recipient's templates
#[derive(Clone, Debug)]
pub struct SubmissionForm {
    /// The recipient's templates, in received order
    templates: Vec<Template>,

    /// Current state
    state: FormState,

    /// The active template
    selected: Option<Uuid>,

    /// Chosen rating
    rating: Option<i32>,

    /// Chosen category
    category: Option<String>,

    /// Comment as typed so far
    comment: String,
}

impl SubmissionForm {
    /// Create a form for the templates of one recipient
    ///
    /// Pre-selects the template flagged as default, or the first one in
    /// received order. Template selection is only part of the flow when
    /// there is more than one template to choose from.
    pub fn new(templates: Vec<Template>) -> Self {
        let state = if templates.len() > 1 {
            FormState::SelectingTemplate
        } else {
            FormState::Rating
        };

        let selected = preferred_template(&templates);

        Self {
            templates,
            state,
            selected,
            rating: None,
            category: None,
            comment: String::new(),
        }
    }

    /// Current state of the form
    pub fn state(&self) -> FormState {
        self.state
    }

    /// The template currently driving the form
    pub fn active_template(&self) -> Option<&Template> {
        self.selected
            .and_then(|id| self.templates.iter().find(|template| template.id == id))
    }

    /// Select a template from the form's list
    ///
    /// Resets any chosen category; categories are template-scoped and a
    /// category of a previous template is invalid for the new one.
    pub fn select_template(&mut self, template_id: Uuid) -> Result<(), FormError> {
        self.guard_not_submitted()?;

        if !self
            .templates
            .iter()
            .any(|template| template.id == template_id)
        {
            return Err(FormError::UnknownTemplate);
        }

        self.selected = Some(template_id);
        self.category = None;

        self.state = if self.rating.is_some() {
            FormState::Categorizing
        } else {
            FormState::Rating
        };

        Ok(())
    }

    /// Set the star rating
    pub fn set_rating(&mut self, rating: i32) -> Result<(), FormError> {
        self.guard_not_submitted()?;

        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(FormError::RatingOutOfRange);
        }

        self.rating = Some(rating);

        if matches!(self.state, FormState::SelectingTemplate | FormState::Rating) {
            self.state = FormState::Categorizing;
        }

        Ok(())
    }

    /// Choose a category of the active template
    pub fn choose_category(&mut self, category_id: &str) -> Result<(), FormError> {
        self.guard_not_submitted()?;

        if self.rating.is_none() {
            return Err(FormError::MissingRating);
        }

        let known = match self.active_template() {
            Some(template) => template.has_category(category_id),
            None => LEGACY_CATEGORIES.contains(&category_id),
        };

        if !known {
            return Err(FormError::UnknownCategory);
        }

        self.category = Some(category_id.to_string());
        self.state = FormState::Commenting;

        Ok(())
    }

    /// Update the comment text
    pub fn set_comment(&mut self, comment: &str) -> Result<(), FormError> {
        self.guard_not_submitted()?;

        self.comment = comment.to_string();

        Ok(())
    }

    /// Submit the form
    ///
    /// Accepted only when a rating is set, a category of the active template
    /// is chosen and the comment is non-empty after trimming and within the
    /// length limit. Emits the candidate record and moves the form to its
    /// terminal state; the caller persists the draft and eventually calls
    /// [`SubmissionForm::reset`] for a follow-up submission.
    pub fn submit(&mut self) -> Result<FeedbackDraft, FormError> {
        self.guard_not_submitted()?;

        let Some(rating) = self.rating else {
            return Err(FormError::MissingRating);
        };

        let Some(category) = self.category.clone() else {
            return Err(FormError::MissingCategory);
        };

        if self.comment.trim().is_empty() {
            return Err(FormError::EmptyComment);
        }

        if self.comment.chars().count() > MAX_COMMENT_LENGTH {
            return Err(FormError::CommentTooLong);
        }

        self.state = FormState::Submitted;

        Ok(FeedbackDraft {
            rating,
            category,
            comment: self.comment.clone(),
            template_id: self.selected,
        })
    }

    /// Return the form to its pristine state for a second submission
    pub fn reset(&mut self) {
        self.state = if self.templates.len() > 1 {
            FormState::SelectingTemplate
        } else {
            FormState::Rating
        };
        self.selected = preferred_template(&self.templates);
        self.rating = None;
        self.category = None;
        self.comment.clear();
    }

    /// Submitted forms only accept a reset
    fn guard_not_submitted(&self) -> Result<(), FormError> {
        if self.state == FormState::Submitted {
            return Err(FormError::AlreadySubmitted);
        }

        Ok(())
    }
}

/// The default template selection policy
///
/// Prefer the template flagged as default, fall back to the first one in
/// received list order.
fn preferred_template(templates: &[Template]) -> Option<Uuid> {
    templates
        .iter()
        .find(|template| template.is_default)
        .or_else(|| templates.first())
        .map(|template| template.id)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::templates::Category;

    use super::*;

    fn template(name: &str, is_default: bool, category_ids: &[&str]) -> Template {
        Template {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            categories: category_ids
                .iter()
                .map(|id| Category {
                    id: (*id).to_string(),
                    label: (*id).to_string(),
                })
                .collect(),
            is_default,
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        }
    }

    fn filled_form() -> SubmissionForm {
        let mut form = SubmissionForm::new(vec![template("Service", false, &["speed"])]);

        form.set_rating(5).unwrap();
        form.choose_category("speed").unwrap();
        form.set_comment("Great!").unwrap();

        form
    }

    #[test]
    fn test_default_template_preselected_regardless_of_order() {
        let plain = template("Plain", false, &["speed"]);
        let preferred = template("Preferred", true, &["taste"]);

        let form = SubmissionForm::new(vec![plain.clone(), preferred.clone()]);
        assert_eq!(preferred.id, form.active_template().unwrap().id);

        let form = SubmissionForm::new(vec![preferred.clone(), plain.clone()]);
        assert_eq!(preferred.id, form.active_template().unwrap().id);
    }

    #[test]
    fn test_first_template_wins_without_default_flag() {
        let first = template("First", false, &["speed"]);
        let second = template("Second", false, &["taste"]);

        let form = SubmissionForm::new(vec![first.clone(), second]);

        assert_eq!(first.id, form.active_template().unwrap().id);
    }

    #[test]
    fn test_template_selection_only_with_multiple_templates() {
        let form = SubmissionForm::new(vec![template("Only", false, &["speed"])]);
        assert_eq!(FormState::Rating, form.state());

        let form = SubmissionForm::new(vec![
            template("One", false, &["speed"]),
            template("Two", false, &["taste"]),
        ]);
        assert_eq!(FormState::SelectingTemplate, form.state());

        let form = SubmissionForm::new(Vec::new());
        assert_eq!(FormState::Rating, form.state());
        assert!(form.active_template().is_none());
    }

    #[test]
    fn test_switching_template_resets_category() {
        let one = template("One", false, &["speed"]);
        let two = template("Two", false, &["taste"]);

        let mut form = SubmissionForm::new(vec![one.clone(), two.clone()]);

        form.select_template(one.id).unwrap();
        form.set_rating(4).unwrap();
        form.choose_category("speed").unwrap();
        assert_eq!(FormState::Commenting, form.state());

        // "speed" is not valid for the new template
        form.select_template(two.id).unwrap();
        assert_eq!(FormState::Categorizing, form.state());
        assert_eq!(FormError::UnknownCategory, form.choose_category("speed").unwrap_err());
        form.choose_category("taste").unwrap();
    }

    #[test]
    fn test_unknown_template_rejected() {
        let mut form = SubmissionForm::new(vec![template("Only", false, &["speed"])]);

        assert_eq!(
            FormError::UnknownTemplate,
            form.select_template(Uuid::new_v4()).unwrap_err()
        );
    }

    #[test]
    fn test_rating_guard() {
        let mut form = SubmissionForm::new(vec![template("Only", false, &["speed"])]);

        assert_eq!(FormError::RatingOutOfRange, form.set_rating(0).unwrap_err());
        assert_eq!(FormError::RatingOutOfRange, form.set_rating(6).unwrap_err());

        form.set_rating(3).unwrap();
        assert_eq!(FormState::Categorizing, form.state());
    }

    #[test]
    fn test_category_requires_rating() {
        let mut form = SubmissionForm::new(vec![template("Only", false, &["speed"])]);

        assert_eq!(
            FormError::MissingRating,
            form.choose_category("speed").unwrap_err()
        );
    }

    #[test]
    fn test_submit_emits_draft() {
        let single = template("Only", false, &["speed"]);
        let mut form = SubmissionForm::new(vec![single.clone()]);

        form.set_rating(5).unwrap();
        form.choose_category("speed").unwrap();
        form.set_comment("Great!").unwrap();

        let draft = form.submit().unwrap();

        assert_eq!(5, draft.rating);
        assert_eq!("speed", draft.category);
        assert_eq!("Great!", draft.comment);
        assert_eq!(Some(single.id), draft.template_id);
        assert_eq!(FormState::Submitted, form.state());
    }

    #[test]
    fn test_submit_guards() {
        let mut form = SubmissionForm::new(vec![template("Only", false, &["speed"])]);

        assert_eq!(FormError::MissingRating, form.submit().unwrap_err());

        form.set_rating(4).unwrap();
        assert_eq!(FormError::MissingCategory, form.submit().unwrap_err());

        form.choose_category("speed").unwrap();
        assert_eq!(FormError::EmptyComment, form.submit().unwrap_err());

        form.set_comment("   ").unwrap();
        assert_eq!(FormError::EmptyComment, form.submit().unwrap_err());

        form.set_comment(&"x".repeat(MAX_COMMENT_LENGTH + 1)).unwrap();
        assert_eq!(FormError::CommentTooLong, form.submit().unwrap_err());

        form.set_comment(&"x".repeat(MAX_COMMENT_LENGTH)).unwrap();
        assert!(form.submit().is_ok());
    }

    #[test]
    fn test_submitted_is_terminal_until_reset() {
        let mut form = filled_form();
        form.submit().unwrap();

        assert_eq!(FormError::AlreadySubmitted, form.set_rating(3).unwrap_err());
        assert_eq!(
            FormError::AlreadySubmitted,
            form.choose_category("speed").unwrap_err()
        );
        assert_eq!(FormError::AlreadySubmitted, form.set_comment("x").unwrap_err());
        assert_eq!(FormError::AlreadySubmitted, form.submit().unwrap_err());

        form.reset();
        assert_eq!(FormState::Rating, form.state());

        // a full second pass works
        form.set_rating(2).unwrap();
        form.choose_category("speed").unwrap();
        form.set_comment("Slower today").unwrap();
        assert!(form.submit().is_ok());
    }

    #[test]
    fn test_accepted_draft_passes_server_validation() {
        let single = template("Only", false, &["speed"]);
        let mut form = SubmissionForm::new(vec![single.clone()]);

        form.set_rating(5).unwrap();
        form.choose_category("speed").unwrap();
        form.set_comment("Great!").unwrap();

        let draft = form.submit().unwrap();

        let issues =
            crate::feedback::validate(draft.rating, &draft.category, &draft.comment, Some(&single));
        assert!(issues.is_empty());
    }

    #[test]
    fn test_legacy_categories_without_templates() {
        let mut form = SubmissionForm::new(Vec::new());

        form.set_rating(4).unwrap();
        assert_eq!(
            FormError::UnknownCategory,
            form.choose_category("speed").unwrap_err()
        );
        form.choose_category("service_quality").unwrap();
        form.set_comment("Fine").unwrap();

        let draft = form.submit().unwrap();
        assert_eq!(None, draft.template_id);
    }
}

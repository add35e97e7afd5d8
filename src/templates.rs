//! Feedback templates
//!
//! A template is a named, ordered set of rating categories a submission form
//! presents. Templates are owned by exactly one user.

use chrono::naive::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::storage::CreateTemplateValues;
use crate::storage::Result;
use crate::storage::Storage;
use crate::users::User;
use crate::validation::ValidationIssue;

/// Maximum length of a template name
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum number of categories on a single template
pub const MAX_CATEGORIES: usize = 10;

/// A single rating category of a template
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Category {
    /// Identifier of the category, unique within its template
    pub id: String,

    /// Human readable label
    pub label: String,
}

/// A feedback template
#[derive(Clone, Debug)]
pub struct Template {
    /// Template ID
    pub id: Uuid,

    /// The ID of the owning user
    pub user_id: Uuid,

    /// Template name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Ordered list of rating categories
    pub categories: Vec<Category>,

    /// Is this the template a submission form pre-selects?
    ///
    /// At most one template per user carries this flag.
    pub is_default: bool,

    /// Creation date
    pub created_at: NaiveDateTime,

    /// Last updated at
    pub updated_at: NaiveDateTime,
}

impl Template {
    /// Does the template contain a category with the given ID?
    pub fn has_category(&self, category_id: &str) -> bool {
        self.categories
            .iter()
            .any(|category| category.id == category_id)
    }
}

/// Validate the name/description/categories of a template payload
///
/// Returns an issue per offending field, empty when the payload is valid.
pub fn validate(
    name: &str,
    description: Option<&str>,
    categories: &[Category],
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let name = name.trim();
    if name.is_empty() {
        issues.push(ValidationIssue::new("name", "Name can not be empty"));
    } else if name.chars().count() > MAX_NAME_LENGTH {
        issues.push(ValidationIssue::new(
            "name",
            format!("Name can not be longer than {MAX_NAME_LENGTH} characters"),
        ));
    }

    if let Some(description) = description {
        if description.trim().is_empty() {
            issues.push(ValidationIssue::new(
                "description",
                "Description can not be empty when provided",
            ));
        }
    }

    if categories.is_empty() {
        issues.push(ValidationIssue::new(
            "categories",
            "A template needs at least one category",
        ));
    } else if categories.len() > MAX_CATEGORIES {
        issues.push(ValidationIssue::new(
            "categories",
            format!("A template can hold at most {MAX_CATEGORIES} categories"),
        ));
    }

    for (index, category) in categories.iter().enumerate() {
        if category.id.trim().is_empty() {
            issues.push(ValidationIssue::new(
                format!("categories[{index}].id"),
                "Category ID can not be empty",
            ));
        }

        if category.label.trim().is_empty() {
            issues.push(ValidationIssue::new(
                format!("categories[{index}].label"),
                "Category label can not be empty",
            ));
        }

        if categories[..index]
            .iter()
            .any(|earlier| earlier.id == category.id)
        {
            issues.push(ValidationIssue::new(
                format!("categories[{index}].id"),
                format!(r#"Duplicate category ID "{}""#, category.id),
            ));
        }
    }

    issues
}

/// A starter template seeded for new accounts
struct StarterTemplate {
    /// Template name
    name: &'static str,

    /// Template description
    description: &'static str,

    /// Categories as (id, label) pairs
    categories: &'static [(&'static str, &'static str)],

    /// Pre-selected template of the set
    is_default: bool,
}

/// The starter templates every new account begins with
const STARTER_TEMPLATES: [StarterTemplate; 4] = [
    StarterTemplate {
        name: "Customer Service",
        description: "Collect feedback about customer service quality",
        categories: &[
            ("service_quality", "Service Quality"),
            ("response_time", "Response Time"),
            ("problem_resolution", "Problem Resolution"),
            ("overall_experience", "Overall Experience"),
        ],
        is_default: true,
    },
    StarterTemplate {
        name: "Product Feedback",
        description: "Gather insights about product quality and features",
        categories: &[
            ("product_quality", "Product Quality"),
            ("features", "Features"),
            ("usability", "Usability"),
            ("value_for_money", "Value for Money"),
        ],
        is_default: false,
    },
    StarterTemplate {
        name: "Restaurant Experience",
        description: "Capture dining experience feedback",
        categories: &[
            ("food_quality", "Food Quality"),
            ("service", "Service"),
            ("ambiance", "Ambiance"),
            ("value", "Value"),
        ],
        is_default: false,
    },
    StarterTemplate {
        name: "Event Feedback",
        description: "Collect feedback about events and experiences",
        categories: &[
            ("organization", "Organization"),
            ("content_quality", "Content Quality"),
            ("venue", "Venue"),
            ("overall_satisfaction", "Overall Satisfaction"),
        ],
        is_default: false,
    },
];

/// Seed the starter templates for a user without any templates
///
/// Users with existing templates are left alone.
pub async fn ensure_default_templates<S: Storage>(storage: &S, user: &User) -> Result<()> {
    let existing = storage.find_all_templates_by_user(user).await?;

    if !existing.is_empty() {
        return Ok(());
    }

    for starter in &STARTER_TEMPLATES {
        let categories = starter
            .categories
            .iter()
            .map(|(id, label)| Category {
                id: (*id).to_string(),
                label: (*label).to_string(),
            })
            .collect::<Vec<Category>>();

        let values = CreateTemplateValues {
            user,
            name: starter.name,
            description: Some(starter.description),
            categories: &categories,
            is_default: starter.is_default,
        };

        storage.create_template(&values).await?;
    }

    Ok(())
}

//! Memory storage
//!
//! Will be destroyed on system shutdown

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::feedback::Feedback;
use crate::sessions::Session;
use crate::templates::Template;
use crate::users::User;

use super::CreateFeedbackValues;
use super::CreateSessionValues;
use super::CreateTemplateValues;
use super::Result;
use super::Storage;
use super::UpdateTemplateValues;
use super::UpsertUserValues;

/// An in-memory storage
///
/// Will be destroyed on system shutdown
#[derive(Clone, Debug)]
pub struct Memory {
    /// All users in storage
    users: Arc<Mutex<HashMap<Uuid, User>>>,

    /// All sessions in storage
    sessions: Arc<Mutex<HashMap<Uuid, Session>>>,

    /// All templates in storage
    templates: Arc<Mutex<HashMap<Uuid, Template>>>,

    /// All feedback in storage
    feedback: Arc<Mutex<HashMap<Uuid, Feedback>>>,
}

impl Memory {
    /// Create a new empty Memory storage
    pub fn new() -> Self {
        Self {
            users: Arc::new(Mutex::new(HashMap::new())),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            templates: Arc::new(Mutex::new(HashMap::new())),
            feedback: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl Storage for Memory {
    async fn find_single_user_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        Ok(self.users.lock().await.get(id).cloned())
    }

    async fn find_single_user_by_feedback_link_id(
        &self,
        link_id: &Uuid,
    ) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|user| &user.feedback_link_id == link_id)
            .cloned())
    }

    async fn upsert_user(&self, values: &UpsertUserValues) -> Result<User> {
        let mut users = self.users.lock().await;

        let user = if let Some(user) = users.get_mut(values.id) {
            user.email = values.email.map(ToString::to_string);
            user.first_name = values.first_name.map(ToString::to_string);
            user.last_name = values.last_name.map(ToString::to_string);
            user.profile_image_url = values.profile_image_url.map(ToString::to_string);
            user.updated_at = Utc::now().naive_utc();

            user.clone()
        } else {
            let user = User {
                id: *values.id,
                email: values.email.map(ToString::to_string),
                first_name: values.first_name.map(ToString::to_string),
                last_name: values.last_name.map(ToString::to_string),
                profile_image_url: values.profile_image_url.map(ToString::to_string),
                feedback_link_id: Uuid::new_v4(),
                created_at: Utc::now().naive_utc(),
                updated_at: Utc::now().naive_utc(),
            };

            users.insert(user.id, user.clone());

            user
        };

        Ok(user)
    }

    async fn create_session(&self, values: &CreateSessionValues) -> Result<Session> {
        let session = Session {
            id: Uuid::new_v4(),
            user_id: values.user.id,
            expires_at: values.expires_at,
            created_at: Utc::now().naive_utc(),
        };

        self.sessions
            .lock()
            .await
            .insert(session.id, session.clone());

        Ok(session)
    }

    async fn find_single_session_by_id(&self, id: &Uuid) -> Result<Option<Session>> {
        Ok(self.sessions.lock().await.get(id).cloned())
    }

    async fn delete_session(&self, session: &Session) -> Result<()> {
        self.sessions.lock().await.remove(&session.id);

        Ok(())
    }

    async fn find_all_templates_by_user(&self, user: &User) -> Result<Vec<Template>> {
        let mut templates = self
            .templates
            .lock()
            .await
            .values()
            .filter(|template| template.user_id == user.id)
            .cloned()
            .collect::<Vec<Template>>();

        templates.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(templates)
    }

    async fn find_single_template_by_id(&self, id: &Uuid) -> Result<Option<Template>> {
        Ok(self.templates.lock().await.get(id).cloned())
    }

    async fn create_template(&self, values: &CreateTemplateValues) -> Result<Template> {
        let mut templates = self.templates.lock().await;

        if values.is_default {
            clear_default(&mut templates, &values.user.id);
        }

        let template = Template {
            id: Uuid::new_v4(),
            user_id: values.user.id,
            name: values.name.to_string(),
            description: values.description.map(ToString::to_string),
            categories: values.categories.to_vec(),
            is_default: values.is_default,
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        };

        templates.insert(template.id, template.clone());

        Ok(template)
    }

    async fn update_template(
        &self,
        template_id: &Uuid,
        user: &User,
        values: &UpdateTemplateValues,
    ) -> Result<Option<Template>> {
        let mut templates = self.templates.lock().await;

        // the ID and the owner must match in one go; a non-owned template is
        // indistinguishable from a missing one
        if !templates
            .get(template_id)
            .is_some_and(|template| template.user_id == user.id)
        {
            return Ok(None);
        }

        if values.is_default {
            clear_default(&mut templates, &user.id);
        }

        Ok(templates.get_mut(template_id).map(|template| {
            template.name = values.name.to_string();
            template.description = values.description.map(ToString::to_string);
            template.categories = values.categories.to_vec();
            template.is_default = values.is_default;
            template.updated_at = Utc::now().naive_utc();

            template.clone()
        }))
    }

    async fn delete_template(&self, template_id: &Uuid, user: &User) -> Result<bool> {
        let mut templates = self.templates.lock().await;

        let owned = templates
            .get(template_id)
            .is_some_and(|template| template.user_id == user.id);

        if !owned {
            return Ok(false);
        }

        templates.remove(template_id);

        // feedback outlives its template, only the reference is nulled
        for feedback in self.feedback.lock().await.values_mut() {
            if feedback.template_id == Some(*template_id) {
                feedback.template_id = None;
            }
        }

        Ok(true)
    }

    async fn find_all_feedback_by_user(&self, user: &User) -> Result<Vec<Feedback>> {
        let mut feedback = self
            .feedback
            .lock()
            .await
            .values()
            .filter(|feedback| feedback.user_id == user.id)
            .cloned()
            .collect::<Vec<Feedback>>();

        feedback.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(feedback)
    }

    async fn create_feedback(&self, values: &CreateFeedbackValues) -> Result<Feedback> {
        let feedback = Feedback {
            id: Uuid::new_v4(),
            user_id: values.user.id,
            template_id: values.template_id.copied(),
            rating: values.rating,
            category: values.category.to_string(),
            comment: values.comment.to_string(),
            created_at: Utc::now().naive_utc(),
        };

        self.feedback
            .lock()
            .await
            .insert(feedback.id, feedback.clone());

        Ok(feedback)
    }
}

/// Unset the default flag on all templates of a user
fn clear_default(templates: &mut HashMap<Uuid, Template>, user_id: &Uuid) {
    for template in templates.values_mut() {
        if &template.user_id == user_id && template.is_default {
            template.is_default = false;
        }
    }
}

//! Postgres storage

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use uuid::Uuid;

use crate::feedback::Feedback;
use crate::sessions::Session;
use crate::templates::Category;
use crate::templates::Template;
use crate::users::User;

use super::CreateFeedbackValues;
use super::CreateSessionValues;
use super::CreateTemplateValues;
use super::Error;
use super::Result;
use super::Storage;
use super::UpdateTemplateValues;
use super::UpsertUserValues;

/// Migrator to run migrations on startup
static MIGRATOR: Migrator = sqlx::migrate!();

/// Postgres storage
#[derive(Clone)]
pub struct Postgres {
    /// Pool of connections
    connection_pool: PgPool,
}

impl Postgres {
    /// Create Postgres storage
    ///
    /// Use the `DATABASE_URL` environment variable
    ///
    /// Migrations will be run
    pub async fn new() -> Self {
        let database_connection_string = std::env::var("DATABASE_URL").expect("Valid DATABASE_URL");

        let connection_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_connection_string)
            .await
            .expect("Valid connection");

        Self::new_with_pool(connection_pool).await
    }

    /// Create Postgres storage with existing pool
    ///
    /// Migrations will be run
    pub async fn new_with_pool(connection_pool: PgPool) -> Self {
        let migration_result = MIGRATOR.run(&connection_pool).await;

        if let Err(err) = migration_result {
            panic!("Migrations could not run: {err}");
        }

        Self { connection_pool }
    }
}

/// Postgres version of a user
#[derive(sqlx::FromRow)]
struct PostgresUser {
    /// User ID
    id: Uuid,

    /// Email address
    email: Option<String>,

    /// First name
    first_name: Option<String>,

    /// Last name
    last_name: Option<String>,

    /// URL of the profile image
    profile_image_url: Option<String>,

    /// Public feedback link token
    feedback_link_id: Uuid,

    /// Creation date
    created_at: NaiveDateTime,

    /// Last updated at
    updated_at: NaiveDateTime,
}

impl User {
    /// Create a user from the postgres version
    fn from_postgres_user(user: PostgresUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            profile_image_url: user.profile_image_url,
            feedback_link_id: user.feedback_link_id,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }

    /// Maybe create a user from the postgres version
    fn from_postgres_user_optional(user: Option<PostgresUser>) -> Option<Self> {
        user.map(Self::from_postgres_user)
    }
}

/// Postgres version of a session
#[derive(sqlx::FromRow)]
struct PostgresSession {
    /// Session ID
    id: Uuid,

    /// The user the session belongs to
    user_id: Uuid,

    /// Expiry date
    expires_at: NaiveDateTime,

    /// Creation date
    created_at: NaiveDateTime,
}

impl Session {
    /// Create a session from the postgres version
    fn from_postgres_session(session: PostgresSession) -> Self {
        Self {
            id: session.id,
            user_id: session.user_id,
            expires_at: session.expires_at,
            created_at: session.created_at,
        }
    }
}

/// Postgres version of a template
#[derive(sqlx::FromRow)]
struct PostgresTemplate {
    /// Template ID
    id: Uuid,

    /// The owning user
    user_id: Uuid,

    /// Template name
    name: String,

    /// Optional description
    description: Option<String>,

    /// Categories as a JSONB document
    categories: Json<Vec<Category>>,

    /// Pre-selected template of the user
    is_default: bool,

    /// Creation date
    created_at: NaiveDateTime,

    /// Last updated at
    updated_at: NaiveDateTime,
}

impl Template {
    /// Create a template from the postgres version
    fn from_postgres_template(template: PostgresTemplate) -> Self {
        Self {
            id: template.id,
            user_id: template.user_id,
            name: template.name,
            description: template.description,
            categories: template.categories.0,
            is_default: template.is_default,
            created_at: template.created_at,
            updated_at: template.updated_at,
        }
    }

    /// Create multiple templates from the postgres version
    fn from_postgres_template_multiple(mut templates: Vec<PostgresTemplate>) -> Vec<Self> {
        templates
            .drain(..)
            .map(Self::from_postgres_template)
            .collect::<Vec<Self>>()
    }
}

/// Postgres version of a feedback record
#[derive(sqlx::FromRow)]
struct PostgresFeedback {
    /// Feedback ID
    id: Uuid,

    /// The recipient user
    user_id: Uuid,

    /// The driving template, if any
    template_id: Option<Uuid>,

    /// Star rating
    rating: i32,

    /// Category identifier
    category: String,

    /// Free-form comment
    comment: String,

    /// Creation date
    created_at: NaiveDateTime,
}

impl Feedback {
    /// Create a feedback record from the postgres version
    fn from_postgres_feedback(feedback: PostgresFeedback) -> Self {
        Self {
            id: feedback.id,
            user_id: feedback.user_id,
            template_id: feedback.template_id,
            rating: feedback.rating,
            category: feedback.category,
            comment: feedback.comment,
            created_at: feedback.created_at,
        }
    }

    /// Create multiple feedback records from the postgres version
    fn from_postgres_feedback_multiple(mut feedback: Vec<PostgresFeedback>) -> Vec<Self> {
        feedback
            .drain(..)
            .map(Self::from_postgres_feedback)
            .collect::<Vec<Self>>()
    }
}

#[async_trait]
impl Storage for Postgres {
    async fn find_single_user_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, PostgresUser>(
            r"
            SELECT *
            FROM users
            WHERE id = $1
            LIMIT 1
            ",
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map(User::from_postgres_user_optional)
        .map_err(connection_error)?;

        Ok(user)
    }

    async fn find_single_user_by_feedback_link_id(
        &self,
        link_id: &Uuid,
    ) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, PostgresUser>(
            r"
            SELECT *
            FROM users
            WHERE feedback_link_id = $1
            LIMIT 1
            ",
        )
        .bind(link_id)
        .fetch_optional(&self.connection_pool)
        .await
        .map(User::from_postgres_user_optional)
        .map_err(connection_error)?;

        Ok(user)
    }

    async fn upsert_user(&self, values: &UpsertUserValues) -> Result<User> {
        let user = sqlx::query_as::<_, PostgresUser>(
            r"
            INSERT INTO users (id, email, first_name, last_name, profile_image_url, feedback_link_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                profile_image_url = EXCLUDED.profile_image_url,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *
            ",
        )
        .bind(values.id)
        .bind(values.email)
        .bind(values.first_name)
        .bind(values.last_name)
        .bind(values.profile_image_url)
        .bind(Uuid::new_v4())
        .fetch_one(&self.connection_pool)
        .await
        .map(User::from_postgres_user)
        .map_err(connection_error)?;

        Ok(user)
    }

    async fn create_session(&self, values: &CreateSessionValues) -> Result<Session> {
        let session = sqlx::query_as::<_, PostgresSession>(
            r"
            INSERT INTO sessions (id, user_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING *
            ",
        )
        .bind(Uuid::new_v4())
        .bind(values.user.id)
        .bind(values.expires_at)
        .fetch_one(&self.connection_pool)
        .await
        .map(Session::from_postgres_session)
        .map_err(connection_error)?;

        Ok(session)
    }

    async fn find_single_session_by_id(&self, id: &Uuid) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, PostgresSession>(
            r"
            SELECT *
            FROM sessions
            WHERE id = $1
            LIMIT 1
            ",
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(session.map(Session::from_postgres_session))
    }

    async fn delete_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            r"
            DELETE FROM sessions
            WHERE id = $1
            ",
        )
        .bind(session.id)
        .execute(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(())
    }

    async fn find_all_templates_by_user(&self, user: &User) -> Result<Vec<Template>> {
        let templates = sqlx::query_as::<_, PostgresTemplate>(
            r"
            SELECT *
            FROM templates
            WHERE user_id = $1
            ORDER BY created_at ASC
            ",
        )
        .bind(user.id)
        .fetch_all(&self.connection_pool)
        .await
        .map(Template::from_postgres_template_multiple)
        .map_err(connection_error)?;

        Ok(templates)
    }

    async fn find_single_template_by_id(&self, id: &Uuid) -> Result<Option<Template>> {
        let template = sqlx::query_as::<_, PostgresTemplate>(
            r"
            SELECT *
            FROM templates
            WHERE id = $1
            LIMIT 1
            ",
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(template.map(Template::from_postgres_template))
    }

    async fn create_template(&self, values: &CreateTemplateValues) -> Result<Template> {
        let mut transaction = self.connection_pool.begin().await.map_err(connection_error)?;

        let template = sqlx::query_as::<_, PostgresTemplate>(
            r"
            INSERT INTO templates (id, user_id, name, description, categories, is_default)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            ",
        )
        .bind(Uuid::new_v4())
        .bind(values.user.id)
        .bind(values.name)
        .bind(values.description)
        .bind(Json(values.categories))
        .bind(values.is_default)
        .fetch_one(&mut *transaction)
        .await
        .map(Template::from_postgres_template)
        .map_err(connection_error)?;

        if values.is_default {
            clear_other_defaults(&mut transaction, &values.user.id, &template.id).await?;
        }

        transaction.commit().await.map_err(connection_error)?;

        Ok(template)
    }

    async fn update_template(
        &self,
        template_id: &Uuid,
        user: &User,
        values: &UpdateTemplateValues,
    ) -> Result<Option<Template>> {
        let mut transaction = self.connection_pool.begin().await.map_err(connection_error)?;

        // the ID and the owner are matched in the same statement; a
        // non-owned template is indistinguishable from a missing one
        let template = sqlx::query_as::<_, PostgresTemplate>(
            r"
            UPDATE templates
            SET name = $1,
                description = $2,
                categories = $3,
                is_default = $4,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $5 AND user_id = $6
            RETURNING *
            ",
        )
        .bind(values.name)
        .bind(values.description)
        .bind(Json(values.categories))
        .bind(values.is_default)
        .bind(template_id)
        .bind(user.id)
        .fetch_optional(&mut *transaction)
        .await
        .map_err(connection_error)?;

        let template = template.map(Template::from_postgres_template);

        if let Some(template) = &template {
            if template.is_default {
                clear_other_defaults(&mut transaction, &user.id, &template.id).await?;
            }
        }

        transaction.commit().await.map_err(connection_error)?;

        Ok(template)
    }

    async fn delete_template(&self, template_id: &Uuid, user: &User) -> Result<bool> {
        // feedback referencing the template is nulled by the foreign key
        let result = sqlx::query(
            r"
            DELETE FROM templates
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(template_id)
        .bind(user.id)
        .execute(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_all_feedback_by_user(&self, user: &User) -> Result<Vec<Feedback>> {
        let feedback = sqlx::query_as::<_, PostgresFeedback>(
            r"
            SELECT *
            FROM feedback
            WHERE user_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(user.id)
        .fetch_all(&self.connection_pool)
        .await
        .map(Feedback::from_postgres_feedback_multiple)
        .map_err(connection_error)?;

        Ok(feedback)
    }

    async fn create_feedback(&self, values: &CreateFeedbackValues) -> Result<Feedback> {
        let feedback = sqlx::query_as::<_, PostgresFeedback>(
            r"
            INSERT INTO feedback (id, user_id, template_id, rating, category, comment)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            ",
        )
        .bind(Uuid::new_v4())
        .bind(values.user.id)
        .bind(values.template_id)
        .bind(values.rating)
        .bind(values.category)
        .bind(values.comment)
        .fetch_one(&self.connection_pool)
        .await
        .map(Feedback::from_postgres_feedback)
        .map_err(connection_error)?;

        Ok(feedback)
    }
}

/// Unset the default flag on all other templates of a user
async fn clear_other_defaults(
    transaction: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: &Uuid,
    keep_template_id: &Uuid,
) -> Result<()> {
    sqlx::query(
        r"
        UPDATE templates
        SET is_default = FALSE
        WHERE user_id = $1 AND is_default AND id <> $2
        ",
    )
    .bind(user_id)
    .bind(keep_template_id)
    .execute(&mut **transaction)
    .await
    .map_err(connection_error)?;

    Ok(())
}

/// Convert `SQLx` to storage connection error
fn connection_error<E>(err: E) -> Error
where
    E: std::error::Error,
{
    Error::Connection(err.to_string())
}

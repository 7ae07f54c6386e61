use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::users::repo_types::{NewUser, User, UserPatch, UserRow, UserWithPassword};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for users. Plain reads never expose the password hash;
/// the `*_with_password` variants are for credential checks.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_by_email_with_password(&self, email: &str)
        -> StoreResult<Option<UserWithPassword>>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_by_id_with_password(&self, id: Uuid) -> StoreResult<Option<UserWithPassword>>;
    async fn create(&self, new_user: NewUser) -> StoreResult<User>;
    /// Applies the patch and returns the post-update document, or `None` if the id is unknown.
    async fn update_by_id(&self, id: Uuid, patch: UserPatch) -> StoreResult<Option<User>>;
    async fn set_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()>;
}

const USER_COLUMNS: &str = "id, name, email, phone, address, password_hash, role, \
     first_niche, second_niche, third_niche, cover_letter, \
     resume_public_id, resume_url, created_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_write_err(e: sqlx::Error, what: &'static str) -> StoreError {
    match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::DuplicateEmail,
        other => StoreError::Other(anyhow::Error::new(other).context(what)),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.find_by_email_with_password(email).await?.map(|u| u.user))
    }

    async fn find_by_email_with_password(
        &self,
        email: &str,
    ) -> StoreResult<Option<UserWithPassword>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .context("select user by email")?;
        Ok(row.map(UserWithPassword::try_from).transpose()?)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.find_by_id_with_password(id).await?.map(|u| u.user))
    }

    async fn find_by_id_with_password(&self, id: Uuid) -> StoreResult<Option<UserWithPassword>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("select user by id")?;
        Ok(row.map(UserWithPassword::try_from).transpose()?)
    }

    async fn create(&self, u: NewUser) -> StoreResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (id, name, email, phone, address, password_hash, role,
                               first_niche, second_niche, third_niche, cover_letter,
                               resume_public_id, resume_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let (resume_public_id, resume_url) = match u.resume {
            Some(r) => (Some(r.public_id), Some(r.url)),
            None => (None, None),
        };
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(u.name)
            .bind(u.email)
            .bind(u.phone)
            .bind(u.address)
            .bind(u.password_hash)
            .bind(u.role.as_str())
            .bind(u.niches.first_niche)
            .bind(u.niches.second_niche)
            .bind(u.niches.third_niche)
            .bind(u.cover_letter)
            .bind(resume_public_id)
            .bind(resume_url)
            .fetch_one(&self.db)
            .await
            .map_err(|e| map_write_err(e, "insert user"))?;
        let user = UserWithPassword::try_from(row)?.user;
        debug!(user_id = %user.id, "user row inserted");
        Ok(user)
    }

    async fn update_by_id(&self, id: Uuid, patch: UserPatch) -> StoreResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users SET
                name             = COALESCE($2, name),
                email            = COALESCE($3, email),
                phone            = COALESCE($4, phone),
                address          = COALESCE($5, address),
                cover_letter     = COALESCE($6, cover_letter),
                first_niche      = COALESCE($7, first_niche),
                second_niche     = COALESCE($8, second_niche),
                third_niche      = COALESCE($9, third_niche),
                resume_public_id = COALESCE($10, resume_public_id),
                resume_url       = COALESCE($11, resume_url)
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let (resume_public_id, resume_url) = match patch.resume {
            Some(r) => (Some(r.public_id), Some(r.url)),
            None => (None, None),
        };
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(patch.name)
            .bind(patch.email)
            .bind(patch.phone)
            .bind(patch.address)
            .bind(patch.cover_letter)
            .bind(patch.niches.first_niche)
            .bind(patch.niches.second_niche)
            .bind(patch.niches.third_niche)
            .bind(resume_public_id)
            .bind(resume_url)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| map_write_err(e, "update user"))?;
        Ok(row
            .map(UserWithPassword::try_from)
            .transpose()?
            .map(|u| u.user))
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.db)
            .await
            .map_err(|e| map_write_err(e, "update password"))?;
        Ok(())
    }
}

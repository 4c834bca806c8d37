//! Persistence for user profiles.

use chrono::{DateTime, Utc};
use gather_core::ProfileUpdate;
use gather_types::{Profile, UserId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the `profiles` table.
pub struct UserProfileStore<'a> {
    pool: &'a PgPool,
}

impl<'a> UserProfileStore<'a> {
    /// Create a new profile store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a profile by user id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, user_id: UserId) -> Result<Option<Profile>, DbError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r"SELECT id, name, bio, website, avatar_url, created_at
              FROM profiles
              WHERE id = $1",
        )
        .bind(user_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Profile::from))
    }

    /// Insert the profile or update the editable fields of an existing one.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn upsert(&self, user_id: UserId, update: &ProfileUpdate) -> Result<Profile, DbError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r"INSERT INTO profiles (id, name, bio, website)
              VALUES ($1, $2, $3, $4)
              ON CONFLICT (id) DO UPDATE
                SET name = EXCLUDED.name, bio = EXCLUDED.bio, website = EXCLUDED.website
              RETURNING id, name, bio, website, avatar_url, created_at",
        )
        .bind(user_id.into_inner())
        .bind(&update.name)
        .bind(&update.bio)
        .bind(&update.website)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(%user_id, "Saved profile");
        Ok(row.into())
    }
}

/// A row from the `profiles` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRow {
    /// User identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Biography.
    pub bio: Option<String>,
    /// Personal website.
    pub website: Option<String>,
    /// Avatar image URL.
    pub avatar_url: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: UserId::from(row.id),
            name: row.name,
            bio: row.bio,
            website: row.website,
            avatar_url: row.avatar_url,
            created_at: row.created_at,
        }
    }
}

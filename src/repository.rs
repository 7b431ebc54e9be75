use crate::models::User;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("profile store unavailable: {0}")]
    Unavailable(String),
}

/// Repository Trait
///
/// Read access to user profiles, the source of truth for a session's role. Handlers and
/// extractors only see this contract, so tests can swap in an in-memory or failing store.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across Axum tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    /// `Ok(None)` when no profile exists. Errors mean the store could not be asked.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the profile store across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// Profiles backed by the `public.profiles` table.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, display_name, role FROM public.profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}

pub const DEMO_STUDENT_ID: Uuid = Uuid::from_u128(0x5701);
pub const DEMO_TEACHER_ID: Uuid = Uuid::from_u128(0x7EAC);
pub const DEMO_ADMIN_ID: Uuid = Uuid::from_u128(0xAD01);

/// The demo accounts used when running locally without a database.
pub fn demo_profiles() -> Vec<User> {
    vec![
        User {
            id: DEMO_STUDENT_ID,
            email: "estudiante@aula.test".to_string(),
            display_name: "Lucía Estudiante".to_string(),
            role: "student".to_string(),
        },
        User {
            id: DEMO_TEACHER_ID,
            email: "profesor@aula.test".to_string(),
            display_name: "Mateo Profesor".to_string(),
            role: "teacher".to_string(),
        },
        User {
            id: DEMO_ADMIN_ID,
            email: "admin@aula.test".to_string(),
            display_name: "Admin Aula".to_string(),
            role: "admin".to_string(),
        },
    ]
}

/// InMemoryRepository
///
/// A fixed set of profiles held in memory. Used for local development and in tests.
#[derive(Default)]
pub struct InMemoryRepository {
    users: HashMap<Uuid, User>,
}

impl InMemoryRepository {
    pub fn new(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: users.into_iter().map(|user| (user.id, user)).collect(),
        }
    }

    pub fn with_demo_profiles() -> Self {
        Self::new(demo_profiles())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.get(&id).cloned())
    }
}

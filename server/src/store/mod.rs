//! Recipe aggregate persistence.
//!
//! `repository` holds the transactional logic over a single connection,
//! `resolver` the find-or-create of shared reference rows and `assembler` the
//! read path. `DbRecipeStore` runs those on the blocking pool so request
//! tasks are suspended, not blocked, while the database works.

pub mod assembler;
pub mod cancel;
pub mod error;
pub mod repository;
pub mod resolver;

use async_trait::async_trait;
use diesel::PgConnection;
use uuid::Uuid;

use crate::db::DbPool;
use crate::types::{ListOptions, Recipe, RecipeRequest};

pub use cancel::{CancelOnDrop, Cancellation};
pub use error::{ErrorKind, StoreError};
pub use resolver::{ReferenceKind, DEFAULT_UNIT_SYSTEM};

/// Operations the HTTP layer needs from recipe storage.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn create_recipe(
        &self,
        request: RecipeRequest,
        cancel: Cancellation,
    ) -> Result<Recipe, StoreError>;

    async fn get_recipe(&self, id: Uuid, cancel: Cancellation) -> Result<Recipe, StoreError>;

    async fn list_recipes(
        &self,
        options: ListOptions,
        cancel: Cancellation,
    ) -> Result<Vec<Recipe>, StoreError>;

    /// Replace the recipe's fields and collections with `request`.
    async fn update_recipe(
        &self,
        id: Uuid,
        request: RecipeRequest,
        cancel: Cancellation,
    ) -> Result<Recipe, StoreError>;

    async fn delete_recipe(&self, id: Uuid, cancel: Cancellation) -> Result<(), StoreError>;
}

/// PostgreSQL-backed `RecipeStore`.
#[derive(Clone)]
pub struct DbRecipeStore {
    pool: DbPool,
}

impl DbRecipeStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Run `op` with a pooled connection on the blocking thread pool.
    ///
    /// The connection goes back to the pool when `op` returns, whatever the
    /// outcome. If this future is dropped first, `cancel` is tripped so the
    /// transaction rolls back at its next checkpoint.
    async fn run<T, F>(&self, cancel: Cancellation, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection, &Cancellation) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        let guard = cancel.drop_guard();
        let span = tracing::Span::current();

        let result = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            cancel.check()?;
            let mut conn = pool.get()?;
            op(&mut conn, &cancel)
        })
        .await;

        guard.disarm();
        result?
    }
}

#[async_trait]
impl RecipeStore for DbRecipeStore {
    #[tracing::instrument(name = "store.create_recipe", skip_all)]
    async fn create_recipe(
        &self,
        request: RecipeRequest,
        cancel: Cancellation,
    ) -> Result<Recipe, StoreError> {
        self.run(cancel, move |conn, cancel| {
            repository::create_recipe(conn, &request, cancel)
        })
        .await
    }

    #[tracing::instrument(name = "store.get_recipe", skip(self, cancel), fields(recipe_id = %id))]
    async fn get_recipe(&self, id: Uuid, cancel: Cancellation) -> Result<Recipe, StoreError> {
        self.run(cancel, move |conn, _| repository::read_recipe(conn, id))
            .await
    }

    #[tracing::instrument(name = "store.list_recipes", skip(self, cancel))]
    async fn list_recipes(
        &self,
        options: ListOptions,
        cancel: Cancellation,
    ) -> Result<Vec<Recipe>, StoreError> {
        let recipes = self
            .run(cancel, move |conn, cancel| {
                repository::list_recipes(conn, options, cancel)
            })
            .await?;
        tracing::debug!(count = recipes.len(), "listed recipes");
        Ok(recipes)
    }

    #[tracing::instrument(
        name = "store.update_recipe",
        skip(self, request, cancel),
        fields(recipe_id = %id)
    )]
    async fn update_recipe(
        &self,
        id: Uuid,
        request: RecipeRequest,
        cancel: Cancellation,
    ) -> Result<Recipe, StoreError> {
        self.run(cancel, move |conn, cancel| {
            repository::update_recipe(conn, id, &request, cancel)
        })
        .await
    }

    #[tracing::instrument(name = "store.delete_recipe", skip(self, cancel), fields(recipe_id = %id))]
    async fn delete_recipe(&self, id: Uuid, cancel: Cancellation) -> Result<(), StoreError> {
        self.run(cancel, move |conn, cancel| {
            repository::delete_recipe(conn, id, cancel)
        })
        .await
    }
}

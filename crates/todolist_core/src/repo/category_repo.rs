//! Category repository contract and SQLite implementation.
//!
//! # Invariants
//! - Categories are listed by name ascending.
//! - Deleting a category never touches the tasks that reference it.

use crate::db::{CategoryRecord, SqliteStore, Table};
use crate::model::category::{Category, CategoryId};
use crate::repo::{RepoResult, RepoStream};
use async_trait::async_trait;
use futures::StreamExt;

const CATEGORY_QUERY_TABLES: &[Table] = &[Table::Categories];

/// Repository interface for categories.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Live list of all categories sorted by name.
    fn get_all(&self) -> RepoStream<Vec<Category>>;
    /// One-shot lookup; `None` when the category was deleted or never existed.
    async fn find_by_id(&self, id: CategoryId) -> RepoResult<Option<Category>>;
    /// Inserts or fully replaces a category and returns its id.
    async fn insert(&self, category: &Category) -> RepoResult<CategoryId>;
    async fn delete(&self, category: &Category) -> RepoResult<()>;
}

/// SQLite-backed category repository.
#[derive(Clone)]
pub struct SqliteCategoryRepository {
    store: SqliteStore,
}

impl SqliteCategoryRepository {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CategoryRepository for SqliteCategoryRepository {
    fn get_all(&self) -> RepoStream<Vec<Category>> {
        self.store
            .live_query(CATEGORY_QUERY_TABLES, |store| store.query_all_categories())
            .map(|result| -> RepoResult<Vec<Category>> {
                let records = result?;
                Ok(records.into_iter().map(category_from_record).collect())
            })
            .boxed()
    }

    async fn find_by_id(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        let record = self
            .store
            .run(move |store| store.query_category(id))
            .await?;
        Ok(record.map(category_from_record))
    }

    async fn insert(&self, category: &Category) -> RepoResult<CategoryId> {
        category.validate()?;
        let record = CategoryRecord {
            id: category.id,
            name: category.name.clone(),
            emoji: category.emoji.clone(),
        };
        let id = self
            .store
            .run(move |store| store.upsert_category(&record))
            .await?;
        Ok(id)
    }

    async fn delete(&self, category: &Category) -> RepoResult<()> {
        let id = category.id;
        self.store
            .run(move |store| store.delete_category(id))
            .await?;
        Ok(())
    }
}

fn category_from_record(record: CategoryRecord) -> Category {
    Category {
        id: record.id,
        name: record.name,
        emoji: record.emoji,
    }
}

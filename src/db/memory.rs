use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::db::models::StoredDocument;
use crate::db::query::{ListQuery, Page};
use crate::db::repository::{unique_violation, Repository};
use crate::error::AppError;
use crate::policy::filter::Filter;

/// In-memory [`Repository`] backing demo mode and tests.
///
/// Documents are kept in insertion order. The write lock is held across the
/// uniqueness check and the write.
pub struct MemoryRepository<T> {
    docs: RwLock<Vec<T>>,
}

impl<T: StoredDocument> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StoredDocument> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
        }
    }

    fn in_scope(doc: &T, scope: Option<&Filter>) -> bool {
        scope.map_or(true, |filter| filter.matches(doc))
    }

    fn check_unique(docs: &[T], candidate: &T) -> Result<(), AppError> {
        let fields = T::schema().unique_fields();
        if fields.is_empty() {
            return Ok(());
        }
        let candidate_value =
            serde_json::to_value(candidate).map_err(|e| AppError::Internal(e.to_string()))?;

        for other in docs.iter().filter(|d| d.id() != candidate.id()) {
            let other_value =
                serde_json::to_value(other).map_err(|e| AppError::Internal(e.to_string()))?;
            for field in &fields {
                match (candidate_value.get(*field), other_value.get(*field)) {
                    (Some(a), Some(b)) if !a.is_null() && a == b => {
                        return Err(unique_violation(field));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<T: StoredDocument> Repository<T> for MemoryRepository<T> {
    async fn insert(&self, doc: T) -> Result<(), AppError> {
        let mut docs = self.docs.write().await;
        if docs.iter().any(|d| d.id() == doc.id()) {
            return Err(unique_violation("id"));
        }
        Self::check_unique(&docs, &doc)?;
        docs.push(doc);
        Ok(())
    }

    async fn find_by_id(&self, id: &str, scope: Option<&Filter>) -> Result<Option<T>, AppError> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .find(|d| d.id() == id && Self::in_scope(d, scope))
            .cloned())
    }

    async fn find_by_slug(
        &self,
        slug: &str,
        scope: Option<&Filter>,
    ) -> Result<Option<T>, AppError> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .find(|d| d.slug() == Some(slug) && Self::in_scope(d, scope))
            .cloned())
    }

    async fn list(&self, query: &ListQuery, scope: Option<&Filter>) -> Result<Page<T>, AppError> {
        let docs = self.docs.read().await;
        let mut matching: Vec<&T> = docs
            .iter()
            .filter(|d| Self::in_scope(d, scope))
            .filter(|d| query.filter.as_ref().map_or(true, |f| f.matches(*d)))
            .collect();

        let field = query.sort.field;
        matching.sort_by(|a, b| {
            let ordering = a.sort_value(field).cmp(&b.sort_value(field));
            if query.sort.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        let total = matching.len() as u64;
        let page: Vec<T> = matching
            .into_iter()
            .skip(query.skip() as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();

        Ok(Page::new(page, total, query))
    }

    async fn replace(&self, doc: T, scope: Option<&Filter>) -> Result<bool, AppError> {
        let mut docs = self.docs.write().await;
        let Some(index) = docs
            .iter()
            .position(|d| d.id() == doc.id() && Self::in_scope(d, scope))
        else {
            return Ok(false);
        };
        Self::check_unique(&docs, &doc)?;
        docs[index] = doc;
        Ok(true)
    }

    async fn delete(&self, id: &str, scope: Option<&Filter>) -> Result<bool, AppError> {
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|d| !(d.id() == id && Self::in_scope(d, scope)));
        Ok(docs.len() < before)
    }
}

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::IndexModel;

use crate::db::models::StoredDocument;
use crate::db::query::{ListQuery, Page};
use crate::error::AppError;
use crate::policy::filter::Filter;

/// Repository for one collection of documents.
///
/// Every read and write takes the access scope computed by the policy
/// engine. `None` means unrestricted; a filter narrows the operation to the
/// documents it matches, inside the same store call.
#[async_trait]
pub trait Repository<T: StoredDocument>: Send + Sync {
    /// Insert a new document. Fails with a validation error on a unique
    /// field collision.
    async fn insert(&self, doc: T) -> Result<(), AppError>;

    async fn find_by_id(&self, id: &str, scope: Option<&Filter>) -> Result<Option<T>, AppError>;

    async fn find_by_slug(&self, slug: &str, scope: Option<&Filter>)
        -> Result<Option<T>, AppError>;

    /// List one page of documents matching both the query filter and the scope.
    async fn list(&self, query: &ListQuery, scope: Option<&Filter>) -> Result<Page<T>, AppError>;

    /// Replace the stored document with the same id. Returns `false` when
    /// no document with that id is in scope.
    async fn replace(&self, doc: T, scope: Option<&Filter>) -> Result<bool, AppError>;

    /// Hard delete. Returns `false` when no document with that id is in scope.
    async fn delete(&self, id: &str, scope: Option<&Filter>) -> Result<bool, AppError>;
}

const DUPLICATE_KEY: i32 = 11000;

/// Message used for every unique field collision.
pub fn unique_violation(field: &str) -> AppError {
    AppError::Validation(format!("{field}: Value must be unique"))
}

/// MongoDB implementation of [`Repository`], one MongoDB collection per
/// document type.
pub struct MongoRepository<T: StoredDocument> {
    collection: mongodb::Collection<T>,
}

impl<T: StoredDocument> MongoRepository<T> {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection(T::COLLECTION.slug()),
        }
    }

    /// Create the unique indexes: the document id plus every unique field
    /// declared by the schema.
    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        let mut fields = vec!["id"];
        fields.extend(T::schema().unique_fields());

        let indexes: Vec<IndexModel> = fields
            .into_iter()
            .map(|field| {
                let mut keys = Document::new();
                keys.insert(field, 1);
                IndexModel::builder()
                    .keys(keys)
                    .options(IndexOptions::builder().unique(true).build())
                    .build()
            })
            .collect();

        self.collection
            .create_indexes(indexes)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(collection = %T::COLLECTION, "Indexes ensured");
        Ok(())
    }

    fn scoped(base: Document, scope: Option<&Filter>) -> Document {
        match scope {
            None => base,
            Some(filter) => doc! { "$and": [ base, filter.to_document() ] },
        }
    }

    fn write_error(e: mongodb::error::Error) -> AppError {
        use mongodb::error::{ErrorKind, WriteFailure};

        if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = e.kind.as_ref() {
            if write_error.code == DUPLICATE_KEY {
                // the server names the violated index, e.g. "index: slug_1"
                let field = T::schema()
                    .unique_fields()
                    .into_iter()
                    .find(|f| write_error.message.contains(&format!("{f}_1")))
                    .unwrap_or("id");
                return unique_violation(field);
            }
        }
        AppError::Database(e.to_string())
    }
}

#[async_trait]
impl<T: StoredDocument> Repository<T> for MongoRepository<T> {
    async fn insert(&self, doc: T) -> Result<(), AppError> {
        self.collection
            .insert_one(&doc)
            .await
            .map_err(Self::write_error)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str, scope: Option<&Filter>) -> Result<Option<T>, AppError> {
        self.collection
            .find_one(Self::scoped(doc! { "id": id }, scope))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_by_slug(
        &self,
        slug: &str,
        scope: Option<&Filter>,
    ) -> Result<Option<T>, AppError> {
        self.collection
            .find_one(Self::scoped(doc! { "slug": slug }, scope))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list(&self, query: &ListQuery, scope: Option<&Filter>) -> Result<Page<T>, AppError> {
        let base = query
            .filter
            .as_ref()
            .map(Filter::to_document)
            .unwrap_or_default();
        let filter = Self::scoped(base, scope);

        let total = self
            .collection
            .count_documents(filter.clone())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut sort = Document::new();
        sort.insert(
            query.sort.field.field_name(),
            if query.sort.descending { -1 } else { 1 },
        );
        sort.insert("id", 1);

        let cursor = self
            .collection
            .find(filter)
            .sort(sort)
            .skip(query.skip())
            .limit(query.limit as i64)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let docs: Vec<T> = cursor
            .try_collect()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Page::new(docs, total, query))
    }

    async fn replace(&self, doc: T, scope: Option<&Filter>) -> Result<bool, AppError> {
        let result = self
            .collection
            .replace_one(Self::scoped(doc! { "id": doc.id() }, scope), &doc)
            .await
            .map_err(Self::write_error)?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, id: &str, scope: Option<&Filter>) -> Result<bool, AppError> {
        let result = self
            .collection
            .delete_one(Self::scoped(doc! { "id": id }, scope))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.deleted_count > 0)
    }
}

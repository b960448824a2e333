use mongodb::bson::{doc, Bson, Document};

use crate::models::publication::PublicationState;

/// Boolean document flags that list queries can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// `featured` on gallery items.
    Featured,
    /// `isActive` on sessions.
    Active,
}

impl Flag {
    /// Stored field name.
    pub fn field_name(&self) -> &'static str {
        match self {
            Flag::Featured => "featured",
            Flag::Active => "isActive",
        }
    }
}

/// The facts about a document that a [`Filter`] can test.
///
/// Documents answer `None` for facts they do not carry, and such documents
/// never match a condition on that fact.
pub trait Filterable {
    fn publication_state(&self) -> Option<PublicationState> {
        None
    }

    fn author_id(&self) -> Option<&str> {
        None
    }

    fn flag(&self, _flag: Flag) -> Option<bool> {
        None
    }
}

/// A declarative restriction narrowing which documents an operation may
/// see or affect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    StatusEquals(PublicationState),
    AuthorEquals(String),
    FlagEquals(Flag, bool),
    /// Matches when any branch matches. Empty matches nothing.
    Any(Vec<Filter>),
    /// Matches when every branch matches. Empty matches everything.
    All(Vec<Filter>),
}

impl Filter {
    pub fn published() -> Self {
        Filter::StatusEquals(PublicationState::Published)
    }

    pub fn authored_by(author_id: impl Into<String>) -> Self {
        Filter::AuthorEquals(author_id.into())
    }

    /// Conjunction of two optional filters.
    pub fn both(first: Option<&Filter>, second: Option<&Filter>) -> Option<Filter> {
        match (first, second) {
            (None, None) => None,
            (Some(f), None) | (None, Some(f)) => Some(f.clone()),
            (Some(a), Some(b)) => Some(Filter::All(vec![a.clone(), b.clone()])),
        }
    }

    /// Evaluate the filter against a single document.
    pub fn matches<T: Filterable + ?Sized>(&self, doc: &T) -> bool {
        match self {
            Filter::StatusEquals(state) => doc.publication_state() == Some(*state),
            Filter::AuthorEquals(author) => doc.author_id() == Some(author.as_str()),
            Filter::FlagEquals(flag, value) => doc.flag(*flag) == Some(*value),
            Filter::Any(branches) => branches.iter().any(|f| f.matches(doc)),
            Filter::All(branches) => branches.iter().all(|f| f.matches(doc)),
        }
    }

    /// Translate the filter into a MongoDB query document.
    pub fn to_document(&self) -> Document {
        match self {
            Filter::StatusEquals(state) => doc! { "status": state.as_str() },
            Filter::AuthorEquals(author) => doc! { "author": author.as_str() },
            Filter::FlagEquals(flag, value) => {
                let mut query = Document::new();
                query.insert(flag.field_name(), *value);
                query
            }
            Filter::Any(branches) if branches.is_empty() => {
                // {} matches every document, so $nor of it matches none
                doc! { "$nor": [ Document::new() ] }
            }
            Filter::Any(branches) => doc! { "$or": Self::branch_array(branches) },
            Filter::All(branches) if branches.is_empty() => Document::new(),
            Filter::All(branches) => doc! { "$and": Self::branch_array(branches) },
        }
    }

    fn branch_array(branches: &[Filter]) -> Vec<Bson> {
        branches
            .iter()
            .map(|f| Bson::Document(f.to_document()))
            .collect()
    }
}

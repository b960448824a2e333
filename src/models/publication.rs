use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Lifecycle state of an article.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationState {
    /// Visible to its author and admins only.
    #[default]
    Draft,
    /// Visible to everyone.
    Published,
}

impl PublicationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublicationState::Draft => "draft",
            PublicationState::Published => "published",
        }
    }
}

/// Publication state together with its timestamp side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Publication {
    pub state: PublicationState,
    pub published_at: Option<DateTime<Utc>>,
}

impl Publication {
    /// Every article starts as an unpublished draft.
    pub fn draft() -> Self {
        Self {
            state: PublicationState::Draft,
            published_at: None,
        }
    }

    /// Apply the state requested by an update.
    ///
    /// Publishing stamps `published_at` with `now` the first time only.
    /// Returning a published article to draft is not a supported transition.
    pub fn transition(
        self,
        requested: Option<PublicationState>,
        now: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        match (self.state, requested) {
            (_, None) => Ok(self),
            (PublicationState::Draft, Some(PublicationState::Draft)) => Ok(self),
            (PublicationState::Published, Some(PublicationState::Draft)) => {
                Err(AppError::Validation(
                    "A published article cannot be returned to draft".into(),
                ))
            }
            (_, Some(PublicationState::Published)) => Ok(Self {
                state: PublicationState::Published,
                published_at: self.published_at.or(Some(now)),
            }),
        }
    }
}

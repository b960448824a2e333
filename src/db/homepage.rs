use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::models::timestamp;
use crate::schema::registry::{DEFAULT_ELEMENTS, DEFAULT_NAVIGATION};

pub const GLOBAL_TYPE: &str = "homepage";

/// Media fields of the homepage, as JSON pointers.
pub const MEDIA_FIELDS: &[&str] = &["/hero/heroImage", "/support/supportImage"];

/// Default copy of the homepage groups.
pub mod defaults {
    pub const HERO_KICKER: &str = "Christos Medicine";
    pub const HERO_TITLE: &str = "A sacred space for embodied love, wisdom, and presence.";
    pub const HERO_DESCRIPTION: &str = "This is an online sanctuary for those seeking wholeness, remembrance, and gentle inner alignment.";
    pub const LEARN_MORE_LABEL: &str = "Learn More";
    pub const LEARN_MORE_HREF: &str = "/about";
    pub const SESSION_CTA_LABEL: &str = "Pay for Healing Session";
    pub const INTRO_TITLE: &str = "What Christos Medicine Is";
    pub const INTRO_DESCRIPTION: &str = "Christos Medicine is a grounded, heart-led practice that invites you into an anointed consciousness. It is not a doctrine or hierarchy. It is a sacred place for remembering what is already whole within you.";
    pub const UNION_TITLE: &str = "The Embodied Union";
    pub const UNION_DESCRIPTION: &str = "The Embodied Union is the sacred marriage of Wisdom and Love in your physical vessel, where spirit and matter breathe as one integrated life.";
    pub const SUPPORT_TITLE: &str = "Support This Sacred Work";
    pub const SUPPORT_DESCRIPTION: &str = "Your contribution helps maintain this healing space and allows transformative sessions to remain accessible.";
    pub const DONATION_LABEL: &str = "Make Donation";
    pub const SOCIAL_LINKS_TEXT: &str = "YouTube | Instagram | Email";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavLink {
    pub label: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    #[serde(rename = "trait")]
    pub trait_name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hero {
    pub kicker: String,
    pub title: String,
    pub description: String,
    pub learn_more_label: String,
    pub learn_more_href: String,
    pub session_cta_label: String,
    #[serde(default)]
    pub session_cta_url: Option<String>,
    /// Media id.
    #[serde(default)]
    pub hero_image: Option<String>,
}

impl Default for Hero {
    fn default() -> Self {
        Self {
            kicker: defaults::HERO_KICKER.into(),
            title: defaults::HERO_TITLE.into(),
            description: defaults::HERO_DESCRIPTION.into(),
            learn_more_label: defaults::LEARN_MORE_LABEL.into(),
            learn_more_href: defaults::LEARN_MORE_HREF.into(),
            session_cta_label: defaults::SESSION_CTA_LABEL.into(),
            session_cta_url: None,
            hero_image: None,
        }
    }
}

/// A titled block of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Support {
    pub title: String,
    pub description: String,
    pub donation_label: String,
    #[serde(default)]
    pub donation_url: Option<String>,
    pub social_links_text: String,
    /// Media id.
    #[serde(default)]
    pub support_image: Option<String>,
}

impl Default for Support {
    fn default() -> Self {
        Self {
            title: defaults::SUPPORT_TITLE.into(),
            description: defaults::SUPPORT_DESCRIPTION.into(),
            donation_label: defaults::DONATION_LABEL.into(),
            donation_url: None,
            social_links_text: defaults::SOCIAL_LINKS_TEXT.into(),
            support_image: None,
        }
    }
}

/// The homepage singleton global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomepageConfig {
    pub global_type: String,
    pub navigation: Vec<NavLink>,
    pub hero: Hero,
    pub intro: Section,
    pub elements: Vec<Element>,
    pub union_section: Section,
    pub support: Support,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for HomepageConfig {
    fn default() -> Self {
        Self {
            global_type: GLOBAL_TYPE.into(),
            navigation: DEFAULT_NAVIGATION
                .iter()
                .map(|(label, href)| NavLink {
                    label: (*label).into(),
                    href: (*href).into(),
                })
                .collect(),
            hero: Hero::default(),
            intro: Section {
                title: defaults::INTRO_TITLE.into(),
                description: defaults::INTRO_DESCRIPTION.into(),
            },
            elements: DEFAULT_ELEMENTS
                .iter()
                .map(|(name, trait_name, description)| Element {
                    name: (*name).into(),
                    trait_name: (*trait_name).into(),
                    description: (*description).into(),
                })
                .collect(),
            union_section: Section {
                title: defaults::UNION_TITLE.into(),
                description: defaults::UNION_DESCRIPTION.into(),
            },
            support: Support::default(),
            updated_at: None,
        }
    }
}

/// Merge a patch over `current`: object groups field by field, anything else
/// replaced. Unknown keys are dropped; `globalType` and `updatedAt` are set here.
pub fn merge_patch(
    current: &HomepageConfig,
    patch: &Map<String, Value>,
    now: DateTime<Utc>,
) -> Result<HomepageConfig, AppError> {
    let mut merged = match serde_json::to_value(current) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err(AppError::Internal("Homepage is not a JSON object".into())),
        Err(e) => return Err(AppError::Internal(format!("Failed to serialize homepage: {}", e))),
    };
    for (key, value) in patch {
        let value = match (merged.remove(key), value) {
            (Some(Value::Object(mut group)), Value::Object(fields)) => {
                group.extend(fields.clone());
                Value::Object(group)
            }
            (_, value) => value.clone(),
        };
        merged.insert(key.clone(), value);
    }
    merged.insert("globalType".into(), Value::String(GLOBAL_TYPE.into()));
    merged.insert("updatedAt".into(), Value::String(timestamp::format(&now)));

    serde_json::from_value(Value::Object(merged))
        .map_err(|e| AppError::Validation(format!("Invalid document: {}", e)))
}

/// Repository for the homepage global.
#[async_trait]
pub trait HomepageRepository: Send + Sync {
    /// The stored homepage, or the declared defaults when none was saved.
    async fn get(&self) -> Result<HomepageConfig, AppError>;

    /// Merge `patch` into the stored homepage (see [`merge_patch`]) as one
    /// atomic step and return the result. Concurrent patches touching
    /// different fields all survive.
    async fn apply_patch(
        &self,
        patch: &Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Result<HomepageConfig, AppError>;
}

/// MongoDB implementation, one document in the `globals` collection.
pub struct MongoHomepageRepository {
    collection: mongodb::Collection<HomepageConfig>,
}

impl MongoHomepageRepository {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection("globals"),
        }
    }

    /// One document per global type.
    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        let index = IndexModel::builder()
            .keys(doc! { "globalType": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection
            .create_index(index)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

/// `$set` paths for the fields a patch touches, with values taken from the
/// typed merge result. Only field names the homepage declares are emitted.
fn set_document(
    merged: &HomepageConfig,
    patch: &Map<String, Value>,
) -> Result<mongodb::bson::Document, AppError> {
    use mongodb::bson::{Bson, Document};

    let full = mongodb::bson::to_document(merged)
        .map_err(|e| AppError::Internal(format!("Failed to serialize homepage: {}", e)))?;
    let mut set = Document::new();
    for (key, value) in patch {
        let Some(current) = full.get(key) else {
            continue;
        };
        match (current, value) {
            (Bson::Document(group), Value::Object(fields)) => {
                for name in fields.keys() {
                    if let Some(field) = group.get(name) {
                        set.insert(format!("{}.{}", key, name), field.clone());
                    }
                }
            }
            _ => {
                set.insert(key.clone(), current.clone());
            }
        }
    }
    for key in ["globalType", "updatedAt"] {
        if let Some(value) = full.get(key) {
            set.insert(key, value.clone());
        }
    }
    Ok(set)
}

#[async_trait]
impl HomepageRepository for MongoHomepageRepository {
    async fn get(&self) -> Result<HomepageConfig, AppError> {
        use mongodb::bson::doc;

        let result = self
            .collection
            .find_one(doc! { "globalType": GLOBAL_TYPE })
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.unwrap_or_default())
    }

    async fn apply_patch(
        &self,
        patch: &Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Result<HomepageConfig, AppError> {
        use mongodb::bson::doc;
        use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions};

        // 1. Make sure the document exists, seeded with the defaults
        let mut defaults = mongodb::bson::to_document(&HomepageConfig::default())
            .map_err(|e| AppError::Internal(format!("Failed to serialize homepage: {}", e)))?;
        // the upsert takes globalType from the filter
        defaults.remove("globalType");
        self.collection
            .update_one(
                doc! { "globalType": GLOBAL_TYPE },
                doc! { "$setOnInsert": defaults },
            )
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // 2. Set only the touched paths, so concurrent patches do not clobber each other
        let set = set_document(&merge_patch(&HomepageConfig::default(), patch, now)?, patch)?;
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let updated = self
            .collection
            .find_one_and_update(doc! { "globalType": GLOBAL_TYPE }, doc! { "$set": set })
            .with_options(options)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        updated.ok_or_else(|| AppError::Database("Homepage document disappeared".into()))
    }
}

/// In-memory implementation for demo mode and tests.
#[derive(Default)]
pub struct MemoryHomepageRepository {
    config: RwLock<Option<HomepageConfig>>,
}

#[async_trait]
impl HomepageRepository for MemoryHomepageRepository {
    async fn get(&self) -> Result<HomepageConfig, AppError> {
        Ok(self.config.read().await.clone().unwrap_or_default())
    }

    async fn apply_patch(
        &self,
        patch: &Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Result<HomepageConfig, AppError> {
        // merged under the write lock
        let mut stored = self.config.write().await;
        let current = stored.as_ref().cloned().unwrap_or_default();
        let merged = merge_patch(&current, patch, now)?;
        *stored = Some(merged.clone());
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::registry::{self, Mode};

    #[test]
    fn test_default_homepage() {
        let config = HomepageConfig::default();
        assert_eq!(config.global_type, "homepage");
        assert_eq!(config.navigation.len(), 6);
        assert_eq!(config.navigation[1].label, "About Me");
        assert_eq!(config.elements.len(), 5);
        assert_eq!(config.elements[0].trait_name, "Foundation");
        assert!(config.hero.session_cta_url.is_none());
        assert!(config.support.donation_url.is_none());
    }

    #[test]
    fn test_defaults_agree_with_schema() {
        let mut value = serde_json::json!({ "globalType": "homepage" });
        registry::homepage().apply_defaults(&mut value);
        let from_schema: HomepageConfig = serde_json::from_value(value).unwrap();
        assert_eq!(from_schema, HomepageConfig::default());
    }

    #[test]
    fn test_default_serializes_valid() {
        let value = serde_json::to_value(HomepageConfig::default()).unwrap();
        assert_eq!(value["elements"][0]["trait"], "Foundation");
        assert!(registry::homepage().validate(&value, Mode::Create).is_ok());
    }

    fn patch(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn at(minute: u32) -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.with_ymd_and_hms(2024, 3, 1, 9, minute, 0).unwrap()
    }

    #[test]
    fn test_merge_patch() {
        let merged = merge_patch(
            &HomepageConfig::default(),
            &patch(serde_json::json!({
                "hero": { "title": "Welcome" },
                "navigation": [{ "label": "Home", "href": "/" }],
                "globalType": "other",
                "bogus": true,
            })),
            at(0),
        )
        .unwrap();
        assert_eq!(merged.hero.title, "Welcome");
        assert_eq!(merged.hero.kicker, defaults::HERO_KICKER);
        assert_eq!(merged.navigation.len(), 1);
        assert_eq!(merged.global_type, GLOBAL_TYPE);
        assert_eq!(merged.updated_at, Some(at(0)));
    }

    #[test]
    fn test_set_document_touches_only_patched_paths() {
        let patch = patch(serde_json::json!({
            "hero": { "title": "Welcome", "nonsense": 1 },
            "elements": [{ "name": "Fire", "trait": "Spark", "description": "Warmth" }],
            "$where": "1",
        }));
        let merged = merge_patch(&HomepageConfig::default(), &patch, at(0)).unwrap();
        let set = set_document(&merged, &patch).unwrap();

        let mut keys: Vec<&str> = set.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["elements", "globalType", "hero.title", "updatedAt"]);
        assert_eq!(set.get_str("hero.title").unwrap(), "Welcome");
    }

    #[tokio::test]
    async fn test_memory_repository_round() {
        let repo = MemoryHomepageRepository::default();
        assert_eq!(repo.get().await.unwrap(), HomepageConfig::default());

        repo.apply_patch(&patch(serde_json::json!({ "hero": { "title": "Welcome" } })), at(0))
            .await
            .unwrap();
        assert_eq!(repo.get().await.unwrap().hero.title, "Welcome");
    }

    #[tokio::test]
    async fn test_concurrent_patches_keep_both_changes() {
        let repo = std::sync::Arc::new(MemoryHomepageRepository::default());
        let tasks: Vec<_> = (0..16u32)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    let body = if i % 2 == 0 {
                        serde_json::json!({ "hero": { "title": format!("Title {i}") } })
                    } else {
                        serde_json::json!({ "support": { "title": format!("Support {i}") } })
                    };
                    repo.apply_patch(&patch(body), at(i)).await.unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let stored = repo.get().await.unwrap();
        assert!(stored.hero.title.starts_with("Title "));
        assert!(stored.support.title.starts_with("Support "));
    }
}

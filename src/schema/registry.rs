use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::db::homepage::defaults;
use crate::error::AppError;
use crate::models::timestamp;
use crate::policy::access::Collection;

/// Kind of a declared field, as shown to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    Text,
    Textarea,
    RichText,
    Number,
    Checkbox,
    Date,
    Relationship,
    Upload,
    Array,
    Group,
    Select,
}

/// Whether a payload is a whole new document or a partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Declaration of a single field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub unique: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation_to: Option<&'static str>,
    #[serde(skip_serializing_if = "is_false")]
    pub has_many: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSpec>,
}

impl FieldSpec {
    fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            unique: false,
            max_length: None,
            min_rows: None,
            max_rows: None,
            relation_to: None,
            has_many: false,
            options: Vec::new(),
            default_value: None,
            fields: Vec::new(),
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn textarea(name: &'static str) -> Self {
        Self::new(name, FieldKind::Textarea)
    }

    pub fn rich_text(name: &'static str) -> Self {
        Self::new(name, FieldKind::RichText)
    }

    pub fn number(name: &'static str) -> Self {
        Self::new(name, FieldKind::Number)
    }

    pub fn checkbox(name: &'static str) -> Self {
        Self::new(name, FieldKind::Checkbox)
    }

    pub fn date(name: &'static str) -> Self {
        Self::new(name, FieldKind::Date)
    }

    pub fn relationship(name: &'static str, relation_to: &'static str) -> Self {
        let mut field = Self::new(name, FieldKind::Relationship);
        field.relation_to = Some(relation_to);
        field
    }

    /// Reference to a media document.
    pub fn upload(name: &'static str) -> Self {
        let mut field = Self::new(name, FieldKind::Upload);
        field.relation_to = Some("media");
        field
    }

    pub fn select(name: &'static str, options: &[&'static str]) -> Self {
        let mut field = Self::new(name, FieldKind::Select);
        field.options = options.to_vec();
        field
    }

    pub fn array(name: &'static str, fields: Vec<FieldSpec>) -> Self {
        let mut field = Self::new(name, FieldKind::Array);
        field.fields = fields;
        field
    }

    pub fn group(name: &'static str, fields: Vec<FieldSpec>) -> Self {
        let mut field = Self::new(name, FieldKind::Group);
        field.fields = fields;
        field
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn has_many(mut self) -> Self {
        self.has_many = true;
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn rows(mut self, min: usize, max: usize) -> Self {
        self.min_rows = Some(min);
        self.max_rows = Some(max);
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    fn is_textual(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::Text
                | FieldKind::Textarea
                | FieldKind::RichText
                | FieldKind::Date
                | FieldKind::Select
                | FieldKind::Upload
                | FieldKind::Relationship
        )
    }

    fn check(&self, path: &str, value: Option<&Value>, mode: Mode, errors: &mut Vec<String>) {
        let value = match value {
            None => {
                if self.required && mode == Mode::Create {
                    errors.push(format!("{path}: This field is required"));
                }
                return;
            }
            Some(Value::Null) => {
                if self.required {
                    errors.push(format!("{path}: This field is required"));
                }
                return;
            }
            Some(value) => value,
        };

        if self.has_many {
            let Some(items) = value.as_array() else {
                errors.push(format!("{path}: Expected a list"));
                return;
            };
            let single = Self {
                has_many: false,
                required: false,
                ..self.clone()
            };
            for (i, item) in items.iter().enumerate() {
                single.check(&format!("{path}[{i}]"), Some(item), mode, errors);
            }
            return;
        }

        if self.is_textual() {
            let Some(text) = value.as_str() else {
                errors.push(format!("{path}: Expected a string"));
                return;
            };
            if self.required && text.trim().is_empty() {
                errors.push(format!("{path}: This field is required"));
                return;
            }
            if let Some(max) = self.max_length {
                if text.chars().count() > max {
                    errors.push(format!("{path}: Must be at most {max} characters"));
                }
            }
            match self.kind {
                FieldKind::Select if !self.options.iter().any(|o| *o == text) => errors.push(format!(
                    "{path}: Must be one of {}",
                    self.options.join(", ")
                )),
                FieldKind::Date if timestamp::parse(text).is_none() => {
                    errors.push(format!("{path}: Expected an RFC 3339 timestamp"))
                }
                FieldKind::Upload | FieldKind::Relationship if !is_reference(text) => {
                    errors.push(format!("{path}: Malformed reference '{text}'"))
                }
                _ => {}
            }
            return;
        }

        match self.kind {
            FieldKind::Number => {
                if value.as_i64().is_none() {
                    errors.push(format!("{path}: Expected an integer"));
                }
            }
            FieldKind::Checkbox => {
                if !value.is_boolean() {
                    errors.push(format!("{path}: Expected true or false"));
                }
            }
            FieldKind::Array => {
                let Some(rows) = value.as_array() else {
                    errors.push(format!("{path}: Expected a list"));
                    return;
                };
                if let Some(min) = self.min_rows {
                    if rows.len() < min {
                        errors.push(format!("{path}: Requires at least {min} rows"));
                    }
                }
                if let Some(max) = self.max_rows {
                    if rows.len() > max {
                        errors.push(format!("{path}: Allows at most {max} rows"));
                    }
                }
                // rows are always whole objects
                for (i, row) in rows.iter().enumerate() {
                    check_object(&self.fields, &format!("{path}[{i}]"), row, Mode::Create, errors);
                }
            }
            FieldKind::Group => check_object(&self.fields, path, value, mode, errors),
            _ => {}
        }
    }

    fn fill_defaults(&self, object: &mut Map<String, Value>) {
        match object.get_mut(self.name) {
            Some(Value::Object(inner)) if self.kind == FieldKind::Group => {
                for field in &self.fields {
                    field.fill_defaults(inner);
                }
            }
            Some(Value::Null) | None => {
                if let Some(default) = &self.default_value {
                    object.insert(self.name.to_string(), default.clone());
                } else if self.kind == FieldKind::Group {
                    let mut inner = Map::new();
                    for field in &self.fields {
                        field.fill_defaults(&mut inner);
                    }
                    object.insert(self.name.to_string(), Value::Object(inner));
                }
            }
            Some(_) => {}
        }
    }
}

/// Ids are opaque, but never blank and never contain whitespace.
fn is_reference(id: &str) -> bool {
    !id.is_empty() && !id.chars().any(char::is_whitespace)
}

fn check_object(
    fields: &[FieldSpec],
    prefix: &str,
    value: &Value,
    mode: Mode,
    errors: &mut Vec<String>,
) {
    let Some(object) = value.as_object() else {
        errors.push(format!("{prefix}: Expected an object"));
        return;
    };
    for field in fields {
        let path = if prefix.is_empty() {
            field.name.to_string()
        } else {
            format!("{prefix}.{}", field.name)
        };
        field.check(&path, object.get(field.name), mode, errors);
    }
}

/// Field declarations of one collection or global.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSchema {
    pub slug: &'static str,
    pub timestamps: bool,
    pub fields: Vec<FieldSpec>,
}

impl CollectionSchema {
    /// Check a payload against the declarations.
    ///
    /// On create every required field must be present and non-empty; on
    /// update only supplied fields are checked. All failures are reported
    /// together.
    pub fn validate(&self, value: &Value, mode: Mode) -> Result<(), AppError> {
        if !value.is_object() {
            return Err(AppError::Validation("Expected a JSON object".into()));
        }
        let mut errors = Vec::new();
        check_object(&self.fields, "", value, mode, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "The following fields are invalid: {}",
                errors.join("; ")
            )))
        }
    }

    /// Fill absent fields with their declared default.
    pub fn apply_defaults(&self, value: &mut Value) {
        if let Value::Object(object) = value {
            for field in &self.fields {
                field.fill_defaults(object);
            }
        }
    }

    /// Top-level fields the store must index uniquely.
    pub fn unique_fields(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.unique)
            .map(|f| f.name)
            .collect()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

pub const EXCERPT_MAX_LENGTH: usize = 320;

pub fn articles() -> CollectionSchema {
    CollectionSchema {
        slug: "blogs",
        timestamps: true,
        fields: vec![
            FieldSpec::text("title").required(),
            FieldSpec::text("slug").required().unique(),
            FieldSpec::relationship("author", "users").required(),
            FieldSpec::relationship("categories", "categories").has_many(),
            FieldSpec::upload("featuredImage"),
            FieldSpec::textarea("excerpt").max_length(EXCERPT_MAX_LENGTH),
            FieldSpec::rich_text("content").required(),
            FieldSpec::date("publishedAt"),
            FieldSpec::select("status", &["draft", "published"]).default_value(json!("draft")),
        ],
    }
}

pub fn gallery() -> CollectionSchema {
    CollectionSchema {
        slug: "gallery",
        timestamps: true,
        fields: vec![
            FieldSpec::text("title").required(),
            FieldSpec::upload("photo").required(),
            FieldSpec::textarea("description"),
            FieldSpec::checkbox("featured").default_value(json!(false)),
            FieldSpec::number("sortOrder").default_value(json!(0)),
        ],
    }
}

pub fn sessions() -> CollectionSchema {
    CollectionSchema {
        slug: "sessions",
        timestamps: true,
        fields: vec![
            FieldSpec::text("title").required(),
            FieldSpec::text("slug").required().unique(),
            FieldSpec::textarea("shortDescription")
                .required()
                .max_length(EXCERPT_MAX_LENGTH),
            FieldSpec::rich_text("description").required(),
            FieldSpec::text("duration").required(),
            FieldSpec::upload("heroImage"),
            FieldSpec::checkbox("isActive").default_value(json!(true)),
        ],
    }
}

pub fn media() -> CollectionSchema {
    CollectionSchema {
        slug: "media",
        timestamps: true,
        fields: vec![
            FieldSpec::text("filename").required(),
            FieldSpec::text("mimeType").required(),
            FieldSpec::number("filesize").required(),
            FieldSpec::text("alt"),
            FieldSpec::text("url").required(),
        ],
    }
}

pub fn users() -> CollectionSchema {
    CollectionSchema {
        slug: "users",
        timestamps: false,
        fields: vec![
            FieldSpec::text("email").required().unique(),
            FieldSpec::select("roles", &["admin", "editor"]).has_many(),
        ],
    }
}

/// Navigation entries shown when nothing has been configured.
pub const DEFAULT_NAVIGATION: [(&str, &str); 6] = [
    ("Home", "/"),
    ("About Me", "/about"),
    ("Sessions", "/sessions"),
    ("Gallery", "/gallery"),
    ("Blog", "/blogs"),
    ("Contact", "/contact"),
];

/// The five elements as `(name, trait, description)`.
pub const DEFAULT_ELEMENTS: [(&str, &str, &str); 5] = [
    (
        "Earth",
        "Foundation",
        "The stability and support that roots you in safety, belonging, and the physical body.",
    ),
    (
        "Fire",
        "Transformation",
        "The life force and passion that illuminates your direction and transforms stagnation into inspiration.",
    ),
    (
        "Water",
        "Flow",
        "The intuitive movement that allows emotions to cleanse and reshape your experience without force.",
    ),
    (
        "Air",
        "Clarity",
        "The breath and perspective that creates space for understanding and clear awareness.",
    ),
    (
        "Ether",
        "Space",
        "The silence and unity that connects you to the vastness of consciousness itself.",
    ),
];

pub fn default_navigation() -> Value {
    Value::Array(
        DEFAULT_NAVIGATION
            .iter()
            .map(|(label, href)| json!({ "label": label, "href": href }))
            .collect(),
    )
}

pub fn default_elements() -> Value {
    Value::Array(
        DEFAULT_ELEMENTS
            .iter()
            .map(|(name, trait_, description)| {
                json!({ "name": name, "trait": trait_, "description": description })
            })
            .collect(),
    )
}

pub fn homepage() -> CollectionSchema {
    CollectionSchema {
        slug: "homepage",
        timestamps: false,
        fields: vec![
            FieldSpec::array(
                "navigation",
                vec![
                    FieldSpec::text("label").required(),
                    FieldSpec::text("href").required(),
                ],
            )
            .rows(1, 8)
            .default_value(default_navigation()),
            FieldSpec::group(
                "hero",
                vec![
                    FieldSpec::text("kicker").default_value(json!(defaults::HERO_KICKER)),
                    FieldSpec::text("title")
                        .required()
                        .default_value(json!(defaults::HERO_TITLE)),
                    FieldSpec::textarea("description")
                        .required()
                        .default_value(json!(defaults::HERO_DESCRIPTION)),
                    FieldSpec::text("learnMoreLabel")
                        .default_value(json!(defaults::LEARN_MORE_LABEL)),
                    FieldSpec::text("learnMoreHref").default_value(json!(defaults::LEARN_MORE_HREF)),
                    FieldSpec::text("sessionCtaLabel")
                        .default_value(json!(defaults::SESSION_CTA_LABEL)),
                    FieldSpec::text("sessionCtaUrl"),
                    FieldSpec::upload("heroImage"),
                ],
            ),
            FieldSpec::group(
                "intro",
                vec![
                    FieldSpec::text("title")
                        .required()
                        .default_value(json!(defaults::INTRO_TITLE)),
                    FieldSpec::textarea("description")
                        .required()
                        .default_value(json!(defaults::INTRO_DESCRIPTION)),
                ],
            ),
            FieldSpec::array(
                "elements",
                vec![
                    FieldSpec::text("name").required(),
                    FieldSpec::text("trait").required(),
                    FieldSpec::textarea("description").required(),
                ],
            )
            .rows(1, 8)
            .default_value(default_elements()),
            FieldSpec::group(
                "unionSection",
                vec![
                    FieldSpec::text("title")
                        .required()
                        .default_value(json!(defaults::UNION_TITLE)),
                    FieldSpec::textarea("description")
                        .required()
                        .default_value(json!(defaults::UNION_DESCRIPTION)),
                ],
            ),
            FieldSpec::group(
                "support",
                vec![
                    FieldSpec::text("title")
                        .required()
                        .default_value(json!(defaults::SUPPORT_TITLE)),
                    FieldSpec::textarea("description")
                        .required()
                        .default_value(json!(defaults::SUPPORT_DESCRIPTION)),
                    FieldSpec::text("donationLabel").default_value(json!(defaults::DONATION_LABEL)),
                    FieldSpec::text("donationUrl"),
                    FieldSpec::text("socialLinksText")
                        .default_value(json!(defaults::SOCIAL_LINKS_TEXT)),
                    FieldSpec::upload("supportImage"),
                ],
            ),
        ],
    }
}

/// Look up the declarations served for a collection.
pub fn schema_for(collection: Collection) -> CollectionSchema {
    match collection {
        Collection::Articles => articles(),
        Collection::Gallery => gallery(),
        Collection::Sessions => sessions(),
        Collection::Media => media(),
        Collection::Users => users(),
        Collection::Homepage => homepage(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation_message(result: Result<(), AppError>) -> String {
        match result {
            Err(AppError::Validation(msg)) => msg,
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[test]
    fn test_create_requires_fields() {
        let msg = validation_message(articles().validate(&json!({ "title": "x" }), Mode::Create));
        assert!(msg.contains("slug: This field is required"));
        assert!(msg.contains("content: This field is required"));
        assert!(!msg.contains("title:"));
    }

    #[test]
    fn test_update_checks_only_supplied_fields() {
        assert!(articles()
            .validate(&json!({ "excerpt": "short" }), Mode::Update)
            .is_ok());
        let msg = validation_message(articles().validate(&json!({ "title": "  " }), Mode::Update));
        assert!(msg.contains("title"));
    }

    #[test]
    fn test_max_length() {
        let long = "x".repeat(EXCERPT_MAX_LENGTH + 1);
        let msg = validation_message(articles().validate(&json!({ "excerpt": long }), Mode::Update));
        assert!(msg.contains("excerpt: Must be at most 320 characters"));

        let exact = "é".repeat(EXCERPT_MAX_LENGTH);
        assert!(articles()
            .validate(&json!({ "excerpt": exact }), Mode::Update)
            .is_ok());
    }

    #[test]
    fn test_kinds_are_checked() {
        let msg = validation_message(gallery().validate(
            &json!({ "title": "t", "photo": "m1", "featured": "yes", "sortOrder": 1.5 }),
            Mode::Create,
        ));
        assert!(msg.contains("featured: Expected true or false"));
        assert!(msg.contains("sortOrder: Expected an integer"));

        let msg = validation_message(
            articles().validate(&json!({ "status": "archived" }), Mode::Update),
        );
        assert!(msg.contains("status: Must be one of draft, published"));
    }

    #[test]
    fn test_malformed_references() {
        let msg = validation_message(gallery().validate(
            &json!({ "title": "t", "photo": "not an id" }),
            Mode::Create,
        ));
        assert!(msg.contains("photo: Malformed reference"));

        let msg = validation_message(
            articles().validate(&json!({ "categories": ["c1", 7] }), Mode::Update),
        );
        assert!(msg.contains("categories[1]: Expected a string"));

        let msg = validation_message(
            articles().validate(&json!({ "categories": "c1" }), Mode::Update),
        );
        assert!(msg.contains("categories: Expected a list"));
    }

    #[test]
    fn test_row_bounds_and_nested_paths() {
        let nine: Vec<Value> = (0..9)
            .map(|i| json!({ "label": format!("L{i}"), "href": "/" }))
            .collect();
        let msg = validation_message(
            homepage().validate(&json!({ "navigation": nine }), Mode::Update),
        );
        assert!(msg.contains("navigation: Allows at most 8 rows"));

        let msg = validation_message(homepage().validate(
            &json!({ "navigation": [], "elements": [{ "name": "Earth" }] }),
            Mode::Update,
        ));
        assert!(msg.contains("navigation: Requires at least 1 rows"));
        assert!(msg.contains("elements[0].trait: This field is required"));

        let msg = validation_message(
            homepage().validate(&json!({ "hero": { "title": "" } }), Mode::Update),
        );
        assert!(msg.contains("hero.title"));
    }

    #[test]
    fn test_apply_defaults() {
        let mut doc = json!({ "title": "t", "photo": "m1" });
        gallery().apply_defaults(&mut doc);
        assert_eq!(doc["featured"], json!(false));
        assert_eq!(doc["sortOrder"], json!(0));

        let mut doc = json!({ "isActive": false });
        sessions().apply_defaults(&mut doc);
        assert_eq!(doc["isActive"], json!(false));
    }

    #[test]
    fn test_homepage_defaults_are_valid() {
        let mut doc = json!({});
        let schema = homepage();
        schema.apply_defaults(&mut doc);
        assert_eq!(doc["navigation"].as_array().unwrap().len(), 6);
        assert_eq!(doc["elements"][4]["name"], json!("Ether"));
        assert_eq!(doc["hero"]["learnMoreHref"], json!("/about"));
        assert!(doc["hero"].get("sessionCtaUrl").is_none());
        assert!(schema.validate(&doc, Mode::Create).is_ok());
    }

    #[test]
    fn test_apply_defaults_fills_partial_groups() {
        let mut doc = json!({ "hero": { "title": "Custom" } });
        homepage().apply_defaults(&mut doc);
        assert_eq!(doc["hero"]["title"], json!("Custom"));
        assert_eq!(doc["hero"]["kicker"], json!("Christos Medicine"));
    }

    #[test]
    fn test_unique_fields() {
        assert_eq!(articles().unique_fields(), vec!["slug"]);
        assert_eq!(sessions().unique_fields(), vec!["slug"]);
        assert!(gallery().unique_fields().is_empty());
    }

    #[test]
    fn test_schema_serialization() {
        let value = serde_json::to_value(schema_for(Collection::Sessions)).unwrap();
        assert_eq!(value["slug"], json!("sessions"));
        assert_eq!(value["fields"][1]["name"], json!("slug"));
        assert_eq!(value["fields"][1]["unique"], json!(true));
        assert_eq!(value["fields"][2]["maxLength"], json!(320));
        assert_eq!(value["fields"][3]["type"], json!("richText"));
    }

    #[test]
    fn test_non_object_payload() {
        let msg = validation_message(articles().validate(&json!([1, 2]), Mode::Create));
        assert_eq!(msg, "Expected a JSON object");
    }
}

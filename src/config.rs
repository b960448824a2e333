use ::config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Which document store backs the collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongo,
    Memory,
}

/// Which object store keeps uploaded media bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaBackend {
    S3,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub mongodb_uri: String,
    pub mongodb_database: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub backend: MediaBackend,
    pub s3_bucket: String,
    /// Custom endpoint for MinIO / LocalStack.
    #[serde(default)]
    pub s3_endpoint: Option<String>,
    #[serde(default)]
    pub s3_region: Option<String>,
}

/// Settings injected into the presentation layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Public base URL of the CMS, used to absolutize relative media URLs.
    #[serde(default)]
    pub base_url: Option<String>,
    /// When set, pages fetch content over HTTP from this CMS instead of the local store.
    #[serde(default)]
    pub cms_url: Option<String>,
    /// Fallback target of the donation button.
    #[serde(default)]
    pub donation_url: Option<String>,
    /// Fallback target of the healing session payment button.
    #[serde(default)]
    pub session_payment_url: Option<String>,
}

/// A sign-in account. The password is stored as an Argon2 PHC string
/// (`$argon2id$v=19$...`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign session cookies.
    pub cookie_secret: String,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server_addr: String,
    /// Enables the built-in accounts and seeds sample content into an empty store.
    pub demo_mode: bool,
    pub store: StoreConfig,
    pub media: MediaConfig,
    #[serde(default)]
    pub site: SiteConfig,
    pub auth: AuthConfig,
}

pub const DEFAULT_COOKIE_SECRET: &str = "christos-development-cookie-secret";

/// Session cookie keys are derived from at least this many bytes of secret.
pub const MIN_COOKIE_SECRET_LEN: usize = 32;

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:3000".to_string(),
            demo_mode: false,
            store: StoreConfig {
                backend: StoreBackend::Memory,
                mongodb_uri: "mongodb://localhost:27017".to_string(),
                mongodb_database: "christos".to_string(),
            },
            media: MediaConfig {
                backend: MediaBackend::Memory,
                s3_bucket: "christos-media".to_string(),
                s3_endpoint: None,
                s3_region: None,
            },
            site: SiteConfig::default(),
            auth: AuthConfig {
                cookie_secret: DEFAULT_COOKIE_SECRET.to_string(),
                accounts: Vec::new(),
            },
        }
    }
}

impl AppConfig {
    /// Load the configuration: built-in defaults, then an optional
    /// `christos.toml`, then `CHRISTOS__SECTION__KEY` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name("christos").required(false))
            .add_source(
                Environment::with_prefix("CHRISTOS")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with demo mode switched on.
    pub fn demo() -> Self {
        Self {
            demo_mode: true,
            ..Self::default()
        }
    }

    /// Reject settings that would make sessions forgeable.
    ///
    /// The development secret is only accepted in demo mode.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.cookie_secret.len() < MIN_COOKIE_SECRET_LEN {
            return Err(ConfigError::Message(format!(
                "auth.cookie_secret must be at least {} bytes long",
                MIN_COOKIE_SECRET_LEN
            )));
        }
        if self.uses_default_secret() && !self.demo_mode {
            return Err(ConfigError::Message(
                "auth.cookie_secret is the development default; set CHRISTOS__AUTH__COOKIE_SECRET or enable demo_mode".into(),
            ));
        }
        Ok(())
    }

    /// `true` when the cookie secret was left at its development default.
    pub fn uses_default_secret(&self) -> bool {
        self.auth.cookie_secret == DEFAULT_COOKIE_SECRET
    }
}

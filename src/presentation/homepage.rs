use serde::Serialize;
use serde_json::Value;

use crate::config::SiteConfig;
use crate::db::homepage::{defaults, Element, HomepageConfig, NavLink};

const FALLBACK_DONATION_HREF: &str = "/donation";
const FALLBACK_SESSION_HREF: &str = "/sessions";

/// Whether a link leaves the site.
pub fn is_external(href: &str) -> bool {
    href.starts_with("http://") || href.starts_with("https://")
}

/// Whether an href from the CMS may be rendered as a link: site-relative
/// paths, fragments, web and mail URLs. Anything else (`javascript:`,
/// `data:`, protocol-relative `//host`) is refused.
pub fn is_safe_href(href: &str) -> bool {
    let lower = href.trim_start().to_ascii_lowercase();
    (lower.starts_with('/') && !lower.starts_with("//"))
        || lower.starts_with('#')
        || lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("mailto:")
}

/// Public URL of a populated media object.
///
/// Absolute URLs are kept. Relative ones are joined onto `base_url` with a
/// single slash, or used as they are when there is no base URL. Anything
/// that is not an object with a non-empty `url` yields no image.
pub fn resolve_media_url(media: Option<&Value>, base_url: Option<&str>) -> Option<String> {
    let url = media?
        .as_object()?
        .get("url")?
        .as_str()
        .filter(|u| !u.is_empty())?;

    if is_external(url) {
        return Some(url.to_string());
    }
    match base_url.filter(|b| !b.is_empty()) {
        None => Some(url.to_string()),
        Some(base) => {
            let base = base.strip_suffix('/').unwrap_or(base);
            let separator = if url.starts_with('/') { "" } else { "/" };
            Some(format!("{base}{separator}{url}"))
        }
    }
}

/// A rendered link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkView {
    pub label: String,
    pub href: String,
    pub external: bool,
}

impl LinkView {
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        let href = href.into();
        Self {
            label: label.into(),
            external: is_external(&href),
            href,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementView {
    pub name: String,
    #[serde(rename = "trait")]
    pub trait_name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionView {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeroView {
    pub kicker: String,
    pub title: String,
    pub description: String,
    pub learn_more: LinkView,
    pub session_cta: LinkView,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupportView {
    pub title: String,
    pub description: String,
    pub donation: LinkView,
    pub social_links_text: String,
    pub image_url: Option<String>,
}

/// Everything the homepage template needs, defaults already applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomepageView {
    pub navigation: Vec<LinkView>,
    pub hero: HeroView,
    pub intro: SectionView,
    pub elements: Vec<ElementView>,
    pub union_section: SectionView,
    pub support: SupportView,
}

/// Non-empty string at `group.field` of the remote document.
fn remote_str<'a>(remote: Option<&'a Value>, group: &str, field: &str) -> Option<&'a str> {
    remote?
        .get(group)?
        .get(field)?
        .as_str()
        .filter(|s| !s.is_empty())
}

/// A remote field present as a string overrides the default.
fn merged(remote: Option<&Value>, group: &str, field: &str, default: &str) -> String {
    remote
        .and_then(|r| r.get(group))
        .and_then(|g| g.get(field))
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

/// An href configured in the CMS, unless it is blank, a `#` placeholder or unsafe.
fn cms_href<'a>(remote: Option<&'a Value>, group: &str, field: &str) -> Option<&'a str> {
    remote_str(remote, group, field).filter(|href| *href != "#" && is_safe_href(href))
}

fn configured(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn non_empty(row: &Value, key: &str) -> Option<String> {
    row.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn navigation(remote: Option<&Value>, defaults: &[NavLink]) -> Vec<LinkView> {
    match remote.and_then(|r| r.get("navigation")).and_then(Value::as_array) {
        Some(rows) => rows
            .iter()
            .filter_map(|row| {
                let href = non_empty(row, "href").filter(|href| is_safe_href(href))?;
                Some(LinkView::new(non_empty(row, "label")?, href))
            })
            .collect(),
        None => defaults
            .iter()
            .map(|link| LinkView::new(link.label.clone(), link.href.clone()))
            .collect(),
    }
}

fn elements(remote: Option<&Value>, defaults: &[Element]) -> Vec<ElementView> {
    match remote.and_then(|r| r.get("elements")).and_then(Value::as_array) {
        Some(rows) => rows
            .iter()
            .filter_map(|row| {
                Some(ElementView {
                    name: non_empty(row, "name")?,
                    trait_name: non_empty(row, "trait")?,
                    description: non_empty(row, "description")?,
                })
            })
            .collect(),
        None => defaults
            .iter()
            .map(|e| ElementView {
                name: e.name.clone(),
                trait_name: e.trait_name.clone(),
                description: e.description.clone(),
            })
            .collect(),
    }
}

/// The built-in navigation, for pages that do not load the homepage global.
pub fn default_navigation() -> Vec<LinkView> {
    navigation(None, &HomepageConfig::default().navigation)
}

/// Merge the remote homepage document (if any) over the built-in defaults.
pub fn build_homepage(remote: Option<&Value>, site: &SiteConfig) -> HomepageView {
    let defaults = HomepageConfig::default();
    let base_url = configured(&site.base_url);

    let session_href = cms_href(remote, "hero", "sessionCtaUrl")
        .or_else(|| configured(&site.session_payment_url))
        .unwrap_or(FALLBACK_SESSION_HREF);
    let donation_href = cms_href(remote, "support", "donationUrl")
        .or_else(|| configured(&site.donation_url))
        .unwrap_or(FALLBACK_DONATION_HREF);
    let learn_more_href = remote_str(remote, "hero", "learnMoreHref")
        .filter(|href| is_safe_href(href))
        .unwrap_or(defaults::LEARN_MORE_HREF);

    let hero = HeroView {
        kicker: merged(remote, "hero", "kicker", &defaults.hero.kicker),
        title: merged(remote, "hero", "title", &defaults.hero.title),
        description: merged(remote, "hero", "description", &defaults.hero.description),
        learn_more: LinkView::new(
            merged(remote, "hero", "learnMoreLabel", &defaults.hero.learn_more_label),
            learn_more_href,
        ),
        session_cta: LinkView::new(
            merged(remote, "hero", "sessionCtaLabel", &defaults.hero.session_cta_label),
            session_href,
        ),
        image_url: resolve_media_url(
            remote.and_then(|r| r.pointer("/hero/heroImage")),
            base_url,
        ),
    };

    let support = SupportView {
        title: merged(remote, "support", "title", &defaults.support.title),
        description: merged(remote, "support", "description", &defaults.support.description),
        donation: LinkView::new(
            merged(remote, "support", "donationLabel", &defaults.support.donation_label),
            donation_href,
        ),
        social_links_text: merged(
            remote,
            "support",
            "socialLinksText",
            &defaults.support.social_links_text,
        ),
        image_url: resolve_media_url(
            remote.and_then(|r| r.pointer("/support/supportImage")),
            base_url,
        ),
    };

    HomepageView {
        navigation: navigation(remote, &defaults.navigation),
        hero,
        intro: SectionView {
            title: merged(remote, "intro", "title", &defaults.intro.title),
            description: merged(remote, "intro", "description", &defaults.intro.description),
        },
        elements: elements(remote, &defaults.elements),
        union_section: SectionView {
            title: merged(remote, "unionSection", "title", &defaults.union_section.title),
            description: merged(
                remote,
                "unionSection",
                "description",
                &defaults.union_section.description,
            ),
        },
        support,
    }
}

use serde::Serialize;
use tera::{Context, Tera};

use crate::error::AppError;

/// Page templates compiled into the binary.
const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("home.html", include_str!("../../templates/home.html")),
    ("blogs.html", include_str!("../../templates/blogs.html")),
    ("blog.html", include_str!("../../templates/blog.html")),
    ("gallery.html", include_str!("../../templates/gallery.html")),
    ("sessions.html", include_str!("../../templates/sessions.html")),
    ("placeholder.html", include_str!("../../templates/placeholder.html")),
    (
        "dashboard_blogs.html",
        include_str!("../../templates/dashboard_blogs.html"),
    ),
    (
        "dashboard_gallery.html",
        include_str!("../../templates/dashboard_gallery.html"),
    ),
    ("error.html", include_str!("../../templates/error.html")),
];

/// The Tera environment used by the public pages.
///
/// Every template name ends in `.html`, so Tera escapes all interpolated
/// values unless a template opts out with `| safe`.
pub struct Templates {
    tera: Tera,
}

impl Templates {
    pub fn new() -> Result<Self, AppError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.to_vec())?;
        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, context: &Context) -> Result<String, AppError> {
        Ok(self.tera.render(name, context)?)
    }

    /// Render with a context built from a serializable value.
    pub fn render_value<T: Serialize>(&self, name: &str, value: &T) -> Result<String, AppError> {
        let context = Context::from_serialize(value)?;
        self.render(name, &context)
    }
}

use serde::{Deserialize, Serialize};

/// Selector rules for one known page template.
///
/// `container` locates the repeating article element; the other selectors are
/// evaluated inside each container. `link` and `title` are required per
/// container, the rest are best-effort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutDefinition {
    pub name: String,
    pub container: String,
    pub link: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl LayoutDefinition {
    pub fn new(name: &str, container: &str, link: &str, title: &str) -> Self {
        Self {
            name: name.to_string(),
            container: container.to_string(),
            link: link.to_string(),
            title: title.to_string(),
            description: None,
            image: None,
            date: None,
        }
    }

    pub fn with_description(mut self, selector: &str) -> Self {
        self.description = Some(selector.to_string());
        self
    }

    pub fn with_image(mut self, selector: &str) -> Self {
        self.image = Some(selector.to_string());
        self
    }

    pub fn with_date(mut self, selector: &str) -> Self {
        self.date = Some(selector.to_string());
        self
    }
}

/// Built-in layouts, most specific first.
pub fn default_layouts() -> Vec<LayoutDefinition> {
    vec![
        // Elementor post grid used on the blog home and category pages
        LayoutDefinition::new(
            "home",
            "article.elementor-post",
            ".elementor-post__title a",
            ".elementor-post__title",
        )
        .with_description(".elementor-post__excerpt p")
        .with_image(".elementor-post__thumbnail img")
        .with_date(".elementor-post-date"),
        // Theme archive template, served for ?s= search results
        LayoutDefinition::new(
            "search",
            "article.post, article.type-post",
            ".entry-title a",
            ".entry-title",
        )
        .with_description(".entry-summary p, .entry-summary")
        .with_image("img")
        .with_date("time"),
        LayoutDefinition::new("generic", "article", "h2 a, h3 a, a[href]", "h2, h3")
            .with_description("p")
            .with_image("img"),
    ]
}

use nr_core::{ArticleRecord, Error, LayoutDefinition, Result, ScrapeConfig};
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::extract;

/// A layout definition with its selectors parsed.
#[derive(Debug)]
pub struct CompiledLayout {
    pub(crate) name: String,
    pub(crate) container: Selector,
    pub(crate) link: Selector,
    pub(crate) title: Selector,
    pub(crate) description: Option<Selector>,
    pub(crate) image: Option<Selector>,
    pub(crate) date: Option<Selector>,
}

impl CompiledLayout {
    pub fn compile(definition: &LayoutDefinition) -> Result<Self> {
        let parse = |field: &str, selector: &str| -> Result<Selector> {
            Selector::parse(selector).map_err(|e| {
                Error::InvalidSelector(format!(
                    "layout {} {} selector {:?}: {}",
                    definition.name, field, selector, e
                ))
            })
        };
        let parse_opt = |field: &str, selector: &Option<String>| -> Result<Option<Selector>> {
            selector
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse(field, s))
                .transpose()
        };

        Ok(Self {
            name: definition.name.clone(),
            container: parse("container", &definition.container)?,
            link: parse("link", &definition.link)?,
            title: parse("title", &definition.title)?,
            description: parse_opt("description", &definition.description)?,
            image: parse_opt("image", &definition.image)?,
            date: parse_opt("date", &definition.date)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The layout that produced records for a document.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutMatch {
    pub layout: String,
    pub records: Vec<ArticleRecord>,
}

/// Tries layouts in priority order; the first one that yields a record wins.
#[derive(Debug)]
pub struct LayoutMatcher {
    layouts: Vec<CompiledLayout>,
    base: Url,
    max_records: usize,
}

impl LayoutMatcher {
    pub fn new(definitions: &[LayoutDefinition], base: Url, max_records: usize) -> Result<Self> {
        let layouts = definitions
            .iter()
            .map(CompiledLayout::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            layouts,
            base,
            max_records,
        })
    }

    pub fn from_config(config: &ScrapeConfig) -> Result<Self> {
        Self::new(&config.layouts, config.base_url()?, config.max_records)
    }

    pub fn layout_names(&self) -> Vec<&str> {
        self.layouts.iter().map(|l| l.name()).collect()
    }

    pub fn match_document(&self, document: &Html) -> Option<LayoutMatch> {
        for layout in &self.layouts {
            if document.select(&layout.container).next().is_none() {
                continue;
            }
            let records = extract::extract_records(document, layout, &self.base, self.max_records);
            if records.is_empty() {
                debug!(layout = %layout.name, "Containers matched but no well-formed records");
                continue;
            }
            return Some(LayoutMatch {
                layout: layout.name.clone(),
                records,
            });
        }
        None
    }

    /// Parses `markup` and matches it. The parsed document never outlives this call.
    pub fn match_markup(&self, markup: &str) -> Option<LayoutMatch> {
        let document = Html::parse_document(markup);
        self.match_document(&document)
    }
}

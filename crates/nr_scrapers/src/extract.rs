//! Turning matched containers into [`ArticleRecord`]s, plus article-body
//! extraction for the optional detail pass.

use lazy_static::lazy_static;
use nr_core::ArticleRecord;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use url::Url;

use crate::layouts::CompiledLayout;

lazy_static! {
    static ref PARAGRAPH: Selector = Selector::parse("p").unwrap();
}

/// Attributes that may carry an image location, in preference order.
/// Lazy-loading themes park a `data:` placeholder in `src`.
const IMAGE_ATTRIBUTES: [&str; 3] = ["src", "data-src", "data-lazy-src"];

/// Walks every container of `layout` in document order and keeps at most `cap`
/// well-formed records. Containers without a usable link or title are skipped.
pub fn extract_records(
    document: &Html,
    layout: &CompiledLayout,
    base: &Url,
    cap: usize,
) -> Vec<ArticleRecord> {
    document
        .select(&layout.container)
        .filter_map(|container| extract_record(container, layout, base))
        .take(cap)
        .collect()
}

fn extract_record(container: ElementRef, layout: &CompiledLayout, base: &Url) -> Option<ArticleRecord> {
    let link = container.select(&layout.link).next()?;
    let url = normalize_url(link.value().attr("href")?, base)?;

    let title = clean_text(container.select(&layout.title).next()?);
    if title.is_empty() {
        return None;
    }

    let description = layout
        .description
        .as_ref()
        .and_then(|selector| container.select(selector).next())
        .map(clean_text)
        .unwrap_or_default();

    let image = layout
        .image
        .as_ref()
        .and_then(|selector| container.select(selector).next())
        .and_then(|img| image_source(img, base))
        .unwrap_or_default();

    let date = layout
        .date
        .as_ref()
        .and_then(|selector| container.select(selector).next())
        .map(clean_text)
        .filter(|d| !d.is_empty());

    Some(ArticleRecord {
        title,
        url,
        description,
        image,
        date,
        content: None,
    })
}

/// Resolves `raw` against `base` unless it already carries a scheme.
/// Only `http`/`https` results are kept.
pub fn normalize_url(raw: &str, base: &Url) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }

    let resolved = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(raw).ok()?,
        Err(_) => return None,
    };

    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

/// Element text with tags dropped and whitespace runs collapsed.
pub fn clean_text(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn image_source(element: ElementRef, base: &Url) -> Option<String> {
    let attrs = element.value();
    IMAGE_ATTRIBUTES
        .iter()
        .filter_map(|name| attrs.attr(name))
        .chain(
            attrs
                .attr("srcset")
                .and_then(|srcset| srcset.split(',').next())
                .and_then(|candidate| candidate.split_whitespace().next()),
        )
        .find_map(|candidate| normalize_url(candidate, base))
}

/// The article body of a detail page: the element whose direct `<p>` children
/// carry the most text, its paragraphs joined by blank lines.
pub fn extract_body(document: &Html) -> Option<String> {
    let mut index = HashMap::new();
    let mut groups: Vec<(usize, Vec<String>)> = Vec::new();

    for paragraph in document.select(&PARAGRAPH) {
        let text = clean_text(paragraph);
        if text.is_empty() {
            continue;
        }
        let Some(parent) = paragraph.parent() else {
            continue;
        };
        let slot = *index.entry(parent.id()).or_insert_with(|| {
            groups.push((0, Vec::new()));
            groups.len() - 1
        });
        groups[slot].0 += text.len();
        groups[slot].1.push(text);
    }

    // rev() so ties go to the container seen first
    groups
        .into_iter()
        .rev()
        .max_by_key(|(len, _)| *len)
        .map(|(_, paragraphs)| paragraphs.join("\n\n"))
}

pub fn body_from_markup(markup: &str) -> Option<String> {
    let document = Html::parse_document(markup);
    extract_body(&document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nr_core::LayoutDefinition;

    fn base() -> Url {
        Url::parse("https://makeone.com.br").unwrap()
    }

    fn home_layout() -> CompiledLayout {
        CompiledLayout::compile(
            &LayoutDefinition::new(
                "home",
                "article.elementor-post",
                ".elementor-post__title a",
                ".elementor-post__title",
            )
            .with_description(".elementor-post__excerpt p")
            .with_image(".elementor-post__thumbnail img"),
        )
        .unwrap()
    }

    fn container(i: usize) -> String {
        format!(
            r#"<article class="elementor-post"><h3 class="elementor-post__title"><a href="/blog/post-{i}/">Post {i}</a></h3></article>"#
        )
    }

    #[test]
    fn test_normalize_url() {
        let base = base();
        assert_eq!(
            normalize_url("  /blog/rust/ ", &base).as_deref(),
            Some("https://makeone.com.br/blog/rust/")
        );
        assert_eq!(
            normalize_url("https://cdn.makeone.com.br/a.png", &base).as_deref(),
            Some("https://cdn.makeone.com.br/a.png")
        );
        assert_eq!(
            normalize_url("//cdn.makeone.com.br/b.png", &base).as_deref(),
            Some("https://cdn.makeone.com.br/b.png")
        );
        assert_eq!(
            normalize_url("blog/relativo", &base).as_deref(),
            Some("https://makeone.com.br/blog/relativo")
        );
        assert!(normalize_url("", &base).is_none());
        assert!(normalize_url("#comments", &base).is_none());
        assert!(normalize_url("javascript:void(0)", &base).is_none());
        assert!(normalize_url("mailto:contato@makeone.com.br", &base).is_none());
    }

    #[test]
    fn test_full_record_extraction() {
        let html = r#"
            <article class="elementor-post">
              <div class="elementor-post__thumbnail">
                <img src="data:image/svg+xml,%3Csvg%3E" data-src="/wp-content/uploads/capa.webp">
              </div>
              <h3 class="elementor-post__title">
                <a href=" /blog/automacao/ ">  Automação   <em>industrial</em> </a>
              </h3>
              <div class="elementor-post__excerpt"><p>Como <b>começar</b>
                 hoje.</p></div>
            </article>
        "#;
        let document = Html::parse_document(html);
        let records = extract_records(&document, &home_layout(), &base(), 15);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.title, "Automação industrial");
        assert_eq!(record.url, "https://makeone.com.br/blog/automacao/");
        assert_eq!(record.description, "Como começar hoje.");
        assert_eq!(record.image, "https://makeone.com.br/wp-content/uploads/capa.webp");
        assert!(record.content.is_none());
    }

    #[test]
    fn test_image_from_srcset() {
        let html = r#"
            <article class="elementor-post">
              <div class="elementor-post__thumbnail"><img srcset="/a-300.jpg 300w, /a-600.jpg 600w"></div>
              <h3 class="elementor-post__title"><a href="/blog/a/">A</a></h3>
            </article>
        "#;
        let document = Html::parse_document(html);
        let records = extract_records(&document, &home_layout(), &base(), 15);
        assert_eq!(records[0].image, "https://makeone.com.br/a-300.jpg");
    }

    #[test]
    fn test_missing_optional_fields_are_empty_strings() {
        let document = Html::parse_document(&container(1));
        let records = extract_records(&document, &home_layout(), &base(), 15);
        assert_eq!(records[0].description, "");
        assert_eq!(records[0].image, "");
    }

    #[test]
    fn test_malformed_containers_are_skipped_individually() {
        let html = format!(
            r#"{}
            <article class="elementor-post"><h3 class="elementor-post__title">No link here</h3></article>
            <article class="elementor-post"><h3 class="elementor-post__title"><a>No href</a></h3></article>
            <article class="elementor-post"><h3 class="elementor-post__title"><a href="/blog/vazio/">   </a></h3></article>
            <article class="elementor-post"><a class="elementor-post__title" href="mailto:x@y.z">Mail</a></article>
            {}"#,
            container(1),
            container(2)
        );
        let document = Html::parse_document(&html);
        let records = extract_records(&document, &home_layout(), &base(), 15);
        let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Post 1", "Post 2"]);
        assert!(records.iter().all(|r| !r.title.is_empty() && r.url.starts_with("http")));
    }

    #[test]
    fn test_cap_keeps_first_records_in_document_order() {
        let html: String = (1..=25).map(container).collect();
        let document = Html::parse_document(&html);
        let records = extract_records(&document, &home_layout(), &base(), 15);
        assert_eq!(records.len(), 15);
        assert_eq!(records[0].title, "Post 1");
        assert_eq!(records[14].title, "Post 15");
    }

    #[test]
    fn test_extract_body_picks_largest_paragraph_group() {
        let html = r#"
            <html><body>
              <footer><p>Rodapé</p></footer>
              <div class="entry-content">
                <p>Primeiro parágrafo do artigo.</p>
                <p></p>
                <p>Segundo   parágrafo.</p>
              </div>
              <aside><p>Leia também</p></aside>
            </body></html>
        "#;
        assert_eq!(
            body_from_markup(html).as_deref(),
            Some("Primeiro parágrafo do artigo.\n\nSegundo parágrafo.")
        );
    }

    #[test]
    fn test_extract_body_without_paragraphs() {
        assert!(body_from_markup("<html><body><div>Só texto</div></body></html>").is_none());
    }
}

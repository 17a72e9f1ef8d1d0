//! Article field extraction.
//!
//! Turns an article page into [`ArticleFields`] using a source's
//! [`SelectorConfig`]. A page whose title selector yields no text is not an
//! article (index pages, redirects, landing pages) and produces `None`, which
//! callers treat as a skip rather than a failure.

use crate::error::ConfigError;
use crate::models::{ArticleFields, SelectorConfig};
use crate::utils::collapse_whitespace;
use scraper::{ElementRef, Html, Selector};

/// A [`SelectorConfig`] with every selector parsed.
///
/// Compiling once per source keeps selector errors out of the per-article path.
#[derive(Debug)]
pub struct CompiledSelectors {
    title: Selector,
    author: Selector,
    content: Selector,
}

impl CompiledSelectors {
    pub fn compile(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            title: parse_selector("title_selector", &config.title_selector)?,
            author: parse_selector("author_selector", &config.author_selector)?,
            content: parse_selector("content_selector", &config.content_selector)?,
        })
    }
}

fn parse_selector(field: &'static str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        field,
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Extract title, author and body from an article page.
///
/// - title: the first match with non-blank text; none at all means `None`
/// - author: the first match with non-blank text, if any
/// - content: the text of every match in document order, one per line
///
/// Malformed markup is parsed best-effort and never fails.
pub fn extract(html: &str, selectors: &CompiledSelectors) -> Option<ArticleFields> {
    let document = Html::parse_document(html);

    let title = first_text(&document, &selectors.title)?;
    let author = first_text(&document, &selectors.author);
    let content = document
        .select(&selectors.content)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Some(ArticleFields {
        title,
        author,
        content,
    })
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(element_text)
        .find(|text| !text.is_empty())
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> CompiledSelectors {
        CompiledSelectors::compile(&SelectorConfig::default()).unwrap()
    }

    #[test]
    fn test_extracts_title_author_and_paragraphs() {
        let html = r#"
            <html><body><article>
              <h1>  Storm hits
                 the coast </h1>
              <span class="author">Jane Doe</span>
              <p>First paragraph.</p>
              <p>Second <b>bold</b> paragraph.</p>
            </article></body></html>
        "#;

        let fields = extract(html, &defaults()).unwrap();
        assert_eq!(fields.title, "Storm hits the coast");
        assert_eq!(fields.author.as_deref(), Some("Jane Doe"));
        assert_eq!(fields.content, "First paragraph.\nSecond bold paragraph.");
    }

    #[test]
    fn test_missing_title_is_not_an_article() {
        let html = "<html><body><p>Just a listing page</p></body></html>";
        assert!(extract(html, &defaults()).is_none());
    }

    #[test]
    fn test_blank_title_is_not_an_article() {
        let html = "<html><body><h1>   </h1><p>Body</p></body></html>";
        assert!(extract(html, &defaults()).is_none());
    }

    #[test]
    fn test_first_non_blank_heading_wins() {
        let html = "<article><h1></h1><h2>Real headline</h2><h3>Sub</h3></article>";
        let fields = extract(html, &defaults()).unwrap();
        assert_eq!(fields.title, "Real headline");
    }

    #[test]
    fn test_missing_author_is_none() {
        let html = "<article><h1>Headline</h1><p>Body</p></article>";
        let fields = extract(html, &defaults()).unwrap();
        assert_eq!(fields.author, None);
        assert_eq!(fields.content, "Body");
    }

    #[test]
    fn test_defaults_ignore_headings_outside_article() {
        let index = r#"
            <header><h1>Daily Planet</h1><span class="author">Staff</span></header>
            <section><h2>Latest</h2><p>Teaser one</p><p>Teaser two</p></section>
        "#;
        assert!(extract(index, &defaults()).is_none());

        let story = r#"
            <header><h1>Daily Planet</h1></header>
            <article><h2>Bridge reopens</h2><p>Traffic resumed.</p></article>
            <footer><p>Copyright</p></footer>
        "#;
        let fields = extract(story, &defaults()).unwrap();
        assert_eq!(fields.title, "Bridge reopens");
        assert_eq!(fields.author, None);
        assert_eq!(fields.content, "Traffic resumed.");
    }

    #[test]
    fn test_custom_selectors() {
        let config = SelectorConfig {
            title_selector: ".headline--lite".to_string(),
            author_selector: ".byline__name".to_string(),
            content_selector: ".article--lite p".to_string(),
        };
        let selectors = CompiledSelectors::compile(&config).unwrap();
        let html = r#"
            <h1>Site name</h1>
            <h2 class="headline--lite">Lite headline</h2>
            <div class="byline__name">By Sam</div>
            <p>navigation</p>
            <div class="article--lite"><p>One</p><p></p><p>Two</p></div>
        "#;

        let fields = extract(html, &selectors).unwrap();
        assert_eq!(fields.title, "Lite headline");
        assert_eq!(fields.author.as_deref(), Some("By Sam"));
        assert_eq!(fields.content, "One\nTwo");
    }

    #[test]
    fn test_malformed_html_is_best_effort() {
        let html = "<article><h1>Unclosed headline<p>dangling <div>paragraph";
        let fields = extract(html, &defaults()).unwrap();
        assert!(fields.title.starts_with("Unclosed headline"));
    }

    #[test]
    fn test_invalid_selector_is_config_error() {
        let config = SelectorConfig {
            content_selector: "p[".to_string(),
            ..SelectorConfig::default()
        };
        let err = CompiledSelectors::compile(&config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidSelector { field: "content_selector", .. }
        ));
    }
}

//! Rendered Swagger UI operation blocks.
//!
//! Swagger UI renders each operation as `.opblock` with method and path
//! children, and sprinkles zero-width spaces into long paths so they wrap.

use super::{Candidate, Extractor, Page};
use crate::endpoint::HttpMethod;
use scraper::{ElementRef, Selector};

/// Reads `.opblock` elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwaggerUiExtractor;

impl Extractor for SwaggerUiExtractor {
    fn name(&self) -> &'static str {
        "swagger-ui"
    }

    fn extract(&self, page: &Page) -> Vec<Candidate> {
        let (Ok(block), Ok(method), Ok(path), Ok(summary)) = (
            Selector::parse(".opblock"),
            Selector::parse(".opblock-summary-method"),
            Selector::parse(".opblock-summary-path, .opblock-summary-path__deprecated"),
            Selector::parse(".opblock-summary-description"),
        ) else {
            return Vec::new();
        };

        let mut found = Vec::new();
        for op in page.document().select(&block) {
            let Some(verb) = op
                .select(&method)
                .next()
                .and_then(|el| HttpMethod::parse(&text_of(el)))
            else {
                continue;
            };
            let Some(path_el) = op.select(&path).next() else {
                continue;
            };
            let raw = path_el
                .value()
                .attr("data-path")
                .map_or_else(|| text_of(path_el), |attr| attr.replace('\u{200b}', ""));
            if let Some(mut candidate) = Candidate::new(verb, &raw) {
                candidate.summary = op
                    .select(&summary)
                    .next()
                    .map(text_of)
                    .filter(|s| !s.is_empty());
                found.push(candidate);
            }
        }
        found
    }
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .replace('\u{200b}', "")
        .trim()
        .to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;

    #[test]
    fn test_opblocks() {
        let markup = "
            <div class=\"opblock opblock-post\">
              <div class=\"opblock-summary\">
                <span class=\"opblock-summary-method\">POST</span>
                <span class=\"opblock-summary-path\"><a><span>/store/\u{200b}order</span></a></span>
                <div class=\"opblock-summary-description\">Place an order</div>
              </div>
            </div>
            <div class=\"opblock opblock-get\">
              <span class=\"opblock-summary-method\">GET</span>
              <span class=\"opblock-summary-path\" data-path=\"/pet/{petId}\"></span>
            </div>";
        let found = SwaggerUiExtractor.extract(&Page::parse(markup));
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].path, "/store/order");
        assert_eq!(found[0].summary.as_deref(), Some("Place an order"));
        assert_eq!(found[1].method, HttpMethod::Get);
        assert_eq!(found[1].path, "/pet/{petId}");
        assert!(found[1].summary.is_none());
    }

    #[test]
    fn test_plain_page_yields_nothing() {
        let found = SwaggerUiExtractor.extract(&Page::parse("<p>GET /users</p>"));
        assert!(found.is_empty());
    }
}

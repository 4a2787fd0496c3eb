//! Table rows pairing a method cell with a path cell.

use super::{Candidate, Extractor, Page};
use crate::endpoint::HttpMethod;
use scraper::{ElementRef, Selector};

/// Pairs every method cell with every path cell in the same `<tr>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableExtractor;

impl Extractor for TableExtractor {
    fn name(&self) -> &'static str {
        "table"
    }

    fn extract(&self, page: &Page) -> Vec<Candidate> {
        let (Ok(rows), Ok(cells)) = (Selector::parse("tr"), Selector::parse("td, th")) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        for row in page.document().select(&rows) {
            let texts: Vec<String> = row.select(&cells).map(cell_text).collect();
            let methods: Vec<HttpMethod> = texts
                .iter()
                .filter(|t| !t.contains(char::is_whitespace))
                .filter_map(|t| HttpMethod::parse(t))
                .collect();
            for method in methods {
                found.extend(
                    texts
                        .iter()
                        .filter(|t| t.starts_with('/'))
                        .filter_map(|t| Candidate::new(method, t)),
                );
            }
        }
        found
    }
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

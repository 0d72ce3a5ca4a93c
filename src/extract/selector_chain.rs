use crate::common::error::{Result, ScraperError};
use scraper::{ElementRef, Selector};
use tracing::trace;

/// Ordered CSS selectors tried until one matches.
///
/// The first selector that matches anything wins; there is no scoring of
/// match quality.
#[derive(Debug, Clone)]
pub struct SelectorChain {
    entries: Vec<(String, Selector)>,
}

impl SelectorChain {
    pub fn new<S: AsRef<str>>(selectors: &[S]) -> Result<Self> {
        let entries = selectors
            .iter()
            .map(|raw| {
                let raw = raw.as_ref();
                Selector::parse(raw)
                    .map(|selector| (raw.to_string(), selector))
                    .map_err(|e| ScraperError::Selector(format!("'{raw}': {e:?}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// First element matched by the first selector that matches anything
    pub fn first<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.entries.iter().find_map(|(raw, selector)| {
            let found = scope.select(selector).next();
            if found.is_some() {
                trace!(selector = %raw, "selector matched");
            }
            found
        })
    }

    /// Every element matched by the first selector that matches anything
    pub fn all<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        for (raw, selector) in &self.entries {
            let found: Vec<_> = scope.select(selector).collect();
            if !found.is_empty() {
                trace!(selector = %raw, count = found.len(), "selector matched");
                return found;
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    const PAGE: &str = r#"
        <html><body>
          <div class="item"><span class="name">First</span></div>
          <div class="item"><span class="name">Second</span></div>
          <div class="product-card"><h2>Card</h2></div>
        </body></html>
    "#;

    #[test]
    fn test_first_matching_selector_wins() {
        let document = Html::parse_document(PAGE);
        let chain = SelectorChain::new(&[".missing", "div.item", "div.product-card"]).unwrap();
        let found = chain.all(document.root_element());
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_first_element() {
        let document = Html::parse_document(PAGE);
        let chain = SelectorChain::new(&["h3", ".name"]).unwrap();
        let el = chain.first(document.root_element()).unwrap();
        assert_eq!(el.text().collect::<String>(), "First");
    }

    #[test]
    fn test_no_match() {
        let document = Html::parse_document(PAGE);
        let chain = SelectorChain::new(&["table", "ul li"]).unwrap();
        assert!(chain.first(document.root_element()).is_none());
        assert!(chain.all(document.root_element()).is_empty());
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let err = SelectorChain::new(&["div..broken["]).unwrap_err();
        assert!(matches!(err, ScraperError::Selector(_)));
    }
}

use crate::common::error::{Result, ScraperError};
use regex::{Captures, Regex};

/// Ordered regular expressions tried until one matches.
///
/// Patterns are compiled case-insensitive with `.` matching newlines, which is
/// what raw-markup matching needs.
#[derive(Debug, Clone)]
pub struct RegexChain {
    patterns: Vec<Regex>,
}

impl RegexChain {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|raw| {
                Regex::new(&format!("(?is){}", raw.as_ref()))
                    .map_err(|e| ScraperError::Selector(format!("'{}': {e}", raw.as_ref())))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn patterns(&self) -> impl Iterator<Item = &Regex> {
        self.patterns.iter()
    }

    /// Captures of the first pattern that matches
    pub fn first_captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.patterns.iter().find_map(|re| re.captures(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_pattern_with_result_wins() {
        let chain = RegexChain::new(&[r"<h1>(.*?)</h1>", r"<title>(.*?)</title>"]).unwrap();
        let text = "<TITLE>Shop</TITLE>";
        let caps = chain.first_captures(text).unwrap();
        assert_eq!(&caps[1], "Shop");
    }

    #[test]
    fn test_patterns_span_lines() {
        let chain = RegexChain::new(&[r"<li>(.*?)</li>"]).unwrap();
        let caps = chain.first_captures("<LI>a\nb</LI><li>c</li>").unwrap();
        assert_eq!(&caps[1], "a\nb");
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(RegexChain::new(&["(unclosed"]).is_err());
    }
}

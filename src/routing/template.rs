//! URL templates with `{name}` placeholders.
//!
//! # Responsibilities
//! - Compile a template once into an anchored regex
//! - Record placeholder names in declaration order
//! - Precompute the priority metrics used for tie-breaking
//!
//! # Design Decisions
//! - Specificity (total literal length) and parameter count are cached at
//!   registration time, never recomputed per lookup
//! - Placeholders match a single path segment (`[^/]+`)
//! - Selection order: higher specificity, then fewer parameters, then
//!   declaration order

use regex::Regex;

use crate::routing::RoutingError;

/// A compiled URL template such as `/users/{id}/posts/{post}`.
#[derive(Debug)]
pub struct UrlTemplate {
    /// Original template text, kept for diagnostics.
    pattern: String,

    /// Anchored matcher with one capture group per placeholder.
    regex: Regex,

    /// Placeholder names, in the order they appear in the template.
    param_names: Vec<String>,

    /// Total length of literal (non-placeholder) text.
    specificity: usize,
}

impl UrlTemplate {
    /// Compile a template. Fails on unbalanced or empty placeholders.
    pub fn compile(template: &str) -> Result<Self, RoutingError> {
        let mut pattern = String::from("^");
        let mut param_names = Vec::new();
        let mut specificity = 0usize;

        let mut rest = template;
        while let Some(open) = rest.find('{') {
            let (literal, tail) = rest.split_at(open);
            pattern.push_str(&regex::escape(literal));
            specificity += literal.len();

            let close = tail.find('}').ok_or_else(|| RoutingError::InvalidTemplate {
                template: template.to_string(),
                reason: "unclosed '{' placeholder".to_string(),
            })?;
            let name = &tail[1..close];
            if name.is_empty() || name.contains('{') {
                return Err(RoutingError::InvalidTemplate {
                    template: template.to_string(),
                    reason: format!("invalid placeholder name {:?}", name),
                });
            }
            param_names.push(name.to_string());
            pattern.push_str("([^/]+)");
            rest = &tail[close + 1..];
        }
        if rest.contains('}') {
            return Err(RoutingError::InvalidTemplate {
                template: template.to_string(),
                reason: "'}' without matching '{'".to_string(),
            });
        }
        pattern.push_str(&regex::escape(rest));
        specificity += rest.len();
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| RoutingError::InvalidTemplate {
            template: template.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            pattern: template.to_string(),
            regex,
            param_names,
            specificity,
        })
    }

    /// Match a request path, returning extracted parameter values in
    /// template order.
    pub fn match_path(&self, path: &str) -> Option<Vec<String>> {
        let captures = self.regex.captures(path)?;
        Some(
            captures
                .iter()
                .skip(1)
                .map(|c| c.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect(),
        )
    }

    /// Original template text.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Placeholder names in declaration order.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Total literal length; higher matches are preferred.
    pub fn specificity(&self) -> usize {
        self.specificity
    }

    /// Number of placeholders; fewer is preferred on equal specificity.
    pub fn param_count(&self) -> usize {
        self.param_names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_template_matches_exactly() {
        let t = UrlTemplate::compile("/items/special").unwrap();
        assert_eq!(t.match_path("/items/special"), Some(vec![]));
        assert_eq!(t.match_path("/items/special/x"), None);
        assert_eq!(t.match_path("/items"), None);
        assert_eq!(t.param_count(), 0);
    }

    #[test]
    fn placeholder_extraction_in_order() {
        let t = UrlTemplate::compile("/users/{id}/posts/{post}").unwrap();
        assert_eq!(t.param_names(), &["id", "post"]);
        assert_eq!(
            t.match_path("/users/7/posts/42"),
            Some(vec!["7".to_string(), "42".to_string()])
        );
        assert_eq!(t.match_path("/users/7/posts"), None);
    }

    #[test]
    fn placeholder_does_not_cross_segments() {
        let t = UrlTemplate::compile("/files/{name}").unwrap();
        assert_eq!(t.match_path("/files/a/b"), None);
    }

    #[test]
    fn literal_is_more_specific_than_placeholder() {
        let literal = UrlTemplate::compile("/items/special").unwrap();
        let param = UrlTemplate::compile("/items/{id}").unwrap();
        assert!(literal.specificity() > param.specificity());
    }

    #[test]
    fn regex_metacharacters_are_escaped() {
        let t = UrlTemplate::compile("/v1.0/items").unwrap();
        assert!(t.match_path("/v1.0/items").is_some());
        assert!(t.match_path("/v1x0/items").is_none());
    }

    #[test]
    fn malformed_templates_rejected() {
        assert!(UrlTemplate::compile("/items/{id").is_err());
        assert!(UrlTemplate::compile("/items/{}").is_err());
        assert!(UrlTemplate::compile("/items/id}").is_err());
    }
}

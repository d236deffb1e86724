//! Matching of requested paths against documented path templates.
//!
//! Templates may use either `:name` or `{name}` placeholders. Segments are
//! compared one by one; empty segments are ignored so that `/foo/` and `/foo`
//! are the same path.

use std::collections::HashSet;

use crate::error::SpecError;

/// One `/`-delimited segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

impl Segment {
    fn parse(raw: &str) -> Segment {
        if let Some(name) = raw.strip_prefix(':') {
            if !name.is_empty() {
                return Segment::Param(name.to_string());
            }
        }
        if let Some(name) = raw.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
            if !name.is_empty() {
                return Segment::Param(name.to_string());
            }
        }
        Segment::Literal(raw.to_string())
    }
}

/// A parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

/// The outcome of a successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    /// The template as written in the document.
    pub template: String,
    /// Placeholder names paired with the requested segment, in template order.
    pub params: Vec<(String, String)>,
}

impl PathMatch {
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(name, _)| name.as_str())
    }
}

impl PathTemplate {
    pub fn parse(raw: &str) -> Result<Self, SpecError> {
        let segments: Vec<Segment> = split(raw).map(Segment::parse).collect();

        let mut seen = HashSet::new();
        for segment in &segments {
            if let Segment::Param(name) = segment {
                if !seen.insert(name.as_str()) {
                    return Err(SpecError::InvalidPathTemplate {
                        template: raw.to_string(),
                        reason: format!("placeholder `{name}` appears more than once"),
                    });
                }
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match a concrete path. Literal segments compare case-sensitively.
    pub fn matches(&self, requested: &str) -> Option<PathMatch> {
        let requested: Vec<&str> = split(requested).collect();
        if requested.len() != self.segments.len() {
            return None;
        }

        let mut params = Vec::new();
        for (segment, actual) in self.segments.iter().zip(requested) {
            match segment {
                Segment::Literal(lit) if lit != actual => return None,
                Segment::Literal(_) => {}
                Segment::Param(name) => params.push((name.clone(), actual.to_string())),
            }
        }

        Some(PathMatch {
            template: self.raw.clone(),
            params,
        })
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Find the first template, in the given order, that matches `requested`.
pub fn match_path<'a, I>(templates: I, requested: &str) -> Result<PathMatch, SpecError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut declared = Vec::new();
    for raw in templates {
        let template = PathTemplate::parse(raw)?;
        if let Some(found) = template.matches(requested) {
            log::debug!("path {requested} matched template {raw}");
            return Ok(found);
        }
        declared.push(raw.to_string());
    }
    Err(SpecError::PathNotFound {
        path: requested.to_string(),
        templates: declared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        let t = PathTemplate::parse("/foo/bar").unwrap();
        assert!(t.matches("/foo/bar").is_some());
        assert!(t.matches("/foo/bar/").is_some());
        assert!(t.matches("/foo/Bar").is_none());
        assert!(t.matches("/foo").is_none());
    }

    #[test]
    fn test_brace_and_colon_placeholders() {
        let t = PathTemplate::parse("/foo/{fooId}/items/:itemId").unwrap();
        let m = t.matches("/foo/12/items/abc").unwrap();
        assert_eq!(
            m.params,
            vec![
                ("fooId".to_string(), "12".to_string()),
                ("itemId".to_string(), "abc".to_string())
            ]
        );
        assert_eq!(t.param_names().collect::<Vec<_>>(), vec!["fooId", "itemId"]);
    }

    #[test]
    fn test_requested_placeholder_matches_param() {
        let t = PathTemplate::parse("/bar/{bar_id}").unwrap();
        let m = t.matches("/bar/:bar_id").unwrap();
        assert_eq!(m.param_names().collect::<Vec<_>>(), vec!["bar_id"]);
    }

    #[test]
    fn test_root_path() {
        let t = PathTemplate::parse("/").unwrap();
        assert!(t.matches("/").is_some());
        assert!(t.matches("/foo").is_none());
    }

    #[test]
    fn test_duplicate_placeholder_rejected() {
        let err = PathTemplate::parse("/a/{id}/b/:id").unwrap_err();
        assert!(matches!(err, SpecError::InvalidPathTemplate { .. }));
    }

    #[test]
    fn test_first_match_wins() {
        let templates = ["/foo/{id}", "/foo/bar"];
        let m = match_path(templates, "/foo/bar").unwrap();
        assert_eq!(m.template, "/foo/{id}");
    }

    #[test]
    fn test_no_match() {
        let err = match_path(["/foo", "/bar/{id}"], "/test").unwrap_err();
        match err {
            SpecError::PathNotFound { path, templates } => {
                assert_eq!(path, "/test");
                assert_eq!(templates, vec!["/foo", "/bar/{id}"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use super::Params;
use crate::error::InvalidRouteDefinition;

const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const TAIL: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
    Wildcard(String),
}

/// A uri pattern compiled into segments.
///
/// `{name}` captures exactly one non-empty segment, `{*name}` as the last
/// segment captures the non-empty rest of the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Pattern {
    segments: Vec<Segment>,
}

fn trim_path(path: &str) -> &str {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.trim_end_matches('/')
}

fn check_delimiters(raw: &str) -> Result<(), InvalidRouteDefinition> {
    let mut open = false;
    for c in raw.chars() {
        match c {
            '{' if open => return Err(InvalidRouteDefinition::UnbalancedDelimiters(raw.to_string())),
            '{' => open = true,
            '}' if !open => {
                return Err(InvalidRouteDefinition::UnbalancedDelimiters(raw.to_string()))
            }
            '}' => open = false,
            '/' if open => {
                return Err(InvalidRouteDefinition::UnbalancedDelimiters(raw.to_string()))
            }
            _ => {}
        }
    }

    if open {
        return Err(InvalidRouteDefinition::UnbalancedDelimiters(raw.to_string()));
    }
    Ok(())
}

impl Pattern {
    pub(crate) fn parse(raw: &str) -> Result<Self, InvalidRouteDefinition> {
        if raw.is_empty() {
            return Err(InvalidRouteDefinition::EmptyPattern);
        }
        if !raw.starts_with('/') {
            return Err(InvalidRouteDefinition::MissingLeadingSlash(raw.to_string()));
        }
        check_delimiters(raw)?;

        let trimmed = trim_path(raw);
        if trimmed.is_empty() {
            return Ok(Pattern {
                segments: Vec::new(),
            });
        }

        let parts: Vec<&str> = trimmed.split('/').collect();
        let mut segments = Vec::with_capacity(parts.len());
        let mut names: Vec<&str> = Vec::new();

        for (idx, part) in parts.iter().enumerate() {
            if !part.contains('{') {
                segments.push(Segment::Static(decode(part)));
                continue;
            }

            let name = part
                .strip_prefix('{')
                .and_then(|part| part.strip_suffix('}'))
                .ok_or_else(|| InvalidRouteDefinition::PartialSegment(raw.to_string()))?;
            let (name, wildcard) = match name.strip_prefix('*') {
                Some(name) => (name, true),
                None => (name, false),
            };

            if name.is_empty() {
                return Err(InvalidRouteDefinition::EmptyParameterName(raw.to_string()));
            }
            if !is_valid_name(name) {
                return Err(InvalidRouteDefinition::InvalidParameterName {
                    pattern: raw.to_string(),
                    name: name.to_string(),
                });
            }
            if names.contains(&name) {
                return Err(InvalidRouteDefinition::DuplicateParameter {
                    pattern: raw.to_string(),
                    name: name.to_string(),
                });
            }
            names.push(name);

            if wildcard {
                if idx + 1 != parts.len() {
                    return Err(InvalidRouteDefinition::WildcardNotLast(raw.to_string()));
                }
                segments.push(Segment::Wildcard(name.to_string()));
            } else {
                segments.push(Segment::Param(name.to_string()));
            }
        }

        Ok(Pattern { segments })
    }

    /// Matches `path` against this pattern, returning the captured
    /// parameters on success.
    pub(crate) fn matches(&self, path: &str) -> Option<Params> {
        let trimmed = trim_path(path);
        let parts: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').collect()
        };

        let mut params = Params::default();
        for (idx, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Static(literal) => {
                    if decode(parts.get(idx)?) != *literal {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let part = parts.get(idx).filter(|part| !part.is_empty())?;
                    params.push(name.as_str(), decode(part));
                }
                Segment::Wildcard(name) => {
                    let rest = parts.get(idx..).unwrap_or_default().join("/");
                    if rest.is_empty() {
                        return None;
                    }
                    params.push(name.as_str(), decode(&rest));
                    return Some(params);
                }
            }
        }

        if parts.len() == self.segments.len() {
            Some(params)
        } else {
            None
        }
    }

    /// Builds a path from this pattern, filling placeholders from `params`.
    ///
    /// Returns `None` if a placeholder has no value.
    pub(crate) fn generate(&self, params: &[(&str, &str)]) -> Option<String> {
        let lookup = |name: &str| {
            params
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, value)| *value)
        };

        if self.segments.is_empty() {
            return Some("/".to_string());
        }

        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            match segment {
                Segment::Static(literal) => path.extend(utf8_percent_encode(literal, SEGMENT)),
                Segment::Param(name) => {
                    let value = lookup(name.as_str()).filter(|value| !value.is_empty())?;
                    path.extend(utf8_percent_encode(value, SEGMENT));
                }
                Segment::Wildcard(name) => {
                    let value = lookup(name.as_str())?.trim_start_matches('/');
                    if value.is_empty() {
                        return None;
                    }
                    path.extend(utf8_percent_encode(value, TAIL));
                }
            }
        }
        Some(path)
    }

    pub(crate) fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Static(_) => None,
            Segment::Param(name) | Segment::Wildcard(name) => Some(name.as_str()),
        })
    }
}

fn is_valid_name(name: &str) -> bool {
    name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn decode(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs.iter().copied().collect()
    }

    #[test]
    fn static_pattern() {
        let pattern = Pattern::parse("/users/list").unwrap();
        assert_eq!(pattern.matches("/users/list"), Some(Params::default()));
        assert_eq!(pattern.matches("/users/list/"), Some(Params::default()));
        assert_eq!(pattern.matches("/users"), None);
        assert_eq!(pattern.matches("/users/list/more"), None);
    }

    #[test]
    fn root_pattern() {
        let pattern = Pattern::parse("/").unwrap();
        assert_eq!(pattern.matches("/"), Some(Params::default()));
        assert_eq!(pattern.matches(""), Some(Params::default()));
        assert_eq!(pattern.matches("/a"), None);
    }

    #[test]
    fn capture_params() {
        let pattern = Pattern::parse("/posts/{post_id}/comments/{id}").unwrap();
        assert_eq!(
            pattern.matches("/posts/12/comments/100"),
            Some(params(&[("post_id", "12"), ("id", "100")]))
        );
        assert_eq!(pattern.matches("/posts/12/comments"), None);
        assert_eq!(
            pattern.param_names().collect::<Vec<_>>(),
            vec!["post_id", "id"]
        );
    }

    #[test]
    fn empty_segment_does_not_match() {
        let pattern = Pattern::parse("/items/{id}").unwrap();
        assert_eq!(pattern.matches("/items/"), None);
        assert_eq!(pattern.matches("/items//"), None);
        assert_eq!(pattern.matches("/items"), None);
    }

    #[test]
    fn percent_decoding() {
        let pattern = Pattern::parse("/users/{name}").unwrap();
        assert_eq!(
            pattern.matches("/users/john%20doe"),
            Some(params(&[("name", "john doe")]))
        );
    }

    #[test]
    fn encoded_literals() {
        let pattern = Pattern::parse("/café/{id}").unwrap();
        assert_eq!(
            pattern.matches("/caf%C3%A9/1"),
            Some(params(&[("id", "1")]))
        );
        assert_eq!(pattern.matches("/cafe/1"), None);
        assert_eq!(
            pattern.generate(&[("id", "1")]).as_deref(),
            Some("/caf%C3%A9/1")
        );

        let pattern = Pattern::parse("/a b").unwrap();
        assert_eq!(pattern.matches("/a%20b"), Some(Params::default()));

        let pattern = Pattern::parse("/a%20b").unwrap();
        assert_eq!(pattern.matches("/a%20b"), Some(Params::default()));
    }

    #[test]
    fn wildcard() {
        let pattern = Pattern::parse("/files/{*path}").unwrap();
        assert_eq!(
            pattern.matches("/files/a/b/c.txt"),
            Some(params(&[("path", "a/b/c.txt")]))
        );
        assert_eq!(pattern.matches("/files/a"), Some(params(&[("path", "a")])));
        assert_eq!(pattern.matches("/files/"), None);
        assert_eq!(pattern.matches("/files"), None);
    }

    #[test]
    fn malformed_patterns() {
        assert_eq!(Pattern::parse(""), Err(InvalidRouteDefinition::EmptyPattern));
        assert_eq!(
            Pattern::parse("users"),
            Err(InvalidRouteDefinition::MissingLeadingSlash("users".to_string()))
        );
        assert_eq!(
            Pattern::parse("/users/{id"),
            Err(InvalidRouteDefinition::UnbalancedDelimiters(
                "/users/{id".to_string()
            ))
        );
        assert_eq!(
            Pattern::parse("/users/id}"),
            Err(InvalidRouteDefinition::UnbalancedDelimiters(
                "/users/id}".to_string()
            ))
        );
        assert_eq!(
            Pattern::parse("/users/{{id}}"),
            Err(InvalidRouteDefinition::UnbalancedDelimiters(
                "/users/{{id}}".to_string()
            ))
        );
        assert_eq!(
            Pattern::parse("/users/{}"),
            Err(InvalidRouteDefinition::EmptyParameterName(
                "/users/{}".to_string()
            ))
        );
        assert_eq!(
            Pattern::parse("/users/user-{id}"),
            Err(InvalidRouteDefinition::PartialSegment(
                "/users/user-{id}".to_string()
            ))
        );
        assert_eq!(
            Pattern::parse("/{*rest}/tail"),
            Err(InvalidRouteDefinition::WildcardNotLast(
                "/{*rest}/tail".to_string()
            ))
        );
        for raw in ["/{a b}", "/{a?}", "/{a*b}", "/{*a-b}"] {
            assert!(matches!(
                Pattern::parse(raw),
                Err(InvalidRouteDefinition::InvalidParameterName { .. })
            ));
        }
        assert!(Pattern::parse("/{user_id2}").is_ok());
        assert_eq!(
            Pattern::parse("/{id}/{id}"),
            Err(InvalidRouteDefinition::DuplicateParameter {
                pattern: "/{id}/{id}".to_string(),
                name: "id".to_string(),
            })
        );
    }

    #[test]
    fn generate() {
        let pattern = Pattern::parse("/users/{id}/files/{*path}").unwrap();
        assert_eq!(
            pattern
                .generate(&[("id", "john doe"), ("path", "a/b.txt")])
                .as_deref(),
            Some("/users/john%20doe/files/a/b.txt")
        );
        assert_eq!(pattern.generate(&[("id", "1")]), None);
        assert_eq!(
            Pattern::parse("/").unwrap().generate(&[]).as_deref(),
            Some("/")
        );
    }
}

//! Path template parsing.
//!
//! # Responsibilities
//! - Parse configured templates like `/api/product/{id}` into segments
//! - Classify each segment as literal or named placeholder
//! - Reject malformed templates at load time, not at request time
//! - Provide the priority key used for route precedence
//!
//! # Design Decisions
//! - Templates are anchored: segment count must match exactly
//! - A placeholder must span a whole segment (`/a/{id}x/` is invalid)
//! - No regex to guarantee O(segments) matching
//! - Priority is derived, never configured: more literals rank higher,
//!   ties broken by fewer placeholders

use std::fmt;
use thiserror::Error;

/// One segment of a parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matches only an identical path segment.
    Literal(String),
    /// Matches any single non-empty path segment and binds it by name.
    Placeholder(String),
}

/// Template parse failure. Surfaced as a configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template must start with '/'")]
    MissingLeadingSlash,
    #[error("empty segment (consecutive or trailing '/')")]
    EmptySegment,
    #[error("segment '{0}' mixes braces with other characters")]
    MalformedSegment(String),
    #[error("placeholder with empty name")]
    EmptyPlaceholder,
    #[error("duplicate placeholder '{{{0}}}'")]
    DuplicatePlaceholder(String),
}

/// A parsed, immutable path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a template string.
    ///
    /// `/` parses to zero segments and matches only the root path.
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        if !raw.starts_with('/') {
            return Err(TemplateError::MissingLeadingSlash);
        }

        let mut segments = Vec::new();
        if raw != "/" {
            for part in raw[1..].split('/') {
                segments.push(Self::parse_segment(part)?);
            }
        }

        // Duplicate placeholder names would make bindings ambiguous.
        for (i, seg) in segments.iter().enumerate() {
            if let Segment::Placeholder(name) = seg {
                let dup = segments[..i].iter().any(|s| matches!(s, Segment::Placeholder(n) if n == name));
                if dup {
                    return Err(TemplateError::DuplicatePlaceholder(name.clone()));
                }
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    fn parse_segment(part: &str) -> Result<Segment, TemplateError> {
        if part.is_empty() {
            return Err(TemplateError::EmptySegment);
        }
        if part.starts_with('{') && part.ends_with('}') && part.len() >= 2 {
            let name = &part[1..part.len() - 1];
            if name.is_empty() {
                return Err(TemplateError::EmptyPlaceholder);
            }
            if name.contains(['{', '}']) {
                return Err(TemplateError::MalformedSegment(part.to_string()));
            }
            return Ok(Segment::Placeholder(name.to_string()));
        }
        if part.contains(['{', '}']) {
            return Err(TemplateError::MalformedSegment(part.to_string()));
        }
        Ok(Segment::Literal(part.to_string()))
    }

    /// The template exactly as configured.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of literal segments. Primary priority key.
    pub fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// Number of placeholder segments. Secondary priority key (fewer wins).
    pub fn placeholder_count(&self) -> usize {
        self.segments.len() - self.literal_count()
    }

    /// Placeholder names in template order.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

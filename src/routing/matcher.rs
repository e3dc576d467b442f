//! Route matching logic.
//!
//! # Responsibilities
//! - Match a request path against a template, segment by segment
//! - Bind placeholder values captured from the path
//! - Select the best route among all candidates
//!
//! # Design Decisions
//! - Matching is anchored: segment counts must be equal, no wildcards
//! - A literal matches only an identical literal; a placeholder matches
//!   any single non-empty segment
//! - Precedence: most literal segments, then fewest placeholders, then
//!   declaration order — fully deterministic
//! - Pure functions with no I/O, testable in isolation from loading

use axum::http::Method;

use crate::routing::table::RouteDefinition;
use crate::routing::template::{PathTemplate, Segment};

/// Placeholder values captured during matching, in template order.
pub type Bindings = Vec<(String, String)>;

/// A selected route together with its captured placeholder values.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a RouteDefinition,
    pub bindings: Bindings,
}

fn path_segments(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

/// Match a request path against one template.
///
/// Returns the placeholder bindings on success, `None` on any mismatch.
pub fn match_path(template: &PathTemplate, path: &str) -> Option<Bindings> {
    let segments = path_segments(path);
    if segments.len() != template.segments().len() {
        return None;
    }

    let mut bindings = Bindings::new();
    for (tmpl_seg, path_seg) in template.segments().iter().zip(&segments) {
        match tmpl_seg {
            Segment::Literal(lit) => {
                if lit != path_seg {
                    return None;
                }
            }
            Segment::Placeholder(name) => {
                if path_seg.is_empty() {
                    return None;
                }
                bindings.push((name.clone(), (*path_seg).to_string()));
            }
        }
    }
    Some(bindings)
}

/// Select the best-matching route for a method and path.
///
/// Routes whose method set is non-empty and excludes the request method are
/// not candidates regardless of path. Among remaining matches the one with
/// the highest priority wins; iteration order keeps declaration-order ties.
pub fn select_route<'a>(
    routes: &'a [RouteDefinition],
    method: &Method,
    path: &str,
) -> Option<RouteMatch<'a>> {
    let mut best: Option<(RouteMatch<'a>, (usize, usize))> = None;

    for route in routes {
        if !route.allows_method(method) {
            continue;
        }
        let Some(bindings) = match_path(&route.upstream_template, path) else {
            continue;
        };

        // Priority key: literals descending, placeholders ascending.
        let key = (
            route.upstream_template.literal_count(),
            route.upstream_template.placeholder_count(),
        );
        let better = match &best {
            None => true,
            Some((_, best_key)) => key.0 > best_key.0 || (key.0 == best_key.0 && key.1 < best_key.1),
        };
        if better {
            best = Some((RouteMatch { route, bindings }, key));
        }
    }

    best.map(|(m, _)| m)
}

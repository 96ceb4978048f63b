//! Prompt interpolation against run state.
//!
//! Prompts reference earlier outputs with `{{path}}` placeholders, where a
//! path is one or more identifiers joined by dots.
//!
//! # Syntax
//!
//! - `{{summary}}` - replaced with the ledger entry `summary`
//! - `{{user.name}}` - walks into nested objects
//! - `{{variants.0}}` - numeric segments index into arrays
//!
//! Placeholders that do not resolve are left in the output verbatim so
//! callers can detect the missing substitution.
//!
//! # Example
//!
//! ```
//! use promptchain::config::interpolate;
//! use serde_json::json;
//!
//! let state = json!({"user": {"name": "Ana"}}).as_object().cloned().unwrap();
//! assert_eq!(interpolate("Hello {{user.name}}", &state), "Hello Ana");
//! assert_eq!(interpolate("{{missing.path}}", &state), "{{missing.path}}");
//! ```

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Number, Value};

use crate::state::Snapshot;

/// Regex for `{{dotted.path}}` placeholders.
static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)*)\}\}")
        .expect("PLACEHOLDER_REGEX must compile")
});

/// A segment of a prompt template.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text
    Literal(String),
    /// Placeholder path: {{path}}
    Placeholder(String),
}

/// Split a template into literal text and placeholders.
///
/// Brace pairs that do not enclose a valid path stay literal.
pub fn parse_template(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in PLACEHOLDER_REGEX.captures_iter(input) {
        let (Some(whole), Some(path)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::Literal(input[last..whole.start()].to_string()));
        }
        segments.push(Segment::Placeholder(path.as_str().to_string()));
        last = whole.end();
    }

    if last < input.len() {
        segments.push(Segment::Literal(input[last..].to_string()));
    }

    segments
}

/// Extract all placeholder paths from a template.
pub fn extract_placeholders(input: &str) -> HashSet<String> {
    parse_template(input)
        .into_iter()
        .filter_map(|seg| match seg {
            Segment::Placeholder(path) => Some(path),
            _ => None,
        })
        .collect()
}

/// Resolve a dotted path against a state snapshot.
///
/// Returns `None` at the first absent segment or non-indexable value.
pub fn resolve_path<'a>(state: &'a Snapshot, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut value = state.get(segments.next()?)?;

    for segment in segments {
        value = match value {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(value)
}

/// Render a resolved value for inclusion in a prompt.
///
/// Objects and arrays render as two-space pretty JSON, strings render raw.
/// Whole-valued floats drop their fraction, so `1.0` renders as `1`.
/// `null` has no rendering.
pub fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(render_number(number)),
        Value::Object(_) | Value::Array(_) => {
            Some(serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()))
        }
        other => Some(other.to_string()),
    }
}

fn render_number(number: &Number) -> String {
    match number.as_f64() {
        Some(f) if number.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => {
            // Also folds -0.0 into "0".
            if f == 0.0 {
                "0".to_string()
            } else {
                format!("{:.0}", f)
            }
        }
        _ => number.to_string(),
    }
}

/// Replace every resolvable placeholder in `template`.
pub fn interpolate(template: &str, state: &Snapshot) -> String {
    PLACEHOLDER_REGEX
        .replace_all(template, |caps: &Captures| {
            resolve_path(state, &caps[1])
                .and_then(render_value)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Placeholder paths in `template` that `state` cannot resolve.
pub fn unresolved_placeholders(template: &str, state: &Snapshot) -> Vec<String> {
    let mut seen = HashSet::new();
    parse_template(template)
        .into_iter()
        .filter_map(|seg| match seg {
            Segment::Placeholder(path) => Some(path),
            _ => None,
        })
        .filter(|path| resolve_path(state, path).and_then(render_value).is_none())
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(value: Value) -> Snapshot {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn parse_literal_only() {
        let result = parse_template("hello world");
        assert_eq!(result, vec![Segment::Literal("hello world".to_string())]);
    }

    #[test]
    fn parse_placeholder_between_literals() {
        let result = parse_template("Hi {{user.name}}!");
        assert_eq!(
            result,
            vec![
                Segment::Literal("Hi ".to_string()),
                Segment::Placeholder("user.name".to_string()),
                Segment::Literal("!".to_string()),
            ]
        );
    }

    #[test]
    fn parse_ignores_invalid_paths() {
        let result = parse_template("{{not a path}} {{a..b}} {{}}");
        assert_eq!(
            result,
            vec![Segment::Literal("{{not a path}} {{a..b}} {{}}".to_string())]
        );
    }

    #[test]
    fn extract_placeholders_is_unique() {
        let paths = extract_placeholders("{{a}} {{b.c}} {{a}}");
        assert_eq!(paths.len(), 2);
        assert!(paths.contains("a"));
        assert!(paths.contains("b.c"));
    }

    #[test]
    fn nested_field_resolves() {
        let s = state(json!({"user": {"name": "Ana"}}));
        assert_eq!(interpolate("Hello {{user.name}}", &s), "Hello Ana");
    }

    #[test]
    fn missing_path_left_verbatim() {
        let s = Snapshot::new();
        assert_eq!(interpolate("{{missing.path}}", &s), "{{missing.path}}");
    }

    #[test]
    fn walking_into_scalar_is_unresolved() {
        let s = state(json!({"title": "Draft"}));
        assert_eq!(interpolate("{{title.length}}", &s), "{{title.length}}");
    }

    #[test]
    fn object_renders_as_pretty_json() {
        let s = state(json!({"obj": {"a": 1, "b": 2}}));
        assert_eq!(interpolate("{{obj}}", &s), "{\n  \"a\": 1,\n  \"b\": 2\n}");
    }

    #[test]
    fn array_renders_as_pretty_json() {
        let s = state(json!({"initial": {"variants": ["x", "y"]}}));
        assert_eq!(
            interpolate("{{initial.variants}}", &s),
            "[\n  \"x\",\n  \"y\"\n]"
        );
    }

    #[test]
    fn numeric_segment_indexes_arrays() {
        let s = state(json!({"items": [{"name": "first"}, {"name": "second"}]}));
        assert_eq!(interpolate("{{items.1.name}}", &s), "second");
        assert_eq!(interpolate("{{items.9.name}}", &s), "{{items.9.name}}");
    }

    #[test]
    fn scalars_render_via_display() {
        let s = state(json!({"n": 42, "ok": false, "empty": ""}));
        assert_eq!(interpolate("{{n}}/{{ok}}/[{{empty}}]", &s), "42/false/[]");
    }

    #[test]
    fn whole_floats_render_without_fraction() {
        let s = state(json!({"whole": 1.0, "neg": -3.0, "zero": -0.0, "frac": 2.5, "big": 1e20}));
        assert_eq!(
            interpolate("{{whole}} {{neg}} {{zero}} {{frac}} {{big}}", &s),
            "1 -3 0 2.5 100000000000000000000"
        );
    }

    #[test]
    fn null_renders_as_placeholder() {
        let s = state(json!({"gone": null}));
        assert_eq!(interpolate("x {{gone}} y", &s), "x {{gone}} y");
    }

    #[test]
    fn unresolved_placeholders_reported_once() {
        let s = state(json!({"a": "ok"}));
        assert_eq!(
            unresolved_placeholders("{{a}} {{b}} {{b}} {{c.d}}", &s),
            vec!["b".to_string(), "c.d".to_string()]
        );
    }
}

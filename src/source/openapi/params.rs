//! Prefix-encoded parameter codec
//!
//! Tool arguments arrive as one flat map whose keys carry their HTTP
//! location as a `<location>__` prefix. This module splits them back
//! into the five request locations.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Prefix for path parameters
pub const PATH_PREFIX: &str = "path";
/// Prefix for query parameters
pub const QUERY_PREFIX: &str = "query";
/// Prefix for header parameters
pub const HEADER_PREFIX: &str = "header";
/// Prefix for cookie parameters
pub const COOKIE_PREFIX: &str = "cookie";
/// Prefix for JSON body properties
pub const BODY_PREFIX: &str = "body";
/// Prefix for form-urlencoded body fields
pub const FORM_PREFIX: &str = "form";
/// Prefix for multipart body fields
pub const MULTIPART_PREFIX: &str = "multipart";

/// Join a location prefix and a parameter name into a flat argument key.
#[must_use]
pub fn encode_key(prefix: &str, name: &str) -> String {
    format!("{prefix}__{name}")
}

/// A call's arguments split by HTTP parameter location.
///
/// `form__*` and `multipart__*` keys land in `body` with their prefix
/// retained, because body serializers dispatch on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolParams {
    /// Path template substitutions
    pub path: BTreeMap<String, Value>,
    /// Query string entries
    pub query: BTreeMap<String, Value>,
    /// Request headers
    pub header: BTreeMap<String, Value>,
    /// Cookie pairs
    pub cookie: BTreeMap<String, Value>,
    /// Body values (JSON properties, form fields, multipart fields, or a
    /// single unprefixed `body` entry)
    pub body: BTreeMap<String, Value>,
}

impl ToolParams {
    /// Split a flat argument map into its five locations.
    ///
    /// Keys without a `__` separator are dropped, except the bare `body`
    /// key which unstructured content types accept verbatim. Unknown
    /// prefixes are dropped silently.
    #[must_use]
    pub fn split(args: &Map<String, Value>) -> Self {
        let mut params = Self::default();

        for (key, value) in args {
            if key == BODY_PREFIX {
                params.body.insert(key.clone(), value.clone());
                continue;
            }
            let Some((prefix, name)) = key.split_once("__") else {
                continue;
            };
            match prefix {
                PATH_PREFIX => {
                    params.path.insert(name.to_string(), value.clone());
                }
                QUERY_PREFIX => {
                    params.query.insert(name.to_string(), value.clone());
                }
                HEADER_PREFIX => {
                    params.header.insert(name.to_string(), value.clone());
                }
                COOKIE_PREFIX => {
                    params.cookie.insert(name.to_string(), value.clone());
                }
                BODY_PREFIX => {
                    params.body.insert(name.to_string(), value.clone());
                }
                FORM_PREFIX | MULTIPART_PREFIX => {
                    // Serializers match on the retained prefix
                    params.body.insert(key.clone(), value.clone());
                }
                _ => {}
            }
        }

        params
    }
}

/// Render an argument value for URL, cookie, and form contexts.
///
/// Scalars render naturally; lists and objects fall back to compact JSON,
/// which is the only place the generic stringification contract allows.
#[must_use]
pub fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn splits_all_known_prefixes() {
        let flat = args(&[
            ("path__userId", json!("42")),
            ("query__limit", json!(10)),
            ("header__X-Trace", json!("abc")),
            ("cookie__session", json!("s1")),
            ("body__name", json!("Ada")),
            ("form__field", json!("v")),
            ("multipart__upload", json!("data")),
        ]);

        let p = ToolParams::split(&flat);
        assert_eq!(p.path["userId"], json!("42"));
        assert_eq!(p.query["limit"], json!(10));
        assert_eq!(p.header["X-Trace"], json!("abc"));
        assert_eq!(p.cookie["session"], json!("s1"));
        assert_eq!(p.body["name"], json!("Ada"));
        // form__/multipart__ retain their prefix inside the body submap
        assert_eq!(p.body["form__field"], json!("v"));
        assert_eq!(p.body["multipart__upload"], json!("data"));
    }

    #[test]
    fn bare_body_key_is_kept() {
        let p = ToolParams::split(&args(&[("body", json!("<root/>"))]));
        assert_eq!(p.body["body"], json!("<root/>"));
    }

    #[test]
    fn unknown_prefixes_and_unprefixed_keys_are_dropped() {
        let p = ToolParams::split(&args(&[
            ("bogus__x", json!(1)),
            ("noprefix", json!(2)),
            ("query__ok", json!(3)),
        ]));
        assert!(p.path.is_empty());
        assert_eq!(p.query.len(), 1);
        assert!(p.body.is_empty());
    }

    #[test]
    fn split_partitions_every_recognized_key_exactly_once() {
        let flat = args(&[
            ("path__a", json!(1)),
            ("query__b", json!(2)),
            ("header__c", json!(3)),
            ("cookie__d", json!(4)),
            ("body__e", json!(5)),
        ]);
        let p = ToolParams::split(&flat);
        let total =
            p.path.len() + p.query.len() + p.header.len() + p.cookie.len() + p.body.len();
        assert_eq!(total, flat.len());
    }

    #[test]
    fn render_scalar_formats() {
        assert_eq!(render_scalar(&json!("x")), "x");
        assert_eq!(render_scalar(&json!(10)), "10");
        assert_eq!(render_scalar(&json!(true)), "true");
        assert_eq!(render_scalar(&json!(null)), "");
        assert_eq!(render_scalar(&json!([1, 2])), "[1,2]");
    }
}

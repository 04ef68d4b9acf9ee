//! Parameter serialization by location, `style` and `explode`.
//!
//! Path values are percent-encoded here. Query pairs are returned raw and
//! encoded by the transport; header and cookie values are sent as-is.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

use apidrive_spec::{Parameter, ParameterStyle};

/// Everything except RFC 3986 unreserved characters.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn encode(s: &str) -> String {
    utf8_percent_encode(s, PATH_SEGMENT).to_string()
}

/// A scalar as text. Nested containers are rendered as compact JSON.
fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// The shape of a parameter value, with `null` array items dropped.
enum Shape<'a> {
    Scalar(String),
    Array(Vec<String>),
    Object(Vec<(&'a str, String)>),
}

fn shape(value: &Value) -> Shape<'_> {
    match value {
        Value::Array(items) => Shape::Array(
            items
                .iter()
                .filter(|v| !v.is_null())
                .map(scalar)
                .collect(),
        ),
        Value::Object(map) => Shape::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.as_str(), scalar(v)))
                .collect(),
        ),
        other => Shape::Scalar(scalar(other)),
    }
}

/// Expand a path parameter for substitution into its `{name}` slot.
pub(crate) fn path_value(param: &Parameter, value: &Value) -> String {
    let name = encode(&param.name);
    let explode = param.explode;

    match (param.style, shape(value)) {
        (ParameterStyle::Label, Shape::Scalar(s)) => format!(".{}", encode(&s)),
        (ParameterStyle::Label, Shape::Array(items)) => {
            let sep = if explode { "." } else { "," };
            format!(".{}", join(items.iter().map(|s| encode(s)), sep))
        }
        (ParameterStyle::Label, Shape::Object(pairs)) => {
            if explode {
                format!(".{}", join(kv(&pairs, "="), "."))
            } else {
                format!(".{}", join(kv(&pairs, ","), ","))
            }
        }
        (ParameterStyle::Matrix, Shape::Scalar(s)) => {
            if s.is_empty() {
                format!(";{}", name)
            } else {
                format!(";{}={}", name, encode(&s))
            }
        }
        (ParameterStyle::Matrix, Shape::Array(items)) => {
            if explode {
                items
                    .iter()
                    .map(|s| format!(";{}={}", name, encode(s)))
                    .collect()
            } else {
                format!(";{}={}", name, join(items.iter().map(|s| encode(s)), ","))
            }
        }
        (ParameterStyle::Matrix, Shape::Object(pairs)) => {
            if explode {
                kv(&pairs, "=").map(|p| format!(";{}", p)).collect()
            } else {
                format!(";{}={}", name, join(kv(&pairs, ","), ","))
            }
        }
        // simple
        (_, Shape::Scalar(s)) => encode(&s),
        (_, Shape::Array(items)) => join(items.iter().map(|s| encode(s)), ","),
        (_, Shape::Object(pairs)) => {
            if explode {
                join(kv(&pairs, "="), ",")
            } else {
                join(kv(&pairs, ","), ",")
            }
        }
    }
}

/// Serialize a query parameter into `(name, value)` pairs.
pub(crate) fn query_pairs(param: &Parameter, value: &Value) -> Vec<(String, String)> {
    if value.is_null() {
        return Vec::new();
    }
    if param.style == ParameterStyle::DeepObject {
        let mut pairs = Vec::new();
        deep_object(&param.name, value, &mut pairs);
        return pairs;
    }

    let delimiter = match param.style {
        ParameterStyle::SpaceDelimited => " ",
        ParameterStyle::PipeDelimited => "|",
        _ => ",",
    };
    form_pairs(&param.name, value, param.explode, delimiter)
}

/// Serialize a header parameter (`simple` style). `None` for null.
pub(crate) fn header_value(param: &Parameter, value: &Value) -> Option<String> {
    if value.is_null() {
        return None;
    }
    Some(match shape(value) {
        Shape::Scalar(s) => s,
        Shape::Array(items) => items.join(","),
        Shape::Object(pairs) => {
            let sep = if param.explode { "=" } else { "," };
            pairs
                .iter()
                .map(|(k, v)| format!("{}{}{}", k, sep, v))
                .collect::<Vec<_>>()
                .join(",")
        }
    })
}

/// Serialize a cookie parameter (`form` style) into cookie pairs.
pub(crate) fn cookie_pairs(param: &Parameter, value: &Value) -> Vec<(String, String)> {
    if value.is_null() {
        return Vec::new();
    }
    form_pairs(&param.name, value, param.explode, ",")
}

fn form_pairs(name: &str, value: &Value, explode: bool, delimiter: &str) -> Vec<(String, String)> {
    match shape(value) {
        Shape::Scalar(s) => vec![(name.to_string(), s)],
        Shape::Array(items) => {
            if explode {
                items.into_iter().map(|s| (name.to_string(), s)).collect()
            } else {
                vec![(name.to_string(), items.join(delimiter))]
            }
        }
        Shape::Object(pairs) => {
            if explode {
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect()
            } else {
                let flat: Vec<String> = pairs
                    .into_iter()
                    .flat_map(|(k, v)| [k.to_string(), v])
                    .collect();
                vec![(name.to_string(), flat.join(delimiter))]
            }
        }
    }
}

fn deep_object(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, child) in map {
                deep_object(&format!("{}[{}]", prefix, key), child, out);
            }
        }
        Value::Array(items) => {
            for item in items.iter().filter(|v| !v.is_null()) {
                out.push((format!("{}[]", prefix), scalar(item)));
            }
        }
        other => out.push((prefix.to_string(), scalar(other))),
    }
}

fn kv<'a>(pairs: &'a [(&'a str, String)], sep: &'a str) -> impl Iterator<Item = String> + 'a {
    pairs
        .iter()
        .map(move |(k, v)| format!("{}{}{}", encode(k), sep, encode(v)))
}

fn join(parts: impl Iterator<Item = String>, sep: &str) -> String {
    parts.collect::<Vec<_>>().join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use apidrive_spec::ParameterLocation;
    use serde_json::json;

    fn param(location: ParameterLocation, style: ParameterStyle, explode: bool) -> Parameter {
        Parameter {
            name: "color".into(),
            location,
            description: None,
            required: false,
            deprecated: false,
            style,
            explode,
            allow_reserved: false,
            schema: None,
        }
    }

    fn path(style: ParameterStyle, explode: bool, value: Value) -> String {
        path_value(&param(ParameterLocation::Path, style, explode), &value)
    }

    fn query(style: ParameterStyle, explode: bool, value: Value) -> Vec<(String, String)> {
        query_pairs(&param(ParameterLocation::Query, style, explode), &value)
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn path_styles() {
        use ParameterStyle::*;
        let array = json!(["blue", "black", "brown"]);
        let object = json!({"R": 100, "G": 200});

        assert_eq!(path(Simple, false, json!("blue")), "blue");
        assert_eq!(path(Simple, false, array.clone()), "blue,black,brown");
        assert_eq!(path(Simple, false, object.clone()), "R,100,G,200");
        assert_eq!(path(Simple, true, object.clone()), "R=100,G=200");

        assert_eq!(path(Label, false, json!("blue")), ".blue");
        assert_eq!(path(Label, false, array.clone()), ".blue,black,brown");
        assert_eq!(path(Label, true, array.clone()), ".blue.black.brown");
        assert_eq!(path(Label, true, object.clone()), ".R=100.G=200");

        assert_eq!(path(Matrix, false, json!("blue")), ";color=blue");
        assert_eq!(path(Matrix, false, array.clone()), ";color=blue,black,brown");
        assert_eq!(
            path(Matrix, true, array),
            ";color=blue;color=black;color=brown"
        );
        assert_eq!(path(Matrix, false, object.clone()), ";color=R,100,G,200");
        assert_eq!(path(Matrix, true, object), ";R=100;G=200");
    }

    #[test]
    fn path_values_are_encoded() {
        assert_eq!(
            path(ParameterStyle::Simple, false, json!("a b/c")),
            "a%20b%2Fc"
        );
        assert_eq!(path(ParameterStyle::Simple, false, json!(42)), "42");
        assert_eq!(path(ParameterStyle::Simple, false, json!(true)), "true");
    }

    #[test]
    fn query_styles() {
        use ParameterStyle::*;
        let array = json!(["blue", "black"]);
        let object = json!({"R": 100, "G": 200});

        assert_eq!(query(Form, true, json!("blue")), pairs(&[("color", "blue")]));
        assert_eq!(
            query(Form, true, array.clone()),
            pairs(&[("color", "blue"), ("color", "black")])
        );
        assert_eq!(
            query(Form, false, array.clone()),
            pairs(&[("color", "blue,black")])
        );
        assert_eq!(
            query(Form, true, object.clone()),
            pairs(&[("R", "100"), ("G", "200")])
        );
        assert_eq!(
            query(Form, false, object.clone()),
            pairs(&[("color", "R,100,G,200")])
        );
        assert_eq!(
            query(SpaceDelimited, false, array.clone()),
            pairs(&[("color", "blue black")])
        );
        assert_eq!(
            query(PipeDelimited, false, array),
            pairs(&[("color", "blue|black")])
        );
        assert_eq!(
            query(DeepObject, true, json!({"R": 100, "nested": {"x": "y"}})),
            pairs(&[("color[R]", "100"), ("color[nested][x]", "y")])
        );
    }

    #[test]
    fn nulls_are_omitted() {
        assert!(query(ParameterStyle::Form, true, Value::Null).is_empty());
        assert_eq!(
            query(ParameterStyle::Form, true, json!(["a", null, "b"])),
            pairs(&[("color", "a"), ("color", "b")])
        );
        let header = param(ParameterLocation::Header, ParameterStyle::Simple, false);
        assert_eq!(header_value(&header, &Value::Null), None);
    }

    #[test]
    fn header_and_cookie() {
        let header = param(ParameterLocation::Header, ParameterStyle::Simple, false);
        assert_eq!(
            header_value(&header, &json!([1, 2, 3])).as_deref(),
            Some("1,2,3")
        );
        assert_eq!(
            header_value(&header, &json!("a b")).as_deref(),
            Some("a b")
        );

        let cookie = param(ParameterLocation::Cookie, ParameterStyle::Form, false);
        assert_eq!(
            cookie_pairs(&cookie, &json!(["x", "y"])),
            pairs(&[("color", "x,y")])
        );
    }
}

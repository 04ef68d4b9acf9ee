//! JSON Pointer locations and `$ref` parsing.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use serde_json::Value;
use url::Url;

use crate::error::SpecError;

/// A node position: an optional external document URI plus a canonical
/// JSON Pointer inside it. `document == None` is the root document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    document: Option<Arc<str>>,
    pointer: String,
}

impl Location {
    /// A location inside the root document. The pointer is canonicalized.
    pub fn root(pointer: &str) -> Self {
        Self {
            document: None,
            pointer: canonical_pointer(pointer),
        }
    }

    /// A location inside an external document.
    pub fn external(document: impl Into<Arc<str>>, pointer: &str) -> Self {
        Self {
            document: Some(document.into()),
            pointer: canonical_pointer(pointer),
        }
    }

    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    /// Descend into an object key.
    pub fn child(&self, key: &str) -> Self {
        Self {
            document: self.document.clone(),
            pointer: format!("{}/{}", self.pointer, escape_segment(key)),
        }
    }

    /// Descend into an array index.
    pub fn index(&self, index: usize) -> Self {
        Self {
            document: self.document.clone(),
            pointer: format!("{}/{}", self.pointer, index),
        }
    }

    /// Unescaped pointer segments.
    pub fn segments(&self) -> Vec<String> {
        split_pointer(&self.pointer)
    }

    /// Memoization key: `<document>#<pointer>`, empty document for the root.
    pub fn key(&self) -> String {
        format!("{}#{}", self.document.as_deref().unwrap_or(""), self.pointer)
    }

    /// Resolve a `$ref` string written at this location.
    ///
    /// `root_base` is the base URI of the root document, used to join
    /// relative references written in it.
    pub fn join(&self, reference: &str, root_base: Option<&str>) -> Result<Location, SpecError> {
        let (doc_part, fragment) = match reference.split_once('#') {
            Some((doc, frag)) => (doc, frag),
            None => (reference, ""),
        };

        if !fragment.is_empty() && !fragment.starts_with('/') {
            return Err(SpecError::invalid(format!(
                "unsupported $ref '{}' (only JSON Pointer fragments are supported)",
                reference
            )));
        }

        let document = if doc_part.is_empty() {
            self.document.clone()
        } else {
            let base = self.document.as_deref().or(root_base);
            Some(Arc::from(join_uri(base, doc_part)))
        };

        Ok(Location {
            document,
            pointer: canonical_pointer(fragment),
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.document.as_deref().unwrap_or(""), self.pointer)
    }
}

/// Return the `$ref` string if `value` is a reference object.
pub fn reference_of(value: &Value) -> Option<&str> {
    value.as_object()?.get("$ref")?.as_str()
}

/// Walk a canonical pointer inside `root`.
pub fn lookup<'a>(root: &'a Value, pointer: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in split_pointer(pointer) {
        current = match current {
            Value::Object(map) => map.get(&segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Escape a key for use as a pointer segment.
pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Decode a pointer segment (`~1`, `~0`, then percent-decoding).
pub fn unescape_segment(segment: &str) -> String {
    let decoded = segment.replace("~1", "/").replace("~0", "~");
    percent_decode_str(&decoded).decode_utf8_lossy().into_owned()
}

fn split_pointer(pointer: &str) -> Vec<String> {
    if pointer.is_empty() {
        return Vec::new();
    }
    pointer
        .trim_start_matches('/')
        .split('/')
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .collect()
}

/// Normalize a pointer so that differently-escaped spellings of the same
/// target share one memoization key.
fn canonical_pointer(pointer: &str) -> String {
    let pointer = pointer.trim_start_matches('#');
    if pointer.is_empty() {
        return String::new();
    }
    pointer
        .trim_start_matches('/')
        .split('/')
        .map(|segment| escape_segment(&unescape_segment(segment)))
        .fold(String::new(), |mut acc, segment| {
            acc.push('/');
            acc.push_str(&segment);
            acc
        })
}

fn join_uri(base: Option<&str>, reference: &str) -> String {
    if Url::parse(reference).is_ok() {
        return reference.to_string();
    }
    let Some(base) = base else {
        return reference.to_string();
    };
    if let Ok(base_url) = Url::parse(base) {
        if let Ok(joined) = base_url.join(reference) {
            return joined.to_string();
        }
    }
    let parent = Path::new(base).parent().unwrap_or_else(|| Path::new(""));
    normalize_path(&parent.join(reference))
}

fn normalize_path(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                if parts.last().is_some_and(|p| p != "..") {
                    parts.pop();
                } else {
                    parts.push("..".into());
                }
            }
            std::path::Component::RootDir => parts.push(String::new()),
            other => parts.push(other.as_os_str().to_string_lossy().into_owned()),
        }
    }
    if parts.len() == 1 && parts[0].is_empty() {
        return "/".into();
    }
    parts.join("/")
}

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::schema::{SchemaArena, SchemaId};
use crate::security::{SecurityRequirement, SecurityScheme};

/// A loaded OpenAPI document: every path, operation and component, with all
/// references resolved.
#[derive(Debug, Clone)]
pub struct ApiSpec {
    /// The `openapi` version string (e.g. "3.0.3").
    pub version: String,
    pub info: Info,
    /// Document-level servers.
    pub servers: Vec<Server>,
    /// Path templates in declaration order.
    pub paths: IndexMap<String, PathItem>,
    pub components: Components,
    /// Global security requirements. `None` when the document declares none.
    pub security: Option<Vec<SecurityRequirement>>,
    pub schemas: SchemaArena,
    pub(crate) operations_by_id: HashMap<String, Arc<Operation>>,
}

impl ApiSpec {
    /// Find an operation by its exact operationId.
    pub fn operation(&self, operation_id: &str) -> Option<&Arc<Operation>> {
        self.operations_by_id.get(operation_id)
    }

    /// All operations, in path then method order.
    pub fn operations(&self) -> impl Iterator<Item = &Arc<Operation>> {
        self.paths.values().flat_map(|item| item.operations())
    }

    /// Look up a named component schema.
    pub fn schema(&self, name: &str) -> Option<SchemaId> {
        self.components.schemas.get(name).copied()
    }
}

/// The `info` object.
#[derive(Debug, Clone, Default)]
pub struct Info {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

/// A server entry, with variables substituted by their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    pub url: String,
    pub description: Option<String>,
}

/// Named components.
#[derive(Debug, Clone, Default)]
pub struct Components {
    pub schemas: IndexMap<String, SchemaId>,
    pub security_schemes: IndexMap<String, SecurityScheme>,
}

/// HTTP methods an OpenAPI path item may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl Method {
    pub const ALL: [Method; 8] = [
        Method::Get,
        Method::Put,
        Method::Post,
        Method::Delete,
        Method::Options,
        Method::Head,
        Method::Patch,
        Method::Trace,
    ];

    /// The lower-case key used in path items.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Put => "put",
            Method::Post => "post",
            Method::Delete => "delete",
            Method::Options => "options",
            Method::Head => "head",
            Method::Patch => "patch",
            Method::Trace => "trace",
        }
    }

    /// The upper-case wire name.
    pub fn as_http(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Head => "HEAD",
            Method::Patch => "PATCH",
            Method::Trace => "TRACE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_http())
    }
}

/// One path template and its operations.
#[derive(Debug, Clone, Default)]
pub struct PathItem {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub servers: Vec<Server>,
    /// Parameters shared by every operation on this path.
    pub parameters: Vec<Arc<Parameter>>,
    pub get: Option<Arc<Operation>>,
    pub put: Option<Arc<Operation>>,
    pub post: Option<Arc<Operation>>,
    pub delete: Option<Arc<Operation>>,
    pub options: Option<Arc<Operation>>,
    pub head: Option<Arc<Operation>>,
    pub patch: Option<Arc<Operation>>,
    pub trace: Option<Arc<Operation>>,
}

impl PathItem {
    pub fn get_operation(&self, method: Method) -> Option<&Arc<Operation>> {
        self.slot(method).as_ref()
    }

    pub(crate) fn set_operation(&mut self, method: Method, operation: Arc<Operation>) {
        *self.slot_mut(method) = Some(operation);
    }

    /// Declared operations in method order.
    pub fn operations(&self) -> impl Iterator<Item = &Arc<Operation>> {
        Method::ALL
            .into_iter()
            .filter_map(move |method| self.get_operation(method))
    }

    fn slot(&self, method: Method) -> &Option<Arc<Operation>> {
        match method {
            Method::Get => &self.get,
            Method::Put => &self.put,
            Method::Post => &self.post,
            Method::Delete => &self.delete,
            Method::Options => &self.options,
            Method::Head => &self.head,
            Method::Patch => &self.patch,
            Method::Trace => &self.trace,
        }
    }

    fn slot_mut(&mut self, method: Method) -> &mut Option<Arc<Operation>> {
        match method {
            Method::Get => &mut self.get,
            Method::Put => &mut self.put,
            Method::Post => &mut self.post,
            Method::Delete => &mut self.delete,
            Method::Options => &mut self.options,
            Method::Head => &mut self.head,
            Method::Patch => &mut self.patch,
            Method::Trace => &mut self.trace,
        }
    }
}

/// A single API operation (path + method).
#[derive(Debug, Clone)]
pub struct Operation {
    /// Declared, or synthesized as `<method>_<path>` when absent.
    pub operation_id: String,
    pub method: Method,
    /// The path template (e.g. "/pets/{id}").
    pub path: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub deprecated: bool,
    /// Merged path-item and operation parameters, in declaration order.
    pub parameters: Vec<Arc<Parameter>>,
    pub request_body: Option<Arc<RequestBody>>,
    pub responses: Responses,
    /// Effective servers: operation, then path item, then document.
    pub servers: Vec<Server>,
    /// Operation-level security. `None` means the global requirements apply.
    pub security: Option<Vec<SecurityRequirement>>,
}

impl Operation {
    pub fn parameters(&self) -> &[Arc<Parameter>] {
        &self.parameters
    }

    /// Find a parameter by name, in any location.
    pub fn parameter(&self, name: &str) -> Option<&Arc<Parameter>> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Where a parameter is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
        }
    }

    /// The style used when none is declared.
    pub fn default_style(&self) -> ParameterStyle {
        match self {
            Self::Query | Self::Cookie => ParameterStyle::Form,
            Self::Path | Self::Header => ParameterStyle::Simple,
        }
    }

    /// Whether `style` may be used in this location.
    pub fn allows(&self, style: ParameterStyle) -> bool {
        use ParameterStyle::*;
        match self {
            Self::Path => matches!(style, Simple | Label | Matrix),
            Self::Query => matches!(style, Form | SpaceDelimited | PipeDelimited | DeepObject),
            Self::Header => matches!(style, Simple),
            Self::Cookie => matches!(style, Form),
        }
    }
}

/// Parameter serialization style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterStyle {
    Simple,
    Form,
    Label,
    Matrix,
    SpaceDelimited,
    PipeDelimited,
    DeepObject,
}

impl ParameterStyle {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "simple" => Some(Self::Simple),
            "form" => Some(Self::Form),
            "label" => Some(Self::Label),
            "matrix" => Some(Self::Matrix),
            "spaceDelimited" => Some(Self::SpaceDelimited),
            "pipeDelimited" => Some(Self::PipeDelimited),
            "deepObject" => Some(Self::DeepObject),
            _ => None,
        }
    }
}

/// An operation or path-item parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub description: Option<String>,
    /// Always true for path parameters.
    pub required: bool,
    pub deprecated: bool,
    pub style: ParameterStyle,
    pub explode: bool,
    pub allow_reserved: bool,
    /// `None` when the parameter declares neither `schema` nor `content`.
    pub schema: Option<SchemaId>,
}

/// One entry of a `content` map.
#[derive(Debug, Clone)]
pub struct MediaType {
    pub schema: Option<SchemaId>,
    pub example: Option<Value>,
}

/// A request body declaration.
#[derive(Debug, Clone)]
pub struct RequestBody {
    pub description: Option<String>,
    pub required: bool,
    /// Media type → schema, in declaration order.
    pub content: IndexMap<String, MediaType>,
}

impl RequestBody {
    /// The media type a client sends: `application/json` if declared,
    /// otherwise the first one.
    pub fn preferred_media_type(&self) -> Option<(&str, &MediaType)> {
        self.content
            .get_key_value("application/json")
            .or_else(|| self.content.first())
            .map(|(k, v)| (k.as_str(), v))
    }
}

/// One declared response.
#[derive(Debug, Clone)]
pub struct Response {
    pub description: Option<String>,
    pub content: IndexMap<String, MediaType>,
    /// Declared header names.
    pub headers: Vec<String>,
}

impl Response {
    /// The media type whose schema applies to a received `Content-Type`.
    ///
    /// Parameters on the received type are ignored. Falls back to the
    /// declared `application/json`, then to the first declared type.
    pub fn media_type(&self, content_type: Option<&str>) -> Option<(&str, &MediaType)> {
        if let Some(received) = content_type {
            let essence = received
                .split(';')
                .next()
                .unwrap_or(received)
                .trim()
                .to_ascii_lowercase();
            if let Some((k, v)) = self.content.get_key_value(essence.as_str()) {
                return Some((k.as_str(), v));
            }
            if let Some((k, v)) = self
                .content
                .iter()
                .find(|(k, _)| media_range_matches(k, &essence))
            {
                return Some((k.as_str(), v));
            }
        }
        self.content
            .get_key_value("application/json")
            .or_else(|| self.content.first())
            .map(|(k, v)| (k.as_str(), v))
    }
}

fn media_range_matches(range: &str, essence: &str) -> bool {
    match range.split_once('/') {
        Some(("*", "*")) => true,
        Some((kind, "*")) => essence.split('/').next() == Some(kind),
        _ => false,
    }
}

/// Responses of an operation, keyed by status code, range (`4XX`) or `default`.
#[derive(Debug, Clone, Default)]
pub struct Responses {
    entries: IndexMap<String, Arc<Response>>,
}

impl Responses {
    pub(crate) fn insert(&mut self, key: String, response: Arc<Response>) {
        self.entries.insert(key, response);
    }

    /// Match a received status: exact code, then range, then `default`.
    pub fn lookup(&self, status: u16) -> Option<(&str, &Arc<Response>)> {
        let exact = status.to_string();
        let range = format!("{}XX", status / 100);
        for key in [exact.as_str(), range.as_str(), "default"] {
            if let Some((k, v)) = self.entries.get_key_value(key) {
                return Some((k.as_str(), v));
            }
        }
        None
    }

    pub fn get(&self, key: &str) -> Option<&Arc<Response>> {
        self.entries.get(key)
    }

    /// Declared keys other than `default`, in declaration order.
    pub fn codes(&self) -> Vec<String> {
        self.entries
            .keys()
            .filter(|k| k.as_str() != "default")
            .cloned()
            .collect()
    }

    pub fn has_default(&self) -> bool {
        self.entries.contains_key("default")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

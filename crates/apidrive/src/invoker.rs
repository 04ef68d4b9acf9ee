//! Request construction and response interpretation.
//!
//! [`Invoker::prepare`] turns call arguments into an [`HttpRequest`];
//! [`Invoker::finish`] matches the [`HttpResponse`] against the declared
//! responses and validates its body. Both the blocking and async call paths
//! go through these two steps.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use url::Url;

use apidrive_schema::{Instance, ModelError, ModelRegistry};
use apidrive_spec::{ApiSpec, MediaType, Operation, ParameterLocation, SchemaId};
use apidrive_telemetry::{log_response_received, log_unexpected_response, log_validation_failure};

use crate::auth::AuthContext;
use crate::config::ClientConfig;
use crate::error::{Error, UnexpectedResponseError};
use crate::security::SecurityHandler;
use crate::serialize;
use crate::transport::{HttpRequest, HttpResponse};

/// Arguments for one operation call.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub parameters: IndexMap<String, Value>,
    pub data: Option<Value>,
    /// Extra headers, applied before header parameters and security.
    pub headers: Vec<(String, String)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Request body.
    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Decoded response payload.
#[derive(Debug, Clone)]
pub enum ResponseBody {
    /// No declared content, or an empty payload.
    Empty,
    /// A JSON body validated against the declared schema.
    Model(Instance),
    Text(String),
    Bytes(Vec<u8>),
}

/// A response that matched one of the operation's declared responses.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// The declared key that matched: a code, a range such as `4XX`, or `default`.
    pub matched_key: String,
    pub headers: HashMap<String, String>,
    pub body: ResponseBody,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn model(&self) -> Option<&Instance> {
        match &self.body {
            ResponseBody::Model(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn into_model(self) -> Option<Instance> {
        match self.body {
            ResponseBody::Model(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Shared request/response pipeline for one loaded document.
pub struct Invoker {
    spec: Arc<ApiSpec>,
    models: Arc<ModelRegistry>,
    config: ClientConfig,
}

impl Invoker {
    pub fn new(spec: Arc<ApiSpec>, models: Arc<ModelRegistry>, config: ClientConfig) -> Self {
        Self {
            spec,
            models,
            config,
        }
    }

    pub fn spec(&self) -> &Arc<ApiSpec> {
        &self.spec
    }

    pub fn models(&self) -> &Arc<ModelRegistry> {
        &self.models
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Find an operation by id; spaces and hyphens match underscores.
    pub fn operation(&self, operation_id: &str) -> Result<&Arc<Operation>, Error> {
        if let Some(op) = self.spec.operation(operation_id) {
            return Ok(op);
        }
        let wanted = normalize_operation_id(operation_id);
        self.spec
            .operations()
            .find(|op| normalize_operation_id(&op.operation_id) == wanted)
            .ok_or_else(|| Error::UnknownOperation(operation_id.to_string()))
    }

    /// Build the request for `op`.
    pub fn prepare(
        &self,
        op: &Operation,
        args: &CallArgs,
        auth: &AuthContext,
    ) -> Result<HttpRequest, Error> {
        for name in args.parameters.keys() {
            if op.parameter(name).is_none() {
                return Err(Error::InvalidArgument(format!(
                    "{} got an unexpected parameter '{}'",
                    op.operation_id, name
                )));
            }
        }

        let mut path = op.path.clone();
        let mut headers = Vec::new();
        let mut query = Vec::new();
        let mut cookies = Vec::new();

        for param in op.parameters() {
            let value = match args.parameters.get(&param.name) {
                Some(value) => value,
                None if param.required => {
                    return Err(Error::InvalidArgument(format!(
                        "Required parameter {} not provided",
                        param.name
                    )))
                }
                None => continue,
            };
            if let Some(schema) = param.schema {
                self.validate(&op.operation_id, schema, value)?;
            }

            match param.location {
                ParameterLocation::Path => {
                    let slot = format!("{{{}}}", param.name);
                    path = path.replace(&slot, &serialize::path_value(param, value));
                }
                ParameterLocation::Query => query.extend(serialize::query_pairs(param, value)),
                ParameterLocation::Header => {
                    if let Some(v) = serialize::header_value(param, value) {
                        headers.push((param.name.clone(), v));
                    }
                }
                ParameterLocation::Cookie => cookies.extend(serialize::cookie_pairs(param, value)),
            }
        }

        let base = self.base_url(op)?;
        let mut request = HttpRequest::new(
            op.method.as_http(),
            format!("{}{}", base.trim_end_matches('/'), path),
        );
        for (name, value) in self.config.default_headers.iter().chain(&args.headers) {
            request.set_header(name.as_str(), value.as_str());
        }
        for (name, value) in headers {
            request.set_header(name, value);
        }
        for (name, value) in &cookies {
            request.add_cookie(name, value);
        }
        request.query = query;

        self.body(op, args.data.as_ref(), &mut request)?;

        let requirements = op
            .security
            .as_deref()
            .or(self.spec.security.as_deref());
        SecurityHandler::inject(
            &mut request,
            &op.operation_id,
            requirements,
            &self.spec.components.security_schemes,
            auth,
        )?;

        Ok(request)
    }

    /// Match and decode the response to `op`.
    pub fn finish(&self, op: &Operation, response: HttpResponse) -> Result<ApiResponse, Error> {
        let Some((key, declared)) = op.responses.lookup(response.status) else {
            let err = UnexpectedResponseError {
                status_code: response.status,
                operation_id: op.operation_id.clone(),
                expected_codes: op.responses.codes(),
                default_defined: op.responses.has_default(),
            };
            log_unexpected_response!(
                operation_id = %op.operation_id,
                status = response.status
            );
            return Err(err.into());
        };

        log_response_received!(
            operation_id = %op.operation_id,
            status = response.status,
            matched = %key
        );

        let body = match declared.media_type(response.content_type()) {
            _ if response.body.is_empty() => ResponseBody::Empty,
            None => ResponseBody::Empty,
            Some((media, declared_media)) => {
                self.decode(op, media, declared_media, &response)?
            }
        };

        Ok(ApiResponse {
            status: response.status,
            matched_key: key.to_string(),
            headers: response.headers,
            body,
        })
    }

    fn decode(
        &self,
        op: &Operation,
        media: &str,
        declared: &MediaType,
        response: &HttpResponse,
    ) -> Result<ResponseBody, Error> {
        // A wildcard declaration defers to what the server actually sent.
        let effective = if media.contains('*') {
            response.content_type().unwrap_or(media)
        } else {
            media
        };

        if is_json(effective) {
            let value: Value =
                serde_json::from_slice(&response.body).map_err(|e| Error::InvalidResponseBody {
                    operation_id: op.operation_id.clone(),
                    reason: e.to_string(),
                })?;
            let instance = match declared.schema {
                Some(schema) => self.validate(&op.operation_id, schema, &value)?,
                None => self.models.validate(self.models.any(), &value)?,
            };
            return Ok(ResponseBody::Model(instance));
        }

        if effective.starts_with("text/") {
            return Ok(ResponseBody::Text(
                String::from_utf8_lossy(&response.body).into_owned(),
            ));
        }
        Ok(ResponseBody::Bytes(response.body.clone()))
    }

    fn body(
        &self,
        op: &Operation,
        data: Option<&Value>,
        request: &mut HttpRequest,
    ) -> Result<(), Error> {
        let Some(request_body) = &op.request_body else {
            if data.is_some() {
                tracing::warn!(
                    operation_id = %op.operation_id,
                    "operation declares no request body; ignoring data"
                );
            }
            return Ok(());
        };

        let Some(data) = data else {
            if request_body.required {
                return Err(Error::InvalidArgument(format!(
                    "Request body is required for {}",
                    op.operation_id
                )));
            }
            return Ok(());
        };

        let Some((media, declared)) = request_body.preferred_media_type() else {
            tracing::warn!(
                operation_id = %op.operation_id,
                "request body declares no media type; ignoring data"
            );
            return Ok(());
        };

        if let Some(schema) = declared.schema {
            self.validate(&op.operation_id, schema, data)?;
        }

        let bytes = if is_json(media) {
            data.to_string().into_bytes()
        } else if media == "application/x-www-form-urlencoded" {
            form_urlencoded(data).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "{} expects an object for {}",
                    op.operation_id, media
                ))
            })?
        } else {
            match data {
                Value::String(s) => s.clone().into_bytes(),
                other => other.to_string().into_bytes(),
            }
        };

        request.set_header("Content-Type", media);
        request.body = Some(bytes);
        Ok(())
    }

    fn base_url(&self, op: &Operation) -> Result<String, Error> {
        let candidate = match &self.config.base_url {
            Some(base) => base.clone(),
            None => op
                .servers
                .first()
                .map(|s| s.url.clone())
                .ok_or_else(|| {
                    Error::Config(format!(
                        "no server declared for {}; set a base URL",
                        op.operation_id
                    ))
                })?,
        };

        match Url::parse(&candidate) {
            Ok(url) if url.has_host() => Ok(candidate),
            _ => Err(Error::Config(format!(
                "server URL '{}' for {} is not absolute; set a base URL",
                candidate, op.operation_id
            ))),
        }
    }

    fn validate(
        &self,
        operation_id: &str,
        schema: SchemaId,
        value: &Value,
    ) -> Result<Instance, ModelError> {
        self.models.validate_schema(schema, value).inspect_err(|e| {
            log_validation_failure!(operation_id = %operation_id, error = %e);
        })
    }
}

fn normalize_operation_id(id: &str) -> String {
    id.chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

fn is_json(media: &str) -> bool {
    let essence = media.split(';').next().unwrap_or(media).trim();
    essence.eq_ignore_ascii_case("application/json") || essence.ends_with("+json")
}

fn form_urlencoded(data: &Value) -> Option<Vec<u8>> {
    let fields = data.as_object()?;
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        match value {
            Value::Null => {}
            Value::String(s) => {
                serializer.append_pair(key, s);
            }
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::String(s) => serializer.append_pair(key, s),
                        other => serializer.append_pair(key, &other.to_string()),
                    };
                }
            }
            other => {
                serializer.append_pair(key, &other.to_string());
            }
        }
    }
    Some(serializer.finish().into_bytes())
}

//! Security scheme declarations and requirements.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::SpecError;

/// Where an API key is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyLocation {
    Header,
    Query,
    Cookie,
}

/// The `scheme` of an `http` security scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpAuthScheme {
    Basic,
    Bearer,
    Digest,
    /// Any other registered scheme name, lower-cased.
    Other(String),
}

impl HttpAuthScheme {
    fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Self::Basic,
            "bearer" => Self::Bearer,
            "digest" => Self::Digest,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A declared security scheme.
#[derive(Debug, Clone, PartialEq)]
pub enum SecurityScheme {
    ApiKey {
        name: String,
        location: ApiKeyLocation,
    },
    Http {
        scheme: HttpAuthScheme,
        bearer_format: Option<String>,
    },
    OAuth2 {
        flows: Value,
    },
    OpenIdConnect {
        url: String,
    },
    MutualTls,
}

impl SecurityScheme {
    /// Parse a resolved `securitySchemes` entry.
    pub fn from_value(name: &str, value: &Value) -> Result<Self, SpecError> {
        let obj = value.as_object().ok_or_else(|| {
            SpecError::invalid(format!("security scheme '{}' must be an object", name))
        })?;
        let field = |key: &str| -> Result<&str, SpecError> {
            obj.get(key).and_then(|v| v.as_str()).ok_or_else(|| {
                SpecError::invalid(format!("security scheme '{}' is missing '{}'", name, key))
            })
        };

        match field("type")? {
            "apiKey" => {
                let location = match field("in")? {
                    "header" => ApiKeyLocation::Header,
                    "query" => ApiKeyLocation::Query,
                    "cookie" => ApiKeyLocation::Cookie,
                    other => {
                        return Err(SpecError::invalid(format!(
                            "security scheme '{}' has invalid 'in': {}",
                            name, other
                        )))
                    }
                };
                Ok(SecurityScheme::ApiKey {
                    name: field("name")?.to_string(),
                    location,
                })
            }
            "http" => Ok(SecurityScheme::Http {
                scheme: HttpAuthScheme::parse(field("scheme")?),
                bearer_format: obj
                    .get("bearerFormat")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
            }),
            "oauth2" => Ok(SecurityScheme::OAuth2 {
                flows: obj.get("flows").cloned().unwrap_or(Value::Null),
            }),
            "openIdConnect" => Ok(SecurityScheme::OpenIdConnect {
                url: field("openIdConnectUrl")?.to_string(),
            }),
            "mutualTLS" => Ok(SecurityScheme::MutualTls),
            other => Err(SpecError::invalid(format!(
                "security scheme '{}' has unknown type '{}'",
                name, other
            ))),
        }
    }
}

/// One alternative of a security requirement list: every named scheme must
/// be satisfied. An empty alternative means "no authentication".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityRequirement {
    pub schemes: IndexMap<String, Vec<String>>,
}

impl SecurityRequirement {
    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }

    pub fn scheme_names(&self) -> impl Iterator<Item = &str> {
        self.schemes.keys().map(String::as_str)
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        let schemes = map
            .iter()
            .map(|(name, scopes)| {
                let scopes = scopes
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|s| s.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
                (name.clone(), scopes)
            })
            .collect();
        Self { schemes }
    }
}

/// Parse a `security` array. `None` when the key is absent.
pub fn parse_requirements(
    value: Option<&Value>,
    context: &str,
) -> Result<Option<Vec<SecurityRequirement>>, SpecError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let items = value
        .as_array()
        .ok_or_else(|| SpecError::invalid(format!("'security' of {} must be an array", context)))?;
    items
        .iter()
        .map(|item| {
            item.as_object()
                .map(SecurityRequirement::from_map)
                .ok_or_else(|| {
                    SpecError::invalid(format!(
                        "security requirement of {} must be an object",
                        context
                    ))
                })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_api_key_scheme() {
        let scheme =
            SecurityScheme::from_value("cookieAuth", &json!({"type": "apiKey", "in": "cookie", "name": "Session"}))
                .unwrap();
        assert_eq!(
            scheme,
            SecurityScheme::ApiKey {
                name: "Session".into(),
                location: ApiKeyLocation::Cookie
            }
        );
    }

    #[test]
    fn http_scheme_names_are_case_insensitive() {
        let scheme =
            SecurityScheme::from_value("b", &json!({"type": "http", "scheme": "Bearer"})).unwrap();
        assert!(matches!(
            scheme,
            SecurityScheme::Http {
                scheme: HttpAuthScheme::Bearer,
                ..
            }
        ));
    }

    #[test]
    fn reject_unknown_scheme_type() {
        let err = SecurityScheme::from_value("x", &json!({"type": "magic"})).unwrap_err();
        assert!(err.to_string().contains("unknown type 'magic'"));
    }

    #[test]
    fn parse_requirement_alternatives() {
        let reqs = parse_requirements(
            Some(&json!([{"api_key": []}, {"oauth": ["read", "write"]}, {}])),
            "document",
        )
        .unwrap()
        .unwrap();
        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs[1].schemes["oauth"], vec!["read", "write"]);
        assert!(reqs[2].is_empty());
        assert!(parse_requirements(None, "document").unwrap().is_none());
    }
}

//! Applies stored credentials to outgoing requests.

use base64::{engine::general_purpose::STANDARD, Engine};
use indexmap::IndexMap;

use apidrive_spec::{ApiKeyLocation, HttpAuthScheme, SecurityRequirement, SecurityScheme};
use apidrive_telemetry::log_security_applied;

use crate::auth::{AuthContext, Credentials};
use crate::error::SecurityError;
use crate::transport::{DigestCredentials, HttpRequest};

/// The credential shape a scheme accepts, or why it accepts none.
fn expected_credentials(name: &str, scheme: &SecurityScheme) -> Result<&'static str, SecurityError> {
    match scheme {
        SecurityScheme::ApiKey { .. } => Ok("token"),
        SecurityScheme::Http { scheme, .. } => match scheme {
            HttpAuthScheme::Basic | HttpAuthScheme::Digest => Ok("username/password"),
            HttpAuthScheme::Bearer => Ok("token"),
            HttpAuthScheme::Other(other) => Err(SecurityError::Unsupported {
                scheme: name.to_string(),
                kind: format!("http/{}", other),
            }),
        },
        SecurityScheme::OAuth2 { .. } | SecurityScheme::OpenIdConnect { .. } => Ok("token"),
        SecurityScheme::MutualTls => Err(SecurityError::Unsupported {
            scheme: name.to_string(),
            kind: "mutualTLS".to_string(),
        }),
    }
}

/// Check `credentials` fit the scheme declared as `name`.
pub fn check_credentials(
    name: &str,
    schemes: &IndexMap<String, SecurityScheme>,
    credentials: &Credentials,
) -> Result<(), SecurityError> {
    let scheme = schemes
        .get(name)
        .ok_or_else(|| SecurityError::UnknownScheme(name.to_string()))?;
    let expected = expected_credentials(name, scheme)?;
    if credentials.kind() != expected {
        return Err(SecurityError::CredentialMismatch {
            scheme: name.to_string(),
            expected: expected.to_string(),
        });
    }
    Ok(())
}

/// Selects a satisfiable security alternative and injects its credentials.
pub struct SecurityHandler;

impl SecurityHandler {
    /// Apply credentials for one operation.
    ///
    /// `requirements` are the effective alternatives (operation-level or
    /// document-level). The first non-empty alternative whose schemes all
    /// have credentials wins. An empty alternative makes the call
    /// anonymous when nothing else is satisfied.
    pub fn inject(
        request: &mut HttpRequest,
        operation_id: &str,
        requirements: Option<&[SecurityRequirement]>,
        schemes: &IndexMap<String, SecurityScheme>,
        auth: &AuthContext,
    ) -> Result<(), SecurityError> {
        let requirements = match requirements {
            Some(r) if !r.is_empty() => r,
            _ => return Ok(()),
        };

        let chosen = requirements
            .iter()
            .filter(|r| !r.is_empty())
            .find(|r| r.scheme_names().all(|name| auth.contains(name)));

        let requirement = match chosen {
            Some(requirement) => requirement,
            None if requirements.iter().any(SecurityRequirement::is_empty) => return Ok(()),
            None => {
                return Err(SecurityError::NoCredentials {
                    operation_id: operation_id.to_string(),
                    alternatives: requirements
                        .iter()
                        .map(|r| r.scheme_names().collect::<Vec<_>>().join(" + "))
                        .collect(),
                })
            }
        };

        for name in requirement.scheme_names() {
            let scheme = schemes
                .get(name)
                .ok_or_else(|| SecurityError::UnknownScheme(name.to_string()))?;
            // Presence was checked when the alternative was chosen.
            let Some(credentials) = auth.get(name) else {
                continue;
            };
            apply(request, name, scheme, credentials)?;
            log_security_applied!(operation_id = %operation_id, scheme = %name);
        }
        Ok(())
    }
}

fn apply(
    request: &mut HttpRequest,
    name: &str,
    scheme: &SecurityScheme,
    credentials: &Credentials,
) -> Result<(), SecurityError> {
    let expected = expected_credentials(name, scheme)?;
    let mismatch = || SecurityError::CredentialMismatch {
        scheme: name.to_string(),
        expected: expected.to_string(),
    };

    match (scheme, credentials) {
        (
            SecurityScheme::ApiKey {
                name: key_name,
                location,
            },
            Credentials::Token(token),
        ) => match location {
            ApiKeyLocation::Header => request.set_header(key_name.as_str(), token.as_str()),
            ApiKeyLocation::Query => request.query.push((key_name.clone(), token.clone())),
            ApiKeyLocation::Cookie => request.add_cookie(key_name, token),
        },
        (
            SecurityScheme::Http {
                scheme: HttpAuthScheme::Basic,
                ..
            },
            Credentials::Basic { username, password },
        ) => {
            let encoded = STANDARD.encode(format!("{}:{}", username, password));
            request.set_header("Authorization", format!("Basic {}", encoded));
        }
        (
            SecurityScheme::Http {
                scheme: HttpAuthScheme::Digest,
                ..
            },
            Credentials::Basic { username, password },
        ) => {
            request.digest = Some(DigestCredentials {
                username: username.clone(),
                password: password.clone(),
            });
        }
        (
            SecurityScheme::Http {
                scheme: HttpAuthScheme::Bearer,
                ..
            }
            | SecurityScheme::OAuth2 { .. }
            | SecurityScheme::OpenIdConnect { .. },
            Credentials::Token(token),
        ) => {
            request.set_header("Authorization", format!("Bearer {}", token));
        }
        _ => return Err(mismatch()),
    }
    Ok(())
}

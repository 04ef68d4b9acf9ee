//! HTTP Digest access authentication (RFC 7616): MD5 and SHA-256, plain
//! and `-sess`, with or without `qop=auth`.

use md5::Md5;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::transport::{DigestCredentials, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Algorithm {
    Md5,
    Sha256,
}

impl Algorithm {
    fn hash_hex(self, input: &str) -> String {
        match self {
            Algorithm::Md5 => hex_digest::<Md5>(input),
            Algorithm::Sha256 => hex_digest::<Sha256>(input),
        }
    }

    fn name(self, session: bool) -> &'static str {
        match (self, session) {
            (Algorithm::Md5, false) => "MD5",
            (Algorithm::Md5, true) => "MD5-sess",
            (Algorithm::Sha256, false) => "SHA-256",
            (Algorithm::Sha256, true) => "SHA-256-sess",
        }
    }
}

/// A parsed `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Challenge {
    pub algorithm: Algorithm,
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    pub qop_auth: bool,
    pub session: bool,
}

impl Challenge {
    /// Parse one header value. Returns `None` for non-digest schemes.
    pub fn parse(header: &str) -> Option<Result<Self, TransportError>> {
        let header = header.trim();
        let (scheme, rest) = header.split_once(' ').unwrap_or((header, ""));
        if !scheme.eq_ignore_ascii_case("digest") {
            return None;
        }
        Some(Self::from_params(&parse_params(rest)))
    }

    fn from_params(params: &[(String, String)]) -> Result<Self, TransportError> {
        let get = |name: &str| {
            params
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone())
        };

        // An absent algorithm means MD5.
        let algorithm = get("algorithm").unwrap_or_else(|| "MD5".to_string());
        let (algorithm, session) = match algorithm.to_ascii_uppercase().as_str() {
            "MD5" => (Algorithm::Md5, false),
            "MD5-SESS" => (Algorithm::Md5, true),
            "SHA-256" => (Algorithm::Sha256, false),
            "SHA-256-SESS" => (Algorithm::Sha256, true),
            other => {
                return Err(TransportError::Digest(format!(
                    "unsupported algorithm {}",
                    other
                )))
            }
        };

        let realm = get("realm").ok_or_else(|| TransportError::Digest("missing realm".into()))?;
        let nonce = get("nonce").ok_or_else(|| TransportError::Digest("missing nonce".into()))?;
        let qop_auth = match get("qop") {
            Some(qop) => {
                if !qop.split(',').any(|q| q.trim().eq_ignore_ascii_case("auth")) {
                    return Err(TransportError::Digest(format!("unsupported qop {}", qop)));
                }
                true
            }
            None => false,
        };

        Ok(Self {
            algorithm,
            realm,
            nonce,
            opaque: get("opaque"),
            qop_auth,
            session,
        })
    }

    /// Build the `Authorization` header value for one request.
    pub fn authorize(
        &self,
        credentials: &DigestCredentials,
        method: &str,
        uri: &str,
        cnonce: &str,
    ) -> String {
        let nc = "00000001";
        let hash = |input: String| self.algorithm.hash_hex(&input);
        let mut ha1 = hash(format!(
            "{}:{}:{}",
            credentials.username, self.realm, credentials.password
        ));
        if self.session {
            ha1 = hash(format!("{}:{}:{}", ha1, self.nonce, cnonce));
        }
        let ha2 = hash(format!("{}:{}", method, uri));
        let response = if self.qop_auth {
            hash(format!(
                "{}:{}:{}:{}:auth:{}",
                ha1, self.nonce, nc, cnonce, ha2
            ))
        } else {
            hash(format!("{}:{}:{}", ha1, self.nonce, ha2))
        };

        let algorithm = self.algorithm.name(self.session);
        let mut header = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", algorithm={}, response=\"{}\"",
            credentials.username, self.realm, self.nonce, uri, algorithm, response
        );
        if self.qop_auth {
            header.push_str(&format!(", qop=auth, nc={}, cnonce=\"{}\"", nc, cnonce));
        }
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(", opaque=\"{}\"", opaque));
        }
        header
    }
}

/// Pick a usable digest challenge among `WWW-Authenticate` values,
/// SHA-256 over MD5, otherwise in the server's order.
pub(crate) fn select_challenge<'a>(
    headers: impl IntoIterator<Item = &'a str>,
) -> Result<Challenge, TransportError> {
    let mut fallback = None;
    let mut last_error = None;
    for header in headers {
        match Challenge::parse(header) {
            Some(Ok(challenge)) if challenge.algorithm == Algorithm::Sha256 => {
                return Ok(challenge)
            }
            Some(Ok(challenge)) => {
                fallback.get_or_insert(challenge);
            }
            Some(Err(e)) => last_error = Some(e),
            None => {}
        }
    }
    fallback.ok_or_else(|| {
        last_error
            .unwrap_or_else(|| TransportError::Digest("server sent no digest challenge".into()))
    })
}

/// Random client nonce.
pub(crate) fn client_nonce() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    hex::encode(bytes)
}

fn hex_digest<D: Digest>(input: &str) -> String {
    let mut hasher = D::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Split `k=v, k="v, with comma"` into pairs.
fn parse_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if *c == ',' || c.is_whitespace()) {
            chars.next();
        }
        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' {
                break;
            }
            key.push(c);
            chars.next();
        }
        if chars.next().is_none() {
            break;
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    _ => value.push(c),
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                value.push(c);
                chars.next();
            }
        }
        params.push((key.trim().to_string(), value.trim().to_string()));
    }
    params
}

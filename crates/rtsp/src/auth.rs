//! `Authorization` header construction: Basic and RFC 2617 Digest.

use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;

use camscout_common::{Credential, Method};

static PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)(\w+)\s*=\s*(?:"([^"]*)"|([^,\s]+))"#).unwrap());

pub fn basic_authorization(credential: &Credential) -> String {
    let token = base64::engine::general_purpose::STANDARD
        .encode(format!("{}:{}", credential.username, credential.password));
    format!("Basic {token}")
}

/// Parameters of a `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub qop: Option<String>,
    pub opaque: Option<String>,
    pub algorithm: Option<String>,
}

impl DigestChallenge {
    /// Parse one header value; `None` unless it is a Digest challenge with a nonce.
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, params) = header.split_once(char::is_whitespace)?;
        if !scheme.eq_ignore_ascii_case("digest") {
            return None;
        }

        let mut challenge = DigestChallenge {
            realm: String::new(),
            nonce: String::new(),
            qop: None,
            opaque: None,
            algorithm: None,
        };
        for cap in PARAM_RE.captures_iter(params) {
            let value = cap
                .get(2)
                .or_else(|| cap.get(3))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            match cap[1].to_ascii_lowercase().as_str() {
                "realm" => challenge.realm = value,
                "nonce" => challenge.nonce = value,
                "qop" => challenge.qop = Some(value),
                "opaque" => challenge.opaque = Some(value),
                "algorithm" => challenge.algorithm = Some(value),
                _ => {}
            }
        }

        (!challenge.nonce.is_empty()).then_some(challenge)
    }

    /// Pick the first Digest challenge among several `WWW-Authenticate` values.
    pub fn find<'a, I: IntoIterator<Item = &'a str>>(headers: I) -> Option<Self> {
        headers.into_iter().find_map(Self::parse)
    }

    /// Header value answering this challenge for one request.
    pub fn authorization(&self, credential: &Credential, method: Method, uri: &str, nc: u32) -> String {
        let ha1 = hex_md5(&format!("{}:{}:{}", credential.username, self.realm, credential.password));
        let ha2 = hex_md5(&format!("{}:{}", method.as_str(), uri));

        let qop_auth = self
            .qop
            .as_deref()
            .map(|q| q.split(',').any(|v| v.trim().eq_ignore_ascii_case("auth")))
            .unwrap_or(false);

        let mut header = format!(
            r#"Digest username="{}", realm="{}", nonce="{}", uri="{}""#,
            credential.username, self.realm, self.nonce, uri
        );

        if qop_auth {
            let nc = format!("{nc:08x}");
            let cnonce = hex_md5(&format!("{}:{}:{}", self.nonce, nc, credential.username));
            let response = hex_md5(&format!("{}:{}:{}:{}:auth:{}", ha1, self.nonce, nc, cnonce, ha2));
            header.push_str(&format!(r#", response="{response}", qop=auth, nc={nc}, cnonce="{cnonce}""#));
        } else {
            let response = hex_md5(&format!("{}:{}:{}", ha1, self.nonce, ha2));
            header.push_str(&format!(r#", response="{response}""#));
        }

        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(r#", opaque="{opaque}""#));
        }
        if let Some(algorithm) = &self.algorithm {
            header.push_str(&format!(", algorithm={algorithm}"));
        }
        header
    }
}

/// How requests on a connection are currently being authorized.
#[derive(Debug, Clone, Default)]
pub enum Authorizer {
    #[default]
    Anonymous,
    Basic(Credential),
    Digest(Credential, DigestChallenge),
}

impl Authorizer {
    /// Basic for non-empty credentials, anonymous otherwise.
    pub fn for_credential(credential: Option<&Credential>) -> Self {
        match credential {
            Some(c) if !c.is_empty() => Authorizer::Basic(c.clone()),
            _ => Authorizer::Anonymous,
        }
    }

    pub fn header(&self, method: Method, uri: &str, nc: u32) -> Option<String> {
        match self {
            Authorizer::Anonymous => None,
            Authorizer::Basic(c) => Some(basic_authorization(c)),
            Authorizer::Digest(c, challenge) => Some(challenge.authorization(c, method, uri, nc)),
        }
    }

    /// Upgrade to Digest when a 401 carried a Digest challenge. Returns false when
    /// there is nothing new to try.
    pub fn upgrade<'a, I: IntoIterator<Item = &'a str>>(&mut self, challenges: I) -> bool {
        let credential = match self {
            Authorizer::Basic(c) => c.clone(),
            _ => return false,
        };
        match DigestChallenge::find(challenges) {
            Some(challenge) => {
                *self = Authorizer::Digest(credential, challenge);
                true
            }
            None => false,
        }
    }
}

fn hex_md5(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

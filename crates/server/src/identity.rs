//! Best-effort actor resolution for the demo deployment.
//!
//! Callers send `Authorization: Bearer <actor>.<hex hmac-sha256(actor)>`.
//! When the signature verifies against the configured demo secret the actor
//! string is used as-is; any missing or malformed credential falls back to
//! a per-role placeholder, matching the original demo behavior.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha2::Sha256;

use partflow_core::config::AppConfig;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Creator,
    Approver,
    Validator,
}

impl Role {
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Creator => "creator@demo.local",
            Self::Approver => "approver@demo.local",
            Self::Validator => "validator@demo.local",
        }
    }
}

#[derive(Clone, Default)]
pub struct IdentityResolver {
    secret: Option<Vec<u8>>,
}

impl IdentityResolver {
    pub fn from_config(config: &AppConfig) -> Self {
        let secret = config.auth.demo_secret.expose_secret().trim();
        Self { secret: (!secret.is_empty()).then(|| secret.as_bytes().to_vec()) }
    }

    /// Resolve the acting identity, never failing: an unverifiable caller
    /// becomes the role placeholder.
    pub fn resolve(&self, headers: &HeaderMap, role: Role) -> String {
        self.verified_actor(headers).unwrap_or_else(|| role.placeholder().to_string())
    }

    fn verified_actor(&self, headers: &HeaderMap) -> Option<String> {
        let secret = self.secret.as_deref()?;
        let header = headers.get("authorization")?.to_str().ok()?;
        let token = header.strip_prefix("Bearer ").or_else(|| header.strip_prefix("bearer "))?;

        let (actor, signature) = token.rsplit_once('.')?;
        if actor.is_empty() {
            return None;
        }

        let expected = sign(secret, actor);
        if expected.eq_ignore_ascii_case(signature) {
            Some(actor.to_string())
        } else {
            None
        }
    }
}

/// Hex HMAC tag over the actor string. Exposed so operators and tests can
/// mint demo tokens.
pub fn sign(secret: &[u8], actor: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("hmac accepts any key length");
    mac.update(actor.as_bytes());
    mac.finalize().into_bytes().iter().map(|byte| format!("{byte:02x}")).collect()
}

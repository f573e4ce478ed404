use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// PostgreSQL truncates identifiers longer than this.
const MAX_IDENTIFIER_LEN: usize = 63;

const PUBLIC_SCHEMA: &str = "public";

/// The name of a tenant's schema.
///
/// Tenant names come from request hosts, so they are untrusted input that
/// ends up inside DDL text. Construction only succeeds for names made of
/// lowercase ASCII letters, digits and underscores, starting with a letter
/// or underscore, which makes `quoted()` safe to interpolate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let name = raw.trim().to_ascii_lowercase();
        let reject = |reason: &str| Err(CoreError::InvalidTenant(raw.to_string(), reason.to_string()));

        if name.is_empty() {
            return reject("name is empty");
        }
        if name.len() > MAX_IDENTIFIER_LEN {
            return reject("name is longer than 63 characters");
        }

        let mut chars = name.chars();
        if let Some(first) = chars.next() {
            if !(first.is_ascii_lowercase() || first == '_') {
                return reject("name must start with a letter or underscore");
            }
        }
        if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
            return reject("only letters, digits and underscores are allowed");
        }
        if name.starts_with("pg_") || name == "information_schema" {
            return reject("name collides with a system schema");
        }

        Ok(Self(name))
    }

    /// The administrative schema every database has.
    pub fn public() -> Self {
        Self(PUBLIC_SCHEMA.to_string())
    }

    /// Derives the tenant from the left-most label of an HTTP host,
    /// e.g. `flower-shop.example.com:8080` becomes `flower_shop`.
    pub fn from_host(host: &str) -> Result<Self, CoreError> {
        let without_port = host.rsplit_once(':').map_or(host, |(name, port)| {
            if port.chars().all(|c| c.is_ascii_digit()) { name } else { host }
        });
        let label = without_port.split('.').next().unwrap_or_default();
        Self::parse(&label.replace('-', "_"))
    }

    /// Schemas that tenant provisioning must never create or drop.
    pub fn is_reserved(&self) -> bool {
        self.0 == PUBLIC_SCHEMA
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name as a double-quoted SQL identifier.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_names_and_lowercases() {
        assert_eq!(TenantId::parse("Shop_42").unwrap().as_str(), "shop_42");
        assert_eq!(TenantId::parse("_internal").unwrap().as_str(), "_internal");
    }

    #[test]
    fn rejects_injection_attempts() {
        for raw in ["shop; DROP SCHEMA public", "shop\"x", "a b", "1shop", "", "pg_catalog", "information_schema"] {
            assert!(TenantId::parse(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn rejects_overlong_names() {
        let raw = "a".repeat(64);
        assert!(TenantId::parse(&raw).is_err());
        assert!(TenantId::parse(&raw[..63]).is_ok());
    }

    #[test]
    fn derives_tenant_from_host() {
        assert_eq!(TenantId::from_host("flower-shop.example.com:8080").unwrap().as_str(), "flower_shop");
        assert_eq!(TenantId::from_host("bakery.localhost").unwrap().as_str(), "bakery");
        assert!(TenantId::from_host(".example.com").is_err());
    }

    #[test]
    fn public_is_reserved_and_quoted() {
        let public = TenantId::public();
        assert!(public.is_reserved());
        assert_eq!(public.quoted(), "\"public\"");
        assert!(!TenantId::parse("shop").unwrap().is_reserved());
    }

    #[test]
    fn deserialization_validates() {
        let ok: TenantId = serde_json::from_str("\"shop\"").unwrap();
        assert_eq!(ok.as_str(), "shop");
        assert!(serde_json::from_str::<TenantId>("\"bad name\"").is_err());
    }
}

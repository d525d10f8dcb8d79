use std::collections::HashMap;

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::Value;

use crate::errors::Error;

use super::record::{RawResponse, token_field};

/// Derives `(expire_at, ttl)` in epoch seconds / seconds from a token response.
pub trait ExpiryExtractor: Send + Sync {
    fn extract_expiry_and_ttl(&self, raw: &RawResponse) -> Result<(i64, i64), Error>;
}

/// How the JWT extractor treats the token signature.
#[derive(Clone)]
pub enum SignatureVerification {
    /// Read claims without checking the signature. The token came straight
    /// from the issuer over TLS, so the channel is what is trusted.
    TrustIssuer,
    Verify {
        key: DecodingKey,
        algorithms: Vec<Algorithm>,
    },
}

/// Reads `exp` and `iat` from the JWT stored at a response field.
#[derive(Clone)]
pub struct JwtExpiryExtractor {
    token_field_name: String,
    key: DecodingKey,
    validation: Validation,
}

impl JwtExpiryExtractor {
    pub fn new(
        token_field_name: impl Into<String>,
        verification: SignatureVerification,
    ) -> Result<Self, Error> {
        match verification {
            SignatureVerification::TrustIssuer => Ok(Self::trusting_issuer(token_field_name)),
            SignatureVerification::Verify { key, algorithms } => {
                let Some(first) = algorithms.first() else {
                    return Err(Error::Config(
                        "JWT verification needs at least one algorithm".into(),
                    ));
                };
                let mut validation = Validation::new(*first);
                validation.algorithms = algorithms;
                Ok(Self::build(token_field_name.into(), key, validation))
            }
        }
    }

    /// Extractor that skips signature checks, see [`SignatureVerification::TrustIssuer`].
    pub fn trusting_issuer(token_field_name: impl Into<String>) -> Self {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        Self::build(
            token_field_name.into(),
            DecodingKey::from_secret(&[]),
            validation,
        )
    }

    fn build(token_field_name: String, key: DecodingKey, mut validation: Validation) -> Self {
        // Expiry is the manager's decision, not the decoder's.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        Self {
            token_field_name,
            key,
            validation,
        }
    }

    pub fn token_field_name(&self) -> &str {
        &self.token_field_name
    }
}

impl ExpiryExtractor for JwtExpiryExtractor {
    fn extract_expiry_and_ttl(&self, raw: &RawResponse) -> Result<(i64, i64), Error> {
        let token = token_field(raw, &self.token_field_name)?;
        let data =
            jsonwebtoken::decode::<HashMap<String, Value>>(token, &self.key, &self.validation)?;
        let exp = numeric_claim(&data.claims, "exp")?;
        let iat = numeric_claim(&data.claims, "iat")?;
        let ttl = exp.checked_sub(iat).ok_or_else(|| {
            Error::Decode(format!("JWT lifetime overflows (exp={exp}, iat={iat})"))
        })?;
        Ok((exp, ttl))
    }
}

fn numeric_claim(claims: &HashMap<String, Value>, name: &str) -> Result<i64, Error> {
    let value = claims
        .get(name)
        .ok_or_else(|| Error::Decode(format!("JWT has no '{name}' claim")))?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|secs| secs as i64))
        .ok_or_else(|| Error::Decode(format!("JWT claim '{name}' is not numeric (got {value})")))
}

/// Reads an absolute expiry and a TTL straight from response fields, for
/// issuers that report lifetimes next to an opaque token.
#[derive(Clone, Debug)]
pub struct ResponseFieldExtractor {
    expiration_field: String,
    ttl_field: String,
}

impl ResponseFieldExtractor {
    pub fn new(expiration_field: impl Into<String>, ttl_field: impl Into<String>) -> Self {
        Self {
            expiration_field: expiration_field.into(),
            ttl_field: ttl_field.into(),
        }
    }

    fn field(&self, raw: &RawResponse, name: &str) -> Result<i64, Error> {
        raw.get(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::Decode(format!("token response has no integer '{name}' field")))
    }
}

impl Default for ResponseFieldExtractor {
    fn default() -> Self {
        Self::new("expiration", "expires_in")
    }
}

impl ExpiryExtractor for ResponseFieldExtractor {
    fn extract_expiry_and_ttl(&self, raw: &RawResponse) -> Result<(i64, i64), Error> {
        let exp = self.field(raw, &self.expiration_field)?;
        let ttl = self.field(raw, &self.ttl_field)?;
        Ok((exp, ttl))
    }
}

use std::time::Instant;

use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    #[serde(default)]
    kid: Option<String>,
    kty: String,
    #[serde(default, rename = "use")]
    key_use: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
    #[serde(default)]
    x: Option<String>,
    #[serde(default)]
    y: Option<String>,
}

impl Jwk {
    fn decoding_key(&self) -> Option<DecodingKey> {
        match self.kty.as_str() {
            "RSA" => DecodingKey::from_rsa_components(self.n.as_deref()?, self.e.as_deref()?).ok(),
            "EC" => DecodingKey::from_ec_components(self.x.as_deref()?, self.y.as_deref()?).ok(),
            "OKP" => DecodingKey::from_ed_components(self.x.as_deref()?).ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct JwksDocument {
    #[serde(default)]
    keys: Vec<Value>,
}

/// A usable public key from the provider's key set.
#[derive(Clone)]
pub(crate) struct SigningKey {
    pub kid: Option<String>,
    kty: String,
    pub key: DecodingKey,
}

fn kty_for(alg: Algorithm) -> &'static str {
    match alg {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => "RSA",
        Algorithm::ES256 | Algorithm::ES384 => "EC",
        Algorithm::EdDSA => "OKP",
        _ => "oct",
    }
}

impl SigningKey {
    fn supports(&self, alg: Algorithm) -> bool {
        self.kty == kty_for(alg)
    }
}

/// Decoded key set with the instant it was fetched.
pub(crate) struct KeySet {
    keys: Vec<SigningKey>,
    pub fetched_at: Instant,
}

impl KeySet {
    /// Keep signature keys the verifier can use; skip everything else.
    pub fn from_document(doc: JwksDocument) -> Self {
        let total = doc.keys.len();
        let keys: Vec<SigningKey> = doc
            .keys
            .into_iter()
            .filter_map(|raw| serde_json::from_value::<Jwk>(raw).ok())
            .filter(|jwk| jwk.key_use.as_deref() != Some("enc"))
            .filter_map(|jwk| {
                let key = jwk.decoding_key()?;
                Some(SigningKey {
                    kid: jwk.kid,
                    kty: jwk.kty,
                    key,
                })
            })
            .collect();

        if keys.len() != total {
            debug!(total, usable = keys.len(), "skipped unsupported JWKs");
        }

        Self {
            keys,
            fetched_at: Instant::now(),
        }
    }

    /// With a `kid`, the key carrying that `kid`. Without one, the first key
    /// whose type fits `alg`.
    pub fn find(&self, kid: Option<&str>, alg: Algorithm) -> Option<&SigningKey> {
        match kid {
            Some(kid) => self.keys.iter().find(|k| k.kid.as_deref() == Some(kid)),
            None => self.keys.iter().find(|k| k.supports(alg)),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

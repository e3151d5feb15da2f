use std::str::FromStr;

use argon2::{Algorithm, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use base64::{engine::general_purpose::STANDARD, Engine};
use password_hash::rand_core::OsRng;
use password_hash::SaltString;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::ConfigurationError;

const SHA256_PREFIX: &str = "sha256:";

/// A one-way hashed credential (user password, client secret, API secret).
///
/// Two encodings are accepted:
/// - argon2 PHC strings (`$argon2id$v=19$...`), salted;
/// - `sha256:<base64>`, the unsalted digest IdentityServer produces for
///   client and API secrets.
///
/// Plain text is never stored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HashedSecret {
    Argon2(String),
    Sha256([u8; 32]),
}

impl HashedSecret {
    /// Hash a plaintext secret with argon2 and a random salt.
    pub fn argon2(plain: &str) -> Result<Self, ConfigurationError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| ConfigurationError::InvalidSecret(format!("failed to hash secret: {e}")))?
            .to_string();
        Ok(HashedSecret::Argon2(hash))
    }

    /// Hash a plaintext secret with a bare SHA-256 digest.
    pub fn sha256(plain: &str) -> Self {
        HashedSecret::Sha256(Sha256::digest(plain.as_bytes()).into())
    }

    /// Check a candidate plaintext against the stored hash.
    pub fn verify(&self, candidate: &str) -> bool {
        match self {
            HashedSecret::Argon2(phc) => {
                let Ok(parsed) = PasswordHash::new(phc) else {
                    return false;
                };
                Argon2::default()
                    .verify_password(candidate.as_bytes(), &parsed)
                    .is_ok()
            }
            HashedSecret::Sha256(digest) => {
                let candidate: [u8; 32] = Sha256::digest(candidate.as_bytes()).into();
                digest.ct_eq(&candidate).into()
            }
        }
    }

    /// Short algorithm name, for logs and CLI output.
    pub fn algorithm(&self) -> &'static str {
        match self {
            HashedSecret::Argon2(_) => "argon2",
            HashedSecret::Sha256(_) => "sha256",
        }
    }
}

impl FromStr for HashedSecret {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(encoded) = s.strip_prefix(SHA256_PREFIX) {
            let bytes = STANDARD
                .decode(encoded)
                .map_err(|e| ConfigurationError::InvalidSecret(format!("bad sha256 base64: {e}")))?;
            let digest: [u8; 32] = bytes.try_into().map_err(|_| {
                ConfigurationError::InvalidSecret("sha256 digest must be 32 bytes".into())
            })?;
            Ok(HashedSecret::Sha256(digest))
        } else if s.starts_with("$argon2") {
            let parsed = PasswordHash::new(s)
                .map_err(|e| ConfigurationError::InvalidSecret(format!("bad argon2 hash: {e}")))?;
            Algorithm::try_from(parsed.algorithm).map_err(|e| {
                ConfigurationError::InvalidSecret(format!("not an argon2 algorithm: {e}"))
            })?;
            if parsed.salt.is_none() || parsed.hash.is_none() {
                return Err(ConfigurationError::InvalidSecret(
                    "argon2 hash is missing its salt or output".into(),
                ));
            }
            Ok(HashedSecret::Argon2(s.to_string()))
        } else {
            Err(ConfigurationError::InvalidSecret(
                "expected an argon2 PHC string or 'sha256:<base64>'".into(),
            ))
        }
    }
}

impl TryFrom<String> for HashedSecret {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HashedSecret> for String {
    fn from(secret: HashedSecret) -> Self {
        secret.to_string()
    }
}

impl std::fmt::Display for HashedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashedSecret::Argon2(phc) => f.write_str(phc),
            HashedSecret::Sha256(digest) => write!(f, "{SHA256_PREFIX}{}", STANDARD.encode(digest)),
        }
    }
}

impl std::fmt::Debug for HashedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HashedSecret({}, ..)", self.algorithm())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argon2_verifies_only_the_original() {
        let secret = HashedSecret::argon2("alice").unwrap();
        assert!(secret.verify("alice"));
        assert!(!secret.verify("Alice"));
        assert!(!secret.verify(""));
    }

    #[test]
    fn argon2_salts_every_hash() {
        let a = HashedSecret::argon2("same").unwrap();
        let b = HashedSecret::argon2("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn sha256_matches_identityserver_encoding() {
        // "SuperSecretPassword".Sha256() in IdentityServer.
        let parsed: HashedSecret = "sha256:jKGHySpqOJJzXKn9zFr5H09CPujNpVAVgZLP5CGSRq0="
            .parse()
            .unwrap();
        assert_eq!(parsed, HashedSecret::sha256("SuperSecretPassword"));
        assert!(parsed.verify("SuperSecretPassword"));
        assert!(!parsed.verify("SuperSecretPassword "));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let secret = HashedSecret::argon2("x").unwrap();
        let reparsed: HashedSecret = secret.to_string().parse().unwrap();
        assert_eq!(secret, reparsed);
    }

    #[test]
    fn rejects_plain_text_and_bad_digests() {
        assert!("alice".parse::<HashedSecret>().is_err());
        assert!("sha256:not-base64!!".parse::<HashedSecret>().is_err());
        assert!("sha256:AAAA".parse::<HashedSecret>().is_err());
        assert!("$argon2id$garbage".parse::<HashedSecret>().is_err());
    }

    #[test]
    fn rejects_truncated_or_foreign_phc_strings() {
        let no_output = "$argon2id$v=19$m=19456,t=2,p=1$+vkHnJzSlA593Mn0DqfVDA";
        let err = no_output.parse::<HashedSecret>().unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidSecret(_)));

        let no_salt = "$argon2id$v=19$m=19456,t=2,p=1";
        assert!(no_salt.parse::<HashedSecret>().is_err());

        let unknown = "$argon2x$v=19$m=19456,t=2,p=1$+vkHnJzSlA593Mn0DqfVDA$s6JSRE3ZtIq29fySxnsNQTzgD07xwBN8lPq8ehBb5sc";
        assert!(unknown.parse::<HashedSecret>().is_err());
    }

    #[test]
    fn debug_hides_digest() {
        let secret = HashedSecret::sha256("ScopeSecret");
        assert_eq!(format!("{secret:?}"), "HashedSecret(sha256, ..)");
    }
}

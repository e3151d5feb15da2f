use viya_idp::{ConfigurationError, HashedSecret};

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum HashAlgorithm {
    /// Salted argon2id, for user passwords
    Argon2,
    /// Unsalted SHA-256, for client and API secrets
    Sha256,
}

pub fn hash_secret(
    secret: &str,
    algorithm: HashAlgorithm,
) -> Result<HashedSecret, ConfigurationError> {
    match algorithm {
        HashAlgorithm::Argon2 => HashedSecret::argon2(secret),
        HashAlgorithm::Sha256 => Ok(HashedSecret::sha256(secret)),
    }
}

/// Print the encoded hash of `secret`.
pub fn run(secret: &str, algorithm: HashAlgorithm) -> Result<(), Box<dyn std::error::Error>> {
    if secret.is_empty() {
        return Err("refusing to hash an empty secret".into());
    }
    println!("{}", hash_secret(secret, algorithm)?);
    Ok(())
}

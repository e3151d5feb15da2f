use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::claims::ClaimSet;
use crate::error::{ConfigurationError, NotFound};
use crate::secret::HashedSecret;

/// A test user identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Identity {
    /// Unique, stable subject identifier (`sub`).
    subject_id: String,
    /// Unique authentication handle.
    username: String,
    #[serde(rename = "password_hash")]
    password: HashedSecret,
    #[serde(default)]
    claims: ClaimSet,
}

impl Identity {
    /// Build an identity from an already-hashed password.
    pub fn new(
        subject_id: impl Into<String>,
        username: impl Into<String>,
        password: HashedSecret,
        claims: ClaimSet,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            username: username.into(),
            password,
            claims,
        }
    }

    /// Build an identity from a plaintext password (hashed with argon2).
    pub fn with_password(
        subject_id: impl Into<String>,
        username: impl Into<String>,
        password: &str,
        claims: ClaimSet,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self::new(
            subject_id,
            username,
            HashedSecret::argon2(password)?,
            claims,
        ))
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn claims(&self) -> &ClaimSet {
        &self.claims
    }

    pub fn password_hash(&self) -> &HashedSecret {
        &self.password
    }
}

/// Fixed collection of user identities, indexed by username and subject.
#[derive(Debug)]
pub struct UserDirectory {
    users: Vec<Identity>,
    by_username: HashMap<String, usize>,
    by_subject: HashMap<String, usize>,
}

impl UserDirectory {
    /// Build the directory, rejecting duplicate subject ids and usernames.
    pub fn new(users: impl IntoIterator<Item = Identity>) -> Result<Self, ConfigurationError> {
        let users: Vec<Identity> = users.into_iter().collect();
        let mut by_username = HashMap::with_capacity(users.len());
        let mut by_subject = HashMap::with_capacity(users.len());

        for (idx, user) in users.iter().enumerate() {
            if by_subject.insert(user.subject_id.clone(), idx).is_some() {
                return Err(ConfigurationError::DuplicateSubjectId(
                    user.subject_id.clone(),
                ));
            }
            if by_username.insert(user.username.clone(), idx).is_some() {
                return Err(ConfigurationError::DuplicateUsername(user.username.clone()));
            }
        }

        debug!(users = users.len(), "Built user directory");
        Ok(Self {
            users,
            by_username,
            by_subject,
        })
    }

    /// Find a user by username (used during authentication).
    pub fn find_by_username(&self, username: &str) -> Result<&Identity, NotFound> {
        self.by_username
            .get(username)
            .map(|&idx| &self.users[idx])
            .ok_or_else(|| NotFound::new("user", username))
    }

    /// Find a user by subject identifier (used by userinfo lookups).
    pub fn find_by_subject(&self, subject_id: &str) -> Result<&Identity, NotFound> {
        self.by_subject
            .get(subject_id)
            .map(|&idx| &self.users[idx])
            .ok_or_else(|| NotFound::new("user", subject_id))
    }

    /// Verify a supplied password against the identity's stored hash.
    pub fn verify_credential(&self, identity: &Identity, supplied_password: &str) -> bool {
        let valid = identity.password.verify(supplied_password);
        if !valid {
            debug!(username = %identity.username, "Credential verification failed");
        }
        valid
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Users in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Identity> {
        self.users.iter()
    }
}

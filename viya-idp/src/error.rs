/// Startup-time configuration failure.
///
/// Any of these aborts construction of the configuration model; the
/// process must refuse to start rather than run with an inconsistent
/// authorization model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Two users share a subject identifier.
    DuplicateSubjectId(String),
    /// Two users share a username.
    DuplicateUsername(String),
    /// Two identity resources / API scopes share a scope name.
    DuplicateScope(String),
    /// A resource or scope uses a protocol-reserved scope name.
    ReservedScope(String),
    /// Two API resources share a name.
    DuplicateApiResource(String),
    /// An API resource lists a scope that is not a declared API scope.
    DanglingScopeReference { api_resource: String, scope: String },
    /// Two clients share a client id.
    DuplicateClientId(String),
    /// A client's allowed scopes name an undeclared scope.
    UnknownScope { client_id: String, scope: String },
    /// A client violates a grant type / flow parameter rule.
    InvalidClient { client_id: String, reason: String },
    /// A redirect or logout URI is not an absolute URL.
    InvalidUri {
        client_id: String,
        uri: String,
        reason: String,
    },
    /// A stored secret is not a recognised hash encoding.
    InvalidSecret(String),
    /// A claim value does not match its declared value type.
    InvalidClaim { claim_type: String, reason: String },
    /// A `${...}` placeholder could not be resolved.
    UnresolvedPlaceholder(String),
    /// I/O or YAML parsing failure while loading a configuration source.
    Load(String),
}

impl std::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationError::DuplicateSubjectId(sub) => {
                write!(f, "duplicate user subject id '{sub}'")
            }
            ConfigurationError::DuplicateUsername(name) => {
                write!(f, "duplicate username '{name}'")
            }
            ConfigurationError::DuplicateScope(name) => {
                write!(f, "duplicate scope name '{name}'")
            }
            ConfigurationError::ReservedScope(name) => {
                write!(f, "scope name '{name}' is reserved and cannot be declared")
            }
            ConfigurationError::DuplicateApiResource(name) => {
                write!(f, "duplicate API resource '{name}'")
            }
            ConfigurationError::DanglingScopeReference {
                api_resource,
                scope,
            } => write!(
                f,
                "API resource '{api_resource}' references undeclared API scope '{scope}'"
            ),
            ConfigurationError::DuplicateClientId(id) => {
                write!(f, "duplicate client id '{id}'")
            }
            ConfigurationError::UnknownScope { client_id, scope } => {
                write!(f, "client '{client_id}' allows unknown scope '{scope}'")
            }
            ConfigurationError::InvalidClient { client_id, reason } => {
                write!(f, "client '{client_id}' is invalid: {reason}")
            }
            ConfigurationError::InvalidUri {
                client_id,
                uri,
                reason,
            } => write!(f, "client '{client_id}' has invalid URI '{uri}': {reason}"),
            ConfigurationError::InvalidSecret(msg) => write!(f, "invalid secret: {msg}"),
            ConfigurationError::InvalidClaim { claim_type, reason } => {
                write!(f, "invalid claim '{claim_type}': {reason}")
            }
            ConfigurationError::UnresolvedPlaceholder(msg) => {
                write!(f, "unresolved placeholder: {msg}")
            }
            ConfigurationError::Load(msg) => write!(f, "configuration load error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigurationError {}

impl From<std::io::Error> for ConfigurationError {
    fn from(err: std::io::Error) -> Self {
        ConfigurationError::Load(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigurationError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigurationError::Load(err.to_string())
    }
}

/// A lookup for an unknown user, client or scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFound {
    pub kind: &'static str,
    pub key: String,
}

impl NotFound {
    pub(crate) fn new(kind: &'static str, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }
}

impl std::fmt::Display for NotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}' not found", self.kind, self.key)
    }
}

impl std::error::Error for NotFound {}

/// Policy violation returned by [`ClientRegistry::authorize_grant`](crate::ClientRegistry::authorize_grant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// The client may not use the requested grant type.
    GrantTypeNotAllowed,
    /// At least one requested scope is not allowed for the client.
    ScopeNotAllowed,
    /// The redirect URI is missing or not registered for the client.
    RedirectUriMismatch,
}

impl Rejection {
    /// OAuth 2.0 `error` code for this rejection (RFC 6749 §4.1.2.1, §5.2).
    pub fn error_code(&self) -> &'static str {
        match self {
            Rejection::GrantTypeNotAllowed => "unauthorized_client",
            Rejection::ScopeNotAllowed => "invalid_scope",
            Rejection::RedirectUriMismatch => "invalid_request",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Rejection::GrantTypeNotAllowed => "grant type not allowed",
            Rejection::ScopeNotAllowed => "scope not allowed",
            Rejection::RedirectUriMismatch => "redirect uri mismatch",
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.description())
    }
}

impl std::error::Error for Rejection {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_maps_to_oauth_error_codes() {
        assert_eq!(Rejection::GrantTypeNotAllowed.error_code(), "unauthorized_client");
        assert_eq!(Rejection::ScopeNotAllowed.error_code(), "invalid_scope");
        assert_eq!(Rejection::RedirectUriMismatch.error_code(), "invalid_request");
        assert_eq!(
            Rejection::ScopeNotAllowed.to_string(),
            "invalid_scope: scope not allowed"
        );
    }

    #[test]
    fn configuration_error_names_offending_scope() {
        let err = ConfigurationError::UnknownScope {
            client_id: "m2m.client".into(),
            scope: "ghost.scope".into(),
        };
        assert!(err.to_string().contains("ghost.scope"));
    }

    #[test]
    fn not_found_display() {
        assert_eq!(NotFound::new("user", "carol").to_string(), "user 'carol' not found");
    }
}

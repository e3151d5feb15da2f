use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::{ConfigurationError, NotFound, Rejection};
use crate::resources::{ResourceCatalog, OFFLINE_ACCESS};
use crate::secret::HashedSecret;

/// OAuth 2.0 flow a client may use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GrantType {
    #[serde(rename = "client_credentials")]
    ClientCredentials,
    #[serde(rename = "authorization_code")]
    AuthorizationCode,
    #[serde(rename = "implicit")]
    Implicit,
    #[serde(rename = "hybrid")]
    Hybrid,
    #[serde(rename = "password")]
    ResourceOwnerPassword,
    #[serde(rename = "urn:ietf:params:oauth:grant-type:device_code")]
    DeviceFlow,
}

impl GrantType {
    pub const ALL: [GrantType; 6] = [
        GrantType::ClientCredentials,
        GrantType::AuthorizationCode,
        GrantType::Implicit,
        GrantType::Hybrid,
        GrantType::ResourceOwnerPassword,
        GrantType::DeviceFlow,
    ];

    /// OAuth 2.0 wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::ClientCredentials => "client_credentials",
            GrantType::AuthorizationCode => "authorization_code",
            GrantType::Implicit => "implicit",
            GrantType::Hybrid => "hybrid",
            GrantType::ResourceOwnerPassword => "password",
            GrantType::DeviceFlow => "urn:ietf:params:oauth:grant-type:device_code",
        }
    }

    /// Flows that send the user agent back to a registered redirect URI.
    pub fn uses_redirect(&self) -> bool {
        matches!(
            self,
            GrantType::AuthorizationCode | GrantType::Hybrid | GrantType::Implicit
        )
    }

    /// Flows after which a refresh token may be issued.
    pub fn supports_refresh_tokens(&self) -> bool {
        matches!(
            self,
            GrantType::AuthorizationCode
                | GrantType::Hybrid
                | GrantType::ResourceOwnerPassword
                | GrantType::DeviceFlow
        )
    }
}

impl FromStr for GrantType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GrantType::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| format!("unknown grant type '{s}'"))
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

/// An OAuth 2.0 / OIDC client registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Client {
    pub client_id: String,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_secrets: Vec<HashedSecret>,
    /// `false` marks a public client (no secret).
    #[serde(default = "default_true")]
    pub require_client_secret: bool,
    pub allowed_grant_types: BTreeSet<GrantType>,
    #[serde(default)]
    pub allowed_scopes: BTreeSet<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub post_logout_redirect_uris: Vec<String>,
    #[serde(default)]
    pub front_channel_logout_uri: Option<String>,
    /// Whether a refresh token may be issued (`offline_access`).
    #[serde(default)]
    pub allow_offline_access: bool,
    #[serde(default = "default_true")]
    pub require_pkce: bool,
    #[serde(default)]
    pub allow_plain_text_pkce: bool,
    #[serde(default)]
    pub require_consent: bool,
}

impl Client {
    /// A confidential client with no grants, scopes or URIs yet.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_name: None,
            client_secrets: Vec::new(),
            require_client_secret: true,
            allowed_grant_types: BTreeSet::new(),
            allowed_scopes: BTreeSet::new(),
            redirect_uris: Vec::new(),
            post_logout_redirect_uris: Vec::new(),
            front_channel_logout_uri: None,
            allow_offline_access: false,
            require_pkce: true,
            allow_plain_text_pkce: false,
            require_consent: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    pub fn with_secret(mut self, secret: HashedSecret) -> Self {
        self.client_secrets.push(secret);
        self
    }

    /// Mark the client as public: no secret is required or accepted.
    pub fn public(mut self) -> Self {
        self.require_client_secret = false;
        self
    }

    pub fn with_grant_types(mut self, grants: impl IntoIterator<Item = GrantType>) -> Self {
        self.allowed_grant_types.extend(grants);
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_scopes.extend(scopes.into_iter().map(Into::into));
        self
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uris.push(uri.into());
        self
    }

    pub fn with_post_logout_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.post_logout_redirect_uris.push(uri.into());
        self
    }

    pub fn with_front_channel_logout_uri(mut self, uri: impl Into<String>) -> Self {
        self.front_channel_logout_uri = Some(uri.into());
        self
    }

    pub fn allow_offline_access(mut self, allow: bool) -> Self {
        self.allow_offline_access = allow;
        self
    }

    pub fn require_pkce(mut self, require: bool) -> Self {
        self.require_pkce = require;
        self
    }

    pub fn allow_plain_text_pkce(mut self, allow: bool) -> Self {
        self.allow_plain_text_pkce = allow;
        self
    }

    pub fn require_consent(mut self, require: bool) -> Self {
        self.require_consent = require;
        self
    }

    /// Exact, byte-for-byte redirect URI match. No prefix or wildcard matching.
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|registered| registered == uri)
    }

    /// Exact post-logout redirect URI match.
    pub fn is_post_logout_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.post_logout_redirect_uris
            .iter()
            .any(|registered| registered == uri)
    }

    fn has_interactive_grant(&self) -> bool {
        self.allowed_grant_types.iter().any(GrantType::uses_redirect)
    }

    fn is_scope_allowed(&self, scope: &str, grant_type: GrantType) -> bool {
        if scope == OFFLINE_ACCESS {
            self.allow_offline_access && grant_type.supports_refresh_tokens()
        } else {
            self.allowed_scopes.contains(scope)
        }
    }
}

/// The parts of an authorization or token request checked against a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrantRequest {
    pub grant_type: GrantType,
    pub scopes: BTreeSet<String>,
    pub redirect_uri: Option<String>,
}

impl GrantRequest {
    pub fn new(grant_type: GrantType) -> Self {
        Self {
            grant_type,
            scopes: BTreeSet::new(),
            redirect_uri: None,
        }
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes.extend(scopes.into_iter().map(Into::into));
        self
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }
}

/// Validated client registrations.
#[derive(Debug)]
pub struct ClientRegistry {
    clients: HashMap<String, Client>,
}

impl ClientRegistry {
    /// Build the registry, validating every client against `catalog`.
    pub fn new(
        clients: impl IntoIterator<Item = Client>,
        catalog: &ResourceCatalog,
    ) -> Result<Self, ConfigurationError> {
        let mut registered = HashMap::new();
        for client in clients {
            validate_client(&client, catalog)?;
            if registered.contains_key(&client.client_id) {
                return Err(ConfigurationError::DuplicateClientId(client.client_id));
            }
            registered.insert(client.client_id.clone(), client);
        }

        debug!(clients = registered.len(), "Built client registry");
        Ok(Self {
            clients: registered,
        })
    }

    pub fn find_client(&self, client_id: &str) -> Result<&Client, NotFound> {
        self.clients
            .get(client_id)
            .ok_or_else(|| NotFound::new("client", client_id))
    }

    /// Check a grant request against the client's policy.
    ///
    /// In order: grant type, scopes, then (for redirecting flows) exact
    /// redirect URI match. The first failing check is returned.
    pub fn authorize_grant(&self, client: &Client, request: &GrantRequest) -> Result<(), Rejection> {
        let result = check_grant(client, request);
        if let Err(rejection) = result {
            debug!(
                client_id = %client.client_id,
                grant_type = %request.grant_type,
                %rejection,
                "Grant request rejected"
            );
        }
        result
    }

    /// Check a presented client secret against any of the stored hashes.
    pub fn verify_client_secret(&self, client: &Client, candidate: &str) -> bool {
        client.client_secrets.iter().any(|s| s.verify(candidate))
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Clients ordered by client id.
    pub fn clients(&self) -> Vec<&Client> {
        let mut clients: Vec<&Client> = self.clients.values().collect();
        clients.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        clients
    }
}

fn check_grant(client: &Client, request: &GrantRequest) -> Result<(), Rejection> {
    if !client.allowed_grant_types.contains(&request.grant_type) {
        return Err(Rejection::GrantTypeNotAllowed);
    }
    if !request
        .scopes
        .iter()
        .all(|scope| client.is_scope_allowed(scope, request.grant_type))
    {
        return Err(Rejection::ScopeNotAllowed);
    }
    if request.grant_type.uses_redirect() {
        match request.redirect_uri.as_deref() {
            Some(uri) if client.is_redirect_uri_allowed(uri) => {}
            _ => return Err(Rejection::RedirectUriMismatch),
        }
    }
    Ok(())
}

fn validate_client(client: &Client, catalog: &ResourceCatalog) -> Result<(), ConfigurationError> {
    let id = &client.client_id;
    let invalid = |reason: &str| ConfigurationError::InvalidClient {
        client_id: id.clone(),
        reason: reason.to_string(),
    };

    if client.allowed_grant_types.is_empty() {
        return Err(invalid("no allowed grant types"));
    }
    let redirecting: Vec<&GrantType> = client
        .allowed_grant_types
        .iter()
        .filter(|g| g.uses_redirect())
        .collect();
    if redirecting.len() > 1 {
        return Err(invalid(&format!(
            "grant types {} and {} cannot be combined",
            redirecting[0], redirecting[1]
        )));
    }

    for scope in &client.allowed_scopes {
        if scope == OFFLINE_ACCESS {
            return Err(invalid(
                "offline_access is granted through allow_offline_access, not allowed_scopes",
            ));
        }
        if !catalog.contains_scope(scope) {
            return Err(ConfigurationError::UnknownScope {
                client_id: id.clone(),
                scope: scope.clone(),
            });
        }
    }

    if client.require_client_secret && client.client_secrets.is_empty() {
        return Err(invalid("confidential client has no client secrets"));
    }
    if !client.require_client_secret
        && client
            .allowed_grant_types
            .contains(&GrantType::ClientCredentials)
    {
        return Err(invalid("client_credentials requires a confidential client"));
    }

    for uri in &client.redirect_uris {
        validate_uri(id, uri, true)?;
    }
    for uri in &client.post_logout_redirect_uris {
        validate_uri(id, uri, false)?;
    }
    if let Some(uri) = &client.front_channel_logout_uri {
        validate_uri(id, uri, false)?;
    }

    if client.has_interactive_grant() {
        if client.redirect_uris.is_empty() {
            return Err(invalid("interactive grant requires at least one redirect URI"));
        }
        if client
            .allowed_grant_types
            .contains(&GrantType::AuthorizationCode)
            && !client.require_pkce
            && !client.allow_plain_text_pkce
        {
            warn!(
                client_id = %id,
                "PKCE is optional but plain-text PKCE is disallowed; check that this is intended"
            );
        }
    } else if !client.redirect_uris.is_empty() || client.front_channel_logout_uri.is_some() {
        warn!(client_id = %id, "Redirect URIs are ignored for non-interactive grant types");
    }

    if client.allow_offline_access
        && !client
            .allowed_grant_types
            .iter()
            .any(GrantType::supports_refresh_tokens)
    {
        warn!(client_id = %id, "allow_offline_access has no effect for the allowed grant types");
    }

    Ok(())
}

fn validate_uri(client_id: &str, uri: &str, is_redirect: bool) -> Result<(), ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidUri {
        client_id: client_id.to_string(),
        uri: uri.to_string(),
        reason,
    };
    let parsed = Url::parse(uri).map_err(|e| invalid(e.to_string()))?;
    if is_redirect && parsed.fragment().is_some() {
        return Err(invalid("redirect URI must not contain a fragment".into()));
    }
    Ok(())
}

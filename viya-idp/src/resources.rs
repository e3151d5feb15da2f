use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::claims::claim_types;
use crate::error::{ConfigurationError, NotFound};
use crate::secret::HashedSecret;

/// Scope that requests a refresh token; it is never declared as a resource.
pub const OFFLINE_ACCESS: &str = "offline_access";

fn default_true() -> bool {
    true
}

fn claim_set(claims: &[&str]) -> BTreeSet<String> {
    claims.iter().map(|c| c.to_string()).collect()
}

/// A named bundle of user claims, requestable as a scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityResource {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Claims released when a client requests this resource's scope.
    #[serde(default)]
    pub user_claims: BTreeSet<String>,
    /// The consent screen cannot deselect this resource.
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub emphasize: bool,
    #[serde(default = "default_true")]
    pub show_in_discovery_document: bool,
}

impl IdentityResource {
    pub fn new<I, S>(name: impl Into<String>, user_claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            display_name: None,
            user_claims: user_claims.into_iter().map(Into::into).collect(),
            required: false,
            emphasize: false,
            show_in_discovery_document: true,
        }
    }

    fn standard(name: &str, display_name: &str, claims: &[&str]) -> Self {
        Self {
            display_name: Some(display_name.into()),
            user_claims: claim_set(claims),
            ..Self::new(name, std::iter::empty::<String>())
        }
    }

    /// `openid`: the subject identifier. Required for every OIDC request.
    pub fn openid() -> Self {
        Self {
            required: true,
            ..Self::standard("openid", "Your user identifier", &[claim_types::SUBJECT])
        }
    }

    /// `profile`: the OIDC standard profile claims.
    pub fn profile() -> Self {
        Self {
            emphasize: true,
            ..Self::standard(
                "profile",
                "User profile",
                &[
                    claim_types::NAME,
                    claim_types::FAMILY_NAME,
                    claim_types::GIVEN_NAME,
                    claim_types::MIDDLE_NAME,
                    claim_types::NICKNAME,
                    claim_types::PREFERRED_USERNAME,
                    claim_types::PROFILE,
                    claim_types::PICTURE,
                    claim_types::WEBSITE,
                    claim_types::GENDER,
                    claim_types::BIRTHDATE,
                    claim_types::ZONE_INFO,
                    claim_types::LOCALE,
                    claim_types::UPDATED_AT,
                ],
            )
        }
    }

    pub fn email() -> Self {
        Self {
            emphasize: true,
            ..Self::standard(
                "email",
                "Your email address",
                &[claim_types::EMAIL, claim_types::EMAIL_VERIFIED],
            )
        }
    }

    pub fn phone() -> Self {
        Self {
            emphasize: true,
            ..Self::standard(
                "phone",
                "Your phone number",
                &[claim_types::PHONE_NUMBER, claim_types::PHONE_NUMBER_VERIFIED],
            )
        }
    }

    pub fn address() -> Self {
        Self {
            emphasize: true,
            ..Self::standard("address", "Your postal address", &[claim_types::ADDRESS])
        }
    }

    /// Look up one of the standard resources by scope name.
    pub fn standard_by_name(name: &str) -> Option<Self> {
        match name {
            "openid" => Some(Self::openid()),
            "profile" => Some(Self::profile()),
            "email" => Some(Self::email()),
            "phone" => Some(Self::phone()),
            "address" => Some(Self::address()),
            _ => None,
        }
    }
}

/// A fine-grained API permission (e.g. `weatherapi.read`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiScope {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Claims added to access tokens that carry this scope.
    #[serde(default)]
    pub user_claims: BTreeSet<String>,
}

impl ApiScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            user_claims: BTreeSet::new(),
        }
    }
}

/// An API (audience) grouping API scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiResource {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Names of the API scopes this resource owns.
    #[serde(default)]
    pub scopes: BTreeSet<String>,
    /// Secrets the API uses to authenticate itself (token introspection).
    #[serde(default)]
    pub api_secrets: Vec<HashedSecret>,
    /// Claims embedded in access tokens issued for this resource.
    #[serde(default)]
    pub user_claims: BTreeSet<String>,
}

impl ApiResource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            scopes: BTreeSet::new(),
            api_secrets: Vec::new(),
            user_claims: BTreeSet::new(),
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

    pub fn with_secret(mut self, secret: HashedSecret) -> Self {
        self.api_secrets.push(secret);
        self
    }

    pub fn with_user_claims<I, S>(mut self, claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_claims.extend(claims.into_iter().map(Into::into));
        self
    }

    /// Check a presented API secret against any of the stored hashes.
    pub fn verify_secret(&self, candidate: &str) -> bool {
        self.api_secrets.iter().any(|s| s.verify(candidate))
    }
}

/// What a scope name resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolvedScope<'a> {
    Identity(&'a IdentityResource),
    Api(&'a ApiScope),
}

impl<'a> ResolvedScope<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            ResolvedScope::Identity(r) => &r.name,
            ResolvedScope::Api(s) => &s.name,
        }
    }

    pub fn user_claims(&self) -> &'a BTreeSet<String> {
        match self {
            ResolvedScope::Identity(r) => &r.user_claims,
            ResolvedScope::Api(s) => &s.user_claims,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum ScopeSlot {
    Identity(usize),
    Api(usize),
}

/// Identity resources, API scopes and API resources with referential checks.
#[derive(Debug)]
pub struct ResourceCatalog {
    identity_resources: Vec<IdentityResource>,
    api_scopes: Vec<ApiScope>,
    api_resources: Vec<ApiResource>,
    scopes: HashMap<String, ScopeSlot>,
    resources_by_name: HashMap<String, usize>,
    /// API scope name -> indices of the API resources that own it.
    resources_by_scope: HashMap<String, Vec<usize>>,
}

impl ResourceCatalog {
    /// Build the catalog.
    ///
    /// Identity resources and API scopes share one scope namespace, so a
    /// name may be declared only once across both. Every scope listed by an
    /// API resource must be a declared API scope.
    pub fn new(
        identity_resources: impl IntoIterator<Item = IdentityResource>,
        api_scopes: impl IntoIterator<Item = ApiScope>,
        api_resources: impl IntoIterator<Item = ApiResource>,
    ) -> Result<Self, ConfigurationError> {
        let identity_resources: Vec<IdentityResource> = identity_resources.into_iter().collect();
        let api_scopes: Vec<ApiScope> = api_scopes.into_iter().collect();
        let api_resources: Vec<ApiResource> = api_resources.into_iter().collect();

        let reserved = identity_resources
            .iter()
            .map(|r| &r.name)
            .chain(api_scopes.iter().map(|s| &s.name))
            .find(|name| *name == OFFLINE_ACCESS);
        if let Some(name) = reserved {
            return Err(ConfigurationError::ReservedScope(name.clone()));
        }

        let mut scopes = HashMap::new();
        for (idx, resource) in identity_resources.iter().enumerate() {
            if scopes
                .insert(resource.name.clone(), ScopeSlot::Identity(idx))
                .is_some()
            {
                return Err(ConfigurationError::DuplicateScope(resource.name.clone()));
            }
        }
        for (idx, scope) in api_scopes.iter().enumerate() {
            if scopes.insert(scope.name.clone(), ScopeSlot::Api(idx)).is_some() {
                return Err(ConfigurationError::DuplicateScope(scope.name.clone()));
            }
        }

        let mut resources_by_name = HashMap::new();
        let mut resources_by_scope: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, resource) in api_resources.iter().enumerate() {
            if resources_by_name.insert(resource.name.clone(), idx).is_some() {
                return Err(ConfigurationError::DuplicateApiResource(
                    resource.name.clone(),
                ));
            }
            for scope in &resource.scopes {
                if !matches!(scopes.get(scope), Some(ScopeSlot::Api(_))) {
                    return Err(ConfigurationError::DanglingScopeReference {
                        api_resource: resource.name.clone(),
                        scope: scope.clone(),
                    });
                }
                resources_by_scope.entry(scope.clone()).or_default().push(idx);
            }
        }

        debug!(
            identity_resources = identity_resources.len(),
            api_scopes = api_scopes.len(),
            api_resources = api_resources.len(),
            "Built resource catalog"
        );

        Ok(Self {
            identity_resources,
            api_scopes,
            api_resources,
            scopes,
            resources_by_name,
            resources_by_scope,
        })
    }

    /// Resolve a scope name to its identity resource or API scope.
    pub fn resolve_scope(&self, name: &str) -> Result<ResolvedScope<'_>, NotFound> {
        match self.scopes.get(name) {
            Some(ScopeSlot::Identity(idx)) => {
                Ok(ResolvedScope::Identity(&self.identity_resources[*idx]))
            }
            Some(ScopeSlot::Api(idx)) => Ok(ResolvedScope::Api(&self.api_scopes[*idx])),
            None => Err(NotFound::new("scope", name)),
        }
    }

    /// Whether `name` is a declared identity resource or API scope.
    pub fn contains_scope(&self, name: &str) -> bool {
        self.scopes.contains_key(name)
    }

    /// Union of the claims released by the given scopes.
    ///
    /// For an API scope this includes the claims of every API resource that
    /// owns it. `offline_access` is accepted and contributes nothing.
    pub fn claims_for_scopes<I, S>(&self, scope_names: I) -> Result<BTreeSet<String>, NotFound>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut claims = BTreeSet::new();
        for name in scope_names {
            let name = name.as_ref();
            if name == OFFLINE_ACCESS {
                continue;
            }
            let resolved = self.resolve_scope(name)?;
            claims.extend(resolved.user_claims().iter().cloned());
            if let ResolvedScope::Api(_) = resolved {
                for resource in self.api_resources_for_scope(name) {
                    claims.extend(resource.user_claims.iter().cloned());
                }
            }
        }
        Ok(claims)
    }

    /// API resources that own the given API scope.
    pub fn api_resources_for_scope<'a>(
        &'a self,
        scope: &str,
    ) -> impl Iterator<Item = &'a ApiResource> + 'a {
        self.resources_by_scope
            .get(scope)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.api_resources[idx])
    }

    pub fn find_api_resource(&self, name: &str) -> Result<&ApiResource, NotFound> {
        self.resources_by_name
            .get(name)
            .map(|&idx| &self.api_resources[idx])
            .ok_or_else(|| NotFound::new("API resource", name))
    }

    pub fn identity_resources(&self) -> &[IdentityResource] {
        &self.identity_resources
    }

    pub fn api_scopes(&self) -> &[ApiScope] {
        &self.api_scopes
    }

    pub fn api_resources(&self) -> &[ApiResource] {
        &self.api_resources
    }

    /// All declared scope names (identity resources first, then API scopes).
    pub fn scope_names(&self) -> impl Iterator<Item = &str> {
        self.identity_resources
            .iter()
            .map(|r| r.name.as_str())
            .chain(self.api_scopes.iter().map(|s| s.name.as_str()))
    }
}

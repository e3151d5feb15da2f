//! Identity & access configuration model for an OpenID Connect provider.
//!
//! Holds the users, identity resources, API scopes/resources and OAuth
//! clients an external OIDC runtime consumes at startup, and enforces the
//! invariants that relate them. Protocol work (token issuance, sessions,
//! transport) stays with the runtime.
//!
//! # Example
//!
//! ```ignore
//! use viya_idp::prelude::*;
//!
//! let config = IdpConfiguration::from_source(&YamlSource::load("config/idp.yaml")?)?;
//!
//! let client = config.clients().find_client("m2m.client")?;
//! let request = GrantRequest::new(GrantType::ClientCredentials)
//!     .with_scopes(["weatherapi.read"]);
//! config.clients().authorize_grant(client, &request)?;
//! ```

pub mod claims;
pub mod clients;
pub mod config;
pub mod error;
pub mod resources;
pub mod sample;
pub mod secret;
pub mod users;

use tracing::info;

pub use claims::{Claim, ClaimSet, ClaimValueType};
pub use clients::{Client, ClientRegistry, GrantRequest, GrantType};
pub use config::{ConfigurationSource, DefaultSecretResolver, SecretResolver, YamlSource};
pub use error::{ConfigurationError, NotFound, Rejection};
pub use resources::{
    ApiResource, ApiScope, IdentityResource, ResolvedScope, ResourceCatalog, OFFLINE_ACCESS,
};
pub use sample::SampleSource;
pub use secret::HashedSecret;
pub use users::{Identity, UserDirectory};

/// The validated configuration, built once at startup.
///
/// Read-only after construction, so it can be shared across request
/// handlers as `Arc<IdpConfiguration>` without locking.
#[derive(Debug)]
pub struct IdpConfiguration {
    users: UserDirectory,
    resources: ResourceCatalog,
    clients: ClientRegistry,
}

impl IdpConfiguration {
    /// Validate the given entities and build the three components.
    pub fn new(
        users: Vec<Identity>,
        identity_resources: Vec<IdentityResource>,
        api_scopes: Vec<ApiScope>,
        api_resources: Vec<ApiResource>,
        clients: Vec<Client>,
    ) -> Result<Self, ConfigurationError> {
        let users = UserDirectory::new(users)?;
        let resources = ResourceCatalog::new(identity_resources, api_scopes, api_resources)?;
        let clients = ClientRegistry::new(clients, &resources)?;

        info!(
            users = users.len(),
            identity_resources = resources.identity_resources().len(),
            api_scopes = resources.api_scopes().len(),
            api_resources = resources.api_resources().len(),
            clients = clients.len(),
            "Identity provider configuration loaded"
        );

        Ok(Self {
            users,
            resources,
            clients,
        })
    }

    /// Load every entity from `source` and validate.
    pub fn from_source(source: &dyn ConfigurationSource) -> Result<Self, ConfigurationError> {
        Self::new(
            source.load_users()?,
            source.load_identity_resources()?,
            source.load_api_scopes()?,
            source.load_api_resources()?,
            source.load_clients()?,
        )
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn resources(&self) -> &ResourceCatalog {
        &self.resources
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// The subset of `identity`'s claims released by the given scopes.
    pub fn released_claims<I, S>(&self, identity: &Identity, scopes: I) -> Result<ClaimSet, NotFound>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let claim_types = self.resources.claims_for_scopes(scopes)?;
        Ok(identity.claims().filter(&claim_types))
    }
}

pub mod prelude {
    //! Re-exports of the most commonly used configuration types.
    pub use crate::{
        ConfigurationSource, GrantRequest, GrantType, IdpConfiguration, Rejection, SampleSource,
        YamlSource,
    };
}

//! Configuration sources.
//!
//! A [`ConfigurationSource`] supplies the raw entities; the
//! [`IdpConfiguration`](crate::IdpConfiguration) builder validates them.
//! [`YamlSource`] reads a YAML document:
//!
//! ```yaml
//! users:
//!   - subject_id: "818727"
//!     username: alice
//!     password_hash: "$argon2id$v=19$..."
//!     claims:
//!       - { type: name, value: Alice Smith }
//! identity_resources: [openid, profile, { name: role, user_claims: [role] }]
//! api_scopes: [weatherapi.read]
//! api_resources:
//!   - name: weatherapi
//!     scopes: [weatherapi.read]
//!     api_secrets: ["${env:WEATHERAPI_SECRET_HASH}"]
//! clients:
//!   - client_id: m2m.client
//!     client_secrets: ["sha256:..."]
//!     allowed_grant_types: [client_credentials]
//!     allowed_scopes: [weatherapi.read]
//! ```
//!
//! String values may contain `${...}` placeholders, resolved through a
//! [`SecretResolver`] before the document is parsed.

pub mod secrets;

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::clients::Client;
use crate::error::ConfigurationError;
use crate::resources::{ApiResource, ApiScope, IdentityResource};
use crate::users::Identity;

pub use secrets::{resolve_placeholders, DefaultSecretResolver, SecretResolver};

/// Startup loading interface consumed by the OIDC runtime.
pub trait ConfigurationSource {
    fn load_users(&self) -> Result<Vec<Identity>, ConfigurationError>;
    fn load_identity_resources(&self) -> Result<Vec<IdentityResource>, ConfigurationError>;
    fn load_api_scopes(&self) -> Result<Vec<ApiScope>, ConfigurationError>;
    fn load_api_resources(&self) -> Result<Vec<ApiResource>, ConfigurationError>;
    fn load_clients(&self) -> Result<Vec<Client>, ConfigurationError>;
}

/// An identity resource: a standard scope name or a full definition.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdentityResourceEntry {
    Standard(String),
    Custom(IdentityResource),
}

/// An API scope: a bare name or a full definition.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiScopeEntry {
    Name(String),
    Full(ApiScope),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigDocument {
    #[serde(default)]
    users: Vec<Identity>,
    #[serde(default)]
    identity_resources: Vec<IdentityResourceEntry>,
    #[serde(default)]
    api_scopes: Vec<ApiScopeEntry>,
    #[serde(default)]
    api_resources: Vec<ApiResource>,
    #[serde(default)]
    clients: Vec<Client>,
}

/// Configuration read from a YAML document.
#[derive(Debug)]
pub struct YamlSource {
    users: Vec<Identity>,
    identity_resources: Vec<IdentityResource>,
    api_scopes: Vec<ApiScope>,
    api_resources: Vec<ApiResource>,
    clients: Vec<Client>,
}

impl YamlSource {
    /// Load a YAML file, resolving placeholders from env vars and files.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        Self::load_with_resolver(path, &DefaultSecretResolver)
    }

    pub fn load_with_resolver(
        path: impl AsRef<Path>,
        resolver: &dyn SecretResolver,
    ) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::Load(format!("cannot read '{}': {e}", path.display()))
        })?;
        debug!(path = %path.display(), "Loading identity provider configuration");
        Self::from_yaml_str(&content, resolver)
    }

    /// Parse a YAML string (useful for testing).
    pub fn from_yaml_str(
        content: &str,
        resolver: &dyn SecretResolver,
    ) -> Result<Self, ConfigurationError> {
        let mut yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
        if yaml.is_null() {
            yaml = serde_yaml::Value::Mapping(Default::default());
        }
        secrets::resolve_yaml(&mut yaml, resolver)?;
        let document: ConfigDocument = serde_yaml::from_value(yaml)?;

        let identity_resources = document
            .identity_resources
            .into_iter()
            .map(|entry| match entry {
                IdentityResourceEntry::Standard(name) => IdentityResource::standard_by_name(&name)
                    .ok_or_else(|| {
                        ConfigurationError::Load(format!(
                            "'{name}' is not a standard identity resource; give a full definition"
                        ))
                    }),
                IdentityResourceEntry::Custom(resource) => Ok(resource),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let api_scopes = document
            .api_scopes
            .into_iter()
            .map(|entry| match entry {
                ApiScopeEntry::Name(name) => ApiScope::new(name),
                ApiScopeEntry::Full(scope) => scope,
            })
            .collect();

        Ok(Self {
            users: document.users,
            identity_resources,
            api_scopes,
            api_resources: document.api_resources,
            clients: document.clients,
        })
    }
}

impl ConfigurationSource for YamlSource {
    fn load_users(&self) -> Result<Vec<Identity>, ConfigurationError> {
        Ok(self.users.clone())
    }

    fn load_identity_resources(&self) -> Result<Vec<IdentityResource>, ConfigurationError> {
        Ok(self.identity_resources.clone())
    }

    fn load_api_scopes(&self) -> Result<Vec<ApiScope>, ConfigurationError> {
        Ok(self.api_scopes.clone())
    }

    fn load_api_resources(&self) -> Result<Vec<ApiResource>, ConfigurationError> {
        Ok(self.api_resources.clone())
    }

    fn load_clients(&self) -> Result<Vec<Client>, ConfigurationError> {
        Ok(self.clients.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::GrantType;

    const MINIMAL: &str = r#"
users:
  - subject_id: "1"
    username: carol
    password_hash: "sha256:jKGHySpqOJJzXKn9zFr5H09CPujNpVAVgZLP5CGSRq0="
    claims:
      - { type: name, value: Carol }
identity_resources:
  - openid
  - name: role
    user_claims: [role]
api_scopes:
  - reports.read
  - name: reports.write
    display_name: Write reports
clients:
  - client_id: reporter
    client_secrets: ["sha256:jKGHySpqOJJzXKn9zFr5H09CPujNpVAVgZLP5CGSRq0="]
    allowed_grant_types: [client_credentials]
    allowed_scopes: [reports.read]
"#;

    #[test]
    fn parses_shorthand_entries_and_defaults() {
        let source = YamlSource::from_yaml_str(MINIMAL, &DefaultSecretResolver).unwrap();

        let resources = source.load_identity_resources().unwrap();
        assert_eq!(resources[0], IdentityResource::openid());
        assert!(resources[1].show_in_discovery_document);

        let scopes = source.load_api_scopes().unwrap();
        assert_eq!(scopes[0], ApiScope::new("reports.read"));
        assert_eq!(scopes[1].display_name.as_deref(), Some("Write reports"));

        let clients = source.load_clients().unwrap();
        let reporter = &clients[0];
        assert!(reporter.require_client_secret);
        assert!(reporter.require_pkce);
        assert!(!reporter.allow_offline_access);
        assert!(reporter
            .allowed_grant_types
            .contains(&GrantType::ClientCredentials));

        let users = source.load_users().unwrap();
        assert_eq!(users[0].claims().first("name").unwrap().value(), "Carol");
    }

    #[test]
    fn empty_document_is_empty_configuration() {
        let source = YamlSource::from_yaml_str("", &DefaultSecretResolver).unwrap();
        assert!(source.load_users().unwrap().is_empty());
        assert!(source.load_clients().unwrap().is_empty());
    }

    #[test]
    fn plain_text_password_is_rejected() {
        let yaml = "users:\n  - subject_id: \"1\"\n    username: carol\n    password_hash: carol\n";
        let err = YamlSource::from_yaml_str(yaml, &DefaultSecretResolver).unwrap_err();
        assert!(matches!(err, ConfigurationError::Load(_)), "{err}");
    }

    #[test]
    fn unknown_standard_resource_is_rejected() {
        let yaml = "identity_resources: [openid, role]\n";
        let err = YamlSource::from_yaml_str(yaml, &DefaultSecretResolver).unwrap_err();
        assert!(err.to_string().contains("'role'"));
    }

    #[test]
    fn unknown_top_level_section_is_rejected() {
        let yaml = "clientz: []\n";
        assert!(YamlSource::from_yaml_str(yaml, &DefaultSecretResolver).is_err());
    }

    #[test]
    fn misspelled_entity_fields_are_rejected() {
        let client = "clients:\n  - client_id: reporter\n    client_secrets: [\"sha256:jKGHySpqOJJzXKn9zFr5H09CPujNpVAVgZLP5CGSRq0=\"]\n    allowed_grant_types: [client_credentials]\n    alowed_scopes: [reports.read]\n";
        let err = YamlSource::from_yaml_str(client, &DefaultSecretResolver).unwrap_err();
        assert!(err.to_string().contains("alowed_scopes"), "{err}");

        let consent = MINIMAL.replace(
            "    allowed_scopes: [reports.read]\n",
            "    allowed_scopes: [reports.read]\n    require_consnet: true\n",
        );
        assert!(YamlSource::from_yaml_str(&consent, &DefaultSecretResolver).is_err());

        let user = MINIMAL.replace("    username: carol", "    user_name: carol");
        assert!(YamlSource::from_yaml_str(&user, &DefaultSecretResolver).is_err());

        let claim = MINIMAL.replace("{ type: name, value: Carol }", "{ type: name, valu: Carol }");
        assert!(YamlSource::from_yaml_str(&claim, &DefaultSecretResolver).is_err());

        let resource = MINIMAL.replace("    user_claims: [role]", "    user_claim: [role]");
        assert!(YamlSource::from_yaml_str(&resource, &DefaultSecretResolver).is_err());

        let api = "api_scopes: [a.read]\napi_resources:\n  - name: a\n    scope: [a.read]\n";
        assert!(YamlSource::from_yaml_str(api, &DefaultSecretResolver).is_err());
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idp.yaml");
        std::fs::write(&path, MINIMAL).unwrap();
        let source = YamlSource::load(&path).unwrap();
        assert_eq!(source.load_users().unwrap().len(), 1);

        let missing = YamlSource::load(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(missing, ConfigurationError::Load(_)));
    }
}

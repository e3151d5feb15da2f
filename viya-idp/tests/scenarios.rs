use std::path::PathBuf;
use std::sync::OnceLock;

use viya_idp::{
    ApiScope, Client, ConfigurationError, GrantRequest, GrantType, HashedSecret,
    IdentityResource, IdpConfiguration, NotFound, Rejection, ResolvedScope, SampleSource,
    YamlSource,
};

const CALLBACK: &str = "https://10.0.0.19/SASLogon/login/callback/external_oauth";

fn shipped_yaml() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/idp.yaml")
}

/// Both the built-in sample and the shipped YAML describe the same tenant.
fn configurations() -> &'static [IdpConfiguration; 2] {
    static CONFIGS: OnceLock<[IdpConfiguration; 2]> = OnceLock::new();
    CONFIGS.get_or_init(|| {
        let sample = IdpConfiguration::from_source(&SampleSource).unwrap();
        let yaml = IdpConfiguration::from_source(&YamlSource::load(shipped_yaml()).unwrap()).unwrap();
        [sample, yaml]
    })
}

#[test]
fn m2m_client_credentials_with_read_scope() {
    for config in configurations() {
        let client = config.clients().find_client("m2m.client").unwrap();
        let request =
            GrantRequest::new(GrantType::ClientCredentials).with_scopes(["weatherapi.read"]);
        assert_eq!(config.clients().authorize_grant(client, &request), Ok(()));
    }
}

#[test]
fn m2m_client_cannot_use_code_flow() {
    for config in configurations() {
        let client = config.clients().find_client("m2m.client").unwrap();
        let request = GrantRequest::new(GrantType::AuthorizationCode)
            .with_scopes(["openid"])
            .with_redirect_uri(CALLBACK);
        assert_eq!(
            config.clients().authorize_grant(client, &request),
            Err(Rejection::GrantTypeNotAllowed)
        );
    }
}

#[test]
fn interactive_client_rejects_foreign_redirect_uri() {
    for config in configurations() {
        let client = config.clients().find_client("interactive").unwrap();
        let evil = GrantRequest::new(GrantType::AuthorizationCode)
            .with_scopes(["openid", "profile"])
            .with_redirect_uri("https://evil.example/callback");
        assert_eq!(
            config.clients().authorize_grant(client, &evil),
            Err(Rejection::RedirectUriMismatch)
        );

        let registered = GrantRequest::new(GrantType::AuthorizationCode)
            .with_scopes(["openid", "profile", "offline_access"])
            .with_redirect_uri(CALLBACK);
        assert_eq!(config.clients().authorize_grant(client, &registered), Ok(()));
    }
}

#[test]
fn role_scope_resolves_to_custom_identity_resource() {
    for config in configurations() {
        match config.resources().resolve_scope("role").unwrap() {
            ResolvedScope::Identity(resource) => {
                assert_eq!(resource.name, "role");
                assert_eq!(
                    resource.user_claims.iter().collect::<Vec<_>>(),
                    vec!["role"]
                );
            }
            other => panic!("expected identity resource, got {other:?}"),
        }
    }
}

#[test]
fn alice_authenticates_only_with_her_password() {
    for config in configurations() {
        let users = config.users();
        let alice = users.find_by_username("alice").unwrap();
        assert_eq!(alice.subject_id(), "818727");
        assert!(users.verify_credential(alice, "alice"));
        assert!(!users.verify_credential(alice, "bob"));
        assert!(!users.verify_credential(alice, ""));
        assert_eq!(
            users.find_by_username("mallory").unwrap_err(),
            NotFound {
                kind: "user",
                key: "mallory".into()
            }
        );
    }
}

#[test]
fn undeclared_client_scope_refuses_to_start() {
    let err = IdpConfiguration::new(
        vec![],
        vec![IdentityResource::openid()],
        vec![ApiScope::new("weatherapi.read")],
        vec![],
        vec![Client::new("m2m.client")
            .with_secret(HashedSecret::sha256("SuperSecretPassword"))
            .with_grant_types([GrantType::ClientCredentials])
            .with_scopes(["weatherapi.read", "ghost.scope"])],
    )
    .unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::UnknownScope {
            client_id: "m2m.client".into(),
            scope: "ghost.scope".into(),
        }
    );
}

#[test]
fn client_and_api_secrets_verify() {
    for config in configurations() {
        let clients = config.clients();
        let m2m = clients.find_client("m2m.client").unwrap();
        assert!(clients.verify_client_secret(m2m, "SuperSecretPassword"));
        assert!(!clients.verify_client_secret(m2m, "supersecretpassword"));

        let api = config.resources().find_api_resource("weatherapi").unwrap();
        assert!(api.verify_secret("ScopeSecret"));
    }
}

#[test]
fn released_claims_follow_requested_scopes() {
    for config in configurations() {
        let bob = config.users().find_by_username("bob").unwrap();

        let claims = config
            .released_claims(bob, ["openid", "profile"])
            .unwrap()
            .to_json();
        assert_eq!(claims["name"], "Bob Smith");
        assert_eq!(claims["website"], "http://bob.com");
        assert!(!claims.contains_key("email"));
        assert!(!claims.contains_key("role"));

        let claims = config
            .released_claims(bob, ["weatherapi.read"])
            .unwrap()
            .to_json();
        assert_eq!(claims["role"], "user");
        assert_eq!(claims.len(), 1);
    }
}

#[test]
fn sample_and_yaml_agree() {
    let [sample, yaml] = configurations();
    for user in sample.users().iter() {
        let other = yaml.users().find_by_subject(user.subject_id()).unwrap();
        assert_eq!(user.username(), other.username());
        assert_eq!(user.claims().to_json(), other.claims().to_json());
    }
    assert_eq!(sample.users().len(), yaml.users().len());
    assert_eq!(
        sample.resources().identity_resources(),
        yaml.resources().identity_resources()
    );
    assert_eq!(sample.resources().api_resources(), yaml.resources().api_resources());
    let sample_clients = sample.clients().clients();
    let yaml_clients = yaml.clients().clients();
    assert_eq!(sample_clients.len(), yaml_clients.len());
    for (a, b) in sample_clients.iter().zip(&yaml_clients) {
        assert_eq!(a.client_id, b.client_id);
        assert_eq!(a.allowed_grant_types, b.allowed_grant_types);
        assert_eq!(a.allowed_scopes, b.allowed_scopes);
        assert_eq!(a.redirect_uris, b.redirect_uris);
        assert_eq!(a.require_pkce, b.require_pkce);
        assert_eq!(a.require_consent, b.require_consent);
        assert_eq!(a.client_secrets, b.client_secrets);
    }
}

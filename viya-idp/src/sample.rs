//! Built-in demo tenant for a SAS Viya deployment.
//!
//! Users authenticate with their username as password; every password is
//! argon2-hashed as the data set is loaded.

use serde_json::json;

use crate::claims::{claim_types, Claim, ClaimSet};
use crate::clients::{Client, GrantType};
use crate::config::ConfigurationSource;
use crate::error::ConfigurationError;
use crate::resources::{ApiResource, ApiScope, IdentityResource};
use crate::secret::HashedSecret;
use crate::users::Identity;

/// Redirect URI registered for the interactive SASLogon client.
pub const SAS_LOGON_CALLBACK: &str = "https://10.0.0.19/SASLogon/login/callback/external_oauth";
/// Post-logout / front-channel logout URI of SASLogon.
pub const SAS_LOGON: &str = "https://10.0.0.19/SASLogon";

const CLIENT_SECRET: &str = "SuperSecretPassword";
const API_SECRET: &str = "ScopeSecret";

struct SampleUser {
    subject_id: &'static str,
    username: &'static str,
    name: &'static str,
    given_name: &'static str,
    family_name: &'static str,
    email: &'static str,
    role: &'static str,
    website: &'static str,
}

const USERS: [SampleUser; 4] = [
    SampleUser {
        subject_id: "818727",
        username: "alice",
        name: "Alice Smith",
        given_name: "Alice",
        family_name: "Smith",
        email: "AliceSmith@email.com",
        role: "admin",
        website: "http://alice.com",
    },
    SampleUser {
        subject_id: "818755",
        username: "sas",
        name: "Sas Viya",
        given_name: "sas",
        family_name: "sas",
        email: "sas@email.com",
        role: "admin",
        website: "http://sas.com",
    },
    SampleUser {
        subject_id: "sasdemo01",
        username: "sasdemo01",
        name: "sas",
        given_name: "demo",
        family_name: "sasdemo01",
        email: "sasdemo01@email.com",
        role: "admin",
        website: "http://sasdemo.com",
    },
    SampleUser {
        subject_id: "88421113",
        username: "bob",
        name: "Bob Smith",
        given_name: "Bob",
        family_name: "Smith",
        email: "BobSmith@email.com",
        role: "user",
        website: "http://bob.com",
    },
];

/// The demo data set as a [`ConfigurationSource`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SampleSource;

impl SampleSource {
    fn claims(user: &SampleUser) -> ClaimSet {
        let address = json!({
            "street_address": "One Hacker Way",
            "locality": "Heidelberg",
            "postal_code": 69118,
            "country": "Germany",
        });
        ClaimSet::new()
            .with(Claim::new(claim_types::NAME, user.name))
            .with(Claim::new(claim_types::GIVEN_NAME, user.given_name))
            .with(Claim::new(claim_types::FAMILY_NAME, user.family_name))
            .with(Claim::new(claim_types::EMAIL, user.email))
            .with(Claim::boolean(claim_types::EMAIL_VERIFIED, true))
            .with(Claim::new(claim_types::ROLE, user.role))
            .with(Claim::new(claim_types::WEBSITE, user.website))
            .with(Claim::json(claim_types::ADDRESS, &address))
    }
}

impl ConfigurationSource for SampleSource {
    fn load_users(&self) -> Result<Vec<Identity>, ConfigurationError> {
        USERS
            .iter()
            .map(|user| {
                Identity::with_password(
                    user.subject_id,
                    user.username,
                    user.username,
                    Self::claims(user),
                )
            })
            .collect()
    }

    fn load_identity_resources(&self) -> Result<Vec<IdentityResource>, ConfigurationError> {
        Ok(vec![
            IdentityResource::openid(),
            IdentityResource::profile(),
            IdentityResource::new("role", [claim_types::ROLE]),
        ])
    }

    fn load_api_scopes(&self) -> Result<Vec<ApiScope>, ConfigurationError> {
        Ok(vec![
            ApiScope::new("weatherapi.read"),
            ApiScope::new("weatherapi.write"),
        ])
    }

    fn load_api_resources(&self) -> Result<Vec<ApiResource>, ConfigurationError> {
        Ok(vec![ApiResource::new("weatherapi")
            .with_scopes(["weatherapi.read", "weatherapi.write"])
            .with_secret(HashedSecret::sha256(API_SECRET))
            .with_user_claims([claim_types::ROLE])])
    }

    fn load_clients(&self) -> Result<Vec<Client>, ConfigurationError> {
        Ok(vec![
            Client::new("m2m.client")
                .with_name("Client Credentials Client")
                .with_secret(HashedSecret::sha256(CLIENT_SECRET))
                .with_grant_types([GrantType::ClientCredentials])
                .with_scopes(["openid", "weatherapi.read", "weatherapi.write"]),
            // Code flow for SASLogon. PKCE settings reproduce the deployed tenant.
            Client::new("interactive")
                .with_secret(HashedSecret::sha256(CLIENT_SECRET))
                .with_grant_types([GrantType::AuthorizationCode])
                .with_redirect_uri(SAS_LOGON_CALLBACK)
                .with_front_channel_logout_uri(SAS_LOGON)
                .with_post_logout_redirect_uri(SAS_LOGON)
                .allow_offline_access(true)
                .with_scopes(["openid", "profile", "weatherapi.read"])
                .require_pkce(false)
                .require_consent(true)
                .allow_plain_text_pkce(false),
        ])
    }
}

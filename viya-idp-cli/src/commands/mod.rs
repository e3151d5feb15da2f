//! Command implementations for the `viya-idp` CLI.
//!
//! Each submodule corresponds to a top-level CLI command.

use std::path::Path;

use tracing::debug;
use viya_idp::{ConfigurationError, IdpConfiguration, SampleSource, YamlSource};

/// Configuration validation — `viya-idp check`.
///
/// Builds the full configuration and prints users, scopes and clients.
pub mod check;

/// Secret hashing — `viya-idp hash <secret>`.
///
/// Produces the encoded form accepted by `password_hash`, `client_secrets`
/// and `api_secrets`.
pub mod hash;

/// Grant dry-run — `viya-idp authorize <client>`.
pub mod authorize;

/// Claim release — `viya-idp claims <username>`.
pub mod claims;

/// Build the configuration from `path`, or from the sample tenant.
pub fn load_configuration(path: Option<&Path>) -> Result<IdpConfiguration, ConfigurationError> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "Using configuration file");
            IdpConfiguration::from_source(&YamlSource::load(path)?)
        }
        None => {
            debug!("No configuration file given, using the sample tenant");
            IdpConfiguration::from_source(&SampleSource)
        }
    }
}

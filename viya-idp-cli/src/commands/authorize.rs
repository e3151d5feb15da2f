use std::path::Path;

use colored::Colorize;
use viya_idp::{GrantRequest, GrantType, IdpConfiguration};

/// Check a grant request against a client without issuing anything.
///
/// A rejection is returned as the error, so the process exits non-zero.
pub fn run(
    config: Option<&Path>,
    client_id: &str,
    grant: &str,
    scopes: &[String],
    redirect_uri: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let configuration = super::load_configuration(config)?;
    let request = build_request(grant, scopes, redirect_uri)?;
    dry_run(&configuration, client_id, &request)?;

    println!(
        "  {} {} may use {} for [{}]",
        "✓".green(),
        client_id.bold(),
        request.grant_type,
        scopes.join(" ")
    );
    Ok(())
}

pub fn build_request(
    grant: &str,
    scopes: &[String],
    redirect_uri: Option<&str>,
) -> Result<GrantRequest, Box<dyn std::error::Error>> {
    let grant_type: GrantType = grant.parse()?;
    let mut request = GrantRequest::new(grant_type).with_scopes(scopes);
    if let Some(uri) = redirect_uri {
        request = request.with_redirect_uri(uri);
    }
    Ok(request)
}

pub fn dry_run(
    configuration: &IdpConfiguration,
    client_id: &str,
    request: &GrantRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = configuration.clients();
    let client = registry.find_client(client_id)?;
    registry.authorize_grant(client, request)?;
    Ok(())
}

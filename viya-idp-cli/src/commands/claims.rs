use std::path::Path;

use serde_json::{Map, Value};
use viya_idp::IdpConfiguration;

/// Print, as JSON, the claims `username` would receive for `scopes`.
pub fn run(
    config: Option<&Path>,
    username: &str,
    scopes: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let configuration = super::load_configuration(config)?;
    let claims = released(&configuration, username, scopes)?;
    println!("{}", serde_json::to_string_pretty(&Value::Object(claims))?);
    Ok(())
}

/// Claims released to `username` as a JSON object, `sub` included.
pub fn released(
    configuration: &IdpConfiguration,
    username: &str,
    scopes: &[String],
) -> Result<Map<String, Value>, Box<dyn std::error::Error>> {
    let identity = configuration.users().find_by_username(username)?;
    let mut claims = Map::new();
    claims.insert("sub".into(), Value::String(identity.subject_id().into()));
    claims.extend(configuration.released_claims(identity, scopes)?.to_json());
    Ok(claims)
}

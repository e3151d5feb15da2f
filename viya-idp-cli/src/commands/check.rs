use std::path::Path;

use colored::Colorize;
use viya_idp::{GrantType, IdpConfiguration};

/// Validate the configuration and print what it contains.
///
/// Any validation failure is returned as the error; the summary is only
/// printed for a configuration that builds.
pub fn run(config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let source = config
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in sample tenant".into());
    println!("{}", format!("viya-idp: checking {source}").bold());
    println!();

    let configuration = super::load_configuration(config)?;
    print!("{}", summary(&configuration));

    println!();
    println!("{}", "Configuration is valid.".green().bold());
    Ok(())
}

/// Human-readable listing of users, scopes and clients.
pub fn summary(configuration: &IdpConfiguration) -> String {
    let mut out = String::new();

    out.push_str(&format!("{} ({})\n", "Users".bold(), configuration.users().len()));
    for user in configuration.users().iter() {
        out.push_str(&format!(
            "  {} {} {}\n",
            "✓".green(),
            user.username(),
            format!("sub={} claims={}", user.subject_id(), user.claims().len()).dimmed()
        ));
    }

    let resources = configuration.resources();
    out.push_str(&format!(
        "{} ({})\n",
        "Scopes".bold(),
        resources.identity_resources().len() + resources.api_scopes().len()
    ));
    for resource in resources.identity_resources() {
        out.push_str(&format!(
            "  {} {} {}\n",
            "✓".green(),
            resource.name,
            format!("identity [{}]", join(&resource.user_claims)).dimmed()
        ));
    }
    for scope in resources.api_scopes() {
        let owners: Vec<&str> = resources
            .api_resources_for_scope(&scope.name)
            .map(|r| r.name.as_str())
            .collect();
        out.push_str(&format!(
            "  {} {} {}\n",
            "✓".green(),
            scope.name,
            format!("api resource={}", owners.join(",")).dimmed()
        ));
    }

    out.push_str(&format!("{} ({})\n", "Clients".bold(), configuration.clients().len()));
    for client in configuration.clients().clients() {
        let grants: Vec<&str> = client.allowed_grant_types.iter().map(|g| g.as_str()).collect();
        out.push_str(&format!(
            "  {} {} {}\n",
            "✓".green(),
            client.client_id,
            format!(
                "grants=[{}] scopes=[{}]{}",
                grants.join(","),
                join(&client.allowed_scopes),
                if client.allow_offline_access {
                    " +offline_access"
                } else {
                    ""
                }
            )
            .dimmed()
        ));
        if client
            .allowed_grant_types
            .contains(&GrantType::AuthorizationCode)
            && !client.require_pkce
            && !client.allow_plain_text_pkce
        {
            out.push_str(&format!(
                "    {} {}\n",
                "!".yellow(),
                "PKCE optional, plain-text PKCE disallowed".yellow()
            ));
        }
    }

    out
}

fn join<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::sample;

    #[test]
    fn summary_lists_every_entity() {
        let text = summary(sample());
        for name in ["alice", "sas", "sasdemo01", "bob"] {
            assert!(text.contains(name), "missing user {name}");
        }
        assert!(text.contains("weatherapi.read"));
        assert!(text.contains("api resource=weatherapi"));
        assert!(text.contains("m2m.client"));
        assert!(text.contains("grants=[client_credentials]"));
        assert!(text.contains("+offline_access"));
        assert!(text.contains("PKCE optional"));
    }

    #[test]
    fn run_fails_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(Some(dir.path().join("absent.yaml").as_path())).unwrap_err();
        assert!(err.to_string().contains("absent.yaml"));
    }

    #[test]
    fn run_fails_on_invalid_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idp.yaml");
        std::fs::write(
            &path,
            "clients:\n  - client_id: orphan\n    client_secrets: [\"sha256:jKGHySpqOJJzXKn9zFr5H09CPujNpVAVgZLP5CGSRq0=\"]\n    allowed_grant_types: [client_credentials]\n    allowed_scopes: [nowhere]\n",
        )
        .unwrap();
        let err = run(Some(path.as_path())).unwrap_err();
        assert!(err.to_string().contains("nowhere"), "{err}");
    }
}

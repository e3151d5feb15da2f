use crate::error::ConfigurationError;

/// Backend that resolves `${...}` placeholder references.
pub trait SecretResolver: Send + Sync {
    fn resolve(&self, reference: &str) -> Result<String, ConfigurationError>;
}

/// Default resolver: env vars and file references.
///
/// Supports the following reference formats:
/// - `${VAR_NAME}` resolves from an environment variable
/// - `${env:VAR_NAME}` explicit env var resolution
/// - `${file:/path/to/secret}` reads from a file (trimmed)
pub struct DefaultSecretResolver;

impl SecretResolver for DefaultSecretResolver {
    fn resolve(&self, reference: &str) -> Result<String, ConfigurationError> {
        if let Some(path) = reference.strip_prefix("file:") {
            std::fs::read_to_string(path.trim())
                .map(|s| s.trim().to_string())
                .map_err(|e| {
                    ConfigurationError::UnresolvedPlaceholder(format!(
                        "secret file '{}': {}",
                        path.trim(),
                        e
                    ))
                })
        } else {
            let var = reference.strip_prefix("env:").unwrap_or(reference).trim();
            std::env::var(var).map_err(|_| {
                ConfigurationError::UnresolvedPlaceholder(format!(
                    "environment variable '{var}' is not set"
                ))
            })
        }
    }
}

/// Resolve `${...}` placeholders in a string value.
pub fn resolve_placeholders(
    value: &str,
    resolver: &dyn SecretResolver,
) -> Result<String, ConfigurationError> {
    let mut result = String::with_capacity(value.len());
    let mut rest = value;
    // Resolved text is copied as-is, never scanned again.
    while let Some(start) = rest.find("${") {
        let end = rest[start..].find('}').ok_or_else(|| {
            ConfigurationError::UnresolvedPlaceholder(format!("unclosed placeholder in '{value}'"))
        })?;
        result.push_str(&rest[..start]);
        result.push_str(&resolver.resolve(&rest[start + 2..start + end])?);
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    Ok(result)
}

/// Resolve placeholders in every string leaf of a YAML tree.
pub(crate) fn resolve_yaml(
    value: &mut serde_yaml::Value,
    resolver: &dyn SecretResolver,
) -> Result<(), ConfigurationError> {
    match value {
        serde_yaml::Value::String(s) if s.contains("${") => {
            *s = resolve_placeholders(s, resolver)?;
        }
        serde_yaml::Value::Sequence(seq) => {
            for item in seq {
                resolve_yaml(item, resolver)?;
            }
        }
        serde_yaml::Value::Mapping(map) => {
            for (_, item) in map.iter_mut() {
                resolve_yaml(item, resolver)?;
            }
        }
        serde_yaml::Value::Tagged(tagged) => resolve_yaml(&mut tagged.value, resolver)?,
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct MapResolver;

    impl SecretResolver for MapResolver {
        fn resolve(&self, reference: &str) -> Result<String, ConfigurationError> {
            match reference {
                "M2M_SECRET" => Ok("sha256:abc=".into()),
                "INJECT" => Ok("sha256:${LEAK}".into()),
                "LEAK" => Ok("leaked-value".into()),
                "SELF" => Ok("${SELF}".into()),
                other => Err(ConfigurationError::UnresolvedPlaceholder(other.into())),
            }
        }
    }

    #[test]
    #[serial]
    fn test_env_resolution() {
        unsafe { std::env::set_var("TEST_VIYA_IDP_SECRET", "sha256:xyz=") };
        let resolver = DefaultSecretResolver;
        let plain = resolve_placeholders("${TEST_VIYA_IDP_SECRET}", &resolver).unwrap();
        let explicit = resolve_placeholders("${env:TEST_VIYA_IDP_SECRET}", &resolver).unwrap();
        assert_eq!(plain, "sha256:xyz=");
        assert_eq!(explicit, "sha256:xyz=");
        unsafe { std::env::remove_var("TEST_VIYA_IDP_SECRET") };
    }

    #[test]
    #[serial]
    fn test_missing_env_var() {
        unsafe { std::env::remove_var("TEST_VIYA_IDP_MISSING") };
        let result = resolve_placeholders("${env:TEST_VIYA_IDP_MISSING}", &DefaultSecretResolver);
        assert!(matches!(
            result,
            Err(ConfigurationError::UnresolvedPlaceholder(_))
        ));
    }

    #[test]
    fn test_file_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let secret_file = dir.path().join("secret.txt");
        std::fs::write(&secret_file, "sha256:from-file=\n").unwrap();

        let ref_str = format!("${{file:{}}}", secret_file.display());
        let result = resolve_placeholders(&ref_str, &DefaultSecretResolver).unwrap();
        assert_eq!(result, "sha256:from-file=");
    }

    #[test]
    fn test_resolved_values_are_not_expanded_again() {
        let result = resolve_placeholders("${INJECT}", &MapResolver).unwrap();
        assert_eq!(result, "sha256:${LEAK}");
        let result = resolve_placeholders("${SELF}", &MapResolver).unwrap();
        assert_eq!(result, "${SELF}");
    }

    #[test]
    fn test_multiple_placeholders_in_one_value() {
        let result = resolve_placeholders("a-${LEAK}-${M2M_SECRET}-z", &MapResolver).unwrap();
        assert_eq!(result, "a-leaked-value-sha256:abc=-z");
    }

    #[test]
    fn test_unclosed_placeholder() {
        assert!(resolve_placeholders("${UNCLOSED", &MapResolver).is_err());
    }

    #[test]
    fn test_no_placeholder() {
        assert_eq!(
            resolve_placeholders("plain-value", &MapResolver).unwrap(),
            "plain-value"
        );
    }

    #[test]
    fn test_resolve_yaml_tree() {
        let mut yaml: serde_yaml::Value = serde_yaml::from_str(
            "clients:\n  - client_id: m2m\n    client_secrets: [\"${M2M_SECRET}\"]\n",
        )
        .unwrap();
        resolve_yaml(&mut yaml, &MapResolver).unwrap();
        assert_eq!(
            yaml["clients"][0]["client_secrets"][0].as_str(),
            Some("sha256:abc=")
        );
    }
}

use thiserror::Error;

/// An environment variable required by the application is not set.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVarError(pub String);

/// Reads an environment variable, returning a structured error if it's missing.
///
/// Blank values count as missing, since an empty app key is never usable.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    get_optional_env_var(name).ok_or_else(|| MissingEnvVarError(name.to_string()))
}

/// Reads an optional override. Unset and blank variables both yield `None`.
pub fn get_optional_env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variable_names_itself() {
        let err = get_env_var("SHARED_UTILS_SURELY_UNSET_VAR").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing environment variable: SHARED_UTILS_SURELY_UNSET_VAR"
        );
    }

    #[test]
    fn unset_optional_is_none() {
        assert!(get_optional_env_var("SHARED_UTILS_SURELY_UNSET_VAR").is_none());
    }
}

//! Environment variable interpolation for config files.
//!
//! Supports `${VAR}` (error if unset), `${VAR:-default}` (default if unset
//! or empty), and `$$` as an escape for a literal `$`.

use std::env;
use std::sync::LazyLock;

use regex::Regex;

static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\$|\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
        .expect("interpolation pattern must compile")
});

/// Result of environment variable interpolation.
#[derive(Debug)]
pub struct InterpolationResult {
    /// The interpolated text.
    pub text: String,
    /// Errors encountered; accumulated so the user sees every missing
    /// variable at once.
    pub errors: Vec<String>,
}

impl InterpolationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Interpolate environment variables in `input`.
pub fn interpolate(input: &str) -> InterpolationResult {
    let mut errors = Vec::new();

    let text = VAR_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            let full_match = caps.get(0).unwrap().as_str();
            if full_match == "$$" {
                return "$".to_string();
            }

            let name = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let default = caps.get(2).map(|m| m.as_str());

            match env::var(name) {
                Ok(value) if value.contains('\n') || value.contains('\r') => {
                    errors.push(format!(
                        "environment variable '{name}' contains newlines, which is not allowed"
                    ));
                    full_match.to_string()
                }
                Ok(value) if value.is_empty() && default.is_some() => {
                    default.unwrap_or("").to_string()
                }
                Ok(value) => value,
                Err(_) => match default {
                    Some(default) => default.to_string(),
                    None => {
                        errors.push(format!("environment variable '{name}' is not set"));
                        full_match.to_string()
                    }
                },
            }
        })
        .to_string();

    InterpolationResult { text, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn with_env_vars<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let originals: Vec<_> = vars.iter().map(|(k, _)| (*k, env::var(k).ok())).collect();

        // SAFETY: these tests run in a single process and restore every
        // variable before returning.
        for (key, value) in vars {
            match value {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }

        let result = f();

        for (key, original) in originals {
            match original {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }

        result
    }

    #[test]
    fn test_braced_substitution() {
        with_env_vars(&[("ROLLCALL_TEST_BRACED", Some("world"))], || {
            let result = interpolate("value: ${ROLLCALL_TEST_BRACED}");
            assert!(result.is_ok());
            assert_eq!(result.text, "value: world");
        });
    }

    #[test]
    fn test_missing_variable_error() {
        with_env_vars(&[("ROLLCALL_TEST_MISSING", None)], || {
            let result = interpolate("value: ${ROLLCALL_TEST_MISSING}");
            assert!(!result.is_ok());
            assert_eq!(result.errors.len(), 1);
            assert!(result.errors[0].contains("ROLLCALL_TEST_MISSING"));
        });
    }

    #[test]
    fn test_errors_accumulate() {
        with_env_vars(
            &[("ROLLCALL_TEST_MISS1", None), ("ROLLCALL_TEST_MISS2", None)],
            || {
                let result =
                    interpolate("a: ${ROLLCALL_TEST_MISS1}, b: ${ROLLCALL_TEST_MISS2}");
                assert_eq!(result.errors.len(), 2);
            },
        );
    }

    #[test]
    fn test_default_applies_when_unset_or_empty() {
        with_env_vars(
            &[
                ("ROLLCALL_TEST_UNSET", None),
                ("ROLLCALL_TEST_EMPTY", Some("")),
            ],
            || {
                let result = interpolate(
                    "a: ${ROLLCALL_TEST_UNSET:-one}, b: ${ROLLCALL_TEST_EMPTY:-two}",
                );
                assert!(result.is_ok());
                assert_eq!(result.text, "a: one, b: two");
            },
        );
    }

    #[test]
    fn test_set_variable_wins_over_default() {
        with_env_vars(&[("ROLLCALL_TEST_SET", Some("actual"))], || {
            let result = interpolate("value: ${ROLLCALL_TEST_SET:-default}");
            assert_eq!(result.text, "value: actual");
        });
    }

    #[test]
    fn test_escape_sequence() {
        let result = interpolate("price: $$100");
        assert!(result.is_ok());
        assert_eq!(result.text, "price: $100");
    }

    #[test]
    fn test_newline_injection_blocked() {
        with_env_vars(&[("ROLLCALL_TEST_NL", Some("line1\nline2"))], || {
            let result = interpolate("value: ${ROLLCALL_TEST_NL}");
            assert!(!result.is_ok());
            assert!(result.errors[0].contains("newlines"));
        });
    }

    #[test]
    fn test_plain_text_untouched() {
        let result = interpolate("plain text without variables");
        assert!(result.is_ok());
        assert_eq!(result.text, "plain text without variables");
    }
}

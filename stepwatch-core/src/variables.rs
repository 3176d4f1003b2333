//! Pipeline variables
//!
//! The workflow step takes variables as a single colon-separated string such as
//! `DEPLOY_ENV=staging:DRY_RUN=false`. GitLab expects them as a list of
//! key/value objects in the create-pipeline body.

use crate::dto::gitlab::PipelineVariable;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariablesError {
    #[error("variable '{0}' is not in key=value form")]
    MissingSeparator(String),

    #[error("variable '{0}' has an empty key")]
    EmptyKey(String),
}

/// Parses a colon-separated `key=value` list
///
/// An empty or blank string yields no variables. Only the first `=` splits a
/// segment, so values may themselves contain `=`. Empty segments (`a=1::b=2`)
/// are ignored.
pub fn parse_variables(raw: &str) -> Result<Vec<PipelineVariable>, VariablesError> {
    raw.split(':')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| VariablesError::MissingSeparator(segment.to_string()))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(VariablesError::EmptyKey(segment.to_string()));
            }
            Ok(PipelineVariable {
                key: key.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(key: &str, value: &str) -> PipelineVariable {
        PipelineVariable {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_parse_variables() {
        let vars = parse_variables("var1=value1:var2=value2").unwrap();
        assert_eq!(vars, vec![var("var1", "value1"), var("var2", "value2")]);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_variables("").unwrap().is_empty());
        assert!(parse_variables("   ").unwrap().is_empty());
    }

    #[test]
    fn test_value_may_contain_equals() {
        let vars = parse_variables("QUERY=a=b").unwrap();
        assert_eq!(vars, vec![var("QUERY", "a=b")]);
    }

    #[test]
    fn test_empty_value_is_allowed() {
        let vars = parse_variables("FLAG=").unwrap();
        assert_eq!(vars, vec![var("FLAG", "")]);
    }

    #[test]
    fn test_skips_empty_segments() {
        let vars = parse_variables("a=1::b=2:").unwrap();
        assert_eq!(vars, vec![var("a", "1"), var("b", "2")]);
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(
            parse_variables("a=1:oops"),
            Err(VariablesError::MissingSeparator("oops".to_string()))
        );
        assert_eq!(
            parse_variables("=value"),
            Err(VariablesError::EmptyKey("=value".to_string()))
        );
    }
}

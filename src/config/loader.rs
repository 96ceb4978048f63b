//! Chain definition loading.

use crate::config::schema::ChainDefinition;
use crate::error::{ChainError, Result};
use std::fs;
use std::path::Path;

/// Load a chain definition file and parse it into a [`ChainDefinition`].
///
/// # Errors
///
/// Returns `DefinitionNotFound` if the file doesn't exist.
/// Returns `DefinitionParse` if the YAML is invalid.
pub fn load_definition(path: &Path) -> Result<ChainDefinition> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ChainError::DefinitionNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ChainError::Io(e)
        }
    })?;

    parse_definition(&content, path)
}

/// Parse YAML content into a [`ChainDefinition`].
///
/// # Arguments
///
/// * `content` - The YAML content to parse
/// * `source_path` - Path for error reporting
pub fn parse_definition(content: &str, source_path: &Path) -> Result<ChainDefinition> {
    serde_yaml::from_str(content).map_err(|e| ChainError::DefinitionParse {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StepSpec;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn load_missing_file_reports_not_found() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chain.yml");

        let err = load_definition(&path).unwrap_err();
        assert!(matches!(err, ChainError::DefinitionNotFound { .. }));
    }

    #[test]
    fn load_reads_steps_in_order() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chain.yml");
        fs::write(
            &path,
            r#"
model: fast
streaming: true
pricing:
  input_per_1k: 0.001
  output_per_1k: 0.002
steps:
  - "Outline {{input.topic}}"
  - id: draft
    prompt: "Draft from {{step1}}"
    after: step1
"#,
        )
        .unwrap();

        let def = load_definition(&path).unwrap();
        assert_eq!(def.model.as_deref(), Some("fast"));
        assert!(def.streaming);
        assert_eq!(def.pricing.unwrap().output_per_1k, 0.002);
        assert_eq!(def.steps.len(), 2);
        assert!(matches!(def.steps[0], StepSpec::Prompt(_)));
        assert!(matches!(def.steps[1], StepSpec::Descriptor(_)));
    }

    #[test]
    fn parse_error_carries_path() {
        let err = parse_definition("steps: [", &PathBuf::from("broken.yml")).unwrap_err();
        match err {
            ChainError::DefinitionParse { path, .. } => {
                assert_eq!(path, PathBuf::from("broken.yml"));
            }
            other => panic!("Expected DefinitionParse, got {:?}", other),
        }
    }
}

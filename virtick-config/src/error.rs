//! Error types for configuration loading and validation

use std::path::PathBuf;
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid configuration:\n{}", format_validation_errors(.0))]
    Validation(#[source] ValidationErrors),

    #[error("Configuration parsing error: {0}")]
    Parsing(#[from] figment::Error),

    #[error("Configuration I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_validation_errors(errors: &ValidationErrors) -> String {
    use std::fmt::Write;

    let mut output = String::new();
    for (section, kind) in errors.errors() {
        match kind {
            validator::ValidationErrorsKind::Field(field_errors) => {
                let _ = writeln!(output, "Field '{}':", section);
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|msg| msg.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    let _ = writeln!(output, "  - {}", message);
                }
            }
            validator::ValidationErrorsKind::Struct(nested) => {
                let _ = writeln!(output, "Section '{}':", section);
                for line in format_validation_errors(nested).lines() {
                    let _ = writeln!(output, "  {}", line);
                }
            }
            validator::ValidationErrorsKind::List(items) => {
                for (idx, nested) in items {
                    let _ = writeln!(output, "Item '{}[{}]':", section, idx);
                    output.push_str(&format_validation_errors(nested));
                }
            }
        }
    }
    output
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Validation(errors)
    }
}

use crate::config::ConfigPathError;
use crate::export::ExportError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    ConfigPath(#[from] ConfigPathError),
    #[error("config file is not valid JSON: {0}")]
    Config(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_errors_convert_with_question_mark() {
        fn fails() -> AppResult<()> {
            Err(ExportError::UnsupportedFormat { format: "pdf" })?;
            Ok(())
        }

        let error = fails().expect_err("export error should propagate");
        assert!(matches!(error, AppError::Export(_)));
    }

    #[test]
    fn transparent_variants_keep_source_message() {
        let error = AppError::from(ConfigPathError::MissingHomeDirectory);
        assert_eq!(error.to_string(), "neither XDG_CONFIG_HOME nor HOME is set");
    }

    #[test]
    fn json_errors_are_labelled_as_config() {
        let error = AppError::from(
            serde_json::from_str::<serde_json::Value>("{").expect_err("input is truncated"),
        );
        assert!(error.to_string().starts_with("config file is not valid JSON"));
    }
}

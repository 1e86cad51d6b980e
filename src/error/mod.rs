use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// The unified error type for every pipeline stage
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("[E{code:04}] File not found: {}", .path.display())]
    NotFound {
        code: u16,
        path: PathBuf,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Parse error: {message}")]
    Parse {
        code: u16,
        message: String,
        line: Option<u64>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Unknown column '{column}'")]
    UnknownColumn { code: u16, column: String },

    #[error("[E{code:04}] Column '{column}' already exists")]
    DuplicateColumn { code: u16, column: String },

    #[error("[E{code:04}] Cannot coerce {value:?} in column '{column}' (row {row}) to {target}")]
    Coercion {
        code: u16,
        column: String,
        row: usize,
        value: String,
        target: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Missing column '{column}' required by {context}")]
    MissingColumn {
        code: u16,
        column: String,
        context: String,
    },

    #[error("[E{code:04}] Invalid rule: {message}")]
    InvalidRule {
        code: u16,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] IO error: {message}")]
    Io {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl PipelineError {
    /// Create a not-found error for a path
    pub fn not_found(path: impl AsRef<Path>) -> Self {
        Self::NotFound {
            code: ErrorCode::LOAD_NOT_FOUND,
            path: path.as_ref().to_path_buf(),
            source: None,
        }
    }

    /// Create a not-found error with a specific code
    pub fn not_found_with_code(code: u16, path: impl AsRef<Path>) -> Self {
        Self::NotFound {
            code,
            path: path.as_ref().to_path_buf(),
            source: None,
        }
    }

    /// Create a parse error tied to an input line
    pub fn parse_at(code: u16, line: Option<u64>, message: impl Into<String>) -> Self {
        Self::Parse {
            code,
            message: message.into(),
            line,
            source: None,
        }
    }

    pub fn unknown_column(column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            code: ErrorCode::CLEAN_UNKNOWN_COLUMN,
            column: column.into(),
        }
    }

    pub fn duplicate_column(column: impl Into<String>) -> Self {
        Self::DuplicateColumn {
            code: ErrorCode::CLEAN_DUPLICATE_COLUMN,
            column: column.into(),
        }
    }

    /// Create a coercion error for a single offending cell
    pub fn coercion(
        column: impl Into<String>,
        row: usize,
        value: impl Into<String>,
        target: impl Display,
    ) -> Self {
        Self::Coercion {
            code: ErrorCode::CLEAN_COERCION_FAILED,
            column: column.into(),
            row,
            value: value.into(),
            target: target.to_string(),
            source: None,
        }
    }

    /// Create a missing-column error with specific code
    pub fn missing_column(code: u16, column: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingColumn {
            code,
            column: column.into(),
            context: context.into(),
        }
    }

    /// Create an invalid-rule error with specific code
    pub fn invalid_rule(code: u16, message: impl Into<String>) -> Self {
        Self::InvalidRule {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create an IO error with specific code and path
    pub fn io_with_code(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Io {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Add a source error to this error
    ///
    /// Variants without a source slot are returned unchanged.
    pub fn with_source(mut self, source: impl Into<BoxedSource>) -> Self {
        match &mut self {
            Self::NotFound { source: src, .. }
            | Self::Parse { source: src, .. }
            | Self::Coercion { source: src, .. }
            | Self::InvalidRule { source: src, .. }
            | Self::Io { source: src, .. } => {
                *src = Some(source.into());
            }
            Self::UnknownColumn { .. }
            | Self::DuplicateColumn { .. }
            | Self::MissingColumn { .. } => {}
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Parse { message, .. }
            | Self::InvalidRule { message, .. }
            | Self::Io { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
            Self::MissingColumn { context: ctx, .. } => {
                *ctx = format!("{} ({})", ctx, context);
            }
            Self::NotFound { .. }
            | Self::UnknownColumn { .. }
            | Self::DuplicateColumn { .. }
            | Self::Coercion { .. } => {}
        }
        self
    }

    /// Name of the error kind, as reported to callers
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFoundError",
            Self::Parse { .. } => "ParseError",
            Self::UnknownColumn { .. } => "UnknownColumnError",
            Self::DuplicateColumn { .. } => "DuplicateColumnError",
            Self::Coercion { .. } => "CoercionError",
            Self::MissingColumn { .. } => "MissingColumnError",
            Self::InvalidRule { .. } => "InvalidRuleError",
            Self::Io { .. } => "IoError",
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => 3,
            Self::Parse { .. } => 4,
            Self::UnknownColumn { .. } | Self::DuplicateColumn { .. } => 5,
            Self::Coercion { .. } => 6,
            Self::MissingColumn { .. } => 7,
            Self::InvalidRule { .. } => 2,
            Self::Io { .. } => 1,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::NotFound { code, .. }
            | Self::Parse { code, .. }
            | Self::UnknownColumn { code, .. }
            | Self::DuplicateColumn { code, .. }
            | Self::Coercion { code, .. }
            | Self::MissingColumn { code, .. }
            | Self::InvalidRule { code, .. }
            | Self::Io { code, .. } => *code,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { path, .. } => format!("No such file: {}", path.display()),
            Self::Parse { message, line, .. } => match line {
                Some(l) => format!("Malformed input at line {}: {}", l, message),
                None => format!("Malformed input: {}", message),
            },
            Self::UnknownColumn { column, .. } => {
                format!("Column '{}' does not exist in the table", column)
            }
            Self::DuplicateColumn { column, .. } => {
                format!("Cannot rename: column '{}' already exists", column)
            }
            Self::Coercion {
                column,
                row,
                value,
                target,
                ..
            } => format!(
                "Value {:?} in column '{}' (row {}) is not a valid {}",
                value, column, row, target
            ),
            Self::MissingColumn {
                column, context, ..
            } => format!("{} needs column '{}', which is not present", context, column),
            Self::InvalidRule { message, .. } => format!("Invalid pipeline rule: {}", message),
            Self::Io { message, path, .. } => match path {
                Some(p) => format!("IO error at {}: {}", p.display(), message),
                None => format!("IO error: {}", message),
            },
        }
    }

    /// Get a developer-friendly error message with full chain
    pub fn developer_message(&self) -> String {
        let mut out = format!("{}\n  ({})", self, describe_error_code(self.code()));
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str(&format!("\n  caused by: {}", cause));
            source = cause.source();
        }
        out
    }
}

/// Type alias for Results using PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Type alias for application Results (using anyhow for flexibility)
pub type AppResult<T> = anyhow::Result<T>;

/// The pipeline stage in which an error surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Clean,
    Derive,
    Aggregate,
    Export,
}

impl Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Clean => "clean",
            Stage::Derive => "derive",
            Stage::Aggregate => "aggregate",
            Stage::Export => "export",
        };
        f.write_str(name)
    }
}

/// A pipeline error annotated with the stage that raised it
#[derive(Error, Debug)]
#[error("{stage} stage failed: {error}")]
pub struct StageError {
    pub stage: Stage,
    pub error: PipelineError,
}

impl StageError {
    pub fn new(stage: Stage, error: PipelineError) -> Self {
        Self { stage, error }
    }

    pub fn user_message(&self) -> String {
        format!(
            "{} ({} during {} stage)",
            self.error.user_message(),
            self.error.kind(),
            self.stage
        )
    }

    pub fn exit_code(&self) -> i32 {
        self.error.exit_code()
    }
}

/// Extension for tagging a `Result` with the stage it belongs to
pub trait StageExt<T> {
    fn in_stage(self, stage: Stage) -> std::result::Result<T, StageError>;
}

impl<T> StageExt<T> for Result<T> {
    fn in_stage(self, stage: Stage) -> std::result::Result<T, StageError> {
        self.map_err(|error| StageError::new(stage, error))
    }
}

// Conversion from common error types

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::io_with_code(ErrorCode::IO_ERROR, err.to_string(), None).with_source(err)
    }
}

impl From<serde_yaml::Error> for PipelineError {
    fn from(err: serde_yaml::Error) -> Self {
        PipelineError::invalid_rule(ErrorCode::CONFIG_INVALID_YAML, "Invalid YAML syntax")
            .with_context(&err)
            .with_source(err)
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        PipelineError::invalid_rule(ErrorCode::CONFIG_INVALID_TOML, "Invalid TOML syntax")
            .with_context(err.message())
            .with_source(err)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::io_with_code(ErrorCode::EXPORT_FAILED, "JSON serialization failed", None)
            .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation_and_chaining() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked");
        let err = PipelineError::io_with_code(ErrorCode::EXPORT_FAILED, "Cannot write", None)
            .with_source(io_err)
            .with_context("while exporting by_department");

        assert_eq!(err.code(), ErrorCode::EXPORT_FAILED);
        assert!(err.to_string().contains("[E9002]"));
        assert!(err.user_message().contains("Cannot write"));
        assert!(err.developer_message().contains("caused by: locked"));
    }

    #[test]
    fn test_kinds_and_exit_codes() {
        let err = PipelineError::coercion("Join_Date", 3, "2020-13-01", "date");
        assert_eq!(err.kind(), "CoercionError");
        assert_eq!(err.exit_code(), 6);
        assert!(err.user_message().contains("row 3"));

        let err = PipelineError::not_found("missing.csv");
        assert_eq!(err.kind(), "NotFoundError");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_stage_error_reports_stage_and_kind() {
        let result: Result<()> = Err(PipelineError::unknown_column("Bonus"));
        let err = result.in_stage(Stage::Clean).unwrap_err();

        assert_eq!(err.stage, Stage::Clean);
        assert_eq!(err.exit_code(), 5);
        assert!(err.to_string().starts_with("clean stage failed"));
        assert!(err.user_message().contains("UnknownColumnError during clean stage"));
    }
}

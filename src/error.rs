use std::path::PathBuf;
use std::process::ExitCode;

/// Failures while validating or resolving a process descriptor.
///
/// All of these are startup failures: they are reported to the operator and
/// never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("unknown profile {profile:?} for app {app:?} (declared: {})", declared.join(", "))]
    UnknownProfile {
        app: String,
        profile: String,
        declared: Vec<String>,
    },

    #[error("entry point for app {app:?} not found: {}", path.display())]
    MissingEntryPoint { app: String, path: PathBuf },

    #[error("malformed descriptor: {0}")]
    MalformedDescriptor(String),

    #[error("unknown app {name:?} (declared: {})", declared.join(", "))]
    UnknownApp { name: String, declared: Vec<String> },

    #[error("several apps declared; name one of: {}", declared.join(", "))]
    AmbiguousApp { declared: Vec<String> },
}

impl DescriptorError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDescriptor(message.into())
    }

    /// Numeric process exit status for this failure.
    pub const fn code(&self) -> u8 {
        match self {
            Self::MalformedDescriptor(_) => 2,
            Self::UnknownProfile { .. } | Self::UnknownApp { .. } | Self::AmbiguousApp { .. } => 3,
            Self::MissingEntryPoint { .. } => 4,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

/// Errors that cause warden to exit with a specific code.
#[derive(Debug, thiserror::Error)]
pub enum ExitError {
    #[error("config error: {0}")]
    Config(String),

    #[error("interpreter not found: {interpreter}")]
    InterpreterNotFound { interpreter: String },

    #[error("interrupted")]
    Interrupted,

    #[error("{message}")]
    WithCode { code: u8, message: String },

    #[error("{0}")]
    Other(String),
}

impl ExitError {
    pub const fn new(code: u8, message: String) -> Self {
        Self::WithCode { code, message }
    }

    pub const fn code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::InterpreterNotFound { .. } => 5,
            Self::Interrupted => 130,
            Self::WithCode { code, .. } => *code,
            Self::Other(_) => 1,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

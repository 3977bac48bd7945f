use thiserror::Error;

/// Top-level error type for rigkit.
#[derive(Debug, Error)]
pub enum RigkitError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rig construction error: {0}")]
    Rig(#[from] RigError),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Invalid limb: {0}")]
    Rig(#[from] RigError),
}

/// Rig construction errors.
///
/// Raised synchronously where detected and never recovered from inside the
/// builder. Clone + PartialEq so callers and tests can match on exact values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RigError {
    #[error("Invalid side: {0} (must be L or R)")]
    InvalidSide(String),

    #[error("Invalid limb type: {0} (must be arm or leg)")]
    InvalidLimbType(String),

    #[error("A limb needs exactly 3 guides and 3 aliases, got {guides} guides and {aliases} aliases")]
    InvalidLimbSize { guides: usize, aliases: usize },

    #[error("Alignment needs a control and a joint, got {0} target(s)")]
    InvalidSelection(usize),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Invalid axis: {0} (must be X, Y, Z, -X, -Y or -Z)")]
    InvalidAxis(String),

    #[error("Division by zero: {0}")]
    DivisionByZero(String),
}

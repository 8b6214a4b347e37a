use std::fmt;

/// Sum type for everything that can go wrong before the service is up:
/// malformed registrar settings or an incomplete process environment. These
/// are fatal; the binary exits non-zero and the registrar refuses to touch
/// the hub configuration.
#[derive(Debug)]
pub enum ConfigurationError {
    MissingEnv(&'static str),
    InvalidEnv { name: &'static str, detail: String },
    InvalidSetting { name: &'static str, detail: String },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let x = match self {
            ConfigurationError::MissingEnv(name) => {
                format!("Missing environment variable ${}", name)
            }
            ConfigurationError::InvalidEnv { name, detail } => {
                format!("Invalid environment variable ${}: {}", name, detail)
            }
            ConfigurationError::InvalidSetting { name, detail } => {
                format!("Invalid setting `{}`: {}", name, detail)
            }
        };

        write!(f, "{}", x)
    }
}

impl std::error::Error for ConfigurationError {}

mod credentials;
mod paths;
mod settings;

pub use credentials::*;
pub use paths::*;
pub use settings::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file [{0}] was NOT found")]
    FileNotFound(String),
    #[error("Either section [{section}] or option [{option}] was NOT found in config file [{path}]")]
    MissingOption {
        path: String,
        section: String,
        option: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("INI parse error in [{path}]: {source}")]
    Ini {
        path: String,
        #[source]
        source: ini::ParseError,
    },
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

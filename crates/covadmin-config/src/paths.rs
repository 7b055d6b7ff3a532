use std::path::PathBuf;

pub const CREDENTIALS_FILE_NAME: &str = "CoverityCreateUser.cfg";

pub fn get_config_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".config").join("covadmin")
}

pub fn get_settings_path() -> PathBuf {
    get_config_dir().join("config.toml")
}

/// The credentials file is looked up in the working directory unless a path
/// is given explicitly.
pub fn get_credentials_path(explicit: Option<&std::path::Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(CREDENTIALS_FILE_NAME),
    }
}

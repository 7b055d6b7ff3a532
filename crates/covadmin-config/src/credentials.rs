use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use ini::Ini;
use tracing::debug;

use crate::ConfigError;

pub const SETTINGS_SECTION: &str = "App Settings";
pub const USER_OPTION: &str = "CoverityUser";
pub const PASSWORD_OPTION: &str = "CoverityPassword";
pub const SERVER_OPTION: &str = "CoverityServer";
pub const PORT_OPTION: &str = "CoverityPort";

/// Server address and login, read once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub port: String,
    pub username: String,
    pub password: String,
    pub use_tls: bool,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"********")
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

impl Credentials {
    pub fn scheme(&self) -> &'static str {
        if self.use_tls {
            "https"
        } else {
            "http"
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme(), self.host, self.port)
    }
}

/// A parsed credentials file whose options have not been read yet.
pub struct CredentialsFile {
    path: PathBuf,
    ini: Ini,
}

impl CredentialsFile {
    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let ini = Ini::load_from_str_noescape(&content).map_err(|source| ConfigError::Ini {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            ini,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the four options in file order, handing each one to `echo` as
    /// soon as it is found. Stops at the first missing option.
    pub fn read(
        &self,
        use_tls: bool,
        mut echo: impl FnMut(&str, &str) -> io::Result<()>,
    ) -> Result<Credentials, ConfigError> {
        let mut read = |option: &str| -> Result<String, ConfigError> {
            let value = read_option(&self.ini, &self.path, SETTINGS_SECTION, option)?;
            echo(option, &value)?;
            Ok(value)
        };

        Ok(Credentials {
            username: read(USER_OPTION)?,
            password: read(PASSWORD_OPTION)?,
            host: read(SERVER_OPTION)?,
            port: read(PORT_OPTION)?,
            use_tls,
        })
    }
}

/// Option names match case-insensitively, values are taken raw.
fn read_option(ini: &Ini, path: &Path, section: &str, option: &str) -> Result<String, ConfigError> {
    debug!(
        "Reading section [{}] and option [{}] from {}",
        section,
        option,
        path.display()
    );
    ini.section(Some(section))
        .and_then(|props| {
            props
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(option))
                .map(|(_, value)| value.trim().to_string())
        })
        .ok_or_else(|| ConfigError::MissingOption {
            path: path.display().to_string(),
            section: section.to_string(),
            option: option.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "[App Settings]\n\
        CoverityUser = admin\n\
        CoverityPassword = s3cr%t!x\n\
        CoverityServer = build.example.com\n\
        CoverityPort = 8443\n";

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CoverityCreateUser.cfg");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    fn load(path: &Path, use_tls: bool) -> Result<Credentials, ConfigError> {
        CredentialsFile::open(path)?.read(use_tls, |_, _| Ok(()))
    }

    #[test]
    fn test_load_all_options() {
        let (_dir, path) = write_config(FULL);
        let creds = load(&path, true).unwrap();
        assert_eq!(creds.username, "admin");
        assert_eq!(creds.password, "s3cr%t!x");
        assert_eq!(creds.host, "build.example.com");
        assert_eq!(creds.port, "8443");
        assert_eq!(creds.base_url(), "https://build.example.com:8443");
    }

    #[test]
    fn test_option_names_ignore_case() {
        let (_dir, path) = write_config(
            "[App Settings]\ncoverityuser=a\ncoveritypassword=b\ncoverityserver=c\ncoverityport=1\n",
        );
        let creds = load(&path, false).unwrap();
        assert_eq!(creds.username, "a");
        assert_eq!(creds.base_url(), "http://c:1");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CredentialsFile::open(&dir.path().join("nope.cfg")).err().unwrap();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_missing_option_names_it() {
        let (_dir, path) = write_config(
            "[App Settings]\nCoverityUser=a\nCoverityPassword=b\nCoverityServer=c\n",
        );
        match load(&path, true) {
            Err(ConfigError::MissingOption {
                section, option, ..
            }) => {
                assert_eq!(section, "App Settings");
                assert_eq!(option, "CoverityPort");
            }
            other => panic!("expected MissingOption, got {:?}", other),
        }
    }

    #[test]
    fn test_options_echoed_before_missing_one() {
        let (_dir, path) = write_config(
            "[App Settings]\nCoverityUser=a\nCoverityPassword=b\nCoverityServer=c\n",
        );
        let mut echoed = Vec::new();
        let result = CredentialsFile::open(&path).unwrap().read(true, |option, value| {
            echoed.push(format!("{}={}", option, value));
            Ok(())
        });

        assert!(matches!(result, Err(ConfigError::MissingOption { .. })));
        assert_eq!(
            echoed,
            vec!["CoverityUser=a", "CoverityPassword=b", "CoverityServer=c"]
        );
    }

    #[test]
    fn test_echo_error_stops_loading() {
        let (_dir, path) = write_config(FULL);
        let result = CredentialsFile::open(&path).unwrap().read(true, |_, _| {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        });
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_missing_section() {
        let (_dir, path) = write_config("[Other]\nCoverityUser=a\n");
        assert!(matches!(
            load(&path, true),
            Err(ConfigError::MissingOption { .. })
        ));
    }

    #[test]
    fn test_debug_masks_password() {
        let (_dir, path) = write_config(FULL);
        let creds = load(&path, true).unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("s3cr%t"));
        assert!(debug.contains("********"));
    }
}

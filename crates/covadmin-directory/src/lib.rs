mod directory;
#[cfg(any(test, feature = "testing"))]
mod memory;
mod roles;

pub use directory::*;
#[cfg(any(test, feature = "testing"))]
pub use memory::*;
pub use roles::*;

use covadmin_soap::SoapError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("User [{0}] was NOT found")]
    NotFound(String),
    #[error("[{0}] looks like an email address, an account name is required")]
    EmailUsername(String),
    #[error(transparent)]
    Remote(#[from] SoapError),
}

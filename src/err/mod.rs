use std::io;
use std::path::PathBuf;

#[cfg(unix)]
mod unix;

#[cfg(unix)]
pub use self::unix::*;

pub type Result<T> = ::std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("resource not found: {}", .0.display())]
    ResourceNotFound(PathBuf),

    #[error("{op} failed: {source}")]
    Mapping {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("invalid access to dword offset {0}")]
    InvalidOffset(isize),

    #[error("offset (0x{offset:x}) exceeds BAR size (0x{size:x})")]
    OutOfRange { offset: u64, size: u64 },

    #[error("cannot read attribute {0}")]
    AttributeUnavailable(String),

    #[error("attribute {name} has malformed value {value:?}")]
    InvalidAttribute { name: String, value: String },
}

impl Error {
    pub(crate) fn mapping<E: Into<io::Error>>(op: &'static str, err: E) -> Self {
        Error::Mapping { op: op, source: err.into() }
    }

    /// `true` for the "does not exist" shape shared by regions and attributes.
    pub fn is_not_found(&self) -> bool {
        match *self {
            Error::ResourceNotFound(_) | Error::AttributeUnavailable(_) => true,
            _ => false,
        }
    }
}

#[test]
fn test_out_of_range_message() {
    let err = Error::OutOfRange { offset: 16, size: 16 };
    assert_eq!(err.to_string(), "offset (0x10) exceeds BAR size (0x10)");
}

#[test]
fn test_mapping_source() {
    use std::error::Error as StdError;

    let err = Error::mapping("msync", INVALID_ARGUMENT);
    assert!(err.source().is_some());
    assert!(err.to_string().starts_with("msync failed"));
    assert!(!err.is_not_found());
    assert!(Error::AttributeUnavailable("vendor".into()).is_not_found());
}

use std::fmt;
use std::io;

/// Raw errno value captured right after a failing libc call.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct ErrCode(i32);

impl ErrCode {
    pub fn last_error() -> Self {
        ErrCode(io::Error::last_os_error().raw_os_error().unwrap_or(0))
    }
}

impl fmt::Debug for ErrCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", io::Error::from_raw_os_error(self.0))
    }
}

impl From<ErrCode> for io::Error {
    fn from(ec: ErrCode) -> Self {
        io::Error::from_raw_os_error(ec.0)
    }
}

pub const NO_SUCH_FILE_OR_DIRECTORY: ErrCode = ErrCode(libc::ENOENT);
pub const INVALID_ARGUMENT: ErrCode = ErrCode(libc::EINVAL);

#[test]
fn test_errcode_into_io_error() {
    let err: io::Error = NO_SUCH_FILE_OR_DIRECTORY.into();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);
    assert_eq!(io::Error::from(INVALID_ARGUMENT).raw_os_error(), Some(libc::EINVAL));
    assert_ne!(NO_SUCH_FILE_OR_DIRECTORY, INVALID_ARGUMENT);
}

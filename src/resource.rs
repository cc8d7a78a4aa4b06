use crate::err::{Error, ErrCode, Result, NO_SUCH_FILE_OR_DIRECTORY};
use crate::mapped_region::Privilege;

use std::ffi::CString;
use std::mem;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

/// Close descriptor on exit scope.
#[derive(Debug)]
struct Handle(RawFd);

impl Handle {
    fn size(&self) -> std::result::Result<u64, ErrCode> {
        let mut st: libc::stat = unsafe { mem::zeroed() };
        match unsafe { libc::fstat(self.0, &mut st) } {
            -1 => Err(ErrCode::last_error()),
            _ => Ok(st.st_size as u64),
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        unsafe { libc::close(self.0); }
    }
}

/// An open, mappable OS resource (e.g. a sysfs `resourceN` file) and its
/// byte length as reported by the OS.
#[derive(Debug)]
pub struct ResourceHandle {
    handle: Handle,
    path: PathBuf,
    len: u64,
}

impl ResourceHandle {
    /// Opens `path` with the access `P` grants, e.g.
    /// `ResourceHandle::open::<ReadWrite, _>(path)`.
    pub fn open<P, T>(path: T) -> Result<Self>
        where P: Privilege,
              T: AsRef<Path>,
    {
        let path = path.as_ref();
        let name = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| Error::ResourceNotFound(path.to_path_buf()))?;

        let handle = match unsafe { libc::open(name.as_ptr(), P::O_RD | libc::O_CLOEXEC) } {
            -1 => match ErrCode::last_error() {
                NO_SUCH_FILE_OR_DIRECTORY => return Err(Error::ResourceNotFound(path.to_path_buf())),
                ec => return Err(Error::mapping("open", ec)),
            },
            fd => Handle(fd),
        };
        let len = handle.size().map_err(|ec| Error::mapping("fstat", ec))?;

        debug!("opened {} ({} bytes)", path.display(), len);
        Ok(ResourceHandle {
            handle: handle,
            path: path.to_path_buf(),
            len: len,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn as_raw_fd(&self) -> RawFd {
        self.handle.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReadWrite;

    use std::io::Write;

    #[test]
    fn test_open_reports_length() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 256]).unwrap();
        let handle = ResourceHandle::open::<ReadWrite, _>(file.path()).unwrap();
        assert_eq!(handle.len(), 256);
        assert_eq!(handle.path(), file.path());
    }

    #[test]
    fn test_open_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resource0");
        match ResourceHandle::open::<ReadWrite, _>(&path) {
            Err(Error::ResourceNotFound(p)) => assert_eq!(p, path),
            Err(err) => panic!("unexpected {}", err),
            Ok(_) => panic!("opened a missing file"),
        }
    }
}

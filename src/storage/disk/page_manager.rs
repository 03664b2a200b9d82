use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{validate_page_size, PageId};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Reads and writes whole pages of a single data file.
///
/// All I/O is positioned (`pread`/`pwrite` style), so the file handle carries no
/// shared cursor and can be used through `&self` from several threads.
#[derive(Debug)]
pub struct PageManager {
    file: File,
    page_size: usize,
}

impl PageManager {
    /// Creates (or truncates) the data file.
    pub fn create(path: &Path, page_size: usize) -> StorageResult<Self> {
        validate_page_size(page_size)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self { file, page_size })
    }

    pub fn open(path: &Path, page_size: usize) -> StorageResult<Self> {
        validate_page_size(page_size)?;
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        Ok(Self { file, page_size })
    }

    /// Opens the data file, creating an empty one if it does not exist yet.
    pub fn open_or_create(path: &Path, page_size: usize) -> StorageResult<Self> {
        validate_page_size(page_size)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        Ok(Self { file, page_size })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Reads one page.
    ///
    /// Returns `None` when the page starts at or beyond the end of the file:
    /// the page id has been handed out but nothing was flushed there yet. A file
    /// that ends in the middle of the page is reported as `SizeMismatch`.
    pub fn read_page(&self, page_id: PageId) -> StorageResult<Option<Vec<u8>>> {
        let offset = page_id.file_offset(self.page_size);
        let file_size = self.file.metadata()?.len();

        if offset >= file_size {
            return Ok(None);
        }

        let available = (file_size - offset).min(self.page_size as u64) as usize;
        if available < self.page_size {
            return Err(StorageError::SizeMismatch {
                expected: self.page_size,
                actual: available,
            });
        }

        let mut buf = vec![0u8; self.page_size];
        read_exact_at(&self.file, &mut buf, offset)?;
        Ok(Some(buf))
    }

    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> StorageResult<()> {
        if data.len() != self.page_size {
            return Err(StorageError::SizeMismatch {
                expected: self.page_size,
                actual: data.len(),
            });
        }

        let offset = page_id.file_offset(self.page_size);
        write_all_at(&self.file, data, offset)?;
        self.file.sync_data()?;

        Ok(())
    }

    /// Number of complete pages currently in the file.
    pub fn num_pages(&self) -> StorageResult<u32> {
        let file_size = self.file.metadata()?.len();
        Ok((file_size / self.page_size as u64) as u32)
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt as _;
    file.read_exact_at(buf, offset)
}

#[cfg(unix)]
fn write_all_at(file: &File, data: &[u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt as _;
    file.write_all_at(data, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt as _;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(windows)]
fn write_all_at(file: &File, mut data: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt as _;
    while !data.is_empty() {
        match file.seek_write(data, offset) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => {
                data = &data[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::common::{DbError, PageId, Result, PAGE_SIZE};

/// DiskManager reads and writes fixed-size pages of one table file.
/// Page N lives at bytes `[N * PAGE_SIZE, (N + 1) * PAGE_SIZE)`.
pub struct DiskManager {
    file: Mutex<File>,
    path: PathBuf,
    /// Number of page reads performed
    num_reads: AtomicU32,
    /// Number of page writes performed
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Opens the file at `path`, creating it empty if it doesn't exist.
    /// Fails if the existing length is not a whole number of pages.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;

        let path = path.as_ref().canonicalize()?;
        let len = file.metadata()?.len();
        if len % PAGE_SIZE as u64 != 0 {
            return Err(DbError::InvalidTableFile {
                path: path.display().to_string(),
                len,
            });
        }

        Ok(Self {
            file: Mutex::new(file),
            path,
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        })
    }

    /// Reads one page. Pages at or past the end of the file don't exist.
    pub fn read_page(&self, page_id: PageId, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "Buffer must be PAGE_SIZE bytes");

        let offset = page_id.file_offset(PAGE_SIZE);
        let mut file = self.file.lock();
        if offset >= file.metadata()?.len() {
            return Err(DbError::PageOutOfRange(page_id));
        }
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(data)?;

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes one page, extending the file when writing past its end.
    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "Buffer must be PAGE_SIZE bytes");

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;
        file.write_all(data)?;
        file.flush()?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of whole pages in the file.
    pub fn num_pages(&self) -> Result<u32> {
        let len = self.file.lock().metadata()?.len();
        Ok((len / PAGE_SIZE as u64) as u32)
    }

    pub fn num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    pub fn num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    /// Canonical path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes OS buffers to the device.
    pub fn sync(&self) -> Result<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let _ = self.file.get_mut().sync_all();
    }
}

//! # Fixed-Width Record File
//!
//! `RecordFile` is the byte-level building block under both store variants.
//! It owns one file handle and exposes row-granular positioned I/O keyed by
//! record number. The file is created empty on first open and grows only
//! through [`RecordFile::append`]; [`RecordFile::write_at`] never extends
//! it.
//!
//! All row reads and writes go through `pread`/`pwrite`
//! (`std::os::unix::fs::FileExt`), so each row write is one system call and
//! there is no shared seek cursor to corrupt between operations.
//!
//! Out-of-range access at this level is a programming error in the caller:
//! the stores validate record numbers against `record_count()` before
//! descending here, and surface the user-facing NotFound class themselves.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use eyre::{ensure, Result, WrapErr};

#[derive(Debug)]
pub struct RecordFile {
    file: File,
    path: PathBuf,
    row_width: usize,
}

impl RecordFile {
    /// Opens the file for read+write, creating it empty if absent.
    pub fn open<P: AsRef<Path>>(path: P, row_width: usize) -> Result<Self> {
        let path = path.as_ref();

        ensure!(row_width > 0, "row width must be at least 1 byte");

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .wrap_err_with(|| format!("failed to open record file '{}'", path.display()))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            row_width,
        })
    }

    pub fn row_width(&self) -> usize {
        self.row_width
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn byte_length(&self) -> Result<u64> {
        let metadata = self
            .file
            .metadata()
            .wrap_err_with(|| format!("failed to stat record file '{}'", self.path.display()))?;
        Ok(metadata.len())
    }

    /// Number of row slots in the file, deleted slots included. O(1) via
    /// the file length; integer division discards a torn trailing row.
    pub fn record_count(&self) -> Result<u64> {
        Ok(self.byte_length()? / self.row_width as u64)
    }

    /// Reads the row at `pk` into `buf`. `buf` must be exactly one row wide
    /// and `pk` must be below `record_count()`.
    pub fn read_at(&self, pk: u64, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), self.row_width);

        let offset = pk * self.row_width as u64;
        self.file.read_exact_at(buf, offset).wrap_err_with(|| {
            format!(
                "failed to read row {} at offset {} of '{}'",
                pk,
                offset,
                self.path.display()
            )
        })
    }

    /// Overwrites the row at `pk` in place. Never extends the file.
    pub fn write_at(&mut self, pk: u64, row: &[u8]) -> Result<()> {
        debug_assert_eq!(row.len(), self.row_width);

        let total = self.record_count()?;
        ensure!(
            pk < total,
            "write to row {} would extend '{}' (record count {})",
            pk,
            self.path.display(),
            total
        );

        let offset = pk * self.row_width as u64;
        self.file.write_all_at(row, offset).wrap_err_with(|| {
            format!(
                "failed to write row {} at offset {} of '{}'",
                pk,
                offset,
                self.path.display()
            )
        })
    }

    /// Appends one row at the end of the file and returns its record
    /// number, which is exactly the record count before the call.
    pub fn append(&mut self, row: &[u8]) -> Result<u64> {
        debug_assert_eq!(row.len(), self.row_width);

        let pk = self.record_count()?;
        let offset = pk * self.row_width as u64;
        self.file.write_all_at(row, offset).wrap_err_with(|| {
            format!(
                "failed to append row {} at offset {} of '{}'",
                pk,
                offset,
                self.path.display()
            )
        })?;

        Ok(pk)
    }

    pub fn sync(&self) -> Result<()> {
        self.file
            .sync_all()
            .wrap_err_with(|| format!("failed to sync '{}'", self.path.display()))
    }
}

//! Positional page I/O over a backing regular file.
//!
//! Grounded on `small-db`'s page-level file access in `src/btree/table/table.rs`
//! (`read_page`/`write_page` at `page_index * PAGE_SIZE`), generalized into a
//! standalone type so both heap files and B+-tree files can share it, and
//! extended with a `reads`/`writes` observation log since the spec calls for
//! test-visible I/O counts (the teacher has no such counters).

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::page::PAGE_SIZE;

/// A single backing file, addressed page-by-page at offset
/// `page_number * PAGE_SIZE`.
pub struct PagedFile {
    file: File,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl PagedFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).create(true).open(path)?;
        Ok(PagedFile {
            file,
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        })
    }

    /// Number of whole pages currently stored in the file. A file whose
    /// length is not a multiple of `PAGE_SIZE` is treated as `Corrupt` by
    /// callers that check this invariant; this method itself just reports
    /// the floor.
    pub fn num_pages(&self) -> Result<usize> {
        let len = self.file.metadata()?.len();
        Ok((len / PAGE_SIZE as u64) as usize)
    }

    pub fn read_page(&mut self, page_number: u32, buf: &mut [u8; PAGE_SIZE]) -> Result<()> {
        let num_pages = self.num_pages()?;
        if page_number as usize >= num_pages {
            return Err(Error::OutOfRange(format!(
                "page {} out of range (file has {} pages)",
                page_number, num_pages
            )));
        }
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.file.seek(SeekFrom::Start(page_number as u64 * PAGE_SIZE as u64))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    pub fn write_page(&mut self, page_number: u32, buf: &[u8; PAGE_SIZE]) -> Result<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.file.seek(SeekFrom::Start(page_number as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    /// Appends one zeroed page and returns its page number.
    pub fn allocate_page(&mut self) -> Result<u32> {
        let page_number = self.num_pages()? as u32;
        self.write_page(page_number, &[0u8; PAGE_SIZE])?;
        Ok(page_number)
    }

    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestFile(std::path::PathBuf);

    impl TestFile {
        fn new(name: &str) -> Self {
            let mut path = std::env::temp_dir();
            path.push(format!("small-rel-store-test-{}-{:p}", name, &name));
            TestFile(path)
        }
    }

    impl Drop for TestFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    #[test]
    fn allocate_and_read_back() {
        let tf = TestFile::new("storage-roundtrip");
        let mut pf = PagedFile::open(&tf.0).unwrap();
        assert_eq!(pf.num_pages().unwrap(), 0);

        let p0 = pf.allocate_page().unwrap();
        let p1 = pf.allocate_page().unwrap();
        assert_eq!((p0, p1), (0, 1));
        assert_eq!(pf.num_pages().unwrap(), 2);

        let mut payload = [0u8; PAGE_SIZE];
        payload[0] = 42;
        pf.write_page(1, &payload).unwrap();

        let mut buf = [0u8; PAGE_SIZE];
        pf.read_page(1, &mut buf).unwrap();
        assert_eq!(buf[0], 42);

        assert!(pf.reads() >= 1);
        assert!(pf.writes() >= 3);
    }

    #[test]
    fn read_page_past_the_end_is_out_of_range() {
        let tf = TestFile::new("storage-oob");
        let mut pf = PagedFile::open(&tf.0).unwrap();
        pf.allocate_page().unwrap();

        let mut buf = [0u8; PAGE_SIZE];
        let err = pf.read_page(1, &mut buf).unwrap_err();
        assert_eq!(err, Error::OutOfRange("page 1 out of range (file has 1 pages)".into()));
    }
}

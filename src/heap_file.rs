//! Append-oriented table storage: an unordered sequence of heap pages.
//!
//! Grounded on the original `HeapFile.cpp` (`insertTuple`'s try-last-page-
//! then-allocate-new-page strategy, `numPages` from file size) and generalized
//! onto `BufferPool` rather than raw file handles, following `small-db`'s
//! `src/table.rs` role of a schema-aware handle over paged storage.

use std::sync::Arc;

use crate::buffer_pool::BufferPool;
use crate::error::{Error, Result};
use crate::page::{HeapPage, PageId};
use crate::tuple::{Tuple, TupleDesc};

/// An opaque cursor position: `(page_number, slot)`. `end()` is always
/// `(num_pages, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub page_number: u32,
    pub slot: usize,
}

pub struct HeapFile {
    name: Arc<str>,
    schema: TupleDesc,
}

impl HeapFile {
    pub fn new(name: Arc<str>, schema: TupleDesc) -> Self {
        HeapFile { name, schema }
    }

    pub fn schema(&self) -> &TupleDesc {
        &self.schema
    }

    pub fn open<P: AsRef<std::path::Path>>(&self, pool: &mut BufferPool, path: P) -> Result<()> {
        pool.open_file(self.name.clone(), path)
    }

    pub fn num_pages(&self, pool: &BufferPool) -> Result<usize> {
        pool.num_pages(&self.name)
    }

    fn page_id(&self, page_number: u32) -> PageId {
        PageId::new(self.name.clone(), page_number)
    }

    /// Smallest occupied cursor position, or `end()` if the file is empty.
    pub fn begin(&self, pool: &mut BufferPool) -> Result<Cursor> {
        let num_pages = self.num_pages(pool)?;
        for page_number in 0..num_pages as u32 {
            let bytes = pool.get_page(&self.page_id(page_number))?;
            let mut buf = *bytes;
            let page = HeapPage::new(&self.schema, &mut buf);
            let slot = page.begin();
            if slot != page.end() {
                return Ok(Cursor { page_number, slot });
            }
        }
        self.end(pool)
    }

    pub fn end(&self, pool: &BufferPool) -> Result<Cursor> {
        Ok(Cursor {
            page_number: self.num_pages(pool)? as u32,
            slot: 0,
        })
    }

    pub fn next(&self, pool: &mut BufferPool, cursor: Cursor) -> Result<Cursor> {
        let num_pages = self.num_pages(pool)?;
        {
            let bytes = pool.get_page(&self.page_id(cursor.page_number))?;
            let mut buf = *bytes;
            let page = HeapPage::new(&self.schema, &mut buf);
            let mut slot = cursor.slot;
            page.advance(&mut slot);
            if slot != page.end() {
                return Ok(Cursor { page_number: cursor.page_number, slot });
            }
        }
        let mut page_number = cursor.page_number + 1;
        while (page_number as usize) < num_pages {
            let bytes = pool.get_page(&self.page_id(page_number))?;
            let mut buf = *bytes;
            let page = HeapPage::new(&self.schema, &mut buf);
            let first = page.begin();
            if first != page.end() {
                return Ok(Cursor { page_number, slot: first });
            }
            page_number += 1;
        }
        self.end(pool)
    }

    pub fn get(&self, pool: &mut BufferPool, cursor: Cursor) -> Result<Tuple> {
        let bytes = pool.get_page(&self.page_id(cursor.page_number))?;
        let mut buf = *bytes;
        let page = HeapPage::new(&self.schema, &mut buf);
        page.get(cursor.slot)
    }

    /// Inserts into the last page if it has room, else appends a new page.
    pub fn insert(&self, pool: &mut BufferPool, tuple: &Tuple) -> Result<Cursor> {
        let num_pages = self.num_pages(pool)?;
        if num_pages > 0 {
            let last = num_pages as u32 - 1;
            let id = self.page_id(last);
            let bytes = pool.get_page_mut(&id)?;
            let mut page = HeapPage::new(&self.schema, bytes);
            let free_slot_before = (0..page.capacity()).find(|&s| !page.is_occupied(s));
            if let Some(slot) = free_slot_before {
                if page.insert(tuple)? {
                    return Ok(Cursor { page_number: last, slot });
                }
            }
        }
        let id = pool.allocate_page(&self.name)?;
        let bytes = pool.get_page_mut(&id)?;
        let mut page = HeapPage::new(&self.schema, bytes);
        if !page.insert(tuple)? {
            return Err(Error::Corrupt("freshly allocated heap page reports full".into()));
        }
        Ok(Cursor { page_number: id.page_number, slot: 0 })
    }

    pub fn delete(&self, pool: &mut BufferPool, cursor: Cursor) -> Result<()> {
        let id = self.page_id(cursor.page_number);
        let bytes = pool.get_page_mut(&id)?;
        let mut page = HeapPage::new(&self.schema, bytes);
        page.delete(cursor.slot)
    }
}

//! A uniform file-capability handle over either storage layout.
//!
//! The two storage engines (`HeapFile`, `BTreeFile`) share an open/insert/
//! scan/delete shape but differ in cursor type and indexing guarantees; this
//! enum lets callers (the relational operators, tests) hold either kind
//! behind one name the way `small-db`'s `DbFile` trait unifies its own
//! storage kinds, without forcing a single cursor representation on both.

use std::sync::Arc;

use crate::btree_file::BTreeFile;
use crate::buffer_pool::BufferPool;
use crate::error::Result;
use crate::heap_file::HeapFile;
use crate::tuple::{Tuple, TupleDesc};

pub enum TableFile {
    Heap(HeapFile),
    BTree(BTreeFile),
}

impl TableFile {
    pub fn heap(name: Arc<str>, schema: TupleDesc) -> Self {
        TableFile::Heap(HeapFile::new(name, schema))
    }

    pub fn btree(name: Arc<str>, schema: TupleDesc, key_field: usize) -> Self {
        TableFile::BTree(BTreeFile::new(name, schema, key_field))
    }

    pub fn schema(&self) -> &TupleDesc {
        match self {
            TableFile::Heap(f) => f.schema(),
            TableFile::BTree(f) => f.schema(),
        }
    }

    pub fn open<P: AsRef<std::path::Path>>(&self, pool: &mut BufferPool, path: P) -> Result<()> {
        match self {
            TableFile::Heap(f) => f.open(pool, path),
            TableFile::BTree(f) => f.open(pool, path),
        }
    }

    pub fn insert(&self, pool: &mut BufferPool, tuple: &Tuple) -> Result<()> {
        match self {
            TableFile::Heap(f) => f.insert(pool, tuple).map(|_| ()),
            TableFile::BTree(f) => f.insert(pool, tuple),
        }
    }

    /// Collects every live tuple into memory, in the storage's natural scan
    /// order (insertion order for heap files, ascending key order for
    /// B+-trees).
    pub fn scan_all(&self, pool: &mut BufferPool) -> Result<Vec<Tuple>> {
        let mut out = Vec::new();
        match self {
            TableFile::Heap(f) => {
                let mut cursor = f.begin(pool)?;
                let end = f.end(pool)?;
                while cursor != end {
                    out.push(f.get(pool, cursor)?);
                    cursor = f.next(pool, cursor)?;
                }
            }
            TableFile::BTree(f) => {
                let mut cursor = f.begin(pool)?;
                while cursor != f.end() {
                    out.push(f.get(pool, cursor)?);
                    cursor = f.next(pool, cursor)?;
                }
            }
        }
        Ok(out)
    }
}

//! B+-tree table storage: page 0 is permanently the root index page, with a
//! mix of further index and leaf pages reachable from it.
//!
//! Grounded on the original `BTreeFile.cpp` (`insertTuple`'s split-and-
//! propagate-upward loop, `splitLeafPage`/`updateParentIndexPage`, `next`/
//! `begin`/`end` via the leaf chain, and its treatment of the root page as a
//! literal `IndexPage` with no indirection layer) and on `small-db`'s
//! `src/btree/table/{insert,table,table_iter}.rs` for the split-on-full /
//! grow-a-new-root shape, adapted onto owned local page buffers (rather
//! than the teacher's long-lived page references) so a single `insert` can
//! freely hold more than one page at a time without fighting the borrow
//! checker. Root growth cannot reassign "which page is the root" the way a
//! pointer-indirected design would, so growing the root instead relocates
//! its current (full) contents to a freshly allocated page, splits that
//! page, and reinitializes page 0 in place as a new two-child root.
//!
//! Deletion is intentionally unimplemented: merging/borrowing across
//! siblings on underflow is unspecified here, so `delete` always returns
//! `Error::Unsupported`.

use std::sync::Arc;

use crate::buffer_pool::BufferPool;
use crate::error::{Error, Result};
use crate::page::{IndexPage, LeafPage, PageId, PAGE_SIZE};
use crate::tuple::{Tuple, TupleDesc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub leaf: u32,
    pub slot: usize,
}

/// Page 0 is always the root index page, for the tree's entire life.
const ROOT_PAGE: u32 = 0;
/// Sentinel end-of-scan cursor. Page 0 is always an index page, so no leaf
/// ever has this page number, making the sentinel unambiguous.
const END_CURSOR: Cursor = Cursor { leaf: ROOT_PAGE, slot: usize::MAX };

pub struct BTreeFile {
    name: Arc<str>,
    schema: TupleDesc,
    key_field: usize,
}

impl BTreeFile {
    pub fn new(name: Arc<str>, schema: TupleDesc, key_field: usize) -> Self {
        BTreeFile { name, schema, key_field }
    }

    pub fn schema(&self) -> &TupleDesc {
        &self.schema
    }

    fn page_id(&self, page_number: u32) -> PageId {
        PageId::new(self.name.clone(), page_number)
    }

    /// Opens (creating if needed) the backing file and, if it is brand new,
    /// lays out page 0 as a one-child root index page pointing at a single
    /// empty leaf.
    pub fn open<P: AsRef<std::path::Path>>(&self, pool: &mut BufferPool, path: P) -> Result<()> {
        pool.open_file(self.name.clone(), path)?;
        if pool.num_pages(&self.name)? == 0 {
            let root_id = pool.allocate_page(&self.name)?;
            debug_assert_eq!(root_id.page_number, ROOT_PAGE);
            let leaf_id = pool.allocate_page(&self.name)?;
            {
                let bytes = pool.get_page_mut(&leaf_id)?;
                LeafPage::init(&self.schema, self.key_field, bytes);
            }
            {
                let bytes = pool.get_page_mut(&root_id)?;
                let mut root_page = IndexPage::init(bytes, false);
                root_page.set_first_child(leaf_id.page_number);
            }
        }
        Ok(())
    }

    /// Walks from the root to the leaf that would hold `key`, returning the
    /// chain of index pages visited (root first) and the leaf's page number.
    fn descend(&self, pool: &mut BufferPool, key: i32) -> Result<(Vec<u32>, u32)> {
        let mut current = ROOT_PAGE;
        let mut is_index = true;
        let mut ancestors = Vec::new();
        while is_index {
            ancestors.push(current);
            let mut buf = *pool.get_page(&self.page_id(current))?;
            let index_page = IndexPage::new(&mut buf);
            let child = index_page.find_child(key);
            is_index = index_page.index_children();
            current = child;
        }
        Ok((ancestors, current))
    }

    /// Walks from the root always taking the first child, to find the
    /// leftmost leaf.
    fn leftmost_leaf(&self, pool: &mut BufferPool) -> Result<u32> {
        let mut current = ROOT_PAGE;
        let mut is_index = true;
        while is_index {
            let mut buf = *pool.get_page(&self.page_id(current))?;
            let index_page = IndexPage::new(&mut buf);
            is_index = index_page.index_children();
            current = index_page.child_at(0);
        }
        Ok(current)
    }

    pub fn search(&self, pool: &mut BufferPool, key: i32) -> Result<Tuple> {
        let (_, leaf_num) = self.descend(pool, key)?;
        let buf = *pool.get_page(&self.page_id(leaf_num))?;
        let mut local = buf;
        let leaf_page = LeafPage::new(&self.schema, self.key_field, &mut local);
        let size = leaf_page.size();
        for slot in 0..size {
            if leaf_page.key_at(slot)? == key {
                return leaf_page.get(slot);
            }
        }
        Err(Error::NotFound(format!("key {} not found", key)))
    }

    pub fn insert(&self, pool: &mut BufferPool, tuple: &Tuple) -> Result<()> {
        let key = tuple
            .field(self.key_field)
            .as_int()
            .ok_or_else(|| Error::TypeMismatch("key field must be Int".into()))?;
        let (ancestors, leaf_num) = self.descend(pool, key)?;

        let mut leaf_buf = *pool.get_page(&self.page_id(leaf_num))?;
        let full = {
            let mut leaf_page = LeafPage::new(&self.schema, self.key_field, &mut leaf_buf);
            leaf_page.insert(tuple)?
        };
        if !full {
            pool.get_page_mut(&self.page_id(leaf_num))?.copy_from_slice(&leaf_buf);
            return Ok(());
        }

        let mut new_leaf_buf = [0u8; PAGE_SIZE];
        let promoted_tuple = {
            let mut leaf_page = LeafPage::new(&self.schema, self.key_field, &mut leaf_buf);
            let mut new_leaf_page = LeafPage::new(&self.schema, self.key_field, &mut new_leaf_buf);
            let promoted = leaf_page.split(&mut new_leaf_page);
            promoted
        };
        let new_leaf_id = pool.allocate_page(&self.name)?;
        {
            let mut leaf_page = LeafPage::new(&self.schema, self.key_field, &mut leaf_buf);
            leaf_page.set_next_leaf(Some(new_leaf_id.page_number));
        }
        pool.get_page_mut(&self.page_id(leaf_num))?.copy_from_slice(&leaf_buf);
        pool.get_page_mut(&new_leaf_id)?.copy_from_slice(&new_leaf_buf);

        let mut promote_key = promoted_tuple
            .field(self.key_field)
            .as_int()
            .expect("key field must be Int");
        let mut new_child = new_leaf_id.page_number;

        // `ancestors` always has page 0 (the permanent root) as its first
        // entry, so this loop's last iteration is always the root; it
        // either returns on a non-full insert or grows the root below, so
        // it always returns before falling off the end.
        for &anc_num in ancestors.iter().rev() {
            let mut anc_buf = *pool.get_page(&self.page_id(anc_num))?;
            let full = {
                let mut anc_page = IndexPage::new(&mut anc_buf);
                anc_page.insert(promote_key, new_child)?
            };
            if !full {
                pool.get_page_mut(&self.page_id(anc_num))?.copy_from_slice(&anc_buf);
                return Ok(());
            }

            let index_children = IndexPage::new(&mut anc_buf).index_children();

            if anc_num == ROOT_PAGE {
                // Page 0 must stay the root, so its current (full) contents
                // move to a new page, that page splits, and page 0 is
                // reinitialized in place as a fresh two-child root over the
                // two halves.
                let relocated_id = pool.allocate_page(&self.name)?;
                pool.get_page_mut(&relocated_id)?.copy_from_slice(&anc_buf);

                let mut new_anc_buf = [0u8; PAGE_SIZE];
                let new_promote_key = {
                    let relocated_bytes = pool.get_page_mut(&relocated_id)?;
                    let mut relocated_page = IndexPage::new(relocated_bytes);
                    let mut new_anc_page = IndexPage::new(&mut new_anc_buf);
                    relocated_page.split(&mut new_anc_page, index_children)
                };
                let new_anc_id = pool.allocate_page(&self.name)?;
                pool.get_page_mut(&new_anc_id)?.copy_from_slice(&new_anc_buf);

                let root_bytes = pool.get_page_mut(&self.page_id(ROOT_PAGE))?;
                let mut root_page = IndexPage::init(root_bytes, true);
                root_page.set_first_child(relocated_id.page_number);
                root_page.insert(new_promote_key, new_anc_id.page_number)?;
                return Ok(());
            }

            let mut new_anc_buf = [0u8; PAGE_SIZE];
            let new_promote_key = {
                let mut anc_page = IndexPage::new(&mut anc_buf);
                let mut new_anc_page = IndexPage::new(&mut new_anc_buf);
                anc_page.split(&mut new_anc_page, index_children)
            };
            let new_anc_id = pool.allocate_page(&self.name)?;
            pool.get_page_mut(&self.page_id(anc_num))?.copy_from_slice(&anc_buf);
            pool.get_page_mut(&new_anc_id)?.copy_from_slice(&new_anc_buf);

            promote_key = new_promote_key;
            new_child = new_anc_id.page_number;
        }

        unreachable!("ancestors always contains the root page, whose branch above always returns")
    }

    pub fn delete(&self, _pool: &mut BufferPool, _key: i32) -> Result<()> {
        Err(Error::Unsupported("B+-tree deletion is not implemented".into()))
    }

    pub fn begin(&self, pool: &mut BufferPool) -> Result<Cursor> {
        let mut leaf_num = self.leftmost_leaf(pool)?;
        loop {
            let buf = *pool.get_page(&self.page_id(leaf_num))?;
            let mut local = buf;
            let leaf_page = LeafPage::new(&self.schema, self.key_field, &mut local);
            if leaf_page.size() > 0 {
                return Ok(Cursor { leaf: leaf_num, slot: 0 });
            }
            match leaf_page.next_leaf() {
                Some(next) => leaf_num = next,
                None => return Ok(END_CURSOR),
            }
        }
    }

    pub fn end(&self) -> Cursor {
        END_CURSOR
    }

    pub fn next(&self, pool: &mut BufferPool, cursor: Cursor) -> Result<Cursor> {
        if cursor == END_CURSOR {
            return Ok(END_CURSOR);
        }
        let buf = *pool.get_page(&self.page_id(cursor.leaf))?;
        let mut local = buf;
        let leaf_page = LeafPage::new(&self.schema, self.key_field, &mut local);
        if cursor.slot + 1 < leaf_page.size() {
            return Ok(Cursor { leaf: cursor.leaf, slot: cursor.slot + 1 });
        }
        let mut next_leaf = leaf_page.next_leaf();
        while let Some(candidate) = next_leaf {
            let buf = *pool.get_page(&self.page_id(candidate))?;
            let mut local = buf;
            let candidate_page = LeafPage::new(&self.schema, self.key_field, &mut local);
            if candidate_page.size() > 0 {
                return Ok(Cursor { leaf: candidate, slot: 0 });
            }
            next_leaf = candidate_page.next_leaf();
        }
        Ok(END_CURSOR)
    }

    pub fn get(&self, pool: &mut BufferPool, cursor: Cursor) -> Result<Tuple> {
        let buf = *pool.get_page(&self.page_id(cursor.leaf))?;
        let mut local = buf;
        let leaf_page = LeafPage::new(&self.schema, self.key_field, &mut local);
        leaf_page.get(cursor.slot)
    }
}

//! B+-tree leaf page: tuples in ascending key order, linked to the next
//! leaf in the chain.
//!
//! Grounded on `small-db`'s `src/btree/page/leaf_page.rs`
//! (`BTreeLeafPage::insert_tuple`, `split`, `right_sibling_id`), and on the
//! original `LeafPage.cpp::insertTuple`/`split`, which this mirrors closely:
//! a leaf split copies (not removes) the middle tuple's key into the parent,
//! since the tuple itself must still live somewhere.
//!
//! Header layout (13 bytes): `size: u32` (LE), `has_next: u8` (0/1),
//! `next_leaf: u64` (LE, page number, meaningless when `has_next` is 0).
//! Followed by `L` fixed-width tuple slots packed contiguously in key order
//! (no bitmap: a leaf page is always dense from index 0).

use crate::error::{Error, Result};
use crate::tuple::{Tuple, TupleDesc};

use super::PAGE_SIZE;

const HEADER_LEN: usize = 13;

pub struct LeafPage<'b> {
    schema: &'b TupleDesc,
    key_field: usize,
    bytes: &'b mut [u8],
    capacity: usize,
}

impl<'b> LeafPage<'b> {
    /// `L = floor((PAGE_SIZE - header) / tuple_len)`.
    pub fn capacity_for(schema: &TupleDesc) -> usize {
        (PAGE_SIZE - HEADER_LEN) / schema.length()
    }

    pub fn new(schema: &'b TupleDesc, key_field: usize, bytes: &'b mut [u8]) -> Self {
        assert_eq!(bytes.len(), PAGE_SIZE);
        let capacity = Self::capacity_for(schema);
        LeafPage {
            schema,
            key_field,
            bytes,
            capacity,
        }
    }

    pub fn init(schema: &'b TupleDesc, key_field: usize, bytes: &'b mut [u8]) -> Self {
        let mut page = Self::new(schema, key_field, bytes);
        page.set_size(0);
        page.set_has_next(false);
        page
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn size(&self) -> usize {
        u32::from_le_bytes(self.bytes[0..4].try_into().unwrap()) as usize
    }

    fn set_size(&mut self, size: usize) {
        self.bytes[0..4].copy_from_slice(&(size as u32).to_le_bytes());
    }

    pub fn has_next(&self) -> bool {
        self.bytes[4] != 0
    }

    fn set_has_next(&mut self, v: bool) {
        self.bytes[4] = v as u8;
    }

    pub fn next_leaf(&self) -> Option<u32> {
        if self.has_next() {
            Some(u64::from_le_bytes(self.bytes[5..13].try_into().unwrap()) as u32)
        } else {
            None
        }
    }

    pub fn set_next_leaf(&mut self, next: Option<u32>) {
        match next {
            Some(p) => {
                self.set_has_next(true);
                self.bytes[5..13].copy_from_slice(&(p as u64).to_le_bytes());
            }
            None => self.set_has_next(false),
        }
    }

    fn slot_offset(&self, slot: usize) -> usize {
        HEADER_LEN + slot * self.schema.length()
    }

    fn key_of(&self, tuple: &Tuple) -> i32 {
        tuple.field(self.key_field).as_int().expect("key field must be Int")
    }

    pub fn get(&self, slot: usize) -> Result<Tuple> {
        if slot >= self.size() {
            return Err(Error::OutOfRange(format!("slot {} out of range [0, {})", slot, self.size())));
        }
        let offset = self.slot_offset(slot);
        let len = self.schema.length();
        self.schema.decode(&self.bytes[offset..offset + len])
    }

    pub fn key_at(&self, slot: usize) -> Result<i32> {
        Ok(self.key_of(&self.get(slot)?))
    }

    /// Position of the first slot whose key is `>= key`, or `size()` if none.
    fn lower_bound(&self, key: i32) -> usize {
        let size = self.size();
        for i in 0..size {
            if self.key_at(i).unwrap() >= key {
                return i;
            }
        }
        size
    }

    /// Inserts `tuple` in key order. If a tuple with the same key already
    /// exists, it is overwritten in place (upsert). Returns `true` iff the
    /// page is now full (`size == capacity`) and the caller must split it.
    pub fn insert(&mut self, tuple: &Tuple) -> Result<bool> {
        let key = self.key_of(tuple);
        let pos = self.lower_bound(key);
        let size = self.size();

        if pos < size && self.key_at(pos)? == key {
            let bytes = self.schema.encode(tuple)?;
            let offset = self.slot_offset(pos);
            self.bytes[offset..offset + bytes.len()].copy_from_slice(&bytes);
            return Ok(false);
        }

        if size == self.capacity {
            return Err(Error::InvalidArgument("leaf page is full".into()));
        }

        let tuple_len = self.schema.length();
        for i in (pos..size).rev() {
            let src = self.slot_offset(i);
            let dst = self.slot_offset(i + 1);
            self.bytes.copy_within(src..src + tuple_len, dst);
        }
        let bytes = self.schema.encode(tuple)?;
        let offset = self.slot_offset(pos);
        self.bytes[offset..offset + bytes.len()].copy_from_slice(&bytes);
        self.set_size(size + 1);
        Ok(self.size() == self.capacity)
    }

    /// Removes the tuple with the given key, if present.
    pub fn delete(&mut self, key: i32) -> Result<()> {
        let pos = self.lower_bound(key);
        let size = self.size();
        if pos >= size || self.key_at(pos)? != key {
            return Err(Error::NotFound(format!("key {} not found in leaf", key)));
        }
        let tuple_len = self.schema.length();
        for i in pos..size - 1 {
            let src = self.slot_offset(i + 1);
            let dst = self.slot_offset(i);
            self.bytes.copy_within(src..src + tuple_len, dst);
        }
        self.set_size(size - 1);
        Ok(())
    }

    /// Moves the upper half of tuples into `new`, links `new` after `self`
    /// in the sibling chain, and returns the first tuple now in `new`
    /// (still present in full in the right leaf — only its key is promoted
    /// to the parent).
    pub fn split(&mut self, new: &mut LeafPage) -> Tuple {
        let size = self.size();
        let mid = size / 2;
        let right_size = size - mid;
        let tuple_len = self.schema.length();

        for i in 0..right_size {
            let src = self.slot_offset(mid + i);
            let dst = new.slot_offset(i);
            new.bytes[dst..dst + tuple_len].copy_from_slice(&self.bytes[src..src + tuple_len]);
        }
        new.set_size(right_size);
        new.set_next_leaf(self.next_leaf());

        self.set_size(mid);

        new.get(0).unwrap()
    }

    #[cfg(test)]
    fn keys(&self) -> Vec<i32> {
        (0..self.size()).map(|i| self.key_at(i).unwrap()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field, Type};

    fn schema() -> TupleDesc {
        TupleDesc::new(vec![Type::Int, Type::Int], vec!["id", "value"]).unwrap()
    }

    fn row(id: i32, value: i32) -> Tuple {
        Tuple::new(vec![Field::Int(id), Field::Int(value)])
    }

    #[test]
    fn insert_keeps_ascending_key_order() {
        let schema = schema();
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page = LeafPage::init(&schema, 0, &mut buf);
        page.insert(&row(5, 50)).unwrap();
        page.insert(&row(1, 10)).unwrap();
        page.insert(&row(3, 30)).unwrap();
        assert_eq!(page.keys(), vec![1, 3, 5]);
    }

    #[test]
    fn insert_duplicate_key_upserts() {
        let schema = schema();
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page = LeafPage::init(&schema, 0, &mut buf);
        page.insert(&row(1, 10)).unwrap();
        page.insert(&row(1, 99)).unwrap();
        assert_eq!(page.keys(), vec![1]);
        assert_eq!(page.get(0).unwrap().field(1).as_int(), Some(99));
    }

    #[test]
    fn delete_removes_key_and_shifts() {
        let schema = schema();
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page = LeafPage::init(&schema, 0, &mut buf);
        for k in [1, 2, 3] {
            page.insert(&row(k, k * 10)).unwrap();
        }
        page.delete(2).unwrap();
        assert_eq!(page.keys(), vec![1, 3]);
        assert!(matches!(page.delete(2), Err(Error::NotFound(_))));
    }

    #[test]
    fn split_copies_middle_key_into_right_leaf_and_links_siblings() {
        let schema = schema();
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page = LeafPage::init(&schema, 0, &mut buf);
        let capacity = page.capacity();
        for k in 0..capacity as i32 {
            page.insert(&row(k, k)).unwrap();
        }

        let mut new_buf = vec![0u8; PAGE_SIZE];
        let mut new_page = LeafPage::new(&schema, 0, &mut new_buf);
        let promoted = page.split(&mut new_page);

        let mid = capacity / 2;
        assert_eq!(page.keys(), (0..mid as i32).collect::<Vec<_>>());
        assert_eq!(new_page.keys(), (mid as i32..capacity as i32).collect::<Vec<_>>());
        // the promoted key's tuple is still fully present in the right leaf.
        assert_eq!(promoted.field(0).as_int(), Some(mid as i32));
        assert_eq!(new_page.get(0).unwrap(), promoted);
    }
}

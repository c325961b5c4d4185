//! Slotted heap page: a bitmap header followed by fixed-width row slots.
//!
//! Grounded on `small-db`'s `src/page.rs` (`HeapPage::get_rows_count`,
//! `get_header_size`, `is_slot_used`), generalized from int-only tuples to
//! the full codec and given real `insert`/`delete` mutation (the teacher's
//! version is read-only).

use crate::error::{Error, Result};
use crate::tuple::{Tuple, TupleDesc};

use super::PAGE_SIZE;

/// A view over one page-sized byte buffer, interpreted as a heap page.
///
/// Byte layout: bytes `[0, header_len)` are a bitmap, MSB-first within each
/// byte (bit `7 - (slot % 8)` of byte `slot / 8`). Bytes
/// `[PAGE_SIZE - capacity*tuple_len, PAGE_SIZE)` hold `capacity` fixed-width
/// tuple slots, slot `s` at `PAGE_SIZE - capacity*tuple_len + s*tuple_len`.
pub struct HeapPage<'b> {
    schema: &'b TupleDesc,
    bytes: &'b mut [u8],
    capacity: usize,
    header_len: usize,
}

impl<'b> HeapPage<'b> {
    /// Capacity `C = floor(8*PAGE_SIZE / (8*tuple_len + 1))`.
    pub fn capacity_for(schema: &TupleDesc) -> usize {
        let tuple_len = schema.length();
        (8 * PAGE_SIZE) / (8 * tuple_len + 1)
    }

    fn header_len_for(capacity: usize) -> usize {
        (capacity + 7) / 8
    }

    pub fn new(schema: &'b TupleDesc, bytes: &'b mut [u8]) -> Self {
        assert_eq!(bytes.len(), PAGE_SIZE);
        let capacity = Self::capacity_for(schema);
        let header_len = Self::header_len_for(capacity);
        HeapPage {
            schema,
            bytes,
            capacity,
            header_len,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Size in bytes of the occupancy bitmap at the front of the page.
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    fn slot_offset(&self, slot: usize) -> usize {
        let tuple_len = self.schema.length();
        PAGE_SIZE - self.capacity * tuple_len + slot * tuple_len
    }

    fn check_slot(&self, slot: usize) -> Result<()> {
        if slot >= self.capacity {
            return Err(Error::OutOfRange(format!(
                "slot {} out of range [0, {})",
                slot, self.capacity
            )));
        }
        Ok(())
    }

    pub fn is_occupied(&self, slot: usize) -> bool {
        if slot >= self.capacity {
            return false;
        }
        let byte = self.bytes[slot / 8];
        (byte & (1 << (7 - (slot % 8)))) != 0
    }

    fn set_occupied(&mut self, slot: usize, occupied: bool) {
        let mask = 1 << (7 - (slot % 8));
        if occupied {
            self.bytes[slot / 8] |= mask;
        } else {
            self.bytes[slot / 8] &= !mask;
        }
    }

    /// Smallest occupied slot, or `capacity()` if the page is empty.
    pub fn begin(&self) -> usize {
        (0..self.capacity).find(|&s| self.is_occupied(s)).unwrap_or(self.capacity)
    }

    /// Always `capacity()`: the one-past-the-end sentinel slot.
    pub fn end(&self) -> usize {
        self.capacity
    }

    /// Advances `slot` to the next occupied slot, or `end()` if none remain.
    pub fn advance(&self, slot: &mut usize) {
        let mut s = *slot + 1;
        while s < self.capacity && !self.is_occupied(s) {
            s += 1;
        }
        *slot = s.min(self.capacity);
    }

    /// Inserts into the lowest-index empty slot. Returns `false` if the page
    /// is full.
    pub fn insert(&mut self, tuple: &Tuple) -> Result<bool> {
        let free_slot = (0..self.capacity).find(|&s| !self.is_occupied(s));
        let slot = match free_slot {
            Some(s) => s,
            None => return Ok(false),
        };
        let bytes = self.schema.encode(tuple)?;
        let offset = self.slot_offset(slot);
        self.bytes[offset..offset + bytes.len()].copy_from_slice(&bytes);
        self.set_occupied(slot, true);
        Ok(true)
    }

    /// Clears the slot's occupancy bit. Payload bytes are left untouched.
    pub fn delete(&mut self, slot: usize) -> Result<()> {
        self.check_slot(slot)?;
        if !self.is_occupied(slot) {
            return Err(Error::InvalidArgument(format!("slot {} is already empty", slot)));
        }
        self.set_occupied(slot, false);
        Ok(())
    }

    pub fn get(&self, slot: usize) -> Result<Tuple> {
        self.check_slot(slot)?;
        if !self.is_occupied(slot) {
            return Err(Error::InvalidArgument(format!("slot {} is empty", slot)));
        }
        let offset = self.slot_offset(slot);
        let tuple_len = self.schema.length();
        self.schema.decode(&self.bytes[offset..offset + tuple_len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field, Type};

    fn schema() -> TupleDesc {
        TupleDesc::new(vec![Type::Int], vec!["id"]).unwrap()
    }

    #[test]
    fn capacity_matches_spec_example() {
        // length = 80 => C = floor(32768 / 641) = 51. The spec's worked
        // example uses a different schema; here we check the formula on
        // our own schema and cross-check the documented example directly.
        let wide = TupleDesc::new(
            vec![Type::Int; 20],
            (0..20).map(|i| format!("f{}", i)).collect::<Vec<_>>(),
        )
        .unwrap();
        assert_eq!(wide.length(), 80);
        assert_eq!(HeapPage::capacity_for(&wide), (8 * 4096) / (8 * 80 + 1));
    }

    #[test]
    fn insert_get_delete_roundtrip() {
        let schema = schema();
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page = HeapPage::new(&schema, &mut buf);
        assert_eq!(page.begin(), page.end());

        for v in 0..5 {
            assert!(page.insert(&Tuple::new(vec![Field::Int(v)])).unwrap());
        }

        let mut slot = page.begin();
        let mut seen = Vec::new();
        while slot != page.end() {
            seen.push(page.get(slot).unwrap().field(0).as_int().unwrap());
            page.advance(&mut slot);
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);

        // delete the middle one and rescan
        let target_slot = (0..page.capacity())
            .find(|&s| page.is_occupied(s) && page.get(s).unwrap().field(0).as_int() == Some(2))
            .unwrap();
        page.delete(target_slot).unwrap();

        let mut slot = page.begin();
        let mut seen = Vec::new();
        while slot != page.end() {
            seen.push(page.get(slot).unwrap().field(0).as_int().unwrap());
            page.advance(&mut slot);
        }
        assert_eq!(seen, vec![0, 1, 3, 4]);
    }

    #[test]
    fn full_page_insert_returns_false() {
        let schema = schema();
        let mut buf = vec![0u8; PAGE_SIZE];
        let mut page = HeapPage::new(&schema, &mut buf);
        let capacity = page.capacity();
        for v in 0..capacity as i32 {
            assert!(page.insert(&Tuple::new(vec![Field::Int(v)])).unwrap());
        }
        assert!(!page.insert(&Tuple::new(vec![Field::Int(0)])).unwrap());
    }

    #[test]
    fn out_of_range_slot_is_an_error() {
        let schema = schema();
        let mut buf = vec![0u8; PAGE_SIZE];
        let page = HeapPage::new(&schema, &mut buf);
        assert!(matches!(page.get(page.capacity() + 1), Err(Error::OutOfRange(_))));
    }
}

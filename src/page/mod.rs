//! Page-layer types: a byte-addressed page identity plus the three page
//! kinds this engine understands (heap, B+-tree index, B+-tree leaf).
//!
//! Grounded on `small-db`'s `src/page_id.rs` / `src/btree/page/page_id.rs`
//! (page identity) and `src/page.rs` / `src/btree/page/{internal,leaf}_page.rs`
//! (slotted layout), simplified to the single-tenant, no-transaction model
//! this spec describes: no parent pointers, no pin counts, no page category
//! tag on the id (heap vs. index vs. leaf is known from which file owns it).

mod heap;
mod index;
mod leaf;
mod page_id;

pub use heap::HeapPage;
pub use index::IndexPage;
pub use leaf::LeafPage;
pub use page_id::PageId;

/// Fixed page size in bytes, per the file format (`§3`, `§6`).
pub const PAGE_SIZE: usize = 4096;

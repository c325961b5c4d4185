use std::fmt;
use std::sync::Arc;

/// Identifies a page within a specific backing file.
///
/// `file` is an `Arc<str>` rather than an owned `String` so that cheaply
/// cloning a `PageId` (buffer-pool keys are cloned constantly) does not
/// reallocate the file name on every lookup.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PageId {
    pub file: Arc<str>,
    pub page_number: u32,
}

impl PageId {
    pub fn new(file: Arc<str>, page_number: u32) -> Self {
        PageId { file, page_number }
    }
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.page_number)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

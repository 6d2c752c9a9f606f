//! Zerocopy structs mapped directly over the index block.

use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::{ALPHABET_LEN, BLOCK_HEADER_SIZE, BUCKET_CAPACITY, TRIE_PAGE_SIZE};

/// Maps a symbol of the index alphabet (`a-z`, `A-Z`, `0-9`) to its
/// child-pointer slot. Any other byte is not indexable.
pub fn alphabet_index(b: u8) -> Option<usize> {
    match b {
        b'a'..=b'z' => Some((b - b'a') as usize),
        b'A'..=b'Z' => Some((b - b'A') as usize + 26),
        b'0'..=b'9' => Some((b - b'0') as usize + 52),
        _ => None,
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct BlockHeader {
    free_cursor: U32,
    reserved: [u8; 4],
}

const _: () = assert!(std::mem::size_of::<BlockHeader>() == BLOCK_HEADER_SIZE);

impl BlockHeader {
    /// Most recently allocated page number; 0 when only the root exists.
    pub fn free_cursor(&self) -> u32 {
        self.free_cursor.get()
    }

    pub fn set_free_cursor(&mut self, page_no: u32) {
        self.free_cursor = U32::new(page_no);
    }
}

/// One trie node at a fixed offset inside the block. A page represents the
/// path of symbols leading to it; its bucket collects the record numbers of
/// rows whose indexed value starts with that path.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct TriePage {
    symbol: u8,
    data_ptrs: [U32; BUCKET_CAPACITY],
    child_ptrs: [U32; ALPHABET_LEN],
    next_ptr: U32,
}

const _: () = assert!(std::mem::size_of::<TriePage>() == TRIE_PAGE_SIZE);

impl TriePage {
    /// The symbol this page extends the path with (0 on the root).
    pub fn symbol(&self) -> u8 {
        self.symbol
    }

    pub(crate) fn set_symbol(&mut self, b: u8) {
        self.symbol = b;
    }

    /// Child page number for alphabet slot `idx`, 0 meaning absent.
    pub fn child(&self, idx: usize) -> u32 {
        self.child_ptrs[idx].get()
    }

    pub(crate) fn set_child(&mut self, idx: usize, page_no: u32) {
        self.child_ptrs[idx] = U32::new(page_no);
    }

    /// Sibling page number, 0 meaning none. Reserved by the on-disk
    /// format; the walk never follows it.
    pub fn next(&self) -> u32 {
        self.next_ptr.get()
    }

    /// Record numbers in this page's bucket, in slot order.
    pub fn pks(&self) -> impl Iterator<Item = u64> + '_ {
        self.data_ptrs
            .iter()
            .filter(|slot| slot.get() != 0)
            .map(|slot| (slot.get() - 1) as u64)
    }

    /// Records a biased pk (`pk + 1`) in the bucket. Already-present
    /// entries are not duplicated. When the bucket is full the last slot
    /// is overwritten, which is the legacy overflow behavior.
    pub(crate) fn push_slot(&mut self, slot: u32) {
        if self.data_ptrs.iter().any(|s| s.get() == slot) {
            return;
        }
        match self.data_ptrs.iter().position(|s| s.get() == 0) {
            Some(empty) => self.data_ptrs[empty] = U32::new(slot),
            None => self.data_ptrs[BUCKET_CAPACITY - 1] = U32::new(slot),
        }
    }
}

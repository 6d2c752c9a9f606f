//! The trie index proper: block lifecycle, prefix lookup, insertion.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use eyre::{bail, ensure, Result, WrapErr};
use memmap2::MmapMut;
use parking_lot::RwLock;
use smallvec::SmallVec;
use zerocopy::FromBytes;

use super::page::{alphabet_index, BlockHeader, TriePage};
use super::{
    BLOCK_HEADER_SIZE, BLOCK_SIZE, BUCKET_CAPACITY, DEFAULT_MAX_DEPTH, NO_PAGE, PAGE_COUNT,
    ROOT_PAGE, TRIE_PAGE_SIZE,
};
use crate::error::StoreError;

/// Record numbers returned by a lookup. A bucket never exceeds
/// [`BUCKET_CAPACITY`] entries, so the result lives on the stack.
pub type PkSet = SmallVec<[u64; BUCKET_CAPACITY]>;

/// Handle to one field's prefix index.
///
/// The mapped block sits behind `Arc<RwLock<..>>`: lookups take the read
/// lock, insertions the write lock, and clones of the handle share the
/// mapping. All handles for one field must be clones of each other;
/// opening the same file twice creates two mappings with no ordering
/// between their views.
#[derive(Clone, Debug)]
pub struct TrieIndex {
    block: Arc<RwLock<IndexBlock>>,
    max_depth: usize,
}

impl TrieIndex {
    /// Creates the block file: [`BLOCK_SIZE`] zero bytes, written and
    /// synced before anything maps it.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .wrap_err_with(|| format!("failed to create index block '{}'", path.display()))?;

        file.write_all(&vec![0u8; BLOCK_SIZE])
            .wrap_err_with(|| format!("failed to zero index block '{}'", path.display()))?;
        file.sync_all()
            .wrap_err_with(|| format!("failed to sync index block '{}'", path.display()))?;

        Ok(())
    }

    /// Maps an existing block file with the default walk depth. A missing
    /// or mis-sized file is a configuration error: indexes are created
    /// explicitly, never on first use.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_depth(path, DEFAULT_MAX_DEPTH)
    }

    pub fn open_with_depth<P: AsRef<Path>>(path: P, max_depth: usize) -> Result<Self> {
        ensure!(max_depth > 0, "index walk depth must be at least 1");

        let block = IndexBlock::open(path.as_ref())?;
        Ok(Self {
            block: Arc::new(RwLock::new(block)),
            max_depth,
        })
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Record numbers of rows whose indexed value starts with `needle`
    /// (`needle` truncated to the walk depth). An absent branch, or a
    /// character outside the alphabet, yields the empty set; there are no
    /// partial matches.
    pub fn find(&self, needle: &str) -> Result<PkSet> {
        let block = self.block.read();

        let mut page_no = ROOT_PAGE;
        for b in needle.bytes().take(self.max_depth) {
            let Some(idx) = alphabet_index(b) else {
                return Ok(PkSet::new());
            };
            let child = block.page(page_no)?.child(idx);
            if child == NO_PAGE {
                return Ok(PkSet::new());
            }
            page_no = child;
        }

        Ok(block.page(page_no)?.pks().collect())
    }

    /// Records `pk` under the first `max_depth` characters of `value`,
    /// allocating pages as needed. Every page along the path collects the
    /// pk, which is what makes lookups prefix matches.
    pub fn add(&mut self, pk: u64, value: &str) -> Result<()> {
        self.add_bytes(pk, value.as_bytes())
    }

    pub(crate) fn add_bytes(&mut self, pk: u64, value: &[u8]) -> Result<()> {
        let slot = u32::try_from(pk + 1)
            .wrap_err_with(|| format!("record number {} does not fit an index slot", pk))?;

        let mut block = self.block.write();

        block.page_mut(ROOT_PAGE)?.push_slot(slot);

        let mut page_no = ROOT_PAGE;
        for &b in value.iter().take(self.max_depth) {
            let Some(idx) = alphabet_index(b) else {
                break;
            };

            let mut child = block.page(page_no)?.child(idx);
            if child == NO_PAGE {
                child = block.allocate(b)?;
                block.page_mut(page_no)?.set_child(idx, child);
            }

            block.page_mut(child)?.push_slot(slot);
            page_no = child;
        }

        Ok(())
    }

    /// Removal is not supported: entries for deleted records stay in the
    /// buckets, and `filter` drops them when resolution reports NotFound.
    pub fn remove(&mut self, _pk: u64, _value: &str) -> Result<()> {
        bail!("the prefix index does not support removal; deleted records are dropped at lookup resolution");
    }

    pub fn sync(&self) -> Result<()> {
        let block = self.block.read();
        block
            .mmap
            .flush()
            .wrap_err_with(|| format!("failed to sync index block '{}'", block.path.display()))
    }
}

/// The mapped block: header plus the fixed page array.
#[derive(Debug)]
struct IndexBlock {
    mmap: MmapMut,
    path: PathBuf,
}

impl IndexBlock {
    fn open(path: &Path) -> Result<Self> {
        let file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => file,
            Err(e) => bail!(StoreError::configuration(format!(
                "cannot open index block '{}': {}",
                path.display(),
                e
            ))),
        };

        let len = file
            .metadata()
            .wrap_err_with(|| format!("failed to stat index block '{}'", path.display()))?
            .len();
        if len != BLOCK_SIZE as u64 {
            bail!(StoreError::configuration(format!(
                "index block '{}' is {} bytes, expected {}",
                path.display(),
                len,
                BLOCK_SIZE
            )));
        }

        // SAFETY: MmapMut::map_mut is unsafe because memory-mapped files
        // can be modified externally. This is safe because:
        // 1. The block was sized and zeroed at creation and is only
        //    touched through this mapping afterwards
        // 2. The mmap lifetime is tied to IndexBlock, preventing
        //    use-after-unmap
        // 3. All access goes through page()/page_mut() which bounds-check
        //    the page number against the fixed page count
        let mmap = unsafe {
            MmapMut::map_mut(&file)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        Ok(Self {
            mmap,
            path: path.to_path_buf(),
        })
    }

    fn header(&self) -> Result<&BlockHeader> {
        BlockHeader::ref_from_bytes(&self.mmap[..BLOCK_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse index block header: {:?}", e))
    }

    fn header_mut(&mut self) -> Result<&mut BlockHeader> {
        BlockHeader::mut_from_bytes(&mut self.mmap[..BLOCK_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse index block header: {:?}", e))
    }

    fn page(&self, page_no: u32) -> Result<&TriePage> {
        let offset = self.page_offset(page_no)?;
        TriePage::ref_from_bytes(&self.mmap[offset..offset + TRIE_PAGE_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse trie page {}: {:?}", page_no, e))
    }

    fn page_mut(&mut self, page_no: u32) -> Result<&mut TriePage> {
        let offset = self.page_offset(page_no)?;
        TriePage::mut_from_bytes(&mut self.mmap[offset..offset + TRIE_PAGE_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse trie page {}: {:?}", page_no, e))
    }

    fn page_offset(&self, page_no: u32) -> Result<usize> {
        ensure!(
            (page_no as usize) < PAGE_COUNT,
            "page {} out of bounds in index block '{}' (page count {})",
            page_no,
            self.path.display(),
            PAGE_COUNT
        );
        Ok(BLOCK_HEADER_SIZE + page_no as usize * TRIE_PAGE_SIZE)
    }

    /// Bumps the free-page cursor and returns the fresh page. Pages are
    /// never reclaimed, so a fresh page is guaranteed zeroed.
    fn allocate(&mut self, symbol: u8) -> Result<u32> {
        let page_no = self.header()?.free_cursor() + 1;
        ensure!(
            (page_no as usize) < PAGE_COUNT,
            "index block '{}' is exhausted: all {} pages allocated",
            self.path.display(),
            PAGE_COUNT
        );

        self.header_mut()?.set_free_cursor(page_no);
        self.page_mut(page_no)?.set_symbol(symbol);
        Ok(page_no)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::store_error;
    use tempfile::tempdir;

    fn fresh_index(dir: &tempfile::TempDir) -> TrieIndex {
        let path = dir.path().join("pets.name.index");
        TrieIndex::create(&path).unwrap();
        TrieIndex::open(&path).unwrap()
    }

    #[test]
    fn create_writes_a_zeroed_block_of_the_exact_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pets.name.index");

        TrieIndex::create(&path).unwrap();

        let metadata = std::fs::metadata(&path).unwrap();
        assert_eq!(metadata.len(), BLOCK_SIZE as u64);
    }

    #[test]
    fn open_missing_block_is_a_configuration_error() {
        let dir = tempdir().unwrap();

        let report = TrieIndex::open(dir.path().join("absent.index")).unwrap_err();

        assert!(matches!(
            store_error(&report),
            Some(StoreError::Configuration { .. })
        ));
    }

    #[test]
    fn open_mis_sized_block_is_a_configuration_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pets.name.index");
        std::fs::write(&path, b"short").unwrap();

        let report = TrieIndex::open(&path).unwrap_err();

        assert!(matches!(
            store_error(&report),
            Some(StoreError::Configuration { .. })
        ));
    }

    #[test]
    fn find_on_empty_index_is_empty() {
        let dir = tempdir().unwrap();
        let index = fresh_index(&dir);

        assert!(index.find("cat").unwrap().is_empty());
    }

    #[test]
    fn prefix_lookup_matches_spec_example() {
        let dir = tempdir().unwrap();
        let mut index = fresh_index(&dir);

        index.add(0, "cat").unwrap();
        index.add(1, "car").unwrap();
        index.add(2, "dog").unwrap();

        assert_eq!(index.find("ca").unwrap().as_slice(), &[0, 1]);
        assert_eq!(index.find("do").unwrap().as_slice(), &[2]);
        assert!(index.find("z").unwrap().is_empty());
    }

    #[test]
    fn record_zero_is_indexable() {
        let dir = tempdir().unwrap();
        let mut index = fresh_index(&dir);

        index.add(0, "cat").unwrap();

        assert_eq!(index.find("cat").unwrap().as_slice(), &[0]);
    }

    #[test]
    fn every_prefix_of_a_value_matches() {
        let dir = tempdir().unwrap();
        let mut index = fresh_index(&dir);

        index.add(7, "cat").unwrap();

        assert_eq!(index.find("c").unwrap().as_slice(), &[7]);
        assert_eq!(index.find("ca").unwrap().as_slice(), &[7]);
        assert_eq!(index.find("cat").unwrap().as_slice(), &[7]);
    }

    #[test]
    fn lookup_deeper_than_max_depth_uses_the_depth_prefix() {
        let dir = tempdir().unwrap();
        let mut index = fresh_index(&dir);

        index.add(3, "catalog").unwrap();

        // Walks stop after three characters, so "catalog" and "catfish"
        // land in the same bucket.
        assert_eq!(index.find("catfish").unwrap().as_slice(), &[3]);
    }

    #[test]
    fn non_alphabet_character_yields_no_matches() {
        let dir = tempdir().unwrap();
        let mut index = fresh_index(&dir);

        index.add(4, "cat").unwrap();

        assert!(index.find("c-t").unwrap().is_empty());
    }

    #[test]
    fn non_alphabet_character_terminates_the_indexed_path() {
        let dir = tempdir().unwrap();
        let mut index = fresh_index(&dir);

        index.add(5, "a-z").unwrap();

        assert_eq!(index.find("a").unwrap().as_slice(), &[5]);
        assert!(index.find("az").unwrap().is_empty());
    }

    #[test]
    fn duplicate_adds_do_not_duplicate_bucket_entries() {
        let dir = tempdir().unwrap();
        let mut index = fresh_index(&dir);

        index.add(6, "cat").unwrap();
        index.add(6, "cat").unwrap();

        assert_eq!(index.find("cat").unwrap().len(), 1);
    }

    #[test]
    fn index_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pets.name.index");
        TrieIndex::create(&path).unwrap();

        {
            let mut index = TrieIndex::open(&path).unwrap();
            index.add(9, "cat").unwrap();
            index.sync().unwrap();
        }

        let index = TrieIndex::open(&path).unwrap();
        assert_eq!(index.find("ca").unwrap().as_slice(), &[9]);
    }

    #[test]
    fn clones_share_one_mapping() {
        let dir = tempdir().unwrap();
        let mut index = fresh_index(&dir);
        let reader = index.clone();

        index.add(11, "dog").unwrap();

        assert_eq!(reader.find("do").unwrap().as_slice(), &[11]);
    }

    #[test]
    fn remove_is_unsupported() {
        let dir = tempdir().unwrap();
        let mut index = fresh_index(&dir);
        index.add(1, "cat").unwrap();

        assert!(index.remove(1, "cat").is_err());
        assert_eq!(index.find("cat").unwrap().len(), 1);
    }

    #[test]
    fn bucket_overflow_overwrites_the_last_slot() {
        let dir = tempdir().unwrap();
        let mut index = fresh_index(&dir);

        for pk in 0..BUCKET_CAPACITY as u64 + 2 {
            index.add(pk, "cat").unwrap();
        }

        let pks = index.find("cat").unwrap();
        assert_eq!(pks.len(), BUCKET_CAPACITY);
        assert_eq!(pks[BUCKET_CAPACITY - 1], BUCKET_CAPACITY as u64 + 1);
    }
}

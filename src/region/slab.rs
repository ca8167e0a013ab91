//! Slab allocator over a fixed-size byte region.
//!
//! # Layout
//! ```text
//! region: [ page 0 | page 1 | page 2 | ... | page N-1 ]
//!
//! size <= page/2  → page dedicated to one power-of-two class (min 8 bytes),
//!                   slots handed out from a per-page free stack
//! size  > page/2  → run of contiguous free pages (first fit)
//! ```
//!
//! # Design Decisions
//! - Blocks are move-only handles; `free` consumes them, so a block cannot
//!   be released twice
//! - Every block carries the tag of the region that minted it; `owns`
//!   compares tags before any byte range check
//! - Not internally synchronized: callers hold the region lock

use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Smallest slab class is 8 bytes.
const MIN_SHIFT: u32 = 3;
const MIN_PAGE_SIZE: usize = 64;
const MAX_PAGE_SIZE: usize = 64 * 1024;

static NEXT_TAG: AtomicU64 = AtomicU64::new(1);

/// Identity of one region. Unique per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionTag(u64);

impl RegionTag {
    fn next() -> Self {
        Self(NEXT_TAG.fetch_add(1, Ordering::Relaxed))
    }
}

/// Errors raised by the slab allocator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AllocError {
    /// No free block large enough for the request.
    #[error("out of memory: requested {requested} bytes, {available} bytes free")]
    OutOfMemory { requested: usize, available: usize },

    /// The block was not minted by this region, or is not live.
    #[error("block at offset {offset} does not belong to this region")]
    ForeignBlock { offset: usize },

    /// Region size or page size rejected at construction.
    #[error("invalid region layout: {0}")]
    InvalidLayout(String),
}

/// A live allocation inside a region.
#[derive(Debug, PartialEq, Eq)]
pub struct Block {
    tag: RegionTag,
    offset: u32,
    len: u32,
}

impl Block {
    /// Requested length in bytes.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte offset from the region start.
    pub fn offset(&self) -> usize {
        self.offset as usize
    }
}

#[derive(Debug)]
enum Page {
    Free,
    Slab { shift: u32, free: Vec<u16>, slots: u16 },
    Run { pages: usize },
    RunTail,
}

/// Slab-style allocator bound to one fixed-size region.
#[derive(Debug)]
pub struct SlabAllocator {
    tag: RegionTag,
    memory: Box<[u8]>,
    page_size: usize,
    pages: Vec<Page>,
    used: usize,
    live: usize,
}

impl SlabAllocator {
    /// Create an allocator over `size` bytes split into `page_size` pages.
    ///
    /// `size` is rounded down to a whole number of pages.
    pub fn new(size: usize, page_size: usize) -> Result<Self, AllocError> {
        if !page_size.is_power_of_two() || !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(AllocError::InvalidLayout(format!(
                "page size {} must be a power of two between {} and {}",
                page_size, MIN_PAGE_SIZE, MAX_PAGE_SIZE
            )));
        }
        if size < page_size {
            return Err(AllocError::InvalidLayout(format!(
                "region of {} bytes cannot hold a single {} byte page",
                size, page_size
            )));
        }
        if size > u32::MAX as usize {
            return Err(AllocError::InvalidLayout(format!(
                "region of {} bytes exceeds the 4 GiB limit",
                size
            )));
        }

        let page_count = size / page_size;
        let mut pages = Vec::with_capacity(page_count);
        pages.resize_with(page_count, || Page::Free);

        Ok(Self {
            tag: RegionTag::next(),
            memory: vec![0u8; page_count * page_size].into_boxed_slice(),
            page_size,
            pages,
            used: 0,
            live: 0,
        })
    }

    pub fn tag(&self) -> RegionTag {
        self.tag
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_bytes(&self) -> usize {
        self.memory.len()
    }

    /// Bytes charged to live blocks, rounded up to their class or page run.
    pub fn used_bytes(&self) -> usize {
        self.used
    }

    pub fn free_bytes(&self) -> usize {
        self.total_bytes() - self.used
    }

    pub fn free_pages(&self) -> usize {
        self.pages.iter().filter(|p| matches!(p, Page::Free)).count()
    }

    /// Number of blocks currently allocated.
    pub fn live_blocks(&self) -> usize {
        self.live
    }

    /// Allocate `size` bytes. Contents are whatever the previous owner left.
    pub fn allocate(&mut self, size: usize) -> Result<Block, AllocError> {
        if size > self.page_size / 2 {
            self.allocate_pages(size)
        } else {
            self.allocate_slot(size)
        }
    }

    /// Allocate `size` bytes filled with zeros.
    pub fn allocate_zeroed(&mut self, size: usize) -> Result<Block, AllocError> {
        let block = self.allocate(size)?;
        let start = block.offset();
        self.memory[start..start + block.len()].fill(0);
        Ok(block)
    }

    /// Allocate a block holding a copy of `data`.
    pub fn allocate_copy(&mut self, data: &[u8]) -> Result<Block, AllocError> {
        let block = self.allocate(data.len())?;
        let start = block.offset();
        self.memory[start..start + data.len()].copy_from_slice(data);
        Ok(block)
    }

    /// Return a block to the region.
    pub fn free(&mut self, block: Block) -> Result<(), AllocError> {
        if !self.owns(&block) {
            return Err(AllocError::ForeignBlock {
                offset: block.offset(),
            });
        }

        let index = block.offset() / self.page_size;
        let (released, page_emptied) = match &mut self.pages[index] {
            Page::Slab { shift, free, slots } => {
                let slot = ((block.offset() % self.page_size) >> *shift) as u16;
                free.push(slot);
                (1usize << *shift, free.len() == *slots as usize)
            }
            Page::Run { pages } => {
                let run = *pages;
                for page in &mut self.pages[index..index + run] {
                    *page = Page::Free;
                }
                (run * self.page_size, false)
            }
            Page::Free | Page::RunTail => {
                return Err(AllocError::ForeignBlock {
                    offset: block.offset(),
                })
            }
        };

        if page_emptied {
            self.pages[index] = Page::Free;
        }
        self.used -= released;
        self.live -= 1;
        Ok(())
    }

    /// True iff `block` was minted by this region and lies inside it.
    pub fn owns(&self, block: &Block) -> bool {
        block.tag == self.tag && block.offset() + block.len() <= self.memory.len()
    }

    /// Read access to a block's bytes.
    pub fn bytes(&self, block: &Block) -> Option<&[u8]> {
        if !self.owns(block) {
            return None;
        }
        let start = block.offset();
        Some(&self.memory[start..start + block.len()])
    }

    /// Write access to a block's bytes.
    pub fn bytes_mut(&mut self, block: &Block) -> Option<&mut [u8]> {
        if !self.owns(block) {
            return None;
        }
        let start = block.offset();
        Some(&mut self.memory[start..start + block.len()])
    }

    fn allocate_slot(&mut self, size: usize) -> Result<Block, AllocError> {
        let shift = class_shift(size);

        let partial = self.pages.iter().position(|page| {
            matches!(page, Page::Slab { shift: s, free, .. } if *s == shift && !free.is_empty())
        });
        let index = match partial {
            Some(index) => index,
            None => {
                let index = self
                    .pages
                    .iter()
                    .position(|page| matches!(page, Page::Free))
                    .ok_or_else(|| self.out_of_memory(size))?;
                let slots = (self.page_size >> shift) as u16;
                self.pages[index] = Page::Slab {
                    shift,
                    free: (0..slots).rev().collect(),
                    slots,
                };
                index
            }
        };

        let slot = match &mut self.pages[index] {
            Page::Slab { free, .. } => free.pop(),
            _ => None,
        };
        let slot = slot.ok_or_else(|| self.out_of_memory(size))?;

        self.used += 1 << shift;
        self.live += 1;
        Ok(Block {
            tag: self.tag,
            offset: (index * self.page_size + ((slot as usize) << shift)) as u32,
            len: size as u32,
        })
    }

    fn allocate_pages(&mut self, size: usize) -> Result<Block, AllocError> {
        let needed = size.div_ceil(self.page_size);

        let mut run_start = 0;
        let mut run_len = 0;
        let mut found = None;
        for (index, page) in self.pages.iter().enumerate() {
            if matches!(page, Page::Free) {
                if run_len == 0 {
                    run_start = index;
                }
                run_len += 1;
                if run_len == needed {
                    found = Some(run_start);
                    break;
                }
            } else {
                run_len = 0;
            }
        }
        let start = found.ok_or_else(|| self.out_of_memory(size))?;

        self.pages[start] = Page::Run { pages: needed };
        for page in &mut self.pages[start + 1..start + needed] {
            *page = Page::RunTail;
        }

        self.used += needed * self.page_size;
        self.live += 1;
        Ok(Block {
            tag: self.tag,
            offset: (start * self.page_size) as u32,
            len: size as u32,
        })
    }

    fn out_of_memory(&self, requested: usize) -> AllocError {
        AllocError::OutOfMemory {
            requested,
            available: self.free_bytes(),
        }
    }
}

fn class_shift(size: usize) -> u32 {
    size.max(1).next_power_of_two().trailing_zeros().max(MIN_SHIFT)
}

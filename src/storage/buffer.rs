pub mod clock;
pub mod lru;
pub mod replacer;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{PageId, SlotId, SlottedPage};
use crate::storage::PageManager;
use log::{debug, info, warn};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use replacer::{Replacer, Residency};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Frame {
    page_id: PageId,
    page: RwLock<SlottedPage>,
    pin_count: AtomicU32,
    /// Pins given up by handles through `into_page_id`; only these may be
    /// released by page id.
    detached_pins: AtomicU32,
    is_dirty: AtomicBool,
}

impl Frame {
    fn new(page_id: PageId, page: SlottedPage, is_dirty: bool) -> Self {
        Self {
            page_id,
            page: RwLock::new(page),
            pin_count: AtomicU32::new(0),
            detached_pins: AtomicU32::new(0),
            is_dirty: AtomicBool::new(is_dirty),
        }
    }

    fn pin(&self) {
        let _ = self
            .pin_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                Some(count.saturating_add(1))
            });
    }

    /// Returns false if the frame was not pinned.
    fn unpin(&self) -> bool {
        self.pin_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                count.checked_sub(1)
            })
            .is_ok()
    }

    fn detach_pin(&self) {
        self.detached_pins.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns false if no detached pin is outstanding.
    fn take_detached_pin(&self) -> bool {
        self.detached_pins
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                count.checked_sub(1)
            })
            .is_ok()
    }

    fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::SeqCst)
    }

    fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::SeqCst)
    }
}

/// Snapshot of a cached frame's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStatus {
    pub page_id: PageId,
    pub is_dirty: bool,
    pub pin_count: u32,
}

/// Fixed-capacity page cache in front of a [`PageManager`].
///
/// One pool-wide lock guards the frame table and the replacer. Every
/// operation that can admit, evict or write back a page holds it exclusively
/// for its whole duration, disk I/O included, so a page id is never admitted
/// or evicted by two threads at once. Page contents sit behind a per-frame
/// latch reached through [`PageHandle`]; do not call into the pool while
/// holding a latch guard.
#[derive(Clone)]
pub struct BufferPoolManager {
    inner: Arc<BufferPoolInner>,
}

struct BufferPoolInner {
    state: RwLock<PoolState>,
    page_manager: PageManager,
    capacity: usize,
}

struct PoolState {
    frames: HashMap<PageId, Arc<Frame>>,
    replacer: Box<dyn Replacer>,
}

impl BufferPoolManager {
    pub fn new(page_manager: PageManager, replacer: Box<dyn Replacer>, capacity: usize) -> Self {
        Self {
            inner: Arc::new(BufferPoolInner {
                state: RwLock::new(PoolState {
                    frames: HashMap::with_capacity(capacity),
                    replacer,
                }),
                page_manager,
                capacity,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn page_size(&self) -> usize {
        self.inner.page_manager.page_size()
    }

    /// Number of cached pages.
    pub fn size(&self) -> usize {
        self.inner.state.read().frames.len()
    }

    pub fn contains(&self, page_id: PageId) -> bool {
        self.inner.state.read().frames.contains_key(&page_id)
    }

    pub fn page_manager(&self) -> &PageManager {
        &self.inner.page_manager
    }

    /// Pins a page, reading it from disk if it is not cached.
    ///
    /// A page that lies beyond the end of the data file has been allocated but
    /// never written and comes back empty.
    pub fn fetch_page(&self, page_id: PageId) -> StorageResult<PageHandle> {
        let mut state = self.inner.state.write();

        if let Some(frame) = state.frames.get(&page_id).cloned() {
            frame.pin();
            state.replacer.record_access(page_id);
            debug!("Buffer hit for page {}", page_id);
            return Ok(PageHandle::new(frame));
        }

        self.make_room(&mut state)?;

        let page = match self.inner.page_manager.read_page(page_id)? {
            Some(buf) => SlottedPage::deserialize(&buf, self.page_size())?,
            None => {
                debug!("Page {} is past the end of the data file", page_id);
                SlottedPage::new(self.page_size())
            }
        };

        debug!("Loaded page {} from disk", page_id);
        let frame = Self::admit(&mut state, page_id, page, false);
        Ok(PageHandle::new(frame))
    }

    /// Admits a freshly allocated, empty page without reading its contents.
    ///
    /// The page starts dirty so the first flush reserves it in the data file.
    /// A page id the data file already covers is refused with
    /// `PageAlreadyExists`; admitting it blank would overwrite what is there.
    pub fn add_new_page(&self, page_id: PageId) -> StorageResult<PageHandle> {
        let mut state = self.inner.state.write();

        if state.frames.contains_key(&page_id) {
            return Err(StorageError::PageAlreadyCached(page_id));
        }
        if page_id.0 < self.inner.page_manager.num_pages()? {
            return Err(StorageError::PageAlreadyExists(page_id));
        }

        self.make_room(&mut state)?;

        info!("Admitting new page {}", page_id);
        let frame = Self::admit(
            &mut state,
            page_id,
            SlottedPage::new(self.page_size()),
            true,
        );
        Ok(PageHandle::new(frame))
    }

    /// Appends a record to a pinned page and marks it dirty.
    pub fn write_record_to_page(&self, handle: &PageHandle, record: &[u8]) -> StorageResult<SlotId> {
        let slot_id = handle.frame.page.write().add_record(record)?;
        handle.frame.is_dirty.store(true, Ordering::SeqCst);
        Ok(slot_id)
    }

    /// Writes a cached page back to disk if it is dirty.
    pub fn flush_page(&self, page_id: PageId) -> StorageResult<()> {
        let state = self.inner.state.write();
        let frame = state
            .frames
            .get(&page_id)
            .ok_or(StorageError::PageNotFound(page_id))?;
        self.flush_frame(frame)
    }

    pub fn flush_all(&self) -> StorageResult<()> {
        let state = self.inner.state.write();
        for frame in state.frames.values() {
            self.flush_frame(frame)?;
        }
        Ok(())
    }

    /// Releases one pin taken by [`fetch_page`](Self::fetch_page) or
    /// [`add_new_page`](Self::add_new_page) whose handle was turned into a bare
    /// page id with [`PageHandle::into_page_id`].
    ///
    /// Pins still owned by a live [`PageHandle`] cannot be released here; with
    /// none detached the call fails with `PageNotPinned`.
    pub fn unpin_page(&self, page_id: PageId) -> StorageResult<()> {
        let state = self.inner.state.write();
        let frame = state
            .frames
            .get(&page_id)
            .ok_or(StorageError::PageNotFound(page_id))?;
        if !frame.take_detached_pin() {
            return Err(StorageError::PageNotPinned(page_id));
        }
        if !frame.unpin() {
            warn!("Page {} had a detached pin but a zero pin count", page_id);
        }
        Ok(())
    }

    pub fn get_buffer_page(&self, page_id: PageId) -> StorageResult<FrameStatus> {
        let state = self.inner.state.read();
        let frame = state
            .frames
            .get(&page_id)
            .ok_or(StorageError::PageNotFound(page_id))?;
        Ok(FrameStatus {
            page_id,
            is_dirty: frame.is_dirty(),
            pin_count: frame.pin_count(),
        })
    }

    fn make_room(&self, state: &mut PoolState) -> StorageResult<()> {
        while state.frames.len() >= self.inner.capacity {
            self.evict_page(state)?;
        }
        Ok(())
    }

    fn admit(state: &mut PoolState, page_id: PageId, page: SlottedPage, is_dirty: bool) -> Arc<Frame> {
        let frame = Arc::new(Frame::new(page_id, page, is_dirty));
        frame.pin();
        state.frames.insert(page_id, Arc::clone(&frame));
        state.replacer.record_access(page_id);
        frame
    }

    /// Evicts one unpinned page, writing it back first if it is dirty.
    ///
    /// If the write-back fails the victim stays cached and tracked.
    fn evict_page(&self, state: &mut PoolState) -> StorageResult<PageId> {
        let PoolState { frames, replacer } = state;

        let victim = replacer.victim(&|page_id| match frames.get(&page_id) {
            None => Residency::Absent,
            Some(frame) if frame.pin_count() > 0 => Residency::Pinned,
            Some(_) => Residency::Evictable,
        });

        let Some(page_id) = victim else {
            let pinned = frames.values().filter(|f| f.pin_count() > 0).count();
            warn!("No page to evict: {} of {} frames pinned", pinned, frames.len());
            return Err(StorageError::NoPageToEvict { pinned });
        };

        let frame = frames
            .get(&page_id)
            .cloned()
            .ok_or(StorageError::PageNotFound(page_id))?;
        self.flush_frame(&frame)?;

        frames.remove(&page_id);
        replacer.remove(page_id);
        info!("Evicted page {}", page_id);

        Ok(page_id)
    }

    fn flush_frame(&self, frame: &Frame) -> StorageResult<()> {
        if !frame.is_dirty.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        let bytes = frame.page.read().serialize();
        if let Err(e) = self.inner.page_manager.write_page(frame.page_id, &bytes) {
            frame.is_dirty.store(true, Ordering::SeqCst);
            return Err(e);
        }

        debug!("Flushed page {}", frame.page_id);
        Ok(())
    }
}

/// A pinned page.
///
/// The pin is released when the handle is dropped, on every exit path.
pub struct PageHandle {
    frame: Arc<Frame>,
    holds_pin: bool,
}

impl PageHandle {
    fn new(frame: Arc<Frame>) -> Self {
        Self {
            frame,
            holds_pin: true,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.frame.page_id
    }

    pub fn read(&self) -> RwLockReadGuard<'_, SlottedPage> {
        self.frame.page.read()
    }

    /// Latches the page for writing and marks the frame dirty.
    pub fn write(&self) -> RwLockWriteGuard<'_, SlottedPage> {
        let guard = self.frame.page.write();
        self.frame.is_dirty.store(true, Ordering::SeqCst);
        guard
    }

    /// Gives the pin up to the caller, who must balance it with
    /// [`BufferPoolManager::unpin_page`].
    pub fn into_page_id(mut self) -> PageId {
        self.holds_pin = false;
        self.frame.detach_pin();
        self.frame.page_id
    }
}

impl Drop for PageHandle {
    fn drop(&mut self) {
        if self.holds_pin && !self.frame.unpin() {
            warn!("Page {} was already unpinned", self.frame.page_id);
        }
    }
}

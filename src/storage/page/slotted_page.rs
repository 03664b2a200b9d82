//! Slotted page format.
//!
//! Record bytes grow upward from the end of the header while the slot
//! directory grows downward from the end of the page:
//!
//! ```text
//! +-------+-------+----------------------+-----------+--------+--------+
//! | fsp   | count | record data ->       |   free    | slot 1 | slot 0 |
//! +-------+-------+----------------------+-----------+--------+--------+
//! 0       2       4                      fsp                  page_size
//! ```
//!
//! A slot entry is a `u16` offset and a `u32` length, little-endian. A deleted
//! slot is written as offset 0 and length 0; offset 0 falls inside the header,
//! so no live record can ever carry it.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{SlotId, PAGE_HEADER_SIZE, SLOT_SIZE};
use byteorder::{ByteOrder, LittleEndian};
use std::ops::Range;

const FREE_SPACE_POINTER_OFFSET: usize = 0;
const SLOT_COUNT_OFFSET: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub offset: u16,
    pub length: u32,
}

impl Slot {
    const DELETED: Slot = Slot {
        offset: 0,
        length: 0,
    };

    pub fn is_deleted(&self) -> bool {
        self.offset == 0
    }

    /// Byte range of the record inside the page.
    pub fn range(&self) -> Range<usize> {
        let start = self.offset as usize;
        start..start + self.length as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlottedPage {
    /// Page-sized arena; only `[PAGE_HEADER_SIZE, free_space_pointer)` holds record bytes.
    data: Vec<u8>,
    free_space_pointer: u16,
    slots: Vec<Slot>,
}

impl SlottedPage {
    pub fn new(page_size: usize) -> Self {
        Self {
            data: vec![0u8; page_size],
            free_space_pointer: PAGE_HEADER_SIZE as u16,
            slots: Vec::new(),
        }
    }

    /// Largest record an empty page of `page_size` bytes can hold.
    pub fn max_record_size(page_size: usize) -> usize {
        page_size.saturating_sub(PAGE_HEADER_SIZE + SLOT_SIZE)
    }

    pub fn page_size(&self) -> usize {
        self.data.len()
    }

    pub fn free_space_pointer(&self) -> u16 {
        self.free_space_pointer
    }

    /// Bytes between the end of the data area and the start of the slot directory.
    pub fn free_space(&self) -> usize {
        let directory_start = self.page_size() - self.slots.len() * SLOT_SIZE;
        directory_start.saturating_sub(self.free_space_pointer as usize)
    }

    /// Whether a record of `len` bytes can be added without compaction.
    pub fn can_fit(&self, len: usize) -> bool {
        len + self.slot_overhead() <= self.free_space()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_deleted()).count()
    }

    pub fn slot(&self, slot_id: SlotId) -> Option<Slot> {
        self.slots.get(slot_id as usize).copied()
    }

    /// Live records in slot order.
    pub fn records(&self) -> impl Iterator<Item = (SlotId, &[u8])> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.is_deleted())
            .map(move |(idx, slot)| (idx as SlotId, &self.data[slot.range()]))
    }

    pub fn add_record(&mut self, record: &[u8]) -> StorageResult<SlotId> {
        let reusable = self.slots.iter().position(Slot::is_deleted);
        let required = record.len() + self.slot_overhead();
        let available = self.free_space();
        if required > available {
            return Err(StorageError::NotEnoughSpace {
                required,
                available,
            });
        }

        let offset = self.free_space_pointer as usize;
        self.data[offset..offset + record.len()].copy_from_slice(record);
        self.free_space_pointer = (offset + record.len()) as u16;

        let slot = Slot {
            offset: offset as u16,
            length: record.len() as u32,
        };
        let slot_id = match reusable {
            Some(idx) => {
                self.slots[idx] = slot;
                idx
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        };

        Ok(slot_id as SlotId)
    }

    pub fn retrieve_record(&self, slot_id: SlotId) -> StorageResult<&[u8]> {
        let slot = self.checked_slot(slot_id)?;
        if slot.is_deleted() {
            return Err(StorageError::RecordDeleted { slot_id });
        }
        Ok(&self.data[slot.range()])
    }

    /// Marks the slot deleted. The record bytes stay in place until [`compact`](Self::compact).
    pub fn delete_record(&mut self, slot_id: SlotId) -> StorageResult<()> {
        let slot = self.checked_slot(slot_id)?;
        if slot.is_deleted() {
            return Err(StorageError::AlreadyDeleted { slot_id });
        }
        self.slots[slot_id as usize] = Slot::DELETED;
        Ok(())
    }

    /// Rewrites live records contiguously after the header and drops deleted
    /// slots from the directory.
    ///
    /// Slot ids are renumbered. The returned vector maps every old slot id to
    /// its new id, or `None` for slots that were deleted; any slot id held
    /// across this call must be translated through it.
    pub fn compact(&mut self) -> Vec<Option<SlotId>> {
        let mut data = vec![0u8; self.page_size()];
        let mut slots = Vec::with_capacity(self.live_count());
        let mut remap = Vec::with_capacity(self.slots.len());
        let mut cursor = PAGE_HEADER_SIZE;

        for slot in &self.slots {
            if slot.is_deleted() {
                remap.push(None);
                continue;
            }
            let len = slot.length as usize;
            data[cursor..cursor + len].copy_from_slice(&self.data[slot.range()]);
            remap.push(Some(slots.len() as SlotId));
            slots.push(Slot {
                offset: cursor as u16,
                length: slot.length,
            });
            cursor += len;
        }

        self.data = data;
        self.slots = slots;
        self.free_space_pointer = cursor as u16;
        remap
    }

    /// Encodes the page in its exact on-disk layout.
    pub fn serialize(&self) -> Vec<u8> {
        let page_size = self.page_size();
        let fsp = self.free_space_pointer as usize;
        let mut buf = vec![0u8; page_size];

        buf[PAGE_HEADER_SIZE..fsp].copy_from_slice(&self.data[PAGE_HEADER_SIZE..fsp]);
        LittleEndian::write_u16(
            &mut buf[FREE_SPACE_POINTER_OFFSET..FREE_SPACE_POINTER_OFFSET + 2],
            self.free_space_pointer,
        );
        LittleEndian::write_u16(
            &mut buf[SLOT_COUNT_OFFSET..SLOT_COUNT_OFFSET + 2],
            self.slots.len() as u16,
        );

        for (idx, slot) in self.slots.iter().enumerate() {
            let pos = slot_position(page_size, idx);
            LittleEndian::write_u16(&mut buf[pos..pos + 2], slot.offset);
            LittleEndian::write_u32(&mut buf[pos + 2..pos + SLOT_SIZE], slot.length);
        }

        buf
    }

    pub fn deserialize(buf: &[u8], page_size: usize) -> StorageResult<Self> {
        if buf.len() != page_size {
            return Err(StorageError::SizeMismatch {
                expected: page_size,
                actual: buf.len(),
            });
        }

        let fsp = LittleEndian::read_u16(
            &buf[FREE_SPACE_POINTER_OFFSET..FREE_SPACE_POINTER_OFFSET + 2],
        ) as usize;
        let slot_count =
            LittleEndian::read_u16(&buf[SLOT_COUNT_OFFSET..SLOT_COUNT_OFFSET + 2]) as usize;

        // A zeroed header is a page that was allocated but never written.
        if fsp == 0 && slot_count == 0 {
            return Ok(Self::new(page_size));
        }

        if fsp < PAGE_HEADER_SIZE || fsp + slot_count * SLOT_SIZE > page_size {
            return Err(StorageError::CorruptPage(format!(
                "free space pointer {} with {} slots does not fit a {} byte page",
                fsp, slot_count, page_size
            )));
        }

        let mut slots = Vec::with_capacity(slot_count);
        for idx in 0..slot_count {
            let pos = slot_position(page_size, idx);
            let slot = Slot {
                offset: LittleEndian::read_u16(&buf[pos..pos + 2]),
                length: LittleEndian::read_u32(&buf[pos + 2..pos + SLOT_SIZE]),
            };
            let in_bounds =
                (slot.offset as usize) >= PAGE_HEADER_SIZE && slot.range().end <= fsp;
            if !slot.is_deleted() && !in_bounds {
                return Err(StorageError::CorruptPage(format!(
                    "slot {} spans {:?} outside data area ending at {}",
                    idx,
                    slot.range(),
                    fsp
                )));
            }
            slots.push(slot);
        }

        let mut data = vec![0u8; page_size];
        data[PAGE_HEADER_SIZE..fsp].copy_from_slice(&buf[PAGE_HEADER_SIZE..fsp]);

        Ok(Self {
            data,
            free_space_pointer: fsp as u16,
            slots,
        })
    }

    fn checked_slot(&self, slot_id: SlotId) -> StorageResult<Slot> {
        self.slot(slot_id).ok_or(StorageError::SlotOutOfRange {
            slot_id,
            slot_count: self.slots.len(),
        })
    }

    /// Directory bytes the next insert needs: none when a deleted slot can be reused.
    fn slot_overhead(&self) -> usize {
        if self.slots.iter().any(Slot::is_deleted) {
            0
        } else {
            SLOT_SIZE
        }
    }
}

fn slot_position(page_size: usize, idx: usize) -> usize {
    page_size - (idx + 1) * SLOT_SIZE
}

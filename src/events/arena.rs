//! Fixed-capacity event arena.
//!
//! All [`SensorEvent`]s live in a statically sized slot array; a 64-bit
//! bitmap tracks which slots are handed out.  Consumers refer to events by
//! [`EventHandle`], a plain slot index, so validating a handle is a single
//! range check and a misaligned free simply cannot be expressed.
//!
//! ```text
//!  bitmap   1 1 0 1 0 0 ...
//!  slots  ┌───┬───┬───┬───┬───┬───┐
//!         │ 0 │ 1 │ 2 │ 3 │ 4 │ 5 │ ...
//!         └───┴───┴───┴───┴───┴───┘
//!  alloc() hands out slot 2 (first clear bit)
//! ```
//!
//! Producers and consumers live in different tasks, so the firmware goes
//! through [`SharedArena`], which runs every operation inside one short
//! critical section.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use super::{MAX_SENSOR_ITEMS, Payload, SensorEvent, SensorKind};
use crate::error::{Error, Result};

/// Index of an arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventHandle(u16);

impl EventHandle {
    /// Build a handle from a raw slot index.  Nothing is checked here; the
    /// arena validates the index on every use.
    pub const fn from_index(index: usize) -> Self {
        Self(index as u16)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Read access to events by handle, without holding a borrow on the pool.
pub trait EventSource {
    /// Copy of the event behind `handle`, or `None` if the slot is not
    /// currently allocated.
    fn snapshot(&self, handle: EventHandle) -> Option<SensorEvent>;
}

/// Slot pool with bitmap bookkeeping.  `N` must be in `1..=64`.
pub struct EventArena<const N: usize> {
    slots: [SensorEvent; N],
    bitmap: u64,
}

impl<const N: usize> EventArena<N> {
    const CAPACITY_CHECK: () = assert!(N > 0 && N <= 64, "arena capacity must be 1..=64");

    const FULL_MASK: u64 = if N >= 64 { u64::MAX } else { (1u64 << N) - 1 };

    pub const fn new() -> Self {
        let () = Self::CAPACITY_CHECK;
        Self {
            slots: [const { SensorEvent::empty() }; N],
            bitmap: 0,
        }
    }

    /// Hand out the first free slot, zeroed, with a payload of
    /// `active_count` elements of `kind`'s value type.
    pub fn alloc(&mut self, kind: SensorKind, active_count: usize) -> Result<EventHandle> {
        if active_count > MAX_SENSOR_ITEMS {
            return Err(Error::InvalidArgument);
        }
        let free = !self.bitmap & Self::FULL_MASK;
        if free == 0 {
            return Err(Error::ResourceExhausted);
        }
        let idx = free.trailing_zeros() as usize;
        self.bitmap |= 1 << idx;
        self.slots[idx] = SensorEvent {
            kind,
            active: active_count as u8,
            payload: Payload::zeroed(kind, active_count),
            allocated: true,
            ..SensorEvent::empty()
        };
        Ok(EventHandle::from_index(idx))
    }

    /// Return a slot to the pool.  Freeing a free slot is a no-op.
    pub fn free(&mut self, handle: EventHandle) -> Result<()> {
        let idx = Self::check(handle)?;
        self.bitmap &= !(1 << idx);
        self.slots[idx].allocated = false;
        Ok(())
    }

    /// Deep-copy the event in `src` over the event in `dst`.  Both slots
    /// must be allocated.
    pub fn copy(&mut self, dst: EventHandle, src: EventHandle) -> Result<()> {
        let d = Self::check(dst)?;
        let s = Self::check(src)?;
        if !self.is_allocated(dst) || !self.is_allocated(src) {
            return Err(Error::ResourceExhausted);
        }
        if d != s {
            self.slots[d] = self.slots[s].clone();
        }
        Ok(())
    }

    /// Allocate a new slot holding a copy of `src`.
    pub fn duplicate(&mut self, src: EventHandle) -> Result<EventHandle> {
        let (kind, active) = match self.get(src) {
            Some(evt) => (evt.kind, evt.active as usize),
            None => return Err(Error::InvalidReference),
        };
        let dst = self.alloc(kind, active)?;
        if let Err(e) = self.copy(dst, src) {
            self.free(dst)?;
            return Err(e);
        }
        Ok(dst)
    }

    pub fn get(&self, handle: EventHandle) -> Option<&SensorEvent> {
        self.slots.get(handle.index()).filter(|e| e.allocated)
    }

    pub fn get_mut(&mut self, handle: EventHandle) -> Option<&mut SensorEvent> {
        self.slots.get_mut(handle.index()).filter(|e| e.allocated)
    }

    pub fn is_allocated(&self, handle: EventHandle) -> bool {
        handle.index() < N && self.bitmap & (1 << handle.index()) != 0
    }

    /// Number of slots currently handed out.
    pub fn in_use(&self) -> usize {
        self.bitmap.count_ones() as usize
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    fn check(handle: EventHandle) -> Result<usize> {
        if handle.index() < N {
            Ok(handle.index())
        } else {
            Err(Error::InvalidReference)
        }
    }
}

impl<const N: usize> Default for EventArena<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> EventSource for EventArena<N> {
    fn snapshot(&self, handle: EventHandle) -> Option<SensorEvent> {
        self.get(handle).cloned()
    }
}

/// [`EventArena`] shared between tasks.  Each call is one critical section;
/// nothing inside blocks or allocates.
pub struct SharedArena<const N: usize> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<EventArena<N>>>,
}

impl<const N: usize> SharedArena<N> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(EventArena::new())),
        }
    }

    /// Run `f` on the arena with preemption masked.
    pub fn with<R>(&self, f: impl FnOnce(&mut EventArena<N>) -> R) -> R {
        self.inner.lock(|cell| {
            let mut arena = cell.borrow_mut();
            f(&mut arena)
        })
    }

    pub fn alloc(&self, kind: SensorKind, active_count: usize) -> Result<EventHandle> {
        self.with(|a| a.alloc(kind, active_count))
    }

    pub fn free(&self, handle: EventHandle) -> Result<()> {
        self.with(|a| a.free(handle))
    }

    pub fn copy(&self, dst: EventHandle, src: EventHandle) -> Result<()> {
        self.with(|a| a.copy(dst, src))
    }

    pub fn duplicate(&self, src: EventHandle) -> Result<EventHandle> {
        self.with(|a| a.duplicate(src))
    }

    /// Overwrite the allocated slot `handle` with `event`.  Lets a
    /// producer fill a snapshot outside the critical section and publish
    /// it in one step.
    pub fn store(&self, handle: EventHandle, event: &SensorEvent) -> Result<()> {
        self.with(|a| match a.get_mut(handle) {
            Some(slot) => {
                *slot = SensorEvent {
                    allocated: true,
                    ..event.clone()
                };
                Ok(())
            }
            None => Err(Error::InvalidReference),
        })
    }

    pub fn in_use(&self) -> usize {
        self.with(|a| a.in_use())
    }
}

impl<const N: usize> Default for SharedArena<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> EventSource for SharedArena<N> {
    fn snapshot(&self, handle: EventHandle) -> Option<SensorEvent> {
        self.with(|a| a.snapshot(handle))
    }
}

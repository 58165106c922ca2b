//! Bounded consumer queues of event handles.
//!
//! Every aggregated event is delivered to two independent queues, one for
//! the display task and one for the network task.  Order is FIFO within a
//! queue; nothing is promised across queues.
//!
//! When a queue is full the producer evicts (pops **and frees**) the oldest
//! handle, then retries the push exactly once.  Latest value wins and a
//! displaced event never leaks its arena slot.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embassy_time::Duration;
use log::warn;

use super::SensorEvent;
use super::arena::{EventHandle, EventSource, SharedArena};
use crate::error::{Error, Result};

/// How long a receiver is willing to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Return immediately.
    Poll,
    /// Block until something arrives.
    Forever,
    /// Block for at most this long.
    For(Duration),
}

/// Bounded FIFO of arena handles.
pub struct EventQueue<const Q: usize> {
    channel: Channel<CriticalSectionRawMutex, EventHandle, Q>,
}

impl<const Q: usize> EventQueue<Q> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Push `handle`, evicting the oldest queued handle if the queue is full.
    ///
    /// Returns the evicted handle (already freed) if one was displaced.  If
    /// the retry still finds the queue full, `handle` itself is freed and
    /// `ResourceExhausted` is returned.
    pub fn push_evicting<const N: usize>(
        &self,
        arena: &SharedArena<N>,
        handle: EventHandle,
    ) -> Result<Option<EventHandle>> {
        let handle = match self.channel.try_send(handle) {
            Ok(()) => return Ok(None),
            Err(TrySendError::Full(h)) => h,
        };

        let evicted = self.channel.try_receive().ok();
        if let Some(old) = evicted {
            if let Err(e) = arena.free(old) {
                warn!("queue: freeing evicted slot {} failed: {}", old.index(), e);
            }
        }

        match self.channel.try_send(handle) {
            Ok(()) => Ok(evicted),
            Err(TrySendError::Full(h)) => {
                // Another producer refilled the queue between evict and retry.
                arena.free(h)?;
                Err(Error::ResourceExhausted)
            }
        }
    }

    /// Pop the oldest handle without waiting.
    pub fn try_receive(&self) -> Option<EventHandle> {
        self.channel.try_receive().ok()
    }

    /// Pop the oldest handle, waiting as `wait` allows.
    pub async fn receive(&self, wait: Wait) -> Result<EventHandle> {
        match wait {
            Wait::Poll => self.try_receive().ok_or(Error::Timeout),
            Wait::Forever => Ok(self.channel.receive().await),
            Wait::For(limit) => embassy_time::with_timeout(limit, self.channel.receive())
                .await
                .map_err(|_| Error::Timeout),
        }
    }

    /// Blocking variant of [`receive`](Self::receive) for RTOS task loops.
    pub fn receive_blocking(&self, wait: Wait) -> Result<EventHandle> {
        futures_lite::future::block_on(self.receive(wait))
    }

    /// Pop one handle, hand a copy of its event to `f`, then free the slot.
    ///
    /// The arena lock is only held for the copy, never while `f` runs.  A
    /// handle whose slot was already freed is dropped and reported as
    /// `InvalidReference`.
    pub fn consume<const N: usize, R>(
        &self,
        arena: &SharedArena<N>,
        wait: Wait,
        f: impl FnOnce(&SensorEvent) -> R,
    ) -> Result<R> {
        let handle = self.receive_blocking(wait)?;
        let event = arena.snapshot(handle);
        arena.free(handle)?;
        event.map(|e| f(&e)).ok_or(Error::InvalidReference)
    }

    /// Pop and free everything still queued.  Returns how many were freed.
    pub fn flush<const N: usize>(&self, arena: &SharedArena<N>) -> usize {
        let mut freed = 0;
        while let Some(h) = self.try_receive() {
            if arena.free(h).is_ok() {
                freed += 1;
            }
        }
        freed
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        Q
    }
}

impl<const Q: usize> Default for EventQueue<Q> {
    fn default() -> Self {
        Self::new()
    }
}

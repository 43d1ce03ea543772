//! Counting limiter for in-flight comparison units.
//!
//! A bounded channel used as a semaphore: acquiring a permit sends a token and blocks while the
//! channel is full; dropping the permit takes one token back out.

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender, bounded};

pub struct InFlightLimiter {
    slots_tx: Sender<()>,
    slots_rx: Receiver<()>,
    capacity: usize,
}

impl InFlightLimiter {
    /// Limiter admitting `capacity` units at once (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (slots_tx, slots_rx) = bounded(capacity);
        InFlightLimiter {
            slots_tx,
            slots_rx,
            capacity,
        }
    }

    /// Block until fewer than `capacity` permits are outstanding, then take one.
    pub fn acquire(&self) -> Result<Permit> {
        self.slots_tx
            .send(())
            .map_err(|_| anyhow::anyhow!("in-flight limiter closed"))?;
        Ok(Permit {
            slots_rx: self.slots_rx.clone(),
        })
    }

    /// Permits currently held.
    pub fn in_flight(&self) -> usize {
        self.slots_rx.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// One unit's slot. Released on drop, including when the unit panics.
pub struct Permit {
    slots_rx: Receiver<()>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        let _ = self.slots_rx.try_recv();
    }
}

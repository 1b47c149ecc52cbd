//! Toolkit for the bookkeeping trailer at the tail of firmware image slots.
//!
//! A firmware upgrade swaps two on-flash image slots, optionally through a
//! scratch partition, and has to survive a reset at any point in between. The
//! record that makes this possible is the *image trailer*: a fixed layout at
//! the end of each slot holding the swap progress, the upgrade intent and the
//! confirmation state, arranged so that every cell is written exactly once,
//! in a fixed order, at the flash's write alignment.
//!
//! This crate computes that layout for heterogeneous flash geometries, reads
//! and writes the individual trailer fields, and locates the live record
//! again after an unexpected reset. It consumes a flash abstraction
//! ([`flash::FlashArea`]) and is meant to be driven by an outer boot engine;
//! it takes no boot decision itself and never blocks on anything but the
//! flash operations it issues.
#![no_std]

use core::sync::atomic::{AtomicU8, Ordering};

#[cfg(test)]
extern crate std;

#[cfg(feature = "enc-images")]
pub mod enc;
pub mod fih;
pub mod flash;
pub mod layout;
pub mod magic;
pub mod status;
pub mod strategies;
pub mod trailer;

#[cfg(test)]
mod mock;

#[cfg(all(feature = "use-defmt", not(test)))]
pub(crate) use defmt as log;

#[cfg(all(feature = "use-log", any(not(feature = "use-defmt"), test)))]
pub(crate) use logger_crate as log;

#[cfg(not(any(feature = "use-log", all(feature = "use-defmt", not(test)))))]
pub(crate) mod log {
    macro_rules! debug {
        ( $( $x:expr ),* ) => {};
    }
    pub(crate) use debug;
    macro_rules! error {
        ( $( $x:expr ),* ) => {};
    }
    pub(crate) use error;
}

/// Errors surfaced by the trailer core.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum Error {
    /// The flash driver reported a failure; passed through unchanged.
    Flash,
    /// No probed area carries a valid trailer magic.
    NotFound,
    /// A sector descriptor could not be obtained.
    Geometry,
    /// The operation does not apply to the given area.
    InvalidArea,
}

/// Slot the upgrade driver is currently operating on.
///
/// Context for log lines only; never consulted for control flow.
static CURRENT_SLOT: AtomicU8 = AtomicU8::new(0);

/// Record the slot the outer driver operates on.
///
/// Set once per boot, before the upgrade loop runs.
pub fn set_current_slot(slot: u8) {
    CURRENT_SLOT.store(slot, Ordering::Relaxed);
}

/// Slot last recorded through [`set_current_slot`].
pub fn current_slot() -> u8 {
    CURRENT_SLOT.load(Ordering::Relaxed)
}

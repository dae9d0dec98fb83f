use crate::event_window::EventWindow;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A shared hold on an expired threshold. No event at or above `indicator` is expired while
/// `count` is positive.
#[derive(Debug)]
pub struct Reservation {
    indicator: u64,
    count: AtomicUsize,
}

impl Reservation {
    pub fn new(indicator: u64) -> Self {
        Reservation { indicator, count: AtomicUsize::new(0) }
    }

    pub fn indicator(&self) -> u64 {
        self.indicator
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub(super) fn increment(&self) {
        let _ = self.count.fetch_add(1, Ordering::AcqRel);
    }

    fn decrement(&self) {
        let _ = self.count.fetch_sub(1, Ordering::AcqRel);
    }
}

/// The event window a sync works against, together with the reservation protecting it.
///
/// Dropping the guard releases the reservation. The shadowgraph retires released
/// reservations on its next window update.
#[derive(Debug)]
pub struct ReservedEventWindow {
    window: EventWindow,
    reservation: Arc<Reservation>,
}

impl ReservedEventWindow {
    pub(super) fn new(window: EventWindow, reservation: Arc<Reservation>) -> Self {
        reservation.increment();
        ReservedEventWindow { window, reservation }
    }

    pub fn window(&self) -> &EventWindow {
        &self.window
    }

    pub fn reserved_indicator(&self) -> u64 {
        self.reservation.indicator()
    }

    pub fn reservation_count(&self) -> usize {
        self.reservation.count()
    }
}

impl Drop for ReservedEventWindow {
    fn drop(&mut self) {
        self.reservation.decrement()
    }
}

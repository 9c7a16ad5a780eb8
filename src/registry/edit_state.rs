//! Per-file pending-edit state machine.
//!
//! ```text
//! Idle ──edit──▶ PendingEdit(text, deadline) ──begin──▶ Recomputing(gen, token) ──complete──▶ Idle
//!                     ▲                                        │
//!                     └────────────── edit (supersedes) ───────┘
//! ```
//!
//! A newer edit replaces the pending text and pushes the deadline back. An
//! edit that arrives while a recompute is in flight cancels that recompute's
//! token; its generation can then never complete, so its result is discarded.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

/// Observable phase of an [`EditState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    Idle,
    PendingEdit,
    Recomputing,
    /// A recompute is in flight but already superseded by a pending edit
    Superseded,
}

#[derive(Debug, Clone)]
struct PendingEdit {
    text: Arc<str>,
    deadline: Instant,
}

#[derive(Debug, Clone)]
struct InFlight {
    generation: u64,
    cancel: CancellationToken,
}

/// A recompute handed out by [`EditState::begin`].
#[derive(Debug, Clone)]
pub struct RecomputeTicket {
    pub generation: u64,
    pub text: Arc<str>,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Default)]
pub struct EditState {
    generation: u64,
    pending: Option<PendingEdit>,
    in_flight: Option<InFlight>,
}

impl EditState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> EditPhase {
        match (&self.in_flight, &self.pending) {
            (None, None) => EditPhase::Idle,
            (None, Some(_)) => EditPhase::PendingEdit,
            (Some(flight), _) if flight.cancel.is_cancelled() => EditPhase::Superseded,
            (Some(_), _) => EditPhase::Recomputing,
        }
    }

    /// Record an edit. Returns `true` if an in-flight recompute was superseded.
    pub fn edit(&mut self, text: Arc<str>, deadline: Instant) -> bool {
        self.pending = Some(PendingEdit { text, deadline });
        self.cancel_in_flight()
    }

    /// When the pending edit becomes due.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.pending.as_ref().is_some_and(|p| p.deadline <= now)
    }

    /// Start recomputing the pending text, if any.
    pub fn begin(&mut self) -> Option<RecomputeTicket> {
        let pending = self.pending.take()?;
        self.cancel_in_flight();
        self.generation += 1;
        let cancel = CancellationToken::new();
        self.in_flight = Some(InFlight {
            generation: self.generation,
            cancel: cancel.clone(),
        });
        Some(RecomputeTicket {
            generation: self.generation,
            text: pending.text,
            cancel,
        })
    }

    /// Finish the recompute of `generation`. Returns `true` if its result may
    /// be committed.
    pub fn complete(&mut self, generation: u64) -> bool {
        match &self.in_flight {
            Some(flight) if flight.generation == generation => {
                let live = !flight.cancel.is_cancelled();
                self.in_flight = None;
                live
            }
            _ => false,
        }
    }

    /// Forget pending work and invalidate any in-flight recompute, e.g. when
    /// the file is loaded again or closed. The generation keeps increasing, so
    /// tickets handed out before the reset never complete afterwards.
    pub fn reset(&mut self) {
        self.pending = None;
        self.cancel_in_flight();
        self.in_flight = None;
        self.generation += 1;
    }

    fn cancel_in_flight(&mut self) -> bool {
        match &self.in_flight {
            Some(flight) if !flight.cancel.is_cancelled() => {
                flight.cancel.cancel();
                true
            }
            _ => false,
        }
    }
}

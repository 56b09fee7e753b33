//! Client-side state tracking for asynchronous writes.
//!
//! A tracked mutation moves idle → pending → success | error, then settles.
//! Each call gets a fresh generation number; a completion carrying an older
//! generation is discarded, so an overlapping earlier call can never
//! overwrite the state of a newer one.

use anyhow::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum MutationState<T> {
    Idle,
    Pending,
    Success(T),
    Error(String),
}

/// Observer hooks, invoked in order: on_success or on_error, then
/// on_settled.
#[derive(Default)]
pub struct Callbacks<'a, T> {
    pub on_success: Option<Box<dyn FnMut(&T) + 'a>>,
    pub on_error: Option<Box<dyn FnMut(&str) + 'a>>,
    pub on_settled: Option<Box<dyn FnMut() + 'a>>,
}

pub struct MutateOptions {
    /// When set, a failed operation also propagates to the caller instead
    /// of only landing in tracker state.
    pub rethrow: bool,
}

impl Default for MutateOptions {
    fn default() -> Self {
        Self { rethrow: false }
    }
}

pub struct Tracker<T> {
    state: MutationState<T>,
    generation: u64,
}

impl<T> Default for Tracker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Tracker<T> {
    pub fn new() -> Self {
        Self {
            state: MutationState::Idle,
            generation: 0,
        }
    }

    pub fn state(&self) -> &MutationState<T> {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, MutationState::Pending)
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            MutationState::Error(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.state = MutationState::Idle;
    }

    /// Starts a call: transitions to pending and claims a new generation.
    pub fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.state = MutationState::Pending;
        self.generation
    }

    /// Lands a completion. Returns false (and changes nothing) when the
    /// generation is stale, i.e. a newer call has begun since.
    pub fn finish(&mut self, generation: u64, result: Result<T, String>) -> bool {
        if generation != self.generation {
            log::debug!("discarding stale mutation result (generation {generation})");
            return false;
        }
        self.state = match result {
            Ok(value) => MutationState::Success(value),
            Err(message) => MutationState::Error(message),
        };
        true
    }
}

/// Drives one tracked call: pending first, then the operation, then the
/// callbacks (success/error before settled).
pub fn run<T, F>(
    tracker: &mut Tracker<T>,
    op: F,
    callbacks: &mut Callbacks<'_, T>,
    options: &MutateOptions,
) -> Result<()>
where
    F: FnOnce() -> Result<T>,
{
    let generation = tracker.begin();
    let outcome = match op() {
        Ok(value) => {
            if let Some(cb) = callbacks.on_success.as_mut() {
                cb(&value);
            }
            tracker.finish(generation, Ok(value));
            Ok(())
        }
        Err(err) => {
            let message = format!("{err:#}");
            if let Some(cb) = callbacks.on_error.as_mut() {
                cb(&message);
            }
            tracker.finish(generation, Err(message));
            if options.rethrow {
                Err(err)
            } else {
                Ok(())
            }
        }
    };
    if let Some(cb) = callbacks.on_settled.as_mut() {
        cb();
    }
    outcome
}

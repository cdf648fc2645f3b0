pub mod parsing;
pub mod state;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock controller state, recovering the guard if a previous holder panicked
pub(crate) fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

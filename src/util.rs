//! Small shared helpers.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a std mutex, recovering the data if a previous holder panicked.
///
/// Every mutex guarded by this helper protects plain values (booleans,
/// timestamps, driver handles) that stay consistent even if a holder
/// unwinds, so a panic elsewhere must not take gas detection down with it.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Returns `true` if `c` is in the printable ASCII range `0x20..=0x7E`,
/// which is what an HD44780 character ROM can show.
pub(crate) fn is_printable_ascii(c: char) -> bool {
    (' '..='~').contains(&c)
}

/*!
 * Thread Boundary
 *
 * Scoped release and reacquisition of the execution lock around one
 * blocking native call. Other threads, including the native library's
 * callback threads, can enter managed code while the call is in flight.
 */

use crate::monitoring::NativeCallSpan;
use parking_lot::MutexGuard;

/// Run `call` with the lock behind `guard` released
///
/// The lock is held again when this returns, whether `call` succeeded or
/// not, so its result is only inspected under the lock. Anything read from
/// the guarded state before the call may be stale afterwards.
pub fn blocking<T, R>(
    guard: &mut MutexGuard<'_, T>,
    op: &'static str,
    call: impl FnOnce() -> R,
) -> R {
    let span = NativeCallSpan::new(op);
    MutexGuard::unlocked(guard, || span.in_scope(call))
}

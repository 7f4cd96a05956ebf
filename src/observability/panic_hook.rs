//! Backtrace capture for panicking handlers.
//!
//! `catch_unwind` only sees the payload, so the hook records the stack at the
//! point of the panic in a thread-local slot. The unwind reaches the access
//! log middleware on the same thread, which takes the trace from that slot.
//! The middleware clears the slot before every poll so a payload re-raised
//! with `resume_unwind` (which skips the hook) never picks up an older trace.

use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic;
use std::sync::Once;

thread_local! {
    static LAST_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static INSTALL: Once = Once::new();

/// Chain a backtrace-recording hook in front of the current panic hook.
///
/// Idempotent; later calls are no-ops.
pub fn install() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let trace = Backtrace::force_capture().to_string();
            LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

/// Take the backtrace recorded by the most recent panic on this thread.
pub fn take_backtrace() -> Option<String> {
    LAST_BACKTRACE.with(|slot| slot.borrow_mut().take())
}

/// Discard whatever the last panic on this thread recorded.
pub fn clear() {
    LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = None);
}

#[cfg(test)]
pub(crate) fn record(trace: &str) {
    LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(trace.to_string()));
}

/// Backtrace for a panic caught on this thread, falling back to the
/// current stack when the hook is not installed.
pub fn captured_or_current() -> String {
    take_backtrace().unwrap_or_else(|| Backtrace::force_capture().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_records_backtrace_for_caught_panic() {
        install();
        let _ = take_backtrace();

        let result = panic::catch_unwind(|| panic!("recorded"));
        assert!(result.is_err());

        let trace = take_backtrace();
        assert!(trace.is_some());
        assert!(take_backtrace().is_none(), "slot is cleared on take");
    }

    #[test]
    fn test_clear_discards_recorded_trace() {
        record("stale");
        clear();
        assert!(take_backtrace().is_none());
    }

    #[test]
    fn test_fallback_captures_current_stack() {
        let _ = take_backtrace();
        assert!(!captured_or_current().is_empty());
    }
}

//! Small helpers without a better home.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};

use once_cell::sync::OnceCell;
use rand::seq::SliceRandom;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generates a random string of `len` ASCII letters, upper and lower case.
#[must_use]
pub fn rand_string(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .filter_map(|_| LETTERS.choose(&mut rng))
        .map(|&letter| char::from(letter))
        .collect()
}

/// Returns the byte offsets of every non-overlapping occurrence of `needle`
/// in `haystack`.
#[must_use]
pub fn find_all_indexes(haystack: &str, needle: &str) -> Vec<usize> {
    if needle.is_empty() {
        return Vec::new();
    }
    haystack
        .match_indices(needle)
        .map(|(index, _)| index)
        .collect()
}

/// Renders an error with its cause chain and a stack trace.
///
/// The backtrace captured with the error is used when there is one;
/// otherwise the stack is captured here, at the point of reporting.
#[must_use]
pub fn full_error_message(error: &anyhow::Error) -> String {
    let rendered = format!("{error:?}");
    if error.backtrace().status() == BacktraceStatus::Captured {
        return rendered;
    }
    format!("{rendered}\n\nStack trace:\n{}", Backtrace::force_capture())
}

static TRACE_HOOK: OnceCell<()> = OnceCell::new();

thread_local! {
    static PANIC_TRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

/// Runs `f`, turning a panic into a report of its message followed by the
/// stack captured where the panic was raised.
///
/// The panic hook in place before the first call keeps running, so the
/// usual message still reaches stderr.
pub fn catch_panic<R>(f: impl FnOnce() -> R) -> Result<R, String> {
    install_trace_hook();
    drop(take_panic_trace());
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = panic_message(&*payload);
        match take_panic_trace() {
            Some(trace) => format!("{message}\n\nStack trace:\n{trace}"),
            None => message,
        }
    })
}

fn install_trace_hook() {
    TRACE_HOOK.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let stored = PANIC_TRACE.try_with(|slot| slot.replace(Some(Backtrace::force_capture())));
            drop(stored);
            previous(info);
        }));
    });
}

fn take_panic_trace() -> Option<Backtrace> {
    PANIC_TRACE.try_with(RefCell::take).ok().flatten()
}

/// Renders the payload of a caught panic.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("panic with a non-string payload")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use rstest::rstest;

    #[rstest]
    #[case(0)]
    #[case(10)]
    #[case(25)]
    fn rand_string_has_requested_length_of_letters(#[case] len: usize) {
        let value = rand_string(len);
        assert_eq!(value.len(), len);
        assert!(value.chars().all(|c| c.is_ascii_alphabetic()));
    }

    #[rstest]
    #[case("a|X|b|X|c", "|X|", vec![1, 5])]
    #[case("aaaa", "aa", vec![0, 2])]
    #[case("abc", "z", vec![])]
    #[case("abc", "", vec![])]
    fn find_all_indexes_reports_non_overlapping_matches(
        #[case] haystack: &str,
        #[case] needle: &str,
        #[case] expected: Vec<usize>,
    ) {
        assert_eq!(find_all_indexes(haystack, needle), expected);
    }

    #[test]
    fn full_error_message_includes_causes() {
        let error = Err::<(), _>(std::io::Error::other("disk gone"))
            .context("saving state")
            .expect_err("error expected");
        let message = full_error_message(&error);
        assert!(message.contains("saving state"));
        assert!(message.contains("disk gone"));
    }

    #[test]
    fn full_error_message_always_carries_a_stack_trace() {
        let message = full_error_message(&anyhow::anyhow!("feed unreachable"));
        assert!(message.starts_with("feed unreachable"));
        assert!(message.contains("Stack trace:\n") || message.contains("Stack backtrace:\n"));
    }

    #[test]
    fn catch_panic_reports_message_and_stack() {
        let report = catch_panic(|| -> u32 { panic!("index {} out of range", 3) })
            .expect_err("panics");
        assert!(report.starts_with("index 3 out of range\n\nStack trace:\n"));
        assert!(report.len() > "index 3 out of range\n\nStack trace:\n".len());
    }

    #[test]
    fn catch_panic_passes_values_through() {
        assert_eq!(catch_panic(|| 7), Ok(7));
    }

    #[test]
    fn panic_message_reads_string_payloads() {
        let payload = std::panic::catch_unwind(|| panic!("boom {}", 1)).expect_err("panics");
        assert_eq!(panic_message(&*payload), "boom 1");
    }
}

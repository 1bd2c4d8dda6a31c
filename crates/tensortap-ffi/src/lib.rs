//! tensortap C ABI
//!
//! Stable foreign-call surface over a single process-wide capture store.
//! All mutable state lives behind mutexes in this crate; `tensortap-core`
//! stays global-free.
//!
//! The capture operations return `void` for drop-in compatibility with the
//! instrumented host, so errors travel out-of-band: every failure is logged
//! and recorded in a thread-local slot readable via `tensortap_last_error`.

mod abi;
mod context;

pub use abi::*;
pub use context::CaptureOptions;

use tensortap_core::Error;

/// Runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error codes for C ABI
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Ok = 0,
    GenericFailure = 1,
    InvalidArgument = 2,
    IoError = 3,
    FormatError = 4,
}

impl From<Error> for ErrorCode {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidArgument(_) | Error::InvalidShape(_) => ErrorCode::InvalidArgument,
            Error::Io(_) => ErrorCode::IoError,
            Error::InvalidFormat(_) | Error::ParseError(_) => ErrorCode::FormatError,
        }
    }
}

/// Thread-local error message storage for C ABI
use std::cell::RefCell;

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

pub(crate) fn set_last_error(msg: String) {
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(msg));
}

pub(crate) fn take_last_error() -> Option<String> {
    LAST_ERROR.with(|e| e.borrow_mut().take())
}

//! Core tensor capture primitives for tensortap
//!
//! This crate provides the building blocks for capturing named tensors out of
//! a running process:
//! - Tensor records in the rank-4 shape/byte-stride convention
//! - The in-memory capture store and the label-tagged session log
//! - The self-describing binary container format (save/load)
//!
//! It holds no global state and exposes no FFI; the C ABI lives in
//! `tensortap-ffi`.

pub mod error;
pub mod formats;
pub mod session;
pub mod store;
pub mod tensor;

pub use error::{Error, Result};
pub use formats::capture::{CaptureReader, CaptureWriter, Container, ContainerKind};
pub use session::{Session, SessionLog};
pub use store::CaptureStore;
pub use tensor::{TensorRecord, MAX_DIMS};

/// Core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

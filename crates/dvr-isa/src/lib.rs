//! RISC-V encoding helpers for the dependency-chain taint engine.
//!
//! The taint engine only needs to know what *kind* of arithmetic an
//! instruction performs on a tracked value, so decoding here is narrow:
//! raw bytes are classified into a [`DecodedOp`] carrying one of a handful
//! of [`OpKind`]s. Everything else decodes as [`OpKind::Unrecognized`].
//! Field dumps for diagnostics live in [`disasm`].

mod decode;
pub mod disasm;
mod encode;
mod types;

pub use decode::*;
pub use encode::*;
pub use types::*;

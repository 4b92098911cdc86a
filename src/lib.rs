#![forbid(unsafe_code)]

//! Line-oriented request/response sessions with a child process over
//! named pipes.
//!
//! A [`Session`] supervises one long-lived child process whose stdin and
//! stdout are bound to two FIFOs. Commands are newline-terminated text
//! lines; the child marks the end of each response with a configurable
//! sentinel line. A background reader drains the output pipe into an
//! ordered queue so callers can collect responses with blocking or
//! timeout-bounded reads, and a dead child is relaunched lazily on the
//! next interaction.

pub mod config;
pub mod errors;
pub mod pipes;
pub mod session;

pub use config::SessionConfig;
pub use errors::{AppError, Result};
pub use session::{Response, Session};

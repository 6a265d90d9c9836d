//! Pipeline stages for one conversion request.
//!
//! Each submodule implements exactly one step; [`crate::convert`] chains them.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ invoke ──▶ (images) ──▶ shape
//! (JSON)    (backend)   (export)     (status + headers + body)
//! ```
//!
//! 1. [`input`]: request body → `ConversionRequest`, or an input error
//! 2. [`invoke`]: exactly one backend call; the only stage with network I/O
//! 3. [`images`]: lift data-URI images out of the markdown (export mode only)
//! 4. [`shape`]: JSON body, zip attachment, or structured error

pub mod images;
pub mod input;
pub mod invoke;
pub mod shape;

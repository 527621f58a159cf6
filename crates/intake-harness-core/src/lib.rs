//! # Intake Harness Core
//!
//! Pure extraction logic for Intake Harness: binary readers, document and
//! page text extractors, the shared data model and the prefill merge rule.
//!
//! Nothing here performs I/O, spawns tasks or keeps state between calls.
//! Every function takes a buffer and returns a new value, so all of it is
//! safe to call from any thread or from inside an async task.
//!
//! | Module | Input | Output |
//! |--------|-------|--------|
//! | [`bytes`] | `&[u8]` | bounds-checked little-endian reads |
//! | [`inflate`] | raw DEFLATE | inflated bytes |
//! | [`zip`] | ZIP container | one entry payload |
//! | [`pdf`] | PDF bytes | text lines |
//! | [`docx`] | DOCX bytes | paragraph lines |
//! | [`html`] | page markup | labeled sections, Open Graph tags |

pub mod bytes;
pub mod docx;
pub mod error;
pub mod html;
pub mod inflate;
pub mod models;
pub mod pdf;
pub mod prefill;
pub mod text;
pub mod zip;

pub use error::{DecompressionError, ExtractError, OutOfBounds, ZipError};
pub use models::{
    Confidence, DocumentRecord, ExtractedText, FailureReason, PrefillEntity, PrefillField,
    SourceName, SourceOutcome, SourceStatus,
};

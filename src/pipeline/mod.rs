//! Pipeline stages for roster-PDF-to-records conversion.
//!
//! Each submodule implements exactly one step. Only [`input`] and
//! [`extract`] touch the outside world; everything downstream of a
//! [`extract::PageTokens`] value is pure and can be tested with
//! hand-built tokens.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ assemble ──▶ address / dates ──▶ driver
//! (URL/path) (pdfium)   (rows)       (finalise)          (ordered records)
//! ```
//!
//! 1. [`input`]    — canonicalise the user-supplied path or URL to a local file
//! 2. [`extract`]  — read the text layer into word tokens; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`columns`]  — x-position to column lookup
//! 4. [`assemble`] — group one page's tokens into rows, merging
//!    continuation lines
//! 5. [`address`] / [`dates`] — decompose the address and normalise dates
//! 6. [`driver`]   — run the above over every page in order

pub mod address;
pub mod assemble;
pub mod columns;
pub mod dates;
pub mod driver;
pub mod extract;
pub mod input;

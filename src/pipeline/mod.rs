//! Pipeline stages for question/answer deck generation.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the storage backend can change without touching
//! rendering.
//!
//! ## Data Flow
//!
//! ```text
//! request ──▶ fit ──▶ deck ──▶ package ──▶ scratch ──▶ commit
//! (JSON)    (text)  (slides)  (.pptx)    (TempDir)   (DeckStore)
//! ```
//!
//! 1. [`request`]: validate the body, coerce odd cells to text
//! 2. [`fit`]: normalise and truncate text to a block's capacity
//! 3. [`deck`]: framing slide + one slide per record, laid out
//! 4. [`package`]: serialise to PresentationML using [`template`] parts;
//!    runs in `spawn_blocking` because zip deflate is CPU-bound
//! 5. [`scratch`]: write the file into a per-request partition
//! 6. [`commit`]: the single storage write; the only stage with network I/O

pub mod commit;
pub mod deck;
pub mod fit;
pub mod package;
pub mod request;
pub mod scratch;
pub mod template;

//! Phantom overlay module.
//!
//! Phantoms are client-only messages spliced in front of a remote
//! conversation tree on every read. They are never sent to the remote
//! service.
//!
//! # Module Structure
//!
//! - `marker`: Invisible text marker identifying phantom text
//! - `model`: `PhantomMessage` and the chained `PhantomSequence`
//! - `inject`: Normalization and injection into a raw conversation body
//! - `repository`: Persistence trait

mod inject;
mod marker;
mod model;
mod repository;

// Re-export public API
pub use inject::{inject_phantom_messages, is_phantom, normalize_phantom};
pub use marker::{PHANTOM_MARKER, is_phantom_text, mark, strip_marker};
pub use model::{PhantomMessage, PhantomSequence};
pub use repository::OverlayRepository;

//! Invisible marker appended to phantom text.
//!
//! The marker survives any normalization the UI applies to message structure,
//! so "is this a phantom?" can always be answered from the text alone.

/// Zero-width sequence appended to every phantom text block.
pub const PHANTOM_MARKER: &str = "\u{200B}\u{200C}\u{200B}";

/// Returns `text` with exactly one trailing marker.
pub fn mark(text: &str) -> String {
    let mut marked = strip_marker(text);
    marked.push_str(PHANTOM_MARKER);
    marked
}

/// Removes every occurrence of the marker.
pub fn strip_marker(text: &str) -> String {
    text.replace(PHANTOM_MARKER, "")
}

/// True if `text` carries the marker.
pub fn is_phantom_text(text: &str) -> bool {
    text.contains(PHANTOM_MARKER)
}

//! External text formats: Logseq/markdown outlines, clipboard payloads and
//! Tana exports.

pub mod clipboard;
pub mod logseq;
pub mod markdown;
pub mod tana;

pub use clipboard::{ClipboardContents, NODE_IDS_MIME};
pub use markdown::{to_markdown, to_outline_markdown, Flavor};

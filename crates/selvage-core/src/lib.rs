//! selvage-core: the markup engine behind a rich-text control.
//!
//! This crate provides:
//! - `parse_markup` - one-pass interpreter for the inline tag language,
//!   producing de-tagged text, per-byte style ids, link/fold records, and
//!   embedded code spans
//! - `StyleTable` - deduplicated style descriptors behind small integer ids
//! - `PositionIndex` - byte-offset ⇄ UTF-16-offset translation over the
//!   host's buffer
//! - `TagResolver`/`TagRegistry` - built-in plus caller-registered tag names
//!
//! Text storage, rendering, and input handling belong to the surrounding
//! control; see [`TextSource`] and [`EditNotice`] for the seam.

pub mod document;
pub mod error;
pub mod parser;
pub mod position;
pub mod registry;
pub mod resolver;
pub mod style;

pub use document::{EditNotice, TextSource, shift_range};
pub use error::OffsetError;
pub use parser::{
    CodeStyler, MESSAGE_SEPARATOR, ParserContext, ParserOptions, parse_markup,
};
pub use position::PositionIndex;
pub use registry::{CodeSpan, FoldRecord, LinkRecord, ParseOutput};
pub use resolver::{
    BuiltinTags, LINK_SIGIL, Resolver, STYLE_SIGIL, TagRegistry, TagResolution, TagResolver,
};
pub use smol_str::SmolStr;
pub use style::{Color, STYLE_POOL_CAP, Style, StyleId, StylePatch, StyleTable};

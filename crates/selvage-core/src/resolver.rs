//! Tag-name resolution.
//!
//! The parser asks a [`TagResolver`] once per lexed tag name and acts on the
//! returned [`TagResolution`]. Built-in names live in a fixed table;
//! caller-registered names carry a sigil prefix and live in a
//! [`TagRegistry`] the host owns. [`Resolver`] combines the two.

use std::collections::HashMap;

use smol_str::SmolStr;

use crate::style::{Color, StylePatch};

/// Leading character marking a caller-registrable link tag name.
pub const LINK_SIGIL: u8 = b'!';

/// Leading character marking a caller-registrable style tag name.
pub const STYLE_SIGIL: u8 = b'$';

/// What a tag name means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagResolution {
    /// Push a style span merging this patch over the active style.
    Style(StylePatch),
    /// Push a clickable span; `handler` is the registration id for
    /// caller-registered link tags, `None` for built-ins.
    Link { handler: Option<u32> },
    /// Push a foldable span.
    Fold,
    /// Copy the body uninterpreted until the span's closer.
    Verbatim,
    /// Copy the body uninterpreted, record it, and let the host's code
    /// styler repaint it.
    Code,
    /// Swallow the line break immediately following the tag.
    SkipNewline,
    /// Sigil-prefixed but not registered: suppress the span's content.
    Hidden,
    /// Not a known tag at all: re-emit the tag text literally.
    Unknown,
}

/// Resolution capability the parser is generic over.
///
/// `name` arrives as lexed, sigil included; `attr` is the raw attribute
/// text when the tag carried one. Resolution must be pure: the parser may
/// query any name any number of times.
pub trait TagResolver {
    fn resolve(&self, name: &str, attr: Option<&str>) -> TagResolution;
}

/// The fixed built-in tag table.
///
/// Names match ASCII-case-insensitively. Style-tag attributes are parsed
/// here so resolution hands the parser a ready [`StylePatch`]; an
/// unparseable color or size simply contributes nothing (tolerant styling).
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTags;

impl TagResolver for BuiltinTags {
    fn resolve(&self, name: &str, attr: Option<&str>) -> TagResolution {
        let mut lower = [0u8; 8];
        let Some(name) = ascii_lower(name, &mut lower) else {
            return TagResolution::Unknown;
        };
        match name {
            "b" => TagResolution::Style(StylePatch {
                bold: true,
                ..StylePatch::default()
            }),
            "i" => TagResolution::Style(StylePatch {
                italic: true,
                ..StylePatch::default()
            }),
            "bi" => TagResolution::Style(StylePatch {
                bold: true,
                italic: true,
                ..StylePatch::default()
            }),
            "u" => TagResolution::Style(StylePatch {
                underline: true,
                ..StylePatch::default()
            }),
            "c" => TagResolution::Style(StylePatch {
                fg: attr.and_then(Color::parse),
                ..StylePatch::default()
            }),
            "bc" => TagResolution::Style(StylePatch {
                bg: attr.and_then(Color::parse),
                ..StylePatch::default()
            }),
            "hl" => TagResolution::Style(StylePatch {
                bg: attr.and_then(Color::parse),
                eol_fill: true,
                ..StylePatch::default()
            }),
            "s" => TagResolution::Style(StylePatch {
                size: attr.and_then(|a| a.trim().parse().ok()),
                ..StylePatch::default()
            }),
            "m" => TagResolution::Style(StylePatch {
                monospace: true,
                ..StylePatch::default()
            }),
            "nonl" => TagResolution::SkipNewline,
            "raw" => TagResolution::Verbatim,
            "code" => TagResolution::Code,
            "fold" => TagResolution::Fold,
            "link" | "help" | "explore" | "open" | "script" | "google" => {
                TagResolution::Link { handler: None }
            }
            _ => TagResolution::Unknown,
        }
    }
}

/// Caller-registered tag names, keyed without their sigil.
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    links: HashMap<SmolStr, u32>,
    styles: HashMap<SmolStr, StylePatch>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a link tag reachable as `<!name ...>`. The handler id comes
    /// back on every [`crate::LinkRecord`] the tag produces.
    pub fn register_link(&mut self, name: &str, handler: u32) {
        self.links
            .insert(SmolStr::new(name.to_ascii_lowercase()), handler);
    }

    /// Register a style tag reachable as `<$name>`.
    pub fn register_style(&mut self, name: &str, patch: StylePatch) {
        self.styles
            .insert(SmolStr::new(name.to_ascii_lowercase()), patch);
    }

    fn link(&self, name: &str) -> Option<u32> {
        self.links.get(&lower_key(name)).copied()
    }

    fn style(&self, name: &str) -> Option<StylePatch> {
        self.styles.get(&lower_key(name)).copied()
    }
}

fn lower_key(name: &str) -> SmolStr {
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        SmolStr::new(name.to_ascii_lowercase())
    } else {
        SmolStr::new(name)
    }
}

/// Built-in table plus an optional registry, dispatched by sigil.
///
/// Sigil names that miss the registry resolve to [`TagResolution::Hidden`]:
/// sigils are only written on purpose, so an unregistered one is presumed a
/// caller error and its content is suppressed rather than shown. Sigil-free
/// misses resolve to [`TagResolution::Unknown`] and re-emit literally —
/// innocuous `<text>` that was never meant as a tag must not vanish.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver<'a> {
    registry: Option<&'a TagRegistry>,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a TagRegistry) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    /// Built-ins only; every sigil name resolves Hidden.
    pub fn builtin_only() -> Self {
        Self { registry: None }
    }
}

impl TagResolver for Resolver<'_> {
    fn resolve(&self, name: &str, attr: Option<&str>) -> TagResolution {
        match name.as_bytes().first() {
            Some(&LINK_SIGIL) => {
                match self.registry.and_then(|r| r.link(&name[1..])) {
                    Some(handler) => TagResolution::Link {
                        handler: Some(handler),
                    },
                    None => TagResolution::Hidden,
                }
            }
            Some(&STYLE_SIGIL) => match self.registry.and_then(|r| r.style(&name[1..])) {
                Some(patch) => TagResolution::Style(patch),
                None => TagResolution::Hidden,
            },
            _ => BuiltinTags.resolve(name, attr),
        }
    }
}

/// Lowercase `name` into `buf` if it fits; built-in names are all short, so
/// anything longer cannot match and resolves Unknown without allocating.
fn ascii_lower<'b>(name: &str, buf: &'b mut [u8; 8]) -> Option<&'b str> {
    let bytes = name.as_bytes();
    if bytes.len() > buf.len() {
        return None;
    }
    for (dst, src) in buf.iter_mut().zip(bytes) {
        *dst = src.to_ascii_lowercase();
    }
    std::str::from_utf8(&buf[..bytes.len()]).ok()
}

//! Style descriptors and the bounded interning table.
//!
//! A parse resolves every tag nesting into a flat `Style` descriptor and
//! interns it for a small integer id, so the per-byte style buffer stays one
//! byte per output byte.

use std::collections::HashMap;

/// Index into a [`StyleTable`]. Id 0 is always the default style.
pub type StyleId = u8;

/// Maximum number of distinct styles one table holds.
///
/// The pool deliberately stays below the 256 ids a one-byte buffer can
/// express; hosts reserve the ids above this range for their own chrome
/// (margins, markers). Interning past the cap degrades silently, see
/// [`StyleTable::intern`].
pub const STYLE_POOL_CAP: usize = 216;

/// 24-bit RGB color, `0xRRGGBB`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    /// Parse a color attribute: `#RRGGBB` hex or one of a small named set.
    ///
    /// Returns `None` for anything else; callers treat an unparseable color
    /// as an absent one (tolerant styling, never an error).
    pub fn parse(attr: &str) -> Option<Self> {
        let attr = attr.trim();
        if let Some(hex) = attr.strip_prefix('#') {
            if hex.len() == 6 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return u32::from_str_radix(hex, 16).ok().map(Color);
            }
            return None;
        }
        let named = match attr.to_ascii_lowercase().as_str() {
            "black" => 0x000000,
            "white" => 0xFFFFFF,
            "red" => 0xFF0000,
            "green" => 0x00FF00,
            "blue" => 0x0000FF,
            "yellow" => 0xFFFF00,
            "cyan" => 0x00FFFF,
            "magenta" => 0xFF00FF,
            "gray" | "grey" => 0x808080,
            _ => return None,
        };
        Some(Color(named))
    }
}

/// A fully resolved style descriptor.
///
/// Unset fields mean "whatever the host's base style says". Structural
/// equality is what the interning table pools on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Style {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    /// Point size override.
    pub size: Option<u16>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Paint the back color to the end of the line, not just the run.
    pub eol_fill: bool,
    pub monospace: bool,
    /// Clickable region; forced on by link tags.
    pub hotspot: bool,
}

impl Style {
    /// Merge a tag's declared attributes over this descriptor.
    ///
    /// Unset patch fields inherit from `self`; set fields override. The
    /// eol-fill flag is the exception: it is never inherited into children,
    /// only the patch that declares a whole-line back color carries it.
    pub fn apply(&self, patch: &StylePatch) -> Self {
        Self {
            fg: patch.fg.or(self.fg),
            bg: patch.bg.or(self.bg),
            size: patch.size.or(self.size),
            bold: self.bold || patch.bold,
            italic: self.italic || patch.italic,
            underline: self.underline || patch.underline,
            eol_fill: patch.eol_fill,
            monospace: self.monospace || patch.monospace,
            hotspot: self.hotspot || patch.hotspot,
        }
    }
}

/// The attributes one opened tag declares, before merging with the
/// surrounding style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StylePatch {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub size: Option<u16>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub eol_fill: bool,
    pub monospace: bool,
    pub hotspot: bool,
}

/// Pool of deduplicated style descriptors, referenced by [`StyleId`].
///
/// Ids are stable between [`StyleTable::clear`] calls; the host clears the
/// table whenever it replaces its entire text.
#[derive(Debug, Clone)]
pub struct StyleTable {
    styles: Vec<Style>,
    ids: HashMap<Style, StyleId>,
}

impl Default for StyleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleTable {
    pub fn new() -> Self {
        let default = Style::default();
        let mut ids = HashMap::new();
        ids.insert(default, 0);
        Self {
            styles: vec![default],
            ids,
        }
    }

    /// Intern a descriptor, returning its id.
    ///
    /// Structural equality maps to the same id. When the pool is full the
    /// caller's `current` id is returned instead of an error: the text keeps
    /// its surrounding style, a purely cosmetic degradation.
    pub fn intern(&mut self, style: Style, current: StyleId) -> StyleId {
        if let Some(&id) = self.ids.get(&style) {
            return id;
        }
        if self.styles.len() >= STYLE_POOL_CAP {
            tracing::trace!(
                target: "selvage::style",
                pool = self.styles.len(),
                "style pool full, keeping current id"
            );
            return current;
        }
        let id = self.styles.len() as StyleId;
        self.styles.push(style);
        self.ids.insert(style, id);
        id
    }

    /// Look up a descriptor by id.
    pub fn get(&self, id: StyleId) -> Option<&Style> {
        self.styles.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Drop every interned style except the default.
    ///
    /// The unit of cache invalidation: called when the host replaces its
    /// whole text. Previously handed-out ids are dangling afterwards.
    pub fn clear(&mut self) {
        self.styles.clear();
        self.ids.clear();
        let default = Style::default();
        self.styles.push(default);
        self.ids.insert(default, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parse_hex() {
        assert_eq!(Color::parse("#00FF00"), Some(Color(0x00FF00)));
        assert_eq!(Color::parse("#abcdef"), Some(Color(0xABCDEF)));
        assert_eq!(Color::parse("#12345"), None);
        assert_eq!(Color::parse("#12345G"), None);
    }

    #[test]
    fn test_color_parse_named() {
        assert_eq!(Color::parse("red"), Some(Color(0xFF0000)));
        assert_eq!(Color::parse("RED"), Some(Color(0xFF0000)));
        assert_eq!(Color::parse("chartreuse"), None);
    }

    #[test]
    fn test_apply_inherits_unset_fields() {
        let parent = Style {
            fg: Some(Color(0xFF0000)),
            bold: true,
            ..Style::default()
        };
        let patch = StylePatch {
            italic: true,
            ..StylePatch::default()
        };
        let merged = parent.apply(&patch);
        assert_eq!(merged.fg, Some(Color(0xFF0000)));
        assert!(merged.bold);
        assert!(merged.italic);
    }

    #[test]
    fn test_apply_does_not_inherit_eol_fill() {
        let parent = Style {
            bg: Some(Color(0x333333)),
            eol_fill: true,
            ..Style::default()
        };
        let merged = parent.apply(&StylePatch::default());
        assert_eq!(merged.bg, Some(Color(0x333333)));
        assert!(!merged.eol_fill);
    }

    #[test]
    fn test_intern_dedupes() {
        let mut table = StyleTable::new();
        let bold = Style {
            bold: true,
            ..Style::default()
        };
        let a = table.intern(bold, 0);
        let b = table.intern(bold, 0);
        assert_eq!(a, b);
        assert_eq!(table.len(), 2);
        assert_eq!(table.intern(Style::default(), 0), 0);
    }

    #[test]
    fn test_intern_degrades_at_capacity() {
        let mut table = StyleTable::new();
        for size in 0..STYLE_POOL_CAP as u16 {
            let style = Style {
                size: Some(size + 1),
                ..Style::default()
            };
            table.intern(style, 0);
        }
        assert_eq!(table.len(), STYLE_POOL_CAP);
        let overflow = Style {
            size: Some(9999),
            ..Style::default()
        };
        let current: StyleId = 7;
        assert_eq!(table.intern(overflow, current), current);
        assert_eq!(table.len(), STYLE_POOL_CAP);
    }

    #[test]
    fn test_clear_resets_to_default() {
        let mut table = StyleTable::new();
        table.intern(
            Style {
                bold: true,
                ..Style::default()
            },
            0,
        );
        table.clear();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0), Some(&Style::default()));
    }
}

//! Records produced by one parse.
//!
//! Pure accumulation: the parser appends, the caller drains the finished
//! [`ParseOutput`] once and applies it to its own storage. Nothing here
//! carries state across parses.

use std::borrow::Cow;
use std::ops::Range;

use smol_str::SmolStr;

use crate::style::StyleId;

/// A clickable span in the output text.
///
/// Emitted when a link tag's stack entry pops. Offsets are bytes into the
/// de-tagged output, not the raw input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub start: usize,
    pub end: usize,
    /// Tag name as written (case preserved).
    pub name: SmolStr,
    /// The tag's attribute, or the span's inner text when no attribute was
    /// given.
    pub payload: SmolStr,
    /// Registration id for caller-registered link tags.
    pub handler: Option<u32>,
}

impl LinkRecord {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Split the payload at its first `|`: link target before, display or
    /// argument text after. `None` when the payload has no separator.
    pub fn payload_pair(&self) -> (&str, Option<&str>) {
        match self.payload.split_once('|') {
            Some((target, rest)) => (target, Some(rest)),
            None => (self.payload.as_str(), None),
        }
    }
}

/// A foldable span in the output text.
///
/// `start..end` covers the folded body; `placeholder` covers the visible
/// toggle inserted right after it. Records are pushed in close order, so
/// inner folds precede the folds containing them: consumers walk the list
/// in reverse to assign fold depth outside-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldRecord {
    pub start: usize,
    pub end: usize,
    pub placeholder: Range<usize>,
}

impl FoldRecord {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// An embedded code body: output range plus the raw source bytes, for the
/// host's code styler to repaint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSpan {
    pub range: Range<usize>,
    /// Language hint from the tag attribute, if any.
    pub lang: Option<SmolStr>,
    pub source: Vec<u8>,
}

/// Everything one parse produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutput {
    /// De-tagged text bytes.
    pub text: Vec<u8>,
    /// Style id per output byte. `None` when no tag was recognized at all:
    /// the whole text is one implicit default run and callers skip the
    /// per-byte pass entirely.
    pub styles: Option<Vec<StyleId>>,
    pub links: Vec<LinkRecord>,
    pub folds: Vec<FoldRecord>,
    pub code_spans: Vec<CodeSpan>,
}

impl ParseOutput {
    /// Output text as a string, replacing any invalid UTF-8 the input
    /// carried.
    pub fn text_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.text)
    }

    /// Style id at an output byte; the implicit default when the per-byte
    /// buffer was omitted.
    pub fn style_at(&self, offset: usize) -> StyleId {
        self.styles
            .as_ref()
            .and_then(|s| s.get(offset).copied())
            .unwrap_or(0)
    }
}

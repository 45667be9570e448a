//! Scratch state for the markup parser.
//!
//! The context is caller-owned so repeated parses on one thread reuse the
//! stack allocation instead of growing a fresh one per call. It must not be
//! shared across concurrently running parses.

use smol_str::SmolStr;

use crate::style::StyleId;

/// What kind of span an open tag started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Style,
    Link,
    Fold,
    /// Unregistered sigil tag: content suppressed until the close.
    Hidden,
}

/// One entry on the open-tag stack.
///
/// Pushed when a tag opens, popped by any close tag; the whole stack is
/// cleared by the message separator and at parse start.
#[derive(Debug, Clone)]
pub struct OpenTag {
    pub kind: TagKind,
    /// Style id active before this tag opened; restored on close.
    pub restore_style: StyleId,
    /// Output byte offset where the span's content begins.
    pub out_start: usize,
    /// Tag name as written.
    pub name: SmolStr,
    /// Raw attribute text, if the tag carried one.
    pub attr: Option<SmolStr>,
    /// Registration id for caller-registered link tags.
    pub handler: Option<u32>,
}

/// Reusable parser scratch, owned by the caller.
#[derive(Debug, Clone, Default)]
pub struct ParserContext {
    pub(crate) stack: Vec<OpenTag>,
}

impl ParserContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open-tag nesting depth; diagnostic only.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn reset(&mut self) {
        self.stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_clears_stack() {
        let mut ctx = ParserContext::new();
        ctx.stack.push(OpenTag {
            kind: TagKind::Style,
            restore_style: 0,
            out_start: 0,
            name: SmolStr::new("b"),
            attr: None,
            handler: None,
        });
        assert_eq!(ctx.depth(), 1);
        ctx.reset();
        assert_eq!(ctx.depth(), 0);
    }
}

//! The inline-tag markup parser.
//!
//! One left-to-right pass over raw bytes produces de-tagged text, a
//! per-byte style-id buffer, link and fold records, and embedded code
//! spans. Malformed markup never fails: the parser re-emits what it could
//! not interpret and keeps going, so the worst outcome of bad input is
//! plain-looking text, never lost text.

mod state;
mod tags;


pub use state::{OpenTag, ParserContext, TagKind};

use smol_str::SmolStr;

use crate::registry::{CodeSpan, FoldRecord, LinkRecord, ParseOutput};
use crate::resolver::TagResolver;
use crate::style::{StyleId, StyleTable};

/// The hard-reset / message separator token.
///
/// Three bytes, framed in the tag bracket so the scanner dispatches on `<`
/// alone; the GS byte cannot appear in real text. Hosts emit it between
/// independently tagged chunks so an unclosed tag in one chunk cannot leak
/// styling into the next.
pub const MESSAGE_SEPARATOR: [u8; 3] = [b'<', 0x1D, b'>'];

/// Caller-tunable parse behavior.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Visible toggle text injected after a folded span when the fold tag
    /// itself does not name one.
    pub fold_placeholder: SmolStr,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            fold_placeholder: SmolStr::new("\u{bb}"),
        }
    }
}

/// Host callback that repaints embedded code bodies.
///
/// Invoked synchronously mid-parse with the raw source of the span and the
/// style-buffer slice covering exactly that span in the output; whatever ids
/// it writes there survive the parse untouched. Implementations must not
/// re-enter the parser.
pub trait CodeStyler {
    fn style_code(&mut self, source: &[u8], lang: Option<&str>, styles: &mut [StyleId]);
}

/// No-op styler for hosts without one.
impl CodeStyler for () {
    fn style_code(&mut self, _source: &[u8], _lang: Option<&str>, _styles: &mut [StyleId]) {}
}

/// Parse one chunk of tagged bytes.
///
/// `styles` persists across parses of one document batch (ids in earlier
/// outputs stay valid until the host clears it); `ctx` is reusable scratch.
/// Never returns an error: see the module docs for the recovery rules.
pub fn parse_markup<'a, R: TagResolver>(
    source: &'a [u8],
    options: &'a ParserOptions,
    resolver: &'a R,
    styles: &'a mut StyleTable,
    ctx: &'a mut ParserContext,
    code_styler: Option<&'a mut dyn CodeStyler>,
) -> ParseOutput {
    MarkupParser {
        source,
        pos: 0,
        options,
        resolver,
        table: styles,
        ctx,
        code_styler,
        current: 0,
        hidden_depth: 0,
        text: Vec::with_capacity(source.len()),
        style_buf: None,
        links: Vec::new(),
        folds: Vec::new(),
        code_spans: Vec::new(),
    }
    .run()
}

pub(crate) struct MarkupParser<'a, R: TagResolver> {
    // === Input ===
    pub(crate) source: &'a [u8],
    pub(crate) pos: usize,
    pub(crate) options: &'a ParserOptions,
    pub(crate) resolver: &'a R,

    // === Collaborators ===
    pub(crate) table: &'a mut StyleTable,
    pub(crate) ctx: &'a mut ParserContext,
    pub(crate) code_styler: Option<&'a mut dyn CodeStyler>,

    // === Scan state ===
    pub(crate) current: StyleId,
    pub(crate) hidden_depth: usize,

    // === Output ===
    pub(crate) text: Vec<u8>,
    pub(crate) style_buf: Option<Vec<StyleId>>,
    pub(crate) links: Vec<LinkRecord>,
    pub(crate) folds: Vec<FoldRecord>,
    pub(crate) code_spans: Vec<CodeSpan>,
}

impl<R: TagResolver> MarkupParser<'_, R> {
    fn run(mut self) -> ParseOutput {
        self.ctx.reset();
        while self.pos < self.source.len() {
            match find_byte(self.source, b'<', self.pos) {
                Some(lt) => {
                    self.copy_range(self.pos, lt);
                    self.pos = lt;
                    self.handle_tag();
                }
                None => {
                    self.copy_range(self.pos, self.source.len());
                    self.pos = self.source.len();
                }
            }
        }
        tracing::debug!(
            target: "selvage::markup",
            input_bytes = self.source.len(),
            output_bytes = self.text.len(),
            links = self.links.len(),
            folds = self.folds.len(),
            code_spans = self.code_spans.len(),
            styled = self.style_buf.is_some(),
            open_tags = self.ctx.stack.len(),
            "markup parse complete"
        );
        ParseOutput {
            text: self.text,
            styles: self.style_buf,
            links: self.links,
            folds: self.folds,
            code_spans: self.code_spans,
        }
    }

    /// Copy source bytes to the output under the current style. Suppressed
    /// inside a hidden span.
    pub(crate) fn copy_range(&mut self, start: usize, end: usize) {
        if self.hidden_depth > 0 || start >= end {
            return;
        }
        self.text.extend_from_slice(&self.source[start..end]);
        if let Some(buf) = &mut self.style_buf {
            buf.resize(self.text.len(), self.current);
        }
    }

    /// Append generated bytes (not from the source) under an explicit style.
    pub(crate) fn emit_bytes(&mut self, bytes: &[u8], style: StyleId) {
        if self.hidden_depth > 0 {
            return;
        }
        self.text.extend_from_slice(bytes);
        if let Some(buf) = &mut self.style_buf {
            buf.resize(self.text.len(), style);
        }
    }

    /// Materialize the per-byte style buffer.
    ///
    /// Until the first recognized tag every output byte is default-styled,
    /// so the buffer starts as zeros over what was already copied; callers
    /// that never hit a recognized tag get `styles: None` back and skip the
    /// per-byte pass entirely.
    pub(crate) fn ensure_styles(&mut self) {
        if self.style_buf.is_none() {
            self.style_buf = Some(vec![0; self.text.len()]);
        }
    }
}

pub(crate) fn find_byte(haystack: &[u8], needle: u8, from: usize) -> Option<usize> {
    haystack[from..]
        .iter()
        .position(|&b| b == needle)
        .map(|i| from + i)
}

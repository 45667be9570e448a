//! Tag handling for the markup parser: close tags, the message separator,
//! open-tag lexing, and the per-resolution actions.

use smol_str::SmolStr;

use crate::registry::{CodeSpan, FoldRecord, LinkRecord};
use crate::resolver::{LINK_SIGIL, STYLE_SIGIL, TagResolution, TagResolver};
use crate::style::StylePatch;

use super::state::{OpenTag, TagKind};
use super::{MESSAGE_SEPARATOR, MarkupParser, find_byte};

impl<R: TagResolver> MarkupParser<'_, R> {
    /// Interpret the tag starting at `self.pos` (which sits on a `<`).
    pub(crate) fn handle_tag(&mut self) {
        let lt = self.pos;
        let src = self.source;

        if src[lt..].starts_with(&MESSAGE_SEPARATOR) {
            // Hard reset between independently tagged chunks: open tags and
            // style state must not leak across the boundary.
            tracing::trace!(target: "selvage::markup", pos = lt, "message separator, state reset");
            self.ctx.reset();
            self.hidden_depth = 0;
            self.current = 0;
            self.pos = lt + MESSAGE_SEPARATOR.len();
            return;
        }

        match src.get(lt + 1) {
            // Lone '<' at end of input.
            None => self.recover_literal(),
            Some(&b'>') => {
                self.pos = lt + 2;
                self.close_innermost();
            }
            Some(&b'/') => match find_byte(src, b'>', lt + 2) {
                Some(gt) => {
                    // The closing tag's content is never validated; any
                    // name closes the innermost entry.
                    self.pos = gt + 1;
                    self.close_innermost();
                }
                None => self.recover_literal(),
            },
            Some(_) => self.open_tag(lt),
        }
    }

    /// Lex an open tag: name, optional attribute, `>`. Any shortfall
    /// (no name letters, unterminated quote, missing `>`) recovers by
    /// re-emitting the literal `<` and resuming right after it.
    fn open_tag(&mut self, lt: usize) {
        let src = self.source;
        let mut i = lt + 1;

        let name_start = i;
        if matches!(src.get(i), Some(&LINK_SIGIL | &STYLE_SIGIL | &b'_')) {
            i += 1;
        }
        let letters_start = i;
        while i < src.len() && src[i].is_ascii_alphabetic() {
            i += 1;
        }
        if i == letters_start {
            self.recover_literal();
            return;
        }
        let name_end = i;

        while i < src.len() && (src[i] == b' ' || src[i] == b'\t') {
            i += 1;
        }

        let attr_range = match src.get(i) {
            None => {
                self.recover_literal();
                return;
            }
            Some(&b'>') => None,
            Some(&quote @ (b'\'' | b'"')) => {
                let attr_start = i + 1;
                let Some(close) = find_byte(src, quote, attr_start) else {
                    self.recover_literal();
                    return;
                };
                let Some(gt) = find_byte(src, b'>', close + 1) else {
                    self.recover_literal();
                    return;
                };
                i = gt;
                Some((attr_start, close))
            }
            Some(_) => {
                let Some(gt) = find_byte(src, b'>', i) else {
                    self.recover_literal();
                    return;
                };
                // Unquoted attributes run to the '>' but stop at a quote.
                let mut end = gt;
                if let Some(q) = src[i..gt]
                    .iter()
                    .position(|&b| b == b'\'' || b == b'"')
                {
                    end = i + q;
                }
                while end > i && (src[end - 1] == b' ' || src[end - 1] == b'\t') {
                    end -= 1;
                }
                let range = (end > i).then_some((i, end));
                i = gt;
                range
            }
        };
        let tag_end = i + 1;

        let name = std::str::from_utf8(&src[name_start..name_end]).unwrap_or("");
        let attr_text: Option<SmolStr> = attr_range
            .map(|(start, end)| SmolStr::new(String::from_utf8_lossy(&src[start..end])));

        let resolution = self.resolver.resolve(name, attr_text.as_deref());
        self.pos = tag_end;

        match resolution {
            TagResolution::Unknown => {
                // Not an error: text that merely looks like a tag must not
                // vanish, so the whole tag is re-emitted as ordinary bytes.
                self.copy_range(lt, tag_end);
            }
            TagResolution::SkipNewline => {
                self.ensure_styles();
                self.skip_one_line_break();
            }
            TagResolution::Style(patch) => {
                self.ensure_styles();
                self.push_open(TagKind::Style, name, attr_text, None);
                self.merge_style(&patch);
            }
            TagResolution::Link { handler } => {
                self.ensure_styles();
                self.push_open(TagKind::Link, name, attr_text, handler);
                self.merge_style(&StylePatch {
                    hotspot: true,
                    ..StylePatch::default()
                });
            }
            TagResolution::Fold => {
                self.ensure_styles();
                // Fold bodies keep their surrounding style.
                self.push_open(TagKind::Fold, name, attr_text, None);
            }
            TagResolution::Hidden => {
                tracing::trace!(
                    target: "selvage::markup",
                    name,
                    "unregistered sigil tag, span content suppressed"
                );
                self.ensure_styles();
                self.push_open(TagKind::Hidden, name, attr_text, None);
                self.hidden_depth += 1;
            }
            TagResolution::Verbatim => {
                self.ensure_styles();
                let (body_end, resume) = self.find_span_close(tag_end);
                self.copy_range(tag_end, body_end);
                self.pos = resume;
            }
            TagResolution::Code => {
                self.ensure_styles();
                let (body_end, resume) = self.find_span_close(tag_end);
                let out_start = self.text.len();
                self.copy_range(tag_end, body_end);
                self.pos = resume;
                if self.hidden_depth == 0 {
                    let range = out_start..self.text.len();
                    if let (Some(styler), Some(buf)) =
                        (self.code_styler.as_deref_mut(), self.style_buf.as_mut())
                    {
                        styler.style_code(
                            &src[tag_end..body_end],
                            attr_text.as_deref(),
                            &mut buf[range.clone()],
                        );
                    }
                    self.code_spans.push(CodeSpan {
                        range,
                        lang: attr_text,
                        source: src[tag_end..body_end].to_vec(),
                    });
                }
            }
        }
    }

    /// Pop the innermost open tag and apply its close-time effects.
    pub(crate) fn close_innermost(&mut self) {
        let Some(entry) = self.ctx.stack.pop() else {
            // Nothing open; the close token is simply dropped, the active
            // style is already the default.
            tracing::trace!(target: "selvage::markup", pos = self.pos, "close tag with empty stack");
            return;
        };
        self.current = entry.restore_style;
        match entry.kind {
            TagKind::Style => {}
            TagKind::Hidden => {
                self.hidden_depth -= 1;
            }
            TagKind::Link => {
                if self.hidden_depth == 0 {
                    let end = self.text.len();
                    let payload = entry.attr.unwrap_or_else(|| {
                        SmolStr::new(String::from_utf8_lossy(&self.text[entry.out_start..end]))
                    });
                    self.links.push(LinkRecord {
                        start: entry.out_start,
                        end,
                        name: entry.name,
                        payload,
                        handler: entry.handler,
                    });
                }
            }
            TagKind::Fold => {
                if self.hidden_depth == 0 {
                    let end = self.text.len();
                    let placeholder_text = entry
                        .attr
                        .unwrap_or_else(|| self.options.fold_placeholder.clone());
                    // The toggle reads as a link: hotspot over the restored
                    // surrounding style.
                    let base = self.table.get(self.current).copied().unwrap_or_default();
                    let toggle = base.apply(&StylePatch {
                        hotspot: true,
                        ..StylePatch::default()
                    });
                    let toggle_id = self.table.intern(toggle, self.current);
                    let ph_start = self.text.len();
                    self.emit_bytes(placeholder_text.as_bytes(), toggle_id);
                    let placeholder = ph_start..self.text.len();
                    self.links.push(LinkRecord {
                        start: placeholder.start,
                        end: placeholder.end,
                        name: SmolStr::new("fold"),
                        payload: placeholder_text,
                        handler: None,
                    });
                    self.folds.push(FoldRecord {
                        start: entry.out_start,
                        end,
                        placeholder,
                    });
                }
            }
        }
    }

    fn push_open(
        &mut self,
        kind: TagKind,
        name: &str,
        attr: Option<SmolStr>,
        handler: Option<u32>,
    ) {
        self.ctx.stack.push(OpenTag {
            kind,
            restore_style: self.current,
            out_start: self.text.len(),
            name: SmolStr::new(name),
            attr,
            handler,
        });
    }

    fn merge_style(&mut self, patch: &StylePatch) {
        let base = self.table.get(self.current).copied().unwrap_or_default();
        let merged = base.apply(patch);
        self.current = self.table.intern(merged, self.current);
    }

    /// Re-emit the literal `<` at the scan position and resume after it.
    /// The recovery path for every malformed tag: nothing throws, nothing
    /// is dropped.
    fn recover_literal(&mut self) {
        tracing::trace!(
            target: "selvage::markup",
            pos = self.pos,
            "malformed tag, literal '<' re-emitted"
        );
        let lt = self.pos;
        self.copy_range(lt, lt + 1);
        self.pos = lt + 1;
    }

    /// Swallow one line break immediately following a `nonl` tag.
    fn skip_one_line_break(&mut self) {
        let rest = &self.source[self.pos..];
        if rest.starts_with(b"\r\n") {
            self.pos += 2;
        } else if rest.first().is_some_and(|&b| b == b'\n' || b == b'\r') {
            self.pos += 1;
        }
    }

    /// Find the end of an uninterpreted span body: the next close token.
    /// Returns `(body_end, resume_pos)`; an unterminated body runs to the
    /// end of input.
    fn find_span_close(&self, from: usize) -> (usize, usize) {
        let src = self.source;
        let mut i = from;
        while let Some(lt) = find_byte(src, b'<', i) {
            match src.get(lt + 1) {
                Some(&b'>') => return (lt, lt + 2),
                Some(&b'/') => {
                    if let Some(gt) = find_byte(src, b'>', lt + 2) {
                        return (lt, gt + 1);
                    }
                    i = lt + 1;
                }
                _ => i = lt + 1,
            }
        }
        (src.len(), src.len())
    }
}

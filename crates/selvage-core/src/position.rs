//! Byte-offset ⇄ UTF-16-offset translation.
//!
//! Hosts speak two encodings: the engine's text is UTF-8 bytes, while the
//! platform text APIs around it count UTF-16 code units. The index records
//! only the non-ASCII spans as [`Run`]s; everything between runs maps 1:1,
//! so pure-ASCII documents cost nothing and mixed documents cost one small
//! sorted table plus a binary search per query.

use crate::document::{EditNotice, TextSource};
use crate::error::OffsetError;

const HIGH_BITS: u64 = 0x8080_8080_8080_8080;

/// One maximal span of non-ASCII characters of uniform width.
///
/// `width` is bytes per UTF-16 code unit: 2 for two-byte sequences, 3 for
/// three-byte sequences. Four-byte sequences encode as surrogate pairs, two
/// code units of two bytes each, so they merge into width-2 runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    byte_start: usize,
    cu_start: usize,
    cu_len: usize,
    width: u8,
}

impl Run {
    fn byte_len(&self) -> usize {
        self.cu_len * self.width as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexState {
    /// Nothing built yet, or invalidated by an edit. Rebuilt on next query.
    Empty,
    Built,
    /// Invalid UTF-8 was seen while building; every query falls back to a
    /// direct forward count for correctness.
    Error,
}

/// Sparse run table mapping UTF-8 byte offsets ⇄ UTF-16 code-unit offsets.
///
/// Queries take the text because the index never owns it; the host's buffer
/// is the single source of truth. Any [`EditNotice`] drops the whole table —
/// edits are assumed to be followed by reads, not interleaved per keystroke
/// with queries, so lazy whole-buffer rebuild beats incremental patching.
#[derive(Debug, Clone)]
pub struct PositionIndex {
    runs: Vec<Run>,
    state: IndexState,
    byte_len: usize,
    cu_len: usize,
}

impl Default for PositionIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionIndex {
    pub fn new() -> Self {
        Self {
            runs: Vec::new(),
            state: IndexState::Empty,
            byte_len: 0,
            cu_len: 0,
        }
    }

    /// Forget everything; the next query rebuilds from the buffer.
    pub fn invalidate(&mut self) {
        self.runs.clear();
        self.state = IndexState::Empty;
        self.byte_len = 0;
        self.cu_len = 0;
    }

    /// Edit notification from the host. Position of the edit is irrelevant:
    /// the whole table is dropped.
    pub fn apply_edit(&mut self, _notice: &EditNotice) {
        self.invalidate();
    }

    /// Total text length in bytes, as of the last build.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Total text length in UTF-16 code units, as of the last build.
    pub fn code_unit_len(&self) -> usize {
        self.cu_len
    }

    /// Translate a byte offset into a UTF-16 code-unit offset.
    ///
    /// Builds lazily on first use after an edit. Offsets past the end of the
    /// text are a caller bug and fail hard.
    pub fn to_utf16<T: TextSource + ?Sized>(
        &mut self,
        text: &T,
        byte_offset: usize,
    ) -> Result<usize, OffsetError> {
        let bytes = text.bytes();
        if self.state == IndexState::Empty {
            self.build(bytes);
        }
        if self.state == IndexState::Error {
            return fallback_to_utf16(bytes, byte_offset);
        }
        if byte_offset > self.byte_len {
            return Err(OffsetError::OutOfRange {
                offset: byte_offset,
                len: self.byte_len,
            });
        }
        // Last run starting at or before the offset; earlier text is ASCII.
        let idx = self.runs.partition_point(|r| r.byte_start <= byte_offset);
        if idx == 0 {
            return Ok(byte_offset);
        }
        let run = &self.runs[idx - 1];
        let delta = byte_offset - run.byte_start;
        let in_run = delta.min(run.byte_len()) / run.width as usize;
        let ascii_tail = delta.saturating_sub(run.byte_len());
        Ok(run.cu_start + in_run + ascii_tail)
    }

    /// Translate a UTF-16 code-unit offset into a byte offset.
    pub fn to_utf8<T: TextSource + ?Sized>(
        &mut self,
        text: &T,
        cu_offset: usize,
    ) -> Result<usize, OffsetError> {
        let bytes = text.bytes();
        if self.state == IndexState::Empty {
            self.build(bytes);
        }
        if self.state == IndexState::Error {
            return fallback_to_utf8(bytes, cu_offset);
        }
        if cu_offset > self.cu_len {
            return Err(OffsetError::OutOfRange {
                offset: cu_offset,
                len: self.cu_len,
            });
        }
        let idx = self.runs.partition_point(|r| r.cu_start <= cu_offset);
        if idx == 0 {
            return Ok(cu_offset);
        }
        let run = &self.runs[idx - 1];
        let delta = cu_offset - run.cu_start;
        let in_run = delta.min(run.cu_len) * run.width as usize;
        let ascii_tail = delta.saturating_sub(run.cu_len);
        Ok(run.byte_start + in_run + ascii_tail)
    }

    /// One forward scan over the buffer, recording non-ASCII runs.
    pub fn build(&mut self, text: &[u8]) {
        self.runs.clear();
        self.state = IndexState::Built;
        self.byte_len = text.len();

        let mut byte_pos = 0;
        let mut cu_pos = 0;
        let mut open: Option<Run> = None;

        while byte_pos < text.len() {
            if text[byte_pos] < 0x80 {
                if let Some(run) = open.take() {
                    self.runs.push(run);
                }
                let next = skip_ascii(text, byte_pos);
                cu_pos += next - byte_pos;
                byte_pos = next;
                continue;
            }
            let Some((seq_len, cu_count)) = classify_sequence(text, byte_pos) else {
                tracing::trace!(
                    target: "selvage::position",
                    byte = byte_pos,
                    "invalid utf-8, index degrades to linear fallback"
                );
                self.runs.clear();
                self.state = IndexState::Error;
                self.byte_len = 0;
                self.cu_len = 0;
                return;
            };
            let width = (seq_len / cu_count) as u8;
            match &mut open {
                Some(run) if run.width == width => run.cu_len += cu_count,
                _ => {
                    if let Some(run) = open.take() {
                        self.runs.push(run);
                    }
                    open = Some(Run {
                        byte_start: byte_pos,
                        cu_start: cu_pos,
                        cu_len: cu_count,
                        width,
                    });
                }
            }
            byte_pos += seq_len;
            cu_pos += cu_count;
        }
        if let Some(run) = open {
            self.runs.push(run);
        }
        self.cu_len = cu_pos;
        tracing::trace!(
            target: "selvage::position",
            bytes = self.byte_len,
            code_units = self.cu_len,
            runs = self.runs.len(),
            "position index built"
        );
    }
}

/// Advance past ASCII bytes, eight at a time while a whole word stays clear
/// of high bits.
fn skip_ascii(text: &[u8], mut pos: usize) -> usize {
    while pos + 8 <= text.len() {
        let chunk: [u8; 8] = match text[pos..pos + 8].try_into() {
            Ok(chunk) => chunk,
            Err(_) => break,
        };
        if u64::from_ne_bytes(chunk) & HIGH_BITS != 0 {
            break;
        }
        pos += 8;
    }
    while pos < text.len() && text[pos] < 0x80 {
        pos += 1;
    }
    pos
}

/// Classify the UTF-8 sequence starting at `pos`: `(byte_len, code_units)`.
/// `None` on a malformed lead or truncated/invalid continuation bytes.
fn classify_sequence(text: &[u8], pos: usize) -> Option<(usize, usize)> {
    let lead = text[pos];
    let (seq_len, cu_count) = match lead {
        0xC2..=0xDF => (2, 1),
        0xE0..=0xEF => (3, 1),
        0xF0..=0xF4 => (4, 2),
        _ => return None,
    };
    if pos + seq_len > text.len() {
        return None;
    }
    if !text[pos + 1..pos + seq_len]
        .iter()
        .all(|b| (0x80..=0xBF).contains(b))
    {
        return None;
    }
    Some((seq_len, cu_count))
}

/// O(n) forward count used when the buffer holds invalid UTF-8. An invalid
/// byte counts as one byte and one code unit, matching what a lossy decode
/// of a single stray byte would occupy.
fn fallback_to_utf16(text: &[u8], byte_offset: usize) -> Result<usize, OffsetError> {
    if byte_offset > text.len() {
        return Err(OffsetError::OutOfRange {
            offset: byte_offset,
            len: text.len(),
        });
    }
    let mut byte_pos = 0;
    let mut cu_pos = 0;
    while byte_pos < byte_offset {
        match step(text, byte_pos) {
            Some((seq_len, cu_count)) => {
                if byte_pos + seq_len > byte_offset {
                    break;
                }
                byte_pos += seq_len;
                cu_pos += cu_count;
            }
            None => {
                byte_pos += 1;
                cu_pos += 1;
            }
        }
    }
    Ok(cu_pos)
}

fn fallback_to_utf8(text: &[u8], cu_offset: usize) -> Result<usize, OffsetError> {
    let mut byte_pos = 0;
    let mut cu_pos = 0;
    while cu_pos < cu_offset && byte_pos < text.len() {
        match step(text, byte_pos) {
            Some((seq_len, cu_count)) => {
                if cu_pos + cu_count > cu_offset {
                    break;
                }
                byte_pos += seq_len;
                cu_pos += cu_count;
            }
            None => {
                byte_pos += 1;
                cu_pos += 1;
            }
        }
    }
    if cu_pos < cu_offset {
        return Err(OffsetError::OutOfRange {
            offset: cu_offset,
            len: cu_pos,
        });
    }
    Ok(byte_pos)
}

fn step(text: &[u8], pos: usize) -> Option<(usize, usize)> {
    if text[pos] < 0x80 {
        Some((1, 1))
    } else {
        classify_sequence(text, pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16_len(s: &str) -> usize {
        s.encode_utf16().count()
    }

    #[test]
    fn test_ascii_is_identity() {
        let text = "plain ascii text";
        let mut index = PositionIndex::new();
        for i in 0..=text.len() {
            assert_eq!(index.to_utf16(text, i), Ok(i));
            assert_eq!(index.to_utf8(text, i), Ok(i));
        }
    }

    #[test]
    fn test_two_byte_run() {
        // "héllo" - é is 2 bytes, 1 code unit.
        let text = "h\u{e9}llo";
        let mut index = PositionIndex::new();
        assert_eq!(index.to_utf16(text, 0), Ok(0));
        assert_eq!(index.to_utf16(text, 1), Ok(1));
        assert_eq!(index.to_utf16(text, 3), Ok(2)); // after é
        assert_eq!(index.to_utf16(text, text.len()), Ok(utf16_len(text)));
        assert_eq!(index.to_utf8(text, 2), Ok(3));
        assert_eq!(index.to_utf8(text, utf16_len(text)), Ok(text.len()));
    }

    #[test]
    fn test_three_byte_run() {
        // CJK: 3 bytes, 1 code unit each.
        let text = "ab\u{4e16}\u{754c}cd";
        let mut index = PositionIndex::new();
        assert_eq!(index.to_utf16(text, 2), Ok(2));
        assert_eq!(index.to_utf16(text, 5), Ok(3));
        assert_eq!(index.to_utf16(text, 8), Ok(4));
        assert_eq!(index.to_utf16(text, 10), Ok(6));
        assert_eq!(index.to_utf8(text, 3), Ok(5));
        assert_eq!(index.to_utf8(text, 4), Ok(8));
        assert_eq!(index.to_utf8(text, 6), Ok(10));
    }

    #[test]
    fn test_four_byte_counts_two_units() {
        // 🎉 U+1F389: 4 bytes, surrogate pair (2 code units).
        let text = "a\u{1f389}b";
        let mut index = PositionIndex::new();
        assert_eq!(index.to_utf16(text, 1), Ok(1));
        assert_eq!(index.to_utf16(text, 5), Ok(3));
        assert_eq!(index.to_utf16(text, 6), Ok(4));
        assert_eq!(index.to_utf8(text, 3), Ok(5));
        assert_eq!(index.to_utf8(text, 4), Ok(6));
    }

    #[test]
    fn test_mixed_widths_round_trip() {
        let text = "a\u{e9}\u{4e16}\u{1f389}z end";
        let mut index = PositionIndex::new();
        let total_cu = utf16_len(text);
        for cu in 0..=total_cu {
            let byte = index.to_utf8(text, cu).unwrap();
            assert_eq!(index.to_utf16(text, byte), Ok(cu), "cu {}", cu);
        }
    }

    #[test]
    fn test_adjacent_two_and_four_byte_share_run() {
        // Both have effective width 2, so they coalesce; mapping must
        // still hold at every boundary.
        let text = "\u{e9}\u{1f389}\u{e9}";
        let mut index = PositionIndex::new();
        assert_eq!(index.to_utf16(text, 2), Ok(1));
        assert_eq!(index.to_utf16(text, 6), Ok(3));
        assert_eq!(index.to_utf16(text, 8), Ok(4));
        assert_eq!(index.to_utf8(text, 1), Ok(2));
        assert_eq!(index.to_utf8(text, 3), Ok(6));
        assert_eq!(index.to_utf8(text, 4), Ok(8));
    }

    #[test]
    fn test_out_of_range_is_error() {
        let text = "abc";
        let mut index = PositionIndex::new();
        assert_eq!(
            index.to_utf16(text, 4),
            Err(OffsetError::OutOfRange { offset: 4, len: 3 })
        );
        assert_eq!(
            index.to_utf8(text, 4),
            Err(OffsetError::OutOfRange { offset: 4, len: 3 })
        );
    }

    #[test]
    fn test_invalid_utf8_falls_back() {
        // Lone continuation byte mid-text.
        let text: &[u8] = b"ab\x80cd";
        let mut index = PositionIndex::new();
        // Stray byte counts as one unit; positions after it stay consistent.
        assert_eq!(index.to_utf16(text, 2), Ok(2));
        assert_eq!(index.to_utf16(text, 3), Ok(3));
        assert_eq!(index.to_utf16(text, 5), Ok(5));
        assert_eq!(index.to_utf8(text, 5), Ok(5));
        assert!(index.to_utf16(text, 6).is_err());
    }

    #[test]
    fn test_edit_invalidates_and_rebuilds() {
        let before = "a\u{e9}b";
        let mut index = PositionIndex::new();
        assert_eq!(index.to_utf16(before, 3), Ok(2));

        // Host deleted the é.
        let after = "ab";
        index.apply_edit(&EditNotice::delete(1, 2));
        assert_eq!(index.to_utf16(after, 2), Ok(2));
        assert_eq!(index.code_unit_len(), 2);
    }

    #[test]
    fn test_lengths_reported() {
        let text = "x\u{1f389}";
        let mut index = PositionIndex::new();
        index.build(text.as_bytes());
        assert_eq!(index.byte_len(), 5);
        assert_eq!(index.code_unit_len(), 3);
    }
}

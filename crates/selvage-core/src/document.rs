//! The text-storage collaborator interface.
//!
//! The engine does not own any text. The surrounding control stores the
//! de-tagged bytes (in whatever buffer it likes) and hands them back for
//! position queries; it reports every edit so the engine can drop stale
//! derived state.

use std::ops::Range;

/// Read access to the host's text buffer.
///
/// Hosts backed by a gap or split buffer move the gap out of the way before
/// exposing the view; the engine only ever needs one contiguous slice per
/// call and never holds it across edits.
pub trait TextSource {
    fn len_bytes(&self) -> usize;

    /// Contiguous byte view of the whole document.
    fn bytes(&self) -> &[u8];
}

impl TextSource for [u8] {
    fn len_bytes(&self) -> usize {
        self.len()
    }

    fn bytes(&self) -> &[u8] {
        self
    }
}

impl TextSource for Vec<u8> {
    fn len_bytes(&self) -> usize {
        self.len()
    }

    fn bytes(&self) -> &[u8] {
        self
    }
}

impl TextSource for str {
    fn len_bytes(&self) -> usize {
        self.len()
    }

    fn bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl TextSource for String {
    fn len_bytes(&self) -> usize {
        self.len()
    }

    fn bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<T: TextSource + ?Sized> TextSource for &T {
    fn len_bytes(&self) -> usize {
        (**self).len_bytes()
    }

    fn bytes(&self) -> &[u8] {
        (**self).bytes()
    }
}

/// One edit reported by the host.
///
/// `offset`/`len` are byte coordinates in the host's (de-tagged) text.
/// `inserted` distinguishes an insertion of `len` bytes at `offset` from a
/// deletion of the `len` bytes starting there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditNotice {
    pub offset: usize,
    pub len: usize,
    pub inserted: bool,
}

impl EditNotice {
    pub fn insert(offset: usize, len: usize) -> Self {
        Self {
            offset,
            len,
            inserted: true,
        }
    }

    pub fn delete(offset: usize, len: usize) -> Self {
        Self {
            offset,
            len,
            inserted: false,
        }
    }
}

/// Shift a previously registered byte range across an edit.
///
/// Link and fold ranges registered from an earlier parse stay attached to
/// their text as the host edits around them. Returns `None` when a deletion
/// swallowed the range entirely.
pub fn shift_range(range: Range<usize>, notice: &EditNotice) -> Option<Range<usize>> {
    let Range { mut start, mut end } = range;
    if notice.inserted {
        if notice.offset <= start {
            start += notice.len;
            end += notice.len;
        } else if notice.offset < end {
            // Insertion inside the range grows it.
            end += notice.len;
        }
        return Some(start..end);
    }

    let del_start = notice.offset;
    let del_end = notice.offset + notice.len;
    if del_end <= start {
        return Some(start - notice.len..end - notice.len);
    }
    if del_start >= end {
        return Some(start..end);
    }
    // Overlap: clamp both endpoints out of the deleted span.
    if del_start <= start && del_end >= end {
        return None;
    }
    if start >= del_start {
        start = del_start;
    }
    end = if end > del_end {
        end - notice.len
    } else {
        del_start
    };
    Some(start..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_before_shifts_right() {
        let notice = EditNotice::insert(2, 3);
        assert_eq!(shift_range(5..9, &notice), Some(8..12));
    }

    #[test]
    fn test_insert_inside_grows() {
        let notice = EditNotice::insert(6, 2);
        assert_eq!(shift_range(5..9, &notice), Some(5..11));
    }

    #[test]
    fn test_insert_after_is_noop() {
        let notice = EditNotice::insert(9, 4);
        assert_eq!(shift_range(5..9, &notice), Some(5..9));
    }

    #[test]
    fn test_delete_before_shifts_left() {
        let notice = EditNotice::delete(0, 3);
        assert_eq!(shift_range(5..9, &notice), Some(2..6));
    }

    #[test]
    fn test_delete_covering_drops_range() {
        let notice = EditNotice::delete(4, 10);
        assert_eq!(shift_range(5..9, &notice), None);
    }

    #[test]
    fn test_delete_overlapping_tail_truncates() {
        let notice = EditNotice::delete(7, 5);
        assert_eq!(shift_range(5..9, &notice), Some(5..7));
    }

    #[test]
    fn test_delete_overlapping_head_truncates() {
        let notice = EditNotice::delete(3, 4);
        // Bytes 5..7 deleted; survivors 7..9 land at 3.
        assert_eq!(shift_range(5..9, &notice), Some(3..5));
    }
}

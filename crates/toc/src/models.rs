use std::ops::Range;

/// A detected chapter heading.
///
/// `offset` is the byte offset of the heading's first character within the
/// decoded document. Scanning produces exact offsets, but entries restored
/// from elsewhere (or scanned from a differently normalized copy of the text)
/// may drift, so treat it as approximate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChapterEntry {
    pub title: String,
    pub offset: usize,
}
impl ChapterEntry {
    pub fn new(title: impl Into<String>, offset: usize) -> Self {
        Self { title: title.into(), offset }
    }
}

/// The exact `[start, end)` byte range of one chapter within the decoded text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChapterSpan {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub title: String,
}
impl ChapterSpan {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Slice this chapter out of the text it was resolved against.
    ///
    /// Returns `None` if the span does not fit the text (it was resolved
    /// against a different document).
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.range())
    }
}

//! Source locations and source text.
//!
//! Locations come straight from the external parser: lines are 1-based,
//! columns are 0-based and counted in characters.

use std::fmt;
use std::iter;
use std::rc::Rc;

use serde::Deserialize;

/// A single point in the source.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[inline]
    pub const fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }
}

/// The region of source a node spans.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Deserialize)]
pub struct Location {
    pub start: Position,
    pub end: Position,
}

impl Location {
    #[inline]
    pub const fn new(start: Position, end: Position) -> Self {
        Location { start, end }
    }

    /// Line the node ends on. Records are keyed by this line.
    #[inline]
    pub const fn end_line(&self) -> u32 {
        self.end.line
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line, self.start.column, self.end.line, self.end.column
        )
    }
}

struct SourceInner {
    text: String,
    /// Byte offset of the first character of each line.
    line_starts: Vec<usize>,
}

/// Shared, immutable program source.
///
/// Cheap to clone. Used to recover the exact text a node spans, which is
/// what closures and quoted code render as.
#[derive(Clone)]
pub struct SourceText(Rc<SourceInner>);

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        SourceText(Rc::new(SourceInner { text, line_starts }))
    }

    pub fn as_str(&self) -> &str {
        &self.0.text
    }

    /// The exact substring covered by `loc`, or `None` if the location
    /// falls outside the text.
    pub fn slice(&self, loc: &Location) -> Option<&str> {
        let start = self.offset(loc.start)?;
        let end = self.offset(loc.end)?;
        self.0.text.get(start..end)
    }

    fn offset(&self, pos: Position) -> Option<usize> {
        let line_index = usize::try_from(pos.line).ok()?.checked_sub(1)?;
        let line_start = *self.0.line_starts.get(line_index)?;
        // A column may point just past the last character, never past the
        // line's newline.
        let line_end = self
            .0
            .line_starts
            .get(line_index + 1)
            .map_or(self.0.text.len(), |next| next - 1);
        let line = &self.0.text[line_start..line_end];
        let column = usize::try_from(pos.column).ok()?;
        line.char_indices()
            .map(|(i, _)| i)
            .chain(iter::once(line.len()))
            .nth(column)
            .map(|i| line_start + i)
    }
}

impl From<&str> for SourceText {
    fn from(text: &str) -> Self {
        SourceText::new(text)
    }
}

impl From<String> for SourceText {
    fn from(text: String) -> Self {
        SourceText::new(text)
    }
}

impl fmt::Debug for SourceText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SourceText").field(&self.0.text).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loc(sl: u32, sc: u32, el: u32, ec: u32) -> Location {
        Location::new(Position::new(sl, sc), Position::new(el, ec))
    }

    #[test]
    fn slice_single_line() {
        let source = SourceText::new("var a = 1 + 2\nvar b = 3\n");
        assert_eq!(source.slice(&loc(1, 8, 1, 13)), Some("1 + 2"));
        assert_eq!(source.slice(&loc(2, 4, 2, 5)), Some("b"));
    }

    #[test]
    fn slice_spans_lines() {
        let source = SourceText::new("f(function(b) {\n  this.b = b\n})\n");
        assert_eq!(
            source.slice(&loc(1, 2, 3, 1)),
            Some("function(b) {\n  this.b = b\n}")
        );
    }

    #[test]
    fn slice_counts_columns_in_characters() {
        let source = SourceText::new("\"héllo\" + x");
        assert_eq!(source.slice(&loc(1, 0, 1, 7)), Some("\"héllo\""));
        assert_eq!(source.slice(&loc(1, 10, 1, 11)), Some("x"));
    }

    #[test]
    fn slice_at_end_of_text() {
        let source = SourceText::new("abc");
        assert_eq!(source.slice(&loc(1, 0, 1, 3)), Some("abc"));
    }

    #[test]
    fn slice_out_of_range_is_none() {
        let source = SourceText::new("abc");
        assert_eq!(source.slice(&loc(2, 0, 2, 1)), None);
        assert_eq!(source.slice(&loc(1, 0, 1, 9)), None);
        assert_eq!(source.slice(&loc(0, 0, 1, 1)), None);
    }

    #[test]
    fn columns_stay_on_their_line() {
        let source = SourceText::new("ab\ncd");
        assert_eq!(source.slice(&loc(1, 0, 1, 2)), Some("ab"));
        assert_eq!(source.slice(&loc(1, 0, 1, 4)), None);
        assert_eq!(source.slice(&loc(1, 3, 2, 1)), None);
    }

    #[test]
    fn location_display() {
        assert_eq!(loc(1, 2, 3, 4).to_string(), "1:2-3:4");
    }
}

//! Path segments and the one place where they are joined into strings.
//!
//! Fact store keys, substitution lookups and assertion breadcrumbs all use
//! the same notation: `.` before field names, `[i]` for array indices, `[*]`
//! for the wildcard, no separator before `[` and no leading `.`.

use std::fmt;

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Field(String),
    Index(usize),
    Wildcard,
}

/// A sequence of segments, e.g. `RESPONSE.BODY.items[*].name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn root() -> Path {
        Path(Vec::new())
    }

    pub fn new(segments: Vec<Segment>) -> Path {
        Path(segments)
    }

    /// Parse dotted/bracketed notation. Empty field names are dropped, a
    /// bracket holding `*` is the wildcard, a numeric bracket is an index and
    /// any other bracket content is a field name.
    pub fn parse(text: &str) -> Path {
        let mut segments = Vec::new();
        let mut field = String::new();
        let mut chars = text.chars();

        while let Some(c) = chars.next() {
            match c {
                '.' => flush_field(&mut field, &mut segments),
                '[' => {
                    flush_field(&mut field, &mut segments);
                    let inner: String = chars.by_ref().take_while(|c| *c != ']').collect();
                    let inner = inner.trim();
                    if inner == "*" {
                        segments.push(Segment::Wildcard);
                    } else if let Ok(index) = inner.parse::<usize>() {
                        segments.push(Segment::Index(index));
                    } else if !inner.is_empty() {
                        segments.push(Segment::Field(inner.trim_matches('"').to_string()));
                    }
                }
                other => field.push(other),
            }
        }
        flush_field(&mut field, &mut segments);
        Path(segments)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    /// Child path for an object field.
    pub fn field(&self, name: impl Into<String>) -> Path {
        self.push(Segment::Field(name.into()))
    }

    /// Child path for an array index.
    pub fn index(&self, index: usize) -> Path {
        self.push(Segment::Index(index))
    }

    /// Child path for the wildcard segment.
    pub fn wildcard(&self) -> Path {
        self.push(Segment::Wildcard)
    }

    pub fn push(&self, segment: Segment) -> Path {
        let mut segments = self.0.clone();
        segments.push(segment);
        Path(segments)
    }

    /// Concatenate two paths.
    pub fn join(&self, tail: &Path) -> Path {
        let mut segments = self.0.clone();
        segments.extend(tail.0.iter().cloned());
        Path(segments)
    }

    /// Segments `[0, at)` and `[at, len)`.
    pub fn split_at(&self, at: usize) -> (Path, Path) {
        let (head, tail) = self.0.split_at(at.min(self.0.len()));
        (Path(head.to_vec()), Path(tail.to_vec()))
    }

    pub fn first_wildcard(&self) -> Option<usize> {
        self.0.iter().position(|s| *s == Segment::Wildcard)
    }

    pub fn last_wildcard(&self) -> Option<usize> {
        self.0.iter().rposition(|s| *s == Segment::Wildcard)
    }

    /// Copy of this path with the segment at `at` replaced.
    pub fn with_segment(&self, at: usize, segment: Segment) -> Path {
        let mut segments = self.0.clone();
        if let Some(slot) = segments.get_mut(at) {
            *slot = segment;
        }
        Path(segments)
    }

    /// Copy of this path with the segment at `at` removed.
    pub fn without_segment(&self, at: usize) -> Path {
        let mut segments = self.0.clone();
        if at < segments.len() {
            segments.remove(at);
        }
        Path(segments)
    }

    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

fn flush_field(field: &mut String, segments: &mut Vec<Segment>) {
    let name = field.trim();
    if !name.is_empty() {
        segments.push(Segment::Field(name.to_string()));
    }
    field.clear();
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Field(name) if i == 0 => write!(f, "{}", name)?,
                Segment::Field(name) => write!(f, ".{}", name)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
                Segment::Wildcard => write!(f, "[*]")?,
            }
        }
        Ok(())
    }
}

impl From<&str> for Path {
    fn from(text: &str) -> Self {
        Path::parse(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_fields_and_indices() {
        let path = Path::root().field("BODY").index(2).field("name");
        assert_eq!(path.to_string(), "BODY[2].name");
    }

    #[test]
    fn display_wildcard_and_leading_index() {
        assert_eq!(Path::root().index(0).field("id").to_string(), "[0].id");
        assert_eq!(
            Path::parse("RESPONSE.BODY").wildcard().field("id").to_string(),
            "RESPONSE.BODY[*].id"
        );
    }

    #[test]
    fn parse_round_trips_display() {
        for text in ["ENTITY.price", "BODY[2].name", "A[*][1].b", "CONFIG.patch.Product.price"] {
            assert_eq!(Path::parse(text).to_string(), text);
        }
    }

    #[test]
    fn parse_bracketed_field() {
        assert_eq!(
            Path::parse("HEADERS[\"Content-Type\"]").segments(),
            &[
                Segment::Field("HEADERS".into()),
                Segment::Field("Content-Type".into())
            ]
        );
    }

    #[test]
    fn wildcard_positions() {
        let path = Path::parse("A[*].b[*].c");
        assert_eq!(path.first_wildcard(), Some(1));
        assert_eq!(path.last_wildcard(), Some(3));
        assert_eq!(
            path.with_segment(1, Segment::Index(4)).to_string(),
            "A[4].b[*].c"
        );
        assert_eq!(path.without_segment(3).to_string(), "A[*].b.c");
    }
}

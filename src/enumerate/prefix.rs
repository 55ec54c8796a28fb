//! The query prefix value type
//!
//! A `QueryPrefix` is a non-empty ordered sequence of letters A-Z. It is an
//! immutable value: `advanced` and `subdivided` return new prefixes rather
//! than mutating in place, which keeps the traversal invariant easy to reason
//! about.

use std::fmt;

/// An ordered, non-empty sequence of letters A-Z representing one search string
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryPrefix {
    letters: Vec<u8>,
}

impl QueryPrefix {
    /// The first prefix of a traversal: `"A"`
    pub fn start() -> Self {
        Self { letters: vec![b'A'] }
    }

    /// Builds a prefix from a string of letters A-Z
    ///
    /// Returns `None` if the string is empty or contains anything other than
    /// ASCII uppercase letters.
    pub fn new(s: &str) -> Option<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_uppercase()) {
            return None;
        }
        Some(Self {
            letters: s.bytes().collect(),
        })
    }

    /// The prefix as a query string
    pub fn as_str(&self) -> &str {
        // Invariant: letters are ASCII uppercase, so this is always valid UTF-8
        std::str::from_utf8(&self.letters).unwrap_or("")
    }

    /// Current subdivision depth (number of letters)
    pub fn depth(&self) -> usize {
        self.letters.len()
    }

    /// The next prefix one level deeper: appends `A`, narrowing the query
    ///
    /// Used exactly when a page reports a capped result set, since such a
    /// result set is known to be incomplete.
    pub fn subdivided(&self) -> Self {
        let mut letters = self.letters.clone();
        letters.push(b'A');
        Self { letters }
    }

    /// The next prefix laterally, odometer-with-carry over the alphabet
    ///
    /// Trailing `Z`s are removed (carry), then the last remaining letter is
    /// incremented. Returns `None` when the carry empties the sequence, which
    /// ends the traversal.
    pub fn advanced(&self) -> Option<Self> {
        let mut letters = self.letters.clone();
        while let Some(&last) = letters.last() {
            if last == b'Z' {
                letters.pop();
            } else {
                *letters.last_mut()? += 1;
                return Some(Self { letters });
            }
        }
        None
    }
}

impl fmt::Display for QueryPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

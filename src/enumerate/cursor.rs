//! The prefix enumeration cursor
//!
//! `PrefixEnumerator` walks the alphabetic query space depth-first. At every
//! step the controller observes the match count for the current prefix and
//! applies the subdivision policy: subdivide when the count meets the cap
//! (the page is known to be incomplete), advance otherwise. Every prefix a
//! run issues is visited exactly once, in lexicographic order, down to the
//! depth the cap forces.

use crate::enumerate::prefix::QueryPrefix;

/// The cursor decision taken for one observed page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The prefix was narrowed one level deeper (capped result set)
    Subdivided,
    /// The cursor moved laterally to the next prefix
    Advanced,
    /// The traversal ended: the advance carried out of the top level
    Finished,
}

/// A stateful cursor over the space of alphabetic query prefixes
#[derive(Debug, Clone)]
pub struct PrefixEnumerator {
    cursor: Option<QueryPrefix>,
    issued: u64,
}

impl PrefixEnumerator {
    /// Creates an enumerator positioned at `"A"`
    pub fn new() -> Self {
        Self {
            cursor: Some(QueryPrefix::start()),
            issued: 0,
        }
    }

    /// The prefix the next query should use, or `None` once the traversal is done
    pub fn current(&self) -> Option<&QueryPrefix> {
        self.cursor.as_ref()
    }

    /// True once the traversal has exhausted the prefix space
    pub fn done(&self) -> bool {
        self.cursor.is_none()
    }

    /// Number of prefixes handed out so far
    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// Extends the current prefix one level deeper instead of advancing laterally
    pub fn subdivide(&mut self) {
        if let Some(prefix) = self.cursor.take() {
            self.cursor = Some(prefix.subdivided());
            self.issued += 1;
        }
    }

    /// Moves the cursor to the next prefix in traversal order
    pub fn advance(&mut self) {
        if let Some(prefix) = self.cursor.take() {
            self.cursor = prefix.advanced();
            self.issued += 1;
        }
    }

    /// Applies the subdivision policy for one observed page
    ///
    /// `observed` is the total match count the page reported, or `None` when
    /// the page carried no result container (classified as zero matches).
    /// A count at or above `cap` means the page cannot be complete, so the
    /// query must be narrowed before any of its results are accepted; any
    /// other outcome, including zero matches, advances laterally.
    pub fn step(&mut self, observed: Option<u64>, cap: u64) -> Step {
        if self.cursor.is_none() {
            return Step::Finished;
        }
        match observed {
            Some(count) if count >= cap => {
                self.subdivide();
                Step::Subdivided
            }
            _ => {
                self.advance();
                if self.cursor.is_some() {
                    Step::Advanced
                } else {
                    Step::Finished
                }
            }
        }
    }
}

impl Default for PrefixEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

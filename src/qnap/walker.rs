//! Lazy traversal of the archive hierarchy
//!
//! Every level (notebook, section, note, tag) is walked by the same [`Walk`]
//! iterator. A level only describes how a stub stored in its parent becomes
//! a full item; for notes that means reading `<location>/noteInfo.json`.
//!
//! Items are yielded as independent values. A `Walk` is forward-only and not
//! `Clone`; to start over, ask the parent for its children again.

use super::archive::QnapArchive;
use super::errors::Result;
use super::models::Timestamps;

/// One level of the notebook → section → note → tag hierarchy
pub trait Level: Sized {
    /// What the parent record stores for each child of this level
    type Stub;

    /// Materialize an item from its stub
    fn resolve(archive: &QnapArchive, stub: &Self::Stub) -> Result<Self>;

    fn name(&self) -> &str;

    fn times(&self) -> Timestamps;
}

/// A record with an ordered collection of children
pub trait Parent {
    type Child: Level;

    fn child_stubs(&self) -> &[<Self::Child as Level>::Stub];

    fn children<'a>(&'a self, archive: &'a QnapArchive) -> Walk<'a, Self::Child> {
        Walk::new(archive, self.child_stubs())
    }
}

/// Single-pass iterator over the children of one parent
pub struct Walk<'a, L: Level> {
    archive: &'a QnapArchive,
    stubs: std::slice::Iter<'a, L::Stub>,
}

impl<'a, L: Level> Walk<'a, L> {
    pub fn new(archive: &'a QnapArchive, stubs: &'a [L::Stub]) -> Self {
        Self {
            archive,
            stubs: stubs.iter(),
        }
    }

    /// Number of children not yet yielded
    pub fn remaining(&self) -> usize {
        self.stubs.len()
    }
}

impl<'a, L: Level> Iterator for Walk<'a, L> {
    type Item = Result<L>;

    fn next(&mut self) -> Option<Self::Item> {
        let stub = self.stubs.next()?;
        Some(L::resolve(self.archive, stub))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.stubs.size_hint()
    }
}

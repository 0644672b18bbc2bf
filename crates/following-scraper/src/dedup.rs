use crate::model::FollowedProfile;
use std::collections::HashSet;

/// Outcome of offering a record to the [`Deduplicator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    Duplicate,
}

/// Tracks identifiers already emitted in this run.
///
/// The identifier is the record `id`, whether it came from the page or was
/// derived by the normalizer from the URL or title. Two profiles sharing a
/// link but carrying distinct ids are both kept.
#[derive(Debug, Default)]
pub struct Deduplicator {
    ids: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, record: &FollowedProfile) -> Admission {
        if self.ids.insert(record.id.clone()) {
            Admission::Accepted
        } else {
            Admission::Duplicate
        }
    }
}

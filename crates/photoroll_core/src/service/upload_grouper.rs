//! Partitioning of published items into `(publication date, genre)` groups.
//!
//! # Invariants
//! - No member is dropped: untagged members land in `GenreKey::All`.
//! - A member tagged with `n` distinct genres appears in exactly `n` groups.
//! - Member order inside a group follows input order.

use crate::model::aggregate::{GenreKey, GroupKey};
use crate::model::item::GroupMember;
use std::collections::BTreeMap;

/// Groups `members` by `(published_on, genre)`.
///
/// Callers pass members already filtered to published items with a
/// publication date in the chosen scope.
pub fn group_uploads(members: Vec<GroupMember>) -> BTreeMap<GroupKey, Vec<GroupMember>> {
    let mut groups: BTreeMap<GroupKey, Vec<GroupMember>> = BTreeMap::new();
    for member in members {
        let mut genres: Vec<GenreKey> = Vec::with_capacity(member.genre_ids.len().max(1));
        for genre_id in &member.genre_ids {
            let genre = GenreKey::Term(*genre_id);
            if !genres.contains(&genre) {
                genres.push(genre);
            }
        }
        if genres.is_empty() {
            genres.push(GenreKey::All);
        }

        for genre in genres {
            let key = GroupKey {
                published_on: member.published_on,
                genre,
            };
            groups.entry(key).or_default().push(member.clone());
        }
    }
    groups
}

//! Tag group synchronization
//!
//! Groups are keyed by name within a library, tags likewise. A group's
//! membership is set to exactly the tags the manifest lists, in manifest
//! order; tags themselves are never deleted here since images may still
//! reference them.

use crate::manifest::TagGroupEntry;
use crate::{Result, TagSyncStats};
use rao_core::types::{LibraryId, TagId, UpsertTagGroup, Upserted};
use rao_core::LibraryStore;
use std::collections::HashSet;

/// Trimmed, non-blank names in first-seen order
fn member_names(tags: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty() && seen.insert(*tag))
        .collect()
}

/// Upsert the tag groups of a library and their member tags
pub async fn sync_tag_groups(
    store: &dyn LibraryStore,
    library_id: LibraryId,
    groups: &[TagGroupEntry],
) -> Result<TagSyncStats> {
    let mut stats = TagSyncStats::default();
    let mut seen_groups = HashSet::new();

    for group in groups {
        let name = group.name.trim();
        if name.is_empty() {
            tracing::warn!("Skipping tag group without a name (id {:?})", group.id);
            continue;
        }
        if !seen_groups.insert(name) {
            tracing::warn!("Duplicate tag group {} in manifest, keeping the first", name);
            continue;
        }

        let color = group
            .color
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let upserted = store
            .upsert_tag_group(UpsertTagGroup {
                library_id,
                name: name.to_string(),
                color,
            })
            .await?;

        match &upserted {
            Upserted::Created(_) => stats.groups_created += 1,
            Upserted::Updated(_) => stats.groups_updated += 1,
            Upserted::Unchanged(_) => {}
        }
        let group_id = upserted.into_inner().id;

        let names = member_names(&group.tags);
        let mut tag_ids: Vec<TagId> = Vec::with_capacity(names.len());
        for tag_name in names {
            let tag = store.upsert_tag(library_id, tag_name).await?;
            if tag.is_created() {
                stats.tags_created += 1;
            }
            tag_ids.push(tag.into_inner().id);
        }

        if store.set_tag_group_members(group_id, &tag_ids).await? {
            stats.memberships_changed += 1;
        }
    }

    tracing::debug!(
        "Tag groups: {} created, {} updated, {} tags created, {} memberships changed",
        stats.groups_created,
        stats.groups_updated,
        stats.tags_created,
        stats.memberships_changed
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_names() {
        let tags: Vec<String> = ["b", " a ", "", "b", "c", "   "]
            .iter()
            .map(|s| (*s).to_string())
            .collect();

        assert_eq!(member_names(&tags), vec!["b", "a", "c"]);
    }
}

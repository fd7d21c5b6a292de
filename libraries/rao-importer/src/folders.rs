//! Folder tree synchronization
//!
//! Folders are upserted parent-first so every `parent_id` already points at a
//! stored row. The order comes from a Kahn pass over the parent relation,
//! iterative so arbitrarily deep trees are fine.

use crate::manifest::FolderEntry;
use crate::{FolderSyncStats, Result};
use rao_core::types::{FolderId, LibraryId, UpsertFolder, Upserted};
use rao_core::LibraryStore;
use std::collections::{HashMap, HashSet, VecDeque};

/// A folder in upsert order with the parent it will be stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedFolder<'a> {
    pub folder: &'a FolderEntry,
    pub parent: Option<&'a str>,
}

/// Order folders so every parent precedes its children
///
/// - Duplicate ids keep their first occurrence
/// - A folder whose parent is absent from the input is a root
/// - A parent cycle is cut at one of its members, which becomes a root.
///   Folders merely hanging off a cycle keep their parent.
pub fn topological_order(folders: &[FolderEntry]) -> Vec<OrderedFolder<'_>> {
    let mut unique: Vec<&FolderEntry> = Vec::with_capacity(folders.len());
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(folders.len());
    for folder in folders {
        if index.contains_key(folder.id.as_str()) {
            tracing::warn!("Duplicate folder id {} in manifest, keeping the first", folder.id);
            continue;
        }
        index.insert(folder.id.as_str(), unique.len());
        unique.push(folder);
    }

    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut queue: VecDeque<usize> = VecDeque::new();
    for (i, folder) in unique.iter().enumerate() {
        match folder.parent.as_deref().and_then(|p| index.get(p)) {
            Some(&parent) if parent != i => children.entry(parent).or_default().push(i),
            _ => queue.push_back(i),
        }
    }

    let mut order: Vec<OrderedFolder<'_>> = Vec::with_capacity(unique.len());
    let mut visited: HashSet<usize> = HashSet::with_capacity(unique.len());
    let mut next_leftover = 0;

    loop {
        while let Some(i) = queue.pop_front() {
            if !visited.insert(i) {
                continue;
            }

            let folder = unique[i];
            let parent = folder
                .parent
                .as_deref()
                .filter(|p| index.get(p).is_some_and(|&pi| pi != i && visited.contains(&pi)));
            order.push(OrderedFolder { folder, parent });

            if let Some(kids) = children.get(&i) {
                queue.extend(kids.iter().copied());
            }
        }

        // Whatever is left hangs off a cycle
        while next_leftover < unique.len() && visited.contains(&next_leftover) {
            next_leftover += 1;
        }
        if next_leftover == unique.len() {
            break;
        }

        // Every unvisited folder has an unvisited parent, so following parents
        // from a leftover must revisit a folder, and that folder is on a cycle
        let mut walked: HashSet<usize> = HashSet::new();
        let mut on_cycle = next_leftover;
        while walked.insert(on_cycle) {
            match unique[on_cycle].parent.as_deref().and_then(|p| index.get(p)) {
                Some(&parent) => on_cycle = parent,
                None => break,
            }
        }

        tracing::warn!(
            "Folder {} is part of a parent cycle, storing it as a root",
            unique[on_cycle].id
        );
        queue.push_back(on_cycle);
    }

    order
}

/// Upsert the folder tree of a library
///
/// Returns the phase counters and the `external id -> FolderId` map of every
/// folder the library has, used to resolve image folder memberships.
pub async fn sync_folders(
    store: &dyn LibraryStore,
    library_id: LibraryId,
    folders: &[FolderEntry],
) -> Result<(FolderSyncStats, HashMap<String, FolderId>)> {
    let mut ids: HashMap<String, FolderId> = store
        .get_folders(library_id)
        .await?
        .into_iter()
        .map(|folder| (folder.external_id, folder.id))
        .collect();

    let mut stats = FolderSyncStats::default();

    for OrderedFolder { folder, parent } in topological_order(folders) {
        let parent_id = parent.and_then(|p| ids.get(p).copied());

        let upserted = store
            .upsert_folder(UpsertFolder {
                library_id,
                external_id: folder.id.clone(),
                name: folder.name.clone(),
                parent_id,
            })
            .await?;

        match &upserted {
            Upserted::Created(_) => stats.created += 1,
            Upserted::Updated(_) => stats.updated += 1,
            Upserted::Unchanged(_) => stats.unchanged += 1,
        }

        ids.insert(folder.id.clone(), upserted.value().id);
    }

    tracing::debug!(
        "Folders: {} created, {} updated, {} unchanged",
        stats.created,
        stats.updated,
        stats.unchanged
    );

    Ok((stats, ids))
}

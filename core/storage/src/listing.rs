//! Shaping of raw backend listings.
//!
//! Backends hand their native enumeration to these functions so that every
//! provider drops the same artifacts and filters the same way. Order is
//! never changed: it stays whatever the backend returned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw object descriptor from a backend enumeration.
///
/// `key` is native (folder prefix included). Directory entries end in `/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub key: String,
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub is_directory: bool,
}

impl ListingEntry {
    /// Entry for an object.
    pub fn file(key: impl Into<String>, size: Option<u64>, last_modified: Option<DateTime<Utc>>) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified,
            is_directory: false,
        }
    }

    /// Entry for a virtual or real directory; a trailing `/` is enforced.
    pub fn directory(key: impl Into<String>) -> Self {
        let mut key = key.into();
        if !key.ends_with('/') {
            key.push('/');
        }
        Self {
            key,
            size: None,
            last_modified: None,
            is_directory: true,
        }
    }
}

/// Whether `key` names the scoped root itself.
///
/// Compared by value, never by position in the listing.
pub fn is_scoped_root(key: &str, scoped_root: &str) -> bool {
    key.trim_end_matches('/') == scoped_root.trim_end_matches('/')
}

/// Files under the scoped root, optionally restricted to a key suffix.
///
/// Drops the root artifact and every directory marker.
pub fn shape(
    entries: Vec<ListingEntry>,
    scoped_root: &str,
    extension: Option<&str>,
) -> Vec<ListingEntry> {
    entries
        .into_iter()
        .filter(|entry| !is_scoped_root(&entry.key, scoped_root))
        .filter(|entry| !entry.is_directory && !entry.key.ends_with('/'))
        .filter(|entry| match extension {
            Some(ext) => entry.key.ends_with(ext),
            None => true,
        })
        .collect()
}

/// Directories directly below the scoped root.
pub fn child_directories(entries: Vec<ListingEntry>, scoped_root: &str) -> Vec<ListingEntry> {
    entries
        .into_iter()
        .filter(|entry| entry.is_directory || entry.key.ends_with('/'))
        .filter(|entry| !is_scoped_root(&entry.key, scoped_root))
        .filter(|entry| {
            entry
                .key
                .strip_prefix(scoped_root)
                .map(|rest| {
                    let rest = rest.trim_end_matches('/');
                    !rest.is_empty() && !rest.contains('/')
                })
                .unwrap_or(false)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<ListingEntry> {
        vec![
            ListingEntry::directory("game/"),
            ListingEntry::file("game/b.png", Some(3), None),
            ListingEntry::directory("game/img"),
            ListingEntry::file("game/img/a.glb", Some(10), None),
            ListingEntry::file("game/notes.txt", None, None),
        ]
    }

    #[test]
    fn test_shape_drops_root_and_directories() {
        let keys: Vec<String> = shape(sample(), "game/", None)
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["game/b.png", "game/img/a.glb", "game/notes.txt"]);
    }

    #[test]
    fn test_shape_drops_root_anywhere_in_listing() {
        let mut entries = sample();
        let root = entries.remove(0);
        entries.push(root);
        // A root entry reported as a plain object is still an artifact.
        entries.push(ListingEntry::file("game", None, None));

        let shaped = shape(entries, "game/", None);
        assert!(shaped.iter().all(|e| !is_scoped_root(&e.key, "game/")));
        assert_eq!(shaped.len(), 3);
    }

    #[test]
    fn test_shape_suffix_filter() {
        let keys: Vec<String> = shape(sample(), "game/", Some(".png"))
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["game/b.png"]);
    }

    #[test]
    fn test_filter_matching_everything_equals_no_filter() {
        let entries = vec![
            ListingEntry::file("x/a.png", None, None),
            ListingEntry::file("x/b.png", None, None),
        ];
        assert_eq!(
            shape(entries.clone(), "x/", None),
            shape(entries, "x/", Some("png"))
        );
    }

    #[test]
    fn test_shape_preserves_backend_order() {
        let entries = vec![
            ListingEntry::file("z.txt", None, None),
            ListingEntry::file("a.txt", None, None),
        ];
        let keys: Vec<String> = shape(entries, "", None).into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["z.txt", "a.txt"]);
    }

    #[test]
    fn test_child_directories() {
        let mut entries = sample();
        entries.push(ListingEntry::directory("game/img/deep/"));
        let keys: Vec<String> = child_directories(entries, "game/")
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["game/img/"]);
    }
}

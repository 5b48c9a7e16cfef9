//! Asset discovery: typed records derived from raw listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::listing::ListingEntry;

/// Classified type of a stored asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Image,
    Video,
    Audio,
    /// 3D models and scenes.
    Model,
    /// Text, structured data and documents.
    Document,
    Unknown,
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Model => "model",
            Self::Document => "document",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Application-level record for a stored object.
///
/// Never carries `AssetType::Unknown` when produced by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Logical key, relative to the provider's folder.
    pub key: String,
    /// Canonical access URL.
    pub url: String,
    /// Last path segment of the URL, query stripped.
    pub file_name: String,
    pub asset_type: AssetType,
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Classifies an object from its URL and file name.
///
/// Implementations must be pure: same input, same output, no side effects.
pub trait AssetClassifier: Send + Sync {
    fn classify(&self, url: &str, file_name: &str) -> AssetType;
}

/// Classifier based on the MIME type guessed from the file extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct MimeClassifier;

impl AssetClassifier for MimeClassifier {
    fn classify(&self, _url: &str, file_name: &str) -> AssetType {
        // glTF is not in every MIME table.
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".glb") || lower.ends_with(".gltf") || lower.ends_with(".fbx") {
            return AssetType::Model;
        }

        let Some(mime) = mime_guess::from_path(file_name).first() else {
            return AssetType::Unknown;
        };

        match mime.type_().as_str() {
            "image" => AssetType::Image,
            "video" => AssetType::Video,
            "audio" => AssetType::Audio,
            "model" => AssetType::Model,
            "text" => AssetType::Document,
            "application" => match mime.subtype().as_str() {
                "json" | "pdf" | "xml" => AssetType::Document,
                _ => AssetType::Unknown,
            },
            _ => AssetType::Unknown,
        }
    }
}

/// File name of a URL: the last `/` segment of the part before `?query`.
///
/// `get_file_name("https://host/a/b/c.png?sig=xyz")` is `"c.png"`.
pub fn get_file_name(url: &str) -> String {
    let path = url.split_once('?').map_or(url, |(path, _query)| path);
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// Turn listed objects into classified assets.
///
/// `resolve` maps a listing entry to its logical key and canonical URL;
/// entries it rejects, and entries classified as `Unknown`, are dropped.
pub fn discover<F>(
    entries: Vec<ListingEntry>,
    classifier: &dyn AssetClassifier,
    mut resolve: F,
) -> Vec<Asset>
where
    F: FnMut(&ListingEntry) -> Option<(String, String)>,
{
    entries
        .into_iter()
        .filter_map(|entry| {
            let (key, url) = resolve(&entry)?;
            let file_name = get_file_name(&url);
            let asset_type = classifier.classify(&url, &file_name);
            if asset_type == AssetType::Unknown {
                return None;
            }
            Some(Asset {
                key,
                url,
                file_name,
                asset_type,
                size: entry.size,
                last_modified: entry.last_modified,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_file_name_strips_query() {
        assert_eq!(get_file_name("https://host/a/b/c.png?sig=xyz"), "c.png");
        assert_eq!(get_file_name("https://host/a/b/c.png"), "c.png");
        assert_eq!(get_file_name("c.png"), "c.png");
        assert_eq!(get_file_name("https://host/dir/"), "");
        assert_eq!(get_file_name("https://h/a/c.png?sig=ab/cd"), "c.png");
    }

    #[test]
    fn test_mime_classifier() {
        let classifier = MimeClassifier;
        assert_eq!(classifier.classify("", "hero.PNG"), AssetType::Image);
        assert_eq!(classifier.classify("", "intro.mp4"), AssetType::Video);
        assert_eq!(classifier.classify("", "theme.mp3"), AssetType::Audio);
        assert_eq!(classifier.classify("", "ship.glb"), AssetType::Model);
        assert_eq!(classifier.classify("", "level.json"), AssetType::Document);
        assert_eq!(classifier.classify("", "notes.txt"), AssetType::Document);
        assert_eq!(classifier.classify("", "blob.xyz123"), AssetType::Unknown);
        assert_eq!(classifier.classify("", "Makefile"), AssetType::Unknown);
    }

    #[test]
    fn test_discover_drops_unknown() {
        let entries = vec![
            ListingEntry::file("a.png", Some(4), None),
            ListingEntry::file("b.unknownext", Some(4), None),
        ];
        let assets = discover(entries, &MimeClassifier, |entry| {
            Some((entry.key.clone(), format!("https://cdn/{}?v=1", entry.key)))
        });

        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].key, "a.png");
        assert_eq!(assets[0].file_name, "a.png");
        assert_eq!(assets[0].asset_type, AssetType::Image);
        assert_eq!(assets[0].size, Some(4));
    }

    #[test]
    fn test_discover_with_custom_classifier() {
        struct Nothing;
        impl AssetClassifier for Nothing {
            fn classify(&self, _url: &str, _file_name: &str) -> AssetType {
                AssetType::Unknown
            }
        }

        let entries = vec![ListingEntry::file("a.png", None, None)];
        let assets = discover(entries, &Nothing, |e| Some((e.key.clone(), e.key.clone())));
        assert!(assets.is_empty());
    }
}

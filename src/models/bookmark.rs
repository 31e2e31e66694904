use serde::{Deserialize, Serialize};

/// A node in the Bookmark Store: a leaf carries a `url`, anything without one
/// is a folder, with or without a `children` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkNode {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<BookmarkNode>>,
}

impl BookmarkNode {
    pub fn folder(id: impl Into<String>, title: impl Into<String>, children: Vec<Self>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: None,
            children: Some(children),
        }
    }

    pub fn leaf(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: Some(url.into()),
            children: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.url.is_some()
    }

    pub fn is_folder(&self) -> bool {
        self.url.is_none()
    }

    pub fn children(&self) -> &[BookmarkNode] {
        self.children.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDetails {
    pub parent_id: String,
    pub title: String,
    pub url: Option<String>,
}

impl CreateDetails {
    pub fn folder(parent_id: &str, title: &str) -> Self {
        Self {
            parent_id: parent_id.to_string(),
            title: title.to_string(),
            url: None,
        }
    }

    pub fn bookmark(parent_id: &str, title: &str, url: &str) -> Self {
        Self {
            parent_id: parent_id.to_string(),
            title: title.to_string(),
            url: Some(url.to_string()),
        }
    }
}

/// Title/url/children projection of the tree used for history snapshots.
///
/// Folders always keep `children` (possibly empty) so a restore can tell an
/// empty folder apart from a bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplifiedNode {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<SimplifiedNode>>,
}

pub type Snapshot = Vec<SimplifiedNode>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderSummaryEntry {
    pub path: String,
    pub bookmark_count: usize,
    pub folder_count: usize,
}

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::AppError;
use crate::models::bookmark::{BookmarkNode, CreateDetails};

pub const ROOT_ID: &str = "0";
pub const BOOKMARKS_BAR_ID: &str = "1";
pub const OTHER_BOOKMARKS_ID: &str = "2";

const PERMANENT_IDS: &[&str] = &[ROOT_ID, BOOKMARKS_BAR_ID, OTHER_BOOKMARKS_ID];

/// Mutable hierarchical bookmark storage addressed by opaque ids.
pub trait BookmarkStore {
    /// The whole forest, starting at the store's root node(s).
    fn get_tree(&self) -> impl Future<Output = Result<Vec<BookmarkNode>, AppError>> + Send;

    /// Direct children of `id`, each with its subtree.
    fn get_children(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Vec<BookmarkNode>, AppError>> + Send;

    fn create(
        &self,
        details: CreateDetails,
    ) -> impl Future<Output = Result<BookmarkNode, AppError>> + Send;

    /// Re-parents `id` under `parent_id`, appending it last.
    fn move_node(
        &self,
        id: &str,
        parent_id: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Removes `id` together with its whole subtree.
    fn remove_tree(&self, id: &str) -> impl Future<Output = Result<(), AppError>> + Send;
}

struct StoreInner {
    root: BookmarkNode,
    next_id: u64,
}

/// In-process Bookmark Store shaped like a browser profile, optionally backed
/// by a JSON file that is rewritten after every mutation.
pub struct JsonBookmarkStore {
    inner: Mutex<StoreInner>,
    path: Option<PathBuf>,
}

pub fn default_root() -> BookmarkNode {
    BookmarkNode::folder(
        ROOT_ID,
        "",
        vec![
            BookmarkNode::folder(BOOKMARKS_BAR_ID, "Bookmarks bar", vec![]),
            BookmarkNode::folder(OTHER_BOOKMARKS_ID, "Other bookmarks", vec![]),
        ],
    )
}

fn max_numeric_id(node: &BookmarkNode) -> u64 {
    let own = node.id.parse::<u64>().unwrap_or(0);
    node.children()
        .iter()
        .map(max_numeric_id)
        .fold(own, u64::max)
}

fn find<'a>(node: &'a BookmarkNode, id: &str) -> Option<&'a BookmarkNode> {
    if node.id == id {
        return Some(node);
    }
    node.children().iter().find_map(|child| find(child, id))
}

fn find_mut<'a>(node: &'a mut BookmarkNode, id: &str) -> Option<&'a mut BookmarkNode> {
    if node.id == id {
        return Some(node);
    }
    node.children
        .as_mut()?
        .iter_mut()
        .find_map(|child| find_mut(child, id))
}

fn detach(node: &mut BookmarkNode, id: &str) -> Option<BookmarkNode> {
    let children = node.children.as_mut()?;
    if let Some(pos) = children.iter().position(|child| child.id == id) {
        return Some(children.remove(pos));
    }
    children.iter_mut().find_map(|child| detach(child, id))
}

fn not_found(id: &str) -> AppError {
    AppError::Store(format!("node not found: {id}"))
}

impl JsonBookmarkStore {
    pub fn in_memory() -> Self {
        Self::from_root(default_root())
    }

    pub fn from_root(root: BookmarkNode) -> Self {
        let next_id = max_numeric_id(&root) + 1;
        Self {
            inner: Mutex::new(StoreInner { root, next_id }),
            path: None,
        }
    }

    /// Default profile whose bookmarks bar holds `children`.
    pub fn with_bookmarks_bar(children: Vec<BookmarkNode>) -> Self {
        let mut root = default_root();
        if let Some(bar) = find_mut(&mut root, BOOKMARKS_BAR_ID) {
            bar.children = Some(children);
        }
        Self::from_root(root)
    }

    /// Opens `path`, or starts from an empty profile when the file does not exist yet.
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let root = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str(&raw)?
        } else {
            default_root()
        };
        let mut store = Self::from_root(root);
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    fn with_inner<T>(
        &self,
        mutate: bool,
        f: impl FnOnce(&mut StoreInner) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| AppError::Store(format!("store lock poisoned: {e}")))?;
        let out = f(&mut inner)?;
        if mutate {
            self.persist(&inner.root)?;
        }
        Ok(out)
    }

    fn persist(&self, root: &BookmarkNode) -> Result<(), AppError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(root)?)?;
        Ok(())
    }
}

impl BookmarkStore for JsonBookmarkStore {
    async fn get_tree(&self) -> Result<Vec<BookmarkNode>, AppError> {
        self.with_inner(false, |inner| Ok(vec![inner.root.clone()]))
    }

    async fn get_children(&self, id: &str) -> Result<Vec<BookmarkNode>, AppError> {
        self.with_inner(false, |inner| {
            let node = find(&inner.root, id).ok_or_else(|| not_found(id))?;
            Ok(node.children().to_vec())
        })
    }

    async fn create(&self, details: CreateDetails) -> Result<BookmarkNode, AppError> {
        self.with_inner(true, |inner| {
            let id = inner.next_id.to_string();
            let parent = find_mut(&mut inner.root, &details.parent_id)
                .ok_or_else(|| not_found(&details.parent_id))?;
            if parent.is_leaf() {
                return Err(AppError::Store(format!(
                    "cannot create under bookmark {}",
                    details.parent_id
                )));
            }
            let node = match details.url {
                Some(url) => BookmarkNode::leaf(id, details.title, url),
                None => BookmarkNode::folder(id, details.title, vec![]),
            };
            parent
                .children
                .get_or_insert_with(Vec::new)
                .push(node.clone());
            inner.next_id += 1;
            Ok(node)
        })
    }

    async fn move_node(&self, id: &str, parent_id: &str) -> Result<(), AppError> {
        self.with_inner(true, |inner| {
            if PERMANENT_IDS.contains(&id) {
                return Err(AppError::Store(format!("cannot move root folder {id}")));
            }
            let node = find(&inner.root, id).ok_or_else(|| not_found(id))?;
            if find(node, parent_id).is_some() {
                return Err(AppError::Store(format!(
                    "cannot move {id} into its own subtree"
                )));
            }
            let target = find(&inner.root, parent_id).ok_or_else(|| not_found(parent_id))?;
            if target.is_leaf() {
                return Err(AppError::Store(format!(
                    "cannot move into bookmark {parent_id}"
                )));
            }

            let node = detach(&mut inner.root, id).ok_or_else(|| not_found(id))?;
            find_mut(&mut inner.root, parent_id)
                .ok_or_else(|| not_found(parent_id))?
                .children
                .get_or_insert_with(Vec::new)
                .push(node);
            Ok(())
        })
    }

    async fn remove_tree(&self, id: &str) -> Result<(), AppError> {
        self.with_inner(true, |inner| {
            if PERMANENT_IDS.contains(&id) {
                return Err(AppError::Store(format!("cannot remove root folder {id}")));
            }
            detach(&mut inner.root, id)
                .map(|_| ())
                .ok_or_else(|| not_found(id))
        })
    }
}

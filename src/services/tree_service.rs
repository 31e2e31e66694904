use crate::models::bookmark::{BookmarkNode, FolderSummaryEntry, SimplifiedNode, Snapshot};

pub const PATH_SEPARATOR: &str = " > ";

/// Leaf bookmarks in pre-order.
pub fn collect_bookmarks(nodes: &[BookmarkNode]) -> Vec<BookmarkNode> {
    let mut out = Vec::new();
    collect_into(nodes, &mut out);
    out
}

fn collect_into(nodes: &[BookmarkNode], out: &mut Vec<BookmarkNode>) {
    for node in nodes {
        if node.is_leaf() {
            out.push(node.clone());
        } else if let Some(children) = &node.children {
            collect_into(children, out);
        }
    }
}

/// One entry per folder in pre-order, with counts over direct children only.
pub fn flat_folder_structure(nodes: &[BookmarkNode]) -> Vec<FolderSummaryEntry> {
    let mut out = Vec::new();
    summarize_into(nodes, "", &mut out);
    out
}

fn summarize_into(nodes: &[BookmarkNode], prefix: &str, out: &mut Vec<FolderSummaryEntry>) {
    for node in nodes {
        if node.is_leaf() {
            continue;
        }
        let children = node.children();

        let bookmark_count = children.iter().filter(|child| child.is_leaf()).count();
        let folder_count = children.len() - bookmark_count;
        let path = if prefix.is_empty() {
            node.title.clone()
        } else {
            format!("{prefix}{PATH_SEPARATOR}{}", node.title)
        };

        out.push(FolderSummaryEntry {
            path: path.clone(),
            bookmark_count,
            folder_count,
        });

        if folder_count > 0 {
            summarize_into(children, &path, out);
        }
    }
}

/// Titles of the folders containing `id`, outermost first. Empty when `id`
/// sits directly in `nodes` or is not present at all.
pub fn bookmark_path(nodes: &[BookmarkNode], id: &str) -> Vec<String> {
    let mut trail = Vec::new();
    if find_path(nodes, id, &mut trail) {
        trail
    } else {
        Vec::new()
    }
}

fn find_path(nodes: &[BookmarkNode], id: &str, trail: &mut Vec<String>) -> bool {
    for node in nodes {
        if node.id == id {
            return true;
        }
        if let Some(children) = &node.children {
            trail.push(node.title.clone());
            if find_path(children, id, trail) {
                return true;
            }
            trail.pop();
        }
    }
    false
}

pub fn find_node<'a>(nodes: &'a [BookmarkNode], id: &str) -> Option<&'a BookmarkNode> {
    nodes.iter().find_map(|node| {
        if node.id == id {
            Some(node)
        } else {
            find_node(node.children(), id)
        }
    })
}

/// Title/url/children projection used for history snapshots.
pub fn simplify_structure(nodes: &[BookmarkNode]) -> Snapshot {
    nodes
        .iter()
        .map(|node| SimplifiedNode {
            title: node.title.clone(),
            url: node.url.clone(),
            children: if node.is_leaf() {
                None
            } else {
                Some(simplify_structure(node.children()))
            },
        })
        .collect()
}

pub fn format_path(path: &[String]) -> String {
    path.join(PATH_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_forest() -> Vec<BookmarkNode> {
        vec![BookmarkNode::folder(
            "1",
            "Bar",
            vec![
                BookmarkNode::leaf("2", "A", "http://a"),
                BookmarkNode::folder("3", "Sub", vec![BookmarkNode::leaf("4", "B", "http://b")]),
            ],
        )]
    }

    #[test]
    fn flattens_leaves_in_preorder() {
        let leaves = collect_bookmarks(&scenario_forest());
        let titles: Vec<&str> = leaves.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn folder_summary_counts_direct_children() {
        let summary = flat_folder_structure(&scenario_forest());
        assert_eq!(
            summary,
            vec![
                FolderSummaryEntry {
                    path: "Bar".to_string(),
                    bookmark_count: 1,
                    folder_count: 1,
                },
                FolderSummaryEntry {
                    path: "Bar > Sub".to_string(),
                    bookmark_count: 1,
                    folder_count: 0,
                },
            ]
        );
    }

    #[test]
    fn empty_folders_are_summarized_with_zero_counts() {
        let forest = vec![BookmarkNode::folder(
            "1",
            "Bar",
            vec![BookmarkNode::folder("2", "Empty", vec![])],
        )];
        let summary = flat_folder_structure(&forest);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[1].path, "Bar > Empty");
        assert_eq!(summary[1].bookmark_count, 0);
        assert_eq!(summary[1].folder_count, 0);
        assert!(collect_bookmarks(&forest).is_empty());
    }

    #[test]
    fn handles_deep_nesting() {
        let mut node = BookmarkNode::leaf("leaf", "Deep", "http://deep");
        for depth in 0..200 {
            node = BookmarkNode::folder(format!("f{depth}"), format!("L{depth}"), vec![node]);
        }
        let forest = vec![node];

        assert_eq!(collect_bookmarks(&forest).len(), 1);
        assert_eq!(flat_folder_structure(&forest).len(), 200);
        let path = bookmark_path(&forest, "leaf");
        assert_eq!(path.len(), 200);
        assert_eq!(path.first().map(String::as_str), Some("L199"));
        assert_eq!(path.last().map(String::as_str), Some("L0"));
    }

    #[test]
    fn path_excludes_own_title() {
        let forest = scenario_forest();
        assert_eq!(bookmark_path(&forest, "4"), vec!["Bar", "Sub"]);
        assert_eq!(bookmark_path(&forest, "2"), vec!["Bar"]);
    }

    #[test]
    fn missing_id_yields_empty_path() {
        assert!(bookmark_path(&scenario_forest(), "404").is_empty());
    }

    #[test]
    fn simplify_keeps_empty_folders_and_urls() {
        let forest = vec![BookmarkNode::folder(
            "1",
            "",
            vec![
                BookmarkNode::folder("2", "Empty", vec![]),
                BookmarkNode::leaf("3", "A", "http://a"),
            ],
        )];
        let snapshot = simplify_structure(&forest);
        assert_eq!(
            snapshot,
            vec![SimplifiedNode {
                title: String::new(),
                url: None,
                children: Some(vec![
                    SimplifiedNode {
                        title: "Empty".to_string(),
                        url: None,
                        children: Some(vec![]),
                    },
                    SimplifiedNode {
                        title: "A".to_string(),
                        url: Some("http://a".to_string()),
                        children: None,
                    },
                ]),
            }]
        );
    }

    #[test]
    fn folder_without_children_key_is_summarized() {
        let forest: Vec<BookmarkNode> =
            serde_json::from_str(r#"[{"id":"5","title":"Work"},{"id":"6","title":"X","url":"http://x"}]"#)
                .unwrap();
        let summary = flat_folder_structure(&forest);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].path, "Work");
        assert_eq!(summary[0].bookmark_count, 0);
        assert_eq!(simplify_structure(&forest)[0].children, Some(vec![]));
    }

    #[test]
    fn find_node_searches_subtrees() {
        let forest = scenario_forest();
        assert_eq!(find_node(&forest, "3").map(|n| n.title.as_str()), Some("Sub"));
        assert!(find_node(&forest, "nope").is_none());
    }
}

//! Shadow copy of the host's rendering tree
//!
//! Nodes live in an id-keyed arena; children are stored as ordered id lists.
//! A diff batch is applied to a staged copy and only committed once the
//! resulting tree validates, so a rejected batch leaves no trace.

use std::collections::{BTreeSet, HashMap, HashSet};

use remote_ui_protocol::{RenderingDom, RenderingDomContent, RenderingDomDiff, RenderingDomDiffType};

use crate::error::{Classify, ErrorKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowNode {
    pub id: i64,
    pub content: Option<RenderingDomContent>,
    pub children: Vec<i64>,
    pub parent: Option<i64>,
}

impl ShadowNode {
    fn new(id: i64, content: Option<RenderingDomContent>, children: Vec<i64>) -> Self {
        Self {
            id,
            content,
            children,
            parent: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("node {0} already exists")]
    DuplicateId(i64),
    #[error("node {0} does not exist")]
    UnknownId(i64),
    #[error("node {parent} lists missing child {child}")]
    UnknownChild { parent: i64, child: i64 },
    #[error("node {child} is listed by both {first} and {second}")]
    MultipleParents { child: i64, first: i64, second: i64 },
    #[error("node {0} is its own ancestor")]
    Cycle(i64),
    #[error("no single root; parentless nodes: {0:?}")]
    AmbiguousRoot(Vec<i64>),
}

impl Classify for TreeError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateId(_) => ErrorKind::DuplicateId,
            Self::UnknownId(_) | Self::UnknownChild { .. } => ErrorKind::UnknownId,
            Self::MultipleParents { .. } | Self::Cycle(_) | Self::AmbiguousRoot(_) => {
                ErrorKind::InvalidStructure
            }
        }
    }
}

/// Which node ids a commit touched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub created: Vec<i64>,
    pub modified: Vec<i64>,
    pub removed: Vec<i64>,
}

impl DiffSummary {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }
}

/// Bookkeeping for one batch, keyed by the op index that touched each id
#[derive(Debug, Default)]
struct BatchMarks {
    /// Last deletion of each id
    deleted: HashMap<i64, usize>,
    /// Last time each id received an explicit child list
    listed: HashMap<i64, usize>,
    /// Descendants of deleted nodes as they stood when the deletion ran
    orphaned: HashSet<i64>,
}

impl BatchMarks {
    fn orphan_subtree(&mut self, staged: &HashMap<i64, ShadowNode>, node: &ShadowNode) {
        let mut stack = node.children.clone();
        while let Some(id) = stack.pop() {
            if let Some(child) = staged.get(&id) {
                if self.orphaned.insert(id) {
                    stack.extend(child.children.iter().copied());
                }
            }
        }
    }

    /// A deletion silently detaches `child` from `parent` unless the parent's
    /// list was written after the deletion, which makes it a dangling reference
    fn detaches(&self, parent: i64, child: i64) -> bool {
        self.deleted.get(&child).is_some_and(|&deleted| {
            self.listed.get(&parent).map_or(true, |&listed| deleted > listed)
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShadowTree {
    nodes: HashMap<i64, ShadowNode>,
    root: Option<i64>,
}

impl ShadowTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub const fn root_id(&self) -> Option<i64> {
        self.root
    }

    pub fn root(&self) -> Option<&ShadowNode> {
        self.root.and_then(|id| self.nodes.get(&id))
    }

    pub fn get(&self, id: i64) -> Option<&ShadowNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.nodes.keys().copied()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    /// Replace the whole tree with a full render
    pub fn replace(&mut self, dom: Option<&RenderingDom>) -> Result<DiffSummary, TreeError> {
        let mut staged: HashMap<i64, ShadowNode> = HashMap::new();
        let mut stack: Vec<(&RenderingDom, Option<i64>)> = dom.map(|d| (d, None)).into_iter().collect();
        while let Some((node, parent)) = stack.pop() {
            let children: Vec<i64> = node.children().map(|c| c.id).collect();
            let mut shadow = ShadowNode::new(node.id, node.content.clone(), children);
            shadow.parent = parent;
            if staged.insert(node.id, shadow).is_some() {
                return Err(TreeError::DuplicateId(node.id));
            }
            stack.extend(node.children().rev().map(|c| (c, Some(node.id))));
        }

        let summary = self.summarize(&staged, Vec::new());
        self.nodes = staged;
        self.root = dom.map(|d| d.id);
        Ok(summary)
    }

    /// Apply one frame's diffs atomically
    pub fn apply_batch(&mut self, ops: &[RenderingDomDiff]) -> Result<DiffSummary, TreeError> {
        if ops.is_empty() {
            return Ok(DiffSummary::default());
        }

        let mut staged = self.nodes.clone();
        let mut modified = Vec::new();
        let mut marks = BatchMarks::default();

        for (step, op) in ops.iter().enumerate() {
            match op.diff_type {
                RenderingDomDiffType::Created => {
                    if staged.contains_key(&op.id) {
                        return Err(TreeError::DuplicateId(op.id));
                    }
                    let children = op.children.clone().unwrap_or_default();
                    staged.insert(op.id, ShadowNode::new(op.id, op.content.clone(), children));
                    marks.listed.insert(op.id, step);
                }
                RenderingDomDiffType::Modified => {
                    let node = staged.get_mut(&op.id).ok_or(TreeError::UnknownId(op.id))?;
                    if let Some(content) = &op.content {
                        node.content = Some(content.clone());
                    }
                    // A null child list leaves the current children alone.
                    if let Some(children) = &op.children {
                        node.children.clone_from(children);
                        marks.listed.insert(op.id, step);
                    }
                    modified.push(op.id);
                }
                RenderingDomDiffType::Deleted => {
                    let node = staged.remove(&op.id).ok_or(TreeError::UnknownId(op.id))?;
                    marks.deleted.insert(op.id, step);
                    marks.orphan_subtree(&staged, &node);
                }
            }
        }

        let root = Self::link(&mut staged, &marks, self.root)?;
        match root {
            Some(root) => Self::collect_unreachable(&mut staged, root),
            // Whatever is left hangs off a deleted subtree.
            None => staged.clear(),
        }

        modified.retain(|id| staged.contains_key(id));
        let summary = self.summarize(&staged, modified);
        self.nodes = staged;
        self.root = root;
        Ok(summary)
    }

    /// Resolve child lists, set parent links and pick the root
    fn link(
        staged: &mut HashMap<i64, ShadowNode>,
        marks: &BatchMarks,
        previous_root: Option<i64>,
    ) -> Result<Option<i64>, TreeError> {
        // Sorted so the reported error does not depend on hash order.
        let order: BTreeSet<i64> = staged.keys().copied().collect();
        let mut parents: HashMap<i64, i64> = HashMap::with_capacity(staged.len());

        for &id in &order {
            let node = staged.get(&id).ok_or(TreeError::UnknownId(id))?;
            let mut kept = Vec::with_capacity(node.children.len());
            for &child in &node.children {
                if !staged.contains_key(&child) {
                    if marks.detaches(id, child) {
                        continue;
                    }
                    return Err(TreeError::UnknownChild { parent: id, child });
                }
                if let Some(&first) = parents.get(&child) {
                    return Err(TreeError::MultipleParents {
                        child,
                        first,
                        second: id,
                    });
                }
                parents.insert(child, id);
                kept.push(child);
            }
            if let Some(node) = staged.get_mut(&id) {
                node.children = kept;
            }
        }

        for &id in &order {
            let mut seen = HashSet::new();
            let mut cursor = id;
            while let Some(&parent) = parents.get(&cursor) {
                if !seen.insert(cursor) || parent == id {
                    return Err(TreeError::Cycle(id));
                }
                cursor = parent;
            }
        }

        for (id, node) in staged.iter_mut() {
            node.parent = parents.get(id).copied();
        }

        // Descendants of a deleted node that nothing adopted go with it.
        let parentless: Vec<i64> = order
            .iter()
            .copied()
            .filter(|id| !parents.contains_key(id) && !marks.orphaned.contains(id))
            .collect();
        match previous_root {
            Some(root) if parentless.contains(&root) => Ok(Some(root)),
            _ => match parentless.as_slice() {
                [] => Ok(None),
                [root] => Ok(Some(*root)),
                _ => Err(TreeError::AmbiguousRoot(parentless)),
            },
        }
    }

    /// Drop nodes that can no longer be reached from `root`
    fn collect_unreachable(staged: &mut HashMap<i64, ShadowNode>, root: i64) {
        let mut reachable = HashSet::with_capacity(staged.len());
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if reachable.insert(id) {
                if let Some(node) = staged.get(&id) {
                    stack.extend(node.children.iter().copied());
                }
            }
        }
        staged.retain(|id, _| reachable.contains(id));
    }

    fn summarize(&self, next: &HashMap<i64, ShadowNode>, mut modified: Vec<i64>) -> DiffSummary {
        let mut created: Vec<i64> = next.keys().filter(|id| !self.nodes.contains_key(id)).copied().collect();
        let mut removed: Vec<i64> = self.nodes.keys().filter(|id| !next.contains_key(id)).copied().collect();
        if modified.is_empty() {
            modified = next
                .iter()
                .filter(|(id, node)| self.nodes.get(id).is_some_and(|old| old != *node))
                .map(|(id, _)| *id)
                .collect();
        }
        created.sort_unstable();
        removed.sort_unstable();
        modified.sort_unstable();
        modified.dedup();
        DiffSummary {
            created,
            modified,
            removed,
        }
    }

    /// Ids in depth-first pre-order, each paired with its parent and its index
    /// in the parent's child list
    pub fn preorder(&self) -> Vec<(i64, Option<i64>, usize)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(i64, Option<i64>, usize)> = self.root.map(|r| (r, None, 0)).into_iter().collect();
        while let Some((id, parent, index)) = stack.pop() {
            out.push((id, parent, index));
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.children.iter().enumerate().rev().map(|(i, &c)| (c, Some(id), i)));
            }
        }
        out
    }

    /// Rebuild the nested form, e.g. for inspection or comparison
    pub fn to_dom(&self) -> Option<RenderingDom> {
        self.root.and_then(|root| self.build_dom(root))
    }

    fn build_dom(&self, id: i64) -> Option<RenderingDom> {
        let node = self.nodes.get(&id)?;
        let children = node
            .children
            .iter()
            .filter_map(|&c| self.build_dom(c).map(Box::new))
            .collect::<Vec<_>>();
        Some(RenderingDom {
            id,
            content: node.content.clone(),
            children: (!children.is_empty()).then_some(children),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_ui_protocol::Rect;

    fn content(x: i64) -> RenderingDomContent {
        RenderingDomContent {
            bounds: Rect::new(x, 0, x + 10, 10),
            valid_area: Rect::new(x, 0, x + 10, 10),
            ..RenderingDomContent::default()
        }
    }

    fn leaf(id: i64) -> Box<RenderingDom> {
        Box::new(RenderingDom {
            id,
            content: Some(content(id * 10)),
            children: None,
        })
    }

    fn two_node_tree() -> ShadowTree {
        let mut tree = ShadowTree::new();
        tree.replace(Some(&RenderingDom {
            id: -1,
            content: None,
            children: Some(vec![leaf(0), leaf(1)]),
        }))
        .unwrap();
        tree
    }

    #[test]
    fn replace_builds_parent_links() {
        let tree = two_node_tree();
        assert_eq!(tree.root_id(), Some(-1));
        assert_eq!(tree.get(-1).unwrap().children, vec![0, 1]);
        assert_eq!(tree.get(1).unwrap().parent, Some(-1));
    }

    #[test]
    fn replace_rejects_duplicate_ids() {
        let mut tree = two_node_tree();
        let before = tree.clone();
        let err = tree
            .replace(Some(&RenderingDom {
                id: 5,
                content: None,
                children: Some(vec![leaf(6), leaf(6)]),
            }))
            .unwrap_err();
        assert_eq!(err, TreeError::DuplicateId(6));
        assert_eq!(tree, before);
    }

    #[test]
    fn empty_batch_changes_nothing() {
        let mut tree = two_node_tree();
        let before = tree.clone();
        let summary = tree.apply_batch(&[]).unwrap();
        assert!(summary.is_empty());
        assert_eq!(tree, before);
    }

    #[test]
    fn deleting_a_child_detaches_it() {
        let mut tree = two_node_tree();
        let summary = tree.apply_batch(&[RenderingDomDiff::deleted(0)]).unwrap();

        assert_eq!(summary.removed, vec![0]);
        let mut ids: Vec<i64> = tree.ids().collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![-1, 1]);
        assert_eq!(tree.get(-1).unwrap().children, vec![1]);
    }

    #[test]
    fn forward_references_resolve_within_batch() {
        let mut tree = ShadowTree::new();
        tree.apply_batch(&[
            RenderingDomDiff::created(3, Some(content(3)), vec![]),
            RenderingDomDiff::created(2, Some(content(2)), vec![]),
            RenderingDomDiff::modified(2, None, Some(vec![3])),
        ])
        .unwrap();

        assert_eq!(tree.root_id(), Some(2));
        assert_eq!(tree.get(2).unwrap().children, vec![3]);
        assert_eq!(tree.get(2).unwrap().content, Some(content(2)));
    }

    #[test]
    fn child_created_after_its_parent_lists_it() {
        let mut tree = two_node_tree();
        tree.apply_batch(&[
            RenderingDomDiff::modified(-1, None, Some(vec![0, 1, 7])),
            RenderingDomDiff::created(7, Some(content(7)), vec![]),
        ])
        .unwrap();
        assert_eq!(tree.get(7).unwrap().parent, Some(-1));
    }

    #[test]
    fn failed_batch_rolls_back() {
        let mut tree = two_node_tree();
        let before = tree.clone();
        let err = tree
            .apply_batch(&[
                RenderingDomDiff::created(5, None, vec![]),
                RenderingDomDiff::modified(99, None, Some(vec![5])),
            ])
            .unwrap_err();

        assert_eq!(err, TreeError::UnknownId(99));
        assert_eq!(err.kind(), ErrorKind::UnknownId);
        assert_eq!(tree, before);
    }

    #[test]
    fn duplicate_create_is_rejected() {
        let mut tree = two_node_tree();
        let err = tree
            .apply_batch(&[RenderingDomDiff::created(1, None, vec![])])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateId);
    }

    #[test]
    fn dangling_child_is_rejected() {
        let mut tree = two_node_tree();
        let err = tree
            .apply_batch(&[RenderingDomDiff::modified(1, None, Some(vec![42]))])
            .unwrap_err();
        assert_eq!(err, TreeError::UnknownChild { parent: 1, child: 42 });
    }

    #[test]
    fn second_parent_is_rejected() {
        let mut tree = two_node_tree();
        let err = tree
            .apply_batch(&[RenderingDomDiff::modified(0, None, Some(vec![1]))])
            .unwrap_err();
        assert_eq!(
            err,
            TreeError::MultipleParents {
                child: 1,
                first: -1,
                second: 0
            }
        );
    }

    #[test]
    fn cycle_is_rejected() {
        let mut tree = two_node_tree();
        let err = tree
            .apply_batch(&[
                RenderingDomDiff::modified(-1, None, Some(vec![0])),
                RenderingDomDiff::modified(0, None, Some(vec![1])),
                RenderingDomDiff::modified(1, None, Some(vec![-1])),
            ])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStructure);
    }

    #[test]
    fn reparented_node_survives_parent_deletion() {
        let mut tree = ShadowTree::new();
        tree.replace(Some(&RenderingDom {
            id: 1,
            content: None,
            children: Some(vec![
                Box::new(RenderingDom {
                    id: 2,
                    content: None,
                    children: Some(vec![leaf(3), leaf(4)]),
                }),
                leaf(5),
            ]),
        }))
        .unwrap();

        let summary = tree
            .apply_batch(&[
                RenderingDomDiff::deleted(2),
                RenderingDomDiff::modified(5, None, Some(vec![3])),
            ])
            .unwrap();

        assert_eq!(summary.removed, vec![2, 4]);
        assert_eq!(tree.get(3).unwrap().parent, Some(5));
        assert!(!tree.contains(4));
    }

    #[test]
    fn new_root_replaces_deleted_root() {
        let mut tree = two_node_tree();
        tree.apply_batch(&[
            RenderingDomDiff::deleted(-1),
            RenderingDomDiff::created(-2, None, vec![0, 1]),
        ])
        .unwrap();
        assert_eq!(tree.root_id(), Some(-2));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn deleting_the_root_empties_the_tree() {
        let mut tree = two_node_tree();
        let summary = tree.apply_batch(&[RenderingDomDiff::deleted(-1)]).unwrap();

        assert_eq!(summary.removed, vec![-1, 0, 1]);
        assert_eq!(tree.root_id(), None);
        assert!(tree.is_empty());
        assert_eq!(tree.to_dom(), None);
    }

    #[test]
    fn deleted_subtree_goes_with_its_parent() {
        let mut tree = ShadowTree::new();
        tree.replace(Some(&RenderingDom {
            id: 1,
            content: None,
            children: Some(vec![
                Box::new(RenderingDom {
                    id: 2,
                    content: None,
                    children: Some(vec![leaf(3)]),
                }),
                leaf(4),
            ]),
        }))
        .unwrap();

        let summary = tree.apply_batch(&[RenderingDomDiff::deleted(2)]).unwrap();
        assert_eq!(summary.removed, vec![2, 3]);
        assert_eq!(tree.root_id(), Some(1));
        assert_eq!(tree.get(1).unwrap().children, vec![4]);
    }

    #[test]
    fn list_written_after_deletion_cannot_name_the_deleted_node() {
        let mut tree = two_node_tree();
        let err = tree
            .apply_batch(&[
                RenderingDomDiff::deleted(0),
                RenderingDomDiff::modified(-1, None, Some(vec![0, 1])),
            ])
            .unwrap_err();

        assert_eq!(err, TreeError::UnknownChild { parent: -1, child: 0 });
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.get(-1).unwrap().children, vec![0, 1]);
    }

    #[test]
    fn list_written_before_deletion_is_pruned() {
        let mut tree = two_node_tree();
        tree.apply_batch(&[
            RenderingDomDiff::modified(-1, None, Some(vec![1, 0])),
            RenderingDomDiff::deleted(0),
        ])
        .unwrap();
        assert_eq!(tree.get(-1).unwrap().children, vec![1]);
    }

    #[test]
    fn created_node_cannot_list_a_deleted_node() {
        let mut tree = two_node_tree();
        let err = tree
            .apply_batch(&[
                RenderingDomDiff::deleted(1),
                RenderingDomDiff::created(7, None, vec![1]),
                RenderingDomDiff::modified(-1, None, Some(vec![0, 7])),
            ])
            .unwrap_err();
        assert_eq!(err, TreeError::UnknownChild { parent: 7, child: 1 });
    }

    #[test]
    fn to_dom_round_trips_replace() {
        let dom = RenderingDom {
            id: -1,
            content: None,
            children: Some(vec![leaf(0), leaf(1)]),
        };
        let mut tree = ShadowTree::new();
        tree.replace(Some(&dom)).unwrap();
        assert_eq!(tree.to_dom(), Some(dom));
    }

    #[test]
    fn preorder_lists_indices() {
        let tree = two_node_tree();
        assert_eq!(
            tree.preorder(),
            vec![(-1, None, 0), (0, Some(-1), 0), (1, Some(-1), 1)]
        );
    }
}

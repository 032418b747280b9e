//! Tree assembly from flat parent/child records
//!
//! A [`HierarchySource`] hands out the minimal projection of a hierarchical
//! entity (`id`, `name`, `parent_id`), and [`assemble`] turns that flat set
//! into a nested [`TreeNode`] under a chosen root.
//!
//! Stored data is not trusted to be acyclic. The walk tracks visited IDs and
//! stops at the configured depth, so bad input fails with
//! [`RepositoryErrorKind::CycleDetected`] or
//! [`RepositoryErrorKind::DepthExceeded`] instead of recursing forever.
//!
//! # Example
//!
//! ```rust
//! use acton_query::hierarchy::{assemble, MinimalNode, DEFAULT_MAX_DEPTH};
//!
//! let nodes = vec![
//!     MinimalNode::new(1, "A", None),
//!     MinimalNode::new(2, "B", Some(1)),
//!     MinimalNode::new(3, "C", Some(1)),
//!     MinimalNode::new(4, "D", Some(2)),
//! ];
//!
//! let tree = assemble(&nodes, &1, DEFAULT_MAX_DEPTH).unwrap().unwrap();
//! assert_eq!(tree.children.len(), 2);
//! assert_eq!(tree.children[0].children[0].name, "D");
//!
//! assert!(assemble(&nodes, &9, DEFAULT_MAX_DEPTH).unwrap().is_none());
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::repository::{
    Entity, RepositoryError, RepositoryErrorKind, RepositoryOperation, RepositoryResult,
};
use crate::specification::QuerySettings;

/// Depth cap used when none is configured
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Ceiling on any depth cap
///
/// The walk and the assembled [`TreeNode`] both recurse once per level, so
/// larger caps are lowered to this value.
pub const MAX_TREE_DEPTH: usize = 1024;

/// Flat record a tree is assembled from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimalNode<Id> {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<Id>,
}

impl<Id> MinimalNode<Id> {
    pub fn new(id: Id, name: impl Into<String>, parent_id: Option<Id>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id,
        }
    }
}

/// Assembled tree node owning its subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode<Id> {
    pub id: Id,
    pub name: String,
    pub children: Vec<TreeNode<Id>>,
}

impl<Id: PartialEq> TreeNode<Id> {
    /// Number of nodes in this subtree, itself included
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }

    /// Edges on the longest path down from this node
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Depth-first search for a node in this subtree
    pub fn find(&self, id: &Id) -> Option<&TreeNode<Id>> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// Entity that can be projected onto a [`MinimalNode`]
pub trait Hierarchical: Entity {
    fn node(&self) -> MinimalNode<Self::Id>;
}

/// Supplies the minimal projection a tree under `root` is built from
///
/// Implementations may return more than the root's subtree. Nodes not
/// reachable from the root are ignored by the assembler.
pub trait HierarchySource<Id>: Send + Sync {
    fn minimal_nodes(
        &self,
        root: &Id,
        cancel: &CancellationToken,
    ) -> impl Future<Output = RepositoryResult<Vec<MinimalNode<Id>>>> + Send;
}

/// Build the tree under `root` from a flat node set
///
/// Returns `Ok(None)` when `root` is not in `nodes`, which is distinct from a
/// root with no children. When an ID appears twice, its first record wins.
/// Children keep their input order. Depth counts edges from the root, so a
/// `max_depth` of zero allows only the root itself. A `max_depth` above
/// [`MAX_TREE_DEPTH`] is lowered to it.
pub fn assemble<Id>(
    nodes: &[MinimalNode<Id>],
    root: &Id,
    max_depth: usize,
) -> RepositoryResult<Option<TreeNode<Id>>>
where
    Id: Clone + Eq + Hash + Display,
{
    Walk::index(nodes, max_depth, None).run(root)
}

struct Walk<'a, Id> {
    nodes: HashMap<&'a Id, &'a MinimalNode<Id>>,
    children: HashMap<&'a Id, Vec<&'a MinimalNode<Id>>>,
    max_depth: usize,
    cancel: Option<&'a CancellationToken>,
}

impl<'a, Id> Walk<'a, Id>
where
    Id: Clone + Eq + Hash + Display,
{
    fn index(
        records: &'a [MinimalNode<Id>],
        max_depth: usize,
        cancel: Option<&'a CancellationToken>,
    ) -> Self {
        let mut nodes: HashMap<&Id, &MinimalNode<Id>> = HashMap::with_capacity(records.len());
        let mut children: HashMap<&Id, Vec<&MinimalNode<Id>>> = HashMap::new();
        for record in records {
            if nodes.contains_key(&record.id) {
                debug!(id = %record.id, "ignoring duplicate node");
                continue;
            }
            nodes.insert(&record.id, record);
            if let Some(ref parent) = record.parent_id {
                children.entry(parent).or_default().push(record);
            }
        }
        Self {
            nodes,
            children,
            max_depth: max_depth.min(MAX_TREE_DEPTH),
            cancel,
        }
    }

    fn run(&self, root: &Id) -> RepositoryResult<Option<TreeNode<Id>>> {
        let Some(&root) = self.nodes.get(root) else {
            return Ok(None);
        };
        let mut visited = HashSet::with_capacity(self.nodes.len());
        let mut stack = vec![self.enter(root, 0, &mut visited)?];

        // Depth-first with an explicit stack; each frame finishes into its parent
        while let Some(frame) = stack.last_mut() {
            if let Some(&child) = self.kids(frame.node).get(frame.next) {
                frame.next += 1;
                let depth = stack.len();
                let entered = self.enter(child, depth, &mut visited)?;
                stack.push(entered);
                continue;
            }
            let Some(done) = stack.pop() else {
                break;
            };
            let tree = TreeNode {
                id: done.node.id.clone(),
                name: done.node.name.clone(),
                children: done.children,
            };
            match stack.last_mut() {
                Some(parent) => parent.children.push(tree),
                None => return Ok(Some(tree)),
            }
        }
        Ok(None)
    }

    fn kids(&self, node: &MinimalNode<Id>) -> &[&'a MinimalNode<Id>] {
        self.children
            .get(&node.id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn enter(
        &self,
        node: &'a MinimalNode<Id>,
        depth: usize,
        visited: &mut HashSet<&'a Id>,
    ) -> RepositoryResult<Frame<'a, Id>> {
        if self.cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(RepositoryError::cancelled(RepositoryOperation::BuildTree));
        }
        if !visited.insert(&node.id) {
            let mut error = RepositoryError::new(
                RepositoryOperation::BuildTree,
                RepositoryErrorKind::CycleDetected,
                format!("node {} is its own ancestor", node.id),
            );
            error.entity_id = Some(node.id.to_string());
            return Err(error);
        }
        if depth > self.max_depth {
            let mut error = RepositoryError::new(
                RepositoryOperation::BuildTree,
                RepositoryErrorKind::DepthExceeded,
                format!("hierarchy is deeper than {} levels", self.max_depth),
            );
            error.entity_id = Some(node.id.to_string());
            return Err(error);
        }
        Ok(Frame {
            node,
            next: 0,
            children: Vec::with_capacity(self.kids(node).len()),
        })
    }
}

/// A node whose children are still being assembled
struct Frame<'a, Id> {
    node: &'a MinimalNode<Id>,
    next: usize,
    children: Vec<TreeNode<Id>>,
}

/// Fetches minimal nodes from a source and assembles them
pub struct HierarchyAssembler<S> {
    source: S,
    max_depth: usize,
}

impl<S> HierarchyAssembler<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Use the depth cap from query settings
    pub fn with_settings(self, settings: &QuerySettings) -> Self {
        self.with_max_depth(settings.max_tree_depth)
    }

    /// Set the depth cap, lowered to [`MAX_TREE_DEPTH`] if larger
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.min(MAX_TREE_DEPTH);
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Build the tree rooted at `root`
    ///
    /// `Ok(None)` means the root does not exist.
    #[tracing::instrument(skip_all, fields(root = %root, max_depth = self.max_depth))]
    pub async fn build_tree<Id>(
        &self,
        root: &Id,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Option<TreeNode<Id>>>
    where
        S: HierarchySource<Id>,
        Id: Clone + Eq + Hash + Display + Send + Sync,
    {
        let nodes = self
            .source
            .minimal_nodes(root, cancel)
            .await
            .map_err(|e| e.with_operation(RepositoryOperation::BuildTree))?;
        let tree = Walk::index(&nodes, self.max_depth, Some(cancel)).run(root)?;
        match tree {
            Some(ref tree) => debug!(nodes = tree.size(), depth = tree.depth(), "tree assembled"),
            None => debug!(candidates = nodes.len(), "root not found"),
        }
        Ok(tree)
    }
}

//! Memoized opponent model shared across hypergames.
//!
//! The tree mirrors the explored prefix of the joint-move tree. Each node
//! is keyed by its action-path hash and carries the opponent-rollout value
//! estimated when its parent was expanded, plus the likelihood of this node
//! relative to its siblings. The relative likelihood of a full hypergame is
//! the product of relative likelihoods along its hash path.
//!
//! Nodes live in an arena and reference each other by stable indices, with
//! parent back-references for renormalisation when a child is proven
//! inconsistent and its value drops to zero.

use crate::types::PathHash;

/// Stable index of a node in the tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    hash: PathHash,
    /// Opponent-rollout aggregate; non-negative. Zero marks a branch proven
    /// inconsistent with the observed percepts.
    value: f64,
    /// Fraction of the parent's total value carried by this node. `None`
    /// until the sibling set has been normalised.
    rel_likelihood: Option<f64>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    expanded: bool,
}

pub struct LikelihoodTree {
    nodes: Vec<Node>,
}

impl LikelihoodTree {
    /// A tree with a lone root at the given action-path hash. The root's
    /// relative likelihood is fixed at 1.0; its value is whatever the
    /// caller seeds it with.
    pub fn new(root_hash: PathHash) -> Self {
        LikelihoodTree {
            nodes: vec![Node {
                hash: root_hash,
                value: 0.0,
                rel_likelihood: Some(1.0),
                parent: None,
                children: Vec::new(),
                expanded: false,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn value(&self, id: NodeId) -> f64 {
        self.nodes[id.0].value
    }

    pub fn rel_likelihood(&self, id: NodeId) -> Option<f64> {
        self.nodes[id.0].rel_likelihood
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.nodes[id.0].expanded
    }

    pub fn hash(&self, id: NodeId) -> PathHash {
        self.nodes[id.0].hash
    }

    pub fn child_by_hash(&self, parent: NodeId, hash: PathHash) -> Option<NodeId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c.0].hash == hash)
    }

    /// Walk the hash path from the root and return the node it names.
    ///
    /// The path's first element must be the root's hash; each further
    /// element selects a child. Returns `None` as soon as a child is
    /// missing.
    pub fn node(&self, hash_path: &[PathHash]) -> Option<NodeId> {
        let mut steps = hash_path.iter().copied();
        let first = steps.next()?;
        if first != self.nodes[0].hash {
            return None;
        }
        let mut current = self.root();
        for hash in steps {
            current = self.child_by_hash(current, hash)?;
        }
        Some(current)
    }

    /// The relative likelihood of the history named by `hash_path`: the
    /// product of relative likelihoods along the path.
    ///
    /// A node normalised to 0.0 short-circuits the product to 0.0. Nodes
    /// that have not been normalised yet, and the unexplored tail past the
    /// last known node, contribute a neutral factor.
    pub fn relative_likelihood(&self, hash_path: &[PathHash]) -> f64 {
        let mut steps = hash_path.iter().copied();
        let Some(first) = steps.next() else {
            return 0.0;
        };
        if first != self.nodes[0].hash {
            return 0.0;
        }

        let mut likelihood: f64 = 1.0;
        let mut current = self.root();
        for hash in steps {
            let Some(child) = self.child_by_hash(current, hash) else {
                break;
            };
            match self.nodes[child.0].rel_likelihood {
                Some(rel) if rel > 0.0 => likelihood *= rel,
                Some(_) => return 0.0,
                None => {}
            }
            current = child;
        }
        likelihood
    }

    /// Attach value-carrying children under `parent`, normalise their
    /// relative likelihoods, and mark the parent expanded.
    ///
    /// Children whose hash is already present are left untouched, so
    /// re-expanding a node with the same candidate set is a no-op apart
    /// from renormalisation over unchanged values.
    pub fn expand(&mut self, parent: NodeId, children: &[(PathHash, f64)]) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(children.len());
        for &(hash, value) in children {
            let id = match self.child_by_hash(parent, hash) {
                Some(existing) => existing,
                None => {
                    let id = NodeId(self.nodes.len());
                    self.nodes.push(Node {
                        hash,
                        value,
                        rel_likelihood: None,
                        parent: Some(parent),
                        children: Vec::new(),
                        expanded: false,
                    });
                    self.nodes[parent.0].children.push(id);
                    id
                }
            };
            ids.push(id);
        }
        self.nodes[parent.0].expanded = true;
        self.update_rel_likelihood(parent);
        ids
    }

    /// Overwrite a node's value. Used to zero out branches whose percepts
    /// contradicted an observation; follow up with
    /// [`LikelihoodTree::update_rel_likelihood`] on the parent.
    pub fn set_value(&mut self, id: NodeId, value: f64) {
        self.nodes[id.0].value = value;
    }

    /// Recompute the children's relative likelihoods from their values.
    ///
    /// With positive total value each child gets `value / total`; when the
    /// total collapses to zero every child's likelihood is 0.0 and the
    /// subtree is effectively forbidden.
    pub fn update_rel_likelihood(&mut self, parent: NodeId) {
        let children = self.nodes[parent.0].children.clone();
        if children.is_empty() {
            return;
        }
        let total: f64 = children.iter().map(|&c| self.nodes[c.0].value).sum();
        for child in children {
            let rel = if total > 0.0 {
                self.nodes[child.0].value / total
            } else {
                0.0
            };
            self.nodes[child.0].rel_likelihood = Some(rel);
        }
    }
}

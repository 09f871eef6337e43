//! Tree construction and terminal evaluation.
//!
//! The registry is unfolded into a flat arena of [`TreeNode`]s indexed by
//! dense integers; successor links are indices into the arena, never
//! pointers, so the whole structure is trivially cloneable and
//! serialisable. Index 0 is always the root. A variable may legitimately
//! appear more than once along different paths; each unfolding produces
//! distinct node indices.

use serde::{Deserialize, Serialize};

use dtree_core::payoff::{PathContext, PayoffFn};
use dtree_core::registry::{Kind, OptimizeSense, Registry, VariableDecl};

use crate::error::{BuildError, TreeError};
use crate::risk_profile::RiskProfile;

/// Identity of the branch through which a node was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchTag {
    /// Name of the parent variable that declared the branch.
    pub variable: String,
    /// Branch name.
    pub branch: String,
    /// Branch outcome value.
    pub value: f64,
    /// Branch probability; present when the parent is a chance variable.
    pub probability: Option<f64>,
}

/// One position in the unfolded tree.
///
/// Construction populates the structural fields; `evaluate` fills
/// `context` and terminal `ev`; rollback fills the remaining computed
/// fields. Computed fields are `None` until the corresponding phase runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    /// Name of the originating variable.
    pub variable: String,
    /// Kind copied from the declaration at construction time.
    pub kind: Kind,
    /// Optimisation sense (decision nodes only).
    pub sense: Option<OptimizeSense>,
    /// Forced-branch override copied from the declaration.
    pub forced_branch: Option<usize>,
    /// Child indices in branch order; empty for terminal nodes.
    pub successors: Vec<usize>,
    /// Incoming branch identity; `None` for the root.
    pub tag: Option<BranchTag>,
    /// Payoff function (terminal nodes only). Not serialised.
    #[serde(skip)]
    pub payoff: Option<PayoffFn>,
    /// Accumulated path context (terminal nodes, after `evaluate`).
    pub context: Option<PathContext>,
    /// Expected value.
    pub ev: Option<f64>,
    /// Expected utility (when a utility transform is active).
    pub eu: Option<f64>,
    /// Certainty equivalent (when a utility transform is active).
    pub ce: Option<f64>,
    /// Index of the child chosen by rollback (decision and forced nodes).
    pub optimal_successor: Option<usize>,
    /// Whether the node lies on the optimal strategy (after rollback).
    pub optimal_strategy: Option<bool>,
    /// Probability of reaching this node under the optimal strategy.
    pub path_prob: Option<f64>,
    /// Distribution of final payoffs reachable under the optimal strategy.
    pub risk_profile: Option<RiskProfile>,
}

impl TreeNode {
    fn from_decl(name: &str, decl: &VariableDecl) -> Self {
        Self {
            variable: name.to_string(),
            kind: decl.kind,
            sense: decl.sense,
            forced_branch: decl.forced_branch,
            successors: Vec::new(),
            tag: None,
            payoff: decl.payoff.clone(),
            context: None,
            ev: None,
            eu: None,
            ce: None,
            optimal_successor: None,
            optimal_strategy: None,
            path_prob: None,
            risk_profile: None,
        }
    }
}

/// A decision tree: a private registry copy plus the unfolded node arena.
///
/// Construction deep-copies the registry so that sensitivity sweeps can
/// mutate it freely without corrupting the caller's original. The arena is
/// rebuilt wholesale whenever the registry changes, because branch
/// cardinality can change the node count.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    pub(crate) registry: Registry,
    root: String,
    pub(crate) nodes: Vec<TreeNode>,
    pub(crate) evaluated: bool,
    pub(crate) rolled_back: bool,
}

impl DecisionTree {
    /// Build a tree from the registry, rooted at the named variable.
    ///
    /// Expansion is a full depth-first unfold; a registry containing a
    /// naming cycle diverges (caller precondition, not detected).
    ///
    /// # Errors
    /// [`BuildError::UnknownVariable`] when the root or any referenced
    /// successor is not registered.
    pub fn new(registry: &Registry, root: &str) -> Result<Self, BuildError> {
        let mut tree = Self {
            registry: registry.clone(),
            root: root.to_string(),
            nodes: Vec::new(),
            evaluated: false,
            rolled_back: false,
        };
        tree.rebuild()?;
        Ok(tree)
    }

    /// Rebuild the node arena from the current registry state.
    ///
    /// Discards all computed fields; idempotent for an unchanged registry.
    pub fn rebuild(&mut self) -> Result<(), BuildError> {
        let mut nodes = Vec::new();
        let root = self.root.clone();
        expand(&self.registry, &root, "root", &mut nodes)?;
        self.nodes = nodes;
        self.attach_tags();
        self.evaluated = false;
        self.rolled_back = false;
        Ok(())
    }

    /// Annotate each non-root node with the branch that produced it.
    ///
    /// Relies on the positional correspondence between `successors[i]` and
    /// `branches[i]`, which expansion guarantees by construction order.
    fn attach_tags(&mut self) {
        for idx in 0..self.nodes.len() {
            if self.nodes[idx].successors.is_empty() {
                continue;
            }
            let parent = self.nodes[idx].variable.clone();
            let branches = match self.registry.get(&parent) {
                Some(decl) => decl.branches.clone(),
                None => continue,
            };
            let successors = self.nodes[idx].successors.clone();
            for (branch, child) in branches.iter().zip(successors) {
                self.nodes[child].tag = Some(BranchTag {
                    variable: parent.clone(),
                    branch: branch.name.clone(),
                    value: branch.value,
                    probability: branch.probability,
                });
            }
        }
    }

    /// Populate terminal path contexts and expected values.
    ///
    /// Walks every root-to-leaf path accumulating the traversed branch
    /// values, probabilities, and names, then invokes each terminal's
    /// payoff function with the accumulated context. Must run before
    /// rollback; does not itself choose optimal branches.
    pub fn evaluate(&mut self) {
        self.propagate_context(0, PathContext::new());
        self.evaluated = true;
        self.rolled_back = false;
    }

    fn propagate_context(&mut self, idx: usize, mut context: PathContext) {
        if let Some(tag) = &self.nodes[idx].tag {
            context.values.insert(tag.variable.clone(), tag.value);
            context
                .branches
                .insert(tag.variable.clone(), tag.branch.clone());
            if let Some(probability) = tag.probability {
                context
                    .probabilities
                    .insert(tag.variable.clone(), probability);
            }
        }

        if self.nodes[idx].kind == Kind::Terminal {
            let payoff = self.nodes[idx].payoff.clone().unwrap_or_default();
            self.nodes[idx].ev = Some(payoff.evaluate(&context));
            self.nodes[idx].context = Some(context);
            return;
        }

        let successors = self.nodes[idx].successors.clone();
        for child in successors {
            self.propagate_context(child, context.clone());
        }
    }

    /// Read-only view of the node arena.
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// One node by index.
    ///
    /// # Errors
    /// [`TreeError::NodeOutOfRange`] for an index outside the arena.
    pub fn node(&self, index: usize) -> Result<&TreeNode, TreeError> {
        self.nodes.get(index).ok_or(TreeError::NodeOutOfRange {
            index,
            count: self.nodes.len(),
        })
    }

    /// The tree's private registry copy.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Name of the root variable.
    pub fn root(&self) -> &str {
        &self.root
    }
}

fn expand(
    registry: &Registry,
    name: &str,
    referenced_by: &str,
    nodes: &mut Vec<TreeNode>,
) -> Result<usize, BuildError> {
    let decl = registry.get(name).ok_or_else(|| BuildError::UnknownVariable {
        variable: name.to_string(),
        referenced_by: referenced_by.to_string(),
    })?;

    let idx = nodes.len();
    nodes.push(TreeNode::from_decl(name, decl));

    let mut successors = Vec::with_capacity(decl.branches.len());
    for branch in &decl.branches {
        let child = expand(registry, &branch.successor, name, nodes)?;
        successors.push(child);
    }
    nodes[idx].successors = successors;
    Ok(idx)
}

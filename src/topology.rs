//! Rooted tree topology supplied to the simulation as immutable input.
//!
//! Nodes live in an arena indexed by [`NodeId`]; `parent` and `children`
//! are id references, so no node owns another. Generation is a pure
//! function of `(num_nodes, seed)` and runs before the engine starts.

use std::collections::{HashMap, VecDeque};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::error::{SimError, SimResult};
use crate::node::NodeId;

/// One vertex of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopologyNode {
    pub id: NodeId,
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl TopologyNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A validated rooted tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topology {
    nodes: Vec<TopologyNode>,
    root: NodeId,
}

impl Topology {
    /// Generates a random unbalanced tree of exactly `num_nodes` nodes.
    ///
    /// A "current parent" pointer walks down a spine. Each new spine node
    /// receives between one and all of the remaining nodes as leaf
    /// children; the next spine node hangs off it. Names run
    /// `node1..nodeN` with `node1` as root.
    pub fn generate(num_nodes: usize, seed: u64) -> SimResult<Self> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Self::generate_with_rng(num_nodes, &mut rng)
    }

    /// Same as [`Topology::generate`] but draws from a caller-supplied RNG.
    pub fn generate_with_rng<R: Rng>(num_nodes: usize, rng: &mut R) -> SimResult<Self> {
        if num_nodes == 0 {
            return Err(SimError::NoNodes);
        }

        let mut builder = TopologyBuilder::new("node1");
        let mut current = builder.root_id();
        let mut next = 2;

        while next <= num_nodes {
            let spine = builder.push(format!("node{}", next), current);
            next += 1;

            let remaining = num_nodes + 1 - next;
            if remaining == 0 {
                break;
            }
            let leaves = rng.gen_range(1..=remaining);
            for _ in 0..leaves {
                builder.push(format!("node{}", next), spine);
                next += 1;
            }
            current = spine;
        }

        builder.build()
    }

    /// A linear chain `node1 -> node2 -> ... -> nodeN`.
    pub fn chain(num_nodes: usize) -> SimResult<Self> {
        if num_nodes == 0 {
            return Err(SimError::NoNodes);
        }
        let mut builder = TopologyBuilder::new("node1");
        let mut parent = builder.root_id();
        for i in 2..=num_nodes {
            parent = builder.push(format!("node{}", i), parent);
        }
        builder.build()
    }

    /// Starts a hand-built tree rooted at `root_name`.
    pub fn builder(root_name: impl Into<String>) -> TopologyBuilder {
        TopologyBuilder::new(root_name)
    }

    /// Validates and wraps externally constructed nodes.
    ///
    /// `nodes[i].id` must equal `i`. Names must be non-empty and free of
    /// whitespace. Exactly one node may lack a parent,
    /// parent and child lists must agree, names must be unique, and every
    /// node must be reachable from the root.
    pub fn from_nodes(nodes: Vec<TopologyNode>) -> SimResult<Self> {
        if nodes.is_empty() {
            return Err(SimError::NoNodes);
        }

        let mut names: HashMap<&str, NodeId> = HashMap::with_capacity(nodes.len());
        let mut root: Option<NodeId> = None;
        for (idx, node) in nodes.iter().enumerate() {
            if node.id.raw() as usize != idx {
                return Err(SimError::topology(format!(
                    "node at index {} carries id {}",
                    idx, node.id
                )));
            }
            if node.name.is_empty() || node.name.chars().any(char::is_whitespace) {
                return Err(SimError::topology(format!(
                    "node name {:?} is empty or contains whitespace",
                    node.name
                )));
            }
            if names.insert(node.name.as_str(), node.id).is_some() {
                return Err(SimError::topology(format!("duplicate name {}", node.name)));
            }
            match node.parent {
                None => {
                    if let Some(r) = root {
                        return Err(SimError::topology(format!(
                            "{} and {} both lack a parent",
                            nodes[r.raw() as usize].name, node.name
                        )));
                    }
                    root = Some(node.id);
                }
                Some(p) => {
                    let parent = nodes.get(p.raw() as usize).ok_or(SimError::NodeNotFound(p))?;
                    let listed = parent.children.iter().filter(|&&c| c == node.id).count();
                    if listed != 1 {
                        return Err(SimError::topology(format!(
                            "{} lists {} as a child {} times",
                            parent.name, node.name, listed
                        )));
                    }
                }
            }
            for &child in &node.children {
                let c = nodes.get(child.raw() as usize).ok_or(SimError::NodeNotFound(child))?;
                if c.parent != Some(node.id) {
                    return Err(SimError::topology(format!(
                        "{} lists {} as a child but its parent disagrees",
                        node.name, c.name
                    )));
                }
            }
        }

        let root = root.ok_or_else(|| SimError::topology("no root: every node has a parent"))?;

        // Every node must be reachable from the root; otherwise a cycle exists.
        let mut seen = vec![false; nodes.len()];
        let mut queue = VecDeque::from([root]);
        let mut reached = 0;
        while let Some(id) = queue.pop_front() {
            let idx = id.raw() as usize;
            if seen[idx] {
                return Err(SimError::topology(format!("{} reached twice", nodes[idx].name)));
            }
            seen[idx] = true;
            reached += 1;
            queue.extend(nodes[idx].children.iter().copied());
        }
        if reached != nodes.len() {
            return Err(SimError::topology(format!(
                "{} of {} nodes unreachable from the root",
                nodes.len() - reached,
                nodes.len()
            )));
        }

        Ok(Topology { nodes, root })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a validated topology has a root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in id order.
    pub fn nodes(&self) -> &[TopologyNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> SimResult<&TopologyNode> {
        self.nodes
            .get(id.raw() as usize)
            .ok_or(SimError::NodeNotFound(id))
    }

    pub fn node_by_name(&self, name: &str) -> Option<&TopologyNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn name_of(&self, id: NodeId) -> SimResult<&str> {
        self.node(id).map(|n| n.name.as_str())
    }

    /// Ids of nodes without children, in id order.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.is_leaf())
            .map(|n| n.id)
            .collect()
    }

    /// Number of edges between `id` and the root.
    pub fn depth_of(&self, id: NodeId) -> SimResult<usize> {
        let mut depth = 0;
        let mut cursor = self.node(id)?;
        while let Some(p) = cursor.parent {
            depth += 1;
            cursor = self.node(p)?;
        }
        Ok(depth)
    }

    /// `(parent, child)` name pairs, for external graph renderers.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.nodes.iter().flat_map(move |n| {
            n.children
                .iter()
                .map(move |c| (n.name.as_str(), self.nodes[c.raw() as usize].name.as_str()))
        })
    }
}

// ── Builder ───────────────────────────────────────────────────────────

/// Incremental tree construction by name.
#[derive(Debug, Clone)]
pub struct TopologyBuilder {
    nodes: Vec<TopologyNode>,
}

impl TopologyBuilder {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![TopologyNode {
                id: NodeId::new(0),
                name: root_name.into(),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    fn root_id(&self) -> NodeId {
        NodeId::new(0)
    }

    fn push(&mut self, name: String, parent: NodeId) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u64);
        self.nodes.push(TopologyNode {
            id,
            name,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.raw() as usize].children.push(id);
        id
    }

    /// Attaches a new node `child` under the existing node `parent`.
    pub fn attach(mut self, child: impl Into<String>, parent: &str) -> SimResult<Self> {
        let child = child.into();
        if self.nodes.iter().any(|n| n.name == child) {
            return Err(SimError::topology(format!("duplicate name {}", child)));
        }
        let parent_id = self
            .nodes
            .iter()
            .find(|n| n.name == parent)
            .map(|n| n.id)
            .ok_or_else(|| SimError::topology(format!("unknown parent {}", parent)))?;
        self.push(child, parent_id);
        Ok(self)
    }

    pub fn build(self) -> SimResult<Topology> {
        Topology::from_nodes(self.nodes)
    }
}

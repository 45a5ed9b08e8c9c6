//! Material Graph Container
//!
//! [`MaterialGraph`] owns the blocks of one material and the connections
//! between them. Blocks live in a [`SlotMap`] arena addressed by [`NodeId`];
//! connections store `(NodeId, socket name)` pairs, so there are no
//! references between blocks.
//!
//! # Invariants
//!
//! - An input socket has at most one incoming connection; connecting an
//!   already connected input replaces the previous edge.
//! - The graph is acyclic; [`MaterialGraph::connect`] rejects edges that
//!   would close a cycle.
//! - Parameter names are unique and non-empty; the parameter index is kept
//!   sorted by name.
//!
//! Blocks are immutable once added, so cloning a graph (for a preview or a
//! background compile) shares the block objects and copies the topology.

use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use crate::errors::{MaterialError, Result};

use super::block::{ContentHasher, MaterialBlock, MaterialOutputBlock};
use super::socket::SocketDirection;

new_key_type! {
    /// Stable handle of a block inside one [`MaterialGraph`].
    pub struct NodeId;
}

/// Directed edge from an output socket to an input socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    pub source: NodeId,
    pub output: &'static str,
    pub target: NodeId,
    pub input: &'static str,
}

#[derive(Debug, Clone, Default)]
pub struct MaterialGraph {
    blocks: SlotMap<NodeId, Arc<dyn MaterialBlock>>,
    /// Insertion order, for deterministic iteration.
    order: Vec<NodeId>,
    connections: Vec<Connection>,
    parameters: BTreeMap<String, NodeId>,
}

impl MaterialGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a block, registering it in the parameter index if it exposes a
    /// parameter.
    pub fn add_block(&mut self, block: impl MaterialBlock + 'static) -> Result<NodeId> {
        self.add_shared(Arc::new(block))
    }

    pub fn add_shared(&mut self, block: Arc<dyn MaterialBlock>) -> Result<NodeId> {
        let parameter = block.parameter();
        if let Some(param) = &parameter {
            if param.name.is_empty() {
                return Err(MaterialError::EmptyParameterName);
            }
            if self.parameters.contains_key(&param.name) {
                return Err(MaterialError::DuplicateParameter(param.name.clone()));
            }
        }

        let id = self.blocks.insert(block);
        self.order.push(id);
        if let Some(param) = parameter {
            self.parameters.insert(param.name, id);
        }
        Ok(id)
    }

    /// Removes a block together with every connection touching it.
    pub fn remove_block(&mut self, id: NodeId) -> Option<Arc<dyn MaterialBlock>> {
        let block = self.blocks.remove(id)?;
        self.order.retain(|n| *n != id);
        self.connections.retain(|c| c.source != id && c.target != id);
        self.parameters.retain(|_, n| *n != id);
        Some(block)
    }

    #[must_use]
    pub fn block(&self, id: NodeId) -> Option<&dyn MaterialBlock> {
        self.blocks.get(id).map(AsRef::as_ref)
    }

    /// Blocks in insertion order.
    pub fn blocks(&self) -> impl Iterator<Item = (NodeId, &dyn MaterialBlock)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.blocks.get(*id).map(|b| (*id, b.as_ref())))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    // ─── Connections ─────────────────────────────────────────────────────────

    /// Connects `source.output` to `target.input`, replacing any connection
    /// already feeding that input.
    pub fn connect(&mut self, source: NodeId, output: &str, target: NodeId, input: &str) -> Result<()> {
        let source_block = self.blocks.get(source).ok_or(MaterialError::UnknownBlock)?;
        let target_block = self.blocks.get(target).ok_or(MaterialError::UnknownBlock)?;

        let output_socket = source_block
            .find_socket(output, SocketDirection::Output)
            .ok_or_else(|| MaterialError::UnknownSocket {
                block: source_block.type_name(),
                socket: output.to_owned(),
                direction: SocketDirection::Output.label(),
            })?;
        let input_socket = target_block
            .find_socket(input, SocketDirection::Input)
            .ok_or_else(|| MaterialError::UnknownSocket {
                block: target_block.type_name(),
                socket: input.to_owned(),
                direction: SocketDirection::Input.label(),
            })?;

        if source == target || self.depends_on(source, target) {
            return Err(MaterialError::CyclicConnection(target_block.type_name()));
        }

        self.connections
            .retain(|c| !(c.target == target && c.input == input_socket.name));
        self.connections.push(Connection {
            source,
            output: output_socket.name,
            target,
            input: input_socket.name,
        });
        Ok(())
    }

    /// Removes the connection feeding `target.input`, if any.
    pub fn disconnect(&mut self, target: NodeId, input: &str) -> Option<Connection> {
        let index = self
            .connections
            .iter()
            .position(|c| c.target == target && c.input == input)?;
        Some(self.connections.remove(index))
    }

    #[must_use]
    pub fn input_connection(&self, target: NodeId, input: &str) -> Option<&Connection> {
        self.connections
            .iter()
            .find(|c| c.target == target && c.input == input)
    }

    #[inline]
    #[must_use]
    pub fn has_connection(&self, target: NodeId, input: &str) -> bool {
        self.input_connection(target, input).is_some()
    }

    #[must_use]
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Whether `node` (transitively) reads from `upstream`.
    fn depends_on(&self, node: NodeId, upstream: NodeId) -> bool {
        let mut stack = vec![node];
        let mut visited = Vec::new();
        while let Some(current) = stack.pop() {
            if current == upstream {
                return true;
            }
            if visited.contains(&current) {
                continue;
            }
            visited.push(current);
            stack.extend(
                self.connections
                    .iter()
                    .filter(|c| c.target == current)
                    .map(|c| c.source),
            );
        }
        false
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    /// First output block in insertion order.
    #[must_use]
    pub fn find_output_block(&self) -> Option<(NodeId, &dyn MaterialOutputBlock)> {
        self.blocks()
            .find_map(|(id, block)| block.as_output().map(|out| (id, out)))
    }

    /// Parameter blocks, sorted by name.
    pub fn parameters(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.parameters.iter().map(|(name, id)| (name.as_str(), *id))
    }

    #[must_use]
    pub fn find_parameter(&self, name: &str) -> Option<NodeId> {
        self.parameters.get(name).copied()
    }

    /// Hash of the graph content: block kinds and configuration plus
    /// topology, independent of arena slot assignment and of the order
    /// blocks were added in.
    ///
    /// Each block is identified by the hash of everything upstream of it;
    /// its signature adds the edges leaving it and whether it is the output
    /// block compilation starts from. The graph hash covers the sorted
    /// signatures.
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        let mut upstream: FxHashMap<NodeId, u64> = FxHashMap::default();
        for id in &self.order {
            self.upstream_hash(*id, &mut upstream);
        }
        let selected_output = self.find_output_block().map(|(id, _)| id);

        let mut signatures: Vec<u64> = self
            .order
            .iter()
            .map(|id| {
                let mut downstream: Vec<(&str, &str, u64)> = self
                    .connections
                    .iter()
                    .filter(|c| c.source == *id)
                    .map(|c| (c.output, c.input, upstream[&c.target]))
                    .collect();
                downstream.sort_unstable();

                let mut hasher = ContentHasher::new();
                hasher.write_u64(upstream[id]);
                hasher.write_bool(selected_output == Some(*id));
                hasher.write_u64(downstream.len() as u64);
                for (output, input, target) in downstream {
                    hasher.write_str(output);
                    hasher.write_str(input);
                    hasher.write_u64(target);
                }
                hasher.finish()
            })
            .collect();
        signatures.sort_unstable();

        let mut hasher = ContentHasher::new();
        hasher.write_u64(signatures.len() as u64);
        for signature in signatures {
            hasher.write_u64(signature);
        }
        hasher.finish()
    }

    /// Hash of `id`'s kind, configuration and, recursively, its inputs.
    fn upstream_hash(&self, id: NodeId, memo: &mut FxHashMap<NodeId, u64>) -> u64 {
        if let Some(hash) = memo.get(&id) {
            return *hash;
        }
        let Some(block) = self.blocks.get(id) else {
            return 0;
        };

        let inputs: Vec<(&str, &str, NodeId)> = self
            .connections
            .iter()
            .filter(|c| c.target == id)
            .map(|c| (c.input, c.output, c.source))
            .collect();
        let mut sources: Vec<(&str, &str, u64)> = inputs
            .into_iter()
            .map(|(input, output, source)| (input, output, self.upstream_hash(source, memo)))
            .collect();
        sources.sort_unstable();

        let mut hasher = ContentHasher::new();
        hasher.write_str(block.type_name());
        block.hash_content(&mut hasher);
        hasher.write_u64(sources.len() as u64);
        for (input, output, source) in sources {
            hasher.write_str(input);
            hasher.write_str(output);
            hasher.write_u64(source);
        }
        let hash = hasher.finish();
        memo.insert(id, hash);
        hash
    }

    /// Isolated copy for a background or preview compile.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Self> {
        Arc::new(self.clone())
    }
}

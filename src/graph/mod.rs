//! Material graph model.
//!
//! - [`MaterialGraph`]: block arena, connections and parameter index
//! - [`MaterialBlock`] / [`MaterialOutputBlock`]: the block contract
//! - [`blocks`]: the built-in block library

pub mod block;
pub mod blocks;
pub mod container;
pub mod socket;

pub use block::{ContentHasher, MaterialBlock, MaterialOutputBlock, ParameterInfo};
pub use container::{Connection, MaterialGraph, NodeId};
pub use socket::{SocketDirection, SocketInfo};

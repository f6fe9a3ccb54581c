//! Dense indexing of losses grouped by source vertex.
//!
//! Column `c` is the `c`-th loss of the graph in insertion order. Slots
//! renumber the same columns so that all losses leaving a vertex are
//! contiguous: `edge_ids[edge_offsets[v]..edge_offsets[v] + out_degree(v)]`
//! lists the columns of the losses leaving `v`.

use fragtree_graph::{FragmentGraph, VertexId};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeIndex {
    edge_ids: Vec<usize>,
    edge_offsets: Vec<usize>,
}

impl EdgeIndex {
    /// Compute slot offsets in O(V + E).
    pub fn compute(graph: &FragmentGraph) -> Self {
        let num_vertices = graph.num_vertices();
        let mut edge_offsets = vec![0usize; num_vertices];
        for k in 1..num_vertices {
            edge_offsets[k] =
                edge_offsets[k - 1] + graph.out_degree(VertexId::new((k - 1) as u32));
        }

        // edge_offsets[u] is the write cursor for the next loss leaving u
        let mut edge_ids = vec![0usize; graph.num_losses()];
        for (column, loss) in graph.losses().iter().enumerate() {
            let u = loss.source.index();
            edge_ids[edge_offsets[u]] = column;
            edge_offsets[u] += 1;
        }

        // every cursor moved forward by out_degree(u); rewind to the start
        for (k, offset) in edge_offsets.iter_mut().enumerate() {
            *offset -= graph.out_degree(VertexId::new(k as u32));
        }

        Self {
            edge_ids,
            edge_offsets,
        }
    }

    /// Column of the loss stored at each slot.
    pub fn edge_ids(&self) -> &[usize] {
        &self.edge_ids
    }

    /// First slot of each vertex.
    pub fn edge_offsets(&self) -> &[usize] {
        &self.edge_offsets
    }

    /// Slot range of the losses leaving `vertex`.
    pub fn slot_range(&self, vertex: VertexId) -> Range<usize> {
        let Some(&start) = self.edge_offsets.get(vertex.index()) else {
            return 0..0;
        };
        let end = self
            .edge_offsets
            .get(vertex.index() + 1)
            .copied()
            .unwrap_or(self.edge_ids.len());
        start..end
    }

    /// Columns of the losses leaving `vertex`, in insertion order.
    pub fn outgoing_columns(&self, vertex: VertexId) -> &[usize] {
        &self.edge_ids[self.slot_range(vertex)]
    }

    pub fn num_columns(&self) -> usize {
        self.edge_ids.len()
    }
}

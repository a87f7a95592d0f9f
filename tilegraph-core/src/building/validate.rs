use super::tile::TileBuilder;
use crate::BuildError;
use crate::model::{Endpoint, NodeRef};

impl TileBuilder {
    /// Checks the graph invariants of the tile.
    ///
    /// * every connection ends at an existing node
    /// * connections between real features come in symmetric pairs, apart
    ///   from the direct edges of multi-connections
    /// * every node of a boundary segment terminates at most one connection
    /// * every node of a multi-connection chain exists
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Invariant`] naming the first violated invariant
    /// and the packed ids involved.
    pub fn validate(&self) -> Result<(), BuildError> {
        for (from, connection) in self.store.iter_connections() {
            let to = connection.to;
            if self.store.node(to).is_err() {
                return Err(BuildError::invariant(
                    "connection target exists",
                    [from.packed(), to.packed()],
                ));
            }
            let involves_boundary =
                self.boundary.is_virtual(from.feature) || self.boundary.is_virtual(to.feature);
            if !involves_boundary
                && !self.multi.contains(from, to)
                && !self.store.has_connection(to, from)
            {
                return Err(BuildError::invariant(
                    "connection symmetry",
                    [from.packed(), to.packed()],
                ));
            }
        }

        for segment in self.boundary.iter() {
            if !self.store.contains(segment.virtual_id) {
                return Err(BuildError::invariant(
                    "boundary segment exists",
                    [segment.virtual_id.packed()],
                ));
            }
            for endpoint in Endpoint::BOTH {
                let node = NodeRef::new(segment.virtual_id, endpoint);
                if self.store.inbound_count(node) > 1 {
                    return Err(BuildError::invariant(
                        "single inbound connection per boundary node",
                        [node.packed()],
                    ));
                }
            }
        }

        for (first, last, via) in self.multi.iter() {
            for node in std::iter::once(first).chain(via.iter().copied()).chain([last]) {
                if self.store.node(node).is_err() {
                    return Err(BuildError::invariant(
                        "multi-connection node exists",
                        [first.packed(), last.packed(), node.packed()],
                    ));
                }
            }
        }
        Ok(())
    }
}

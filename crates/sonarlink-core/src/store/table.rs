// # Connection Table
//
// In-memory record table shared by the store implementations.
//
// The table assigns identities and enforces name uniqueness. Every mutating
// method checks first and writes second, so an `Err` leaves the table as it was.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::model::{Connection, ConnectionId, ConnectionPatch, NewConnection};

/// Records keyed by identity, plus the next identity to hand out
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConnectionTable {
    next_id: ConnectionId,
    connections: BTreeMap<ConnectionId, Connection>,
}

impl ConnectionTable {
    pub(crate) fn new() -> Self {
        Self {
            next_id: ConnectionId::new(1),
            connections: BTreeMap::new(),
        }
    }

    /// Rebuild a table from persisted records
    ///
    /// `next_id` never goes backwards past an identity that is still in use.
    /// A record holding the last representable identity is rejected.
    pub(crate) fn from_parts(next_id: ConnectionId, records: Vec<Connection>) -> Result<Self> {
        let connections: BTreeMap<_, _> = records.into_iter().map(|c| (c.id, c)).collect();
        let floor = match connections.keys().next_back() {
            Some(last) => last.next().ok_or_else(|| {
                Error::store(format!("Connection identity {} leaves no room for new ones", last))
            })?,
            None => ConnectionId::new(1),
        };

        Ok(Self {
            next_id: next_id.max(floor),
            connections,
        })
    }

    pub(crate) fn next_id(&self) -> ConnectionId {
        self.next_id
    }

    pub(crate) fn len(&self) -> usize {
        self.connections.len()
    }

    fn name_taken(&self, name: &str, except: Option<ConnectionId>) -> bool {
        self.connections
            .values()
            .any(|c| c.name == name && Some(c.id) != except)
    }

    pub(crate) fn insert(&mut self, new: NewConnection) -> Result<Connection> {
        if self.name_taken(&new.name, None) {
            return Err(Error::conflict(new.name));
        }

        let id = self.next_id;
        let next_id = id
            .next()
            .ok_or_else(|| Error::store("Connection identities exhausted"))?;

        let connection = Connection::from_new(id, new);
        self.connections.insert(id, connection.clone());
        self.next_id = next_id;
        Ok(connection)
    }

    pub(crate) fn get(&self, id: ConnectionId) -> Option<Connection> {
        self.connections.get(&id).cloned()
    }

    /// Returns `Ok(None)` for an unknown identity and `(record, changed)` otherwise
    pub(crate) fn update(
        &mut self,
        id: ConnectionId,
        patch: &ConnectionPatch,
    ) -> Result<Option<(Connection, bool)>> {
        if !self.connections.contains_key(&id) {
            return Ok(None);
        }
        if let Some(name) = &patch.name {
            if self.name_taken(name, Some(id)) {
                return Err(Error::conflict(name.clone()));
            }
        }

        let Some(connection) = self.connections.get_mut(&id) else {
            return Ok(None);
        };
        let changed = patch.apply_to(connection);
        Ok(Some((connection.clone(), changed)))
    }

    pub(crate) fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    pub(crate) fn list(&self) -> Vec<Connection> {
        self.connections.values().cloned().collect()
    }
}

impl Default for ConnectionTable {
    fn default() -> Self {
        Self::new()
    }
}

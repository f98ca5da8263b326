//! Block ID registry: the UUID <-> seqId bijection for a single IR extraction.

use std::collections::HashMap;

/// Two-way mapping between engine-native UUIDs and human-readable sequential
/// ids (`b001`, `b002`, ...), plus the counter that hands out new ones.
///
/// One registry is created per IR extraction and discarded with the IR; the
/// counter never decreases within an instance and the same UUID always maps
/// to the same seqId for the lifetime of the registry.
#[derive(Debug, Default)]
pub struct BlockIdRegistry {
    uuid_to_seq: HashMap<String, String>,
    seq_to_uuid: HashMap<String, String>,
    next: u32,
}

impl BlockIdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a brand-new (uuid, seqId) pair.
    pub fn generate(&mut self) -> (String, String) {
        let uuid = uuid::Uuid::new_v4().to_string();
        let seq = self.register_existing(&uuid);
        (uuid, seq)
    }

    /// Assign the next seqId to `uuid` if it hasn't been seen before; returns
    /// the existing seqId if it has.
    pub fn register_existing(&mut self, uuid: &str) -> String {
        if let Some(seq) = self.uuid_to_seq.get(uuid) {
            return seq.clone();
        }
        self.next += 1;
        let seq = format_seq_id(self.next);
        self.uuid_to_seq.insert(uuid.to_string(), seq.clone());
        self.seq_to_uuid.insert(seq.clone(), uuid.to_string());
        seq
    }

    pub fn seq_id_for(&self, uuid: &str) -> Option<&str> {
        self.uuid_to_seq.get(uuid).map(String::as_str)
    }

    pub fn uuid_for(&self, seq_id: &str) -> Option<&str> {
        self.seq_to_uuid.get(seq_id).map(String::as_str)
    }

    /// Export the full uuid -> seqId mapping.
    pub fn export(&self) -> HashMap<String, String> {
        self.uuid_to_seq.clone()
    }

    pub fn len(&self) -> usize {
        self.uuid_to_seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uuid_to_seq.is_empty()
    }
}

/// Zero-pad to at least 3 digits, growing as needed (`b001` .. `b999` ..
/// `b1000`).
fn format_seq_id(n: u32) -> String {
    format!("b{:03}", n)
}

//! Session id generation.

use uuid::Uuid;

/// Produces unique session identifiers.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random (v4) UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uuid_ids_are_unique() {
        let ids: HashSet<String> = (0..100).map(|_| UuidGenerator.generate()).collect();
        assert_eq!(ids.len(), 100);
    }
}

// Module exports for pure logic
pub mod tree;       // Arena tab tree, lookup and in-place field updates
pub mod sequence;   // Depth-first flattening into the navigable order
pub mod cursor;     // Wraparound selection cursor
pub mod sources;    // Collaborator traits and tab event subscription
pub mod merger;     // Generation-guarded multi-source merge
pub mod switcher;   // Caller-facing core
pub mod memory;     // In-memory browser over a session snapshot

#[cfg(test)]
pub(crate) mod testing;

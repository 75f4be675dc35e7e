pub mod engine;
pub mod loader;
pub mod transcode;
pub mod trie;
pub mod types;

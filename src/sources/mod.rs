//! Concrete message sources
//!
//! The export engine only needs the `MessageSource` contract; these
//! implementations serve history that was dumped to disk ahead of time.

mod jsonl;
mod memory;

pub use jsonl::load_jsonl;
pub use memory::MemorySource;

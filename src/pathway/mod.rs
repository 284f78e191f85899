pub mod aggregate;
pub mod engine;
pub mod path;

pub use aggregate::{top_codes, CodeFrequency, SlotStrategy, DEFAULT_TOP_K};
pub use engine::{BranchEngine, Expansion, ExpansionConfig};
pub use path::{Path, PathId, Step};

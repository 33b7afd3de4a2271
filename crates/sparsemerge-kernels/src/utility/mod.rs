pub mod prune;
pub mod util;

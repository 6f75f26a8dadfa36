mod load;
mod merge;
mod pager;

pub use load::{LoadHandle, LoadId, LoadOutcome};
pub use pager::Pager;

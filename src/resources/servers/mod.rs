mod id_pools_ranges;

pub use id_pools_ranges::{IdPoolType, IdPoolsRanges};

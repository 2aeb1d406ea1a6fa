//! qcow2 formatting constants (§4.7 VM disk artifact).

pub const CLUSTER_BITS: usize = 16;
pub const REFCOUNT_ORDER: u8 = 4;
pub const BLOCK_SIZE: usize = 512;

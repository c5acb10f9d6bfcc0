pub mod analyst;
pub mod indicators;

pub mod action;
pub mod contract;
pub mod position;
pub mod profile;
pub mod ticker;

pub mod classifier;
pub mod endpoints;
pub mod signatures;
pub mod streams;

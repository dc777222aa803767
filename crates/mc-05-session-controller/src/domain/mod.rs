pub mod errors;
pub mod policy;
pub mod state;

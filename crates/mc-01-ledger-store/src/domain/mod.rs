pub mod errors;
pub mod record;

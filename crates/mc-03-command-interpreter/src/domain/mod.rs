pub mod command;
pub mod errors;
pub mod hand;
pub mod outcome;

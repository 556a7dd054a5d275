pub mod artifact;
pub mod compose;

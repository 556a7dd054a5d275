pub mod reference;
pub mod resolver;

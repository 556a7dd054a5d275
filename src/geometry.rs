pub mod crop;
pub mod mask;

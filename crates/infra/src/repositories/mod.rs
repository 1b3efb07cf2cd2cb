mod memory;
mod surreal;

pub use memory::*;
pub use surreal::*;

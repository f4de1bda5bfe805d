pub mod field;
pub mod grid;
pub mod record;

pub use field::*;
pub use grid::*;
pub use record::*;

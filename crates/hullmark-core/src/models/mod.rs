pub mod dependent;
pub mod record;

pub use dependent::*;
pub use record::*;

pub mod outcome;
pub mod record;
pub mod timestamp;

pub use outcome::*;
pub use record::*;
pub use timestamp::*;

pub mod stamp;

pub use stamp::{parse_stamp, Stamp};

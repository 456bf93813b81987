//! The alignment-and-correlation core: returns, daily sentiment, date join, Pearson.

pub mod align;
pub mod correlation;
pub mod fields;
pub mod returns;
pub mod sentiment;

pub use align::align;
pub use correlation::{correlate, CorrelationResult, MIN_PAIRS};
pub use fields::{AlignFields, CorrelationFields, ReturnsFields, SentimentFields};
pub use returns::compute_returns;
pub use sentiment::aggregate_sentiment;

//! Weather lookup against the k780 weather API.
//!
//! One GET per lookup, no caching and no retries. Failures come back as values.

mod client;
mod envelope;

pub use client::{WeatherClient, WeatherError, WeatherLookup, WeatherQueryResult};
pub use envelope::{WeatherEnvelope, WeatherRecord, SUCCESS_FLAG};

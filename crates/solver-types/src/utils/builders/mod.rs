//! Builders for constructing test fixtures.
//!
//! These builders produce valid default values so tests only set the fields
//! they care about.

mod intent;
mod networks;

pub use intent::IntentBuilder;
pub use networks::NetworkConfigBuilder;

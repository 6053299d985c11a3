/*
[INPUT]:  Exchange schema definitions and serde requirements
[OUTPUT]: Typed Rust structs/enums with serialization support
[POS]:    Data layer - type definitions shared across the crate
[UPDATE]: When the canonical event shape or code tables change
*/

pub mod currencies;
pub mod enums;
pub mod events;

pub use currencies::{canonical_currency, canonical_instrument};
pub use enums::*;
pub use events::*;

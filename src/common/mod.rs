//! Miscellaneous common structs used throughout the library.

mod finger_table;
mod hash;
mod id;
mod peer;
mod ring;

pub use finger_table::*;
pub use hash::*;
pub use id::*;
pub use peer::*;
pub use ring::*;

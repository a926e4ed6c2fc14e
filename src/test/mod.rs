
pub use keys::*;

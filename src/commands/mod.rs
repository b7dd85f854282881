pub mod check;
pub mod inspect;
pub mod serve;

// Re-export command functions for convenience
pub use check::{check, CheckParams};
pub use inspect::inspect;
pub use serve::{serve, ServeParams};

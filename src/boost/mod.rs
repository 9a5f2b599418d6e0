//! Dynamic boost state and chain propagation.
//!
//! [`BoostWord`] packs one saturating counter per wait reason into a single
//! atomic word so independent waiters can elevate a shared owner without a
//! lock; `propagate` walks lock-ownership chains applying and retracting
//! those counters with a hard depth bound.

pub mod propagate;
pub mod word;

pub use word::BoostWord;

//! Position-level constraints applied inside the solver's relaxation loop.
pub mod contact;
pub mod distance;

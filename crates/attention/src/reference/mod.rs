//! Portable, exact implementation of scaled dot-product attention.
//!
//! This path favours clarity over absolute performance and is the kernel the
//! [`SelfAttention`](crate::SelfAttention) module runs on.

pub mod exact;

pub use exact::ExactAttention;

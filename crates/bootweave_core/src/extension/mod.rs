//! Extension invocation engine and interceptor chain registrar.
//!
//! # Responsibility
//! - Order handles by tier and order value (`order`).
//! - Drive both extension phases to completion (`invoker`).
//! - Build the factory's interceptor chain (`interceptors`).

pub mod interceptors;
pub mod invoker;
pub mod order;

//! # Autofactory Support
//!
//! Shared helpers for the autofactory crates.
//!
//! This crate provides:
//! - Type-name shortening for error messages and factory signatures
//! - Dependency chain rendering
//! - "Did you mean?" suggestions for unregistered services

pub mod rendering;

//! Decor Core - Shared types and storefront rules.
//!
//! This crate provides the types used across all Decor components:
//! - `api` - REST client for the shop backend
//! - `storefront` - Public-facing e-commerce site
//! - `admin` - Back-office panel for catalog and order management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Anything that needs the network lives in `decor-api`.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, emails, and statuses
//! - [`model`] - Entity records mirrored from the backend
//! - [`slice`] - Per-entity request state (loading/error/success) and notices
//! - [`checkout`] - Display-only cart totals
//! - [`coupon`] - Coupon applicability rules
//! - [`orders`] - Order date-range and status filtering
//! - [`validation`] - Form validation
//! - [`slug`] - URL slug generation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod coupon;
pub mod model;
pub mod orders;
pub mod slice;
pub mod slug;
pub mod types;
pub mod validation;

pub use types::*;

// crates/firmware-settings-config/src/lib.rs
// ============================================================================
// Module: Firmware Settings Config Library
// Description: Configuration model and validation for the reconciler.
// Purpose: Single source of truth for firmware-settings.toml semantics.
// Dependencies: firmware-settings-core, firmware-settings-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `firmware-settings-config` defines the configuration model for the
//! firmware settings reconciler. Loading is strict and fail-closed: oversized,
//! non-UTF-8, or internally inconsistent files are rejected before any store
//! is opened.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;

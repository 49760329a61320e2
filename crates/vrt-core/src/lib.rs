//! # vrt-core
//!
//! Core types and collaborator seams for the VRT visual regression pipeline.
//!
//! The pipeline judges whether an automatically applied UI fix introduced
//! unintended visual regressions, and feeds that judgment back into the
//! fixing agent's confidence score. This crate holds everything the four
//! pipeline components share:
//!
//! - Shared types (device classes, viewports, component descriptors)
//! - The unified [`VrtError`] / [`Result`] pair
//! - Master [`config::VrtConfig`] loaded from `vrt.toml`
//! - The external collaborator traits: [`access::AccessPolicy`],
//!   [`access::AuditSink`], [`capture::ScreenshotCapture`],
//!   [`store::StateStore`]

pub mod access;
pub mod capture;
pub mod config;
mod error;
pub mod store;
mod types;

pub use error::{Result, VrtError};
pub use types::*;

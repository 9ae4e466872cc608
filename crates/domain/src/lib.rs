//! # hearth-domain
//!
//! Pure domain model for the hearth home automation controller.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Events** and their type tags, plus the [`DispatchResult`](dispatch::DispatchResult) flags handlers return
//! - Define **Devices** (named properties with access flags)
//! - Define **Actions** (ordered sub-actions) with their JSON, wire and row encodings
//!   and the registry resolving sub-action type codes
//! - Define **Rules** (condition trees with time and device leaves) and their evaluation
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod action;
pub mod device;
pub mod dispatch;
pub mod event;
pub mod rule;

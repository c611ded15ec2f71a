//! Domain types shared by every Wardrobe backend crate.
//!
//! This crate has zero internal dependencies so it can be used by the
//! repository layer, the delivery channels, and the worker alike.

pub mod error;
pub mod notification;
pub mod quiet_hours;
pub mod settings;
pub mod types;

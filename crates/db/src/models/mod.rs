//! Row models for the tables read and written by the worker.

pub mod endpoint;
pub mod moderation;
pub mod trigger;

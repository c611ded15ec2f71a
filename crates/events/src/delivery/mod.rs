//! External delivery channels other than push.

pub mod email;

//! Crate-level test support.

pub(crate) mod support;

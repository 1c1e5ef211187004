//! Feature unification for the workspace. This crate has no code.

//! Command implementations for the yisp CLI.

pub mod build;

//! Property-based tests for the date and template resolver

mod resolver;
mod substitution;

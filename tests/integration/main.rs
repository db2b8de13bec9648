//! Integration tests: the hub against a mock HTTP catalog

mod common;
mod hub;

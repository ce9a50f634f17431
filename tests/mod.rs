//! Test suite for teammatch
//!
//! This module organizes all tests

pub mod integration;
pub mod property;

//! Integration tests
//!
//! The client against a mock REST server and an in-memory Socket.IO server

mod gateway_test;
mod session_test;

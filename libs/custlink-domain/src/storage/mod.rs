//! Storage ports
//!
//! The contracts a durable record sink must fulfil.

pub mod ports;

//! HTTP handlers

pub mod upload;

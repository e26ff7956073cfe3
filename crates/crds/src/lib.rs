//! DCops CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the Application Controller.

pub mod application;

pub use application::*;

//! Shared test utilities for notesum integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs over a temp database and documents directory
//! - Page-level OCR and renderer stubs plus a small PDF builder

pub mod harness;
pub mod stubs;

pub use harness::TestHarness;
pub use stubs::{pdf_with_pages, PageOcr, StubRenderer};

//! Output generation for the daily digest.
//!
//! # Submodules
//!
//! - [`json`]: Writes the [`Digest`](crate::models::Digest) consumed by the dashboard
//! - [`briefing`]: Composes the HTML email body and writes it beside the digest
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! └── 2025-05-06/
//!     ├── digest.json
//!     └── briefing.html
//! ```

pub mod briefing;
pub mod json;

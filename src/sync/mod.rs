//! Mirror synchronization for upstream image variants
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Upstream   │────▶│  Frontier   │────▶│   Planner   │────▶│   Latest    │
//! │ (tag list)  │     │  (probing)  │     │ (mirror job)│     │ (floating)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                            │                   │                   │
//!                            ▼                   ▼                   ▼
//!                     ┌─────────────────────────────────────────────────┐
//!                     │          RegistryClient (destination)           │
//!                     └─────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`variant`]: Upstream flavors mirrored under their own tag prefix
//! - [`frontier`]: Binary search for the first unmirrored version
//! - [`planner`]: Expansion of unmirrored versions into ordered mirror jobs
//! - [`latest`]: Floating tag maintenance
//! - [`synchronizer`]: Per-variant driver tying the phases together

pub mod frontier;
pub mod latest;
pub mod planner;
pub mod synchronizer;
pub mod variant;

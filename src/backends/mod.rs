// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for frame capture
//!
//! The backend layer abstracts hardware access, providing a consistent API
//! regardless of where frames come from:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          Continuous decoder (rqrr)           │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌─────────────┐    ┌──────────────────┐   │
//! │  │    V4L2     │    │   Still image    │   │
//! │  │   device    │    │     replay       │   │
//! │  └─────────────┘    └──────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Camera backend with device enumeration and frame capture

pub mod camera;

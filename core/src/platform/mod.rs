//! Platform integration layer
//!
//! This module provides:
//! - The capability descriptor resolved from the platform name
//! - The Native Control Surface seam platform code implements
//! - A scriptable surface for tests and simulations

pub mod capability;
pub mod native;
pub mod testing;

pub use capability::PlatformCapability;
pub use native::{
    AppStartDialog, AppStartOptions, NativeCall, NativeControlSurface, NativeError, NativeReply,
    NativeResult, NativeService,
};

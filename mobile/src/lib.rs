// bgmode-mobile — Native bindings for Android (Kotlin) and iOS (Swift)
// This crate exports the background-mode bridge via UniFFI

pub use bgmode_core::*;

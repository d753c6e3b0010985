// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Crate-private logging helpers.

/// `tracing::warn!` at most once per call site for the lifetime of the process.
macro_rules! warn_once {
    ($($arg:tt)+) => {{
        static WARNED: core::sync::atomic::AtomicBool = core::sync::atomic::AtomicBool::new(false);
        if !WARNED.swap(true, core::sync::atomic::Ordering::Relaxed) {
            tracing::warn!($($arg)+);
        }
    }};
}

pub(crate) use warn_once;

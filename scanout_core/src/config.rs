// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display configuration, read once at init.

use core::time::Duration;

use crate::format::IndexedSwizzle;
use crate::scaling::ScalingMode;

/// Refresh rate used when none is configured.
pub const DEFAULT_REFRESH_HZ: f32 = 60.0;

/// Interval before the flip thread retries a flip the kernel reported busy.
pub const DEFAULT_FLIP_RETRY: Duration = Duration::from_millis(1);

/// Settings for a [`KmsDisplay`](crate::display::KmsDisplay).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayConfig {
    /// Refresh rate to aim for when several modes share the native
    /// resolution.
    pub refresh_rate: f32,
    /// Initial scaling policy.
    pub scaling: ScalingMode,
    /// Key code that cycles the scaling policy, if any.
    pub scaling_hotkey: Option<u32>,
    /// What a swizzled 8-bit request resolves to.
    pub indexed_swizzle: IndexedSwizzle,
    /// Busy-retry interval of the flip thread.
    pub flip_retry: Duration,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_rate: DEFAULT_REFRESH_HZ,
            scaling: ScalingMode::Fullscreen,
            scaling_hotkey: None,
            indexed_swizzle: IndexedSwizzle::Reject,
            flip_retry: DEFAULT_FLIP_RETRY,
        }
    }
}

impl DisplayConfig {
    /// Sets the refresh rate; non-positive or non-finite values restore the
    /// default.
    #[must_use]
    pub fn with_refresh_rate(mut self, hz: f32) -> Self {
        self.refresh_rate = if hz.is_finite() && hz > 0.0 {
            hz
        } else {
            DEFAULT_REFRESH_HZ
        };
        self
    }

    /// Sets the scaling hot-key.
    #[must_use]
    pub const fn with_scaling_hotkey(mut self, key: u32) -> Self {
        self.scaling_hotkey = Some(key);
        self
    }
}

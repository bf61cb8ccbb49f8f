// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Front/back/queued buffer rotation and the flip thread.
//!
//! With single buffering the caller draws straight into the scanned-out
//! buffer and presenting does nothing. Double buffering flips synchronously
//! from the caller's thread and swaps front and back as soon as the kernel
//! accepts the flip; it does not wait for the flip to retire.
//!
//! Triple buffering hands commits to a dedicated thread. The producer swaps
//! back and queued under the mutex, marks a flip pending and returns without
//! waiting. The thread wakes, rotates queued into front and commits. If the
//! kernel is still busy with the previous flip the rotation is undone and the
//! thread retries after [`DisplayConfig::flip_retry`]; a newer frame queued in
//! the meantime simply replaces the pending one.
//!
//! [`DisplayConfig::flip_retry`]: crate::config::DisplayConfig::flip_retry

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::commit::{FlipStatus, FlipTarget, flip};
use crate::device::KmsDevice;
use crate::error::DisplayError;
use crate::object::FramebufferId;
use crate::scaling::{PlaneRect, ScalingMode};
use crate::trace::{FlipEvent, Tracer};

/// Name given to the flip thread.
pub const FLIP_THREAD_NAME: &str = "scanout-flip";

/// Number of buffers in rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BufferingMode {
    /// One buffer, drawn while scanned out.
    Single,
    /// Two buffers flipped from the caller's thread.
    #[default]
    Double,
    /// Three buffers flipped by a background thread.
    Triple,
}

impl BufferingMode {
    /// Number of buffer slots this mode uses.
    #[must_use]
    pub const fn slot_count(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Double => 2,
            Self::Triple => 3,
        }
    }

    /// Mode for `count` buffers, if supported.
    #[must_use]
    pub const fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(Self::Single),
            2 => Some(Self::Double),
            3 => Some(Self::Triple),
            _ => None,
        }
    }
}

/// Slot indices of the scanned-out, drawing and queued buffers.
///
/// Over the slots in use the indices always form a permutation: with two
/// buffers `queued` mirrors `back`, with one every index is `0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SwapChain {
    front: usize,
    back: usize,
    queued: usize,
}

impl SwapChain {
    /// Initial assignment for `mode`: front `0`, back `1`, queued `2`.
    #[must_use]
    pub const fn new(mode: BufferingMode) -> Self {
        match mode {
            BufferingMode::Single => Self {
                front: 0,
                back: 0,
                queued: 0,
            },
            BufferingMode::Double => Self {
                front: 0,
                back: 1,
                queued: 1,
            },
            BufferingMode::Triple => Self {
                front: 0,
                back: 1,
                queued: 2,
            },
        }
    }

    /// Slot being scanned out.
    #[must_use]
    pub const fn front(&self) -> usize {
        self.front
    }

    /// Slot the caller draws into.
    #[must_use]
    pub const fn back(&self) -> usize {
        self.back
    }

    /// Slot waiting for the flip thread.
    #[must_use]
    pub const fn queued(&self) -> usize {
        self.queued
    }

    /// Double-buffer exchange after an accepted flip.
    pub const fn swap_front_back(&mut self) {
        let front = self.front;
        self.front = self.back;
        self.back = front;
        self.queued = self.back;
    }

    /// Producer side of triple buffering: the finished frame becomes queued.
    pub const fn swap_back_queued(&mut self) {
        let back = self.back;
        self.back = self.queued;
        self.queued = back;
    }

    /// Flip-thread side of triple buffering. Applying it twice restores the
    /// previous assignment.
    pub const fn rotate_queued_front(&mut self) {
        let front = self.front;
        self.front = self.queued;
        self.queued = front;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct FlipState {
    chain: SwapChain,
    target: FlipTarget,
    framebuffers: Vec<FramebufferId>,
    pending: bool,
    stop: bool,
    ready: bool,
    flips: u64,
    error: Option<DisplayError>,
}

#[derive(Debug)]
struct FlipShared {
    state: Mutex<FlipState>,
    wake: Condvar,
}

#[derive(Debug)]
enum Driver {
    Sync {
        mode: BufferingMode,
        chain: SwapChain,
        target: FlipTarget,
        framebuffers: Vec<FramebufferId>,
        flips: u64,
        // Single buffering: the front buffer still shows an old rectangle.
        stale: bool,
    },
    Threaded {
        shared: Arc<FlipShared>,
        handle: Option<JoinHandle<()>>,
    },
}

/// Presents finished frames on the active pipe.
#[derive(Debug)]
pub struct PresentationLoop<D: KmsDevice + Send + Sync + 'static> {
    device: Arc<D>,
    tracer: Tracer,
    driver: Driver,
}

impl<D: KmsDevice + Send + Sync + 'static> PresentationLoop<D> {
    /// Starts presenting `framebuffers` (one per slot, in slot order) through
    /// `target`.
    ///
    /// Triple buffering spawns the flip thread and returns only once it is
    /// waiting for work.
    pub fn start(
        device: Arc<D>,
        mode: BufferingMode,
        target: FlipTarget,
        framebuffers: Vec<FramebufferId>,
        tracer: Tracer,
        retry: Duration,
    ) -> Result<Self, DisplayError> {
        if framebuffers.len() != mode.slot_count() {
            return Err(DisplayError::InvalidSlot(framebuffers.len()));
        }
        let chain = SwapChain::new(mode);
        let driver = if mode == BufferingMode::Triple {
            let shared = Arc::new(FlipShared {
                state: Mutex::new(FlipState {
                    chain,
                    target,
                    framebuffers,
                    pending: false,
                    stop: false,
                    ready: false,
                    flips: 0,
                    error: None,
                }),
                wake: Condvar::new(),
            });
            let handle = {
                let device = Arc::clone(&device);
                let shared = Arc::clone(&shared);
                let tracer = tracer.clone();
                thread::Builder::new()
                    .name(FLIP_THREAD_NAME.into())
                    .spawn(move || run_flip_thread(&*device, &shared, &tracer, retry))
                    .map_err(|_| DisplayError::FlipThread)?
            };
            let guard = lock(&shared.state);
            drop(
                shared
                    .wake
                    .wait_while(guard, |s| !s.ready)
                    .unwrap_or_else(PoisonError::into_inner),
            );
            Driver::Threaded {
                shared,
                handle: Some(handle),
            }
        } else {
            Driver::Sync {
                mode,
                chain,
                target,
                framebuffers,
                flips: 0,
                stale: false,
            }
        };
        Ok(Self {
            device,
            tracer,
            driver,
        })
    }

    /// Buffering mode in use.
    #[must_use]
    pub fn mode(&self) -> BufferingMode {
        match &self.driver {
            Driver::Sync { mode, .. } => *mode,
            Driver::Threaded { .. } => BufferingMode::Triple,
        }
    }

    /// Current slot assignment.
    #[must_use]
    pub fn chain(&self) -> SwapChain {
        match &self.driver {
            Driver::Sync { chain, .. } => *chain,
            Driver::Threaded { shared, .. } => lock(&shared.state).chain,
        }
    }

    /// Slot the caller should draw the next frame into.
    #[must_use]
    pub fn draw_slot(&self) -> usize {
        let chain = self.chain();
        match self.mode() {
            BufferingMode::Single => chain.front(),
            BufferingMode::Double | BufferingMode::Triple => chain.back(),
        }
    }

    /// Number of flips the kernel has accepted since start.
    #[must_use]
    pub fn flips(&self) -> u64 {
        match &self.driver {
            Driver::Sync { flips, .. } => *flips,
            Driver::Threaded { shared, .. } => lock(&shared.state).flips,
        }
    }

    /// Returns `true` while the flip thread is running.
    #[must_use]
    pub fn is_threaded(&self) -> bool {
        matches!(&self.driver, Driver::Threaded { handle: Some(_), .. })
    }

    /// Presents the frame drawn into [`draw_slot`](Self::draw_slot).
    ///
    /// Single buffering only commits to retry a re-flip left busy by
    /// [`set_scaling`](Self::set_scaling). Double buffering reports
    /// [`FlipStatus::Pending`] when the previous flip has not retired; the
    /// frame is then not swapped in. Triple buffering
    /// always queues and returns [`FlipStatus::Submitted`], or the error of a
    /// failed background flip since the last call.
    pub fn present(&mut self) -> Result<FlipStatus, DisplayError> {
        match &mut self.driver {
            Driver::Sync {
                mode: BufferingMode::Single,
                chain,
                target,
                framebuffers,
                stale,
                ..
            } => {
                if !*stale {
                    return Ok(FlipStatus::Submitted);
                }
                let status =
                    reflip_front(&*self.device, *chain, target, framebuffers, &self.tracer)?;
                *stale = status == FlipStatus::Pending;
                Ok(status)
            }
            Driver::Sync {
                chain,
                target,
                framebuffers,
                flips,
                ..
            } => {
                let framebuffer = framebuffers
                    .get(chain.back())
                    .copied()
                    .ok_or(DisplayError::InvalidSlot(chain.back()))?;
                let status = flip(&*self.device, target, framebuffer, &self.tracer)?;
                if status == FlipStatus::Submitted {
                    chain.swap_front_back();
                    *flips += 1;
                    self.tracer.flip(&FlipEvent {
                        flip_index: *flips,
                        front: chain.front(),
                        framebuffer,
                        retries: 0,
                    });
                }
                Ok(status)
            }
            Driver::Threaded { shared, handle } => {
                if handle.is_none() {
                    return Err(DisplayError::NotActive);
                }
                let mut state = lock(&shared.state);
                if let Some(err) = state.error.take() {
                    return Err(err);
                }
                state.chain.swap_back_queued();
                state.pending = true;
                shared.wake.notify_all();
                Ok(FlipStatus::Submitted)
            }
        }
    }

    /// Destination rectangle used by later flips.
    #[must_use]
    pub fn placement(&self) -> PlaneRect {
        match &self.driver {
            Driver::Sync { target, .. } => target.placement(),
            Driver::Threaded { shared, .. } => lock(&shared.state).target.placement(),
        }
    }

    /// Recomputes the destination rectangle; takes effect on the next flip.
    ///
    /// Single buffering never flips on its own, so the front buffer is
    /// re-flipped at once with the new rectangle. If that flip is busy this
    /// returns [`FlipStatus::Pending`] and the next [`present`](Self::present)
    /// retries it. Other modes always report [`FlipStatus::Submitted`].
    pub fn set_scaling(&mut self, scaling: ScalingMode) -> Result<FlipStatus, DisplayError> {
        match &mut self.driver {
            Driver::Sync {
                mode: BufferingMode::Single,
                chain,
                target,
                framebuffers,
                stale,
                ..
            } => {
                target.set_scaling(scaling);
                *stale = true;
                let status =
                    reflip_front(&*self.device, *chain, target, framebuffers, &self.tracer)?;
                *stale = status == FlipStatus::Pending;
                Ok(status)
            }
            Driver::Sync { target, .. } => {
                target.set_scaling(scaling);
                Ok(FlipStatus::Submitted)
            }
            Driver::Threaded { shared, .. } => {
                lock(&shared.state).target.set_scaling(scaling);
                Ok(FlipStatus::Submitted)
            }
        }
    }

    /// Runs `f` while no flip can be committed.
    ///
    /// The flip thread holds the same lock while it commits, so other commits
    /// (such as a palette change) issued from `f` never race a flip.
    pub fn exclusive<R>(&self, f: impl FnOnce() -> R) -> R {
        match &self.driver {
            Driver::Sync { .. } => f(),
            Driver::Threaded { shared, .. } => {
                let _guard = lock(&shared.state);
                f()
            }
        }
    }

    /// Stops and joins the flip thread. Calling it again does nothing.
    pub fn stop(&mut self) {
        let Driver::Threaded { shared, handle } = &mut self.driver else {
            return;
        };
        let Some(handle) = handle.take() else {
            return;
        };
        {
            let mut state = lock(&shared.state);
            state.stop = true;
            shared.wake.notify_all();
        }
        _ = handle.join();
    }
}

impl<D: KmsDevice + Send + Sync + 'static> Drop for PresentationLoop<D> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn reflip_front<D: KmsDevice + ?Sized>(
    device: &D,
    chain: SwapChain,
    target: &FlipTarget,
    framebuffers: &[FramebufferId],
    tracer: &Tracer,
) -> Result<FlipStatus, DisplayError> {
    let framebuffer = framebuffers
        .get(chain.front())
        .copied()
        .ok_or(DisplayError::InvalidSlot(chain.front()))?;
    flip(device, target, framebuffer, tracer)
}

fn run_flip_thread<D: KmsDevice + ?Sized>(
    device: &D,
    shared: &FlipShared,
    tracer: &Tracer,
    retry: Duration,
) {
    let mut state = lock(&shared.state);
    state.ready = true;
    shared.wake.notify_all();

    let mut retries = 0_u32;
    loop {
        state = shared
            .wake
            .wait_while(state, |s| !s.stop && !s.pending)
            .unwrap_or_else(PoisonError::into_inner);
        if state.stop {
            break;
        }

        state.chain.rotate_queued_front();
        let front = state.chain.front();
        let Some(framebuffer) = state.framebuffers.get(front).copied() else {
            state.chain.rotate_queued_front();
            state.pending = false;
            state.error = Some(DisplayError::InvalidSlot(front));
            continue;
        };
        match flip(device, &state.target, framebuffer, tracer) {
            Ok(FlipStatus::Submitted) => {
                state.pending = false;
                state.flips += 1;
                tracer.flip(&FlipEvent {
                    flip_index: state.flips,
                    front,
                    framebuffer,
                    retries,
                });
                retries = 0;
            }
            Ok(FlipStatus::Pending) => {
                state.chain.rotate_queued_front();
                retries = retries.saturating_add(1);
                state = shared
                    .wake
                    .wait_timeout(state, retry)
                    .map(|(guard, _)| guard)
                    .unwrap_or_else(|poisoned| poisoned.into_inner().0);
            }
            Err(err) => {
                state.chain.rotate_queued_front();
                state.pending = false;
                state.error = Some(err);
                retries = 0;
            }
        }
    }
}

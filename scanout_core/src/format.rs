// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel-format table and framebuffer plane layout.
//!
//! [`FormatTable::lookup`] maps a requested colour depth plus [`FormatFlags`]
//! to a [`ColorFormat`]. [`framebuffer_planes`] turns one dumb-buffer
//! allocation into the per-plane `(handle, pitch, offset)` triples the kernel
//! wants when registering a framebuffer.
//!
//! Everything here is pure and allocation-free.

use core::fmt;

use crate::object::DumbHandle;

/// Depth used when a caller asks for depth `0`.
pub const DEFAULT_DEPTH: u32 = 16;

/// Maximum number of planes in a framebuffer.
pub const MAX_PLANES: usize = 4;

/// A DRM four-character format code.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fourcc(pub u32);

impl Fourcc {
    /// Builds a code from its four ASCII characters.
    #[must_use]
    pub const fn from_chars(code: [u8; 4]) -> Self {
        Self(u32::from_le_bytes(code))
    }

    /// 8-bit colour index.
    pub const C8: Self = Self::from_chars(*b"C8  ");
    /// 16-bit `[15:0] x:R:G:B 1:5:5:5`.
    pub const XRGB1555: Self = Self::from_chars(*b"XR15");
    /// 16-bit `[15:0] x:B:G:R 1:5:5:5`.
    pub const XBGR1555: Self = Self::from_chars(*b"XB15");
    /// 16-bit `[15:0] R:G:B 5:6:5`.
    pub const RGB565: Self = Self::from_chars(*b"RG16");
    /// 16-bit `[15:0] B:G:R 5:6:5`.
    pub const BGR565: Self = Self::from_chars(*b"BG16");
    /// 32-bit `[31:0] x:R:G:B 8:8:8:8`.
    pub const XRGB8888: Self = Self::from_chars(*b"XR24");
    /// 32-bit `[31:0] x:B:G:R 8:8:8:8`.
    pub const XBGR8888: Self = Self::from_chars(*b"XB24");
    /// 32-bit `[31:0] x:R:G:B 2:10:10:10`.
    pub const XRGB2101010: Self = Self::from_chars(*b"XR30");
    /// 32-bit `[31:0] x:B:G:R 2:10:10:10`.
    pub const XBGR2101010: Self = Self::from_chars(*b"XB30");
    /// Three non-subsampled Y, U and V planes.
    pub const YUV444: Self = Self::from_chars(*b"YU24");

    /// The four characters of the code.
    #[must_use]
    pub const fn chars(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Debug for Fourcc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fourcc({self})")
    }
}

impl fmt::Display for Fourcc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.chars() {
            let c = if c.is_ascii_graphic() || c == b' ' {
                char::from(c)
            } else {
                '?'
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Width and position of one colour channel within a pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Channel {
    /// Bits used by the channel.
    pub bits: u32,
    /// Bit position of the channel's least significant bit.
    pub shift: u32,
}

impl Channel {
    const NONE: Self = Self { bits: 0, shift: 0 };

    const fn new(bits: u32, shift: u32) -> Self {
        Self { bits, shift }
    }

    /// Pixel mask covering this channel.
    #[must_use]
    pub const fn mask(self) -> u32 {
        if self.bits == 0 {
            0
        } else {
            (u32::MAX >> (32 - self.bits)) << self.shift
        }
    }
}

/// Everything needed to allocate and describe a framebuffer of one format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColorFormat {
    /// Kernel format code.
    pub fourcc: Fourcc,
    /// Bits per pixel of the allocation.
    pub bpp: u32,
    /// Red channel.
    pub red: Channel,
    /// Green channel.
    pub green: Channel,
    /// Blue channel.
    pub blue: Channel,
    /// Alpha channel (unused by every supported format).
    pub alpha: Channel,
    /// Number of framebuffer planes.
    pub planes: u32,
    /// Allocation height multiplier; planar formats stack their planes
    /// vertically in one allocation.
    pub height_factor: u32,
}

impl ColorFormat {
    const fn rgb(fourcc: Fourcc, bpp: u32, bits: [u32; 3], shifts: [u32; 3]) -> Self {
        Self {
            fourcc,
            bpp,
            red: Channel::new(bits[0], shifts[0]),
            green: Channel::new(bits[1], shifts[1]),
            blue: Channel::new(bits[2], shifts[2]),
            alpha: Channel::NONE,
            planes: 1,
            height_factor: 1,
        }
    }

    const fn opaque(fourcc: Fourcc, bpp: u32, planes: u32) -> Self {
        Self {
            fourcc,
            bpp,
            red: Channel::NONE,
            green: Channel::NONE,
            blue: Channel::NONE,
            alpha: Channel::NONE,
            planes,
            height_factor: planes,
        }
    }

    /// Returns `true` for palette-indexed formats.
    #[must_use]
    pub const fn is_indexed(&self) -> bool {
        self.fourcc.0 == Fourcc::C8.0
    }

    /// Returns `true` for formats with more than one plane.
    #[must_use]
    pub const fn is_planar(&self) -> bool {
        self.planes > 1
    }
}

/// 8-bit indexed; channel layout comes from the palette.
pub const C8: ColorFormat = ColorFormat::opaque(Fourcc::C8, 8, 1);
/// `x:R:G:B 1:5:5:5`.
pub const XRGB1555: ColorFormat = ColorFormat::rgb(Fourcc::XRGB1555, 16, [5, 5, 5], [10, 5, 0]);
/// `R:G:B 5:6:5`.
pub const RGB565: ColorFormat = ColorFormat::rgb(Fourcc::RGB565, 16, [5, 6, 5], [11, 5, 0]);
/// `x:R:G:B 8:8:8:8`.
pub const XRGB8888: ColorFormat = ColorFormat::rgb(Fourcc::XRGB8888, 32, [8, 8, 8], [16, 8, 0]);
/// `x:R:G:B 2:10:10:10`.
pub const XRGB2101010: ColorFormat =
    ColorFormat::rgb(Fourcc::XRGB2101010, 32, [10, 10, 10], [20, 10, 0]);
/// `x:B:G:R 1:5:5:5`.
pub const XBGR1555: ColorFormat = ColorFormat::rgb(Fourcc::XBGR1555, 16, [5, 5, 5], [0, 5, 10]);
/// `B:G:R 5:6:5`.
pub const BGR565: ColorFormat = ColorFormat::rgb(Fourcc::BGR565, 16, [5, 6, 5], [0, 5, 11]);
/// `x:B:G:R 8:8:8:8`.
pub const XBGR8888: ColorFormat = ColorFormat::rgb(Fourcc::XBGR8888, 32, [8, 8, 8], [0, 8, 16]);
/// `x:B:G:R 2:10:10:10`.
pub const XBGR2101010: ColorFormat =
    ColorFormat::rgb(Fourcc::XBGR2101010, 32, [10, 10, 10], [0, 10, 20]);
/// Planar YUV 4:4:4: three 8-bit planes stacked in one allocation.
pub const YUV444: ColorFormat = ColorFormat::opaque(Fourcc::YUV444, 8, 3);

/// Modifiers for [`FormatTable::lookup`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FormatFlags {
    /// Request the byte-swizzled (BGR) channel order.
    pub swizzle_bgr: bool,
    /// Request the planar YUV format.
    pub yuv: bool,
}

impl FormatFlags {
    /// Native RGB order.
    pub const NONE: Self = Self {
        swizzle_bgr: false,
        yuv: false,
    };
    /// BGR channel order.
    pub const SWIZZLE_BGR: Self = Self {
        swizzle_bgr: true,
        yuv: false,
    };
    /// Planar YUV.
    pub const YUV: Self = Self {
        swizzle_bgr: false,
        yuv: true,
    };
}

/// What to return for a swizzled 8-bit request. There is no swizzled
/// indexed format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IndexedSwizzle {
    /// Report no match.
    #[default]
    Reject,
    /// Fall back to [`BGR565`].
    PromoteTo16,
}

/// The format table with its fallback policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FormatTable {
    /// Policy for swizzled 8-bit requests.
    pub indexed_swizzle: IndexedSwizzle,
}

impl FormatTable {
    /// Creates a table with the given swizzled-indexed policy.
    #[must_use]
    pub const fn new(indexed_swizzle: IndexedSwizzle) -> Self {
        Self { indexed_swizzle }
    }

    /// Returns the format for `depth` and `flags`, or `None` if unsupported.
    ///
    /// Depth 15 selects 1555, 16 selects 565, 24 and 32 select 8888 and 30
    /// selects 2101010. The YUV flag only accepts depth 24 and takes
    /// precedence over swizzling.
    #[must_use]
    pub const fn lookup(&self, depth: u32, flags: FormatFlags) -> Option<&'static ColorFormat> {
        if flags.yuv {
            return match depth {
                24 => Some(&YUV444),
                _ => None,
            };
        }
        if flags.swizzle_bgr {
            return match depth {
                8 => match self.indexed_swizzle {
                    IndexedSwizzle::Reject => None,
                    IndexedSwizzle::PromoteTo16 => Some(&BGR565),
                },
                15 => Some(&XBGR1555),
                16 => Some(&BGR565),
                24 | 32 => Some(&XBGR8888),
                30 => Some(&XBGR2101010),
                _ => None,
            };
        }
        match depth {
            8 => Some(&C8),
            15 => Some(&XRGB1555),
            16 => Some(&RGB565),
            24 | 32 => Some(&XRGB8888),
            30 => Some(&XRGB2101010),
            _ => None,
        }
    }
}

/// [`FormatTable::lookup`] with the default (rejecting) policy.
#[must_use]
pub const fn lookup(depth: u32, flags: FormatFlags) -> Option<&'static ColorFormat> {
    FormatTable::new(IndexedSwizzle::Reject).lookup(depth, flags)
}

/// Normalises a requested depth to the storage depth that backs it.
#[must_use]
pub const fn round_depth(depth: u32) -> Option<u32> {
    match depth {
        8 => Some(8),
        15 | 16 => Some(16),
        24 | 30 | 32 => Some(32),
        _ => None,
    }
}

/// Per-plane layout passed to framebuffer creation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FramebufferPlanes {
    /// Buffer handle per plane.
    pub handles: [u32; MAX_PLANES],
    /// Row pitch per plane.
    pub pitches: [u32; MAX_PLANES],
    /// Byte offset per plane.
    pub offsets: [u32; MAX_PLANES],
    count: usize,
}

impl FramebufferPlanes {
    /// Number of populated planes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if no plane is populated.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Iterates populated planes as `(handle, pitch, offset)`.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        (0..self.count).map(|i| (self.handles[i], self.pitches[i], self.offsets[i]))
    }
}

/// Computes the plane layout of a single-allocation framebuffer.
///
/// Packed formats yield one plane at offset 0. Planar formats reuse `handle`
/// and `pitch` for every plane with `offset[n] = n × pitch × height`, where
/// `height` is the visible height (not the stacked allocation height).
#[must_use]
pub fn framebuffer_planes(
    format: &ColorFormat,
    handle: DumbHandle,
    pitch: u32,
    height: u32,
) -> FramebufferPlanes {
    let mut planes = FramebufferPlanes::default();
    let count = (format.planes as usize).clamp(1, MAX_PLANES);
    let plane_size = pitch.saturating_mul(height);
    let mut offset = 0_u32;
    for n in 0..count {
        planes.handles[n] = handle.0;
        planes.pitches[n] = pitch;
        planes.offsets[n] = offset;
        offset = offset.saturating_add(plane_size);
    }
    planes.count = count;
    planes
}

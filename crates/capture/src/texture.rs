//! Texture descriptions and encoder input layouts

/// Borrowed reference to a host-owned GPU texture
///
/// The pipeline never owns the texture behind a handle it did not create;
/// the host keeps it alive while a stream runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(usize);

impl TextureHandle {
    /// Wrap a native texture pointer, `None` for null
    pub fn from_raw(ptr: *mut std::ffi::c_void) -> Option<Self> {
        if ptr.is_null() {
            None
        } else {
            Some(Self(ptr as usize))
        }
    }

    /// Wrap an opaque non-zero identity (used by non-pointer devices)
    pub fn from_id(id: usize) -> Option<Self> {
        (id != 0).then_some(Self(id))
    }

    pub fn as_ptr(&self) -> *mut std::ffi::c_void {
        self.0 as *mut std::ffi::c_void
    }

    pub fn id(&self) -> usize {
        self.0
    }
}

/// Pixel format of a texture, using DXGI numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Typeless,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Typeless,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    /// Any other DXGI format
    Other(u32),
}

impl TextureFormat {
    pub fn from_dxgi(value: u32) -> Self {
        match value {
            27 => Self::Rgba8Typeless,
            28 => Self::Rgba8Unorm,
            29 => Self::Rgba8UnormSrgb,
            87 => Self::Bgra8Unorm,
            90 => Self::Bgra8Typeless,
            91 => Self::Bgra8UnormSrgb,
            other => Self::Other(other),
        }
    }

    pub fn to_dxgi(&self) -> u32 {
        match self {
            Self::Rgba8Typeless => 27,
            Self::Rgba8Unorm => 28,
            Self::Rgba8UnormSrgb => 29,
            Self::Bgra8Unorm => 87,
            Self::Bgra8Typeless => 90,
            Self::Bgra8UnormSrgb => 91,
            Self::Other(value) => *value,
        }
    }

    /// Whether the format leaves channel interpretation to views
    pub fn is_typeless(&self) -> bool {
        matches!(self, Self::Rgba8Typeless | Self::Bgra8Typeless)
    }

    /// Concrete format a typeless texture is copied into
    pub fn concrete(&self) -> Self {
        match self {
            Self::Rgba8Typeless => Self::Rgba8Unorm,
            Self::Bgra8Typeless => Self::Bgra8Unorm,
            other => *other,
        }
    }

    /// Encoder channel order for this format, if the encoder accepts it
    pub fn channel_order(&self) -> Option<ChannelOrder> {
        match self {
            // Encoder channel names are little-endian packed words, so
            // byte order R,G,B,A reads as ABGR.
            Self::Rgba8Unorm | Self::Rgba8UnormSrgb => Some(ChannelOrder::Abgr),
            Self::Bgra8Unorm | Self::Bgra8UnormSrgb => Some(ChannelOrder::Argb),
            _ => None,
        }
    }
}

/// Channel order of an encoder input surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelOrder {
    /// 8-bit R,G,B,A in memory
    Abgr,
    /// 8-bit B,G,R,A in memory
    Argb,
}

/// Texture description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub sample_count: u32,
    pub array_size: u32,
    pub mip_levels: u32,
}

impl TextureDesc {
    /// Single-sample, single-layer, single-mip texture
    pub fn simple(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            sample_count: 1,
            array_size: 1,
            mip_levels: 1,
        }
    }

    pub fn is_simple(&self) -> bool {
        self.sample_count == 1 && self.array_size == 1 && self.mip_levels == 1
    }
}

/// Texture ready for encoder registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodableTexture {
    /// Either the source texture or the adapter's scratch copy
    pub handle: TextureHandle,
    pub width: u32,
    pub height: u32,
    pub order: ChannelOrder,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_handle() {
        assert!(TextureHandle::from_raw(std::ptr::null_mut()).is_none());
        assert!(TextureHandle::from_id(0).is_none());
        assert_eq!(TextureHandle::from_id(42).unwrap().id(), 42);
    }

    #[test]
    fn test_dxgi_round_trip() {
        for value in [27, 28, 29, 87, 90, 91, 10] {
            assert_eq!(TextureFormat::from_dxgi(value).to_dxgi(), value);
        }
    }

    #[test]
    fn test_channel_orders() {
        assert_eq!(
            TextureFormat::Rgba8UnormSrgb.channel_order(),
            Some(ChannelOrder::Abgr)
        );
        assert_eq!(
            TextureFormat::Bgra8Unorm.channel_order(),
            Some(ChannelOrder::Argb)
        );
        assert_eq!(TextureFormat::Rgba8Typeless.channel_order(), None);
        assert_eq!(TextureFormat::Other(10).channel_order(), None);
    }

    #[test]
    fn test_typeless_concrete() {
        assert!(TextureFormat::Rgba8Typeless.is_typeless());
        assert_eq!(TextureFormat::Rgba8Typeless.concrete(), TextureFormat::Rgba8Unorm);
        assert_eq!(TextureFormat::Bgra8Typeless.concrete(), TextureFormat::Bgra8Unorm);
        assert_eq!(TextureFormat::Rgba8Unorm.concrete(), TextureFormat::Rgba8Unorm);
    }
}

//! Platform `wchar_t` strings

/// `wchar_t` as the host compiler sees it
#[cfg(target_os = "windows")]
pub type WChar = u16;

#[cfg(not(target_os = "windows"))]
pub type WChar = u32;

/// Longest string read from the host, in code units
const MAX_UNITS: usize = 4096;

/// Read a NUL-terminated wide string; null becomes the empty string
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated `wchar_t` string.
pub unsafe fn to_string(ptr: *const WChar) -> String {
    if ptr.is_null() {
        return String::new();
    }

    let mut len = 0;
    // SAFETY: the caller guarantees a terminator within the allocation.
    while len < MAX_UNITS && unsafe { *ptr.add(len) } != 0 {
        len += 1;
    }
    // SAFETY: `len` units were just read.
    let units = unsafe { std::slice::from_raw_parts(ptr, len) };
    decode(units)
}

#[cfg(target_os = "windows")]
fn decode(units: &[WChar]) -> String {
    String::from_utf16_lossy(units)
}

#[cfg(not(target_os = "windows"))]
fn decode(units: &[WChar]) -> String {
    units
        .iter()
        .map(|u| char::from_u32(*u).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide(s: &str) -> Vec<WChar> {
        #[cfg(target_os = "windows")]
        let mut units: Vec<WChar> = s.encode_utf16().collect();
        #[cfg(not(target_os = "windows"))]
        let mut units: Vec<WChar> = s.chars().map(u32::from).collect();
        units.push(0);
        units
    }

    #[test]
    fn test_null_is_empty() {
        assert_eq!(unsafe { to_string(std::ptr::null()) }, "");
    }

    #[test]
    fn test_roundtrip_url() {
        let url = wide("rtsp://127.0.0.1:8554/cam01");
        assert_eq!(unsafe { to_string(url.as_ptr()) }, "rtsp://127.0.0.1:8554/cam01");
    }

    #[test]
    fn test_non_ascii() {
        let url = wide("rtsp://host/камера");
        assert_eq!(unsafe { to_string(url.as_ptr()) }, "rtsp://host/камера");
    }
}

/// File size queries with an OS-level fallback.
///
/// The primary query is `symlink_metadata`, which never follows links. Some
/// entries (locked system files on Windows, files racing with deletion) make
/// that fail even though the OS can still report a size through another
/// route, so a secondary platform query is tried before giving up.
use std::io;
use std::path::Path;
use tracing::debug;

/// Size of the entry at `path`, or `None` if neither query succeeded.
pub fn query_size(path: &Path) -> Option<u64> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) => Some(meta.len()),
        Err(primary) => match secondary_size(path) {
            Ok(size) => Some(size),
            Err(secondary) => {
                debug!(
                    "size unavailable for {}: {primary}; fallback: {secondary}",
                    path.display()
                );
                None
            }
        },
    }
}

#[cfg(windows)]
fn secondary_size(path: &Path) -> io::Result<u64> {
    use std::os::windows::ffi::OsStrExt;
    use windows::core::PCWSTR;
    use windows::Win32::Storage::FileSystem::{
        GetFileAttributesExW, GetFileExInfoStandard, WIN32_FILE_ATTRIBUTE_DATA,
    };

    let wide: Vec<u16> = path
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();
    let mut data = WIN32_FILE_ATTRIBUTE_DATA::default();

    unsafe {
        GetFileAttributesExW(
            PCWSTR(wide.as_ptr()),
            GetFileExInfoStandard,
            &mut data as *mut WIN32_FILE_ATTRIBUTE_DATA as *mut _,
        )
    }
    .map_err(|e| io::Error::other(e.to_string()))?;

    Ok((u64::from(data.nFileSizeHigh) << 32) | u64::from(data.nFileSizeLow))
}

#[cfg(not(windows))]
fn secondary_size(path: &Path) -> io::Result<u64> {
    std::fs::File::open(path)
        .and_then(|file| file.metadata())
        .map(|meta| meta.len())
}

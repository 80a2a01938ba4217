use crate::error::Result;

#[cfg(windows)]
pub mod windows;

#[cfg(not(windows))]
pub mod unix;

#[cfg(windows)]
pub use windows::RecycleBin as SystemBin;

#[cfg(not(windows))]
pub use unix::TrashBin as SystemBin;

const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// Access to the operating system's recycle bin.
///
/// Calls may block for as long as the shell takes to answer; callers run
/// them off the UI thread.
pub trait BinGateway: Send + Sync {
    /// Total size of everything in the bin, in whole GB (rounded down)
    fn current_size_gb(&self) -> Result<u64>;

    /// Irreversibly empty the bin. No prompt, no progress output.
    fn purge(&self) -> Result<()>;
}

/// Floor-divide a byte count into GB
pub fn bytes_to_gb(bytes: u64) -> u64 {
    bytes / BYTES_PER_GB
}

/// The bin of the platform this binary was built for
pub fn system_bin() -> Result<SystemBin> {
    SystemBin::locate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_gb_floors() {
        assert_eq!(bytes_to_gb(0), 0);
        assert_eq!(bytes_to_gb(BYTES_PER_GB - 1), 0);
        assert_eq!(bytes_to_gb(BYTES_PER_GB), 1);
        assert_eq!(bytes_to_gb(6 * BYTES_PER_GB + 12345), 6);
    }
}

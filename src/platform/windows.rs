use super::{bytes_to_gb, BinGateway};
use crate::error::{GatewayError, Result};
use std::{mem, ptr};
use tracing::{debug, info};
use winapi::shared::winerror::S_OK;
use winapi::um::shellapi::{
    SHEmptyRecycleBinW, SHQueryRecycleBinW, SHERB_NOCONFIRMATION, SHERB_NOPROGRESSUI,
    SHERB_NOSOUND, SHQUERYRBINFO,
};

/// The Windows Recycle Bin across all drives
#[derive(Debug, Default)]
pub struct RecycleBin;

impl RecycleBin {
    pub fn locate() -> Result<Self> {
        Ok(Self)
    }

    /// Returns (bytes, item count) for all bins combined
    fn query(&self) -> Result<(u64, i64)> {
        let mut info = SHQUERYRBINFO {
            cbSize: mem::size_of::<SHQUERYRBINFO>() as u32,
            i64Size: 0,
            i64NumItems: 0,
        };

        // A null root path queries the bins of every drive at once.
        let result = unsafe { SHQueryRecycleBinW(ptr::null(), &mut info) };
        if result != S_OK {
            return Err(GatewayError::WindowsError(format!(
                "SHQueryRecycleBinW returned {:#010x}",
                result
            )));
        }

        // Copy out before formatting; the struct is packed on x86.
        let bytes = info.i64Size.max(0) as u64;
        let items = info.i64NumItems;
        debug!("Recycle Bin holds {} items, {} bytes", items, bytes);
        Ok((bytes, items))
    }
}

impl BinGateway for RecycleBin {
    fn current_size_gb(&self) -> Result<u64> {
        let (bytes, _) = self.query()?;
        Ok(bytes_to_gb(bytes))
    }

    fn purge(&self) -> Result<()> {
        // SHEmptyRecycleBinW fails on an empty bin
        let (_, items) = self.query()?;
        if items == 0 {
            debug!("Recycle Bin is already empty");
            return Ok(());
        }

        info!("Emptying Recycle Bin...");
        let result = unsafe {
            SHEmptyRecycleBinW(
                ptr::null_mut(),
                ptr::null(),
                SHERB_NOCONFIRMATION | SHERB_NOPROGRESSUI | SHERB_NOSOUND,
            )
        };

        if result == S_OK {
            info!("Recycle Bin emptied successfully");
            Ok(())
        } else {
            Err(GatewayError::WindowsError(format!(
                "SHEmptyRecycleBinW returned {:#010x}",
                result
            )))
        }
    }
}

//! Live blob provider backed by the registry performance keys.
use std::io;

use log::{debug, warn};
use windows::Win32::Foundation::{ERROR_MORE_DATA, ERROR_SUCCESS, WIN32_ERROR};
use windows::Win32::System::Registry::{
    HKEY, HKEY_PERFORMANCE_DATA, HKEY_PERFORMANCE_NLSTEXT, HKEY_PERFORMANCE_TEXT, RegCloseKey,
    RegQueryValueExW,
};
use windows_core::{PCWSTR, w};

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::provider::{Attempt, BlobProvider, fetch_growing};

/// Reads `"Global"` from `HKEY_PERFORMANCE_DATA` and `"Counter"` from one of the text keys.
#[derive(Clone, Debug, Default)]
pub struct RegistryBlobs {
    config: ProviderConfig,
}

impl RegistryBlobs {
    pub fn new(config: ProviderConfig) -> Self {
        RegistryBlobs { config }
    }

    fn names_hkey(&self) -> HKEY {
        if self.config.english_names {
            HKEY_PERFORMANCE_TEXT
        } else {
            HKEY_PERFORMANCE_NLSTEXT
        }
    }
}

impl BlobProvider for RegistryBlobs {
    fn fetch_snapshot(&mut self) -> Result<Vec<u8>, ProviderError> {
        // From MSDN: the key must be closed when done, even though it was never opened.
        let _key = PerfDataKey(HKEY_PERFORMANCE_DATA);
        query_value(HKEY_PERFORMANCE_DATA, w!("Global"), "Global", &self.config)
    }

    fn fetch_name_table(&mut self) -> Result<Vec<u8>, ProviderError> {
        query_value(self.names_hkey(), w!("Counter"), "Counter", &self.config)
    }
}

/// Query registry value of unknown size, reallocating a larger buffer in a loop as needed.
fn query_value(
    hkey: HKEY,
    value_name: PCWSTR,
    display_name: &str,
    config: &ProviderConfig,
) -> Result<Vec<u8>, ProviderError> {
    // From MSDN:
    // If hKey specifies HKEY_PERFORMANCE_DATA and the lpData buffer is not large enough to
    // contain all of the returned data, RegQueryValueEx returns ERROR_MORE_DATA and the value
    // returned through the lpcbData parameter is undefined.
    // [..]
    // You need to maintain a separate variable to keep track of the buffer size, because the
    // value returned by lpcbData is unpredictable.
    let data = fetch_growing(&config.growth, |buffer| {
        let mut size_out = u32::try_from(buffer.len()).unwrap_or(u32::MAX);
        // SAFETY: buffer is valid for writes of `size_out` bytes
        let status = unsafe {
            RegQueryValueExW(
                hkey,
                value_name,
                None,
                None,
                Some(buffer.as_mut_ptr()),
                Some(&mut size_out as *mut _),
            )
        };
        if status == ERROR_SUCCESS {
            Ok(Attempt::Complete((size_out as usize).min(buffer.len())))
        } else if status == ERROR_MORE_DATA {
            Ok(Attempt::MoreData)
        } else {
            let context = format!("RegQueryValueExW with query: {}", display_name);
            Err(os_error(status, context))
        }
    })?;
    debug!("Registry value {:?}: {} bytes", display_name, data.len());
    Ok(data)
}

fn os_error(code: WIN32_ERROR, context: String) -> ProviderError {
    ProviderError::Os {
        context,
        source: io::Error::from_raw_os_error(code.0 as i32),
    }
}

/// Closes a predefined performance key on drop.
struct PerfDataKey(HKEY);

impl Drop for PerfDataKey {
    fn drop(&mut self) {
        // SAFETY: closing a predefined key is always allowed
        let status = unsafe { RegCloseKey(self.0) };
        if status != ERROR_SUCCESS {
            warn!("RegCloseKey Error: {}", io::Error::from_raw_os_error(status.0 as i32));
        }
    }
}

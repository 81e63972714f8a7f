//! WinINet proxy settings: the per-user `Internet Settings` registry key plus
//! the `InternetSetOptionW` broadcasts that make running clients reread it.

use std::io;
use std::iter::once;
use std::ptr;

use async_trait::async_trait;
use tracing::trace;
use windows_sys::Win32::Foundation::ERROR_SUCCESS;
use windows_sys::Win32::Networking::WinInet::InternetSetOptionW;
use windows_sys::Win32::System::Registry::{
    RegCloseKey, RegOpenKeyExW, RegSetValueExW, HKEY, HKEY_CURRENT_USER, KEY_SET_VALUE, REG_DWORD,
    REG_SZ,
};

use super::{ProxyConfigStore, ReloadSignal};
use crate::error::{ProxyError, ProxyResult};

const INTERNET_SETTINGS_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Internet Settings";

const INTERNET_OPTION_REFRESH: u32 = 37;
const INTERNET_OPTION_SETTINGS_CHANGED: u32 = 39;

#[derive(Debug, Default)]
pub struct WinInetProxyConfig;

#[async_trait]
impl ProxyConfigStore for WinInetProxyConfig {
    async fn set_enabled(&self, enabled: bool) -> ProxyResult<()> {
        let value = u32::from(enabled).to_le_bytes();
        write_value("ProxyEnable", REG_DWORD, &value)
    }

    async fn set_server(&self, endpoint: &str) -> ProxyResult<()> {
        let value: Vec<u8> = wide(endpoint)
            .iter()
            .flat_map(|unit| unit.to_le_bytes())
            .collect();
        write_value("ProxyServer", REG_SZ, &value)
    }

    async fn notify(&self, signal: ReloadSignal) -> ProxyResult<()> {
        let option = match signal {
            ReloadSignal::SettingsChanged => INTERNET_OPTION_SETTINGS_CHANGED,
            ReloadSignal::Refresh => INTERNET_OPTION_REFRESH,
        };
        trace!(%signal, option, "InternetSetOptionW");

        // SAFETY: a null handle with no buffer is the documented way to
        // broadcast these two options.
        let ok = unsafe { InternetSetOptionW(ptr::null(), option, ptr::null(), 0) };
        if ok == 0 {
            return Err(ProxyError::ApplyFailed(format!(
                "InternetSetOptionW({signal}) failed: {}",
                io::Error::last_os_error()
            )));
        }
        Ok(())
    }
}

fn write_value(name: &str, kind: u32, data: &[u8]) -> ProxyResult<()> {
    trace!(name, bytes = data.len(), "Writing Internet Settings value");
    let subkey = wide(INTERNET_SETTINGS_KEY);
    let value_name = wide(name);
    let mut key: HKEY = ptr::null_mut();

    // SAFETY: every pointer refers to a live, NUL-terminated buffer owned by
    // this frame, and `key` is closed before returning.
    unsafe {
        let status = RegOpenKeyExW(HKEY_CURRENT_USER, subkey.as_ptr(), 0, KEY_SET_VALUE, &mut key);
        if status != ERROR_SUCCESS {
            return Err(registry_error("open Internet Settings", status));
        }

        let status = RegSetValueExW(
            key,
            value_name.as_ptr(),
            0,
            kind,
            data.as_ptr(),
            data.len() as u32,
        );
        RegCloseKey(key);

        if status != ERROR_SUCCESS {
            return Err(registry_error(name, status));
        }
    }

    Ok(())
}

fn registry_error(what: &str, status: u32) -> ProxyError {
    ProxyError::ApplyFailed(format!(
        "registry write to {what} failed: {}",
        io::Error::from_raw_os_error(status as i32)
    ))
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(once(0)).collect()
}

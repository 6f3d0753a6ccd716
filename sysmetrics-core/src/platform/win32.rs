// SPDX-License-Identifier: LGPL-3.0-only
//! The native backend: visual styles, the user registry, the live
//! non-client metrics and window-message broadcasts.

use std::mem::size_of;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use sysmetrics_services::broadcast::{Broadcaster, Notification};
use sysmetrics_services::error::{BroadcastError, LiveMetricsError, StoreError, WatchError};
use sysmetrics_services::live::LiveMetrics;
use sysmetrics_services::store::{MetricsStore, WINDOW_METRICS_PATH};
use sysmetrics_services::watcher::{ChangeSignal, KeyWatch, PERSONALIZE_KEY};
use sysmetrics_theme::engine::{LegacyMetricsSource, ThemeData, ThemeEngine};
use sysmetrics_theme::error::SourceError;
use sysmetrics_theme::metrics::{NonClientMetrics, SystemMetric};
use windows::core::{HSTRING, PCWSTR};
use windows::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_FILE_NOT_FOUND, ERROR_MORE_DATA, HANDLE, LPARAM, WAIT_OBJECT_0,
    WPARAM,
};
use windows::Win32::System::Registry::{
    RegCloseKey, RegCreateKeyExW, RegNotifyChangeKeyValue, RegOpenKeyExW, RegQueryValueExW,
    RegSetValueExW, HKEY, HKEY_CURRENT_USER, KEY_NOTIFY, KEY_READ, KEY_WOW64_64KEY, KEY_WRITE,
    REG_NOTIFY_CHANGE_LAST_SET, REG_OPTION_NON_VOLATILE, REG_SZ, REG_VALUE_TYPE,
};
use windows::Win32::System::Threading::{CreateEventW, SetEvent, WaitForMultipleObjects, INFINITE};
use windows::Win32::UI::Controls::{
    CloseThemeData, GetCurrentThemeName, GetThemeSysSize, OpenThemeData, HTHEME,
};
use windows::Win32::UI::WindowsAndMessaging::{
    SendMessageTimeoutW, SystemParametersInfoW, HWND_BROADCAST, NONCLIENTMETRICSW,
    SMTO_ABORTIFHUNG, SPIF_SENDCHANGE, SPIF_UPDATEINIFILE, SPI_GETNONCLIENTMETRICS,
    SPI_SETNONCLIENTMETRICS, SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS, WM_SETTINGCHANGE,
    WM_THEMECHANGED, WM_WININICHANGE,
};

use crate::context::{KeyWatchFactory, Platform};

const MAX_PATH: usize = 260;

fn last_error_code() -> i32 {
    unsafe { GetLastError().0 as i32 }
}

/// The uxtheme visual-styles engine.
#[derive(Debug, Default)]
pub struct UxThemeEngine;

struct UxThemeData(HTHEME);

impl ThemeData for UxThemeData {
    fn sys_size(&self, metric: SystemMetric) -> i32 {
        unsafe { GetThemeSysSize(Some(self.0), metric.index()) }
    }
}

impl Drop for UxThemeData {
    fn drop(&mut self) {
        if let Err(e) = unsafe { CloseThemeData(self.0) } {
            log::warn!("Failed to close theme data: {}", e);
        }
    }
}

impl ThemeEngine for UxThemeEngine {
    fn current_theme_name(&self) -> Result<String, SourceError> {
        let mut name = [0u16; MAX_PATH];
        unsafe { GetCurrentThemeName(&mut name, None, None) }
            .map_err(|e| SourceError::theme_name(e.code().0))?;
        let len = name.iter().position(|&c| c == 0).unwrap_or(name.len());
        Ok(String::from_utf16_lossy(&name[..len]))
    }

    fn open_theme_data<'a>(&'a self, class: &str) -> Result<Box<dyn ThemeData + 'a>, SourceError> {
        let class_name = HSTRING::from(class);
        let theme = unsafe { OpenThemeData(None, &class_name) };
        if theme.is_invalid() {
            return Err(SourceError::theme_data(class, last_error_code()));
        }
        Ok(Box::new(UxThemeData(theme)))
    }
}

fn read_nonclient_metrics() -> Result<NONCLIENTMETRICSW, i32> {
    let mut ncm = NONCLIENTMETRICSW {
        cbSize: size_of::<NONCLIENTMETRICSW>() as u32,
        ..Default::default()
    };
    unsafe {
        SystemParametersInfoW(
            SPI_GETNONCLIENTMETRICS,
            ncm.cbSize,
            Some(&mut ncm as *mut _ as *mut _),
            SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS(0),
        )
    }
    .map_err(|e| e.code().0)?;
    Ok(ncm)
}

fn to_metrics(ncm: &NONCLIENTMETRICSW) -> NonClientMetrics {
    NonClientMetrics {
        border_width: ncm.iBorderWidth,
        scroll_width: ncm.iScrollWidth,
        scroll_height: ncm.iScrollHeight,
        caption_width: ncm.iCaptionWidth,
        caption_height: ncm.iCaptionHeight,
        sm_caption_width: ncm.iSmCaptionWidth,
        sm_caption_height: ncm.iSmCaptionHeight,
        menu_width: ncm.iMenuWidth,
        menu_height: ncm.iMenuHeight,
        padded_border_width: ncm.iPaddedBorderWidth,
    }
}

/// The live non-client metrics, read and written through
/// `SystemParametersInfoW`. Fonts are left untouched.
#[derive(Debug, Default)]
pub struct SystemParameters;

impl LiveMetrics for SystemParameters {
    fn read(&self) -> Result<NonClientMetrics, LiveMetricsError> {
        read_nonclient_metrics()
            .map(|ncm| to_metrics(&ncm))
            .map_err(|code| LiveMetricsError::ReadFailed { code })
    }

    fn write(&self, metrics: &NonClientMetrics) -> Result<(), LiveMetricsError> {
        let mut ncm =
            read_nonclient_metrics().map_err(|code| LiveMetricsError::ReadFailed { code })?;
        ncm.iBorderWidth = metrics.border_width;
        ncm.iScrollWidth = metrics.scroll_width;
        ncm.iScrollHeight = metrics.scroll_height;
        ncm.iCaptionWidth = metrics.caption_width;
        ncm.iCaptionHeight = metrics.caption_height;
        ncm.iSmCaptionWidth = metrics.sm_caption_width;
        ncm.iSmCaptionHeight = metrics.sm_caption_height;
        ncm.iMenuWidth = metrics.menu_width;
        ncm.iMenuHeight = metrics.menu_height;
        ncm.iPaddedBorderWidth = metrics.padded_border_width;

        unsafe {
            SystemParametersInfoW(
                SPI_SETNONCLIENTMETRICS,
                ncm.cbSize,
                Some(&mut ncm as *mut _ as *mut _),
                SPIF_UPDATEINIFILE | SPIF_SENDCHANGE,
            )
        }
        .map_err(|e| LiveMetricsError::WriteFailed { code: e.code().0 })
    }
}

impl LegacyMetricsSource for SystemParameters {
    fn snapshot(&self) -> Result<NonClientMetrics, SourceError> {
        read_nonclient_metrics()
            .map(|ncm| to_metrics(&ncm))
            .map_err(SourceError::snapshot)
    }
}

struct RegKey(HKEY);

// Registry handles may be used from any thread.
unsafe impl Send for RegKey {}
unsafe impl Sync for RegKey {}

impl RegKey {
    fn open(path: &str) -> Result<Self, i32> {
        let mut key = HKEY::default();
        let subkey = HSTRING::from(path);
        let result = unsafe {
            RegOpenKeyExW(HKEY_CURRENT_USER, &subkey, None, KEY_READ | KEY_WRITE | KEY_WOW64_64KEY, &mut key)
        };
        if result.is_ok() {
            return Ok(Self(key));
        }
        let result = unsafe {
            RegCreateKeyExW(
                HKEY_CURRENT_USER,
                &subkey,
                None,
                PCWSTR::null(),
                REG_OPTION_NON_VOLATILE,
                KEY_READ | KEY_WRITE | KEY_WOW64_64KEY,
                None,
                &mut key,
                None,
            )
        };
        if result.is_ok() {
            Ok(Self(key))
        } else {
            Err(result.0 as i32)
        }
    }

    fn open_notify(path: &str) -> Result<Self, i32> {
        let mut key = HKEY::default();
        let subkey = HSTRING::from(path);
        let result = unsafe { RegOpenKeyExW(HKEY_CURRENT_USER, &subkey, None, KEY_NOTIFY, &mut key) };
        if result.is_ok() {
            Ok(Self(key))
        } else {
            Err(result.0 as i32)
        }
    }
}

impl Drop for RegKey {
    fn drop(&mut self) {
        let _ = unsafe { RegCloseKey(self.0) };
    }
}

/// The per-user registry under `HKEY_CURRENT_USER`.
///
/// The key is opened (or created) once and kept until a write through it
/// fails.
pub struct RegistryStore {
    path: String,
    key: Mutex<Option<Arc<RegKey>>>,
}

impl RegistryStore {
    /// A store writing under the window metrics key.
    pub fn new() -> Self {
        Self::with_path(WINDOW_METRICS_PATH)
    }

    /// A store writing under `path`.
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: Mutex::new(None),
        }
    }

    fn key(&self) -> Result<Arc<RegKey>, StoreError> {
        let mut cached = self.key.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(key) = cached.as_ref() {
            return Ok(Arc::clone(key));
        }
        let key = RegKey::open(&self.path)
            .map(Arc::new)
            .map_err(|code| StoreError::PathUnavailable {
                path: self.path.clone(),
                code,
            })?;
        *cached = Some(Arc::clone(&key));
        Ok(key)
    }

    fn forget_key(&self) {
        self.key.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

impl Default for RegistryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsStore for RegistryStore {
    fn path(&self) -> &str {
        &self.path
    }

    fn ensure_path(&self) -> Result<(), StoreError> {
        self.key().map(|_| ())
    }

    fn set_value(&self, name: &str, value: &str) -> Result<(), StoreError> {
        let key = self.key()?;
        let data: Vec<u8> = value
            .encode_utf16()
            .chain(std::iter::once(0))
            .flat_map(u16::to_le_bytes)
            .collect();
        let result = unsafe { RegSetValueExW(key.0, &HSTRING::from(name), None, REG_SZ, Some(&data)) };
        if result.is_ok() {
            Ok(())
        } else {
            self.forget_key();
            Err(StoreError::WriteFailed {
                name: name.to_string(),
                value: value.to_string(),
                code: result.0 as i32,
            })
        }
    }

    fn get_value(&self, name: &str) -> Result<Option<String>, StoreError> {
        let key = self.key()?;
        let value_name = HSTRING::from(name);
        let read_failed = |code: i32| StoreError::ReadFailed {
            name: name.to_string(),
            code,
        };

        // Size query first; the value may change in between, so retry on
        // ERROR_MORE_DATA.
        loop {
            let mut kind = REG_VALUE_TYPE::default();
            let mut size = 0u32;
            let result =
                unsafe { RegQueryValueExW(key.0, &value_name, None, Some(&mut kind), None, Some(&mut size)) };
            if result == ERROR_FILE_NOT_FOUND {
                return Ok(None);
            }
            if result.is_err() {
                return Err(read_failed(result.0 as i32));
            }
            if kind != REG_SZ {
                log::debug!("Ignoring {}: not a string value", name);
                return Ok(None);
            }

            let mut buffer = vec![0u16; (size as usize).div_ceil(2)];
            let result = unsafe {
                RegQueryValueExW(
                    key.0,
                    &value_name,
                    None,
                    Some(&mut kind),
                    Some(buffer.as_mut_ptr() as *mut u8),
                    Some(&mut size),
                )
            };
            if result == ERROR_MORE_DATA {
                continue;
            }
            if result.is_err() {
                return Err(read_failed(result.0 as i32));
            }

            let len = (size as usize / 2).min(buffer.len());
            let value = &buffer[..len];
            let end = value.iter().position(|&c| c == 0).unwrap_or(value.len());
            return Ok(Some(String::from_utf16_lossy(&value[..end])));
        }
    }
}

/// Window-message broadcast to all top-level windows.
#[derive(Debug, Default)]
pub struct MessageBroadcaster;

impl Broadcaster for MessageBroadcaster {
    fn broadcast(&self, notification: &Notification, timeout: Duration) -> Result<(), BroadcastError> {
        let section;
        let (message, lparam) = match notification {
            Notification::SettingChange(name) => {
                section = HSTRING::from(name.as_str());
                (WM_SETTINGCHANGE, LPARAM(section.as_ptr() as isize))
            },
            Notification::WinIniChange(name) => {
                section = HSTRING::from(name.as_str());
                (WM_WININICHANGE, LPARAM(section.as_ptr() as isize))
            },
            Notification::ThemeChanged => (WM_THEMECHANGED, LPARAM(0)),
        };

        let result = unsafe {
            SendMessageTimeoutW(
                HWND_BROADCAST,
                message,
                WPARAM(0),
                lparam,
                SMTO_ABORTIFHUNG,
                timeout.as_millis() as u32,
                None,
            )
        };
        if result.0 == 0 {
            return Err(BroadcastError {
                message: notification.to_string(),
                code: last_error_code(),
            });
        }
        Ok(())
    }
}

struct Event(HANDLE);

// Event handles may be waited on and signalled from any thread.
unsafe impl Send for Event {}
unsafe impl Sync for Event {}

impl Event {
    fn new() -> windows::core::Result<Self> {
        unsafe { CreateEventW(None, false, false, PCWSTR::null()) }.map(Self)
    }
}

impl Drop for Event {
    fn drop(&mut self) {
        let _ = unsafe { CloseHandle(self.0) };
    }
}

/// Last-write notifications on a registry key.
///
/// A bridge thread waits on the notification event and forwards it to the
/// [ChangeSignal]; it exits when the watch is dropped.
pub struct RegistryKeyWatch {
    path: String,
    key: RegKey,
    changed: Arc<Event>,
    stop: Arc<Event>,
    bridge: Option<JoinHandle<()>>,
}

// The key handle is only used from the thread owning the watch.
unsafe impl Send for RegistryKeyWatch {}

impl RegistryKeyWatch {
    /// Open `path` under `HKEY_CURRENT_USER` for change notifications.
    pub fn open(path: &str) -> Result<Self, WatchError> {
        let key = RegKey::open_notify(path)
            .map_err(|code| WatchError::register(path, format!("error={}", code)))?;
        let changed = Event::new().map_err(|e| WatchError::register(path, e))?;
        let stop = Event::new().map_err(|e| WatchError::register(path, e))?;
        Ok(Self {
            path: path.to_string(),
            key,
            changed: Arc::new(changed),
            stop: Arc::new(stop),
            bridge: None,
        })
    }

    fn spawn_bridge(&self, signal: &Arc<ChangeSignal>) -> std::io::Result<JoinHandle<()>> {
        let changed = Arc::clone(&self.changed);
        let stop = Arc::clone(&self.stop);
        let signal = Arc::clone(signal);
        thread::Builder::new()
            .name("sysmetrics-regnotify".to_string())
            .spawn(move || loop {
                let handles = [changed.0, stop.0];
                let result = unsafe { WaitForMultipleObjects(&handles, false, INFINITE) };
                if result == WAIT_OBJECT_0 {
                    signal.notify();
                } else {
                    break;
                }
            })
    }
}

impl KeyWatch for RegistryKeyWatch {
    fn target(&self) -> &str {
        &self.path
    }

    fn register(&mut self, signal: &Arc<ChangeSignal>) -> Result<(), WatchError> {
        let result = unsafe {
            RegNotifyChangeKeyValue(
                self.key.0,
                true,
                REG_NOTIFY_CHANGE_LAST_SET,
                Some(self.changed.0),
                true,
            )
        };
        if result.is_err() {
            return Err(WatchError::register(&self.path, format!("error={}", result.0)));
        }
        if self.bridge.is_none() {
            let bridge = self
                .spawn_bridge(signal)
                .map_err(|e| WatchError::register(&self.path, e))?;
            self.bridge = Some(bridge);
        }
        Ok(())
    }
}

impl Drop for RegistryKeyWatch {
    fn drop(&mut self) {
        let _ = unsafe { SetEvent(self.stop.0) };
        if let Some(bridge) = self.bridge.take() {
            let _ = bridge.join();
        }
    }
}

/// Key watch factory for the theme personalization key.
pub fn personalize_key_watch() -> KeyWatchFactory {
    Arc::new(|| Ok(Box::new(RegistryKeyWatch::open(PERSONALIZE_KEY)?) as Box<dyn KeyWatch>))
}

/// The full native platform.
pub fn native() -> Platform {
    let parameters = Arc::new(SystemParameters);
    Platform {
        engine: Arc::new(UxThemeEngine),
        legacy: parameters.clone(),
        store: Arc::new(RegistryStore::new()),
        live: parameters,
        broadcaster: Arc::new(MessageBroadcaster),
        key_watch: personalize_key_watch(),
    }
}

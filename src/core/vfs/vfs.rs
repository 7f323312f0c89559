//! SQLite VFS implementation
//!
//! Implements the sqlite3_vfs interface to provide filesystem operations
//! backed by a device registry.

use super::device_key;
use super::file::file_open;
use crate::config::MAX_PATHNAME;
use crate::error::{MemDbError, Result};
use crate::registry::Registry;
use libsqlite3_sys as ffi;
use parking_lot::Mutex;
use rand::RngCore;
use rusqlite::{Connection, OpenFlags};
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Default name of the VFS as registered with SQLite
pub const VFS_NAME: &str = "memvfs";

/// Julian day of the Unix epoch
const UNIX_EPOCH_JULIAN_DAY: f64 = 2440587.5;

/// Unix epoch as a Julian day in milliseconds
const UNIX_EPOCH_JULIAN_MS: i64 = 210866760000000;

/// Names registered through [`register_vfs`], so unregister never frees a
/// VFS this crate did not allocate
static REGISTERED: Mutex<Vec<String>> = parking_lot::const_mutex(Vec::new());

/// Memory VFS instance, stored as the sqlite3_vfs app data
pub struct MemVfs {
    /// Where files opened through this VFS live
    registry: Arc<Registry>,
    /// VFS name (C string)
    name: CString,
}

impl MemVfs {
    pub fn new(name: &str, registry: Arc<Registry>) -> Result<Self> {
        let name = CString::new(name).map_err(|_| MemDbError::InvalidName(name.to_string()))?;
        Ok(Self { registry, name })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn name(&self) -> &CStr {
        &self.name
    }
}

/// Register a memory VFS called `name`, serving files from `registry`
pub fn register_vfs(name: &str, registry: Arc<Registry>) -> Result<()> {
    let mut registered = REGISTERED.lock();

    let vfs = MemVfs::new(name, registry)?;
    unsafe {
        if !ffi::sqlite3_vfs_find(vfs.name.as_ptr()).is_null() {
            return Err(MemDbError::VfsAlreadyRegistered(name.to_string()));
        }
    }

    let vfs_ptr = Box::into_raw(Box::new(vfs));

    let sqlite_vfs = Box::new(ffi::sqlite3_vfs {
        iVersion: 2,
        szOsFile: std::mem::size_of::<super::file::MemFile>() as c_int,
        mxPathname: MAX_PATHNAME,
        pNext: ptr::null_mut(),
        zName: unsafe { (*vfs_ptr).name.as_ptr() },
        pAppData: vfs_ptr as *mut c_void,
        xOpen: Some(vfs_open),
        xDelete: Some(vfs_delete),
        xAccess: Some(vfs_access),
        xFullPathname: Some(vfs_full_pathname),
        xDlOpen: None,
        xDlError: None,
        xDlSym: None,
        xDlClose: None,
        xRandomness: Some(vfs_randomness),
        xSleep: Some(vfs_sleep),
        xCurrentTime: Some(vfs_current_time),
        xGetLastError: Some(vfs_get_last_error),
        xCurrentTimeInt64: Some(vfs_current_time_int64),
        xSetSystemCall: None,
        xGetSystemCall: None,
        xNextSystemCall: None,
    });

    let vfs_box_ptr = Box::into_raw(sqlite_vfs);

    unsafe {
        let rc = ffi::sqlite3_vfs_register(vfs_box_ptr, 0);
        if rc != ffi::SQLITE_OK {
            // Clean up on failure
            drop(Box::from_raw(vfs_box_ptr));
            drop(Box::from_raw(vfs_ptr));
            return Err(MemDbError::VfsRegistrationFailed(rc));
        }
    }

    registered.push(name.to_string());
    info!("Registered VFS '{}'", name);
    Ok(())
}

/// Unregister a VFS previously registered with [`register_vfs`].
///
/// Names this crate did not register are ignored. Connections opened through
/// the VFS must be closed first.
pub fn unregister_vfs(name: &str) -> Result<()> {
    let mut registered = REGISTERED.lock();
    let Some(index) = registered.iter().position(|n| n == name) else {
        return Ok(());
    };

    let c_name = CString::new(name).map_err(|_| MemDbError::InvalidName(name.to_string()))?;

    unsafe {
        let vfs_ptr = ffi::sqlite3_vfs_find(c_name.as_ptr());
        if vfs_ptr.is_null() {
            registered.swap_remove(index);
            return Ok(());
        }

        let rc = ffi::sqlite3_vfs_unregister(vfs_ptr);
        if rc != ffi::SQLITE_OK {
            return Err(MemDbError::VfsRegistrationFailed(rc));
        }

        // Clean up allocated memory
        let app_data = (*vfs_ptr).pAppData;
        if !app_data.is_null() {
            drop(Box::from_raw(app_data as *mut MemVfs));
        }
        drop(Box::from_raw(vfs_ptr));
    }

    registered.swap_remove(index);
    info!("Unregistered VFS '{}'", name);
    Ok(())
}

/// Open a connection to device `db_name` through the VFS named `vfs`
pub fn connect(vfs: &str, db_name: &str) -> Result<Connection> {
    let uri = format!("file:/{}?vfs={}", device_key(db_name), vfs);
    debug!("Opening {}", uri);

    let conn = Connection::open_with_flags(
        &uri,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(conn)
}

/// Resolve the `MemVfs` behind a sqlite3_vfs pointer
pub(super) unsafe fn app_data<'a>(vfs: *mut ffi::sqlite3_vfs) -> Option<&'a MemVfs> {
    if vfs.is_null() {
        return None;
    }
    ((*vfs).pAppData as *const MemVfs).as_ref()
}

// VFS callback functions

unsafe extern "C" fn vfs_open(
    vfs: *mut ffi::sqlite3_vfs,
    z_name: *const c_char,
    file: *mut ffi::sqlite3_file,
    flags: c_int,
    p_out_flags: *mut c_int,
) -> c_int {
    file_open(vfs, z_name, file, flags, p_out_flags)
}

unsafe extern "C" fn vfs_delete(
    vfs: *mut ffi::sqlite3_vfs,
    z_name: *const c_char,
    _sync_dir: c_int,
) -> c_int {
    let Some(vfs_impl) = app_data(vfs) else {
        return ffi::SQLITE_ERROR;
    };
    if z_name.is_null() {
        return ffi::SQLITE_IOERR_DELETE;
    }

    let path = match CStr::from_ptr(z_name).to_str() {
        Ok(p) => p,
        Err(_) => return ffi::SQLITE_ERROR,
    };

    match vfs_impl.registry.remove(device_key(path)) {
        Some(_) => ffi::SQLITE_OK,
        None => ffi::SQLITE_IOERR_DELETE_NOENT,
    }
}

unsafe extern "C" fn vfs_access(
    vfs: *mut ffi::sqlite3_vfs,
    z_name: *const c_char,
    _flags: c_int,
    p_res_out: *mut c_int,
) -> c_int {
    let Some(vfs_impl) = app_data(vfs) else {
        return ffi::SQLITE_ERROR;
    };
    if z_name.is_null() || p_res_out.is_null() {
        return ffi::SQLITE_ERROR;
    }

    let path = match CStr::from_ptr(z_name).to_str() {
        Ok(p) => p,
        Err(_) => return ffi::SQLITE_ERROR,
    };

    let exists = vfs_impl.registry.contains(device_key(path));
    *p_res_out = c_int::from(exists);
    ffi::SQLITE_OK
}

unsafe extern "C" fn vfs_full_pathname(
    _vfs: *mut ffi::sqlite3_vfs,
    z_name: *const c_char,
    n_out: c_int,
    z_out: *mut c_char,
) -> c_int {
    // Names are registry keys, not filesystem paths; copy as-is
    let len = libc::strlen(z_name);
    if len >= n_out as usize {
        return ffi::SQLITE_CANTOPEN;
    }

    libc::strcpy(z_out, z_name);
    ffi::SQLITE_OK
}

unsafe extern "C" fn vfs_randomness(
    _vfs: *mut ffi::sqlite3_vfs,
    n_byte: c_int,
    z_out: *mut c_char,
) -> c_int {
    if n_byte <= 0 || z_out.is_null() {
        return 0;
    }

    let bytes = std::slice::from_raw_parts_mut(z_out as *mut u8, n_byte as usize);
    rand::thread_rng().fill_bytes(bytes);
    n_byte
}

unsafe extern "C" fn vfs_sleep(_vfs: *mut ffi::sqlite3_vfs, microseconds: c_int) -> c_int {
    std::thread::sleep(Duration::from_micros(microseconds.max(0) as u64));
    microseconds
}

unsafe extern "C" fn vfs_current_time(_vfs: *mut ffi::sqlite3_vfs, p_time_out: *mut f64) -> c_int {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    *p_time_out = UNIX_EPOCH_JULIAN_DAY + (duration.as_secs_f64() / 86400.0);
    ffi::SQLITE_OK
}

unsafe extern "C" fn vfs_current_time_int64(
    _vfs: *mut ffi::sqlite3_vfs,
    p_time_out: *mut ffi::sqlite3_int64,
) -> c_int {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    *p_time_out = UNIX_EPOCH_JULIAN_MS + duration.as_millis() as i64;
    ffi::SQLITE_OK
}

unsafe extern "C" fn vfs_get_last_error(
    _vfs: *mut ffi::sqlite3_vfs,
    _n_byte: c_int,
    _z_err_msg: *mut c_char,
) -> c_int {
    0
}

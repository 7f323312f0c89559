//! SQLite file I/O methods implementation
//!
//! Implements sqlite3_io_methods for reading and writing devices. Every call
//! maps onto a single locked device operation.

use super::device_key;
use super::vfs::app_data;
use crate::config::SECTOR_SIZE;
use crate::device::Device;
use crate::error::MemDbError;
use crate::lock::LockLevel;
use crate::registry::Registry;
use libsqlite3_sys as ffi;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;
use std::sync::Arc;
use tracing::{debug, trace};

/// Device-backed SQLite file
#[repr(C)]
pub struct MemFile {
    /// Base sqlite3_file structure (MUST be first field)
    #[allow(dead_code)]
    base: ffi::sqlite3_file,
    /// Device holding the file's bytes
    device: Arc<Device>,
    /// Registry and key the device was opened from; `None` for temp files
    origin: Option<(Arc<Registry>, String)>,
    /// Lock level held by this handle
    lock: LockLevel,
    read_only: bool,
    delete_on_close: bool,
}

static IO_METHODS: ffi::sqlite3_io_methods = ffi::sqlite3_io_methods {
    iVersion: 1,
    xClose: Some(file_close),
    xRead: Some(file_read),
    xWrite: Some(file_write),
    xTruncate: Some(file_truncate),
    xSync: Some(file_sync),
    xFileSize: Some(file_file_size),
    xLock: Some(file_lock),
    xUnlock: Some(file_unlock),
    xCheckReservedLock: Some(file_check_reserved_lock),
    xFileControl: Some(file_file_control),
    xSectorSize: Some(file_sector_size),
    xDeviceCharacteristics: Some(file_device_characteristics),
    xShmMap: None,
    xShmLock: None,
    xShmBarrier: None,
    xShmUnmap: None,
    xFetch: None,
    xUnfetch: None,
};

unsafe fn mem_file<'a>(file: *mut ffi::sqlite3_file) -> &'a mut MemFile {
    &mut *(file as *mut MemFile)
}

// File I/O method implementations

unsafe extern "C" fn file_close(file: *mut ffi::sqlite3_file) -> c_int {
    let mem = file as *mut MemFile;

    {
        let f = &mut *mem;
        f.device.unlock(&mut f.lock, LockLevel::None);

        if f.delete_on_close {
            if let Some((registry, key)) = &f.origin {
                let same = registry
                    .get(key)
                    .is_some_and(|d| Arc::ptr_eq(&d, &f.device));
                if same {
                    registry.remove(key);
                }
            }
        }
    }

    ptr::drop_in_place(mem);
    (*file).pMethods = ptr::null();
    ffi::SQLITE_OK
}

unsafe extern "C" fn file_read(
    file: *mut ffi::sqlite3_file,
    buf: *mut c_void,
    amt: c_int,
    offset: ffi::sqlite3_int64,
) -> c_int {
    let f = mem_file(file);

    if offset < 0 || amt < 0 {
        return ffi::SQLITE_IOERR_READ;
    }

    let buf = std::slice::from_raw_parts_mut(buf as *mut u8, amt as usize);
    match f.device.read_at(buf, offset as u64) {
        Ok(n) if n == buf.len() => ffi::SQLITE_OK,
        Ok(n) => {
            // SQLite expects the unread tail zero-filled
            buf[n..].fill(0);
            ffi::SQLITE_IOERR_SHORT_READ
        }
        Err(_) => ffi::SQLITE_IOERR_READ,
    }
}

unsafe extern "C" fn file_write(
    file: *mut ffi::sqlite3_file,
    buf: *const c_void,
    amt: c_int,
    offset: ffi::sqlite3_int64,
) -> c_int {
    let f = mem_file(file);

    if offset < 0 || amt < 0 || f.read_only {
        return ffi::SQLITE_IOERR_WRITE;
    }

    let data = std::slice::from_raw_parts(buf as *const u8, amt as usize);
    match f.device.write_at(data, offset as u64) {
        Ok(_) => ffi::SQLITE_OK,
        Err(_) => ffi::SQLITE_IOERR_WRITE,
    }
}

unsafe extern "C" fn file_truncate(
    file: *mut ffi::sqlite3_file,
    size: ffi::sqlite3_int64,
) -> c_int {
    let f = mem_file(file);

    if size < 0 {
        return ffi::SQLITE_IOERR_TRUNCATE;
    }

    match f.device.truncate(size as u64) {
        Ok(()) => ffi::SQLITE_OK,
        Err(_) => ffi::SQLITE_IOERR_TRUNCATE,
    }
}

unsafe extern "C" fn file_sync(_file: *mut ffi::sqlite3_file, _flags: c_int) -> c_int {
    // Nothing to flush
    ffi::SQLITE_OK
}

unsafe extern "C" fn file_file_size(
    file: *mut ffi::sqlite3_file,
    p_size: *mut ffi::sqlite3_int64,
) -> c_int {
    let f = mem_file(file);
    *p_size = f.device.size() as ffi::sqlite3_int64;
    ffi::SQLITE_OK
}

unsafe extern "C" fn file_lock(file: *mut ffi::sqlite3_file, lock_type: c_int) -> c_int {
    let f = mem_file(file);
    let want = LockLevel::from_raw(lock_type);

    if f.lock >= want {
        return ffi::SQLITE_OK;
    }

    let result = if f.read_only && want >= LockLevel::Reserved {
        Err(MemDbError::ReadOnly)
    } else {
        f.device.lock(&mut f.lock, want)
    };

    match result {
        Ok(()) => ffi::SQLITE_OK,
        Err(MemDbError::Busy) => {
            trace!("Lock {:?} on '{}' is busy", want, f.device.name());
            ffi::SQLITE_BUSY
        }
        Err(e) => {
            debug!("Lock {:?} on '{}' failed: {}", want, f.device.name(), e);
            ffi::SQLITE_IOERR_LOCK
        }
    }
}

unsafe extern "C" fn file_unlock(file: *mut ffi::sqlite3_file, lock_type: c_int) -> c_int {
    let f = mem_file(file);
    f.device.unlock(&mut f.lock, LockLevel::from_raw(lock_type));
    ffi::SQLITE_OK
}

unsafe extern "C" fn file_check_reserved_lock(
    file: *mut ffi::sqlite3_file,
    p_res_out: *mut c_int,
) -> c_int {
    let f = mem_file(file);
    *p_res_out = c_int::from(f.device.check_reserved_lock(f.lock));
    ffi::SQLITE_OK
}

unsafe extern "C" fn file_file_control(
    _file: *mut ffi::sqlite3_file,
    _op: c_int,
    _p_arg: *mut c_void,
) -> c_int {
    // Return NOTFOUND for unhandled operations
    ffi::SQLITE_NOTFOUND
}

unsafe extern "C" fn file_sector_size(_file: *mut ffi::sqlite3_file) -> c_int {
    SECTOR_SIZE
}

unsafe extern "C" fn file_device_characteristics(_file: *mut ffi::sqlite3_file) -> c_int {
    ffi::SQLITE_IOCAP_ATOMIC
        | ffi::SQLITE_IOCAP_SAFE_APPEND
        | ffi::SQLITE_IOCAP_SEQUENTIAL
        | ffi::SQLITE_IOCAP_POWERSAFE_OVERWRITE
}

// VFS open callback

pub(super) unsafe fn file_open(
    vfs: *mut ffi::sqlite3_vfs,
    z_name: *const c_char,
    file: *mut ffi::sqlite3_file,
    flags: c_int,
    p_out_flags: *mut c_int,
) -> c_int {
    // SQLite only calls xClose when pMethods is set
    (*file).pMethods = ptr::null();

    let Some(vfs_impl) = app_data(vfs) else {
        return ffi::SQLITE_ERROR;
    };
    let registry = vfs_impl.registry();

    // Null or empty names are temp files private to this handle
    let key = if z_name.is_null() {
        None
    } else {
        match CStr::from_ptr(z_name).to_str() {
            Ok("") => None,
            Ok(name) => Some(device_key(name).to_string()),
            Err(_) => return ffi::SQLITE_CANTOPEN,
        }
    };

    let device = match &key {
        None => Arc::new(Device::new("temp", &[])),
        Some(key) => match registry.get(key) {
            Some(device) => device,
            None if flags & ffi::SQLITE_OPEN_CREATE != 0 => match registry.get_or_create(key) {
                Ok(device) => device,
                Err(_) => return ffi::SQLITE_CANTOPEN,
            },
            None => return ffi::SQLITE_CANTOPEN,
        },
    };

    debug!(
        "Opening '{}' (flags {:#x}, {} bytes)",
        device.name(),
        flags,
        device.size()
    );

    let origin = key.map(|key| (Arc::clone(registry), key));
    ptr::write(
        file as *mut MemFile,
        MemFile {
            base: ffi::sqlite3_file {
                pMethods: &IO_METHODS,
            },
            device,
            delete_on_close: flags & ffi::SQLITE_OPEN_DELETEONCLOSE != 0 && origin.is_some(),
            origin,
            lock: LockLevel::None,
            read_only: flags & ffi::SQLITE_OPEN_READONLY != 0,
        },
    );

    if !p_out_flags.is_null() {
        *p_out_flags = flags;
    }

    ffi::SQLITE_OK
}

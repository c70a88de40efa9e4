//! Raw NVML calls
//!
//! MIG instance enumeration is not wrapped by nvml-wrapper, so the slot
//! count, the per-slot handles and the UUID of a raw MIG handle are resolved
//! from the NVML shared library with libloading.

use crate::error::DriverError;

use libloading::{Library, Symbol};
use nvml_wrapper_sys::bindings::{nvmlDevice_t, nvmlReturn_enum_NVML_SUCCESS};
use std::ffi::CStr;
use std::os::raw::{c_char, c_uint};

const NVML_LIBRARY: &str = "libnvidia-ml.so.1";

const NVML_ERROR_INVALID_ARGUMENT: c_uint = 2;
const NVML_ERROR_NOT_SUPPORTED: c_uint = 3;
const NVML_ERROR_NO_PERMISSION: c_uint = 4;
const NVML_ERROR_NOT_FOUND: c_uint = 6;
const NVML_ERROR_GPU_IS_LOST: c_uint = 15;

const NVML_DEVICE_UUID_V2_BUFFER_SIZE: usize = 96;

type GetCountFn = unsafe extern "C" fn(nvmlDevice_t, *mut c_uint) -> c_uint;
type GetMigHandleFn = unsafe extern "C" fn(nvmlDevice_t, c_uint, *mut nvmlDevice_t) -> c_uint;
type GetUuidFn = unsafe extern "C" fn(nvmlDevice_t, *mut c_char, c_uint) -> c_uint;

/// Handle to the NVML shared library for raw calls
pub struct RawNvml {
    lib: Library,
}

impl RawNvml {
    /// Load the NVML shared library
    pub fn load() -> Result<Self, DriverError> {
        // SAFETY: loading the vendor library runs no initializers we depend on
        let lib = unsafe { Library::new(NVML_LIBRARY) }.map_err(|e| {
            log::debug!("Failed to load {}: {}", NVML_LIBRARY, e);
            DriverError::LibraryNotFound
        })?;
        Ok(Self { lib })
    }

    fn symbol<T>(&self, name: &[u8]) -> Result<Symbol<'_, T>, DriverError> {
        // SAFETY: callers pair each symbol name with its C signature
        unsafe { self.lib.get(name) }
            .map_err(|e| DriverError::NotSupported(format!("Function not available: {}", e)))
    }

    /// UUIDs of the populated MIG slots of a parent device
    pub fn mig_device_uuids(&self, handle: nvmlDevice_t) -> Result<Vec<String>, DriverError> {
        let count_fn: Symbol<GetCountFn> = self.symbol(b"nvmlDeviceGetMaxMigDeviceCount")?;
        let handle_fn: Symbol<GetMigHandleFn> =
            self.symbol(b"nvmlDeviceGetMigDeviceHandleByIndex")?;

        let mut count: c_uint = 0;
        check(unsafe { count_fn(handle, &mut count) }, "MIG device count")?;

        let mut uuids = Vec::new();
        for index in 0..count {
            let mut mig_handle: nvmlDevice_t = std::ptr::null_mut();
            let result = unsafe { handle_fn(handle, index, &mut mig_handle) };

            if is_empty_slot(result) {
                continue;
            }
            check(result, "MIG device handle")?;

            uuids.push(self.device_uuid(mig_handle)?);
        }

        Ok(uuids)
    }

    /// UUID of any device handle, including MIG instances
    pub fn device_uuid(&self, handle: nvmlDevice_t) -> Result<String, DriverError> {
        let func: Symbol<GetUuidFn> = self.symbol(b"nvmlDeviceGetUUID")?;

        let mut buffer = [0 as c_char; NVML_DEVICE_UUID_V2_BUFFER_SIZE];
        let result = unsafe {
            func(
                handle,
                buffer.as_mut_ptr(),
                NVML_DEVICE_UUID_V2_BUFFER_SIZE as c_uint,
            )
        };
        check(result, "device UUID")?;

        // SAFETY: NVML writes a NUL-terminated string into the buffer on success
        let uuid = unsafe { CStr::from_ptr(buffer.as_ptr()) };
        Ok(uuid.to_string_lossy().into_owned())
    }
}

/// Return codes NVML gives for an unpopulated MIG slot
fn is_empty_slot(code: c_uint) -> bool {
    code == NVML_ERROR_NOT_FOUND || code == NVML_ERROR_INVALID_ARGUMENT
}

/// Map an NVML return code to a driver error
fn check(code: c_uint, what: &str) -> Result<(), DriverError> {
    match code {
        x if x == nvmlReturn_enum_NVML_SUCCESS => Ok(()),
        NVML_ERROR_NOT_SUPPORTED => Err(DriverError::NotSupported(what.to_string())),
        NVML_ERROR_NO_PERMISSION => Err(DriverError::InsufficientPermissions(what.to_string())),
        NVML_ERROR_GPU_IS_LOST => Err(DriverError::GpuLost),
        code => Err(DriverError::Unknown(format!(
            "{} failed with NVML error code {}",
            what, code
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_success() {
        assert!(check(nvmlReturn_enum_NVML_SUCCESS, "test").is_ok());
    }

    #[test]
    fn test_check_maps_codes() {
        assert!(matches!(
            check(NVML_ERROR_NOT_SUPPORTED, "MIG device count"),
            Err(DriverError::NotSupported(_))
        ));
        assert!(matches!(
            check(NVML_ERROR_NO_PERMISSION, "MIG device count"),
            Err(DriverError::InsufficientPermissions(_))
        ));
        assert_eq!(
            check(NVML_ERROR_GPU_IS_LOST, "MIG device count"),
            Err(DriverError::GpuLost)
        );
        assert!(matches!(
            check(999, "MIG device count"),
            Err(DriverError::Unknown(_))
        ));
    }

    #[test]
    fn test_empty_slot_codes() {
        assert!(is_empty_slot(NVML_ERROR_NOT_FOUND));
        assert!(is_empty_slot(NVML_ERROR_INVALID_ARGUMENT));
        assert!(!is_empty_slot(nvmlReturn_enum_NVML_SUCCESS));
        assert!(!is_empty_slot(NVML_ERROR_GPU_IS_LOST));
    }

    #[test]
    #[ignore = "Requires NVIDIA GPU"]
    fn test_load_library() {
        assert!(RawNvml::load().is_ok());
    }
}

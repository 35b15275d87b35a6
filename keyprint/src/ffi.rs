//! C ABI for managed callers (Python ctypes/cffi, C#, Java FFM, ...).
//!
//! The ABI owns one process-wide [`DnnService`]. Every function returns an
//! [`ErrorCode`] as `i32`; on failure the message is available from
//! [`keyprint_last_error`] on the same thread until the next failing call.
//!
//! ```text
//! keyprint_load_model("typing.dnn")            -> 0
//! keyprint_predict(flat, 15, 3, 5, &label)     -> 0, label in [0, 10)
//! keyprint_predict(flat, 14, 3, 5, &label)     -> 2 (shape mismatch)
//! ```

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;

use once_cell::sync::Lazy;

use crate::error::{ErrorCode, KeyprintError};
use crate::model_dnn::{DnnLoader, DnnService};

/// ABI version; bumped on any signature or code change.
pub const ABI_VERSION: u32 = 1;

static SERVICE: Lazy<DnnService> = Lazy::new(|| DnnService::new(DnnLoader::default()));

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn report(result: Result<(), KeyprintError>) -> i32 {
    match result {
        Ok(()) => {
            LAST_ERROR.with(|e| e.borrow_mut().take());
            ErrorCode::Ok as i32
        }
        Err(err) => {
            let code = err.code();
            let msg = CString::new(err.to_string().replace('\0', " "))
                .unwrap_or_default();
            LAST_ERROR.with(|e| *e.borrow_mut() = Some(msg));
            code as i32
        }
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn keyprint_abi_version() -> u32 {
    ABI_VERSION
}

/// Loads the model at `path` (NUL-terminated UTF-8) into the global slot.
///
/// # Safety
///
/// `path` must be null or point to a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn keyprint_load_model(path: *const c_char) -> i32 {
    if path.is_null() {
        return report(Err(KeyprintError::InvalidArgument("path is null")));
    }
    let path = unsafe { CStr::from_ptr(path) };
    let result = match path.to_str() {
        Ok(p) => SERVICE.load_model(Path::new(p)),
        Err(_) => Err(KeyprintError::InvalidArgument("path is not UTF-8")),
    };
    report(result)
}

/// Predicts the label of the `rows x cols` sample stored row-major in
/// `flat[0..len]` and writes it to `out_label`.
///
/// # Safety
///
/// `flat` must point to `len` readable doubles (it may be null when `len`
/// is 0). `out_label` must be null or point to writable memory.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn keyprint_predict(
    flat: *const f64,
    len: usize,
    rows: usize,
    cols: usize,
    out_label: *mut u64,
) -> i32 {
    if out_label.is_null() {
        return report(Err(KeyprintError::InvalidArgument("out_label is null")));
    }
    if flat.is_null() && len != 0 {
        return report(Err(KeyprintError::InvalidArgument("flat is null")));
    }
    let flat: &[f64] = if len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(flat, len) }
    };
    let result = SERVICE.predict(flat, rows, cols).map(|label| unsafe {
        *out_label = label as u64;
    });
    report(result)
}

/// Releases the loaded model. Returns 1 if a model was released, 0 if
/// none was loaded.
#[unsafe(no_mangle)]
pub extern "C" fn keyprint_unload() -> i32 {
    SERVICE.unload() as i32
}

#[unsafe(no_mangle)]
pub extern "C" fn keyprint_is_loaded() -> i32 {
    SERVICE.is_loaded() as i32
}

/// Message of the last failed call on this thread, or null.
///
/// The pointer stays valid until the next keyprint call on the same thread.
#[unsafe(no_mangle)]
pub extern "C" fn keyprint_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map_or(ptr::null(), |msg| msg.as_ptr())
    })
}

#[cfg(test)]
mod tests {
    use keyprint_dnn::{Architecture, Net};

    use super::*;

    fn last_error() -> String {
        let ptr = keyprint_last_error();
        assert!(!ptr.is_null());
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }

    // The ABI shares one global service, so the whole lifecycle runs in a
    // single test to stay independent of test-thread scheduling.
    #[test]
    fn abi_lifecycle() {
        assert_eq!(keyprint_abi_version(), 1);
        let mut label = u64::MAX;
        let flat: Vec<f64> = (0..15).map(|i| i as f64 * 0.1).collect();

        // Predict before load.
        let rc = unsafe { keyprint_predict(flat.as_ptr(), flat.len(), 3, 5, &mut label) };
        assert_eq!(rc, ErrorCode::NotLoaded as i32);
        assert!(last_error().contains("not loaded"));

        // Bad path.
        let missing = CString::new("/nonexistent/typing.dnn").unwrap();
        let rc = unsafe { keyprint_load_model(missing.as_ptr()) };
        assert_eq!(rc, ErrorCode::Io as i32);
        assert_eq!(keyprint_is_loaded(), 0);

        // Null arguments.
        assert_eq!(
            unsafe { keyprint_load_model(ptr::null()) },
            ErrorCode::InvalidArgument as i32
        );
        assert_eq!(
            unsafe { keyprint_predict(flat.as_ptr(), flat.len(), 3, 5, ptr::null_mut()) },
            ErrorCode::InvalidArgument as i32
        );

        // Good model.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typing.dnn");
        Net::from_fn(Architecture::TYPING, 3, 5, |i| ((i as f32) * 0.37).sin() * 0.2)
            .unwrap()
            .save(&path)
            .unwrap();
        let c_path = CString::new(path.to_str().unwrap()).unwrap();
        assert_eq!(unsafe { keyprint_load_model(c_path.as_ptr()) }, 0);
        assert!(keyprint_last_error().is_null());
        assert_eq!(keyprint_is_loaded(), 1);

        let rc = unsafe { keyprint_predict(flat.as_ptr(), flat.len(), 3, 5, &mut label) };
        assert_eq!(rc, 0);
        assert!(label < 10);
        let first = label;
        let rc = unsafe { keyprint_predict(flat.as_ptr(), flat.len(), 3, 5, &mut label) };
        assert_eq!(rc, 0);
        assert_eq!(label, first);

        // Shape mismatch leaves the label untouched.
        label = 99;
        let rc = unsafe { keyprint_predict(flat.as_ptr(), 14, 3, 5, &mut label) };
        assert_eq!(rc, ErrorCode::ShapeMismatch as i32);
        assert_eq!(label, 99);
        assert!(last_error().contains("3x5"));

        // A failed reload keeps the loaded model.
        let rc = unsafe { keyprint_load_model(missing.as_ptr()) };
        assert_eq!(rc, ErrorCode::Io as i32);
        assert_eq!(keyprint_is_loaded(), 1);

        assert_eq!(keyprint_unload(), 1);
        assert_eq!(keyprint_unload(), 0);
    }
}

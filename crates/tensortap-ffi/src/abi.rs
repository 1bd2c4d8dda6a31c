/// C ABI exports for the tensortap capture store
///
/// The capture functions mirror the instrumented host's calling convention:
/// no return values, rank-4 shape/stride arrays, NUL-terminated strings.
/// Failures never abort the process; they are logged and stored for
/// `tensortap_last_error`.
use crate::context::CaptureOptions;
use crate::{set_last_error, take_last_error, ErrorCode};
use std::ffi::CStr;
use std::os::raw::c_char;
use std::path::Path;
use std::slice;
use std::sync::Mutex;
use tensortap_core::tensor::{self, ELEM_SIZE};
use tensortap_core::{CaptureStore, Error, SessionLog, TensorRecord};

// Process-wide capture state. Every entry point locks for the duration of
// the call; operations are synchronous and blocking.
static STORE: Mutex<CaptureStore> = Mutex::new(CaptureStore::new());
static SESSIONS: Mutex<SessionLog> = Mutex::new(SessionLog::new());
static INPUT_LABEL: Mutex<String> = Mutex::new(String::new());
static OPTIONS: Mutex<CaptureOptions> = Mutex::new(CaptureOptions::new());

fn fail(context: &str, err: &Error) {
    let msg = format!("{}: {}", context, err);
    log::error!("{}", msg);
    set_last_error(msg);
}

/// Decode a NUL-terminated string argument, reporting null / non-UTF-8.
///
/// # Safety
/// `ptr` must be null or a valid NUL-terminated C string.
unsafe fn str_arg(context: &str, ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        fail(context, &Error::InvalidArgument("null string pointer".into()));
        return None;
    }
    match CStr::from_ptr(ptr).to_str() {
        Ok(s) => Some(s.to_string()),
        Err(e) => {
            fail(context, &Error::InvalidArgument(format!("string is not valid UTF-8: {}", e)));
            None
        }
    }
}

/// Configure the capture runtime from a JSON options document and install
/// the process logger.
///
/// Passing a null or empty config keeps the defaults. Returns 0 on success,
/// an error code otherwise.
///
/// # Safety
/// `config_ptr` must be valid for reads of `config_len` bytes, or null.
#[no_mangle]
pub unsafe extern "C" fn tensortap_init(config_ptr: *const u8, config_len: usize) -> u32 {
    let _ = env_logger::try_init();

    let config_str = if config_ptr.is_null() || config_len == 0 {
        "{}" // Default config
    } else {
        let bytes = slice::from_raw_parts(config_ptr, config_len);
        match std::str::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => {
                set_last_error(format!("Invalid UTF-8 in config: {}", e));
                return ErrorCode::InvalidArgument as u32;
            }
        }
    };

    let options = match CaptureOptions::from_json(config_str) {
        Ok(o) => o,
        Err(e) => {
            set_last_error(format!("Config parse error: {}", e));
            return ErrorCode::InvalidArgument as u32;
        }
    };

    STORE.lock().unwrap().set_limit(options.max_records);
    *OPTIONS.lock().unwrap() = options;

    ErrorCode::Ok as u32
}

/// Print a fixed greeting to stdout. Smoke test that the library is
/// reachable from the host.
#[no_mangle]
pub extern "C" fn tensortap_hello() {
    println!("Hello, world!");
}

/// Discard every captured tensor. Idempotent.
#[no_mangle]
pub extern "C" fn tensortap_clear() {
    STORE.lock().unwrap().clear();
}

/// Print a listing of every captured tensor to stdout, in insertion order.
///
/// With `print_values` set in the options, the element data follows each
/// record header.
#[no_mangle]
pub extern "C" fn tensortap_print() {
    let values = OPTIONS.lock().unwrap().print_values;
    STORE.lock().unwrap().print(values);
}

/// Capture a tensor.
///
/// Copies `product(ne)` floats out of `data` (honoring the byte strides in
/// `nb`) into an owned buffer; the caller may free or overwrite the source
/// as soon as the call returns. Invalid arguments are rejected without
/// touching the store.
///
/// - `name` is the tensor name, a NUL-terminated string
/// - `data` points to the f32 elements laid out as `ne`/`nb` describe
/// - `ne` is the 4 extents, `nb` the 4 byte strides (unused axes: size 1)
///
/// # Safety
/// `name` must be a valid NUL-terminated C string. `ne` and `nb` must each
/// point to 4 values. `data` must be readable for the full extent the
/// strides describe.
#[no_mangle]
pub unsafe extern "C" fn tensortap_add_element(
    name: *const c_char,
    data: *const f32,
    ne: *const [i64; 4],
    nb: *const [u64; 4],
) {
    if name.is_null() || data.is_null() || ne.is_null() || nb.is_null() {
        fail("add_element", &Error::InvalidArgument("null pointer".into()));
        return;
    }
    let name = match str_arg("add_element", name) {
        Some(s) => s,
        None => return,
    };
    let ne = *ne;
    let nb = *nb;
    if let Err(e) = tensor::validate_shape(&ne) {
        fail("add_element", &e);
        return;
    }
    if let Err(e) = tensor::validate_strides(&nb) {
        fail("add_element", &e);
        return;
    }

    let span = tensor::source_span_bytes(&ne, &nb);
    let src = slice::from_raw_parts(data, (span / ELEM_SIZE) as usize);

    let mut store = STORE.lock().unwrap();
    match store.capture(&name, src, ne, nb) {
        Ok(()) => log::debug!("captured tensor {:?} shape {:?}", name, ne),
        Err(e) => fail("add_element", &e),
    }
}

/// Save every captured tensor to a file, overwriting it.
///
/// # Safety
/// `path` must be a valid NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn tensortap_save_elements(path: *const c_char) {
    let path = match str_arg("save_elements", path) {
        Some(p) => p,
        None => return,
    };
    let store = STORE.lock().unwrap();
    match store.save(Path::new(&path)) {
        Ok(()) => log::info!("saved {} tensor(s) to {}", store.len(), path),
        Err(e) => fail("save_elements", &e),
    }
}

/// Replace the store's contents with the tensors from a previously saved
/// file. The store is left untouched if the file cannot be read or parsed.
///
/// # Safety
/// `path` must be a valid NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn tensortap_load_elements(path: *const c_char) {
    let path = match str_arg("load_elements", path) {
        Some(p) => p,
        None => return,
    };
    let mut store = STORE.lock().unwrap();
    match store.load(Path::new(&path)) {
        Ok(()) => log::info!("loaded {} tensor(s) from {}", store.len(), path),
        Err(e) => fail("load_elements", &e),
    }
}

/// Tag subsequently committed captures with `label` (typically the input
/// token being processed).
///
/// # Safety
/// `label` must be a valid NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn tensortap_set_input_label(label: *const c_char) {
    let label = match str_arg("set_input_label", label) {
        Some(l) => l,
        None => return,
    };
    *INPUT_LABEL.lock().unwrap() = label;
}

/// Move the store's current captures into the session log under the current
/// label, leaving the store empty for the next input. The label is consumed.
#[no_mangle]
pub extern "C" fn tensortap_commit_input() {
    let label = std::mem::take(&mut *INPUT_LABEL.lock().unwrap());
    let mut store = STORE.lock().unwrap();
    SESSIONS.lock().unwrap().commit(label, &mut store);
}

/// Save the session log to a file, overwriting it.
///
/// # Safety
/// `path` must be a valid NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn tensortap_save_sessions(path: *const c_char) {
    let path = match str_arg("save_sessions", path) {
        Some(p) => p,
        None => return,
    };
    let sessions = SESSIONS.lock().unwrap();
    match sessions.save(Path::new(&path)) {
        Ok(()) => log::info!("saved {} session(s) to {}", sessions.len(), path),
        Err(e) => fail("save_sessions", &e),
    }
}

/// Copy the last error message into `buf` (NUL-terminated) and clear it.
///
/// Returns the number of bytes written, excluding the terminator.
///
/// # Safety
/// `buf_ptr` must be valid for writes of `buf_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn tensortap_last_error(buf_ptr: *mut c_char, buf_len: usize) -> usize {
    if buf_ptr.is_null() || buf_len == 0 {
        return 0;
    }

    let error_msg = take_last_error().unwrap_or_else(|| "No error".to_string());
    let bytes = error_msg.as_bytes();
    let copy_len = bytes.len().min(buf_len - 1); // Leave room for null terminator

    std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf_ptr as *mut u8, copy_len);
    *buf_ptr.add(copy_len) = 0; // Null terminator

    copy_len
}

/// Get the library version string.
#[no_mangle]
pub extern "C" fn tensortap_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

/// Clone the current store contents (Rust-side inspection hook, not part of
/// the C surface).
pub fn snapshot() -> Vec<TensorRecord> {
    STORE.lock().unwrap().records().to_vec()
}

/// Clone the current session log contents (Rust-side inspection hook).
pub fn session_snapshot() -> Vec<tensortap_core::Session> {
    SESSIONS.lock().unwrap().sessions().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    // The store is process-global; serialize the tests that touch it.
    static TEST_GUARD: Mutex<()> = Mutex::new(());

    fn add(name: &str, data: &[f32], ne: [i64; 4], nb: [u64; 4]) {
        let name = CString::new(name).unwrap();
        unsafe { tensortap_add_element(name.as_ptr(), data.as_ptr(), &ne, &nb) };
    }

    fn last_error() -> String {
        let mut buf = [0 as c_char; 256];
        let n = unsafe { tensortap_last_error(buf.as_mut_ptr(), buf.len()) };
        let bytes: Vec<u8> = buf[..n].iter().map(|&c| c as u8).collect();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_add_and_clear() {
        let _guard = TEST_GUARD.lock().unwrap();
        tensortap_clear();

        add("weight", &[1.0, 2.0, 3.0, 4.0], [2, 2, 1, 1], [4, 8, 16, 16]);
        let records = snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "weight");
        assert_eq!(records[0].data, vec![1.0, 2.0, 3.0, 4.0]);

        tensortap_clear();
        assert!(snapshot().is_empty());
        tensortap_clear();
        assert!(snapshot().is_empty());
    }

    #[test]
    fn test_null_name_is_rejected_without_mutation() {
        let _guard = TEST_GUARD.lock().unwrap();
        tensortap_clear();

        let data = [1.0f32];
        let ne = [1i64, 1, 1, 1];
        let nb = [4u64, 4, 4, 4];
        unsafe { tensortap_add_element(std::ptr::null(), data.as_ptr(), &ne, &nb) };

        assert!(snapshot().is_empty());
        assert!(last_error().contains("null pointer"));
    }

    #[test]
    fn test_zero_dim_is_rejected_without_mutation() {
        let _guard = TEST_GUARD.lock().unwrap();
        tensortap_clear();

        add("bad", &[1.0, 2.0], [2, 0, 1, 1], [4, 8, 8, 8]);

        assert!(snapshot().is_empty());
        assert!(last_error().contains("dimensions must be positive"));
    }

    #[test]
    fn test_commit_input_snapshots_store() {
        let _guard = TEST_GUARD.lock().unwrap();
        tensortap_clear();
        SESSIONS.lock().unwrap().clear();

        let label = CString::new("tok").unwrap();
        unsafe { tensortap_set_input_label(label.as_ptr()) };
        add("h", &[1.0], [1, 1, 1, 1], [4, 4, 4, 4]);
        tensortap_commit_input();

        assert!(snapshot().is_empty());
        let sessions = session_snapshot();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].label, "tok");
        assert_eq!(sessions[0].records.len(), 1);
    }

    #[test]
    fn test_init_applies_options() {
        let _guard = TEST_GUARD.lock().unwrap();
        tensortap_clear();

        let config = br#"{"max_records": 1}"#;
        let rc = unsafe { tensortap_init(config.as_ptr(), config.len()) };
        assert_eq!(rc, ErrorCode::Ok as u32);

        add("a", &[1.0], [1, 1, 1, 1], [4, 4, 4, 4]);
        add("b", &[2.0], [1, 1, 1, 1], [4, 4, 4, 4]);
        assert_eq!(snapshot().len(), 1);
        assert!(last_error().contains("capture limit"));

        // Restore the unlimited default for other tests.
        let rc = unsafe { tensortap_init(std::ptr::null(), 0) };
        assert_eq!(rc, ErrorCode::Ok as u32);
        tensortap_clear();
    }

    #[test]
    fn test_version() {
        let ver_ptr = tensortap_version();
        assert!(!ver_ptr.is_null());

        let c_str = unsafe { CStr::from_ptr(ver_ptr) };
        let version = c_str.to_str().unwrap();
        assert!(!version.is_empty());
    }
}

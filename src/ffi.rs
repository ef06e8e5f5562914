//! C-compatible FFI API for cross-language bindings.
//!
//! # ABI Contract
//!
//! All exported functions use `extern "C"` calling convention and `#[no_mangle]`
//! to ensure stable symbol names.
//!
//! ## Memory management
//! - Buffers and strings returned by `mdf_*` functions are allocated on the
//!   Rust heap.
//! - Callers **must** free them with `mdf_free_buffer` / `mdf_free_string`.
//! - Passing a null pointer to a free function is a no-op.
//!
//! ## Error handling
//! - Functions that can fail return a `c_int`:
//!   `0` success, `1` null pointer argument, `2` invalid UTF-8,
//!   `3` conversion failed, `4` invalid layout JSON.
//! - Error details can be retrieved via `mdf_last_error`.
//!
//! ## Thread safety
//! - The template registry is built once, on first use, and only read
//!   afterwards; any number of threads may convert at once.
//! - `mdf_last_error` uses a thread-local, so it is safe to call from
//!   multiple threads.
//!
//! ## Usage from Go (cgo)
//! ```go
//! // #cgo LDFLAGS: -lmd_forge
//! // #include "mdforge.h"
//! import "C"
//! ```

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::slice;

use once_cell::sync::Lazy;

use crate::convert::{Converter, OutputFormat};
use crate::error::ConvertError;
use crate::layout_config::LayoutConfig;
use crate::pipeline::{
    compute_layout_config, FixedLayoutRenderer, ForgeRenderer, PageOrientation, PipelineConfig,
};
use crate::render::render_pdf;
use crate::templates::{TemplateRegistry, DEFAULT_TEMPLATE_ID};

static CONVERTER: Lazy<Converter> = Lazy::new(|| Converter::new(TemplateRegistry::builtin()));

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn set_convert_error(e: &ConvertError) {
    log::debug!("conversion failed: {e:?}");
    set_last_error(&e.user_message());
}

// ---------------------------------------------------------------------------
// C-compatible configuration types
// ---------------------------------------------------------------------------

/// Output format selector for [`mdf_convert`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MdfOutputFormat {
    Html = 0,
    Pdf = 1,
}

impl From<MdfOutputFormat> for OutputFormat {
    fn from(f: MdfOutputFormat) -> Self {
        match f {
            MdfOutputFormat::Html => OutputFormat::Html,
            MdfOutputFormat::Pdf => OutputFormat::Pdf,
        }
    }
}

/// Page orientation for use in [`MdfPageConfig`].
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub enum MdfPageOrientation {
    /// Portrait mode: height > width (default).
    Portrait = 0,
    /// Landscape mode: width > height.
    Landscape = 1,
}

/// Optional page setup passed to [`mdf_convert_to_pdf_ex`].
///
/// Fields set to `0` (or `NULL` for `title`) fall back to their defaults:
/// - `page_width`  → 595.28 pt (A4)
/// - `page_height` → 841.89 pt (A4)
/// - `page_margin` → 40 pt
/// - `title`       → the composed document's `<title>`
///
/// A template's `@page` rule still overrides size and margins.
#[repr(C)]
pub struct MdfPageConfig {
    /// Null-terminated UTF-8 document title embedded in PDF metadata.
    pub title: *const c_char,
    /// Page width in points. Pass `0.0` to use the default.
    pub page_width: f32,
    /// Page height in points. Pass `0.0` to use the default.
    pub page_height: f32,
    /// Page margin in points. Pass `0.0` to use the default.
    pub page_margin: f32,
    /// Page orientation (portrait = 0, landscape = 1).
    pub orientation: MdfPageOrientation,
}

/// Convert an `MdfPageConfig` (FFI) to a `PipelineConfig` (Rust).
///
/// # Safety
/// `cfg.title`, if non-null, must point to a valid null-terminated string.
unsafe fn pipeline_config_from_c(cfg: &MdfPageConfig) -> PipelineConfig {
    let defaults = PipelineConfig::default();
    let or_default = |v: f32, d: f32| if v > 0.0 { v } else { d };

    let title = if cfg.title.is_null() {
        None
    } else {
        CStr::from_ptr(cfg.title).to_str().ok().map(str::to_string)
    };

    PipelineConfig {
        title,
        page_width: or_default(cfg.page_width, defaults.page_width),
        page_height: or_default(cfg.page_height, defaults.page_height),
        page_margin: or_default(cfg.page_margin, defaults.page_margin),
        orientation: match cfg.orientation {
            MdfPageOrientation::Portrait => PageOrientation::Portrait,
            MdfPageOrientation::Landscape => PageOrientation::Landscape,
        },
    }
}

// ---------------------------------------------------------------------------
// Argument / result marshalling
// ---------------------------------------------------------------------------

/// # Safety
/// `data` must point to `len` readable bytes, or be null.
unsafe fn input_str<'a>(data: *const u8, len: u32) -> Result<&'a str, c_int> {
    if data.is_null() {
        set_last_error("Null pointer argument");
        return Err(1);
    }
    std::str::from_utf8(slice::from_raw_parts(data, len as usize)).map_err(|e| {
        set_last_error(&format!("Invalid UTF-8: {e}"));
        2
    })
}

/// A null template id selects the default template.
///
/// # Safety
/// `id`, if non-null, must be a valid null-terminated string.
unsafe fn template_id<'a>(id: *const c_char) -> Result<&'a str, c_int> {
    if id.is_null() {
        return Ok(DEFAULT_TEMPLATE_ID);
    }
    CStr::from_ptr(id).to_str().map_err(|e| {
        set_last_error(&format!("Invalid UTF-8 in template id: {e}"));
        2
    })
}

/// # Safety
/// `out_buf` and `out_len` must be valid for writes.
unsafe fn write_buffer(bytes: Vec<u8>, out_buf: *mut *mut u8, out_len: *mut u32) {
    let len = bytes.len() as u32;
    let buf = bytes.into_boxed_slice();
    *out_buf = Box::into_raw(buf) as *mut u8;
    *out_len = len;
}

/// # Safety
/// `out` must be valid for writes.
unsafe fn write_string(s: String, out: *mut *mut c_char) -> c_int {
    match CString::new(s) {
        Ok(cs) => {
            *out = cs.into_raw();
            0
        }
        Err(_) => {
            set_last_error("Output contained a null byte");
            3
        }
    }
}

// ---------------------------------------------------------------------------
// Core API
// ---------------------------------------------------------------------------

/// Convert Markdown to a standalone HTML document.
///
/// # Parameters
/// - `md_ptr`, `md_len`: UTF-8 Markdown (not necessarily null-terminated)
/// - `template_id`: null-terminated template id, or `NULL` for the default;
///   unknown ids fall back to the default template
/// - `out_html`: receives a null-terminated HTML string
///
/// # Safety
/// - `md_ptr` must point to `md_len` valid bytes.
/// - `out_html` must be a valid pointer.
/// - The caller must free `*out_html` with `mdf_free_string`.
#[no_mangle]
pub unsafe extern "C" fn mdf_convert_to_html(
    md_ptr: *const u8,
    md_len: u32,
    template_id_ptr: *const c_char,
    out_html: *mut *mut c_char,
) -> c_int {
    if out_html.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }
    let (markdown, template) = match (input_str(md_ptr, md_len), template_id(template_id_ptr)) {
        (Ok(m), Ok(t)) => (m, t),
        (Err(code), _) | (_, Err(code)) => return code,
    };
    let document = CONVERTER.convert_to_html(markdown, template);
    write_string(document.into_string(), out_html)
}

/// Convert Markdown to PDF bytes with the default page setup.
///
/// # Returns
/// `0` on success, non-zero on error. On error, call `mdf_last_error`.
///
/// # Safety
/// - `md_ptr` must point to `md_len` valid bytes.
/// - `out_buf` and `out_len` must be valid pointers.
/// - The caller must free `*out_buf` by calling `mdf_free_buffer`.
#[no_mangle]
pub unsafe extern "C" fn mdf_convert_to_pdf(
    md_ptr: *const u8,
    md_len: u32,
    template_id_ptr: *const c_char,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    mdf_convert(md_ptr, md_len, template_id_ptr, MdfOutputFormat::Pdf, out_buf, out_len)
}

/// Convert Markdown to the requested format. HTML output is returned as
/// UTF-8 bytes (no terminator).
///
/// # Safety
/// Same as `mdf_convert_to_pdf`.
#[no_mangle]
pub unsafe extern "C" fn mdf_convert(
    md_ptr: *const u8,
    md_len: u32,
    template_id_ptr: *const c_char,
    format: MdfOutputFormat,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    if out_buf.is_null() || out_len.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }
    let (markdown, template) = match (input_str(md_ptr, md_len), template_id(template_id_ptr)) {
        (Ok(m), Ok(t)) => (m, t),
        (Err(code), _) | (_, Err(code)) => return code,
    };
    match CONVERTER.convert(markdown, template, format.into()) {
        Ok(output) => {
            write_buffer(output.into_bytes(), out_buf, out_len);
            0
        }
        Err(e) => {
            set_convert_error(&e);
            3
        }
    }
}

/// Convert Markdown to PDF with a custom [`MdfPageConfig`].
///
/// # Safety
/// - Same as `mdf_convert_to_pdf`.
/// - `cfg`, if non-null, must point to a fully initialised
///   [`MdfPageConfig`]; pass `NULL` for defaults.
#[no_mangle]
pub unsafe extern "C" fn mdf_convert_to_pdf_ex(
    md_ptr: *const u8,
    md_len: u32,
    template_id_ptr: *const c_char,
    cfg: *const MdfPageConfig,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    if out_buf.is_null() || out_len.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }
    let (markdown, template) = match (input_str(md_ptr, md_len), template_id(template_id_ptr)) {
        (Ok(m), Ok(t)) => (m, t),
        (Err(code), _) | (_, Err(code)) => return code,
    };
    let config = if cfg.is_null() {
        PipelineConfig::default()
    } else {
        pipeline_config_from_c(&*cfg)
    };

    let document = CONVERTER.convert_to_html(markdown, template);
    match ForgeRenderer::new(config).render(document.as_str()) {
        Ok(bytes) => {
            write_buffer(bytes, out_buf, out_len);
            0
        }
        Err(e) => {
            set_convert_error(&e.into());
            3
        }
    }
}

/// List the registered templates as a JSON array of
/// `{"id", "displayName", "description"}` objects.
///
/// # Safety
/// `out_json` must be a valid pointer; free `*out_json` with
/// `mdf_free_string`.
#[no_mangle]
pub unsafe extern "C" fn mdf_list_templates(out_json: *mut *mut c_char) -> c_int {
    if out_json.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }
    match serde_json::to_string(&CONVERTER.list_templates()) {
        Ok(json) => write_string(json, out_json),
        Err(e) => {
            set_last_error(&format!("Could not serialise template list: {e}"));
            3
        }
    }
}

/// Convert Markdown to HTML and compute its page layout (no PDF
/// rendering). Returns the layout as JSON, suitable for
/// [`mdf_render_from_layout`].
///
/// # Safety
/// Same as `mdf_convert_to_html`.
#[no_mangle]
pub unsafe extern "C" fn mdf_compute_layout(
    md_ptr: *const u8,
    md_len: u32,
    template_id_ptr: *const c_char,
    out_json: *mut *mut c_char,
) -> c_int {
    if out_json.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }
    let (markdown, template) = match (input_str(md_ptr, md_len), template_id(template_id_ptr)) {
        (Ok(m), Ok(t)) => (m, t),
        (Err(code), _) | (_, Err(code)) => return code,
    };
    let document = CONVERTER.convert_to_html(markdown, template);
    match compute_layout_config(document.as_str(), &PipelineConfig::default()) {
        Ok(layout) => write_string(layout.to_json(), out_json),
        Err(e) => {
            set_convert_error(&e.into());
            3
        }
    }
}

/// Render a PDF from a layout config JSON string.
///
/// This allows pre-computing the layout and rendering separately.
///
/// # Safety
/// `json_ptr` must be a valid null-terminated string; `out_buf` and
/// `out_len` must be valid pointers.
#[no_mangle]
pub unsafe extern "C" fn mdf_render_from_layout(
    json_ptr: *const c_char,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    if json_ptr.is_null() || out_buf.is_null() || out_len.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }

    let json = match CStr::from_ptr(json_ptr).to_str() {
        Ok(s) => s,
        Err(e) => {
            set_last_error(&format!("Invalid UTF-8 in JSON: {e}"));
            return 2;
        }
    };
    let layout_config = match LayoutConfig::from_json(json) {
        Ok(c) => c,
        Err(e) => {
            set_last_error(&format!("Invalid layout JSON: {e}"));
            return 4;
        }
    };

    match render_pdf(&layout_config) {
        Ok(pdf_bytes) => {
            write_buffer(pdf_bytes, out_buf, out_len);
            0
        }
        Err(e) => {
            set_convert_error(&e.into());
            3
        }
    }
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free a buffer returned by `mdf_convert`, `mdf_convert_to_pdf` and friends.
///
/// # Safety
/// `buf` must have been returned by one of those calls, and `len` must be
/// the corresponding length.
#[no_mangle]
pub unsafe extern "C" fn mdf_free_buffer(buf: *mut u8, len: u32) {
    if !buf.is_null() {
        let _ = Box::from_raw(slice::from_raw_parts_mut(buf, len as usize));
    }
}

/// Free a string returned by an `mdf_*` function (HTML, JSON).
///
/// # Safety
/// `s` must have been returned by Rust's `CString::into_raw`.
#[no_mangle]
pub unsafe extern "C" fn mdf_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

/// Retrieve the last error message. Returns a null-terminated string.
///
/// The returned pointer is valid until the next `mdf_*` call on the same
/// thread. The caller should **not** free this pointer.
///
/// Returns null if no error has occurred.
#[no_mangle]
pub extern "C" fn mdf_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cs) => cs.as_ptr(),
        None => ptr::null(),
    })
}

/// Return the library version as a null-terminated string.
/// The caller must **not** free this pointer.
#[no_mangle]
pub extern "C" fn mdf_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn take_string(p: *mut c_char) -> String {
        let s = unsafe { CStr::from_ptr(p) }.to_str().unwrap().to_string();
        unsafe { mdf_free_string(p) };
        s
    }

    #[test]
    fn ffi_convert_to_pdf() {
        let md = b"# Hello FFI\n\nBody text.";
        let id = CString::new("classic").unwrap();
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            mdf_convert_to_pdf(md.as_ptr(), md.len() as u32, id.as_ptr(), &mut out_buf, &mut out_len)
        };

        assert_eq!(rc, 0, "Expected success");
        assert!(!out_buf.is_null());
        let bytes = unsafe { slice::from_raw_parts(out_buf, out_len as usize) };
        assert_eq!(&bytes[0..5], b"%PDF-");
        unsafe { mdf_free_buffer(out_buf, out_len) };
    }

    #[test]
    fn ffi_convert_to_html_with_default_template() {
        let md = b"# Hi";
        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe { mdf_convert_to_html(md.as_ptr(), md.len() as u32, ptr::null(), &mut out) };
        assert_eq!(rc, 0);
        let html = take_string(out);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h1 id=\"hi\">Hi</h1>"));
    }

    #[test]
    fn ffi_convert_html_bytes() {
        let md = b"text";
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;
        let rc = unsafe {
            mdf_convert(
                md.as_ptr(),
                md.len() as u32,
                ptr::null(),
                MdfOutputFormat::Html,
                &mut out_buf,
                &mut out_len,
            )
        };
        assert_eq!(rc, 0);
        let bytes = unsafe { slice::from_raw_parts(out_buf, out_len as usize) };
        assert!(std::str::from_utf8(bytes).unwrap().contains("<p>text</p>"));
        unsafe { mdf_free_buffer(out_buf, out_len) };
    }

    #[test]
    fn ffi_list_templates() {
        let mut out: *mut c_char = ptr::null_mut();
        assert_eq!(unsafe { mdf_list_templates(&mut out) }, 0);
        let json = take_string(out);
        assert!(json.contains("\"displayName\":\"Modern\""));
    }

    #[test]
    fn ffi_layout_round_trip() {
        let md = b"# Layout\n\n- a\n- b";
        let mut json_ptr: *mut c_char = ptr::null_mut();
        let rc = unsafe { mdf_compute_layout(md.as_ptr(), md.len() as u32, ptr::null(), &mut json_ptr) };
        assert_eq!(rc, 0);
        assert!(!json_ptr.is_null());

        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;
        let rc = unsafe { mdf_render_from_layout(json_ptr, &mut out_buf, &mut out_len) };
        assert_eq!(rc, 0);
        let json = take_string(json_ptr);
        assert!(json.contains("page_width_pt"));
        unsafe { mdf_free_buffer(out_buf, out_len) };
    }

    #[test]
    fn ffi_bad_layout_json() {
        let json = CString::new("{not json").unwrap();
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;
        let rc = unsafe { mdf_render_from_layout(json.as_ptr(), &mut out_buf, &mut out_len) };
        assert_eq!(rc, 4);
        let msg = unsafe { CStr::from_ptr(mdf_last_error()) }.to_str().unwrap();
        assert!(msg.starts_with("Invalid layout JSON"));
    }

    #[test]
    fn ffi_null_input() {
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;
        let rc = unsafe { mdf_convert_to_pdf(ptr::null(), 0, ptr::null(), &mut out_buf, &mut out_len) };
        assert_eq!(rc, 1, "Should fail on null input");
    }

    #[test]
    fn ffi_invalid_utf8() {
        let md = [0xffu8, 0xfe];
        let mut out: *mut c_char = ptr::null_mut();
        let rc = unsafe { mdf_convert_to_html(md.as_ptr(), 2, ptr::null(), &mut out) };
        assert_eq!(rc, 2);
    }

    #[test]
    fn ffi_version() {
        let version = unsafe { CStr::from_ptr(mdf_version()) }.to_str().unwrap();
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn ffi_convert_to_pdf_ex_custom_config() {
        let md = b"# Landscape";
        let title = CString::new("My Custom Title").unwrap();
        let cfg = MdfPageConfig {
            title: title.as_ptr(),
            page_width: 0.0,
            page_height: 0.0,
            page_margin: 20.0,
            orientation: MdfPageOrientation::Landscape,
        };
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;
        let rc = unsafe {
            mdf_convert_to_pdf_ex(
                md.as_ptr(),
                md.len() as u32,
                ptr::null(),
                &cfg,
                &mut out_buf,
                &mut out_len,
            )
        };
        assert_eq!(rc, 0, "Expected success");
        let bytes = unsafe { slice::from_raw_parts(out_buf, out_len as usize) };
        assert_eq!(&bytes[0..5], b"%PDF-");
        unsafe { mdf_free_buffer(out_buf, out_len) };
    }

    #[test]
    fn page_config_zeroes_use_defaults() {
        let cfg = MdfPageConfig {
            title: ptr::null(),
            page_width: 0.0,
            page_height: 0.0,
            page_margin: 0.0,
            orientation: MdfPageOrientation::Portrait,
        };
        let config = unsafe { pipeline_config_from_c(&cfg) };
        assert_eq!(config.title, None);
        assert_eq!(config.page_width, 595.28);
        assert_eq!(config.page_margin, 40.0);
    }
}

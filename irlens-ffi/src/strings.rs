//! Owned strings
//!
//! Strings handed to the caller are allocated here and must come back through
//! `irlens_dispose_string` exactly once. The allocation carries its length in
//! a header word in front of the bytes, so byte strings with embedded NULs
//! can be released without the caller passing a length back. A NUL is always
//! appended after the bytes.

use log::warn;
use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::ffi::c_char;
use std::mem::{align_of, size_of};
use std::ptr;

const HEADER: usize = size_of::<usize>();

fn layout_for(len: usize) -> Option<Layout> {
    let size = HEADER.checked_add(len)?.checked_add(1)?;
    Layout::from_size_align(size, align_of::<usize>()).ok()
}

/// Copy `bytes` into a new owned string; null only if the length is absurd
pub fn create_byte_string(bytes: &[u8]) -> *const c_char {
    let Some(layout) = layout_for(bytes.len()) else {
        warn!("refusing to allocate a {} byte string", bytes.len());
        return ptr::null();
    };
    // SAFETY: the layout is non-zero sized and the writes stay inside it.
    unsafe {
        let base = alloc(layout);
        if base.is_null() {
            handle_alloc_error(layout);
        }
        (base as *mut usize).write(bytes.len());
        let data = base.add(HEADER);
        ptr::copy_nonoverlapping(bytes.as_ptr(), data, bytes.len());
        data.add(bytes.len()).write(0);
        data as *const c_char
    }
}

pub fn create_string(s: &str) -> *const c_char {
    create_byte_string(s.as_bytes())
}

/// Release a string returned by any entry point of this library
#[unsafe(no_mangle)]
pub extern "C" fn irlens_dispose_string(s: *const c_char) {
    if s.is_null() {
        return;
    }
    // SAFETY: `s` came from `create_byte_string`, so the length header sits
    // right before it and the layout is reproducible.
    unsafe {
        let base = (s as *mut u8).sub(HEADER);
        let len = (base as *const usize).read();
        if let Some(layout) = layout_for(len) {
            dealloc(base, layout);
        }
    }
}

//! Data layout entry points
//!
//! Sizes, alignments and offsets come back as `long long` byte counts, with
//! -1 when the question does not apply to the type.

use irlens_ir::{DataLayout, IrType};
use log::{debug, warn};
use std::ffi::{c_char, c_int, c_longlong, CStr};
use std::ptr;

use crate::handle::{type_ref, TargetDataRef, TypeRef};
use crate::strings::create_string;

/// A byte count as `long long`; -1 when absent or not representable
fn to_sentinel(bytes: Option<u64>) -> c_longlong {
    bytes.and_then(|b| c_longlong::try_from(b).ok()).unwrap_or(-1)
}

/// # Safety
/// Non-null handles must be live.
unsafe fn with_layout(
    td: TargetDataRef,
    ty: TypeRef,
    f: impl FnOnce(&DataLayout, &IrType) -> Option<u64>,
) -> c_longlong {
    // SAFETY: forwarded from the caller.
    match unsafe { (td.as_ref(), type_ref(ty)) } {
        (Some(layout), Some(ty)) => to_sentinel(f(layout, ty)),
        _ => -1,
    }
}

/// Parse a layout string; null when it is malformed
#[unsafe(no_mangle)]
pub extern "C" fn irlens_create_target_data(rep: *const c_char) -> TargetDataRef {
    if rep.is_null() {
        return ptr::null_mut();
    }
    // SAFETY: a non-null rep is NUL-terminated by contract.
    let rep = unsafe { CStr::from_ptr(rep) }.to_string_lossy();
    match DataLayout::parse(&rep) {
        Ok(layout) => Box::into_raw(Box::new(layout)),
        Err(err) => {
            warn!("{err}");
            ptr::null_mut()
        }
    }
}

/// Layout string into `out`; release with `irlens_dispose_string`
#[unsafe(no_mangle)]
pub extern "C" fn irlens_copy_string_rep_of_target_data(
    td: TargetDataRef,
    out: *mut *const c_char,
) {
    // SAFETY: non-null pointers are live by contract.
    let rep = unsafe { td.as_ref() }.map_or("", |layout| layout.string_rep());
    if let Some(slot) = unsafe { out.as_mut() } {
        *slot = create_string(rep);
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_dispose_target_data(td: TargetDataRef) {
    if td.is_null() {
        return;
    }
    // SAFETY: `td` came from `irlens_create_target_data` and is disposed once.
    drop(unsafe { Box::from_raw(td) });
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_abi_size_of_type(td: TargetDataRef, ty: TypeRef) -> c_longlong {
    unsafe { with_layout(td, ty, |layout, ty| layout.abi_size_of(ty)) }
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_abi_alignment_of_type(td: TargetDataRef, ty: TypeRef) -> c_longlong {
    unsafe { with_layout(td, ty, |layout, ty| layout.abi_alignment_of(ty)) }
}

/// Byte offset of struct field `element`; -1 for non-structs or a bad index
#[unsafe(no_mangle)]
pub extern "C" fn irlens_offset_of_element(
    td: TargetDataRef,
    ty: TypeRef,
    element: c_int,
) -> c_longlong {
    let Ok(index) = usize::try_from(element) else {
        debug!("negative element index {element}");
        return -1;
    };
    unsafe { with_layout(td, ty, |layout, ty| layout.offset_of_element(ty, index)) }
}

/// Size of the element type of an array or vector
#[unsafe(no_mangle)]
pub extern "C" fn irlens_abi_size_of_element_type(td: TargetDataRef, ty: TypeRef) -> c_longlong {
    unsafe { with_layout(td, ty, |layout, ty| layout.abi_size_of(ty.element_type()?)) }
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_abi_alignment_of_element_type(
    td: TargetDataRef,
    ty: TypeRef,
) -> c_longlong {
    unsafe { with_layout(td, ty, |layout, ty| layout.abi_alignment_of(ty.element_type()?)) }
}

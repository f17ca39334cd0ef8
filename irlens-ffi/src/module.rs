//! Module lookups and printing

use irlens_ir::AsmWriter;
use std::ffi::{c_char, CStr};
use std::ptr;

use crate::handle::{module_ref, ModuleRef, ValueRef};
use crate::strings::create_string;

/// Borrowed module name, valid until the module is renamed
#[unsafe(no_mangle)]
pub extern "C" fn irlens_get_module_name(module: ModuleRef) -> *const c_char {
    // SAFETY: a non-null handle is a live module by contract.
    match unsafe { module_ref(module) } {
        Some(module) => module.name_cstr().as_ptr(),
        None => c"".as_ptr(),
    }
}

/// # Safety
/// `name` must be null or NUL-terminated.
unsafe fn lookup(
    module: ModuleRef,
    name: *const c_char,
    find: impl FnOnce(&irlens_ir::Module, &str) -> Option<irlens_common::ValueId>,
) -> ValueRef {
    // SAFETY: forwarded from the caller.
    let (Some(module), false) = (unsafe { module_ref(module) }, name.is_null()) else {
        return ptr::null();
    };
    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy();
    find(module, &name).map_or(ptr::null(), |id| module.value_ptr(id))
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_module_get_named_function(
    module: ModuleRef,
    name: *const c_char,
) -> ValueRef {
    // SAFETY: `name` is a C string by contract.
    unsafe { lookup(module, name, |m, n| m.get_function(n)) }
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_module_get_named_global(
    module: ModuleRef,
    name: *const c_char,
) -> ValueRef {
    // SAFETY: `name` is a C string by contract.
    unsafe { lookup(module, name, |m, n| m.get_global(n)) }
}

/// Whole module as text into `out`; release with `irlens_dispose_string`
#[unsafe(no_mangle)]
pub extern "C" fn irlens_print_module_to_string(module: ModuleRef, out: *mut *const c_char) {
    // SAFETY: a non-null handle is a live module by contract.
    let text = match unsafe { module_ref(module) } {
        Some(module) => {
            let mut text = String::new();
            match AsmWriter::new(module).write_module(&mut text) {
                Ok(()) => text,
                Err(_) => String::new(),
            }
        }
        None => String::new(),
    };
    // SAFETY: a non-null out-pointer is writable by contract.
    if let Some(slot) = unsafe { out.as_mut() } {
        *slot = create_string(&text);
    }
}

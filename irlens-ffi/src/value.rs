//! Value and constant introspection
//!
//! Each accessor narrows the handle to the one kind it understands and
//! otherwise returns its documented sentinel:
//!
//! | accessor                       | sentinel                        |
//! |--------------------------------|---------------------------------|
//! | constant int raw words         | null (flag still written)       |
//! | constant int word count        | 0                               |
//! | constant fp value              | NaN, loses info set             |
//! | constant data as string        | null, length 0                  |
//! | sequence element / count       | null / 0                        |
//! | initializer                    | null                            |
//! | constant expr as instruction   | null                            |
//! | type of memory                 | null                            |
//! | opcode name                    | empty string                    |
//! | linkage, visibility, storage   | 0 on non-globals                |

use irlens_common::{DllStorageClass, Linkage, Visibility};
use irlens_ir::{AsmWriter, Value};
use log::{debug, warn};
use std::ffi::{c_char, c_int, c_uint, CStr};
use std::ptr;

use crate::handle::{type_ref, value_ref, wrap, wrap_opt, ModuleRef, TypeRef, ValueRef};
use crate::strings::{create_byte_string, create_string};

/// Write through an optional out-pointer
fn store<T>(out: *mut T, value: T) {
    // SAFETY: a non-null out-pointer is writable by contract.
    if let Some(slot) = unsafe { out.as_mut() } {
        *slot = value;
    }
}

fn with_value<T>(value: ValueRef, sentinel: T, f: impl FnOnce(&Value) -> T) -> T {
    // SAFETY: a non-null handle is a live node by contract.
    match unsafe { value_ref(value) } {
        Some(value) => f(value),
        None => sentinel,
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_is_constant(value: ValueRef) -> bool {
    with_value(value, false, Value::is_constant)
}

/// Words of an integer constant, least significant first, in host byte order
///
/// `little_endian` receives the host byte order whether or not `value` is an
/// integer constant. The words live as long as the constant.
#[unsafe(no_mangle)]
pub extern "C" fn irlens_get_constant_int_raw_value(
    value: ValueRef,
    little_endian: *mut bool,
) -> *const u64 {
    store(little_endian, cfg!(target_endian = "little"));
    with_value(value, ptr::null(), |v| match v.as_constant_int() {
        Some(int) => int.raw_data().as_ptr(),
        None => {
            debug!("%{} is not an integer constant", v.id());
            ptr::null()
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_get_constant_int_num_words(value: ValueRef) -> c_uint {
    with_value(value, 0, |v| v.as_constant_int().map_or(0, |int| int.num_words() as c_uint))
}

/// Value of a floating point constant as a double
///
/// An integer constant converts as signed. Anything else yields NaN. In
/// every case `loses_info` is set when the result is not exact.
#[unsafe(no_mangle)]
pub extern "C" fn irlens_get_constant_fp_value(value: ValueRef, loses_info: *mut bool) -> f64 {
    let (result, lossy) = with_value(value, (f64::NAN, true), |v| {
        if let Some(float) = v.as_constant_fp() {
            float.to_f64()
        } else if let Some(int) = v.as_constant_int() {
            let (converted, exact) = int.to_f64_signed();
            (converted, !exact)
        } else {
            debug!("%{} is not a floating point constant", v.id());
            (f64::NAN, true)
        }
    });
    store(loses_info, lossy);
    result
}

/// Bytes of a string constant as an owned string, length through `out_len`
///
/// Embedded NULs are preserved; release with `irlens_dispose_string`.
#[unsafe(no_mangle)]
pub extern "C" fn irlens_get_constant_data_as_string(
    value: ValueRef,
    out_len: *mut usize,
) -> *const c_char {
    let (string, len) = with_value(value, (ptr::null(), 0), |v| {
        match v.as_constant_data().and_then(|d| d.as_string()) {
            Some(bytes) => (create_byte_string(bytes), bytes.len()),
            None => {
                debug!("%{} is not a string constant", v.id());
                (ptr::null(), 0)
            }
        }
    });
    store(out_len, len);
    string
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_get_constant_sequence_element(value: ValueRef, index: c_uint) -> ValueRef {
    with_value(value, ptr::null(), |v| {
        let element = v.as_constant_data().and_then(|d| d.element(index as usize));
        wrap_opt(v, element)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_get_constant_sequence_num_elements(value: ValueRef) -> usize {
    with_value(value, 0, |v| v.as_constant_data().map_or(0, |d| d.num_elements()))
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_get_initializer(value: ValueRef) -> ValueRef {
    with_value(value, ptr::null(), |v| {
        wrap_opt(v, v.as_global_variable().and_then(|g| g.initializer()))
    })
}

/// New detached instruction computing the constant expression; the caller owns placing it
#[unsafe(no_mangle)]
pub extern "C" fn irlens_constant_expr_as_instruction(value: ValueRef) -> ValueRef {
    with_value(value, ptr::null(), |v| {
        wrap_opt(v, v.module().constant_expr_as_instruction(v.id()))
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_get_value_kind(value: ValueRef) -> c_int {
    with_value(value, -1, |v| v.kind().as_raw())
}

/// Textual form of a value into `out`; release with `irlens_dispose_string`
#[unsafe(no_mangle)]
pub extern "C" fn irlens_print_value_to_string(value: ValueRef, out: *mut *const c_char) {
    let text = with_value(value, String::new(), |v| {
        let mut text = String::new();
        match AsmWriter::new(v.module()).write_value(&mut text, v) {
            Ok(()) => text,
            Err(_) => String::new(),
        }
    });
    store(out, create_string(&text));
}

/// Borrowed name of a value, valid until the value is renamed
#[unsafe(no_mangle)]
pub extern "C" fn irlens_get_value_name(value: ValueRef) -> *const c_char {
    with_value(value, c"".as_ptr(), |v| v.name_cstr().as_ptr())
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_set_value_name(value: ValueRef, name: *const c_char) {
    if name.is_null() {
        return;
    }
    // SAFETY: a non-null name is a NUL-terminated string by contract.
    let name = unsafe { CStr::from_ptr(name) };
    with_value(value, (), |v| v.set_name(&name.to_string_lossy()));
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_get_global_parent(value: ValueRef) -> ModuleRef {
    with_value(value, ptr::null(), |v| v.module() as ModuleRef)
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_get_linkage(value: ValueRef) -> c_int {
    with_value(value, 0, |v| v.global_attrs().map_or(0, |a| a.linkage().as_raw()))
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_set_linkage(value: ValueRef, linkage: c_int) {
    with_value(value, (), |v| match (v.global_attrs(), Linkage::from_raw(linkage)) {
        (Some(attrs), Some(linkage)) => attrs.set_linkage(linkage),
        (Some(_), None) => warn!("ignoring unknown linkage {linkage} for %{}", v.id()),
        (None, _) => debug!("%{} has no linkage", v.id()),
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_get_visibility(value: ValueRef) -> c_int {
    with_value(value, 0, |v| v.global_attrs().map_or(0, |a| a.visibility().as_raw()))
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_set_visibility(value: ValueRef, visibility: c_int) {
    with_value(value, (), |v| match (v.global_attrs(), Visibility::from_raw(visibility)) {
        (Some(attrs), Some(visibility)) => attrs.set_visibility(visibility),
        (Some(_), None) => warn!("ignoring unknown visibility {visibility} for %{}", v.id()),
        (None, _) => debug!("%{} has no visibility", v.id()),
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_get_dll_storage_class(value: ValueRef) -> c_int {
    with_value(value, 0, |v| v.global_attrs().map_or(0, |a| a.dll_storage_class().as_raw()))
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_set_dll_storage_class(value: ValueRef, class: c_int) {
    with_value(value, (), |v| match (v.global_attrs(), DllStorageClass::from_raw(class)) {
        (Some(attrs), Some(class)) => attrs.set_dll_storage_class(class),
        (Some(_), None) => warn!("ignoring unknown DLL storage class {class} for %{}", v.id()),
        (None, _) => debug!("%{} has no DLL storage class", v.id()),
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_is_declaration(value: ValueRef) -> c_int {
    with_value(value, 0, |v| v.is_declaration() as c_int)
}

/// Opcode name as an owned string; empty for anything that is not an instruction
#[unsafe(no_mangle)]
pub extern "C" fn irlens_get_opcode_name(value: ValueRef) -> *const c_char {
    let name = with_value(value, "", |v| v.opcode().map_or("", |op| op.name()));
    create_string(name)
}

/// Type of the memory a load, store, GEP or alloca touches
#[unsafe(no_mangle)]
pub extern "C" fn irlens_type_of_memory(value: ValueRef) -> TypeRef {
    with_value(value, ptr::null(), |v| {
        v.type_of_memory().map_or(ptr::null(), |ty| ty as TypeRef)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn irlens_type_of(value: ValueRef) -> TypeRef {
    with_value(value, ptr::null(), |v| v.ty() as TypeRef)
}

/// Textual form of a type as an owned string
#[unsafe(no_mangle)]
pub extern "C" fn irlens_print_type_to_string(ty: TypeRef) -> *const c_char {
    // SAFETY: a non-null type handle points at a live type by contract.
    match unsafe { type_ref(ty) } {
        Some(ty) => create_string(&ty.to_string()),
        None => create_string(""),
    }
}

/// Owning function of an argument, block or attached instruction
#[unsafe(no_mangle)]
pub extern "C" fn irlens_get_parent_function(value: ValueRef) -> ValueRef {
    with_value(value, ptr::null(), |v| v.parent_function().map_or(ptr::null(), |f| wrap(v, f)))
}

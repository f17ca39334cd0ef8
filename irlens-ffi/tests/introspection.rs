use irlens_common::{DllStorageClass, Linkage, ValueKind, Visibility};
use irlens_ffi::module::*;
use irlens_ffi::strings::irlens_dispose_string;
use irlens_ffi::value::*;
use irlens_ir::{ApFloat, FloatSemantics, IrBuilder, IrType, Module, Opcode};
use pretty_assertions::assert_eq;
use std::ffi::{c_char, CStr};
use std::ptr;

/// Copy and release an owned string
fn take_string(raw: *const c_char) -> String {
    assert!(!raw.is_null());
    let s = unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned();
    irlens_dispose_string(raw);
    s
}

#[test]
fn test_int_raw_words_round_trip() {
    let module = Module::new("m");
    let big = module
        .const_int_from_str(&IrType::I128, "18446744073709551621", 10)
        .unwrap();
    let handle = module.value_ptr(big);

    assert_eq!(irlens_get_constant_int_num_words(handle), 2);
    let mut little_endian = false;
    let words = irlens_get_constant_int_raw_value(handle, &mut little_endian);
    assert_eq!(little_endian, cfg!(target_endian = "little"));
    let words = unsafe { std::slice::from_raw_parts(words, 2) };
    // Word order is least significant first regardless of the byte order flag
    let value = (words[1] as u128) << 64 | words[0] as u128;
    assert_eq!(value.to_string(), "18446744073709551621");
}

#[test]
fn test_int_accessors_on_other_kinds() {
    let module = Module::new("m");
    let half = module.const_real(&IrType::Float, 0.5).unwrap();
    let mut flag = false;
    assert!(irlens_get_constant_int_raw_value(module.value_ptr(half), &mut flag).is_null());
    assert_eq!(irlens_get_constant_int_num_words(module.value_ptr(half)), 0);
}

#[test]
fn test_fp_values() {
    let module = Module::new("m");
    let exact = module.const_real(&IrType::Double, 2.75).unwrap();
    let mut loses_info = true;
    assert_eq!(irlens_get_constant_fp_value(module.value_ptr(exact), &mut loses_info), 2.75);
    assert!(!loses_info);

    // 1 + 2^-60 needs 61 significant bits: fits x87, not a double
    let (wide, inexact) =
        ApFloat::from_parts(FloatSemantics::X87DoubleExtended, false, (1u128 << 60) + 1, -60);
    assert!(!inexact);
    let wide = module.const_float(&IrType::X86Fp80, wide).unwrap();
    assert_eq!(irlens_get_constant_fp_value(module.value_ptr(wide), &mut loses_info), 1.0);
    assert!(loses_info);

    // NaN payloads survive
    let signaling = module
        .const_real(&IrType::Double, f64::from_bits(0x7FF0_0000_0000_0001))
        .unwrap();
    let value = irlens_get_constant_fp_value(module.value_ptr(signaling), &mut loses_info);
    assert_eq!(value.to_bits(), 0x7FF0_0000_0000_0001);
    assert!(!loses_info);

    let int = module.const_int(&IrType::I32, (-3i64) as u64, true).unwrap();
    assert_eq!(irlens_get_constant_fp_value(module.value_ptr(int), &mut loses_info), -3.0);
    assert!(!loses_info);

    let null = module.const_null(&IrType::Ptr).unwrap();
    assert!(irlens_get_constant_fp_value(module.value_ptr(null), &mut loses_info).is_nan());
    assert!(loses_info);
    // The out-pointer is optional
    assert_eq!(irlens_get_constant_fp_value(module.value_ptr(exact), ptr::null_mut()), 2.75);
}

#[test]
fn test_constant_data_string() {
    let module = Module::new("m");
    let s = module.const_string(b"hi\0there", false).unwrap();
    let mut len = 0usize;
    let raw = irlens_get_constant_data_as_string(module.value_ptr(s), &mut len);
    assert_eq!(len, 8);
    let bytes = unsafe { std::slice::from_raw_parts(raw as *const u8, len) }.to_vec();
    irlens_dispose_string(raw);
    assert_eq!(bytes, b"hi\0there");

    let ints = module.const_data_array(&IrType::I32, &[1, 2, 3]).unwrap();
    let raw = irlens_get_constant_data_as_string(module.value_ptr(ints), &mut len);
    assert!(raw.is_null());
    assert_eq!(len, 0);
}

#[test]
fn test_constant_sequence_elements() {
    let module = Module::new("m");
    let ints = module.const_data_vector(&IrType::I64, &[10, 20, 30]).unwrap();
    let handle = module.value_ptr(ints);
    assert_eq!(irlens_get_value_kind(handle), ValueKind::ConstantDataVector.as_raw());
    assert_eq!(irlens_get_constant_sequence_num_elements(handle), 3);

    let second = irlens_get_constant_sequence_element(handle, 1);
    let second = unsafe { &*second };
    assert_eq!(second.as_constant_int().unwrap().zext_value(), Some(20));
    assert!(irlens_get_constant_sequence_element(handle, 3).is_null());

    let one = module.const_int(&IrType::I32, 1, false).unwrap();
    assert_eq!(irlens_get_constant_sequence_num_elements(module.value_ptr(one)), 0);
    assert!(irlens_get_constant_sequence_element(module.value_ptr(one), 0).is_null());
}

#[test]
fn test_initializer_and_declaration() {
    let module = Module::new("m");
    let g = module.add_global("g", IrType::I32, false);
    let ext = module.add_global("ext", IrType::I32, false);
    let seven = module.const_int(&IrType::I32, 7, false).unwrap();
    module.set_initializer(g, seven).unwrap();

    assert_eq!(irlens_get_initializer(module.value_ptr(g)), module.value_ptr(seven));
    assert!(irlens_get_initializer(module.value_ptr(ext)).is_null());
    assert!(irlens_get_initializer(module.value_ptr(seven)).is_null());

    assert_eq!(irlens_is_declaration(module.value_ptr(ext)), 1);
    assert_eq!(irlens_is_declaration(module.value_ptr(g)), 0);
    assert!(irlens_is_constant(module.value_ptr(g)));
    assert!(irlens_is_constant(module.value_ptr(seven)));
}

#[test]
fn test_constant_expr_as_instruction() {
    let module = Module::new("m");
    let g = module.add_global("g", IrType::I8, false);
    let four = module.const_int(&IrType::I64, 4, false).unwrap();
    let gep = module.const_gep(&IrType::I8, g, &[four], true).unwrap();

    let inst = irlens_constant_expr_as_instruction(module.value_ptr(gep));
    assert!(!inst.is_null());
    assert_eq!(irlens_get_value_kind(inst), ValueKind::Instruction.as_raw());
    assert_eq!(take_string(irlens_get_opcode_name(inst)), "getelementptr");
    assert_eq!(unsafe { &*irlens_type_of_memory(inst) }, &IrType::I8);

    // The expression itself is not an instruction
    assert_eq!(take_string(irlens_get_opcode_name(module.value_ptr(gep))), "");
    assert!(irlens_constant_expr_as_instruction(module.value_ptr(g)).is_null());
}

#[test]
fn test_type_of_memory() {
    let module = Module::new("m");
    let f = module
        .add_function("f", IrType::function(IrType::Void, vec![IrType::Double], false))
        .unwrap();
    let x = module.value(f).as_function().unwrap().arguments()[0];
    let entry = module.append_basic_block(f, "entry").unwrap();
    let mut builder = IrBuilder::new(&module);
    builder.position_at_end(entry).unwrap();
    let slot = builder.build_alloca(&IrType::array(IrType::I16, 4), "slot").unwrap();
    let store = builder.build_store(x, slot).unwrap();
    let load = builder.build_load(&IrType::I64, slot, "l").unwrap();
    let sum = builder.build_binary(Opcode::Add, load, load, "s").unwrap();
    builder.build_ret(None).unwrap();

    let type_of_memory = |id| {
        let ty = irlens_type_of_memory(module.value_ptr(id));
        unsafe { ty.as_ref() }.cloned()
    };
    assert_eq!(type_of_memory(store), Some(IrType::Double));
    assert_eq!(type_of_memory(load), Some(IrType::I64));
    assert_eq!(type_of_memory(slot), Some(IrType::array(IrType::I16, 4)));
    assert_eq!(type_of_memory(sum), None);
    assert_eq!(type_of_memory(x), None);
}

#[test]
fn test_opcode_name_is_never_null() {
    let module = Module::new("m");
    let f = module
        .add_function("f", IrType::function(IrType::Void, vec![IrType::I32], false))
        .unwrap();
    let arg = module.value(f).as_function().unwrap().arguments()[0];
    assert_eq!(take_string(irlens_get_opcode_name(module.value_ptr(arg))), "");
    assert_eq!(take_string(irlens_get_opcode_name(module.value_ptr(f))), "");
    assert_eq!(take_string(irlens_get_opcode_name(ptr::null())), "");
}

#[test]
fn test_names_and_printing() {
    let module = Module::new("m");
    let g = module.add_global("counter", IrType::I64, false);
    let handle = module.value_ptr(g);

    let name = unsafe { CStr::from_ptr(irlens_get_value_name(handle)) };
    assert_eq!(name.to_str().unwrap(), "counter");
    irlens_set_value_name(handle, c"renamed".as_ptr());
    let name = unsafe { CStr::from_ptr(irlens_get_value_name(handle)) };
    assert_eq!(name.to_str().unwrap(), "renamed");

    let mut out: *const c_char = ptr::null();
    irlens_print_value_to_string(handle, &mut out);
    assert_eq!(take_string(out), "@renamed = external global i64");

    assert_eq!(take_string(irlens_print_type_to_string(irlens_type_of(handle))), "ptr");
    assert_eq!(irlens_get_global_parent(handle), &*module as *const Module);
}

#[test]
fn test_global_attributes() {
    let module = Module::new("m");
    let f = module
        .add_function("f", IrType::function(IrType::Void, vec![IrType::I32], false))
        .unwrap();
    let handle = module.value_ptr(f);

    assert_eq!(irlens_get_linkage(handle), Linkage::External.as_raw());
    irlens_set_linkage(handle, Linkage::Internal.as_raw());
    assert_eq!(irlens_get_linkage(handle), 8);
    // Unknown values are ignored
    irlens_set_linkage(handle, 4);
    assert_eq!(irlens_get_linkage(handle), 8);

    irlens_set_visibility(handle, Visibility::Hidden.as_raw());
    assert_eq!(irlens_get_visibility(handle), 1);
    irlens_set_visibility(handle, 42);
    assert_eq!(irlens_get_visibility(handle), 1);

    irlens_set_dll_storage_class(handle, DllStorageClass::DllExport.as_raw());
    assert_eq!(irlens_get_dll_storage_class(handle), 2);

    let mut out: *const c_char = ptr::null();
    irlens_print_value_to_string(handle, &mut out);
    assert_eq!(take_string(out), "declare internal hidden dllexport void @f(i32)");

    // Attribute getters on non-globals report the default
    let arg = module.value(f).as_function().unwrap().arguments()[0];
    irlens_set_linkage(module.value_ptr(arg), Linkage::Private.as_raw());
    assert_eq!(irlens_get_linkage(module.value_ptr(arg)), 0);
    assert_eq!(irlens_get_visibility(module.value_ptr(arg)), 0);
}

#[test]
fn test_module_lookups() {
    let module = Module::new("lookups");
    let f = module
        .add_function("main", IrType::function(IrType::I32, vec![], false))
        .unwrap();
    let g = module.add_global("table", IrType::array(IrType::I8, 2), true);
    let m: *const Module = &*module;

    let name = unsafe { CStr::from_ptr(irlens_get_module_name(m)) };
    assert_eq!(name.to_str().unwrap(), "lookups");
    assert_eq!(irlens_module_get_named_function(m, c"main".as_ptr()), module.value_ptr(f));
    assert!(irlens_module_get_named_function(m, c"table".as_ptr()).is_null());
    assert_eq!(irlens_module_get_named_global(m, c"table".as_ptr()), module.value_ptr(g));
    assert!(irlens_module_get_named_global(m, ptr::null()).is_null());

    let mut out: *const c_char = ptr::null();
    irlens_print_module_to_string(m, &mut out);
    assert_eq!(
        take_string(out),
        "; ModuleID = 'lookups'\n\n@table = external constant [2 x i8]\n\ndeclare i32 @main()\n"
    );
}

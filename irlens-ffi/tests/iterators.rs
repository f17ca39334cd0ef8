use irlens_ffi::iter::*;
use irlens_ffi::value::irlens_get_opcode_name;
use irlens_ffi::strings::irlens_dispose_string;
use irlens_ffi::ValueRef;
use irlens_ir::{IrBuilder, IrType, Module, Opcode};
use pretty_assertions::assert_eq;
use std::ffi::CStr;

fn opcode_name(value: ValueRef) -> String {
    let raw = irlens_get_opcode_name(value);
    let name = unsafe { CStr::from_ptr(raw) }.to_str().unwrap().to_string();
    irlens_dispose_string(raw);
    name
}

/// `define i32 @f(i32 %a) { bb0: %0 = add i32 %a, 1; ret i32 %0 }`
fn add_one_module() -> std::pin::Pin<Box<Module>> {
    let module = Module::new("scenario");
    let f = module
        .add_function("f", IrType::function(IrType::I32, vec![IrType::I32], false))
        .unwrap();
    let a = module.value(f).as_function().unwrap().arguments()[0];
    module.value(a).set_name("a");
    let bb0 = module.append_basic_block(f, "bb0").unwrap();
    {
        let mut builder = IrBuilder::new(&module);
        builder.position_at_end(bb0).unwrap();
        let one = module.const_int(&IrType::I32, 1, false).unwrap();
        let sum = builder.build_binary(Opcode::Add, a, one, "").unwrap();
        builder.build_ret(Some(sum)).unwrap();
    }
    module
}

#[test]
fn test_add_one_scenario() {
    let module = add_one_module();
    let f = module.value_ptr(module.get_function("f").unwrap());

    let blocks = irlens_function_blocks_iter(f);
    let bb0 = irlens_blocks_iter_next(blocks);
    assert!(!bb0.is_null());
    assert!(irlens_blocks_iter_next(blocks).is_null());
    irlens_dispose_blocks_iter(blocks);

    let insts = irlens_block_instructions_iter(bb0);
    let add = irlens_instructions_iter_next(insts);
    let ret = irlens_instructions_iter_next(insts);
    assert!(irlens_instructions_iter_next(insts).is_null());
    irlens_dispose_instructions_iter(insts);

    assert_eq!(opcode_name(add), "add");
    assert_eq!(opcode_name(ret), "ret");

    let operands = irlens_instruction_operands_iter(add);
    let lhs = irlens_operands_iter_next(operands);
    let rhs = irlens_operands_iter_next(operands);
    assert!(irlens_operands_iter_next(operands).is_null());
    irlens_dispose_operands_iter(operands);

    let lhs = unsafe { &*lhs };
    let rhs = unsafe { &*rhs };
    assert_eq!(lhs.name(), "a");
    assert_eq!(rhs.as_constant_int().unwrap().zext_value(), Some(1));
}

#[test]
fn test_exhausted_cursor_stays_exhausted() {
    let module = Module::new("m");
    let f = module
        .add_function("f", IrType::function(IrType::Void, vec![], false))
        .unwrap();
    for name in ["a", "b", "c"] {
        module.append_basic_block(f, name).unwrap();
    }

    let cursor = irlens_function_blocks_iter(module.value_ptr(f));
    let mut names = Vec::new();
    loop {
        let block = irlens_blocks_iter_next(cursor);
        if block.is_null() {
            break;
        }
        names.push(unsafe { &*block }.name());
    }
    assert_eq!(names, ["a", "b", "c"]);
    for _ in 0..3 {
        assert!(irlens_blocks_iter_next(cursor).is_null());
    }
    irlens_dispose_blocks_iter(cursor);
}

#[test]
fn test_empty_collection_still_gets_a_cursor() {
    let module = Module::new("m");
    let decl = module
        .add_function("decl", IrType::function(IrType::Void, vec![], false))
        .unwrap();
    let cursor = irlens_function_blocks_iter(module.value_ptr(decl));
    assert!(!cursor.is_null());
    assert!(irlens_blocks_iter_next(cursor).is_null());
    irlens_dispose_blocks_iter(cursor);

    let args = irlens_function_arguments_iter(module.value_ptr(decl));
    assert!(!args.is_null());
    assert!(irlens_arguments_iter_next(args).is_null());
    irlens_dispose_arguments_iter(args);
}

#[test]
fn test_arguments_in_declaration_order() {
    let module = Module::new("m");
    let f = module
        .add_function(
            "f",
            IrType::function(IrType::Void, vec![IrType::I8, IrType::Double, IrType::Ptr], false),
        )
        .unwrap();

    let cursor = irlens_function_arguments_iter(module.value_ptr(f));
    let mut types = Vec::new();
    loop {
        let arg = irlens_arguments_iter_next(cursor);
        if arg.is_null() {
            break;
        }
        types.push(unsafe { &*arg }.ty().to_string());
    }
    irlens_dispose_arguments_iter(cursor);
    assert_eq!(types, ["i8", "double", "ptr"]);
}

#[test]
fn test_partial_consumption_does_not_disturb_other_cursors() {
    let module = add_one_module();
    let f = module.value_ptr(module.get_function("f").unwrap());
    let blocks = irlens_function_blocks_iter(f);
    let bb0 = irlens_blocks_iter_next(blocks);
    irlens_dispose_blocks_iter(blocks);

    let first = irlens_block_instructions_iter(bb0);
    let second = irlens_block_instructions_iter(bb0);
    let add = irlens_instructions_iter_next(first);
    irlens_dispose_instructions_iter(first);

    assert_eq!(irlens_instructions_iter_next(second), add);
    assert!(!irlens_instructions_iter_next(second).is_null());
    assert!(irlens_instructions_iter_next(second).is_null());
    irlens_dispose_instructions_iter(second);
}

#[test]
fn test_call_operands_include_callee_last() {
    let module = Module::new("m");
    let callee = module
        .add_function(
            "callee",
            IrType::function(IrType::I32, vec![IrType::I32, IrType::I32], false),
        )
        .unwrap();
    let caller = module
        .add_function("caller", IrType::function(IrType::I32, vec![IrType::I32], false))
        .unwrap();
    let x = module.value(caller).as_function().unwrap().arguments()[0];
    let entry = module.append_basic_block(caller, "entry").unwrap();
    let mut builder = IrBuilder::new(&module);
    builder.position_at_end(entry).unwrap();
    let seven = module.const_int(&IrType::I32, 7, false).unwrap();
    let call = builder.build_call(callee, &[x, seven], "r").unwrap();
    builder.build_ret(Some(call)).unwrap();

    let operands: Vec<ValueRef> = ScopedCursor::<Operands>::new(module.value(call))
        .map(|v| v as ValueRef)
        .collect();
    assert_eq!(
        operands,
        vec![module.value_ptr(x), module.value_ptr(seven), module.value_ptr(callee)]
    );
}

#[test]
fn test_phi_incoming_blocks() {
    let module = Module::new("m");
    let f = module
        .add_function("f", IrType::function(IrType::I32, vec![IrType::I1], false))
        .unwrap();
    let cond = module.value(f).as_function().unwrap().arguments()[0];
    let entry = module.append_basic_block(f, "entry").unwrap();
    let left = module.append_basic_block(f, "left").unwrap();
    let right = module.append_basic_block(f, "right").unwrap();
    let join = module.append_basic_block(f, "join").unwrap();

    let mut builder = IrBuilder::new(&module);
    builder.position_at_end(entry).unwrap();
    builder.build_cond_br(cond, left, right).unwrap();
    builder.position_at_end(left).unwrap();
    builder.build_br(join).unwrap();
    builder.position_at_end(right).unwrap();
    builder.build_br(join).unwrap();
    builder.position_at_end(join).unwrap();
    let phi = builder.build_phi(&IrType::I32, "v").unwrap();
    let ten = module.const_int(&IrType::I32, 10, false).unwrap();
    let twenty = module.const_int(&IrType::I32, 20, false).unwrap();
    builder.add_incoming(phi, ten, right).unwrap();
    builder.add_incoming(phi, twenty, left).unwrap();
    builder.build_ret(Some(phi)).unwrap();

    let cursor = irlens_phi_incoming_blocks_iter(module.value_ptr(phi));
    assert_eq!(irlens_incoming_blocks_iter_next(cursor), module.value_ptr(right));
    assert_eq!(irlens_incoming_blocks_iter_next(cursor), module.value_ptr(left));
    assert!(irlens_incoming_blocks_iter_next(cursor).is_null());
    irlens_dispose_incoming_blocks_iter(cursor);

    // Incoming values come through the operands cursor, in the same order
    let values: Vec<ValueRef> = ScopedCursor::<Operands>::new(module.value(phi))
        .map(|v| v as ValueRef)
        .collect();
    assert_eq!(values, vec![module.value_ptr(ten), module.value_ptr(twenty)]);
}

#[test]
fn test_constant_aggregate_operands() {
    let module = Module::new("m");
    let one = module.const_int(&IrType::I32, 1, false).unwrap();
    let half = module.const_real(&IrType::Double, 0.5).unwrap();
    let st = module.const_struct(&[one, half], false).unwrap();

    let cursor = irlens_constant_aggregate_operands_iter(module.value_ptr(st));
    assert_eq!(irlens_operands_iter_next(cursor), module.value_ptr(one));
    assert_eq!(irlens_operands_iter_next(cursor), module.value_ptr(half));
    assert!(irlens_operands_iter_next(cursor).is_null());
    irlens_dispose_operands_iter(cursor);
}

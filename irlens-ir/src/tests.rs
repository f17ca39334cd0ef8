//! Unit tests for the IR graph

use super::*;
use irlens_common::{IrError, Linkage, ValueId, ValueKind};
use pretty_assertions::assert_eq;

/// `define i32 @f(i32 %a) { bb0: %0 = add i32 %a, 1; ret i32 %0 }`
fn build_add_one(module: &Module) -> (ValueId, ValueId, ValueId, ValueId) {
    let f = module
        .add_function("f", IrType::function(IrType::I32, vec![IrType::I32], false))
        .unwrap();
    let a = module.value(f).as_function().unwrap().arguments()[0];
    module.value(a).set_name("a");
    let bb0 = module.append_basic_block(f, "bb0").unwrap();

    let mut builder = IrBuilder::new(module);
    builder.position_at_end(bb0).unwrap();
    let one = module.const_int(&IrType::I32, 1, false).unwrap();
    let sum = builder.build_binary(Opcode::Add, a, one, "").unwrap();
    builder.build_ret(Some(sum)).unwrap();
    (f, a, bb0, sum)
}

#[test]
fn test_function_structure() {
    let module = Module::new("demo");
    let (f, a, bb0, sum) = build_add_one(&module);

    let function = module.value(f).as_function().unwrap();
    assert_eq!(&*function.blocks(), &[bb0]);
    assert_eq!(function.entry_block(), Some(bb0));

    let block = module.value(bb0).as_block().unwrap();
    assert_eq!(block.parent(), Some(f));
    let insts = block.instructions().to_vec();
    assert_eq!(insts.len(), 2);
    assert_eq!(insts[0], sum);
    assert_eq!(module.value(insts[1]).opcode(), Some(Opcode::Ret));

    let operands = module.value(sum).operand_values();
    assert_eq!(operands[0], a);
    assert_eq!(module.value(operands[1]).as_constant_int().unwrap().zext_value(), Some(1));

    assert_eq!(module.value(sum).parent_function(), Some(f));
    assert_eq!(module.value(a).parent_function(), Some(f));
    assert_eq!(module.value(a).kind(), ValueKind::Argument);
    assert!(std::ptr::eq(module.value(sum).module(), &*module));
}

#[test]
fn test_print_function_and_module() {
    let module = Module::new("demo");
    let (f, _, _, sum) = build_add_one(&module);

    assert_eq!(module.value(sum).to_string(), "  %0 = add i32 %a, 1");
    assert_eq!(
        module.value(f).to_string(),
        "define i32 @f(i32 %a) {\nbb0:\n  %0 = add i32 %a, 1\n  ret i32 %0\n}"
    );
    assert_eq!(
        module.to_string(),
        concat!(
            "; ModuleID = 'demo'\n\n",
            "define i32 @f(i32 %a) {\nbb0:\n  %0 = add i32 %a, 1\n  ret i32 %0\n}\n",
        )
    );
}

#[test]
fn test_unnamed_locals_are_numbered() {
    let module = Module::new("m");
    let h = module
        .add_function("h", IrType::function(IrType::I32, vec![IrType::I32], false))
        .unwrap();
    let arg = module.value(h).as_function().unwrap().arguments()[0];
    let entry = module.append_basic_block(h, "").unwrap();
    let mut builder = IrBuilder::new(&module);
    builder.position_at_end(entry).unwrap();
    let doubled = builder.build_binary(Opcode::Add, arg, arg, "").unwrap();
    builder.build_ret(Some(doubled)).unwrap();

    assert_eq!(
        module.value(h).to_string(),
        "define i32 @h(i32 %0) {\n1:\n  %2 = add i32 %0, %0\n  ret i32 %2\n}"
    );
}

#[test]
fn test_memory_instructions() {
    let module = Module::new("m");
    let f = module
        .add_function("mem", IrType::function(IrType::Void, vec![], false))
        .unwrap();
    let entry = module.append_basic_block(f, "entry").unwrap();
    let mut builder = IrBuilder::new(&module);
    builder.position_at_end(entry).unwrap();

    let one = module.const_int(&IrType::I32, 1, false).unwrap();
    let one64 = module.const_int(&IrType::I64, 1, false).unwrap();
    let p = builder.build_alloca(&IrType::I32, "p").unwrap();
    let store = builder.build_store(one, p).unwrap();
    let load = builder.build_load(&IrType::I32, p, "v").unwrap();
    let gep = builder.build_gep(&IrType::I8, p, &[one64], true, "q").unwrap();
    let add = builder.build_binary(Opcode::Add, load, one, "w").unwrap();
    builder.build_ret(None).unwrap();

    assert_eq!(module.value(store).type_of_memory(), Some(&IrType::I32));
    assert_eq!(module.value(load).type_of_memory(), Some(&IrType::I32));
    assert_eq!(module.value(gep).type_of_memory(), Some(&IrType::I8));
    assert_eq!(module.value(p).type_of_memory(), Some(&IrType::I32));
    assert_eq!(module.value(add).type_of_memory(), None);
    assert_eq!(module.value(one).type_of_memory(), None);

    assert_eq!(module.value(p).to_string(), "  %p = alloca i32");
    assert_eq!(module.value(store).to_string(), "  store i32 1, ptr %p");
    assert_eq!(module.value(load).to_string(), "  %v = load i32, ptr %p");
    assert_eq!(module.value(gep).to_string(), "  %q = getelementptr inbounds i8, ptr %p, i64 1");
}

#[test]
fn test_phi_and_branches() {
    let module = Module::new("m");
    let g = module
        .add_function("g", IrType::function(IrType::I32, vec![IrType::I1], false))
        .unwrap();
    let c = module.value(g).as_function().unwrap().arguments()[0];
    module.value(c).set_name("c");
    let entry = module.append_basic_block(g, "entry").unwrap();
    let then_bb = module.append_basic_block(g, "then").unwrap();
    let else_bb = module.append_basic_block(g, "else").unwrap();
    let merge = module.append_basic_block(g, "merge").unwrap();

    let mut builder = IrBuilder::new(&module);
    builder.position_at_end(entry).unwrap();
    let br = builder.build_cond_br(c, then_bb, else_bb).unwrap();
    builder.position_at_end(then_bb).unwrap();
    builder.build_br(merge).unwrap();
    builder.position_at_end(else_bb).unwrap();
    builder.build_br(merge).unwrap();
    builder.position_at_end(merge).unwrap();

    let one = module.const_int(&IrType::I32, 1, false).unwrap();
    let two = module.const_int(&IrType::I32, 2, false).unwrap();
    let phi = builder.build_phi(&IrType::I32, "r").unwrap();
    builder.add_incoming(phi, one, then_bb).unwrap();
    builder.add_incoming(phi, two, else_bb).unwrap();
    builder.build_ret(Some(phi)).unwrap();

    let data = module.value(phi).as_instruction().unwrap();
    assert_eq!(&*data.incoming_blocks().unwrap(), &[then_bb, else_bb]);
    assert_eq!(module.value(phi).operand_values(), vec![one, two]);
    assert_eq!(module.value(phi).to_string(), "  %r = phi i32 [ 1, %then ], [ 2, %else ]");
    assert_eq!(module.value(br).to_string(), "  br i1 %c, label %then, label %else");

    // Only blocks can be incoming edges
    assert!(builder.add_incoming(phi, one, c).is_err());
}

#[test]
fn test_call_operands_end_with_callee() {
    let module = Module::new("m");
    let callee = module
        .add_function("callee", IrType::function(IrType::Void, vec![IrType::I32], false))
        .unwrap();
    let caller = module
        .add_function("caller", IrType::function(IrType::Void, vec![IrType::I32], false))
        .unwrap();
    let a = module.value(caller).as_function().unwrap().arguments()[0];
    module.value(a).set_name("a");
    let entry = module.append_basic_block(caller, "entry").unwrap();

    let mut builder = IrBuilder::new(&module);
    builder.position_at_end(entry).unwrap();
    let call = builder.build_call(callee, &[a], "ignored").unwrap();
    builder.build_ret(None).unwrap();

    assert_eq!(module.value(call).operand_values(), vec![a, callee]);
    assert_eq!(module.value(call).to_string(), "  call void @callee(i32 %a)");
    assert_eq!(module.value(callee).to_string(), "declare void @callee(i32)");
    assert!(module.value(callee).is_declaration());
    assert!(!module.value(caller).is_declaration());

    let err = builder.build_call(callee, &[], "").unwrap_err();
    assert!(matches!(err, IrError::InvalidOperand { .. }));
}

#[test]
fn test_globals() {
    let module = Module::new("m");
    let g = module.add_global("g", IrType::I32, false);
    let forty_two = module.const_int(&IrType::I32, 42, false).unwrap();
    module.set_initializer(g, forty_two).unwrap();
    let ext = module.add_global("ext", IrType::I64, false);
    let s = module.add_global("s", IrType::array(IrType::I8, 3), true);
    let hi = module.const_string(b"hi", true).unwrap();
    module.set_initializer(s, hi).unwrap();
    module.value(s).global_attrs().unwrap().set_linkage(Linkage::Internal);

    assert_eq!(module.value(g).to_string(), "@g = global i32 42");
    assert_eq!(module.value(ext).to_string(), "@ext = external global i64");
    assert_eq!(module.value(s).to_string(), "@s = internal constant [3 x i8] c\"hi\\00\"");

    assert!(module.value(ext).is_declaration());
    assert!(!module.value(g).is_declaration());
    assert_eq!(module.value(g).as_global_variable().unwrap().initializer(), Some(forty_two));
    assert_eq!(module.get_global("ext"), Some(ext));
    assert_eq!(module.get_global("missing"), None);

    // Initializer type must match the value type
    assert!(matches!(
        module.set_initializer(ext, forty_two),
        Err(IrError::TypeMismatch { .. })
    ));
}

#[test]
fn test_constant_printing() {
    let module = Module::new("m");
    let g = module.add_global("g", IrType::I64, false);
    let one = module.const_int(&IrType::I32, 1, false).unwrap();
    let two = module.const_int(&IrType::I32, 2, false).unwrap();
    let t = module.const_int(&IrType::I1, 1, false).unwrap();
    let minus = module.const_int(&IrType::I8, u64::MAX, true).unwrap();
    let sum = module.const_binary(Opcode::Add, one, two).unwrap();
    let cast = module.const_cast(Opcode::PtrToInt, g, &IrType::I64).unwrap();
    let arr = module.const_array(&IrType::I32, &[one, two]).unwrap();
    let st = module.const_struct(&[one, t], false).unwrap();
    let null = module.const_null(&IrType::Ptr).unwrap();

    assert_eq!(module.value(t).to_string(), "i1 true");
    assert_eq!(module.value(minus).to_string(), "i8 -1");
    assert_eq!(module.value(sum).to_string(), "i32 add (i32 1, i32 2)");
    assert_eq!(module.value(cast).to_string(), "i64 ptrtoint (ptr @g to i64)");
    assert_eq!(module.value(arr).to_string(), "[2 x i32] [i32 1, i32 2]");
    assert_eq!(module.value(st).to_string(), "{ i32, i1 } { i32 1, i1 true }");
    assert_eq!(module.value(null).to_string(), "ptr null");
    assert_eq!(module.value(module.undef(&IrType::I32)).to_string(), "i32 undef");

    assert_eq!(module.value(arr).kind(), ValueKind::ConstantArray);
    assert_eq!(module.value(st).kind(), ValueKind::ConstantStruct);
    assert_eq!(module.value(sum).kind(), ValueKind::ConstantExpr);
    assert!(module.value(g).is_constant());
}

#[test]
fn test_detached_instruction_can_be_inserted() {
    let module = Module::new("m");
    let g = module.add_global("g", IrType::I64, false);
    let f = module
        .add_function("f", IrType::function(IrType::Void, vec![], false))
        .unwrap();
    let entry = module.append_basic_block(f, "entry").unwrap();
    let cast = module.const_cast(Opcode::PtrToInt, g, &IrType::I64).unwrap();
    let inst = module.constant_expr_as_instruction(cast).unwrap();

    assert_eq!(module.value(inst).to_string(), "  %<badref> = ptrtoint ptr @g to i64");

    let mut builder = IrBuilder::new(&module);
    builder.position_at_end(entry).unwrap();
    builder.insert(inst).unwrap();
    assert_eq!(&*module.value(entry).as_block().unwrap().instructions(), &[inst]);
    assert_eq!(module.value(inst).to_string(), "  %0 = ptrtoint ptr @g to i64");
    // Already attached
    assert!(builder.insert(inst).is_err());
}

#[test]
fn test_names() {
    let module = Module::new("m");
    let g = module.add_global("g", IrType::I32, false);
    let value = module.value(g);
    value.set_name("with space");
    assert_eq!(value.to_string(), "@\"with space\" = external global i32");
    value.set_name("cut\0here");
    assert_eq!(value.name(), "cut");
    assert!(value.has_name());
    value.set_name("");
    assert!(!value.has_name());
    assert_eq!(value.to_string(), "@0 = external global i32");
}

#[test]
fn test_builder_errors() {
    let module = Module::new("m");
    let f = module
        .add_function("f", IrType::function(IrType::I32, vec![IrType::I32, IrType::I64], false))
        .unwrap();
    let args = module.value(f).as_function().unwrap().arguments().to_vec();
    let mut builder = IrBuilder::new(&module);

    assert_eq!(builder.build_unreachable(), Err(IrError::NoInsertionPoint));
    assert!(matches!(builder.position_at_end(f), Err(IrError::WrongValueKind { .. })));

    let entry = module.append_basic_block(f, "entry").unwrap();
    builder.position_at_end(entry).unwrap();
    assert!(matches!(
        builder.build_binary(Opcode::Add, args[0], args[1], ""),
        Err(IrError::TypeMismatch { .. })
    ));
    assert!(matches!(
        builder.build_binary(Opcode::FAdd, args[0], args[0], ""),
        Err(IrError::TypeMismatch { .. })
    ));
    assert!(matches!(builder.build_ret(None), Err(IrError::TypeMismatch { .. })));
    assert!(matches!(builder.build_ret(Some(args[1])), Err(IrError::TypeMismatch { .. })));
    assert!(module.add_function("bad", IrType::I32).is_err());
}

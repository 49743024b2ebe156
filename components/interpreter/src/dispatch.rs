//! The opcode dispatch loop.
//!
//! One instruction executes per `execute_one` call: fetch, decode,
//! act. Branch operands are signed 16-bit offsets applied relative to
//! the position of the opcode byte (`insn_pc`), not the position after
//! the operand bytes.

use std::rc::Rc;

use class_format::descriptor::{arg_count_of, tag_for_descriptor};
use class_format::opcode as op;
use class_format::Constant;
use core_types::{TaggedValue, TypeTag, VmError, VmErrorKind, VmResult};
use memory_manager::klass::method_key;
use memory_manager::{Handle, HeapObject, KlassId, MethodId, ObjectKind};

use crate::vm::Interpreter;

/// Per-invocation execution registers. Frame *data* lives in the
/// shared frame array; this is the bookkeeping the loop itself needs:
/// the current method, its code, the program counter and the caller
/// chain for resuming on return.
pub(crate) struct ExecState {
    /// Currently executing method
    pub method: MethodId,
    /// Its bytecode
    pub code: Rc<[u8]>,
    /// Offset of the next byte to fetch
    pub pc: usize,
    /// Offset of the opcode byte of the current instruction
    pub insn_pc: usize,
    /// Call depth above the outermost frame of this invocation
    pub depth: usize,
    /// Methods to resume, innermost last
    pub callers: Vec<MethodId>,
}

impl ExecState {
    pub(crate) fn new(method: MethodId, code: Rc<[u8]>) -> Self {
        ExecState {
            method,
            code,
            pc: 0,
            insn_pc: 0,
            depth: 0,
            callers: Vec::new(),
        }
    }
}

// ----- fetch helpers -----

fn fetch_u8(state: &mut ExecState) -> VmResult<u8> {
    let byte = state.code.get(state.pc).copied().ok_or_else(|| {
        VmError::new(
            VmErrorKind::MalformedClass,
            "bytecode ended in the middle of an instruction",
        )
    })?;
    state.pc += 1;
    Ok(byte)
}

fn fetch_i8(state: &mut ExecState) -> VmResult<i8> {
    Ok(fetch_u8(state)? as i8)
}

fn fetch_u16(state: &mut ExecState) -> VmResult<u16> {
    let hi = fetch_u8(state)?;
    let lo = fetch_u8(state)?;
    Ok(u16::from_be_bytes([hi, lo]))
}

fn fetch_i16(state: &mut ExecState) -> VmResult<i16> {
    Ok(fetch_u16(state)? as i16)
}

/// A 32-bit integer-family operand: boolean, char, byte, short or int.
/// The classic calling convention funnels all of these through the
/// int instructions; only references and the 64-bit family are
/// rejected.
fn int_operand(value: TaggedValue) -> VmResult<i32> {
    match value.tag() {
        TypeTag::Boolean | TypeTag::Char | TypeTag::Byte | TypeTag::Short | TypeTag::Int => {
            Ok(value.payload())
        }
        tag => Err(VmError::new(
            VmErrorKind::TypeMismatch,
            format!("expected an int-family value, found {}", tag),
        )),
    }
}

/// A non-null reference operand, resolved to its handle.
fn reference_operand(value: TaggedValue, context: &str) -> VmResult<Handle> {
    if !value.is_reference() {
        return Err(VmError::new(
            VmErrorKind::TypeMismatch,
            format!("{} on a {} value", context, value.tag()),
        ));
    }
    if value.is_null() {
        return Err(VmError::new(
            VmErrorKind::NullReference,
            format!("{} on null", context),
        ));
    }
    Handle::from_payload(value.payload())
}

/// Storing into a slot may never change whether the slot holds a
/// reference; that is what keeps the collector's root scan sound.
fn check_store(declared: TypeTag, value: TaggedValue, what: &str) -> VmResult<()> {
    if (declared == TypeTag::Reference) != value.is_reference() {
        return Err(VmError::new(
            VmErrorKind::TypeMismatch,
            format!("cannot store a {} value into a {} {}", value.tag(), declared, what),
        ));
    }
    Ok(())
}

impl Interpreter {
    /// Execute one instruction. Returns `Some(result)` when the
    /// outermost frame of this invocation returned.
    pub(crate) fn execute_one(&mut self, state: &mut ExecState) -> VmResult<Option<TaggedValue>> {
        state.insn_pc = state.pc;
        let opcode = fetch_u8(state).map_err(|_| {
            VmError::new(
                VmErrorKind::MalformedClass,
                "execution ran off the end of the bytecode",
            )
        })?;

        match opcode {
            op::NOP => {}

            // ----- constants -----
            op::ACONST_NULL => self.frames.push(TaggedValue::null())?,
            op::ICONST_M1..=op::ICONST_5 => {
                self.frames.push(TaggedValue::int(opcode as i32 - 3))?;
            }
            op::BIPUSH => {
                let value = fetch_i8(state)?;
                self.frames.push(TaggedValue::int(value as i32))?;
            }
            op::SIPUSH => {
                let value = fetch_i16(state)?;
                self.frames.push(TaggedValue::int(value as i32))?;
            }
            op::LDC => {
                let index = fetch_u8(state)? as u16;
                self.load_constant(state, index)?;
            }

            // ----- locals -----
            op::ILOAD => {
                let index = fetch_u8(state)? as usize;
                self.load_int_local(index)?;
            }
            op::ILOAD_0..=op::ILOAD_3 => {
                self.load_int_local((opcode - op::ILOAD_0) as usize)?;
            }
            op::ALOAD => {
                let index = fetch_u8(state)? as usize;
                self.load_ref_local(index)?;
            }
            op::ALOAD_0..=op::ALOAD_3 => {
                self.load_ref_local((opcode - op::ALOAD_0) as usize)?;
            }
            op::ISTORE => {
                let index = fetch_u8(state)? as usize;
                self.store_int_local(index)?;
            }
            op::ISTORE_0..=op::ISTORE_3 => {
                self.store_int_local((opcode - op::ISTORE_0) as usize)?;
            }
            op::ASTORE => {
                let index = fetch_u8(state)? as usize;
                self.store_ref_local(index)?;
            }
            op::ASTORE_0..=op::ASTORE_3 => {
                self.store_ref_local((opcode - op::ASTORE_0) as usize)?;
            }
            op::IINC => {
                let index = fetch_u8(state)? as usize;
                let delta = fetch_i8(state)? as i32;
                let value = int_operand(self.frames.get_local(index)?)?;
                self.frames
                    .set_local(index, TaggedValue::int(value.wrapping_add(delta)))?;
            }

            // ----- operand-stack shuffling -----
            op::POP => {
                self.frames.pop()?;
            }
            op::POP2 => {
                self.frames.pop()?;
                self.frames.pop()?;
            }
            op::DUP => {
                let top = self.frames.peek(0)?;
                self.frames.push(top)?;
            }
            op::DUP_X1 => {
                let first = self.frames.pop()?;
                let second = self.frames.pop()?;
                self.frames.push(first)?;
                self.frames.push(second)?;
                self.frames.push(first)?;
            }
            op::SWAP => {
                let first = self.frames.pop()?;
                let second = self.frames.pop()?;
                self.frames.push(first)?;
                self.frames.push(second)?;
            }

            // ----- integer arithmetic (32-bit, wrapping) -----
            op::IADD => self.binary_int(i32::wrapping_add)?,
            op::ISUB => self.binary_int(i32::wrapping_sub)?,
            op::IMUL => self.binary_int(i32::wrapping_mul)?,
            op::IDIV => {
                let (a, b) = self.int_operands()?;
                if b == 0 {
                    return Err(VmError::new(
                        VmErrorKind::DivisionByZero,
                        format!("{} / 0", a),
                    ));
                }
                // MIN / -1 wraps; there is no overflow trap.
                self.frames.push(TaggedValue::int(a.wrapping_div(b)))?;
            }
            op::IREM => {
                let (a, b) = self.int_operands()?;
                if b == 0 {
                    return Err(VmError::new(
                        VmErrorKind::DivisionByZero,
                        format!("{} % 0", a),
                    ));
                }
                self.frames.push(TaggedValue::int(a.wrapping_rem(b)))?;
            }
            op::INEG => {
                let value = int_operand(self.frames.pop()?)?;
                self.frames.push(TaggedValue::int(value.wrapping_neg()))?;
            }
            op::ISHL => self.binary_int(|a, b| a.wrapping_shl(b as u32))?,
            op::ISHR => self.binary_int(|a, b| a.wrapping_shr(b as u32))?,
            op::IUSHR => self.binary_int(|a, b| ((a as u32).wrapping_shr(b as u32)) as i32)?,
            op::IAND => self.binary_int(|a, b| a & b)?,
            op::IOR => self.binary_int(|a, b| a | b)?,
            op::IXOR => self.binary_int(|a, b| a ^ b)?,

            // ----- branches -----
            op::IFEQ..=op::IFLE => {
                let offset = fetch_i16(state)?;
                let value = int_operand(self.frames.pop()?)?;
                let jump = match opcode {
                    op::IFEQ => value == 0,
                    op::IFNE => value != 0,
                    op::IFLT => value < 0,
                    op::IFGE => value >= 0,
                    op::IFGT => value > 0,
                    _ => value <= 0,
                };
                if jump {
                    branch(state, offset)?;
                }
            }
            op::IF_ICMPEQ..=op::IF_ICMPLE => {
                let offset = fetch_i16(state)?;
                let (a, b) = self.int_operands()?;
                let jump = match opcode {
                    op::IF_ICMPEQ => a == b,
                    op::IF_ICMPNE => a != b,
                    op::IF_ICMPLT => a < b,
                    op::IF_ICMPGE => a >= b,
                    op::IF_ICMPGT => a > b,
                    _ => a <= b,
                };
                if jump {
                    branch(state, offset)?;
                }
            }
            op::IF_ACMPEQ | op::IF_ACMPNE => {
                let offset = fetch_i16(state)?;
                let b = self.pop_reference_value("reference comparison")?;
                let a = self.pop_reference_value("reference comparison")?;
                let equal = a.payload() == b.payload();
                if (opcode == op::IF_ACMPEQ) == equal {
                    branch(state, offset)?;
                }
            }
            op::IFNULL | op::IFNONNULL => {
                let offset = fetch_i16(state)?;
                let value = self.pop_reference_value("null test")?;
                if (opcode == op::IFNULL) == value.is_null() {
                    branch(state, offset)?;
                }
            }
            op::GOTO => {
                let offset = fetch_i16(state)?;
                branch(state, offset)?;
            }

            // ----- object fields -----
            op::GETSTATIC => {
                let index = fetch_u16(state)?;
                let (class_name, field_name, _) = self.field_ref(state, index)?;
                let class = self.resolve_class(&class_name)?;
                let klass = self.heap.class(class);
                let slot = klass
                    .static_slot(&field_name)
                    .ok_or_else(|| no_field(&class_name, &field_name))?;
                let statics = klass.statics;
                let value = self.heap.resolve(statics)?.get_slot(slot)?;
                self.frames.push(value)?;
            }
            op::PUTSTATIC => {
                let index = fetch_u16(state)?;
                let (class_name, field_name, _) = self.field_ref(state, index)?;
                let class = self.resolve_class(&class_name)?;
                let value = self.frames.pop()?;
                let klass = self.heap.class(class);
                let slot = klass
                    .static_slot(&field_name)
                    .ok_or_else(|| no_field(&class_name, &field_name))?;
                check_store(klass.static_tags[slot], value, "static field")?;
                let statics = klass.statics;
                self.heap.resolve_mut(statics)?.set_slot(slot, value)?;
            }
            op::GETFIELD => {
                let index = fetch_u16(state)?;
                let (class_name, field_name, _) = self.field_ref(state, index)?;
                self.resolve_class(&class_name)?;
                let handle = reference_operand(self.frames.pop()?, "getfield")?;
                let value = {
                    let object = self.heap.resolve(handle)?;
                    let ObjectKind::Instance { class } = object.kind else {
                        return Err(VmError::new(
                            VmErrorKind::TypeMismatch,
                            "field access on a non-instance object",
                        ));
                    };
                    let slot = self
                        .heap
                        .class(class)
                        .field_slot(&field_name)
                        .ok_or_else(|| no_field(&class_name, &field_name))?;
                    object.get_slot(slot)?
                };
                self.frames.push(value)?;
            }
            op::PUTFIELD => {
                let index = fetch_u16(state)?;
                let (class_name, field_name, _) = self.field_ref(state, index)?;
                self.resolve_class(&class_name)?;
                let value = self.frames.pop()?;
                let handle = reference_operand(self.frames.pop()?, "putfield")?;
                let ObjectKind::Instance { class } = self.heap.resolve(handle)?.kind else {
                    return Err(VmError::new(
                        VmErrorKind::TypeMismatch,
                        "field access on a non-instance object",
                    ));
                };
                let klass = self.heap.class(class);
                let slot = klass
                    .field_slot(&field_name)
                    .ok_or_else(|| no_field(&class_name, &field_name))?;
                check_store(klass.field_tags[slot], value, "field")?;
                self.heap.resolve_mut(handle)?.set_slot(slot, value)?;
            }

            // ----- allocation -----
            op::NEW => {
                let index = fetch_u16(state)?;
                let class_name = self.class_ref(state, index)?;
                let class = self.resolve_class(&class_name)?;
                self.maybe_collect();
                let tags = self.heap.class(class).field_tags.clone();
                let handle = self.heap.allocate(HeapObject::new_instance(class, &tags))?;
                self.frames.push(handle.to_value())?;
            }
            op::NEWARRAY => {
                let code = fetch_u8(state)?;
                let elem = TypeTag::from_array_type(code).ok_or_else(|| {
                    VmError::new(
                        VmErrorKind::MalformedClass,
                        format!("bad array type code {}", code),
                    )
                })?;
                let length = self.pop_array_length()?;
                self.maybe_collect();
                let handle = self.heap.allocate(HeapObject::new_array(elem, length))?;
                self.frames.push(handle.to_value())?;
            }
            op::ANEWARRAY => {
                let index = fetch_u16(state)?;
                let class_name = self.class_ref(state, index)?;
                if !class_name.starts_with('[') {
                    self.resolve_class(&class_name)?;
                }
                let length = self.pop_array_length()?;
                self.maybe_collect();
                let handle = self
                    .heap
                    .allocate(HeapObject::new_array(TypeTag::Reference, length))?;
                self.frames.push(handle.to_value())?;
            }
            op::MULTIANEWARRAY => {
                let index = fetch_u16(state)?;
                let class_name = self.class_ref(state, index)?;
                let dims = fetch_u8(state)? as usize;
                self.multianewarray(&class_name, dims)?;
            }
            op::ARRAYLENGTH => {
                let handle = reference_operand(self.frames.pop()?, "arraylength")?;
                let object = self.heap.resolve(handle)?;
                object.element_tag()?;
                let length = object.length() as i32;
                self.frames.push(TaggedValue::int(length))?;
            }

            // ----- array elements -----
            op::IALOAD => self.array_load(TypeTag::Int)?,
            op::AALOAD => self.array_load(TypeTag::Reference)?,
            op::IASTORE => self.array_store(TypeTag::Int)?,
            op::AASTORE => self.array_store(TypeTag::Reference)?,

            // ----- calls -----
            op::INVOKESTATIC => {
                let index = fetch_u16(state)?;
                let (class_name, name, descriptor) = self.method_ref(state, index)?;
                let class = self.resolve_class(&class_name)?;
                let key = method_key(&name, &descriptor);
                let callee = self.heap.class(class).static_method(&key).ok_or_else(|| {
                    VmError::new(
                        VmErrorKind::MethodNotFound,
                        format!("no static method {} on {}", key, class_name),
                    )
                })?;
                let argc = self.heap.method(callee).arg_count;
                if self.heap.method(callee).is_native() {
                    self.call_native(callee, argc)?;
                } else {
                    self.enter_method(state, callee, argc)?;
                }
            }
            op::INVOKESPECIAL => {
                let index = fetch_u16(state)?;
                let (class_name, name, descriptor) = self.method_ref(state, index)?;
                let class = self.resolve_class(&class_name)?;
                let argc = declared_args(&descriptor)?;
                reference_operand(self.frames.peek(argc)?, "special call")?;
                let key = method_key(&name, &descriptor);
                let callee = self.find_in_chain(class, &key).ok_or_else(|| {
                    VmError::new(
                        VmErrorKind::MethodNotFound,
                        format!("no method {} on {} or its ancestors", key, class_name),
                    )
                })?;
                if self.heap.method(callee).is_static() {
                    return Err(VmError::new(
                        VmErrorKind::MethodNotFound,
                        format!("{} on {} is static, not an instance method", key, class_name),
                    ));
                }
                if self.heap.method(callee).is_native() {
                    self.call_native(callee, argc + 1)?;
                } else {
                    self.enter_method(state, callee, argc + 1)?;
                }
            }
            op::INVOKEVIRTUAL => {
                let index = fetch_u16(state)?;
                let (class_name, name, descriptor) = self.method_ref(state, index)?;
                if !class_name.starts_with('[') {
                    self.resolve_class(&class_name)?;
                }
                let argc = declared_args(&descriptor)?;
                // The receiver sits below the arguments; it is read,
                // not popped — the callee takes it as local 0.
                let receiver = reference_operand(self.frames.peek(argc)?, "virtual call")?;
                let ObjectKind::Instance { class } = self.heap.resolve(receiver)?.kind else {
                    return Err(VmError::new(
                        VmErrorKind::MethodNotFound,
                        "virtual call on an array object",
                    ));
                };
                let key = method_key(&name, &descriptor);
                let runtime_klass = self.heap.class(class);
                // Resolve the name to a table slot, then take whatever
                // method the *runtime* class's table holds in that
                // slot. Overriding needs nothing beyond this lookup.
                let slot = *runtime_klass.vtable_index.get(&key).ok_or_else(|| {
                    VmError::new(
                        VmErrorKind::MethodNotFound,
                        format!("no virtual method {} on {}", key, runtime_klass.name),
                    )
                })?;
                let callee = runtime_klass.vtable[slot];
                if self.heap.method(callee).is_native() {
                    // Native stubs run in the current frame.
                    self.call_native(callee, argc + 1)?;
                } else {
                    self.enter_method(state, callee, argc + 1)?;
                }
            }

            // ----- returns -----
            op::IRETURN => {
                let value = self.frames.pop()?;
                int_operand(value)?;
                return self.handle_return(state, Some(value));
            }
            op::ARETURN => {
                let value = self.frames.pop()?;
                if !value.is_reference() {
                    return Err(VmError::new(
                        VmErrorKind::TypeMismatch,
                        format!("areturn of a {} value", value.tag()),
                    ));
                }
                return self.handle_return(state, Some(value));
            }
            op::RETURN => return self.handle_return(state, None),

            // ----- everything else -----
            other => {
                return Err(match op::mnemonic(other) {
                    Some(name) => VmError::new(
                        VmErrorKind::UnsupportedOpcode,
                        format!("{} is not implemented", name),
                    ),
                    None => VmError::new(
                        VmErrorKind::UnknownOpcode,
                        format!("opcode byte {}", other),
                    ),
                });
            }
        }

        Ok(None)
    }

    // ----- helpers -----

    fn binary_int(&mut self, f: impl Fn(i32, i32) -> i32) -> VmResult<()> {
        let (a, b) = self.int_operands()?;
        self.frames.push(TaggedValue::int(f(a, b)))
    }

    fn int_operands(&mut self) -> VmResult<(i32, i32)> {
        let b = int_operand(self.frames.pop()?)?;
        let a = int_operand(self.frames.pop()?)?;
        Ok((a, b))
    }

    fn pop_reference_value(&mut self, context: &str) -> VmResult<TaggedValue> {
        let value = self.frames.pop()?;
        if !value.is_reference() {
            return Err(VmError::new(
                VmErrorKind::TypeMismatch,
                format!("{} on a {} value", context, value.tag()),
            ));
        }
        Ok(value)
    }

    fn load_int_local(&mut self, index: usize) -> VmResult<()> {
        let value = self.frames.get_local(index)?;
        int_operand(value)?;
        self.frames.push(value)
    }

    fn load_ref_local(&mut self, index: usize) -> VmResult<()> {
        let value = self.frames.get_local(index)?;
        if !value.is_reference() {
            return Err(VmError::new(
                VmErrorKind::TypeMismatch,
                format!("aload of a {} local", value.tag()),
            ));
        }
        self.frames.push(value)
    }

    fn store_int_local(&mut self, index: usize) -> VmResult<()> {
        let value = self.frames.pop()?;
        int_operand(value)?;
        self.frames.set_local(index, value)
    }

    fn store_ref_local(&mut self, index: usize) -> VmResult<()> {
        let value = self.frames.pop()?;
        if !value.is_reference() {
            return Err(VmError::new(
                VmErrorKind::TypeMismatch,
                format!("astore of a {} value", value.tag()),
            ));
        }
        self.frames.set_local(index, value)
    }

    fn pop_array_length(&mut self) -> VmResult<usize> {
        let length = int_operand(self.frames.pop()?)?;
        if length < 0 {
            return Err(VmError::new(
                VmErrorKind::NegativeArraySize,
                format!("array length {}", length),
            ));
        }
        Ok(length as usize)
    }

    fn array_load(&mut self, expected: TypeTag) -> VmResult<()> {
        let index = int_operand(self.frames.pop()?)?;
        let handle = reference_operand(self.frames.pop()?, "array load")?;
        let value = {
            let object = self.heap.resolve(handle)?;
            let elem = object.element_tag()?;
            if elem != expected {
                return Err(VmError::new(
                    VmErrorKind::TypeMismatch,
                    format!("{} array load from a {} array", expected, elem),
                ));
            }
            check_index(index, object.length())?;
            object.get_slot(index as usize)?
        };
        self.frames.push(value)
    }

    fn array_store(&mut self, expected: TypeTag) -> VmResult<()> {
        let value = self.frames.pop()?;
        let index = int_operand(self.frames.pop()?)?;
        let handle = reference_operand(self.frames.pop()?, "array store")?;
        let object = self.heap.resolve_mut(handle)?;
        let elem = object.element_tag()?;
        if elem != expected {
            return Err(VmError::new(
                VmErrorKind::TypeMismatch,
                format!("{} array store into a {} array", expected, elem),
            ));
        }
        check_store(elem, value, "array slot")?;
        check_index(index, object.length())?;
        object.set_slot(index as usize, value)
    }

    /// Depth-first allocation of a multi-dimensional array. No
    /// collection runs inside the recursion: intermediate handles live
    /// only in Rust locals and would be invisible to the root scan.
    fn multianewarray(&mut self, class_name: &str, dims: usize) -> VmResult<()> {
        let depth = class_name.chars().take_while(|&c| c == '[').count();
        if dims == 0 || dims > depth {
            return Err(VmError::new(
                VmErrorKind::MalformedClass,
                format!("{} dimensions for array type {}", dims, class_name),
            ));
        }
        let leaf_descriptor = &class_name[dims..];
        let leaf = tag_for_descriptor(leaf_descriptor).ok_or_else(|| {
            VmError::new(
                VmErrorKind::MalformedClass,
                format!("bad array element descriptor {}", leaf_descriptor),
            )
        })?;
        if let Some(element_class) = leaf_descriptor
            .strip_prefix('L')
            .and_then(|rest| rest.strip_suffix(';'))
        {
            self.resolve_class(&element_class.replace('/', "."))?;
        }

        // The last dimension's count is on top of the stack.
        let mut counts = Vec::with_capacity(dims);
        for _ in 0..dims {
            counts.push(self.pop_array_length()?);
        }
        counts.reverse();

        self.maybe_collect();
        let handle = self.allocate_nested(&counts, leaf)?;
        self.frames.push(handle.to_value())
    }

    fn allocate_nested(&mut self, counts: &[usize], leaf: TypeTag) -> VmResult<Handle> {
        if counts.len() == 1 {
            return self.heap.allocate(HeapObject::new_array(leaf, counts[0]));
        }
        let outer = self
            .heap
            .allocate(HeapObject::new_array(TypeTag::Reference, counts[0]))?;
        for slot in 0..counts[0] {
            let inner = self.allocate_nested(&counts[1..], leaf)?;
            self.heap
                .resolve_mut(outer)?
                .set_slot(slot, inner.to_value())?;
        }
        Ok(outer)
    }

    /// Search a class and its ancestors for a declared method.
    fn find_in_chain(&self, class: KlassId, key: &str) -> Option<MethodId> {
        let mut current = Some(class);
        while let Some(id) = current {
            let klass = self.heap.class(id);
            if let Some(&method) = klass.declared_methods.get(key) {
                return Some(method);
            }
            current = klass.super_class;
        }
        None
    }

    /// Push a callee frame and switch execution to it.
    fn enter_method(&mut self, state: &mut ExecState, callee: MethodId, argc: usize) -> VmResult<()> {
        let method = self.heap.method(callee);
        let (max_locals, max_stack, code) =
            (method.max_locals, method.max_stack, method.code.clone());
        self.frames.push_frame(state.pc, argc, max_locals, max_stack)?;
        state.callers.push(state.method);
        state.method = callee;
        state.code = code;
        state.pc = 0;
        state.depth += 1;
        Ok(())
    }

    /// Pop the current frame; yield the invocation result at depth 0.
    fn handle_return(
        &mut self,
        state: &mut ExecState,
        value: Option<TaggedValue>,
    ) -> VmResult<Option<TaggedValue>> {
        if state.depth == 0 {
            // The void sentinel is the null word.
            return Ok(Some(value.unwrap_or_else(TaggedValue::null)));
        }
        let caller = state.callers.pop().ok_or_else(|| {
            VmError::new(VmErrorKind::StackUnderflow, "return with no recorded caller")
        })?;
        let method = self.heap.method(caller);
        let (max_locals, max_stack, code) =
            (method.max_locals, method.max_stack, method.code.clone());
        let resume_pc = self.frames.pop_frame(max_locals, max_stack)?;
        if let Some(result) = value {
            self.frames.push(result)?;
        }
        state.method = caller;
        state.code = code;
        state.pc = resume_pc;
        state.depth -= 1;
        Ok(None)
    }

    /// Pop native-call arguments and run the registered handler in the
    /// current frame.
    fn call_native(&mut self, callee: MethodId, total_args: usize) -> VmResult<()> {
        let (class_name, name, descriptor) = {
            let method = self.heap.method(callee);
            (
                self.heap.class(method.owner).name.clone(),
                method.name.clone(),
                method.descriptor.clone(),
            )
        };
        let mut args = vec![TaggedValue::null(); total_args];
        for slot in (0..total_args).rev() {
            args[slot] = self.frames.pop()?;
        }

        let Interpreter { heap, natives, .. } = self;
        let handler = natives.lookup(&class_name, &name, &descriptor).ok_or_else(|| {
            VmError::new(
                VmErrorKind::MissingNative,
                format!("no native implementation for {}.{}{}", class_name, name, descriptor),
            )
        })?;
        let result = handler(heap, &args)?;

        if let Some(value) = result {
            self.frames.push(value)?;
        }
        Ok(())
    }

    // ----- constant-pool access -----

    fn load_constant(&mut self, state: &ExecState, index: u16) -> VmResult<()> {
        let constant = self.pool_entry(state, index)?;
        match constant {
            Constant::Integer(value) => self.frames.push(TaggedValue::int(value)),
            Constant::Str(text) => {
                // String constants materialize as char arrays; there
                // is no string class in the core.
                self.maybe_collect();
                let units: Vec<u16> = text.encode_utf16().collect();
                let mut array = HeapObject::new_array(TypeTag::Char, units.len());
                for (slot, unit) in units.into_iter().enumerate() {
                    array.slots[slot] = TaggedValue::char(unit);
                }
                let handle = self.heap.allocate(array)?;
                self.frames.push(handle.to_value())
            }
            Constant::Class { .. } => Err(VmError::new(
                VmErrorKind::UnsupportedOpcode,
                "ldc of a class constant is not implemented",
            )),
            other => Err(VmError::new(
                VmErrorKind::MalformedClass,
                format!("ldc of a {} constant", other.kind_name()),
            )),
        }
    }

    fn pool_entry(&self, state: &ExecState, index: u16) -> VmResult<Constant> {
        let owner = self.heap.method(state.method).owner;
        self.heap.class(owner).constant_pool.get(index).cloned()
    }

    fn class_ref(&self, state: &ExecState, index: u16) -> VmResult<String> {
        let owner = self.heap.method(state.method).owner;
        Ok(self
            .heap
            .class(owner)
            .constant_pool
            .class_at(index)?
            .to_string())
    }

    fn field_ref(&self, state: &ExecState, index: u16) -> VmResult<(String, String, String)> {
        let owner = self.heap.method(state.method).owner;
        let (class, name, descriptor) =
            self.heap.class(owner).constant_pool.field_ref_at(index)?;
        Ok((class.to_string(), name.to_string(), descriptor.to_string()))
    }

    fn method_ref(&self, state: &ExecState, index: u16) -> VmResult<(String, String, String)> {
        let owner = self.heap.method(state.method).owner;
        let (class, name, descriptor) =
            self.heap.class(owner).constant_pool.method_ref_at(index)?;
        Ok((class.to_string(), name.to_string(), descriptor.to_string()))
    }
}

/// Apply a branch offset relative to the current opcode byte.
fn branch(state: &mut ExecState, offset: i16) -> VmResult<()> {
    let target = state.insn_pc as i64 + offset as i64;
    if target < 0 || target as usize >= state.code.len() {
        return Err(VmError::new(
            VmErrorKind::MalformedClass,
            format!("branch target {} outside the method", target),
        ));
    }
    state.pc = target as usize;
    Ok(())
}

fn check_index(index: i32, length: usize) -> VmResult<()> {
    if index < 0 || index as usize >= length {
        return Err(VmError::new(
            VmErrorKind::IndexOutOfBounds,
            format!("index {} into an array of length {}", index, length),
        ));
    }
    Ok(())
}

fn declared_args(descriptor: &str) -> VmResult<usize> {
    arg_count_of(descriptor).ok_or_else(|| {
        VmError::new(
            VmErrorKind::MalformedClass,
            format!("bad method descriptor '{}'", descriptor),
        )
    })
}

fn no_field(class: &str, field: &str) -> VmError {
    VmError::new(
        VmErrorKind::FieldNotFound,
        format!("no field {} on {}", field, class),
    )
}

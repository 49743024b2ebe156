//! Bytecode opcode constants, mnemonics and a linear disassembler.
//!
//! The instruction stream is a byte stream: one opcode byte followed
//! by that opcode's operand bytes. Branch operands are signed 16-bit
//! offsets relative to the position of the opcode byte.

// Constants and nulls
pub const NOP: u8 = 0;
pub const ACONST_NULL: u8 = 1;
pub const ICONST_M1: u8 = 2;
pub const ICONST_0: u8 = 3;
pub const ICONST_1: u8 = 4;
pub const ICONST_2: u8 = 5;
pub const ICONST_3: u8 = 6;
pub const ICONST_4: u8 = 7;
pub const ICONST_5: u8 = 8;
pub const BIPUSH: u8 = 16;
pub const SIPUSH: u8 = 17;
pub const LDC: u8 = 18;

// Local loads and stores
pub const ILOAD: u8 = 21;
pub const ALOAD: u8 = 25;
pub const ILOAD_0: u8 = 26;
pub const ILOAD_1: u8 = 27;
pub const ILOAD_2: u8 = 28;
pub const ILOAD_3: u8 = 29;
pub const ALOAD_0: u8 = 42;
pub const ALOAD_1: u8 = 43;
pub const ALOAD_2: u8 = 44;
pub const ALOAD_3: u8 = 45;
pub const ISTORE: u8 = 54;
pub const ASTORE: u8 = 58;
pub const ISTORE_0: u8 = 59;
pub const ISTORE_1: u8 = 60;
pub const ISTORE_2: u8 = 61;
pub const ISTORE_3: u8 = 62;
pub const ASTORE_0: u8 = 75;
pub const ASTORE_1: u8 = 76;
pub const ASTORE_2: u8 = 77;
pub const ASTORE_3: u8 = 78;

// Array loads and stores
pub const IALOAD: u8 = 46;
pub const AALOAD: u8 = 50;
pub const IASTORE: u8 = 79;
pub const AASTORE: u8 = 83;

// Operand-stack shuffling
pub const POP: u8 = 87;
pub const POP2: u8 = 88;
pub const DUP: u8 = 89;
pub const DUP_X1: u8 = 90;
pub const SWAP: u8 = 95;

// Integer arithmetic
pub const IADD: u8 = 96;
pub const ISUB: u8 = 100;
pub const IMUL: u8 = 104;
pub const IDIV: u8 = 108;
pub const IREM: u8 = 112;
pub const INEG: u8 = 116;
pub const ISHL: u8 = 120;
pub const ISHR: u8 = 122;
pub const IUSHR: u8 = 124;
pub const IAND: u8 = 126;
pub const IOR: u8 = 128;
pub const IXOR: u8 = 130;
pub const IINC: u8 = 132;

// Branches
pub const IFEQ: u8 = 153;
pub const IFNE: u8 = 154;
pub const IFLT: u8 = 155;
pub const IFGE: u8 = 156;
pub const IFGT: u8 = 157;
pub const IFLE: u8 = 158;
pub const IF_ICMPEQ: u8 = 159;
pub const IF_ICMPNE: u8 = 160;
pub const IF_ICMPLT: u8 = 161;
pub const IF_ICMPGE: u8 = 162;
pub const IF_ICMPGT: u8 = 163;
pub const IF_ICMPLE: u8 = 164;
pub const IF_ACMPEQ: u8 = 165;
pub const IF_ACMPNE: u8 = 166;
pub const GOTO: u8 = 167;
pub const IFNULL: u8 = 198;
pub const IFNONNULL: u8 = 199;

// Returns
pub const IRETURN: u8 = 172;
pub const ARETURN: u8 = 176;
pub const RETURN: u8 = 177;

// Fields and methods
pub const GETSTATIC: u8 = 178;
pub const PUTSTATIC: u8 = 179;
pub const GETFIELD: u8 = 180;
pub const PUTFIELD: u8 = 181;
pub const INVOKEVIRTUAL: u8 = 182;
pub const INVOKESPECIAL: u8 = 183;
pub const INVOKESTATIC: u8 = 184;

// Object and array creation
pub const NEW: u8 = 187;
pub const NEWARRAY: u8 = 188;
pub const ANEWARRAY: u8 = 189;
pub const ARRAYLENGTH: u8 = 190;
pub const MULTIANEWARRAY: u8 = 197;

// Recognized but unimplemented (kept for diagnostics)
pub const MONITORENTER: u8 = 194;
pub const MONITOREXIT: u8 = 195;

/// Mnemonics for the full standard opcode range.
const MNEMONICS: &[&str] = &[
    "nop", "aconst_null", "iconst_m1", "iconst_0", "iconst_1", "iconst_2", "iconst_3",
    "iconst_4", "iconst_5", "lconst_0", "lconst_1", "fconst_0", "fconst_1", "fconst_2",
    "dconst_0", "dconst_1", "bipush", "sipush", "ldc", "ldc_w", "ldc2_w", "iload",
    "lload", "fload", "dload", "aload", "iload_0", "iload_1", "iload_2", "iload_3",
    "lload_0", "lload_1", "lload_2", "lload_3", "fload_0", "fload_1", "fload_2",
    "fload_3", "dload_0", "dload_1", "dload_2", "dload_3", "aload_0", "aload_1",
    "aload_2", "aload_3", "iaload", "laload", "faload", "daload", "aaload", "baload",
    "caload", "saload", "istore", "lstore", "fstore", "dstore", "astore", "istore_0",
    "istore_1", "istore_2", "istore_3", "lstore_0", "lstore_1", "lstore_2", "lstore_3",
    "fstore_0", "fstore_1", "fstore_2", "fstore_3", "dstore_0", "dstore_1", "dstore_2",
    "dstore_3", "astore_0", "astore_1", "astore_2", "astore_3", "iastore", "lastore",
    "fastore", "dastore", "aastore", "bastore", "castore", "sastore", "pop", "pop2",
    "dup", "dup_x1", "dup_x2", "dup2", "dup2_x1", "dup2_x2", "swap", "iadd", "ladd",
    "fadd", "dadd", "isub", "lsub", "fsub", "dsub", "imul", "lmul", "fmul", "dmul",
    "idiv", "ldiv", "fdiv", "ddiv", "irem", "lrem", "frem", "drem", "ineg", "lneg",
    "fneg", "dneg", "ishl", "lshl", "ishr", "lshr", "iushr", "lushr", "iand", "land",
    "ior", "lor", "ixor", "lxor", "iinc", "i2l", "i2f", "i2d", "l2i", "l2f", "l2d",
    "f2i", "f2l", "f2d", "d2i", "d2l", "d2f", "i2b", "i2c", "i2s", "lcmp", "fcmpl",
    "fcmpg", "dcmpl", "dcmpg", "ifeq", "ifne", "iflt", "ifge", "ifgt", "ifle",
    "if_icmpeq", "if_icmpne", "if_icmplt", "if_icmpge", "if_icmpgt", "if_icmple",
    "if_acmpeq", "if_acmpne", "goto", "jsr", "ret", "tableswitch", "lookupswitch",
    "ireturn", "lreturn", "freturn", "dreturn", "areturn", "return", "getstatic",
    "putstatic", "getfield", "putfield", "invokevirtual", "invokespecial",
    "invokestatic", "invokeinterface", "invokedynamic", "new", "newarray", "anewarray",
    "arraylength", "athrow", "checkcast", "instanceof", "monitorenter", "monitorexit",
    "wide", "multianewarray", "ifnull", "ifnonnull", "goto_w", "jsr_w",
];

/// Mnemonic of an opcode byte, or `None` outside the known range.
///
/// The interpreter uses this to split fatal conditions: a byte with a
/// mnemonic but no implementation is unsupported, a byte without one
/// is unknown.
pub fn mnemonic(op: u8) -> Option<&'static str> {
    MNEMONICS.get(op as usize).copied()
}

/// Number of operand bytes following an opcode, or `None` when the
/// opcode is unknown or variable-length (`tableswitch`, `lookupswitch`,
/// `wide`).
pub fn operand_width(op: u8) -> Option<usize> {
    match op {
        BIPUSH | LDC | NEWARRAY | 21..=25 | 54..=58 | 169 => Some(1),
        SIPUSH | 19 | 20 | IINC | 153..=168 | 178..=184 | NEW | ANEWARRAY | 192 | 193
        | IFNULL | IFNONNULL => Some(2),
        MULTIANEWARRAY => Some(3),
        185 | 186 | 200 | 201 => Some(4),
        170 | 171 | 196 => None,
        op if (op as usize) < MNEMONICS.len() => Some(0),
        _ => None,
    }
}

/// Whether an opcode's 2-byte operand is a branch offset relative to
/// the opcode byte.
pub fn is_branch(op: u8) -> bool {
    matches!(op, 153..=168 | IFNULL | IFNONNULL)
}

/// Render a method's bytecode, one instruction per line.
///
/// Stops with a trailing note if it reaches an opcode it cannot size.
pub fn disassemble(code: &[u8]) -> String {
    let mut out = String::new();
    let mut pc = 0;
    while pc < code.len() {
        let op = code[pc];
        let Some(name) = mnemonic(op) else {
            out.push_str(&format!("{:5}  .byte {}\n", pc, op));
            break;
        };
        let Some(width) = operand_width(op) else {
            out.push_str(&format!("{:5}  {} (variable length, stopping)\n", pc, name));
            break;
        };
        if pc + 1 + width > code.len() {
            out.push_str(&format!("{:5}  {} (truncated operands)\n", pc, name));
            break;
        }

        out.push_str(&format!("{:5}  {}", pc, name));
        if is_branch(op) && width == 2 {
            let offset = i16::from_be_bytes([code[pc + 1], code[pc + 2]]);
            let target = pc as isize + offset as isize;
            out.push_str(&format!(" {}", target));
        } else {
            for operand in &code[pc + 1..pc + 1 + width] {
                out.push_str(&format!(" {}", operand));
            }
        }
        out.push('\n');
        pc += 1 + width;
    }
    out
}

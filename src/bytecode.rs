//! The instruction model of a method body.
//!
//! Instructions are grouped by shape rather than by opcode: `iadd` is
//! `Arith(ArithOp::Add, NumericType::Int)`, `if_icmplt L3` is
//! `IfICmp(Condition::Lt, 3)`. The `Display` implementation renders the
//! familiar mnemonics.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::descriptor::{MethodDescriptor, ValueType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericType {
    Int,
    Long,
    Float,
    Double,
}

impl NumericType {
    pub const ALL: [NumericType; 4] = [
        NumericType::Int,
        NumericType::Long,
        NumericType::Float,
        NumericType::Double,
    ];

    pub fn slot_width(self) -> u16 {
        match self {
            NumericType::Long | NumericType::Double => 2,
            NumericType::Int | NumericType::Float => 1,
        }
    }

    pub fn prefix(self) -> char {
        match self {
            NumericType::Int => 'i',
            NumericType::Long => 'l',
            NumericType::Float => 'f',
            NumericType::Double => 'd',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NumericType::Int => "int",
            NumericType::Long => "long",
            NumericType::Float => "float",
            NumericType::Double => "double",
        }
    }
}

/// Operand type of bitwise and shift instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntegerType {
    Int,
    Long,
}

impl From<IntegerType> for NumericType {
    fn from(t: IntegerType) -> Self {
        match t {
            IntegerType::Int => NumericType::Int,
            IntegerType::Long => NumericType::Long,
        }
    }
}

/// Type tag of local variable loads, stores and returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocalType {
    Int,
    Long,
    Float,
    Double,
    Reference,
}

impl LocalType {
    pub fn slot_width(self) -> u16 {
        match self {
            LocalType::Long | LocalType::Double => 2,
            _ => 1,
        }
    }

    pub fn numeric(self) -> Option<NumericType> {
        match self {
            LocalType::Int => Some(NumericType::Int),
            LocalType::Long => Some(NumericType::Long),
            LocalType::Float => Some(NumericType::Float),
            LocalType::Double => Some(NumericType::Double),
            LocalType::Reference => None,
        }
    }

    fn prefix(self) -> char {
        match self.numeric() {
            Some(numeric) => numeric.prefix(),
            None => 'a',
        }
    }
}

impl From<NumericType> for LocalType {
    fn from(t: NumericType) -> Self {
        match t {
            NumericType::Int => LocalType::Int,
            NumericType::Long => LocalType::Long,
            NumericType::Float => LocalType::Float,
            NumericType::Double => LocalType::Double,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithOp {
    pub const ALL: [ArithOp; 5] = [
        ArithOp::Add,
        ArithOp::Sub,
        ArithOp::Mul,
        ArithOp::Div,
        ArithOp::Rem,
    ];

    pub fn mnemonic(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
            ArithOp::Rem => "rem",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicOp {
    And,
    Or,
    Xor,
}

impl LogicOp {
    pub const ALL: [LogicOp; 3] = [LogicOp::And, LogicOp::Or, LogicOp::Xor];

    pub fn mnemonic(self) -> &'static str {
        match self {
            LogicOp::And => "and",
            LogicOp::Or => "or",
            LogicOp::Xor => "xor",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            LogicOp::And => "&",
            LogicOp::Or => "|",
            LogicOp::Xor => "^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShiftOp {
    Shl,
    Shr,
    UShr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    LCmp,
    FCmpL,
    FCmpG,
    DCmpL,
    DCmpG,
}

/// Branch condition of the `if<cond>` and `if_icmp<cond>` families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Eq,
    Ne,
    Lt,
    Ge,
    Gt,
    Le,
}

impl Condition {
    pub const ALL: [Condition; 6] = [
        Condition::Eq,
        Condition::Ne,
        Condition::Lt,
        Condition::Ge,
        Condition::Gt,
        Condition::Le,
    ];

    pub fn mnemonic(self) -> &'static str {
        match self {
            Condition::Eq => "eq",
            Condition::Ne => "ne",
            Condition::Lt => "lt",
            Condition::Ge => "ge",
            Condition::Gt => "gt",
            Condition::Le => "le",
        }
    }
}

pub type Label = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvokeKind {
    Virtual,
    Special,
    Static,
    Interface,
}

impl InvokeKind {
    /// Whether the call consumes a receiver below its arguments.
    pub fn has_receiver(self) -> bool {
        !matches!(self, InvokeKind::Static)
    }
}

/// Symbolic reference to a method, as found at a call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub kind: InvokeKind,
    pub owner: String,
    pub name: String,
    pub descriptor: MethodDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub owner: String,
    pub name: String,
    pub descriptor: ValueType,
}

/// Operand of the generic load-constant instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Class(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Nop,

    AConstNull,
    /// Dedicated short form, -1 to 5.
    IConst(i32),
    /// Dedicated short form, 0 or 1.
    LConst(i64),
    /// Dedicated short form, 0, 1 or 2.
    FConst(f32),
    /// Dedicated short form, 0 or 1.
    DConst(f64),
    BiPush(i8),
    SiPush(i16),
    Ldc(Constant),

    Load(LocalType, u16),
    Store(LocalType, u16),
    IInc(u16, i16),

    Arith(ArithOp, NumericType),
    Neg(NumericType),
    Logic(LogicOp, IntegerType),
    Shift(ShiftOp, IntegerType),
    Convert(NumericType, NumericType),
    Compare(CompareOp),

    If(Condition, Label),
    IfICmp(Condition, Label),
    /// Only `Eq` and `Ne` are meaningful.
    IfACmp(Condition, Label),
    IfNull(Label),
    IfNonNull(Label),
    Goto(Label),

    Pop,
    Pop2,
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Swap,

    Invoke(MethodRef),
    GetField(FieldRef),
    PutField(FieldRef),
    GetStatic(FieldRef),
    PutStatic(FieldRef),

    New(String),
    CheckCast(String),
    InstanceOf(String),
    ArrayLength,
    AThrow,

    Return,
    ValueReturn(LocalType),

    /// Branch target marker.
    Label(Label),
    /// Source line of the following instructions.
    Line(u32),
}

impl Instruction {
    /// Pseudo instructions carry no code.
    pub fn is_pseudo(&self) -> bool {
        matches!(self, Instruction::Label(_) | Instruction::Line(_))
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(v) => write!(f, "{v}"),
            Constant::Long(v) => write!(f, "{v}L"),
            Constant::Float(v) => write!(f, "{v:?}f"),
            Constant::Double(v) => write!(f, "{v:?}"),
            Constant::String(s) => write!(f, "{s:?}"),
            Constant::Class(c) => write!(f, "{c}.class"),
        }
    }
}

fn invoke_mnemonic(kind: InvokeKind) -> &'static str {
    match kind {
        InvokeKind::Virtual => "invokevirtual",
        InvokeKind::Special => "invokespecial",
        InvokeKind::Static => "invokestatic",
        InvokeKind::Interface => "invokeinterface",
    }
}

fn compare_mnemonic(op: CompareOp) -> &'static str {
    match op {
        CompareOp::LCmp => "lcmp",
        CompareOp::FCmpL => "fcmpl",
        CompareOp::FCmpG => "fcmpg",
        CompareOp::DCmpL => "dcmpl",
        CompareOp::DCmpG => "dcmpg",
    }
}

fn shift_mnemonic(op: ShiftOp) -> &'static str {
    match op {
        ShiftOp::Shl => "shl",
        ShiftOp::Shr => "shr",
        ShiftOp::UShr => "ushr",
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match self {
            Nop => write!(f, "nop"),
            AConstNull => write!(f, "aconst_null"),
            IConst(-1) => write!(f, "iconst_m1"),
            IConst(v) => write!(f, "iconst_{v}"),
            LConst(v) => write!(f, "lconst_{v}"),
            FConst(v) => write!(f, "fconst_{}", *v as i32),
            DConst(v) => write!(f, "dconst_{}", *v as i32),
            BiPush(v) => write!(f, "bipush {v}"),
            SiPush(v) => write!(f, "sipush {v}"),
            Ldc(c) => write!(f, "ldc {c}"),
            Load(t, index) => write!(f, "{}load {index}", t.prefix()),
            Store(t, index) => write!(f, "{}store {index}", t.prefix()),
            IInc(index, delta) => write!(f, "iinc {index} {delta}"),
            Arith(op, t) => write!(f, "{}{}", t.prefix(), op.mnemonic()),
            Neg(t) => write!(f, "{}neg", t.prefix()),
            Logic(op, t) => write!(f, "{}{}", NumericType::from(*t).prefix(), op.mnemonic()),
            Shift(op, t) => write!(f, "{}{}", NumericType::from(*t).prefix(), shift_mnemonic(*op)),
            Convert(from, to) => write!(f, "{}2{}", from.prefix(), to.prefix()),
            Compare(op) => write!(f, "{}", compare_mnemonic(*op)),
            If(c, label) => write!(f, "if{} L{label}", c.mnemonic()),
            IfICmp(c, label) => write!(f, "if_icmp{} L{label}", c.mnemonic()),
            IfACmp(c, label) => write!(f, "if_acmp{} L{label}", c.mnemonic()),
            IfNull(label) => write!(f, "ifnull L{label}"),
            IfNonNull(label) => write!(f, "ifnonnull L{label}"),
            Goto(label) => write!(f, "goto L{label}"),
            Pop => write!(f, "pop"),
            Pop2 => write!(f, "pop2"),
            Dup => write!(f, "dup"),
            DupX1 => write!(f, "dup_x1"),
            DupX2 => write!(f, "dup_x2"),
            Dup2 => write!(f, "dup2"),
            Dup2X1 => write!(f, "dup2_x1"),
            Dup2X2 => write!(f, "dup2_x2"),
            Swap => write!(f, "swap"),
            Invoke(m) => write!(
                f,
                "{} {}.{}{}",
                invoke_mnemonic(m.kind),
                m.owner,
                m.name,
                m.descriptor
            ),
            GetField(r) => write!(f, "getfield {}.{}:{}", r.owner, r.name, r.descriptor),
            PutField(r) => write!(f, "putfield {}.{}:{}", r.owner, r.name, r.descriptor),
            GetStatic(r) => write!(f, "getstatic {}.{}:{}", r.owner, r.name, r.descriptor),
            PutStatic(r) => write!(f, "putstatic {}.{}:{}", r.owner, r.name, r.descriptor),
            New(class) => write!(f, "new {class}"),
            CheckCast(class) => write!(f, "checkcast {class}"),
            InstanceOf(class) => write!(f, "instanceof {class}"),
            ArrayLength => write!(f, "arraylength"),
            AThrow => write!(f, "athrow"),
            Return => write!(f, "return"),
            ValueReturn(t) => write!(f, "{}return", t.prefix()),
            Label(label) => write!(f, "L{label}:"),
            Line(line) => write!(f, "line {line}"),
        }
    }
}

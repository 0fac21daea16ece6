//! Zero-copy views over a flat IR buffer
//!
//! Views are small `Copy` handles (buffer + table position). Each accessor
//! resolves its own field through the table's vtable; nothing is decoded
//! ahead of time and no accessor depends on another having been called.

use std::marker::PhantomData;

use crate::buffer::{FlatBuf, SIZE_UOFFSET};
use crate::error::{FormatError, Result};
use crate::instruction::{Instr, Operation};
use crate::operand::{CodeRange, FrozenString, Operand, TemporaryVariable};
use crate::schema::{self, OperandType};
use crate::scope::Scope;

/// Encoding assumed when a string carries no encoding name
pub const DEFAULT_ENCODING: &str = "ASCII-8BIT";

/// A table located in a buffer
#[derive(Clone, Copy)]
struct Table<'a> {
    buf: FlatBuf<'a>,
    loc: usize,
}

impl std::fmt::Debug for Table<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Table@{}", self.loc)
    }
}

impl<'a> Table<'a> {
    #[inline]
    fn field(&self, slot: u16) -> Result<Option<usize>> {
        self.buf.field_offset(self.loc, slot)
    }

    fn u8_or(&self, slot: u16, default: u8) -> Result<u8> {
        match self.field(slot)? {
            Some(pos) => self.buf.read_u8(pos),
            None => Ok(default),
        }
    }

    fn u32_opt(&self, slot: u16) -> Result<Option<u32>> {
        self.field(slot)?.map(|pos| self.buf.read_u32(pos)).transpose()
    }

    fn u32_or(&self, slot: u16, default: u32) -> Result<u32> {
        Ok(self.u32_opt(slot)?.unwrap_or(default))
    }

    fn bool_or(&self, slot: u16, default: bool) -> Result<bool> {
        Ok(self.u8_or(slot, default as u8)? != 0)
    }

    /// Follow a reference field to the referenced object
    fn reference(&self, slot: u16) -> Result<Option<usize>> {
        self.field(slot)?.map(|pos| self.buf.indirect(pos)).transpose()
    }

    fn bytes(&self, slot: u16) -> Result<Option<&'a [u8]>> {
        self.reference(slot)?
            .map(|pos| self.buf.string_at(pos))
            .transpose()
    }

    fn str(&self, slot: u16, field: &'static str) -> Result<Option<&'a str>> {
        self.reference(slot)?
            .map(|pos| self.buf.str_at(pos, field))
            .transpose()
    }

    fn vector<T: Follow<'a>>(&self, slot: u16) -> Result<Vector<'a, T>> {
        match self.reference(slot)? {
            Some(pos) => Vector::at(self.buf, pos),
            None => Ok(Vector::empty(self.buf)),
        }
    }
}

/// Construct a view from a table position
pub trait Follow<'a>: Sized {
    /// Build the view for the table at `loc`
    fn follow(buf: FlatBuf<'a>, loc: usize) -> Self;
}

/// Vector of references to tables
pub struct Vector<'a, T> {
    buf: FlatBuf<'a>,
    data: usize,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T> Clone for Vector<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Vector<'_, T> {}

impl<T> std::fmt::Debug for Vector<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Vector@{}[{}]", self.data, self.len)
    }
}

impl<'a, T: Follow<'a>> Vector<'a, T> {
    fn at(buf: FlatBuf<'a>, pos: usize) -> Result<Self> {
        let (len, data) = buf.vector(pos, SIZE_UOFFSET)?;
        Ok(Self {
            buf,
            data,
            len,
            _marker: PhantomData,
        })
    }

    fn empty(buf: FlatBuf<'a>) -> Self {
        Self {
            buf,
            data: 0,
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the vector is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Result<T> {
        if index >= self.len {
            return Err(FormatError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        let loc = self.buf.indirect(self.data + index * SIZE_UOFFSET)?;
        Ok(T::follow(self.buf, loc))
    }

    /// Iterate over all elements
    pub fn iter(self) -> impl Iterator<Item = Result<T>> + 'a
    where
        T: 'a,
    {
        (0..self.len).map(move |i| self.get(i))
    }
}

macro_rules! view {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name<'a> {
            table: Table<'a>,
        }

        impl<'a> Follow<'a> for $name<'a> {
            fn follow(buf: FlatBuf<'a>, loc: usize) -> Self {
                Self {
                    table: Table { buf, loc },
                }
            }
        }

        impl $name<'_> {
            /// Absolute position of the table in the buffer
            #[inline]
            pub fn location(&self) -> usize {
                self.table.loc
            }
        }
    };
}

view!(
    /// View of a `Scope` table
    ScopeView
);
view!(
    /// View of a `Closure` table
    ClosureView
);
view!(
    /// View of an `Instruction` table
    InstrView
);
view!(
    /// View of an `Operand` table
    OperandView
);
view!(
    /// View of a `FrozenString` table
    FrozenStringView
);
view!(
    /// View of a `StringLiteral` table
    StringLiteralView
);
view!(
    /// View of a `TemporaryVariable` table
    TemporaryVariableView
);

/// View of the scope table at `offset`
pub fn scope_at(bytes: &[u8], offset: usize) -> Result<ScopeView<'_>> {
    let buf = FlatBuf::new(bytes);
    buf.vtable(offset)?;
    Ok(ScopeView::follow(buf, offset))
}

/// View of the root scope of a finished buffer
pub fn root_scope(bytes: &[u8]) -> Result<ScopeView<'_>> {
    let root = FlatBuf::new(bytes).indirect(0)?;
    scope_at(bytes, root)
}

impl<'a> ScopeView<'a> {
    /// Scope name (empty when absent)
    pub fn name(&self) -> Result<&'a str> {
        Ok(self.table.str(schema::scope::NAME, "name")?.unwrap_or(""))
    }

    /// Source file (empty when absent)
    pub fn file(&self) -> Result<&'a str> {
        Ok(self.table.str(schema::scope::FILE, "file")?.unwrap_or(""))
    }

    /// First source line
    pub fn line(&self) -> Result<u32> {
        self.table.u32_or(schema::scope::LINE, 0)
    }

    /// Closures defined in this scope
    pub fn nested_closures(&self) -> Result<Vector<'a, ClosureView<'a>>> {
        self.table.vector(schema::scope::NESTED_CLOSURES)
    }

    /// Number of nested closures
    pub fn nested_closures_len(&self) -> Result<usize> {
        Ok(self.nested_closures()?.len())
    }

    /// Lexically nested scopes
    pub fn lexical_children(&self) -> Result<Vector<'a, ScopeView<'a>>> {
        self.table.vector(schema::scope::LEXICAL_CHILDREN)
    }

    /// Lexical child at `index`
    pub fn lexical_child(&self, index: usize) -> Result<ScopeView<'a>> {
        self.lexical_children()?.get(index)
    }

    /// Number of lexical children
    pub fn lexical_children_len(&self) -> Result<usize> {
        Ok(self.lexical_children()?.len())
    }

    /// Instruction vector
    pub fn instrs(&self) -> Result<Vector<'a, InstrView<'a>>> {
        self.table.vector(schema::scope::INSTRS)
    }

    /// Instruction at `index`
    pub fn instr(&self, index: usize) -> Result<InstrView<'a>> {
        self.instrs()?.get(index)
    }

    /// Number of instructions
    pub fn instrs_len(&self) -> Result<usize> {
        Ok(self.instrs()?.len())
    }

    /// Temp registers needed to run the body (0 when absent)
    pub fn temp_variables(&self) -> Result<u32> {
        self.table.u32_or(schema::scope::TEMP_VARIABLES, 0)
    }

    /// Keyword argument flag (false when absent)
    pub fn accepts_keyword_arguments(&self) -> Result<bool> {
        self.table
            .bool_or(schema::scope::ACCEPTS_KEYWORD_ARGUMENTS, false)
    }

    /// Decode the whole scope tree into IR
    pub fn to_ir(&self) -> Result<Scope> {
        Ok(Scope {
            name: self.name()?.to_owned(),
            file: self.file()?.to_owned(),
            line: self.line()?,
            lexical_children: self
                .lexical_children()?
                .iter()
                .map(|child| child?.to_ir())
                .collect::<Result<_>>()?,
            closures: self
                .nested_closures()?
                .iter()
                .map(|closure| closure?.scope()?.to_ir())
                .collect::<Result<_>>()?,
            instrs: self
                .instrs()?
                .iter()
                .map(|instr| instr?.to_ir())
                .collect::<Result<_>>()?,
            temp_variables: self.temp_variables()?,
            accepts_keyword_arguments: self.accepts_keyword_arguments()?,
        })
    }
}

impl<'a> ClosureView<'a> {
    /// Body of the closure
    pub fn scope(&self) -> Result<ScopeView<'a>> {
        self.table
            .reference(schema::closure::SCOPE)?
            .map(|loc| ScopeView::follow(self.table.buf, loc))
            .ok_or(FormatError::MissingField {
                table: "Closure",
                field: "scope",
            })
    }
}

impl<'a> InstrView<'a> {
    /// Raw operation tag
    pub fn operation_tag(&self) -> Result<u8> {
        self.table.u8_or(schema::instruction::OPERATION, 0)
    }

    /// Decoded operation
    pub fn operation(&self) -> Result<Operation> {
        Operation::from_wire(self.operation_tag()?)
    }

    /// Operand vector
    pub fn operands(&self) -> Result<Vector<'a, OperandView<'a>>> {
        self.table.vector(schema::instruction::OPERANDS)
    }

    /// Operand at `index`
    pub fn operand(&self, index: usize) -> Result<OperandView<'a>> {
        self.operands()?.get(index)
    }

    /// Number of operands
    pub fn operands_len(&self) -> Result<usize> {
        Ok(self.operands()?.len())
    }

    /// Result register, if any
    pub fn result(&self) -> Result<Option<TemporaryVariableView<'a>>> {
        Ok(self
            .table
            .reference(schema::instruction::RESULT)?
            .map(|loc| TemporaryVariableView::follow(self.table.buf, loc)))
    }

    /// Method name of a call
    pub fn name(&self) -> Result<Option<&'a str>> {
        self.table.str(schema::instruction::NAME, "name")
    }

    /// Line payload (0 when absent)
    pub fn line(&self) -> Result<u32> {
        self.table.u32_or(schema::instruction::LINE, 0)
    }

    /// Decode into IR
    pub fn to_ir(&self) -> Result<Instr> {
        let operation = self.operation()?;
        let line = match operation {
            Operation::LineNumber => Some(self.line()?),
            _ => self.table.u32_opt(schema::instruction::LINE)?,
        };
        Ok(Instr {
            operation,
            operands: self
                .operands()?
                .iter()
                .map(|operand| operand?.to_ir())
                .collect::<Result<_>>()?,
            result: self.result()?.map(|r| r.to_ir()).transpose()?,
            name: self.name()?.map(str::to_owned),
            line,
        })
    }
}

/// Decoded operand union
#[derive(Debug, Clone, Copy)]
pub enum OperandRef<'a> {
    /// Frozen string literal
    FrozenString(FrozenStringView<'a>),
    /// String literal
    StringLiteral(StringLiteralView<'a>),
    /// Temporary variable
    TemporaryVariable(TemporaryVariableView<'a>),
    /// Lexically enclosing scope
    CurrentScope,
    /// Module of the lexically enclosing scope
    ScopeModule,
    /// Receiver
    SelfValue,
}

impl<'a> OperandView<'a> {
    /// Raw union tag
    pub fn operand_type_tag(&self) -> Result<u8> {
        self.table.u8_or(schema::operand::OPERAND_TYPE, 0)
    }

    /// Decoded union tag
    pub fn operand_type(&self) -> Result<OperandType> {
        OperandType::from_byte(self.operand_type_tag()?)
    }

    fn value(&self) -> Result<usize> {
        self.table
            .reference(schema::operand::OPERAND)?
            .ok_or(FormatError::MissingField {
                table: "Operand",
                field: "operand",
            })
    }

    /// Decode the union
    pub fn kind(&self) -> Result<OperandRef<'a>> {
        let buf = self.table.buf;
        match self.operand_type()? {
            OperandType::None => Err(FormatError::MissingField {
                table: "Operand",
                field: "operand_type",
            }),
            OperandType::StringLiteral => Ok(OperandRef::StringLiteral(
                StringLiteralView::follow(buf, self.value()?),
            )),
            OperandType::FrozenString => Ok(OperandRef::FrozenString(FrozenStringView::follow(
                buf,
                self.value()?,
            ))),
            OperandType::TemporaryVariable => Ok(OperandRef::TemporaryVariable(
                TemporaryVariableView::follow(buf, self.value()?),
            )),
            OperandType::CurrentScope => Ok(OperandRef::CurrentScope),
            OperandType::ScopeModule => Ok(OperandRef::ScopeModule),
            OperandType::SelfValue => Ok(OperandRef::SelfValue),
        }
    }

    fn expect(&self, expected: OperandType) -> Result<usize> {
        let found = self.operand_type()?;
        if found != expected {
            return Err(FormatError::OperandTypeMismatch {
                expected: expected.name(),
                found: found.name(),
            });
        }
        self.value()
    }

    /// Union value as a frozen string
    pub fn as_frozen_string(&self) -> Result<FrozenStringView<'a>> {
        let loc = self.expect(OperandType::FrozenString)?;
        Ok(FrozenStringView::follow(self.table.buf, loc))
    }

    /// Union value as a string literal
    pub fn as_string_literal(&self) -> Result<StringLiteralView<'a>> {
        let loc = self.expect(OperandType::StringLiteral)?;
        Ok(StringLiteralView::follow(self.table.buf, loc))
    }

    /// Union value as a temporary variable
    pub fn as_temporary_variable(&self) -> Result<TemporaryVariableView<'a>> {
        let loc = self.expect(OperandType::TemporaryVariable)?;
        Ok(TemporaryVariableView::follow(self.table.buf, loc))
    }

    /// Decode into IR
    pub fn to_ir(&self) -> Result<Operand> {
        Ok(match self.kind()? {
            OperandRef::FrozenString(s) => Operand::FrozenString(s.to_ir()?),
            OperandRef::StringLiteral(s) => Operand::StringLiteral(s.frozen()?.to_ir()?),
            OperandRef::TemporaryVariable(t) => Operand::TemporaryVariable(t.to_ir()?),
            OperandRef::CurrentScope => Operand::CurrentScope,
            OperandRef::ScopeModule => Operand::ScopeModule,
            OperandRef::SelfValue => Operand::SelfValue,
        })
    }
}

impl<'a> FrozenStringView<'a> {
    /// Raw bytes (empty when absent)
    pub fn bytes(&self) -> Result<&'a [u8]> {
        Ok(self
            .table
            .bytes(schema::frozen_string::BYTES)?
            .unwrap_or_default())
    }

    /// Encoding name ([`DEFAULT_ENCODING`] when absent)
    pub fn encoding(&self) -> Result<&'a str> {
        Ok(self
            .table
            .str(schema::frozen_string::ENCODING, "encoding")?
            .unwrap_or(DEFAULT_ENCODING))
    }

    /// Stored code range
    pub fn coderange(&self) -> Result<CodeRange> {
        CodeRange::from_byte(self.table.u8_or(schema::frozen_string::CODERANGE, 0)?)
    }

    /// Source file (empty when absent)
    pub fn file(&self) -> Result<&'a str> {
        Ok(self
            .table
            .str(schema::frozen_string::FILE, "file")?
            .unwrap_or(""))
    }

    /// Source line
    pub fn line(&self) -> Result<u32> {
        self.table.u32_or(schema::frozen_string::LINE, 0)
    }

    /// Decode into IR
    pub fn to_ir(&self) -> Result<FrozenString> {
        Ok(FrozenString {
            bytes: self.bytes()?.to_vec(),
            encoding: self.encoding()?.to_owned(),
            coderange: self.coderange()?,
            file: self.file()?.to_owned(),
            line: self.line()?,
        })
    }
}

impl<'a> StringLiteralView<'a> {
    /// The wrapped frozen string
    pub fn frozen(&self) -> Result<FrozenStringView<'a>> {
        self.table
            .reference(schema::string_literal::FROZEN)?
            .map(|loc| FrozenStringView::follow(self.table.buf, loc))
            .ok_or(FormatError::MissingField {
                table: "StringLiteral",
                field: "frozen",
            })
    }
}

impl TemporaryVariableView<'_> {
    /// Register index (0 when absent)
    pub fn offset(&self) -> Result<u32> {
        self.table.u32_or(schema::temporary_variable::OFFSET, 0)
    }

    /// Decode into IR
    pub fn to_ir(&self) -> Result<TemporaryVariable> {
        Ok(TemporaryVariable(self.offset()?))
    }
}

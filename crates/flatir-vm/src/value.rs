//! Runtime values
//!
//! Values are cheap to clone: heap payloads sit behind `Rc`. A run owns its
//! values; only the IR buffer is shared between threads.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::string::RubyString;

/// A Ruby module (or class)
#[derive(Debug, PartialEq, Eq)]
pub struct RubyModule {
    name: String,
}

impl RubyModule {
    /// Create a module
    pub fn new(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self { name: name.into() })
    }

    /// Module name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Lexical scope a body executes in
#[derive(Debug)]
pub struct StaticScope {
    name: String,
    module: Rc<RubyModule>,
    parent: Option<Rc<StaticScope>>,
}

impl StaticScope {
    /// Top-level scope owned by `module`
    pub fn new(name: impl Into<String>, module: Rc<RubyModule>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            module,
            parent: None,
        })
    }

    /// Scope nested inside `parent`
    pub fn nested(
        name: impl Into<String>,
        module: Rc<RubyModule>,
        parent: Rc<StaticScope>,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            module,
            parent: Some(parent),
        })
    }

    /// Scope name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module owning this scope
    pub fn module(&self) -> &Rc<RubyModule> {
        &self.module
    }

    /// Enclosing scope
    pub fn parent(&self) -> Option<&Rc<StaticScope>> {
        self.parent.as_ref()
    }
}

/// A plain object
#[derive(Debug)]
pub struct RubyObject {
    class: Rc<RubyModule>,
    label: Option<String>,
}

impl RubyObject {
    /// Instance of `class`
    pub fn new(class: Rc<RubyModule>) -> Rc<Self> {
        Rc::new(Self { class, label: None })
    }

    /// Instance that inspects as `label` (the top-level `main`)
    pub fn labelled(class: Rc<RubyModule>, label: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            class,
            label: Some(label.into()),
        })
    }

    /// Class of the object
    pub fn class(&self) -> &Rc<RubyModule> {
        &self.class
    }
}

/// A block passed to (or captured by) a frame
#[derive(Debug)]
pub struct Block {
    owner: String,
    self_value: Value,
}

impl Block {
    /// Block defined in scope `owner` with its captured `self`
    pub fn new(owner: impl Into<String>, self_value: Value) -> Rc<Self> {
        Rc::new(Self {
            owner: owner.into(),
            self_value,
        })
    }

    /// Name of the defining scope
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Captured receiver
    pub fn self_value(&self) -> &Value {
        &self.self_value
    }
}

/// A runtime value
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Unset temp register
    #[default]
    Undefined,
    /// `nil`
    Nil,
    /// `true` / `false`
    Bool(bool),
    /// Integer
    Integer(i64),
    /// String
    String(Rc<RefCell<RubyString>>),
    /// Object
    Object(Rc<RubyObject>),
    /// Module
    Module(Rc<RubyModule>),
    /// Lexical scope
    Scope(Rc<StaticScope>),
    /// Block
    Block(Rc<Block>),
}

impl Value {
    /// Wrap a string
    pub fn string(s: RubyString) -> Self {
        Self::String(Rc::new(RefCell::new(s)))
    }

    /// Borrow the string payload, if this is a string
    pub fn as_string(&self) -> Option<Ref<'_, RubyString>> {
        match self {
            Self::String(s) => Some(s.borrow()),
            _ => None,
        }
    }

    /// Check if nil
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Check if this is the unset-register sentinel
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Ruby truthiness: everything except `nil` and `false`
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Nil | Self::Bool(false))
    }

    /// Class name used in diagnostics
    pub fn class_name(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Nil => "NilClass".to_string(),
            Self::Bool(true) => "TrueClass".to_string(),
            Self::Bool(false) => "FalseClass".to_string(),
            Self::Integer(_) => "Integer".to_string(),
            Self::String(_) => "String".to_string(),
            Self::Object(o) => o.class.name().to_string(),
            Self::Module(_) => "Module".to_string(),
            Self::Scope(_) => "StaticScope".to_string(),
            Self::Block(_) => "Proc".to_string(),
        }
    }

    /// `equal?`: identity for heap values, value equality for immediates
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Nil, Self::Nil) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::String(a), Self::String(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Module(a), Self::Module(b)) => Rc::ptr_eq(a, b),
            (Self::Scope(a), Self::Scope(b)) => Rc::ptr_eq(a, b),
            (Self::Block(a), Self::Block(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Ruby `inspect` rendering
    pub fn inspect(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Nil => "nil".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Integer(n) => n.to_string(),
            Self::String(s) => s.borrow().inspect(),
            Self::Object(o) => match &o.label {
                Some(label) => label.clone(),
                None => format!("#<{}>", o.class.name()),
            },
            Self::Module(m) => m.name().to_string(),
            Self::Scope(s) => format!("#<StaticScope {}>", s.name()),
            Self::Block(b) => format!("#<Proc ({})>", b.owner()),
        }
    }
}

/// Structural equality: strings by content, heap objects by identity
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => *a.borrow() == *b.borrow(),
            _ => self.same(other),
        }
    }
}

impl From<RubyString> for Value {
    fn from(s: RubyString) -> Self {
        Self::string(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s.borrow()),
            Self::Nil => Ok(()),
            other => f.write_str(&other.inspect()),
        }
    }
}

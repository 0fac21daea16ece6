//! In-memory IR scope

use serde::{Deserialize, Serialize};

use crate::instruction::Instr;

/// One method, class body, script or closure body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    /// Scope name
    pub name: String,
    /// Source file
    #[serde(default)]
    pub file: String,
    /// First source line
    #[serde(default)]
    pub line: u32,
    /// Scopes lexically nested in this one (classes, modules, methods)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lexical_children: Vec<Scope>,
    /// Closures defined directly in this scope
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub closures: Vec<Scope>,
    /// Body, executed in order
    pub instrs: Vec<Instr>,
    /// Number of temp registers the body uses
    pub temp_variables: u32,
    /// Whether the scope takes keyword arguments
    #[serde(default)]
    pub accepts_keyword_arguments: bool,
}

impl Scope {
    /// Create a new scope builder
    pub fn builder(name: impl Into<String>) -> ScopeBuilder {
        ScopeBuilder::new(name)
    }
}

/// Builder for creating scopes
#[derive(Debug)]
pub struct ScopeBuilder {
    scope: Scope,
}

impl ScopeBuilder {
    /// Create a new scope builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            scope: Scope {
                name: name.into(),
                file: String::new(),
                line: 0,
                lexical_children: Vec::new(),
                closures: Vec::new(),
                instrs: Vec::new(),
                temp_variables: 0,
                accepts_keyword_arguments: false,
            },
        }
    }

    /// Set source file and first line
    pub fn location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.scope.file = file.into();
        self.scope.line = line;
        self
    }

    /// Add an instruction
    pub fn instruction(mut self, instr: Instr) -> Self {
        self.scope.instrs.push(instr);
        self
    }

    /// Add instructions
    pub fn instructions(mut self, instrs: impl IntoIterator<Item = Instr>) -> Self {
        self.scope.instrs.extend(instrs);
        self
    }

    /// Add a lexical child scope
    pub fn lexical_child(mut self, child: Scope) -> Self {
        self.scope.lexical_children.push(child);
        self
    }

    /// Add a closure
    pub fn closure(mut self, closure: Scope) -> Self {
        self.scope.closures.push(closure);
        self
    }

    /// Set temp register count
    pub fn temp_variables(mut self, count: u32) -> Self {
        self.scope.temp_variables = count;
        self
    }

    /// Set keyword argument flag
    pub fn accepts_keyword_arguments(mut self, value: bool) -> Self {
        self.scope.accepts_keyword_arguments = value;
        self
    }

    /// Build the scope
    pub fn build(self) -> Scope {
        self.scope
    }
}

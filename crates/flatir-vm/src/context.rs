//! Per-invocation frame state
//!
//! A [`Frame`] carries the ambient state the instruction stream refers to
//! without naming it: the receiver, the lexical scope, the blocks, and the
//! current source position.

use std::rc::Rc;

use crate::value::{Block, RubyModule, RubyObject, StaticScope, Value};

/// Ambient state of one scope invocation
#[derive(Debug, Clone)]
pub struct Frame {
    self_value: Value,
    scope: Rc<StaticScope>,
    block: Value,
    frame_block: Value,
    file: String,
    line: u32,
}

impl Frame {
    /// Start building a frame
    pub fn builder() -> FrameBuilder {
        FrameBuilder::default()
    }

    /// Top-level frame: `self` is `main`, an instance of `Object`
    pub fn top_level() -> Self {
        Self::builder().build()
    }

    /// Receiver
    #[inline]
    pub fn self_value(&self) -> &Value {
        &self.self_value
    }

    /// Lexical scope
    #[inline]
    pub fn scope(&self) -> &Rc<StaticScope> {
        &self.scope
    }

    /// Module owning the lexical scope
    #[inline]
    pub fn module(&self) -> &Rc<RubyModule> {
        self.scope.module()
    }

    /// Block passed at the call site (`nil` when none)
    #[inline]
    pub fn block(&self) -> &Value {
        &self.block
    }

    /// Block captured by the enclosing frame (`nil` when none)
    #[inline]
    pub fn frame_block(&self) -> &Value {
        &self.frame_block
    }

    /// Current source file
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Current source line
    #[inline]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Update the current source line
    #[inline]
    pub fn set_line(&mut self, line: u32) {
        self.line = line;
    }

    /// Update the current source file
    pub fn set_file(&mut self, file: impl Into<String>) {
        self.file = file.into();
    }
}

/// Builder for [`Frame`]
#[derive(Debug, Default)]
pub struct FrameBuilder {
    self_value: Option<Value>,
    module: Option<Rc<RubyModule>>,
    scope: Option<Rc<StaticScope>>,
    self_name: Option<String>,
    block: Option<Rc<Block>>,
    frame_block: Option<Rc<Block>>,
    file: String,
    line: u32,
}

impl FrameBuilder {
    /// Set the receiver
    pub fn self_value(mut self, value: Value) -> Self {
        self.self_value = Some(value);
        self
    }

    /// Label of the default top-level receiver (`main`)
    pub fn self_name(mut self, name: impl Into<String>) -> Self {
        self.self_name = Some(name.into());
        self
    }

    /// Module owning the default scope (`Object`)
    pub fn module(mut self, module: Rc<RubyModule>) -> Self {
        self.module = Some(module);
        self
    }

    /// Set the lexical scope
    pub fn scope(mut self, scope: Rc<StaticScope>) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Set the call-site block
    pub fn block(mut self, block: Rc<Block>) -> Self {
        self.block = Some(block);
        self
    }

    /// Set the captured frame block
    pub fn frame_block(mut self, block: Rc<Block>) -> Self {
        self.frame_block = Some(block);
        self
    }

    /// Set the initial source position
    pub fn location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = file.into();
        self.line = line;
        self
    }

    /// Build the frame
    pub fn build(self) -> Frame {
        let module = match (&self.scope, self.module) {
            (Some(scope), None) => scope.module().clone(),
            (_, Some(module)) => module,
            (None, None) => RubyModule::new("Object"),
        };
        let scope = self
            .scope
            .unwrap_or_else(|| StaticScope::new("main", module.clone()));
        let self_value = self.self_value.unwrap_or_else(|| {
            let label = self.self_name.unwrap_or_else(|| "main".to_string());
            Value::Object(RubyObject::labelled(module, label))
        });

        Frame {
            self_value,
            scope,
            block: self.block.map_or(Value::Nil, Value::Block),
            frame_block: self.frame_block.map_or(Value::Nil, Value::Block),
            file: self.file,
            line: self.line,
        }
    }
}

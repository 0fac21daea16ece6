//! Method dispatch for call instructions

use tracing::trace;

use crate::context::Frame;
use crate::error::{VmError, VmResult};
use crate::value::Value;

/// Performs the calls an instruction stream makes
pub trait Dispatcher {
    /// Call `receiver.name(arg)` without a block
    fn call_one(
        &mut self,
        receiver: &Value,
        name: &str,
        arg: &Value,
        frame: &Frame,
    ) -> VmResult<Value>;
}

/// Dispatcher with the handful of core methods the runtime provides natively
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinDispatcher;

impl BuiltinDispatcher {
    /// Create a new dispatcher
    pub fn new() -> Self {
        Self
    }

    fn string_method(receiver: &Value, name: &str, arg: &Value) -> Option<VmResult<Value>> {
        let Value::String(recv) = receiver else {
            return None;
        };
        let result = match name {
            "+" => {
                let Some(other) = arg.as_string() else {
                    return Some(Err(no_implicit_conversion(arg)));
                };
                recv.borrow().concat(&other).map(Value::string)
            }
            "==" | "eql?" => Ok(Value::Bool(
                arg.as_string()
                    .is_some_and(|other| recv.borrow().ruby_eq(&other)),
            )),
            "<<" => {
                // Copy first: `s << s` borrows the same cell twice
                let Some(other) = arg.as_string().map(|s| s.clone()) else {
                    return Some(Err(no_implicit_conversion(arg)));
                };
                recv.borrow_mut()
                    .append(&other)
                    .map(|()| receiver.clone())
            }
            _ => return None,
        };
        Some(result)
    }

    fn object_method(receiver: &Value, name: &str, arg: &Value) -> Option<Value> {
        match name {
            "==" | "equal?" => Some(Value::Bool(receiver.same(arg))),
            _ => None,
        }
    }
}

fn no_implicit_conversion(arg: &Value) -> VmError {
    VmError::type_error(format!(
        "no implicit conversion of {} into String",
        arg.class_name()
    ))
}

impl Dispatcher for BuiltinDispatcher {
    fn call_one(
        &mut self,
        receiver: &Value,
        name: &str,
        arg: &Value,
        frame: &Frame,
    ) -> VmResult<Value> {
        trace!(
            receiver = %receiver.class_name(),
            method = name,
            line = frame.line(),
            "call"
        );

        if name == "!=" {
            let eq = self.call_one(receiver, "==", arg, frame)?;
            return Ok(Value::Bool(!eq.is_truthy()));
        }
        if let Some(result) = Self::string_method(receiver, name, arg) {
            return result;
        }
        if let Some(value) = Self::object_method(receiver, name, arg) {
            return Ok(value);
        }

        Err(VmError::NoMethod {
            name: name.to_string(),
            receiver: receiver.inspect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string::RubyString;
    use flatir_format::CodeRange;

    fn call(receiver: &Value, name: &str, arg: &Value) -> VmResult<Value> {
        BuiltinDispatcher::new().call_one(receiver, name, arg, &Frame::top_level())
    }

    fn frozen(s: &str) -> Value {
        Value::string(RubyString::literal(
            s.as_bytes(),
            crate::string::Encoding::UTF_8,
            CodeRange::Unknown,
        ))
    }

    #[test]
    fn test_string_plus() {
        let result = call(&frozen("foo"), "+", &frozen("bar")).unwrap();
        let s = result.as_string().unwrap();
        assert_eq!(s.as_bytes(), b"foobar");
        assert!(!s.is_frozen());
    }

    #[test]
    fn test_string_plus_requires_string() {
        let err = call(&frozen("foo"), "+", &Value::Integer(1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: no implicit conversion of Integer into String"
        );
    }

    #[test]
    fn test_string_equality() {
        let a = frozen("x");
        assert_eq!(call(&a, "==", &frozen("x")).unwrap(), Value::Bool(true));
        assert_eq!(call(&a, "eql?", &frozen("y")).unwrap(), Value::Bool(false));
        assert_eq!(call(&a, "!=", &frozen("y")).unwrap(), Value::Bool(true));
        assert_eq!(call(&a, "==", &Value::Nil).unwrap(), Value::Bool(false));
        assert_eq!(call(&a, "equal?", &frozen("x")).unwrap(), Value::Bool(false));
        assert_eq!(call(&a, "equal?", &a).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_append() {
        let s = Value::string(RubyString::utf8("ab"));
        let result = call(&s, "<<", &frozen("c")).unwrap();
        assert!(result.same(&s));
        assert_eq!(s.as_string().unwrap().as_bytes(), b"abc");

        // Appending a string to itself
        call(&s, "<<", &s.clone()).unwrap();
        assert_eq!(s.as_string().unwrap().as_bytes(), b"abcabc");
    }

    #[test]
    fn test_append_to_frozen() {
        let err = call(&frozen("lit"), "<<", &frozen("!")).unwrap_err();
        assert!(matches!(err, VmError::Frozen(_)));
    }

    #[test]
    fn test_object_equality() {
        let frame = Frame::top_level();
        let main = frame.self_value();
        assert_eq!(call(main, "==", main).unwrap(), Value::Bool(true));
        assert_eq!(call(main, "!=", &Value::Nil).unwrap(), Value::Bool(true));
        assert_eq!(
            call(&Value::Nil, "==", &Value::Nil).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_no_method() {
        let err = call(&Value::Nil, "upcase", &Value::Nil).unwrap_err();
        assert_eq!(
            err.to_string(),
            "NoMethodError: undefined method `upcase' for nil"
        );
    }
}

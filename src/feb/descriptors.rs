use super::{BinaryName, Name};

/// Utility trait for converting descriptors to their string representations
pub trait RenderDescriptor {
    /// Turn the descriptor into a string
    fn render(&self) -> String {
        let mut string = String::new();
        self.render_to(&mut string);
        string
    }

    /// Write the descriptor to a string
    fn render_to(&self, write_to: &mut String);
}

/// Primitive value types
///
/// Source-level values are always objects, but the runtime kernel exchanges some primitives with
/// generated code (eg. truth tests return `i`).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BaseType {
    Boolean,
    Integer,
    Long,
    Float,
    Double,
}

impl RenderDescriptor for BaseType {
    fn render_to(&self, write_to: &mut String) {
        let c = match self {
            BaseType::Boolean => 'z',
            BaseType::Integer => 'i',
            BaseType::Long => 'l',
            BaseType::Float => 'f',
            BaseType::Double => 'd',
        };
        write_to.push(c);
    }
}

impl RenderDescriptor for BinaryName {
    fn render_to(&self, write_to: &mut String) {
        write_to.push('@');
        write_to.push_str(self.as_str());
        write_to.push(';');
    }
}

/// Types of values that can be stored in fields, locals, or on the operand stack
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum FieldType {
    Base(BaseType),
    Object(BinaryName),
}

impl FieldType {
    /// The type of every source-level value
    pub const OBJECT: FieldType = FieldType::Object(BinaryName::OBJECT);

    pub const fn integer() -> FieldType {
        FieldType::Base(BaseType::Integer)
    }

    pub const fn object(class: BinaryName) -> FieldType {
        FieldType::Object(class)
    }
}

impl RenderDescriptor for FieldType {
    fn render_to(&self, write_to: &mut String) {
        match self {
            FieldType::Base(base) => base.render_to(write_to),
            FieldType::Object(class) => class.render_to(write_to),
        }
    }
}

/// Function type
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct FunctionDescriptor {
    pub parameters: Vec<FieldType>,

    /// Return type for the function (`None` is for `void` functions)
    pub return_type: Option<FieldType>,
}

impl FunctionDescriptor {
    /// Descriptor of a source-level function: `arity` objects in, one object out
    pub fn dynamic(arity: usize) -> FunctionDescriptor {
        FunctionDescriptor {
            parameters: vec![FieldType::OBJECT; arity],
            return_type: Some(FieldType::OBJECT),
        }
    }

    /// Descriptor of an initializer taking `arity` objects
    pub fn initializer(arity: usize) -> FunctionDescriptor {
        FunctionDescriptor {
            parameters: vec![FieldType::OBJECT; arity],
            return_type: None,
        }
    }

    /// Net number of operand stack slots consumed when invoking a function with this descriptor
    ///
    /// The receiver (if any) is not included.
    pub fn stack_effect(&self) -> isize {
        let returned = if self.return_type.is_some() { 1 } else { 0 };
        returned - self.parameters.len() as isize
    }
}

impl RenderDescriptor for FunctionDescriptor {
    fn render_to(&self, write_to: &mut String) {
        write_to.push('(');
        for parameter in &self.parameters {
            parameter.render_to(write_to);
        }
        write_to.push(')');
        match &self.return_type {
            None => write_to.push('v'),
            Some(return_type) => return_type.render_to(write_to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_function_descriptors() {
        assert_eq!(FunctionDescriptor::dynamic(0).render(), "()@zen/core/Object;");
        assert_eq!(
            FunctionDescriptor::dynamic(2).render(),
            "(@zen/core/Object;@zen/core/Object;)@zen/core/Object;"
        );
        assert_eq!(FunctionDescriptor::initializer(1).render(), "(@zen/core/Object;)v");

        let is_true = FunctionDescriptor {
            parameters: vec![FieldType::OBJECT],
            return_type: Some(FieldType::Base(BaseType::Boolean)),
        };
        assert_eq!(is_true.render(), "(@zen/core/Object;)z");
    }
}

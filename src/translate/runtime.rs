use crate::feb::{
    BaseType, BinaryName, FieldRef, FieldType, FunctionDescriptor, FunctionRef, Opcode,
    UnqualifiedName,
};

/// Runtime functions that generated code calls into
///
/// Operators, truth tests, dynamic member access and the iterator, locking and resource
/// protocols are all implemented by the runtime rather than by dedicated opcodes.
#[derive(Copy, Clone, Hash, PartialEq, Eq, Debug)]
pub enum RuntimeFunction {
    /// `ZenKernel.evaluate(left, right, symbol)`
    EvaluateBinary,

    /// `ZenKernel.evaluate(operand, symbol)`
    EvaluateUnary,

    /// `ZenKernel.isTrue(value)`, leaving `0` or `1` for the conditional jumps
    IsTrue,

    /// Box a raw constant loaded with `LoadCpr`
    NewInteger,
    NewLong,
    NewFloat,
    NewDouble,

    /// `ZenKernel.loadField(object, name)`
    LoadField,

    /// `ZenKernel.storeField(object, name, value)`, which returns `value`
    StoreField,

    /// `ZenKernel.loadSubscript(object, index)`
    LoadSubscript,

    /// `ZenKernel.storeSubscript(object, index, value)`, which returns `value`
    StoreSubscript,

    /// Iterator protocol (dispatched on the receiver)
    GetIterator,
    HasNext,
    GetNext,

    /// Monitor of any object
    Acquire,
    Release,

    /// Resource protocol (dispatched on the receiver)
    Close,

    /// Attach an exception to another as suppressed
    Suppress,

    /// Call a value as a function (dispatched on the receiver, arity given)
    Invoke(usize),

    ListInitialize,
    ListAdd,
    MapInitialize,
    MapPut,
}

impl RuntimeFunction {
    /// Instruction used to call the function
    pub fn invoke_type(self) -> Opcode {
        match self {
            RuntimeFunction::EvaluateBinary
            | RuntimeFunction::EvaluateUnary
            | RuntimeFunction::IsTrue
            | RuntimeFunction::NewInteger
            | RuntimeFunction::NewLong
            | RuntimeFunction::NewFloat
            | RuntimeFunction::NewDouble
            | RuntimeFunction::LoadField
            | RuntimeFunction::StoreField
            | RuntimeFunction::LoadSubscript
            | RuntimeFunction::StoreSubscript => Opcode::InvokeStatic,

            RuntimeFunction::GetIterator
            | RuntimeFunction::HasNext
            | RuntimeFunction::GetNext
            | RuntimeFunction::Close
            | RuntimeFunction::Invoke(_) => Opcode::InvokeDynamic,

            RuntimeFunction::Acquire
            | RuntimeFunction::Release
            | RuntimeFunction::Suppress
            | RuntimeFunction::ListAdd
            | RuntimeFunction::MapPut => Opcode::InvokeVirtual,

            RuntimeFunction::ListInitialize | RuntimeFunction::MapInitialize => {
                Opcode::InvokeSpecial
            }
        }
    }

    /// Reference to the function, ready to be interned
    pub fn function_ref(self) -> FunctionRef {
        let object = FieldType::OBJECT;
        let string = FieldType::object(BinaryName::STRING);

        let (class, name, parameters, return_type) = match self {
            RuntimeFunction::EvaluateBinary => (
                BinaryName::KERNEL,
                UnqualifiedName::EVALUATE,
                vec![object.clone(), object.clone(), string],
                Some(object),
            ),
            RuntimeFunction::EvaluateUnary => (
                BinaryName::KERNEL,
                UnqualifiedName::EVALUATE,
                vec![object.clone(), string],
                Some(object),
            ),
            RuntimeFunction::IsTrue => (
                BinaryName::KERNEL,
                UnqualifiedName::ISTRUE,
                vec![object],
                Some(FieldType::Base(BaseType::Boolean)),
            ),
            RuntimeFunction::NewInteger => Self::boxing(BinaryName::INTEGER, BaseType::Integer),
            RuntimeFunction::NewLong => Self::boxing(BinaryName::LONG, BaseType::Long),
            RuntimeFunction::NewFloat => Self::boxing(BinaryName::FLOAT, BaseType::Float),
            RuntimeFunction::NewDouble => Self::boxing(BinaryName::DOUBLE, BaseType::Double),
            RuntimeFunction::LoadField => (
                BinaryName::KERNEL,
                UnqualifiedName::LOADFIELD,
                vec![object.clone(), string],
                Some(object),
            ),
            RuntimeFunction::StoreField => (
                BinaryName::KERNEL,
                UnqualifiedName::STOREFIELD,
                vec![object.clone(), string, object.clone()],
                Some(object),
            ),
            RuntimeFunction::LoadSubscript => (
                BinaryName::KERNEL,
                UnqualifiedName::LOADSUBSCRIPT,
                vec![object.clone(), object.clone()],
                Some(object),
            ),
            RuntimeFunction::StoreSubscript => (
                BinaryName::KERNEL,
                UnqualifiedName::STORESUBSCRIPT,
                vec![object.clone(), object.clone(), object.clone()],
                Some(object),
            ),
            RuntimeFunction::GetIterator => {
                (BinaryName::OBJECT, UnqualifiedName::GETITERATOR, vec![], Some(object))
            }
            RuntimeFunction::HasNext => {
                (BinaryName::OBJECT, UnqualifiedName::HASNEXT, vec![], Some(object))
            }
            RuntimeFunction::GetNext => {
                (BinaryName::OBJECT, UnqualifiedName::GETNEXT, vec![], Some(object))
            }
            RuntimeFunction::Acquire => {
                (BinaryName::OBJECT, UnqualifiedName::ACQUIRE, vec![], None)
            }
            RuntimeFunction::Release => {
                (BinaryName::OBJECT, UnqualifiedName::RELEASE, vec![], None)
            }
            RuntimeFunction::Close => {
                (BinaryName::OBJECT, UnqualifiedName::CLOSE, vec![], Some(object))
            }
            RuntimeFunction::Suppress => (
                BinaryName::EXCEPTION,
                UnqualifiedName::SUPPRESS,
                vec![FieldType::object(BinaryName::EXCEPTION)],
                None,
            ),
            RuntimeFunction::Invoke(arity) => (
                BinaryName::OBJECT,
                UnqualifiedName::INVOKE,
                vec![object.clone(); arity],
                Some(object),
            ),
            RuntimeFunction::ListInitialize => {
                (BinaryName::LIST, UnqualifiedName::INITIALIZE, vec![], None)
            }
            RuntimeFunction::ListAdd => (BinaryName::LIST, UnqualifiedName::ADD, vec![object], None),
            RuntimeFunction::MapInitialize => {
                (BinaryName::MAP, UnqualifiedName::INITIALIZE, vec![], None)
            }
            RuntimeFunction::MapPut => (
                BinaryName::MAP,
                UnqualifiedName::PUTVALUE,
                vec![object.clone(), object],
                None,
            ),
        };

        FunctionRef {
            class,
            name,
            descriptor: FunctionDescriptor {
                parameters,
                return_type,
            },
            table_index: 0,
        }
    }

    fn boxing(
        class: BinaryName,
        primitive: BaseType,
    ) -> (BinaryName, UnqualifiedName, Vec<FieldType>, Option<FieldType>) {
        let boxed = FieldType::object(class.clone());
        (
            class,
            UnqualifiedName::NEWINSTANCE,
            vec![FieldType::Base(primitive)],
            Some(boxed),
        )
    }
}

/// Static fields of the runtime that generated code reads
#[derive(Copy, Clone, Hash, PartialEq, Eq, Debug)]
pub enum RuntimeField {
    True,
    False,
}

impl RuntimeField {
    pub fn field_ref(self) -> FieldRef {
        let name = match self {
            RuntimeField::True => UnqualifiedName::TRUE,
            RuntimeField::False => UnqualifiedName::FALSE,
        };
        FieldRef {
            class: BinaryName::BOOLEAN,
            name,
            descriptor: FieldType::object(BinaryName::BOOLEAN),
        }
    }
}

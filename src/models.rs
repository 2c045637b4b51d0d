// src/models.rs

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

// --- RUNTIME VALUES ---
// Values flow in both directions: declared defaults go into the schema, parsed
// command-line input comes back out as keyword arguments.

/// A dynamically typed value passed to or returned from a declared callable.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absent value (a `None` default).
    None,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Str(String),
    /// An ordered sequence, the default container representation.
    List(Vec<Value>),
    /// An insertion-ordered collection without duplicates.
    Set(Vec<Value>),
    /// A fixed sequence.
    Tuple(Vec<Value>),
    /// Ordered key/value pairs.
    Dict(Vec<(Value, Value)>),
    /// A member of a native enumeration.
    Enum(EnumValue),
    /// A structured group or a constructed receiver.
    Object(Instance),
}

impl Value {
    /// Builds a `Set`, dropping repeated items while keeping first-seen order.
    pub fn set_from(items: impl IntoIterator<Item = Value>) -> Self {
        let mut unique: Vec<Value> = Vec::new();
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        Value::Set(unique)
    }

    /// Returns `true` for `Value::None`.
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Items of any sequence-like value (`List`, `Set`, `Tuple`).
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// The container kind of a sequence-like value.
    pub fn container_kind(&self) -> Option<ContainerKind> {
        match self {
            Value::List(_) => Some(ContainerKind::List),
            Value::Set(_) => Some(ContainerKind::Set),
            Value::Tuple(_) => Some(ContainerKind::Tuple),
            _ => None,
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    f.write_str(close)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("none"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => write_seq(f, "[", items, "]"),
            Value::Set(items) => write_seq(f, "{", items, "}"),
            Value::Tuple(items) => write_seq(f, "(", items, ")"),
            Value::Dict(pairs) => {
                f.write_str("{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
            Value::Enum(member) => f.write_str(&member.name),
            Value::Object(instance) => write!(f, "{}", instance),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::None => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) | Value::Set(items) | Value::Tuple(items) => {
                serializer.collect_seq(items)
            }
            Value::Dict(pairs) => {
                serializer.collect_map(pairs.iter().map(|(key, value)| (key.to_string(), value)))
            }
            Value::Enum(member) => serializer.serialize_str(&member.name),
            Value::Object(instance) => {
                serializer.collect_map(instance.fields.iter().map(|(name, value)| (name, value)))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Object(instance)
    }
}

/// A named, typed record: a rebuilt structured group or a receiver object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Instance {
    /// The model or class name.
    pub type_name: String,
    /// Field values in declaration order.
    pub fields: Vec<(String, Value)>,
}

impl Instance {
    /// Creates an instance with no fields.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{ ", self.type_name)?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        f.write_str(" }")
    }
}

// --- ENUMERATIONS AND MODELS ---

/// The stored representation of an enumeration member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumRepr {
    /// Integer-backed member.
    Int(i64),
    /// String-backed member.
    Str(String),
}

impl fmt::Display for EnumRepr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumRepr::Int(i) => write!(f, "{}", i),
            EnumRepr::Str(s) => f.write_str(s),
        }
    }
}

/// Whether an enumeration is a native one or an external name/value table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumKind {
    /// Parsed input becomes a `Value::Enum`.
    Native,
    /// Parsed input becomes the raw integer value; defaults are raw integers
    /// displayed through the name table.
    Wrapper,
}

/// One member of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    /// The member name shown on the command line.
    pub name: String,
    /// The underlying value.
    pub repr: EnumRepr,
}

/// An enumeration type that can appear in an annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    /// Display name used in help text.
    pub name: String,
    /// Members in declaration order.
    pub members: Vec<EnumMember>,
    /// Native enum or external wrapper.
    pub kind: EnumKind,
}

fn int_members(members: &[(&str, i64)]) -> impl Iterator<Item = (String, EnumRepr)> {
    members
        .iter()
        .map(|(member, value)| ((*member).to_string(), EnumRepr::Int(*value)))
}

impl EnumDef {
    /// A native enumeration with integer values.
    pub fn native(name: impl Into<String>, members: &[(&str, i64)]) -> Self {
        Self::with_kind(name, int_members(members), EnumKind::Native)
    }

    /// A native enumeration with string values.
    pub fn native_str(name: impl Into<String>, members: &[(&str, &str)]) -> Self {
        let members = members
            .iter()
            .map(|(member, value)| ((*member).to_string(), EnumRepr::Str((*value).to_string())));
        Self::with_kind(name, members, EnumKind::Native)
    }

    /// An external enum-like wrapper exposing name and value tables.
    pub fn wrapper(name: impl Into<String>, members: &[(&str, i64)]) -> Self {
        Self::with_kind(name, int_members(members), EnumKind::Wrapper)
    }

    fn with_kind(
        name: impl Into<String>,
        members: impl Iterator<Item = (String, EnumRepr)>,
        kind: EnumKind,
    ) -> Self {
        Self {
            name: name.into(),
            members: members.map(|(member, repr)| EnumMember { name: member, repr }).collect(),
            kind,
        }
    }

    /// Member names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name.as_str()).collect()
    }

    /// The member name for a raw value, as wrapper tables expose it.
    pub fn name_of(&self, repr: &EnumRepr) -> Option<&str> {
        self.members
            .iter()
            .find(|m| &m.repr == repr)
            .map(|m| m.name.as_str())
    }

    /// Finds a member by name first, then by its underlying value.
    pub fn find(&self, token: &str) -> Option<&EnumMember> {
        if let Some(member) = self.members.iter().find(|m| m.name == token) {
            return Some(member);
        }
        let repr = match token.parse::<i64>() {
            Ok(i) => EnumRepr::Int(i),
            Err(_) => EnumRepr::Str(token.to_string()),
        };
        self.members.iter().find(|m| m.repr == repr)
    }

    /// Builds the value a member becomes once parsed.
    pub fn value_of(self: &Arc<Self>, member: &EnumMember) -> Value {
        match (self.kind, &member.repr) {
            (EnumKind::Wrapper, EnumRepr::Int(i)) => Value::Int(*i),
            (EnumKind::Wrapper, EnumRepr::Str(s)) => Value::Str(s.clone()),
            (EnumKind::Native, _) => Value::Enum(EnumValue {
                def: Arc::clone(self),
                name: member.name.clone(),
                repr: member.repr.clone(),
            }),
        }
    }

    /// Convenience for declaring defaults: the value of the member called `name`.
    pub fn member(self: &Arc<Self>, name: &str) -> Option<Value> {
        self.members
            .iter()
            .find(|m| m.name == name)
            .map(|m| self.value_of(m))
    }
}

/// A member of a native enumeration, carried as a value.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    /// The owning enumeration.
    pub def: Arc<EnumDef>,
    /// The member name.
    pub name: String,
    /// The underlying value.
    pub repr: EnumRepr,
}

/// One field of a structured model.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field name; also its flag name.
    pub name: String,
    /// Declared type, if any.
    pub annotation: Option<Annotation>,
    /// Default value; `None` makes the field required.
    pub default: Option<Value>,
}

impl FieldDef {
    /// A required field.
    pub fn required(name: impl Into<String>, annotation: Annotation) -> Self {
        Self {
            name: name.into(),
            annotation: Some(annotation),
            default: None,
        }
    }

    /// A field with a default value.
    pub fn optional(name: impl Into<String>, annotation: Annotation, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            annotation: Some(annotation),
            default: Some(default.into()),
        }
    }
}

/// A structured data model whose fields become a nested group of flags.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDef {
    /// Model name, shown as the argument group heading.
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldDef>,
}

impl ModelDef {
    /// Creates a model from its fields.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }
}

// --- ANNOTATIONS ---

/// Primitive scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// Text.
    Str,
    /// Integer.
    Int,
    /// Floating point.
    Float,
    /// Boolean.
    Bool,
}

impl ScalarKind {
    /// The primitive name used in help text.
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Str => "str",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Bool => "bool",
        }
    }

    /// Maps a primitive type name to its kind.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "str" | "string" | "String" => Some(ScalarKind::Str),
            "int" | "integer" | "i64" | "i32" | "usize" => Some(ScalarKind::Int),
            "float" | "f64" | "f32" => Some(ScalarKind::Float),
            "bool" | "boolean" => Some(ScalarKind::Bool),
            _ => None,
        }
    }
}

/// Container shapes a parameter can take on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Ordered sequence (also `Iterable`).
    List,
    /// Unique items.
    Set,
    /// Fixed sequence.
    Tuple,
}

impl ContainerKind {
    /// Recognizes container names case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "list" | "iterable" | "sequence" | "vec" => Some(ContainerKind::List),
            "set" => Some(ContainerKind::Set),
            "tuple" => Some(ContainerKind::Tuple),
            _ => None,
        }
    }

    /// The capitalized container name.
    pub fn name(self) -> &'static str {
        match self {
            ContainerKind::List => "List",
            ContainerKind::Set => "Set",
            ContainerKind::Tuple => "Tuple",
        }
    }
}

/// The declared type of a parameter, possibly only known as text.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// A primitive.
    Scalar(ScalarKind),
    /// The absent type, only meaningful as a union member.
    NoneType,
    /// `Optional[inner]`.
    Optional(Box<Annotation>),
    /// A union of members; only `X | None` is supported.
    Union(Vec<Annotation>),
    /// A homogeneous container, with an element type when declared.
    Container(ContainerKind, Option<Box<Annotation>>),
    /// A dict, with key and value types when declared.
    Dict(Option<(Box<Annotation>, Box<Annotation>)>),
    /// An enumeration.
    Enum(Arc<EnumDef>),
    /// A structured model expanded into a group of flags.
    Group(Arc<ModelDef>),
    /// A forward reference kept as text.
    Unresolved(String),
}

impl Annotation {
    /// `str`
    pub fn str() -> Self {
        Annotation::Scalar(ScalarKind::Str)
    }

    /// `int`
    pub fn int() -> Self {
        Annotation::Scalar(ScalarKind::Int)
    }

    /// `float`
    pub fn float() -> Self {
        Annotation::Scalar(ScalarKind::Float)
    }

    /// `bool`
    pub fn bool() -> Self {
        Annotation::Scalar(ScalarKind::Bool)
    }

    /// `List[inner]`
    pub fn list(inner: Annotation) -> Self {
        Annotation::Container(ContainerKind::List, Some(Box::new(inner)))
    }

    /// `Set[inner]`
    pub fn set(inner: Annotation) -> Self {
        Annotation::Container(ContainerKind::Set, Some(Box::new(inner)))
    }

    /// `Tuple[inner, ...]`
    pub fn tuple(inner: Annotation) -> Self {
        Annotation::Container(ContainerKind::Tuple, Some(Box::new(inner)))
    }

    /// `Dict[key, value]`
    pub fn dict(key: Annotation, value: Annotation) -> Self {
        Annotation::Dict(Some((Box::new(key), Box::new(value))))
    }

    /// `Optional[inner]`
    pub fn optional(inner: Annotation) -> Self {
        Annotation::Optional(Box::new(inner))
    }

    /// An enumeration annotation.
    pub fn enumeration(def: &Arc<EnumDef>) -> Self {
        Annotation::Enum(Arc::clone(def))
    }

    /// A structured group annotation.
    pub fn group(model: &Arc<ModelDef>) -> Self {
        Annotation::Group(Arc::clone(model))
    }

    /// A textual annotation resolved later through the module's lookup table.
    pub fn text(raw: impl Into<String>) -> Self {
        Annotation::Unresolved(raw.into())
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::Scalar(kind) => f.write_str(kind.name()),
            Annotation::NoneType => f.write_str("None"),
            Annotation::Optional(inner) => write!(f, "Optional[{}]", inner),
            Annotation::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}", member)?;
                }
                Ok(())
            }
            Annotation::Container(kind, Some(inner)) => write!(f, "{}[{}]", kind.name(), inner),
            Annotation::Container(kind, None) => f.write_str(&kind.name().to_ascii_lowercase()),
            Annotation::Dict(Some((key, value))) => write!(f, "Dict[{}, {}]", key, value),
            Annotation::Dict(None) => f.write_str("dict"),
            Annotation::Enum(def) => f.write_str(&def.name),
            Annotation::Group(model) => f.write_str(&model.name),
            Annotation::Unresolved(raw) => f.write_str(raw),
        }
    }
}

// --- CALLABLES ---

/// The code run when a command is dispatched.
pub type Invoker = Arc<dyn Fn(Invocation) -> anyhow::Result<Value> + Send + Sync>;

/// One declared parameter of a callable.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    /// Parameter name.
    pub name: String,
    /// Declared type, if any.
    pub annotation: Option<Annotation>,
    /// Declared default; `None` means the parameter has no default.
    pub default: Option<Value>,
}

impl ParameterDescriptor {
    /// An un-annotated parameter without a default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            default: None,
        }
    }

    /// Sets the annotation.
    pub fn typed(mut self, annotation: Annotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Whether a default was declared.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// A callable that can be exposed as a command.
#[derive(Clone)]
pub struct CallableDescriptor {
    /// Function name; becomes the command name.
    pub name: String,
    /// Declaring module; selects the lookup table for textual annotations.
    pub module: String,
    /// Docstring with the description and parameter docs.
    pub doc: String,
    /// Parameters in declaration order.
    pub params: Vec<ParameterDescriptor>,
    invoker: Invoker,
}

impl fmt::Debug for CallableDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableDescriptor")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl CallableDescriptor {
    /// Declares a callable with its invoker.
    pub fn new<F>(name: impl Into<String>, invoker: F) -> Self
    where
        F: Fn(Invocation) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            module: String::new(),
            doc: String::new(),
            params: Vec::new(),
            invoker: Arc::new(invoker),
        }
    }

    /// A constructor that builds an `Instance` of `class_name` from its keywords.
    pub fn constructor(class_name: impl Into<String>, params: Vec<ParameterDescriptor>) -> Self {
        let class_name = class_name.into();
        let field_order: Vec<String> = params.iter().map(|p| p.name.clone()).collect();
        let type_name = class_name.clone();
        let mut ctor = Self::new("new", move |mut call: Invocation| {
            let mut instance = Instance::new(type_name.clone());
            for name in &field_order {
                if let Some(value) = call.keywords.remove(name) {
                    instance.fields.push((name.clone(), value));
                }
            }
            Ok(Value::Object(instance))
        });
        ctor.params = params;
        ctor.doc = format!("Initializes {}.", class_name);
        ctor
    }

    /// Sets the declaring module.
    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    /// Sets the docstring.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// Appends a parameter.
    pub fn with_param(mut self, param: ParameterDescriptor) -> Self {
        self.params.push(param);
        self
    }

    /// Runs the invoker.
    pub fn call(&self, invocation: Invocation) -> anyhow::Result<Value> {
        (self.invoker)(invocation)
    }
}

/// A class owning methods exposed as commands.
#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    /// Class name.
    pub name: String,
    /// The constructor this class defines itself, if any.
    pub constructor: Option<Arc<CallableDescriptor>>,
    /// Base class.
    pub parent: Option<Arc<ClassDescriptor>>,
}

impl ClassDescriptor {
    /// A class without its own constructor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constructor: None,
            parent: None,
        }
    }

    /// Defines a field-storing constructor with these parameters.
    pub fn with_constructor(mut self, params: Vec<ParameterDescriptor>) -> Self {
        let ctor = CallableDescriptor::constructor(self.name.clone(), params);
        self.constructor = Some(Arc::new(ctor));
        self
    }

    /// Defines a custom constructor.
    pub fn with_custom_constructor(mut self, ctor: CallableDescriptor) -> Self {
        self.constructor = Some(Arc::new(ctor));
        self
    }

    /// Sets the base class.
    pub fn inherits(mut self, parent: Arc<ClassDescriptor>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Walks up the inheritance chain to the first class defining a constructor.
    pub fn find_constructor(&self) -> Option<(&ClassDescriptor, &Arc<CallableDescriptor>)> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(ctor) = &class.constructor {
                return Some((class, ctor));
            }
            current = class.parent.as_deref();
        }
        None
    }
}

/// The arguments a callable is invoked with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    /// Positional arguments; a constructed receiver comes first.
    pub positional: Vec<Value>,
    /// Keyword arguments by parameter name.
    pub keywords: BTreeMap<String, Value>,
}

impl Invocation {
    /// A keyword argument.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.keywords.get(name)
    }

    /// The receiver object of a method call.
    pub fn receiver(&self) -> Option<&Instance> {
        match self.positional.first() {
            Some(Value::Object(instance)) => Some(instance),
            _ => None,
        }
    }

    fn required(&self, name: &str) -> anyhow::Result<&Value> {
        self.keywords
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Missing argument '{}'.", name))
    }

    /// A keyword argument as an integer.
    pub fn int(&self, name: &str) -> anyhow::Result<i64> {
        match self.required(name)? {
            Value::Int(i) => Ok(*i),
            other => Err(anyhow::anyhow!("Argument '{}' is not an int: {}", name, other)),
        }
    }

    /// A keyword argument as a float; integers are widened.
    pub fn float(&self, name: &str) -> anyhow::Result<f64> {
        match self.required(name)? {
            Value::Float(x) => Ok(*x),
            #[allow(clippy::cast_precision_loss)]
            Value::Int(i) => Ok(*i as f64),
            other => Err(anyhow::anyhow!("Argument '{}' is not a float: {}", name, other)),
        }
    }

    /// A keyword argument as a boolean.
    pub fn bool(&self, name: &str) -> anyhow::Result<bool> {
        match self.required(name)? {
            Value::Bool(b) => Ok(*b),
            other => Err(anyhow::anyhow!("Argument '{}' is not a bool: {}", name, other)),
        }
    }

    /// A keyword argument as a string slice.
    pub fn str(&self, name: &str) -> anyhow::Result<&str> {
        match self.required(name)? {
            Value::Str(s) => Ok(s),
            other => Err(anyhow::anyhow!("Argument '{}' is not a str: {}", name, other)),
        }
    }

    /// A keyword argument as a slice of items; `None` reads as empty.
    pub fn items(&self, name: &str) -> anyhow::Result<&[Value]> {
        match self.required(name)? {
            Value::None => Ok(&[]),
            other => other
                .items()
                .ok_or_else(|| anyhow::anyhow!("Argument '{}' is not a sequence: {}", name, other)),
        }
    }

    /// A keyword argument holding a structured group.
    pub fn object(&self, name: &str) -> anyhow::Result<&Instance> {
        match self.required(name)? {
            Value::Object(instance) => Ok(instance),
            other => Err(anyhow::anyhow!("Argument '{}' is not an object: {}", name, other)),
        }
    }
}

// --- RESOLVED SCHEMA ---

/// The type a single command-line token converts to.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementType {
    /// A primitive.
    Scalar(ScalarKind),
    /// An enumeration member looked up by name or value.
    Enum(Arc<EnumDef>),
    /// A `key=value` entry.
    Dict {
        /// Key type.
        key: Box<ElementType>,
        /// Value type.
        value: Box<ElementType>,
    },
    /// A structured group; expanded by the builder, never parsed directly.
    Group(Arc<ModelDef>),
}

impl ElementType {
    /// The human-readable type name.
    pub fn display_name(&self) -> String {
        match self {
            ElementType::Scalar(kind) => kind.name().to_string(),
            ElementType::Enum(def) => def.name.clone(),
            ElementType::Dict { key, value } => {
                format!("dict[{}, {}]", key.display_name(), value.display_name())
            }
            ElementType::Group(model) => model.name.clone(),
        }
    }
}

/// The normalized, CLI-facing type of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    /// What each token converts to.
    pub element: ElementType,
    /// Name shown between pipes in help text.
    pub type_name: String,
    /// The container the collected tokens form, if any.
    pub container: Option<ContainerKind>,
}

impl TypeSpec {
    /// Whether the parameter is a boolean switch.
    pub fn is_bool(&self) -> bool {
        self.container.is_none() && self.element == ElementType::Scalar(ScalarKind::Bool)
    }

    /// Whether the parameter collects zero or more tokens.
    pub fn is_multi(&self) -> bool {
        self.container.is_some() || matches!(self.element, ElementType::Dict { .. })
    }
}

/// Marks a spec as one field of a structured-group parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOrigin {
    /// The group parameter.
    pub param: String,
    /// The field within the model.
    pub field: String,
}

/// One argument of a command.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentSpec {
    /// Canonical flag name and parsed-value key (`no_x` for inverted booleans).
    pub flag_name: String,
    /// The parameter (or model field) this argument feeds.
    pub param_name: String,
    /// Positional arguments have no default.
    pub positional: bool,
    /// Resolved type.
    pub type_spec: TypeSpec,
    /// Parser-facing default; `None` leaves the key absent when not given.
    pub default: Option<Value>,
    /// Rendered help text.
    pub help_text: String,
    /// The parsed value must be negated and stored under `param_name`.
    pub inverted_boolean: bool,
    /// Set when the argument is a field of a structured group.
    pub group_origin: Option<GroupOrigin>,
}

/// Which fields of a command are reassembled into which group parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBinding {
    /// The parameter receiving the rebuilt group.
    pub param_name: String,
    /// The model to instantiate.
    pub model: Arc<ModelDef>,
    /// The fields consumed to build it.
    pub field_names: Vec<String>,
}

/// Constructor arguments of a class-bound command.
#[derive(Debug, Clone)]
pub struct ConstructorSchema {
    /// The class whose constructor is used.
    pub class_name: String,
    /// The constructor itself.
    pub callable: Arc<CallableDescriptor>,
    /// Constructor arguments in declaration order.
    pub specs: Vec<ArgumentSpec>,
}

impl ConstructorSchema {
    /// The help heading the constructor arguments are rendered under.
    pub fn heading(&self) -> String {
        format!("INITIALIZE CLASS: {}()", self.class_name)
    }
}

/// A fully compiled command.
#[derive(Debug, Clone)]
pub struct CommandSchema {
    /// Command name.
    pub name: String,
    /// Owning command group.
    pub group: Option<String>,
    /// Summary taken from the docstring.
    pub description: String,
    /// Method arguments in declaration order.
    pub argument_specs: Vec<ArgumentSpec>,
    /// Receiver construction, for class-bound commands.
    pub constructor: Option<ConstructorSchema>,
    /// Structured groups to rebuild at dispatch.
    pub group_bindings: Vec<GroupBinding>,
    /// Allocated flags by `flag_name`.
    pub flags: BTreeMap<String, Vec<String>>,
    /// The callable to invoke.
    pub callable: Arc<CallableDescriptor>,
}

impl CommandSchema {
    /// Constructor specs followed by method specs.
    pub fn all_specs(&self) -> impl Iterator<Item = &ArgumentSpec> {
        self.constructor
            .iter()
            .flat_map(|ctor| ctor.specs.iter())
            .chain(self.argument_specs.iter())
    }

    /// `group name` or `name`.
    pub fn qualified_name(&self) -> String {
        match &self.group {
            Some(group) => format!("{} {}", group, self.name),
            None => self.name.clone(),
        }
    }
}

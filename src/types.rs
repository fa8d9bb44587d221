//! Type Names
//!
//! Declared types arrive from the discovery layer as plain strings
//! (`int`, `java.lang.Integer`, `java.util.List<com.acme.Order>`). This module
//! parses them into [`TypeRef`] so that identity, boxing and widening can be
//! decided structurally instead of by string comparison.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::schema::ContainerShape;

// =============================================================================
// Primitive Kinds
// =============================================================================

/// A primitive value kind with a boxed wrapper counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 8] = [
        Self::Boolean,
        Self::Byte,
        Self::Short,
        Self::Char,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
    ];

    /// Keyword spelling of the primitive (`int`, `long`, ...)
    pub fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Char => "char",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    /// Fully qualified name of the wrapper type
    pub fn wrapper_name(&self) -> &'static str {
        match self {
            Self::Boolean => "java.lang.Boolean",
            Self::Byte => "java.lang.Byte",
            Self::Short => "java.lang.Short",
            Self::Char => "java.lang.Character",
            Self::Int => "java.lang.Integer",
            Self::Long => "java.lang.Long",
            Self::Float => "java.lang.Float",
            Self::Double => "java.lang.Double",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Accepts both `java.lang.Integer` and `Integer`
    pub fn from_wrapper_name(name: &str) -> Option<Self> {
        let simple = name.strip_prefix("java.lang.").unwrap_or(name);
        if simple.contains('.') {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|k| k.wrapper_name().rsplit('.').next() == Some(simple))
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Boolean)
    }

    /// Primitive widening: `byte < short < int < long < float < double`, with
    /// `char` widening only to `int` and above. Identity is not widening.
    pub fn widens_to(&self, target: PrimitiveKind) -> bool {
        use PrimitiveKind::*;
        match self {
            Byte => matches!(target, Short | Int | Long | Float | Double),
            Short => matches!(target, Int | Long | Float | Double),
            Char => matches!(target, Int | Long | Float | Double),
            Int => matches!(target, Long | Float | Double),
            Long => matches!(target, Float | Double),
            Float => matches!(target, Double),
            Double | Boolean => false,
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// Type Reference
// =============================================================================

/// A parsed, canonicalised type name.
///
/// Serialises as its canonical string so metadata stays readable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum TypeRef {
    /// `int`, `boolean`, ...
    Primitive(PrimitiveKind),
    /// `java.lang.Integer`, `java.lang.Boolean`, ...
    Boxed(PrimitiveKind),
    /// `byte[]`, `java.lang.Character[]`
    Array(Box<TypeRef>),
    /// `java.util.List<com.acme.Order>`
    Parameterized { raw: String, args: Vec<TypeRef> },
    /// Any other named type, fully qualified where the front end provides it
    Named(String),
}

/// Simple `java.lang` names the front end may hand over unqualified
const JAVA_LANG_ALIASES: [&str; 3] = ["String", "Object", "Number"];

impl TypeRef {
    /// Parse a type name. Never fails: anything unrecognised becomes `Named`.
    pub fn parse(input: &str) -> Self {
        let name = input.trim();

        if let Some(inner) = name.strip_suffix("[]") {
            return Self::Array(Box::new(Self::parse(inner)));
        }

        if let (Some(open), true) = (name.find('<'), name.ends_with('>')) {
            let raw = canonical_container_name(name[..open].trim());
            let args = split_type_args(&name[open + 1..name.len() - 1])
                .into_iter()
                .map(Self::parse)
                .collect();
            return Self::Parameterized { raw, args };
        }

        if let Some(kind) = PrimitiveKind::from_name(name) {
            return Self::Primitive(kind);
        }
        if let Some(kind) = PrimitiveKind::from_wrapper_name(name) {
            return Self::Boxed(kind);
        }
        if JAVA_LANG_ALIASES.contains(&name) {
            return Self::Named(format!("java.lang.{}", name));
        }

        Self::Named(name.to_string())
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// `<container><element>` for a collection-valued field
    pub fn collection_of(shape: ContainerShape, element: TypeRef) -> Self {
        Self::Parameterized {
            raw: shape.container_name().to_string(),
            args: vec![element],
        }
    }

    /// Canonical spelling, used for identity and in messages
    pub fn canonical_name(&self) -> String {
        self.to_string()
    }

    /// Name without type arguments
    pub fn raw_name(&self) -> String {
        match self {
            Self::Parameterized { raw, .. } => raw.clone(),
            other => other.to_string(),
        }
    }

    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self {
            Self::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn as_boxed(&self) -> Option<PrimitiveKind> {
        match self {
            Self::Boxed(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Primitive kind after unboxing, for primitives and wrappers alike
    pub fn unboxed(&self) -> Option<PrimitiveKind> {
        self.as_primitive().or_else(|| self.as_boxed())
    }

    /// First type argument of a parameterized type
    pub fn element_type(&self) -> Option<&TypeRef> {
        match self {
            Self::Parameterized { args, .. } => args.first(),
            _ => None,
        }
    }

    /// Container shape when this names a recognised collection interface
    pub fn container_shape(&self) -> Option<ContainerShape> {
        match self {
            Self::Parameterized { raw, .. } => ContainerShape::from_container_name(raw),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => write!(f, "{}", kind.name()),
            Self::Boxed(kind) => write!(f, "{}", kind.wrapper_name()),
            Self::Array(elem) => write!(f, "{}[]", elem),
            Self::Parameterized { raw, args } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}<{}>", raw, args.join(","))
            }
            Self::Named(name) => write!(f, "{}", name),
        }
    }
}

impl From<String> for TypeRef {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&str> for TypeRef {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<TypeRef> for String {
    fn from(t: TypeRef) -> Self {
        t.to_string()
    }
}

fn canonical_container_name(raw: &str) -> String {
    match raw {
        "List" | "Set" | "Map" | "Collection" => format!("java.util.{}", raw),
        other => other.to_string(),
    }
}

/// Split `A, B<C, D>, E` on top-level commas
fn split_type_args(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, ch) in inner.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    let last = inner[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

// =============================================================================
// Scalar Catalogue
// =============================================================================

/// Types treated as leaf values: never registered, never navigable
const BUILTIN_SCALARS: &[&str] = &[
    "java.lang.String",
    "java.lang.Boolean",
    "java.lang.Integer",
    "java.lang.Long",
    "java.lang.Short",
    "java.lang.Byte",
    "java.lang.Character",
    "java.lang.Float",
    "java.lang.Double",
    "java.time.LocalDate",
    "java.time.LocalTime",
    "java.time.LocalDateTime",
    "java.time.OffsetTime",
    "java.time.OffsetDateTime",
    "java.time.Instant",
    "java.time.ZonedDateTime",
    "java.util.Date",
    "java.sql.Date",
    "java.sql.Time",
    "java.sql.Timestamp",
    "java.util.Calendar",
    "java.math.BigDecimal",
    "java.math.BigInteger",
    "java.util.UUID",
    "byte[]",
    "java.lang.Byte[]",
    "char[]",
    "java.lang.Character[]",
    "byte",
    "short",
    "int",
    "long",
    "float",
    "double",
    "boolean",
    "char",
];

/// The set of recognised scalar type names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarCatalogue {
    names: BTreeSet<String>,
}

impl ScalarCatalogue {
    /// Built-in scalar types only
    pub fn builtin() -> Self {
        Self {
            names: BUILTIN_SCALARS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Add extra scalar names (enums, converter-mapped types, config)
    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.names
            .extend(names.into_iter().map(|n| TypeRef::parse(n.as_ref()).canonical_name()));
    }

    pub fn contains(&self, ty: &TypeRef) -> bool {
        ty.unboxed().is_some() || self.names.contains(&ty.canonical_name())
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.contains(&TypeRef::parse(name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for ScalarCatalogue {
    fn default() -> Self {
        Self::builtin()
    }
}

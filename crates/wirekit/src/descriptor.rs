//! Runtime type descriptors
//!
//! A [`TypeDescriptor`] names an abstraction or an implementation by a stable
//! identifier. Descriptors are the keys of the registry and of the type catalog,
//! so every lookup the container performs is a lookup by descriptor.
//!
//! The textual form is used for display, parsing and serialization:
//!
//! | Form          | Meaning                              |
//! |---------------|--------------------------------------|
//! | `Name`        | simple type                          |
//! | `Name<>`      | open generic definition of arity 1   |
//! | `Name<,>`     | open generic definition of arity 2   |
//! | `Name<A, B>`  | closed generic type                  |
//! | `[T]`         | sequence of `T`                      |

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DIError, DIResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeDescriptor {
    /// A non-generic type
    Simple(Cow<'static, str>),
    /// An unbound generic definition
    OpenGeneric {
        name: Cow<'static, str>,
        arity: usize,
    },
    /// A generic definition with every argument bound
    ClosedGeneric {
        name: Cow<'static, str>,
        args: Vec<TypeDescriptor>,
    },
    /// The "resolve many" shape: one element per registered implementation
    Sequence(Box<TypeDescriptor>),
}

impl TypeDescriptor {
    /// Descriptor derived from the Rust type name of `T`.
    ///
    /// The whole type name becomes a simple descriptor, even for Rust generics,
    /// so `of::<T>()` is only stable within one build.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Simple(Cow::Borrowed(std::any::type_name::<T>()))
    }

    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Simple(name.into())
    }

    pub fn open(name: impl Into<Cow<'static, str>>, arity: usize) -> Self {
        Self::OpenGeneric {
            name: name.into(),
            arity,
        }
    }

    pub fn closed(name: impl Into<Cow<'static, str>>, args: Vec<TypeDescriptor>) -> Self {
        Self::ClosedGeneric {
            name: name.into(),
            args,
        }
    }

    pub fn sequence_of(element: TypeDescriptor) -> Self {
        Self::Sequence(Box::new(element))
    }

    /// `[T]` where `T` is derived from the Rust type name
    pub fn sequence<T: ?Sized + 'static>() -> Self {
        Self::sequence_of(Self::of::<T>())
    }

    /// Name of the type or generic definition; `None` for sequences
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Simple(name)
            | Self::OpenGeneric { name, .. }
            | Self::ClosedGeneric { name, .. } => Some(name),
            Self::Sequence(_) => None,
        }
    }

    pub fn is_open_generic(&self) -> bool {
        matches!(self, Self::OpenGeneric { .. })
    }

    pub fn is_closed_generic(&self) -> bool {
        matches!(self, Self::ClosedGeneric { .. })
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }

    /// Element type of a sequence
    pub fn element(&self) -> Option<&TypeDescriptor> {
        match self {
            Self::Sequence(element) => Some(element),
            _ => None,
        }
    }

    /// Unbound form of a generic type.
    ///
    /// Closed generics map to their open definition, open generics to
    /// themselves; other descriptors have no definition.
    pub fn generic_definition(&self) -> Option<TypeDescriptor> {
        match self {
            Self::OpenGeneric { .. } => Some(self.clone()),
            Self::ClosedGeneric { name, args } => Some(Self::OpenGeneric {
                name: name.clone(),
                arity: args.len(),
            }),
            _ => None,
        }
    }

    /// Bound type arguments; empty unless closed
    pub fn generic_args(&self) -> &[TypeDescriptor] {
        match self {
            Self::ClosedGeneric { args, .. } => args,
            _ => &[],
        }
    }

    /// Key under which the catalog stores this type's metadata
    pub(crate) fn catalog_key(&self) -> Option<TypeDescriptor> {
        match self {
            Self::Simple(_) => Some(self.clone()),
            Self::OpenGeneric { .. } | Self::ClosedGeneric { .. } => self.generic_definition(),
            Self::Sequence(_) => None,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple(name) => write!(f, "{}", name),
            Self::OpenGeneric { name, arity } => {
                write!(f, "{}<{}>", name, ",".repeat(arity.saturating_sub(1)))
            }
            Self::ClosedGeneric { name, args } => {
                write!(f, "{}<", name)?;
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ">")
            }
            Self::Sequence(element) => write!(f, "[{}]", element),
        }
    }
}

impl FromStr for TypeDescriptor {
    type Err = DIError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser { input: s, pos: 0 };
        let descriptor = parser.parse_type()?;
        parser.skip_whitespace();
        if parser.pos != s.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(descriptor)
    }
}

impl TryFrom<String> for TypeDescriptor {
    type Error = DIError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeDescriptor> for String {
    fn from(descriptor: TypeDescriptor) -> Self {
        descriptor.to_string()
    }
}

const DELIMITERS: &[char] = &['<', '>', ',', '[', ']'];

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.rest().starts_with(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn peek(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        self.rest().starts_with(expected)
    }

    fn error(&self, message: &str) -> DIError {
        DIError::InvalidDescriptor {
            input: self.input.to_string(),
            message: format!("{} at offset {}", message, self.pos),
        }
    }

    fn parse_type(&mut self) -> DIResult<TypeDescriptor> {
        if self.eat('[') {
            let element = self.parse_type()?;
            if !self.eat(']') {
                return Err(self.error("expected ']'"));
            }
            return Ok(TypeDescriptor::sequence_of(element));
        }

        let name = self.parse_name()?;
        if !self.eat('<') {
            return Ok(TypeDescriptor::named(name));
        }

        if self.peek(',') || self.peek('>') {
            let mut arity = 1;
            loop {
                if self.eat(',') {
                    arity += 1;
                } else if self.eat('>') {
                    return Ok(TypeDescriptor::open(name, arity));
                } else {
                    return Err(self.error("expected ',' or '>' in open generic"));
                }
            }
        }

        let mut args = vec![self.parse_type()?];
        loop {
            if self.eat(',') {
                args.push(self.parse_type()?);
            } else if self.eat('>') {
                return Ok(TypeDescriptor::closed(name, args));
            } else {
                return Err(self.error("expected ',' or '>' in generic arguments"));
            }
        }
    }

    fn parse_name(&mut self) -> DIResult<String> {
        self.skip_whitespace();
        let rest = self.rest();
        let end = rest.find(DELIMITERS).unwrap_or(rest.len());
        let name = rest[..end].trim_end();
        if name.is_empty() {
            return Err(self.error("expected a type name"));
        }
        self.pos += end;
        Ok(name.to_string())
    }
}

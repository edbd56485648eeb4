//! Type expressions as reported by the host type checker.
//!
//! A [TypeRef] is the syntactic form of a type at one place in the source: the
//! engine never compares two of them directly, it compares their
//! [identities](crate::identity::TypeIdentity) instead.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of a syntax node, 1-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    pub column: u32,
    #[serde(default)]
    pub length: u32,
}

impl Span {
    pub fn new(line: u32, column: u32, length: u32) -> Self {
        Self {
            line,
            column,
            length,
        }
    }
}

/// A type reference together with its location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    #[serde(default)]
    pub span: Span,
    #[serde(flatten)]
    pub kind: TypeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypeKind {
    /// `Name` or `Name<A, B>`
    Named {
        name: String,
        #[serde(default)]
        args: Vec<TypeRef>,
    },
    /// `typeof name`: the type of a value rather than a type
    #[serde(rename = "typeof")]
    TypeOf { name: String },
    Tuple {
        #[serde(default)]
        elements: Vec<TypeRef>,
    },
    Object {
        #[serde(default)]
        members: Vec<Member>,
    },
    Array { element: Box<TypeRef> },
    Union { members: Vec<TypeRef> },
    /// `string`, `number`, `void`, ...
    Keyword { name: String },
    /// A literal type, kept as written (`"a"`, `42`, `true`)
    Literal { text: String },
}

/// A property of an object type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub span: Span,
}

impl TypeRef {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            span: Span::default(),
            kind,
        }
    }

    pub fn named(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self::new(TypeKind::Named {
            name: name.into(),
            args,
        })
    }

    pub fn type_of(name: impl Into<String>) -> Self {
        Self::new(TypeKind::TypeOf { name: name.into() })
    }

    pub fn keyword(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Keyword { name: name.into() })
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Name of the outer reference for `named` and `typeof` forms
    pub fn head_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Named { name, .. } | TypeKind::TypeOf { name } => Some(name),
            _ => None,
        }
    }

    /// Short description of the shape, used in malformed-declaration messages.
    pub fn shape(&self) -> &'static str {
        match self.kind {
            TypeKind::Named { .. } => "a type reference",
            TypeKind::TypeOf { .. } => "a typeof query",
            TypeKind::Tuple { .. } => "a tuple",
            TypeKind::Object { .. } => "an object type",
            TypeKind::Array { .. } => "an array type",
            TypeKind::Union { .. } => "a union type",
            TypeKind::Keyword { .. } => "a keyword type",
            TypeKind::Literal { .. } => "a literal type",
        }
    }

    /// Visit every name this expression refers to, outermost first.
    ///
    /// The flag tells whether the name is used as a value (`typeof x`).
    pub fn for_each_name<'a>(&'a self, f: &mut impl FnMut(&'a str, bool)) {
        match &self.kind {
            TypeKind::Named { name, args } => {
                f(name, false);
                args.iter().for_each(|a| a.for_each_name(f));
            }
            TypeKind::TypeOf { name } => f(name, true),
            TypeKind::Tuple { elements } => elements.iter().for_each(|e| e.for_each_name(f)),
            TypeKind::Object { members } => members.iter().for_each(|m| m.ty.for_each_name(f)),
            TypeKind::Array { element } => element.for_each_name(f),
            TypeKind::Union { members } => members.iter().for_each(|m| m.for_each_name(f)),
            TypeKind::Keyword { .. } | TypeKind::Literal { .. } => {}
        }
    }
}

/// Renders the expression as source text.
impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Named { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    write_joined(f, args, ", ")?;
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeKind::TypeOf { name } => write!(f, "typeof {name}"),
            TypeKind::Tuple { elements } => {
                f.write_str("[")?;
                write_joined(f, elements, ", ")?;
                f.write_str("]")
            }
            TypeKind::Object { members } => {
                if members.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                for m in members {
                    let opt = if m.optional { "?" } else { "" };
                    write!(f, "{}{}: {}; ", m.name, opt, m.ty)?;
                }
                f.write_str("}")
            }
            TypeKind::Array { element } => match element.kind {
                TypeKind::Union { .. } => write!(f, "({element})[]"),
                _ => write!(f, "{element}[]"),
            },
            TypeKind::Union { members } => write_joined(f, members, " | "),
            TypeKind::Keyword { name } => f.write_str(name),
            TypeKind::Literal { text } => f.write_str(text),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[TypeRef], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_expressions() {
        let t = TypeRef::named(
            "Map",
            vec![
                TypeRef::keyword("string"),
                TypeRef::new(TypeKind::Array {
                    element: Box::new(TypeRef::new(TypeKind::Union {
                        members: vec![TypeRef::named("User", vec![]), TypeRef::keyword("null")],
                    })),
                }),
            ],
        );
        assert_eq!(t.to_string(), "Map<string, (User | null)[]>");
        assert_eq!(TypeRef::type_of("connect").to_string(), "typeof connect");
    }

    #[test]
    fn deserializes_tagged_kinds() {
        let t: TypeRef = serde_json::from_str(
            r#"{"kind":"named","name":"Reusable","args":[{"kind":"typeof","name":"f","span":{"line":3,"column":20}}],"span":{"line":3,"column":11,"length":20}}"#,
        )
        .unwrap();
        assert_eq!(t.span, Span::new(3, 11, 20));
        assert_eq!(t.to_string(), "Reusable<typeof f>");
    }

    #[test]
    fn collects_referenced_names() {
        let t = TypeRef::named("ReturnType", vec![TypeRef::type_of("connect")]);
        let mut seen = vec![];
        t.for_each_name(&mut |name, value| seen.push((name, value)));
        assert_eq!(seen, vec![("ReturnType", false), ("connect", true)]);
    }
}

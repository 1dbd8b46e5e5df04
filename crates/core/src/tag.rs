//! Event tags and their payload signatures
//!
//! A tag is the identity half of an event: two tags are equal only if they
//! were created by the same `Tag::new` call, even when names and signatures
//! coincide. Cloning a tag is an `Arc` bump.
//!
//! ```text
//! Tag ── id (unique) ── name ── params: Fixed([Int, Stack]) | Variadic
//!                           └── results: Option<[..]>   (inspection tags)
//! ```
//!
//! Switch-family payloads put the yielding stack reference in the last
//! parameter position, so a tag used with `switch` must end in `Stack`.

use crate::error::Trap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TAG_ID: AtomicU64 = AtomicU64::new(1);

/// Type of one payload slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Int,
    Float,
    Bool,
    String,
    /// A linear stack reference
    Stack,
    /// Accepts any value
    Any,
}

impl ValueType {
    /// Whether a value of type `found` may fill a slot of this type
    pub fn accepts(self, found: ValueType) -> bool {
        self == ValueType::Any || self == found
    }

    fn name(self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::String => "string",
            ValueType::Stack => "stack",
            ValueType::Any => "any",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameter list of a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    Fixed(Vec<ValueType>),
    /// Any number of values of any type (runtime-internal tags)
    Variadic,
}

impl Signature {
    /// Check a sequence of payload types against this signature
    pub fn check(&self, found: &[ValueType]) -> bool {
        match self {
            Signature::Variadic => true,
            Signature::Fixed(params) => {
                params.len() == found.len() && params.iter().zip(found).all(|(p, f)| p.accepts(*f))
            }
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signature::Variadic => f.write_str("(..)"),
            Signature::Fixed(params) => write_types(f, params),
        }
    }
}

fn write_types(f: &mut fmt::Formatter<'_>, types: &[ValueType]) -> fmt::Result {
    f.write_str("(")?;
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        f.write_str(ty.name())?;
    }
    f.write_str(")")
}

/// Render a list of types the way signatures are rendered
pub fn describe_types(types: &[ValueType]) -> String {
    struct Types<'a>(&'a [ValueType]);
    impl fmt::Display for Types<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write_types(f, self.0)
        }
    }
    Types(types).to_string()
}

#[derive(Debug)]
struct TagInner {
    id: u64,
    name: String,
    params: Signature,
    results: Option<Vec<ValueType>>,
}

/// Event tag: identity plus payload signature
#[derive(Clone)]
pub struct Tag {
    inner: Arc<TagInner>,
}

impl Tag {
    /// Create a tag with a fixed parameter list
    pub fn new(name: impl Into<String>, params: impl IntoIterator<Item = ValueType>) -> Tag {
        Tag::with_signature(name, Signature::Fixed(params.into_iter().collect()), None)
    }

    /// Create a tag that accepts any payload
    pub fn variadic(name: impl Into<String>) -> Tag {
        Tag::with_signature(name, Signature::Variadic, None)
    }

    fn with_signature(
        name: impl Into<String>,
        params: Signature,
        results: Option<Vec<ValueType>>,
    ) -> Tag {
        Tag {
            inner: Arc::new(TagInner {
                id: NEXT_TAG_ID.fetch_add(1, Ordering::Relaxed),
                name: name.into(),
                params,
                results,
            }),
        }
    }

    /// Fix the result types an inspection answer must produce for this tag.
    ///
    /// Consumes the tag and mints a new identity; call it while building
    /// the tag, before any copy has been handed out.
    pub fn returning(self, results: impl IntoIterator<Item = ValueType>) -> Tag {
        let name = self.inner.name.clone();
        let params = self.inner.params.clone();
        Tag::with_signature(name, params, Some(results.into_iter().collect()))
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn params(&self) -> &Signature {
        &self.inner.params
    }

    pub fn results(&self) -> Option<&[ValueType]> {
        self.inner.results.as_deref()
    }

    /// Check a full payload against the parameter signature
    pub fn check_params(&self, found: &[ValueType]) -> Result<(), Trap> {
        if self.inner.params.check(found) {
            Ok(())
        } else {
            Err(self.mismatch(self.inner.params.to_string(), found))
        }
    }

    /// Check the values a switch supplies before the yielding reference is appended
    pub fn check_yield(&self, found: &[ValueType]) -> Result<(), Trap> {
        match &self.inner.params {
            Signature::Variadic => Ok(()),
            Signature::Fixed(params) => match params.split_last() {
                Some((ValueType::Stack, prefix))
                    if prefix.len() == found.len()
                        && prefix.iter().zip(found).all(|(p, f)| p.accepts(*f)) =>
                {
                    Ok(())
                }
                _ => {
                    let mut with_stack = found.to_vec();
                    with_stack.push(ValueType::Stack);
                    Err(self.mismatch(self.inner.params.to_string(), &with_stack))
                }
            },
        }
    }

    /// Check the outputs of an inspection answer
    pub fn check_results(&self, found: &[ValueType]) -> Result<(), Trap> {
        match &self.inner.results {
            None => Ok(()),
            Some(results) => {
                if Signature::Fixed(results.clone()).check(found) {
                    Ok(())
                } else {
                    Err(self.mismatch(describe_types(results), found))
                }
            }
        }
    }

    fn mismatch(&self, expected: String, found: &[ValueType]) -> Trap {
        Trap::SignatureMismatch {
            tag: self.inner.name.clone(),
            expected,
            found: describe_types(found),
        }
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Tag {}

impl std::hash::Hash for Tag {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = &self.inner;
        write!(f, "${}#{}{}", inner.name, inner.id, inner.params)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.inner.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_not_structural() {
        let a = Tag::new("ping", [ValueType::Int]);
        let b = Tag::new("ping", [ValueType::Int]);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_check_params() {
        let tag = Tag::new("pair", [ValueType::Int, ValueType::Any]);
        let swapped = [ValueType::Bool, ValueType::Int];
        assert!(tag.check_params(&[ValueType::Int, ValueType::Bool]).is_ok());
        assert!(tag.check_params(&[ValueType::Int]).is_err());
        assert!(tag.check_params(&swapped).is_err());
    }

    #[test]
    fn test_check_yield_requires_trailing_stack() {
        let yielding = Tag::new("yielded", [ValueType::Int, ValueType::Stack]);
        assert!(yielding.check_yield(&[ValueType::Int]).is_ok());
        assert!(yielding.check_yield(&[]).is_err());

        let plain = Tag::new("done", [ValueType::Int]);
        match plain.check_yield(&[ValueType::Int]) {
            Err(Trap::SignatureMismatch { expected, found, .. }) => {
                assert_eq!(expected, "(int)");
                assert_eq!(found, "(int stack)");
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_variadic_accepts_anything() {
        let tag = Tag::variadic("reply");
        assert!(tag.check_params(&[]).is_ok());
        let mixed = [ValueType::Stack, ValueType::Float];
        assert!(tag.check_params(&mixed).is_ok());
        assert!(tag.check_yield(&[ValueType::Bool]).is_ok());
    }

    #[test]
    fn test_results_signature() {
        let tag = Tag::new("double", [ValueType::Int]).returning([ValueType::Int]);
        assert_eq!(tag.results(), Some(&[ValueType::Int][..]));
        assert!(tag.check_results(&[ValueType::Int]).is_ok());
        assert!(tag.check_results(&[ValueType::Bool]).is_err());

        let untyped = Tag::new("peek", []);
        assert!(untyped.check_results(&[ValueType::Bool]).is_ok());
    }

    #[test]
    fn test_display() {
        let tag = Tag::new("yielded", [ValueType::Int, ValueType::Stack]);
        assert_eq!(tag.to_string(), "$yielded");
        assert!(format!("{:?}", tag).ends_with("(int stack)"));
    }
}

//! Metadata of groups and examples.
//!
//! Every group and example carries an ordered map of key value pairs. A node's
//! resolved metadata is its parent's resolved metadata with the node's own pairs
//! merged on top, so a key declared on a group is visible on every example
//! below it.
//!
//! Metadata drives filtering ([`MetaFilter`]), conditional hooks and the
//! automatic inclusion of shared groups. A few keys are computed by kispec
//! itself and cannot be declared, see [`RESERVED_KEYS`].

use std::{
    borrow::Cow,
    fmt::{self, Debug, Display},
    sync::Arc,
};

use indexmap::IndexMap;
use regex::Regex;

use crate::error::DeclarationErrorKind;

pub type MetaKey = Cow<'static, str>;

/// Keys kispec fills in on its own for every node.
pub const RESERVED_KEYS: &[&str] = &["description", "full_description", "location"];

/// A single metadata value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Str(Cow<'static, str>),
    List(Vec<MetaValue>),
}

impl MetaValue {
    /// Everything but `false` counts as set.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, MetaValue::Bool(false))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetaValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Bool(b) => write!(f, "{b}"),
            MetaValue::Int(i) => write!(f, "{i}"),
            MetaValue::Str(s) => write!(f, "{s}"),
            MetaValue::List(values) => {
                write!(f, "[")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for MetaValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<&'static str> for MetaValue {
    fn from(value: &'static str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        Self::Str(value.into())
    }
}

impl<T: Into<MetaValue>> From<Vec<T>> for MetaValue {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

/// An insertion ordered map of metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata(IndexMap<MetaKey, MetaValue>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pair, replacing the value of an existing key in place.
    pub fn insert(
        &mut self,
        key: impl Into<MetaKey>,
        value: impl Into<MetaValue>,
    ) -> Option<MetaValue> {
        self.0.insert(key.into(), value.into())
    }

    pub fn with(mut self, key: impl Into<MetaKey>, value: impl Into<MetaValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Return whether `key` is present and not `false`.
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some_and(MetaValue::is_truthy)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &MetaValue)> {
        self.0.iter().map(|(k, v)| (k.as_ref(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge `own` on top of `self`.
    ///
    /// Keys of `self` keep their position, keys only present in `own` are
    /// appended in their order.
    pub fn merged(&self, own: &Metadata) -> Metadata {
        let mut merged = self.clone();
        for (key, value) in own.0.iter() {
            merged.0.insert(key.clone(), value.clone());
        }
        merged
    }

    pub(crate) fn check_user_keys(&self) -> Vec<DeclarationErrorKind> {
        self.0
            .keys()
            .filter_map(|key| {
                if key.is_empty() {
                    Some(DeclarationErrorKind::EmptyMetadataKey)
                } else if RESERVED_KEYS.contains(&key.as_ref()) {
                    Some(DeclarationErrorKind::ReservedMetadataKey(key.clone()))
                } else {
                    None
                }
            })
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: Into<MetaKey>,
    V: Into<MetaValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Build [`Metadata`] inline.
///
/// A bare key is shorthand for `key: true`.
///
/// ```
/// let metadata = kispec::meta! { slow, speed: "fast" };
/// assert!(metadata.is_set("slow"));
/// ```
#[macro_export]
macro_rules! meta {
    (@value) => { true };
    (@value $value:expr) => { $value };
    () => { $crate::metadata::Metadata::new() };
    ($($key:ident $(: $value:expr)?),+ $(,)?) => {{
        let mut metadata = $crate::metadata::Metadata::new();
        $(metadata.insert(::std::stringify!($key), $crate::meta!(@value $($value)?));)+
        metadata
    }};
}

/// How a single filter key is compared against a metadata value.
#[derive(Clone)]
pub enum FilterValue {
    /// The value must be present and equal.
    Equals(MetaValue),

    /// The value must be a string matching the pattern.
    Pattern(Regex),

    /// Arbitrary predicate, receives `None` for an absent key.
    Predicate(Arc<dyn Fn(Option<&MetaValue>) -> bool + Send + Sync>),
}

impl FilterValue {
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Pattern)
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(Option<&MetaValue>) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    pub fn applies(&self, value: Option<&MetaValue>) -> bool {
        match self {
            FilterValue::Equals(expected) => value == Some(expected),
            FilterValue::Pattern(pattern) => value
                .and_then(MetaValue::as_str)
                .is_some_and(|s| pattern.is_match(s)),
            FilterValue::Predicate(f) => f(value),
        }
    }
}

impl Debug for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(value) => f.debug_tuple("Equals").field(value).finish(),
            Self::Pattern(pattern) => f.debug_tuple("Pattern").field(&pattern.as_str()).finish(),
            Self::Predicate(_) => write!(f, "Predicate(...)"),
        }
    }
}

impl From<MetaValue> for FilterValue {
    fn from(value: MetaValue) -> Self {
        Self::Equals(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Equals(value.into())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Equals(value.into())
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        Self::Equals(value.into())
    }
}

impl From<&'static str> for FilterValue {
    fn from(value: &'static str) -> Self {
        Self::Equals(value.into())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Equals(value.into())
    }
}

impl From<Regex> for FilterValue {
    fn from(value: Regex) -> Self {
        Self::Pattern(value)
    }
}

/// A metadata predicate.
///
/// A filter matches when every one of its keys applies to the metadata.
/// The empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct MetaFilter {
    pairs: Vec<(MetaKey, FilterValue)>,
    malformed: Vec<String>,
}

impl MetaFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `key => true`
    pub fn tag(key: impl Into<MetaKey>) -> Self {
        Self::new().with(key, true)
    }

    pub fn with(mut self, key: impl Into<MetaKey>, value: impl Into<FilterValue>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    /// Add a pattern key.
    ///
    /// An invalid pattern is kept as a malformed entry, which makes the filter
    /// fail [`validate`](Self::validate) and never match.
    pub fn with_pattern(mut self, key: impl Into<MetaKey>, pattern: &str) -> Self {
        let key = key.into();
        match FilterValue::pattern(pattern) {
            Ok(value) => self.pairs.push((key, value)),
            Err(err) => self.malformed.push(format!("pattern for {key:?}: {err}")),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty() && self.malformed.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_ref())
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.malformed.is_empty()
            && self
                .pairs
                .iter()
                .all(|(key, value)| value.applies(metadata.get(key)))
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(malformed) = self.malformed.first() {
            return Err(malformed.clone());
        }
        if self.pairs.iter().any(|(key, _)| key.is_empty()) {
            return Err(String::from("filter keys must not be empty"));
        }
        Ok(())
    }
}

impl From<&'static str> for MetaFilter {
    fn from(value: &'static str) -> Self {
        Self::tag(value)
    }
}

impl From<Metadata> for MetaFilter {
    fn from(value: Metadata) -> Self {
        Self {
            pairs: value
                .0
                .into_iter()
                .map(|(k, v)| (k, FilterValue::Equals(v)))
                .collect(),
            malformed: Vec::new(),
        }
    }
}

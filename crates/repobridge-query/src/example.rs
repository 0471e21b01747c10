//! Query by example.
//!
//! An `Example` pairs a probe entity with an `ExampleMatcher`. Every non-null
//! property of the probe becomes one condition; the matcher decides how text
//! is compared, whether nulls are matched, which paths are skipped and whether
//! the conditions are AND-ed or OR-ed.

use repobridge_core::{Entity, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// How the per-property conditions are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MatchMode {
    #[default]
    All,
    Any,
}

/// How text values are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StringMatcher {
    /// Store default, which is equality.
    #[default]
    Default,
    Exact,
    Starting,
    Ending,
    Containing,
    /// The probe value is a regular expression.
    Regex,
}

impl StringMatcher {
    /// True for matchers that only make sense on text.
    pub const fn is_text_only(self) -> bool {
        matches!(
            self,
            StringMatcher::Starting
                | StringMatcher::Ending
                | StringMatcher::Containing
                | StringMatcher::Regex
        )
    }
}

impl fmt::Display for StringMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Treatment of null probe values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NullHandler {
    /// Null values add no condition.
    #[default]
    Ignore,
    /// Null values require the stored value to be null.
    Include,
}

/// Rewrites a probe value before it is matched. Returning `None` treats the
/// value as null.
pub type ValueTransformer = Arc<dyn Fn(Value) -> Option<Value> + Send + Sync>;

/// Overrides for one property path.
#[derive(Clone, Default)]
pub struct PropertySpecifier {
    matcher: Option<StringMatcher>,
    ignore_case: Option<bool>,
    transformer: Option<ValueTransformer>,
}

impl PropertySpecifier {
    pub fn matcher(&self) -> Option<StringMatcher> {
        self.matcher
    }

    pub fn ignore_case(&self) -> Option<bool> {
        self.ignore_case
    }

    /// Apply the transformer, if any.
    pub fn transform(&self, value: Value) -> Option<Value> {
        match &self.transformer {
            Some(transform) => transform(value),
            None => Some(value),
        }
    }
}

impl fmt::Debug for PropertySpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertySpecifier")
            .field("matcher", &self.matcher)
            .field("ignore_case", &self.ignore_case)
            .field("transformer", &self.transformer.is_some())
            .finish()
    }
}

/// Matching rules for an `Example`.
///
/// ```
/// use repobridge_query::{ExampleMatcher, StringMatcher};
///
/// let matcher = ExampleMatcher::matching_any()
///     .with_ignore_paths(["createdAt"])
///     .with_matcher("lastName", StringMatcher::Starting)
///     .with_ignore_case(true);
/// assert!(matcher.is_ignored_path("createdAt"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExampleMatcher {
    mode: MatchMode,
    default_matcher: StringMatcher,
    ignore_case: bool,
    null_handler: NullHandler,
    specifiers: BTreeMap<String, PropertySpecifier>,
    ignored_paths: BTreeSet<String>,
}

impl ExampleMatcher {
    /// All conditions must hold.
    pub fn matching_all() -> Self {
        Self::default()
    }

    /// Any condition may hold.
    pub fn matching_any() -> Self {
        Self {
            mode: MatchMode::Any,
            ..Self::default()
        }
    }

    /// Skip these paths whatever their value.
    pub fn with_ignore_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.ignored_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Default text matcher for properties without an override.
    pub fn with_string_matcher(mut self, matcher: StringMatcher) -> Self {
        self.default_matcher = matcher;
        self
    }

    /// Default case sensitivity for properties without an override.
    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    /// Case-insensitive matching for these paths only.
    pub fn with_ignore_case_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        for path in paths {
            self.specifiers.entry(path.into()).or_default().ignore_case = Some(true);
        }
        self
    }

    /// Text matcher for one path, overriding the default.
    pub fn with_matcher(mut self, path: impl Into<String>, matcher: StringMatcher) -> Self {
        self.specifiers.entry(path.into()).or_default().matcher = Some(matcher);
        self
    }

    /// Rewrite the probe value of one path before matching.
    pub fn with_transformer<F>(mut self, path: impl Into<String>, transformer: F) -> Self
    where
        F: Fn(Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.specifiers.entry(path.into()).or_default().transformer = Some(Arc::new(transformer));
        self
    }

    pub fn with_include_null_values(mut self) -> Self {
        self.null_handler = NullHandler::Include;
        self
    }

    pub fn with_ignore_null_values(mut self) -> Self {
        self.null_handler = NullHandler::Ignore;
        self
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn default_string_matcher(&self) -> StringMatcher {
        self.default_matcher
    }

    pub fn is_ignore_case_enabled(&self) -> bool {
        self.ignore_case
    }

    pub fn null_handler(&self) -> NullHandler {
        self.null_handler
    }

    pub fn is_ignored_path(&self, path: &str) -> bool {
        self.ignored_paths.contains(path)
    }

    pub fn specifier(&self, path: &str) -> Option<&PropertySpecifier> {
        self.specifiers.get(path)
    }

    /// Text matcher in effect for `path`, and whether it was set explicitly.
    pub fn string_matcher_for(&self, path: &str) -> (StringMatcher, bool) {
        match self.specifier(path).and_then(PropertySpecifier::matcher) {
            Some(matcher) => (matcher, true),
            None => (self.default_matcher, false),
        }
    }

    /// Case sensitivity in effect for `path`.
    pub fn ignore_case_for(&self, path: &str) -> bool {
        self.specifier(path)
            .and_then(PropertySpecifier::ignore_case)
            .unwrap_or(self.ignore_case)
    }
}

/// A probe entity and the rules for matching it.
#[derive(Debug, Clone)]
pub struct Example<E> {
    probe: E,
    matcher: ExampleMatcher,
}

impl<E: Entity> Example<E> {
    /// Match every non-null property exactly.
    pub fn of(probe: E) -> Self {
        Self::with_matcher(probe, ExampleMatcher::matching_all())
    }

    pub fn with_matcher(probe: E, matcher: ExampleMatcher) -> Self {
        Self { probe, matcher }
    }

    pub fn probe(&self) -> &E {
        &self.probe
    }

    pub fn matcher(&self) -> &ExampleMatcher {
        &self.matcher
    }
}

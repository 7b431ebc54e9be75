use std::sync::Arc;

use thiserror::Error;

use crate::models::NavigationState;

/// Prefix of a named parameter segment in a route pattern (`/courses/:id`).
pub const PARAM_MARKER: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TitleError {
    #[error("malformed route pattern `{0}`")]
    MalformedPattern(String),
    #[error("route pattern `{0}` is mapped more than once")]
    DuplicatePattern(String),
}

/// Checks a route pattern for well-formedness: it must be absolute and every parameter
/// segment must carry a name.
pub fn validate_pattern(pattern: &str) -> Result<(), TitleError> {
    let named = pattern
        .split('/')
        .all(|segment| segment.strip_prefix(PARAM_MARKER) != Some(""));
    if pattern.starts_with('/') && named {
        Ok(())
    } else {
        Err(TitleError::MalformedPattern(pattern.to_string()))
    }
}

/// Segment-wise match of a pattern against an already split path. Parameter segments
/// match any literal; segment counts must be equal.
pub fn pattern_matches(pattern: &str, segments: &[&str]) -> Result<bool, TitleError> {
    validate_pattern(pattern)?;
    let keys: Vec<&str> = pattern.split('/').collect();
    if keys.len() != segments.len() {
        return Ok(false);
    }
    Ok(keys
        .iter()
        .zip(segments)
        .all(|(key, segment)| key.starts_with(PARAM_MARKER) || key == segment))
}

/// RouteTitleTable
///
/// Static route pattern to title mapping. Keys are unique; iteration follows insertion
/// order, which is also the tie-break for segment-wise matching.
#[derive(Debug, Clone, Default)]
pub struct RouteTitleTable {
    entries: Vec<(String, String)>,
}

impl RouteTitleTable {
    pub fn new<I, P, T>(entries: I) -> Result<Self, TitleError>
    where
        I: IntoIterator<Item = (P, T)>,
        P: Into<String>,
        T: Into<String>,
    {
        let mut table = Self::default();
        for (pattern, title) in entries {
            table.insert(pattern, title)?;
        }
        Ok(table)
    }

    pub fn insert(
        &mut self,
        pattern: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<(), TitleError> {
        let pattern = pattern.into();
        if self.get(&pattern).is_some() {
            return Err(TitleError::DuplicatePattern(pattern));
        }
        self.entries.push((pattern, title.into()));
        Ok(())
    }

    pub fn get(&self, pattern: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == pattern)
            .map(|(_, title)| title.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(pattern, title)| (pattern.as_str(), title.as_str()))
    }

    /// First entry whose pattern matches `path` segment by segment.
    pub fn match_path(&self, path: &str) -> Result<Option<&str>, TitleError> {
        let segments: Vec<&str> = path.split('/').collect();
        for (pattern, title) in self.iter() {
            if pattern_matches(pattern, &segments)? {
                return Ok(Some(title));
            }
        }
        Ok(None)
    }
}

/// TitleResolver
///
/// Maps a navigation to a display title and formats it as a document title.
#[derive(Debug, Clone)]
pub struct TitleResolver {
    table: RouteTitleTable,
    default_title: String,
    app_name: String,
    suffix: bool,
}

impl TitleResolver {
    pub fn new(
        table: RouteTitleTable,
        default_title: impl Into<String>,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            table,
            default_title: default_title.into(),
            app_name: app_name.into(),
            suffix: true,
        }
    }

    /// Toggles the `" | {app_name}"` suffix.
    pub fn with_suffix(mut self, suffix: bool) -> Self {
        self.suffix = suffix;
        self
    }

    pub fn default_title(&self) -> &str {
        &self.default_title
    }

    /// Resolution order: matched patterns (most specific first), the raw path, then
    /// segment-wise matching over the whole table. `Ok(None)` means nothing matched.
    pub fn try_resolve(&self, navigation: &NavigationState) -> Result<Option<&str>, TitleError> {
        if let Some(title) = navigation
            .matched
            .iter()
            .rev()
            .find_map(|pattern| self.table.get(pattern))
        {
            return Ok(Some(title));
        }
        if let Some(title) = self.table.get(&navigation.pathname) {
            return Ok(Some(title));
        }
        self.table.match_path(&navigation.pathname)
    }

    /// Like [`TitleResolver::try_resolve`] but never fails: anything unresolved or
    /// broken yields the default title.
    pub fn resolve(&self, navigation: &NavigationState) -> String {
        match self.try_resolve(navigation) {
            Ok(Some(title)) => title.to_string(),
            Ok(None) => self.default_title.clone(),
            Err(error) => {
                tracing::warn!(%error, path = %navigation.pathname, "title resolution failed, using default");
                self.default_title.clone()
            }
        }
    }

    pub fn format(&self, title: &str) -> String {
        if self.suffix {
            format!("{} | {}", title, self.app_name)
        } else {
            title.to_string()
        }
    }

    pub fn document_title(&self, navigation: &NavigationState) -> String {
        self.format(&self.resolve(navigation))
    }

    pub fn default_document_title(&self) -> String {
        self.format(&self.default_title)
    }
}

/// TitleManager
///
/// Owns the document title for a mounted navigation scope. Writes only when the value
/// changes.
#[derive(Debug)]
pub struct TitleManager {
    resolver: Arc<TitleResolver>,
    current: String,
}

impl TitleManager {
    pub fn new(resolver: Arc<TitleResolver>) -> Self {
        let current = resolver.default_document_title();
        Self { resolver, current }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Returns true when the document title was rewritten.
    pub fn update(&mut self, navigation: &NavigationState) -> bool {
        let next = self.resolver.document_title(navigation);
        self.write(next)
    }

    /// Restores the default title when the scope goes away.
    pub fn unmount(&mut self) -> bool {
        let default = self.resolver.default_document_title();
        self.write(default)
    }

    fn write(&mut self, next: String) -> bool {
        if next == self.current {
            return false;
        }
        tracing::trace!(title = %next, "document title updated");
        self.current = next;
        true
    }
}

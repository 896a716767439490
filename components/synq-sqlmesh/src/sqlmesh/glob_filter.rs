// External crates
use globset::{GlobBuilder, GlobMatcher};
use tracing::instrument;

/// Decides which project files get their content uploaded.
///
/// A path is accepted when it matches at least one include pattern and no
/// exclude pattern. Include patterns use extended glob syntax where `*` and
/// `**` may cross directory boundaries (`models/**.sql`). Exclude patterns are
/// single-segment globs: `*` never matches `/`, so they filter on filename
/// shape (`*.log`).
///
/// Patterns are compiled once at construction. A malformed pattern is kept as
/// a compile error and reported by [`GlobFilter::is_match`], so callers decide
/// how fatal it is.
#[derive(Debug, Clone, Default)]
pub struct GlobFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

#[derive(Debug, Clone)]
struct Pattern {
    source: String,
    matcher: Result<GlobMatcher, globset::Error>,
}

/// A pattern that does not compile.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GlobFilterError {
    /// Malformed include pattern. Aborts content collection.
    #[error("invalid include pattern {pattern:?}: {source}")]
    InvalidIncludePattern {
        /// Pattern as written.
        pattern: String,
        /// Compile error.
        #[source]
        source: globset::Error,
    },
    /// Malformed exclude pattern. Only skips the path being checked.
    #[error("invalid exclude pattern {pattern:?}: {source}")]
    InvalidExcludePattern {
        /// Pattern as written.
        pattern: String,
        /// Compile error.
        #[source]
        source: globset::Error,
    },
}

impl GlobFilterError {
    /// A bad include pattern makes every decision meaningless; a bad exclude
    /// pattern only affects the path being checked.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GlobFilterError::InvalidIncludePattern { .. })
    }
}

impl GlobFilter {
    /// Filter that accepts nothing. Used when file content collection is off.
    pub fn exclude_everything() -> Self {
        Self::default()
    }

    /// Build a filter from comma separated pattern lists. Empty segments are
    /// ignored, so `""` yields an empty list.
    pub fn new(include: &str, exclude: &str) -> Self {
        Self {
            include: split_patterns(include)
                .map(|p| Pattern::compile(p, false))
                .collect(),
            exclude: split_patterns(exclude)
                .map(|p| Pattern::compile(p, true))
                .collect(),
        }
    }

    /// Include patterns as written.
    pub fn include_patterns(&self) -> impl Iterator<Item = &str> {
        self.include.iter().map(|p| p.source.as_str())
    }

    /// Exclude patterns as written.
    pub fn exclude_patterns(&self) -> impl Iterator<Item = &str> {
        self.exclude.iter().map(|p| p.source.as_str())
    }

    /// Whether the content of `path` is collected. Fails on the first
    /// malformed pattern consulted.
    #[instrument(
        name = "glob_filter::is_match",
        target = "sqlmesh::glob_filter",
        skip(self),
        level = "trace"
    )]
    pub fn is_match(&self, path: &str) -> Result<bool, GlobFilterError> {
        let mut included = false;
        for pattern in &self.include {
            let matcher =
                pattern
                    .matcher
                    .as_ref()
                    .map_err(|e| GlobFilterError::InvalidIncludePattern {
                        pattern: pattern.source.clone(),
                        source: e.clone(),
                    })?;
            if !included && matcher.is_match(path) {
                included = true;
            }
        }
        if !included {
            return Ok(false);
        }

        for pattern in &self.exclude {
            let matcher =
                pattern
                    .matcher
                    .as_ref()
                    .map_err(|e| GlobFilterError::InvalidExcludePattern {
                        pattern: pattern.source.clone(),
                        source: e.clone(),
                    })?;
            if matcher.is_match(path) {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

impl Pattern {
    fn compile(source: &str, literal_separator: bool) -> Self {
        let matcher = GlobBuilder::new(source)
            .literal_separator(literal_separator)
            .build()
            .map(|glob| glob.compile_matcher());
        Self {
            source: source.to_string(),
            matcher,
        }
    }
}

fn split_patterns(csv: &str) -> impl Iterator<Item = &str> {
    csv.split(',').map(str::trim).filter(|p| !p.is_empty())
}

use tracing::debug;

use crate::{
    filter::{ExampleFilter, FilteredExamples},
    metadata::{MetaFilter, MetaKey, Metadata},
    tree::Tree,
};

/// Filters by resolved metadata.
///
/// An example is scheduled when it matches any inclusion filter (or there are
/// none) and no exclusion filter. When a focus key is set, no inclusion filter
/// is given and at least one example has the focus key set, only the focused
/// examples are scheduled.
#[derive(Debug, Clone, Default)]
pub struct MetadataFilter {
    inclusion: Vec<MetaFilter>,
    exclusion: Vec<MetaFilter>,
    focus: Option<MetaKey>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inclusion(mut self, filter: impl Into<MetaFilter>) -> Self {
        self.inclusion.push(filter.into());
        self
    }

    pub fn with_exclusion(mut self, filter: impl Into<MetaFilter>) -> Self {
        self.exclusion.push(filter.into());
        self
    }

    pub fn with_focus(mut self, key: impl Into<MetaKey>) -> Self {
        self.focus = Some(key.into());
        self
    }

    pub fn without_focus(mut self) -> Self {
        self.focus = None;
        self
    }

    fn includes(&self, metadata: &Metadata) -> bool {
        self.inclusion.is_empty() || self.inclusion.iter().any(|filter| filter.matches(metadata))
    }

    fn excludes(&self, metadata: &Metadata) -> bool {
        self.exclusion.iter().any(|filter| filter.matches(metadata))
    }
}

impl ExampleFilter for MetadataFilter {
    fn filter(&self, tree: &Tree) -> FilteredExamples {
        let focus = self
            .focus
            .as_ref()
            .filter(|_| self.inclusion.is_empty())
            .filter(|key| tree.examples().iter().any(|example| example.metadata.is_set(key)));
        if let Some(key) = focus {
            debug!(%key, "running focused examples only");
        }

        if self.inclusion.is_empty() && self.exclusion.is_empty() && focus.is_none() {
            return FilteredExamples::all(tree);
        }

        FilteredExamples::retain(tree, |id| {
            let metadata = &tree.example(id).metadata;
            let included = match focus {
                Some(key) => metadata.is_set(key),
                None => self.includes(metadata),
            };
            included && !self.excludes(metadata)
        })
    }
}

use crate::{
    mark::{ExampleMark, Mark},
    tree::Example,
};

/// Marks examples by their metadata.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DefaultMark {
    /// Run skipped examples anyway, pending ones stay pending.
    IncludeSkipped,

    /// Run only the skipped examples, everything else is skipped.
    SkippedOnly,
    #[default]
    Default,
}

impl ExampleMark for DefaultMark {
    fn mark(&self, example: &Example) -> Mark {
        let mark = Mark::from_metadata(&example.metadata);
        match (self, mark) {
            (DefaultMark::IncludeSkipped, Mark::Skip(_)) => {
                match Mark::from_metadata(&without_skip(example)) {
                    Mark::Pending(reason) => Mark::Pending(reason),
                    _ => Mark::Run,
                }
            }
            (DefaultMark::SkippedOnly, Mark::Skip(_)) => Mark::Run,
            (DefaultMark::SkippedOnly, _) => Mark::Skip(Some("not marked as skipped".into())),
            (_, mark) => mark,
        }
    }
}

fn without_skip(example: &Example) -> crate::metadata::Metadata {
    example
        .metadata
        .iter()
        .filter(|(key, _)| *key != "skip")
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

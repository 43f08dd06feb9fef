use crate::accessor::FieldRole;
use crate::extract::text::normalize_handle;
use crate::extract::{ExtractionFailure, ExtractionResult, ItemFields};
use crate::record::{Edge, RelationKind};

/// Builds an [`Edge`] from one rendered user row of a listing page
///
/// `source` is the profile whose listing is being read; the listed handle
/// becomes the edge target, with its leading `@` stripped and case kept.
pub fn extract_edge(
    fields: &ItemFields,
    source: &str,
    kind: RelationKind,
) -> ExtractionResult<Edge> {
    let target = fields
        .first(FieldRole::UserHandle)
        .and_then(normalize_handle)
        .ok_or(ExtractionFailure::MissingIdentity {
            field: FieldRole::UserHandle,
        })?;

    Ok(Edge {
        source: source.to_string(),
        target,
        kind,
    })
}

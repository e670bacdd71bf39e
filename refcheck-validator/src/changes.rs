use refcheck_model::Document;
use refcheck_types::FieldPath;

/// Whether the value at `path` needs checking.
///
/// A document without change tracking counts as modified everywhere. A
/// reference that did not change since the last save is not re-checked, even
/// if the record it points at has been deleted in the meantime.
pub fn is_modified(doc: &dyn Document, path: &FieldPath) -> bool {
    doc.is_modified(path).unwrap_or(true)
}

//! Removal of contacts by local id.

use crate::config::Settings;
use crate::error::{CompileError, Result};
use crate::sparql::{Expression, Group, Triple, Update, UpdateOperation, Variable};
use crate::vocab::{nco, rdf, rdfs};

/// Compile the removal of the contacts with the local ids `ids`.
///
/// Every contact resource is deleted as a whole. Id lists longer than
/// [`Settings::remove_chunk_size`] are split over several delete operations of one update.
///
/// # Examples
///
/// ```
/// use contactgraph::config::Settings;
/// use contactgraph::remove::compile_remove;
///
/// let update = compile_remove(&[3, 5], &Settings::default()).unwrap();
///
/// assert!(update.to_string().contains("FILTER(tracker:id(?contact) IN (3, 5))"));
/// ```
pub fn compile_remove(ids: &[u32], settings: &Settings) -> Result<Update> {
    if ids.is_empty() {
        return Err(CompileError::bad_argument("no contacts to remove"));
    }

    let contact = Variable::new("contact");
    let mut update = Update::new();

    for chunk in ids.chunks(settings.remove_chunk_size.max(1)) {
        let mut condition = Group::new();
        condition
            .triple(&contact, rdf::TYPE, Expression::iri(nco::CONTACT))
            .filter(Expression::is_in(
                Expression::tracker_id((&contact).into()),
                chunk.iter().map(|id| Expression::int(i64::from(*id))).collect(),
            ));

        update.push(UpdateOperation::Delete {
            graph: None,
            template: vec![Triple::new(&contact, rdf::TYPE, Expression::iri(rdfs::RESOURCE))],
            condition: Some(condition),
        });
    }

    log::trace!("compiled removal of {} contacts into {} operations", ids.len(), update.len());
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_renders_one_delete() {
        let update = compile_remove(&[1, 2], &Settings::default()).unwrap();

        assert_eq!(
            update.to_string(),
            "DELETE {\n  ?contact a rdfs:Resource .\n}\nWHERE {\n  ?contact a nco:Contact .\n  FILTER(tracker:id(?contact) IN (1, 2))\n}"
        );
    }

    #[test]
    fn test_remove_is_chunked() {
        let settings = Settings::default().with_remove_chunk_size(2);
        let update = compile_remove(&[1, 2, 3, 4, 5], &settings).unwrap();
        let sparql = update.to_string();

        assert_eq!(update.len(), 3);
        assert!(sparql.contains("IN (1, 2)"));
        assert!(sparql.contains("IN (3, 4)"));
        assert!(sparql.contains("IN (5)"));
    }

    #[test]
    fn test_zero_chunk_size_removes_one_by_one() {
        let settings = Settings::default().with_remove_chunk_size(0);
        assert_eq!(compile_remove(&[1, 2], &settings).unwrap().len(), 2);
    }

    #[test]
    fn test_remove_needs_ids() {
        let err = compile_remove(&[], &Settings::default()).unwrap_err();
        assert!(matches!(err, CompileError::BadArgument { .. }));
    }
}

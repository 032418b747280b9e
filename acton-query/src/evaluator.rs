//! Specification evaluation
//!
//! The evaluator is the only place a [`Specification`] is translated into a
//! result sequence. It runs four stages in a fixed order:
//!
//! 1. filter, pushed down to [`DataSource::scan`]
//! 2. include, through [`DataSource::attach`] for each requested path
//! 3. order, a stable sort on the resolved key
//! 4. page, skip then take
//!
//! Counting runs the filter stage alone, so a specification's total does not
//! depend on its ordering or paging. Evaluation is a pure read and never
//! mutates the source.

use tokio_util::sync::CancellationToken;

use crate::repository::{DataSource, Entity, RepositoryError, RepositoryOperation, RepositoryResult};
use crate::specification::{OrderBy, Paging, Specification};

/// Run a specification against a data source
pub async fn evaluate<T, S>(
    source: &S,
    spec: &Specification<T>,
    cancel: &CancellationToken,
) -> RepositoryResult<Vec<T>>
where
    T: Entity,
    S: DataSource<T>,
{
    let mut items = source.scan(spec.filter(), cancel).await?;

    for path in spec.includes() {
        ensure_live(cancel, RepositoryOperation::Include)?;
        source.attach(&mut items, path, cancel).await?;
    }

    ensure_live(cancel, RepositoryOperation::FindBySpecification)?;
    if let Some(order) = spec.order() {
        items = self::order(items, order);
    }
    if let Some(paging) = spec.paging() {
        items = page(items, paging);
    }
    Ok(items)
}

/// Count entities matching a specification's filter
///
/// Ordering, includes and paging are ignored.
pub async fn count<T, S>(
    source: &S,
    spec: &Specification<T>,
    cancel: &CancellationToken,
) -> RepositoryResult<u64>
where
    T: Entity,
    S: DataSource<T>,
{
    source.count(spec.filter(), cancel).await
}

/// Stable sort by the ordering's key
///
/// Each key is computed once. Entities with equal keys keep their relative
/// order in both directions.
///
/// # Example
///
/// ```rust
/// use acton_query::evaluator::order;
/// use acton_query::specification::{OrderDirection, SortFields};
///
/// let fields = SortFields::new().field("len", |s: &String| (s.len() as i64).into());
/// let by_len = fields.resolve("len", OrderDirection::Descending).unwrap();
///
/// let words: Vec<String> = ["bb", "a", "cc", "ddd"].map(String::from).into();
/// let sorted = order(words, &by_len);
/// assert_eq!(sorted, ["ddd", "bb", "cc", "a"]);
/// ```
pub fn order<T>(items: Vec<T>, order: &OrderBy<T>) -> Vec<T> {
    let direction = order.direction();
    let mut keyed: Vec<_> = items
        .into_iter()
        .map(|item| (order.key(&item), item))
        .collect();
    // `sort_by` is stable, and reversing the comparison (not the output)
    // keeps ties in input order for descending sorts too.
    keyed.sort_by(|(a, _), (b, _)| direction.apply(a.cmp(b)));
    keyed.into_iter().map(|(_, item)| item).collect()
}

/// Skip then take
///
/// A skip past the end yields an empty page.
pub fn page<T>(items: Vec<T>, paging: Paging) -> Vec<T> {
    let skip = usize::try_from(paging.skip).unwrap_or(usize::MAX);
    let take = usize::try_from(paging.take).unwrap_or(usize::MAX);
    items.into_iter().skip(skip).take(take).collect()
}

fn ensure_live(cancel: &CancellationToken, operation: RepositoryOperation) -> RepositoryResult<()> {
    if cancel.is_cancelled() {
        Err(RepositoryError::cancelled(operation))
    } else {
        Ok(())
    }
}

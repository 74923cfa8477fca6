//! Fill-forward lookup over ascending reference times.
//!
//! Given reference times `T[0..N)` and a query `q`, the fill-forward index is
//! the largest `i` with `T[i] <= q`. Queries before `T[0]` resolve to `None`.
//! When several references share a time, the last one wins.

use crate::error::{HistoryError, Result};

/// Index of the last reference `<= query` in an ascending slice.
///
/// O(log N). Returns `None` when the slice is empty or `query` precedes every
/// reference.
pub fn find_lower_edge<T: Ord>(times: &[T], query: &T) -> Option<usize> {
    times.partition_point(|t| t <= query).checked_sub(1)
}

/// Fill-forward index for every value in `values`, in input order.
///
/// Both inputs are sorted once (stably, so equal reference times keep their
/// registration order) and then merged in a single pass. Returned indexes
/// point into `table_values` as given.
///
/// # Errors
///
/// `HistoryError::EmptyReference` when `table_values` is empty.
pub fn fill_forward_indexes<T: Ord>(values: &[T], table_values: &[T]) -> Result<Vec<Option<usize>>> {
    if table_values.is_empty() {
        return Err(HistoryError::EmptyReference);
    }

    let mut value_order: Vec<usize> = (0..values.len()).collect();
    value_order.sort_by(|&a, &b| values[a].cmp(&values[b]));

    let mut table_order: Vec<usize> = (0..table_values.len()).collect();
    table_order.sort_by(|&a, &b| table_values[a].cmp(&table_values[b]));

    let mut out = vec![None; values.len()];
    let mut cursor = 0;
    let mut current = None;

    for &vi in &value_order {
        let value = &values[vi];
        while cursor < table_order.len() && table_values[table_order[cursor]] <= *value {
            current = Some(table_order[cursor]);
            cursor += 1;
        }
        out[vi] = current;
    }

    Ok(out)
}

/// Fill-forward values rather than indexes.
pub fn fill_forward<'a, T: Ord>(values: &[T], table_values: &'a [T]) -> Result<Vec<Option<&'a T>>> {
    Ok(fill_forward_indexes(values, table_values)?
        .into_iter()
        .map(|idx| idx.map(|i| &table_values[i]))
        .collect())
}

/// Assert that `items` is ascending (non-strict).
pub fn check_sorted<T: Ord>(items: &[T], context: &str) -> Result<()> {
    if items.windows(2).all(|w| w[0] <= w[1]) {
        Ok(())
    } else {
        Err(HistoryError::Unsorted {
            context: context.to_string(),
        })
    }
}

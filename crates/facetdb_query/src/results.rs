//! Query result cursors.

use facetdb_codec::TypedValue;

/// An owned row set produced by `rel()` execution.
///
/// Rows can be addressed two ways, and the two are mutually exclusive by
/// construction:
/// - [`RelResult::row_at_index`] for random access, while you still own
///   the result, or
/// - [`IntoIterator::into_iter`], which consumes the result and yields
///   each row exactly once.
///
/// Once an iterator has been taken the result is gone; there is no
/// handle left to index into. The iterator is fused: after it returns
/// `None` it keeps returning `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelResult {
    width: usize,
    rows: Vec<Vec<TypedValue>>,
}

impl RelResult {
    pub(crate) fn new(width: usize, rows: Vec<Vec<TypedValue>>) -> Self {
        Self { width, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when the result has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns, matching the find-spec ordering.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Random access to one row.
    pub fn row_at_index(&self, index: usize) -> Option<&[TypedValue]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Consumes the result, returning the first row if any.
    pub fn into_first(mut self) -> Option<Vec<TypedValue>> {
        if self.rows.is_empty() {
            None
        } else {
            Some(self.rows.swap_remove(0))
        }
    }

    /// Consumes the result, returning one column's values.
    ///
    /// Returns `None` when the column index is out of range.
    pub fn into_column(self, index: usize) -> Option<Vec<TypedValue>> {
        if index >= self.width {
            return None;
        }
        Some(
            self.rows
                .into_iter()
                .map(|mut row| row.swap_remove(index))
                .collect(),
        )
    }
}

impl IntoIterator for RelResult {
    type Item = Vec<TypedValue>;
    type IntoIter = RowIter;

    /// Transfers ownership of the rows into a single-pass iterator.
    fn into_iter(self) -> RowIter {
        RowIter {
            inner: self.rows.into_iter(),
        }
    }
}

/// A fused, single-pass iterator over the rows of a [`RelResult`].
#[derive(Debug)]
pub struct RowIter {
    inner: std::vec::IntoIter<Vec<TypedValue>>,
}

impl Iterator for RowIter {
    type Item = Vec<TypedValue>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for RowIter {}

impl std::iter::FusedIterator for RowIter {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RelResult {
        RelResult::new(
            2,
            vec![
                vec![TypedValue::Long(1), TypedValue::Text("a".into())],
                vec![TypedValue::Long(2), TypedValue::Text("b".into())],
            ],
        )
    }

    #[test]
    fn row_at_index() {
        let result = sample();
        assert_eq!(result.len(), 2);
        assert_eq!(result.row_at_index(0).unwrap()[0], TypedValue::Long(1));
        assert_eq!(result.row_at_index(2), None);
    }

    #[test]
    fn iteration_is_single_pass_and_fused() {
        let mut iter = sample().into_iter();
        assert!(iter.next().is_some());
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
        // Exhausted iterators stay exhausted.
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[test]
    fn into_first() {
        assert_eq!(
            sample().into_first().unwrap()[1],
            TypedValue::Text("a".into())
        );
        assert_eq!(RelResult::new(1, Vec::new()).into_first(), None);
    }

    #[test]
    fn into_column() {
        let names = sample().into_column(1).unwrap();
        assert_eq!(
            names,
            vec![TypedValue::Text("a".into()), TypedValue::Text("b".into())]
        );
        assert_eq!(sample().into_column(5), None);
    }
}

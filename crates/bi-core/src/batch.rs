//! Column-oriented batches of simulated events.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Numeric tag stamped on every event a source simulates.
///
/// Equal to the source's position in the model's `sources` list (0 when the
/// model has no list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceTag(pub u32);

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Simulated events: one `f64` column per analysis dimension plus a
/// per-event source tag. Every column has one value per tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEventBatch")]
pub struct EventBatch {
    dimensions: Vec<String>,
    columns: Vec<Vec<f64>>,
    source: Vec<SourceTag>,
}

#[derive(Deserialize)]
struct RawEventBatch {
    dimensions: Vec<String>,
    columns: Vec<Vec<f64>>,
    source: Vec<SourceTag>,
}

impl TryFrom<RawEventBatch> for EventBatch {
    type Error = String;

    fn try_from(raw: RawEventBatch) -> std::result::Result<Self, Self::Error> {
        if raw.columns.len() != raw.dimensions.len() {
            return Err(format!(
                "{} columns for {} dimensions",
                raw.columns.len(),
                raw.dimensions.len()
            ));
        }
        if let Some(column) = raw.columns.iter().find(|c| c.len() != raw.source.len()) {
            return Err(format!(
                "column of {} values for {} events",
                column.len(),
                raw.source.len()
            ));
        }
        Ok(EventBatch {
            dimensions: raw.dimensions,
            columns: raw.columns,
            source: raw.source,
        })
    }
}

impl EventBatch {
    /// Empty batch with the given dimension names.
    pub fn new(dimensions: Vec<String>) -> Self {
        Self::with_capacity(dimensions, 0)
    }

    pub fn with_capacity(dimensions: Vec<String>, capacity: usize) -> Self {
        let columns = dimensions
            .iter()
            .map(|_| Vec::with_capacity(capacity))
            .collect();
        EventBatch {
            dimensions,
            columns,
            source: Vec::with_capacity(capacity),
        }
    }

    /// Batch from per-dimension columns, all events stamped with `tag`.
    ///
    /// Columns beyond the dimension count are ignored; the batch length is
    /// that of the shortest column, and a missing column makes it empty.
    pub fn from_columns(dimensions: Vec<String>, columns: Vec<Vec<f64>>, tag: SourceTag) -> Self {
        let n = (0..dimensions.len())
            .map(|i| columns.get(i).map_or(0, Vec::len))
            .min()
            .unwrap_or(0);
        let mut columns: Vec<Vec<f64>> = columns.into_iter().take(dimensions.len()).collect();
        for column in &mut columns {
            column.truncate(n);
        }
        columns.resize_with(dimensions.len(), Vec::new);
        EventBatch {
            dimensions,
            columns,
            source: vec![tag; n],
        }
    }

    /// Append one event with one coordinate per dimension.
    pub fn push(&mut self, coordinates: &[f64], tag: SourceTag) -> Result<()> {
        if coordinates.len() != self.dimensions.len() {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions.len(),
                got: coordinates.len(),
            });
        }
        for (column, x) in self.columns.iter_mut().zip(coordinates) {
            column.push(*x);
        }
        self.source.push(tag);
        Ok(())
    }

    /// Append all events of `other`, which must have the same dimensions in
    /// the same order.
    pub fn extend(&mut self, other: &EventBatch) -> Result<()> {
        if other.dimensions.len() != self.dimensions.len() {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions.len(),
                got: other.dimensions.len(),
            });
        }
        if let Some((_, theirs)) = self
            .dimensions
            .iter()
            .zip(&other.dimensions)
            .find(|(mine, theirs)| mine != theirs)
        {
            return Err(Error::UnknownDimension(theirs.clone()));
        }
        for (mine, theirs) in self.columns.iter_mut().zip(&other.columns) {
            mine.extend_from_slice(theirs);
        }
        self.source.extend_from_slice(&other.source);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    /// Column of the named dimension.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        let i = self.dimensions.iter().position(|d| d == name)?;
        Some(&self.columns[i])
    }

    pub fn column_at(&self, index: usize) -> Option<&[f64]> {
        self.columns.get(index).map(Vec::as_slice)
    }

    pub fn sources(&self) -> &[SourceTag] {
        &self.source
    }

    pub fn record(&self, index: usize) -> Option<EventRecord<'_>> {
        (index < self.len()).then_some(EventRecord { batch: self, index })
    }

    pub fn records(&self) -> impl Iterator<Item = EventRecord<'_>> {
        (0..self.len()).map(move |index| EventRecord { batch: self, index })
    }
}

/// A view of one event in a batch.
#[derive(Debug, Clone, Copy)]
pub struct EventRecord<'a> {
    batch: &'a EventBatch,
    index: usize,
}

impl<'a> EventRecord<'a> {
    /// Coordinate along the named dimension.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.batch.column(name).map(|c| c[self.index])
    }

    pub fn coordinate(&self, dimension: usize) -> Option<f64> {
        self.batch.column_at(dimension).map(|c| c[self.index])
    }

    /// All coordinates in dimension order.
    pub fn coordinates(&self) -> Vec<f64> {
        self.batch.columns.iter().map(|c| c[self.index]).collect()
    }

    pub fn source(&self) -> SourceTag {
        self.batch.source[self.index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> Vec<String> {
        vec!["x".to_string(), "y".to_string()]
    }

    #[test]
    fn test_push_and_view() {
        let mut batch = EventBatch::new(dims());
        batch.push(&[1.0, 2.0], SourceTag(3)).unwrap();
        batch.push(&[4.0, 5.0], SourceTag(3)).unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.column("y").unwrap(), &[2.0, 5.0]);
        let rec = batch.record(1).unwrap();
        assert_eq!(rec.get("x"), Some(4.0));
        assert_eq!(rec.coordinates(), vec![4.0, 5.0]);
        assert_eq!(rec.source(), SourceTag(3));
        assert!(batch.record(2).is_none());
        assert!(rec.get("z").is_none());
    }

    #[test]
    fn test_from_columns_truncates_to_shortest() {
        let batch = EventBatch::from_columns(
            dims(),
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0]],
            SourceTag(0),
        );
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.column("x").unwrap(), &[1.0, 2.0]);
        assert_eq!(batch.sources(), &[SourceTag(0), SourceTag(0)]);
    }

    #[test]
    fn test_empty_batch() {
        let batch = EventBatch::from_columns(dims(), vec![Vec::new(), Vec::new()], SourceTag(1));
        assert!(batch.is_empty());
        assert_eq!(batch.records().count(), 0);
        assert_eq!(batch.dimensions(), dims().as_slice());
    }

    #[test]
    fn test_extend() {
        let mut a = EventBatch::from_columns(dims(), vec![vec![1.0], vec![2.0]], SourceTag(0));
        let b = EventBatch::from_columns(dims(), vec![vec![3.0], vec![4.0]], SourceTag(1));
        a.extend(&b).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a.sources(), &[SourceTag(0), SourceTag(1)]);
    }

    #[test]
    fn test_deserialize_rejects_ragged_columns() {
        let ragged = r#"{"dimensions":["x","y"],"columns":[[1.0,2.0],[3.0]],"source":[0,0]}"#;
        assert!(serde_json::from_str::<EventBatch>(ragged).is_err());
        let missing = r#"{"dimensions":["x","y"],"columns":[[1.0]],"source":[0]}"#;
        assert!(serde_json::from_str::<EventBatch>(missing).is_err());

        let batch = EventBatch::from_columns(dims(), vec![vec![1.0], vec![2.0]], SourceTag(4));
        let text = serde_json::to_string(&batch).unwrap();
        assert_eq!(serde_json::from_str::<EventBatch>(&text).unwrap(), batch);
    }

    #[test]
    fn test_wrong_arity_leaves_batch_unchanged() {
        let mut batch = EventBatch::new(dims());
        batch.push(&[1.0, 2.0], SourceTag(0)).unwrap();

        let err = batch.push(&[3.0], SourceTag(0)).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, got: 1 }));
        assert!(batch.push(&[3.0, 4.0, 5.0], SourceTag(0)).is_err());
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.column("y").unwrap(), &[2.0]);

        let other = EventBatch::from_columns(
            vec!["y".to_string(), "x".to_string()],
            vec![vec![9.0], vec![9.0]],
            SourceTag(1),
        );
        assert!(matches!(batch.extend(&other), Err(Error::UnknownDimension(_))));
        let narrow = EventBatch::from_columns(vec!["x".to_string()], vec![vec![9.0]], SourceTag(1));
        assert!(batch.extend(&narrow).is_err());
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.records().map(|r| r.coordinates()).collect::<Vec<_>>(), vec![vec![1.0, 2.0]]);
    }

    #[test]
    fn test_serializes_columns() {
        let batch = EventBatch::from_columns(dims(), vec![vec![1.0], vec![2.0]], SourceTag(7));
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["source"], serde_json::json!([7]));
        assert_eq!(json["columns"], serde_json::json!([[1.0], [2.0]]));
    }
}

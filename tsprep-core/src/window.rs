//! Sliding-window transposition.
//!
//! A window of `W` consecutive rows over `C` selected columns becomes one
//! output row. Features are laid out column-major: all `W` values of the
//! first column (`<col>_0 .. <col>_{W-1}`), then all `W` values of the
//! second, and so on.

use crate::domain::table::date_column;
use crate::domain::FeatureTable;
use crate::error::PrepError;
use chrono::NaiveDate;
use polars::prelude::*;

/// Validated window geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    pub size: usize,
    pub stride: usize,
}

impl WindowSpec {
    pub fn new(size: usize, stride: usize) -> Result<Self, PrepError> {
        if size == 0 {
            return Err(PrepError::InvalidWindowConfig("window size must be at least 1".into()));
        }
        if stride == 0 {
            return Err(PrepError::InvalidWindowConfig("stride must be at least 1".into()));
        }
        Ok(Self { size, stride })
    }

    /// Check the geometry against a table: enough rows and chronological
    /// dates.
    pub fn check(&self, table: &FeatureTable) -> Result<(), PrepError> {
        if self.size > table.height() {
            return Err(PrepError::InvalidWindowConfig(format!(
                "window size {} exceeds {} rows of {}",
                self.size,
                table.height(),
                table.ticker()
            )));
        }
        if let Some(i) = table.dates().windows(2).position(|w| w[0] >= w[1]) {
            return Err(PrepError::InvalidWindowConfig(format!(
                "dates of {} are not chronological at row {}",
                table.ticker(),
                i + 1
            )));
        }
        Ok(())
    }

    /// Start offsets `0, S, 2S, ..` of every full window over `rows` rows.
    pub fn starts(&self, rows: usize) -> impl Iterator<Item = usize> {
        let last = rows.checked_sub(self.size);
        (0..=last.unwrap_or(0))
            .step_by(self.stride)
            .take_while(move |_| last.is_some())
    }

    /// `floor((N - W) / S) + 1` when `N >= W`, else 0.
    pub fn count(&self, rows: usize) -> usize {
        match rows.checked_sub(self.size) {
            Some(span) => span / self.stride + 1,
            None => 0,
        }
    }
}

/// One window: dates, shape and flattened column-major features.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedRow {
    pub start_index: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// (rows, columns) of the window block.
    pub shape: (usize, usize),
    pub features: Vec<f64>,
}

impl WindowedRow {
    /// Rebuild the `rows × columns` block from the flattened features.
    pub fn block(&self) -> Vec<Vec<f64>> {
        let (rows, cols) = self.shape;
        (0..rows)
            .map(|r| (0..cols).map(|c| self.features[c * rows + r]).collect())
            .collect()
    }
}

/// Flattened name of value `k` of column `col`.
pub fn flat_name(col: &str, k: usize) -> String {
    format!("{col}_{k}")
}

/// `<col>_0 .. <col>_{size-1}` for each column, in block order.
pub fn flat_names(columns: &[String], size: usize) -> Vec<String> {
    columns
        .iter()
        .flat_map(|c| (0..size).map(move |k| flat_name(c, k)))
        .collect()
}

/// Every window of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedTable {
    pub ticker: String,
    pub spec: WindowSpec,
    pub columns: Vec<String>,
    pub rows: Vec<WindowedRow>,
}

impl WindowedTable {
    pub fn flat_column_names(&self) -> Vec<String> {
        flat_names(&self.columns, self.spec.size)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `ticker`, `start_date`, `end_date`, then the flattened features.
    pub fn to_frame(&self) -> Result<DataFrame, PrepError> {
        let names = self.flat_column_names();
        let mut columns = Vec::with_capacity(names.len() + 3);
        columns.push(Column::new("ticker".into(), vec![self.ticker.as_str(); self.rows.len()]));
        let starts: Vec<NaiveDate> = self.rows.iter().map(|r| r.start_date).collect();
        let ends: Vec<NaiveDate> = self.rows.iter().map(|r| r.end_date).collect();
        columns.push(date_column("start_date", &starts)?);
        columns.push(date_column("end_date", &ends)?);
        for (k, name) in names.iter().enumerate() {
            let values: Vec<f64> = self.rows.iter().map(|r| r.features[k]).collect();
            columns.push(Column::new(name.as_str().into(), values));
        }
        DataFrame::new(columns).map_err(|e| PrepError::Parquet(format!("dataframe creation: {e}")))
    }
}

/// Flatten window `[start, start + size)` of `columns`.
pub(crate) fn window_at(table: &FeatureTable, columns: &[&[f64]], start: usize, size: usize) -> WindowedRow {
    let mut features = Vec::with_capacity(columns.len() * size);
    for values in columns {
        features.extend_from_slice(&values[start..start + size]);
    }
    WindowedRow {
        start_index: start,
        start_date: table.dates()[start],
        end_date: table.dates()[start + size - 1],
        shape: (size, columns.len()),
        features,
    }
}

/// Slide a `window_size` window with `stride` over `table`.
///
/// `columns` defaults to every feature column of the table.
pub fn transpose_columns(
    table: &FeatureTable,
    window_size: usize,
    stride: usize,
    columns: Option<&[String]>,
) -> Result<WindowedTable, PrepError> {
    let spec = WindowSpec::new(window_size, stride)?;
    spec.check(table)?;

    let selected: Vec<String> = match columns {
        Some(cols) => cols.to_vec(),
        None => table.column_names().into_iter().map(String::from).collect(),
    };
    let series = selected
        .iter()
        .map(|c| table.require_column(c))
        .collect::<Result<Vec<_>, _>>()?;

    let rows = spec
        .starts(table.height())
        .map(|i| window_at(table, &series, i, spec.size))
        .collect();

    Ok(WindowedTable {
        ticker: table.ticker().to_string(),
        spec,
        columns: selected,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(n: usize) -> FeatureTable {
        let base = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        let dates = (0..n).map(|i| base + chrono::Duration::days(i as i64)).collect();
        let mut t = FeatureTable::new("PETR4", dates);
        t.set_column("a", (0..n).map(|i| i as f64).collect()).unwrap();
        t.set_column("b", (0..n).map(|i| 100.0 + i as f64).collect()).unwrap();
        t
    }

    #[test]
    fn window_count_and_dates() {
        let t = table(10);
        let w = transpose_columns(&t, 3, 2, None).unwrap();
        assert_eq!(w.len(), 4);
        assert_eq!(w.rows[1].start_date, t.dates()[2]);
        assert_eq!(w.rows[1].end_date, t.dates()[4]);
        assert_eq!(w.rows[3].start_index, 6);
    }

    #[test]
    fn column_major_layout() {
        let w = transpose_columns(&table(5), 3, 1, None).unwrap();
        assert_eq!(w.rows[1].features, vec![1.0, 2.0, 3.0, 101.0, 102.0, 103.0]);
        assert_eq!(
            w.flat_column_names(),
            vec!["a_0", "a_1", "a_2", "b_0", "b_1", "b_2"]
        );
    }

    #[test]
    fn block_rebuilds_rows() {
        let w = transpose_columns(&table(5), 2, 1, None).unwrap();
        assert_eq!(w.rows[2].shape, (2, 2));
        assert_eq!(w.rows[2].block(), vec![vec![2.0, 102.0], vec![3.0, 103.0]]);
    }

    #[test]
    fn selected_columns_only() {
        let w = transpose_columns(&table(4), 2, 2, Some(&["b".to_string()])).unwrap();
        assert_eq!(w.columns, vec!["b"]);
        assert_eq!(w.rows[0].features, vec![100.0, 101.0]);
    }

    #[test]
    fn window_equal_to_height_gives_one_row() {
        assert_eq!(transpose_columns(&table(4), 4, 3, None).unwrap().len(), 1);
    }

    #[test]
    fn invalid_geometry() {
        let t = table(4);
        for (size, stride) in [(5, 1), (0, 1), (2, 0)] {
            assert!(matches!(
                transpose_columns(&t, size, stride, None),
                Err(PrepError::InvalidWindowConfig(_))
            ));
        }
    }

    #[test]
    fn non_chronological_dates_rejected() {
        let d = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        let mut t = FeatureTable::new("X", vec![d, d.succ_opt().unwrap(), d]);
        t.set_column("a", vec![1.0, 2.0, 3.0]).unwrap();
        assert!(matches!(
            transpose_columns(&t, 2, 1, None),
            Err(PrepError::InvalidWindowConfig(_))
        ));
    }

    #[test]
    fn unknown_column() {
        assert!(matches!(
            transpose_columns(&table(4), 2, 1, Some(&["zz".to_string()])),
            Err(PrepError::MissingColumn { .. })
        ));
    }

    #[test]
    fn starts_and_count_agree() {
        let spec = WindowSpec::new(20, 5).unwrap();
        assert_eq!(spec.count(260), 49);
        assert_eq!(spec.starts(260).count(), 49);
        assert_eq!(spec.starts(260).last(), Some(240));
        assert_eq!(spec.count(19), 0);
        assert_eq!(spec.starts(19).count(), 0);
    }

    #[test]
    fn frame_has_flattened_columns() {
        let w = transpose_columns(&table(5), 2, 1, None).unwrap();
        let df = w.to_frame().unwrap();
        assert_eq!(df.height(), 4);
        assert_eq!(df.width(), 3 + 4);
        assert_eq!(df.get_column_names()[3].as_str(), "a_0");
    }
}

use std::{fs::File, io::Cursor, path::Path};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerReader, prelude::CsvReadOptions};

use super::{Record, RecordSource, Scalar};

/// Records read from a CSV file with a header row. Every cell is read as text
/// and inferred to a scalar afterwards, so ids keep their exact spelling.
#[derive(Debug, Clone)]
pub struct CsvSource {
    frame: DataFrame,
}

impl CsvSource {
    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("[records::csv] Failed to open CSV file: {}", path.display()))?;
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(file)
            .finish()
            .with_context(|| format!("[records::csv] Failed to read CSV from {:?}", path))?;
        Ok(Self { frame })
    }

    pub fn from_text(csv: &str) -> Result<Self> {
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(Cursor::new(csv.as_bytes().to_vec()))
            .finish()
            .context("[records::csv] Failed to read CSV from text")?;
        Ok(Self { frame })
    }

    #[inline] pub fn len(&self) -> usize { self.frame.height() }

    #[inline] pub fn is_empty(&self) -> bool { self.frame.height() == 0 }
}

impl RecordSource for CsvSource {
    fn records(&self) -> Result<Vec<Record>> {
        let names: Vec<String> = self.frame.get_column_names().into_iter().map(|n| n.to_string()).collect();
        let columns = names.iter()
            .map(|name| {
                self.frame.column(name)
                    .and_then(|c| c.str())
                    .with_context(|| format!("[records::csv] Column '{name}' is not text"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((0..self.frame.height())
            .map(|i| {
                names.iter().zip(&columns)
                    .map(|(name, column)| (name.clone(), column.get(i).and_then(Scalar::infer)))
                    .collect()
            })
            .collect())
    }
}

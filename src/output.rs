use std::ffi::OsStr;
use std::path::Path;

use tokio::{fs::File, io::AsyncWriteExt};
use tracing::info;

use crate::record::Record;
use crate::{Error, Result};

/// File formats the side channel knows how to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    /// Picks the format from the file extension; anything but `.csv` or
    /// `.json` is a configuration error.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(OsStr::to_str) {
            Some("csv") => Ok(OutputFormat::Csv),
            Some("json") => Ok(OutputFormat::Json),
            _ => Err(Error::Config(format!(
                "output file {} must end in .csv or .json",
                path.display()
            ))),
        }
    }
}

/// Writes the batch's records to the side-channel file in one shot.
pub async fn write_records(path: &Path, format: OutputFormat, records: &[Record]) -> Result<()> {
    let bytes = match format {
        OutputFormat::Csv => render_csv(records)?,
        OutputFormat::Json => render_json(records)?,
    };

    let mut file = File::create(path).await?;
    file.write_all(&bytes).await?;
    info!(path = %path.display(), records = records.len(), "wrote output file");
    Ok(())
}

/// Header comes from the first record's keys; records iterate in sorted key
/// order, so header and rows always agree. Keys a later record is missing
/// become empty cells.
fn render_csv(records: &[Record]) -> Result<Vec<u8>> {
    let Some(first) = records.first() else {
        return Ok(Vec::new());
    };

    let header: Vec<&str> = first.keys().map(String::as_str).collect();
    let mut buf = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer.write_record(&header)?;
        for record in records {
            let row: Vec<&str> = header
                .iter()
                .map(|key| record.get(*key).map(String::as_str).unwrap_or(""))
                .collect();
            writer.write_record(&row)?;
        }
        writer.flush()?;
    }
    Ok(buf)
}

fn render_json(records: &[Record]) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(records)?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, &str)]) -> Record {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn format_follows_the_extension() {
        assert_eq!(
            OutputFormat::from_path(Path::new("saida.csv")).unwrap(),
            OutputFormat::Csv
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("saida.json")).unwrap(),
            OutputFormat::Json
        );
        assert!(OutputFormat::from_path(Path::new("saida.xml")).is_err());
        assert!(OutputFormat::from_path(Path::new("saida")).is_err());
    }

    #[test]
    fn csv_writes_header_then_one_row_per_record() {
        let records = vec![
            record(&[("a", "1"), ("b", "2")]),
            record(&[("a", "3"), ("b", "4")]),
        ];
        let bytes = render_csv(&records).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "a,b\n1,2\n3,4\n");
    }

    #[test]
    fn csv_of_no_records_is_empty() {
        assert!(render_csv(&[]).unwrap().is_empty());
    }

    #[test]
    fn csv_fills_missing_keys_with_empty_cells() {
        let records = vec![record(&[("a", "1"), ("b", "2")]), record(&[("a", "3")])];
        let bytes = render_csv(&records).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "a,b\n1,2\n3,\n");
    }

    #[test]
    fn csv_quotes_embedded_separators() {
        let records = vec![record(&[("nome", "Silva, Ana"), ("cpf", "123")])];
        let text = String::from_utf8(render_csv(&records).unwrap()).unwrap();
        assert_eq!(text, "cpf,nome\n123,\"Silva, Ana\"\n");
    }

    #[test]
    fn json_renders_the_records_as_an_array() {
        let records = vec![record(&[("nome", "Ana")])];
        let text = String::from_utf8(render_json(&records).unwrap()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0]["nome"], "Ana");
    }

    #[tokio::test]
    async fn writes_the_rendered_bytes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.csv");
        let records = vec![record(&[("a", "1")])];

        write_records(&path, OutputFormat::Csv, &records)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\n1\n");
    }
}

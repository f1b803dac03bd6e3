use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, Float32Array, Float64Array, Int32Array, Int64Array, LargeListArray, ListArray,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{FEATURE_COUNT, FEATURES, MeasurementVector, ReferencePopulation, Subject, SubjectId};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load the reference population from a file.  Dispatch by extension.
///
/// Supported formats, one record per subject:
/// * `.parquet` – `id`, list columns `x` and `d`, scalar `weight` (recommended)
/// * `.json`    – `[{ "id": 3003, "x": [...], "d": [...], "weight": 71.0 }, ...]`
/// * `.csv`     – `id`, `x`, `d`, `weight`; `x` and `d` semicolon-separated
pub fn load_file(path: &Path) -> Result<ReferencePopulation> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let population = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading reference population from {}", path.display()))?;

    log::info!(
        "Loaded {} reference subjects from {}",
        population.len(),
        path.display()
    );
    Ok(population)
}

/// Read the listener's measurements.
///
/// Layout: a header row, then one row per feature in measurement order with
/// the value in the third column. Exactly twelve rows are expected.
pub fn read_measurements(path: &Path) -> Result<MeasurementVector> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening measurements {}", path.display()))?;

    let mut values = Vec::with_capacity(FEATURE_COUNT);
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Measurement row {row_no}"))?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        if values.len() == FEATURE_COUNT {
            bail!("Measurement row {row_no}: expected only {FEATURE_COUNT} rows");
        }
        let raw = record
            .get(2)
            .with_context(|| format!("Measurement row {row_no}: missing value column"))?
            .trim();
        let value: f64 = raw
            .parse()
            .with_context(|| format!("Measurement row {row_no}: '{raw}' is not a number"))?;
        if !value.is_finite() {
            bail!("Measurement row {row_no}: value must be finite, got {raw}");
        }
        log::debug!(
            "{} ({}) = {value}",
            FEATURES[values.len()].feature,
            record.get(0).unwrap_or("")
        );
        values.push(value);
    }

    let count = values.len();
    MeasurementVector::try_from(values)
        .with_context(|| format!("{}: found {count} measurement rows", path.display()))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "id": 3003, "x": [15.2, 21.9, ...], "d": [1.7, null, ...], "weight": 71.0 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<ReferencePopulation> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut subjects = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let id = obj
            .get("id")
            .and_then(json_to_id)
            .with_context(|| format!("Row {i}: missing or invalid 'id'"))?;
        let x = json_array_to_f64(obj.get("x"), i, "x")?;
        let d = json_array_to_f64(obj.get("d"), i, "d")?;
        let weight_kg = match obj.get("weight") {
            None | Some(JsonValue::Null) => f64::NAN,
            Some(v) => v
                .as_f64()
                .with_context(|| format!("Row {i}: 'weight' is not a number"))?,
        };

        subjects.push(Subject { id, x, d, weight_kg });
    }

    ReferencePopulation::from_subjects(subjects)
}

fn json_to_id(val: &JsonValue) -> Option<SubjectId> {
    let n = match val {
        JsonValue::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(float_to_id))?,
        JsonValue::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    u32::try_from(n).ok().map(SubjectId)
}

fn float_to_id(f: f64) -> Option<u64> {
    (f.fract() == 0.0 && f >= 0.0 && f <= u32::MAX as f64).then_some(f as u64)
}

fn json_array_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: missing or invalid '{col}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| match v {
            JsonValue::Null => Ok(f64::NAN),
            _ => v
                .as_f64()
                .with_context(|| format!("Row {row}, {col}[{j}]: not a number")),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names `id`, `x`, `d`, `weight`.
/// `x` and `d` contain semicolon-separated floats; an empty token or `nan`
/// marks a missing value:  `"15.2;21.9;;19.0"`.
fn load_csv(path: &Path) -> Result<ReferencePopulation> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("CSV missing '{name}' column"))
    };
    let id_idx = column("id")?;
    let x_idx = column("x")?;
    let d_idx = column("d")?;
    let w_idx = column("weight")?;

    let mut subjects = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let raw_id = record.get(id_idx).unwrap_or("").trim();
        let id = raw_id
            .parse::<u32>()
            .ok()
            .or_else(|| raw_id.parse::<f64>().ok().and_then(float_to_id).and_then(|n| u32::try_from(n).ok()))
            .map(SubjectId)
            .with_context(|| format!("Row {row_no}: '{raw_id}' is not a subject id"))?;
        let x = parse_semicolon_floats(record.get(x_idx).unwrap_or(""), row_no, "x")?;
        let d = parse_semicolon_floats(record.get(d_idx).unwrap_or(""), row_no, "d")?;
        let weight_kg = parse_float(record.get(w_idx).unwrap_or(""), row_no, "weight")?;

        subjects.push(Subject { id, x, d, weight_kg });
    }

    ReferencePopulation::from_subjects(subjects)
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split(';')
        .enumerate()
        .map(|(j, tok)| parse_float(tok, row, &format!("{col}[{j}]")))
        .collect()
}

fn parse_float(tok: &str, row: usize, col: &str) -> Result<f64> {
    let tok = tok.trim();
    if tok.is_empty() {
        return Ok(f64::NAN);
    }
    tok.parse::<f64>()
        .with_context(|| format!("Row {row}, {col}: '{tok}' is not a number"))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing the reference population.
///
/// Expected schema:
/// - `id`: Int32, Int64 or Float64 – subject identifier
/// - `x`, `d`: List<Float64> or LargeList<Float64> (Float32 inner also accepted)
/// - `weight`: Float64 or Float32
///
/// Null list entries and null weights read as missing values.
fn load_parquet(path: &Path) -> Result<ReferencePopulation> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut subjects = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let decoded = subjects_from_batch(&batch, subjects.len())?;
        subjects.extend(decoded);
    }

    ReferencePopulation::from_subjects(subjects)
}

/// Decode one record batch. `offset` is the number of rows read from earlier
/// batches, so error messages carry file-wide row numbers.
fn subjects_from_batch(batch: &RecordBatch, offset: usize) -> Result<Vec<Subject>> {
    let schema = batch.schema();
    let index_of = |name: &str| {
        schema
            .index_of(name)
            .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))
    };
    let id_col = batch.column(index_of("id")?);
    let x_col = batch.column(index_of("x")?);
    let d_col = batch.column(index_of("d")?);
    let w_col = batch.column(index_of("weight")?);

    let mut subjects = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let row_no = offset + row;
        let id = extract_id(id_col, row)
            .with_context(|| format!("Row {row_no}: failed to read 'id'"))?;
        let x = extract_f64_list(x_col, row)
            .with_context(|| format!("Row {row_no}: failed to read 'x'"))?;
        let d = extract_f64_list(d_col, row)
            .with_context(|| format!("Row {row_no}: failed to read 'd'"))?;
        let weight_kg = extract_f64(w_col, row)
            .with_context(|| format!("Row {row_no}: failed to read 'weight'"))?;

        subjects.push(Subject { id, x, d, weight_kg });
    }
    Ok(subjects)
}

// -- Parquet / Arrow helpers --

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        return Ok(Vec::new());
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // The inner array can be Float64 or Float32
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

/// Extract a scalar float, null reads as `NaN`.
fn extract_f64(col: &Arc<dyn Array>, row: usize) -> Result<f64> {
    if col.is_null(row) {
        return Ok(f64::NAN);
    }
    if let Some(arr) = col.as_any().downcast_ref::<Float64Array>() {
        Ok(arr.value(row))
    } else if let Some(arr) = col.as_any().downcast_ref::<Float32Array>() {
        Ok(arr.value(row) as f64)
    } else {
        bail!("Expected Float64 or Float32 column, got {:?}", col.data_type())
    }
}

fn extract_id(col: &Arc<dyn Array>, row: usize) -> Result<SubjectId> {
    if col.is_null(row) {
        bail!("null subject id");
    }
    let n: Option<u64> = match col.data_type() {
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .and_then(|a| u64::try_from(a.value(row)).ok()),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .and_then(|a| u64::try_from(a.value(row)).ok()),
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .and_then(|a| float_to_id(a.value(row))),
        other => bail!("Expected integer id column, got {other:?}"),
    };
    n.and_then(|n| u32::try_from(n).ok())
        .map(SubjectId)
        .context("subject id out of range")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn csv_population_with_gaps() {
        let file = write_temp(
            ".csv",
            "id,x,d,weight\n3001,1.0;2.0,;5.0,70\n3002,3.0;nan,4.0,\n",
        );
        let pop = load_file(file.path()).unwrap();
        assert_eq!(pop.len(), 2);
        assert_eq!(pop.id(1), Some(SubjectId(3002)));
        assert!(pop.subjects[0].d[0].is_nan());
        assert!(pop.subjects[1].x[1].is_nan());
        assert!(pop.subjects[1].weight_kg.is_nan());
    }

    #[test]
    fn json_population_nulls_are_missing() {
        let file = write_temp(
            ".json",
            r#"[{"id": 3003, "x": [1.5, null], "d": [], "weight": 80.5},
                {"id": "3004", "x": [], "d": [2.0], "weight": null}]"#,
        );
        let pop = load_file(file.path()).unwrap();
        assert_eq!(pop.id(0), Some(SubjectId(3003)));
        assert_eq!(pop.id(1), Some(SubjectId(3004)));
        assert!(pop.subjects[0].x[1].is_nan());
        assert!(pop.subjects[1].weight_kg.is_nan());
    }

    #[test]
    fn unsupported_extension() {
        let file = write_temp(".mat", "");
        let err = load_file(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported file extension"));
    }

    #[test]
    fn csv_missing_column_is_reported() {
        let file = write_temp(".csv", "id,x,weight\n3001,1.0,70\n");
        let err = load_file(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("'d'"));
    }

    fn parquet_batch(ids: Vec<Option<i64>>) -> RecordBatch {
        use arrow::array::{Float64Builder, ListBuilder};
        use arrow::datatypes::{Field, Schema};

        let n = ids.len();
        let lists = || {
            let mut builder = ListBuilder::new(Float64Builder::new());
            for _ in 0..n {
                builder.values().append_value(1.0);
                builder.append(true);
            }
            Arc::new(builder.finish()) as Arc<dyn Array>
        };
        let x = lists();
        let d = lists();
        let list_type = DataType::List(Arc::new(Field::new("item", DataType::Float64, true)));
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, true),
            Field::new("x", list_type.clone(), false),
            Field::new("d", list_type, false),
            Field::new("weight", DataType::Float64, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(ids)),
                x,
                d,
                Arc::new(Float64Array::from(vec![70.0; n])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn parquet_rows_are_numbered_across_batches() {
        let batch = parquet_batch(vec![Some(3001), None]);
        let err = subjects_from_batch(&batch, 100).unwrap_err();
        assert!(format!("{err:#}").contains("Row 101: failed to read 'id'"));

        let ok = subjects_from_batch(&parquet_batch(vec![Some(3001), Some(3002)]), 0).unwrap();
        assert_eq!(ok.len(), 2);
        assert_eq!(ok[1].id, SubjectId(3002));
    }

    #[test]
    fn parquet_file_round_trip() {
        use parquet::arrow::ArrowWriter;

        let batch = parquet_batch(vec![Some(3001), Some(3002)]);
        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let mut writer =
            ArrowWriter::try_new(file.reopen().unwrap(), batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.write(&parquet_batch(vec![Some(3003)])).unwrap();
        writer.close().unwrap();

        let pop = load_file(file.path()).unwrap();
        assert_eq!(pop.len(), 3);
        assert_eq!(pop.id(2), Some(SubjectId(3003)));
        assert_eq!(pop.subjects[0].x, vec![1.0]);
    }

    fn measurement_csv(rows: usize) -> String {
        let mut s = String::from("feature,unit,value\n");
        for i in 0..rows {
            s.push_str(&format!("f{i},cm,{}.5\n", i + 1));
        }
        s
    }

    #[test]
    fn measurements_read_third_column() {
        let file = write_temp(".csv", &measurement_csv(12));
        let mv = read_measurements(file.path()).unwrap();
        assert_eq!(mv.0[0], 1.5);
        assert_eq!(mv.0[11], 12.5);
    }

    #[test]
    fn measurements_require_twelve_rows() {
        let short = write_temp(".csv", &measurement_csv(11));
        assert!(read_measurements(short.path()).is_err());
        let long = write_temp(".csv", &measurement_csv(13));
        assert!(read_measurements(long.path()).is_err());
    }

    #[test]
    fn measurements_reject_garbage() {
        let mut s = measurement_csv(11);
        s.push_str("f11,kg,heavy\n");
        let file = write_temp(".csv", &s);
        let err = read_measurements(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("heavy"));
    }
}

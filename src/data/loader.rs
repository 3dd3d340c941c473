use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, LargeStringArray,
    StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::Value as JsonValue;
use zip::result::ZipError;
use zip::ZipArchive;

use super::model::{CellValue, RawTable};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a sheet of records from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx`    – Excel workbook, first sheet, first row is the header
/// * `.csv`     – header row, one record per line
/// * `.json`    – `[{ "Study Hours": 4, "GPA": 3.1, ... }, ...]`
/// * `.parquet` – flat table of primitive columns
pub fn load_file(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "xlsx" => load_xlsx(path),
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// XLSX loader
// ---------------------------------------------------------------------------

const FALLBACK_SHEET: &str = "xl/worksheets/sheet1.xml";

/// An `.xlsx` workbook is a zip archive of XML parts:
///
/// ```text
/// xl/workbook.xml             <sheet name=".." r:id="rId1"/>
/// xl/_rels/workbook.xml.rels  <Relationship Id="rId1" Target="worksheets/sheet1.xml"/>
/// xl/sharedStrings.xml        <si><t>Study Hours</t></si> ...
/// xl/worksheets/sheet1.xml    <row><c r="A1" t="s"><v>0</v></c> ...
/// ```
fn load_xlsx(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening workbook")?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).context("workbook is not a valid zip archive")?;

    let shared = match read_part(&mut archive, "xl/sharedStrings.xml")? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let sheet_path = first_sheet_path(&mut archive)?;
    log::debug!("Reading worksheet part {sheet_path}");
    let xml = read_part(&mut archive, &sheet_path)?
        .with_context(|| format!("workbook is missing worksheet part {sheet_path}"))?;

    let grid = parse_sheet(&xml, &shared)?;
    table_from_grid(grid)
}

/// Read one archive member as text; `None` if the member does not exist.
fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("reading {name}")),
    };
    let mut text = String::new();
    file.read_to_string(&mut text)
        .with_context(|| format!("reading {name}"))?;
    Ok(Some(text))
}

fn first_sheet_path<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String> {
    let Some(workbook) = read_part(archive, "xl/workbook.xml")? else {
        return Ok(FALLBACK_SHEET.to_string());
    };
    let Some(rel_id) = first_sheet_rel_id(&workbook)? else {
        return Ok(FALLBACK_SHEET.to_string());
    };
    let Some(rels) = read_part(archive, "xl/_rels/workbook.xml.rels")? else {
        return Ok(FALLBACK_SHEET.to_string());
    };
    Ok(relationship_target(&rels, &rel_id)?
        .map(|target| match target.strip_prefix('/') {
            Some(absolute) => absolute.to_string(),
            None => format!("xl/{target}"),
        })
        .unwrap_or_else(|| FALLBACK_SHEET.to_string()))
}

fn first_sheet_rel_id(workbook_xml: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(workbook_xml);
    loop {
        match reader.read_event().context("parsing xl/workbook.xml")? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                return attribute(&e, b"id");
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn relationship_target(rels_xml: &str, rel_id: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(rels_xml);
    loop {
        match reader.read_event().context("parsing workbook relationships")? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if attribute(&e, b"Id")?.as_deref() == Some(rel_id) {
                    return attribute(&e, b"Target");
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Look up an attribute by local name (`r:id` matches `id`).
fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.context("malformed XML attribute")?;
        if attr.key.local_name().as_ref() == key {
            let value = attr
                .unescape_value()
                .context("malformed XML attribute value")?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Collect the shared string table. Rich-text runs are concatenated,
/// phonetic hints (`rPh`) are skipped.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event().context("parsing xl/sharedStrings.xml")? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text && !in_phonetic => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&t.unescape().context("bad text in shared strings")?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                b"si" => strings.extend(current.take()),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(strings)
}

/// A `<c>` element being read: target column, `t` attribute, raw text.
struct PendingCell {
    col: usize,
    kind: String,
    raw: String,
}

impl PendingCell {
    fn from_start(e: &BytesStart<'_>, next_col: usize) -> Result<Self> {
        let col = match attribute(e, b"r")? {
            Some(reference) => column_index(&reference)?.unwrap_or(next_col),
            None => next_col,
        };
        let kind = attribute(e, b"t")?.unwrap_or_else(|| "n".to_string());
        Ok(PendingCell {
            col,
            kind,
            raw: String::new(),
        })
    }

    fn resolve(self, shared: &[String]) -> Result<CellValue> {
        let value = match self.kind.as_str() {
            "s" => {
                let idx: usize = self
                    .raw
                    .trim()
                    .parse()
                    .with_context(|| format!("bad shared string index '{}'", self.raw))?;
                let text = shared
                    .get(idx)
                    .with_context(|| format!("shared string {idx} out of range"))?;
                CellValue::Text(text.clone())
            }
            "str" | "inlineStr" => CellValue::Text(self.raw),
            "b" => CellValue::Bool(self.raw.trim() == "1"),
            // #DIV/0!, #N/A, ... read as missing
            "e" => CellValue::Null,
            _ => guess_cell_type(self.raw.trim()),
        };
        Ok(value)
    }
}

/// Zero-based index of `XFD`, the last column a worksheet can have.
const MAX_COLUMN: usize = 16_383;

/// `"AB12"` → column 27 (zero-based); `None` without a column part.
fn column_index(reference: &str) -> Result<Option<usize>> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(u8::is_ascii_alphabetic)
        .map(|b| b.to_ascii_uppercase())
        .collect();
    if letters.is_empty() {
        return Ok(None);
    }
    let one_based = letters.iter().try_fold(0usize, |acc, b| {
        acc.checked_mul(26)?.checked_add((b - b'A' + 1) as usize)
    });
    match one_based {
        Some(n) if n - 1 <= MAX_COLUMN => Ok(Some(n - 1)),
        _ => bail!("cell reference '{reference}' is beyond the last column XFD"),
    }
}

fn parse_sheet(xml: &str, shared: &[String]) -> Result<Vec<Vec<CellValue>>> {
    let mut reader = Reader::from_str(xml);
    let mut rows = Vec::new();
    let mut row: Vec<CellValue> = Vec::new();
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;

    loop {
        match reader.read_event().context("parsing worksheet")? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => row.clear(),
                b"c" => cell = Some(PendingCell::from_start(&e, row.len())?),
                // <v> for plain values, <t> for inline strings
                b"v" | b"t" => in_value = cell.is_some(),
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"row" => rows.push(Vec::new()),
            Event::Text(t) if in_value => {
                if let Some(c) = cell.as_mut() {
                    c.raw.push_str(&t.unescape().context("bad text in worksheet")?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let Some(c) = cell.take() {
                        let col = c.col;
                        let value = c.resolve(shared)?;
                        if row.len() <= col {
                            row.resize(col + 1, CellValue::Null);
                        }
                        row[col] = value;
                    }
                }
                b"row" => rows.push(std::mem::take(&mut row)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rows)
}

/// First row is the header. Blank header cells are named `Unnamed: <index>`.
fn table_from_grid(mut grid: Vec<Vec<CellValue>>) -> Result<RawTable> {
    if grid.is_empty() {
        bail!("worksheet is empty");
    }
    let header = grid.remove(0);
    let width = grid
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0);

    let columns = (0..width)
        .map(|i| match header.get(i) {
            Some(cell) if !cell.is_missing() => cell.to_string(),
            _ => format!("Unnamed: {i}"),
        })
        .collect();

    Ok(RawTable::new(columns, grid))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one record per line.
fn load_csv(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;
    let columns: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(guess_cell_type).collect());
    }

    Ok(RawTable::new(columns, rows))
}

fn guess_cell_type(s: &str) -> CellValue {
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::Text(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON layout, one object per record:
///
/// ```json
/// [
///   { "Name": "Ana", "Study Hours": 4, "GPA": 3.1 },
///   ...
/// ]
/// ```
///
/// Columns appear in first-seen key order.
fn load_json(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let rows = objects
        .iter()
        .map(|obj| {
            columns
                .iter()
                .map(|col| obj.get(col).map(json_to_cell).unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    Ok(RawTable::new(columns, rows))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet table. Columns keep schema order; nested or exotic
/// column types are shown as their type name.
fn load_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            rows.push(
                batch
                    .columns()
                    .iter()
                    .map(|col| extract_cell(col, row))
                    .collect(),
            );
        }
    }

    Ok(RawTable::new(columns, rows))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|a| CellValue::Text(a.value(row).to_string())),
        DataType::LargeUtf8 => any
            .downcast_ref::<LargeStringArray>()
            .map(|a| CellValue::Text(a.value(row).to_string())),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| CellValue::Integer(a.value(row) as i64)),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| CellValue::Integer(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| CellValue::Float(a.value(row) as f64)),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| CellValue::Float(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| CellValue::Bool(a.value(row))),
        _ => None,
    };
    value.unwrap_or_else(|| CellValue::Text(format!("{:?}", col.data_type())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Students" sheetId="1" r:id="rId7"/></sheets></workbook>"#;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="styles" Target="styles.xml"/>
<Relationship Id="rId7" Type="worksheet" Target="worksheets/data.xml"/>
</Relationships>"#;

    const SHARED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="4">
<si><t>Name</t></si>
<si><r><t>Study </t></r><r><t xml:space="preserve">Hours</t></r></si>
<si><t>GPA</t></si>
<si><t>Ana &amp; Co</t></si>
</sst>"#;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>2</v></c></row>
<row r="2"><c r="A2" t="s"><v>3</v></c><c r="B2"><v>4</v></c><c r="C2"><v>3.25</v></c></row>
<row r="3"><c r="A3" t="inlineStr"><is><t>Ben</t></is></c><c r="C3" t="e"><v>#N/A</v></c></row>
</sheetData></worksheet>"#;

    fn write_workbook(dir: &Path, parts: &[(&str, &str)]) -> std::path::PathBuf {
        let path = dir.join("students.xlsx");
        let file = std::fs::File::create(&path).unwrap();
        let mut zip = ZipWriter::new(file);
        for (name, body) in parts {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    #[test]
    fn test_xlsx_follows_workbook_relationships() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_workbook(
            dir.path(),
            &[
                ("xl/workbook.xml", WORKBOOK),
                ("xl/_rels/workbook.xml.rels", RELS),
                ("xl/sharedStrings.xml", SHARED),
                ("xl/worksheets/data.xml", SHEET),
            ],
        );

        let table = load_file(&path).unwrap();
        assert_eq!(table.columns, vec!["Name", "Study Hours", "GPA"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][0], CellValue::Text("Ana & Co".into()));
        assert_eq!(table.rows[0][1], CellValue::Integer(4));
        assert_eq!(table.rows[0][2], CellValue::Float(3.25));
        assert_eq!(table.rows[1][0], CellValue::Text("Ben".into()));
        assert_eq!(table.rows[1][1], CellValue::Null);
        assert_eq!(table.rows[1][2], CellValue::Null);
    }

    #[test]
    fn test_xlsx_falls_back_to_first_sheet_part() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = r#"<worksheet><sheetData>
<row><c t="str"><v>hours studied</v></c><c><v>x</v></c></row>
<row><c><v>1.5</v></c><c r="D2"><v>7</v></c></row>
</sheetData></worksheet>"#;
        let path = write_workbook(dir.path(), &[("xl/worksheets/sheet1.xml", sheet)]);

        let table = load_file(&path).unwrap();
        assert_eq!(
            table.columns,
            vec!["hours studied", "x", "Unnamed: 2", "Unnamed: 3"]
        );
        assert_eq!(table.rows[0][0], CellValue::Float(1.5));
        assert_eq!(table.rows[0][3], CellValue::Integer(7));
    }

    #[test]
    fn test_xlsx_rejects_non_zip_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"definitely not a workbook").unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("zip"));
    }

    #[test]
    fn test_column_index_from_reference() {
        assert_eq!(column_index("A1").unwrap(), Some(0));
        assert_eq!(column_index("Z9").unwrap(), Some(25));
        assert_eq!(column_index("AB12").unwrap(), Some(27));
        assert_eq!(column_index("XFD1").unwrap(), Some(MAX_COLUMN));
        assert_eq!(column_index("12").unwrap(), None);
        assert!(column_index("XFE1").is_err());
        assert!(column_index("AAAAAAAAAAAAAAAA2").is_err());
    }

    #[test]
    fn test_xlsx_rejects_out_of_range_cell_reference() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = r#"<worksheet><sheetData>
<row><c t="str"><v>Study Hours</v></c><c t="str"><v>GPA</v></c></row>
<row><c r="A2"><v>3</v></c><c r="ZZZZZZ2"><v>3.5</v></c></row>
</sheetData></worksheet>"#;
        let path = write_workbook(dir.path(), &[("xl/worksheets/sheet1.xml", sheet)]);

        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("ZZZZZZ2"));
    }

    #[test]
    fn test_csv_guesses_cell_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students.csv");
        std::fs::write(&path, "Name,Study Hours,GPA\nAna,4,3.1\nBen,,3.9\n").unwrap();

        let table = load_file(&path).unwrap();
        assert_eq!(table.columns, vec!["Name", "Study Hours", "GPA"]);
        assert_eq!(table.rows[0][1], CellValue::Integer(4));
        assert_eq!(table.rows[0][2], CellValue::Float(3.1));
        assert_eq!(table.rows[1][1], CellValue::Null);
    }

    #[test]
    fn test_json_keeps_first_seen_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students.json");
        std::fs::write(
            &path,
            r#"[{"Score (%)": 81, "Hours Studying": 3.5}, {"Hours Studying": 9, "age": 20}]"#,
        )
        .unwrap();

        let table = load_file(&path).unwrap();
        assert_eq!(table.columns, vec!["Score (%)", "Hours Studying", "age"]);
        assert_eq!(table.rows[0][2], CellValue::Null);
        assert_eq!(table.rows[1][0], CellValue::Null);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_file(Path::new("grades.ods")).unwrap_err();
        assert!(err.to_string().contains(".ods"));
    }
}

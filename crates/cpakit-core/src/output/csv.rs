use std::io::Write;

use crate::error::{CpaError, Result};
use crate::table::{Column, Frame, Key};

/// Write a frame as CSV.
///
/// The header is the index name (when the frame has an index) followed by
/// the columns in order. Missing cells are written empty and keys verbatim.
pub fn write_frame_csv<W: Write>(writer: W, frame: &Frame) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    let csv_error = |e: csv::Error| CpaError::Output {
        message: format!("writing CSV for {}", frame.table()),
        source: e.into(),
    };

    let index = frame.index();
    let mut header: Vec<&str> = Vec::with_capacity(frame.width() + 1);
    if let Some(index) = index {
        header.push(index.name.as_str());
    }
    header.extend(frame.column_names());
    csv.write_record(&header).map_err(csv_error)?;

    let columns: Vec<&Column> = frame.columns().map(|(_, column)| column).collect();
    for row in 0..frame.len() {
        let mut record: Vec<String> = Vec::with_capacity(header.len());
        if let Some(index) = index {
            record.push(render_key(&index.keys[row]));
        }
        for column in &columns {
            record.push(match column {
                Column::Numeric(cells) => cells[row].map(render_number).unwrap_or_default(),
                Column::Keys(cells) => cells[row].as_ref().map(render_key).unwrap_or_default(),
            });
        }
        csv.write_record(&record).map_err(csv_error)?;
    }

    csv.flush().map_err(|e| CpaError::Output {
        message: format!("flushing CSV for {}", frame.table()),
        source: e,
    })
}

fn render_key(key: &Key) -> String {
    match key {
        Key::Int(n) => n.to_string(),
        Key::Text(s) => s.clone(),
    }
}

fn render_number(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Index;
    use indexmap::IndexMap;

    fn written(frame: &Frame) -> String {
        let mut buf = Vec::new();
        write_frame_csv(&mut buf, frame).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_index_and_gaps() {
        let mut first = IndexMap::new();
        first.insert("__orders__child_rows".to_string(), 2.0);
        first.insert("__orders__distribs__total__loc".to_string(), 12.5);
        let mut second = IndexMap::new();
        second.insert("__orders__child_rows".to_string(), 1.0);

        let frame = Frame::from_records(
            "orders",
            Index::new("customer_id", vec![Key::from("a,b"), Key::from("c")]),
            vec![first, second],
        )
        .unwrap();

        assert_eq!(
            written(&frame),
            "customer_id,__orders__child_rows,__orders__distribs__total__loc\n\
             \"a,b\",2,12.5\n\
             c,1,\n"
        );
    }

    #[test]
    fn test_key_columns_without_index() {
        let mut frame = Frame::new("customers", 2);
        frame
            .push_column("id", Column::Keys(vec![Some(Key::Int(7)), None]))
            .unwrap();
        frame
            .push_column("age", Column::Numeric(vec![Some(31.0), Some(f64::NAN)]))
            .unwrap();
        assert_eq!(written(&frame), "id,age\n7,31\n,\n");
    }
}

//! End-to-end conversion tests on literal GroutIt exports.

use groutgw_convert::{convert, render, ConvertError, HeaderField, ParseOptions, COLUMN_COUNT};

fn row(cells: &[(usize, &str)]) -> String {
    let mut row = vec![""; COLUMN_COUNT];
    for (col, value) in cells {
        row[*col] = *value;
    }
    row.join(";")
}

fn header_rows() -> Vec<String> {
    vec![
        row(&[
            (2, "FORA"),
            (5, "TRAN"),
            (12, "DATE"),
            (13, "TIME"),
            (18, "HTRANCHE[ft]"),
        ]),
        row(&[
            (2, "F12"),
            (5, "3"),
            (12, "15/03/2021"),
            (13, "08:30:00"),
            (18, "12"),
        ]),
        row(&[
            (0, "TPS[s]"),
            (3, "DEB[US gal/min]"),
            (5, "PR[psi]"),
            (7, "VOL[US gal]"),
        ]),
    ]
}

fn sample_export() -> String {
    let mut lines = header_rows();
    lines.push(row(&[(0, "0"), (3, "1.5"), (5, "100.25"), (7, "0")]));
    lines.push(row(&[(0, "60"), (3, "2.456"), (5, "101"), (7, "3.2")]));
    lines.join("\r\n") + "\r\n"
}

fn one_minute() -> ParseOptions {
    ParseOptions {
        output_interval_minutes: 1,
    }
}

#[test]
fn test_two_record_export_renders_twelve_literal_lines() {
    let rows = convert("F12_20210315_2.csv", sample_export().as_bytes(), &one_minute()).unwrap();
    let expected = "\
F12_Stage\t15/03/2021 08:30:00\t3\t0
F12_Phase\t15/03/2021 08:30:00\t2\t0
F12_Vol\t15/03/2021 08:30:00\t0.00\t0
F12_Press\t15/03/2021 08:30:00\t100.25\t0
F12_FlRate\t15/03/2021 08:30:00\t1.50\t0
F12_Height\t15/03/2021 08:30:00\t12\t0
F12_Stage\t15/03/2021 08:31:00\t3\t0
F12_Phase\t15/03/2021 08:31:00\t2\t0
F12_Vol\t15/03/2021 08:31:00\t3.20\t0
F12_Press\t15/03/2021 08:31:00\t101.00\t0
F12_FlRate\t15/03/2021 08:31:00\t2.46\t0
F12_Height\t15/03/2021 08:31:00\t12\t0
";
    assert_eq!(rows.len(), 12);
    assert_eq!(render(&rows), expected);
}

#[test]
fn test_conversion_is_deterministic() {
    let first = convert("F12_2.csv", sample_export().as_bytes(), &one_minute()).unwrap();
    let second = convert("F12_2.csv", sample_export().as_bytes(), &one_minute()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_non_numeric_flow_encodes_sentinel() {
    let mut lines = header_rows();
    lines.push(row(&[(0, "0"), (3, "ERR"), (5, "100"), (7, "")]));
    let rows = convert("F12_2.csv", lines.join("\n").as_bytes(), &one_minute()).unwrap();

    let flow = rows.iter().find(|r| r.channel == "F12_FlRate").unwrap();
    let volume = rows.iter().find(|r| r.channel == "F12_Vol").unwrap();
    assert_eq!(flow.value, "9999.00");
    assert_eq!(volume.value, "9999.00");
}

#[test]
fn test_each_mutated_header_label_is_named() {
    for field in HeaderField::ALL {
        let mut lines = header_rows();
        lines.push(row(&[(0, "0")]));
        let (label_row, col) = field.position();
        let mut cells: Vec<String> = lines[label_row].split(';').map(str::to_string).collect();
        cells[col] = "WRONG".to_string();
        lines[label_row] = cells.join(";");

        let err = convert("F12_2.csv", lines.join("\n").as_bytes(), &one_minute()).unwrap_err();
        assert_eq!(err.header_field(), Some(field), "field {field}");
        let message = err.to_string();
        assert!(
            message.contains(&format!("({})", field.name())),
            "message should name {field}: {message}"
        );
        assert!(message.contains("WRONG"));
    }
}

#[test]
fn test_missing_data_rows_fail_before_header_checks() {
    let lines = header_rows();
    let err = convert("F12_2.csv", lines.join("\n").as_bytes(), &one_minute()).unwrap_err();
    assert!(matches!(err, ConvertError::NoData { rows: 3 }));

    let err = convert("F12_2.csv", b"", &one_minute()).unwrap_err();
    assert!(matches!(err, ConvertError::NoData { rows: 0 }));
}

#[test]
fn test_glitch_in_middle_is_excluded_but_boundaries_kept() {
    let mut lines = header_rows();
    for offset in ["-50", "60", "5", "120", "7"] {
        lines.push(row(&[(0, offset), (3, "1"), (5, "1"), (7, "1")]));
    }
    let rows = convert("F12_2.csv", lines.join("\n").as_bytes(), &one_minute()).unwrap();

    let stamps: Vec<String> = rows
        .iter()
        .filter(|r| r.channel == "F12_Stage")
        .map(|r| r.timestamp.format("%H:%M:%S").to_string())
        .collect();
    // -50 (first) kept, 60 kept, 5 dropped, 120 kept, 7 (last) kept.
    assert_eq!(stamps, vec!["08:29:10", "08:31:00", "08:32:00", "08:30:07"]);
}

//! BIFF8 record writers for the legacy binary workbook stream.
//!
//! Each record is `type (u16) | length (u16) | payload`, little endian.
//! The stream holds the workbook globals substream followed by one
//! worksheet substream.

use std::collections::HashMap;
use std::io::{self, Write};

use crate::conf::N_LEN_EXCEL_CELL_TEXT_MAX;
use crate::spec::{EncodeError, EnumCellValue, SpecSheet};
use crate::util::{cast_col_num, cast_row_num};

const N_RECORD_DATA_MAX: usize = 8224;

const N_SUBSTREAM_WORKBOOK: u16 = 0x0005;
const N_SUBSTREAM_WORKSHEET: u16 = 0x0010;
const N_CODEPAGE_UTF16: u16 = 1200;
/// XF index of the default cell format (after the 15 style XFs).
const N_XF_CELL_DEFAULT: u16 = 15;

////////////////////////////////////////////////////////////////////////////////
// #region RecordWriters

fn write_record_header<W: Write>(writer: &mut W, record_type: u16, data_len: u16) -> io::Result<()> {
    writer.write_all(&record_type.to_le_bytes())?;
    writer.write_all(&data_len.to_le_bytes())
}

/// BOF, record 0x0809.
fn write_bof<W: Write>(writer: &mut W, substream_type: u16) -> io::Result<()> {
    write_record_header(writer, 0x0809, 16)?;
    writer.write_all(&0x0600u16.to_le_bytes())?;
    writer.write_all(&substream_type.to_le_bytes())?;
    writer.write_all(&0x0DBBu16.to_le_bytes())?;
    writer.write_all(&0x07CCu16.to_le_bytes())?;
    writer.write_all(&0u32.to_le_bytes())?;
    writer.write_all(&6u32.to_le_bytes())
}

/// EOF, record 0x000A.
fn write_eof<W: Write>(writer: &mut W) -> io::Result<()> {
    write_record_header(writer, 0x000A, 0)
}

fn write_codepage<W: Write>(writer: &mut W, codepage: u16) -> io::Result<()> {
    write_record_header(writer, 0x0042, 2)?;
    writer.write_all(&codepage.to_le_bytes())
}

/// WINDOW1, record 0x003D: default workbook window.
fn write_window1<W: Write>(writer: &mut W) -> io::Result<()> {
    write_record_header(writer, 0x003D, 18)?;
    for n_value in [0u16, 0, 0x3000, 0x1E00, 0x0038, 0, 0, 1, 0x0258] {
        writer.write_all(&n_value.to_le_bytes())?;
    }
    Ok(())
}

/// FONT, record 0x0031: 10pt Arial, regular weight.
fn write_font<W: Write>(writer: &mut W) -> io::Result<()> {
    let c_name = b"Arial";
    write_record_header(writer, 0x0031, (14 + 2 + c_name.len()) as u16)?;
    writer.write_all(&200u16.to_le_bytes())?;
    writer.write_all(&0u16.to_le_bytes())?;
    writer.write_all(&0x7FFFu16.to_le_bytes())?;
    writer.write_all(&400u16.to_le_bytes())?;
    writer.write_all(&0u16.to_le_bytes())?;
    writer.write_all(&[0, 0, 0, 0])?;
    writer.write_all(&[c_name.len() as u8, 0x00])?;
    writer.write_all(c_name)
}

/// XF, record 0x00E0: general format, default font, no borders or fill.
fn write_xf<W: Write>(writer: &mut W, if_style_xf: bool) -> io::Result<()> {
    write_record_header(writer, 0x00E0, 20)?;
    writer.write_all(&0u16.to_le_bytes())?;
    writer.write_all(&0u16.to_le_bytes())?;
    let n_xf_type: u16 = if if_style_xf { 0xFFF5 } else { 0x0001 };
    writer.write_all(&n_xf_type.to_le_bytes())?;
    writer.write_all(&[0x20, 0, 0, 0])?;
    writer.write_all(&0u16.to_le_bytes())?;
    writer.write_all(&0u16.to_le_bytes())?;
    writer.write_all(&0u32.to_le_bytes())?;
    writer.write_all(&0x20C0u16.to_le_bytes())
}

/// STYLE, record 0x0293: built-in "Normal" style bound to XF 0.
fn write_style_normal<W: Write>(writer: &mut W) -> io::Result<()> {
    write_record_header(writer, 0x0293, 4)?;
    writer.write_all(&0x8000u16.to_le_bytes())?;
    writer.write_all(&[0x00, 0xFF])
}

/// BOUNDSHEET8, record 0x0085. Returns the offset of the position field
/// relative to the record start, for patching.
fn write_boundsheet<W: Write>(writer: &mut W, position: u32, name: &str) -> io::Result<usize> {
    let l_units: Vec<u16> = name.encode_utf16().take(31).collect();
    let if_compressed = l_units.iter().all(|&u| u <= 0xFF);
    let n_len_chars = if if_compressed {
        l_units.len()
    } else {
        l_units.len() * 2
    };
    write_record_header(writer, 0x0085, (8 + n_len_chars) as u16)?;
    writer.write_all(&position.to_le_bytes())?;
    writer.write_all(&0u16.to_le_bytes())?;
    writer.write_all(&[l_units.len() as u8, u8::from(!if_compressed)])?;
    write_string_units(writer, &l_units, if_compressed)?;
    Ok(4)
}

fn write_string_units<W: Write>(writer: &mut W, l_units: &[u16], if_compressed: bool) -> io::Result<()> {
    for &n_unit in l_units {
        if if_compressed {
            writer.write_all(&[n_unit as u8])?;
        } else {
            writer.write_all(&n_unit.to_le_bytes())?;
        }
    }
    Ok(())
}

/// SST, record 0x00FC, split into CONTINUE (0x003C) records at the record
/// size limit. A string continued into a new record repeats its option byte.
fn write_sst<W: Write>(writer: &mut W, l_strings: &[String], n_total: u32) -> io::Result<()> {
    let mut l_records: Vec<Vec<u8>> = Vec::new();
    let mut buffer: Vec<u8> = Vec::with_capacity(N_RECORD_DATA_MAX);
    buffer.extend_from_slice(&n_total.to_le_bytes());
    buffer.extend_from_slice(&(l_strings.len() as u32).to_le_bytes());

    for c_text in l_strings {
        let l_units: Vec<u16> = c_text.encode_utf16().collect();
        let if_compressed = l_units.iter().all(|&u| u <= 0xFF);
        let n_width = if if_compressed { 1 } else { 2 };
        let n_flag = u8::from(!if_compressed);

        if N_RECORD_DATA_MAX - buffer.len() < 3 + n_width {
            l_records.push(std::mem::take(&mut buffer));
        }
        buffer.extend_from_slice(&(l_units.len() as u16).to_le_bytes());
        buffer.push(n_flag);

        let mut n_pos = 0;
        while n_pos < l_units.len() {
            let n_room = (N_RECORD_DATA_MAX - buffer.len()) / n_width;
            if n_room == 0 {
                l_records.push(std::mem::take(&mut buffer));
                buffer.push(n_flag);
                continue;
            }
            let n_end = usize::min(l_units.len(), n_pos + n_room);
            write_string_units(&mut buffer, &l_units[n_pos..n_end], if_compressed)?;
            n_pos = n_end;
        }
    }
    l_records.push(buffer);

    for (n_idx, payload) in l_records.iter().enumerate() {
        let n_type = if n_idx == 0 { 0x00FC } else { 0x003C };
        write_record_header(writer, n_type, payload.len() as u16)?;
        writer.write_all(payload)?;
    }
    Ok(())
}

/// DIMENSIONS, record 0x0200. Last row/column are exclusive.
fn write_dimensions<W: Write>(writer: &mut W, n_rows: u32, n_cols: u16) -> io::Result<()> {
    write_record_header(writer, 0x0200, 14)?;
    writer.write_all(&0u32.to_le_bytes())?;
    writer.write_all(&n_rows.to_le_bytes())?;
    writer.write_all(&0u16.to_le_bytes())?;
    writer.write_all(&n_cols.to_le_bytes())?;
    writer.write_all(&0u16.to_le_bytes())
}

fn write_cell_header<W: Write>(
    writer: &mut W,
    record_type: u16,
    data_len: u16,
    row: u16,
    col: u16,
) -> io::Result<()> {
    write_record_header(writer, record_type, data_len)?;
    writer.write_all(&row.to_le_bytes())?;
    writer.write_all(&col.to_le_bytes())?;
    writer.write_all(&N_XF_CELL_DEFAULT.to_le_bytes())
}

/// LABELSST, record 0x00FD.
fn write_labelsst<W: Write>(writer: &mut W, row: u16, col: u16, sst_index: u32) -> io::Result<()> {
    write_cell_header(writer, 0x00FD, 10, row, col)?;
    writer.write_all(&sst_index.to_le_bytes())
}

/// BOOLERR, record 0x0205, boolean variant.
fn write_boolerr<W: Write>(writer: &mut W, row: u16, col: u16, value: bool) -> io::Result<()> {
    write_cell_header(writer, 0x0205, 8, row, col)?;
    writer.write_all(&[u8::from(value), 0])
}

/// BLANK, record 0x0201.
fn write_blank<W: Write>(writer: &mut W, row: u16, col: u16) -> io::Result<()> {
    write_cell_header(writer, 0x0201, 6, row, col)
}

/// WINDOW2, record 0x023E: gridlines, headings, zeros, active sheet.
fn write_window2<W: Write>(writer: &mut W) -> io::Result<()> {
    write_record_header(writer, 0x023E, 18)?;
    for n_value in [0x06B6u16, 0, 0, 0x0040, 0, 0, 0, 0, 0] {
        writer.write_all(&n_value.to_le_bytes())?;
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WorkbookStream

/// Shared string table: unique texts in first-use order plus total use count.
struct SpecSharedStrings {
    l_strings: Vec<String>,
    dict_idx_by_text: HashMap<String, u32>,
    n_total: u32,
}

impl SpecSharedStrings {
    fn from_sheet(sheet: &SpecSheet) -> Result<Self, EncodeError> {
        let mut sst = Self {
            l_strings: Vec::new(),
            dict_idx_by_text: HashMap::new(),
            n_total: 0,
        };
        for row in &sheet.rows {
            for value in row.cells.values() {
                if let EnumCellValue::String(c_text) = value {
                    sst.intern(c_text)?;
                }
            }
        }
        Ok(sst)
    }

    fn intern(&mut self, c_text: &str) -> Result<u32, EncodeError> {
        if c_text.encode_utf16().count() > N_LEN_EXCEL_CELL_TEXT_MAX {
            return Err(EncodeError::InvalidData(format!(
                "cell text longer than {N_LEN_EXCEL_CELL_TEXT_MAX} characters"
            )));
        }
        self.n_total += 1;
        if let Some(&n_idx) = self.dict_idx_by_text.get(c_text) {
            return Ok(n_idx);
        }
        let n_idx = self.l_strings.len() as u32;
        self.l_strings.push(c_text.to_string());
        self.dict_idx_by_text.insert(c_text.to_string(), n_idx);
        Ok(n_idx)
    }

    fn index_of(&self, c_text: &str) -> Result<u32, EncodeError> {
        self.dict_idx_by_text
            .get(c_text)
            .copied()
            .ok_or_else(|| EncodeError::InvalidData(format!("string not interned: {c_text:?}")))
    }
}

/// Encode `sheet` as a complete BIFF8 workbook stream with one worksheet.
///
/// Row and column limits must be checked by the caller.
pub fn derive_workbook_stream(sheet: &SpecSheet, sheet_name: &str) -> Result<Vec<u8>, EncodeError> {
    let sst = SpecSharedStrings::from_sheet(sheet)?;

    let mut stream: Vec<u8> = Vec::new();
    write_bof(&mut stream, N_SUBSTREAM_WORKBOOK)?;
    write_codepage(&mut stream, N_CODEPAGE_UTF16)?;
    write_window1(&mut stream)?;
    // Font index 4 is reserved, so at least four fonts are written.
    for _ in 0..4 {
        write_font(&mut stream)?;
    }
    for _ in 0..N_XF_CELL_DEFAULT {
        write_xf(&mut stream, true)?;
    }
    write_xf(&mut stream, false)?;
    write_style_normal(&mut stream)?;

    let n_pos_boundsheet = stream.len() + write_boundsheet(&mut stream, 0, sheet_name)?;
    write_sst(&mut stream, &sst.l_strings, sst.n_total)?;
    write_eof(&mut stream)?;

    let n_pos_sheet = u32::try_from(stream.len())
        .map_err(|_| EncodeError::InvalidData("workbook globals too large".to_string()))?;
    stream[n_pos_boundsheet..n_pos_boundsheet + 4].copy_from_slice(&n_pos_sheet.to_le_bytes());

    write_bof(&mut stream, N_SUBSTREAM_WORKSHEET)?;
    write_dimensions(
        &mut stream,
        sheet.height() as u32,
        cast_col_num(sheet.width())?,
    )?;
    for (n_idx_row, row) in sheet.rows.iter().enumerate() {
        let n_row = u16::try_from(cast_row_num(n_idx_row)?)
            .map_err(|_| EncodeError::InvalidData(format!("row index overflow: {n_idx_row}")))?;
        for (&n_idx_col, value) in &row.cells {
            let n_col = cast_col_num(n_idx_col)?;
            match value {
                EnumCellValue::None => write_blank(&mut stream, n_row, n_col)?,
                EnumCellValue::String(c_text) => {
                    write_labelsst(&mut stream, n_row, n_col, sst.index_of(c_text)?)?
                }
                EnumCellValue::Boolean(b) => write_boolerr(&mut stream, n_row, n_col, *b)?,
            }
        }
    }
    write_window2(&mut stream)?;
    write_eof(&mut stream)?;

    Ok(stream)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{derive_workbook_stream, write_sst};
    use crate::spec::{EnumCellValue, SpecSheet, SpecSheetRow};

    fn read_records(stream: &[u8]) -> Vec<(u16, Vec<u8>)> {
        let mut l_records = Vec::new();
        let mut n_pos = 0;
        while n_pos + 4 <= stream.len() {
            let n_type = u16::from_le_bytes([stream[n_pos], stream[n_pos + 1]]);
            let n_len = u16::from_le_bytes([stream[n_pos + 2], stream[n_pos + 3]]) as usize;
            l_records.push((n_type, stream[n_pos + 4..n_pos + 4 + n_len].to_vec()));
            n_pos += 4 + n_len;
        }
        l_records
    }

    fn sample_sheet() -> SpecSheet {
        let mut sheet = SpecSheet::new("Data");
        let mut header = SpecSheetRow::default();
        header.set_cell(0, EnumCellValue::String("ID".to_string()));
        header.set_cell(1, EnumCellValue::String("Flag".to_string()));
        sheet.rows.push(header);
        let mut row = SpecSheetRow::default();
        row.set_cell(0, EnumCellValue::String("ID".to_string()));
        row.set_cell(1, EnumCellValue::Boolean(true));
        row.set_cell(3, EnumCellValue::None);
        sheet.rows.push(row);
        sheet
    }

    #[test]
    fn stream_has_globals_then_sheet_substream() {
        let stream = derive_workbook_stream(&sample_sheet(), "Data").unwrap();
        let l_records = read_records(&stream);

        assert_eq!(l_records[0].0, 0x0809);
        assert_eq!(&l_records[0].1[2..4], &0x0005u16.to_le_bytes());

        let l_bof: Vec<usize> = l_records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.0 == 0x0809)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(l_bof.len(), 2);
        assert_eq!(l_records.iter().filter(|r| r.0 == 0x000A).count(), 2);
        assert_eq!(l_records.last().map(|r| r.0), Some(0x000A));
    }

    #[test]
    fn boundsheet_points_at_sheet_bof() {
        let stream = derive_workbook_stream(&sample_sheet(), "Data").unwrap();
        let l_records = read_records(&stream);
        let (_, payload) = l_records.iter().find(|r| r.0 == 0x0085).unwrap();
        let n_pos = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;
        assert_eq!(&stream[n_pos..n_pos + 2], &0x0809u16.to_le_bytes());
        assert_eq!(&stream[n_pos + 6..n_pos + 8], &0x0010u16.to_le_bytes());
        assert_eq!(&payload[8..], b"Data");
    }

    #[test]
    fn shared_strings_are_deduplicated() {
        let stream = derive_workbook_stream(&sample_sheet(), "Data").unwrap();
        let l_records = read_records(&stream);
        let (_, sst) = l_records.iter().find(|r| r.0 == 0x00FC).unwrap();
        assert_eq!(&sst[0..4], &3u32.to_le_bytes());
        assert_eq!(&sst[4..8], &2u32.to_le_bytes());

        let l_labels: Vec<&Vec<u8>> = l_records
            .iter()
            .filter(|r| r.0 == 0x00FD)
            .map(|r| &r.1)
            .collect();
        assert_eq!(l_labels.len(), 3);
        assert_eq!(&l_labels[2][6..10], &0u32.to_le_bytes());
        assert_eq!(l_records.iter().filter(|r| r.0 == 0x0205).count(), 1);
        assert_eq!(l_records.iter().filter(|r| r.0 == 0x0201).count(), 1);
    }

    #[test]
    fn long_sst_spills_into_continue_records() {
        let l_strings = vec!["x".repeat(10_000), "ü".repeat(5_000)];
        let mut stream = Vec::new();
        write_sst(&mut stream, &l_strings, 2).unwrap();
        let l_records = read_records(&stream);

        assert_eq!(l_records[0].0, 0x00FC);
        assert!(l_records[1..].iter().all(|r| r.0 == 0x003C));
        assert!(l_records.iter().all(|r| r.1.len() <= 8224));
        let n_payload: usize = l_records.iter().map(|r| r.1.len()).sum();
        // 8 header bytes, two 3-byte string headers, chars, one repeated flag
        // byte per continued chunk.
        assert_eq!(n_payload, 8 + 3 + 10_000 + 3 + 5_000 + (l_records.len() - 1));
    }

    #[test]
    fn overlong_cell_text_is_rejected() {
        let mut sheet = SpecSheet::new("S");
        let mut row = SpecSheetRow::default();
        row.set_cell(0, EnumCellValue::String("a".repeat(40_000)));
        sheet.rows.push(row);
        assert!(derive_workbook_stream(&sheet, "S").is_err());
    }
}

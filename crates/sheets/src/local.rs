//! Local `.xlsx` sink.
//!
//! Each append reads the existing rows back with calamine and rewrites the
//! whole workbook with rust_xlsxwriter, which has no in-place editing. Styling
//! is a pure function of row index and values, so rewriting loses nothing.

use crate::error::{Result, SheetError};
use crate::row::{gap_display, COUNT_FORMAT, DIFF_FORMAT, ROW_WIDTH};
use calamine::{open_workbook, Data, Reader, Xlsx};
use parking_lot::Mutex;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use std::path::{Path, PathBuf};
use vote_tracker_core::{parse_vote_count, TrackedPairDiff};

/// Worksheet name in the local workbook.
pub const SHEET_NAME: &str = "Vote Tracker";

const COLUMN_WIDTHS: [f64; ROW_WIDTH] = [22.0, 15.0, 12.0, 17.0, 14.0, 14.0];

const HEADER_FILL: u32 = 0xF97316;
const HEADER_BORDER: u32 = 0xDDDDDD;
const ROW_FILL: u32 = 0xFFF7ED;
const ROW_BORDER: u32 = 0xEEEEEE;
const GAIN: u32 = 0x059669;
const LOSS: u32 = 0xDC2626;
const GAP: u32 = 0xEA580C;

/// Appends styled rows to a local workbook.
#[derive(Debug)]
pub struct LocalWorkbookSink {
    path: PathBuf,
    header: [String; ROW_WIDTH],
    lock: Mutex<()>,
}

impl LocalWorkbookSink {
    pub fn new(path: impl Into<PathBuf>, header: [String; ROW_WIDTH]) -> Self {
        Self {
            path: path.into(),
            header,
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `row`, creating the workbook with a frozen header when absent.
    ///
    /// Returns the 1-based sheet row the data landed in.
    ///
    /// # Errors
    /// Returns error if the workbook cannot be read or saved.
    pub fn append(&self, row: &TrackedPairDiff) -> Result<u32> {
        let _guard = self.lock.lock();

        let mut rows = if self.path.exists() {
            read_rows(&self.path)?
        } else {
            Vec::new()
        };
        rows.push(row.clone());

        self.save(&rows)?;

        let row_number = u32::try_from(rows.len() + 1).unwrap_or(u32::MAX);
        tracing::info!(
            row = row_number,
            a_votes = row.a_votes,
            b_votes = row.b_votes,
            gap = %gap_display(row.gap),
            path = %self.path.display(),
            "Local workbook row written"
        );
        Ok(row_number)
    }

    /// Data rows currently in the workbook, header excluded.
    ///
    /// # Errors
    /// Returns error if the workbook exists but cannot be read.
    pub fn read(&self) -> Result<Vec<TrackedPairDiff>> {
        let _guard = self.lock.lock();
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        read_rows(&self.path)
    }

    fn save(&self, rows: &[TrackedPairDiff]) -> Result<()> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;

        write_header(worksheet, &self.header)?;
        for (idx, row) in rows.iter().enumerate() {
            let sheet_row = u32::try_from(idx + 1)
                .map_err(|_| SheetError::local("workbook row limit exceeded"))?;
            write_row(worksheet, sheet_row, row)?;
        }

        // Save beside the target and rename so a crash never leaves a torn file.
        let staging = self.path.with_extension("xlsx.tmp");
        workbook.save(&staging)?;
        std::fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

fn write_header(worksheet: &mut Worksheet, header: &[String; ROW_WIDTH]) -> Result<()> {
    let format = Format::new()
        .set_font_name("Arial")
        .set_font_size(11)
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::RGB(HEADER_BORDER));

    for (col, (title, width)) in header.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, title, &format)?;
        worksheet.set_column_width(col, width)?;
    }
    worksheet.set_freeze_panes(1, 0)?;
    Ok(())
}

/// `sheet_row` is 0-based; the header occupies row 0.
fn write_row(worksheet: &mut Worksheet, sheet_row: u32, row: &TrackedPairDiff) -> Result<()> {
    // Even 1-based rows get the tinted fill.
    let tinted = (sheet_row + 1) % 2 == 0;
    let base = |format: Format| {
        let format = format
            .set_font_name("Arial")
            .set_font_size(10)
            .set_border(FormatBorder::Thin)
            .set_border_color(Color::RGB(ROW_BORDER));
        if tinted {
            format.set_background_color(Color::RGB(ROW_FILL))
        } else {
            format
        }
    };

    let time = base(Format::new()).set_align(FormatAlign::Center);
    let votes = base(Format::new())
        .set_bold()
        .set_align(FormatAlign::Right)
        .set_num_format(COUNT_FORMAT);
    let gap = base(Format::new())
        .set_bold()
        .set_font_color(Color::RGB(GAP))
        .set_align(FormatAlign::Center)
        .set_num_format(DIFF_FORMAT);

    worksheet.write_string_with_format(sheet_row, 0, &row.ts_label, &time)?;
    worksheet.write_number_with_format(sheet_row, 1, row.a_votes as f64, &votes)?;
    worksheet.write_number_with_format(sheet_row, 2, row.a_diff as f64, &diff_format(base, row.a_diff))?;
    worksheet.write_number_with_format(sheet_row, 3, row.b_votes as f64, &votes)?;
    worksheet.write_number_with_format(sheet_row, 4, row.b_diff as f64, &diff_format(base, row.b_diff))?;
    worksheet.write_number_with_format(sheet_row, 5, row.gap as f64, &gap)?;
    Ok(())
}

fn diff_format(base: impl Fn(Format) -> Format, diff: i64) -> Format {
    let format = base(Format::new())
        .set_align(FormatAlign::Center)
        .set_num_format(DIFF_FORMAT);
    match diff.signum() {
        1 => format.set_bold().set_font_color(Color::RGB(GAIN)),
        -1 => format.set_bold().set_font_color(Color::RGB(LOSS)),
        _ => format,
    }
}

fn read_rows(path: &Path) -> Result<Vec<TrackedPairDiff>> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;

    let sheet = if workbook.sheet_names().iter().any(|s| s == SHEET_NAME) {
        SHEET_NAME.to_string()
    } else {
        workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| SheetError::local("workbook has no worksheets"))?
    };
    let range = workbook.worksheet_range(&sheet)?;

    let rows = range
        .rows()
        .skip(1)
        .filter(|cells| cells.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|cells| {
            let cell = |idx: usize| cells.get(idx).unwrap_or(&Data::Empty);
            TrackedPairDiff {
                ts_label: cell(0).to_string(),
                a_votes: cell_count(cell(1)),
                a_diff: cell_signed(cell(2)),
                b_votes: cell_count(cell(3)),
                b_diff: cell_signed(cell(4)),
                gap: cell_signed(cell(5)),
            }
        })
        .collect();
    Ok(rows)
}

fn cell_signed(cell: &Data) -> i64 {
    match cell {
        Data::Int(v) => *v,
        Data::Float(v) => v.round() as i64,
        Data::String(s) => {
            let s = s.trim();
            let negative = s.starts_with('-');
            let magnitude = parse_vote_count(s.trim_start_matches(['+', '-'])).unwrap_or(0);
            let magnitude = i64::try_from(magnitude).unwrap_or(i64::MAX);
            if negative {
                -magnitude
            } else {
                magnitude
            }
        }
        _ => 0,
    }
}

fn cell_count(cell: &Data) -> u64 {
    u64::try_from(cell_signed(cell)).unwrap_or(0)
}

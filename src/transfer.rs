//! CSV import and export in the journal's column layout.

use crate::journal::Journal;
use analytics::compute_trade_metrics_from_fields;
use anyhow::{Context, Result};
use core_types::{columns, TradeEntry, TradeExit, TradeFields, TradeMetrics, TradeStatus};
use database::{TradeFilter, TradeStore};
use std::io::{Read, Write};

/// A CSV row that passed validation and is ready to be written.
enum ImportRow {
    Open(TradeEntry),
    Closed(TradeEntry, TradeExit, TradeMetrics),
}

/// Summary of an import run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub opened: usize,
    pub closed: usize,
}

/// Imports every row of a journal CSV.
///
/// The whole file is validated before anything is written, so an invalid row
/// leaves the journal untouched. Rows are then written one at a time: a store
/// failure part way through keeps the rows already written, and each of them is
/// complete. Ids in the file are not kept; the store assigns fresh ones in file
/// order. Closed rows have their metrics recomputed.
pub async fn import_csv<S: TradeStore, R: Read>(
    journal: &Journal<S>,
    reader: R,
) -> Result<ImportSummary> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        // Line 1 is the header.
        let line = index + 2;
        let record = result.with_context(|| format!("Failed to read CSV line {line}"))?;
        let fields: TradeFields = headers.iter().zip(record.iter()).collect();
        let row = parse_row(&fields).with_context(|| format!("Invalid trade on CSV line {line}"))?;
        rows.push(row);
    }

    let mut summary = ImportSummary::default();
    for row in &rows {
        match row {
            ImportRow::Open(entry) => {
                journal.open_trade(entry).await?;
                summary.opened += 1;
            }
            ImportRow::Closed(entry, exit, metrics) => {
                journal.record_closed_trade(entry, exit, metrics).await?;
                summary.closed += 1;
            }
        }
    }

    tracing::info!(opened = summary.opened, closed = summary.closed, "Imported journal CSV.");
    Ok(summary)
}

fn parse_row(fields: &TradeFields) -> Result<ImportRow> {
    let status = match fields.get(columns::TRADE_STATUS) {
        Some(raw) => raw.parse()?,
        None => TradeStatus::Open,
    };
    let entry = TradeEntry::from_fields(fields)?;
    let row = match status {
        TradeStatus::Open => ImportRow::Open(entry),
        TradeStatus::Closed => {
            let metrics = compute_trade_metrics_from_fields(fields, fields)?;
            let exit = TradeExit::from_fields(fields)?;
            ImportRow::Closed(entry, exit, metrics)
        }
    };
    Ok(row)
}

/// Writes every trade to `writer`, one row per trade, in ascending id order.
/// Returns the number of rows written.
pub async fn export_csv<S: TradeStore, W: Write>(journal: &Journal<S>, writer: W) -> Result<usize> {
    let records = journal.trades(TradeFilter::All).await?;

    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(columns::ALL)?;
    for record in &records {
        let fields = record.to_fields();
        writer.write_record(columns::ALL.iter().map(|c| fields.get(c).unwrap_or("")))?;
    }
    writer.flush()?;

    tracing::info!(rows = records.len(), "Exported journal CSV.");
    Ok(records.len())
}

// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module implements lazy row decoding over a ROWS result.

use super::{
    decoder::{
        ColumnDecoder,
        RowDecoder,
    },
    responses::result::{
        Metadata,
        RowsResult,
    },
    value::CqlValue,
};
use std::convert::TryInto;
use thiserror::Error;

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum RowsError {
    #[error("The row set is exhausted")]
    Exhausted,
    #[error("Row decode error: {0}")]
    Decode(#[from] anyhow::Error),
}

/// One decoded row: the column payloads interpreted under the result
/// metadata, with nulls preserved.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    values: Vec<CqlValue>,
}

impl Row {
    /// Get a column value by position.
    pub fn get(&self, index: usize) -> Option<&CqlValue> {
        self.values.get(index)
    }

    /// Get the column values in declaration order.
    pub fn values(&self) -> &[CqlValue] {
        &self.values
    }

    /// Consume the row and take its values.
    pub fn into_values(self) -> Vec<CqlValue> {
        self.values
    }
}

/// A cursor over the row region of a ROWS result. Each decoded row consumes
/// exactly `columns_count` column payloads; exactly `rows_count` rows can be
/// drawn, after which [`RowsError::Exhausted`] is raised.
#[derive(Clone, Debug)]
pub struct RowCursor {
    result: RowsResult,
    idx: usize,
    remaining: usize,
}

impl RowCursor {
    /// Create a cursor at the first row of a result.
    pub fn new(result: RowsResult) -> Self {
        Self {
            remaining: result.rows_count() as usize,
            idx: 0,
            result,
        }
    }

    /// Get the result metadata.
    pub fn metadata(&self) -> &Metadata {
        self.result.metadata()
    }

    /// Get the declared row count.
    pub fn rows_count(&self) -> usize {
        self.result.rows_count() as usize
    }

    /// Get the number of rows not yet drawn.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Check whether no rows are left to draw.
    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    /// Check if there are more pages to request (v2).
    pub fn has_more_pages(&self) -> bool {
        self.result.metadata().flags().has_more_pages()
    }

    /// Get the paging state to reissue for the next page (v2).
    pub fn paging_state(&self) -> &Option<Vec<u8>> {
        self.result.metadata().paging_state()
    }

    /// Decode the next row using the schema carried in the result metadata.
    pub fn try_next(&mut self) -> Result<Row, RowsError> {
        if self.remaining == 0 {
            return Err(RowsError::Exhausted);
        }
        let specs = self.result.metadata().column_specs();
        let columns_count = self.result.metadata().columns_count() as usize;
        if specs.len() != columns_count {
            return Err(RowsError::Decode(anyhow::anyhow!(
                "Result carries no column metadata to decode by"
            )));
        }
        let buffer = self.result.rows();
        let mut idx = self.idx;
        let mut values = Vec::with_capacity(columns_count);
        for spec in specs {
            match read_column_payload(&mut idx, buffer)? {
                Some(slice) => values.push(CqlValue::decode(slice, spec.kind())?),
                None => values.push(CqlValue::Null),
            }
        }
        self.idx = idx;
        self.remaining -= 1;
        Ok(Row { values })
    }

    /// Decode the next row into a caller-chosen shape, without consulting
    /// the column metadata. This also works for v2 results flagged with
    /// no-metadata.
    pub fn try_next_typed<R: RowDecoder>(&mut self) -> Result<R, RowsError> {
        if self.remaining == 0 {
            return Err(RowsError::Exhausted);
        }
        let mut row = ResultRow::new(&mut self.idx, &self.result);
        let res = R::try_decode_row(&mut row)?;
        self.remaining -= 1;
        Ok(res)
    }
}

impl Iterator for RowCursor {
    type Item = Row;

    fn next(&mut self) -> Option<Self::Item> {
        match self.try_next() {
            Ok(row) => Some(row),
            Err(RowsError::Exhausted) => None,
            Err(e) => {
                log::error!("Error decoding row: {}", e);
                None
            }
        }
    }
}

// Read one `[bytes]` column payload; a negative length is the null form.
fn read_column_payload<'a>(idx: &mut usize, buffer: &'a [u8]) -> Result<Option<&'a [u8]>, RowsError> {
    if buffer.len() < *idx + 4 {
        return Err(RowsError::Decode(anyhow::anyhow!(
            "Buffer is too small for value length bytes"
        )));
    }
    let length = i32::from_be_bytes(
        buffer[*idx..][..4]
            .try_into()
            .map_err(|e| RowsError::Decode(anyhow::anyhow!("{}", e)))?,
    );
    *idx += 4;
    if length < 0 {
        return Ok(None);
    }
    let length = length as usize;
    if buffer.len() < *idx + length {
        return Err(RowsError::Decode(anyhow::anyhow!("Buffer is too small for value bytes")));
    }
    let slice = &buffer[*idx..][..length];
    *idx += length;
    Ok(Some(slice))
}

/// A result row which can be used to decode column values in order.
pub struct ResultRow<'a> {
    idx: &'a mut usize,
    remaining_cols: usize,
    buffer: &'a [u8],
}

impl<'a> ResultRow<'a> {
    pub(crate) fn new(idx: &'a mut usize, rows: &'a RowsResult) -> Self {
        Self {
            buffer: rows.rows(),
            remaining_cols: rows.metadata().columns_count() as usize,
            idx,
        }
    }

    /// Decode a column value from the row. This fails if there are no more
    /// columns to decode, or if the buffer is malformatted. A null payload
    /// decodes as the type's empty-slice interpretation, so nullable columns
    /// should be drawn as `Option<C>`.
    pub fn decode_column<C: ColumnDecoder>(&mut self) -> anyhow::Result<C> {
        anyhow::ensure!(self.remaining_cols > 0, "No more columns to decode");
        let slice = read_column_payload(self.idx, self.buffer).map_err(|e| anyhow::anyhow!("{}", e))?;
        let res = C::try_decode_column(slice.unwrap_or(&[]))?;
        self.remaining_cols -= 1;
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{
        header::ProtocolVersion,
        write_bytes,
        write_int,
        write_null_bytes,
        write_short,
        write_string,
    };

    fn rows_result() -> RowsResult {
        // metadata: global spec, two columns (varchar, int), 2 rows
        let mut payload = Vec::new();
        write_int(0x0001, &mut payload);
        write_int(2, &mut payload);
        write_string("ks", &mut payload);
        write_string("t", &mut payload);
        write_string("k", &mut payload);
        write_short(0x000D, &mut payload);
        write_string("v", &mut payload);
        write_short(0x0009, &mut payload);
        write_int(2, &mut payload);
        write_bytes(b"x", &mut payload);
        write_bytes(&42i32.to_be_bytes(), &mut payload);
        write_bytes(b"y", &mut payload);
        write_null_bytes(&mut payload);
        let mut start = 0;
        RowsResult::from_payload(&mut start, &payload, ProtocolVersion::V1).unwrap()
    }

    #[test]
    fn cursor_draws_exactly_the_declared_rows() {
        let mut cursor = RowCursor::new(rows_result());
        let first = cursor.try_next().unwrap();
        assert_eq!(first.get(0), Some(&CqlValue::Text("x".to_owned())));
        assert_eq!(first.get(1), Some(&CqlValue::Int(42)));
        let second = cursor.try_next().unwrap();
        assert_eq!(second.get(1), Some(&CqlValue::Null));
        assert!(matches!(cursor.try_next(), Err(RowsError::Exhausted)));
    }

    #[test]
    fn typed_rows_decode_without_consulting_metadata() {
        let mut cursor = RowCursor::new(rows_result());
        let (k, v): (String, Option<i32>) = cursor.try_next_typed().unwrap();
        assert_eq!(k, "x");
        assert_eq!(v, Some(42));
        let (k, v): (String, Option<i32>) = cursor.try_next_typed().unwrap();
        assert_eq!(k, "y");
        assert_eq!(v, None);
    }

    #[test]
    fn iterator_yields_then_stops() {
        let cursor = RowCursor::new(rows_result());
        assert_eq!(cursor.count(), 2);
    }
}

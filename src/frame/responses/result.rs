// Copyright 2021 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! This module defines the five kinds of RESULT frame.

use super::*;
use crate::frame::column_type::ColumnType;
use std::convert::{
    TryFrom,
    TryInto,
};

/// The VOID result kind.
pub const VOID: i32 = 0x0001;
/// The ROWS result kind.
pub const ROWS: i32 = 0x0002;
/// The SET_KEYSPACE result kind.
pub const SETKEYSPACE: i32 = 0x0003;
/// The PREPARED result kind.
pub const PREPARED: i32 = 0x0004;
/// The SCHEMA_CHANGE result kind.
pub const SCHEMACHANGE: i32 = 0x0005;

/// A RESULT frame. The first `[int]` of the body selects the kind.
#[derive(Clone, Debug)]
pub struct ResultFrame {
    pub(crate) kind: ResultBodyKind,
}

impl ResultFrame {
    /// Get the result kind.
    pub fn kind(&self) -> &ResultBodyKind {
        &self.kind
    }

    /// Consume the frame and get the result kind.
    pub fn into_kind(self) -> ResultBodyKind {
        self.kind
    }

    /// Read a RESULT body under the given dialect.
    pub fn from_payload(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> anyhow::Result<Self> {
        let kind = ResultKind::try_from(read_int(start, payload)?)?;
        Ok(Self {
            kind: match kind {
                ResultKind::Void => ResultBodyKind::Void,
                ResultKind::Rows => ResultBodyKind::Rows(RowsResult::from_payload(start, payload, version)?),
                ResultKind::SetKeyspace => ResultBodyKind::SetKeyspace(read_string(start, payload)?),
                ResultKind::Prepared => {
                    ResultBodyKind::Prepared(PreparedResult::from_payload(start, payload, version)?)
                }
                ResultKind::SchemaChange => ResultBodyKind::SchemaChange(SchemaChange::from_payload(start, payload)?),
            },
        })
    }
}

impl TryInto<RowsResult> for ResultFrame {
    type Error = anyhow::Error;

    fn try_into(self) -> Result<RowsResult, Self::Error> {
        match self.kind {
            ResultBodyKind::Rows(rows) => Ok(rows),
            _ => anyhow::bail!("Result frame is not a Rows result"),
        }
    }
}

#[derive(Copy, Clone, Debug)]
#[repr(i32)]
#[allow(missing_docs)]
pub enum ResultKind {
    Void = 0x0001,
    Rows = 0x0002,
    SetKeyspace = 0x0003,
    Prepared = 0x0004,
    SchemaChange = 0x0005,
}

impl TryFrom<i32> for ResultKind {
    type Error = anyhow::Error;

    fn try_from(kind: i32) -> anyhow::Result<Self> {
        match kind {
            VOID => Ok(Self::Void),
            ROWS => Ok(Self::Rows),
            SETKEYSPACE => Ok(Self::SetKeyspace),
            PREPARED => Ok(Self::Prepared),
            SCHEMACHANGE => Ok(Self::SchemaChange),
            _ => anyhow::bail!("Unknown result kind: {:x}", kind),
        }
    }
}

/// The decoded body of a RESULT frame.
#[derive(Clone, Debug, From, TryInto)]
#[allow(missing_docs)]
pub enum ResultBodyKind {
    Void,
    Rows(RowsResult),
    SetKeyspace(String),
    Prepared(PreparedResult),
    SchemaChange(SchemaChange),
}

/// The result metadata flags.
#[derive(Copy, Clone, Debug)]
pub struct MetadataFlags(pub i32);

impl MetadataFlags {
    /// One global (keyspace, table) pair applies to every column.
    pub fn global_tables_spec(&self) -> bool {
        self.0 & 0x0001 != 0
    }

    /// A paging state follows the column count (v2).
    pub fn has_more_pages(&self) -> bool {
        self.0 & 0x0002 != 0
    }

    /// No table spec or column specs follow (v2).
    pub fn no_metadata(&self) -> bool {
        self.0 & 0x0004 != 0
    }
}

/// The (keyspace, table) pair shared by every column when the global tables
/// spec flag is set.
#[derive(Clone, Debug)]
pub struct GlobalTableSpec {
    pub(crate) keyspace: String,
    pub(crate) table: String,
}

#[allow(missing_docs)]
impl GlobalTableSpec {
    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl FromPayload for GlobalTableSpec {
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            keyspace: read_string(start, payload)?,
            table: read_string(start, payload)?,
        })
    }
}

/// A single column description: its (keyspace, table) origin, absent when the
/// enclosing metadata carries a global tables spec, plus name and type.
#[derive(Clone, Debug)]
pub struct ColumnSpec {
    pub(crate) keyspace: Option<String>,
    pub(crate) table: Option<String>,
    pub(crate) name: String,
    pub(crate) kind: ColumnType,
}

#[allow(missing_docs)]
impl ColumnSpec {
    pub fn keyspace(&self) -> Option<&str> {
        self.keyspace.as_deref()
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ColumnType {
        &self.kind
    }
}

/// The column-spec set attached to a row-producing result.
#[derive(Clone, Debug)]
pub struct Metadata {
    pub(crate) flags: MetadataFlags,
    pub(crate) columns_count: i32,
    pub(crate) paging_state: Option<Vec<u8>>,
    pub(crate) global_table_spec: Option<GlobalTableSpec>,
    pub(crate) column_specs: Vec<ColumnSpec>,
}

impl Metadata {
    /// Get the metadata flags.
    pub fn flags(&self) -> MetadataFlags {
        self.flags
    }

    /// Get the column count.
    pub fn columns_count(&self) -> i32 {
        self.columns_count
    }

    /// Get the paging state, the opaque cursor reissued in a subsequent
    /// QUERY/EXECUTE to continue this result set (v2).
    pub fn paging_state(&self) -> &Option<Vec<u8>> {
        &self.paging_state
    }

    /// Get the global table spec, when every column shares one.
    pub fn global_table_spec(&self) -> &Option<GlobalTableSpec> {
        &self.global_table_spec
    }

    /// Get the column specs. Empty when the no-metadata flag was set.
    pub fn column_specs(&self) -> &[ColumnSpec] {
        &self.column_specs
    }

    /// Read result metadata under the given dialect.
    pub fn from_payload(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> anyhow::Result<Self> {
        let flags = MetadataFlags(read_int(start, payload)?);
        let columns_count = read_int(start, payload)?;
        anyhow::ensure!(columns_count >= 0, "Negative column count");
        let paging_state = if version == ProtocolVersion::V2 && flags.has_more_pages() {
            read_bytes(start, payload)?.map(<[u8]>::to_vec)
        } else {
            None
        };
        if version == ProtocolVersion::V2 && flags.no_metadata() {
            return Ok(Self {
                flags,
                columns_count,
                paging_state,
                global_table_spec: None,
                column_specs: Vec::new(),
            });
        }
        let global_table_spec = if flags.global_tables_spec() {
            Some(GlobalTableSpec::from_payload(start, payload)?)
        } else {
            None
        };
        let mut column_specs = Vec::with_capacity(columns_count as usize);
        for _ in 0..columns_count {
            let (keyspace, table) = if !flags.global_tables_spec() {
                (Some(read_string(start, payload)?), Some(read_string(start, payload)?))
            } else {
                (None, None)
            };
            let name = read_string(start, payload)?;
            let kind = ColumnType::from_payload(start, payload, version)?;
            column_specs.push(ColumnSpec {
                keyspace,
                table,
                name,
                kind,
            });
        }
        Ok(Self {
            flags,
            columns_count,
            paging_state,
            global_table_spec,
            column_specs,
        })
    }
}

/// A ROWS result: metadata, a row count, and the undecoded row region of the
/// body. Rows decode lazily from it.
#[derive(Clone)]
pub struct RowsResult {
    pub(crate) metadata: Metadata,
    pub(crate) rows_count: i32,
    pub(crate) rows: Vec<u8>,
}

impl std::fmt::Debug for RowsResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowsResult")
            .field("metadata", &self.metadata)
            .field("rows_count", &self.rows_count)
            .finish()
    }
}

impl RowsResult {
    /// Get the result metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Get the declared row count.
    pub fn rows_count(&self) -> i32 {
        self.rows_count
    }

    /// Get the undecoded row region.
    pub fn rows(&self) -> &[u8] {
        &self.rows
    }

    /// Read a ROWS body under the given dialect. The row region is kept
    /// as-is; decoding it is the row cursor's job.
    pub fn from_payload(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> anyhow::Result<Self> {
        let metadata = Metadata::from_payload(start, payload, version)?;
        let rows_count = read_int(start, payload)?;
        anyhow::ensure!(rows_count >= 0, "Negative row count");
        let rows = payload[*start..].to_vec();
        *start = payload.len();
        Ok(Self {
            metadata,
            rows_count,
            rows,
        })
    }
}

/// A PREPARED result: the statement handle plus bind metadata, and in v2 the
/// result metadata as well.
#[derive(Clone, Debug)]
pub struct PreparedResult {
    pub(crate) id: Vec<u8>,
    pub(crate) bind_metadata: Metadata,
    pub(crate) result_metadata: Option<Metadata>,
}

impl PreparedResult {
    /// Get the opaque prepared statement id. It is scoped to the node that
    /// prepared it.
    pub fn id(&self) -> &[u8] {
        &self.id
    }

    /// Get the metadata describing the bind variables.
    pub fn bind_metadata(&self) -> &Metadata {
        &self.bind_metadata
    }

    /// Get the metadata describing the result columns (v2).
    pub fn result_metadata(&self) -> &Option<Metadata> {
        &self.result_metadata
    }

    /// Read a PREPARED body under the given dialect.
    pub fn from_payload(start: &mut usize, payload: &[u8], version: ProtocolVersion) -> anyhow::Result<Self> {
        let id = read_short_bytes(start, payload)?.to_vec();
        anyhow::ensure!(!id.is_empty(), "Empty prepared id");
        let bind_metadata = Metadata::from_payload(start, payload, version)?;
        let result_metadata = match version {
            ProtocolVersion::V1 => None,
            ProtocolVersion::V2 => Some(Metadata::from_payload(start, payload, version)?),
        };
        Ok(Self {
            id,
            bind_metadata,
            result_metadata,
        })
    }
}

/// The change kind of a schema-altering query or event.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SchemaChangeType {
    Created,
    Updated,
    Dropped,
}

impl FromPayload for SchemaChangeType {
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self> {
        Ok(match read_str(start, payload)? {
            "CREATED" => SchemaChangeType::Created,
            "UPDATED" => SchemaChangeType::Updated,
            "DROPPED" => SchemaChangeType::Dropped,
            c => anyhow::bail!("Unknown schema change type: {}", c),
        })
    }
}

/// A schema change notification: three `[string]`s. The table is the empty
/// string when the change affected a whole keyspace.
#[derive(Clone, Debug)]
pub struct SchemaChange {
    /// The change kind.
    pub change: SchemaChangeType,
    /// The affected keyspace.
    pub keyspace: String,
    /// The affected table, possibly empty.
    pub table: String,
}

impl FromPayload for SchemaChange {
    fn from_payload(start: &mut usize, payload: &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            change: SchemaChangeType::from_payload(start, payload)?,
            keyspace: read_string(start, payload)?,
            table: read_string(start, payload)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_column_metadata() -> Vec<u8> {
        let mut payload = Vec::new();
        write_int(0x0001, &mut payload); // global tables spec
        write_int(2, &mut payload);
        write_string("ks", &mut payload);
        write_string("t", &mut payload);
        write_string("k", &mut payload);
        write_short(0x000D, &mut payload); // varchar
        write_string("v", &mut payload);
        write_short(0x0009, &mut payload); // int
        payload
    }

    #[test]
    fn metadata_with_global_tables_spec() {
        let payload = two_column_metadata();
        let mut start = 0;
        let metadata = Metadata::from_payload(&mut start, &payload, ProtocolVersion::V1).unwrap();
        assert_eq!(start, payload.len());
        assert_eq!(metadata.columns_count(), 2);
        assert_eq!(metadata.column_specs().len(), 2);
        assert_eq!(metadata.column_specs()[0].name(), "k");
        assert_eq!(metadata.column_specs()[0].kind(), &ColumnType::VarChar);
        assert_eq!(metadata.column_specs()[1].kind(), &ColumnType::Int);
        assert!(metadata.column_specs()[0].keyspace().is_none());
        assert_eq!(metadata.global_table_spec().as_ref().unwrap().keyspace(), "ks");
    }

    #[test]
    fn metadata_with_per_column_specs() {
        let mut payload = Vec::new();
        write_int(0, &mut payload);
        write_int(1, &mut payload);
        write_string("ks", &mut payload);
        write_string("t", &mut payload);
        write_string("c", &mut payload);
        write_short(0x0002, &mut payload); // bigint
        let mut start = 0;
        let metadata = Metadata::from_payload(&mut start, &payload, ProtocolVersion::V2).unwrap();
        assert_eq!(metadata.column_specs()[0].keyspace(), Some("ks"));
        assert_eq!(metadata.column_specs()[0].table(), Some("t"));
    }

    #[test]
    fn v2_metadata_reads_the_paging_state() {
        let mut payload = Vec::new();
        write_int(0x0002, &mut payload); // has more pages
        write_int(0, &mut payload);
        write_bytes(&[1, 2, 3], &mut payload);
        let mut start = 0;
        let metadata = Metadata::from_payload(&mut start, &payload, ProtocolVersion::V2).unwrap();
        assert_eq!(metadata.paging_state().as_deref(), Some(&[1, 2, 3][..]));
    }

    #[test]
    fn v2_no_metadata_flag_skips_the_specs() {
        let mut payload = Vec::new();
        write_int(0x0004, &mut payload);
        write_int(3, &mut payload);
        let mut start = 0;
        let metadata = Metadata::from_payload(&mut start, &payload, ProtocolVersion::V2).unwrap();
        assert_eq!(metadata.columns_count(), 3);
        assert!(metadata.column_specs().is_empty());
        assert_eq!(start, payload.len());
    }

    #[test]
    fn prepared_result_v1_has_no_result_metadata() {
        let mut payload = Vec::new();
        write_short_bytes(&[0xAA, 0xBB], &mut payload);
        payload.extend(two_column_metadata());
        let mut start = 0;
        let prepared = PreparedResult::from_payload(&mut start, &payload, ProtocolVersion::V1).unwrap();
        assert_eq!(prepared.id(), &[0xAA, 0xBB]);
        assert!(prepared.result_metadata().is_none());
        assert_eq!(start, payload.len());
    }

    #[test]
    fn schema_change_result() {
        let mut payload = Vec::new();
        write_int(SCHEMACHANGE, &mut payload);
        write_string("CREATED", &mut payload);
        write_string("ks", &mut payload);
        write_string("", &mut payload);
        let mut start = 0;
        let frame = ResultFrame::from_payload(&mut start, &payload, ProtocolVersion::V1).unwrap();
        match frame.kind() {
            ResultBodyKind::SchemaChange(change) => {
                assert_eq!(change.change, SchemaChangeType::Created);
                assert_eq!(change.keyspace, "ks");
                assert_eq!(change.table, "");
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }
}

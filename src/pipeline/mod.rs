//! The offline ingestion pipeline (spec §4.2-§4.6): image bytes -> text
//! -> entities -> per-document table -> structured record -> vector
//! index. Each stage is gated by a `crate::workset` diff so reruns are
//! incremental and idempotent.

pub mod entities;
pub mod index;
pub mod ingest;
pub mod ocr;
pub mod structure;
pub mod summarize;

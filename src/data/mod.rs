//! Data layer: core types and loading.
//!
//! Architecture:
//! ```text
//!  .xlsx / .csv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → RawTable
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ RawTable  │  column names + rows of CellValue
//!   └──────────┘
//!        │
//!        ▼
//!   analysis::run
//! ```

pub mod loader;
pub mod model;

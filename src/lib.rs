//! xlsxpull - Pure-Rust streaming Excel reader with pull-based batch decoding
//!
//! このクレートは、XLSXワークブック（ZIPコンテナ + XMLパート）から
//! ワークブック全体をメモリに載せることなく行をストリーミングで
//! 読み出す機能を提供します。中核はバッファ付きのプル型デコーダで、
//! シートのXMLイベントストリームと共有文字列テーブルを、バッチ単位の
//! 型付きセル値へ逐次変換します。
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use xlsxpull::WorkbookReader;
//!
//! fn main() -> Result<(), xlsxpull::XlsxPullError> {
//!     let mut reader = WorkbookReader::open("example.xlsx")?;
//!
//!     reader.select_sheet("Sheet1")?;
//!     println!("rows: {:?}", reader.row_count());
//!
//!     reader.set_batch_size(1000);
//!     while reader.has_next()? {
//!         let batch = reader.next_batch()?;
//!         for row in &batch.rows {
//!             for cell in &row.cells {
//!                 println!("{} = {}", cell.coord.to_a1_notation(), cell.value.as_raw_string());
//!             }
//!         }
//!     }
//!
//!     reader.close();
//!     Ok(())
//! }
//! ```
//!
//! メモリ上のバッファから読む場合は`Cursor`を使用します:
//!
//! ```rust,no_run
//! use std::io::Cursor;
//! use xlsxpull::WorkbookReader;
//!
//! # fn main() -> Result<(), xlsxpull::XlsxPullError> {
//! let workbook_data: Vec<u8> = vec![]; // XLSXファイルのバイト列
//! let mut reader = WorkbookReader::from_reader(Cursor::new(workbook_data))?;
//! # Ok(())
//! # }
//! ```
//!
//! # スパース行について
//!
//! フォーマットは値を持つセルだけを明示的な座標付きで記録するため、
//! デコード結果の行もスパースです。ギャップ（定義されていない列）は
//! 空白セルとして補完されません。密な行が必要な場合は、セル座標の
//! ギャップから呼び出し元で復元してください。

mod error;
mod package;
mod reader;
mod security;
mod shared_strings;
mod types;

// 公開API
pub use error::XlsxPullError;
pub use reader::{BufferedSheetReader, WorkbookReader, DEFAULT_BATCH_SIZE};
pub use shared_strings::SharedStringTable;
pub use types::{Cell, CellCoord, CellValue, Row, RowBatch};

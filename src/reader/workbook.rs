//! Workbook Reader Module
//!
//! ドキュメントのオープン、シート名の解決、行カウンタとデコーダの
//! 組み立てを担うオーケストレータ。アクティブなシートコンテキストは
//! 常に高々1つです。

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use crate::error::XlsxPullError;
use crate::package::{XlsxPackage, SHARED_STRINGS_PART, WORKBOOK_PART, WORKBOOK_RELS_PART};
use crate::reader::manifest::WorkbookManifest;
use crate::reader::sheet::{BufferedSheetReader, DEFAULT_BATCH_SIZE};
use crate::shared_strings::SharedStringTable;
use crate::types::RowBatch;

/// 選択中のシートのコンテキスト
///
/// 新しいシートを選択すると、前のコンテキストは解放されてから
/// 置き換えられます。
struct ActiveSheet {
    parser: BufferedSheetReader,
    row_count: u32,
}

/// ワークブックリーダー
///
/// コンテナを読み取り専用で開き、シート名を内部パートに解決して、
/// 行カウンタとバッファ付きシートリーダーを組み立てます。共有文字列
/// テーブルはオープン時に一度だけ構築され、シートを切り替えても
/// 再構築されません。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxpull::WorkbookReader;
///
/// # fn main() -> Result<(), xlsxpull::XlsxPullError> {
/// let mut reader = WorkbookReader::open("data.xlsx")?;
/// reader.select_sheet("Sheet1")?;
/// reader.set_batch_size(500);
///
/// while reader.has_next()? {
///     let batch = reader.next_batch()?;
///     for row in &batch.rows {
///         println!("row {}: {} cells", row.index, row.column_count());
///     }
/// }
///
/// reader.close();
/// # Ok(())
/// # }
/// ```
pub struct WorkbookReader<R: Read + Seek> {
    /// コンテナ。`close()`でNoneになる
    package: Option<XlsxPackage<R>>,
    manifest: WorkbookManifest,
    strings: Arc<SharedStringTable>,
    active: Option<ActiveSheet>,
    /// シート選択前に設定されたバッチサイズも次のシートに引き継ぐ
    batch_size: usize,
    closed: bool,
}

impl WorkbookReader<BufReader<File>> {
    /// パスを指定してワークブックを開く
    ///
    /// # 引数
    ///
    /// * `path` - XLSXファイルのパス
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookReader)` - オープンに成功した場合
    /// * `Err(XlsxPullError::Io)` - パスが解決できない場合
    /// * `Err(XlsxPullError::InvalidFormat)` - コンテナまたはワークブック
    ///   XMLが解析できない場合。解析失敗を抱えたまま構築が成功することは
    ///   ありません
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, XlsxPullError> {
        log::info!("opening workbook '{}'", path.as_ref().display());
        Self::build(XlsxPackage::open(path)?)
    }
}

impl<R: Read + Seek> WorkbookReader<R> {
    /// 任意の`Read + Seek`ソースからワークブックを開く
    ///
    /// メモリ上のバッファ（`Cursor<Vec<u8>>`など）からのオープンに
    /// 使用します。
    pub fn from_reader(reader: R) -> Result<Self, XlsxPullError> {
        Self::build(XlsxPackage::from_reader(reader)?)
    }

    fn build(mut package: XlsxPackage<R>) -> Result<Self, XlsxPullError> {
        if !package.has_part(WORKBOOK_PART) {
            return Err(XlsxPullError::InvalidFormat(format!(
                "missing {}",
                WORKBOOK_PART
            )));
        }
        if !package.has_part(WORKBOOK_RELS_PART) {
            return Err(XlsxPullError::InvalidFormat(format!(
                "missing {}",
                WORKBOOK_RELS_PART
            )));
        }

        let workbook_xml = package.part_bytes(WORKBOOK_PART)?;
        let rels_xml = package.part_bytes(WORKBOOK_RELS_PART)?;
        let manifest = WorkbookManifest::parse(&workbook_xml, &rels_xml)?;

        // 共有文字列テーブルはドキュメントごとに一度だけ構築する。
        // パート自体が無いワークブック（文字列セルなし）は空テーブルで扱う
        let strings = if package.has_part(SHARED_STRINGS_PART) {
            SharedStringTable::parse(&package.part_bytes(SHARED_STRINGS_PART)?)?
        } else {
            log::warn!("workbook has no shared strings part");
            SharedStringTable::empty()
        };

        log::info!(
            "workbook opened: {} sheets, {} shared strings",
            manifest.sheet_names().len(),
            strings.len()
        );

        Ok(Self {
            package: Some(package),
            manifest,
            strings: Arc::new(strings),
            active: None,
            batch_size: DEFAULT_BATCH_SIZE,
            closed: false,
        })
    }

    /// すべてのシート名を取得（ドキュメント内の出現順）
    pub fn sheet_names(&self) -> Vec<String> {
        self.manifest.sheet_names()
    }

    /// 名前でシートを選択し、行カウンタとデコーダを組み立てる
    ///
    /// 名前の解決はコンテキストの差し替えより先に行われます。未知の
    /// シート名で失敗した場合、直前に選択されていたシートはそのまま
    /// 利用し続けられます。成功した場合は前のシートのリソースを解放
    /// してから、行数の事前スキャンと新しいデコーダの構築を行います。
    ///
    /// # 戻り値
    ///
    /// * `Ok(())` - 選択に成功した場合
    /// * `Err(XlsxPullError::NotFound)` - シート名が未知の場合
    /// * `Err(XlsxPullError::ClosedResource)` - リーダーがクローズ済みの場合
    pub fn select_sheet(&mut self, name: &str) -> Result<(), XlsxPullError> {
        if self.closed {
            return Err(XlsxPullError::ClosedResource);
        }

        // 解決とスキャンが全部成功するまで、現在のコンテキストには触れない
        let part_path = self.manifest.sheet_part_path(name)?;
        let package = self.package.as_mut().ok_or(XlsxPullError::ClosedResource)?;
        let sheet_xml = package.part_bytes(&part_path)?;
        let row_count = BufferedSheetReader::count_rows(&sheet_xml)?;

        // 前のシートのストリームを解放してから新しいコンテキストを作る
        if let Some(mut previous) = self.active.take() {
            previous.parser.clear();
            previous.parser.close();
        }

        let mut parser = BufferedSheetReader::new(sheet_xml, Arc::clone(&self.strings));
        parser.set_batch_size(self.batch_size);

        log::debug!("sheet '{}' selected: {} rows", name, row_count);
        self.active = Some(ActiveSheet { parser, row_count });
        Ok(())
    }

    /// 選択中のシートの行数を取得
    ///
    /// 最初の`select_sheet()`が成功する前は`None`を返します。
    pub fn row_count(&self) -> Option<u32> {
        self.active.as_ref().map(|sheet| sheet.row_count)
    }

    /// まだ行が残っているかを判定
    ///
    /// シートが未選択の場合は`Ok(false)`です。
    pub fn has_next(&self) -> Result<bool, XlsxPullError> {
        if self.closed {
            return Err(XlsxPullError::ClosedResource);
        }
        match &self.active {
            Some(sheet) => sheet.parser.has_next(),
            None => Ok(false),
        }
    }

    /// 1バッチの最大行数を設定
    ///
    /// 選択中のシートに即座に適用され、以降に選択されるシートにも
    /// 引き継がれます。`0`は無制限（残りのシート全体を1バッチ）です。
    pub fn set_batch_size(&mut self, batch_size: usize) {
        self.batch_size = batch_size;
        if let Some(sheet) = self.active.as_mut() {
            sheet.parser.set_batch_size(batch_size);
        }
    }

    /// 次の行バッチを取得
    ///
    /// 選択中のシートのデコーダに委譲します。シートが未選択の場合は
    /// 空のバッチを返します（`has_next()`の`Ok(false)`と対応）。
    pub fn next_batch(&mut self) -> Result<RowBatch, XlsxPullError> {
        if self.closed {
            return Err(XlsxPullError::ClosedResource);
        }
        match self.active.as_mut() {
            Some(sheet) => {
                let batch = sheet.parser.next_batch()?;
                log::debug!("pulled batch of {} rows", batch.len());
                Ok(batch)
            }
            None => Ok(RowBatch::exhausted()),
        }
    }

    /// シートのデコーダとコンテナを解放
    ///
    /// 解放は固定順（デコーダ → コンテナ）で行われ、何度呼び出しても
    /// 安全です。以後の操作は`ClosedResource`で失敗します。
    pub fn close(&mut self) {
        if let Some(mut sheet) = self.active.take() {
            sheet.parser.close();
        }
        self.package = None;
        self.closed = true;
    }
}

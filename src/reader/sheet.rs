//! Buffered Sheet Reader Module
//!
//! シートXMLのイベントストリームをプル型でデコードする中核モジュール。
//! XMLイベントカーソルは呼び出し間で保持され、`next_batch()`のたびに
//! 前回中断した位置から消費を再開します。行の再スキャンは発生しません。

use std::io::Cursor;
use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::XlsxPullError;
use crate::shared_strings::SharedStringTable;
use crate::types::{Cell, CellCoord, CellValue, Row, RowBatch};

/// 1バッチあたりのデフォルト行数
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// リーダーの状態
///
/// Idle → Streaming → Exhausted と一方向に遷移し、`close()`は
/// どの状態からでもClosedに遷移させます。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    /// 構築済み、まだイベントを消費していない
    Idle,
    /// イベント消費中（バッチ境界でのみ中断する）
    Streaming,
    /// ストリームが行イベントを出し尽くした
    Exhausted,
    /// リソース解放済み
    Closed,
}

/// セルの型タグ（`c`要素の`t`属性）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellTypeTag {
    /// 数値（t属性なしのデフォルト）
    Number,
    /// 共有文字列参照（t="s"）
    SharedString,
    /// インライン文字列（t="inlineStr"）
    InlineString,
    /// 数式の文字列結果（t="str"）。インライン文字列と同様に扱う
    FormulaString,
    /// 論理値（t="b"）
    Bool,
    /// 数式エラー値（t="e"）
    Error,
}

impl CellTypeTag {
    fn from_attr(value: &[u8]) -> Option<Self> {
        match value {
            b"n" => Some(Self::Number),
            b"s" => Some(Self::SharedString),
            b"inlineStr" => Some(Self::InlineString),
            b"str" => Some(Self::FormulaString),
            b"b" => Some(Self::Bool),
            b"e" => Some(Self::Error),
            _ => None,
        }
    }
}

/// デコード途中のセル
///
/// `<c>`開始イベントで生成され、値テキストを集めたあと`</c>`で
/// `Cell`として完成します。
struct PendingCell {
    coord: CellCoord,
    tag: Option<CellTypeTag>,
    raw: Option<String>,
}

impl PendingCell {
    fn open(e: &BytesStart<'_>, fallback: CellCoord) -> Result<Self, XlsxPullError> {
        let mut coord = fallback;
        let mut tag = None;

        for attr in e.attributes() {
            let attr = attr.map_err(|err| {
                malformed(&fallback.to_a1_notation(), format!("attribute error: {}", err))
            })?;
            match attr.key.as_ref() {
                b"r" => {
                    let raw = std::str::from_utf8(&attr.value)?;
                    coord = CellCoord::parse_a1(raw).ok_or_else(|| {
                        malformed(raw, "cell reference could not be parsed")
                    })?;
                }
                b"t" => {
                    tag = Some(CellTypeTag::from_attr(&attr.value).ok_or_else(|| {
                        malformed(
                            &fallback.to_a1_notation(),
                            format!(
                                "unknown cell type tag '{}'",
                                String::from_utf8_lossy(&attr.value)
                            ),
                        )
                    })?);
                }
                _ => {}
            }
        }

        Ok(Self {
            coord,
            tag,
            raw: None,
        })
    }

    fn push_text(&mut self, text: &str) {
        self.raw.get_or_insert_with(String::new).push_str(text);
    }

    /// 集めたテキストと型タグから`Cell`を完成させる
    ///
    /// 共有文字列参照はこの時点でテーブル経由で解決されます。
    fn finish(self, strings: &SharedStringTable) -> Result<Cell, XlsxPullError> {
        let context = self.coord.to_a1_notation();

        let value = match self.tag {
            Some(CellTypeTag::SharedString) => {
                let raw = self
                    .raw
                    .ok_or_else(|| malformed(&context, "shared string cell has no value"))?;
                let index: usize = raw.trim().parse().map_err(|_| {
                    malformed(&context, format!("invalid shared string index '{}'", raw))
                })?;
                CellValue::Shared(strings.resolve(index)?.to_string())
            }
            Some(CellTypeTag::InlineString) | Some(CellTypeTag::FormulaString) => {
                CellValue::Inline(self.raw.unwrap_or_default())
            }
            Some(CellTypeTag::Bool) => match self.raw.as_deref().map(str::trim) {
                Some("1") | Some("true") => CellValue::Bool(true),
                Some("0") | Some("false") => CellValue::Bool(false),
                Some(other) => {
                    return Err(malformed(
                        &context,
                        format!("invalid boolean value '{}'", other),
                    ))
                }
                None => return Err(malformed(&context, "boolean cell has no value")),
            },
            Some(CellTypeTag::Error) => CellValue::Error(self.raw.unwrap_or_default()),
            // t属性なしは数値セル。値を持たなければ空白セル
            Some(CellTypeTag::Number) | None => match self.raw {
                None => CellValue::Empty,
                Some(raw) => {
                    let number: f64 = raw.trim().parse().map_err(|_| {
                        malformed(&context, format!("invalid numeric value '{}'", raw))
                    })?;
                    CellValue::Number(number)
                }
            },
        };

        Ok(Cell::new(self.coord, value))
    }
}

fn malformed(context: &str, message: impl Into<String>) -> XlsxPullError {
    XlsxPullError::MalformedDocument {
        context: context.to_string(),
        message: message.into(),
    }
}

/// `<row>`開始イベントから新しい行を開く
///
/// `r`属性（1始まり）は0始まりに正規化されます。属性が省略された
/// 場合は直前の行の次の位置と見なします。
fn open_row(e: &BytesStart<'_>, fallback_index: u32) -> Result<Row, XlsxPullError> {
    let mut index = fallback_index;

    for attr in e.attributes() {
        let attr = attr.map_err(|err| {
            malformed(
                &format!("row {}", fallback_index + 1),
                format!("attribute error: {}", err),
            )
        })?;
        if attr.key.as_ref() == b"r" {
            let raw = std::str::from_utf8(&attr.value)?;
            let number: u32 = raw
                .parse()
                .map_err(|_| malformed(raw, "row number could not be parsed"))?;
            index = number
                .checked_sub(1)
                .ok_or_else(|| malformed(raw, "row numbers are 1-based"))?;
        }
    }

    Ok(Row::new(index))
}

/// バッファ付きシートリーダー（プル型デコーダ）
///
/// シートパートのXMLイベントストリームと共有文字列テーブルを束ね、
/// `next_batch()`の呼び出しごとにデコード済みの行バッチを返します。
/// カーソルは明示的に保持され、呼び出し間で巻き戻りません。
///
/// スパース行のギャップ（定義されていない列）はそのまま保存されます。
/// 正しい穴埋め値（空文字列か型付きゼロか）は呼び出し元のポリシー
/// なので、デコーダ側で空白セルを発明することはありません。
pub struct BufferedSheetReader {
    /// 再開可能なXMLイベントカーソル。`close()`でNoneになる
    reader: Option<Reader<Cursor<Vec<u8>>>>,
    /// イベント読み取り用の再利用バッファ
    buf: Vec<u8>,
    /// ドキュメント単位で共有される文字列テーブル
    strings: Arc<SharedStringTable>,
    /// 1バッチの最大行数（0は無制限）
    batch_size: usize,
    state: ReaderState,
    /// `r`属性を持たない行のための次の行インデックス
    next_row_index: u32,
}

impl BufferedSheetReader {
    /// シートパートのバイト列からリーダーを構築
    ///
    /// # 引数
    ///
    /// * `sheet_xml` - シートパートの展開済みバイト列（リーダーが所有する）
    /// * `strings` - ドキュメントの共有文字列テーブル
    pub fn new(sheet_xml: Vec<u8>, strings: Arc<SharedStringTable>) -> Self {
        let mut reader = Reader::from_reader(Cursor::new(sheet_xml));
        reader.trim_text(true);

        Self {
            reader: Some(reader),
            buf: Vec::new(),
            strings,
            batch_size: DEFAULT_BATCH_SIZE,
            state: ReaderState::Idle,
            next_row_index: 0,
        }
    }

    /// 行数のみを数える事前スキャン
    ///
    /// デコードとは独立した自前のリーダーで1パス走査し、行開始イベント
    /// のみを数えます。セルの内容は一切保持しません。行数は事前属性から
    /// 信頼できる形では得られないため、この数えるだけの走査を本デコード
    /// の前に実行します。
    ///
    /// # 戻り値
    ///
    /// * `Ok(u32)` - 行要素の個数（空のシートは0）
    /// * `Err(XlsxPullError::MalformedDocument)` - XMLが整形でない場合
    pub fn count_rows(sheet_xml: &[u8]) -> Result<u32, XlsxPullError> {
        let mut reader = Reader::from_reader(sheet_xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut count: u32 = 0;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    if e.name().as_ref() == b"row" {
                        count += 1;
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(malformed(
                        &format!("row {}", count + 1),
                        format!("XML error: {}", e),
                    ))
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(count)
    }

    /// まだ行が残っているかを判定
    ///
    /// # 戻り値
    ///
    /// * `Ok(true)` - Idle/Streaming状態（まだストリーム終端に達していない）
    /// * `Ok(false)` - Exhausted状態
    /// * `Err(XlsxPullError::ClosedResource)` - クローズ済みの場合
    pub fn has_next(&self) -> Result<bool, XlsxPullError> {
        match self.state {
            ReaderState::Closed => Err(XlsxPullError::ClosedResource),
            ReaderState::Exhausted => Ok(false),
            ReaderState::Idle | ReaderState::Streaming => Ok(true),
        }
    }

    /// 1バッチの最大行数を設定
    ///
    /// 次の`next_batch()`呼び出しから適用され、進行中のバッチには
    /// 影響しません。`0`は無制限（残りのシート全体を1バッチで返す）を
    /// 意味します。
    pub fn set_batch_size(&mut self, batch_size: usize) {
        self.batch_size = batch_size;
    }

    /// 次の行バッチをデコード
    ///
    /// 前回の呼び出しが中断した位置からXMLイベントの消費を再開し、
    /// 完成した行をバッチに蓄積します。バッチが設定サイズに達するか、
    /// ストリームが終端に達した時点で返却します。
    ///
    /// # 戻り値
    ///
    /// * `Ok(RowBatch)` - デコード済みの行（Exhausted後の呼び出しでは空バッチ）
    /// * `Err(XlsxPullError::MalformedDocument)` - XML構造違反、座標解析失敗
    /// * `Err(XlsxPullError::OutOfRange)` - 共有文字列インデックスが範囲外
    /// * `Err(XlsxPullError::ClosedResource)` - クローズ済みの場合
    pub fn next_batch(&mut self) -> Result<RowBatch, XlsxPullError> {
        match self.state {
            ReaderState::Closed => return Err(XlsxPullError::ClosedResource),
            ReaderState::Exhausted => return Ok(RowBatch::exhausted()),
            ReaderState::Idle | ReaderState::Streaming => {}
        }
        self.state = ReaderState::Streaming;

        let limit = self.batch_size;
        let mut rows: Vec<Row> = Vec::new();

        // 行・セルのデコード用スクラッチ。バッチはちょうど</row>境界で
        // 返却されるため、これらが呼び出しをまたいで生き残ることはない
        let mut row: Option<Row> = None;
        let mut cell: Option<PendingCell> = None;
        let mut next_col: u32 = 0;
        let mut in_value = false;
        let mut in_inline = false;
        let mut in_inline_text = false;
        let mut in_phonetic = false;

        let reader = self.reader.as_mut().ok_or(XlsxPullError::ClosedResource)?;

        loop {
            let event = reader.read_event_into(&mut self.buf).map_err(|e| {
                malformed(
                    &format!("row {}", self.next_row_index),
                    format!("XML error: {}", e),
                )
            })?;

            match event {
                Event::Start(e) => match e.name().as_ref() {
                    b"row" => {
                        let opened = open_row(&e, self.next_row_index)?;
                        self.next_row_index = opened.index + 1;
                        next_col = 0;
                        row = Some(opened);
                    }
                    b"c" => {
                        let current_row = row.as_ref().ok_or_else(|| {
                            malformed("sheetData", "cell element outside of a row")
                        })?;
                        let fallback = CellCoord::new(current_row.index, next_col);
                        cell = Some(PendingCell::open(&e, fallback)?);
                    }
                    b"v" if cell.is_some() => in_value = true,
                    b"is" if cell.is_some() => in_inline = true,
                    b"rPh" if in_inline => in_phonetic = true,
                    b"t" if in_inline && !in_phonetic => in_inline_text = true,
                    _ => {}
                },
                Event::Empty(e) => match e.name().as_ref() {
                    // セルを1つも持たない行は即座に完結する
                    b"row" => {
                        let opened = open_row(&e, self.next_row_index)?;
                        self.next_row_index = opened.index + 1;
                        rows.push(opened);
                        if limit > 0 && rows.len() >= limit {
                            return Ok(RowBatch {
                                rows,
                                has_more: true,
                            });
                        }
                    }
                    // 値を持たない自己終了セルは空白セル
                    b"c" => {
                        let current_row = row.as_mut().ok_or_else(|| {
                            malformed("sheetData", "cell element outside of a row")
                        })?;
                        let fallback = CellCoord::new(current_row.index, next_col);
                        let pending = PendingCell::open(&e, fallback)?;
                        next_col = pending.coord.col + 1;
                        current_row.cells.push(pending.finish(&self.strings)?);
                    }
                    _ => {}
                },
                Event::Text(e) => {
                    if in_value || in_inline_text {
                        if let Some(pending) = cell.as_mut() {
                            let text = e.unescape().map_err(|err| {
                                malformed(
                                    &pending.coord.to_a1_notation(),
                                    format!("text error: {}", err),
                                )
                            })?;
                            pending.push_text(&text);
                        }
                    }
                }
                Event::End(e) => match e.name().as_ref() {
                    b"v" => in_value = false,
                    b"t" => in_inline_text = false,
                    b"rPh" => in_phonetic = false,
                    b"is" => in_inline = false,
                    b"c" => {
                        if let Some(pending) = cell.take() {
                            let current_row = row.as_mut().ok_or_else(|| {
                                malformed("sheetData", "cell element outside of a row")
                            })?;
                            next_col = pending.coord.col + 1;
                            current_row.cells.push(pending.finish(&self.strings)?);
                        }
                    }
                    b"row" => {
                        if let Some(finished) = row.take() {
                            rows.push(finished);
                            if limit > 0 && rows.len() >= limit {
                                return Ok(RowBatch {
                                    rows,
                                    has_more: true,
                                });
                            }
                        }
                    }
                    _ => {}
                },
                Event::Eof => {
                    if row.is_some() || cell.is_some() {
                        return Err(malformed(
                            &format!("row {}", self.next_row_index),
                            "sheet XML ended inside an open row",
                        ));
                    }
                    self.state = ReaderState::Exhausted;
                    log::debug!("sheet stream exhausted");
                    return Ok(RowBatch {
                        rows,
                        has_more: false,
                    });
                }
                _ => {}
            }
            self.buf.clear();
        }
    }

    /// シート切り替え前に内部デコードバッファをリセット
    ///
    /// 共有文字列テーブルには触れません。オーケストレータがシートを
    /// 差し替える直前に呼び出します。
    pub(crate) fn clear(&mut self) {
        self.buf.clear();
    }

    /// XMLイベントリーダーを解放
    ///
    /// 冪等であり、何度呼び出しても安全です。以後の`next_batch()`と
    /// `has_next()`は`ClosedResource`で失敗します。
    pub fn close(&mut self) {
        self.reader = None;
        self.buf.clear();
        self.state = ReaderState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(rows: &str) -> Vec<u8> {
        format!(
            r#"<?xml version="1.0"?><worksheet><sheetData>{}</sheetData></worksheet>"#,
            rows
        )
        .into_bytes()
    }

    fn table(strings: &[&str]) -> Arc<SharedStringTable> {
        let items: String = strings
            .iter()
            .map(|s| format!("<si><t>{}</t></si>", s))
            .collect();
        let xml = format!("<sst>{}</sst>", items);
        Arc::new(SharedStringTable::parse(xml.as_bytes()).unwrap())
    }

    fn empty_table() -> Arc<SharedStringTable> {
        Arc::new(SharedStringTable::empty())
    }

    const THREE_ROWS: &str = r#"
        <row r="1"><c r="A1"><v>1</v></c></row>
        <row r="2"><c r="A2"><v>2</v></c></row>
        <row r="3"><c r="A3"><v>3</v></c></row>"#;

    // バッチ境界のテスト: 3行・バッチサイズ2
    #[test]
    fn test_three_rows_batch_of_two() {
        let mut reader = BufferedSheetReader::new(sheet(THREE_ROWS), empty_table());
        reader.set_batch_size(2);

        let first = reader.next_batch().unwrap();
        assert_eq!(first.len(), 2);
        assert!(first.has_more);
        assert!(reader.has_next().unwrap());

        let second = reader.next_batch().unwrap();
        assert_eq!(second.len(), 1);
        assert!(!second.has_more);
        assert!(!reader.has_next().unwrap());

        // Exhausted後の呼び出しは空バッチを返す（エラーではない）
        let third = reader.next_batch().unwrap();
        assert!(third.is_empty());
        assert!(!third.has_more);
    }

    #[test]
    fn test_batching_never_reorders_rows() {
        let mut batched = BufferedSheetReader::new(sheet(THREE_ROWS), empty_table());
        batched.set_batch_size(1);
        let mut collected = Vec::new();
        loop {
            let batch = batched.next_batch().unwrap();
            let done = !batch.has_more;
            collected.extend(batch.rows);
            if done {
                break;
            }
        }

        let mut unbatched = BufferedSheetReader::new(sheet(THREE_ROWS), empty_table());
        unbatched.set_batch_size(0);
        let all = unbatched.next_batch().unwrap();

        assert_eq!(collected, all.rows);
        assert_eq!(collected.len(), 3);
    }

    #[test]
    fn test_unbounded_batch_size() {
        let mut reader = BufferedSheetReader::new(sheet(THREE_ROWS), empty_table());
        reader.set_batch_size(0);

        let batch = reader.next_batch().unwrap();
        assert_eq!(batch.len(), 3);
        assert!(!batch.has_more);
    }

    #[test]
    fn test_batch_size_change_applies_to_next_call() {
        let mut reader = BufferedSheetReader::new(sheet(THREE_ROWS), empty_table());
        reader.set_batch_size(1);

        let first = reader.next_batch().unwrap();
        assert_eq!(first.len(), 1);

        reader.set_batch_size(2);
        let second = reader.next_batch().unwrap();
        assert_eq!(second.len(), 2);
    }

    // スパース行のテスト: ギャップのセルは出現しない
    #[test]
    fn test_sparse_row_preserves_gaps() {
        let xml = sheet(
            r#"<row r="5"><c r="B5"><v>1</v></c><c r="D5"><v>2</v></c></row>"#,
        );
        let mut reader = BufferedSheetReader::new(xml, empty_table());

        let batch = reader.next_batch().unwrap();
        let row = &batch.rows[0];
        assert_eq!(row.index, 4);
        assert_eq!(row.column_count(), 2);
        assert_eq!(row.cells[0].coord, CellCoord::new(4, 1));
        assert_eq!(row.cells[1].coord, CellCoord::new(4, 3));
        // C5はXMLに存在しないため、デコード結果にも現れない
        assert!(row.cell_at(2).is_none());
    }

    #[test]
    fn test_shared_string_resolution() {
        let xml = sheet(
            r#"<row r="1"><c r="A1" t="s"><v>1</v></c><c r="B1" t="s"><v>0</v></c></row>"#,
        );
        let mut reader = BufferedSheetReader::new(xml, table(&["zero", "one"]));

        let batch = reader.next_batch().unwrap();
        let row = &batch.rows[0];
        assert_eq!(row.cells[0].value, CellValue::Shared("one".to_string()));
        assert_eq!(row.cells[1].value, CellValue::Shared("zero".to_string()));
    }

    #[test]
    fn test_shared_string_out_of_range() {
        let xml = sheet(r#"<row r="1"><c r="A1" t="s"><v>5</v></c></row>"#);
        let mut reader = BufferedSheetReader::new(xml, table(&["only"]));

        match reader.next_batch() {
            Err(XlsxPullError::OutOfRange { index, len }) => {
                assert_eq!(index, 5);
                assert_eq!(len, 1);
            }
            _ => panic!("Expected OutOfRange"),
        }
    }

    #[test]
    fn test_shared_string_index_not_an_integer() {
        let xml = sheet(r#"<row r="1"><c r="A1" t="s"><v>abc</v></c></row>"#);
        let mut reader = BufferedSheetReader::new(xml, table(&["only"]));

        assert!(matches!(
            reader.next_batch(),
            Err(XlsxPullError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn test_inline_string() {
        let xml = sheet(
            r#"<row r="1"><c r="A1" t="inlineStr"><is><t>hello inline</t></is></c></row>"#,
        );
        let mut reader = BufferedSheetReader::new(xml, empty_table());

        let batch = reader.next_batch().unwrap();
        assert_eq!(
            batch.rows[0].cells[0].value,
            CellValue::Inline("hello inline".to_string())
        );
    }

    #[test]
    fn test_formula_string_result() {
        // t="str"は数式の文字列結果。<f>の中身は値として取り込まない
        let xml = sheet(
            r#"<row r="1"><c r="A1" t="str"><f>CONCAT(B1,C1)</f><v>joined</v></c></row>"#,
        );
        let mut reader = BufferedSheetReader::new(xml, empty_table());

        let batch = reader.next_batch().unwrap();
        assert_eq!(
            batch.rows[0].cells[0].value,
            CellValue::Inline("joined".to_string())
        );
    }

    #[test]
    fn test_bool_and_error_cells() {
        let xml = sheet(
            r#"<row r="1">
                <c r="A1" t="b"><v>1</v></c>
                <c r="B1" t="b"><v>0</v></c>
                <c r="C1" t="e"><v>#DIV/0!</v></c>
            </row>"#,
        );
        let mut reader = BufferedSheetReader::new(xml, empty_table());

        let batch = reader.next_batch().unwrap();
        let row = &batch.rows[0];
        assert_eq!(row.cells[0].value, CellValue::Bool(true));
        assert_eq!(row.cells[1].value, CellValue::Bool(false));
        assert_eq!(row.cells[2].value, CellValue::Error("#DIV/0!".to_string()));
    }

    #[test]
    fn test_blank_cells() {
        // 値を持たないセル要素は空白セルとしてデコードされる
        let xml = sheet(r#"<row r="1"><c r="A1"/><c r="B1" s="3"></c></row>"#);
        let mut reader = BufferedSheetReader::new(xml, empty_table());

        let batch = reader.next_batch().unwrap();
        let row = &batch.rows[0];
        assert_eq!(row.column_count(), 2);
        assert_eq!(row.cells[0].value, CellValue::Empty);
        assert_eq!(row.cells[1].value, CellValue::Empty);
    }

    #[test]
    fn test_number_formats() {
        let xml = sheet(
            r#"<row r="1">
                <c r="A1"><v>42</v></c>
                <c r="B1"><v>-3.25</v></c>
                <c r="C1"><v>1.5e3</v></c>
            </row>"#,
        );
        let mut reader = BufferedSheetReader::new(xml, empty_table());

        let batch = reader.next_batch().unwrap();
        let row = &batch.rows[0];
        assert_eq!(row.cells[0].value, CellValue::Number(42.0));
        assert_eq!(row.cells[1].value, CellValue::Number(-3.25));
        assert_eq!(row.cells[2].value, CellValue::Number(1500.0));
    }

    // r属性の省略: 直前の位置から推測する
    #[test]
    fn test_missing_position_attributes() {
        let xml = sheet(
            r#"<row><c><v>1</v></c><c><v>2</v></c></row>
               <row><c r="C2"><v>3</v></c><c><v>4</v></c></row>"#,
        );
        let mut reader = BufferedSheetReader::new(xml, empty_table());

        let batch = reader.next_batch().unwrap();
        assert_eq!(batch.rows[0].index, 0);
        assert_eq!(batch.rows[0].cells[0].coord, CellCoord::new(0, 0));
        assert_eq!(batch.rows[0].cells[1].coord, CellCoord::new(0, 1));
        assert_eq!(batch.rows[1].index, 1);
        assert_eq!(batch.rows[1].cells[0].coord, CellCoord::new(1, 2));
        // C2の次はD2
        assert_eq!(batch.rows[1].cells[1].coord, CellCoord::new(1, 3));
    }

    #[test]
    fn test_unparsable_coordinate() {
        let xml = sheet(r#"<row r="1"><c r="!!"><v>1</v></c></row>"#);
        let mut reader = BufferedSheetReader::new(xml, empty_table());

        assert!(matches!(
            reader.next_batch(),
            Err(XlsxPullError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn test_unknown_type_tag() {
        let xml = sheet(r#"<row r="1"><c r="A1" t="x"><v>1</v></c></row>"#);
        let mut reader = BufferedSheetReader::new(xml, empty_table());

        assert!(matches!(
            reader.next_batch(),
            Err(XlsxPullError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn test_empty_rows_counted_and_decoded() {
        let xml = sheet(r#"<row r="1"/><row r="2"><c r="A2"><v>1</v></c></row>"#);
        let mut reader = BufferedSheetReader::new(xml, empty_table());

        let batch = reader.next_batch().unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch.rows[0].is_empty());
        assert_eq!(batch.rows[1].column_count(), 1);
    }

    // クローズ後の操作はClosedResourceで失敗する
    #[test]
    fn test_closed_resource() {
        let mut reader = BufferedSheetReader::new(sheet(THREE_ROWS), empty_table());
        reader.close();

        assert!(matches!(
            reader.has_next(),
            Err(XlsxPullError::ClosedResource)
        ));
        assert!(matches!(
            reader.next_batch(),
            Err(XlsxPullError::ClosedResource)
        ));

        // closeは冪等
        reader.close();
        assert!(matches!(
            reader.next_batch(),
            Err(XlsxPullError::ClosedResource)
        ));
    }

    // count_rows のテスト
    #[test]
    fn test_count_rows() {
        assert_eq!(
            BufferedSheetReader::count_rows(&sheet(THREE_ROWS)).unwrap(),
            3
        );
        assert_eq!(BufferedSheetReader::count_rows(&sheet("")).unwrap(), 0);
        assert_eq!(
            BufferedSheetReader::count_rows(
                br#"<worksheet><sheetData/></worksheet>"#
            )
            .unwrap(),
            0
        );
        assert_eq!(
            BufferedSheetReader::count_rows(&sheet(r#"<row r="1"/><row r="2"/>"#)).unwrap(),
            2
        );
    }

    #[test]
    fn test_count_rows_is_independent_of_decoding() {
        let xml = sheet(THREE_ROWS);
        let count = BufferedSheetReader::count_rows(&xml).unwrap();

        // 数えた後でも同じバイト列から新しいデコーダを構築できる
        let mut reader = BufferedSheetReader::new(xml, empty_table());
        reader.set_batch_size(0);
        assert_eq!(reader.next_batch().unwrap().len() as u32, count);
    }

    #[test]
    fn test_truncated_sheet_is_malformed() {
        let xml = br#"<worksheet><sheetData><row r="1"><c r="A1"><v>1</v>"#.to_vec();
        let mut reader = BufferedSheetReader::new(xml, empty_table());

        assert!(reader.next_batch().is_err());
    }
}

//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// xlsxpullクレート全体で使用するエラー型
///
/// ワークブックのオープン、シート選択、ストリーミングデコードの各段階で
/// 発生するエラーを統一的に扱います。
///
/// # エラーの分類
///
/// - オープン/選択時のエラー（`Io`、`Zip`、`InvalidFormat`、`NotFound`）は
///   その操作に対して終端的であり、呼び出し元へそのまま伝播されます。
/// - デコード中のエラー（`MalformedDocument`、`OutOfRange`）は通常の
///   ストリーム終端とは明確に区別されます。「行がもうない」ことはエラー
///   ではなく、空のバッチとして返されます。
/// - `ClosedResource`はクローズ後の操作に対して返され、古いデータが
///   返ることはありません。
#[derive(Error, Debug)]
pub enum XlsxPullError {
    /// I/O操作中に発生したエラー
    ///
    /// ファイルが存在しないパスを開いた場合もこのバリアント
    /// （`std::io::ErrorKind::NotFound`）として表面化します。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIPアーカイブの読み込みエラー
    ///
    /// コンテナ自体が開けない、またはパートの展開に失敗した場合に
    /// 発生します。
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// ドキュメント形式のエラー
    ///
    /// コンテナ構成、ワークブックXML、共有文字列XMLが解析できない場合に
    /// 発生します。構築時に検出された場合はコンストラクタが即座に失敗し、
    /// 不完全な状態で処理を継続することはありません。
    #[error("Invalid document format: {0}")]
    InvalidFormat(String),

    /// ストリーミングデコード中に検出された構造違反
    ///
    /// 行・セルXMLが期待される構造に従わない場合（座標が解析できない、
    /// 値の型タグと内容が一致しない、XMLが途中で途切れているなど）に
    /// 発生します。
    #[error("Malformed document at {context}: {message}")]
    MalformedDocument {
        /// エラーが検出された位置（セル参照、行番号など）
        context: String,
        /// エラーの詳細メッセージ
        message: String,
    },

    /// 共有文字列インデックスがテーブル範囲外
    ///
    /// セルが参照するインデックスがテーブルサイズ以上の場合に発生します。
    /// 範囲外の参照はデータ破損であり、誤った文字列が返ることはありません。
    #[error("Shared string index {index} out of range (table size: {len})")]
    OutOfRange {
        /// セルが参照したインデックス
        index: usize,
        /// 共有文字列テーブルのサイズ
        len: usize,
    },

    /// クローズ済みリソースへの操作
    ///
    /// `close()`の後に`next_batch()`や`has_next()`を呼び出した場合に
    /// 発生します。
    #[error("Operation attempted on a closed reader")]
    ClosedResource,

    /// シート名が見つからないエラー
    ///
    /// `select_sheet()`に未知のシート名が渡された場合に発生します。
    /// 選択は失敗し、直前に選択されていたシートの状態は維持されます。
    #[error("Sheet not found: {0}")]
    NotFound(String),

    /// UTF-8文字列の変換エラー
    ///
    /// XML解析時にUTF-8文字列への変換に失敗した場合に発生します。
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// 数値の解析エラー
    ///
    /// マニフェストや共有文字列XMLの属性値を数値へ変換できなかった場合に
    /// 発生します。
    #[error("Number parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb、パストラバーサル、ファイルサイズ制限などの制限違反で
    /// 発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

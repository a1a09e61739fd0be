//! Package Module
//!
//! ZIPコンテナ（OPCパッケージ）へのアクセスを提供するモジュール。
//! 名前付きパートを展開してバイト列として取り出す、コンテナ側の
//! コラボレータです。XMLの解釈は一切行いません。

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::error::XlsxPullError;
use crate::security::{validate_zip_path, SecurityConfig};

/// ワークブックマニフェストのパート名
pub(crate) const WORKBOOK_PART: &str = "xl/workbook.xml";

/// ワークブックリレーションシップのパート名
pub(crate) const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

/// 共有文字列テーブルのパート名
pub(crate) const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// 読み取り専用のXLSXコンテナ
///
/// オープン時にアーカイブ全体へセキュリティチェック（パート数、パス、
/// 展開後サイズ）を適用します。各パートは`part_bytes`で一括展開され、
/// 呼び出し元が独立したカーソルを所有できる形で返されます。
pub(crate) struct XlsxPackage<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl XlsxPackage<BufReader<File>> {
    /// パスを指定してコンテナを開く
    ///
    /// # 引数
    ///
    /// * `path` - XLSXファイルのパス
    ///
    /// # 戻り値
    ///
    /// * `Ok(XlsxPackage)` - コンテナのオープンに成功した場合
    /// * `Err(XlsxPullError::Io)` - パスが解決できない場合
    /// * `Err(XlsxPullError::Zip)` - ZIPアーカイブとして読めない場合
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, XlsxPullError> {
        let file = File::open(path.as_ref())?;

        let file_size = file.metadata()?.len();
        let config = SecurityConfig::default();
        if file_size > config.max_input_file_size {
            return Err(XlsxPullError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                file_size, config.max_input_file_size
            )));
        }

        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> XlsxPackage<R> {
    /// 任意の`Read + Seek`ソースからコンテナを開く
    ///
    /// メモリ上のバッファ（`Cursor<Vec<u8>>`など）からのオープンに
    /// 使用します。アーカイブ全体のセキュリティチェックをここで行います。
    pub fn from_reader(reader: R) -> Result<Self, XlsxPullError> {
        let config = SecurityConfig::default();

        let mut archive =
            ZipArchive::new(reader).map_err(|e| XlsxPullError::Zip(format!("{}", e)))?;

        if archive.len() > config.max_part_count {
            return Err(XlsxPullError::SecurityViolation(format!(
                "ZIP archive contains too many parts: {} (max: {})",
                archive.len(),
                config.max_part_count
            )));
        }

        // 各パートのパス検証とサイズチェック
        let mut total_decompressed_size = 0u64;
        for i in 0..archive.len() {
            let part = archive
                .by_index(i)
                .map_err(|e| XlsxPullError::Zip(format!("{}", e)))?;

            let part_name = part.name();
            validate_zip_path(part_name)
                .map_err(|e| XlsxPullError::SecurityViolation(format!("Invalid ZIP path: {}", e)))?;

            let part_size = part.size();
            if part_size > config.max_part_size {
                return Err(XlsxPullError::SecurityViolation(format!(
                    "Part '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                    part_name, part_size, config.max_part_size
                )));
            }

            total_decompressed_size = total_decompressed_size
                .checked_add(part_size)
                .ok_or_else(|| {
                    XlsxPullError::SecurityViolation(
                        "Total decompressed size calculation overflow".to_string(),
                    )
                })?;

            if total_decompressed_size > config.max_decompressed_size {
                return Err(XlsxPullError::SecurityViolation(format!(
                    "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                    total_decompressed_size, config.max_decompressed_size
                )));
            }
        }

        Ok(Self { archive })
    }

    /// 指定した名前のパートが存在するかを判定
    pub fn has_part(&mut self, name: &str) -> bool {
        self.archive.by_name(name).is_ok()
    }

    /// パートを展開してバイト列として取得
    ///
    /// # 引数
    ///
    /// * `name` - パート名（例: "xl/worksheets/sheet1.xml"）
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<u8>)` - 展開されたパートの内容
    /// * `Err(XlsxPullError::Zip)` - パートが存在しない、または展開に失敗した場合
    pub fn part_bytes(&mut self, name: &str) -> Result<Vec<u8>, XlsxPullError> {
        let mut part = self
            .archive
            .by_name(name)
            .map_err(|e| XlsxPullError::Zip(format!("part '{}': {}", name, e)))?;

        let mut bytes = Vec::with_capacity(part.size() as usize);
        part.read_to_end(&mut bytes)?;

        log::debug!("inflated part '{}' ({} bytes)", name, bytes.len());
        Ok(bytes)
    }
}

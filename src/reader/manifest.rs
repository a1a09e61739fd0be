//! Workbook Manifest Module
//!
//! `xl/workbook.xml`とそのリレーションシップを1パスで走査し、
//! シート名からパートパスへの対応表を構築するモジュール。

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::XlsxPullError;

/// シート名 → リレーションシップID → パートパスの対応表
///
/// ドキュメントのオープン時に一度だけ構築され、以後は読み取り専用です。
/// 解析に失敗した場合はオープン自体が`InvalidFormat`で失敗します。
/// 不完全なマニフェストを抱えたまま処理を継続することはありません。
#[derive(Debug)]
pub(crate) struct WorkbookManifest {
    /// (シート名, リレーションシップID) のペア（ドキュメント内の出現順）
    sheets: Vec<(String, String)>,
    /// リレーションシップID → 正規化済みパートパス
    targets: HashMap<String, String>,
}

impl WorkbookManifest {
    /// ワークブックXMLとリレーションシップXMLから対応表を構築
    ///
    /// # 引数
    ///
    /// * `workbook_xml` - `xl/workbook.xml`の展開済みバイト列
    /// * `rels_xml` - `xl/_rels/workbook.xml.rels`の展開済みバイト列
    pub fn parse(workbook_xml: &[u8], rels_xml: &[u8]) -> Result<Self, XlsxPullError> {
        let sheets = Self::parse_sheets(workbook_xml)?;
        let targets = Self::parse_relationships(rels_xml)?;
        Ok(Self { sheets, targets })
    }

    /// すべてのシート名を取得（ドキュメント内の出現順）
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    /// シート名をリレーションシップIDに解決
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.sheets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, rid)| rid.as_str())
    }

    /// シート名をパートパスに解決
    ///
    /// # 戻り値
    ///
    /// * `Ok(String)` - 正規化済みのパートパス（例: "xl/worksheets/sheet1.xml"）
    /// * `Err(XlsxPullError::NotFound)` - シート名が存在しない場合
    /// * `Err(XlsxPullError::InvalidFormat)` - リレーションシップが欠落している場合
    pub fn sheet_part_path(&self, name: &str) -> Result<String, XlsxPullError> {
        let rid = self
            .lookup(name)
            .ok_or_else(|| XlsxPullError::NotFound(name.to_string()))?;

        self.targets.get(rid).cloned().ok_or_else(|| {
            XlsxPullError::InvalidFormat(format!(
                "relationship '{}' for sheet '{}' has no target",
                rid, name
            ))
        })
    }

    /// `<sheet name=".." r:id=".."/>`要素の走査
    fn parse_sheets(xml: &[u8]) -> Result<Vec<(String, String)>, XlsxPullError> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets: Vec<(String, String)> = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                // <sheet>は通常自己終了タグ
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    if e.name().as_ref() == b"sheet" {
                        let mut name = None;
                        let mut rid = None;

                        for attr in e.attributes() {
                            let attr = attr.map_err(|e| {
                                XlsxPullError::InvalidFormat(format!(
                                    "workbook attribute error: {}",
                                    e
                                ))
                            })?;
                            match attr.key.as_ref() {
                                b"name" => {
                                    name = Some(std::str::from_utf8(&attr.value)?.to_string());
                                }
                                b"r:id" => {
                                    rid = Some(std::str::from_utf8(&attr.value)?.to_string());
                                }
                                _ => {}
                            }
                        }

                        match (name, rid) {
                            (Some(name), Some(rid)) => {
                                if sheets.iter().any(|(n, _)| *n == name) {
                                    log::warn!("duplicate sheet name '{}', keeping first", name);
                                } else {
                                    sheets.push((name, rid));
                                }
                            }
                            (Some(name), None) => {
                                return Err(XlsxPullError::InvalidFormat(format!(
                                    "sheet '{}' has no relationship id",
                                    name
                                )));
                            }
                            _ => {
                                return Err(XlsxPullError::InvalidFormat(
                                    "sheet element without a name".to_string(),
                                ));
                            }
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(XlsxPullError::InvalidFormat(format!(
                        "workbook parse error: {}",
                        e
                    )))
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(sheets)
    }

    /// `<Relationship Id=".." Target=".."/>`要素の走査
    fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, XlsxPullError> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut targets = HashMap::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    if e.name().as_ref() == b"Relationship" {
                        let mut id = None;
                        let mut target = None;

                        for attr in e.attributes() {
                            let attr = attr.map_err(|e| {
                                XlsxPullError::InvalidFormat(format!(
                                    "relationship attribute error: {}",
                                    e
                                ))
                            })?;
                            match attr.key.as_ref() {
                                b"Id" => {
                                    id = Some(std::str::from_utf8(&attr.value)?.to_string());
                                }
                                b"Target" => {
                                    target = Some(std::str::from_utf8(&attr.value)?.to_string());
                                }
                                _ => {}
                            }
                        }

                        if let (Some(id), Some(target)) = (id, target) {
                            targets.insert(id, Self::normalize_target(&target));
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(XlsxPullError::InvalidFormat(format!(
                        "relationships parse error: {}",
                        e
                    )))
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(targets)
    }

    /// リレーションシップのターゲットをパッケージルート基準のパスに正規化
    ///
    /// ターゲットは通常`xl/`からの相対パス（"worksheets/sheet1.xml"）ですが、
    /// パッケージルートからの絶対パス（"/xl/worksheets/sheet1.xml"）の
    /// 形式も許容されます。
    fn normalize_target(target: &str) -> String {
        if let Some(absolute) = target.strip_prefix('/') {
            absolute.to_string()
        } else {
            format!("xl/{}", target)
        }
    }
}

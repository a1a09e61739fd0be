//! Shared String Table Module
//!
//! `xl/sharedStrings.xml`をドキュメントごとに一度だけ解析し、
//! インデックス参照で解決できる不変の文字列テーブルを構築するモジュール。

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::XlsxPullError;

/// 共有文字列テーブル
///
/// セルの`t="s"`参照をインデックスで解決するための順序付き文字列リスト。
/// 構築後は読み取り専用で、シートを切り替えても再構築されません。
/// リッチテキスト（`<r>`ラン）は書式を捨ててプレーンテキストに連結されます。
#[derive(Debug, Default)]
pub struct SharedStringTable {
    strings: Vec<String>,
}

impl SharedStringTable {
    /// 空のテーブルを生成
    ///
    /// 共有文字列パートを持たないワークブック（文字列セルが1つもない
    /// ドキュメント）で使用されます。
    pub fn empty() -> Self {
        Self::default()
    }

    /// `xl/sharedStrings.xml`の内容からテーブルを構築
    ///
    /// # 引数
    ///
    /// * `xml` - 共有文字列パートの展開済みバイト列
    ///
    /// # 戻り値
    ///
    /// * `Ok(SharedStringTable)` - 解析に成功した場合
    /// * `Err(XlsxPullError::InvalidFormat)` - XMLが解析できない場合
    pub fn parse(xml: &[u8]) -> Result<Self, XlsxPullError> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut strings = Vec::new();
        let mut in_si = false;
        let mut in_t = false;
        let mut in_rph = false;
        let mut current = String::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current.clear();
                    }
                    // ふりがなラン内のテキストは本文に含めない
                    b"rPh" if in_si => {
                        in_rph = true;
                    }
                    b"t" if in_si && !in_rph => {
                        in_t = true;
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    if in_t {
                        let text = e.unescape().map_err(|e| {
                            XlsxPullError::InvalidFormat(format!(
                                "shared strings text error: {}",
                                e
                            ))
                        })?;
                        current.push_str(&text);
                    }
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    // 空の<si>もインデックスを1つ消費する
                    b"si" => {
                        strings.push(std::mem::take(&mut current));
                        in_si = false;
                    }
                    b"rPh" => {
                        in_rph = false;
                    }
                    b"t" => {
                        in_t = false;
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(XlsxPullError::InvalidFormat(format!(
                        "shared strings parse error: {}",
                        e
                    )))
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(Self { strings })
    }

    /// インデックスを文字列に解決
    ///
    /// # 引数
    ///
    /// * `index` - セルが参照する共有文字列インデックス
    ///
    /// # 戻り値
    ///
    /// * `Ok(&str)` - 参照先の文字列
    /// * `Err(XlsxPullError::OutOfRange)` - インデックスがテーブルサイズ以上の場合
    pub fn resolve(&self, index: usize) -> Result<&str, XlsxPullError> {
        self.strings
            .get(index)
            .map(|s| s.as_str())
            .ok_or(XlsxPullError::OutOfRange {
                index,
                len: self.strings.len(),
            })
    }

    /// テーブル内の文字列数
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// テーブルが空かどうかを判定
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

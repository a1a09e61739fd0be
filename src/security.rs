//! Security Module
//!
//! コンテナ読み込み時のセキュリティ対策を実装するモジュール。
//! ZIP bomb攻撃やパストラバーサル攻撃への対策を提供します。

/// セキュリティ設定
///
/// コンテナを開く際に適用される制限を定義します。
#[derive(Debug, Clone)]
pub(crate) struct SecurityConfig {
    /// 展開後の最大サイズ（バイト）
    /// デフォルト: 1GB (1_073_741_824 bytes)
    pub max_decompressed_size: u64,
    /// ZIPアーカイブ内の最大パート数
    /// デフォルト: 10000
    pub max_part_count: usize,
    /// 単一パートの最大サイズ（バイト）
    /// デフォルト: 100MB (104_857_600 bytes)
    pub max_part_size: u64,
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 2GB (2_147_483_648 bytes)
    pub max_input_file_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_decompressed_size: 1_073_741_824, // 1GB
            max_part_count: 10_000,
            max_part_size: 104_857_600,         // 100MB
            max_input_file_size: 2_147_483_648, // 2GB
        }
    }
}

/// パートパスの検証
///
/// パストラバーサル攻撃を防ぐため、アーカイブ内のパス名を検証します。
///
/// # 引数
///
/// * `path` - 検証するパートのパス
///
/// # 戻り値
///
/// * `Ok(())` - パスが安全な場合
/// * `Err(String)` - パスが危険な場合（`..`や絶対パスを含む）
pub(crate) fn validate_zip_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("Empty path is not allowed".to_string());
    }

    // 絶対パス（Unix形式の`/`、Windows形式のドライブレター）を拒否
    if path.starts_with('/') || (path.len() >= 3 && path.as_bytes()[1] == b':') {
        return Err(format!("Absolute path is not allowed: {}", path));
    }

    // ディレクトリトラバーサルを拒否
    if path.contains("..") {
        return Err(format!("Path traversal detected: {}", path));
    }

    // Windows形式のパスセパレータを拒否
    if path.contains('\\') {
        return Err(format!("Backslash in path is not allowed: {}", path));
    }

    Ok(())
}

#[cfg(feature = "esp")]
pub mod nvs;

// Mock実装（テストとnon-espビルドで使用可能）
#[cfg(not(feature = "esp"))]
pub mod mock;

/// 不揮発ストレージ操作の結果の型
pub type StorageResult<T> = Result<T, StorageError>;

/// 不揮発ストレージのエラーを表す列挙型
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    /// 読み取りエラー
    #[error("storage read error at {address:#06x}: {message}")]
    Read { address: u16, message: String },
    /// 書き込みエラー
    #[error("storage write error at {address:#06x}: {message}")]
    Write { address: u16, message: String },
    /// コミットエラー
    #[error("storage commit error: {0}")]
    Commit(String),
    /// ストレージが使用できない
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// K値を保存する不揮発ストレージのトレイト
///
/// アドレスをキーとしてf32を読み書きします。
/// このトレイトを実装することで、実機用(NVS)とテスト用(Mock)の
/// 実装を切り替えることができます。
pub trait CoefficientStorage {
    /// 指定アドレスのf32を読み取る（未書き込みの場合は0.0）
    fn read_f32(&mut self, address: u16) -> StorageResult<f32>;

    /// 指定アドレスにf32を書き込む
    fn write_f32(&mut self, address: u16, value: f32) -> StorageResult<()>;

    /// 書き込みを確定する
    fn commit(&mut self) -> StorageResult<()>;
}

/// 未初期化のストレージ値かどうか
///
/// 新品のEEPROMは0、消去済みフラッシュは0xFFFFFFFF(NaN)として読める。
pub fn is_uninitialized(value: f32) -> bool {
    value == 0.0 || value.is_nan()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_uninitialized() {
        assert!(is_uninitialized(0.0));
        assert!(is_uninitialized(-0.0));
        assert!(is_uninitialized(f32::from_bits(0xFFFF_FFFF)));
        assert!(!is_uninitialized(1.0));
        assert!(!is_uninitialized(0.98));
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Write {
            address: 0x0A,
            message: "full".to_string(),
        };
        assert_eq!(err.to_string(), "storage write error at 0x000a: full");
    }
}

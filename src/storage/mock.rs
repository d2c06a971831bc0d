use super::{CoefficientStorage, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// テスト用のEEPROMモック実装
///
/// 実際の不揮発メモリを使わずにK値の保存をシミュレートします。
/// クローンは同じ内容を共有するため、プローブに渡した後もテストから検証できます。
#[derive(Debug, Clone, Default)]
pub struct MockEeprom {
    /// コミット済みの値
    pub committed: Arc<Mutex<HashMap<u16, f32>>>,
    /// 未コミットの書き込み
    pub pending: Arc<Mutex<HashMap<u16, f32>>>,
    /// 書き込みの記録（アドレス, 値）
    pub write_log: Arc<Mutex<Vec<(u16, f32)>>>,
    /// コミット回数
    pub commit_count: Arc<Mutex<usize>>,
    /// エラーシミュレーション用のフラグ
    pub simulate_read_error: Arc<Mutex<bool>>,
    pub simulate_write_error: Arc<Mutex<bool>>,
    pub simulate_commit_error: Arc<Mutex<bool>>,
}

impl MockEeprom {
    /// 新しい空のMockEepromを作成します
    pub fn new() -> Self {
        Self::default()
    }

    /// テスト用: コミット済みの値を直接設定
    pub fn preload(&self, address: u16, value: f32) {
        self.committed.lock().unwrap().insert(address, value);
    }

    /// テスト用: コミット済みの値を取得
    pub fn committed_value(&self, address: u16) -> Option<f32> {
        self.committed.lock().unwrap().get(&address).copied()
    }

    /// テスト用: 書き込み記録を取得
    pub fn get_writes(&self) -> Vec<(u16, f32)> {
        self.write_log.lock().unwrap().clone()
    }

    /// テスト用: 書き込み記録をクリア
    pub fn clear_writes(&self) {
        self.write_log.lock().unwrap().clear();
    }

    /// テスト用: コミット回数を取得
    pub fn get_commit_count(&self) -> usize {
        *self.commit_count.lock().unwrap()
    }

    /// テスト用: 読み取りエラーをシミュレート
    pub fn set_read_error(&self, enable: bool) {
        *self.simulate_read_error.lock().unwrap() = enable;
    }

    /// テスト用: 書き込みエラーをシミュレート
    pub fn set_write_error(&self, enable: bool) {
        *self.simulate_write_error.lock().unwrap() = enable;
    }

    /// テスト用: コミットエラーをシミュレート
    pub fn set_commit_error(&self, enable: bool) {
        *self.simulate_commit_error.lock().unwrap() = enable;
    }
}

impl CoefficientStorage for MockEeprom {
    fn read_f32(&mut self, address: u16) -> StorageResult<f32> {
        if *self.simulate_read_error.lock().unwrap() {
            return Err(StorageError::Read {
                address,
                message: "Simulated read error".to_string(),
            });
        }

        // 未コミットの値もEEPROMのRAMキャッシュ上では読める
        if let Some(value) = self.pending.lock().unwrap().get(&address) {
            return Ok(*value);
        }
        Ok(self.committed_value(address).unwrap_or(0.0))
    }

    fn write_f32(&mut self, address: u16, value: f32) -> StorageResult<()> {
        if *self.simulate_write_error.lock().unwrap() {
            return Err(StorageError::Write {
                address,
                message: "Simulated write error".to_string(),
            });
        }

        self.pending.lock().unwrap().insert(address, value);
        self.write_log.lock().unwrap().push((address, value));
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        if *self.simulate_commit_error.lock().unwrap() {
            return Err(StorageError::Commit("Simulated commit error".to_string()));
        }

        let mut pending = self.pending.lock().unwrap();
        self.committed.lock().unwrap().extend(pending.drain());
        *self.commit_count.lock().unwrap() += 1;
        Ok(())
    }
}

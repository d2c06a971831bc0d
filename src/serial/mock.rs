use super::{SerialInput, StatusOutput};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// テスト用のシリアルポートモック実装
///
/// 受信バイトのキューと手動で進めるクロックを持ち、
/// 出力されたステータス行を記録します。
#[derive(Debug, Clone, Default)]
pub struct MockSerial {
    /// 読み取り用のバイトキュー（先頭から取り出される）
    pub rx_queue: Arc<Mutex<VecDeque<u8>>>,
    /// 出力されたステータス行の記録
    pub printed_lines: Arc<Mutex<Vec<String>>>,
    /// 現在時刻（ミリ秒）
    pub now_ms: Arc<Mutex<u32>>,
}

impl MockSerial {
    /// 新しいMockSerialインスタンスを作成します
    pub fn new() -> Self {
        Self::default()
    }

    /// テスト用: 受信データをキューに追加
    pub fn queue_input(&self, data: &str) {
        self.rx_queue.lock().unwrap().extend(data.bytes());
    }

    /// テスト用: クロックを進める
    pub fn advance_ms(&self, ms: u32) {
        let mut now = self.now_ms.lock().unwrap();
        *now = now.wrapping_add(ms);
    }

    /// テスト用: 出力された行を取得
    pub fn get_printed_lines(&self) -> Vec<String> {
        self.printed_lines.lock().unwrap().clone()
    }

    /// テスト用: 出力された行のどれかが`needle`を含むか
    pub fn printed_contains(&self, needle: &str) -> bool {
        self.printed_lines
            .lock()
            .unwrap()
            .iter()
            .any(|line| line.contains(needle))
    }

    /// テスト用: 出力記録をクリア
    pub fn clear_printed(&self) {
        self.printed_lines.lock().unwrap().clear();
    }
}

impl SerialInput for MockSerial {
    fn read_byte(&mut self) -> Option<u8> {
        self.rx_queue.lock().unwrap().pop_front()
    }

    fn millis(&self) -> u32 {
        *self.now_ms.lock().unwrap()
    }
}

impl StatusOutput for MockSerial {
    fn print_line(&mut self, line: &str) {
        self.printed_lines.lock().unwrap().push(line.to_string());
    }
}

#[cfg(feature = "esp")]
pub mod usb;

// Mock実装（テストとnon-espビルドで使用可能）
#[cfg(not(feature = "esp"))]
pub mod mock;

pub mod line_reader;

pub use line_reader::{LineReader, COMMAND_BUFFER_LENGTH};

/// シリアル入力のトレイト
///
/// 受信済みバイトのノンブロッキング読み取りと、単調増加のミリ秒クロックを提供します。
pub trait SerialInput {
    /// 受信済みのバイトを1つ読み取る（無ければNone）
    fn read_byte(&mut self) -> Option<u8>;

    /// 起動からの経過時間（ミリ秒、ラップアラウンドあり）
    fn millis(&self) -> u32;
}

/// ステータスメッセージの出力先
///
/// 人が読むためのメッセージ専用で、機械的な解析は想定しません。
pub trait StatusOutput {
    fn print_line(&mut self, line: &str);
}

/// 入出力の両方を持つシリアルポート
pub trait SerialPort: SerialInput + StatusOutput {}

impl<T: SerialInput + StatusOutput> SerialPort for T {}

/// 出力を蓄積するシンク
impl StatusOutput for Vec<String> {
    fn print_line(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

use heapless::Vec;
use log::{debug, trace};

use super::SerialInput;

/// コマンド受信バッファの長さ（終端用の1バイトを含む）
pub const COMMAND_BUFFER_LENGTH: usize = 10;

/// シリアルから1行分のコマンドを組み立てる
///
/// - 改行を受信するか、バッファが満杯（`COMMAND_BUFFER_LENGTH - 1`バイト）に
///   なった時点で1行とみなす。満杯時に受信したバイトは捨てられる。
/// - 前回の受信から`timeout_ms`を超えて間が空いた場合、途中までの行を破棄する。
/// - 完成した行は大文字に変換して返す。
#[derive(Debug)]
pub struct LineReader {
    buffer: Vec<u8, COMMAND_BUFFER_LENGTH>,
    timeout_ms: u32,
    last_byte_ms: Option<u32>,
}

impl LineReader {
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            buffer: Vec::new(),
            timeout_ms,
            last_byte_ms: None,
        }
    }

    /// 受信済みのバイトを読み切り、行が完成したら返す
    ///
    /// 行が完成した時点で読み取りを止め、残りのバイトは次回の呼び出しで処理する。
    pub fn poll<S: SerialInput + ?Sized>(&mut self, input: &mut S) -> Option<String> {
        while let Some(byte) = input.read_byte() {
            let now = input.millis();
            if let Some(last) = self.last_byte_ms {
                if now.wrapping_sub(last) > self.timeout_ms {
                    if !self.buffer.is_empty() {
                        debug!(
                            "Command receive timeout, discarding {} bytes",
                            self.buffer.len()
                        );
                    }
                    self.buffer.clear();
                }
            }
            self.last_byte_ms = Some(now);

            if byte == b'\n' || self.buffer.len() == COMMAND_BUFFER_LENGTH - 1 {
                return Some(self.take_line());
            }

            // 満杯になる前に行を確定しているため、pushは失敗しない
            let pushed = self.buffer.push(byte).is_ok();
            debug_assert!(pushed, "command buffer overflow");
            trace!("Buffered byte 0x{:02x} ({} bytes)", byte, self.buffer.len());
        }
        None
    }

    /// 組み立て途中の行を破棄する
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last_byte_ms = None;
    }

    /// 組み立て途中のバイト数
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.buffer).to_ascii_uppercase();
        self.buffer.clear();
        debug!("Command line received: '{}'", line);
        line
    }
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new(500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// バイト列と受信時刻を順に返す簡易入力
    struct ScriptedInput {
        bytes: std::collections::VecDeque<(u8, u32)>,
        now: u32,
    }

    impl ScriptedInput {
        fn new() -> Self {
            Self {
                bytes: Default::default(),
                now: 0,
            }
        }

        fn push_str(&mut self, s: &str, at_ms: u32) {
            for b in s.bytes() {
                self.bytes.push_back((b, at_ms));
            }
        }
    }

    impl SerialInput for ScriptedInput {
        fn read_byte(&mut self) -> Option<u8> {
            let (byte, at) = self.bytes.pop_front()?;
            self.now = at;
            Some(byte)
        }

        fn millis(&self) -> u32 {
            self.now
        }
    }

    #[test]
    fn test_line_terminated_by_newline() {
        let mut input = ScriptedInput::new();
        input.push_str("calec\n", 10);
        let mut reader = LineReader::new(500);

        assert_eq!(reader.poll(&mut input), Some("CALEC".to_string()));
        assert_eq!(reader.pending_len(), 0);
    }

    #[test]
    fn test_no_line_without_terminator() {
        let mut input = ScriptedInput::new();
        input.push_str("ENTER", 10);
        let mut reader = LineReader::new(500);

        assert_eq!(reader.poll(&mut input), None);
        assert_eq!(reader.pending_len(), 5);

        input.push_str("EC\n", 20);
        assert_eq!(reader.poll(&mut input), Some("ENTEREC".to_string()));
    }

    #[test]
    fn test_line_terminated_by_full_buffer() {
        let mut input = ScriptedInput::new();
        input.push_str("ABCDEFGHIJK", 10);
        let mut reader = LineReader::new(500);

        // 9バイトで満杯、10バイト目('J')は捨てられる
        assert_eq!(reader.poll(&mut input), Some("ABCDEFGHI".to_string()));
        assert_eq!(reader.poll(&mut input), None);
        assert_eq!(reader.pending_len(), 1);
    }

    #[test]
    fn test_long_input_never_overflows_buffer() {
        let mut input = ScriptedInput::new();
        input.push_str("ABCDEFGHIJABCDEFGHIJABCDEFGHIJ", 10);
        let mut reader = LineReader::new(500);

        let mut lines = 0;
        while let Some(line) = reader.poll(&mut input) {
            assert_eq!(line, "ABCDEFGHI");
            assert!(reader.pending_len() < COMMAND_BUFFER_LENGTH);
            lines += 1;
        }
        assert_eq!(lines, 3);
        assert_eq!(reader.pending_len(), 0);
    }

    #[test]
    fn test_timeout_discards_partial_line() {
        let mut input = ScriptedInput::new();
        input.push_str("GARB", 100);
        input.push_str("EXITEC\n", 700);
        let mut reader = LineReader::new(500);

        assert_eq!(reader.poll(&mut input), Some("EXITEC".to_string()));
    }

    #[test]
    fn test_gap_within_timeout_keeps_partial_line() {
        let mut input = ScriptedInput::new();
        input.push_str("CAL", 100);
        input.push_str("EC\n", 600);
        let mut reader = LineReader::new(500);

        assert_eq!(reader.poll(&mut input), Some("CALEC".to_string()));
    }

    #[test]
    fn test_timeout_handles_clock_wraparound() {
        let mut input = ScriptedInput::new();
        input.push_str("CAL", u32::MAX - 10);
        input.push_str("EC\n", 20);
        let mut reader = LineReader::new(500);

        assert_eq!(reader.poll(&mut input), Some("CALEC".to_string()));
    }

    #[test]
    fn test_stops_after_first_line() {
        let mut input = ScriptedInput::new();
        input.push_str("ENTEREC\nCALEC\n", 10);
        let mut reader = LineReader::new(500);

        assert_eq!(reader.poll(&mut input), Some("ENTEREC".to_string()));
        assert_eq!(reader.poll(&mut input), Some("CALEC".to_string()));
        assert_eq!(reader.poll(&mut input), None);
    }

    #[test]
    fn test_reset() {
        let mut input = ScriptedInput::new();
        input.push_str("ENT", 10);
        let mut reader = LineReader::new(500);
        reader.poll(&mut input);
        reader.reset();
        assert_eq!(reader.pending_len(), 0);
    }
}

//! キャリブレーションコマンド解析機能

use log::{debug, warn};

/// キャリブレーションモードに入るコマンド
pub const CMD_ENTER: &str = "ENTEREC";
/// 標準液でK値を計算するコマンド
pub const CMD_CALIBRATE: &str = "CALEC";
/// K値を保存してキャリブレーションモードを抜けるコマンド
pub const CMD_EXIT: &str = "EXITEC";

/// 解析されたコマンド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// キャリブレーションモード開始
    Enter,
    /// 標準液の測定とK値計算
    Calibrate,
    /// K値を保存して終了
    Exit,
    /// 認識できないコマンド
    Unknown,
}

/// コマンド文字列を解析します
///
/// 大文字小文字を区別せず、文字列中に含まれるキーワードで判定します。
/// 判定順は `ENTEREC` → `EXITEC` → `CALEC` です。
///
/// # 引数
/// * `command_str` - 解析するコマンド文字列
///
/// # 戻り値
/// * `Command` - 解析されたコマンド（該当なしは`Command::Unknown`）
pub fn parse_command(command_str: &str) -> Command {
    let upper = command_str.to_ascii_uppercase();
    debug!("Parsing command: '{}'", upper.trim());

    if upper.contains(CMD_ENTER) {
        Command::Enter
    } else if upper.contains(CMD_EXIT) {
        Command::Exit
    } else if upper.contains(CMD_CALIBRATE) {
        Command::Calibrate
    } else {
        warn!("Unknown command format: '{}'", upper.trim());
        Command::Unknown
    }
}

/*!
 * # EC Probe
 *
 * アナログEC(電気伝導度)プローブのドライバ
 *
 * 電圧と水温からEC値を計算し、シリアルコマンドによる2点校正と
 * K値の不揮発ストレージへの保存をサポートします。
 *
 * ## モジュール構成
 * - `converter`: 電圧→EC変換、温度補正、K値の自動レンジ切替
 * - `calibration`: キャリブレーションのステートマシンと標準液判定
 * - `command`: コマンド文字列の解析
 * - `serial`: コマンド行の受信とステータス出力
 * - `storage`: K値の保存先
 * - `probe`: 上記をまとめたエントリポイント
 */

pub mod calibration;
pub mod command;
pub mod config;
pub mod converter;
pub mod probe;
pub mod serial;
pub mod storage;

pub use calibration::{BufferSolution, CalibrationMode, CalibrationOutcome};
pub use command::{parse_command, Command};
pub use config::{ConfigError, ProbeConfig};
pub use converter::{EcConverter, KValues};
pub use probe::EcProbe;
pub use serial::{LineReader, SerialInput, SerialPort, StatusOutput};
pub use storage::{CoefficientStorage, StorageError, StorageResult};

/// ライブラリのバージョン情報
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

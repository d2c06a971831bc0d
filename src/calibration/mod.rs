//! キャリブレーション制御
//!
//! シリアルコマンドで駆動される2点校正のステートマシンです。
//!
//! - `ENTEREC`: キャリブレーションモードに入る
//! - `CALEC`: 直前の測定値から標準液を判定し、K値を計算して仮設定する
//! - `EXITEC`: 仮設定したK値を保存してモードを抜ける
//!
//! 失敗はステータス出力と`pending_success`フラグでのみ通知し、呼び出し側には
//! エラーを返しません。

pub mod solution;

use log::{error, info, warn};

use crate::command::Command;
use crate::config::ProbeConfig;
use crate::converter::EcConverter;
use crate::serial::StatusOutput;
use crate::storage::{CoefficientStorage, StorageError};

pub use solution::{solve_k_value, BufferSolution};

/// ステータスメッセージ
pub mod messages {
    pub const COMMAND_ERROR: &str = ">>>Command Error<<<";
    pub const ENTER_MODE: &str = ">>>Enter EC Calibration Mode<<<";
    pub const PUT_PROBE: &str =
        ">>>Please put the probe into the 1413us/cm or 12.88ms/cm buffer solution<<<";
    pub const BUFFER_SOLUTION_ERROR: &str = ">>>Buffer Solution Error Try Again<<<";
    pub const FAILED_TRY_AGAIN: &str = ">>>Failed,Try Again<<<";
    pub const CALIBRATION_SUCCESSFUL: &str = ">>>Calibration Successful,Exit EC Calibration Mode<<<";
    pub const CALIBRATION_FAILED: &str = ">>>Calibration Failed,Exit EC Calibration Mode<<<";

    pub fn successful_k(k_value: f32) -> String {
        format!(">>>Successful,K:{:.2}, Send EXITEC to Save and Exit<<<", k_value)
    }
}

/// キャリブレーションモード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalibrationMode {
    /// 通常測定中
    #[default]
    Idle,
    /// キャリブレーション中
    Entered,
}

/// コマンド処理の結果
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationOutcome {
    /// キャリブレーションモード外のため無視した
    Ignored,
    /// キャリブレーション中に認識できないコマンドを受信した
    CommandError,
    /// キャリブレーションモードに入った
    Entered,
    /// K値を計算し、仮設定した
    Calibrated {
        solution: BufferSolution,
        k_value: f32,
    },
    /// 生EC値がどの標準液の範囲にも入らなかった
    BufferSolutionError,
    /// 計算したK値が許容範囲外だった
    KValueOutOfRange { k_value: f32 },
    /// K値を保存してモードを抜けた
    Saved {
        solution: BufferSolution,
        k_value: f32,
    },
    /// 校正は成功済みだが、終了時の生EC値がどの範囲にも入らず何も保存しなかった
    SavedNothing,
    /// 成功した校正がないままモードを抜けた
    Failed,
    /// 保存に失敗してモードを抜けた
    StorageFailed(StorageError),
}

/// キャリブレーションの状態
#[derive(Debug, Clone)]
pub struct CalibrationController {
    mode: CalibrationMode,
    pending_success: bool,
    staged: Option<(BufferSolution, f32)>,
    last_voltage: f32,
    last_temperature: f32,
    reference_temp_c: f32,
    temp_coefficient: f32,
    k_value_min: f32,
    k_value_max: f32,
    k_low_address: u16,
    k_high_address: u16,
}

impl CalibrationController {
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            mode: CalibrationMode::Idle,
            pending_success: false,
            staged: None,
            last_voltage: 0.0,
            last_temperature: config.reference_temp_c,
            reference_temp_c: config.reference_temp_c,
            temp_coefficient: config.temp_coefficient,
            k_value_min: config.k_value_min,
            k_value_max: config.k_value_max,
            k_low_address: config.k_value_low_address(),
            k_high_address: config.k_value_high_address(),
        }
    }

    /// キャリブレーションに使う電圧と水温を記録する
    pub fn cache_inputs(&mut self, voltage: f32, temperature_c: f32) {
        self.last_voltage = voltage;
        self.last_temperature = temperature_c;
    }

    /// コマンドを1つ処理する
    ///
    /// # 引数
    /// * `command` - 解析済みコマンド
    /// * `converter` - 直前の生EC値とK値を持つ変換器
    /// * `storage` - K値の保存先
    /// * `out` - ステータスメッセージの出力先
    pub fn handle<S, O>(
        &mut self,
        command: Command,
        converter: &mut EcConverter,
        storage: &mut S,
        out: &mut O,
    ) -> CalibrationOutcome
    where
        S: CoefficientStorage + ?Sized,
        O: StatusOutput + ?Sized,
    {
        match command {
            Command::Enter => self.enter(out),
            _ if self.mode != CalibrationMode::Entered => CalibrationOutcome::Ignored,
            Command::Unknown => {
                out.print_line(messages::COMMAND_ERROR);
                CalibrationOutcome::CommandError
            }
            Command::Calibrate => self.calibrate(converter, out),
            Command::Exit => self.exit(converter, storage, out),
        }
    }

    fn enter<O: StatusOutput + ?Sized>(&mut self, out: &mut O) -> CalibrationOutcome {
        info!("Entering EC calibration mode");
        self.mode = CalibrationMode::Entered;
        self.pending_success = false;
        self.staged = None;
        out.print_line(messages::ENTER_MODE);
        out.print_line(messages::PUT_PROBE);
        CalibrationOutcome::Entered
    }

    fn calibrate<O: StatusOutput + ?Sized>(
        &mut self,
        converter: &mut EcConverter,
        out: &mut O,
    ) -> CalibrationOutcome {
        let raw_ec = converter.raw_ec();
        let Some(solution) = BufferSolution::classify(raw_ec) else {
            warn!("Raw EC {:.3} matches no buffer solution", raw_ec);
            out.print_line(messages::BUFFER_SOLUTION_ERROR);
            self.pending_success = false;
            return CalibrationOutcome::BufferSolutionError;
        };

        let solution_ec =
            solution.compensated_ec(self.last_temperature, self.reference_temp_c, self.temp_coefficient);
        let k_value = solve_k_value(
            converter.r2_ohms(),
            converter.ec_ref(),
            solution_ec,
            self.last_voltage,
        );

        if k_value > self.k_value_min && k_value < self.k_value_max {
            info!(
                "Calibrated {:?} solution: ec={:.3}, voltage={:.2}, k={:.4}",
                solution, solution_ec, self.last_voltage, k_value
            );
            out.print_line(&messages::successful_k(k_value));
            match solution {
                BufferSolution::Low => converter.stage_low(k_value),
                BufferSolution::High => converter.stage_high(k_value),
            }
            self.staged = Some((solution, k_value));
            self.pending_success = true;
            CalibrationOutcome::Calibrated { solution, k_value }
        } else {
            warn!(
                "K value {:.4} out of range ({}, {})",
                k_value, self.k_value_min, self.k_value_max
            );
            out.print_line(messages::FAILED_TRY_AGAIN);
            self.pending_success = false;
            CalibrationOutcome::KValueOutOfRange { k_value }
        }
    }

    fn exit<S, O>(&mut self, converter: &EcConverter, storage: &mut S, out: &mut O) -> CalibrationOutcome
    where
        S: CoefficientStorage + ?Sized,
        O: StatusOutput + ?Sized,
    {
        let outcome = if self.pending_success {
            self.save(converter, storage)
        } else {
            CalibrationOutcome::Failed
        };

        match outcome {
            CalibrationOutcome::Saved { .. } | CalibrationOutcome::SavedNothing => {
                out.print_line(messages::CALIBRATION_SUCCESSFUL)
            }
            _ => out.print_line(messages::CALIBRATION_FAILED),
        }

        info!("Exiting EC calibration mode: {:?}", outcome);
        self.pending_success = false;
        self.staged = None;
        self.mode = CalibrationMode::Idle;
        outcome
    }

    /// 保存先は終了時点の生EC値で改めて判定する
    fn save<S: CoefficientStorage + ?Sized>(
        &self,
        converter: &EcConverter,
        storage: &mut S,
    ) -> CalibrationOutcome {
        let current = BufferSolution::classify(converter.raw_ec());
        if let Some((staged, _)) = self.staged {
            if current != Some(staged) {
                warn!(
                    "Raw EC drifted since CALEC: staged {:?}, now {:?}",
                    staged, current
                );
            }
        }

        let Some(solution) = current else {
            return CalibrationOutcome::SavedNothing;
        };

        let k_values = converter.k_values();
        let (address, k_value) = match solution {
            BufferSolution::Low => (self.k_low_address, k_values.low),
            BufferSolution::High => (self.k_high_address, k_values.high),
        };

        match storage.write_f32(address, k_value).and_then(|_| storage.commit()) {
            Ok(()) => {
                info!("Saved {:?} K value {:.4} at {:#06x}", solution, k_value, address);
                CalibrationOutcome::Saved { solution, k_value }
            }
            Err(e) => {
                error!("Failed to save K value: {}", e);
                CalibrationOutcome::StorageFailed(e)
            }
        }
    }

    pub fn mode(&self) -> CalibrationMode {
        self.mode
    }

    pub fn pending_success(&self) -> bool {
        self.pending_success
    }

    pub fn last_voltage(&self) -> f32 {
        self.last_voltage
    }

    pub fn last_temperature(&self) -> f32 {
        self.last_temperature
    }
}

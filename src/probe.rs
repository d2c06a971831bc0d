//! ECプローブ
//!
//! 変換器・キャリブレーション制御・コマンド受信・K値ストレージをまとめた
//! アプリケーション向けのエントリポイントです。

use log::{info, warn};

use crate::calibration::{CalibrationController, CalibrationMode, CalibrationOutcome};
use crate::command::parse_command;
use crate::config::ProbeConfig;
use crate::converter::{EcConverter, KValues};
use crate::serial::{LineReader, SerialPort, StatusOutput};
use crate::storage::{is_uninitialized, CoefficientStorage, StorageResult};

/// K値の初期値
pub const DEFAULT_K_VALUE: f32 = 1.0;

pub struct EcProbe<S: CoefficientStorage> {
    config: ProbeConfig,
    storage: S,
    converter: EcConverter,
    controller: CalibrationController,
    line_reader: LineReader,
}

impl<S: CoefficientStorage> EcProbe<S> {
    pub fn new(storage: S, config: ProbeConfig) -> Self {
        Self {
            converter: EcConverter::new(&config),
            controller: CalibrationController::new(&config),
            line_reader: LineReader::new(config.command_timeout_ms),
            storage,
            config,
        }
    }

    /// 保存済みのK値をロードする
    ///
    /// 未初期化(0またはNaN)のアドレスには初期値1.0を書き込む。
    /// ロード後は低レンジのK値が選択される。
    pub fn begin(&mut self) -> StorageResult<()> {
        let low = self.load_or_default(self.config.k_value_low_address())?;
        let high = self.load_or_default(self.config.k_value_high_address())?;
        self.converter.load_k_values(low, high);
        info!("EC probe initialized: k_low={:.4}, k_high={:.4}", low, high);
        Ok(())
    }

    /// `begin`の別名
    pub fn initialize(&mut self) -> StorageResult<()> {
        self.begin()
    }

    fn load_or_default(&mut self, address: u16) -> StorageResult<f32> {
        let value = self.storage.read_f32(address)?;
        if !is_uninitialized(value) {
            return Ok(value);
        }

        warn!(
            "K value at {:#06x} is uninitialized, writing default {}",
            address, DEFAULT_K_VALUE
        );
        self.storage.write_f32(address, DEFAULT_K_VALUE)?;
        self.storage.commit()?;
        Ok(DEFAULT_K_VALUE)
    }

    /// 電圧と水温からEC値(mS/cm)を計算する
    pub fn read_ec(&mut self, voltage: f32, temperature_c: f32) -> f32 {
        self.converter.convert(voltage, temperature_c)
    }

    /// 指定したコマンド文字列でキャリブレーションを進める
    pub fn calibration_with_command<O: StatusOutput + ?Sized>(
        &mut self,
        voltage: f32,
        temperature_c: f32,
        command: &str,
        out: &mut O,
    ) -> CalibrationOutcome {
        self.controller.cache_inputs(voltage, temperature_c);
        self.dispatch(command, out)
    }

    /// シリアルポートから受信したコマンドでキャリブレーションを進める
    ///
    /// コマンド行が揃っていない場合は何もせずNoneを返す。
    pub fn calibration<P: SerialPort + ?Sized>(
        &mut self,
        voltage: f32,
        temperature_c: f32,
        port: &mut P,
    ) -> Option<CalibrationOutcome> {
        self.controller.cache_inputs(voltage, temperature_c);
        let line = self.line_reader.poll(port)?;
        Some(self.dispatch(&line, port))
    }

    fn dispatch<O: StatusOutput + ?Sized>(&mut self, command: &str, out: &mut O) -> CalibrationOutcome {
        let command = parse_command(command);
        self.controller
            .handle(command, &mut self.converter, &mut self.storage, out)
    }

    /// 最後に計算したEC値
    pub fn ec_value(&self) -> f32 {
        self.converter.ec_value()
    }

    /// 最後に計算した生EC値
    pub fn raw_ec(&self) -> f32 {
        self.converter.raw_ec()
    }

    pub fn k_values(&self) -> KValues {
        self.converter.k_values()
    }

    pub fn calibration_mode(&self) -> CalibrationMode {
        self.controller.mode()
    }

    pub fn is_calibrating(&self) -> bool {
        self.controller.mode() == CalibrationMode::Entered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mock::MockEeprom;
    use crate::storage::StorageError;

    #[test]
    fn test_begin_writes_defaults_to_empty_storage() {
        let storage = MockEeprom::new();
        let mut probe = EcProbe::new(storage.clone(), ProbeConfig::default());
        probe.begin().unwrap();

        assert_eq!(storage.committed_value(0x0A), Some(1.0));
        assert_eq!(storage.committed_value(0x0E), Some(1.0));
        assert_eq!(storage.get_commit_count(), 2);
        assert_eq!(probe.k_values(), KValues::default());
    }

    #[test]
    fn test_begin_loads_stored_values() {
        let storage = MockEeprom::new();
        storage.preload(0x0A, 0.95);
        storage.preload(0x0E, 1.08);
        let mut probe = EcProbe::new(storage.clone(), ProbeConfig::default());
        probe.begin().unwrap();

        let k = probe.k_values();
        assert_eq!(k.low, 0.95);
        assert_eq!(k.high, 1.08);
        assert_eq!(k.active, 0.95);
        assert!(storage.get_writes().is_empty());
    }

    #[test]
    fn test_begin_treats_erased_flash_as_uninitialized() {
        let storage = MockEeprom::new();
        storage.preload(0x0A, f32::from_bits(0xFFFF_FFFF));
        storage.preload(0x0E, 1.02);
        let mut probe = EcProbe::new(storage.clone(), ProbeConfig::default());
        probe.begin().unwrap();

        assert_eq!(probe.k_values().low, 1.0);
        assert_eq!(probe.k_values().high, 1.02);
        assert_eq!(storage.get_writes(), vec![(0x0A, 1.0)]);
    }

    #[test]
    fn test_begin_propagates_read_error() {
        let storage = MockEeprom::new();
        storage.set_read_error(true);
        let mut probe = EcProbe::new(storage, ProbeConfig::default());
        assert!(probe.begin().is_err());
    }

    #[test]
    fn test_begin_propagates_default_write_error() {
        let storage = MockEeprom::new();
        storage.set_write_error(true);
        let mut probe = EcProbe::new(storage.clone(), ProbeConfig::default());

        assert!(matches!(
            probe.begin(),
            Err(StorageError::Write { address: 0x0A, .. })
        ));
        assert_eq!(storage.committed_value(0x0A), None);
    }

    #[test]
    fn test_begin_propagates_default_commit_error() {
        let storage = MockEeprom::new();
        storage.set_commit_error(true);
        let mut probe = EcProbe::new(storage.clone(), ProbeConfig::default());

        assert!(matches!(probe.begin(), Err(StorageError::Commit(_))));
        assert_eq!(storage.get_commit_count(), 0);
    }

    #[test]
    fn test_custom_k_value_address() {
        let storage = MockEeprom::new();
        let config = ProbeConfig::new().with_k_value_address(0x20);
        let mut probe = EcProbe::new(storage.clone(), config);
        probe.begin().unwrap();

        assert_eq!(storage.committed_value(0x20), Some(1.0));
        assert_eq!(storage.committed_value(0x24), Some(1.0));
    }

    #[test]
    fn test_calibration_with_command_caches_inputs() {
        let mut probe = EcProbe::new(MockEeprom::new(), ProbeConfig::default());
        let mut out: Vec<String> = Vec::new();
        let outcome = probe.calibration_with_command(231.7, 22.5, "enterec", &mut out);

        assert_eq!(outcome, CalibrationOutcome::Entered);
        assert!(probe.is_calibrating());
        assert_eq!(probe.controller.last_voltage(), 231.7);
        assert_eq!(probe.controller.last_temperature(), 22.5);
    }
}

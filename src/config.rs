//! プローブ設定
//!
//! 回路定数・温度補正係数・レンジ切替閾値・K値の保存先などをまとめます。
//! 実機ビルド(`esp`フィーチャー)では`cfg.toml`から読み込まれた値で上書きされます。

/// K値(低レンジ)を保存するEEPROM/NVSの先頭アドレス
pub const DEFAULT_K_VALUE_ADDRESS: u16 = 0x0A;

/// f32 1個分のバイト幅（低レンジと高レンジのK値は隣接して保存される）
pub const FLOAT_WIDTH: u16 = core::mem::size_of::<f32>() as u16;

/// 設定エラー
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("回路定数が無効です (r2_ohms={r2_ohms}, ec_ref={ec_ref})")]
    InvalidCircuitConstants { r2_ohms: f32, ec_ref: f32 },
    #[error("レンジ切替閾値が無効です (low={low}, high={high})")]
    InvalidRangeSwitch { low: f32, high: f32 },
    #[error("K値の許容範囲が無効です (min={min}, max={max})")]
    InvalidKValueWindow { min: f32, max: f32 },
    #[error("K値の保存アドレスがオーバーフローします: {0:#06x}")]
    InvalidKValueAddress(u16),
}

/// EC変換とキャリブレーションの設定
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    /// 変換回路の抵抗値 R2（Ω）
    pub r2_ohms: f32,
    /// 基準電圧 VREF 相当の定数
    pub ec_ref: f32,
    /// 温度補正係数（1℃あたり）
    pub temp_coefficient: f32,
    /// 基準温度（℃）
    pub reference_temp_c: f32,
    /// この値を超えたら高レンジのK値に切り替える
    pub range_switch_high: f32,
    /// この値を下回ったら低レンジのK値に切り替える
    pub range_switch_low: f32,
    /// 妥当とみなすK値の下限（この値を含まない）
    pub k_value_min: f32,
    /// 妥当とみなすK値の上限（この値を含まない）
    pub k_value_max: f32,
    /// 低レンジK値の保存アドレス（高レンジはその直後）
    pub k_value_address: u16,
    /// シリアルコマンド受信の無通信タイムアウト（ミリ秒）
    pub command_timeout_ms: u32,
}

impl ProbeConfig {
    pub fn new() -> Self {
        Self {
            r2_ohms: 820.0,
            ec_ref: 200.0,
            temp_coefficient: 0.0185,
            reference_temp_c: 25.0,
            range_switch_high: 2.5,
            range_switch_low: 2.0,
            k_value_min: 0.5,
            k_value_max: 1.5,
            k_value_address: DEFAULT_K_VALUE_ADDRESS,
            command_timeout_ms: 500,
        }
    }

    pub fn with_circuit(mut self, r2_ohms: f32, ec_ref: f32) -> Self {
        self.r2_ohms = r2_ohms;
        self.ec_ref = ec_ref;
        self
    }

    pub fn with_temp_coefficient(mut self, temp_coefficient: f32) -> Self {
        self.temp_coefficient = temp_coefficient;
        self
    }

    pub fn with_k_value_address(mut self, address: u16) -> Self {
        self.k_value_address = address;
        self
    }

    pub fn with_command_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.command_timeout_ms = timeout_ms;
        self
    }

    /// 低レンジK値のアドレス
    pub fn k_value_low_address(&self) -> u16 {
        self.k_value_address
    }

    /// 高レンジK値のアドレス
    pub fn k_value_high_address(&self) -> u16 {
        self.k_value_address.wrapping_add(FLOAT_WIDTH)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.r2_ohms > 0.0 && self.ec_ref > 0.0) {
            return Err(ConfigError::InvalidCircuitConstants {
                r2_ohms: self.r2_ohms,
                ec_ref: self.ec_ref,
            });
        }
        if !(self.range_switch_low <= self.range_switch_high) {
            return Err(ConfigError::InvalidRangeSwitch {
                low: self.range_switch_low,
                high: self.range_switch_high,
            });
        }
        if !(self.k_value_min < self.k_value_max) {
            return Err(ConfigError::InvalidKValueWindow {
                min: self.k_value_min,
                max: self.k_value_max,
            });
        }
        if self.k_value_address.checked_add(FLOAT_WIDTH * 2).is_none() {
            return Err(ConfigError::InvalidKValueAddress(self.k_value_address));
        }
        Ok(())
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "esp")]
mod device {
    use super::{ConfigError, ProbeConfig};

    /// 実機用設定
    ///
    /// ビルド時に`cfg.toml`の`[ec-probe]`テーブルから読み込まれます。
    #[toml_cfg::toml_config]
    pub struct Config {
        #[default(820.0)]
        r2_ohms: f32,

        #[default(200.0)]
        ec_ref: f32,

        #[default(0.0185)] // 1.85%/℃
        temp_coefficient: f32,

        #[default(10)] // 0x0A
        k_value_address: u16,

        #[default(500)]
        command_timeout_ms: u32,

        // 温度センサー未接続時に使う水温（℃）
        #[default(25.0)]
        default_temperature_c: f32,

        #[default(1000)]
        measurement_interval_ms: u32,
    }

    /// 測定ループの設定
    #[derive(Debug, Clone)]
    pub struct DeviceConfig {
        pub probe: ProbeConfig,
        pub default_temperature_c: f32,
        pub measurement_interval_ms: u32,
    }

    impl DeviceConfig {
        /// `cfg.toml`から設定をロードします
        pub fn load() -> Result<Self, ConfigError> {
            // toml_cfg によって生成された定数
            let config = CONFIG;

            let probe = ProbeConfig::new()
                .with_circuit(config.r2_ohms, config.ec_ref)
                .with_temp_coefficient(config.temp_coefficient)
                .with_k_value_address(config.k_value_address)
                .with_command_timeout_ms(config.command_timeout_ms);
            probe.validate()?;

            Ok(Self {
                probe,
                default_temperature_c: config.default_temperature_c,
                measurement_interval_ms: config.measurement_interval_ms,
            })
        }
    }
}

#[cfg(feature = "esp")]
pub use device::DeviceConfig;

//! EC変換ユーティリティ
//!
//! 電圧と水温から温度補正済みのEC値(mS/cm)を計算します。
//! 低レンジ/高レンジ2つのK値をヒステリシス付きで自動選択します。

use log::debug;

use crate::config::ProbeConfig;

/// 電圧から未補正・未校正の生EC値を計算
///
/// `raw = 1000 × voltage / R2 / ECREF`
pub fn raw_ec_from_voltage(voltage: f32, r2_ohms: f32, ec_ref: f32) -> f32 {
    1000.0 * voltage / r2_ohms / ec_ref
}

/// 温度補正係数 `1 + α × (T - Tref)` を計算
pub fn temperature_factor(temperature_c: f32, reference_temp_c: f32, temp_coefficient: f32) -> f32 {
    1.0 + temp_coefficient * (temperature_c - reference_temp_c)
}

/// 低レンジ/高レンジのK値
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KValues {
    /// 現在選択されているK値（`low`か`high`のどちらか）
    pub active: f32,
    pub low: f32,
    pub high: f32,
}

impl Default for KValues {
    fn default() -> Self {
        Self {
            active: 1.0,
            low: 1.0,
            high: 1.0,
        }
    }
}

/// 使用中のK値レンジ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KRange {
    Low,
    High,
}

/// EC変換器
///
/// 最後の生EC値と最終EC値を保持し、キャリブレーション時の標準液判定に使います。
#[derive(Debug, Clone)]
pub struct EcConverter {
    r2_ohms: f32,
    ec_ref: f32,
    temp_coefficient: f32,
    reference_temp_c: f32,
    range_switch_high: f32,
    range_switch_low: f32,
    k_values: KValues,
    range: KRange,
    raw_ec: f32,
    ec_value: f32,
}

impl EcConverter {
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            r2_ohms: config.r2_ohms,
            ec_ref: config.ec_ref,
            temp_coefficient: config.temp_coefficient,
            reference_temp_c: config.reference_temp_c,
            range_switch_high: config.range_switch_high,
            range_switch_low: config.range_switch_low,
            k_values: KValues::default(),
            range: KRange::Low,
            raw_ec: 0.0,
            ec_value: 0.0,
        }
    }

    /// 電圧と水温からEC値を計算
    ///
    /// # 引数
    /// * `voltage` - プローブ電圧（mV）
    /// * `temperature_c` - 水温（℃）
    ///
    /// # 戻り値
    /// 25℃換算のEC値（mS/cm）
    pub fn convert(&mut self, voltage: f32, temperature_c: f32) -> f32 {
        let raw = raw_ec_from_voltage(voltage, self.r2_ohms, self.ec_ref);

        // 自動レンジ切替: 2.0〜2.5 の間は直前のレンジを維持
        let trial = raw * self.k_values.active;
        if trial > self.range_switch_high {
            self.select_range(KRange::High);
        } else if trial < self.range_switch_low {
            self.select_range(KRange::Low);
        }

        let value = raw * self.k_values.active
            / temperature_factor(temperature_c, self.reference_temp_c, self.temp_coefficient);

        debug!(
            "EC変換: voltage={:.2}, temp={:.1}, raw={:.4}, k={:.4}, ec={:.4}",
            voltage, temperature_c, raw, self.k_values.active, value
        );

        self.raw_ec = raw;
        self.ec_value = value;
        value
    }

    fn select_range(&mut self, range: KRange) {
        if self.range != range {
            debug!("Kレンジ切替: {:?} -> {:?}", self.range, range);
        }
        self.range = range;
        self.k_values.active = match range {
            KRange::Low => self.k_values.low,
            KRange::High => self.k_values.high,
        };
    }

    /// 保存済みK値をロードし、低レンジを選択する
    pub fn load_k_values(&mut self, low: f32, high: f32) {
        self.k_values.low = low;
        self.k_values.high = high;
        self.select_range(KRange::Low);
    }

    /// 低レンジK値を差し替える（低レンジ選択中なら即座に反映）
    pub fn stage_low(&mut self, k_value: f32) {
        self.k_values.low = k_value;
        let range = self.range;
        self.select_range(range);
    }

    /// 高レンジK値を差し替える（高レンジ選択中なら即座に反映）
    pub fn stage_high(&mut self, k_value: f32) {
        self.k_values.high = k_value;
        let range = self.range;
        self.select_range(range);
    }

    pub fn k_values(&self) -> KValues {
        self.k_values
    }

    pub fn range(&self) -> KRange {
        self.range
    }

    /// 最後に計算した生EC値
    pub fn raw_ec(&self) -> f32 {
        self.raw_ec
    }

    /// 最後に計算したEC値
    pub fn ec_value(&self) -> f32 {
        self.ec_value
    }

    pub fn r2_ohms(&self) -> f32 {
        self.r2_ohms
    }

    pub fn ec_ref(&self) -> f32 {
        self.ec_ref
    }
}

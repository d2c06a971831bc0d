//! 標準液（バッファ溶液）の判定とK値計算

use crate::converter::temperature_factor;

/// 対応している校正用標準液
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSolution {
    /// 1413 µS/cm（低レンジ）
    Low,
    /// 12.88 mS/cm（高レンジ）
    High,
}

impl BufferSolution {
    /// 生EC値から標準液を推定する
    ///
    /// 2つの標準液は1桁違うため、生EC値の大きさだけで判別できる。
    /// どちらの範囲にも入らない場合はNone。
    pub fn classify(raw_ec: f32) -> Option<Self> {
        if raw_ec > 0.9 && raw_ec < 1.9 {
            Some(Self::Low)
        } else if raw_ec > 9.0 && raw_ec < 16.8 {
            Some(Self::High)
        } else {
            None
        }
    }

    /// 25℃での公称EC値（mS/cm）
    pub fn nominal_ec(&self) -> f32 {
        match self {
            Self::Low => 1.413,
            Self::High => 12.88,
        }
    }

    /// 測定温度での標準液のEC値（mS/cm）
    pub fn compensated_ec(&self, temperature_c: f32, reference_temp_c: f32, temp_coefficient: f32) -> f32 {
        self.nominal_ec() * temperature_factor(temperature_c, reference_temp_c, temp_coefficient)
    }
}

/// 標準液のEC値と測定電圧からK値を逆算する
///
/// `k = R2 × ECREF × ec / 1000 / voltage`
pub fn solve_k_value(r2_ohms: f32, ec_ref: f32, solution_ec: f32, voltage: f32) -> f32 {
    r2_ohms * ec_ref * solution_ec / 1000.0 / voltage
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_low_band() {
        assert_eq!(BufferSolution::classify(1.413), Some(BufferSolution::Low));
        assert_eq!(BufferSolution::classify(0.91), Some(BufferSolution::Low));
        assert_eq!(BufferSolution::classify(1.89), Some(BufferSolution::Low));
    }

    #[test]
    fn test_classify_high_band() {
        assert_eq!(BufferSolution::classify(12.88), Some(BufferSolution::High));
        assert_eq!(BufferSolution::classify(9.01), Some(BufferSolution::High));
        assert_eq!(BufferSolution::classify(16.79), Some(BufferSolution::High));
    }

    #[test]
    fn test_classify_band_edges_are_exclusive() {
        assert_eq!(BufferSolution::classify(0.9), None);
        assert_eq!(BufferSolution::classify(1.9), None);
        assert_eq!(BufferSolution::classify(9.0), None);
        assert_eq!(BufferSolution::classify(16.8), None);
    }

    #[test]
    fn test_classify_outside_bands() {
        assert_eq!(BufferSolution::classify(0.0), None);
        assert_eq!(BufferSolution::classify(5.0), None);
        assert_eq!(BufferSolution::classify(20.0), None);
        assert_eq!(BufferSolution::classify(f32::NAN), None);
    }

    #[test]
    fn test_compensated_ec_at_reference() {
        let ec = BufferSolution::High.compensated_ec(25.0, 25.0, 0.0185);
        assert_eq!(ec, 12.88);
    }

    #[test]
    fn test_compensated_ec_warm_solution() {
        // 30℃では 1.413 × 1.0925
        let ec = BufferSolution::Low.compensated_ec(30.0, 25.0, 0.0185);
        assert!((ec - 1.543_702_5).abs() < 1e-5);
    }

    #[test]
    fn test_solve_k_value_unity() {
        let voltage = 1.413 * 820.0 * 200.0 / 1000.0;
        let k = solve_k_value(820.0, 200.0, 1.413, voltage);
        assert!((k - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_solve_k_value_zero_voltage() {
        let k = solve_k_value(820.0, 200.0, 1.413, 0.0);
        assert!(k.is_infinite());
    }
}

use super::{CoefficientStorage, StorageError, StorageResult};
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use log::debug;

const NAMESPACE: &str = "ec_probe";

/// NVSを使ったK値ストレージ
///
/// EEPROMのアドレスをNVSのキー(`k_000a`など)に対応させ、
/// f32はビットパターンをu32として保存します。
/// NVSは`set_*`の時点で書き込みが確定するため、`commit`は何もしません。
pub struct NvsCoefficientStorage {
    nvs: EspNvs<NvsDefault>,
}

impl NvsCoefficientStorage {
    pub fn new(partition: EspDefaultNvsPartition) -> StorageResult<Self> {
        let nvs = EspNvs::new(partition, NAMESPACE, true)
            .map_err(|e| StorageError::Unavailable(format!("Failed to open NVS namespace: {}", e)))?;
        Ok(Self { nvs })
    }

    fn key(address: u16) -> String {
        format!("k_{:04x}", address)
    }
}

impl CoefficientStorage for NvsCoefficientStorage {
    fn read_f32(&mut self, address: u16) -> StorageResult<f32> {
        let key = Self::key(address);
        match self.nvs.get_u32(&key) {
            Ok(Some(bits)) => Ok(f32::from_bits(bits)),
            Ok(None) => {
                debug!("NVS key '{}' not found", key);
                Ok(0.0)
            }
            Err(e) => Err(StorageError::Read {
                address,
                message: e.to_string(),
            }),
        }
    }

    fn write_f32(&mut self, address: u16, value: f32) -> StorageResult<()> {
        let key = Self::key(address);
        self.nvs
            .set_u32(&key, value.to_bits())
            .map_err(|e| StorageError::Write {
                address,
                message: e.to_string(),
            })
    }

    fn commit(&mut self) -> StorageResult<()> {
        Ok(())
    }
}

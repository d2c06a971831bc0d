use anyhow::Result;
use ec_probe::config::DeviceConfig;
use ec_probe::serial::usb::UsbSerialPort;
use ec_probe::storage::nvs::NvsCoefficientStorage;
use ec_probe::{CalibrationOutcome, EcProbe};
use esp_idf_svc::hal::adc::attenuation::DB_11;
use esp_idf_svc::hal::adc::oneshot::config::{AdcChannelConfig, Calibration};
use esp_idf_svc::hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{debug, info};

/// コマンド受信のポーリング間隔（ミリ秒）
const POLL_INTERVAL_MS: u32 = 20;

fn main() -> Result<()> {
    // ESP-IDFシステムの初期化
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::set_max_level(log::LevelFilter::Info);

    info!("Starting EC probe v{}...", ec_probe::VERSION);

    let device_config = DeviceConfig::load()?;
    info!("✓ Config loaded: {:?}", device_config);

    let peripherals = Peripherals::take()?;

    // K値の読み込み（未保存なら初期値を書き込む）
    let nvs = EspDefaultNvsPartition::take()?;
    let storage = NvsCoefficientStorage::new(nvs)?;
    let mut probe = EcProbe::new(storage, device_config.probe.clone());
    probe.begin()?;
    info!("✓ K values loaded: {:?}", probe.k_values());

    // USB シリアル（XIAO ESP32C3: D-=GPIO18, D+=GPIO19）
    let mut port = UsbSerialPort::new(
        peripherals.usb_serial,
        peripherals.pins.gpio18,
        peripherals.pins.gpio19,
    )?;
    info!("✓ USB serial initialized");

    // プローブ信号は GPIO1（ADC1）
    let adc = AdcDriver::new(peripherals.adc1)?;
    let channel_config = AdcChannelConfig {
        attenuation: DB_11,
        calibration: Calibration::Curve,
        ..Default::default()
    };
    let mut adc_pin = AdcChannelDriver::new(&adc, peripherals.pins.gpio1, &channel_config)?;
    info!("✓ ADC initialized");

    let temperature = device_config.default_temperature_c;
    let mut voltage = 0.0;
    let mut elapsed_ms = device_config.measurement_interval_ms;

    loop {
        if elapsed_ms >= device_config.measurement_interval_ms {
            elapsed_ms = 0;
            // カーブ補正済みのミリボルト値
            voltage = adc_pin.read()? as f32;
            let ec = probe.read_ec(voltage, temperature);
            if probe.is_calibrating() {
                debug!("raw EC: {:.3}, voltage: {:.1} mV", probe.raw_ec(), voltage);
            } else {
                info!("🌊 EC: {:.3} mS/cm (voltage: {:.1} mV, temp: {:.1}℃)", ec, voltage, temperature);
            }
        }

        if let Some(CalibrationOutcome::Saved { solution, k_value }) =
            probe.calibration(voltage, temperature, &mut port)
        {
            info!("✓ K value saved for {:?}: {:.4}", solution, k_value);
        }

        FreeRtos::delay_ms(POLL_INTERVAL_MS);
        elapsed_ms += POLL_INTERVAL_MS;
    }
}

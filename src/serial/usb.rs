use super::{SerialInput, StatusOutput};
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::usb_serial::{
    UsbDMinGpio, UsbDPlusGpio, UsbSerialConfig, UsbSerialDriver, USB_SERIAL,
};
use esp_idf_svc::sys::{self, EspError};
use log::{debug, warn};

/// ステータス行の書き込みタイムアウト（ミリ秒）
const WRITE_TIMEOUT_MS: u32 = 100;

/// USB Serial/JTAGを使ったシリアルポート
pub struct UsbSerialPort<'d> {
    driver: UsbSerialDriver<'d>,
}

impl<'d> UsbSerialPort<'d> {
    /// 新しいUSBシリアルポートを作成します
    ///
    /// # 引数
    ///
    /// * `usb_serial` - USBシリアルペリフェラルオブジェクト
    /// * `pin_d_minus` - USBのD-ピン
    /// * `pin_d_plus` - USBのD+ピン
    pub fn new<U, DN, DP>(usb_serial: U, pin_d_minus: DN, pin_d_plus: DP) -> Result<Self, EspError>
    where
        U: Peripheral<P = USB_SERIAL> + 'd,
        DN: Peripheral<P = UsbDMinGpio>,
        DP: Peripheral<P = UsbDPlusGpio>,
    {
        let config = UsbSerialConfig::new();
        let driver = UsbSerialDriver::new(usb_serial, pin_d_minus, pin_d_plus, &config)?;
        debug!("USB serial initialized");
        Ok(Self { driver })
    }
}

impl SerialInput for UsbSerialPort<'_> {
    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        // タイムアウト0でノンブロッキング読み取り
        match self.driver.read(&mut byte, 0) {
            Ok(1) => Some(byte[0]),
            Ok(_) => None,
            Err(e) if e.code() == sys::ESP_ERR_TIMEOUT => None,
            Err(e) => {
                warn!("USB serial read error: {}", e);
                None
            }
        }
    }

    fn millis(&self) -> u32 {
        let micros = unsafe { sys::esp_timer_get_time() };
        (micros / 1000) as u32
    }
}

impl StatusOutput for UsbSerialPort<'_> {
    fn print_line(&mut self, line: &str) {
        for chunk in [line.as_bytes(), b"\r\n".as_slice()] {
            if let Err(e) = self.driver.write(chunk, WRITE_TIMEOUT_MS) {
                warn!("USB serial write error: {}", e);
                return;
            }
        }
    }
}

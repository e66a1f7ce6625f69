use libloading::Library;
use once_cell::sync::OnceCell;
use std::ffi::CStr;
use std::os::raw::{c_char, c_float, c_int, c_ushort};
use crate::config::DaqConfig;
use crate::drivers::{AnalogInput, DaqError};
#[cfg(target_pointer_width = "64")]
const DEFAULT_LIBRARY: &str = "cbw64.dll";
#[cfg(not(target_pointer_width = "64"))]
const DEFAULT_LIBRARY: &str = "cbw32.dll";
const NOERRORS: c_int = 0;
const ERRSTRLEN: usize = 256;
type FnAIn = unsafe extern "system" fn(c_int, c_int, c_int, *mut c_ushort) -> c_int;
type FnToEngUnits = unsafe extern "system" fn(c_int, c_int, c_ushort, *mut c_float) -> c_int;
type FnGetErrMsg = unsafe extern "system" fn(c_int, *mut c_char) -> c_int;
/// Entry points of the Measurement Computing Universal Library.
struct UlApi {
    #[allow(dead_code)]
    lib: Library,
    a_in: FnAIn,
    to_eng_units: FnToEngUnits,
    get_err_msg: FnGetErrMsg,
}
impl UlApi {
    fn load(path: &str) -> Result<Self, DaqError> {
        log::info!("loading Universal Library from {path}");
        let lib = unsafe { Library::new(path) }
            .map_err(|e| DaqError::Library(format!("{path}: {e}")))?;
        // Safety: signatures follow cbw.h; the UL exports them with the system ABI.
        unsafe {
            let a_in: FnAIn = *lib
                .get(b"cbAIn\0")
                .map_err(|_| DaqError::MissingSymbol("cbAIn"))?;
            let to_eng_units: FnToEngUnits = *lib
                .get(b"cbToEngUnits\0")
                .map_err(|_| DaqError::MissingSymbol("cbToEngUnits"))?;
            let get_err_msg: FnGetErrMsg = *lib
                .get(b"cbGetErrMsg\0")
                .map_err(|_| DaqError::MissingSymbol("cbGetErrMsg"))?;
            Ok(Self {
                lib,
                a_in,
                to_eng_units,
                get_err_msg,
            })
        }
    }
    fn instance(path: &str) -> Result<&'static UlApi, DaqError> {
        static API: OnceCell<UlApi> = OnceCell::new();
        API.get_or_try_init(|| Self::load(path))
    }
    fn error_message(&self, code: c_int) -> String {
        let mut buf = [0u8; ERRSTRLEN];
        let rc = unsafe { (self.get_err_msg)(code, buf.as_mut_ptr() as *mut c_char) };
        if rc != NOERRORS {
            return "unknown error".to_owned();
        }
        CStr::from_bytes_until_nul(&buf)
            .map(|s| s.to_string_lossy().trim().to_owned())
            .unwrap_or_else(|_| "unknown error".to_owned())
    }
    fn check(&self, code: c_int) -> Result<(), DaqError> {
        if code == NOERRORS {
            Ok(())
        } else {
            Err(DaqError::Driver {
                code,
                message: self.error_message(code),
            })
        }
    }
}
/// Single-channel analog input on a UL-managed board (e.g. USB-1208FS-Plus).
pub struct MccBoard {
    api: &'static UlApi,
    board_num: c_int,
    channel: c_int,
    range: c_int,
    label: String,
}
impl MccBoard {
    pub fn open(config: &DaqConfig) -> Result<Self, DaqError> {
        let path = config.library_path.as_deref().unwrap_or(DEFAULT_LIBRARY);
        let api = UlApi::instance(path)?;
        log::info!(
            "board {} channel {} range {:?} ready",
            config.board_num,
            config.channel,
            config.range
        );
        Ok(Self {
            api,
            board_num: config.board_num,
            channel: config.channel,
            range: config.range.ul_code(),
            label: config.device_label.clone(),
        })
    }
}
impl AnalogInput for MccBoard {
    fn label(&self) -> &str {
        &self.label
    }
    fn read(&mut self) -> Result<f64, DaqError> {
        let mut raw: c_ushort = 0;
        self.api.check(unsafe {
            (self.api.a_in)(self.board_num, self.channel, self.range, &mut raw)
        })?;
        let mut volts: c_float = 0.0;
        self.api.check(unsafe {
            (self.api.to_eng_units)(self.board_num, self.range, raw, &mut volts)
        })?;
        Ok(f64::from(volts))
    }
}

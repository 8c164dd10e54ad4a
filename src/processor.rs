//! The query interface: a single coarse-grained mutex guarding the
//! [`Directory`], with callbacks fired while the lock is held (spec §5).
//!
//! Grounded in welle.io's `FIBProcessor` (`getServiceList`, `getEnsembleName`,
//! `syncReached`, `kindofService`, `getAudioServiceData`,
//! `getDataServiceData`) and in the teacher's closure-based callback style
//! (`shared/src/dab.rs`'s `EnsembleUpdateCallback`/`AacSegmentCallback`).

use std::sync::Mutex;

use serde::Serialize;

use crate::directory::{DateTime, Directory, Service, SubChannel};
use crate::fic::{process_fib, FibCallbacks};

pub type EnsembleNameCallback = Box<dyn FnMut(&str) + Send>;
pub type ServiceDetectedCallback = Box<dyn FnMut(u32, &str) + Send>;
pub type DateTimeCallback = Box<dyn FnMut(&DateTime) + Send>;

#[derive(Default)]
struct Callbacks {
    on_new_ensemble_name: Option<EnsembleNameCallback>,
    on_service_detected: Option<ServiceDetectedCallback>,
    on_date_time_update: Option<DateTimeCallback>,
}

impl FibCallbacks for Callbacks {
    fn on_new_ensemble_name(&mut self, name: &str) {
        if let Some(cb) = self.on_new_ensemble_name.as_mut() {
            cb(name);
        }
    }

    fn on_service_detected(&mut self, service_id: u32, label: &str) {
        if let Some(cb) = self.on_service_detected.as_mut() {
            cb(service_id, label);
        }
    }

    fn on_date_time_update(&mut self, date_time: &DateTime) {
        if let Some(cb) = self.on_date_time_update.as_mut() {
            cb(date_time);
        }
    }
}

/// What kind of service a label resolves to, per welle.io's `kindofService`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServiceKind {
    Audio,
    Packet,
    Unknown,
}

/// A fully joined audio service: its component fields plus the sub-channel
/// carrying it. `valid` is `false` until every piece has arrived (spec §4.3).
#[derive(Debug, Clone, Default, Serialize)]
pub struct AudioServiceData {
    pub valid: bool,
    pub start_addr: u16,
    pub short_form: bool,
    pub prot_level: u8,
    pub length: u16,
    pub bit_rate: u16,
    pub asc_ty: u8,
    pub language: u8,
    pub program_type: u8,
    pub fec_scheme: u8,
}

/// A fully joined data (packet) service, analogous to [`AudioServiceData`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct DataServiceData {
    pub valid: bool,
    pub start_addr: u16,
    pub short_form: bool,
    pub prot_level: u8,
    pub length: u16,
    pub bit_rate: u16,
    pub dsc_ty: u8,
    pub dg_flag: bool,
    pub packet_address: u16,
    pub fec_scheme: u8,
}

/// The concurrency-safe facade over the ensemble directory: one mutex, held
/// for the duration of a FIB, query, or callback invocation (spec §5 — a
/// single coarse-grained lock, no finer-grained locking inside).
pub struct FibProcessor {
    inner: Mutex<Inner>,
}

struct Inner {
    directory: Directory,
    callbacks: Callbacks,
}

impl Default for FibProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl FibProcessor {
    pub fn new() -> Self {
        FibProcessor {
            inner: Mutex::new(Inner {
                directory: Directory::new(),
                callbacks: Callbacks::default(),
            }),
        }
    }

    pub fn set_on_new_ensemble_name(&self, cb: EnsembleNameCallback) {
        self.inner.lock().unwrap().callbacks.on_new_ensemble_name = Some(cb);
    }

    pub fn set_on_service_detected(&self, cb: ServiceDetectedCallback) {
        self.inner.lock().unwrap().callbacks.on_service_detected = Some(cb);
    }

    pub fn set_on_date_time_update(&self, cb: DateTimeCallback) {
        self.inner.lock().unwrap().callbacks.on_date_time_update = Some(cb);
    }

    /// Decodes one 30-byte FIB and applies its FIGs to the directory.
    /// Per spec §7, a single malformed FIG never aborts the whole FIB: the
    /// decoders below skip what they cannot parse and keep walking.
    pub fn process_fib(&self, buf: &[u8; 30]) {
        let mut guard = self.inner.lock().unwrap();
        let Inner {
            directory,
            callbacks,
        } = &mut *guard;
        process_fib(directory, callbacks, buf);
    }

    /// Resets the directory to a fresh, unsynced state (e.g. on retune).
    pub fn clear_ensemble(&self) {
        self.inner.lock().unwrap().directory.clear_ensemble();
    }

    pub fn get_ensemble_name(&self) -> String {
        self.inner.lock().unwrap().directory.ensemble_name.clone()
    }

    pub fn sync_reached(&self) -> bool {
        self.inner.lock().unwrap().directory.is_synced
    }

    pub fn get_date_time(&self) -> DateTime {
        self.inner.lock().unwrap().directory.date_time
    }

    pub fn get_service_list(&self) -> Vec<Service> {
        self.inner.lock().unwrap().directory.services.clone()
    }

    pub fn get_sub_channel(&self, sub_ch_id: u8) -> Option<SubChannel> {
        self.inner
            .lock()
            .unwrap()
            .directory
            .sub_channels
            .get(sub_ch_id as usize)
            .cloned()
    }

    /// Classifies a service label by scanning its bound components, per
    /// welle.io's `kindofService`.
    pub fn kind_of_service(&self, label: &str) -> ServiceKind {
        if label.is_empty() {
            return ServiceKind::Unknown;
        }
        let guard = self.inner.lock().unwrap();
        let dir = &guard.directory;
        let Some(service) = dir.find_service_by_label(label) else {
            return ServiceKind::Unknown;
        };
        let components = dir
            .components
            .iter()
            .filter(|c| c.service_id == service.service_id);
        for c in components {
            if c.t_mid == 3 {
                return ServiceKind::Packet;
            }
            if c.t_mid == 0 {
                return ServiceKind::Audio;
            }
        }
        ServiceKind::Unknown
    }

    /// Joins a service's first audio component with its sub-channel, per
    /// welle.io's `getAudioServiceData`.
    pub fn get_audio_service_data(&self, label: &str) -> AudioServiceData {
        let guard = self.inner.lock().unwrap();
        let dir = &guard.directory;
        let mut result = AudioServiceData::default();

        let Some(service) = dir.find_service_by_label(label) else {
            return result;
        };
        let Some(component) = dir
            .components
            .iter()
            .find(|c| c.service_id == service.service_id && c.t_mid == 0)
        else {
            return result;
        };
        let Some(sub_ch_id) = component.sub_channel_id else {
            return result;
        };
        let Some(sub_ch) = dir.sub_channels.get(sub_ch_id as usize) else {
            return result;
        };
        if !sub_ch.is_complete() {
            return result;
        }

        result.start_addr = sub_ch.start_addr.unwrap_or(0);
        result.short_form = sub_ch.short_form;
        result.prot_level = sub_ch.prot_level.unwrap_or(0);
        result.length = sub_ch.length.unwrap_or(0);
        result.bit_rate = sub_ch.bit_rate.unwrap_or(0);
        result.fec_scheme = sub_ch.fec_scheme;
        result.asc_ty = component.asc_ty;
        result.language = service.language;
        result.program_type = service.program_type;
        result.valid = true;
        result
    }

    /// Joins a service's first packet component with its sub-channel, per
    /// welle.io's `getDataServiceData`.
    pub fn get_data_service_data(&self, label: &str) -> DataServiceData {
        let guard = self.inner.lock().unwrap();
        let dir = &guard.directory;
        let mut result = DataServiceData::default();

        let Some(service) = dir.find_service_by_label(label) else {
            return result;
        };
        let Some(component) = dir
            .components
            .iter()
            .find(|c| c.service_id == service.service_id && c.t_mid == 3)
        else {
            return result;
        };
        let Some(sub_ch_id) = component.sub_channel_id else {
            return result;
        };
        let Some(sub_ch) = dir.sub_channels.get(sub_ch_id as usize) else {
            return result;
        };
        if !sub_ch.is_complete() {
            return result;
        }

        result.start_addr = sub_ch.start_addr.unwrap_or(0);
        result.short_form = sub_ch.short_form;
        result.prot_level = sub_ch.prot_level.unwrap_or(0);
        result.length = sub_ch.length.unwrap_or(0);
        result.bit_rate = sub_ch.bit_rate.unwrap_or(0);
        result.fec_scheme = sub_ch.fec_scheme;
        result.dsc_ty = component.dsc_ty;
        result.dg_flag = component.dg_flag;
        result.packet_address = component.packet_address;
        result.valid = true;
        result
    }
}

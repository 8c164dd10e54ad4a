//! The mutable data model: the ensemble's sub-channel table, its services,
//! and their components. Grounded in the teacher's `shared/src/dab/ensemble.rs`
//! (`Ensemble`/`Service`/`ServiceComponent`/`Subchannel` structs and its
//! `feed()` cross-linking) and in the original `fib-processor.cpp`'s
//! `Service`, `ServiceComponent`, `ficList` members and
//! `findServiceId`/`find_packetComponent`/`bind_audioService`/
//! `bind_packetService` operations.

use serde::Serialize;

use crate::tables::Language;

pub const NUM_SUBCHANNELS: usize = 64;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SubChannel {
    pub start_addr: Option<u16>,
    pub short_form: bool,
    pub length: Option<u16>,
    pub bit_rate: Option<u16>,
    pub prot_level: Option<u8>,
    pub fec_scheme: u8,
    pub language: u8,
}

impl SubChannel {
    pub fn is_complete(&self) -> bool {
        self.start_addr.is_some() && self.length.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Service {
    pub service_id: u32,
    pub label: String,
    pub program_number: u16,
    pub has_pnum: bool,
    pub language: u8,
    pub has_language: bool,
    pub program_type: u8,
}

impl Service {
    fn new(service_id: u32) -> Self {
        Service {
            service_id,
            label: String::new(),
            program_number: 0,
            has_pnum: false,
            language: 0,
            has_language: false,
            program_type: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceComponent {
    pub t_mid: u8,
    pub service_id: u32,
    pub component_nr: u8,
    /// Audio components (TMid=0): the sub-channel carrying it.
    /// Packet components (TMid=3): filled in later by FIG0/3.
    pub sub_channel_id: Option<u8>,
    pub ps_flag: bool,
    /// Audio service component type (TMid=0 only).
    pub asc_ty: u8,
    /// 12-bit packet service component identifier (TMid=3 only).
    pub sc_id: u16,
    pub ca_flag: bool,
    pub dsc_ty: u8,
    pub dg_flag: bool,
    pub packet_address: u16,
}

impl ServiceComponent {
    fn new_audio(t_mid: u8, service_id: u32, component_nr: u8, sub_channel_id: u8, ps_flag: bool, asc_ty: u8) -> Self {
        ServiceComponent {
            t_mid,
            service_id,
            component_nr,
            sub_channel_id: Some(sub_channel_id),
            ps_flag,
            asc_ty,
            sc_id: 0,
            ca_flag: false,
            dsc_ty: 0,
            dg_flag: false,
            packet_address: 0,
        }
    }

    fn new_packet(t_mid: u8, service_id: u32, component_nr: u8, sc_id: u16, ps_flag: bool, ca_flag: bool) -> Self {
        ServiceComponent {
            t_mid,
            service_id,
            component_nr,
            sub_channel_id: None,
            ps_flag,
            asc_ty: 0,
            sc_id,
            ca_flag,
            dsc_ty: 0,
            dg_flag: false,
            packet_address: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[derive(Default)]
pub struct DateTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub hour_offset: i8,
    pub minute_offset: u8,
}


/// The live directory: one fixed sub-channel table plus append-only service
/// and component lists, per spec §3/§4.3.
#[derive(Debug)]
pub struct Directory {
    pub sub_channels: Vec<SubChannel>,
    pub services: Vec<Service>,
    pub components: Vec<ServiceComponent>,
    pub ensemble_name: String,
    pub is_synced: bool,
    pub first_time: bool,
    pub date_time: DateTime,
    pub date_flag: bool,
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

impl Directory {
    pub fn new() -> Self {
        Directory {
            sub_channels: vec![SubChannel::default(); NUM_SUBCHANNELS],
            services: Vec::new(),
            components: Vec::new(),
            ensemble_name: String::new(),
            is_synced: false,
            first_time: true,
            date_time: DateTime::default(),
            date_flag: false,
        }
    }

    pub fn clear_ensemble(&mut self) {
        self.sub_channels = vec![SubChannel::default(); NUM_SUBCHANNELS];
        self.services.clear();
        self.components.clear();
        self.ensemble_name.clear();
        self.is_synced = false;
        self.first_time = true;
        self.date_time = DateTime::default();
        self.date_flag = false;
    }

    pub fn find_or_create_service(&mut self, service_id: u32) -> &mut Service {
        if let Some(idx) = self.services.iter().position(|s| s.service_id == service_id) {
            return &mut self.services[idx];
        }
        self.services.push(Service::new(service_id));
        self.services.last_mut().unwrap()
    }

    pub fn find_service_by_label(&self, label: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.label == label)
    }

    pub fn find_packet_component_mut(&mut self, sc_id: u16) -> Option<&mut ServiceComponent> {
        self.components
            .iter_mut()
            .find(|c| c.t_mid == 3 && c.sc_id == sc_id)
    }

    fn has_component(&self, service_id: u32, component_nr: u8) -> bool {
        self.components
            .iter()
            .any(|c| c.service_id == service_id && c.component_nr == component_nr)
    }

    /// FIG0/2 audio-component binding. No-op if `(service_id, component_nr)`
    /// already exists (spec §4.3 / original's `bind_audioService`).
    pub fn bind_audio_service(
        &mut self,
        t_mid: u8,
        service_id: u32,
        component_nr: u8,
        sub_channel_id: u8,
        ps_flag: bool,
        asc_ty: u8,
    ) {
        self.find_or_create_service(service_id);
        if self.has_component(service_id, component_nr) {
            return;
        }
        self.components.push(ServiceComponent::new_audio(
            t_mid,
            service_id,
            component_nr,
            sub_channel_id,
            ps_flag,
            asc_ty,
        ));
    }

    /// FIG0/2 packet-component binding, analogous to `bind_audio_service`.
    pub fn bind_packet_service(
        &mut self,
        t_mid: u8,
        service_id: u32,
        component_nr: u8,
        sc_id: u16,
        ps_flag: bool,
        ca_flag: bool,
    ) {
        self.find_or_create_service(service_id);
        if self.has_component(service_id, component_nr) {
            return;
        }
        self.components.push(ServiceComponent::new_packet(
            t_mid,
            service_id,
            component_nr,
            sc_id,
            ps_flag,
            ca_flag,
        ));
    }
}

pub fn language_code(language: u8) -> Language {
    Language::from(language)
}

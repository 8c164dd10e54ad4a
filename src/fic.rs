//! FIB framing and the FIG 0 / FIG 1 decoders.
//!
//! The dispatch shape (`decode_fib`/`decode_fig0`/`decode_fig1`, swallowing
//! a malformed FIG's error and moving to the next one) and the `FigError`
//! type follow the teacher's own FIG decoder, `shared/src/dab/fic.rs`
//! (`FicDecoder`, `Fig0_0`..`Fig0_13`, `FigError::InvalidSize`). Field-level
//! bit layouts for extensions the teacher's decoder doesn't implement
//! (FIG0/16, FIG0/17, FIG0/22, and every FIG1 extension but the label ones)
//! are grounded in welle.io's `fib-processor.cpp` instead. Bit-level fields
//! within a FIG use `BitCursor` throughout rather than the teacher's manual
//! shift/mask, per the spec's dedicated bit-cursor component.

use thiserror::Error;

use crate::bitcursor::BitCursor;
use crate::charset::decode_label;
use crate::directory::{DateTime, Directory};
use crate::tables::{EEP_A_DIVISORS, EEP_B_DIVISORS, SHORT_FORM_TABLE};

/// A FIG body too short for its own fixed fields. Mirrors the teacher's
/// `shared/src/dab/fic.rs::FigError::InvalidSize`; never reaches a caller of
/// [`process_fib`] — decode_fig0/decode_fig1 log and skip the FIG instead
/// (spec §7: structural faults are benign once the FIB's CRC has checked
/// out).
#[derive(Debug, Error)]
enum FigError {
    #[error("body too short: need at least {min} bytes, got {actual}")]
    InvalidSize { min: usize, actual: usize },
}

fn require_len(body: &[u8], min: usize) -> Result<(), FigError> {
    if body.len() < min {
        Err(FigError::InvalidSize {
            min,
            actual: body.len(),
        })
    } else {
        Ok(())
    }
}

/// Callbacks invoked synchronously, while the processor's mutex is held
/// (spec §5). Implementers must not re-enter the processor from within one.
pub trait FibCallbacks {
    fn on_new_ensemble_name(&mut self, name: &str);
    fn on_service_detected(&mut self, service_id: u32, label: &str);
    fn on_date_time_update(&mut self, date_time: &DateTime);
}

/// A callback sink that does nothing; useful when a caller has no
/// controller to notify.
#[derive(Debug, Default)]
pub struct NullCallbacks;

impl FibCallbacks for NullCallbacks {
    fn on_new_ensemble_name(&mut self, _name: &str) {}
    fn on_service_detected(&mut self, _service_id: u32, _label: &str) {}
    fn on_date_time_update(&mut self, _date_time: &DateTime) {}
}

/// Walks one 30-byte FIB and applies FIG 0 / FIG 1 updates to `dir`.
/// FIGtype 7 is the end-of-FIB sentinel; any other unrecognised type is
/// skipped by its declared length. An over-long FIG that would run past
/// byte 30 terminates the walk without decoding a partial record (spec §7).
pub fn process_fib(dir: &mut Directory, callbacks: &mut dyn FibCallbacks, buf: &[u8; 30]) {
    let cursor = BitCursor::new(buf);
    let mut offset_bytes = 0usize;

    while offset_bytes < 30 {
        let header_bit = offset_bytes * 8;
        let fig_type = cursor.read_u3(header_bit);
        let fig_len = cursor.read_u5(header_bit + 3) as usize + 1;

        if fig_type == 7 {
            return;
        }

        let body_start = offset_bytes + 1;
        let body_end = offset_bytes + fig_len;
        if body_end > 30 {
            return;
        }
        let body = &buf[body_start..body_end];

        match fig_type {
            0 => decode_fig0(dir, callbacks, body),
            1 => decode_fig1(dir, callbacks, body),
            _ => log::debug!("fic: skipping unrecognised FIG type {fig_type}"),
        }

        offset_bytes += fig_len;
    }
}

fn decode_fig0(dir: &mut Directory, callbacks: &mut dyn FibCallbacks, data: &[u8]) {
    if data.is_empty() {
        return;
    }
    let header = data[0];
    let pd = (header & 0x20) != 0;
    let ext = header & 0x1F;
    let body = &data[1..];

    match ext {
        0 => {
            if let Err(e) = fig0_ext0(callbacks, body) {
                log::debug!("fic: skipping malformed FIG0/0: {e}");
            }
        }
        1 => fig0_ext1(dir, body),
        2 => fig0_ext2(dir, pd, body),
        3 => fig0_ext3(dir, body),
        5 => fig0_ext5(dir, body),
        8 => fig0_ext8(pd, body),
        9 => fig0_ext9(dir, body),
        10 => {
            if let Err(e) = fig0_ext10(dir, callbacks, body) {
                log::debug!("fic: skipping malformed FIG0/10: {e}");
            }
        }
        13 => {
            if let Err(e) = fig0_ext13(body) {
                log::debug!("fic: skipping malformed FIG0/13: {e}");
            }
        }
        14 => fig0_ext14(dir, body),
        16 => fig0_ext16(dir, body),
        17 => fig0_ext17(dir, body),
        18 => fig0_ext18(body),
        19 => fig0_ext19(body),
        21 => {}
        22 => fig0_ext22(body),
        other => log::debug!("fic: skipping unrecognised FIG0 extension {other}"),
    }
}

/// FIG0/0 — multiplex change indicator. Reconfiguration is out of scope;
/// log and do nothing (spec §4.4, §9 Design Notes).
fn fig0_ext0(_callbacks: &mut dyn FibCallbacks, body: &[u8]) -> Result<(), FigError> {
    require_len(body, 3)?;
    let cursor = BitCursor::new(body);
    let change_flag = cursor.read(16, 2);
    if change_flag != 0 {
        log::warn!("fic: FIG0/0 requests reconfiguration (change_flag={change_flag}), ignoring — retune to pick up changes");
    }
    Ok(())
}

/// FIG0/1 — sub-channel organisation. Per §4.4.1.
fn fig0_ext1(dir: &mut Directory, body: &[u8]) {
    let mut offset = 0usize;
    while offset + 2 <= body.len() {
        let cursor = BitCursor::new(&body[offset..]);
        let sub_ch_id = cursor.read_u6(0) as usize;
        let start_addr = cursor.read(6, 10) as u16;

        if offset + 3 > body.len() {
            break;
        }
        let long_form = cursor.read_u1(16) != 0;

        let sub_ch = sub_ch_id < crate::directory::NUM_SUBCHANNELS;

        if long_form {
            if offset + 4 > body.len() {
                break;
            }
            let option = cursor.read_u3(17);
            let prot_level_raw = cursor.read_u2(20);
            let size = cursor.read(22, 10) as u16;

            let (stored_prot_level, bit_rate) = match option {
                0 => (
                    prot_level_raw as u8,
                    size / EEP_A_DIVISORS[prot_level_raw as usize] * 8,
                ),
                1 => (
                    prot_level_raw as u8 + 4,
                    size / EEP_B_DIVISORS[prot_level_raw as usize] * 32,
                ),
                _ => (0, 0),
            };

            if sub_ch {
                let entry = &mut dir.sub_channels[sub_ch_id];
                entry.start_addr = Some(start_addr);
                entry.short_form = false;
                entry.length = Some(size);
                entry.prot_level = Some(stored_prot_level);
                entry.bit_rate = Some(bit_rate);
            }
            offset += 4;
        } else {
            let table_index = cursor.read_u6(18) as usize;
            let (length, prot_level, bit_rate) = SHORT_FORM_TABLE[table_index];

            if sub_ch {
                let entry = &mut dir.sub_channels[sub_ch_id];
                entry.start_addr = Some(start_addr);
                entry.short_form = true;
                entry.length = Some(length);
                entry.prot_level = Some(prot_level);
                entry.bit_rate = Some(bit_rate);
            }
            offset += 3;
        }
    }
}

/// FIG0/2 — service-to-component binding. Resolves the "SId read twice"
/// anomaly flagged in spec §9: a single clean SId read, 16 or 32 bits
/// depending on the PD flag.
fn fig0_ext2(dir: &mut Directory, pd: bool, body: &[u8]) {
    let mut offset = 0usize;
    while offset < body.len() {
        let cursor = BitCursor::new(&body[offset..]);
        let sid_width = if pd { 32 } else { 16 };
        if offset + sid_width / 8 + 1 > body.len() {
            break;
        }
        let sid = cursor.read(0, sid_width as u32);
        let mut bit_offset = sid_width + 4; // skip 4-bit Rfa/CAId
        let num_components = cursor.read_u4(bit_offset);
        bit_offset += 4;

        for (i, _) in (0..num_components).enumerate() {
            if bit_offset + 16 > body.len() * 8 {
                break;
            }
            let component_nr = i as u8;
            let t_mid = cursor.read_u2(bit_offset);
            match t_mid {
                0 => {
                    let asc_ty = cursor.read_u6(bit_offset + 2);
                    let sub_ch_id = cursor.read_u6(bit_offset + 8);
                    let ps_flag = cursor.read_u1(bit_offset + 14) != 0;
                    dir.bind_audio_service(0, sid, component_nr, sub_ch_id as u8, ps_flag, asc_ty as u8);
                }
                3 => {
                    let sc_id = cursor.read(bit_offset + 2, 12) as u16;
                    let ps_flag = cursor.read_u1(bit_offset + 14) != 0;
                    let ca_flag = cursor.read_u1(bit_offset + 15) != 0;
                    dir.bind_packet_service(3, sid, component_nr, sc_id, ps_flag, ca_flag);
                }
                _ => {}
            }
            bit_offset += 16;
        }

        offset += bit_offset / 8;
    }
}

/// FIG0/3 — packet-mode component details. No-op if the target component
/// was never declared by FIG0/2 (spec §7).
fn fig0_ext3(dir: &mut Directory, body: &[u8]) {
    let mut offset = 0usize;
    while offset + 7 <= body.len() {
        let cursor = BitCursor::new(&body[offset..]);
        let sc_id = cursor.read(0, 12) as u16;
        let dg_flag = cursor.read_u1(16) != 0;
        let dsc_ty = cursor.read_u6(18) as u8;
        let sub_ch_id = cursor.read_u6(24) as u8;
        let packet_address = cursor.read(30, 10) as u16;

        if let Some(component) = dir.find_packet_component_mut(sc_id) {
            component.sub_channel_id = Some(sub_ch_id);
            component.dsc_ty = dsc_ty;
            component.dg_flag = dg_flag;
            component.packet_address = packet_address;
        }

        offset += 7;
    }
}

/// FIG0/5 — service component language, short form only (spec §4.4).
fn fig0_ext5(dir: &mut Directory, body: &[u8]) {
    let mut offset = 0usize;
    while offset < body.len() {
        let cursor = BitCursor::new(&body[offset..]);
        let ls_flag = cursor.read_u1(0) != 0;
        if ls_flag {
            offset += 3; // long form, parsed-and-ignored
            continue;
        }

        let msc_fic_flag = cursor.read_u1(1) != 0;
        if !msc_fic_flag {
            let sub_ch_id = cursor.read_u6(2) as usize;
            let language = cursor.read_u8(8) as u8;
            if sub_ch_id < crate::directory::NUM_SUBCHANNELS {
                dir.sub_channels[sub_ch_id].language = language;
            }
        }
        offset += 2;
    }
}

/// FIG0/8 — service component global identifier. Parsed for size only;
/// never persisted (spec §4.4).
fn fig0_ext8(pd: bool, body: &[u8]) {
    let sid_width = if pd { 32 } else { 16 };
    let mut offset = 0usize;
    while offset < body.len() {
        let remaining = body.len() - offset;
        // Need at least the SId plus the extension/SCIds byte.
        if remaining < 3 {
            break;
        }
        let cursor = BitCursor::new(&body[offset..]);
        if offset + sid_width / 8 + 1 > body.len() {
            break;
        }
        let mut bit_offset = sid_width;
        let extension_flag = cursor.read_u1(bit_offset) != 0;
        bit_offset += 8; // extension flag + SCIds nibble + Rfa

        if remaining * 8 <= bit_offset {
            break;
        }
        let ls_flag = cursor.read_u1(bit_offset + 8);
        if ls_flag == 1 {
            bit_offset += 16;
        } else {
            bit_offset += 8;
        }
        if extension_flag {
            bit_offset += 8;
        }

        offset += bit_offset.div_ceil(8).max(1);
    }
}

/// FIG0/9 — country, LTO & international table. Only the offset is
/// recorded (spec §9: no time-zone identifier is kept).
fn fig0_ext9(dir: &mut Directory, body: &[u8]) {
    if body.is_empty() {
        return;
    }
    let byte0 = body[0];
    let sign_negative = (byte0 & 0x20) != 0;
    let magnitude = (byte0 >> 1) & 0x0F;
    let half_hour = (byte0 & 0x01) != 0;

    dir.date_time.hour_offset = if sign_negative {
        -(magnitude as i8)
    } else {
        magnitude as i8
    };
    dir.date_time.minute_offset = if half_hour { 30 } else { 0 };
}

/// FIG0/10 — date & time. MJD→Gregorian conversion follows welle.io's
/// integer algorithm, valid across 1900-01-01..2100-12-31 (spec §8).
fn fig0_ext10(
    dir: &mut Directory,
    callbacks: &mut dyn FibCallbacks,
    body: &[u8],
) -> Result<(), FigError> {
    require_len(body, 5)?;
    let cursor = BitCursor::new(body);
    let mjd = cursor.read(1, 17) as i64;
    let (year, month, day) = mjd_to_gregorian(mjd);

    let utc_flag = cursor.read_u1(20) != 0;
    let hour = cursor.read_u5(21) as u8;
    let minutes = cursor.read_u6(26) as u8;

    if minutes != dir.date_time.minutes {
        dir.date_time.seconds = 0;
    }
    dir.date_time.minutes = minutes;

    if utc_flag {
        dir.date_time.seconds = cursor.read_u6(32) as u8;
    }

    dir.date_time.year = year as i32;
    dir.date_time.month = month as u8;
    dir.date_time.day = day as u8;
    dir.date_time.hour = hour;
    dir.date_flag = true;

    callbacks.on_date_time_update(&dir.date_time);
    Ok(())
}

fn mjd_to_gregorian(mjd: i64) -> (i64, i64, i64) {
    let j = mjd + 2400001 + 32044;
    let g = j / 146097;
    let dg = j % 146097;
    let c = ((dg / 36524) + 1) * 3 / 4;
    let dc = dg - c * 36524;
    let b = dc / 1461;
    let db = dc % 1461;
    let a = ((db / 365) + 1) * 3 / 4;
    let da = db - a * 365;
    let y = g * 400 + c * 100 + b * 4 + a;
    let m = ((da * 5 + 308) / 153) - 2;
    let d = da - ((m + 4) * 153 / 5) + 122;
    let year = y - 4800 + ((m + 2) / 12);
    let month = ((m + 2) % 12) + 1;
    let day = d + 1;
    (year, month, day)
}

/// FIG0/13 — user-application information. Recognised types are only
/// acknowledged via logging; nothing is persisted (spec §4.4).
fn fig0_ext13(body: &[u8]) -> Result<(), FigError> {
    // PD is not observable from this body slice alone; both widths are
    // tried defensively but the common case (PD=0) covers normal streams.
    require_len(body, 3)?;
    let cursor = BitCursor::new(body);
    let mut bit_offset = 16usize; // SId (16-bit form)
    if bit_offset / 8 >= body.len() {
        return Ok(());
    }
    let num_applications = cursor.read_u4(bit_offset + 4);
    bit_offset += 8;

    for _ in 0..num_applications {
        if bit_offset + 16 > body.len() * 8 {
            break;
        }
        let app_type = cursor.read(bit_offset, 11);
        let length = cursor.read_u5(bit_offset + 11);
        bit_offset += 16 + length as usize * 8;

        let app = crate::tables::UserApplication::from(app_type as u16);
        log::debug!("fic: FIG0/13 acknowledges user application {app:?}");
    }
    Ok(())
}

/// FIG0/14 — FEC scheme. The sub-channel table is index-addressed by
/// `sub_ch_id`, so no search is needed (spec §3/§4.4).
fn fig0_ext14(dir: &mut Directory, body: &[u8]) {
    for &byte in body {
        let sub_ch_id = (byte >> 2) as usize;
        let fec_scheme = byte & 0x03;
        if sub_ch_id < crate::directory::NUM_SUBCHANNELS {
            dir.sub_channels[sub_ch_id].fec_scheme = fec_scheme;
        }
    }
}

/// FIG0/16 — program number. First-sight only (spec §4.4).
fn fig0_ext16(dir: &mut Directory, body: &[u8]) {
    let mut offset = 0usize;
    while offset + 4 <= body.len() {
        let cursor = BitCursor::new(&body[offset..]);
        let sid = cursor.read(0, 16);
        let p_num = cursor.read(16, 16) as u16;

        let service = dir.find_or_create_service(sid);
        if !service.has_pnum {
            service.program_number = p_num;
            service.has_pnum = true;
        }
        offset += 4;
    }
}

/// FIG0/17 — program type and language. Bit layout follows the original
/// exactly, since spec §4.4 leaves widths unspecified.
fn fig0_ext17(dir: &mut Directory, body: &[u8]) {
    let mut offset_bits = 0usize;
    while offset_bits / 8 < body.len() {
        let record_start = offset_bits;
        if record_start / 8 + 4 > body.len() {
            break;
        }
        let cursor = BitCursor::new(body);
        let sid = cursor.read(record_start, 16);
        let l_flag = cursor.read_u1(record_start + 18) != 0;
        let cc_flag = cursor.read_u1(record_start + 19) != 0;

        let service = dir.find_or_create_service(sid);

        let mut cursor_pos = record_start;
        if l_flag {
            if record_start + 32 > body.len() * 8 {
                break;
            }
            let language = cursor.read_u8(record_start + 24) as u8;
            service.language = language;
            service.has_language = true;
            cursor_pos += 8;
        }

        if cursor_pos + 27 + 5 > body.len() * 8 + 8 {
            // still attempt; record may be truncated at the FIB boundary
        }
        let program_type = cursor.read_u5(cursor_pos + 27) as u8;
        service.program_type = program_type;

        offset_bits = if cc_flag {
            cursor_pos + 40
        } else {
            cursor_pos + 32
        };
    }
}

/// FIG0/18 — announcement support. Size-advancement only (Non-goal).
fn fig0_ext18(body: &[u8]) {
    let mut offset_bits = 0usize;
    while offset_bits / 8 + 1 < body.len() {
        if offset_bits + 40 > body.len() * 8 {
            break;
        }
        let cursor = BitCursor::new(body);
        let num_clusters = cursor.read_u5(offset_bits + 35);
        offset_bits += 40 + num_clusters as usize * 8;
    }
}

/// FIG0/19 — announcement switching. Size-advancement only (Non-goal).
fn fig0_ext19(body: &[u8]) {
    let mut offset_bits = 0usize;
    while offset_bits / 8 + 1 < body.len() {
        if offset_bits + 32 > body.len() * 8 {
            break;
        }
        let cursor = BitCursor::new(body);
        let region_flag = cursor.read_u1(offset_bits + 25) != 0;
        offset_bits += if region_flag { 40 } else { 32 };
    }
}

/// FIG0/22 — transmitter identification. Size-advancement only; the
/// MS=1 stride is carried unchanged from the original source (spec §9
/// Open Question: unverified against the standard).
fn fig0_ext22(body: &[u8]) {
    let mut used = 0usize;
    while used < body.len() {
        if used + 2 > body.len() {
            break;
        }
        let cursor = BitCursor::new(&body[used..]);
        let ms = cursor.read_u1(0);
        if ms == 0 {
            used += 6;
        } else {
            let no_subfields = cursor.read_u3(13);
            used += (16 + no_subfields as usize * 48) / 8;
        }
    }
}

fn decode_fig1(dir: &mut Directory, callbacks: &mut dyn FibCallbacks, data: &[u8]) {
    if data.is_empty() {
        return;
    }
    let header = data[0];
    let charset = header >> 4;
    let oe = (header & 0x08) != 0;
    let ext = header & 0x07;
    let body = &data[1..];

    if oe {
        return; // Other Ensemble cross-references are out of scope
    }

    match ext {
        0 => {
            if let Err(e) = fig1_ext0_ensemble_label(dir, callbacks, charset, body) {
                log::debug!("fic: skipping malformed FIG1/0: {e}");
            }
        }
        1 => {
            if let Err(e) = fig1_ext1_service_label_16(dir, callbacks, charset, body) {
                log::debug!("fic: skipping malformed FIG1/1: {e}");
            }
        }
        5 => {
            if let Err(e) = fig1_ext5_service_label_32(dir, callbacks, charset, body) {
                log::debug!("fic: skipping malformed FIG1/5: {e}");
            }
        }
        other => log::debug!("fic: skipping unhandled FIG1 extension {other}"),
    }
}

fn label16(body: &[u8], offset: usize) -> Option<[u8; 16]> {
    let slice = body.get(offset..offset + 16)?;
    let mut buf = [0u8; 16];
    buf.copy_from_slice(slice);
    Some(buf)
}

/// FIG1/0 — ensemble label. `on_new_ensemble_name` fires exactly once per
/// ensemble epoch (spec §3, scenario S3).
fn fig1_ext0_ensemble_label(
    dir: &mut Directory,
    callbacks: &mut dyn FibCallbacks,
    charset: u8,
    body: &[u8],
) -> Result<(), FigError> {
    require_len(body, 18)?;
    let bytes = label16(body, 2).ok_or(FigError::InvalidSize {
        min: 18,
        actual: body.len(),
    })?;
    let label = decode_label(&bytes, charset);

    dir.ensemble_name = label.clone();
    dir.is_synced = true;
    if dir.first_time {
        callbacks.on_new_ensemble_name(&label);
        dir.first_time = false;
    }
    Ok(())
}

/// FIG1/1 — 16-bit service label (spec scenario S4).
fn fig1_ext1_service_label_16(
    dir: &mut Directory,
    callbacks: &mut dyn FibCallbacks,
    charset: u8,
    body: &[u8],
) -> Result<(), FigError> {
    require_len(body, 18)?;
    let cursor = BitCursor::new(body);
    let sid = cursor.read(0, 16);
    let bytes = label16(body, 2).ok_or(FigError::InvalidSize {
        min: 18,
        actual: body.len(),
    })?;

    let service = dir.find_or_create_service(sid);
    if service.label.is_empty() {
        let label = decode_label(&bytes, charset);
        service.label = label.clone();
        callbacks.on_service_detected(sid, &label);
    }
    Ok(())
}

/// FIG1/5 — 32-bit service label, used for data services.
fn fig1_ext5_service_label_32(
    dir: &mut Directory,
    callbacks: &mut dyn FibCallbacks,
    charset: u8,
    body: &[u8],
) -> Result<(), FigError> {
    require_len(body, 20)?;
    let cursor = BitCursor::new(body);
    let sid = cursor.read(0, 32);
    let bytes = label16(body, 4).ok_or(FigError::InvalidSize {
        min: 20,
        actual: body.len(),
    })?;

    let service = dir.find_or_create_service(sid);
    if service.label.is_empty() {
        let label = decode_label(&bytes, charset);
        service.label = label.clone();
        callbacks.on_service_detected(sid, &label);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::Directory;

    fn fib_with_figs(figs: &[Vec<u8>]) -> [u8; 30] {
        let mut buf = [0u8; 30];
        let mut pos = 0;
        for fig in figs {
            buf[pos..pos + fig.len()].copy_from_slice(fig);
            pos += fig.len();
        }
        // FIGtype 7 sentinel in remaining bytes
        if pos < 30 {
            buf[pos] = 0b1110_0000;
        }
        buf
    }

    fn fig0_header(ext: u8, body_len: u8) -> Vec<u8> {
        // type=0 (3 bits), length-1 = body_len (5 bits)
        vec![body_len - 1, ext & 0x1F]
    }

    #[test]
    fn fig_length_zero_advances_by_one_byte() {
        let mut dir = Directory::new();
        let mut cb = NullCallbacks;
        // FIG with length field 0 -> body is 1 byte (the type/ext byte itself)
        let mut buf = [0u8; 30];
        buf[0] = 0b111_00000; // FIGtype 7 immediately -> terminate
        process_fib(&mut dir, &mut cb, &buf);
        // no panic, nothing decoded
        assert!(dir.services.is_empty());
    }

    #[test]
    fn figtype_7_terminates_mid_fib() {
        let mut dir = Directory::new();
        let mut cb = NullCallbacks;
        let mut buf = [0u8; 30];
        buf[0] = 0b111_00000; // FIGtype 7 at offset 0
        buf[1] = 0xFF; // would be garbage if parsing continued
        process_fib(&mut dir, &mut cb, &buf);
        assert!(dir.services.is_empty());
    }

    #[test]
    fn fig0_1_short_form_matches_seed_scenario_s1() {
        let mut dir = Directory::new();
        // record: sub_ch_id=1 (6 bits), start_addr=100 (10 bits), short form (1 bit=0), table_index=6 (6 bits)
        let sub_ch_id: u32 = 1;
        let start_addr: u32 = 100;
        let table_index: u32 = 6;
        let rec: u32 = ((sub_ch_id << 18) | (start_addr << 8)) | table_index;
        let rec_bytes = [(rec >> 16) as u8, (rec >> 8) as u8, rec as u8];
        fig0_ext1(&mut dir, &rec_bytes);

        let sc = &dir.sub_channels[1];
        assert_eq!(sc.start_addr, Some(100));
        assert!(sc.short_form);
        assert_eq!(sc.length, Some(29));
        assert_eq!(sc.prot_level, Some(4));
        assert_eq!(sc.bit_rate, Some(48));
    }

    #[test]
    fn fig0_2_binds_audio_component_s2() {
        let mut dir = Directory::new();
        // SId=0x1234 (16 bits), pd=0
        // header byte: Rfa(4)=0, numComponents(4)=1
        // component: TMid=0(2bits),ASCTy=63(6bits),SubChId=1(6bits),PS=1(1bit),pad(1bit)
        let sid: u16 = 0x1234;
        let mut bits: Vec<u8> = sid.to_be_bytes().to_vec();
        bits.push(0x01); // Rfa=0, numComponents=1
        let asc_ty: u32 = 63;
        let sub_ch_id: u32 = 1;
        let comp: u32 = (asc_ty << 8) | (sub_ch_id << 2) | (1 << 1);
        bits.push((comp >> 8) as u8);
        bits.push(comp as u8);

        fig0_ext2(&mut dir, false, &bits);

        assert_eq!(dir.services.len(), 1);
        assert_eq!(dir.services[0].service_id, 0x1234);
        assert_eq!(dir.components.len(), 1);
        let c = &dir.components[0];
        assert_eq!(c.t_mid, 0);
        assert_eq!(c.sub_channel_id, Some(1));
        assert_eq!(c.asc_ty, 63);
        assert!(c.ps_flag);
    }

    #[test]
    fn fig0_2_binds_two_components_with_distinct_component_nr() {
        let mut dir = Directory::new();
        // SId=0x1234 (16 bits), pd=0, numComponents=2
        let sid: u16 = 0x1234;
        let mut bits: Vec<u8> = sid.to_be_bytes().to_vec();
        bits.push(0x02); // Rfa=0, numComponents=2

        let comp0: u32 = (63u32 << 8) | (1u32 << 2) | (1 << 1); // ASCTy=63, SubChId=1, PS=1
        bits.push((comp0 >> 8) as u8);
        bits.push(comp0 as u8);

        let comp1: u32 = (10u32 << 8) | (2u32 << 2); // ASCTy=10, SubChId=2, PS=0
        bits.push((comp1 >> 8) as u8);
        bits.push(comp1 as u8);

        fig0_ext2(&mut dir, false, &bits);

        assert_eq!(dir.services.len(), 1);
        assert_eq!(dir.components.len(), 2);
        assert_eq!(dir.components[0].component_nr, 0);
        assert_eq!(dir.components[0].sub_channel_id, Some(1));
        assert_eq!(dir.components[0].asc_ty, 63);
        assert_eq!(dir.components[1].component_nr, 1);
        assert_eq!(dir.components[1].sub_channel_id, Some(2));
        assert_eq!(dir.components[1].asc_ty, 10);
    }

    #[test]
    fn fig1_0_ensemble_label_fires_callback_once_s3() {
        struct Counter {
            names: Vec<String>,
        }
        impl FibCallbacks for Counter {
            fn on_new_ensemble_name(&mut self, name: &str) {
                self.names.push(name.to_string());
            }
            fn on_service_detected(&mut self, _id: u32, _label: &str) {}
            fn on_date_time_update(&mut self, _dt: &DateTime) {}
        }

        let mut dir = Directory::new();
        let mut cb = Counter { names: vec![] };

        let mut fig = vec![0u8]; // charset=0,oe=0,ext=0
        fig.extend_from_slice(&0u16.to_be_bytes()); // EId
        fig.extend_from_slice(b"MyEnsemble      "); // 16 bytes, 10 + 6 trailing spaces

        decode_fig1(&mut dir, &mut cb, &fig);
        decode_fig1(&mut dir, &mut cb, &fig);

        assert_eq!(dir.ensemble_name, "MyEnsemble");
        assert_eq!(cb.names, vec!["MyEnsemble".to_string()]);
    }

    #[test]
    fn fig0_10_date_time_matches_seed_scenario_s6() {
        struct Recorder {
            seen: Option<DateTime>,
        }
        impl FibCallbacks for Recorder {
            fn on_new_ensemble_name(&mut self, _n: &str) {}
            fn on_service_detected(&mut self, _id: u32, _l: &str) {}
            fn on_date_time_update(&mut self, dt: &DateTime) {
                self.seen = Some(*dt);
            }
        }

        let mjd: u64 = 58849; // 2020-01-01
        let hour: u64 = 12;
        let minutes: u64 = 34;
        let seconds: u64 = 56;

        // Matches fig0_ext10's field offsets exactly: [0 spare][mjd:1..17]
        // [18,19 spare][utc_flag:20][hour:21..25][minutes:26..31][spare:32..31?]
        // laid out MSB-first across 5 bytes (40 bits): bit0=spare, bits1-17=mjd,
        // bits18-19=spare, bit20=utc_flag, bits21-25=hour, bits26-31=minutes,
        // bits32-37=seconds, bits38-39=spare.
        fn set_bits(buf: &mut [u8], offset: usize, width: u32, value: u64) {
            for i in 0..width as usize {
                let bit = (value >> (width as usize - 1 - i)) & 1;
                let pos = offset + i;
                let byte_idx = pos / 8;
                let bit_in_byte = 7 - (pos % 8);
                if bit == 1 {
                    buf[byte_idx] |= 1 << bit_in_byte;
                }
            }
        }

        let mut body = vec![0u8; 5];
        set_bits(&mut body, 1, 17, mjd);
        set_bits(&mut body, 20, 1, 1); // utc_flag
        set_bits(&mut body, 21, 5, hour);
        set_bits(&mut body, 26, 6, minutes);
        set_bits(&mut body, 32, 6, seconds);

        let mut dir = Directory::new();
        let mut cb = Recorder { seen: None };
        assert!(fig0_ext10(&mut dir, &mut cb, &body).is_ok());

        let dt = cb.seen.expect("callback fired");
        assert_eq!(dt.year, 2020);
        assert_eq!(dt.month, 1);
        assert_eq!(dt.day, 1);
        assert_eq!(dt.hour, 12);
        assert_eq!(dt.minutes, 34);
        assert_eq!(dt.seconds, 56);
    }

    #[test]
    fn fig0_10_rejects_a_body_too_short_for_its_fields() {
        struct Recorder {
            fired: bool,
        }
        impl FibCallbacks for Recorder {
            fn on_new_ensemble_name(&mut self, _n: &str) {}
            fn on_service_detected(&mut self, _id: u32, _l: &str) {}
            fn on_date_time_update(&mut self, _dt: &DateTime) {
                self.fired = true;
            }
        }
        let mut dir = Directory::new();
        let mut cb = Recorder { fired: false };
        let body = [0u8; 4]; // one byte short of the 5 required
        assert!(fig0_ext10(&mut dir, &mut cb, &body).is_err());
        assert!(!cb.fired);
    }

    #[test]
    fn mjd_conversion_matches_known_date() {
        assert_eq!(mjd_to_gregorian(58849), (2020, 1, 1));
        assert_eq!(mjd_to_gregorian(15020), (1900, 1, 1));
        assert_eq!(mjd_to_gregorian(88433), (2100, 12, 31));
    }

    #[test]
    fn fig0_3_is_noop_when_component_absent() {
        let mut dir = Directory::new();
        let body = [0u8; 7];
        fig0_ext3(&mut dir, &body);
        assert!(dir.components.is_empty());
    }

    #[test]
    fn fig0_14_sets_fec_scheme_by_index() {
        let mut dir = Directory::new();
        // sub_ch_id=5 (6 bits), fec=2 (2 bits)
        let byte = (5u8 << 2) | 2;
        fig0_ext14(&mut dir, &[byte]);
        assert_eq!(dir.sub_channels[5].fec_scheme, 2);
    }

    #[test]
    fn process_fib_skips_unknown_fig_types_by_length() {
        let mut dir = Directory::new();
        let mut cb = NullCallbacks;
        let mut buf = [0u8; 30];
        // FIGtype 5 (unknown), length-1=2 -> body 3 bytes, then FIG type 7
        buf[0] = (5 << 5) | 2;
        buf[1] = 0xAA;
        buf[2] = 0xBB;
        buf[3] = 0xCC;
        buf[4] = 0b111_00000;
        process_fib(&mut dir, &mut cb, &buf);
        assert!(dir.services.is_empty());
    }

    #[test]
    fn fig0_header_helper_unused_silences_dead_code() {
        let _ = fig0_header(0, 1);
        let _ = fib_with_figs(&[]);
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Wire encodings of the data model and the computed products.
//!
//! A scan header is written once per bundle; the spectra and quantities
//! inside the bundle refer to it rather than carrying their own copy.

use std::{
    io::{self, Read, Write},
    sync::Arc,
};

use super::{
    codec::{wire_struct, Decode, Encode},
    WireError,
};
use crate::{
    ampphase::{AmpPhase, BaselineSpectrum, BinSpectrum, Extents, UnflaggedSpectrum},
    averaging::{BaselineQuantities, BinQuantities, ClosurePhase, QuantityExtents, VisQuantities},
    data::{
        Antenna, Feed, IfWindow, Pol, ScanHeader, SiteRecord, Source, SyscalAntenna, SyscalCell,
        SyscalPol, SyscalSlice, TsysState, WindowKind,
    },
    index::TimeRange,
    options::{AmpPhaseOptions, AveragingMethod, Modifier, TvChannels, WindowOptions},
    products::{SpectrumBundle, VisBundle, VisCycle},
};

impl Encode for Pol {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.code().encode(w)
    }
}

impl Decode for Pol {
    fn decode<R: Read>(r: &mut R) -> Result<Self, WireError> {
        let code = i32::decode(r)?;
        Pol::from_code(code).ok_or(WireError::InvalidValue {
            what: "polarisation code",
            value: code.to_string(),
        })
    }
}

impl Encode for Feed {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        (self.index() as i32).encode(w)
    }
}

impl Decode for Feed {
    fn decode<R: Read>(r: &mut R) -> Result<Self, WireError> {
        match i32::decode(r)? {
            0 => Ok(Feed::X),
            1 => Ok(Feed::Y),
            v => Err(WireError::InvalidValue {
                what: "feed",
                value: v.to_string(),
            }),
        }
    }
}

/// Sent as the pair of applied flags (online, computed).
impl Encode for TsysState {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.online_applied().encode(w)?;
        self.computed_applied().encode(w)
    }
}

impl Decode for TsysState {
    fn decode<R: Read>(r: &mut R) -> Result<Self, WireError> {
        let online = bool::decode(r)?;
        let computed = bool::decode(r)?;
        TsysState::from_flags(online, computed).ok_or(WireError::InvalidValue {
            what: "Tsys state",
            value: "both online and computed applied".to_string(),
        })
    }
}

impl Encode for WindowKind {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let code: i32 = match self {
            WindowKind::Continuum => 0,
            WindowKind::Zoom => 1,
        };
        code.encode(w)
    }
}

impl Decode for WindowKind {
    fn decode<R: Read>(r: &mut R) -> Result<Self, WireError> {
        match i32::decode(r)? {
            0 => Ok(WindowKind::Continuum),
            1 => Ok(WindowKind::Zoom),
            v => Err(WireError::InvalidValue {
                what: "window kind",
                value: v.to_string(),
            }),
        }
    }
}

/// Sent as its bit mask.
impl Encode for AveragingMethod {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.bits().encode(w)
    }
}

impl Decode for AveragingMethod {
    fn decode<R: Read>(r: &mut R) -> Result<Self, WireError> {
        let bits = i32::decode(r)?;
        AveragingMethod::from_bits(bits).map_err(|e| WireError::InvalidValue {
            what: "averaging method",
            value: e.to_string(),
        })
    }
}

wire_struct!(Source { name, ra_deg, dec_deg });
wire_struct!(Antenna {
    number,
    station,
    xyz_m
});
wire_struct!(IfWindow {
    centre_freq_mhz,
    bandwidth_mhz,
    num_channels,
    num_stokes,
    sideband,
    chain,
    label,
    stokes,
    kind,
    chain_index,
    names,
});
wire_struct!(ScanHeader {
    obsdate,
    ut_seconds,
    obstype,
    calcode,
    cycle_time_s,
    sources,
    windows,
    antennas,
});

wire_struct!(TvChannels { min, max });
wire_struct!(Modifier {
    start_mjd,
    end_mjd,
    delay_ns,
    phase_rad,
    noise_diode_jy,
});
wire_struct!(WindowOptions {
    centre_freq_mhz,
    bandwidth_mhz,
    num_channels,
    tvchannels,
    delay_averaging,
    averaging,
    modifiers,
});
wire_struct!(AmpPhaseOptions {
    phase_in_degrees,
    include_flagged_data,
    windows,
    systemp_reverse_online,
    systemp_apply_computed,
    reference_antenna,
});

wire_struct!(SyscalPol {
    tsys,
    computed_tsys,
    applied,
    gtp,
    sdo,
    caljy,
    computed_gtp,
    computed_sdo,
});
wire_struct!(SyscalAntenna {
    antenna,
    xyphase_deg,
    xyamp_jy,
    parangle_deg,
    tracking_error_max_arcsec,
    tracking_error_rms_arcsec,
    flagging,
    pol,
});
wire_struct!(SyscalSlice {
    window,
    feed,
    antennas
});
wire_struct!(SyscalCell {
    window,
    antenna,
    tsys,
    computed_tsys,
    applied,
    xyphase_deg,
    xyamp_jy,
    parangle_deg,
    tracking_error_max_arcsec,
    tracking_error_rms_arcsec,
    flagging,
    gtp,
    sdo,
    caljy,
    computed_gtp,
    computed_sdo,
});
wire_struct!(SiteRecord {
    temperature_c,
    pressure_mbar,
    humidity_percent,
    wind_speed_kmh,
    wind_direction_deg,
    rain_gauge_mm,
    weather_valid,
    seemon_phase_deg,
    seemon_rms_um,
    seemon_valid,
});

wire_struct!(Extents {
    amplitude,
    phase,
    real,
    imag
});
wire_struct!(UnflaggedSpectrum {
    channel,
    frequency_ghz,
    weight,
    amplitude,
    phase,
    raw,
});
wire_struct!(BinSpectrum {
    bin,
    flagged_bad,
    weight,
    amplitude,
    phase,
    raw,
    unflagged,
});
wire_struct!(BaselineSpectrum {
    baseline,
    bins,
    extents
});

wire_struct!(BinQuantities {
    bin,
    amplitude,
    phase,
    delay_ns
});
wire_struct!(BaselineQuantities {
    baseline,
    flagged_bad,
    bins
});
wire_struct!(ClosurePhase { antennas, phase });
wire_struct!(QuantityExtents {
    amplitude,
    phase,
    delay_ns,
    closure_phase,
});

wire_struct!(TimeRange {
    cycle_time_days,
    earliest_mjd,
    latest_mjd,
});

fn encode_ampphase_body<W: Write>(ap: &AmpPhase, w: &mut W) -> io::Result<()> {
    ap.ut_seconds.encode(w)?;
    ap.mjd.encode(w)?;
    ap.window.encode(w)?;
    ap.pol.encode(w)?;
    ap.channels.encode(w)?;
    ap.frequency_ghz.encode(w)?;
    ap.baselines.encode(w)?;
    ap.extents.encode(w)?;
    ap.options.encode(w)?;
    ap.syscal.encode(w)
}

fn decode_ampphase_body<R: Read>(
    r: &mut R,
    header: Arc<ScanHeader>,
) -> Result<AmpPhase, WireError> {
    Ok(AmpPhase {
        header,
        ut_seconds: Decode::decode(r)?,
        mjd: Decode::decode(r)?,
        window: Decode::decode(r)?,
        pol: Decode::decode(r)?,
        channels: Decode::decode(r)?,
        frequency_ghz: Decode::decode(r)?,
        baselines: Decode::decode(r)?,
        extents: Decode::decode(r)?,
        options: Decode::decode(r)?,
        syscal: Decode::decode(r)?,
    })
}

impl Encode for AmpPhase {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.header.encode(w)?;
        encode_ampphase_body(self, w)
    }
}

impl Decode for AmpPhase {
    fn decode<R: Read>(r: &mut R) -> Result<Self, WireError> {
        let header = Arc::new(ScanHeader::decode(r)?);
        decode_ampphase_body(r, header)
    }
}

fn encode_quantities_body<W: Write>(vq: &VisQuantities, w: &mut W) -> io::Result<()> {
    vq.ut_seconds.encode(w)?;
    vq.mjd.encode(w)?;
    vq.window.encode(w)?;
    vq.pol.encode(w)?;
    vq.options.encode(w)?;
    vq.baselines.encode(w)?;
    vq.closures.encode(w)?;
    vq.extents.encode(w)
}

fn decode_quantities_body<R: Read>(
    r: &mut R,
    header: Arc<ScanHeader>,
) -> Result<VisQuantities, WireError> {
    Ok(VisQuantities {
        header,
        ut_seconds: Decode::decode(r)?,
        mjd: Decode::decode(r)?,
        window: Decode::decode(r)?,
        pol: Decode::decode(r)?,
        options: Decode::decode(r)?,
        baselines: Decode::decode(r)?,
        closures: Decode::decode(r)?,
        extents: Decode::decode(r)?,
    })
}

impl Encode for VisQuantities {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.header.encode(w)?;
        encode_quantities_body(self, w)
    }
}

impl Decode for VisQuantities {
    fn decode<R: Read>(r: &mut R) -> Result<Self, WireError> {
        let header = Arc::new(ScanHeader::decode(r)?);
        decode_quantities_body(r, header)
    }
}

/// Write a window-by-pol table of values that share a header.
fn encode_nested<T, W: Write>(
    table: &[Vec<T>],
    w: &mut W,
    body: impl Fn(&T, &mut W) -> io::Result<()>,
) -> io::Result<()> {
    table.len().encode(w)?;
    for row in table {
        row.len().encode(w)?;
        for v in row {
            body(v, w)?;
        }
    }
    Ok(())
}

fn decode_nested<T, R: Read>(
    r: &mut R,
    body: impl Fn(&mut R) -> Result<T, WireError>,
) -> Result<Vec<Vec<T>>, WireError> {
    let num_rows = usize::decode(r)?;
    let mut table = Vec::with_capacity(num_rows.min(64));
    for _ in 0..num_rows {
        let len = usize::decode(r)?;
        let mut row = Vec::with_capacity(len.min(64));
        for _ in 0..len {
            row.push(body(r)?);
        }
        table.push(row);
    }
    Ok(table)
}

impl Encode for SpectrumBundle {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.header.encode(w)?;
        self.ut_seconds.encode(w)?;
        self.mjd.encode(w)?;
        self.options.encode(w)?;
        encode_nested(&self.ampphase, w, encode_ampphase_body)
    }
}

impl Decode for SpectrumBundle {
    fn decode<R: Read>(r: &mut R) -> Result<Self, WireError> {
        let header = Arc::new(ScanHeader::decode(r)?);
        let ut_seconds = f64::decode(r)?;
        let mjd = f64::decode(r)?;
        let options = Decode::decode(r)?;
        let ampphase = decode_nested(r, |r| decode_ampphase_body(r, Arc::clone(&header)))?;
        Ok(SpectrumBundle {
            header,
            ut_seconds,
            mjd,
            ampphase,
            options,
        })
    }
}

/// Cycles of a vis bundle refer to an entry of the bundle's header table.
impl Encode for VisBundle {
    fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mut headers: Vec<&Arc<ScanHeader>> = vec![];
        let mut header_indices = Vec::with_capacity(self.cycles.len());
        for cycle in &self.cycles {
            let existing = headers
                .iter()
                .position(|h| Arc::ptr_eq(h, &cycle.header) || **h == cycle.header);
            let i = match existing {
                Some(i) => i,
                None => {
                    headers.push(&cycle.header);
                    headers.len() - 1
                }
            };
            header_indices.push(i);
        }

        self.mjd_low.encode(w)?;
        self.mjd_high.encode(w)?;
        self.options.encode(w)?;
        headers.len().encode(w)?;
        for header in &headers {
            header.encode(w)?;
        }
        self.cycles.len().encode(w)?;
        for (cycle, header_index) in self.cycles.iter().zip(header_indices) {
            header_index.encode(w)?;
            cycle.ut_seconds.encode(w)?;
            cycle.mjd.encode(w)?;
            cycle.site.encode(w)?;
            cycle.syscal.encode(w)?;
            encode_nested(&cycle.quantities, w, encode_quantities_body)?;
        }
        Ok(())
    }
}

impl Decode for VisBundle {
    fn decode<R: Read>(r: &mut R) -> Result<Self, WireError> {
        let mjd_low = f64::decode(r)?;
        let mjd_high = f64::decode(r)?;
        let options = Decode::decode(r)?;
        let headers: Vec<Arc<ScanHeader>> = Decode::decode(r)?;
        let num_cycles = usize::decode(r)?;
        let mut cycles = Vec::with_capacity(num_cycles.min(4096));
        for _ in 0..num_cycles {
            let header_index = usize::decode(r)?;
            let header = headers
                .get(header_index)
                .cloned()
                .ok_or(WireError::InvalidValue {
                    what: "header index",
                    value: header_index.to_string(),
                })?;
            let ut_seconds = f64::decode(r)?;
            let mjd = f64::decode(r)?;
            let site = Decode::decode(r)?;
            let syscal = Decode::decode(r)?;
            let quantities = decode_nested(r, |r| decode_quantities_body(r, Arc::clone(&header)))?;
            cycles.push(VisCycle {
                header,
                ut_seconds,
                mjd,
                quantities,
                site,
                syscal,
            });
        }
        Ok(VisBundle {
            cycles,
            mjd_low,
            mjd_high,
            options,
        })
    }
}

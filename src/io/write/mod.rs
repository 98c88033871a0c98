// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to write cycle files.

#[cfg(test)]
mod tests;

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use byteorder::{BigEndian, WriteBytesExt};
use log::trace;

use super::format::*;
use crate::data::{IfWindow, ScanHeader, SiteRecord, SyscalCell, VisPoint};

/// Writes scans and cycles in the cycle-file container. Records are written in
/// the order the methods are called; a cycle is a run of points and SYSCAL
/// rows closed by [CycleFileWriter::end_cycle].
pub struct CycleFileWriter<W: Write> {
    inner: W,
    /// The payload of the record being assembled.
    buf: Vec<u8>,
}

impl CycleFileWriter<BufWriter<File>> {
    /// Create a new cycle file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        trace!("Creating cycle file {}", path.as_ref().display());
        CycleFileWriter::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> CycleFileWriter<W> {
    /// Wrap a writer, writing the magic bytes.
    pub fn new(mut inner: W) -> io::Result<Self> {
        inner.write_all(MAGIC)?;
        Ok(CycleFileWriter { inner, buf: vec![] })
    }

    pub fn write_header(&mut self, header: &ScanHeader) -> io::Result<()> {
        let b = &mut self.buf;
        b.clear();
        write_string(b, &header.obsdate)?;
        b.write_f64::<BigEndian>(header.ut_seconds)?;
        write_string(b, &header.obstype)?;
        write_string(b, &header.calcode)?;
        b.write_f64::<BigEndian>(header.cycle_time_s)?;

        b.write_u32::<BigEndian>(header.sources.len() as u32)?;
        for source in &header.sources {
            write_string(b, &source.name)?;
            b.write_f64::<BigEndian>(source.ra_deg)?;
            b.write_f64::<BigEndian>(source.dec_deg)?;
        }

        b.write_u32::<BigEndian>(header.windows.len() as u32)?;
        for window in &header.windows {
            b.write_f64::<BigEndian>(window.centre_freq_mhz)?;
            b.write_f64::<BigEndian>(window.bandwidth_mhz)?;
            b.write_u32::<BigEndian>(window.num_channels as u32)?;
            b.write_i32::<BigEndian>(window.sideband)?;
            b.write_u32::<BigEndian>(window.chain as u32)?;
            b.write_u32::<BigEndian>(window.stokes.len() as u32)?;
            for s in &window.stokes {
                write_string(b, s)?;
            }
        }

        b.write_u32::<BigEndian>(header.antennas.len() as u32)?;
        for antenna in &header.antennas {
            b.write_u32::<BigEndian>(antenna.number as u32)?;
            write_string(b, &antenna.station)?;
            for v in antenna.xyz_m {
                b.write_f64::<BigEndian>(v)?;
            }
        }
        self.flush_record(TAG_HEADER)
    }

    /// Write an (opaque) flag table.
    pub fn write_flag_table(&mut self, contents: &[u8]) -> io::Result<()> {
        self.write_raw_record(TAG_FLAG_TABLE, contents)
    }

    /// Write a data point. The point's channel-major values are written in
    /// Stokes-major order. The antennas are written as they are, so reversed
    /// baselines may be stored.
    pub fn write_point(
        &mut self,
        ut_seconds: f64,
        point: &VisPoint,
        window: &IfWindow,
    ) -> io::Result<()> {
        let b = &mut self.buf;
        b.clear();
        b.write_f64::<BigEndian>(ut_seconds)?;
        b.write_f32::<BigEndian>(point.u_m)?;
        b.write_f32::<BigEndian>(point.v_m)?;
        b.write_f32::<BigEndian>(point.w_m)?;
        b.write_i32::<BigEndian>((256 * point.ant1 + point.ant2) as i32)?;
        b.write_i32::<BigEndian>(point.flag)?;
        b.write_u32::<BigEndian>(point.bin as u32)?;
        b.write_u32::<BigEndian>(point.window as u32)?;
        b.write_u32::<BigEndian>(point.source as u32)?;

        let num_stokes = window.num_stokes;
        let num_values = window.num_values();
        b.write_u32::<BigEndian>(num_values as u32)?;
        for stokes in 0..num_stokes {
            for chan in 0..window.num_channels {
                let v = point.vis[stokes + chan * num_stokes];
                b.write_f32::<BigEndian>(v.re)?;
                b.write_f32::<BigEndian>(v.im)?;
            }
        }
        for stokes in 0..num_stokes {
            for chan in 0..window.num_channels {
                b.write_f32::<BigEndian>(point.weight[stokes + chan * num_stokes])?;
            }
        }
        self.flush_record(TAG_POINT)
    }

    /// Write the SYSCAL values of one (window, antenna). The online-applied
    /// state is preserved; computed values are not stored.
    pub fn write_syscal(&mut self, cell: &SyscalCell) -> io::Result<()> {
        let b = &mut self.buf;
        b.clear();
        b.write_u32::<BigEndian>(cell.window as u32)?;
        b.write_u32::<BigEndian>(cell.antenna as u32)?;
        write_pair(b, cell.tsys)?;
        write_bool(b, cell.applied.online_applied())?;
        b.write_f32::<BigEndian>(cell.xyphase_deg)?;
        b.write_f32::<BigEndian>(cell.xyamp_jy)?;
        b.write_f32::<BigEndian>(cell.parangle_deg)?;
        b.write_f32::<BigEndian>(cell.tracking_error_max_arcsec)?;
        b.write_f32::<BigEndian>(cell.tracking_error_rms_arcsec)?;
        b.write_u32::<BigEndian>(cell.flagging)?;
        write_pair(b, cell.gtp)?;
        write_pair(b, cell.sdo)?;
        write_pair(b, cell.caljy)?;
        self.flush_record(TAG_SYSCAL)
    }

    /// Write the site (weather) row.
    pub fn write_site(&mut self, site: &SiteRecord) -> io::Result<()> {
        let b = &mut self.buf;
        b.clear();
        b.write_u32::<BigEndian>(0)?;
        b.write_u32::<BigEndian>(0)?;
        b.write_f32::<BigEndian>(site.temperature_c)?;
        b.write_f32::<BigEndian>(site.pressure_mbar)?;
        b.write_f32::<BigEndian>(site.humidity_percent)?;
        b.write_f32::<BigEndian>(site.wind_speed_kmh)?;
        b.write_f32::<BigEndian>(site.wind_direction_deg)?;
        b.write_f32::<BigEndian>(site.rain_gauge_mm)?;
        write_bool(b, site.weather_valid)?;
        b.write_f32::<BigEndian>(site.seemon_phase_deg)?;
        b.write_f32::<BigEndian>(site.seemon_rms_um)?;
        write_bool(b, site.seemon_valid)?;
        self.flush_record(TAG_SYSCAL)
    }

    /// Close the current integration.
    pub fn end_cycle(&mut self, ut_seconds: f64) -> io::Result<()> {
        self.buf.clear();
        self.buf.write_f64::<BigEndian>(ut_seconds)?;
        self.flush_record(TAG_END_OF_CYCLE)
    }

    /// Write an arbitrary record.
    pub fn write_raw_record(&mut self, tag: u8, payload: &[u8]) -> io::Result<()> {
        self.inner.write_u8(tag)?;
        self.inner.write_u32::<BigEndian>(payload.len() as u32)?;
        self.inner.write_all(payload)
    }

    fn flush_record(&mut self, tag: u8) -> io::Result<()> {
        let payload = std::mem::take(&mut self.buf);
        let result = self.write_raw_record(tag, &payload);
        self.buf = payload;
        result
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

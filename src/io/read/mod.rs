// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to read cycle files.
//!
//! A [CycleFileReader] owns its file handle and decode buffers; nothing about
//! an open file is shared. Reading alternates between
//! [CycleFileReader::next_scan_header] and [CycleFileReader::next_cycle]:
//!
//! ```text
//! next_scan_header -> Header
//!     next_cycle -> (cycle, DataAvailable)
//!     next_cycle -> (cycle, HeaderAvailable)
//! next_scan_header -> Header
//!     next_cycle -> (cycle, Exhausted)
//! ```

mod error;

pub use error::ReadCycleFileError;

use std::{
    fs::File,
    io::{self, BufReader, Cursor, Read},
    path::{Path, PathBuf},
};

use byteorder::{BigEndian, ReadBytesExt};
use log::{debug, trace};
use num_complex::Complex;

use super::format::*;
use crate::{
    constants::MJD_TOLERANCE_SECONDS,
    data::{
        Antenna, CycleData, IfWindow, ScanHeader, SiteRecord, Source, Syscal, SyscalCell,
        TsysState, VisPoint,
    },
};

/// The result of asking for the next scan header.
#[derive(Debug)]
pub enum HeaderRead {
    Header(ScanHeader),
    /// A flag table was skipped; ask again.
    FlagTable,
    EndOfFile,
}

/// What follows a cycle read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// More cycles of the same scan follow.
    DataAvailable,
    /// A new scan header follows; call [CycleFileReader::next_scan_header].
    HeaderAvailable,
    /// The file has no more data.
    Exhausted,
}

#[derive(Debug)]
pub struct CycleRead {
    /// `None` if no data preceded the status.
    pub cycle: Option<CycleData>,
    pub status: ReadStatus,
}

struct Record {
    tag: u8,
    payload: Vec<u8>,
}

pub struct CycleFileReader<R: Read = BufReader<File>> {
    path: PathBuf,
    inner: R,
    /// A record that was read but belongs to the next call.
    peeked: Option<Record>,
    exhausted: bool,
}

impl CycleFileReader<BufReader<File>> {
    /// Open a cycle file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReadCycleFileError> {
        let path = path.as_ref();
        debug!("Opening cycle file {}", path.display());
        let file = File::open(path).map_err(|source| ReadCycleFileError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        CycleFileReader::new(BufReader::new(file), path)
    }
}

impl<R: Read> CycleFileReader<R> {
    /// Wrap a reader positioned at the start of a cycle file. `path` is only
    /// used in messages.
    pub fn new<P: AsRef<Path>>(mut inner: R, path: P) -> Result<Self, ReadCycleFileError> {
        let path = path.as_ref().to_path_buf();
        let mut magic = [0; 8];
        match inner.read_exact(&mut magic) {
            Ok(()) if &magic == MAGIC => (),
            Ok(()) => return Err(ReadCycleFileError::NotACycleFile { path }),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(ReadCycleFileError::NotACycleFile { path })
            }
            Err(e) => return Err(e.into()),
        }
        Ok(CycleFileReader {
            path,
            inner,
            peeked: None,
            exhausted: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the file.
    pub fn close(self) {
        trace!("Closing {}", self.path.display());
    }

    fn illegal(&self, reason: impl Into<String>) -> ReadCycleFileError {
        ReadCycleFileError::IllegalData {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    /// Get the next record, or `None` at the end of the file.
    fn next_record(&mut self) -> Result<Option<Record>, ReadCycleFileError> {
        if let Some(record) = self.peeked.take() {
            return Ok(Some(record));
        }
        if self.exhausted {
            return Ok(None);
        }

        let tag = match self.inner.read_u8() {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                self.exhausted = true;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let truncated = |e: io::Error| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                Ok(())
            } else {
                Err(e)
            }
        };
        let len = match self.inner.read_u32::<BigEndian>() {
            Ok(l) => l,
            Err(e) => {
                truncated(e)?;
                self.exhausted = true;
                return Err(self.illegal("file ends within a record"));
            }
        };
        let mut payload = vec![];
        let read = (&mut self.inner).take(u64::from(len)).read_to_end(&mut payload)?;
        if read != len as usize {
            self.exhausted = true;
            return Err(self.illegal(format!(
                "record of {len} bytes truncated to {read} bytes"
            )));
        }
        Ok(Some(Record { tag, payload }))
    }

    /// Read the next scan header. Stray cycle records are skipped.
    pub fn next_scan_header(&mut self) -> Result<HeaderRead, ReadCycleFileError> {
        loop {
            let record = match self.next_record()? {
                Some(r) => r,
                None => return Ok(HeaderRead::EndOfFile),
            };
            match record.tag {
                TAG_HEADER => {
                    let header = parse_header(&record.payload)
                        .map_err(|e| self.illegal(format!("bad scan header: {e}")))?;
                    trace!(
                        "Read scan header: {} {} at {} s",
                        header.obsdate,
                        header.source_name(),
                        header.ut_seconds
                    );
                    return Ok(HeaderRead::Header(header));
                }
                TAG_FLAG_TABLE => return Ok(HeaderRead::FlagTable),
                tag => trace!("Skipping record {:?} while looking for a header", tag as char),
            }
        }
    }

    /// Read the next cycle of the scan described by `header`.
    ///
    /// A cycle ends at an end-of-integration record, at a change of time, at
    /// the next scan header or at the end of the file. If any record within
    /// the cycle is malformed, the whole cycle is discarded and
    /// [ReadCycleFileError::IllegalData] is returned; the next call carries on
    /// from the following cycle.
    pub fn next_cycle(&mut self, header: &ScanHeader) -> Result<CycleRead, ReadCycleFileError> {
        let mut points: Vec<VisPoint> = vec![];
        let mut syscal = Syscal::default();
        let mut ut: Option<f64> = None;
        let mut illegal: Option<String> = None;

        let status = loop {
            let record = match self.next_record()? {
                Some(r) => r,
                None => break ReadStatus::Exhausted,
            };
            match record.tag {
                TAG_HEADER => {
                    self.peeked = Some(record);
                    break ReadStatus::HeaderAvailable;
                }

                TAG_FLAG_TABLE => (),

                TAG_POINT => match parse_point(&record.payload, header) {
                    Ok((point_ut, point)) => match ut {
                        Some(t) if (point_ut - t).abs() > MJD_TOLERANCE_SECONDS => {
                            // The time changed without an end-of-integration
                            // record.
                            self.peeked = Some(record);
                            break ReadStatus::DataAvailable;
                        }
                        _ => {
                            ut = Some(point_ut);
                            points.push(point);
                        }
                    },
                    Err(e) => {
                        illegal.get_or_insert(format!("bad data point: {e}"));
                    }
                },

                TAG_SYSCAL => {
                    if let Err(e) = parse_syscal(&record.payload, &mut syscal) {
                        illegal.get_or_insert(format!("bad SYSCAL row: {e}"));
                    }
                }

                TAG_END_OF_CYCLE => {
                    if points.is_empty() && illegal.is_none() {
                        continue;
                    }
                    break ReadStatus::DataAvailable;
                }

                tag => {
                    illegal.get_or_insert(format!("unknown record tag {tag:#04x}"));
                }
            }
        };

        if let Some(reason) = illegal {
            return Err(self.illegal(reason));
        }
        let cycle = ut.map(|ut| CycleData::new(ut, points, syscal));
        Ok(CycleRead { cycle, status })
    }
}

fn parse_header(payload: &[u8]) -> io::Result<ScanHeader> {
    let mut c = Cursor::new(payload);
    let obsdate = read_string(&mut c)?;
    let ut_seconds = c.read_f64::<BigEndian>()?;
    let obstype = read_string(&mut c)?;
    let calcode = read_string(&mut c)?;
    let cycle_time_s = c.read_f64::<BigEndian>()?;

    let num_sources = c.read_u32::<BigEndian>()?;
    let mut sources = Vec::with_capacity(num_sources.min(1024) as usize);
    for _ in 0..num_sources {
        sources.push(Source {
            name: read_string(&mut c)?,
            ra_deg: c.read_f64::<BigEndian>()?,
            dec_deg: c.read_f64::<BigEndian>()?,
        });
    }

    let num_windows = c.read_u32::<BigEndian>()?;
    let mut windows = Vec::with_capacity(num_windows.min(64) as usize);
    for _ in 0..num_windows {
        let centre_freq_mhz = c.read_f64::<BigEndian>()?;
        let bandwidth_mhz = c.read_f64::<BigEndian>()?;
        let num_channels = c.read_u32::<BigEndian>()? as usize;
        let sideband = c.read_i32::<BigEndian>()?;
        let chain = c.read_u32::<BigEndian>()? as usize;
        let num_stokes = c.read_u32::<BigEndian>()?;
        let stokes = (0..num_stokes)
            .map(|_| read_string(&mut c))
            .collect::<io::Result<Vec<_>>>()?;
        windows.push(IfWindow::new(
            centre_freq_mhz,
            bandwidth_mhz,
            num_channels,
            sideband,
            chain,
            stokes,
        ));
    }

    let num_antennas = c.read_u32::<BigEndian>()?;
    let mut antennas = Vec::with_capacity(num_antennas.min(256) as usize);
    for _ in 0..num_antennas {
        let number = c.read_u32::<BigEndian>()? as usize;
        let station = read_string(&mut c)?;
        let mut xyz_m = [0.0; 3];
        for v in xyz_m.iter_mut() {
            *v = c.read_f64::<BigEndian>()?;
        }
        antennas.push(Antenna {
            number,
            station,
            xyz_m,
        });
    }

    Ok(ScanHeader::new(
        obsdate,
        ut_seconds,
        obstype,
        calcode,
        cycle_time_s,
        sources,
        windows,
        antennas,
    ))
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn parse_point(payload: &[u8], header: &ScanHeader) -> io::Result<(f64, VisPoint)> {
    let mut c = Cursor::new(payload);
    let ut = c.read_f64::<BigEndian>()?;
    let u_m = c.read_f32::<BigEndian>()?;
    let v_m = c.read_f32::<BigEndian>()?;
    let w_m = c.read_f32::<BigEndian>()?;
    let baseline = c.read_i32::<BigEndian>()?;
    let flag = c.read_i32::<BigEndian>()?;
    let bin = c.read_u32::<BigEndian>()? as usize;
    let window_label = c.read_u32::<BigEndian>()? as usize;
    let source = c.read_u32::<BigEndian>()? as usize;
    let num_values = c.read_u32::<BigEndian>()? as usize;

    if baseline < 257 {
        return Err(invalid(format!("baseline code {baseline} is invalid")));
    }
    let (ant1, ant2) = ((baseline / 256) as usize, (baseline % 256) as usize);
    if ant2 == 0 {
        return Err(invalid(format!("baseline code {baseline} is invalid")));
    }
    if bin == 0 {
        return Err(invalid("bin numbers start at 1".to_string()));
    }
    let window = header
        .window(window_label)
        .ok_or_else(|| invalid(format!("window {window_label} isn't in the scan header")))?;
    if num_values != window.num_values() {
        return Err(invalid(format!(
            "point has {num_values} values but window {window_label} has {}",
            window.num_values()
        )));
    }

    // Transpose Stokes-major into channel-major.
    let num_stokes = window.num_stokes;
    let mut vis = vec![Complex::new(0.0, 0.0); num_values];
    for stokes in 0..num_stokes {
        for chan in 0..window.num_channels {
            let re = c.read_f32::<BigEndian>()?;
            let im = c.read_f32::<BigEndian>()?;
            vis[stokes + chan * num_stokes] = Complex::new(re, im);
        }
    }
    let mut weight = vec![0.0; num_values];
    for stokes in 0..num_stokes {
        for chan in 0..window.num_channels {
            weight[stokes + chan * num_stokes] = c.read_f32::<BigEndian>()?;
        }
    }

    let mut point = VisPoint {
        u_m,
        v_m,
        w_m,
        ant1,
        ant2,
        flag,
        bin,
        window: window_label,
        source,
        vis,
        weight,
    };
    point.normalise(window);
    Ok((ut, point))
}

fn parse_syscal(payload: &[u8], syscal: &mut Syscal) -> io::Result<()> {
    let mut c = Cursor::new(payload);
    let window = c.read_u32::<BigEndian>()? as usize;
    let antenna = c.read_u32::<BigEndian>()? as usize;

    if antenna == 0 {
        syscal.site = Some(SiteRecord {
            temperature_c: c.read_f32::<BigEndian>()?,
            pressure_mbar: c.read_f32::<BigEndian>()?,
            humidity_percent: c.read_f32::<BigEndian>()?,
            wind_speed_kmh: c.read_f32::<BigEndian>()?,
            wind_direction_deg: c.read_f32::<BigEndian>()?,
            rain_gauge_mm: c.read_f32::<BigEndian>()?,
            weather_valid: read_bool(&mut c)?,
            seemon_phase_deg: c.read_f32::<BigEndian>()?,
            seemon_rms_um: c.read_f32::<BigEndian>()?,
            seemon_valid: read_bool(&mut c)?,
        });
        return Ok(());
    }

    let mut cell = SyscalCell::new(window, antenna);
    cell.tsys = read_pair(&mut c)?;
    cell.applied = if read_bool(&mut c)? {
        TsysState::Online
    } else {
        TsysState::None
    };
    cell.xyphase_deg = c.read_f32::<BigEndian>()?;
    cell.xyamp_jy = c.read_f32::<BigEndian>()?;
    cell.parangle_deg = c.read_f32::<BigEndian>()?;
    cell.tracking_error_max_arcsec = c.read_f32::<BigEndian>()?;
    cell.tracking_error_rms_arcsec = c.read_f32::<BigEndian>()?;
    cell.flagging = c.read_u32::<BigEndian>()?;
    cell.gtp = read_pair(&mut c)?;
    cell.sdo = read_pair(&mut c)?;
    cell.caljy = read_pair(&mut c)?;
    syscal.insert(cell);
    Ok(())
}

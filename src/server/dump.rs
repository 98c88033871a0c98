// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Dump files: the preloaded products in the wire format, for clients to
//! use without a server.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::info;

use super::{DumpError, Preloaded};
use crate::{
    constants::{DEFAULT_CLIENT_ID, SPECTRUM_DUMP_FILENAME, VIS_DUMP_FILENAME},
    wire::{decode_responses, send_response, Response, ResponseBody, ResponseType},
};

/// Write the spectrum and vis dump files into `dir`, returning their paths.
pub fn write_dump_files(dir: &Path, preloaded: &Preloaded) -> Result<[PathBuf; 2], DumpError> {
    let spectrum = Response::new(ResponseType::CurrentSpectrum, DEFAULT_CLIENT_ID).with_body(
        ResponseBody::Spectrum {
            spectrum: preloaded.spectrum.clone(),
            options: preloaded.options.clone(),
        },
    );
    let vis = Response::new(ResponseType::CurrentVisdata, DEFAULT_CLIENT_ID).with_body(
        ResponseBody::Vis {
            vis: preloaded.vis.clone(),
            options: preloaded.options.clone(),
        },
    );

    let spectrum_path = dir.join(SPECTRUM_DUMP_FILENAME);
    write_dump_file(&spectrum_path, &spectrum)?;
    let vis_path = dir.join(VIS_DUMP_FILENAME);
    write_dump_file(&vis_path, &vis)?;
    Ok([spectrum_path, vis_path])
}

fn write_dump_file(path: &Path, response: &Response) -> Result<(), DumpError> {
    let create_err = |source| DumpError::Create {
        path: path.to_path_buf(),
        source,
    };
    let mut f = BufWriter::new(File::create(path).map_err(create_err)?);
    send_response(&mut f, response)?;
    f.flush().map_err(create_err)?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Read the responses stored in a dump file.
pub fn read_dump_file(path: &Path) -> Result<Vec<Response>, DumpError> {
    let f = File::open(path).map_err(|source| DumpError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let responses = decode_responses(&mut BufReader::new(f))?;
    if responses.is_empty() {
        return Err(DumpError::Empty(path.to_path_buf()));
    }
    Ok(responses)
}

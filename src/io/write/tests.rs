// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io::Cursor;

use byteorder::ReadBytesExt;
use num_complex::Complex;
use tempfile::TempDir;

use super::*;
use crate::tests::{stokes, synthetic_cycle, synthetic_header, write_synthetic_file};

#[test]
fn test_magic_and_record_framing() {
    let mut writer = CycleFileWriter::new(vec![]).unwrap();
    writer.end_cycle(12.5).unwrap();
    let bytes = writer.finish().unwrap();

    assert_eq!(&bytes[..8], MAGIC);
    let mut c = Cursor::new(&bytes[8..]);
    assert_eq!(c.read_u8().unwrap(), TAG_END_OF_CYCLE);
    assert_eq!(c.read_u32::<BigEndian>().unwrap(), 8);
    assert_eq!(c.read_f64::<BigEndian>().unwrap(), 12.5);
    assert_eq!(c.position() as usize, bytes.len() - 8);
}

#[test]
fn test_point_values_are_stokes_major() {
    let mut window = IfWindow::new(1000.0, 16.0, 3, 1, 1, stokes()[..2].to_vec());
    window.label = 1;
    let header = synthetic_header(0.0);
    let mut point = synthetic_cycle(&header, 0.0).points.remove(0);
    point.window = 1;
    // Channel-major: value = 10·channel + stokes.
    point.vis = (0..3)
        .flat_map(|chan| (0..2).map(move |s| Complex::new((10 * chan + s) as f32, 0.0)))
        .collect();
    point.weight = vec![1.0; 6];

    let mut writer = CycleFileWriter::new(vec![]).unwrap();
    writer.write_point(5.0, &point, &window).unwrap();
    let bytes = writer.finish().unwrap();

    let mut c = Cursor::new(&bytes[8..]);
    assert_eq!(c.read_u8().unwrap(), TAG_POINT);
    let len = c.read_u32::<BigEndian>().unwrap() as usize;
    // ut, u, v, w, baseline, flag, bin, window, source, count, values, weights
    assert_eq!(len, 8 + 4 * 3 + 4 * 6 + 6 * 8 + 6 * 4);
    c.set_position(c.position() + 8 + 12);
    assert_eq!(
        c.read_i32::<BigEndian>().unwrap() as usize,
        256 * point.ant1 + point.ant2
    );
    c.set_position(c.position() + 16);
    assert_eq!(c.read_u32::<BigEndian>().unwrap(), 6);
    let reals: Vec<f32> = (0..6)
        .map(|_| {
            let re = c.read_f32::<BigEndian>().unwrap();
            let _im = c.read_f32::<BigEndian>().unwrap();
            re
        })
        .collect();
    assert_eq!(reals, [0.0, 10.0, 20.0, 1.0, 11.0, 21.0]);
}

#[test]
fn test_create_on_disk() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("out.cyc");
    write_synthetic_file(&path, &[0.0, 100.0], 2);
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..8], MAGIC);
    assert!(bytes.len() > 8);
}

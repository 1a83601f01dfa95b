//! Binary codec for the zoned heightfield format and its header-less sibling.
//!
//! Versioned layout (little-endian):
//!
//! ```text
//! u16 version | u16 zone_size_log2 | u16 zones_wide | u16 zones_long | u16 marker (10) | u16 reserved (0)
//! zones_wide * zones_long zones of (2^zone_size_log2)^2 u16 samples, row-major,
//! zones laid out zone-row-major.
//! ```
//!
//! The header-less format is the same payload with a fixed zone size of 128
//! and zone counts supplied by the caller.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use thiserror::Error;

use super::layout::{BitDepth, HeightfieldGrid, ZoneLayout};
use crate::grid::Grid;

/// Size of the versioned header in bytes.
pub const HEADER_LEN: usize = 12;

/// Fixed marker stored in the fifth header field.
pub const HEADER_MARKER: u16 = 10;

/// Zone size exponent of the header-less format (128 samples).
pub const HEADERLESS_ZONE_SIZE_LOG2: u16 = 7;

/// Smallest zone size exponent accepted in a file header (64 samples).
pub const MIN_FILE_ZONE_SIZE_LOG2: u16 = 6;

/// Largest zone size exponent accepted in a file header (256 samples).
pub const MAX_FILE_ZONE_SIZE_LOG2: u16 = 8;

/// World meters covered by one zone.
pub const METERS_PER_ZONE: f32 = 1280.0;

/// Errors raised by the heightfield codec and raster bridge.
#[derive(Error, Debug)]
pub enum HeightfieldError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Byte count mismatch: expected {expected} bytes, found {actual}")]
    Format { expected: usize, actual: usize },
    #[error("Invalid header: {0}")]
    Header(String),
    #[error("Zone counts must be non-zero, got {0}x{1}")]
    ZeroZones(u16, u16),
    #[error("Zone size exponent {0} is too large")]
    ZoneSizeTooLarge(u16),
    #[error("Dimension {dimension} is not an exact multiple of the zone size derived from {zones} zones")]
    NotDivisible { dimension: usize, zones: u16 },
    #[error("Image {width}x{height} split into {zones_wide}x{zones_long} zones gives non-square zones")]
    NonSquareZones {
        width: usize,
        height: usize,
        zones_wide: u16,
        zones_long: u16,
    },
    #[error("Zone size {0} is not a power of two")]
    NotPowerOfTwo(usize),
    #[error("Sample count mismatch: expected {expected}, found {actual}")]
    SampleCount { expected: usize, actual: usize },
}

impl HeightfieldError {
    /// True for byte-count and header inconsistencies.
    pub fn is_format_error(&self) -> bool {
        matches!(self, HeightfieldError::Format { .. } | HeightfieldError::Header(_))
    }

    /// True for caller-supplied geometry that violates a structural invariant.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            HeightfieldError::ZeroZones(..)
                | HeightfieldError::ZoneSizeTooLarge(_)
                | HeightfieldError::NotDivisible { .. }
                | HeightfieldError::NonSquareZones { .. }
                | HeightfieldError::NotPowerOfTwo(_)
                | HeightfieldError::SampleCount { .. }
        )
    }
}

/// The six fields of a versioned header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderInfo {
    pub version: u16,
    pub zone_size_log2: u16,
    pub zones_wide: u16,
    pub zones_long: u16,
    pub marker: u16,
    pub reserved: u16,
}

impl HeaderInfo {
    pub fn zone_size(&self) -> usize {
        1usize << self.zone_size_log2.min(15)
    }

    fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        let fields = [
            self.version,
            self.zone_size_log2,
            self.zones_wide,
            self.zones_long,
            self.marker,
            self.reserved,
        ];
        for (chunk, field) in out.chunks_exact_mut(2).zip(fields) {
            chunk.copy_from_slice(&field.to_le_bytes());
        }
        out
    }
}

/// A zone that ran out of bytes during decode; its missing samples are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LenientDecodeAnomaly {
    /// Zone index in zone-row-major order.
    pub zone_index: usize,
    pub expected_samples: usize,
    pub present_samples: usize,
}

/// Non-fatal findings of a decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeReport {
    pub anomalies: Vec<LenientDecodeAnomaly>,
}

impl DecodeReport {
    /// True if every zone was complete.
    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }

    /// Total number of zero-filled samples.
    pub fn missing_samples(&self) -> usize {
        self.anomalies
            .iter()
            .map(|a| a.expected_samples - a.present_samples)
            .sum()
    }
}

/// Parses the 12-byte header at the start of `bytes`.
pub fn parse_header(bytes: &[u8]) -> Result<HeaderInfo, HeightfieldError> {
    if bytes.len() < HEADER_LEN {
        return Err(HeightfieldError::Format {
            expected: HEADER_LEN,
            actual: bytes.len(),
        });
    }
    let field = |i: usize| u16::from_le_bytes([bytes[i * 2], bytes[i * 2 + 1]]);
    Ok(HeaderInfo {
        version: field(0),
        zone_size_log2: field(1),
        zones_wide: field(2),
        zones_long: field(3),
        marker: field(4),
        reserved: field(5),
    })
}

/// Reads only the header of a versioned file.
pub fn read_header(path: &Path) -> Result<HeaderInfo, HeightfieldError> {
    let mut file = File::open(path)?;
    let mut buf = [0u8; HEADER_LEN];
    let mut filled = 0;
    while filled < HEADER_LEN {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    parse_header(&buf[..filled])
}

/// Decodes a versioned heightfield.
///
/// Only the final zone may be short: its present samples are placed, the
/// rest are zero and a single anomaly is reported. Odd, over-long or
/// otherwise truncated payloads are format errors, as is a header zone size
/// outside 64..=256.
pub fn decode(bytes: &[u8]) -> Result<(HeightfieldGrid, DecodeReport), HeightfieldError> {
    let header = parse_header(bytes)?;
    if header.marker != HEADER_MARKER {
        log::warn!(
            "Heightfield header marker is {} (expected {}), decoding anyway",
            header.marker,
            HEADER_MARKER
        );
    }
    if !(MIN_FILE_ZONE_SIZE_LOG2..=MAX_FILE_ZONE_SIZE_LOG2).contains(&header.zone_size_log2) {
        return Err(HeightfieldError::Header(format!(
            "zone size exponent {} outside {}..={}",
            header.zone_size_log2, MIN_FILE_ZONE_SIZE_LOG2, MAX_FILE_ZONE_SIZE_LOG2
        )));
    }
    let layout = ZoneLayout::new(header.zones_wide, header.zones_long, header.zone_size_log2)
        .map_err(|e| HeightfieldError::Header(e.to_string()))?;

    let (samples, report) = unpack_zones(&bytes[HEADER_LEN..], layout, BitDepth::Thirteen, HEADER_LEN)?;
    let grid = HeightfieldGrid::from_samples(
        layout.width(),
        layout.height(),
        samples.into_vec(),
        layout.zones_wide,
        layout.zones_long,
        BitDepth::Thirteen,
    )?
    .with_version(header.version);

    log::info!(
        "Decoded heightfield v{}: {}x{} zones of {} samples ({}x{})",
        header.version,
        layout.zones_wide,
        layout.zones_long,
        layout.zone_size(),
        layout.width(),
        layout.height()
    );
    Ok((grid, report))
}

/// Decodes a header-less heightfield with the given zone counts.
pub fn decode_headerless(
    bytes: &[u8],
    zones_wide: u16,
    zones_long: u16,
) -> Result<(HeightfieldGrid, DecodeReport), HeightfieldError> {
    let layout = ZoneLayout::new(zones_wide, zones_long, HEADERLESS_ZONE_SIZE_LOG2)?;
    let (samples, report) = unpack_zones(bytes, layout, BitDepth::Twelve, 0)?;
    let grid = HeightfieldGrid::from_samples(
        layout.width(),
        layout.height(),
        samples.into_vec(),
        zones_wide,
        zones_long,
        BitDepth::Twelve,
    )?;
    log::info!(
        "Decoded header-less heightfield: {}x{} zones ({}x{})",
        zones_wide,
        zones_long,
        layout.width(),
        layout.height()
    );
    Ok((grid, report))
}

/// Encodes `grid` into the versioned format using the given zone counts.
///
/// The zone size is derived as `width / zones_wide` and validated before any
/// byte is produced.
pub fn encode(grid: &HeightfieldGrid, zones_wide: u16, zones_long: u16) -> Result<Vec<u8>, HeightfieldError> {
    let layout = ZoneLayout::derive(grid.width(), grid.height(), zones_wide, zones_long)?;
    let header = HeaderInfo {
        version: grid.version(),
        zone_size_log2: layout.zone_size_log2,
        zones_wide,
        zones_long,
        marker: HEADER_MARKER,
        reserved: 0,
    };
    let mut out = Vec::with_capacity(HEADER_LEN + layout.payload_len());
    out.extend_from_slice(&header.to_bytes());
    pack_zones(grid.samples(), layout, grid.bit_depth(), &mut out);
    Ok(out)
}

/// Encodes `grid` into the header-less format (zone size must be 128).
pub fn encode_headerless(grid: &HeightfieldGrid) -> Result<Vec<u8>, HeightfieldError> {
    let zone_size = 1usize << HEADERLESS_ZONE_SIZE_LOG2;
    let zones_wide = (grid.width() / zone_size) as u16;
    let zones_long = (grid.height() / zone_size) as u16;
    let layout = ZoneLayout::derive(grid.width(), grid.height(), zones_wide, zones_long)?;
    if layout.zone_size() != zone_size {
        return Err(HeightfieldError::NotDivisible {
            dimension: grid.width(),
            zones: zones_wide,
        });
    }
    let mut out = Vec::with_capacity(layout.payload_len());
    // Header-less files only carry 12 bits.
    pack_zones(grid.samples(), layout, BitDepth::Twelve, &mut out);
    Ok(out)
}

/// Zone counts for a header-less map of the given size in meters.
pub fn zones_from_map_size(width_meters: f32, depth_meters: f32) -> (u16, u16) {
    let zones = |m: f32| (m / METERS_PER_ZONE).round().clamp(0.0, u16::MAX as f32) as u16;
    (zones(width_meters), zones(depth_meters))
}

/// Reads and decodes a versioned heightfield file.
pub fn read_heightfield(path: &Path) -> Result<(HeightfieldGrid, DecodeReport), HeightfieldError> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

/// Encodes and writes a versioned heightfield file.
pub fn write_heightfield(
    grid: &HeightfieldGrid,
    path: &Path,
    zones_wide: u16,
    zones_long: u16,
) -> Result<(), HeightfieldError> {
    let bytes = encode(grid, zones_wide, zones_long)?;
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes)?;
    writer.flush()?;
    log::info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

fn pack_zones(samples: &Grid<u16>, layout: ZoneLayout, bit_depth: BitDepth, out: &mut Vec<u8>) {
    let zone_size = layout.zone_size();
    let mask = bit_depth.mask();
    for zone in 0..layout.zone_count() {
        let (ox, oy) = layout.zone_origin(zone);
        for y in oy..oy + zone_size {
            for &s in &samples.as_slice()[samples.index(ox, y)..samples.index(ox, y) + zone_size] {
                out.extend_from_slice(&(s & mask).to_le_bytes());
            }
        }
    }
}

fn unpack_zones(
    payload: &[u8],
    layout: ZoneLayout,
    bit_depth: BitDepth,
    header_len: usize,
) -> Result<(Grid<u16>, DecodeReport), HeightfieldError> {
    let per_zone = layout.samples_per_zone();
    let expected = header_len + layout.payload_len();
    let actual = header_len + payload.len();
    // Every zone but the last must be complete, and the last must be started.
    let leading_zones_len = (layout.zone_count() - 1) * per_zone * 2;
    if payload.len() % 2 != 0 || payload.len() > layout.payload_len() || payload.len() <= leading_zones_len {
        return Err(HeightfieldError::Format { expected, actual });
    }

    let zone_size = layout.zone_size();
    let available = payload.len() / 2;
    let mask = bit_depth.mask();
    let mut grid: Grid<u16> = Grid::new(layout.width(), layout.height());
    let mut report = DecodeReport::default();

    for zone in 0..layout.zone_count() {
        let start = zone * per_zone;
        let present = available.saturating_sub(start).min(per_zone);
        if present < per_zone {
            report.anomalies.push(LenientDecodeAnomaly {
                zone_index: zone,
                expected_samples: per_zone,
                present_samples: present,
            });
        }
        let (ox, oy) = layout.zone_origin(zone);
        for i in 0..present {
            let b = (start + i) * 2;
            let value = u16::from_le_bytes([payload[b], payload[b + 1]]) & mask;
            grid.set(ox + i % zone_size, oy + i / zone_size, value);
        }
    }

    if !report.is_clean() {
        log::warn!(
            "Heightfield truncated: expected {} bytes, found {}; {} zone(s) incomplete, {} sample(s) zero-filled",
            expected,
            actual,
            report.anomalies.len(),
            report.missing_samples()
        );
    }
    Ok((grid, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn patterned(zones_wide: u16, zones_long: u16, log2: u16, bit_depth: BitDepth) -> HeightfieldGrid {
        let layout = ZoneLayout::new(zones_wide, zones_long, log2).unwrap();
        let mut grid = HeightfieldGrid::new(layout, bit_depth);
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                grid.set(x, y, ((x * 131 + y * 17 + x * y) % 8192) as u16);
            }
        }
        grid
    }

    #[test]
    fn test_all_zero_4x4_zones_size() {
        let layout = ZoneLayout::new(4, 4, 7).unwrap();
        let grid = HeightfieldGrid::new(layout, BitDepth::Thirteen);
        let bytes = encode(&grid, 4, 4).unwrap();
        assert_eq!(bytes.len(), 12 + 4 * 4 * 128 * 128 * 2);

        let (decoded, report) = decode(&bytes).unwrap();
        assert!(report.is_clean());
        assert!(decoded.samples().as_slice().iter().all(|&s| s == 0));
    }

    #[test]
    fn test_header_fields() {
        let grid = patterned(3, 2, 6, BitDepth::Thirteen);
        let bytes = encode(&grid, 3, 2).unwrap();
        let header = parse_header(&bytes).unwrap();
        assert_eq!(header.version, 1);
        assert_eq!(header.zone_size_log2, 6);
        assert_eq!(header.zones_wide, 3);
        assert_eq!(header.zones_long, 2);
        assert_eq!(header.marker, HEADER_MARKER);
        assert_eq!(header.reserved, 0);
    }

    #[test]
    fn test_versioned_roundtrip() {
        let grid = patterned(3, 2, 6, BitDepth::Thirteen);
        let bytes = encode(&grid, 3, 2).unwrap();
        let (decoded, report) = decode(&bytes).unwrap();
        assert!(report.is_clean());
        assert_eq!(decoded, grid);
    }

    #[test]
    fn test_headerless_roundtrip() {
        let layout = ZoneLayout::new(2, 1, HEADERLESS_ZONE_SIZE_LOG2).unwrap();
        let mut grid = HeightfieldGrid::new(layout, BitDepth::Twelve);
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                grid.set(x, y, ((x * 7 + y * 3) % 4096) as u16);
            }
        }
        let bytes = encode_headerless(&grid).unwrap();
        assert_eq!(bytes.len(), 2 * 128 * 128 * 2);
        let (decoded, report) = decode_headerless(&bytes, 2, 1).unwrap();
        assert!(report.is_clean());
        assert_eq!(decoded, grid);
    }

    #[test]
    fn test_zone_row_major_layout() {
        // 2x1 zones of 2x2: zone 0 holds columns 0-1, zone 1 columns 2-3.
        let samples = vec![
            0, 1, 10, 11, //
            2, 3, 12, 13,
        ];
        let grid = HeightfieldGrid::from_samples(4, 2, samples, 2, 1, BitDepth::Thirteen).unwrap();
        let bytes = encode(&grid, 2, 1).unwrap();
        let body: Vec<u16> = bytes[HEADER_LEN..]
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(body, vec![0, 1, 2, 3, 10, 11, 12, 13]);
    }

    #[test]
    fn test_one_byte_short_is_format_error() {
        let grid = patterned(2, 2, 6, BitDepth::Thirteen);
        let mut bytes = encode(&grid, 2, 2).unwrap();
        let full = bytes.len();
        bytes.pop();
        match decode(&bytes) {
            Err(HeightfieldError::Format { expected, actual }) => {
                assert_eq!(expected, full);
                assert_eq!(actual, full - 1);
            }
            other => panic!("expected format error, got {:?}", other.map(|(_, r)| r)),
        }
    }

    #[test]
    fn test_trailing_bytes_are_format_error() {
        let grid = patterned(1, 1, 6, BitDepth::Thirteen);
        let mut bytes = encode(&grid, 1, 1).unwrap();
        bytes.extend_from_slice(&[0, 0]);
        assert!(decode(&bytes).unwrap_err().is_format_error());
    }

    #[test]
    fn test_truncated_last_zone_is_zero_filled() {
        let grid = patterned(2, 2, 6, BitDepth::Thirteen);
        let mut bytes = encode(&grid, 2, 2).unwrap();
        // Drop the final three samples of the last zone.
        bytes.truncate(bytes.len() - 6);

        let (decoded, report) = decode(&bytes).unwrap();
        assert_eq!(report.anomalies.len(), 1);
        let anomaly = report.anomalies[0];
        assert_eq!(anomaly.zone_index, 3);
        assert_eq!(anomaly.expected_samples, 4096);
        assert_eq!(anomaly.present_samples, 4093);

        // Last zone starts at (64, 64); its last three samples are row 63, columns 61..64.
        for x in 125..128 {
            assert_eq!(decoded.get(x, 127), 0, "missing sample at ({}, 127) must be zero", x);
        }
        assert_eq!(decoded.get(124, 127), grid.get(124, 127));
        assert_eq!(decoded.get(0, 0), grid.get(0, 0));
    }

    #[test]
    fn test_missing_earlier_zone_is_format_error() {
        let grid = patterned(2, 2, 6, BitDepth::Thirteen);
        let bytes = encode(&grid, 2, 2).unwrap();
        let cut = HEADER_LEN + 4096 * 2 + 4 * 2; // first zone + 4 samples of the second
        match decode(&bytes[..cut]) {
            Err(HeightfieldError::Format { expected, actual }) => {
                assert_eq!(expected, bytes.len());
                assert_eq!(actual, cut);
            }
            other => panic!("expected format error, got {:?}", other.map(|(_, r)| r)),
        }
    }

    #[test]
    fn test_header_only_file_is_format_error() {
        let huge = HeaderInfo {
            version: 1,
            zone_size_log2: 8,
            zones_wide: 60000,
            zones_long: 60000,
            marker: HEADER_MARKER,
            reserved: 0,
        };
        assert!(matches!(decode(&huge.to_bytes()), Err(HeightfieldError::Format { actual: 12, .. })));

        let single = HeaderInfo {
            zone_size_log2: 6,
            zones_wide: 1,
            zones_long: 1,
            ..huge
        };
        assert!(matches!(decode(&single.to_bytes()), Err(HeightfieldError::Format { actual: 12, .. })));
    }

    #[test]
    fn test_header_zone_size_out_of_range() {
        for log2 in [5u16, 9] {
            let header = HeaderInfo {
                version: 1,
                zone_size_log2: log2,
                zones_wide: 1,
                zones_long: 1,
                marker: HEADER_MARKER,
                reserved: 0,
            };
            let mut bytes = header.to_bytes().to_vec();
            bytes.resize(HEADER_LEN + (1usize << (2 * log2)) * 2, 0);
            let err = decode(&bytes).unwrap_err();
            assert!(matches!(err, HeightfieldError::Header(_)), "log2 {} gave {:?}", log2, err);
            assert!(err.is_format_error());
        }
    }

    #[test]
    fn test_short_header_is_format_error() {
        assert!(decode(&[1, 0, 7, 0]).unwrap_err().is_format_error());
    }

    #[test]
    fn test_zero_zone_header_is_format_error() {
        let header = HeaderInfo {
            version: 1,
            zone_size_log2: 7,
            zones_wide: 0,
            zones_long: 4,
            marker: HEADER_MARKER,
            reserved: 0,
        };
        assert!(decode(&header.to_bytes()).unwrap_err().is_format_error());
    }

    #[test]
    fn test_encode_validates_before_writing() {
        let samples = vec![0u16; 96 * 96];
        let grid = HeightfieldGrid::from_samples(96, 96, samples, 1, 1, BitDepth::Thirteen);
        assert!(matches!(grid, Err(HeightfieldError::NotPowerOfTwo(96))));

        let grid = patterned(2, 2, 6, BitDepth::Thirteen);
        let err = encode(&grid, 3, 2).unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_encode_masks_samples() {
        let grid = HeightfieldGrid::from_samples(1, 1, vec![0xFFFF], 1, 1, BitDepth::Thirteen).unwrap();
        let bytes = encode(&grid, 1, 1).unwrap();
        assert_eq!(u16::from_le_bytes([bytes[12], bytes[13]]), 0x1FFF);
    }

    #[test]
    fn test_zones_from_map_size() {
        assert_eq!(zones_from_map_size(10240.0, 5120.0), (8, 4));
        assert_eq!(zones_from_map_size(10900.0, 5700.0), (9, 4));
    }

    #[test]
    fn test_file_roundtrip_and_header_peek() {
        let grid = patterned(2, 1, 6, BitDepth::Thirteen);
        let dir = tempdir().unwrap();
        let path = dir.path().join("map.hg2");
        write_heightfield(&grid, &path, 2, 1).unwrap();

        let header = read_header(&path).unwrap();
        assert_eq!((header.zones_wide, header.zones_long), (2, 1));
        assert_eq!(header.zone_size(), 64);

        let (decoded, _) = read_heightfield(&path).unwrap();
        assert_eq!(decoded, grid);
    }
}

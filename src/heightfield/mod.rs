//! Zoned heightfield codec and raster bridge.
//!
//! Heightfields are stored as a 12-byte header followed by square zones of
//! little-endian `u16` samples, zone-row-major. A header-less sibling format
//! fixes the zone size to 128 and takes zone counts from the map size.

mod adjust;
mod codec;
mod layout;
mod raster;

pub use adjust::{preview_image, HeightAdjustments, CONTRAST_MIDPOINT};
pub use codec::{
    decode, decode_headerless, encode, encode_headerless, parse_header, read_header, read_heightfield,
    write_heightfield, zones_from_map_size, DecodeReport, HeaderInfo, HeightfieldError, LenientDecodeAnomaly,
    HEADERLESS_ZONE_SIZE_LOG2, HEADER_LEN, HEADER_MARKER, MAX_FILE_ZONE_SIZE_LOG2, METERS_PER_ZONE,
    MIN_FILE_ZONE_SIZE_LOG2,
};
pub use layout::{BitDepth, HeightfieldGrid, ZoneLayout, DEFAULT_FORMAT_VERSION, MAX_ZONE_SIZE_LOG2};
pub use raster::{
    direct_raster_heights, from_direct_raster, from_legacy_raster, load_legacy_raster, load_raster16,
    save_legacy_png, save_raster16_png, to_direct_raster, to_legacy_raster, DirectRasterOptions, HeightRaster16,
    LegacyRaster, LegacyRasterOptions,
};

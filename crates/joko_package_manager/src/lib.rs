//! Loading of marker packs: reading archives and directories, decoding the xml and trail
//! binaries into a [`PackSet`], and handing new sets over from a background loader.

pub mod io;
pub mod manager;

use base64::{
    alphabet,
    engine::{GeneralPurpose, GeneralPurposeConfig},
};

pub use io::deserialize::build_pack;
pub use io::source::{open_pack_source, DirSource, MemorySource, PackSource, ZipSource};
pub use io::tbin::{parse_tbin_from_slice, TBinError};
pub use joko_package_models::package::{Pack, PackSet};
pub use manager::{load_all_from_dir, CategoryState, PackManager};

/// GUIDs in packs are base64 with padding, but some writers omit it.
pub const BASE64_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(base64::engine::DecodePaddingMode::Indifferent),
);

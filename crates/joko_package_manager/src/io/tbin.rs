use glam::Vec3;
use joko_package_models::trail::TBin;

/// 4 bytes of version that we skip, then the map id.
const HEADER_LENGTH: usize = 8;
const NODE_LENGTH: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TBinError {
    /// less than the 8 bytes of header
    TooShort(usize),
    /// the header is fine but not a single complete node follows
    NoPoints,
}

impl std::fmt::Display for TBinError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TBinError::TooShort(len) => write!(f, "trail binary of {len} bytes has no header"),
            TBinError::NoPoints => f.write_str("trail binary has no points"),
        }
    }
}

impl std::error::Error for TBinError {}

fn le_f32(bytes: &[u8]) -> f32 {
    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Decodes a `.trl` payload: a version we ignore, a little endian u32 map id, then xyz float triples.
/// A trailing remainder shorter than a node is dropped, some writers pad the file.
pub fn parse_tbin_from_slice(bytes: &[u8]) -> Result<TBin, TBinError> {
    if bytes.len() < HEADER_LENGTH {
        return Err(TBinError::TooShort(bytes.len()));
    }
    let map_id = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

    let nodes: Vec<Vec3> = bytes[HEADER_LENGTH..]
        .chunks_exact(NODE_LENGTH)
        .map(|node| Vec3::new(le_f32(&node[0..4]), le_f32(&node[4..8]), le_f32(&node[8..12])))
        .collect();
    if nodes.is_empty() {
        return Err(TBinError::NoPoints);
    }
    Ok(TBin { map_id, nodes })
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use rstest::rstest;
    use similar_asserts::assert_eq;

    pub(crate) fn encode(version: u32, map_id: u32, nodes: &[Vec3]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LENGTH + nodes.len() * NODE_LENGTH);
        bytes.extend_from_slice(&version.to_le_bytes());
        bytes.extend_from_slice(&map_id.to_le_bytes());
        for node in nodes {
            for v in node.to_array() {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
        }
        bytes
    }

    fn nodes() -> Vec<Vec3> {
        vec![
            Vec3::new(1.5, -2.25, 300.0),
            Vec3::new(-0.0, 1e-7, f32::MAX),
            Vec3::new(42.0, 43.0, 44.0),
        ]
    }

    #[test]
    fn decodes_map_id_and_nodes() {
        let decoded = parse_tbin_from_slice(&encode(7, 1206, &nodes())).unwrap();
        assert_eq!(decoded.map_id, 1206);
        assert_eq!(decoded.nodes.len(), 3);
        for (a, b) in decoded.nodes.iter().zip(nodes()) {
            assert_eq!(a.to_array().map(f32::to_bits), b.to_array().map(f32::to_bits));
        }
    }

    #[test]
    fn version_field_is_not_the_map_id() {
        let decoded = parse_tbin_from_slice(&encode(0xDEAD_BEEF, 15, &nodes())).unwrap();
        assert_eq!(decoded.map_id, 15);
    }

    #[rstest]
    fn trailing_bytes_are_ignored(#[values(1, 4, 7, 11)] extra: usize) {
        let clean = parse_tbin_from_slice(&encode(0, 50, &nodes())).unwrap();
        let mut padded = encode(0, 50, &nodes());
        padded.extend(std::iter::repeat(0xAB).take(extra));
        assert_eq!(parse_tbin_from_slice(&padded).unwrap(), clean);
    }

    #[rstest]
    #[case(0)]
    #[case(4)]
    #[case(7)]
    fn short_payloads_fail(#[case] len: usize) {
        assert_eq!(
            parse_tbin_from_slice(&vec![0; len]),
            Err(TBinError::TooShort(len))
        );
    }

    #[test]
    fn header_without_points_fails() {
        assert_eq!(parse_tbin_from_slice(&encode(0, 50, &[])), Err(TBinError::NoPoints));
        let mut almost = encode(0, 50, &[]);
        almost.extend([0; 11]);
        assert_eq!(parse_tbin_from_slice(&almost), Err(TBinError::NoPoints));
    }
}

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

const PRECISION: usize = 12;

/// Interleaved binary-subdivision geohash over latitude [-90,90] and
/// longitude [-180,180], 5 bits per base-32 character, longitude first.
pub fn geohash(latitude: f64, longitude: f64) -> String {
    let mut lat = (-90.0f64, 90.0f64);
    let mut lon = (-180.0f64, 180.0f64);
    let mut out = String::with_capacity(PRECISION);
    let mut bits = 0usize;
    let mut bit_count = 0u8;
    let mut even = true;

    while out.len() < PRECISION {
        let (range, position) = if even {
            (&mut lon, longitude)
        } else {
            (&mut lat, latitude)
        };
        let mid = (range.0 + range.1) / 2.0;
        bits <<= 1;
        if position >= mid {
            bits |= 1;
            range.0 = mid;
        } else {
            range.1 = mid;
        }
        even = !even;
        bit_count += 1;
        if bit_count == 5 {
            out.push(BASE32[bits] as char);
            bits = 0;
            bit_count = 0;
        }
    }

    out
}

const CRC32_LSB_POLY: u32 = 0xedb8_8320;

/// `TABLES[0]` is the classic bytewise table; `TABLES[k]` advances a byte through `k` more zero
/// bytes, which lets 16 input bytes be folded per step.
static TABLES: [[u32; 256]; 16] = build_tables();

const fn build_tables() -> [[u32; 256]; 16] {
    let mut tables = [[0u32; 256]; 16];

    let mut i = 0;
    while i < 256 {
        let mut c = i as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 {
                (c >> 1) ^ CRC32_LSB_POLY
            } else {
                c >> 1
            };
            k += 1;
        }
        tables[0][i] = c;
        i += 1;
    }

    let mut t = 1;
    while t < 16 {
        let mut i = 0;
        while i < 256 {
            let prev = tables[t - 1][i];
            tables[t][i] = (prev >> 8) ^ tables[0][(prev & 0xff) as usize];
            i += 1;
        }
        t += 1;
    }

    tables
}

/// The reference implementation, one table lookup per byte.
pub fn crc32_bytewise(start: u32, buf: &[u8]) -> u32 {
    let mut crc = !start;

    for &byte in buf {
        crc = TABLES[0][((crc as u8) ^ byte) as usize] ^ (crc >> 8);
    }

    !crc
}

pub fn crc32_slice16(start: u32, mut buf: &[u8]) -> u32 {
    let mut crc = !start;

    while let Some((chunk, rest)) = buf.split_first_chunk::<16>() {
        crc = TABLES[0x0][chunk[0xf] as usize]
            ^ TABLES[0x1][chunk[0xe] as usize]
            ^ TABLES[0x2][chunk[0xd] as usize]
            ^ TABLES[0x3][chunk[0xc] as usize]
            ^ TABLES[0x4][chunk[0xb] as usize]
            ^ TABLES[0x5][chunk[0xa] as usize]
            ^ TABLES[0x6][chunk[0x9] as usize]
            ^ TABLES[0x7][chunk[0x8] as usize]
            ^ TABLES[0x8][chunk[0x7] as usize]
            ^ TABLES[0x9][chunk[0x6] as usize]
            ^ TABLES[0xa][chunk[0x5] as usize]
            ^ TABLES[0xb][chunk[0x4] as usize]
            ^ TABLES[0xc][(chunk[0x3] ^ (crc >> 0x18) as u8) as usize]
            ^ TABLES[0xd][(chunk[0x2] ^ (crc >> 0x10) as u8) as usize]
            ^ TABLES[0xe][(chunk[0x1] ^ (crc >> 0x08) as u8) as usize]
            ^ TABLES[0xf][(chunk[0x0] ^ crc as u8) as usize];

        buf = rest;
    }

    crc32_bytewise(!crc, buf)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn first_entries() {
        assert_eq!(TABLES[0][0], 0);
        assert_eq!(TABLES[0][1], 0x7707_3096);
        assert_eq!(TABLES[0][255], 0x2d02_ef8d);
    }

    #[test]
    fn slice16_is_bytewise() {
        let input: Vec<u8> = (0..1000u32).map(|i| (i * 251 + 3) as u8).collect();

        for len in [0, 1, 15, 16, 17, 31, 32, 33, 100, 1000] {
            assert_eq!(
                crc32_slice16(0x1234_5678, &input[..len]),
                crc32_bytewise(0x1234_5678, &input[..len])
            );
        }
    }
}

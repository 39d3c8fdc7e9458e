// AES-128 segment decryption and IV handling.

use aes::Aes128;
use bytes::Bytes;
use cbc::cipher::{BlockDecryptMut, KeyIvInit, block_padding::Pkcs7};

use crate::hls::HlsDownloaderError;

type Aes128CbcDec = cbc::Decryptor<Aes128>;

pub const KEY_LEN: usize = 16;

/// Parse an `IV` attribute (`0x` + 32 hex digits; the prefix is optional).
pub fn parse_iv(iv_hex_str: &str) -> Result<[u8; 16], HlsDownloaderError> {
    let iv_str = iv_hex_str
        .strip_prefix("0x")
        .or_else(|| iv_hex_str.strip_prefix("0X"))
        .unwrap_or(iv_hex_str);
    let mut iv_bytes = [0u8; 16];
    hex::decode_to_slice(iv_str, &mut iv_bytes).map_err(|e| HlsDownloaderError::InvalidIv {
        iv: iv_hex_str.to_string(),
        reason: e.to_string(),
    })?;
    Ok(iv_bytes)
}

/// IV used when a key carries none: the media sequence number, big-endian,
/// in the low 8 bytes of the block.
pub fn sequence_iv(sequence: u64) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[8..].copy_from_slice(&sequence.to_be_bytes());
    iv
}

/// AES-128-CBC decrypt with PKCS#7 padding removal.
pub fn decrypt_aes128(data: &[u8], key: &[u8], iv: &[u8; 16]) -> Result<Bytes, HlsDownloaderError> {
    let cipher = Aes128CbcDec::new_from_slices(key, iv).map_err(|e| {
        HlsDownloaderError::DecryptionError(format!("Failed to initialize AES decryptor: {e}"))
    })?;

    let mut buffer = data.to_vec();
    let decrypted_len = cipher
        .decrypt_padded_mut::<Pkcs7>(&mut buffer)
        .map_err(|e| HlsDownloaderError::DecryptionError(format!("Decryption failed: {e}")))?
        .len();
    buffer.truncate(decrypted_len);

    Ok(Bytes::from(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hls::test_support::encrypt_aes128;

    const KEY: [u8; 16] = *b"0123456789abcdef";

    #[test]
    fn test_parse_iv() {
        let iv = parse_iv("0x000102030405060708090A0B0C0D0E0F").unwrap();
        assert_eq!(iv, core::array::from_fn(|i| i as u8));
        assert_eq!(parse_iv("000102030405060708090a0b0c0d0e0f").unwrap(), iv);
    }

    #[test]
    fn test_parse_iv_rejects_bad_input() {
        assert!(matches!(
            parse_iv("0x0102"),
            Err(HlsDownloaderError::InvalidIv { .. })
        ));
        assert!(parse_iv("0xzz0102030405060708090a0b0c0d0e0f").is_err());
    }

    #[test]
    fn test_sequence_iv() {
        let iv = sequence_iv(0x0102);
        assert_eq!(&iv[..14], &[0u8; 14]);
        assert_eq!(&iv[14..], &[0x01, 0x02]);
    }

    #[test]
    fn test_decrypt_roundtrip() {
        let iv = sequence_iv(7);
        let plain = vec![0x47u8; 188 * 3];
        let encrypted = encrypt_aes128(&plain, &KEY, &iv);
        assert_ne!(encrypted, plain);
        let decrypted = decrypt_aes128(&encrypted, &KEY, &iv).unwrap();
        assert_eq!(decrypted.as_ref(), plain.as_slice());
    }

    #[test]
    fn test_decrypt_with_wrong_key_length() {
        let err = decrypt_aes128(&[0u8; 32], b"short", &[0u8; 16]).unwrap_err();
        assert!(matches!(err, HlsDownloaderError::DecryptionError(_)));
    }

    #[test]
    fn test_decrypt_garbage_fails_instead_of_passing_through() {
        // not a multiple of the block size
        assert!(decrypt_aes128(&[1u8; 33], &KEY, &[0u8; 16]).is_err());
    }
}

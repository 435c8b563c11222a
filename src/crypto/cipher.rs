//! AES in cipher-block-chaining mode.
//!
//! `BlockCipherEngine` holds the keyed AES instance for a vault and hands
//! out chained encryptors and decryptors built on the `cbc` crate.  Both
//! process data strictly in whole 16-byte blocks; padding is the caller's job.

use aes_gcm::aes::cipher::{BlockDecryptMut, BlockEncryptMut, InnerIvInit, KeyInit};
use aes_gcm::aes::{Aes128, Aes192, Aes256, Block};
use rand::rngs::OsRng;
use rand::TryRngCore;

use super::kdf::VaultKey;
use crate::errors::{FileVaultError, Result};

/// AES block size in bytes (identical for every key size).
pub const BLOCK_SIZE: usize = 16;

/// An initialization vector: exactly one cipher block.
pub type Iv = [u8; BLOCK_SIZE];

#[derive(Clone)]
enum KeyedAes {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl KeyedAes {
    fn new(key: &[u8]) -> Result<Self> {
        let invalid = |_| FileVaultError::InvalidKeyLength(key.len());
        match key.len() {
            16 => Aes128::new_from_slice(key).map(Self::Aes128).map_err(invalid),
            24 => Aes192::new_from_slice(key).map(Self::Aes192).map_err(invalid),
            32 => Aes256::new_from_slice(key).map(Self::Aes256).map_err(invalid),
            other => Err(FileVaultError::InvalidKeyLength(other)),
        }
    }
}

/// Factory for chained encryptors/decryptors under one vault key.
#[derive(Clone)]
pub struct BlockCipherEngine {
    cipher: KeyedAes,
}

impl BlockCipherEngine {
    /// Key an engine with the vault key.  Fails only on an invalid key length.
    pub fn new(key: &VaultKey) -> Result<Self> {
        Ok(Self {
            cipher: KeyedAes::new(key.as_bytes())?,
        })
    }

    /// Build an encryptor.
    ///
    /// With `None` a fresh random IV is drawn from the OS; an RNG failure is
    /// fatal rather than falling back to predictable bytes.  A supplied IV
    /// longer than one block is truncated to the block length.
    pub fn make_encryptor(&self, iv: Option<&[u8]>) -> Result<(CbcEncryptor, Iv)> {
        let iv = match iv {
            Some(bytes) => block_iv(bytes)?,
            None => random_iv()?,
        };
        let chain = Block::from_slice(&iv);
        let mode = match &self.cipher {
            KeyedAes::Aes128(c) => {
                EncryptMode::Aes128(cbc::Encryptor::inner_iv_init(c.clone(), chain))
            }
            KeyedAes::Aes192(c) => {
                EncryptMode::Aes192(cbc::Encryptor::inner_iv_init(c.clone(), chain))
            }
            KeyedAes::Aes256(c) => {
                EncryptMode::Aes256(cbc::Encryptor::inner_iv_init(c.clone(), chain))
            }
        };
        Ok((CbcEncryptor { mode }, iv))
    }

    /// Build a decryptor for data encrypted under `iv`.
    pub fn make_decryptor(&self, iv: &[u8]) -> Result<CbcDecryptor> {
        let iv = block_iv(iv)?;
        let chain = Block::from_slice(&iv);
        let mode = match &self.cipher {
            KeyedAes::Aes128(c) => {
                DecryptMode::Aes128(cbc::Decryptor::inner_iv_init(c.clone(), chain))
            }
            KeyedAes::Aes192(c) => {
                DecryptMode::Aes192(cbc::Decryptor::inner_iv_init(c.clone(), chain))
            }
            KeyedAes::Aes256(c) => {
                DecryptMode::Aes256(cbc::Decryptor::inner_iv_init(c.clone(), chain))
            }
        };
        Ok(CbcDecryptor { mode })
    }
}

enum EncryptMode {
    Aes128(cbc::Encryptor<Aes128>),
    Aes192(cbc::Encryptor<Aes192>),
    Aes256(cbc::Encryptor<Aes256>),
}

enum DecryptMode {
    Aes128(cbc::Decryptor<Aes128>),
    Aes192(cbc::Decryptor<Aes192>),
    Aes256(cbc::Decryptor<Aes256>),
}

/// Chained encryptor.  State carries over between calls, so a file can be
/// fed through one block at a time.
pub struct CbcEncryptor {
    mode: EncryptMode,
}

impl CbcEncryptor {
    /// Encrypt `buf` in place.  `buf.len()` must be a multiple of `BLOCK_SIZE`.
    pub fn encrypt_blocks(&mut self, buf: &mut [u8]) -> Result<()> {
        ensure_aligned(buf)?;
        for chunk in buf.chunks_exact_mut(BLOCK_SIZE) {
            let block = Block::from_mut_slice(chunk);
            match &mut self.mode {
                EncryptMode::Aes128(e) => e.encrypt_block_mut(block),
                EncryptMode::Aes192(e) => e.encrypt_block_mut(block),
                EncryptMode::Aes256(e) => e.encrypt_block_mut(block),
            }
        }
        Ok(())
    }
}

/// Chained decryptor, the inverse of `CbcEncryptor`.
pub struct CbcDecryptor {
    mode: DecryptMode,
}

impl CbcDecryptor {
    /// Decrypt `buf` in place.  `buf.len()` must be a multiple of `BLOCK_SIZE`.
    pub fn decrypt_blocks(&mut self, buf: &mut [u8]) -> Result<()> {
        ensure_aligned(buf)?;
        for chunk in buf.chunks_exact_mut(BLOCK_SIZE) {
            let block = Block::from_mut_slice(chunk);
            match &mut self.mode {
                DecryptMode::Aes128(d) => d.decrypt_block_mut(block),
                DecryptMode::Aes192(d) => d.decrypt_block_mut(block),
                DecryptMode::Aes256(d) => d.decrypt_block_mut(block),
            }
        }
        Ok(())
    }
}

fn ensure_aligned(buf: &[u8]) -> Result<()> {
    if buf.len() % BLOCK_SIZE != 0 {
        return Err(FileVaultError::UnalignedData(buf.len()));
    }
    Ok(())
}

/// Take the first block of `bytes` as an IV.  Never extends short input.
fn block_iv(bytes: &[u8]) -> Result<Iv> {
    let head = bytes.get(..BLOCK_SIZE).ok_or(FileVaultError::InvalidIv {
        expected: BLOCK_SIZE,
        actual: bytes.len(),
    })?;
    let mut iv = [0u8; BLOCK_SIZE];
    iv.copy_from_slice(head);
    Ok(iv)
}

fn random_iv() -> Result<Iv> {
    let mut iv = [0u8; BLOCK_SIZE];
    OsRng
        .try_fill_bytes(&mut iv)
        .map_err(|e| FileVaultError::EntropyUnavailable(e.to_string()))?;
    Ok(iv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::CipherStrength;

    fn engine(strength: CipherStrength) -> BlockCipherEngine {
        BlockCipherEngine::new(&VaultKey::derive(b"engine-test", strength)).unwrap()
    }

    #[test]
    fn encryptor_generates_block_sized_iv() {
        let (_, iv1) = engine(CipherStrength::Strong).make_encryptor(None).unwrap();
        let (_, iv2) = engine(CipherStrength::Strong).make_encryptor(None).unwrap();
        assert_eq!(iv1.len(), BLOCK_SIZE);
        assert_ne!(iv1, iv2, "random IVs must differ");
    }

    #[test]
    fn long_iv_is_truncated() {
        let long: Vec<u8> = (0u8..32).collect();
        let (_, iv) = engine(CipherStrength::Strong)
            .make_encryptor(Some(&long))
            .unwrap();
        assert_eq!(&iv[..], &long[..BLOCK_SIZE]);
    }

    #[test]
    fn short_iv_is_rejected() {
        let engine = engine(CipherStrength::Strong);
        assert!(engine.make_encryptor(Some(&[0u8; 8])).is_err());
        assert!(engine.make_decryptor(&[0u8; 15]).is_err());
    }

    #[test]
    fn roundtrip_for_every_strength() {
        for strength in CipherStrength::ALL {
            let engine = engine(strength);
            let plaintext: Vec<u8> = (0..64u8).collect();
            let mut buf = plaintext.clone();

            let (mut enc, iv) = engine.make_encryptor(None).unwrap();
            enc.encrypt_blocks(&mut buf).unwrap();
            assert_ne!(buf, plaintext);

            let mut dec = engine.make_decryptor(&iv).unwrap();
            dec.decrypt_blocks(&mut buf).unwrap();
            assert_eq!(buf, plaintext);
        }
    }

    #[test]
    fn blockwise_and_bulk_encryption_agree() {
        let engine = engine(CipherStrength::Medium);
        let iv = [7u8; BLOCK_SIZE];
        let mut bulk = vec![0x5Au8; 48];
        let mut piecewise = bulk.clone();

        let (mut enc, _) = engine.make_encryptor(Some(&iv)).unwrap();
        enc.encrypt_blocks(&mut bulk).unwrap();

        let (mut enc, _) = engine.make_encryptor(Some(&iv)).unwrap();
        for chunk in piecewise.chunks_mut(BLOCK_SIZE) {
            enc.encrypt_blocks(chunk).unwrap();
        }
        assert_eq!(bulk, piecewise);
    }

    #[test]
    fn identical_blocks_encrypt_differently_when_chained() {
        let engine = engine(CipherStrength::Weak);
        let mut buf = [0u8; 32];
        let (mut enc, _) = engine.make_encryptor(Some(&[0u8; BLOCK_SIZE])).unwrap();
        enc.encrypt_blocks(&mut buf).unwrap();
        assert_ne!(buf[..16], buf[16..]);
    }

    #[test]
    fn matches_nist_cbc_aes128_vector() {
        // SP 800-38A, F.2.1 CBC-AES128.Encrypt, first two blocks.
        let key = VaultKey::from_raw(hex("2b7e151628aed2a6abf7158809cf4f3c"), CipherStrength::Weak);
        let iv = hex("000102030405060708090a0b0c0d0e0f");
        let plaintext = hex("6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51");
        let expected = hex("7649abac8119b246cee98e9b12e9197d5086cb9b507219ee95db113a917678b2");

        let engine = BlockCipherEngine::new(&key).unwrap();
        let mut buf = plaintext.clone();
        let (mut enc, _) = engine.make_encryptor(Some(&iv)).unwrap();
        enc.encrypt_blocks(&mut buf).unwrap();
        assert_eq!(buf, expected);

        let mut dec = engine.make_decryptor(&iv).unwrap();
        dec.decrypt_blocks(&mut buf).unwrap();
        assert_eq!(buf, plaintext);
    }

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn unaligned_input_is_rejected() {
        let (mut enc, _) = engine(CipherStrength::Strong).make_encryptor(None).unwrap();
        let mut buf = [0u8; 17];
        assert!(enc.encrypt_blocks(&mut buf).is_err());
    }
}

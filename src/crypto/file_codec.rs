//! Whole-file encryption and decryption, one cipher block at a time.
//!
//! Ciphertext layout is just the CBC blocks, nothing else:
//!
//! ```text
//! [block 0][block 1]...[block n-1]      n = ceil(plaintext_size / 16)
//! ```
//!
//! The IV, the zero-padding length and the HMAC-SHA256 tag over the
//! ciphertext are kept in the vault metadata, not in the file.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use zeroize::Zeroize;

use super::cipher::{BlockCipherEngine, BLOCK_SIZE};
use super::kdf::VaultKey;
use super::tag::TagAccumulator;
use crate::errors::{FileVaultError, Result};
use crate::vault::VaultEntry;

const BLOCK: u64 = BLOCK_SIZE as u64;

/// Cryptographic parameters produced by encrypting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSeal {
    pub iv: Vec<u8>,
    pub plaintext_size: u64,
    pub padding_len: u64,
    pub auth_tag: Vec<u8>,
}

/// Number of zero bytes needed to bring `len` up to a block boundary.
pub fn padding_for(len: u64) -> u64 {
    (BLOCK - len % BLOCK) % BLOCK
}

/// Encrypts and decrypts files under one vault key.
pub struct FileCryptoCodec<'k> {
    key: &'k VaultKey,
    engine: BlockCipherEngine,
}

impl<'k> FileCryptoCodec<'k> {
    pub fn new(key: &'k VaultKey) -> Result<Self> {
        Ok(Self {
            key,
            engine: BlockCipherEngine::new(key)?,
        })
    }

    /// Encrypt `plaintext_len` bytes from `src` into `dst`.
    ///
    /// Each ciphertext block is written at its block-indexed offset and fed
    /// into the running tag.  A short read is only legal on the final block,
    /// where the remainder is zero-filled.
    pub fn encrypt<R: Read, W: Write + Seek>(
        &self,
        mut src: R,
        plaintext_len: u64,
        mut dst: W,
    ) -> Result<FileSeal> {
        let (mut encryptor, iv) = self.engine.make_encryptor(None)?;
        let padding_len = padding_for(plaintext_len);
        let block_count = (plaintext_len + padding_len) / BLOCK;
        let mut tag = TagAccumulator::new(self.key)?;
        let mut block = [0u8; BLOCK_SIZE];

        for index in 0..block_count {
            let offset = index * BLOCK;
            // Bounded by BLOCK, so the cast cannot truncate.
            let expected = (plaintext_len - offset).min(BLOCK) as usize;
            let read = read_block(&mut src, &mut block)?;
            if read < expected {
                block.zeroize();
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("source ended early in block {index} of {block_count}"),
                )
                .into());
            }
            block[expected..].fill(0);

            encryptor.encrypt_blocks(&mut block)?;
            tag.update(&block);

            dst.seek(SeekFrom::Start(offset))?;
            dst.write_all(&block)?;
        }
        dst.flush()?;

        debug!(blocks = block_count, padding = padding_len, "encrypted payload");

        Ok(FileSeal {
            iv: iv.to_vec(),
            plaintext_size: plaintext_len,
            padding_len,
            auth_tag: tag.finalize(),
        })
    }

    /// Decrypt `ciphertext_len` bytes from `src` into `dst` and check the tag.
    ///
    /// This writes plaintext before the tag is known, so `dst` must be a
    /// scratch target.  `decrypt_file` wraps it with a temp file that is only
    /// renamed into place once the tag verifies.
    pub fn decrypt<R: Read, W: Write + Seek>(
        &self,
        entry: &VaultEntry,
        mut src: R,
        ciphertext_len: u64,
        mut dst: W,
    ) -> Result<()> {
        if ciphertext_len % BLOCK != 0 {
            return Err(FileVaultError::AuthenticationFailed(
                entry.original_name.clone(),
            ));
        }
        if entry.padding_len >= BLOCK {
            return Err(FileVaultError::CorruptVault(format!(
                "entry '{}' records padding of {} bytes",
                entry.original_name, entry.padding_len
            )));
        }

        let mut decryptor = self.engine.make_decryptor(&entry.iv)?;
        let block_count = ciphertext_len / BLOCK;
        let mut tag = TagAccumulator::new(self.key)?;
        let mut block = [0u8; BLOCK_SIZE];

        for index in 0..block_count {
            src.read_exact(&mut block)?;
            tag.update(&block);
            decryptor.decrypt_blocks(&mut block)?;

            let keep = if index + 1 == block_count {
                BLOCK_SIZE - entry.padding_len as usize
            } else {
                BLOCK_SIZE
            };
            dst.seek(SeekFrom::Start(index * BLOCK))?;
            dst.write_all(&block[..keep])?;
        }
        block.zeroize();
        dst.flush()?;

        if !tag.verify(&entry.auth_tag) {
            return Err(FileVaultError::AuthenticationFailed(
                entry.original_name.clone(),
            ));
        }
        Ok(())
    }

    /// Encrypt the file at `source` into a new ciphertext file at `dest`.
    pub fn encrypt_file(&self, source: &Path, dest: &Path) -> Result<FileSeal> {
        let src = File::open(source)?;
        let len = src.metadata()?.len();
        let dst = File::create(dest)?;
        self.encrypt(BufReader::new(src), len, dst)
    }

    /// Decrypt `entry`'s ciphertext at `source` to `dest`.
    ///
    /// Plaintext goes to a hidden temp file beside `dest` and is renamed into
    /// place only after the tag verifies, so a tampered ciphertext never
    /// leaves unauthenticated plaintext at `dest`.
    pub fn decrypt_file(&self, entry: &VaultEntry, source: &Path, dest: &Path) -> Result<()> {
        let tmp_path = temp_path_for(dest)?;

        let committed = self
            .decrypt_to(entry, source, &tmp_path)
            .and_then(|()| fs::rename(&tmp_path, dest).map_err(Into::into));

        match committed {
            Ok(()) => Ok(()),
            // Covers a failed rename too: verified plaintext must not linger.
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                Err(e)
            }
        }
    }

    fn decrypt_to(&self, entry: &VaultEntry, source: &Path, target: &Path) -> Result<()> {
        let src = File::open(source)?;
        let len = src.metadata()?.len();
        let mut out = File::create(target)?;
        self.decrypt(entry, BufReader::new(src), len, &mut out)?;
        out.sync_all()?;
        Ok(())
    }
}

/// Fill `buf` from `src`, stopping early only at end of input.
fn read_block<R: Read>(src: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn temp_path_for(dest: &Path) -> Result<PathBuf> {
    let name = dest.file_name().ok_or_else(|| {
        FileVaultError::InvalidFileName(format!("{} has no file name", dest.display()))
    })?;
    Ok(dest.with_file_name(format!(".{}.tmp", name.to_string_lossy())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::CipherStrength;
    use std::io::Cursor;

    fn entry_for(seal: FileSeal) -> VaultEntry {
        VaultEntry::from_seal("test.bin", "ciphertext", seal)
    }

    fn roundtrip(key: &VaultKey, plaintext: &[u8]) -> (Vec<u8>, FileSeal) {
        let codec = FileCryptoCodec::new(key).unwrap();
        let mut ciphertext = Cursor::new(Vec::new());
        let seal = codec
            .encrypt(plaintext, plaintext.len() as u64, &mut ciphertext)
            .unwrap();
        let ciphertext = ciphertext.into_inner();

        let entry = entry_for(seal.clone());
        let mut out = Cursor::new(Vec::new());
        codec
            .decrypt(&entry, &ciphertext[..], ciphertext.len() as u64, &mut out)
            .unwrap();
        assert_eq!(out.into_inner(), plaintext);
        (ciphertext, seal)
    }

    #[test]
    fn padding_arithmetic() {
        assert_eq!(padding_for(0), 0);
        assert_eq!(padding_for(16), 0);
        assert_eq!(padding_for(40), 8);
        assert_eq!(padding_for(17), 15);
    }

    #[test]
    fn roundtrips_edge_sizes() {
        let key = VaultKey::derive(b"codec", CipherStrength::Strong);
        for size in [0usize, 1, 15, 16, 17, 40, 4096, 4099] {
            let plaintext: Vec<u8> = (0..size).map(|i| (i * 7 % 251) as u8).collect();
            let (ciphertext, seal) = roundtrip(&key, &plaintext);
            assert_eq!(ciphertext.len() as u64, seal.plaintext_size + seal.padding_len);
            assert_eq!(ciphertext.len() % BLOCK_SIZE, 0);
            assert!(seal.padding_len < BLOCK);
        }
    }

    #[test]
    fn forty_byte_file_pads_to_three_blocks() {
        let key = VaultKey::derive(b"secret", CipherStrength::Strong);
        let (ciphertext, seal) = roundtrip(&key, &[0xA5u8; 40]);
        assert_eq!(seal.padding_len, 8);
        assert_eq!(ciphertext.len(), 48);
        assert_eq!(seal.iv.len(), BLOCK_SIZE);
        assert_eq!(seal.auth_tag.len(), crate::crypto::tag::TAG_LEN);
    }

    #[test]
    fn truncated_source_is_an_io_error() {
        let key = VaultKey::derive(b"codec", CipherStrength::Strong);
        let codec = FileCryptoCodec::new(&key).unwrap();
        let data = [1u8; 20];
        let result = codec.encrypt(&data[..], 64, Cursor::new(Vec::new()));
        assert!(matches!(result, Err(FileVaultError::Io(_))));
    }

    #[test]
    fn bit_flip_fails_authentication() {
        let key = VaultKey::derive(b"codec", CipherStrength::Weak);
        let (mut ciphertext, seal) = roundtrip(&key, b"attack at dawn, bring snacks");
        ciphertext[3] ^= 0x01;

        let codec = FileCryptoCodec::new(&key).unwrap();
        let result = codec.decrypt(
            &entry_for(seal),
            &ciphertext[..],
            ciphertext.len() as u64,
            Cursor::new(Vec::new()),
        );
        assert!(matches!(result, Err(FileVaultError::AuthenticationFailed(_))));
    }

    #[test]
    fn unaligned_ciphertext_fails_authentication() {
        let key = VaultKey::derive(b"codec", CipherStrength::Strong);
        let (mut ciphertext, seal) = roundtrip(&key, b"sixteen bytes!!!");
        ciphertext.push(0);

        let codec = FileCryptoCodec::new(&key).unwrap();
        let result = codec.decrypt(
            &entry_for(seal),
            &ciphertext[..],
            ciphertext.len() as u64,
            Cursor::new(Vec::new()),
        );
        assert!(matches!(result, Err(FileVaultError::AuthenticationFailed(_))));
    }

    #[test]
    fn short_ciphertext_read_is_an_io_error() {
        let key = VaultKey::derive(b"codec", CipherStrength::Strong);
        let (ciphertext, seal) = roundtrip(&key, &[9u8; 32]);

        let codec = FileCryptoCodec::new(&key).unwrap();
        let result = codec.decrypt(
            &entry_for(seal),
            &ciphertext[..16],
            ciphertext.len() as u64,
            Cursor::new(Vec::new()),
        );
        assert!(matches!(result, Err(FileVaultError::Io(_))));
    }
}

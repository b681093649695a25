//! Shared-key channel cipher.
//!
//! MeshCore encrypts group messages with AES in ECB mode: no IV, each 16-byte
//! block is processed independently. Identical plaintext blocks therefore
//! produce identical ciphertext blocks; the protocol requires it.
//!
//! Authentication uses a 2-byte truncated HMAC-SHA256 over the ciphertext,
//! keyed with the channel secret. The bridge does not check it unless
//! [`ChannelCipher::verify_mac`] is called (see `[channel] verify_mac`).
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::CipherError;

pub const BLOCK_SIZE: usize = 16;

#[derive(Clone)]
enum BlockCipher {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

/// AES-ECB cipher bound to one channel secret.
#[derive(Clone)]
pub struct ChannelCipher {
    cipher: BlockCipher,
    secret: Vec<u8>,
}

impl std::fmt::Debug for ChannelCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print the secret
        f.debug_struct("ChannelCipher")
            .field("key_bits", &(self.secret.len() * 8))
            .finish()
    }
}

impl ChannelCipher {
    pub fn new(secret: &[u8]) -> Result<Self, CipherError> {
        let cipher = match secret.len() {
            16 => BlockCipher::Aes128(Aes128::new(GenericArray::from_slice(secret))),
            24 => BlockCipher::Aes192(Aes192::new(GenericArray::from_slice(secret))),
            32 => BlockCipher::Aes256(Aes256::new(GenericArray::from_slice(secret))),
            other => return Err(CipherError::InvalidKeyLength(other)),
        };
        Ok(Self {
            cipher,
            secret: secret.to_vec(),
        })
    }

    fn check_aligned(data: &[u8]) -> Result<(), CipherError> {
        if data.len() % BLOCK_SIZE != 0 {
            return Err(CipherError::Misaligned(data.len()));
        }
        Ok(())
    }

    /// Decrypt whole blocks. Output length equals input length.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        Self::check_aligned(ciphertext)?;
        let mut out = ciphertext.to_vec();
        for block in out.chunks_exact_mut(BLOCK_SIZE) {
            let block = GenericArray::from_mut_slice(block);
            match &self.cipher {
                BlockCipher::Aes128(c) => c.decrypt_block(block),
                BlockCipher::Aes192(c) => c.decrypt_block(block),
                BlockCipher::Aes256(c) => c.decrypt_block(block),
            }
        }
        Ok(out)
    }

    /// Encrypt whole blocks. Callers pad to the block size first.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        Self::check_aligned(plaintext)?;
        let mut out = plaintext.to_vec();
        for block in out.chunks_exact_mut(BLOCK_SIZE) {
            let block = GenericArray::from_mut_slice(block);
            match &self.cipher {
                BlockCipher::Aes128(c) => c.encrypt_block(block),
                BlockCipher::Aes192(c) => c.encrypt_block(block),
                BlockCipher::Aes256(c) => c.encrypt_block(block),
            }
        }
        Ok(out)
    }

    /// Truncated HMAC-SHA256 tag MeshCore places in front of the ciphertext.
    pub fn mac(&self, ciphertext: &[u8]) -> [u8; 2] {
        let mut hmac = <Hmac<Sha256> as Mac>::new_from_slice(&self.secret)
            .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
        hmac.update(ciphertext);
        let tag = hmac.finalize().into_bytes();
        [tag[0], tag[1]]
    }

    pub fn verify_mac(&self, mac: [u8; 2], ciphertext: &[u8]) -> bool {
        self.mac(ciphertext) == mac
    }
}

/// Channel id as MeshCore derives it: the first byte of SHA-256(secret).
pub fn channel_hash(secret: &[u8]) -> u8 {
    Sha256::digest(secret)[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    #[test]
    fn round_trip_restores_plaintext() {
        let mut rng = rand::thread_rng();
        for key_len in [16usize, 24, 32] {
            let mut key = vec![0u8; key_len];
            rng.fill_bytes(&mut key);
            let cipher = ChannelCipher::new(&key).unwrap();
            for blocks in 1..5 {
                let mut plain = vec![0u8; blocks * BLOCK_SIZE];
                rng.fill_bytes(&mut plain);
                let sealed = cipher.encrypt(&plain).unwrap();
                assert_ne!(sealed, plain);
                assert_eq!(cipher.decrypt(&sealed).unwrap(), plain);
            }
        }
    }

    #[test]
    fn matches_fips_197_vector() {
        let key = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let plain = hex::decode("00112233445566778899aabbccddeeff").unwrap();
        let cipher = ChannelCipher::new(&key).unwrap();
        let sealed = cipher.encrypt(&plain).unwrap();
        assert_eq!(hex::encode(&sealed), "69c4e0d86a7b0430d8cdb78070b4c55a");
    }

    #[test]
    fn ecb_blocks_are_independent() {
        let cipher = ChannelCipher::new(&[7u8; 16]).unwrap();
        let sealed = cipher.encrypt(&[0x41u8; 32]).unwrap();
        assert_eq!(sealed[..16], sealed[16..]);
    }

    #[test]
    fn rejects_misaligned_input_and_bad_keys() {
        let cipher = ChannelCipher::new(&[1u8; 16]).unwrap();
        assert_eq!(cipher.decrypt(&[0u8; 15]), Err(CipherError::Misaligned(15)));
        assert!(matches!(
            ChannelCipher::new(&[0u8; 10]),
            Err(CipherError::InvalidKeyLength(10))
        ));
        assert_eq!(cipher.decrypt(&[]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn mac_detects_tampering() {
        let cipher = ChannelCipher::new(&[9u8; 16]).unwrap();
        let sealed = cipher.encrypt(&[3u8; 16]).unwrap();
        let mac = cipher.mac(&sealed);
        assert!(cipher.verify_mac(mac, &sealed));
        let mut tampered = sealed.clone();
        tampered[0] ^= 1;
        assert_ne!(cipher.mac(&tampered), mac);
    }

    #[test]
    fn public_channel_hash() {
        // MeshCore's default "Public" channel secret hashes to 0x11.
        let secret = hex::decode("8b3387e9c5cdea6ac9e5edbaa115cd72").unwrap();
        assert_eq!(channel_hash(&secret), 0x11);
    }
}

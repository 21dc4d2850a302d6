use proptest::prelude::*;

use forkchain_primitives::base58;
use forkchain_primitives::ec::private_key::{PrivateKey, MAINNET_WIF_PREFIX};
use forkchain_primitives::ec::signature::Signature;
use forkchain_primitives::hash::sha256d;
use forkchain_primitives::util::{VarInt, WireReader, WireWriter};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn wif_roundtrip(seed in prop::array::uniform32(any::<u8>())) {
        // Not every 32-byte array is a valid scalar.
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let wif = pk.to_wif(MAINNET_WIF_PREFIX);
            let pk2 = PrivateKey::from_wif(&wif).unwrap();
            prop_assert_eq!(pk.to_hex(), pk2.to_hex());
        }
    }

    #[test]
    fn ecdsa_sign_verify_der_roundtrip(
        seed in prop::array::uniform32(any::<u8>()),
        msg in prop::collection::vec(any::<u8>(), 0..256)
    ) {
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let hash = sha256d(&msg);
            let sig = pk.sign(&hash).unwrap();
            prop_assert!(sig.is_low_s());
            let parsed = Signature::from_der(&sig.to_der()).unwrap();
            prop_assert!(pk.pub_key().verify(&hash, &parsed));
        }
    }

    #[test]
    fn varint_reader_matches_writer(value in any::<u64>()) {
        let mut writer = WireWriter::new();
        writer.write_varint(VarInt(value));
        let bytes = writer.into_bytes();
        prop_assert_eq!(bytes.len(), VarInt(value).length());
        let mut reader = WireReader::new(&bytes);
        prop_assert_eq!(reader.read_varint().unwrap(), VarInt(value));
        prop_assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn base58_check_roundtrip(payload in prop::collection::vec(any::<u8>(), 0..64)) {
        let encoded = base58::check_encode(&payload);
        prop_assert_eq!(base58::check_decode(&encoded).unwrap(), payload);
    }
}

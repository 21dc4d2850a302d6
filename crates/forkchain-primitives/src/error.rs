/// Errors raised while decoding keys, signatures and wire data.
#[derive(Debug, thiserror::Error)]
pub enum PrimitivesError {
    /// Scalar out of range or wrong length.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Not a SEC-encoded point on secp256k1.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Malformed DER or a signing failure.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid WIF format: {0}")]
    InvalidWif(String),

    #[error("invalid base58: {0}")]
    InvalidBase58(String),

    /// Base58Check payload whose trailing 4 bytes do not match.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// A varint written with a wider prefix than its value needs.
    #[error("non-canonical varint encoding of {0}")]
    NonCanonicalVarInt(u64),

    /// A wire read ran past the end of the buffer.
    #[error("unexpected end of data")]
    UnexpectedEof,
}

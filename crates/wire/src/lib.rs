//! Framed client for the out-of-process KMS: a [`Kms`] trait implemented
//! by [`KmsClient`] over a real UNIX socket and by [`FakeKms`] in-process
//! for tests, plus the length-prefixed JSON envelope they share.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod fake;
pub mod framing;
pub mod protocol;
pub mod trait_;

pub use client::{KmsClient, KmsClientConfig, DEFAULT_SOCKET_PATH};
pub use error::WireError;
pub use fake::FakeKms;
pub use framing::{read_frame, write_frame, MAX_FRAME_BYTES};
pub use protocol::{
    ApiError, CreateDekParams, CreateDekResult, CryptParams, CryptResult, RewrapParams, RewrapResult,
    Request, Response,
};
pub use trait_::Kms;

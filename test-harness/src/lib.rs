// Test fixtures shared by the MetaMapa crates: a stub of the remote API and a
// local identity provider that signs RS256 tokens.
pub mod idp;
pub mod stub_api;

pub use idp::IdpFixture;
pub use stub_api::{CannedResponse, RecordedPart, RecordedRequest, StubApi};

/// Bearer credentials for the Synq API.
pub mod credentials;
/// JSON file output used instead of an upload.
pub mod dump;
pub mod shipper;

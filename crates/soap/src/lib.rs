//! SOAP adapter for Hera.
//!
//! Implements [`hera::ServiceBinder`] and the per-module service traits by
//! reading WSDL service descriptions from disk and sending RPC/encoded SOAP
//! requests over HTTP with basic authentication.
//!
//! ## Architectural Layer
//!
//! **Infrastructure adapter.** The `hera` crate defines the ports; this crate
//! is the only place that knows about XML, SOAP envelopes and HTTP.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`binder`] | [`SoapBinder`]: description + fresh transport per bind |
//! | [`description`] | WSDL reading: namespace, operations, parameter names, actions |
//! | [`envelope`] | [`SoapVersion`] and request envelope encoding |
//! | [`response`] | Envelope decoding, fault mapping, typed extraction |
//! | [`service`] | [`SoapService`]: the bound handle implementing the module traits |
//! | [`transport`] | [`HttpAuthenticated`]: reqwest client with basic auth |
//!
//! ## Wire conventions
//!
//! Control-API version 1.2 is spoken as SOAP 1.2 (`application/soap+xml`);
//! all other versions use SOAP 1.1 (`text/xml` plus a `SOAPAction` header).
//! HTTP 401/403 surface as authentication failures, SOAP faults as
//! [`hera::RemoteErrorKind::Fault`].

pub mod binder;
pub mod description;
pub mod envelope;
pub mod response;
pub mod service;
pub mod transport;

pub use binder::SoapBinder;
pub use description::{OperationDescription, ServiceDescription};
pub use envelope::SoapVersion;
pub use service::SoapService;
pub use transport::{HttpAuthenticated, TransportOptions, DEFAULT_TIMEOUT};

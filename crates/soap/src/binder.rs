//! [`SoapBinder`]: builds a [`SoapService`] from a description file.

use hera::{BindRequest, HeraError, HeraResult, ServiceBinder};
use tracing::debug;

use crate::description::ServiceDescription;
use crate::envelope::SoapVersion;
use crate::service::SoapService;
use crate::transport::{HttpAuthenticated, TransportOptions};

/// Binds modules over SOAP on HTTP.
///
/// Every bind reads the description from disk and builds a new authenticated
/// transport; nothing is shared between bindings.
#[derive(Debug, Clone, Default)]
pub struct SoapBinder {
    options: TransportOptions,
}

impl SoapBinder {
    /// Creates a binder whose transports all use `options`.
    pub fn new(options: TransportOptions) -> Self {
        Self { options }
    }

    /// Transport options applied to every binding.
    pub fn options(&self) -> &TransportOptions {
        &self.options
    }
}

impl ServiceBinder for SoapBinder {
    type Handle = SoapService;

    fn bind(&self, request: &BindRequest<'_>) -> HeraResult<SoapService> {
        let description = ServiceDescription::load(request.location)?;
        let version = SoapVersion::for_api(request.api_version);
        let transport = HttpAuthenticated::new(request.credential, &self.options).map_err(|e| {
            HeraError::Configuration {
                path: request.location.to_path_buf(),
                reason: format!("failed to build HTTP transport: {e}"),
            }
        })?;

        debug!(
            module = %request.module,
            location = %request.location.display(),
            namespace = %description.target_namespace,
            soap_version = ?version,
            operations = description.operation_names().count(),
            "Loaded service description"
        );

        Ok(SoapService::new(
            request.module.clone(),
            description,
            request.endpoint.clone(),
            version,
            transport,
        ))
    }
}

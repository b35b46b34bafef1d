//! The module binding cache.
//!
//! A [`BindingCache`] holds exactly one [`Binding`]: the module currently
//! selected, the description file it was resolved to, and the live handle
//! produced by the [`ServiceBinder`]. Switching modules replaces the whole
//! record in a single assignment, and only after the new handle was bound
//! successfully; a failed switch leaves the previous binding authoritative.
//!
//! Binding a description is relatively expensive (reading and validating the
//! file, building an authenticated transport), while most call sequences hit
//! the same module repeatedly, so a request for the module that is already
//! bound is a no-op.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::resolver::{absolute_directory, resolve_versioned_module_location};
use crate::services::{BindRequest, ServiceBinder};
use crate::{ApiVersion, Credential, Endpoint, HeraResult, ModuleName, Timestamp};

/// The currently bound module and its handle.
///
/// Immutable once built; [`BindingCache`] swaps whole records.
#[derive(Debug)]
pub struct Binding<H> {
    module: ModuleName,
    location: PathBuf,
    directory: PathBuf,
    handle: Arc<H>,
    bound_at: Timestamp,
}

impl<H> Binding<H> {
    /// Module this binding was made for.
    pub fn module(&self) -> &ModuleName {
        &self.module
    }

    /// Description file the handle was bound from.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Directory the description was resolved in.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// When the handle was bound.
    pub fn bound_at(&self) -> Timestamp {
        self.bound_at
    }
}

/// Lazily (re)binds service descriptions, one module at a time.
pub struct BindingCache<B: ServiceBinder> {
    binder: B,
    endpoint: Endpoint,
    credential: Credential,
    api_version: ApiVersion,
    current: Binding<B::Handle>,
    bind_count: u64,
}

impl<B: ServiceBinder> BindingCache<B> {
    /// Resolves and binds `initial_module` from `directory`.
    ///
    /// # Errors
    ///
    /// - [`crate::HeraError::Configuration`] if `directory` is missing or the
    ///   description cannot be bound.
    /// - [`crate::HeraError::ModuleNotFound`] if the module is not listed.
    pub fn new(
        binder: B,
        endpoint: Endpoint,
        credential: Credential,
        api_version: ApiVersion,
        initial_module: &str,
        directory: &Path,
    ) -> HeraResult<Self> {
        let directory = absolute_directory(directory)?;
        let (module, location) =
            resolve_versioned_module_location(initial_module, &directory, api_version)?;
        let current = bind(
            &binder,
            &endpoint,
            &credential,
            api_version,
            module,
            location,
            directory,
        )?;
        info!(
            module = %current.module,
            location = %current.location.display(),
            "Bound initial service description"
        );

        Ok(Self {
            binder,
            endpoint,
            credential,
            api_version,
            current,
            bind_count: 1,
        })
    }

    /// Makes sure `name` is the bound module, searching the current
    /// description directory.
    pub fn ensure_module_bound(&mut self, name: &str) -> HeraResult<()> {
        let directory = self.current.directory.clone();
        self.ensure_module_bound_in(name, &directory)
    }

    /// Makes sure `name`, resolved in `directory`, is the bound module.
    ///
    /// A no-op when the resolved description is the one already bound.
    /// Otherwise binds the new description and, on success, replaces the
    /// current binding (and remembers `directory` for later lookups).
    ///
    /// # Errors
    ///
    /// Resolution and bind errors propagate unchanged; the previous binding
    /// stays in place.
    pub fn ensure_module_bound_in(&mut self, name: &str, directory: &Path) -> HeraResult<()> {
        let directory = absolute_directory(directory)?;
        let (module, location) =
            resolve_versioned_module_location(name, &directory, self.api_version)?;

        if location == self.current.location {
            debug!(module = %module, "Service description already bound");
            return Ok(());
        }

        let next = bind(
            &self.binder,
            &self.endpoint,
            &self.credential,
            self.api_version,
            module,
            location,
            directory,
        )?;
        info!(
            from = %self.current.module,
            to = %next.module,
            location = %next.location.display(),
            "Rebound service description"
        );
        self.current = next;
        self.bind_count += 1;
        Ok(())
    }

    /// The handle for the bound module.
    pub fn current_client(&self) -> Arc<B::Handle> {
        Arc::clone(&self.current.handle)
    }

    /// The current binding record.
    pub fn binding(&self) -> &Binding<B::Handle> {
        &self.current
    }

    /// Number of successful binds, counting the initial one.
    pub fn bind_count(&self) -> u64 {
        self.bind_count
    }

    /// Endpoint every binding targets.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Control-API version in use.
    pub fn api_version(&self) -> ApiVersion {
        self.api_version
    }
}

fn bind<B: ServiceBinder>(
    binder: &B,
    endpoint: &Endpoint,
    credential: &Credential,
    api_version: ApiVersion,
    module: ModuleName,
    location: PathBuf,
    directory: PathBuf,
) -> HeraResult<Binding<B::Handle>> {
    let handle = binder.bind(&BindRequest {
        module: &module,
        location: &location,
        endpoint,
        credential,
        api_version,
    })?;
    Ok(Binding {
        module,
        location,
        directory,
        handle: Arc::new(handle),
        bound_at: Timestamp::now(),
    })
}

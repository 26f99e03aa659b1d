//! Construction-time service registry.
//!
//! The registry is populated once from a service factory. Every WSDL is read
//! and checked for well-formedness before the registry exists, so a bad
//! deployment fails at startup rather than on the first `?wsdl` request.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use soapstack_xml::{XmlError, check_well_formed};

use crate::service::SoapService;

/// Errors raised while building the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The WSDL file could not be read.
    #[error("service {service}: cannot read the wsdl file: {}", path.display())]
    ReadWsdl {
        /// Service name.
        service: String,
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The WSDL is not well-formed XML.
    #[error("service {service}: malformed wsdl at {location}: {source}")]
    MalformedWsdl {
        /// Service name.
        service: String,
        /// File path, or `<inline>` for literal contents.
        location: String,
        /// Well-formedness failure.
        #[source]
        source: XmlError,
    },

    /// The name can never be addressed by a request path.
    #[error("invalid service name {0:?}: must be non-empty and must not contain '/'")]
    InvalidServiceName(String),

    /// Two definitions share a name.
    #[error("service {0} is registered more than once")]
    DuplicateService(String),
}

/// Where a service's WSDL comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsdlSource {
    /// Read from a file at construction time.
    Path(PathBuf),
    /// Literal document text.
    Contents(String),
}

/// A service as supplied by the factory.
#[derive(Clone)]
pub struct ServiceDefinition {
    /// WSDL location or text.
    pub wsdl: WsdlSource,
    /// The implementation.
    pub service: Arc<dyn SoapService>,
}

impl fmt::Debug for ServiceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDefinition")
            .field("wsdl", &self.wsdl)
            .field("operations", &self.service.operations())
            .finish()
    }
}

impl ServiceDefinition {
    /// A definition whose WSDL is read from `path`.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>, service: impl SoapService) -> Self {
        Self {
            wsdl: WsdlSource::Path(path.into()),
            service: Arc::new(service),
        }
    }

    /// A definition with literal WSDL text.
    #[must_use]
    pub fn from_contents(contents: impl Into<String>, service: impl SoapService) -> Self {
        Self {
            wsdl: WsdlSource::Contents(contents.into()),
            service: Arc::new(service),
        }
    }
}

/// A validated service: its name, WSDL text and implementation.
#[derive(Clone)]
pub struct RegisteredService {
    name: String,
    wsdl: String,
    service: Arc<dyn SoapService>,
}

impl fmt::Debug for RegisteredService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredService")
            .field("name", &self.name)
            .field("wsdl_len", &self.wsdl.len())
            .field("operations", &self.service.operations())
            .finish()
    }
}

impl RegisteredService {
    /// The service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The WSDL text, exactly as loaded.
    #[must_use]
    pub fn wsdl(&self) -> &str {
        &self.wsdl
    }

    /// The implementation.
    #[must_use]
    pub fn service(&self) -> &dyn SoapService {
        self.service.as_ref()
    }
}

/// Read-only map of service name to [`RegisteredService`].
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: BTreeMap<String, RegisteredService>,
}

impl ServiceRegistry {
    /// Build a registry from the definitions returned by `factory`.
    ///
    /// # Errors
    ///
    /// Fails on the first definition with an invalid name, a duplicate
    /// name, an unreadable WSDL file or a WSDL that is not well-formed XML.
    pub fn from_factory<F, I>(factory: F) -> Result<Self, RegistryError>
    where
        F: FnOnce() -> I,
        I: IntoIterator<Item = (String, ServiceDefinition)>,
    {
        let mut services = BTreeMap::new();
        for (name, definition) in factory() {
            if name.is_empty() || name.contains('/') {
                return Err(RegistryError::InvalidServiceName(name));
            }
            if services.contains_key(&name) {
                return Err(RegistryError::DuplicateService(name));
            }

            let (wsdl, location) = match definition.wsdl {
                WsdlSource::Path(path) => {
                    let text = std::fs::read_to_string(&path).map_err(|source| {
                        RegistryError::ReadWsdl {
                            service: name.clone(),
                            path: path.clone(),
                            source,
                        }
                    })?;
                    (text, path.display().to_string())
                }
                WsdlSource::Contents(text) => (text, "<inline>".to_owned()),
            };

            check_well_formed(&wsdl).map_err(|source| RegistryError::MalformedWsdl {
                service: name.clone(),
                location: location.clone(),
                source,
            })?;

            tracing::info!(
                service = %name,
                wsdl = %location,
                operations = ?definition.service.operations(),
                "registered SOAP service"
            );
            services.insert(
                name.clone(),
                RegisteredService {
                    name,
                    wsdl,
                    service: definition.service,
                },
            );
        }
        Ok(Self { services })
    }

    /// Look up a service by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredService> {
        self.services.get(name)
    }

    /// Whether a service with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.services.keys().map(String::as_str).collect()
    }

    /// Number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

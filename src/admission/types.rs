//! Request descriptors and outcomes seen by the controller.

use serde::Serialize;
use std::fmt;

/// Identity of a request, used for diagnostics only.
pub trait Invocation {
    /// Name of the remote method being called.
    fn method_name(&self) -> &str;

    /// Name of the remote interface the method belongs to.
    fn interface_name(&self) -> &str;

    /// `interface.method`, as carried by rejections.
    fn describe(&self) -> String {
        format!("{}.{}", self.interface_name(), self.method_name())
    }
}

/// Plain request descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestDescriptor {
    pub interface: String,
    pub method: String,
}

impl RequestDescriptor {
    pub fn new(interface: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            method: method.into(),
        }
    }
}

impl Invocation for RequestDescriptor {
    fn method_name(&self) -> &str {
        &self.method
    }

    fn interface_name(&self) -> &str {
        &self.interface
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.interface, self.method)
    }
}

/// Result of the next stage, as far as the controller cares.
pub trait Outcome {
    fn is_failure(&self) -> bool;
}

impl<T, E> Outcome for Result<T, E> {
    fn is_failure(&self) -> bool {
        self.is_err()
    }
}

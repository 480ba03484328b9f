//! One-off AWS setup around a website bucket: the bucket itself, DNS,
//! certificates and the CDN in front of it.

pub mod bucket;
pub mod certificate;
pub mod distribution;
pub mod domain;
pub mod endpoints;

pub use bucket::BucketManager;
pub use certificate::{Certificate, CertificateManager};
pub use distribution::{Distribution, DistributionManager};
pub use domain::{DomainManager, HostedZone};
pub use endpoints::{get_endpoint, Endpoint};

use crate::utils::errors::WebautoError;

pub(crate) fn provision_error(context: &str, err: impl std::fmt::Display) -> WebautoError {
    WebautoError::Provision(format!("{context}: {err}"))
}

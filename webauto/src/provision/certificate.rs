//! ACM certificate lookup.

use super::provision_error;
use crate::utils::errors::Result;
use aws_sdk_acm::types::CertificateStatus;
use aws_sdk_acm::Client;
use futures_util::future::try_join_all;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub arn: String,
    pub domain_name: Option<String>,
}

pub struct CertificateManager {
    client: Client,
}

impl CertificateManager {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Subject alternative names of a certificate
    pub async fn alt_names(&self, cert_arn: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .describe_certificate()
            .certificate_arn(cert_arn)
            .send()
            .await
            .map_err(|e| provision_error(&format!("describing certificate {cert_arn}"), e.into_service_error()))?;

        Ok(response
            .certificate()
            .map(|c| c.subject_alternative_names().to_vec())
            .unwrap_or_default())
    }

    /// First issued certificate covering `domain_name`.
    pub async fn find_matching_cert(&self, domain_name: &str) -> Result<Option<Certificate>> {
        let mut next_token: Option<String> = None;
        loop {
            let response = self
                .client
                .list_certificates()
                .certificate_statuses(CertificateStatus::Issued)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| provision_error("listing certificates", e.into_service_error()))?;

            // (arn, primary domain) of every summary carrying an arn
            let issued: Vec<(&str, Option<&str>)> = response
                .certificate_summary_list()
                .iter()
                .filter_map(|summary| summary.certificate_arn().map(|arn| (arn, summary.domain_name())))
                .collect();
            let alt_names = try_join_all(issued.iter().map(|(arn, _)| self.alt_names(arn))).await?;

            for ((arn, primary), names) in issued.into_iter().zip(alt_names) {
                debug!("Certificate {} covers {:?}", arn, names);
                if cert_matches(&names, domain_name) {
                    return Ok(Some(Certificate {
                        arn: arn.to_string(),
                        domain_name: primary.map(String::from),
                    }));
                }
            }

            next_token = response.next_token().map(String::from);
            if next_token.is_none() {
                return Ok(None);
            }
        }
    }
}

/// Exact name, or a `*.` wildcard whose suffix ends the domain.
pub fn cert_matches(alt_names: &[String], domain_name: &str) -> bool {
    alt_names.iter().any(|name| {
        name == domain_name
            || name
                .strip_prefix('*')
                .is_some_and(|suffix| domain_name.ends_with(suffix))
    })
}

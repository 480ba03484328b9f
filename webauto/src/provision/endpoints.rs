//! S3 static website endpoints by region.
//!
//! Route 53 alias records pointing at a website bucket need both the endpoint
//! host and the hosted zone id AWS publishes for that endpoint.

/// Region used when a bucket reports no location constraint
pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub name: &'static str,
    pub host: &'static str,
    pub zone: &'static str,
}

const REGION_TO_ENDPOINT: &[(&str, Endpoint)] = &[
    ("us-east-2", Endpoint { name: "US East (Ohio)", host: "s3-website.us-east-2.amazonaws.com", zone: "Z2O1EMRO9K5GLX" }),
    ("us-east-1", Endpoint { name: "US East (N. Virginia)", host: "s3-website-us-east-1.amazonaws.com", zone: "Z3AQBSTGFYJSTF" }),
    ("us-west-1", Endpoint { name: "US West (N. California)", host: "s3-website-us-west-1.amazonaws.com", zone: "Z2F56UZL2M1ACD" }),
    ("us-west-2", Endpoint { name: "US West (Oregon)", host: "s3-website-us-west-2.amazonaws.com", zone: "Z3BJ6K6RIION7M" }),
    ("ca-central-1", Endpoint { name: "Canada (Central)", host: "s3-website.ca-central-1.amazonaws.com", zone: "Z1QDHH18159H29" }),
    ("ap-south-1", Endpoint { name: "Asia Pacific (Mumbai)", host: "s3-website.ap-south-1.amazonaws.com", zone: "Z11RGJOFQNVJUP" }),
    ("ap-northeast-2", Endpoint { name: "Asia Pacific (Seoul)", host: "s3-website.ap-northeast-2.amazonaws.com", zone: "Z3W03O7B5YMIYP" }),
    ("ap-southeast-1", Endpoint { name: "Asia Pacific (Singapore)", host: "s3-website-ap-southeast-1.amazonaws.com", zone: "Z3O0J2DXBE1FTB" }),
    ("ap-southeast-2", Endpoint { name: "Asia Pacific (Sydney)", host: "s3-website-ap-southeast-2.amazonaws.com", zone: "Z1WCIGYICN2BYD" }),
    ("ap-northeast-1", Endpoint { name: "Asia Pacific (Tokyo)", host: "s3-website-ap-northeast-1.amazonaws.com", zone: "Z2M4EHUR26P7ZW" }),
    ("eu-central-1", Endpoint { name: "EU (Frankfurt)", host: "s3-website.eu-central-1.amazonaws.com", zone: "Z21DNDUVLTQW6Q" }),
    ("eu-west-1", Endpoint { name: "EU (Ireland)", host: "s3-website-eu-west-1.amazonaws.com", zone: "Z1BKCTXD74EZPE" }),
    ("eu-west-2", Endpoint { name: "EU (London)", host: "s3-website.eu-west-2.amazonaws.com", zone: "Z3GKZC51ZF0DB4" }),
    ("sa-east-1", Endpoint { name: "South America (Sao Paulo)", host: "s3-website-sa-east-1.amazonaws.com", zone: "Z7KQH4QJS55SO" }),
];

pub fn get_endpoint(region: &str) -> Option<&'static Endpoint> {
    REGION_TO_ENDPOINT
        .iter()
        .find(|(name, _)| *name == region)
        .map(|(_, endpoint)| endpoint)
}

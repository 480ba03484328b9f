//! webauto - Main entry point
//!
//! Deploys static sites to S3 and wires up DNS, certificates and CloudFront.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use webauto::executor::Action;
use webauto::provision::get_endpoint;
use webauto::{utils, AwsContext, Config, SyncOptions, Syncer};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// AWS profile name (overrides config)
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every bucket visible to the profile
    #[command(name = "list_buckets", alias = "list-buckets")]
    ListBuckets,

    /// List the objects in a bucket
    #[command(name = "list_bucket_objects", alias = "list-bucket-objects")]
    ListBucketObjects { bucket: String },

    /// Create a bucket and set it up for public website hosting
    #[command(name = "configure_bucket", alias = "configure-bucket")]
    ConfigureBucket { bucket: String },

    /// Upload new and changed files from a folder into a bucket
    #[command(name = "sync_folder", alias = "sync-folder")]
    SyncFolder {
        pathname: PathBuf,
        bucket: String,

        /// Report what would be uploaded without uploading
        #[arg(long)]
        dry_run: bool,
    },

    /// Point a domain at the website bucket of the same name
    #[command(name = "setup_domain", alias = "setup-domain")]
    SetupDomain { domain: String },

    /// Find an issued ACM certificate covering a domain
    FindCert { domain: String },

    /// Put a CloudFront distribution in front of a bucket and alias the domain to it
    SetupCdn { domain: String, bucket: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(profile) = args.profile {
        config.aws.profile = Some(profile);
    }
    config.validate()?;

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    tracing::debug!("Starting webauto v{}", env!("CARGO_PKG_VERSION"));

    let aws = AwsContext::load(&config.aws).await;

    match args.command {
        Command::ListBuckets => {
            for bucket in aws.bucket_manager().all_buckets().await? {
                println!("{bucket}");
            }
        }
        Command::ListBucketObjects { bucket } => {
            for object in aws.bucket_manager().all_objects(&bucket).await? {
                println!(
                    "{}\t{}\t{}",
                    object.key,
                    object.size,
                    object.etag.as_deref().unwrap_or("-")
                );
            }
        }
        Command::ConfigureBucket { bucket } => {
            let buckets = aws.bucket_manager();
            buckets.init_bucket(&bucket).await?;
            buckets.set_policy(&bucket).await?;
            buckets.configure_website(&bucket, &config.website).await?;
            println!("{}", buckets.get_bucket_url(&bucket).await?);
        }
        Command::SyncFolder {
            pathname,
            bucket,
            dry_run,
        } => {
            let syncer = Syncer::new(Arc::new(aws.store()), SyncOptions::from(&config.sync));

            if dry_run {
                let plan = syncer.plan(&pathname, &bucket).await?;
                for planned in plan.iter().filter(|p| p.action == Action::Upload) {
                    println!("upload {} ({} bytes)", planned.key, planned.size);
                }
                let skipped = plan.iter().filter(|p| p.action == Action::Skip).count();
                println!("{} to upload, {} unchanged", plan.len() - skipped, skipped);
                return Ok(());
            }

            let report = syncer.sync(&pathname, &bucket).await?;
            println!(
                "{} uploaded ({} bytes), {} unchanged",
                report.uploaded_files, report.uploaded_bytes, report.skipped_files
            );
            println!("{}", aws.bucket_manager().get_bucket_url(&bucket).await?);
        }
        Command::SetupDomain { domain } => {
            // The website bucket is named after the domain it serves
            let region = aws.bucket_manager().get_region(&domain).await?;
            let endpoint = get_endpoint(&region)
                .ok_or_else(|| anyhow!("no website endpoint known for region {region}"))?;

            let domains = aws.domain_manager();
            let zone = domains.find_or_create_hosted_zone(&domain).await?;
            domains.create_s3_domain_record(&zone, &domain, endpoint).await?;
            println!("http://{domain}");
        }
        Command::FindCert { domain } => match aws.certificate_manager().find_matching_cert(&domain).await? {
            Some(cert) => println!("{}", cert.arn),
            None => return Err(anyhow!("no issued certificate covers {domain}")),
        },
        Command::SetupCdn { domain, bucket } => {
            let distributions = aws.distribution_manager();
            let dist = match distributions.find_matching_dist(&domain).await? {
                Some(dist) => {
                    tracing::info!("Reusing distribution {} for {}", dist.id, domain);
                    dist
                }
                None => {
                    let cert = aws
                        .certificate_manager()
                        .find_matching_cert(&domain)
                        .await?
                        .ok_or_else(|| anyhow!("no issued certificate covers {domain}"))?;
                    let dist = distributions.create_dist(&domain, &bucket, &cert.arn).await?;
                    distributions.await_deploy(&dist).await?;
                    dist
                }
            };

            let domains = aws.domain_manager();
            let zone = domains.find_or_create_hosted_zone(&domain).await?;
            domains
                .create_cf_domain_record(&zone, &domain, &dist.domain_name)
                .await?;
            println!("https://{domain}");
        }
    }

    Ok(())
}

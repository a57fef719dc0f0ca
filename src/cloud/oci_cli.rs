//! `CloudApi` over the `oci` command-line tool.
//!
//! Each call runs `oci iam ... --config-file <path> --profile <name>` and
//! parses the JSON `data` envelope. Authentication is entirely the CLI's
//! business. Children are spawned with `kill_on_drop`, so an expired
//! `with_timeout` also stops the process.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::process::Command;

use super::{CloudApi, CloudError, CloudResult, Compartment, IdentityDetails, IdentityLookup};
use crate::profiles::{load_profiles, Profile};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CompartmentRecord {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    lifecycle_state: String,
    #[serde(default)]
    compartment_id: String,
}

#[derive(Debug, Deserialize)]
struct NamedRecord {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RegionSubscription {
    region_name: Option<String>,
}

/// Runs the `oci` executable.
#[derive(Debug, Clone)]
pub struct OciCli {
    program: String,
}

impl OciCli {
    pub fn new() -> Self {
        Self::with_program("oci")
    }

    /// Use a different executable (wrapper scripts, tests).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run one `oci` invocation; `None` when the CLI printed nothing (empty list).
    async fn run<T: DeserializeOwned>(
        &self,
        op: &str,
        auth_config_path: &str,
        profile: &str,
        region: &str,
        args: &[&str],
    ) -> CloudResult<Option<T>> {
        if auth_config_path.is_empty() {
            return Err(CloudError::Config("oci config path required".into()));
        }
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .args(["--config-file", auth_config_path, "--profile", profile])
            .args(["--output", "json"]);
        if !region.is_empty() {
            cmd.args(["--region", region]);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(op, profile, region, "running oci");
        let output = cmd
            .output()
            .await
            .map_err(|e| CloudError::Spawn(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CloudError::Command {
                op: op.to_string(),
                message: stderr.trim().to_string(),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Ok(None);
        }
        let envelope: Envelope<T> = serde_json::from_str(&stdout)
            .map_err(|e| CloudError::Parse(format!("{op}: {e}")))?;
        Ok(Some(envelope.data))
    }
}

impl Default for OciCli {
    fn default() -> Self {
        Self::new()
    }
}

/// Profile entry backing a lookup, for ids the caller left empty.
fn profile_entry(auth_config_path: &str, profile: &str) -> CloudResult<Profile> {
    let profiles =
        load_profiles(Path::new(auth_config_path)).map_err(|e| CloudError::Config(e.to_string()))?;
    profiles
        .get(profile)
        .cloned()
        .ok_or_else(|| CloudError::Config(format!("profile {profile} not found")))
}

#[async_trait]
impl CloudApi for OciCli {
    async fn fetch_compartments(
        &self,
        auth_config_path: &str,
        profile: &str,
        region: &str,
        parent_id: &str,
    ) -> CloudResult<Vec<Compartment>> {
        let records: Vec<CompartmentRecord> = self
            .run(
                "list compartments",
                auth_config_path,
                profile,
                region,
                &[
                    "iam",
                    "compartment",
                    "list",
                    "--compartment-id",
                    parent_id,
                    "--compartment-id-in-subtree",
                    "false",
                    "--all",
                ],
            )
            .await?
            .unwrap_or_default();

        Ok(records
            .into_iter()
            .map(|r| Compartment {
                id: r.id,
                name: r.name,
                status: r.lifecycle_state,
                parent_id: r.compartment_id,
            })
            .collect())
    }

    async fn fetch_identity_details(
        &self,
        auth_config_path: &str,
        lookup: &IdentityLookup,
    ) -> CloudResult<IdentityDetails> {
        let mut tenancy_id = lookup.tenancy_id.clone();
        let mut user_id = lookup.user_id.clone();
        if tenancy_id.is_empty() || user_id.is_empty() {
            let entry = profile_entry(auth_config_path, &lookup.profile)?;
            if tenancy_id.is_empty() {
                tenancy_id = entry.tenancy;
            }
            if user_id.is_empty() {
                user_id = entry.user;
            }
        }
        let (profile, region) = (lookup.profile.as_str(), lookup.region.as_str());

        let tenancy: NamedRecord = self
            .run(
                "get tenancy",
                auth_config_path,
                profile,
                region,
                &["iam", "tenancy", "get", "--tenancy-id", &tenancy_id],
            )
            .await?
            .ok_or_else(|| CloudError::Parse("get tenancy: empty response".into()))?;

        // Compartment names are best-effort; the other two are required.
        let mut compartment_name = String::new();
        if !lookup.compartment_id.is_empty() {
            let args = [
                "iam",
                "compartment",
                "get",
                "--compartment-id",
                lookup.compartment_id.as_str(),
            ];
            match self
                .run::<NamedRecord>("get compartment", auth_config_path, profile, region, &args)
                .await
            {
                Ok(Some(c)) => compartment_name = c.name,
                Ok(None) => {}
                Err(e) => tracing::debug!("compartment name lookup failed: {e}"),
            }
        }

        let user: NamedRecord = self
            .run(
                "get user",
                auth_config_path,
                profile,
                region,
                &["iam", "user", "get", "--user-id", &user_id],
            )
            .await?
            .ok_or_else(|| CloudError::Parse("get user: empty response".into()))?;

        Ok(IdentityDetails {
            tenancy_name: tenancy.name,
            tenancy_id,
            compartment_name,
            compartment_id: lookup.compartment_id.clone(),
            user_name: user.description,
            user_id,
            region: lookup.region.clone(),
        })
    }

    async fn list_region_subscriptions(
        &self,
        auth_config_path: &str,
        profile: &str,
    ) -> CloudResult<Vec<String>> {
        let entry = profile_entry(auth_config_path, profile)?;
        let subs: Vec<RegionSubscription> = self
            .run(
                "list region subscriptions",
                auth_config_path,
                profile,
                "",
                &[
                    "iam",
                    "region-subscription",
                    "list",
                    "--tenancy-id",
                    &entry.tenancy,
                ],
            )
            .await?
            .unwrap_or_default();
        Ok(subs.into_iter().filter_map(|s| s.region_name).collect())
    }
}

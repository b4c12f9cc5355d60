//! Built-in validators referenced by the cluster schema
//!
//! Only checks that need no provider calls live here; the one lookup they
//! make goes through the oracle in the context.

use super::{Findings, ValidationContext};
use crate::param::value::ParamValue;
use tracing::debug;

const URL_SCHEMES: &[&str] = &["http", "https", "s3", "file"];
const BATCH_UNSUPPORTED_REGIONS: &[&str] = &["ap-northeast-3", "us-gov-east-1", "us-gov-west-1"];
const EFA_OSES: &[&str] = &["alinux", "centos7"];
const EFA_SCHEDULERS: &[&str] = &["sge", "slurm", "torque"];
const EFA_INSTANCE_TYPES: &[&str] = &["c5n.18xlarge", "p3dn.24xlarge", "i3en.24xlarge"];
const FSX_CAPACITY_STEP: i64 = 3600;
const FSX_MAX_CHUNK_SIZE: i64 = 512_000;
const IO1_MAX_RATIO: i64 = 50;

fn text<'a>(ctx: &ValidationContext<'a>, key: &str) -> Option<&'a str> {
    ctx.sibling(key).and_then(ParamValue::as_str)
}

fn int(ctx: &ValidationContext<'_>, key: &str) -> Option<i64> {
    ctx.sibling(key).and_then(ParamValue::as_int)
}

fn is_set(ctx: &ValidationContext<'_>, key: &str) -> bool {
    ctx.sibling(key).is_some_and(|value| !value.is_none())
}

/// Script and template locations must carry a known scheme
pub fn url(_key: &str, value: &ParamValue, _ctx: &ValidationContext<'_>) -> Findings {
    let mut findings = Findings::new();
    let Some(location) = value.as_str() else {
        return findings;
    };
    let known = location
        .split_once("://")
        .is_some_and(|(scheme, rest)| URL_SCHEMES.contains(&scheme) && !rest.is_empty());
    if !known {
        findings.error(format!(
            "The value '{location}' is not a valid URL, supported schemes are {}",
            URL_SCHEMES.join(", ")
        ));
    }
    findings
}

pub fn scheduler(_key: &str, value: &ParamValue, ctx: &ValidationContext<'_>) -> Findings {
    let mut findings = Findings::new();
    if value.as_str() != Some("awsbatch") {
        return findings;
    }

    let region = ctx.config.region();
    if BATCH_UNSUPPORTED_REGIONS.contains(&region) {
        findings.error(format!("'awsbatch' scheduler is not supported in the '{region}' region"));
    }
    if let Some(os) = text(ctx, "base_os")
        && os != "alinux"
    {
        findings.error(format!("'awsbatch' scheduler supports only 'alinux' base_os, got '{os}'"));
    }
    findings
}

pub fn efa(key: &str, value: &ParamValue, ctx: &ValidationContext<'_>) -> Findings {
    let mut findings = Findings::new();
    if value.is_none() {
        return findings;
    }

    if let Some(os) = text(ctx, "base_os")
        && !EFA_OSES.contains(&os)
    {
        findings.error(format!(
            "When using '{key}' the 'base_os' parameter must be one of {}",
            EFA_OSES.join(", ")
        ));
    }
    if let Some(scheduler) = text(ctx, "scheduler")
        && !EFA_SCHEDULERS.contains(&scheduler)
    {
        findings.error(format!(
            "When using '{key}' the 'scheduler' parameter must be one of {}",
            EFA_SCHEDULERS.join(", ")
        ));
    }
    if !is_set(ctx, "placement_group") {
        findings.error(format!(
            "When using '{key}' it is required to set the 'placement_group' parameter"
        ));
    }
    let instance_type = text(ctx, "compute_instance_type").unwrap_or_default();
    if !EFA_INSTANCE_TYPES.contains(&instance_type) {
        findings.error(format!(
            "When using '{key}' the 'compute_instance_type' parameter must be one of {}",
            EFA_INSTANCE_TYPES.join(", ")
        ));
    }
    findings
}

/// Throughput mode and provisioned throughput go together
pub fn efs(_kind: &str, _label: &str, ctx: &ValidationContext<'_>) -> Findings {
    let mut findings = Findings::new();
    let provisioned = is_set(ctx, "provisioned_throughput");
    match text(ctx, "throughput_mode") {
        Some("provisioned") if !provisioned => findings.error(
            "When specifying 'throughput_mode' to 'provisioned', \
             the 'provisioned_throughput' option must be specified",
        ),
        Some("bursting") if provisioned => findings.error(
            "When specifying 'provisioned_throughput', \
             the 'throughput_mode' option must be set to 'provisioned'",
        ),
        _ => {}
    }
    findings
}

/// The mount target lookup of an existing file system must succeed
pub fn efs_id(_key: &str, value: &ParamValue, ctx: &ValidationContext<'_>) -> Findings {
    let mut findings = Findings::new();
    let Some(fs_id) = value.as_str() else {
        return findings;
    };
    let Some(zone) = ctx.config.master_availability_zone() else {
        findings.warning(format!(
            "Unable to check the mount targets of '{fs_id}', the master availability zone is unknown"
        ));
        return findings;
    };
    match ctx.oracle.efs_mount_target(fs_id, zone) {
        Ok(Some(target)) => debug!("'{}' has mount target '{}' in '{}'", fs_id, target, zone),
        Ok(None) => debug!("'{}' has no mount target in '{}'", fs_id, zone),
        Err(e) => findings.error(e.to_string()),
    }
    findings
}

pub fn fsx(_kind: &str, _label: &str, ctx: &ValidationContext<'_>) -> Findings {
    let mut findings = Findings::new();
    let creation_options = [
        "storage_capacity",
        "fsx_kms_key_id",
        "imported_file_chunk_size",
        "export_path",
        "import_path",
        "weekly_maintenance_start_time",
    ];

    if is_set(ctx, "fsx_fs_id") {
        for option in creation_options.iter().filter(|option| is_set(ctx, option)) {
            findings.error(format!(
                "When specifying 'fsx_fs_id', the '{option}' option must not be specified"
            ));
        }
        return findings;
    }

    if is_set(ctx, "shared_dir") && !is_set(ctx, "storage_capacity") {
        findings.error("When specifying 'fsx' section, the 'storage_capacity' option must be specified");
    }
    if !is_set(ctx, "import_path") {
        for option in ["imported_file_chunk_size", "export_path"] {
            if is_set(ctx, option) {
                findings.error(format!(
                    "When specifying '{option}', the 'import_path' option must be specified"
                ));
            }
        }
    }
    findings
}

pub fn fsx_storage_capacity(_key: &str, value: &ParamValue, _ctx: &ValidationContext<'_>) -> Findings {
    let mut findings = Findings::new();
    if let Some(capacity) = value.as_int()
        && (capacity <= 0 || capacity % FSX_CAPACITY_STEP != 0)
    {
        findings.error(format!(
            "Capacity for FSx lustre filesystem, minimum of {FSX_CAPACITY_STEP} GB, \
             increments of {FSX_CAPACITY_STEP} GB"
        ));
    }
    findings
}

pub fn fsx_imported_file_chunk_size(
    _key: &str,
    value: &ParamValue,
    _ctx: &ValidationContext<'_>,
) -> Findings {
    let mut findings = Findings::new();
    if let Some(size) = value.as_int()
        && !(1..=FSX_MAX_CHUNK_SIZE).contains(&size)
    {
        findings.error(format!(
            "'imported_file_chunk_size' has a minimum size of 1 MiB, and max size of {FSX_MAX_CHUNK_SIZE} MiB"
        ));
    }
    findings
}

pub fn raid_volume_iops(_key: &str, value: &ParamValue, ctx: &ValidationContext<'_>) -> Findings {
    let mut findings = Findings::new();
    if text(ctx, "volume_type") != Some("io1") {
        return findings;
    }
    if let (Some(iops), Some(size)) = (value.as_int(), int(ctx, "volume_size"))
        && size > 0
        && size.checked_mul(IO1_MAX_RATIO).is_some_and(|limit| iops > limit)
    {
        findings.error(format!(
            "IOPS to volume size ratio of {} is too high; maximum is {IO1_MAX_RATIO}",
            iops / size
        ));
    }
    findings
}

/// Scaling bounds of the compute fleet, per scheduler family
pub fn cluster(_kind: &str, _label: &str, ctx: &ValidationContext<'_>) -> Findings {
    let mut findings = Findings::new();

    if text(ctx, "scheduler") == Some("awsbatch") {
        let min = int(ctx, "min_vcpus").unwrap_or_default();
        let desired = int(ctx, "desired_vcpus").unwrap_or_default();
        let max = int(ctx, "max_vcpus").unwrap_or_default();
        if desired < min {
            findings.error("desired_vcpus must be greater than or equal to min_vcpus");
        }
        if desired > max {
            findings.error("desired_vcpus must be fewer than or equal to max_vcpus");
        }
        if max < min {
            findings.error("max_vcpus must be greater than or equal to min_vcpus");
        }
        return findings;
    }

    let initial = int(ctx, "initial_queue_size").unwrap_or_default();
    let max = int(ctx, "max_queue_size").unwrap_or_default();
    if initial > max {
        findings.error("initial_queue_size must be fewer than or equal to max_queue_size");
    }
    if ctx.sibling("maintain_initial_size") == Some(&ParamValue::Bool(true)) && initial == 0 {
        findings.warning("maintain_initial_size has no effect when initial_queue_size is 0");
    }
    let spot_price_set = ctx
        .section()
        .and_then(|section| section.param("spot_price"))
        .is_some_and(|param| !param.is_default());
    if spot_price_set && text(ctx, "cluster_type") == Some("ondemand") {
        findings.warning("spot_price is ignored when cluster_type is 'ondemand'");
    }
    findings
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use super::*;
    use crate::config::ini::IniDocument;
    use crate::config::{BuildOptions, ClusterConfig};
    use crate::oracle::StaticOracle;
    use crate::schema::Schema;

    fn with_cluster<F: FnOnce(&ValidationContext<'_>)>(
        values: &[(&str, ParamValue)],
        check: F,
    ) {
        let oracle = StaticOracle::new();
        let mut config = ClusterConfig::from_defaults(Schema::global(), &oracle).unwrap();
        let cluster = config.section_mut("cluster", "default").unwrap();
        for (key, value) in values {
            cluster.set_value(key, value.clone()).unwrap();
        }
        let ctx = ValidationContext {
            config: &config,
            oracle: &oracle,
            section_key: "cluster",
            section_label: "default",
        };
        check(&ctx);
    }

    #[test]
    fn url_schemes() {
        with_cluster(&[], |ctx| {
            assert!(url("k", &ParamValue::string("s3://bucket/key.sh"), ctx).is_clean());
            assert!(url("k", &ParamValue::string("https://host/x"), ctx).is_clean());
            assert_eq!(url("k", &ParamValue::string("ftp://host/x"), ctx).errors.len(), 1);
            assert_eq!(url("k", &ParamValue::string("bucket/key.sh"), ctx).errors.len(), 1);
        });
    }

    #[test]
    fn batch_requires_alinux() {
        with_cluster(
            &[
                ("scheduler", ParamValue::string("awsbatch")),
                ("base_os", ParamValue::string("centos7")),
            ],
            |ctx| {
                let findings = scheduler("scheduler", &ParamValue::string("awsbatch"), ctx);
                assert_eq!(findings.errors.len(), 1);
                assert!(findings.errors[0].contains("alinux"));
            },
        );
    }

    #[test]
    fn queue_bounds() {
        with_cluster(
            &[
                ("initial_queue_size", ParamValue::Int(12)),
                ("max_queue_size", ParamValue::Int(4)),
            ],
            |ctx| {
                let findings = cluster("cluster", "default", ctx);
                assert_eq!(findings.errors.len(), 1);
            },
        );
        with_cluster(&[("maintain_initial_size", ParamValue::Bool(true))], |ctx| {
            let findings = cluster("cluster", "default", ctx);
            assert!(findings.errors.is_empty());
            assert_eq!(findings.warnings.len(), 1);
        });
    }

    #[test]
    fn vcpu_bounds() {
        with_cluster(
            &[
                ("scheduler", ParamValue::string("awsbatch")),
                ("min_vcpus", ParamValue::Int(4)),
                ("desired_vcpus", ParamValue::Int(2)),
            ],
            |ctx| {
                let findings = cluster("cluster", "default", ctx);
                assert_eq!(
                    findings.errors,
                    vec!["desired_vcpus must be greater than or equal to min_vcpus"]
                );
            },
        );
    }

    #[test]
    fn efa_prerequisites() {
        with_cluster(&[("enable_efa", ParamValue::string("compute"))], |ctx| {
            let findings = efa("enable_efa", &ParamValue::string("compute"), ctx);
            // missing placement group and unsupported instance type
            assert_eq!(findings.errors.len(), 2);
        });
    }

    #[test]
    fn fsx_capacity_steps() {
        with_cluster(&[], |ctx| {
            assert!(fsx_storage_capacity("c", &ParamValue::Int(7200), ctx).is_clean());
            assert!(!fsx_storage_capacity("c", &ParamValue::Int(1000), ctx).is_clean());
            assert!(!fsx_imported_file_chunk_size("c", &ParamValue::Int(0), ctx).is_clean());
            assert!(fsx_imported_file_chunk_size("c", &ParamValue::Int(1024), ctx).is_clean());
        });
    }

    fn with_raid<F: FnOnce(&ValidationContext<'_>)>(volume_size: &str, check: F) {
        let oracle = StaticOracle::new();
        let text = format!(
            "[cluster default]\nraid_settings = r\n\n\
             [raid r]\nshared_dir = /raid\nvolume_type = io1\nvolume_size = {volume_size}\n"
        );
        let document = IniDocument::parse(&text).unwrap();
        let config =
            ClusterConfig::from_file(Schema::global(), &document, &BuildOptions::default(), &oracle)
                .unwrap();
        let ctx = ValidationContext {
            config: &config,
            oracle: &oracle,
            section_key: "raid",
            section_label: "r",
        };
        check(&ctx);
    }

    #[test]
    fn io1_iops_ratio() {
        with_raid("10", |ctx| {
            assert!(raid_volume_iops("volume_iops", &ParamValue::Int(500), ctx).is_clean());
            let findings = raid_volume_iops("volume_iops", &ParamValue::Int(1000), ctx);
            assert_eq!(
                findings.errors,
                vec!["IOPS to volume size ratio of 100 is too high; maximum is 50"]
            );
        });
    }

    #[test]
    fn huge_volume_size_does_not_overflow() {
        with_raid("9000000000000000000", |ctx| {
            assert!(raid_volume_iops("volume_iops", &ParamValue::Int(5000), ctx).is_clean());
            assert!(raid_volume_iops("volume_iops", &ParamValue::Int(i64::MAX), ctx).is_clean());
        });
    }
}
